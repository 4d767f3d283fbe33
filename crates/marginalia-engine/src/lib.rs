pub mod editing;
pub mod emphasis;
pub mod messages;
pub mod models;
pub mod remarks;
pub mod session;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::*;
pub use emphasis::{EmphasisEvent, EmphasisState, EmphasisSync, SubmitTarget};
pub use messages::*;
pub use models::*;
pub use remarks::{
    BackgroundService, FnProducer, InlineService, ProducerError, RemarkManager, RemarkProducer,
    RemarkReply, RemarkRequest, RemarkService, RemarkState, RequestId, ResolvedRemark,
    SentenceGeneratorProducer, from_fn, next_open_remark,
};
pub use session::*;
