//! Remark scheduling, production and cycling.
//!
//! A triggering edit arms one timer per configured delay. When a timer comes
//! due a request goes to the remark service, and when the producer's reply
//! comes back the text is appended to the sentence as a visible remark.
//! Replies are matched by request id, so they may land in any order and the
//! producer never runs on the editor's tick unless the service is inline.
//!
//! Rejoining is a document command (`Cmd::AddParagraphAfterSentence`) so the
//! reply and the resolution land in one update.

pub mod lifecycle;
pub mod producer;
pub mod scheduler;
pub mod service;

pub use lifecycle::{
    RemarkManager, RemarkState, ResolvedRemark, error_remark_text, next_open_remark,
};
pub use producer::{
    FnProducer, ProducerError, RemarkProducer, SentenceGeneratorProducer, from_fn,
};
pub use scheduler::{RemarkQueue, RemarkTask};
pub use service::{
    BackgroundService, InlineService, RemarkReply, RemarkRequest, RemarkService, RequestId,
};
