pub mod document;
pub mod ids;

pub use document::{ColorToken, Document, Paragraph, Remark, Sentence, SentenceLocation};
pub use ids::{IdGenerator, ParagraphId, RemarkId, SentenceId};
