use crate::models::{ParagraphId, RemarkId, SentenceId};

/// Result of applying a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// False when the command was rejected and the document left untouched
    pub changed: bool,
    pub created_paragraph: Option<ParagraphId>,
    pub created_sentence: Option<SentenceId>,
    pub created_remark: Option<RemarkId>,
    /// Paragraphs pruned because a move emptied them
    pub removed_paragraphs: Vec<ParagraphId>,
    /// Remarks dropped when typing into a sentence's remark slot
    pub cleared_remarks: Vec<RemarkId>,
    pub rejoined_remark: Option<RemarkId>,
    pub version: u64,
}

impl Patch {
    pub(crate) fn unchanged(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}
