//! Shared "what is highlighted" state between the document and the message
//! panel.
//!
//! Both sides read and write the same [`EmphasisState`] through
//! [`EmphasisSync::dispatch`]; the last writer wins. Transitions are the pure
//! function [`reduce`].

use crate::messages::ContentKind;
use crate::models::{RemarkId, SentenceId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmphasisState {
    pub emphasized_message_id: Option<String>,
    pub emphasized_sentence_id: Option<SentenceId>,
    pub emphasized_kind: Option<ContentKind>,
    pub hovered_remark_id: Option<RemarkId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmphasisEvent {
    SelectSentence(SentenceId),
    SelectRemark {
        remark_id: RemarkId,
        sentence_id: SentenceId,
    },
    HoverRemark(RemarkId),
    LeaveRemark,
    Clear,
}

/// Where submitted message text goes, given the current emphasis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    AfterSentence(SentenceId),
    /// New paragraph after the owning sentence, rejoining the remark
    ReplyToRemark {
        remark_id: RemarkId,
        sentence_id: SentenceId,
    },
    EndOfDocument,
}

impl EmphasisState {
    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }

    pub fn emphasized_remark(&self) -> Option<RemarkId> {
        match self.emphasized_kind {
            Some(ContentKind::Remark) => self.emphasized_message_id.as_deref().map(RemarkId::from),
            _ => None,
        }
    }

    pub fn is_sentence_emphasized(&self, sentence_id: &SentenceId) -> bool {
        self.emphasized_sentence_id.as_ref() == Some(sentence_id)
    }

    pub fn submit_target(&self) -> SubmitTarget {
        match (self.emphasized_kind, &self.emphasized_sentence_id) {
            (Some(ContentKind::Sentence), Some(sentence_id)) => {
                SubmitTarget::AfterSentence(sentence_id.clone())
            }
            (Some(ContentKind::Remark), Some(sentence_id)) => match self.emphasized_remark() {
                Some(remark_id) => SubmitTarget::ReplyToRemark {
                    remark_id,
                    sentence_id: sentence_id.clone(),
                },
                None => SubmitTarget::EndOfDocument,
            },
            _ => SubmitTarget::EndOfDocument,
        }
    }
}

pub fn reduce(state: &EmphasisState, event: EmphasisEvent) -> EmphasisState {
    match event {
        EmphasisEvent::SelectSentence(sentence_id) => EmphasisState {
            emphasized_message_id: Some(sentence_id.to_string()),
            emphasized_sentence_id: Some(sentence_id),
            emphasized_kind: Some(ContentKind::Sentence),
            hovered_remark_id: None,
        },
        EmphasisEvent::SelectRemark {
            remark_id,
            sentence_id,
        } => EmphasisState {
            emphasized_message_id: Some(remark_id.to_string()),
            emphasized_sentence_id: Some(sentence_id),
            emphasized_kind: Some(ContentKind::Remark),
            hovered_remark_id: None,
        },
        EmphasisEvent::HoverRemark(remark_id) => EmphasisState {
            hovered_remark_id: Some(remark_id),
            ..state.clone()
        },
        EmphasisEvent::LeaveRemark => EmphasisState {
            hovered_remark_id: None,
            ..state.clone()
        },
        EmphasisEvent::Clear => EmphasisState::default(),
    }
}

/// Owner of the single [`EmphasisState`]
#[derive(Debug, Clone, Default)]
pub struct EmphasisSync {
    state: EmphasisState,
}

impl EmphasisSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EmphasisState {
        &self.state
    }

    pub fn dispatch(&mut self, event: EmphasisEvent) -> &EmphasisState {
        log::trace!("emphasis event {event:?}");
        self.state = reduce(&self.state, event);
        &self.state
    }
}
