//! Insertion points: computed caret slots between sentences and paragraphs.
//!
//! An insertion point is never stored in the document. It is an address,
//! `(paragraph, slot)`, that the registry resolves against the current
//! paragraph sequence when text is committed. The registry owns the only
//! focus register and the only uncommitted input buffer.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::editing::{Cmd, Patch};
use crate::models::{Document, ParagraphId, SentenceId};

/// Position of an insertion point relative to its paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    /// Before the first sentence
    Start,
    /// Directly after the sentence at this index
    AfterSentence(usize),
    /// Paragraph gap above the paragraph
    SeparatorBefore,
    /// Paragraph gap below the paragraph
    SeparatorAfter,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InsertionPointId {
    pub paragraph_id: ParagraphId,
    pub slot: Slot,
}

impl InsertionPointId {
    pub fn new(paragraph_id: ParagraphId, slot: Slot) -> Self {
        Self { paragraph_id, slot }
    }

    pub fn start(paragraph_id: &ParagraphId) -> Self {
        Self::new(paragraph_id.clone(), Slot::Start)
    }

    pub fn after_sentence(paragraph_id: &ParagraphId, index: usize) -> Self {
        Self::new(paragraph_id.clone(), Slot::AfterSentence(index))
    }

    pub fn separator_before(paragraph_id: &ParagraphId) -> Self {
        Self::new(paragraph_id.clone(), Slot::SeparatorBefore)
    }

    pub fn separator_after(paragraph_id: &ParagraphId) -> Self {
        Self::new(paragraph_id.clone(), Slot::SeparatorAfter)
    }

    /// Separators create paragraphs; every other slot creates sentences
    pub fn is_separator(&self) -> bool {
        matches!(self.slot, Slot::SeparatorBefore | Slot::SeparatorAfter)
    }
}

impl fmt::Display for InsertionPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.paragraph_id;
        match self.slot {
            Slot::Start => write!(f, "{p}-start"),
            Slot::AfterSentence(index) => write!(f, "{p}-{index}"),
            Slot::SeparatorBefore => write!(f, "separator-before-{p}"),
            Slot::SeparatorAfter => write!(f, "separator-after-{p}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed insertion point id: {0:?}")]
pub struct ParseInsertionPointError(String);

impl FromStr for InsertionPointId {
    type Err = ParseInsertionPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseInsertionPointError(s.to_string());
        let non_empty = |id: &str| {
            if id.is_empty() {
                Err(malformed())
            } else {
                Ok(ParagraphId::from(id))
            }
        };

        if let Some(id) = s.strip_prefix("separator-before-") {
            return Ok(Self::new(non_empty(id)?, Slot::SeparatorBefore));
        }
        if let Some(id) = s.strip_prefix("separator-after-") {
            return Ok(Self::new(non_empty(id)?, Slot::SeparatorAfter));
        }

        // Paragraph ids may themselves contain dashes, the slot never does
        let (id, slot) = s.rsplit_once('-').ok_or_else(malformed)?;
        let slot = match slot {
            "start" => Slot::Start,
            index => Slot::AfterSentence(index.parse().map_err(|_| malformed())?),
        };
        Ok(Self::new(non_empty(id)?, slot))
    }
}

/// What happened to a commit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Empty or whitespace-only text; focus stays where it was
    Ignored,
    /// Duplicate commit at the same separator inside the debounce window
    Coalesced,
    /// The addressed paragraph no longer exists
    Rejected,
    Committed(Commit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub paragraph_id: ParagraphId,
    pub sentence_id: SentenceId,
    /// Insertion point directly after the new sentence, now focused
    pub focus: InsertionPointId,
    pub patch: Patch,
}

/// Single focus register plus the one uncommitted input buffer.
#[derive(Debug, Clone, Default)]
pub struct InsertionPoints {
    focused: Option<InsertionPointId>,
    buffer: Option<(InsertionPointId, String)>,
    solid_cursor: Option<InsertionPointId>,
    last_separator_commit: Option<(InsertionPointId, Duration)>,
    debounce: Duration,
}

impl InsertionPoints {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            ..Self::default()
        }
    }

    pub fn focused(&self) -> Option<&InsertionPointId> {
        self.focused.as_ref()
    }

    pub fn is_focused(&self, id: &InsertionPointId) -> bool {
        self.focused.as_ref() == Some(id)
    }

    /// Uncommitted text at an insertion point
    pub fn content(&self, id: &InsertionPointId) -> &str {
        match &self.buffer {
            Some((owner, text)) if owner == id => text.as_str(),
            _ => "",
        }
    }

    /// Hover hint shown on an unfocused, empty insertion point
    pub fn shows_solid_cursor(&self, id: &InsertionPointId) -> bool {
        self.solid_cursor.as_ref() == Some(id) && !self.is_focused(id) && self.content(id).is_empty()
    }

    pub fn focus(&mut self, id: InsertionPointId) {
        if self.buffer.as_ref().is_some_and(|(owner, _)| owner != &id) {
            self.buffer = None;
        }
        self.solid_cursor = None;
        self.focused = Some(id);
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn show_solid_cursor(&mut self, id: InsertionPointId) {
        self.solid_cursor = Some(id);
    }

    pub fn hide_solid_cursor(&mut self) {
        self.solid_cursor = None;
    }

    /// Record typed text. Typing somewhere else discards the old buffer.
    pub fn input(&mut self, id: InsertionPointId, text: impl Into<String>) {
        self.buffer = Some((id, text.into()));
    }

    /// Discard uncommitted text at `id` without committing it
    pub fn reset(&mut self, id: &InsertionPointId) {
        if self.buffer.as_ref().is_some_and(|(owner, _)| owner == id) {
            self.buffer = None;
        }
    }

    pub fn reset_all(&mut self) {
        self.buffer = None;
    }

    /// Drop focus, buffer and hint pointing into paragraphs that are gone
    pub fn forget_missing(&mut self, doc: &Document) {
        let exists = |id: &InsertionPointId| doc.paragraph(&id.paragraph_id).is_some();
        if self.focused.as_ref().is_some_and(|id| !exists(id)) {
            self.focused = None;
        }
        if self.buffer.as_ref().is_some_and(|(id, _)| !exists(id)) {
            self.buffer = None;
        }
        if self.solid_cursor.as_ref().is_some_and(|id| !exists(id)) {
            self.solid_cursor = None;
        }
    }

    /// Commit `text` at `id`.
    ///
    /// Sentence slots splice a sentence into the paragraph, separators insert
    /// a new paragraph. On success focus moves to the slot right after the
    /// new sentence and the buffer at `id` is cleared.
    pub fn commit(
        &mut self,
        doc: &mut Document,
        id: &InsertionPointId,
        text: &str,
        now: Duration,
    ) -> CommitOutcome {
        if text.trim().is_empty() {
            return CommitOutcome::Ignored;
        }

        if id.is_separator()
            && let Some((last, at)) = &self.last_separator_commit
            && last == id
            && now.saturating_sub(*at) < self.debounce
        {
            log::debug!("coalesced repeated commit at {id}");
            return CommitOutcome::Coalesced;
        }

        let Some(paragraph_index) = doc.paragraph_index(&id.paragraph_id) else {
            log::warn!("commit at {id} ignored: paragraph no longer exists");
            return CommitOutcome::Rejected;
        };
        let sentence_count = doc.paragraphs()[paragraph_index].sentences.len();

        let cmd = match id.slot {
            Slot::Start => Cmd::AddSentenceAt {
                paragraph_id: id.paragraph_id.clone(),
                index: 0,
                text: text.to_string(),
            },
            Slot::AfterSentence(index) if index >= sentence_count => {
                log::warn!("commit at {id} ignored: paragraph has {sentence_count} sentences");
                return CommitOutcome::Rejected;
            }
            Slot::AfterSentence(index) => Cmd::AddSentenceAt {
                paragraph_id: id.paragraph_id.clone(),
                index: index + 1,
                text: text.to_string(),
            },
            Slot::SeparatorBefore => Cmd::InsertParagraph {
                index: paragraph_index,
                text: text.to_string(),
            },
            Slot::SeparatorAfter => Cmd::InsertParagraph {
                index: paragraph_index + 1,
                text: text.to_string(),
            },
        };

        let patch = doc.apply(cmd);
        let Some(sentence_id) = patch.created_sentence.clone() else {
            return CommitOutcome::Rejected;
        };
        let Some(location) = doc.locate_sentence(&sentence_id) else {
            return CommitOutcome::Rejected;
        };
        let paragraph_id = doc.paragraphs()[location.paragraph_index].id.clone();
        let focus = InsertionPointId::after_sentence(&paragraph_id, location.sentence_index);

        self.reset(id);
        if id.is_separator() {
            self.last_separator_commit = Some((id.clone(), now));
        }
        self.focus(focus.clone());

        CommitOutcome::Committed(Commit {
            paragraph_id,
            sentence_id,
            focus,
            patch,
        })
    }
}
