use crate::editing::Patch;
use crate::models::{Document, ParagraphId, SentenceId};

/// The sentence being dragged and where it currently sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSource {
    pub sentence_id: SentenceId,
    pub paragraph_id: ParagraphId,
    pub index: usize,
}

/// The sentence under the pointer, with its vertical extent in surface units
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTarget {
    pub paragraph_id: ParagraphId,
    pub index: usize,
    pub pointer_y: f32,
    pub rect_top: f32,
    pub rect_bottom: f32,
}

impl HoverTarget {
    /// Pointer distance from the hovered sentence's vertical midpoint,
    /// negative in the upper half
    fn offset_from_middle(&self) -> f32 {
        let middle = (self.rect_bottom - self.rect_top) / 2.0;
        (self.pointer_y - self.rect_top) - middle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub sentence_id: SentenceId,
    pub from: ParagraphId,
    pub to: ParagraphId,
    pub to_index: usize,
}

/// Turns drag source and hover positions into a single `move_sentence`.
///
/// A hovered slot only becomes the pending target once the pointer crosses
/// the hovered sentence's vertical midpoint in the direction of travel:
/// moving down needs the lower half, moving up needs the upper half. The
/// coordinator holds no document state of its own.
#[derive(Debug, Clone, Default)]
pub struct DragCoordinator {
    source: Option<DragSource>,
    pending: Option<MoveRequest>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, source: DragSource) {
        self.source = Some(source);
        self.pending = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }

    pub fn dragged_sentence(&self) -> Option<&SentenceId> {
        self.source.as_ref().map(|s| &s.sentence_id)
    }

    pub fn pending(&self) -> Option<&MoveRequest> {
        self.pending.as_ref()
    }

    /// Feed a hover position. Returns true when the pending target changed.
    pub fn hover(&mut self, target: &HoverTarget) -> bool {
        let Some(source) = &self.source else {
            return false;
        };

        let (current_paragraph, current_index) = match &self.pending {
            Some(pending) => (&pending.to, pending.to_index),
            None => (&source.paragraph_id, source.index),
        };

        if current_index == target.index && current_paragraph == &target.paragraph_id {
            return false;
        }
        let offset = target.offset_from_middle();
        if current_index < target.index && offset < 0.0 {
            return false;
        }
        if current_index > target.index && offset > 0.0 {
            return false;
        }

        self.pending = Some(MoveRequest {
            sentence_id: source.sentence_id.clone(),
            from: source.paragraph_id.clone(),
            to: target.paragraph_id.clone(),
            to_index: target.index,
        });
        true
    }

    /// Finish the drag, delegating the pending move to the document
    pub fn commit_move(&mut self, doc: &mut Document) -> Option<Patch> {
        self.source = None;
        let request = self.pending.take()?;
        let patch = doc.move_sentence(
            &request.sentence_id,
            &request.from,
            &request.to,
            request.to_index,
        );
        patch.changed.then_some(patch)
    }

    pub fn cancel(&mut self) {
        self.source = None;
        self.pending = None;
    }
}
