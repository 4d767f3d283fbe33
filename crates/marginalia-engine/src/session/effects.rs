use crate::editing::InsertionPointId;
use crate::messages::{MessagePanel, NewContent};
use crate::models::SentenceId;

/// Something the rendering surface can put a caret into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    InsertionPoint(InsertionPointId),
    Sentence(SentenceId),
}

/// Requests the engine makes of its collaborators, queued in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Focus(FocusTarget),
    PlaceCaretAtEnd(FocusTarget),
    ScrollMessageIntoView(String),
    NewContent(NewContent),
}

/// Minimal caret capability of a rendering layer
pub trait CaretSurface {
    fn focus(&mut self, target: &FocusTarget);

    fn place_caret_at_end(&mut self, target: &FocusTarget);
}

/// Deliver effects to the surface and the message panel, in order
pub fn dispatch_effects<S, M>(
    effects: impl IntoIterator<Item = Effect>,
    surface: &mut S,
    panel: &mut M,
) where
    S: CaretSurface + ?Sized,
    M: MessagePanel + ?Sized,
{
    for effect in effects {
        match effect {
            Effect::Focus(target) => surface.focus(&target),
            Effect::PlaceCaretAtEnd(target) => surface.place_caret_at_end(&target),
            Effect::ScrollMessageIntoView(id) => panel.scroll_into_view(&id),
            Effect::NewContent(content) => panel.on_new_content(&content),
        }
    }
}
