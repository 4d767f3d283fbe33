//! The editing session facade and its outbound effects.

pub mod editor;
pub mod effects;
pub mod settings;

pub use editor::Editor;
pub use effects::{CaretSurface, Effect, FocusTarget, dispatch_effects};
pub use settings::Settings;
