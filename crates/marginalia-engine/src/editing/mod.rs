/*!
 * # Editing Core
 *
 * Structural editing of the paragraph/sentence tree and the state machines
 * that decide where new text lands.
 *
 * ## Command-Based Editing
 * - Every structural change is a **`Cmd`** applied with `Document::apply`
 * - A command either applies completely or not at all; the paragraph
 *   sequence is rebuilt on a copy and swapped in on success
 * - Each application returns a **`Patch`** naming what was created, pruned,
 *   cleared or rejoined, plus the new document version
 *
 * ## Insertion Points
 * - Caret slots are computed addresses (`paragraph`, `slot`), never stored
 * - `InsertionPoints` owns the single focus register and the single
 *   uncommitted input buffer, and turns a commit into the right command
 *
 * ## Drag and Reorder
 * - `DragCoordinator` applies the midpoint rule to hover positions and
 *   delegates the final move to the document
 *
 * ## Module Structure
 *
 * - **`commands`**: `Cmd`, `EditError` and the document mutations
 * - **`patch`**: edit result metadata
 * - **`insertion`**: insertion point addresses and the focus registry
 * - **`drag`**: drag source / hover target / commit
 * - **`snapshot`**: immutable render view for the input surface
 */

pub mod commands;
pub mod drag;
pub mod insertion;
pub mod patch;
pub mod snapshot;

pub use commands::{Cmd, EditError};
pub use drag::{DragCoordinator, DragSource, HoverTarget, MoveRequest};
pub use insertion::{
    Commit, CommitOutcome, InsertionPointId, InsertionPoints, ParseInsertionPointError, Slot,
};
pub use patch::Patch;
pub use snapshot::{
    InsertionPointView, ParagraphView, SentenceSlot, SentenceView, Snapshot, create_snapshot,
    format_snapshot,
};
