//! Shared application state: slides, the nodes placed on them, UI blobs and
//! the current selection.

pub mod slide;
pub mod state;

pub use slide::{Node, Slide};
pub use state::{SelectedNode, State, StatePatch, BASE_FLOATER_CONFIG, INLINE_FLOATER_CONFIG};
