//! Event bus shared by the host and diagram libraries.
//!
//! The dispatcher re-broadcasts every state or registry change here under
//! one of the names in [`names`]; commands addressed to a single diagram go
//! out on [`names::diagram_command`].

pub mod event_bus;
pub mod names;

pub use event_bus::{EventBus, EventHandler};
