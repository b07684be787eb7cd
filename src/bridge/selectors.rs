//! Derived reads over a [`State`] snapshot.

use std::sync::Arc;

use crate::model::{Slide, State};
use crate::registry::{Registry, RegistryEntry};

/// The slide `active_slide_id` points at, if it exists.
pub fn active_slide(state: &State) -> Option<Arc<Slide>> {
    let slide_id = state.active_slide_id.as_deref()?;
    state.slide(slide_id).cloned()
}

/// Registry record of the diagram that owns the selected node.
pub fn active_diagram_entry(state: &State, registry: &Registry) -> Option<RegistryEntry> {
    let diagram_id = state.selected_node.as_ref()?.diagram_id.as_deref()?;
    registry.get(diagram_id)
}
