//! Names of the events the dispatcher re-broadcasts.

pub const SLIDES_CHANGED: &str = "slidesChanged";
pub const ACTIVE_SLIDE_CHANGED: &str = "activeSlideChanged";
pub const SLIDE_UPDATED: &str = "slideUpdated";
pub const BASE_FLOATER_CONFIG_CHANGED: &str = "baseFloaterConfigChanged";
pub const INLINE_FLOATER_CONFIG_CHANGED: &str = "inlineFloaterConfigChanged";
pub const DIAGRAM_REGISTERED: &str = "diagramRegistered";
pub const DIAGRAM_UNREGISTERED: &str = "diagramUnregistered";
pub const CAPABILITIES_UPDATED: &str = "capabilitiesUpdated";
pub const NODE_SELECTED: &str = "nodeSelected";
pub const ELEMENT_PROPERTY_UPDATED: &str = "elementPropertyUpdated";

/// Prefix of the per-diagram command channel.
pub const DIAGRAM_COMMAND_PREFIX: &str = "diagramCommand:";

/// Event a diagram listens on to receive commands addressed to it.
pub fn diagram_command(target_diagram_id: &str) -> String {
    format!("{DIAGRAM_COMMAND_PREFIX}{target_diagram_id}")
}
