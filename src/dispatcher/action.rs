use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Slide;
use crate::registry::DiagramRegistration;

/// Runs once an element update has been applied and announced.
#[derive(Clone)]
pub struct CompletionCallback(Arc<dyn Fn() + Send + Sync>);

impl CompletionCallback {
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for CompletionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionCallback")
    }
}

/// Every request the dispatcher understands.
///
/// On the wire an action is a JSON object tagged by `"type"`, e.g.
/// `{"type": "SET_ACTIVE_SLIDE", "slideId": "s2"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    SetSlides {
        slides: Vec<Arc<Slide>>,
    },
    SetActiveSlide {
        #[serde(default)]
        slide_id: Option<String>,
    },
    UpdateSlideData {
        slide_id: String,
        data: Map<String, Value>,
    },
    SetBaseFloaterConfig {
        config: Value,
    },
    SetInlineFloaterConfig {
        config: Value,
    },
    RegisterDiagram {
        entry: DiagramRegistration,
    },
    UnregisterDiagram {
        diagram_id: String,
    },
    UpdateCapabilities {
        diagram_id: String,
        capabilities: Vec<String>,
    },
    /// A missing `node_id` clears the selection.
    SetSelectedNode {
        #[serde(default)]
        node_id: Option<String>,
        #[serde(default)]
        diagram_id: Option<String>,
        #[serde(default)]
        node_data: Option<Value>,
        #[serde(default)]
        selected_element: Option<Value>,
    },
    UpdateElementProperty {
        element_id: String,
        property: String,
        value: Value,
        #[serde(skip)]
        on_complete: Option<CompletionCallback>,
    },
    /// Forwarded untouched to the target diagram's command channel. Fields
    /// beyond the target are diagram-defined and kept as sent.
    DiagramCommand {
        target_diagram_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        payload: Value,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Action {
    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetSlides { .. } => "SET_SLIDES",
            Self::SetActiveSlide { .. } => "SET_ACTIVE_SLIDE",
            Self::UpdateSlideData { .. } => "UPDATE_SLIDE_DATA",
            Self::SetBaseFloaterConfig { .. } => "SET_BASE_FLOATER_CONFIG",
            Self::SetInlineFloaterConfig { .. } => "SET_INLINE_FLOATER_CONFIG",
            Self::RegisterDiagram { .. } => "REGISTER_DIAGRAM",
            Self::UnregisterDiagram { .. } => "UNREGISTER_DIAGRAM",
            Self::UpdateCapabilities { .. } => "UPDATE_CAPABILITIES",
            Self::SetSelectedNode { .. } => "SET_SELECTED_NODE",
            Self::UpdateElementProperty { .. } => "UPDATE_ELEMENT_PROPERTY",
            Self::DiagramCommand { .. } => "DIAGRAM_COMMAND",
        }
    }

    pub fn update_element_property(
        element_id: impl Into<String>,
        property: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::UpdateElementProperty {
            element_id: element_id.into(),
            property: property.into(),
            value,
            on_complete: None,
        }
    }

    /// Attach a completion callback to an `UpdateElementProperty`; other
    /// actions are returned unchanged.
    pub fn on_complete(self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        match self {
            Self::UpdateElementProperty {
                element_id,
                property,
                value,
                ..
            } => Self::UpdateElementProperty {
                element_id,
                property,
                value,
                on_complete: Some(CompletionCallback::new(callback)),
            },
            other => other,
        }
    }

    pub fn diagram_command(
        target_diagram_id: impl Into<String>,
        command: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::DiagramCommand {
            target_diagram_id: target_diagram_id.into(),
            command: Some(command.into()),
            payload,
            extra: Map::new(),
        }
    }
}
