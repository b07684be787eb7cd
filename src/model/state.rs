use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::slide::Slide;

/// `ui` key written by `SET_BASE_FLOATER_CONFIG`.
pub const BASE_FLOATER_CONFIG: &str = "baseFloaterConfig";
/// `ui` key written by `SET_INLINE_FLOATER_CONFIG`.
pub const INLINE_FLOATER_CONFIG: &str = "inlineFloaterConfig";

/// The node the user currently has selected, with snapshots taken at
/// selection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedNode {
    pub node_id: String,
    #[serde(default)]
    pub diagram_id: Option<String>,
    #[serde(default)]
    pub node_data: Value,
    #[serde(default)]
    pub selected_element: Option<Value>,
}

/// Application state shared between the host and every diagram library.
///
/// A `State` is never mutated once published by the store; every change
/// builds a new value. Slides and nodes sit behind `Arc` so a change can
/// share everything it did not touch with the previous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default)]
    pub slides: Vec<Arc<Slide>>,
    #[serde(default)]
    pub active_slide_id: Option<String>,
    #[serde(default)]
    pub ui: Arc<Map<String, Value>>,
    #[serde(default)]
    pub selected_node: Option<Arc<SelectedNode>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            slides: Vec::new(),
            active_slide_id: None,
            ui: Arc::new(Map::new()),
            selected_node: None,
        }
    }
}

impl State {
    pub fn slide(&self, slide_id: &str) -> Option<&Arc<Slide>> {
        self.slides.iter().find(|slide| slide.id == slide_id)
    }

    /// Copy of `ui` with one key replaced.
    pub fn ui_with(&self, key: &str, value: Value) -> Arc<Map<String, Value>> {
        let mut ui = (*self.ui).clone();
        ui.insert(key.to_owned(), value);
        Arc::new(ui)
    }

    /// Shallow merge: fields present in `patch` replace, the rest are kept.
    pub fn merged(&self, patch: StatePatch) -> State {
        State {
            slides: patch.slides.unwrap_or_else(|| self.slides.clone()),
            active_slide_id: patch
                .active_slide_id
                .unwrap_or_else(|| self.active_slide_id.clone()),
            ui: patch.ui.unwrap_or_else(|| self.ui.clone()),
            selected_node: patch
                .selected_node
                .unwrap_or_else(|| self.selected_node.clone()),
        }
    }
}

/// Partial state for [`Store::set_state`](crate::store::Store::set_state).
///
/// The outer `Option` says whether a field is being set at all; for nullable
/// fields the inner `Option` is the new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub slides: Option<Vec<Arc<Slide>>>,
    pub active_slide_id: Option<Option<String>>,
    pub ui: Option<Arc<Map<String, Value>>>,
    pub selected_node: Option<Option<Arc<SelectedNode>>>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slides(mut self, slides: Vec<Arc<Slide>>) -> Self {
        self.slides = Some(slides);
        self
    }

    pub fn active_slide_id(mut self, slide_id: Option<String>) -> Self {
        self.active_slide_id = Some(slide_id);
        self
    }

    pub fn ui(mut self, ui: Map<String, Value>) -> Self {
        self.ui = Some(Arc::new(ui));
        self
    }

    pub fn selected_node(mut self, selected: Option<SelectedNode>) -> Self {
        self.selected_node = Some(selected.map(Arc::new));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_absent_fields() {
        let state = State {
            slides: vec![Arc::new(Slide::new("s1", vec![]))],
            active_slide_id: Some("s1".into()),
            ..State::default()
        };

        let next = state.merged(StatePatch::new().active_slide_id(None));

        assert!(Arc::ptr_eq(&state.slides[0], &next.slides[0]));
        assert_eq!(next.active_slide_id, None);
        assert!(Arc::ptr_eq(&state.ui, &next.ui));
    }

    #[test]
    fn test_ui_with_does_not_touch_original() {
        let state = State::default();
        let ui = state.ui_with(BASE_FLOATER_CONFIG, json!({ "visible": true }));
        assert!(state.ui.is_empty());
        assert_eq!(ui[BASE_FLOATER_CONFIG]["visible"], true);
    }

    #[test]
    fn test_snapshot_uses_camel_case() {
        let state = State {
            slides: vec![Arc::new(Slide::new("s1", vec![Node::new("n1", json!({}))]))],
            active_slide_id: Some("s1".into()),
            selected_node: Some(Arc::new(SelectedNode {
                node_id: "n1".into(),
                diagram_id: Some("d1".into()),
                node_data: json!({}),
                selected_element: None,
            })),
            ..State::default()
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["activeSlideId"], "s1");
        assert_eq!(value["selectedNode"]["diagramId"], "d1");

        let back: State = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
