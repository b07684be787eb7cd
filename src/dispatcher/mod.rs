//! Single entry point for state and registry changes.
//!
//! Each action performs one store or registry mutation and then announces it
//! on the event bus. `UpdateElementProperty` is the only multi-step action:
//! it locates the element across all slides, patches the owning node's data
//! and splices the new node back in, sharing every other slide and node with
//! the previous state. A miss at any lookup step is logged and leaves state
//! and bus untouched.

mod action;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::events::event_bus::panic_message;
use crate::events::{names, EventBus};
use crate::locator::{self, find_in_slides};
use crate::model::{SelectedNode, Slide, StatePatch, BASE_FLOATER_CONFIG, INLINE_FLOATER_CONFIG};
use crate::registry::Registry;
use crate::store::Store;

pub use action::{Action, CompletionCallback};

/// Routes actions to the store and registry and re-broadcasts the result.
#[derive(Clone)]
pub struct Dispatcher {
    store: Store,
    registry: Arc<Registry>,
    bus: EventBus,
    config: BridgeConfig,
}

impl Dispatcher {
    pub fn new(store: Store, registry: Arc<Registry>, bus: EventBus, config: BridgeConfig) -> Self {
        Self {
            store,
            registry,
            bus,
            config,
        }
    }

    /// Apply `action`.
    ///
    /// Only an invalid-argument failure from the element update primitive is
    /// returned; every other problem is logged and the action is dropped.
    /// An element that is the whole data tree of its node counts as a
    /// lookup miss.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        log::trace!("[Dispatcher] {}", action.kind());

        match action {
            Action::SetSlides { slides } => {
                let payload = to_payload(&slides);
                self.store.set_state(StatePatch::new().slides(slides));
                self.bus.emit(names::SLIDES_CHANGED, payload);
            }
            Action::SetActiveSlide { slide_id } => {
                self.store
                    .set_state(StatePatch::new().active_slide_id(slide_id.clone()));
                self.bus.emit(names::ACTIVE_SLIDE_CHANGED, json!(slide_id));
            }
            Action::UpdateSlideData { slide_id, data } => {
                self.update_slide_data(&slide_id, &data);
                self.bus.emit(
                    names::SLIDE_UPDATED,
                    json!({ "slideId": slide_id, "data": data }),
                );
            }
            Action::SetBaseFloaterConfig { config } => {
                self.set_ui(BASE_FLOATER_CONFIG, config.clone());
                self.bus.emit(names::BASE_FLOATER_CONFIG_CHANGED, config);
            }
            Action::SetInlineFloaterConfig { config } => {
                self.set_ui(INLINE_FLOATER_CONFIG, config.clone());
                self.bus.emit(names::INLINE_FLOATER_CONFIG_CHANGED, config);
            }
            Action::RegisterDiagram { entry } => {
                self.registry.register(&entry);
                self.bus.emit(names::DIAGRAM_REGISTERED, to_payload(&entry));
            }
            Action::UnregisterDiagram { diagram_id } => {
                self.registry.unregister(&diagram_id);
                self.bus.emit(names::DIAGRAM_UNREGISTERED, json!(diagram_id));
            }
            Action::UpdateCapabilities {
                diagram_id,
                capabilities,
            } => {
                self.registry
                    .update_capabilities(&diagram_id, capabilities.clone());
                self.bus.emit(
                    names::CAPABILITIES_UPDATED,
                    json!({ "diagramId": diagram_id, "capabilities": capabilities }),
                );
            }
            Action::SetSelectedNode {
                node_id,
                diagram_id,
                node_data,
                selected_element,
            } => {
                let selected = node_id.clone().map(|node_id| SelectedNode {
                    node_id,
                    diagram_id: diagram_id.clone(),
                    node_data: node_data.unwrap_or(Value::Null),
                    selected_element: selected_element.clone(),
                });
                self.store
                    .set_state(StatePatch::new().selected_node(selected));
                self.bus.emit(
                    names::NODE_SELECTED,
                    json!({
                        "nodeId": node_id,
                        "diagramId": diagram_id,
                        "selectedElement": selected_element,
                    }),
                );
            }
            Action::UpdateElementProperty {
                element_id,
                property,
                value,
                on_complete,
            } => {
                self.update_element_property(&element_id, &property, value, on_complete)?;
            }
            command @ Action::DiagramCommand { .. } => self.forward_command(&command),
        }

        Ok(())
    }

    /// Decode a raw tagged record and dispatch it. Records that do not
    /// decode to a known action are ignored.
    pub fn dispatch_value(&self, raw: Value) -> Result<()> {
        match serde_json::from_value::<Action>(raw) {
            Ok(action) => self.dispatch(action),
            Err(err) => {
                log::debug!("[Dispatcher] ignoring unrecognised action: {err}");
                Ok(())
            }
        }
    }

    fn set_ui(&self, key: &str, config: Value) {
        self.store.update_state(|state| {
            let ui = state.ui_with(key, config);
            state.merged(StatePatch {
                ui: Some(ui),
                ..StatePatch::default()
            })
        });
    }

    fn update_slide_data(&self, slide_id: &str, data: &Map<String, Value>) {
        self.store.update_state(|state| {
            let slides = state
                .slides
                .iter()
                .map(|slide| {
                    if slide.id != slide_id {
                        return slide.clone();
                    }
                    match slide.merged(data) {
                        Ok(merged) => Arc::new(merged),
                        Err(err) => {
                            log::warn!(
                                "[Dispatcher] slide `{slide_id}` left unchanged, merged data is invalid: {err}"
                            );
                            slide.clone()
                        }
                    }
                })
                .collect();
            state.merged(StatePatch::new().slides(slides))
        });
    }

    fn update_element_property(
        &self,
        element_id: &str,
        property: &str,
        value: Value,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        let state = self.store.get_state();
        let Some(location) = find_in_slides(&state.slides, element_id) else {
            log::warn!("[Dispatcher] element `{element_id}` not found in any slide, update skipped");
            return Ok(());
        };

        if self.config.enforce_unique_ids {
            if let Err(err) = locator::ensure_unique_ids(&location.node.data) {
                log::warn!(
                    "[Dispatcher] node `{}` rejected for update of `{element_id}`: {err}",
                    location.node.id
                );
                return Ok(());
            }
        }

        let Some(path) = locator::path(&location.node.data, element_id) else {
            log::warn!(
                "[Dispatcher] no path to element `{element_id}` in node `{}`, update skipped",
                location.node.id
            );
            return Ok(());
        };

        // The update primitive addresses an element through its parent, so a
        // node whose data root is the element itself cannot be patched.
        if path.is_empty() {
            log::warn!(
                "[Dispatcher] element `{element_id}` is the data root of node `{}`, update skipped",
                location.node.id
            );
            return Ok(());
        }

        let data = locator::update(&location.node.data, &path, property, value.clone())?;
        let slide_id = location.slide.id.clone();
        let node_id = location.node.id.clone();
        let node = Arc::new(location.node.with_data(data));
        drop(state);

        self.store.update_state(|current| {
            let slides = current
                .slides
                .iter()
                .map(|slide| {
                    if slide.id != slide_id {
                        return slide.clone();
                    }
                    let nodes = slide
                        .nodes
                        .iter()
                        .map(|n| if n.id == node_id { node.clone() } else { n.clone() })
                        .collect();
                    Arc::new(Slide {
                        id: slide.id.clone(),
                        nodes,
                        extra: slide.extra.clone(),
                    })
                })
                .collect();
            current.merged(StatePatch::new().slides(slides))
        });

        self.bus.emit(
            names::ELEMENT_PROPERTY_UPDATED,
            json!({
                "elementId": element_id,
                "property": property,
                "value": value,
                "slideId": slide_id,
                "nodeId": node_id,
            }),
        );

        if let Some(callback) = on_complete {
            defer(callback);
        }
        Ok(())
    }

    fn forward_command(&self, command: &Action) {
        if let Action::DiagramCommand {
            target_diagram_id, ..
        } = command
        {
            self.bus
                .emit(&names::diagram_command(target_diagram_id), to_payload(command));
        }
    }
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        log::warn!("[Dispatcher] event payload could not be serialized: {err}");
        Value::Null
    })
}

/// Run `callback` on a later scheduler turn when a tokio runtime is
/// available, otherwise right away.
fn defer(callback: CompletionCallback) {
    let run = move || {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback.call())) {
            log::error!(
                "[Dispatcher] completion callback panicked: {}",
                panic_message(&panic)
            );
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { run() });
        }
        Err(_) => run(),
    }
}
