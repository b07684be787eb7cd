//! The composed bridge: one store, one registry, one event bus and the
//! dispatcher that ties them together.
//!
//! Hosts normally build a [`DiagramBridge`] once at startup and hand clones
//! to every diagram library. Libraries that are loaded independently and
//! cannot be handed an instance use [`DiagramBridge::global`], the single
//! process-wide instance published under [`BRIDGE_GLOBAL_KEY`].

mod completion;
pub mod selectors;

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::BridgeConfig;
use crate::dispatcher::{Action, Dispatcher};
use crate::dispose::{Disposer, HandlerId};
use crate::error::Result;
use crate::events::EventBus;
use crate::model::{Slide, State, StatePatch};
use crate::registry::{DiagramRegistration, Registry, RegistryEntry};
use crate::store::Store;

pub use completion::ElementUpdateOutcome;

/// Name under which the process-wide bridge is published.
pub const BRIDGE_GLOBAL_KEY: &str = "__diagram_bridge__";

static GLOBAL_BRIDGE: OnceLock<DiagramBridge> = OnceLock::new();

/// Handle to one bridge instance. Clones share every part.
#[derive(Clone)]
pub struct DiagramBridge {
    store: Store,
    registry: Arc<Registry>,
    bus: EventBus,
    dispatcher: Dispatcher,
    config: BridgeConfig,
}

impl Default for DiagramBridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl DiagramBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let store = Store::default();
        let registry = Arc::new(Registry::new());
        let bus = EventBus::new();
        let dispatcher = Dispatcher::new(
            store.clone(),
            registry.clone(),
            bus.clone(),
            config.clone(),
        );
        Self {
            store,
            registry,
            bus,
            dispatcher,
            config,
        }
    }

    /// The process-wide bridge, created from [`BridgeConfig::from_env`] on
    /// first access.
    pub fn global() -> &'static DiagramBridge {
        GLOBAL_BRIDGE.get_or_init(|| {
            log::debug!("[DiagramBridge] publishing process-wide instance as `{BRIDGE_GLOBAL_KEY}`");
            Self::new(BridgeConfig::from_env())
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // -- state -------------------------------------------------------------

    pub fn get_state(&self) -> Arc<State> {
        self.store.get_state()
    }

    /// See [`Store::set_state`].
    pub fn set_state(&self, patch: StatePatch) -> u64 {
        self.store.set_state(patch)
    }

    /// See [`Store::update_state`].
    pub fn update_state(&self, f: impl FnOnce(&State) -> State) -> u64 {
        self.store.update_state(f)
    }

    /// See [`Store::subscribe`].
    pub fn subscribe<T, S, L>(&self, selector: S, listener: L) -> Disposer
    where
        T: PartialEq + Clone + Send + 'static,
        S: Fn(&State) -> T + Send + Sync + 'static,
        L: Fn(&T, &State) + Send + Sync + 'static,
    {
        self.store.subscribe(selector, listener)
    }

    /// See [`Store::subscribe_with`].
    pub fn subscribe_with<T, S, L, E>(&self, selector: S, listener: L, equals: E) -> Disposer
    where
        T: Clone + Send + 'static,
        S: Fn(&State) -> T + Send + Sync + 'static,
        L: Fn(&T, &State) + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.store.subscribe_with(selector, listener, equals)
    }

    /// See [`Store::subscribe_state`].
    pub fn subscribe_state(&self, listener: impl Fn(&State, &State) + Send + Sync + 'static) -> Disposer {
        self.store.subscribe_state(listener)
    }

    // -- actions and events ------------------------------------------------

    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatcher.dispatch(action)
    }

    pub fn dispatch_value(&self, raw: Value) -> Result<()> {
        self.dispatcher.dispatch_value(raw)
    }

    pub fn on(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Disposer {
        self.bus.on(event, handler)
    }

    pub fn off(&self, event: &str, handler_id: &HandlerId) -> bool {
        self.bus.off(event, handler_id)
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.bus.emit(event, payload);
    }

    // -- registry ----------------------------------------------------------

    pub fn register_diagram(&self, entry: DiagramRegistration) {
        self.dispatch_registry(Action::RegisterDiagram { entry });
    }

    pub fn unregister_diagram(&self, diagram_id: impl Into<String>) {
        self.dispatch_registry(Action::UnregisterDiagram {
            diagram_id: diagram_id.into(),
        });
    }

    pub fn update_capabilities<I, S>(&self, diagram_id: impl Into<String>, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dispatch_registry(Action::UpdateCapabilities {
            diagram_id: diagram_id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        });
    }

    pub fn get_diagram(&self, diagram_id: &str) -> Option<RegistryEntry> {
        self.registry.get(diagram_id)
    }

    pub fn get_all_diagrams(&self) -> Vec<RegistryEntry> {
        self.registry.get_all()
    }

    // Registry actions never touch the element update path, so they cannot fail.
    fn dispatch_registry(&self, action: Action) {
        if let Err(err) = self.dispatcher.dispatch(action) {
            log::warn!("[DiagramBridge] registry action failed: {err}");
        }
    }

    // -- selectors ---------------------------------------------------------

    /// Active slide of `state`, or of the current state when `None`.
    pub fn active_slide(&self, state: Option<&State>) -> Option<Arc<Slide>> {
        match state {
            Some(state) => selectors::active_slide(state),
            None => selectors::active_slide(&self.get_state()),
        }
    }

    /// Registry record for the selected node's diagram in `state`, or in the
    /// current state when `None`.
    pub fn active_diagram_entry(&self, state: Option<&State>) -> Option<RegistryEntry> {
        match state {
            Some(state) => selectors::active_diagram_entry(state, &self.registry),
            None => selectors::active_diagram_entry(&self.get_state(), &self.registry),
        }
    }
}
