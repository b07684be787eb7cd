//! # diagram-bridge
//!
//! Coordination layer between an editor host and independently loaded
//! diagram libraries.
//!
//! The host and every library share one [`DiagramBridge`]: a selector-scoped
//! state [`Store`], a [`Registry`] of loaded diagrams, a synchronous
//! [`EventBus`], and a [`Dispatcher`] that turns tagged [`Action`]s into
//! state changes plus one event each. Diagram content is kept as
//! shape-agnostic JSON trees; the [`locator`] finds and patches elements in
//! them by id, and [`DiagramBridge::request_element_update`] turns an
//! element update into an awaitable request with a timeout.

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod dispose;
pub mod error;
pub mod events;
pub mod locator;
pub mod model;
pub mod registry;
pub mod store;

pub use bridge::{selectors, DiagramBridge, ElementUpdateOutcome, BRIDGE_GLOBAL_KEY};
pub use config::BridgeConfig;
pub use dispatcher::{Action, CompletionCallback, Dispatcher};
pub use dispose::{DisposeGuard, Disposer, HandlerId};
pub use error::{BridgeError, Result};
pub use events::EventBus;
pub use locator::PathSegment;
pub use model::{Node, SelectedNode, Slide, State, StatePatch};
pub use registry::{DiagramRegistration, Registry, RegistryEntry};
pub use store::Store;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Route `log` output through `env_logger` for tests; repeat calls are no-ops.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
