//! Awaitable element updates.
//!
//! A request subscribes to the target property before dispatching, then waits
//! until the store reports that property holding the requested value or the
//! deadline passes. The subscription is released on every exit path.
//!
//! Values are compared with `serde_json::Value` equality, so an object or
//! array value completes as soon as a structurally equal value lands. A
//! request whose value is already in place never completes: the property
//! does not change, so no notification fires.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::DiagramBridge;
use crate::dispatcher::Action;
use crate::error::{BridgeError, Result};
use crate::locator::element_property;
use crate::model::State;

/// Successful outcome of [`DiagramBridge::request_element_update`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdateOutcome {
    pub element_id: String,
    pub property: String,
    pub value: Value,
    /// Time from the request until the store reported the new value.
    /// Serialized as whole milliseconds.
    #[serde(rename = "elapsedTime", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

impl DiagramBridge {
    /// Dispatch an element property update and wait until it is observed in
    /// the store.
    ///
    /// `timeout` defaults to [`BridgeConfig::update_timeout`](crate::BridgeConfig).
    /// Fails with [`BridgeError::Timeout`] when the element is missing or the
    /// update never lands, and with [`BridgeError::InvalidArgument`] when the
    /// dispatch itself is rejected.
    pub async fn request_element_update(
        &self,
        element_id: impl Into<String>,
        property: impl Into<String>,
        value: Value,
        timeout: Option<Duration>,
    ) -> Result<ElementUpdateOutcome> {
        let element_id = element_id.into();
        let property = property.into();
        let timeout = timeout.unwrap_or(self.config.update_timeout);
        let started = Instant::now();

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let expected = Some(value.clone());
        let (watched_id, watched_property) = (element_id.clone(), property.clone());

        let _subscription = self
            .store
            .subscribe(
                move |state: &State| element_property(state, &watched_id, &watched_property),
                move |current: &Option<Value>, _: &State| {
                    if *current == expected {
                        if let Some(tx) = tx.lock().take() {
                            let _ = tx.send(());
                        }
                    }
                },
            )
            .guard();

        self.dispatch(Action::update_element_property(
            element_id.clone(),
            property.clone(),
            value.clone(),
        ))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(())) => Ok(ElementUpdateOutcome {
                element_id,
                property,
                value,
                elapsed: started.elapsed(),
            }),
            Ok(Err(_)) => Err(BridgeError::Shutdown { element_id }),
            Err(_) => {
                log::warn!(
                    "[DiagramBridge] update of `{property}` on `{element_id}` not observed within {timeout:?}"
                );
                Err(BridgeError::Timeout {
                    element_id,
                    property,
                    timeout,
                })
            }
        }
    }
}
