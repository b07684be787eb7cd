//! Bridge configuration.
//!
//! Defaults can be overridden from the environment at startup with
//! [`BridgeConfig::from_env`], or set directly by the host.

use std::time::Duration;

/// Environment variable holding the default completion timeout in milliseconds.
pub const UPDATE_TIMEOUT_ENV: &str = "DIAGRAM_BRIDGE_UPDATE_TIMEOUT_MS";

/// Environment variable toggling duplicate-id rejection for element updates.
pub const ENFORCE_UNIQUE_IDS_ENV: &str = "DIAGRAM_BRIDGE_ENFORCE_UNIQUE_IDS";

/// Default time to wait for an element update to be observed.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Runtime configuration shared by the dispatcher and the completion protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Default timeout for [`request_element_update`](crate::DiagramBridge::request_element_update).
    pub update_timeout: Duration,
    /// Reject element updates into node data that repeats an element id.
    pub enforce_unique_ids: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            enforce_unique_ids: true,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from the process environment, keeping defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(UPDATE_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.update_timeout = Duration::from_millis(ms),
                Err(_) => log::warn!(
                    "[BridgeConfig] ignoring {UPDATE_TIMEOUT_ENV}={raw:?}: not a number of milliseconds"
                ),
            }
        }

        if let Some(raw) = lookup(ENFORCE_UNIQUE_IDS_ENV) {
            config.enforce_unique_ids = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }

        config
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    pub fn with_unique_ids(mut self, enforce: bool) -> Self {
        self.enforce_unique_ids = enforce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.update_timeout, Duration::from_millis(5000));
        assert!(config.enforce_unique_ids);
    }

    #[test]
    fn test_env_overrides() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (UPDATE_TIMEOUT_ENV, "250"),
            (ENFORCE_UNIQUE_IDS_ENV, "false"),
        ]));
        assert_eq!(config.update_timeout, Duration::from_millis(250));
        assert!(!config.enforce_unique_ids);
    }

    #[test]
    fn test_unparsable_timeout_keeps_default() {
        let config = BridgeConfig::from_lookup(lookup(&[(UPDATE_TIMEOUT_ENV, "soon")]));
        assert_eq!(config.update_timeout, DEFAULT_UPDATE_TIMEOUT);
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::new()
            .with_update_timeout(Duration::from_millis(10))
            .with_unique_ids(false);
        assert_eq!(config.update_timeout, Duration::from_millis(10));
        assert!(!config.enforce_unique_ids);
    }
}
