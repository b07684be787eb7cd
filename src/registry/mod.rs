//! Registered diagrams and what they can do.
//!
//! Each diagram library registers itself under a diagram id. Repeated
//! registrations merge into the existing record field by field, so a library
//! can first announce itself and later report status or metadata.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored record for one diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub diagram_id: String,
    #[serde(rename = "type", default)]
    pub diagram_type: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryEntry {
    fn empty(diagram_id: String) -> Self {
        Self {
            diagram_id,
            diagram_type: None,
            capabilities: Vec::new(),
            status: None,
            meta: None,
            extra: Map::new(),
        }
    }

    /// Overwrite every field `registration` carries; keep the rest.
    fn merge(&mut self, registration: &DiagramRegistration) {
        if let Some(diagram_type) = &registration.diagram_type {
            self.diagram_type = Some(diagram_type.clone());
        }
        if let Some(capabilities) = &registration.capabilities {
            self.capabilities = capabilities.clone();
        }
        if let Some(status) = &registration.status {
            self.status = Some(status.clone());
        }
        if let Some(meta) = &registration.meta {
            self.meta = Some(meta.clone());
        }
        for (key, value) in &registration.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A (possibly partial) registration as sent by a diagram library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub diagram_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiagramRegistration {
    pub fn new(diagram_id: impl Into<String>) -> Self {
        Self {
            diagram_id: Some(diagram_id.into()),
            ..Self::default()
        }
    }

    pub fn diagram_type(mut self, diagram_type: impl Into<String>) -> Self {
        self.diagram_type = Some(diagram_type.into());
        self
    }

    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Diagram id to record, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<IndexMap<String, RegistryEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the record for `registration.diagram_id`.
    ///
    /// Returns the merged record, or `None` when the registration has no
    /// diagram id (nothing is stored in that case).
    pub fn register(&self, registration: &DiagramRegistration) -> Option<RegistryEntry> {
        let Some(diagram_id) = registration.diagram_id.as_deref().filter(|id| !id.is_empty())
        else {
            log::debug!("[Registry] ignoring registration without a diagram id");
            return None;
        };

        let mut entries = self.entries.write();
        let entry = entries
            .entry(diagram_id.to_owned())
            .or_insert_with(|| RegistryEntry::empty(diagram_id.to_owned()));
        entry.merge(registration);
        Some(entry.clone())
    }

    /// Replace only the capability list. Returns `false` for unknown ids.
    pub fn update_capabilities(&self, diagram_id: &str, capabilities: Vec<String>) -> bool {
        match self.entries.write().get_mut(diagram_id) {
            Some(entry) => {
                entry.capabilities = capabilities;
                true
            }
            None => {
                log::debug!("[Registry] capabilities update for unknown diagram `{diagram_id}`");
                false
            }
        }
    }

    pub fn unregister(&self, diagram_id: &str) -> Option<RegistryEntry> {
        self.entries.write().shift_remove(diagram_id)
    }

    pub fn get(&self, diagram_id: &str) -> Option<RegistryEntry> {
        self.entries.read().get(diagram_id).cloned()
    }

    pub fn get_all(&self) -> Vec<RegistryEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
