use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A diagram instance placed on a slide.
///
/// `data` is owned by the diagram library that renders the node; its shape
/// differs per diagram type and is never validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub data: Value,
    /// Caller-owned fields carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
            extra: Map::new(),
        }
    }

    /// Same node identity and extra fields, with different data.
    pub fn with_data(&self, data: Value) -> Self {
        Self {
            id: self.id.clone(),
            data,
            extra: self.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<Arc<Node>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Slide {
    pub fn new(id: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
            extra: Map::new(),
        }
    }

    /// Shallow-merge `data` over this slide.
    ///
    /// Keys in `data` replace top-level fields wholesale. Only `id` and
    /// `nodes` are decoded; when `data` has no `nodes` key the existing node
    /// `Arc`s are shared with the result.
    pub fn merged(&self, data: &Map<String, Value>) -> Result<Slide, serde_json::Error> {
        let mut slide = self.clone();
        for (key, value) in data {
            match key.as_str() {
                "id" => slide.id = serde_json::from_value(value.clone())?,
                "nodes" => slide.nodes = serde_json::from_value(value.clone())?,
                _ => {
                    slide.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(slide)
    }

    pub fn node(&self, node_id: &str) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|node| node.id == node_id)
    }
}
