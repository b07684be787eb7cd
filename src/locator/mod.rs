//! Identity-based lookup and update inside diagram-owned data trees.
//!
//! Node data has no shared schema. Anything reachable in the tree that is an
//! object with a string `id` is a candidate element. [`find`] tries a few
//! common layouts first and falls back to a full depth-first walk, which is
//! what makes it correct for shapes nobody anticipated.
//!
//! Ids are expected to be unique within one tree. When they are not, every
//! function here returns the first match in its own search order;
//! [`ensure_unique_ids`] exists so callers can reject such trees up front.

mod search;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

pub use search::{element_property, find_in_slides, ElementLocation};

/// One step from a container to a child: an array index or an object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

fn has_id(value: &Value, element_id: &str) -> bool {
    value.get("id").and_then(Value::as_str) == Some(element_id)
}

fn find_in_array<'a>(items: Option<&'a Value>, element_id: &str) -> Option<&'a Value> {
    items?
        .as_array()?
        .iter()
        .find(|item| has_id(item, element_id))
}

// `{ elements: [..] }`
fn find_flat<'a>(data: &'a Value, element_id: &str) -> Option<&'a Value> {
    find_in_array(data.get("elements"), element_id)
}

// `{ group: { elements: [..] } }`
fn find_grouped<'a>(data: &'a Value, element_id: &str) -> Option<&'a Value> {
    find_in_array(data.get("group")?.get("elements"), element_id)
}

// `{ container: { items: [..] } }`
fn find_contained<'a>(data: &'a Value, element_id: &str) -> Option<&'a Value> {
    find_in_array(data.get("container")?.get("items"), element_id)
}

// `{ groups: [{ elements: [..] }, ..] }`
fn find_in_groups<'a>(data: &'a Value, element_id: &str) -> Option<&'a Value> {
    data.get("groups")?
        .as_array()?
        .iter()
        .find_map(|group| find_in_array(group.get("elements"), element_id))
}

/// Depth-first, pre-order: a node is checked before its children, array
/// items in index order, object values in key order.
fn find_deep<'a>(value: &'a Value, element_id: &str) -> Option<&'a Value> {
    if has_id(value, element_id) {
        return Some(value);
    }
    match value {
        Value::Array(items) => items.iter().find_map(|item| find_deep(item, element_id)),
        Value::Object(fields) => fields.values().find_map(|child| find_deep(child, element_id)),
        _ => None,
    }
}

/// Find the element with `element_id` anywhere in `node_data`.
///
/// The returned reference points into `node_data`.
pub fn find<'a>(node_data: &'a Value, element_id: &str) -> Option<&'a Value> {
    find_flat(node_data, element_id)
        .or_else(|| find_grouped(node_data, element_id))
        .or_else(|| find_contained(node_data, element_id))
        .or_else(|| find_in_groups(node_data, element_id))
        .or_else(|| find_deep(node_data, element_id))
}

/// The keys/indices leading from the root of `node_data` to the element.
///
/// Always walks the whole tree in the same order as the fallback search of
/// [`find`]. A root that is itself the element yields an empty path.
pub fn path(node_data: &Value, element_id: &str) -> Option<Vec<PathSegment>> {
    fn walk(value: &Value, element_id: &str, trail: &mut Vec<PathSegment>) -> bool {
        if has_id(value, element_id) {
            return true;
        }
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    trail.push(PathSegment::Index(index));
                    if walk(item, element_id, trail) {
                        return true;
                    }
                    trail.pop();
                }
                false
            }
            Value::Object(fields) => {
                for (key, child) in fields {
                    trail.push(PathSegment::Key(key.clone()));
                    if walk(child, element_id, trail) {
                        return true;
                    }
                    trail.pop();
                }
                false
            }
            _ => false,
        }
    }

    let mut trail = Vec::new();
    walk(node_data, element_id, &mut trail).then_some(trail)
}

/// Follow `path` from `root`.
pub fn resolve<'a>(root: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(root, |current, segment| match segment {
        PathSegment::Index(index) => current.as_array()?.get(*index),
        PathSegment::Key(key) => current.as_object()?.get(key),
    })
}

/// Return a copy of `node_data` where the object at `path` has
/// `properties[property] = value`.
///
/// Other properties of that object are preserved; a missing or non-object
/// `properties` field is replaced by a fresh mapping. The input is never
/// modified. The target is not checked for an `id`.
pub fn update(
    node_data: &Value,
    path: &[PathSegment],
    property: &str,
    value: Value,
) -> Result<Value> {
    if node_data.is_null() {
        return Err(BridgeError::invalid("node data is required"));
    }
    if path.is_empty() {
        return Err(BridgeError::invalid("path must not be empty"));
    }
    if property.is_empty() {
        return Err(BridgeError::invalid("property name is required"));
    }

    let mut root = node_data.clone();
    let mut target = &mut root;
    for segment in path {
        let next = match (segment, target) {
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            (PathSegment::Key(key), Value::Object(fields)) => fields.get_mut(key),
            _ => None,
        };
        target = next.ok_or_else(|| {
            BridgeError::invalid(format!("path segment `{segment}` does not resolve"))
        })?;
    }

    let Value::Object(element) = target else {
        return Err(BridgeError::invalid("path does not lead to an object"));
    };

    match element
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(properties) => {
            properties.insert(property.to_owned(), value);
        }
        other => {
            let mut properties = Map::new();
            properties.insert(property.to_owned(), value);
            *other = Value::Object(properties);
        }
    }

    Ok(root)
}

/// Fail on the first element id that appears twice (pre-order).
pub fn ensure_unique_ids(node_data: &Value) -> Result<()> {
    fn walk<'a>(value: &'a Value, seen: &mut HashSet<&'a str>) -> Result<()> {
        if let Some(id) = value.get("id").and_then(Value::as_str) {
            if !seen.insert(id) {
                return Err(BridgeError::DuplicateElementId {
                    element_id: id.to_owned(),
                });
            }
        }
        match value {
            Value::Array(items) => items.iter().try_for_each(|item| walk(item, seen)),
            Value::Object(fields) => fields.values().try_for_each(|child| walk(child, seen)),
            _ => Ok(()),
        }
    }

    walk(node_data, &mut HashSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> PathSegment {
        PathSegment::Key(name.to_owned())
    }

    fn idx(index: usize) -> PathSegment {
        PathSegment::Index(index)
    }

    fn element(id: &str) -> Value {
        json!({ "id": id, "properties": { "visible": true, "color": "red" } })
    }

    fn shapes() -> Vec<Value> {
        vec![
            json!({ "elements": [element("a"), element("e")] }),
            json!({ "group": { "elements": [element("a"), element("e")] } }),
            json!({ "container": { "items": [element("e")] } }),
            json!({ "groups": [{ "elements": [element("a")] }, { "elements": [element("e")] }] }),
            json!({ "layers": { "top": [{ "children": { "deep": [element("e")] } }] } }),
            json!([{ "rows": [element("a")] }, [element("e")]]),
        ]
    }

    #[test]
    fn test_find_returns_reference_into_tree_for_every_shape() {
        for tree in shapes() {
            let found = find(&tree, "e").expect("element");
            let path = path(&tree, "e").expect("path");
            let resolved = resolve(&tree, &path).expect("resolved");
            assert!(std::ptr::eq(found, resolved), "find/path disagree in {tree}");
            assert_eq!(found["id"], "e");
        }
    }

    #[test]
    fn test_find_missing_element() {
        for tree in shapes() {
            assert!(find(&tree, "missing").is_none());
            assert!(path(&tree, "missing").is_none());
        }
    }

    #[test]
    fn test_path_shape() {
        let tree = json!({ "groups": [{ "elements": [element("a")] }, { "elements": [element("e")] }] });
        let path = path(&tree, "e").unwrap();
        assert_eq!(
            path,
            vec![
                key("groups"),
                idx(1),
                key("elements"),
                idx(0),
            ]
        );
        assert_eq!(serde_json::to_value(&path).unwrap(), json!(["groups", 1, "elements", 0]));
    }

    #[test]
    fn test_deep_search_checks_parent_before_children() {
        let tree = json!({ "wrapper": { "id": "e", "inner": { "id": "e", "properties": {} } } });
        let found = find(&tree, "e").unwrap();
        assert!(found.get("inner").is_some());
        assert_eq!(path(&tree, "e").unwrap(), vec![key("wrapper")]);
    }

    #[test]
    fn test_non_string_ids_do_not_match() {
        let tree = json!({ "elements": [{ "id": 7, "properties": {} }] });
        assert!(find(&tree, "7").is_none());
    }

    #[test]
    fn test_update_sets_property_and_preserves_others() {
        for tree in shapes() {
            let path = path(&tree, "e").unwrap();
            let updated = update(&tree, &path, "visible", json!(false)).unwrap();

            let element = find(&updated, "e").unwrap();
            assert_eq!(element["properties"]["visible"], false);
            assert_eq!(element["properties"]["color"], "red");

            if let Some(other) = find(&tree, "a") {
                assert_eq!(find(&updated, "a"), Some(other));
            }
        }
    }

    #[test]
    fn test_update_never_mutates_input() {
        let tree = json!({ "group": { "elements": [element("e")] } });
        let before = tree.clone();
        let path = path(&tree, "e").unwrap();
        let updated = update(&tree, &path, "visible", json!(false)).unwrap();
        assert_eq!(tree, before);
        assert_ne!(updated, before);
    }

    #[test]
    fn test_update_creates_missing_properties() {
        let tree = json!({ "elements": [{ "id": "e" }, { "id": "f", "properties": 3 }] });
        let updated = update(&tree, &[key("elements"), idx(0)], "label", json!("x")).unwrap();
        assert_eq!(updated["elements"][0]["properties"], json!({ "label": "x" }));

        let updated = update(&tree, &[key("elements"), idx(1)], "label", json!("y")).unwrap();
        assert_eq!(updated["elements"][1]["properties"], json!({ "label": "y" }));
    }

    #[test]
    fn test_update_rejects_missing_arguments() {
        let tree = json!({ "elements": [element("e")] });
        let path = vec![key("elements"), idx(0)];

        let err = update(&Value::Null, &path, "visible", json!(true)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));

        let err = update(&tree, &[], "visible", json!(true)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));

        let err = update(&tree, &path, "", json!(true)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_update_rejects_unresolvable_path() {
        let tree = json!({ "elements": [element("e")] });
        let err = update(&tree, &[key("elements"), idx(4)], "visible", json!(true)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidArgument("path segment `4` does not resolve".into())
        );

        let err = update(&tree, &[key("elements")], "visible", json!(true)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidArgument("path does not lead to an object".into())
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let tree = json!({ "meta": { "id": "x" }, "elements": [{ "id": "x" }] });

        // Fast path and full walk disagree once ids repeat.
        assert!(std::ptr::eq(find(&tree, "x").unwrap(), &tree["elements"][0]));
        assert_eq!(path(&tree, "x").unwrap(), vec![key("meta")]);

        assert_eq!(
            ensure_unique_ids(&tree),
            Err(BridgeError::DuplicateElementId { element_id: "x".into() })
        );
        for tree in shapes() {
            assert_eq!(ensure_unique_ids(&tree), Ok(()));
        }
    }
}
