//! Field-mask updates of JSON documents.
//!
//! Mask paths are parsed into a tree, then the patch and the tree are walked
//! together, copying each selected leaf from the patch onto the current
//! document. A selected leaf that is absent from the patch is cleared.

use std::collections::BTreeMap;

use grafeas_elasticsearch_shared::FieldMask;
use serde_json::{Map, Value};

use crate::errors::StorageError;

/// Selected fields below one level of a document. A node without children
/// selects the whole subtree.
#[derive(Debug, Default, PartialEq, Eq)]
struct MaskTree {
    children: BTreeMap<String, MaskTree>,
}

impl MaskTree {
    fn parse(mask: &FieldMask) -> Result<Self, StorageError> {
        let mut root = MaskTree::default();
        for path in &mask.paths {
            let segments: Vec<&str> = path.split('.').collect();
            for segment in &segments {
                validate_segment(path, segment)?;
            }
            root.insert(&segments);
        }
        Ok(root)
    }

    fn insert(&mut self, segments: &[&str]) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let existing = self.children.contains_key(*first);
        let child = self.children.entry((*first).to_string()).or_default();
        if rest.is_empty() {
            // A shorter path selects everything a longer one would.
            child.children.clear();
        } else if !existing || !child.children.is_empty() {
            child.insert(rest);
        }
    }
}

fn validate_segment(path: &str, segment: &str) -> Result<(), StorageError> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_argument(format!(
            "invalid field mask path '{}'",
            path
        )))
    }
}

/// `cvss_score` -> `cvssScore`
fn lower_camel(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper = false;
    for c in segment.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// The document key a mask segment refers to.
///
/// A segment matches a key spelled the same way or its JSON name.
fn resolve_key(segment: &str, patch: Option<&Map<String, Value>>, current: &Map<String, Value>) -> String {
    let camel = lower_camel(segment);
    for candidate in [segment, camel.as_str()] {
        if patch.is_some_and(|p| p.contains_key(candidate)) || current.contains_key(candidate) {
            return candidate.to_string();
        }
    }
    camel
}

fn merge(tree: &MaskTree, current: &mut Map<String, Value>, patch: Option<&Map<String, Value>>) {
    for (segment, subtree) in &tree.children {
        let key = resolve_key(segment, patch, current);
        let patch_value = patch.and_then(|p| p.get(&key));

        if subtree.children.is_empty() {
            match patch_value {
                Some(value) => {
                    current.insert(key, value.clone());
                }
                None => {
                    current.remove(&key);
                }
            }
            continue;
        }

        let patch_child = patch_value.and_then(Value::as_object);
        if patch_child.is_none() && !current.get(&key).is_some_and(Value::is_object) {
            // Nothing to copy and nothing to clear.
            continue;
        }
        let slot = current
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(child) = slot {
            merge(subtree, child, patch_child);
        }
    }
}

/// Copy the fields selected by `mask` from `patch` onto `current`.
///
/// # Returns
///
/// * `Ok(Value)` - The merged document
/// * `Err(StorageError::InvalidArgument)` - If a path in the mask is malformed
pub fn apply_field_mask(current: &Value, patch: &Value, mask: &FieldMask) -> Result<Value, StorageError> {
    let tree = MaskTree::parse(mask)?;
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    merge(&tree, &mut merged, patch.as_object());
    Ok(Value::Object(merged))
}
