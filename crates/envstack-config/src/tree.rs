//! The configuration tree and dotted key paths.
//!
//! A tree is an insertion-ordered mapping of string keys to JSON values.
//! Nested mappings are addressed with dotted keys such as `logging.verbosity`.

use serde_json::{Map, Value};

/// An ordered, nested mapping from string keys to values.
pub type Tree = Map<String, Value>;

/// Separator between the components of a key path.
pub const KEY_SEPARATOR: char = '.';

/// Key addressing the whole tree.
pub const ROOT_KEY: &str = "";

/// Split a dotted key into its components, skipping empty ones.
pub fn split_key(key: &str) -> impl Iterator<Item = &str> {
    key.split(KEY_SEPARATOR).filter(|part| !part.is_empty())
}

/// Join a parent path and a child name.
pub fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, KEY_SEPARATOR, name)
    }
}

/// Look up the value at a dotted key. The root key has no value of its own.
pub fn get<'a>(tree: &'a Tree, key: &str) -> Option<&'a Value> {
    let mut parts = split_key(key);
    let mut current = tree.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Look up the mapping at a dotted key; the root key yields the tree itself.
pub fn get_tree<'a>(tree: &'a Tree, key: &str) -> Option<&'a Tree> {
    if split_key(key).next().is_none() {
        return Some(tree);
    }
    get(tree, key)?.as_object()
}

/// Set the value at a dotted key, creating intermediate mappings.
///
/// Intermediate values that are not mappings are replaced.
pub fn set(tree: &mut Tree, key: &str, value: Value) {
    let parts: Vec<&str> = split_key(key).collect();
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = tree;
    for part in parents {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// Short description of a value's kind for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Convert a JSON value into a tree, if it is a mapping.
pub fn into_tree(value: Value) -> Option<Tree> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => Some(Tree::new()),
        _ => None,
    }
}
