//! Merge engine folding configuration layers into one aggregate.
//!
//! Layers are folded bottom (oldest) to top (newest). For every key present
//! on either side of a merge:
//! - Keys present on one side only are kept (additive; absence never deletes)
//! - Mappings on both sides are merged recursively
//! - Leaves on both sides are handed to a [`ConflictResolver`]
//! - Sequences are leaves: the later sequence replaces the earlier one
//!
//! The default [`StackResolver`] lets the later value win, except that a null
//! never overrides a concrete value and a string ending in `!` pins the earlier
//! value. Pinned values keep their marker in the raw aggregate so they keep
//! winning when further layers are folded on later; [`strip_force_markers`]
//! produces the view handed to readers.

use serde_json::Value;

use crate::tree::{join_key, Tree};

/// Trailing character pinning a string value against later layers.
pub const FORCE_MARKER: char = '!';

/// Decides the value of a key that holds a leaf on both sides of a merge.
pub trait ConflictResolver {
    /// `left` comes from the earlier layers, `right` from the layer being folded on.
    fn resolve(&self, key: &str, left: Value, right: Value) -> Value;
}

/// Later values win, but a null never overrides a concrete value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveResolver;

impl ConflictResolver for AdditiveResolver {
    fn resolve(&self, _key: &str, left: Value, right: Value) -> Value {
        if right.is_null() && !left.is_null() {
            left
        } else {
            right
        }
    }
}

/// [`AdditiveResolver`] plus forced-override markers on the earlier side.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackResolver {
    additive: AdditiveResolver,
}

impl ConflictResolver for StackResolver {
    fn resolve(&self, key: &str, left: Value, right: Value) -> Value {
        if is_forced(&left) {
            tracing::trace!(key, "forced value rejected override");
            return left;
        }
        self.additive.resolve(key, left, right)
    }
}

/// Whether a value carries the forced-override marker.
pub fn is_forced(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.ends_with(FORCE_MARKER))
}

/// Merge `layer` onto `base` using `resolver` for leaf conflicts.
pub fn merge_trees_with<R>(resolver: &R, base: Tree, layer: &Tree) -> Tree
where
    R: ConflictResolver + ?Sized,
{
    merge_maps(resolver, "", base, layer)
}

/// Merge `layer` onto `base` with the default [`StackResolver`].
pub fn merge_trees(base: Tree, layer: &Tree) -> Tree {
    merge_trees_with(&StackResolver::default(), base, layer)
}

/// Fold `layers` in order onto a pre-aggregated `base`.
pub fn fold_layers_with<'a, R, I>(resolver: &R, base: Tree, layers: I) -> Tree
where
    R: ConflictResolver + ?Sized,
    I: IntoIterator<Item = &'a Tree>,
{
    layers
        .into_iter()
        .fold(base, |aggregate, layer| merge_maps(resolver, "", aggregate, layer))
}

/// Fold `layers` in order onto an empty tree with the default resolver.
pub fn fold_layers<'a, I>(layers: I) -> Tree
where
    I: IntoIterator<Item = &'a Tree>,
{
    fold_layers_with(&StackResolver::default(), Tree::new(), layers)
}

/// Copy of `tree` with one trailing force marker removed from every string leaf.
///
/// Strings inside sequences are left untouched.
pub fn strip_force_markers(tree: &Tree) -> Tree {
    tree.iter()
        .map(|(key, value)| (key.clone(), strip_value(value)))
        .collect()
}

fn strip_value(value: &Value) -> Value {
    match value {
        Value::String(s) => match s.strip_suffix(FORCE_MARKER) {
            Some(stripped) => Value::String(stripped.to_string()),
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(strip_force_markers(map)),
        other => other.clone(),
    }
}

fn merge_maps<R>(resolver: &R, prefix: &str, mut left: Tree, right: &Tree) -> Tree
where
    R: ConflictResolver + ?Sized,
{
    for (key, right_value) in right {
        match left.get_mut(key) {
            Some(slot) => {
                let left_value = std::mem::take(slot);
                *slot = merge_value(resolver, &join_key(prefix, key), left_value, right_value);
            }
            None => {
                left.insert(key.clone(), right_value.clone());
            }
        }
    }
    left
}

fn merge_value<R>(resolver: &R, key: &str, left: Value, right: &Value) -> Value
where
    R: ConflictResolver + ?Sized,
{
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            Value::Object(merge_maps(resolver, key, left_map, right_map))
        }
        (left, right) => resolver.resolve(key, left, right.clone()),
    }
}
