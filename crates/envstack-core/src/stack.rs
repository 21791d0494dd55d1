//! The environment stack.
//!
//! An [`EnvironmentStack`] is a non-empty sequence of [`Environment`] layers,
//! oldest (base) first. It answers two kinds of queries:
//!
//! - `settings()`: the merge of every layer's settings, bottom to top.
//!   The merge is cached. Pushing only marks the cache append-stale, so the
//!   next read folds just the new layers onto the cached aggregate; any
//!   other structural change drops the cache.
//! - `classes()` / `instances()`: capability lookups walking the layers top
//!   to bottom, and each layer's registry newest first.

use std::any::TypeId;
use std::rc::Rc;
use std::sync::Arc;

use envstack_config::merge::{fold_layers_with, strip_force_markers, ConflictResolver, StackResolver};
use envstack_config::tree::{self, Tree};
use envstack_config::SchemaValidator;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::capability::{CapabilityId, Entry, Instance, Plugin, PluginType};
use crate::client::StackClient;
use crate::context::AutoRegisterSuppression;
use crate::environment::Environment;
use crate::error::{StackError, StackResult};
use crate::logging::event_names;

/// Name of the layer a new stack starts with.
pub const BASE_LAYER: &str = "base";

/// State of the merged-settings cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The cache holds the merge of every layer.
    Valid,
    /// Layers were pushed; the cache holds the merge of the first `folded`.
    Stale { folded: usize },
    /// No usable cache; the next read folds every layer.
    Invalid,
}

#[derive(Debug)]
struct Aggregate {
    /// Fold result with forced-override markers, used as the base for further folds.
    raw: Tree,
    /// Markers stripped; what readers see.
    view: Tree,
}

/// Ordered, non-empty sequence of environments with a merged view.
pub struct EnvironmentStack {
    layers: Vec<Environment>,
    aggregate: Option<Aggregate>,
    state: CacheState,
    resolver: Box<dyn ConflictResolver>,
}

impl Default for EnvironmentStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvironmentStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentStack")
            .field("layers", &self.layers)
            .field("state", &self.state)
            .finish()
    }
}

impl EnvironmentStack {
    /// Stack with an empty base layer.
    pub fn new() -> Self {
        Self::with_base(Environment::new(BASE_LAYER))
    }

    /// Stack whose base layer is `base`.
    pub fn with_base(base: Environment) -> Self {
        Self {
            layers: vec![base],
            aggregate: None,
            state: CacheState::Invalid,
            resolver: Box::new(StackResolver::default()),
        }
    }

    /// Use `resolver` for leaf conflicts instead of the default stack rules.
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self.invalidate();
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: the base layer cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Layers, base first.
    pub fn layers(&self) -> &[Environment] {
        &self.layers
    }

    pub fn top(&self) -> &Environment {
        &self.layers[self.layers.len() - 1]
    }

    pub fn cache_state(&self) -> CacheState {
        self.state
    }

    /// Append a layer, created from a name or given whole.
    ///
    /// The cache is not recomputed; the next read folds only the new layers.
    pub fn push(&mut self, environment: impl Into<Environment>) -> &mut Environment {
        let environment = environment.into();
        if self.state == CacheState::Valid {
            self.state = CacheState::Stale {
                folded: self.layers.len(),
            };
        }
        debug!(
            event = event_names::STACK_PUSHED,
            layer = %environment.name(),
            depth = self.layers.len() + 1,
            "pushed environment"
        );
        self.layers.push(environment);
        self.top_mut()
    }

    /// Remove and return the top layer. The base layer cannot be popped.
    pub fn pop(&mut self) -> StackResult<Environment> {
        let len = self.layers.len();
        if len > 1 {
            if let Some(top) = self.layers.pop() {
                self.invalidate();
                debug!(
                    event = event_names::STACK_POPPED,
                    layer = %top.name(),
                    depth = len - 1,
                    "popped environment"
                );
                return Ok(top);
            }
        }
        Err(StackError::StackUnderflow {
            len,
            requested: len.saturating_sub(1),
        })
    }

    /// Pop until `size` layers remain.
    ///
    /// The popped layers are returned base-most first, so pushing them in
    /// order restores the previous stack.
    pub fn pop_until(&mut self, size: usize) -> StackResult<Vec<Environment>> {
        let len = self.layers.len();
        if size == 0 || size > len {
            return Err(StackError::StackUnderflow {
                len,
                requested: size,
            });
        }
        if size == len {
            return Ok(Vec::new());
        }
        let popped = self.layers.split_off(size);
        self.invalidate();
        debug!(
            event = event_names::STACK_POPPED,
            depth = size,
            count = popped.len(),
            "popped environments"
        );
        Ok(popped)
    }

    /// Replace the whole stack with a fresh base layer.
    pub fn reset(&mut self) -> &mut Self {
        self.reset_to(Environment::new(BASE_LAYER))
    }

    /// Replace the whole stack with `base` as its only layer.
    pub fn reset_to(&mut self, base: Environment) -> &mut Self {
        debug!(event = event_names::STACK_RESET, layer = %base.name(), "reset stack");
        self.layers = vec![base];
        self.invalidate();
        self
    }

    /// Replace the top-most layer matching `predicate` in place.
    ///
    /// Returns the replaced layer; the stack keeps its size.
    pub fn replace<P>(&mut self, mut predicate: P, environment: Environment) -> StackResult<Environment>
    where
        P: FnMut(&Environment) -> bool,
    {
        let index = self
            .layers
            .iter()
            .rposition(|layer| predicate(layer))
            .ok_or(StackError::EnvironmentNotFound)?;
        debug!(
            event = event_names::STACK_REPLACED,
            index,
            layer = %environment.name(),
            "replaced environment"
        );
        let replaced = std::mem::replace(&mut self.layers[index], environment);
        self.invalidate();
        Ok(replaced)
    }

    /// Top-most layer matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<&Environment>
    where
        P: FnMut(&Environment) -> bool,
    {
        self.layers.iter().rev().find(|layer| predicate(layer))
    }

    /// The merged settings of every layer.
    ///
    /// The returned tree is a snapshot; change configuration by pushing a layer.
    pub fn settings(&mut self) -> &Tree {
        let aggregate = match (self.state, self.aggregate.take()) {
            (CacheState::Valid, Some(aggregate)) => aggregate,
            (CacheState::Stale { folded }, Some(aggregate)) => self.fold_from(aggregate.raw, folded),
            _ => self.fold_from(Tree::new(), 0),
        };
        self.state = CacheState::Valid;
        &self.aggregate.insert(aggregate).view
    }

    /// Merged value at a dotted key.
    pub fn value(&mut self, key: &str) -> Option<&Value> {
        tree::get(self.settings(), key)
    }

    /// Register `entry` on the top layer.
    pub fn register(&mut self, entry: impl Into<Entry>) -> Entry {
        self.top_mut().register(entry)
    }

    /// Register an object on the top layer and hand it back.
    pub fn register_instance<T: Plugin>(&mut self, object: Rc<T>) -> Rc<T> {
        self.top_mut().register_instance(object)
    }

    /// Registered types providing `C`, from every layer, top layer first.
    pub fn classes<C, P>(&self, mut predicate: P) -> Vec<PluginType>
    where
        C: ?Sized + 'static,
        P: FnMut(&PluginType) -> bool,
    {
        let found: Vec<PluginType> = self
            .layers
            .iter()
            .rev()
            .flat_map(|layer| layer.classes::<C, _>(&mut predicate))
            .collect();
        trace!(capability = std::any::type_name::<C>(), found = found.len(), "class lookup");
        found
    }

    /// Registered objects providing `C`, most suitable first.
    ///
    /// Without `find_all` the search stops at the top-most layer with any match.
    pub fn instances<C, P>(&self, mut predicate: P, find_all: bool) -> Vec<Rc<C>>
    where
        C: ?Sized + 'static,
        P: FnMut(&Instance) -> bool,
    {
        let mut found = Vec::new();
        for layer in self.layers.iter().rev() {
            found.extend(layer.instances::<C, _>(&mut predicate));
            if !find_all && !found.is_empty() {
                break;
            }
        }
        trace!(
            capability = std::any::type_name::<C>(),
            find_all,
            found = found.len(),
            "instance lookup"
        );
        found
    }

    /// Every registered object providing `C`, most suitable first.
    pub fn services<C: ?Sized + 'static>(&self) -> Vec<Rc<C>> {
        self.instances::<C, _>(|_| true, true)
    }

    /// The most suitable registered object providing `C`.
    pub fn service<C: ?Sized + 'static>(&self) -> StackResult<Rc<C>> {
        self.instances::<C, _>(|_| true, false)
            .into_iter()
            .next()
            .ok_or_else(|| StackError::CapabilityNotFound {
                capability: CapabilityId::of::<C>().name(),
            })
    }

    /// Instantiate registered types providing `C`.
    ///
    /// Types are visited top layer first. Each one is created if `may_create`
    /// agrees, given the instances created so far. Auto-registration is
    /// suppressed while constructors run; with `take_ownership` every created
    /// object is registered on the top layer.
    pub fn new_instances<C, M>(
        &mut self,
        mut may_create: M,
        take_ownership: bool,
        params: &Value,
    ) -> StackResult<Vec<Rc<C>>>
    where
        C: ?Sized + 'static,
        M: FnMut(&PluginType, &[Rc<C>]) -> bool,
    {
        let _suppressed = AutoRegisterSuppression::acquire();
        let mut created = Vec::new();
        for plugin_type in self.classes::<C, _>(|_| true) {
            if !may_create(&plugin_type, created.as_slice()) {
                continue;
            }
            let instance = plugin_type.instantiate(params)?;
            let view = instance.view::<C>().ok_or_else(|| StackError::Construction {
                type_name: plugin_type.type_name(),
                message: format!("instance does not provide {}", CapabilityId::of::<C>().name()),
            })?;
            debug!(
                event = event_names::INSTANCE_CREATED,
                plugin = plugin_type.type_name(),
                owned = take_ownership,
                "created instance"
            );
            if take_ownership {
                self.register(instance);
            }
            created.push(view);
        }
        Ok(created)
    }

    /// Create one `new_instances` result without registering it.
    pub fn new_service<C: ?Sized + 'static>(&mut self, params: &Value) -> StackResult<Rc<C>> {
        self.new_instances::<C, _>(may_create::first_only(), false, params)?
            .into_iter()
            .next()
            .ok_or_else(|| StackError::CapabilityNotFound {
                capability: CapabilityId::of::<C>().name(),
            })
    }

    /// Existing instances of `C` plus new, owned instances of every registered
    /// type that has none on the stack yet.
    pub fn ensure_instances<C: ?Sized + 'static>(&mut self, params: &Value) -> StackResult<Vec<Rc<C>>> {
        let mut instances = self.services::<C>();
        let missing = may_create::missing_on::<C>(self);
        let created = self.new_instances::<C, _>(missing, true, params)?;
        instances.extend(created);
        Ok(instances)
    }

    /// Every schema declared on the stack, bottom layer first.
    ///
    /// For each layer the layer's own schema comes first, then the schemas
    /// of its registered clients, oldest registration first. A schema shared
    /// by several clients is listed once.
    pub fn schema_validator(&self) -> StackResult<SchemaValidator> {
        let mut validator = SchemaValidator::new();
        for layer in &self.layers {
            if let Some(schema) = layer.schema() {
                validator.append(Arc::clone(schema));
            }
            let clients = layer.instances::<dyn StackClient, _>(|_| true);
            for client in clients.iter().rev() {
                validator.append(client.schema()?);
            }
        }
        Ok(validator)
    }

    /// Serializable snapshot of every layer, base first.
    pub fn report(&self) -> StackReport {
        StackReport {
            depth: self.layers.len(),
            layers: self
                .layers
                .iter()
                .map(|layer| LayerReport {
                    name: layer.name().to_string(),
                    category: layer.category().map(str::to_string),
                    entries: layer.registry().iter().map(Entry::describe).collect(),
                    settings: layer.settings().clone(),
                })
                .collect(),
        }
    }

    fn top_mut(&mut self) -> &mut Environment {
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    fn invalidate(&mut self) {
        self.aggregate = None;
        self.state = CacheState::Invalid;
    }

    fn fold_from(&self, base: Tree, start: usize) -> Aggregate {
        debug!(
            event = event_names::SETTINGS_MERGED,
            from = start,
            to = self.layers.len(),
            incremental = start > 0,
            "merging layer settings"
        );
        let raw = fold_layers_with(
            self.resolver.as_ref(),
            base,
            self.layers[start..].iter().map(Environment::settings),
        );
        let view = strip_force_markers(&raw);
        Aggregate { raw, view }
    }
}

/// Snapshot of one layer for reports.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub entries: Vec<String>,
    pub settings: Tree,
}

/// Snapshot of a whole stack, base layer first.
#[derive(Debug, Clone, Serialize)]
pub struct StackReport {
    pub depth: usize,
    pub layers: Vec<LayerReport>,
}

/// Ready-made `may_create` policies for [`EnvironmentStack::new_instances`].
pub mod may_create {
    use super::*;

    /// Create an instance of every type.
    pub fn always<C: ?Sized>() -> impl FnMut(&PluginType, &[Rc<C>]) -> bool {
        |_, _| true
    }

    /// Create only the first, most suitable type.
    pub fn first_only<C: ?Sized>() -> impl FnMut(&PluginType, &[Rc<C>]) -> bool {
        |_, created| created.is_empty()
    }

    /// Create only types that have no registered instance on `stack`.
    pub fn missing_on<C: ?Sized + 'static>(
        stack: &EnvironmentStack,
    ) -> impl FnMut(&PluginType, &[Rc<C>]) -> bool {
        let present: Vec<TypeId> = stack
            .layers()
            .iter()
            .flat_map(|layer| layer.instance_entries::<C, _>(|_| true))
            .map(|instance| instance.type_id())
            .collect();
        move |plugin_type, _| !present.contains(&plugin_type.type_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envstack_config::tree::into_tree;
    use serde_json::json;

    fn layer(name: &str, value: Value) -> Environment {
        Environment::with_settings(name, into_tree(value).unwrap())
    }

    #[test]
    fn test_new_stack_has_base() {
        let stack = EnvironmentStack::new();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top().name(), BASE_LAYER);
        assert_eq!(stack.cache_state(), CacheState::Invalid);
    }

    #[test]
    fn test_pop_base_underflows() {
        let mut stack = EnvironmentStack::new();
        let err = stack.pop().unwrap_err();
        assert!(matches!(err, StackError::StackUnderflow { len: 1, requested: 0 }));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_cache_transitions() {
        let mut stack = EnvironmentStack::new();
        stack.settings();
        assert_eq!(stack.cache_state(), CacheState::Valid);

        stack.push("a");
        assert_eq!(stack.cache_state(), CacheState::Stale { folded: 1 });
        stack.push("b");
        assert_eq!(stack.cache_state(), CacheState::Stale { folded: 1 });

        stack.settings();
        assert_eq!(stack.cache_state(), CacheState::Valid);

        stack.pop().unwrap();
        assert_eq!(stack.cache_state(), CacheState::Invalid);
        stack.push("c");
        assert_eq!(stack.cache_state(), CacheState::Invalid);
    }

    #[test]
    fn test_settings_merge_scenario() {
        let mut stack = EnvironmentStack::new();
        stack.push(layer("one", json!({"level": "1", "name": "base!"})));
        stack.push(layer("two", json!({"level": "2"})));
        assert_eq!(
            Value::Object(stack.settings().clone()),
            json!({"level": "2", "name": "base"})
        );
    }

    #[test]
    fn test_forced_value_survives_incremental_fold() {
        let mut stack = EnvironmentStack::new();
        stack.push(layer("one", json!({"name": "base!"})));
        assert_eq!(stack.value("name"), Some(&json!("base")));
        stack.push(layer("two", json!({"name": "override"})));
        assert_eq!(stack.value("name"), Some(&json!("base")));
    }

    #[test]
    fn test_pop_until_returns_restorable_layers() {
        let mut stack = EnvironmentStack::new();
        stack.push("a");
        stack.push("b");
        stack.push("c");
        let popped = stack.pop_until(2).unwrap();
        let names: Vec<&str> = popped.iter().map(Environment::name).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(stack.len(), 2);

        for environment in popped {
            stack.push(environment);
        }
        assert_eq!(stack.top().name(), "c");
        assert_eq!(stack.len(), 4);
    }

    #[test]
    fn test_pop_until_bounds() {
        let mut stack = EnvironmentStack::new();
        stack.push("a");
        assert!(matches!(stack.pop_until(0), Err(StackError::StackUnderflow { .. })));
        assert!(matches!(stack.pop_until(3), Err(StackError::StackUnderflow { .. })));

        stack.settings();
        assert!(stack.pop_until(2).unwrap().is_empty());
        assert_eq!(stack.cache_state(), CacheState::Valid);
    }

    #[test]
    fn test_reset() {
        let mut stack = EnvironmentStack::new();
        stack.push(layer("a", json!({"x": 1})));
        stack.reset();
        assert_eq!(stack.len(), 1);
        assert!(stack.settings().is_empty());

        stack.reset_to(layer("custom", json!({"y": 2})));
        assert_eq!(stack.top().name(), "custom");
        assert_eq!(stack.value("y"), Some(&json!(2)));
    }

    #[test]
    fn test_replace_and_find() {
        let mut stack = EnvironmentStack::new();
        stack.push(layer("site", json!({"x": 1})));
        stack.push(layer("user", json!({"y": 2})));
        stack.settings();

        let old = stack
            .replace(|env| env.name() == "site", layer("site", json!({"x": 10})))
            .unwrap();
        assert_eq!(old.value("x"), Some(&json!(1)));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.cache_state(), CacheState::Invalid);
        assert_eq!(stack.value("x"), Some(&json!(10)));
        assert_eq!(stack.find(|env| env.name() == "user").unwrap().value("y"), Some(&json!(2)));

        let err = stack.replace(|env| env.name() == "nope", Environment::new("x")).unwrap_err();
        assert!(matches!(err, StackError::EnvironmentNotFound));
    }

    #[test]
    fn test_report() {
        let mut stack = EnvironmentStack::new();
        stack.push(layer("site", json!({"x": 1})).with_category("file"));
        let report = stack.report();
        assert_eq!(report.depth, 2);
        assert_eq!(report.layers[1].name, "site");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["layers"][1]["category"], "file");
        assert!(json["layers"][0].get("category").is_none());
    }
}
