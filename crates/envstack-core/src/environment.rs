//! A single stack layer: local settings plus a registry of plugins.

use std::rc::Rc;
use std::sync::Arc;

use envstack_config::resolve::{load_source, LayerSource};
use envstack_config::tree::{self, Tree};
use envstack_config::Schema;
use serde_json::Value;
use tracing::trace;

use crate::capability::{Construct, Entry, Instance, Plugin, PluginType};
use crate::error::StackResult;

/// Named holder of a partial configuration tree and an ordered registry.
///
/// The registry never holds the same object (or the same plugin type) twice;
/// later registrations are preferred by lookups.
#[derive(Debug, Clone)]
pub struct Environment {
    name: String,
    category: Option<String>,
    registry: Vec<Entry>,
    settings: Tree,
    schema: Option<Arc<Schema>>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            registry: Vec::new(),
            settings: Tree::new(),
            schema: None,
        }
    }

    /// Environment seeded with a settings tree.
    pub fn with_settings(name: impl Into<String>, settings: Tree) -> Self {
        Self {
            settings,
            ..Self::new(name)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Environment holding the settings a configuration source contributes.
    pub fn from_source(source: &LayerSource) -> StackResult<Self> {
        let settings = load_source(source)?;
        Ok(Self::with_settings(source.name.clone(), settings).with_category(source.kind.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// The local, unmerged settings of this layer.
    pub fn settings(&self) -> &Tree {
        &self.settings
    }

    /// Local value at a dotted key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        tree::get(&self.settings, key)
    }

    /// Set a local value at a dotted key.
    ///
    /// Only meaningful before the environment is pushed; the stack owns its
    /// layers and exposes them read-only.
    pub fn set_value(&mut self, key: &str, value: Value) -> &mut Self {
        tree::set(&mut self.settings, key, value);
        self
    }

    /// Registry entries, oldest first.
    pub fn registry(&self) -> &[Entry] {
        &self.registry
    }

    /// Append `entry` unless the same object or type is already registered.
    ///
    /// Returns the entry unchanged.
    pub fn register(&mut self, entry: impl Into<Entry>) -> Entry {
        let entry = entry.into();
        if self.registry.iter().any(|known| known.same(&entry)) {
            trace!(environment = %self.name, entry = %entry.describe(), "duplicate registration ignored");
        } else {
            self.registry.push(entry.clone());
        }
        entry
    }

    /// Register an object and hand it back.
    pub fn register_instance<T: Plugin>(&mut self, object: Rc<T>) -> Rc<T> {
        self.register(Instance::new(Rc::clone(&object)));
        object
    }

    /// Register plugin type `T`.
    pub fn register_type<T: Construct>(&mut self) -> PluginType {
        let plugin_type = PluginType::of::<T>();
        self.register(plugin_type.clone());
        plugin_type
    }

    /// Registered types providing `C`, most recently registered first.
    pub fn classes<C, P>(&self, mut predicate: P) -> Vec<PluginType>
    where
        C: ?Sized + 'static,
        P: FnMut(&PluginType) -> bool,
    {
        self.registry
            .iter()
            .rev()
            .filter_map(Entry::as_type)
            .filter(|plugin_type| plugin_type.provides::<C>() && predicate(plugin_type))
            .cloned()
            .collect()
    }

    /// Registered objects providing `C`, most recently registered first.
    pub fn instances<C, P>(&self, predicate: P) -> Vec<Rc<C>>
    where
        C: ?Sized + 'static,
        P: FnMut(&Instance) -> bool,
    {
        self.instance_entries::<C, P>(predicate)
            .iter()
            .filter_map(Instance::view::<C>)
            .collect()
    }

    /// Like [`Environment::instances`] but yields the registry handles.
    pub fn instance_entries<C, P>(&self, mut predicate: P) -> Vec<Instance>
    where
        C: ?Sized + 'static,
        P: FnMut(&Instance) -> bool,
    {
        self.registry
            .iter()
            .rev()
            .filter_map(Entry::as_instance)
            .filter(|instance| instance.provides::<C>() && predicate(instance))
            .cloned()
            .collect()
    }

    /// Drop every registration and all local settings.
    pub fn reset(&mut self) -> &mut Self {
        self.registry.clear();
        self.settings = Tree::new();
        self
    }
}

impl From<&str> for Environment {
    fn from(name: &str) -> Self {
        Environment::new(name)
    }
}

impl From<String> for Environment {
    fn from(name: String) -> Self {
        Environment::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Declaration, Instance};
    use serde_json::json;

    trait Named {
        fn label(&self) -> String;
    }

    struct Widget(&'static str);

    impl Named for Widget {
        fn label(&self) -> String {
            self.0.to_string()
        }
    }

    impl Plugin for Widget {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.provides::<dyn Named>(|it| it as Rc<dyn Named>);
        }
    }

    impl Construct for Widget {
        fn construct(_params: &Value) -> StackResult<Rc<Self>> {
            Ok(Rc::new(Widget("built")))
        }
    }

    fn labels(items: &[Rc<dyn Named>]) -> Vec<String> {
        items.iter().map(|item| item.label()).collect()
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut env = Environment::new("base");
        let widget = Rc::new(Widget("a"));
        env.register_instance(Rc::clone(&widget));
        env.register_instance(Rc::clone(&widget));
        assert_eq!(env.registry().len(), 1);

        env.register_type::<Widget>();
        env.register_type::<Widget>();
        assert_eq!(env.registry().len(), 2);
    }

    #[test]
    fn test_register_returns_entry() {
        let mut env = Environment::new("base");
        let widget = Rc::new(Widget("a"));
        let entry = env.register(Instance::new(Rc::clone(&widget)));
        assert!(entry.as_instance().unwrap().wraps(&widget));
    }

    #[test]
    fn test_lookup_prefers_recent_registrations() {
        let mut env = Environment::new("base");
        env.register_instance(Rc::new(Widget("first")));
        env.register_instance(Rc::new(Widget("second")));
        env.register_type::<Widget>();

        let found = env.instances::<dyn Named, _>(|_| true);
        assert_eq!(labels(&found), vec!["second", "first"]);
        assert_eq!(env.classes::<dyn Named, _>(|_| true).len(), 1);
    }

    #[test]
    fn test_lookup_predicate() {
        let mut env = Environment::new("base");
        env.register_instance(Rc::new(Widget("first")));
        env.register_instance(Rc::new(Widget("second")));
        let found = env.instances::<dyn Named, _>(|instance| {
            instance
                .downcast::<Widget>()
                .is_some_and(|widget| widget.0 == "first")
        });
        assert_eq!(labels(&found), vec!["first"]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut env = Environment::new("base");
        env.register_instance(Rc::new(Widget("a")));
        env.set_value("a.b", json!(1));
        env.reset();
        assert!(env.registry().is_empty());
        assert!(env.settings().is_empty());
        assert_eq!(env.name(), "base");
    }

    #[test]
    fn test_local_values() {
        let mut env = Environment::from("local").with_category("test");
        env.set_value("logging.verbosity", json!("DEBUG"));
        assert_eq!(env.value("logging.verbosity"), Some(&json!("DEBUG")));
        assert_eq!(env.category(), Some("test"));
    }
}
