//! Capability registry protocol.
//!
//! A capability is any `'static` type, usually a trait object such as
//! `dyn Launcher`. Plugin types declare the capabilities they provide along
//! with a cast from `Rc<Self>` to `Rc<Capability>`:
//!
//! ```ignore
//! impl Plugin for ShellLauncher {
//!     fn declare(declaration: &mut Declaration<Self>) {
//!         declaration.provides::<dyn Launcher>(|it| it as Rc<dyn Launcher>);
//!     }
//! }
//! ```
//!
//! Registered objects are wrapped in an [`Instance`], registered types in a
//! [`PluginType`]. Both are cheap handles; identity is the wrapped object
//! for instances and the Rust type for plugin types.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{StackError, StackResult};

/// Identifies a capability by its Rust type.
#[derive(Clone, Copy)]
pub struct CapabilityId {
    type_id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// Full Rust name of the capability type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CapabilityId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CapabilityId {}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.name)
    }
}

type Caster<T> = Box<dyn Fn(Rc<T>) -> Box<dyn Any>>;

/// Capabilities declared by a plugin type.
pub struct Declaration<T> {
    casts: Vec<(CapabilityId, Caster<T>)>,
}

impl<T: 'static> Declaration<T> {
    fn new() -> Self {
        Self { casts: Vec::new() }
    }

    /// Declare that `T` provides capability `C`. Declaring `C` twice keeps the first cast.
    pub fn provides<C: ?Sized + 'static>(&mut self, cast: fn(Rc<T>) -> Rc<C>) -> &mut Self {
        let id = CapabilityId::of::<C>();
        if !self.casts.iter().any(|(known, _)| *known == id) {
            let caster: Caster<T> =
                Box::new(move |object: Rc<T>| Box::new(cast(object)) as Box<dyn Any>);
            self.casts.push((id, caster));
        }
        self
    }

    fn collect() -> Self
    where
        T: Plugin,
    {
        let mut declaration = Self::new();
        T::declare(&mut declaration);
        declaration
    }
}

/// A type whose objects can be registered on an environment.
pub trait Plugin: Any {
    /// Declare every capability this type provides.
    fn declare(declaration: &mut Declaration<Self>)
    where
        Self: Sized;
}

/// A plugin type the stack can instantiate on demand.
pub trait Construct: Plugin + Sized {
    /// Build a new object from free-form parameters.
    ///
    /// Constructors may call [`crate::context::adopt`] to register the new
    /// object on the current stack; that side effect is skipped while the
    /// stack itself is instantiating types.
    fn construct(params: &Value) -> StackResult<Rc<Self>>;
}

fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

struct InstanceInner {
    object: Rc<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
    views: Vec<(CapabilityId, Box<dyn Any>)>,
}

/// A registered object together with its capability views.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    pub fn new<T: Plugin>(object: Rc<T>) -> Self {
        let views = Declaration::<T>::collect()
            .casts
            .into_iter()
            .map(|(id, cast)| (id, cast(Rc::clone(&object))))
            .collect();
        Self {
            inner: Rc::new(InstanceInner {
                object: object as Rc<dyn Any>,
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                views,
            }),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// Type name without its module path.
    pub fn type_name(&self) -> &'static str {
        short_name(self.inner.type_name)
    }

    pub fn provides<C: ?Sized + 'static>(&self) -> bool {
        let id = CapabilityId::of::<C>();
        self.inner.views.iter().any(|(known, _)| *known == id)
    }

    /// The object seen through capability `C`, if it provides it.
    pub fn view<C: ?Sized + 'static>(&self) -> Option<Rc<C>> {
        let id = CapabilityId::of::<C>();
        self.inner
            .views
            .iter()
            .find(|(known, _)| *known == id)
            .and_then(|(_, view)| view.downcast_ref::<Rc<C>>())
            .cloned()
    }

    /// The object as its concrete type.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner.object).downcast::<T>().ok()
    }

    pub fn is_type<T: 'static>(&self) -> bool {
        self.inner.type_id == TypeId::of::<T>()
    }

    /// Whether both handles wrap the same object.
    pub fn same_object(&self, other: &Instance) -> bool {
        self.address() == other.address()
    }

    /// Whether this handle wraps `object`.
    pub fn wraps<T: 'static>(&self, object: &Rc<T>) -> bool {
        self.address() == Rc::as_ptr(object) as *const ()
    }

    fn address(&self) -> *const () {
        Rc::as_ptr(&self.inner.object) as *const ()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.inner.type_name)
            .field("address", &self.address())
            .finish()
    }
}

type Constructor = Box<dyn Fn(&Value) -> StackResult<Instance>>;

struct TypeInner {
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Vec<CapabilityId>,
    construct: Constructor,
}

/// A registered plugin type.
#[derive(Clone)]
pub struct PluginType {
    inner: Rc<TypeInner>,
}

impl PluginType {
    pub fn of<T: Construct>() -> Self {
        let capabilities = Declaration::<T>::collect()
            .casts
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        Self {
            inner: Rc::new(TypeInner {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                capabilities,
                construct: Box::new(|params| T::construct(params).map(Instance::new)),
            }),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// Type name without its module path.
    pub fn type_name(&self) -> &'static str {
        short_name(self.inner.type_name)
    }

    pub fn capabilities(&self) -> &[CapabilityId] {
        &self.inner.capabilities
    }

    pub fn provides<C: ?Sized + 'static>(&self) -> bool {
        self.inner.capabilities.contains(&CapabilityId::of::<C>())
    }

    pub fn is_type<T: 'static>(&self) -> bool {
        self.inner.type_id == TypeId::of::<T>()
    }

    /// Construct a new, unregistered instance.
    pub fn instantiate(&self, params: &Value) -> StackResult<Instance> {
        (self.inner.construct)(params)
    }
}

impl fmt::Debug for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginType")
            .field("type", &self.inner.type_name)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

/// One registry slot: either an object or a type.
#[derive(Clone, Debug)]
pub enum Entry {
    Instance(Instance),
    Type(PluginType),
}

impl Entry {
    /// Identity comparison: same object, or same Rust type.
    pub fn same(&self, other: &Entry) -> bool {
        match (self, other) {
            (Entry::Instance(a), Entry::Instance(b)) => a.same_object(b),
            (Entry::Type(a), Entry::Type(b)) => a.type_id() == b.type_id(),
            _ => false,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Entry::Instance(instance) => Some(instance),
            Entry::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<&PluginType> {
        match self {
            Entry::Type(plugin_type) => Some(plugin_type),
            Entry::Instance(_) => None,
        }
    }

    /// Display name used in reports; types are marked with a `type:` prefix.
    pub fn describe(&self) -> String {
        match self {
            Entry::Instance(instance) => instance.type_name().to_string(),
            Entry::Type(plugin_type) => format!("type:{}", plugin_type.type_name()),
        }
    }
}

impl From<Instance> for Entry {
    fn from(instance: Instance) -> Self {
        Entry::Instance(instance)
    }
}

impl From<PluginType> for Entry {
    fn from(plugin_type: PluginType) -> Self {
        Entry::Type(plugin_type)
    }
}

/// Build a construction error for plugin type `T`.
pub fn construction_error<T: 'static>(message: impl Into<String>) -> StackError {
    StackError::Construction {
        type_name: short_name(std::any::type_name::<T>()),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    trait Counter {
        fn count(&self) -> usize;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    impl Counter for English {
        fn count(&self) -> usize {
            5
        }
    }

    impl Plugin for English {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration
                .provides::<dyn Greeter>(|it| it as Rc<dyn Greeter>)
                .provides::<dyn Counter>(|it| it as Rc<dyn Counter>);
        }
    }

    impl Construct for English {
        fn construct(params: &Value) -> StackResult<Rc<Self>> {
            if params.get("fail").is_some() {
                return Err(construction_error::<Self>("asked to fail"));
            }
            Ok(Rc::new(English))
        }
    }

    struct Silent;

    impl Plugin for Silent {
        fn declare(_declaration: &mut Declaration<Self>) {}
    }

    #[test]
    fn test_instance_views() {
        let instance = Instance::new(Rc::new(English));
        assert!(instance.provides::<dyn Greeter>());
        assert_eq!(instance.view::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(instance.view::<dyn Counter>().unwrap().count(), 5);
        assert!(instance.downcast::<English>().is_some());
        assert!(instance.downcast::<Silent>().is_none());
        assert_eq!(instance.type_name(), "English");
    }

    #[test]
    fn test_instance_without_capabilities() {
        let instance = Instance::new(Rc::new(Silent));
        assert!(!instance.provides::<dyn Greeter>());
        assert!(instance.view::<dyn Greeter>().is_none());
    }

    #[test]
    fn test_identity() {
        let object = Rc::new(English);
        let a = Instance::new(Rc::clone(&object));
        let b = Instance::new(Rc::clone(&object));
        let c = Instance::new(Rc::new(English));
        assert!(a.same_object(&b));
        assert!(!a.same_object(&c));
        assert!(a.wraps(&object));
        assert!(Entry::from(a).same(&Entry::from(b)));
    }

    #[test]
    fn test_plugin_type_instantiate() {
        let plugin_type = PluginType::of::<English>();
        assert!(plugin_type.provides::<dyn Counter>());
        assert_eq!(plugin_type.capabilities().len(), 2);
        let instance = plugin_type.instantiate(&Value::Null).unwrap();
        assert!(instance.is_type::<English>());

        let err = plugin_type
            .instantiate(&serde_json::json!({"fail": true}))
            .unwrap_err();
        assert!(matches!(err, StackError::Construction { type_name: "English", .. }));
    }

    #[test]
    fn test_types_compare_by_rust_type() {
        let a = Entry::from(PluginType::of::<English>());
        let b = Entry::from(PluginType::of::<English>());
        assert!(a.same(&b));
        assert_eq!(a.describe(), "type:English");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("a::b::C"), "C");
        assert_eq!(short_name("C"), "C");
        assert_eq!(short_name("a::Wrap<b::C>"), "Wrap<b::C>");
    }
}
