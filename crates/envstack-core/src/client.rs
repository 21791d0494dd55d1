//! Stack clients: objects that read typed settings through a schema.
//!
//! A client declares one [`Schema`] rooted at a key of the merged settings.
//! The first typed read resolves the whole schema subtree at once and keeps
//! the result in the client's [`ValueCache`] until it is cleared.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use envstack_config::{FromTyped, Resolved, Schema};

use crate::context;
use crate::error::StackResult;
use crate::stack::EnvironmentStack;

/// An object with a schema over the merged settings.
///
/// Registered clients that declare this capability contribute their schema
/// to [`EnvironmentStack::schema_validator`].
pub trait StackClient {
    /// The client's schema; `SchemaMissing` if none was declared.
    fn schema(&self) -> StackResult<Arc<Schema>>;

    /// Resolve the schema against the stack's merged settings.
    fn settings_value(&self, stack: &mut EnvironmentStack) -> StackResult<Resolved> {
        let schema = self.schema()?;
        Ok(schema.resolve(stack.settings())?)
    }
}

/// Lazily filled cache of one client's resolved values.
#[derive(Debug, Default)]
pub struct ValueCache {
    resolved: RefCell<Option<Rc<Resolved>>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether values were resolved and not cleared since.
    pub fn has(&self) -> bool {
        self.resolved.borrow().is_some()
    }

    /// The cached values, if any.
    pub fn cached(&self) -> Option<Rc<Resolved>> {
        self.resolved.borrow().clone()
    }

    /// Drop the cached values. Safe to call on an empty cache.
    pub fn clear(&self) {
        self.resolved.borrow_mut().take();
    }

    /// Cached values, resolving them with `resolve` on first use.
    ///
    /// A failed resolution leaves the cache empty.
    pub fn get_or_resolve<F>(&self, resolve: F) -> StackResult<Rc<Resolved>>
    where
        F: FnOnce() -> StackResult<Resolved>,
    {
        if let Some(resolved) = self.resolved.borrow().as_ref() {
            return Ok(Rc::clone(resolved));
        }
        let resolved = Rc::new(resolve()?);
        *self.resolved.borrow_mut() = Some(Rc::clone(&resolved));
        Ok(resolved)
    }
}

/// A stack client with cached, typed property access.
pub trait PropertyClient: StackClient {
    fn value_cache(&self) -> &ValueCache;

    fn has_value_cache(&self) -> bool {
        self.value_cache().has()
    }

    fn clear_value_cache(&self) {
        self.value_cache().clear()
    }

    /// All values of the client's schema, resolved once against `stack`.
    fn values(&self, stack: &mut EnvironmentStack) -> StackResult<Rc<Resolved>> {
        self.value_cache().get_or_resolve(|| self.settings_value(stack))
    }

    /// Like [`PropertyClient::values`], against the current stack.
    ///
    /// Cached values are returned even while the current stack is in use;
    /// otherwise that case fails with `StackBusy`.
    fn current_values(&self) -> StackResult<Rc<Resolved>> {
        if let Some(values) = self.value_cache().cached() {
            return Ok(values);
        }
        context::try_with_current(|stack| self.values(stack))?
    }
}

/// Typed accessor for one path below a client's schema root.
///
/// ```ignore
/// const VERBOSITY: Property<String> = Property::new("verbosity");
/// let level = VERBOSITY.get(&client, &mut stack)?;
/// ```
pub struct Property<T> {
    path: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

impl<T: FromTyped> Property<T> {
    /// Read the property, resolving the client's values if needed.
    pub fn get<C>(&self, client: &C, stack: &mut EnvironmentStack) -> StackResult<T>
    where
        C: PropertyClient + ?Sized,
    {
        let values = client.values(stack)?;
        Ok(values.get_as(self.path)?)
    }

    /// Read the property against the current stack.
    pub fn current<C>(&self, client: &C) -> StackResult<T>
    where
        C: PropertyClient + ?Sized,
    {
        let values = client.current_values()?;
        Ok(values.get_as(self.path)?)
    }
}
