//! The thread-confined current stack.
//!
//! Each thread owns one current [`EnvironmentStack`], created lazily with a
//! single base layer. It can be swapped out wholesale with [`swap`] or
//! temporarily with [`with_stack`]. Objects that want to register themselves
//! on construction go through [`adopt`], which honors
//! [`AutoRegisterSuppression`].

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::capability::Plugin;
use crate::error::{StackError, StackResult};
use crate::logging::event_names;
use crate::stack::EnvironmentStack;

thread_local! {
    static CURRENT: RefCell<EnvironmentStack> = RefCell::new(EnvironmentStack::new());
    static SUPPRESSED: Cell<usize> = const { Cell::new(0) };
}

/// Run `f` with the current stack.
///
/// # Panics
///
/// Panics if called from inside another `with_current` on the same thread.
/// Code that may run while the stack is in use, such as plugin constructors,
/// should call [`try_with_current`] instead.
pub fn with_current<R>(f: impl FnOnce(&mut EnvironmentStack) -> R) -> R {
    CURRENT.with(|current| f(&mut current.borrow_mut()))
}

/// Like [`with_current`], but fails with `StackBusy` when the current stack
/// is already borrowed further up the call chain.
pub fn try_with_current<R>(f: impl FnOnce(&mut EnvironmentStack) -> R) -> StackResult<R> {
    CURRENT.with(|current| match current.try_borrow_mut() {
        Ok(mut stack) => Ok(f(&mut stack)),
        Err(_) => Err(StackError::StackBusy),
    })
}

/// Install `stack` as the current stack and return the previous one.
pub fn swap(stack: EnvironmentStack) -> EnvironmentStack {
    CURRENT.with(|current| current.replace(stack))
}

/// Run `f` with `stack` installed as the current stack.
///
/// The previous stack is restored afterwards, also when `f` panics.
pub fn with_stack<R>(stack: EnvironmentStack, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<EnvironmentStack>);

    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(previous) = self.0.take() {
                swap(previous);
            }
        }
    }

    let _restore = Restore(Some(swap(stack)));
    f()
}

/// While held, [`auto_register`] is a no-op on this thread.
///
/// Guards nest; registration resumes once the last one is dropped.
pub struct AutoRegisterSuppression {
    _not_send: PhantomData<*const ()>,
}

impl AutoRegisterSuppression {
    pub fn acquire() -> Self {
        SUPPRESSED.with(|count| count.set(count.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for AutoRegisterSuppression {
    fn drop(&mut self) {
        SUPPRESSED.with(|count| count.set(count.get().saturating_sub(1)));
    }
}

/// Whether auto-registration is currently suppressed on this thread.
pub fn auto_register_suppressed() -> bool {
    SUPPRESSED.with(|count| count.get() > 0)
}

/// Register `object` on the top layer of the current stack.
///
/// Returns whether it was registered. Skipped while suppressed, and when the
/// current stack is already borrowed further up the call chain.
pub fn auto_register<T: Plugin>(object: &Rc<T>) -> bool {
    if auto_register_suppressed() {
        debug!(
            event = event_names::AUTO_REGISTER_SUPPRESSED,
            plugin = std::any::type_name::<T>(),
            "auto-registration suppressed"
        );
        return false;
    }
    CURRENT.with(|current| match current.try_borrow_mut() {
        Ok(mut stack) => {
            stack.register_instance(Rc::clone(object));
            true
        }
        Err(_) => {
            warn!(
                event = event_names::AUTO_REGISTER_SKIPPED,
                plugin = std::any::type_name::<T>(),
                "current stack is busy, skipping auto-registration"
            );
            false
        }
    })
}

/// Wrap `object` and auto-register it on the current stack.
pub fn adopt<T: Plugin>(object: T) -> Rc<T> {
    let object = Rc::new(object);
    auto_register(&object);
    object
}
