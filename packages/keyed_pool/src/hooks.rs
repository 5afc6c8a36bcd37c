use std::fmt;

type Hook<T> = Box<dyn FnMut(&mut T)>;

/// Optional notifications for objects implementing [`Poolable`].
///
/// Both methods default to doing nothing, so a type only needs to implement the transitions it
/// cares about. Use [`Hooks::poolable()`] to have a pool call them.
///
/// # Example
///
/// ```rust
/// use keyed_pool::{Hooks, Poolable, StackPool};
///
/// #[derive(Clone, Default)]
/// struct Particle {
///     visible: bool,
/// }
///
/// impl Poolable for Particle {
///     fn on_rented_from_pool(&mut self) {
///         self.visible = true;
///     }
///
///     fn on_returned_to_pool(&mut self) {
///         self.visible = false;
///     }
/// }
///
/// let mut pool = StackPool::builder()
///     .hooks(Hooks::poolable())
///     .build(Particle::default(), Particle::clone);
///
/// let particle = pool.get();
/// assert!(particle.visible);
/// ```
pub trait Poolable {
    /// Called after the object has been taken out of a pool, before the caller receives it.
    fn on_rented_from_pool(&mut self) {}

    /// Called when the object is handed back to a pool, before it is stored for reuse.
    fn on_returned_to_pool(&mut self) {}
}

/// Lifecycle callbacks that a pool invokes as its objects change state.
///
/// * `on_acquire` runs every time an object is handed out, whether freshly cloned or reused.
/// * `on_release` runs every time an object is handed back.
/// * `on_destroy` runs when the pool gives up an object for good: when an idle object does not
///   fit under the idle limit, when idle objects are trimmed and when the pool itself is dropped.
///
/// Setting a hook that is already set chains the new callback after the existing one, which
/// makes it possible to combine [`Hooks::poolable()`] with custom hooks.
///
/// Hooks must not call back into the pool or registry that invokes them.
///
/// # Example
///
/// ```rust
/// use keyed_pool::{Hooks, StackPool};
///
/// let hooks = Hooks::new()
///     .on_acquire(|v: &mut Vec<u8>| v.reserve(64))
///     .on_release(|v: &mut Vec<u8>| v.clear());
///
/// let mut pool = StackPool::builder().hooks(hooks).build(Vec::new(), Vec::clone);
///
/// let mut buffer = pool.get();
/// buffer.push(1);
/// pool.release(buffer);
///
/// assert!(pool.get().is_empty());
/// ```
#[must_use]
pub struct Hooks<T> {
    on_acquire: Option<Hook<T>>,
    on_release: Option<Hook<T>>,
    on_destroy: Option<Hook<T>>,
}

impl<T> Hooks<T> {
    /// Creates a set of hooks where no callback is set.
    pub fn new() -> Self {
        Self {
            on_acquire: None,
            on_release: None,
            on_destroy: None,
        }
    }

    pub(crate) fn acquire(&mut self, item: &mut T) {
        if let Some(hook) = self.on_acquire.as_mut() {
            hook(item);
        }
    }

    pub(crate) fn release(&mut self, item: &mut T) {
        if let Some(hook) = self.on_release.as_mut() {
            hook(item);
        }
    }

    pub(crate) fn destroy(&mut self, item: &mut T) {
        if let Some(hook) = self.on_destroy.as_mut() {
            hook(item);
        }
    }
}

impl<T: 'static> Hooks<T> {
    /// Sets the callback invoked when an object is handed out.
    pub fn on_acquire(mut self, hook: impl FnMut(&mut T) + 'static) -> Self {
        self.on_acquire = chain(self.on_acquire.take(), hook);
        self
    }

    /// Sets the callback invoked when an object is handed back.
    pub fn on_release(mut self, hook: impl FnMut(&mut T) + 'static) -> Self {
        self.on_release = chain(self.on_release.take(), hook);
        self
    }

    /// Sets the callback invoked when the pool discards an object.
    pub fn on_destroy(mut self, hook: impl FnMut(&mut T) + 'static) -> Self {
        self.on_destroy = chain(self.on_destroy.take(), hook);
        self
    }
}

impl<T: Poolable + 'static> Hooks<T> {
    /// Creates hooks that forward the rent and return transitions to the [`Poolable`]
    /// implementation of the pooled type.
    pub fn poolable() -> Self {
        Self::new()
            .on_acquire(T::on_rented_from_pool)
            .on_release(T::on_returned_to_pool)
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_acquire", &self.on_acquire.is_some())
            .field("on_release", &self.on_release.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

fn chain<T: 'static>(
    existing: Option<Hook<T>>,
    mut hook: impl FnMut(&mut T) + 'static,
) -> Option<Hook<T>> {
    Some(match existing {
        None => Box::new(hook),
        Some(mut first) => Box::new(move |item: &mut T| {
            first(item);
            hook(item);
        }),
    })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn unset_hooks_do_nothing() {
        let mut hooks = Hooks::<u32>::new();
        let mut value = 5;

        hooks.acquire(&mut value);
        hooks.release(&mut value);
        hooks.destroy(&mut value);

        assert_eq!(value, 5);
    }

    #[test]
    fn hooks_see_the_item() {
        let mut hooks = Hooks::new()
            .on_acquire(|v: &mut u32| *v += 1)
            .on_release(|v: &mut u32| *v *= 10)
            .on_destroy(|v: &mut u32| *v = 0);
        let mut value = 1;

        hooks.acquire(&mut value);
        assert_eq!(value, 2);

        hooks.release(&mut value);
        assert_eq!(value, 20);

        hooks.destroy(&mut value);
        assert_eq!(value, 0);
    }

    #[test]
    fn setting_twice_chains_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        let second = Rc::clone(&log);
        let mut hooks = Hooks::new()
            .on_acquire(move |_: &mut u32| first.borrow_mut().push("first"))
            .on_acquire(move |_: &mut u32| second.borrow_mut().push("second"));

        hooks.acquire(&mut 0);

        assert_eq!(*log.borrow(), ["first", "second"]);
    }

    #[derive(Default)]
    struct Tracked {
        rented: usize,
        returned: usize,
    }

    impl Poolable for Tracked {
        fn on_rented_from_pool(&mut self) {
            self.rented += 1;
        }

        fn on_returned_to_pool(&mut self) {
            self.returned += 1;
        }
    }

    #[test]
    fn poolable_forwards_notifications() {
        let mut hooks = Hooks::<Tracked>::poolable();
        let mut item = Tracked::default();

        hooks.acquire(&mut item);
        hooks.acquire(&mut item);
        hooks.release(&mut item);
        hooks.destroy(&mut item);

        assert_eq!(item.rented, 2);
        assert_eq!(item.returned, 1);
    }

    #[test]
    fn debug_shows_which_hooks_are_set() {
        let hooks = Hooks::<u32>::new().on_release(|_| {});

        assert_eq!(
            format!("{hooks:?}"),
            "Hooks { on_acquire: false, on_release: true, on_destroy: false }"
        );
    }
}
