use std::any::{Any, type_name};
use std::borrow::Cow;
use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};
use tracing::warn;

use crate::error::Result;
use crate::{
    ErasedEntry, Handle, Hooks, ObjectId, ObjectIdentity, PoolConfig, PoolKey, PoolRegistryBuilder,
    PoolStats, RegistryCore, SlotPool, get_or_create,
};

/// A pool owned by a [`PoolRegistry`], with the identities of the objects it has on loan.
struct PoolEntry<T> {
    pool: SlotPool<T>,
    live: HashMap<ObjectId, Handle>,
}

impl<T: Clone + ObjectIdentity> PoolEntry<T> {
    fn new(pool: SlotPool<T>) -> Self {
        Self {
            pool,
            live: HashMap::new(),
        }
    }

    fn rent(&mut self) -> (Handle, T) {
        let handle = self.pool.rent();

        let item = self
            .pool
            .get(handle)
            .expect("a freshly rented handle always resolves")
            .clone();

        if self.live.insert(item.object_id(), handle).is_some() {
            warn!(
                item_type = type_name::<T>(),
                "pooled objects share an identity, release by value will be unreliable"
            );
        }

        (handle, item)
    }

    fn release(&mut self, handle: Handle) -> bool {
        let Some(id) = self.pool.get(handle).map(ObjectIdentity::object_id) else {
            return false;
        };

        self.live.remove(&id);
        self.pool.release(handle)
    }
}

impl<T: 'static> ErasedEntry for PoolEntry<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear(&mut self) {
        self.pool.clear();
        self.live.clear();
    }

    fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

/// A collection of [`SlotPool`]s addressed by [`PoolKey`], created on demand from an
/// asynchronous factory.
///
/// The first request for a key awaits the factory to obtain the template of the pool, builds
/// the pool and rents from it. Later requests rent directly. Requests for a key whose pool is
/// still being created wait for that creation instead of calling the factory again, so the
/// factory of a key runs at most once per successful creation. If the factory fails, or every
/// caller waiting on it gives up, nothing is registered and the next request tries again.
///
/// Objects are handed out as clones of the pooled instance, so `T` is expected to be a cheap
/// shared reference to the actual resource (e.g. `Rc<RefCell<Sprite>>`). The registry records
/// the [identity][ObjectIdentity] of each object it hands out, which is what allows
/// [`release()`][1] to take back an object without its handle. Callers that keep the handle
/// from [`get_with_handle()`][2] can use the cheaper [`release_handle()`][3] instead.
///
/// The registry is a cloneable handle to shared state; all clones operate on the same pools.
/// The pools are destroyed (running their destroy hooks) when the last clone is dropped.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::convert::Infallible;
/// use std::rc::Rc;
///
/// use futures::executor::block_on;
/// use keyed_pool::{Hooks, PoolRegistry};
///
/// #[derive(Clone, Debug)]
/// struct Sprite {
///     texture: &'static str,
///     visible: bool,
/// }
///
/// let registry = PoolRegistry::new();
///
/// # block_on(async {
/// let sprite = registry
///     .get(
///         "player",
///         || async {
///             // Typically loads the asset from somewhere.
///             Ok::<_, Infallible>(Rc::new(RefCell::new(Sprite {
///                 texture: "player.png",
///                 visible: false,
///             })))
///         },
///         |template: &Rc<RefCell<Sprite>>| Rc::new(RefCell::new(template.borrow().clone())),
///         Hooks::new()
///             .on_acquire(|s: &mut Rc<RefCell<Sprite>>| s.borrow_mut().visible = true)
///             .on_release(|s: &mut Rc<RefCell<Sprite>>| s.borrow_mut().visible = false),
///     )
///     .await
///     .unwrap();
///
/// assert!(sprite.borrow().visible);
/// assert!(registry.release(sprite));
/// # });
/// ```
///
/// # Re-entrancy
///
/// Clone functions and hooks run while the registry is busy with the operation that invoked
/// them and must not call back into the same registry. Factories are not affected by this
/// limitation and may request other pools from the registry. A factory that requests the pool
/// it is creating, directly or through the factory of another pool, gets
/// [`PoolError::Cycle`][crate::PoolError::Cycle] from that request.
///
/// # Thread safety
///
/// This type is single-threaded and is neither [`Send`] nor [`Sync`].
#[derive(Clone)]
pub struct PoolRegistry {
    core: Rc<RefCell<RegistryCore<()>>>,
}

impl PoolRegistry {
    /// Creates an empty registry whose pools use the default [`PoolConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`PoolRegistry`].
    pub fn builder() -> PoolRegistryBuilder {
        PoolRegistryBuilder::new()
    }

    pub(crate) fn new_inner(default_config: PoolConfig) -> Self {
        Self {
            core: Rc::new(RefCell::new(RegistryCore::new(default_config, ()))),
        }
    }

    /// Rents an object from the pool of `T` objects named `name`, creating the pool first if
    /// it does not exist yet.
    ///
    /// When the pool has to be created, `factory` is awaited for the template and the pool is
    /// built with `clone_fn` and `hooks`. When the pool already exists (or is being created by
    /// another caller), these are not used.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Factory`][crate::PoolError::Factory] if the factory fails, either
    /// the one given here or the one of another caller whose creation this call waited on.
    pub async fn get<T, F, Fut, E, C>(
        &self,
        name: impl Into<Cow<'static, str>>,
        factory: F,
        clone_fn: C,
        hooks: Hooks<T>,
    ) -> Result<T>
    where
        T: Clone + ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        let (_, item) = self
            .resolve(PoolKey::of::<T>(name), None, factory, clone_fn, hooks)
            .await?;

        Ok(item)
    }

    /// Like [`get()`][Self::get] but also returns the handle of the object, for use with
    /// [`release_handle()`][Self::release_handle] and [`try_get()`][Self::try_get].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Factory`][crate::PoolError::Factory] if the factory fails.
    pub async fn get_with_handle<T, F, Fut, E, C>(
        &self,
        name: impl Into<Cow<'static, str>>,
        factory: F,
        clone_fn: C,
        hooks: Hooks<T>,
    ) -> Result<(Handle, T)>
    where
        T: Clone + ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        self.resolve(PoolKey::of::<T>(name), None, factory, clone_fn, hooks)
            .await
    }

    /// Like [`get_with_handle()`][Self::get_with_handle] but creates the pool with `config`
    /// instead of the default configuration of the registry.
    ///
    /// The configuration only matters if this call is the one that creates the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Factory`][crate::PoolError::Factory] if the factory fails.
    pub async fn get_configured<T, F, Fut, E, C>(
        &self,
        name: impl Into<Cow<'static, str>>,
        config: PoolConfig,
        factory: F,
        clone_fn: C,
        hooks: Hooks<T>,
    ) -> Result<(Handle, T)>
    where
        T: Clone + ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        self.resolve(PoolKey::of::<T>(name), Some(config), factory, clone_fn, hooks)
            .await
    }

    async fn resolve<T, F, Fut, E, C>(
        &self,
        key: PoolKey,
        config: Option<PoolConfig>,
        factory: F,
        clone_fn: C,
        hooks: Hooks<T>,
    ) -> Result<(Handle, T)>
    where
        T: Clone + ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        let build = move |config: PoolConfig, template: T| -> Box<dyn ErasedEntry> {
            let pool = SlotPool::new_inner(config, hooks, template, Box::new(clone_fn));
            Box::new(PoolEntry::new(pool))
        };

        get_or_create(&self.core, key, config, factory, build, |core, key| {
            core.entry_mut::<PoolEntry<T>>(key).map(PoolEntry::rent)
        })
        .await
    }

    /// Returns an object obtained from [`get()`][Self::get] to the pool it came from.
    ///
    /// The pool is found via the identity of the object, looking through every pool of `T`
    /// objects in the registry. Returns `false` and does nothing if no pool has this object on
    /// loan, e.g. because it has already been released.
    pub fn release<T>(&self, item: T) -> bool
    where
        T: Clone + ObjectIdentity + 'static,
    {
        let id = item.object_id();

        let released = self
            .core
            .borrow_mut()
            .find_map_entries::<T, PoolEntry<T>, _>(|_, entry| {
                let handle = entry.live.remove(&id)?;
                Some(entry.pool.release(handle))
            });

        match released {
            Some(true) => true,
            Some(false) => {
                warn!(
                    item_type = type_name::<T>(),
                    "released object was tracked but its handle was stale"
                );
                false
            }
            None => {
                warn!(
                    item_type = type_name::<T>(),
                    "released an object that no pool in the registry has on loan"
                );
                false
            }
        }
    }

    /// Returns the object that `handle` refers to in the pool of `T` objects named `name`.
    ///
    /// Returns `false` and does nothing if there is no such pool or the handle is not valid.
    pub fn release_handle<T>(&self, name: impl Into<Cow<'static, str>>, handle: Handle) -> bool
    where
        T: Clone + ObjectIdentity + 'static,
    {
        let key = PoolKey::of::<T>(name);

        let released = self
            .core
            .borrow_mut()
            .entry_mut::<PoolEntry<T>>(&key)
            .is_some_and(|entry| entry.release(handle));

        if !released {
            warn!(%key, ?handle, "released a handle that does not refer to an object on loan");
        }

        released
    }

    /// Gets the object `handle` refers to in the pool of `T` objects named `name`, if the
    /// handle is still valid. The object stays on loan.
    #[must_use]
    pub fn try_get<T>(&self, name: impl Into<Cow<'static, str>>, handle: Handle) -> Option<T>
    where
        T: Clone + ObjectIdentity + 'static,
    {
        let key = PoolKey::of::<T>(name);

        self.core
            .borrow()
            .entry::<PoolEntry<T>>(&key)
            .and_then(|entry| entry.pool.get(handle).cloned())
    }

    /// Whether a pool of `T` objects named `name` has been created.
    #[must_use]
    pub fn contains<T: 'static>(&self, name: impl Into<Cow<'static, str>>) -> bool {
        self.core.borrow().contains(&PoolKey::of::<T>(name))
    }

    /// A snapshot of the state of the pool of `T` objects named `name`, if it exists.
    #[must_use]
    pub fn stats<T: 'static>(&self, name: impl Into<Cow<'static, str>>) -> Option<PoolStats> {
        self.core.borrow().stats(&PoolKey::of::<T>(name))
    }

    /// The number of pools in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().len()
    }

    /// Whether the registry has no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of pool creations in progress.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.core.borrow().flights.len()
    }

    /// Returns every object on loan from every pool of the registry.
    ///
    /// All handles issued so far stop resolving and all objects on loan stop being tracked,
    /// so releasing them afterwards does nothing.
    pub fn clear_all(&self) {
        self.core.borrow_mut().clear_all();
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("core", &*self.core.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::Cell;
    use std::convert::Infallible;
    use std::io;

    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::{FutureExt, future};
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::PoolError;

    assert_not_impl_any!(PoolRegistry: Send, Sync);

    type Shared = Rc<Cell<u32>>;

    fn clone_shared(template: &Shared) -> Shared {
        Rc::new(Cell::new(template.get()))
    }

    fn ready_factory(
        value: u32,
    ) -> impl FnOnce() -> future::Ready<std::result::Result<Shared, Infallible>> {
        move || future::ready(Ok(Rc::new(Cell::new(value))))
    }

    #[test]
    fn creates_pool_on_first_request() {
        let registry = PoolRegistry::new();

        let item = block_on(registry.get("a", ready_factory(5), clone_shared, Hooks::new()))
            .unwrap();

        assert_eq!(item.get(), 5);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Shared>("a"));
        assert!(!registry.contains::<Shared>("b"));
    }

    #[test]
    fn existing_pool_skips_factory() {
        let registry = PoolRegistry::new();
        let calls = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let calls = Rc::clone(&calls);
            block_on(registry.get(
                "a",
                move || {
                    calls.set(calls.get() + 1);
                    future::ready(Ok::<_, Infallible>(Rc::new(Cell::new(0_u32))))
                },
                clone_shared,
                Hooks::new(),
            ))
            .unwrap();
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(registry.stats::<Shared>("a").unwrap().live, 3);
    }

    #[test]
    fn concurrent_requests_share_one_creation() {
        let registry = PoolRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let (sender, receiver) = oneshot::channel::<Shared>();

        let first = {
            let calls = Rc::clone(&calls);
            registry.get(
                "a",
                move || {
                    calls.set(calls.get() + 1);
                    receiver
                },
                clone_shared,
                Hooks::new(),
            )
        };

        let others: Vec<_> = (0..4)
            .map(|_| {
                let calls = Rc::clone(&calls);
                registry.get(
                    "a",
                    move || {
                        calls.set(calls.get() + 1);
                        future::ready(Ok::<_, oneshot::Canceled>(Rc::new(Cell::new(0))))
                    },
                    clone_shared,
                    Hooks::new(),
                )
            })
            .collect();

        let results = block_on(async {
            let mut first = first.boxed_local();
            assert!((&mut first).now_or_never().is_none());
            assert_eq!(registry.in_flight(), 1);

            // Everyone else joins the creation in flight.
            let others = future::join_all(others);
            let send = async {
                sender.send(Rc::new(Cell::new(9))).unwrap();
            };

            let (first, others, ()) = future::join3(first, others, send).await;
            (first, others)
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.in_flight(), 0);

        let (first, others) = results;
        assert_eq!(first.unwrap().get(), 9);
        for item in others {
            assert_eq!(item.unwrap().get(), 9);
        }

        assert_eq!(registry.stats::<Shared>("a").unwrap().live, 5);
    }

    #[test]
    fn failed_creation_can_be_retried() {
        let registry = PoolRegistry::new();

        let result = block_on(registry.get(
            "a",
            || future::ready(Err::<Shared, _>(io::Error::other("asset missing"))),
            clone_shared,
            Hooks::new(),
        ));

        assert!(matches!(result, Err(PoolError::Factory { .. })));
        assert!(!registry.contains::<Shared>("a"));
        assert_eq!(registry.in_flight(), 0);

        let item = block_on(registry.get("a", ready_factory(1), clone_shared, Hooks::new()))
            .unwrap();
        assert_eq!(item.get(), 1);
    }

    #[test]
    fn waiters_receive_the_failure() {
        let registry = PoolRegistry::new();
        let (sender, receiver) = oneshot::channel::<Shared>();

        let mut first = registry
            .get("a", move || receiver, clone_shared, Hooks::new())
            .boxed_local();
        let mut second = registry
            .get("a", ready_factory(0), clone_shared, Hooks::new())
            .boxed_local();

        assert!((&mut first).now_or_never().is_none());
        assert!((&mut second).now_or_never().is_none());

        // Dropping the sender fails the factory.
        drop(sender);
        let (first, second) = block_on(future::join(first, second));

        assert!(first.is_err());
        assert!(second.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn abandoned_creation_does_not_poison_key() {
        let registry = PoolRegistry::new();
        let (_sender, receiver) = oneshot::channel::<Shared>();

        let mut abandoned = registry
            .get("a", move || receiver, clone_shared, Hooks::new())
            .boxed_local();
        assert!((&mut abandoned).now_or_never().is_none());
        assert_eq!(registry.in_flight(), 1);

        drop(abandoned);
        assert_eq!(registry.in_flight(), 0);

        let item = block_on(registry.get("a", ready_factory(3), clone_shared, Hooks::new()))
            .unwrap();
        assert_eq!(item.get(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_keys_do_not_wait_for_each_other() {
        let registry = PoolRegistry::new();
        let (_sender, receiver) = oneshot::channel::<Shared>();

        let mut slow = registry
            .get("slow", move || receiver, clone_shared, Hooks::new())
            .boxed_local();
        assert!((&mut slow).now_or_never().is_none());

        let fast = registry
            .get("fast", ready_factory(1), clone_shared, Hooks::new())
            .now_or_never();

        assert!(matches!(fast, Some(Ok(_))));
        assert!(registry.contains::<Shared>("fast"));
        assert!(!registry.contains::<Shared>("slow"));
    }

    #[test]
    fn same_name_different_types_are_different_pools() {
        let registry = PoolRegistry::new();

        block_on(registry.get("a", ready_factory(1), clone_shared, Hooks::new())).unwrap();
        block_on(registry.get(
            "a",
            || future::ready(Ok::<_, Infallible>(Rc::new(String::from("text")))),
            |t: &Rc<String>| Rc::new(String::clone(t)),
            Hooks::new(),
        ))
        .unwrap();

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn release_by_value_returns_to_owning_pool() {
        let registry = PoolRegistry::new();

        let a = block_on(registry.get("a", ready_factory(1), clone_shared, Hooks::new())).unwrap();
        let b = block_on(registry.get("b", ready_factory(2), clone_shared, Hooks::new())).unwrap();

        assert!(registry.release(Rc::clone(&b)));

        assert_eq!(registry.stats::<Shared>("a").unwrap().live, 1);
        assert_eq!(registry.stats::<Shared>("b").unwrap().live, 0);
        assert_eq!(registry.stats::<Shared>("b").unwrap().idle, 1);

        // Already released.
        assert!(!registry.release(b));
        assert!(registry.release(a));
    }

    #[test]
    fn release_of_unknown_object_is_noop() {
        let registry = PoolRegistry::new();
        block_on(registry.get("a", ready_factory(1), clone_shared, Hooks::new())).unwrap();

        assert!(!registry.release(Rc::new(Cell::new(1_u32))));
        assert!(!registry.release(Rc::new(String::new())));
        assert_eq!(registry.stats::<Shared>("a").unwrap().live, 1);
    }

    #[test]
    fn release_by_handle() {
        let registry = PoolRegistry::new();

        let (handle, item) = block_on(registry.get_with_handle(
            "a",
            ready_factory(4),
            clone_shared,
            Hooks::new(),
        ))
        .unwrap();

        let looked_up = registry.try_get::<Shared>("a", handle).unwrap();
        assert!(Rc::ptr_eq(&looked_up, &item));

        assert!(registry.release_handle::<Shared>("a", handle));
        assert!(!registry.release_handle::<Shared>("a", handle));
        assert!(registry.try_get::<Shared>("a", handle).is_none());

        // The identity mapping went away with the handle.
        assert!(!registry.release(item));
    }

    #[test]
    fn release_handle_for_missing_pool_is_noop() {
        let registry = PoolRegistry::new();

        assert!(!registry.release_handle::<Shared>("nope", Handle::INVALID));
    }

    #[test]
    fn recycled_objects_are_reused() {
        let registry = PoolRegistry::new();
        let clones = Rc::new(Cell::new(0));

        let clone_fn = {
            let clones = Rc::clone(&clones);
            move |template: &Shared| {
                clones.set(clones.get() + 1);
                clone_shared(template)
            }
        };

        let first = block_on(registry.get("a", ready_factory(0), clone_fn, Hooks::new())).unwrap();
        registry.release(Rc::clone(&first));

        let second = block_on(registry.get(
            "a",
            ready_factory(0),
            |t: &Shared| clone_shared(t),
            Hooks::new(),
        ))
        .unwrap();

        assert_eq!(clones.get(), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn hooks_are_applied() {
        let registry = PoolRegistry::new();

        let hooks = Hooks::new()
            .on_acquire(|s: &mut Shared| s.set(s.get() + 100))
            .on_release(|s: &mut Shared| s.set(0));

        let item = block_on(registry.get("a", ready_factory(1), clone_shared, hooks)).unwrap();
        assert_eq!(item.get(), 101);

        registry.release(Rc::clone(&item));
        assert_eq!(item.get(), 0);
    }

    #[test]
    fn configured_pool_uses_config() {
        let registry = PoolRegistry::builder()
            .default_config(PoolConfig::new().initial_capacity(2))
            .build();

        block_on(registry.get("default", ready_factory(0), clone_shared, Hooks::new())).unwrap();
        block_on(registry.get_configured(
            "custom",
            PoolConfig::new().initial_capacity(8).prewarm(3),
            ready_factory(0),
            clone_shared,
            Hooks::new(),
        ))
        .unwrap();

        assert_eq!(registry.stats::<Shared>("default").unwrap().capacity, 2);

        let custom = registry.stats::<Shared>("custom").unwrap();
        assert_eq!(custom.capacity, 8);
        assert_eq!(custom.idle, 2);
        assert_eq!(custom.created, 3);
    }

    #[test]
    fn clear_all_takes_everything_back() {
        let registry = PoolRegistry::new();

        let (handle, item) = block_on(registry.get_with_handle(
            "a",
            ready_factory(0),
            clone_shared,
            Hooks::new(),
        ))
        .unwrap();
        block_on(registry.get("b", ready_factory(0), clone_shared, Hooks::new())).unwrap();

        registry.clear_all();

        assert_eq!(registry.stats::<Shared>("a").unwrap().live, 0);
        assert_eq!(registry.stats::<Shared>("b").unwrap().live, 0);
        assert!(registry.try_get::<Shared>("a", handle).is_none());
        assert!(!registry.release(item));
    }

    #[test]
    fn dropping_registry_destroys_pools() {
        let destroyed = Rc::new(Cell::new(0));

        {
            let registry = PoolRegistry::new();
            let counter = Rc::clone(&destroyed);
            let hooks = Hooks::new().on_destroy(move |_: &mut Shared| counter.set(counter.get() + 1));

            let a = block_on(registry.get("a", ready_factory(0), clone_shared, hooks)).unwrap();
            let hooks = Hooks::new();
            block_on(registry.get("a", ready_factory(0), clone_shared, hooks)).unwrap();
            registry.release(a);

            let clone = registry.clone();
            drop(registry);
            assert_eq!(destroyed.get(), 0);
            drop(clone);
        }

        assert_eq!(destroyed.get(), 2);
    }

    #[test]
    fn factory_may_use_the_registry() {
        let registry = PoolRegistry::new();
        let inner = registry.clone();

        let item = block_on(registry.get(
            "outer",
            async move || {
                let dependency = inner
                    .get("inner", ready_factory(7), clone_shared, Hooks::new())
                    .await
                    .unwrap();
                Ok::<_, Infallible>(Rc::new(Cell::new(dependency.get() * 2)))
            },
            clone_shared,
            Hooks::new(),
        ))
        .unwrap();

        assert_eq!(item.get(), 14);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn factory_requesting_its_own_pool_fails() {
        let registry = PoolRegistry::new();
        let inner = registry.clone();

        let result = registry
            .get(
                "loop",
                async move || {
                    inner
                        .get("loop", ready_factory(1), clone_shared, Hooks::new())
                        .await
                },
                clone_shared,
                Hooks::new(),
            )
            .now_or_never()
            .expect("the cycle is reported without waiting");

        let Err(PoolError::Factory { key, source }) = result else {
            panic!("expected a factory error");
        };
        assert!(key.contains("loop"));
        assert!(matches!(
            source.downcast_ref::<PoolError>(),
            Some(PoolError::Cycle { .. })
        ));

        assert!(registry.is_empty());
        assert_eq!(registry.in_flight(), 0);

        // The key is usable again with a well-behaved factory.
        let item = block_on(registry.get("loop", ready_factory(2), clone_shared, Hooks::new()))
            .unwrap();
        assert_eq!(item.get(), 2);
    }

    #[test]
    fn indirect_cycle_fails_every_creation_in_it() {
        let registry = PoolRegistry::new();
        let for_a = registry.clone();

        let result = registry
            .get(
                "a",
                async move || {
                    let for_b = for_a.clone();
                    for_a
                        .get(
                            "b",
                            async move || {
                                for_b
                                    .get("a", ready_factory(1), clone_shared, Hooks::new())
                                    .await
                            },
                            clone_shared,
                            Hooks::new(),
                        )
                        .await
                },
                clone_shared,
                Hooks::new(),
            )
            .now_or_never()
            .expect("the cycle is reported without waiting");

        assert!(matches!(result, Err(PoolError::Factory { .. })));
        assert!(registry.is_empty());
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn same_name_of_another_type_is_not_a_cycle() {
        let registry = PoolRegistry::new();
        let inner = registry.clone();

        let item = block_on(registry.get(
            "asset",
            async move || {
                let other = inner
                    .get(
                        "asset",
                        || future::ready(Ok::<_, Infallible>(Rc::new(String::from("x")))),
                        |t: &Rc<String>| Rc::new(String::clone(t)),
                        Hooks::new(),
                    )
                    .await
                    .unwrap();
                Ok::<_, Infallible>(Rc::new(Cell::new(u32::try_from(other.len()).unwrap())))
            },
            clone_shared,
            Hooks::new(),
        ))
        .unwrap();

        assert_eq!(item.get(), 1);
        assert_eq!(registry.len(), 2);
    }
}
