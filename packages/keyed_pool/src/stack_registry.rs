use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use foldhash::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::{
    ErasedEntry, Hooks, ObjectId, ObjectIdentity, PoolConfig, PoolKey, PoolStats, RegistryCore,
    StackPool, StackPoolRegistryBuilder, get_or_create,
};

/// The pool that each object on loan was taken from.
type Loans = HashMap<(TypeId, ObjectId), PoolKey>;

impl<T: 'static> ErasedEntry for StackPool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear(&mut self) {
        self.forget_loans();
        self.shrink_to_fit();
    }

    fn stats(&self) -> PoolStats {
        StackPool::stats(self)
    }
}

/// A collection of [`StackPool`]s addressed by [`PoolKey`], created on demand from an
/// asynchronous factory.
///
/// This offers the same on-demand creation as [`PoolRegistry`][crate::PoolRegistry], with
/// at most one factory call in flight per key, but hands out objects by value. The caller owns
/// each object until it gives it back with [`release()`][Self::release], which finds the pool
/// the object came from via its [identity][ObjectIdentity].
///
/// # Example
///
/// ```rust
/// use std::convert::Infallible;
///
/// use futures::executor::block_on;
/// use keyed_pool::{Hooks, StackPoolRegistry};
///
/// let registry = StackPoolRegistry::new();
///
/// # block_on(async {
/// let mut buffer = registry
///     .get(
///         "scratch",
///         || async { Ok::<_, Infallible>(Box::new(Vec::<u8>::with_capacity(4096))) },
///         |template: &Box<Vec<u8>>| template.clone(),
///         Hooks::new().on_release(|b: &mut Box<Vec<u8>>| b.clear()),
///     )
///     .await
///     .unwrap();
///
/// buffer.extend_from_slice(b"hello");
///
/// // Recognized objects are taken back, anything else is handed back.
/// assert!(registry.release(buffer).is_none());
/// assert!(registry.release(Box::new(Vec::<u8>::new())).is_some());
/// # });
/// ```
///
/// # Re-entrancy
///
/// Clone functions and hooks must not call back into the same registry. Factories may, except
/// to request the pool they are creating, which fails with
/// [`PoolError::Cycle`][crate::PoolError::Cycle].
///
/// # Thread safety
///
/// This type is single-threaded and is neither [`Send`] nor [`Sync`].
#[derive(Clone)]
pub struct StackPoolRegistry {
    core: Rc<RefCell<RegistryCore<Loans>>>,
}

impl StackPoolRegistry {
    /// Creates an empty registry whose pools use the default [`PoolConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`StackPoolRegistry`].
    pub fn builder() -> StackPoolRegistryBuilder {
        StackPoolRegistryBuilder::new()
    }

    pub(crate) fn new_inner(default_config: PoolConfig) -> Self {
        Self {
            core: Rc::new(RefCell::new(RegistryCore::new(
                default_config,
                Loans::default(),
            ))),
        }
    }

    /// Takes an object from the pool of `T` objects named `name`, creating the pool first if
    /// it does not exist yet.
    ///
    /// `factory`, `clone_fn` and `hooks` are only used if this call creates the pool.
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
        T: ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        self.resolve(PoolKey::of::<T>(name), None, factory, clone_fn, hooks)
            .await
    }

    /// Like [`get()`][Self::get] but creates the pool with `config` instead of the default
    /// configuration of the registry.
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
    ) -> Result<T>
    where
        T: ObjectIdentity + 'static,
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
    ) -> Result<T>
    where
        T: ObjectIdentity + 'static,
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + 'static,
        E: StdError + Send + Sync + 'static,
        C: Fn(&T) -> T + 'static,
    {
        let build = move |config: PoolConfig, template: T| -> Box<dyn ErasedEntry> {
            Box::new(StackPool::new_inner(
                config,
                hooks,
                template,
                Box::new(clone_fn),
            ))
        };

        get_or_create(&self.core, key, config, factory, build, |core, key| {
            let item = core.entry_mut::<StackPool<T>>(key)?.get();

            let loan = (TypeId::of::<T>(), item.object_id());
            if core.extra.insert(loan, key.clone()).is_some() {
                warn!(
                    item_type = type_name::<T>(),
                    "pooled objects share an identity, release will be unreliable"
                );
            }

            Some(item)
        })
        .await
    }

    /// Gives an object obtained from [`get()`][Self::get] back to the pool it came from.
    ///
    /// Returns `None` if the object was taken back. Returns the object itself if the registry
    /// does not know of it (e.g. it did not come from this registry or was already released),
    /// leaving it to the caller to decide what to do with it.
    ///
    /// Objects are recognized by their [identity][ObjectIdentity], which for address based
    /// identities is only unique while the object is alive. Every object on loan must therefore
    /// be released or [forgotten][Self::forget] before it is dropped. If a loaned object is
    /// dropped while the registry still tracks it, an unrelated object that later ends up at
    /// the same address will be accepted as if it were the dropped one.
    #[must_use = "an unrecognized object is handed back instead of being pooled"]
    pub fn release<T>(&self, item: T) -> Option<T>
    where
        T: ObjectIdentity + 'static,
    {
        let mut core = self.core.borrow_mut();

        let Some(key) = core.extra.remove(&(TypeId::of::<T>(), item.object_id())) else {
            warn!(
                item_type = type_name::<T>(),
                "released an object that no pool in the registry has on loan"
            );
            return Some(item);
        };

        core.entry_mut::<StackPool<T>>(&key)
            .expect("loans only ever refer to registered pools")
            .release(item);

        None
    }

    /// Stops tracking an object obtained from [`get()`][Self::get] without taking it back.
    ///
    /// Use this for objects that will be dropped or kept instead of being released. The pool
    /// no longer counts the object as on loan and a later [`release()`][Self::release] of it
    /// hands it back. Returns `false` if the registry does not have the object on loan.
    pub fn forget<T>(&self, item: &T) -> bool
    where
        T: ObjectIdentity + 'static,
    {
        let mut core = self.core.borrow_mut();

        let Some(key) = core.extra.remove(&(TypeId::of::<T>(), item.object_id())) else {
            return false;
        };

        core.entry_mut::<StackPool<T>>(&key)
            .expect("loans only ever refer to registered pools")
            .forget_loan();

        true
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

    /// Forgets every object on loan and destroys every idle object, in every pool.
    ///
    /// Objects on loan remain with their holders; releasing them afterwards hands them back.
    pub fn clear_all(&self) {
        let mut core = self.core.borrow_mut();
        core.extra.clear();
        core.clear_all();
    }
}

impl Default for StackPoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StackPoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();

        f.debug_struct("StackPoolRegistry")
            .field("core", &*core)
            .field("on_loan", &core.extra.len())
            .finish()
    }
}
