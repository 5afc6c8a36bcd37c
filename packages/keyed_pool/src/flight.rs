//! Single-flight coordination of pool creation.
//!
//! The first caller to request an unknown key starts the creation of its pool. Everyone else
//! asking for the same key while that is in progress awaits the same shared future instead of
//! invoking the factory again.
//!
//! Only a weak reference to the shared future is kept here. If every caller awaiting a creation
//! gives up (drops its future), the creation is dropped with them and the weak reference no
//! longer upgrades, so the next caller simply starts a fresh creation.
//!
//! While a factory is being polled, its key is marked as creating. Everything polled in that
//! time runs inside the factory, so a request for a creating key can only come from the factory
//! itself (or from the factory of a pool it requested) and is rejected as a cycle instead of
//! waiting on itself forever.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::future::{Future, poll_fn};
use std::pin::pin;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared, WeakShared};
use tracing::{debug, trace};

use crate::error::Result;
use crate::{ErasedEntry, PoolConfig, PoolError, PoolKey, RegistryCore};

type CreationFuture = LocalBoxFuture<'static, Result<()>>;

/// An in-flight pool creation that callers can await.
pub(crate) type Creation = Shared<CreationFuture>;

/// Pool creations that are currently in progress, by key.
pub(crate) struct InFlight {
    pending: HashMap<PoolKey, WeakShared<CreationFuture>>,

    // Keys whose factory is being polled right now, innermost last.
    creating: Vec<PoolKey>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            pending: HashMap::new(),
            creating: Vec::new(),
        }
    }

    /// Joins the creation in progress for `key`, if any caller is still waiting on it.
    pub(crate) fn join(&self, key: &PoolKey) -> Option<Creation> {
        self.pending.get(key).and_then(WeakShared::upgrade)
    }

    /// Registers a new creation for `key`, replacing any abandoned one.
    pub(crate) fn start(&mut self, key: PoolKey, creation: CreationFuture) -> Creation {
        let shared = creation.shared();

        let weak = shared
            .downgrade()
            .expect("a creation that has never been polled cannot have completed");

        self.pending.insert(key, weak);

        shared
    }

    /// Forgets the creation for `key` once it has produced its result.
    pub(crate) fn finish(&mut self, key: &PoolKey) {
        self.pending.remove(key);
    }

    /// Marks the factory of `key` as being polled.
    pub(crate) fn enter(&mut self, key: &PoolKey) {
        self.creating.push(key.clone());
    }

    /// Marks the factory of `key` as no longer being polled.
    pub(crate) fn exit(&mut self, key: &PoolKey) {
        if let Some(index) = self.creating.iter().rposition(|k| k == key) {
            self.creating.remove(index);
        }
    }

    /// Whether we are inside a poll of the factory of `key`.
    pub(crate) fn is_creating(&self, key: &PoolKey) -> bool {
        self.creating.contains(key)
    }

    /// The number of creations that still have callers waiting on them.
    pub(crate) fn len(&self) -> usize {
        self.pending
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }
}

/// Rents from the pool of `key`, creating the pool first if it does not exist yet.
///
/// `rent` is attempted first and again after every creation this caller awaits. If no pool
/// exists and no creation is in flight, this caller starts one with `factory` and `build`.
///
/// Fails with [`PoolError::Cycle`] if called from within the factory creating the same pool.
///
/// The registry state is never borrowed across an await point.
pub(crate) async fn get_or_create<X, T, R, F, Fut, E, B>(
    core: &Rc<RefCell<RegistryCore<X>>>,
    key: PoolKey,
    config: Option<PoolConfig>,
    factory: F,
    build: B,
    mut rent: impl FnMut(&mut RegistryCore<X>, &PoolKey) -> Option<R>,
) -> Result<R>
where
    X: 'static,
    T: 'static,
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + 'static,
    E: StdError + Send + Sync + 'static,
    B: FnOnce(PoolConfig, T) -> Box<dyn ErasedEntry> + 'static,
{
    let mut creation_inputs = Some((factory, build));

    loop {
        let creation = {
            let mut core_mut = core.borrow_mut();

            if let Some(rented) = rent(&mut core_mut, &key) {
                return Ok(rented);
            }

            if core_mut.flights.is_creating(&key) {
                debug!(%key, "pool requested by its own factory");
                return Err(PoolError::cycle(key.to_string()));
            }

            if let Some(creation) = core_mut.flights.join(&key) {
                trace!(%key, "waiting for in-flight pool creation");
                creation
            } else {
                let (factory, build) = creation_inputs
                    .take()
                    .expect("a pool always exists after its creation has succeeded");

                let config = config.unwrap_or(core_mut.default_config);
                let future = create(Rc::clone(core), key.clone(), config, factory, build);

                core_mut.flights.start(key.clone(), future.boxed_local())
            }
        };

        creation.await?;
    }
}

async fn create<X, T, F, Fut, E, B>(
    core: Rc<RefCell<RegistryCore<X>>>,
    key: PoolKey,
    config: PoolConfig,
    factory: F,
    build: B,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: StdError + Send + Sync + 'static,
    B: FnOnce(PoolConfig, T) -> Box<dyn ErasedEntry>,
{
    let mut pending = pin!(factory());

    let result = poll_fn(|cx| {
        let _creating = Creating::enter(&*core, &key);
        pending.as_mut().poll(cx)
    })
    .await;

    let mut core_mut = core.borrow_mut();
    core_mut.flights.finish(&key);

    match result {
        Ok(template) => {
            if core_mut.contains(&key) {
                debug!(%key, "pool already exists, discarding the new template");
            } else {
                core_mut.insert(key.clone(), build(config, template));
                debug!(%key, "created pool");
            }

            Ok(())
        }
        Err(error) => {
            debug!(%key, %error, "pool creation failed");
            Err(PoolError::factory(key.to_string(), error))
        }
    }
}

/// Keeps a key marked as creating for as long as it lives.
struct Creating<'a, X> {
    core: &'a RefCell<RegistryCore<X>>,
    key: &'a PoolKey,
}

impl<'a, X> Creating<'a, X> {
    fn enter(core: &'a RefCell<RegistryCore<X>>, key: &'a PoolKey) -> Self {
        core.borrow_mut().flights.enter(key);
        Self { core, key }
    }
}

impl<X> Drop for Creating<'_, X> {
    fn drop(&mut self) {
        self.core.borrow_mut().flights.exit(self.key);
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("creating", &self.creating)
            .finish()
    }
}
