use std::any::type_name;
use std::{fmt, thread};

use crate::{DropPolicy, Hooks, PoolConfig, PoolStats, StackPoolBuilder};

/// A last-in-first-out pool that hands its objects out by value.
///
/// This is the lightweight variant for call sites that only ever reuse by value: [`get()`][1]
/// moves an object out of the pool and [`release()`][2] moves it back in. No handle is issued
/// and nothing is validated on the way back, which keeps both operations to a push or pop on a
/// buffer plus the lifecycle hooks.
///
/// When the buffer is empty, a new object is made by invoking the clone function against the
/// template the pool was built with. The buffer doubles in size whenever it is full.
///
/// # Caller obligations
///
/// The pool cannot tell one object from another once it is back in the buffer. Releasing the
/// same object twice, or releasing an object that did not come from this pool, is not detected
/// and will cause the same object to be handed out to more than one caller (for shared pointer
/// types like `Rc`) or a foreign object to enter circulation. Use [`SlotPool`][3] if you need
/// stale or double releases to be rejected.
///
/// # Example
///
/// ```rust
/// use keyed_pool::StackPool;
///
/// let mut pool = StackPool::builder().build(vec![0_u8; 1024], Vec::clone);
///
/// let buffer = pool.get();
/// assert_eq!(buffer.len(), 1024);
/// pool.release(buffer);
///
/// // The released buffer is reused instead of cloning the template again.
/// let _buffer = pool.get();
/// assert_eq!(pool.stats().created, 1);
/// ```
///
/// [1]: Self::get
/// [2]: Self::release
/// [3]: crate::SlotPool
pub struct StackPool<T> {
    /// Idle objects, most recently released last.
    buffer: Vec<T>,

    template: T,
    clone_fn: Box<dyn Fn(&T) -> T>,
    hooks: Hooks<T>,

    max_idle: Option<usize>,
    drop_policy: DropPolicy,

    /// Objects handed out and not yet released. Only as accurate as the callers are honest.
    on_loan: usize,

    created: u64,
    destroyed: u64,
}

impl<T> StackPool<T> {
    /// Starts building a new [`StackPool`].
    pub fn builder() -> StackPoolBuilder<T> {
        StackPoolBuilder::new()
    }

    pub(crate) fn new_inner(
        config: PoolConfig,
        hooks: Hooks<T>,
        template: T,
        clone_fn: Box<dyn Fn(&T) -> T>,
    ) -> Self {
        let mut pool = Self {
            buffer: Vec::with_capacity(config.get_initial_capacity()),
            template,
            clone_fn,
            hooks,
            max_idle: config.get_max_idle(),
            drop_policy: config.get_drop_policy(),
            on_loan: 0,
            created: 0,
            destroyed: 0,
        };

        pool.prewarm(config.get_prewarm());

        pool
    }

    /// Takes an object from the pool, creating one from the template if none are idle.
    ///
    /// The acquire hook runs before the object is returned.
    #[must_use]
    pub fn get(&mut self) -> T {
        let mut item = match self.buffer.pop() {
            Some(item) => item,
            None => self.create(),
        };

        self.hooks.acquire(&mut item);
        self.on_loan = self.on_loan.saturating_add(1);

        item
    }

    /// Hands an object back to the pool for reuse.
    ///
    /// The release hook runs first. If the pool is already holding as many idle objects as its
    /// idle limit allows, the object is destroyed instead of being buffered.
    ///
    /// The object must have come from [`get()`][Self::get] on this pool and must not be released
    /// more than once. This is not checked.
    pub fn release(&mut self, mut item: T) {
        self.hooks.release(&mut item);
        self.on_loan = self.on_loan.saturating_sub(1);

        if self.max_idle.is_some_and(|max| self.buffer.len() >= max) {
            self.destroy(item);
            return;
        }

        if self.buffer.len() == self.buffer.capacity() {
            // Double the buffer.
            self.buffer.reserve_exact(self.buffer.capacity().max(1));
        }

        self.buffer.push(item);
    }

    /// Creates objects until at least `count` are idle, or as many as the idle limit allows.
    pub fn prewarm(&mut self, count: usize) {
        let count = self.max_idle.map_or(count, |max| count.min(max));

        while self.buffer.len() < count {
            let item = self.create();
            self.buffer.push(item);
        }
    }

    /// Destroys every idle object and releases the memory of the buffer.
    ///
    /// Objects on loan are not affected and may still be released afterwards.
    pub fn shrink_to_fit(&mut self) {
        while let Some(item) = self.buffer.pop() {
            self.destroy(item);
        }

        self.buffer.shrink_to_fit();
    }

    /// The number of idle objects ready to be handed out.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.buffer.len()
    }

    /// The number of objects handed out and not yet released.
    #[must_use]
    pub fn on_loan(&self) -> usize {
        self.on_loan
    }

    /// The number of idle objects the buffer can hold before it has to grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The prototype that new objects are cloned from.
    #[must_use]
    pub fn template(&self) -> &T {
        &self.template
    }

    /// A snapshot of the current state of the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.on_loan,
            idle: self.buffer.len(),
            capacity: self.buffer.capacity(),
            created: self.created,
            destroyed: self.destroyed,
        }
    }

    /// Destroys an object that is on loan instead of taking it back.
    pub(crate) fn discard(&mut self, item: T) {
        self.forget_loan();
        self.destroy(item);
    }

    /// Stops accounting for one object on loan that will not come back.
    pub(crate) fn forget_loan(&mut self) {
        self.on_loan = self.on_loan.saturating_sub(1);
    }

    /// Stops accounting for the objects on loan. Releasing them later is still allowed.
    pub(crate) fn forget_loans(&mut self) {
        self.on_loan = 0;
    }

    fn create(&mut self) -> T {
        self.created = self.created.saturating_add(1);
        (self.clone_fn)(&self.template)
    }

    fn destroy(&mut self, mut item: T) {
        self.hooks.destroy(&mut item);
        self.destroyed = self.destroyed.saturating_add(1);
    }
}

impl<T> fmt::Debug for StackPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("idle", &self.buffer.len())
            .field("on_loan", &self.on_loan)
            .field("max_idle", &self.max_idle)
            .field("drop_policy", &self.drop_policy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for StackPool<T> {
    fn drop(&mut self) {
        let was_empty = self.on_loan == 0;

        while let Some(item) = self.buffer.pop() {
            self.destroy(item);
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a StackPool of {} with objects still on loan, with a policy that says all objects must be returned first",
                type_name::<T>()
            );
        }
    }
}
