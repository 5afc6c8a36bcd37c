use std::any::type_name;
use std::collections::VecDeque;
use std::{fmt, thread};

use tracing::debug;

use crate::{DropPolicy, Handle, Hooks, PoolConfig, PoolStats, SlotPoolBuilder, StackPool};

/// Marks a slot that does not currently refer to a dense position.
const VACANT: u32 = u32::MAX;

/// An object pool that hands out generational [`Handle`]s to its objects and rejects stale ones.
///
/// Renting an object takes one from the pool's recycle strategy (a reused idle object, or a
/// fresh clone of the template), runs the acquire hook and records it under a slot. The returned
/// handle resolves to the object until the object is [released][1]. Releasing bumps the slot
/// generation, so the handle (and any copy of it) stops resolving even after the slot has been
/// reused for another object.
///
/// Live objects are kept packed in a dense array, with a sparse slot table mapping the stable
/// slot index of each handle to a position in that array. Renting, releasing and looking up are
/// all O(1); iterating over live objects touches only the dense array. The backing arrays double
/// when full.
///
/// # Example
///
/// ```rust
/// use keyed_pool::SlotPool;
///
/// let mut pool = SlotPool::builder().build(String::from("enemy"), String::clone);
///
/// let a = pool.rent();
/// let b = pool.rent();
///
/// pool.get_mut(a).unwrap().push_str(" #1");
/// assert_eq!(pool.get(a).map(String::as_str), Some("enemy #1"));
///
/// assert!(pool.release(a));
/// assert!(!pool.release(a)); // Already released.
/// assert!(pool.get(a).is_none());
///
/// assert_eq!(pool.len(), 1);
/// # pool.release(b);
/// ```
///
/// # Thread safety
///
/// The pool is meant to be driven by a single control flow (e.g. a per-frame update loop) and
/// is neither [`Send`] nor [`Sync`], because its clone function and hooks are not required to be.
///
/// [1]: Self::release
pub struct SlotPool<T> {
    /// Creates and recycles objects. Holds the idle objects, the template and the hooks.
    strategy: StackPool<T>,

    /// Live objects, packed at the front. The length is the number of outstanding handles.
    dense: Vec<T>,

    /// For each dense position, the slot that refers to it.
    dense_to_sparse: Vec<u32>,

    /// For each slot, the dense position of its object or `VACANT`.
    /// The length of this is the capacity of the pool.
    sparse: Vec<u32>,

    /// For each slot, the generation of the handle that currently refers to it.
    /// Bumped every time the slot is vacated.
    generations: Vec<u32>,

    /// Slots that were vacated and can be reused.
    free_slots: VecDeque<u32>,

    drop_policy: DropPolicy,
}

impl<T> SlotPool<T> {
    /// Starts building a new [`SlotPool`].
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    pub(crate) fn new_inner(
        config: PoolConfig,
        hooks: Hooks<T>,
        template: T,
        clone_fn: Box<dyn Fn(&T) -> T>,
    ) -> Self {
        let capacity = config.get_initial_capacity();

        assert!(
            u32::try_from(capacity).is_ok_and(|c| c < u32::MAX),
            "SlotPool capacity must fit in a handle index"
        );

        // Outstanding objects are accounted for by the slot pool itself.
        let strategy = StackPool::new_inner(
            config.drop_policy(DropPolicy::MayDropItems),
            hooks,
            template,
            clone_fn,
        );

        Self {
            strategy,
            dense: Vec::with_capacity(capacity),
            dense_to_sparse: Vec::with_capacity(capacity),
            sparse: vec![VACANT; capacity],
            generations: vec![0; capacity],
            free_slots: VecDeque::new(),
            drop_policy: config.get_drop_policy(),
        }
    }

    /// The number of objects on loan, which is the number of handles that currently resolve.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether no objects are on loan.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// The number of objects the pool can track before its backing arrays have to grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    /// The number of returned objects waiting to be reused.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.strategy.idle()
    }

    /// The prototype that new objects are cloned from.
    #[must_use]
    pub fn template(&self) -> &T {
        self.strategy.template()
    }

    /// A snapshot of the current state of the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.dense.len(),
            capacity: self.capacity(),
            ..self.strategy.stats()
        }
    }

    /// Rents an object from the pool and returns the handle that refers to it.
    ///
    /// An idle object is reused if there is one, otherwise the template is cloned. The acquire
    /// hook runs before this returns.
    #[must_use = "an object that is never released stays on loan until the pool is cleared"]
    pub fn rent(&mut self) -> Handle {
        if self.dense.len() == self.capacity() {
            self.grow();
        }

        let item = self.strategy.get();

        let dense_index = self.dense.len();
        let dense_index_u32 =
            u32::try_from(dense_index).expect("dense index is bounded by capacity, which fits u32");

        let slot = self.free_slots.pop_front().unwrap_or(dense_index_u32);

        self.dense.push(item);
        self.dense_to_sparse.push(slot);

        *self
            .sparse
            .get_mut(slot as usize)
            .expect("slots handed out are always within capacity") = dense_index_u32;

        let generation = *self
            .generations
            .get(slot as usize)
            .expect("slots handed out are always within capacity");

        Handle::new(slot, generation)
    }

    /// Rents an object and returns both its handle and an exclusive reference to it.
    pub fn rent_mut(&mut self) -> (Handle, &mut T) {
        let handle = self.rent();

        let item = self
            .dense
            .last_mut()
            .expect("we just pushed an object into the dense array");

        (handle, item)
    }

    /// Gets the object a handle refers to, if the handle is still valid.
    ///
    /// Returns `None` if the handle was never issued by this pool, if its object has been
    /// released, or if its slot has since been reused for another object.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let dense_index = self.dense_index(handle)?;
        self.dense.get(dense_index)
    }

    /// Gets an exclusive reference to the object a handle refers to, if the handle is still
    /// valid.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let dense_index = self.dense_index(handle)?;
        self.dense.get_mut(dense_index)
    }

    /// Whether the handle currently refers to an object in this pool.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.dense_index(handle).is_some()
    }

    /// Returns the object a handle refers to back to the pool.
    ///
    /// The release hook runs and the object becomes available for reuse. Every copy of the
    /// handle stops resolving. Returns `false` without doing anything if the handle is not
    /// valid, which includes releasing the same handle twice.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(dense_index) = self.dense_index(handle) else {
            return false;
        };

        // Swap-remove keeps the dense array packed: the last object takes the vacated position.
        let item = self.dense.swap_remove(dense_index);
        self.dense_to_sparse.swap_remove(dense_index);

        if let Some(&moved_slot) = self.dense_to_sparse.get(dense_index) {
            *self
                .sparse
                .get_mut(moved_slot as usize)
                .expect("every dense object has a slot within capacity") = u32::try_from(
                dense_index,
            )
            .expect("dense index is bounded by capacity, which fits u32");
        }

        self.vacate(handle.slot());
        self.free_slots.push_back(handle.index());

        self.strategy.release(item);

        true
    }

    /// Returns every object on loan back to the pool.
    ///
    /// The release hook runs for each object. Every handle issued so far stops resolving and
    /// slot generations are preserved, so no handle issued before the clear can ever resolve
    /// again.
    pub fn clear(&mut self) {
        for slot in self.dense_to_sparse.drain(..) {
            let generation = self
                .generations
                .get_mut(slot as usize)
                .expect("every dense object has a slot within capacity");

            *generation = generation.wrapping_add(1);
        }

        for item in self.dense.drain(..) {
            self.strategy.release(item);
        }

        self.free_slots.clear();
        self.sparse.fill(VACANT);
    }

    /// Destroys every idle object. Objects on loan are not affected.
    pub fn shrink_to_fit(&mut self) {
        self.strategy.shrink_to_fit();
    }

    /// Iterates over the objects on loan together with their handles, in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.dense_to_sparse
            .iter()
            .zip(&self.dense)
            .map(|(&slot, item)| (self.handle_for(slot), item))
    }

    /// Iterates over exclusive references to the objects on loan, in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.dense.iter_mut()
    }

    fn handle_for(&self, slot: u32) -> Handle {
        let generation = *self
            .generations
            .get(slot as usize)
            .expect("every dense object has a slot within capacity");

        Handle::new(slot, generation)
    }

    fn dense_index(&self, handle: Handle) -> Option<usize> {
        let slot = handle.slot();

        if *self.generations.get(slot)? != handle.generation() {
            return None;
        }

        let dense_index = *self.sparse.get(slot)? as usize;

        // A vacant slot has a dense index of u32::MAX, which is never below the len.
        (dense_index < self.dense.len()).then_some(dense_index)
    }

    fn vacate(&mut self, slot: usize) {
        let generation = self
            .generations
            .get_mut(slot)
            .expect("vacated slot must be within capacity");

        *generation = generation.wrapping_add(1);

        *self
            .sparse
            .get_mut(slot)
            .expect("vacated slot must be within capacity") = VACANT;
    }

    #[cfg_attr(test, mutants::skip)] // Growth is only observable via capacity.
    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity
            .checked_mul(2)
            .filter(|c| u32::try_from(*c).is_ok_and(|c| c < u32::MAX))
            .expect("SlotPool capacity exceeded the range of a handle index");

        self.sparse.resize(new_capacity, VACANT);
        self.generations.resize(new_capacity, 0);

        let additional = new_capacity.saturating_sub(self.dense.len());
        self.dense.reserve_exact(additional);
        self.dense_to_sparse.reserve_exact(additional);

        debug!(
            item_type = type_name::<T>(),
            old_capacity, new_capacity, "slot pool grew"
        );
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("len", &self.dense.len())
            .field("capacity", &self.capacity())
            .field("free_slots", &self.free_slots.len())
            .field("drop_policy", &self.drop_policy)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let was_empty = self.dense.is_empty();

        for item in self.dense.drain(..) {
            self.strategy.discard(item);
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a SlotPool of {} with objects still on loan, with a policy that says all objects must be returned first",
                type_name::<T>()
            );
        }
    }
}
