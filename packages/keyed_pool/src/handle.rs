use std::fmt;

/// Identifies an object rented from a [`SlotPool`][crate::SlotPool].
///
/// A handle is a `(index, generation)` pair and carries no payload. It stays valid until the
/// object it refers to is released back to the pool, at which point the slot generation is
/// bumped and every handle previously issued for that slot stops resolving, even after the slot
/// is reused for a different object.
///
/// Two handles are equal only if both the index and the generation match.
///
/// # Example
///
/// ```rust
/// use keyed_pool::{Handle, SlotPool};
///
/// let mut pool = SlotPool::builder().build(0_u32, |template: &u32| *template);
///
/// let handle = pool.rent();
/// assert!(pool.get(handle).is_some());
///
/// assert!(pool.release(handle));
/// assert!(pool.get(handle).is_none());
///
/// assert!(Handle::INVALID.is_invalid());
/// ```
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// A handle that never refers to any object in any pool.
    ///
    /// This is also the [`Default`] value.
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    #[must_use]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index this handle refers to.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// The slot generation this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Whether this is the canonical invalid handle.
    ///
    /// A handle that is not the invalid handle may still be stale. Only the pool can tell.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.index == u32::MAX
    }

    /// The slot index as a `usize` suitable for indexing the pool's backing arrays.
    #[must_use]
    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            return f.write_str("Handle(invalid)");
        }

        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}
