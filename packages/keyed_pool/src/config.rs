use crate::DropPolicy;

/// Sizing and teardown settings shared by every kind of pool in this crate.
///
/// The pool builders carry a `PoolConfig` internally. The registries accept one directly, as the
/// default for every pool they create or for a single key.
///
/// # Example
///
/// ```rust
/// use keyed_pool::{DropPolicy, PoolConfig};
///
/// let config = PoolConfig::new()
///     .initial_capacity(4)
///     .max_idle(32)
///     .prewarm(2)
///     .drop_policy(DropPolicy::MustNotDropItems);
///
/// assert_eq!(config.get_initial_capacity(), 4);
/// assert_eq!(config.get_max_idle(), Some(32));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub struct PoolConfig {
    initial_capacity: usize,
    max_idle: Option<usize>,
    prewarm: usize,
    drop_policy: DropPolicy,
}

impl PoolConfig {
    /// The initial capacity used when none is specified.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

    /// Creates the default configuration: an initial capacity of
    /// [`DEFAULT_INITIAL_CAPACITY`][Self::DEFAULT_INITIAL_CAPACITY], no idle limit,
    /// no prewarming and [`DropPolicy::MayDropItems`].
    pub const fn new() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            max_idle: None,
            prewarm: 0,
            drop_policy: DropPolicy::MayDropItems,
        }
    }

    /// Sets how many objects the pool can track before its storage needs to grow.
    ///
    /// Storage doubles whenever it fills up, so this only affects how soon that happens.
    /// A value of zero is treated as one.
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Sets the maximum number of returned objects kept for reuse.
    ///
    /// Objects returned while the pool already holds this many idle objects are destroyed.
    pub const fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Sets the number of objects the pool creates up front, ready to be handed out. Capped at
    /// the maximum number of idle objects.
    pub const fn prewarm(mut self, count: usize) -> Self {
        self.prewarm = count;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool.
    pub const fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// The configured initial capacity, never less than one.
    #[must_use]
    pub const fn get_initial_capacity(&self) -> usize {
        if self.initial_capacity == 0 {
            1
        } else {
            self.initial_capacity
        }
    }

    /// The configured idle limit, if any.
    #[must_use]
    pub const fn get_max_idle(&self) -> Option<usize> {
        self.max_idle
    }

    /// The configured number of objects to create up front.
    #[must_use]
    pub const fn get_prewarm(&self) -> usize {
        self.prewarm
    }

    /// The configured drop policy.
    #[must_use]
    pub const fn get_drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PoolConfig::default();

        assert_eq!(
            config.get_initial_capacity(),
            PoolConfig::DEFAULT_INITIAL_CAPACITY
        );
        assert_eq!(config.get_max_idle(), None);
        assert_eq!(config.get_prewarm(), 0);
        assert_eq!(config.get_drop_policy(), DropPolicy::MayDropItems);
    }

    #[test]
    fn zero_capacity_becomes_one() {
        assert_eq!(PoolConfig::new().initial_capacity(0).get_initial_capacity(), 1);
    }
}
