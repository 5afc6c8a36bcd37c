use std::any::type_name;
use std::fmt;

use crate::{
    DropPolicy, Hooks, PoolConfig, PoolRegistry, SlotPool, StackPool, StackPoolRegistry,
};

/// Builder for creating an instance of [`SlotPool`].
///
/// # Examples
///
/// ```
/// use keyed_pool::{DropPolicy, Hooks, SlotPool};
///
/// let pool = SlotPool::builder()
///     .initial_capacity(64)
///     .max_idle(128)
///     .hooks(Hooks::new().on_release(|s: &mut String| s.clear()))
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build(String::with_capacity(256), String::clone);
///
/// assert_eq!(pool.capacity(), 64);
/// ```
#[must_use]
pub struct SlotPoolBuilder<T> {
    config: PoolConfig,
    hooks: Hooks<T>,
}

/// Builder for creating an instance of [`StackPool`].
///
/// # Examples
///
/// ```
/// use keyed_pool::StackPool;
///
/// let pool = StackPool::builder()
///     .initial_capacity(8)
///     .prewarm(8)
///     .build(vec![0.0_f32; 16], Vec::clone);
///
/// assert_eq!(pool.idle(), 8);
/// ```
#[must_use]
pub struct StackPoolBuilder<T> {
    config: PoolConfig,
    hooks: Hooks<T>,
}

/// Builder for creating an instance of [`PoolRegistry`].
///
/// # Examples
///
/// ```
/// use keyed_pool::{PoolConfig, PoolRegistry};
///
/// let registry = PoolRegistry::builder()
///     .default_config(PoolConfig::new().initial_capacity(4).max_idle(16))
///     .build();
///
/// assert!(registry.is_empty());
/// ```
#[derive(Debug)]
#[must_use]
pub struct PoolRegistryBuilder {
    default_config: PoolConfig,
}

/// Builder for creating an instance of [`StackPoolRegistry`].
#[derive(Debug)]
#[must_use]
pub struct StackPoolRegistryBuilder {
    default_config: PoolConfig,
}

impl PoolRegistryBuilder {
    pub(crate) fn new() -> Self {
        Self {
            default_config: PoolConfig::new(),
        }
    }

    /// Sets the configuration of pools created without an explicit one.
    pub fn default_config(mut self, config: PoolConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> PoolRegistry {
        PoolRegistry::new_inner(self.default_config)
    }
}

impl StackPoolRegistryBuilder {
    pub(crate) fn new() -> Self {
        Self {
            default_config: PoolConfig::new(),
        }
    }

    /// Sets the configuration of pools created without an explicit one.
    pub fn default_config(mut self, config: PoolConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> StackPoolRegistry {
        StackPoolRegistry::new_inner(self.default_config)
    }
}

macro_rules! common_builder_methods {
    () => {
        /// Replaces the whole configuration of the pool.
        pub fn config(mut self, config: PoolConfig) -> Self {
            self.config = config;
            self
        }

        /// Sets how many objects the pool can track before its storage needs to grow.
        ///
        /// Storage doubles whenever it fills up. A value of zero is treated as one.
        pub fn initial_capacity(mut self, capacity: usize) -> Self {
            self.config = self.config.initial_capacity(capacity);
            self
        }

        /// Sets the maximum number of returned objects kept for reuse. Objects returned beyond
        /// this limit are destroyed.
        pub fn max_idle(mut self, max_idle: usize) -> Self {
            self.config = self.config.max_idle(max_idle);
            self
        }

        /// Sets the number of objects created up front, ready to be handed out. Never more than
        /// the maximum number of idle objects are created.
        pub fn prewarm(mut self, count: usize) -> Self {
            self.config = self.config.prewarm(count);
            self
        }

        /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat objects
        /// still on loan when the pool is dropped.
        pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
            self.config = self.config.drop_policy(policy);
            self
        }

        /// Sets the lifecycle hooks of the pool.
        pub fn hooks(mut self, hooks: Hooks<T>) -> Self {
            self.hooks = hooks;
            self
        }
    };
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            config: PoolConfig::new(),
            hooks: Hooks::new(),
        }
    }

    common_builder_methods!();

    /// Builds the pool. New objects are created by calling `clone_fn` with `template`.
    #[must_use]
    pub fn build(self, template: T, clone_fn: impl Fn(&T) -> T + 'static) -> SlotPool<T> {
        SlotPool::new_inner(self.config, self.hooks, template, Box::new(clone_fn))
    }
}

impl<T> StackPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            config: PoolConfig::new(),
            hooks: Hooks::new(),
        }
    }

    common_builder_methods!();

    /// Builds the pool. New objects are created by calling `clone_fn` with `template`.
    #[must_use]
    pub fn build(self, template: T, clone_fn: impl Fn(&T) -> T + 'static) -> StackPool<T> {
        StackPool::new_inner(self.config, self.hooks, template, Box::new(clone_fn))
    }
}

impl<T> fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl<T> fmt::Debug for StackPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish()
    }
}
