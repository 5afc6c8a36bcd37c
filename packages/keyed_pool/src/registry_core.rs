use std::any::{Any, TypeId};
use std::fmt;

use foldhash::{HashMap, HashMapExt};

use crate::{InFlight, PoolConfig, PoolKey, PoolStats};

/// The operations a registry needs on a pool without knowing the type of its objects.
pub(crate) trait ErasedEntry {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Takes back every object on loan from the pool.
    fn clear(&mut self);

    fn stats(&self) -> PoolStats;
}

/// State shared by both registry flavors: the pools, the creations in flight and the
/// configuration for new pools. `X` is the flavor-specific bookkeeping.
pub(crate) struct RegistryCore<X> {
    entries: HashMap<PoolKey, Box<dyn ErasedEntry>>,

    /// All keys registered for each object type, for release by value.
    keys_by_type: HashMap<TypeId, Vec<PoolKey>>,

    pub(crate) flights: InFlight,
    pub(crate) default_config: PoolConfig,
    pub(crate) extra: X,
}

impl<X> RegistryCore<X> {
    pub(crate) fn new(default_config: PoolConfig, extra: X) -> Self {
        Self {
            entries: HashMap::new(),
            keys_by_type: HashMap::new(),
            flights: InFlight::new(),
            default_config,
            extra,
        }
    }

    pub(crate) fn contains(&self, key: &PoolKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn insert(&mut self, key: PoolKey, entry: Box<dyn ErasedEntry>) {
        self.keys_by_type
            .entry(key.type_id())
            .or_default()
            .push(key.clone());

        let previous = self.entries.insert(key, entry);
        debug_assert!(previous.is_none(), "a key is only ever registered once");
    }

    /// Visits the entries of every pool of `T` objects in registration order until `f`
    /// returns a value.
    pub(crate) fn find_map_entries<T: 'static, E: 'static, R>(
        &mut self,
        mut f: impl FnMut(&PoolKey, &mut E) -> Option<R>,
    ) -> Option<R> {
        let keys = self.keys_by_type.get(&TypeId::of::<T>())?;

        for key in keys {
            let entry = self
                .entries
                .get_mut(key)
                .expect("keys by type only lists registered keys")
                .as_any_mut()
                .downcast_mut::<E>()
                .expect("the entry type always matches the type recorded in its key");

            if let Some(result) = f(key, entry) {
                return Some(result);
            }
        }

        None
    }

    /// The entry of `key` as its concrete type.
    ///
    /// # Panics
    ///
    /// Panics if the entry registered under `key` is not an `E`. Keys carry the type of the
    /// pooled objects and each registry flavor only stores one entry type per object type,
    /// so this indicates a bug in the registry.
    pub(crate) fn entry_mut<E: 'static>(&mut self, key: &PoolKey) -> Option<&mut E> {
        let entry = self.entries.get_mut(key)?;

        Some(
            entry
                .as_any_mut()
                .downcast_mut::<E>()
                .expect("the entry type always matches the type recorded in its key"),
        )
    }

    pub(crate) fn entry<E: 'static>(&self, key: &PoolKey) -> Option<&E> {
        let entry = self.entries.get(key)?;

        Some(
            entry
                .as_any()
                .downcast_ref::<E>()
                .expect("the entry type always matches the type recorded in its key"),
        )
    }

    pub(crate) fn stats(&self, key: &PoolKey) -> Option<PoolStats> {
        self.entries.get(key).map(|entry| entry.stats())
    }

    pub(crate) fn clear_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.clear();
        }
    }
}

impl<X> fmt::Debug for RegistryCore<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCore")
            .field("pools", &self.entries.keys().collect::<Vec<_>>())
            .field("flights", &self.flights)
            .field("default_config", &self.default_config)
            .finish_non_exhaustive()
    }
}
