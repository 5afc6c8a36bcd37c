use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Addresses one logical pool among the many held by a registry.
///
/// A key combines the type of the pooled objects with a name, so that two pools of the same
/// type (e.g. two different sprite templates) and two pools with the same name but different
/// types are all kept apart. Equality and hashing consider both parts.
///
/// # Example
///
/// ```rust
/// use keyed_pool::PoolKey;
///
/// let a = PoolKey::of::<String>("labels");
/// let b = PoolKey::of::<String>("labels");
/// let c = PoolKey::of::<Vec<u8>>("labels");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Clone)]
pub struct PoolKey {
    type_id: TypeId,

    // Only used for diagnostics, never compared.
    type_name: &'static str,

    name: Cow<'static, str>,
}

impl PoolKey {
    /// Creates the key of the pool of `T` objects with the given name.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: name.into(),
        }
    }

    /// The type of the objects held by the pool.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The name of the pool within its type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for PoolKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for PoolKey {}

impl Hash for PoolKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKey")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.name)
    }
}
