use std::rc::Rc;
use std::sync::Arc;

/// The identity of a pooled object, used by the registries to map a bare object back to the
/// pool (and handle) it was rented from.
///
/// Two values have the same identity if they are the same object, not if they are equal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Creates an identity from an address-sized value that is unique among all live objects
    /// of the same type.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Creates an identity from the address of a value.
    #[must_use]
    pub fn from_ptr<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>().addr())
    }

    /// The raw value of the identity.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Types whose instances have a stable identity that survives being moved around.
///
/// The registries record the identity of every object they hand out so that the object can be
/// released without its handle. The identity must not change while the object is on loan and
/// must not collide with the identity of any other live object of the same type.
///
/// Shared pointer types use the address of the shared allocation, so all clones of one
/// `Rc`/`Arc` have the same identity. A `Box` uses the address of its heap allocation, which
/// stays put when the box itself is moved.
///
/// Address based identities are only unique among objects that are alive at the same time.
/// Once an object is dropped, the allocator may hand its address to a new, unrelated object.
/// This is why an object on loan from a registry must be given back or explicitly forgotten
/// before it is dropped.
///
/// Boxes of zero-sized values (including empty boxed slices) do not allocate and all share one
/// dangling address, so they have no usable identity and cannot be released by value.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use keyed_pool::ObjectIdentity;
///
/// let a = Rc::new(5);
/// let b = Rc::clone(&a);
/// let c = Rc::new(5);
///
/// assert_eq!(a.object_id(), b.object_id());
/// assert_ne!(a.object_id(), c.object_id());
/// ```
pub trait ObjectIdentity {
    /// Returns the identity of this object.
    fn object_id(&self) -> ObjectId;
}

impl<T: ?Sized> ObjectIdentity for Rc<T> {
    fn object_id(&self) -> ObjectId {
        ObjectId::from_ptr(Rc::as_ptr(self))
    }
}

impl<T: ?Sized> ObjectIdentity for Arc<T> {
    fn object_id(&self) -> ObjectId {
        ObjectId::from_ptr(Arc::as_ptr(self))
    }
}

/// The address of the boxed value. Not unique for zero-sized values, which all share the same
/// dangling address.
impl<T: ?Sized> ObjectIdentity for Box<T> {
    fn object_id(&self) -> ObjectId {
        ObjectId::from_ptr(&raw const **self)
    }
}
