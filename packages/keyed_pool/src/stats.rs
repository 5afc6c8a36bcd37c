/// A snapshot of the state of a pool.
///
/// # Example
///
/// ```rust
/// use keyed_pool::SlotPool;
///
/// let mut pool = SlotPool::builder().build(String::new(), String::clone);
///
/// let a = pool.rent();
/// let _b = pool.rent();
/// pool.release(a);
///
/// let stats = pool.stats();
/// assert_eq!(stats.live, 1);
/// assert_eq!(stats.idle, 1);
/// assert_eq!(stats.created, 2);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct PoolStats {
    /// Objects currently on loan.
    pub live: usize,

    /// Returned objects waiting to be reused.
    pub idle: usize,

    /// How many objects the pool storage can track before it needs to grow.
    pub capacity: usize,

    /// Total number of objects created by cloning the template.
    pub created: u64,

    /// Total number of objects the pool has given up and passed to the destroy hook.
    pub destroyed: u64,
}
