/// Determines what a pool does if it is dropped while objects are still on loan.
///
/// By default, the pool destroys everything it holds when it is dropped.
///
/// # Examples
///
/// ```
/// use keyed_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build(0_u64, |template: &u64| *template);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool destroys its objects, including any still on loan, when it is dropped.
    /// This is the default.
    #[default]
    MayDropItems,

    /// The pool will panic if objects are still on loan when it is dropped.
    ///
    /// This turns a forgotten release into a loud failure, which may be valuable when every
    /// rented object is expected to come back before teardown (e.g. at the end of a frame).
    MustNotDropItems,
}
