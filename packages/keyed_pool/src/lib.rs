//! Object pools that hand out generational handles, plus registries that create pools on
//! demand from asynchronous factories.
//!
//! The building blocks:
//!
//! * [`SlotPool`] rents objects out under a [`Handle`]. Releasing an object bumps the
//!   generation of its slot, so stale handles (released twice, or kept after release) are
//!   rejected instead of silently touching whatever object reuses the slot.
//! * [`StackPool`] is the plain LIFO recycler underneath: it moves objects out to the caller and
//!   takes them back, with no handle tracking.
//! * [`PoolRegistry`] and [`StackPoolRegistry`] hold many pools, addressed by [`PoolKey`] (the
//!   type of the pooled objects plus a name). The first request for a key awaits a factory for
//!   the template of the pool. Requests for the same key that arrive while the factory is still
//!   running wait for it instead of starting another one.
//!
//! Objects are created by cloning a template. [`Hooks`] run when an object is handed out,
//! returned and destroyed, which is where per-use state gets reset. Types can also implement
//! [`Poolable`] and use [`Hooks::poolable()`].
//!
//! # Features
//!
//! - **Stale handle detection**: A handle stops resolving once its object is released.
//! - **Packed storage**: Live objects sit in a dense array, so iteration is cache friendly.
//! - **Bounded recycling**: Pools can limit how many idle objects they keep via `max_idle`.
//! - **Single-flight creation**: At most one factory call per key is in progress at a time.
//!   A failed or abandoned creation leaves nothing behind and the next request retries.
//! - **Optional leak detection**: Pools can be configured to panic on drop if objects are still
//!   on loan.
//!
//! # Example
//!
//! ```rust
//! use keyed_pool::{Hooks, SlotPool};
//!
//! let mut pool = SlotPool::builder()
//!     .hooks(Hooks::new().on_release(|v: &mut Vec<u32>| v.clear()))
//!     .build(Vec::with_capacity(64), Vec::clone);
//!
//! let handle = pool.rent();
//! pool.get_mut(handle).unwrap().push(42);
//!
//! assert!(pool.release(handle));
//!
//! // The handle is stale now, even though the slot will be reused.
//! let other = pool.rent();
//! assert!(pool.get(handle).is_none());
//! assert!(pool.get(other).unwrap().is_empty());
//! # pool.release(other);
//! ```
//!
//! Pools created on demand:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::convert::Infallible;
//! use std::rc::Rc;
//!
//! use futures::executor::block_on;
//! use keyed_pool::{Hooks, PoolRegistry};
//!
//! let registry = PoolRegistry::new();
//!
//! # block_on(async {
//! let (handle, bullet) = registry
//!     .get_with_handle(
//!         "bullet",
//!         || async { Ok::<_, Infallible>(Rc::new(RefCell::new([0.0_f32; 2]))) },
//!         |template: &Rc<RefCell<[f32; 2]>>| Rc::new(RefCell::new(*template.borrow())),
//!         Hooks::new(),
//!     )
//!     .await
//!     .unwrap();
//!
//! bullet.borrow_mut()[0] = 10.0;
//!
//! assert!(registry.release_handle::<Rc<RefCell<[f32; 2]>>>("bullet", handle));
//! # });
//! ```
//!
//! # Thread safety
//!
//! All types in this package are single-threaded. The registries share their state between
//! clones via `Rc` and are meant to be driven from one thread, typically by a per-frame loop
//! or a local executor.

mod builder;
mod config;
mod drop_policy;
mod error;
mod flight;
mod handle;
mod hooks;
mod identity;
mod key;
mod registry;
mod registry_core;
mod slot_pool;
mod stack_pool;
mod stack_registry;
mod stats;

pub use builder::*;
pub use config::*;
pub use drop_policy::*;
pub use error::PoolError;
pub(crate) use flight::*;
pub use handle::*;
pub use hooks::*;
pub use identity::*;
pub use key::*;
pub use registry::*;
pub(crate) use registry_core::*;
pub use slot_pool::*;
pub use stack_pool::*;
pub use stack_registry::*;
pub use stats::*;
