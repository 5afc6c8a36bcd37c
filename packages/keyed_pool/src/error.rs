use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when a registry creates a pool.
///
/// Only pool creation can fail. Renting and releasing never return errors, they report a
/// missing or stale object through their `bool`/`Option` results instead.
///
/// The error is cheap to clone because every caller waiting on the same in-flight creation
/// receives its own copy.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The asynchronous factory that was supposed to produce the template of a pool failed.
    ///
    /// No pool was registered for the key. A later request for the same key starts over with
    /// a fresh call to the factory.
    #[error("failed to create the template for pool '{key}': {source}")]
    Factory {
        /// The pool key, in its display form.
        key: String,

        /// The error returned by the factory.
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// A factory requested the pool it was creating, directly or through the factory of
    /// another pool of the same registry.
    ///
    /// Waiting for the creation would never finish, so the request fails instead. The factory
    /// usually propagates this, which fails the creation with [`PoolError::Factory`].
    #[error("pool '{key}' was requested by the factory creating it")]
    Cycle {
        /// The pool key, in its display form.
        key: String,
    },
}

impl PoolError {
    pub(crate) fn factory(key: String, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Factory {
            key,
            source: Arc::new(source),
        }
    }

    pub(crate) fn cycle(key: String) -> Self {
        Self::Cycle { key }
    }
}

/// A specialized `Result` type for pool registry operations, returning the crate's
/// [`PoolError`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, PoolError>;
