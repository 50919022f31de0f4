//! Error types for lens-store

use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations
///
/// Only registration can fail. Dispatching before a reducer is registered
/// is a silent no-op, and reading an absent state yields `None`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// A reducer is already registered; the existing one stays in place.
    #[error("A reducer is already registered for this store")]
    ReducerAlreadyRegistered,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
