//! Shared types for the store layer

pub mod errors;

pub use errors::StoreError;

/// Result alias used throughout the store layer.
pub type StoreResult<T> = Result<T, StoreError>;
