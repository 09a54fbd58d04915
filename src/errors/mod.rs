//! Centralized error handling for the playlist aggregation service
//!
//! # Error Categories
//!
//! - **Source Errors**: remote playlist fetches (timeouts, HTTP status, network)
//! - **Configuration Errors**: invalid service configuration detected at load
//! - **I/O Errors**: output and ledger file handling
//! - **Operation In Progress**: a rebuild was requested while one is running
//!
//! Fetch failures never leave the pool builder; they are absorbed into the
//! failure ledger. Everything else propagates as [`AppError`].

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
