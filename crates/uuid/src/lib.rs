//! Document identifiers and sharded-path utilities.
//!
//! Every stored document is identified by a [`DocumentId`]: a version 7 UUID rendered in
//! *canonical* form, **32 lowercase hexadecimal characters** with no hyphens.
//!
//! Version 7 UUIDs carry a millisecond Unix timestamp in their high bits followed by random
//! bits, so identifiers are time-based with a random suffix and sort roughly by creation time.
//! The same value is accepted by a relational `uuid` column.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, per-record storage lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Because the leading hex digits of a v7 UUID are timestamp bits, documents uploaded close
//! together share shard directories.

mod service;

pub use service::{DocumentId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
