//! Core components of the spillway leaky bucket library
//!
//! This module contains the fundamental building blocks:
//! - [`bucket`]: The leaky bucket state machine
//! - [`config`]: Bucket capacity and leak rate configuration
//! - [`record`]: Persisted bucket state and its wire format
//! - [`data`]: Dot-path helpers for caller-attached metadata
//! - [`clock`]: Time sources used by the bucket
//! - [`adapter`]: Storage backends for bucket records

pub mod adapter;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod data;
pub mod record;

pub use adapter::{Adapter, AdapterError, LocalAdapter, MemoryAdapter};
pub use bucket::Bucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BucketConfig, BucketConfigBuilder};
pub use record::BucketState;

use thiserror::Error;

/// Errors that can occur while loading, mutating or persisting a bucket
///
/// # Variants
///
/// - [`InvalidConfig`](BucketError::InvalidConfig): A capacity or leak setting is not a positive integer
/// - [`CorruptState`](BucketError::CorruptState): A persisted record could not be decoded
/// - [`InsufficientCapacity`](BucketError::InsufficientCapacity): A fill was rejected for lack of room
/// - [`Serialization`](BucketError::Serialization): The in-memory state could not be encoded
/// - [`Adapter`](BucketError::Adapter): The storage backend failed
///
/// # Example
///
/// ```
/// use spillway::{Bucket, BucketConfig, BucketError, MemoryAdapter};
///
/// let config = BucketConfig::new(2, 10).unwrap();
/// let mut bucket = Bucket::new("uploads", MemoryAdapter::new(), config).unwrap();
///
/// match bucket.fill(3, false) {
///     Err(BucketError::InsufficientCapacity { id, requested }) => {
///         println!("bucket {id} cannot take {requested} more drops");
///     }
///     _ => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum BucketError {
    /// A configuration value was missing its integer form or was not positive
    #[error("invalid bucket configuration: {setting} {reason}")]
    InvalidConfig {
        setting: String,
        reason: &'static str,
    },

    /// The stored record for a bucket is unreadable or lacks required fields
    #[error("invalid bucket contents for bucket ID {id}: {reason}")]
    CorruptState { id: String, reason: String },

    /// The bucket does not have room for the requested drops
    #[error("unable to fill {requested} drops to bucket ({id}): not enough capacity")]
    InsufficientCapacity { id: String, requested: u64 },

    /// Encoding the bucket state failed
    #[error("unable to encode bucket state: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage adapter reported a failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
