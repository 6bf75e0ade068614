//! # Spillway
//!
//! A persistent leaky bucket rate limiter for Rust.
//!
//! ## Overview
//!
//! A bucket collects drops (units of work) and drains them at a constant rate.
//! When the bucket is full, further work is rejected until enough drops have
//! leaked away. Bucket state is stored through a pluggable [`Adapter`], so the
//! same bucket survives process restarts and can be shared by several workers
//! that read and write the same storage.
//!
//! - **Explicit time**: nothing runs in the background; [`Bucket::leak`]
//!   drains whatever is owed since the last recorded timestamp
//! - **Fractional rates**: leak rates are configured per minute and applied
//!   per second, so buckets hold fractional drop counts
//! - **Precision-safe storage**: drop counts are persisted as decimal strings
//!   that round-trip exactly
//! - **Attached data**: arbitrary JSON metadata rides along with each bucket
//!
//! ## Quick Start
//!
//! ```
//! use spillway::{Bucket, BucketConfig, MemoryAdapter};
//!
//! let adapter = MemoryAdapter::new();
//!
//! // 10 drops of capacity, leaking 10 drops per minute
//! let config = BucketConfig::new(10, 10).unwrap();
//! let mut bucket = Bucket::new("user:123", &adapter, config).unwrap();
//!
//! // Apply elapsed drain before checking capacity
//! bucket.leak();
//!
//! if bucket.has_capacity(1) {
//!     bucket.fill(1, false).unwrap();
//!     println!("Request allowed! Remaining: {}", bucket.capacity_remaining());
//! } else {
//!     println!("Rate limited! Retry after: {} seconds", bucket.seconds_until_capacity(1));
//! }
//!
//! // Nothing is persisted until save is called
//! bucket.save().unwrap();
//! ```
//!
//! ## Adapters
//!
//! ### [`MemoryAdapter`]
//! Keeps records in a mutex-guarded hash map. Best for tests and
//! single-process services.
//!
//! ### [`LocalAdapter`]
//! Keeps one `bucket-<id>.json` file per bucket in a directory.
//!
//! ```no_run
//! use spillway::{Bucket, BucketConfig, LocalAdapter};
//!
//! let adapter = LocalAdapter::new("/var/lib/myapp/buckets");
//! let bucket = Bucket::new("api_key_12345", adapter, BucketConfig::default())?;
//! println!("{} drops used", bucket.capacity_used());
//! # Ok::<(), spillway::BucketError>(())
//! ```
//!
//! Any other backend can be plugged in by implementing [`Adapter`].
//!
//! ## Common Use Cases
//!
//! ### API Rate Limiting
//! ```
//! use spillway::{Bucket, BucketConfig, BucketError, MemoryAdapter};
//!
//! let adapter = MemoryAdapter::new();
//!
//! // Limit each API key to bursts of 50, draining 1000 per minute
//! let config = BucketConfig::new(50, 1000)?;
//! let mut bucket = Bucket::new("api_key_12345", &adapter, config)?;
//! match bucket.leak().fill(1, false) {
//!     Ok(_) => {}
//!     Err(BucketError::InsufficientCapacity { .. }) => { /* reject with 429 */ }
//!     Err(e) => return Err(e),
//! }
//! bucket.save()?;
//! # Ok::<(), spillway::BucketError>(())
//! ```
//!
//! ### Tracking Who Filled the Bucket
//! ```
//! use spillway::{Bucket, BucketConfig, MemoryAdapter};
//!
//! let adapter = MemoryAdapter::new();
//! let mut bucket = Bucket::new("password_reset:456", &adapter, BucketConfig::new(3, 1)?)?;
//! bucket.set_data("user.id", 456);
//! bucket.leak().fill(1, false)?;
//! bucket.save()?;
//!
//! let reloaded = Bucket::new("password_reset:456", &adapter, BucketConfig::new(3, 1)?)?;
//! assert_eq!(reloaded.get_data(Some("user.id")), Some(serde_json::json!(456)));
//! # Ok::<(), spillway::BucketError>(())
//! ```
//!
//! ## Understanding Bucket Parameters
//!
//! - **`capacity`**: Maximum number of drops the bucket holds
//! - **`leak_per_minute`**: Drops drained every 60 seconds
//! - **`drops`**: Amount passed to [`Bucket::fill`] and [`Bucket::spill`];
//!   negative amounts are treated as their absolute value
//!
//! ## Thread Safety
//!
//! A [`Bucket`] is a plain owned value with no internal locking. Two buckets
//! with the same ID do not coordinate: concurrent load/mutate/save cycles race
//! and the last save wins. Serialize access per bucket ID when that matters:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use std::thread;
//! use spillway::{Bucket, BucketConfig, MemoryAdapter};
//!
//! let adapter = Arc::new(MemoryAdapter::new());
//! let lock = Arc::new(Mutex::new(()));
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let adapter = Arc::clone(&adapter);
//!         let lock = Arc::clone(&lock);
//!         thread::spawn(move || {
//!             let _guard = lock.lock().unwrap();
//!             let mut bucket = Bucket::new("shared", &adapter, BucketConfig::default()).unwrap();
//!             bucket.leak().fill(1, false).unwrap();
//!             bucket.save().unwrap();
//!         })
//!     })
//!     .collect();
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//!
//! let bucket = Bucket::new("shared", &adapter, BucketConfig::default()).unwrap();
//! assert!(bucket.capacity_used() > 0.0);
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for the in-memory adapter

pub mod core;

pub use crate::core::{
    Adapter, AdapterError, Bucket, BucketConfig, BucketConfigBuilder, BucketError, BucketState,
    Clock, LocalAdapter, ManualClock, MemoryAdapter, SystemClock,
};

// Re-export the data helpers for callers working on raw records
pub use crate::core::data;
