//! Leaky bucket state machine
//!
//! This module provides the [`Bucket`] struct which accumulates drops, drains
//! them at a constant rate, and persists its state through an [`Adapter`].
//!
//! Nothing happens in the background. Time only matters when the caller asks
//! for it: [`Bucket::leak`] drains the drops owed since the last recorded
//! timestamp, and capacity queries see whatever state the last mutation left.
//! Call `leak` before checking capacity when the check should reflect drain.

use super::adapter::Adapter;
use super::clock::{Clock, SystemClock};
use super::config::BucketConfig;
use super::record::BucketState;
use super::{BucketError, data};
use serde_json::{Map, Value};

/// A named leaky bucket bound to a storage adapter
///
/// Construction loads the persisted record for the ID or starts empty.
/// Mutations only change the in-memory state until [`save`](Bucket::save) is
/// called.
///
/// A `Bucket` is an exclusively owned value. Two buckets with the same ID,
/// whether in one process or in several, do not coordinate: if both load,
/// mutate and save, the last save wins. Callers that need safe concurrent
/// access must serialize it themselves, for example with a lock keyed by
/// bucket ID.
///
/// # Example
///
/// ```
/// use spillway::{Bucket, BucketConfig, MemoryAdapter};
///
/// let adapter = MemoryAdapter::new();
/// let config = BucketConfig::new(10, 10).unwrap();
///
/// let mut bucket = Bucket::new("user:123", &adapter, config).unwrap();
/// bucket.leak();
///
/// if bucket.has_capacity(1) {
///     bucket.fill(1, false).unwrap();
///     bucket.save().unwrap();
/// } else {
///     println!("Try again in {} seconds", bucket.seconds_until_capacity(1));
/// }
/// ```
#[derive(Debug)]
pub struct Bucket<A: Adapter, C: Clock = SystemClock> {
    id: String,
    adapter: A,
    config: BucketConfig,
    clock: C,
    state: BucketState,
}

impl<A: Adapter> Bucket<A> {
    /// Load or create bucket `id` using the system clock
    ///
    /// # Errors
    ///
    /// - [`BucketError::Adapter`]: The existence check or read failed
    /// - [`BucketError::CorruptState`]: The stored record could not be decoded
    pub fn new(
        id: impl Into<String>,
        adapter: A,
        config: BucketConfig,
    ) -> Result<Self, BucketError> {
        Self::with_clock(id, adapter, config, SystemClock)
    }

    /// Load or create bucket `id` from loosely typed settings
    ///
    /// The settings are merged over the default configuration, see
    /// [`BucketConfig::from_settings`].
    ///
    /// # Errors
    ///
    /// - [`BucketError::InvalidConfig`]: A setting is not a positive integer
    /// - Everything [`Bucket::new`] can return
    pub fn from_settings(
        id: impl Into<String>,
        adapter: A,
        settings: &Map<String, Value>,
    ) -> Result<Self, BucketError> {
        let config = BucketConfig::from_settings(settings)?;
        Self::new(id, adapter, config)
    }
}

impl<A: Adapter, C: Clock> Bucket<A, C> {
    /// Load or create bucket `id`, reading time from `clock`
    ///
    /// # Example
    ///
    /// ```
    /// use spillway::{Bucket, BucketConfig, ManualClock, MemoryAdapter};
    ///
    /// let clock = ManualClock::new(0);
    /// let mut bucket =
    ///     Bucket::with_clock("jobs", MemoryAdapter::new(), BucketConfig::default(), &clock).unwrap();
    ///
    /// bucket.fill(10, false).unwrap();
    /// clock.advance(30);
    /// bucket.leak();
    /// assert_eq!(bucket.capacity_used(), 5.0);
    /// ```
    pub fn with_clock(
        id: impl Into<String>,
        adapter: A,
        config: BucketConfig,
        clock: C,
    ) -> Result<Self, BucketError> {
        let id = id.into();

        let state = if adapter.exists(&id)? {
            let contents = adapter.read(&id)?;
            let state = BucketState::decode(&id, &contents)?;
            tracing::debug!(bucket = %id, drops = state.drops, time = state.time, "Loaded bucket");
            state
        } else {
            tracing::debug!(bucket = %id, "Initializing fresh bucket");
            BucketState::fresh(clock.now())
        };

        Ok(Bucket {
            id,
            adapter,
            config,
            clock,
            state,
        })
    }

    // Persistence

    /// Bucket ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Configuration this bucket was built with
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Storage adapter backing this bucket
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Whether a record for this bucket is currently stored
    pub fn exists(&self) -> Result<bool, BucketError> {
        Ok(self.adapter.exists(&self.id)?)
    }

    /// Persist the in-memory state, replacing any stored record
    ///
    /// The in-memory state is left untouched whether or not the write succeeds.
    pub fn save(&mut self) -> Result<&mut Self, BucketError> {
        let contents = self.state.encode()?;
        self.adapter.save(&self.id, &contents)?;
        tracing::debug!(bucket = %self.id, drops = self.state.drops, "Saved bucket");
        Ok(self)
    }

    /// Reset the in-memory state and remove the stored record
    ///
    /// Removing a record that does not exist is an adapter error; the
    /// in-memory state is reset either way.
    pub fn delete(&mut self) -> Result<&mut Self, BucketError> {
        self.reset();
        self.adapter.delete(&self.id)?;
        tracing::debug!(bucket = %self.id, "Deleted bucket");
        Ok(self)
    }

    /// Discard drops and attached data without touching storage
    pub fn reset(&mut self) -> &mut Self {
        self.state = BucketState::fresh(self.clock.now());
        self
    }

    /// Entire in-memory state
    pub fn state(&self) -> &BucketState {
        &self.state
    }

    // Capacity and rate

    /// Maximum number of drops before the bucket is full
    pub fn capacity(&self) -> u64 {
        self.config.capacity()
    }

    /// Drops currently in the bucket
    pub fn capacity_used(&self) -> f64 {
        self.state.drops
    }

    /// Room left before the bucket is full
    pub fn capacity_remaining(&self) -> f64 {
        if self.is_full() {
            return 0.0;
        }
        self.capacity() as f64 - self.state.drops
    }

    pub fn is_full(&self) -> bool {
        self.state.drops >= self.capacity() as f64
    }

    /// Whether `drops` more drops would fit; the sign of `drops` is ignored
    pub fn has_capacity(&self, drops: i64) -> bool {
        self.capacity() as f64 >= self.state.drops + drops.unsigned_abs() as f64
    }

    pub fn leak_per_second(&self) -> f64 {
        self.config.leak_per_second()
    }

    /// Seconds needed to drain a single drop
    pub fn seconds_per_drop(&self) -> f64 {
        1.0 / self.leak_per_second()
    }

    /// Seconds to wait before `drops` more drops would fit
    ///
    /// Assumes nothing else fills the bucket in the meantime. The sign of
    /// `drops` is ignored.
    pub fn seconds_until_capacity(&self, drops: i64) -> f64 {
        let drops = drops.unsigned_abs() as f64;
        if self.capacity_remaining() > drops {
            return 0.0;
        }
        self.seconds_per_drop() * ((self.state.drops + drops) - self.capacity() as f64)
    }

    /// Seconds until every drop has leaked
    pub fn seconds_until_empty(&self) -> f64 {
        self.state.drops * self.seconds_per_drop()
    }

    /// Timestamp of the last state-changing operation
    pub fn last_time(&self) -> i64 {
        self.state.time
    }

    // Mutators

    /// Refresh the timestamp without changing the drops
    pub fn touch(&mut self) -> &mut Self {
        self.state.time = self.clock.now();
        self
    }

    /// Add drops to the bucket
    ///
    /// The sign of `drops` is ignored. Unless `allow_overflow` is set, a fill
    /// that does not fit is rejected and the bucket is left unchanged. An
    /// overflowing fill may push the level above capacity; use
    /// [`overflow`](Bucket::overflow) to clamp it back.
    ///
    /// # Errors
    ///
    /// - [`BucketError::InsufficientCapacity`]: Not enough room and overflow not allowed
    pub fn fill(&mut self, drops: i64, allow_overflow: bool) -> Result<&mut Self, BucketError> {
        let requested = drops.unsigned_abs();
        if !allow_overflow && !self.has_capacity(drops) {
            return Err(BucketError::InsufficientCapacity {
                id: self.id.clone(),
                requested,
            });
        }

        self.state.drops += requested as f64;
        self.state.time = self.clock.now();
        Ok(self)
    }

    /// Drain the drops owed since the last recorded timestamp
    ///
    /// If the clock reads earlier than the stored timestamp nothing leaks, and
    /// the timestamp moves to the clock's reading.
    pub fn leak(&mut self) -> &mut Self {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.state.time);

        if elapsed < 0 {
            tracing::warn!(
                bucket = %self.id,
                elapsed,
                "Clock is behind the bucket timestamp, skipping leak"
            );
        } else {
            let leakage = elapsed as f64 * self.leak_per_second();
            tracing::trace!(bucket = %self.id, elapsed, leakage, "Leaking bucket");
            self.state.drops = (self.state.drops - leakage).max(0.0);
        }

        self.state.time = now;
        self
    }

    /// Remove drops from the bucket, never going below zero
    ///
    /// The sign of `drops` is ignored.
    pub fn spill(&mut self, drops: i64) -> &mut Self {
        self.state.drops = (self.state.drops - drops.unsigned_abs() as f64).max(0.0);
        self.state.time = self.clock.now();
        self
    }

    /// Clamp the level down to capacity
    ///
    /// Unlike the other mutators this leaves the timestamp alone.
    pub fn overflow(&mut self) -> &mut Self {
        let capacity = self.capacity() as f64;
        if self.state.drops > capacity {
            self.state.drops = capacity;
        }
        self
    }

    /// Empty the bucket
    pub fn dump(&mut self) -> &mut Self {
        self.state.drops = 0.0;
        self.state.time = self.clock.now();
        self
    }

    // Attached data

    /// Whether data is stored at `key`, or any data at all when `key` is `None`
    pub fn has_data(&self, key: Option<&str>) -> bool {
        match (&self.state.data, key) {
            (None, _) => false,
            (Some(map), None) => !map.is_empty(),
            (Some(map), Some(key)) => data::contains(map, key),
        }
    }

    /// Store `value` at the dot-separated `key`
    pub fn set_data(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let map = self.state.data.get_or_insert_with(Map::new);
        data::set(map, key, value.into());
        self
    }

    /// Replace all attached data
    pub fn replace_data(&mut self, data: Map<String, Value>) -> &mut Self {
        self.state.data = Some(data);
        self
    }

    /// Value stored at `key`, or the whole mapping when `key` is `None`
    ///
    /// The whole mapping is returned as an object, empty when nothing has been
    /// attached.
    pub fn get_data(&self, key: Option<&str>) -> Option<Value> {
        match key {
            None => Some(Value::Object(self.state.data.clone().unwrap_or_default())),
            Some(key) => self
                .state
                .data
                .as_ref()
                .and_then(|map| data::get(map, key))
                .cloned(),
        }
    }

    /// Like [`get_data`](Bucket::get_data), falling back to `default`
    pub fn get_data_or(&self, key: Option<&str>, default: impl Into<Value>) -> Value {
        self.get_data(key).unwrap_or_else(|| default.into())
    }

    /// Remove the value at `key`, or all attached data when `key` is `None`
    pub fn forget_data(&mut self, key: Option<&str>) -> &mut Self {
        match key {
            None => self.state.data = None,
            Some(key) => {
                if let Some(map) = self.state.data.as_mut() {
                    data::remove(map, key);
                }
            }
        }
        self
    }
}
