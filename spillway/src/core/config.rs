//! Bucket configuration
//!
//! A [`BucketConfig`] is supplied at construction and never persisted. It can
//! be built from typed values, through a builder, or from loosely typed
//! settings (for example a table read from a configuration file), in which
//! case the supplied keys are merged over the defaults.

use super::BucketError;
use serde_json::{Map, Value};

/// Capacity used when none is supplied
pub const DEFAULT_CAPACITY: u64 = 10;
/// Drops leaked per minute when no rate is supplied
pub const DEFAULT_LEAK_PER_MINUTE: u64 = 10;

/// Settings key for the bucket capacity
pub const CAPACITY_KEY: &str = "capacity";
/// Settings key for the leak rate in drops per minute
pub const LEAK_KEY: &str = "leak";

/// Capacity and leak rate of a bucket
///
/// Both values are positive integers.
///
/// # Example
///
/// ```
/// use spillway::BucketConfig;
///
/// // 60 drops of room, draining one drop per second
/// let config = BucketConfig::new(60, 60).unwrap();
/// assert_eq!(config.leak_per_second(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    capacity: u64,
    leak_per_minute: u64,
}

/// Builder for a [`BucketConfig`]
///
/// # Example
///
/// ```
/// use spillway::BucketConfig;
///
/// let config = BucketConfig::builder()
///     .capacity(100)
///     .leak_per_minute(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.capacity(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct BucketConfigBuilder {
    capacity: u64,
    leak_per_minute: u64,
}

impl BucketConfig {
    /// Create a configuration, rejecting zero values
    pub fn new(capacity: u64, leak_per_minute: u64) -> Result<Self, BucketError> {
        if capacity == 0 {
            return Err(BucketError::InvalidConfig {
                setting: CAPACITY_KEY.to_string(),
                reason: "must be a positive integer",
            });
        }
        if leak_per_minute == 0 {
            return Err(BucketError::InvalidConfig {
                setting: LEAK_KEY.to_string(),
                reason: "must be a positive integer",
            });
        }
        Ok(BucketConfig {
            capacity,
            leak_per_minute,
        })
    }

    /// Create a new builder starting from the defaults
    pub fn builder() -> BucketConfigBuilder {
        BucketConfigBuilder {
            capacity: DEFAULT_CAPACITY,
            leak_per_minute: DEFAULT_LEAK_PER_MINUTE,
        }
    }

    /// Merge loosely typed settings over the defaults
    ///
    /// Recognized keys are `capacity` and `leak`; anything else is ignored.
    /// Each recognized value must be a JSON integer greater than zero. Strings
    /// and floats are rejected even when they look numeric.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use spillway::BucketConfig;
    ///
    /// let settings = json!({ "leak": 120 });
    /// let config = BucketConfig::from_settings(settings.as_object().unwrap()).unwrap();
    /// assert_eq!(config.capacity(), 10);
    /// assert_eq!(config.leak_per_minute(), 120);
    ///
    /// let settings = json!({ "capacity": "10" });
    /// assert!(BucketConfig::from_settings(settings.as_object().unwrap()).is_err());
    /// ```
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, BucketError> {
        let capacity = integer_setting(settings, CAPACITY_KEY)?.unwrap_or(DEFAULT_CAPACITY);
        let leak_per_minute =
            integer_setting(settings, LEAK_KEY)?.unwrap_or(DEFAULT_LEAK_PER_MINUTE);
        Self::new(capacity, leak_per_minute)
    }

    /// Maximum number of drops before the bucket is full
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Drops drained every 60 seconds
    pub fn leak_per_minute(&self) -> u64 {
        self.leak_per_minute
    }

    /// Drops drained every second
    pub fn leak_per_second(&self) -> f64 {
        self.leak_per_minute as f64 / 60.0
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        BucketConfig {
            capacity: DEFAULT_CAPACITY,
            leak_per_minute: DEFAULT_LEAK_PER_MINUTE,
        }
    }
}

impl BucketConfigBuilder {
    /// Set the bucket capacity
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the leak rate in drops per minute
    pub fn leak_per_minute(mut self, leak_per_minute: u64) -> Self {
        self.leak_per_minute = leak_per_minute;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<BucketConfig, BucketError> {
        BucketConfig::new(self.capacity, self.leak_per_minute)
    }
}

fn integer_setting(settings: &Map<String, Value>, key: &str) -> Result<Option<u64>, BucketError> {
    let Some(value) = settings.get(key) else {
        return Ok(None);
    };

    match value {
        Value::Number(n) if n.is_u64() => Ok(n.as_u64()),
        Value::Number(n) if n.is_i64() => Err(BucketError::InvalidConfig {
            setting: key.to_string(),
            reason: "must be a positive integer",
        }),
        _ => Err(BucketError::InvalidConfig {
            setting: key.to_string(),
            reason: "must be an integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = BucketConfig::default();
        assert_eq!(config.capacity(), 10);
        assert_eq!(config.leak_per_minute(), 10);
        assert_eq!(BucketConfig::from_settings(&Map::new()).unwrap(), config);
    }

    #[test]
    fn test_settings_merge_over_defaults() {
        let config = BucketConfig::from_settings(&settings(json!({"capacity": 25}))).unwrap();
        assert_eq!(config.capacity(), 25);
        assert_eq!(config.leak_per_minute(), DEFAULT_LEAK_PER_MINUTE);

        let config = BucketConfig::from_settings(&settings(json!({
            "capacity": 5,
            "leak": 30,
            "unrelated": "ignored"
        })))
        .unwrap();
        assert_eq!(config.capacity(), 5);
        assert_eq!(config.leak_per_minute(), 30);
    }

    #[test]
    fn test_non_integer_settings_rejected() {
        for bad in [
            json!({"capacity": "10"}),
            json!({"capacity": 10.5}),
            json!({"capacity": 10.0}),
            json!({"leak": true}),
            json!({"leak": null}),
            json!({"leak": [1]}),
        ] {
            let err = BucketConfig::from_settings(&settings(bad.clone())).unwrap_err();
            assert!(
                matches!(err, BucketError::InvalidConfig { .. }),
                "expected config error for {bad}"
            );
        }
    }

    #[test]
    fn test_non_positive_settings_rejected() {
        let err = BucketConfig::from_settings(&settings(json!({"capacity": 0}))).unwrap_err();
        assert!(err.to_string().contains("capacity"));

        let err = BucketConfig::from_settings(&settings(json!({"leak": -5}))).unwrap_err();
        assert!(err.to_string().contains("leak"));
    }

    #[test]
    fn test_builder() {
        let config = BucketConfig::builder().capacity(3).build().unwrap();
        assert_eq!(config.capacity(), 3);
        assert_eq!(config.leak_per_minute(), DEFAULT_LEAK_PER_MINUTE);

        assert!(BucketConfig::builder().leak_per_minute(0).build().is_err());
    }

    #[test]
    fn test_leak_per_second() {
        let config = BucketConfig::new(10, 10).unwrap();
        assert!((config.leak_per_second() - 10.0 / 60.0).abs() < f64::EPSILON);
    }
}
