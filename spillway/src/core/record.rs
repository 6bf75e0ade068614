//! Persisted bucket state and its JSON wire format
//!
//! A record looks like:
//!
//! ```json
//! {"drops":"4.5","time":1700000000,"data":{"user":{"id":42}}}
//! ```
//!
//! `drops` is written as a decimal string rather than a JSON number so that
//! storage layers which re-encode numbers cannot widen or round it. The
//! string is the shortest decimal form that parses back to the same `f64`.
//! On read, a plain JSON number is accepted as well.

use super::BucketError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// In-memory state of a bucket
///
/// # Example
///
/// ```
/// use spillway::{Bucket, BucketConfig, MemoryAdapter};
///
/// let bucket = Bucket::new("reports", MemoryAdapter::new(), BucketConfig::default()).unwrap();
/// let state = bucket.state();
/// assert_eq!(state.drops(), 0.0);
/// assert!(state.data().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BucketState {
    pub(crate) drops: f64,
    pub(crate) time: i64,
    pub(crate) data: Option<Map<String, Value>>,
}

#[derive(Serialize)]
struct RecordOut<'a> {
    drops: String,
    time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Map<String, Value>>,
}

#[derive(Deserialize)]
struct RecordIn {
    drops: Option<DropsField>,
    time: Option<i64>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DropsField {
    Text(String),
    Number(f64),
}

impl BucketState {
    /// An empty bucket stamped at `now`
    pub fn fresh(now: i64) -> Self {
        BucketState {
            drops: 0.0,
            time: now,
            data: None,
        }
    }

    /// Current fill level
    pub fn drops(&self) -> f64 {
        self.drops
    }

    /// UNIX timestamp of the last state-changing operation
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Caller-attached metadata, if any has been set
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// Encode the state as a JSON record
    pub fn encode(&self) -> Result<String, BucketError> {
        let record = RecordOut {
            drops: format_drops(self.drops),
            time: self.time,
            data: self.data.as_ref(),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Decode a JSON record stored for bucket `id`
    pub fn decode(id: &str, contents: &str) -> Result<Self, BucketError> {
        let corrupt = |reason: String| BucketError::CorruptState {
            id: id.to_string(),
            reason,
        };

        let record: RecordIn = serde_json::from_str(contents).map_err(|e| corrupt(e.to_string()))?;

        let drops = match record.drops {
            Some(DropsField::Text(text)) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| corrupt(format!("drops is not a decimal number: {text:?}")))?,
            Some(DropsField::Number(n)) => n,
            None => return Err(corrupt("missing drops".to_string())),
        };
        if !drops.is_finite() || drops < 0.0 {
            return Err(corrupt(format!("drops out of range: {drops}")));
        }

        let Some(time) = record.time else {
            return Err(corrupt("missing time".to_string()));
        };
        if !(0..=MAX_TIME).contains(&time) {
            return Err(corrupt(format!("time out of range: {time}")));
        }

        let data = match record.data {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            // Records written by list-keyed encoders store maps as arrays
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
            ),
            Some(other) => return Err(corrupt(format!("data is not an object: {other}"))),
        };

        Ok(BucketState { drops, time, data })
    }
}

/// Latest accepted record timestamp, the last second of year 9999
const MAX_TIME: i64 = 253_402_300_799;

/// Shortest decimal string that round-trips through `f64`
pub(crate) fn format_drops(drops: f64) -> String {
    // Display never switches to exponent notation and is round-trip exact
    format!("{drops}")
}
