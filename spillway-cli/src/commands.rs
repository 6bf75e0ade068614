//! Command execution against stored buckets
//!
//! A [`Runner`] opens the bucket named by a command, applies the operation,
//! saves when the operation changed something, and reports the resulting
//! bucket state as JSON.

use crate::config::{Command, DataCommand};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use spillway::{Adapter, Bucket, BucketConfig, Clock};

/// Snapshot of a bucket printed after each command
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Status {
    pub id: String,
    pub exists: bool,
    pub capacity: u64,
    pub leak_per_minute: u64,
    pub drops: f64,
    pub remaining: f64,
    pub full: bool,
    pub last_time: i64,
    pub seconds_until_empty: f64,
    pub data: Value,
}

impl Status {
    fn of<A: Adapter, C: Clock>(bucket: &Bucket<A, C>) -> Result<Self> {
        Ok(Status {
            id: bucket.id().to_string(),
            exists: bucket.exists()?,
            capacity: bucket.capacity(),
            leak_per_minute: bucket.config().leak_per_minute(),
            drops: bucket.capacity_used(),
            remaining: bucket.capacity_remaining(),
            full: bucket.is_full(),
            last_time: bucket.last_time(),
            seconds_until_empty: bucket.seconds_until_empty(),
            data: bucket.get_data(None).unwrap_or(Value::Null),
        })
    }
}

/// Executes commands against buckets stored in one adapter
pub struct Runner<A: Adapter, C: Clock> {
    adapter: A,
    clock: C,
    config: BucketConfig,
    leak_first: bool,
}

impl<A: Adapter, C: Clock> Runner<A, C> {
    /// Create a runner
    ///
    /// `settings` are validated here so that a bad capacity or leak value is
    /// reported before any bucket is touched.
    pub fn new(
        adapter: A,
        clock: C,
        settings: &Map<String, Value>,
        leak_first: bool,
    ) -> Result<Self> {
        let config = BucketConfig::from_settings(settings).context("invalid bucket settings")?;
        Ok(Runner {
            adapter,
            clock,
            config,
            leak_first,
        })
    }

    fn open(&self, id: &str) -> Result<Bucket<&A, &C>> {
        Bucket::with_clock(id, &self.adapter, self.config, &self.clock)
            .with_context(|| format!("failed to open bucket {id}"))
    }

    /// Run one command and return the JSON to print
    pub fn execute(&self, command: &Command) -> Result<Value> {
        match command {
            Command::Status { id } => {
                let bucket = self.open(id)?;
                self.report(&bucket)
            }
            Command::Fill {
                id,
                drops,
                allow_overflow,
            } => self.mutate(id, |bucket| {
                bucket.fill(*drops, *allow_overflow)?;
                Ok(())
            }),
            Command::Leak { id } => {
                // Leaking is the operation itself, never apply it twice
                let mut bucket = self.open(id)?;
                bucket.leak();
                self.save_and_report(&mut bucket)
            }
            Command::Spill { id, drops } => self.mutate(id, |bucket| {
                bucket.spill(*drops);
                Ok(())
            }),
            Command::Overflow { id } => self.mutate(id, |bucket| {
                bucket.overflow();
                Ok(())
            }),
            Command::Dump { id } => self.mutate(id, |bucket| {
                bucket.dump();
                Ok(())
            }),
            Command::Touch { id } => self.mutate(id, |bucket| {
                bucket.touch();
                Ok(())
            }),
            Command::Delete { id } => {
                let mut bucket = self.open(id)?;
                bucket
                    .delete()
                    .map(|_| ())
                    .with_context(|| format!("failed to delete bucket {id}"))?;
                tracing::info!("Deleted bucket {}", id);
                self.report(&bucket)
            }
            Command::Data { action } => self.execute_data(action),
        }
    }

    fn execute_data(&self, action: &DataCommand) -> Result<Value> {
        match action {
            DataCommand::Get { id, key } => {
                let bucket = self.open(id)?;
                Ok(bucket.get_data(key.as_deref()).unwrap_or(Value::Null))
            }
            DataCommand::Set { id, key, value } => {
                let mut bucket = self.open(id)?;
                bucket.set_data(key, parse_value(value));
                self.save_and_report(&mut bucket)
            }
            DataCommand::Forget { id, key } => {
                let mut bucket = self.open(id)?;
                bucket.forget_data(key.as_deref());
                self.save_and_report(&mut bucket)
            }
        }
    }

    fn mutate<F>(&self, id: &str, operation: F) -> Result<Value>
    where
        F: FnOnce(&mut Bucket<&A, &C>) -> Result<()>,
    {
        let mut bucket = self.open(id)?;
        if self.leak_first {
            bucket.leak();
        }
        operation(&mut bucket)?;
        self.save_and_report(&mut bucket)
    }

    fn save_and_report(&self, bucket: &mut Bucket<&A, &C>) -> Result<Value> {
        bucket
            .save()
            .map(|_| ())
            .with_context(|| format!("failed to save bucket {}", bucket.id()))?;
        tracing::debug!("Saved bucket {} with {} drops", bucket.id(), bucket.capacity_used());
        self.report(bucket)
    }

    fn report(&self, bucket: &Bucket<&A, &C>) -> Result<Value> {
        Ok(serde_json::to_value(Status::of(bucket)?)?)
    }
}

/// Interpret a CLI value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spillway::{BucketError, ManualClock, MemoryAdapter};

    const START: i64 = 1_650_000_000;

    fn runner<'a>(
        adapter: &'a MemoryAdapter,
        clock: &'a ManualClock,
        settings: Value,
    ) -> Runner<&'a MemoryAdapter, &'a ManualClock> {
        Runner::new(adapter, clock, settings.as_object().unwrap(), true).unwrap()
    }

    fn fill(id: &str, drops: i64, allow_overflow: bool) -> Command {
        Command::Fill {
            id: id.to_string(),
            drops,
            allow_overflow,
        }
    }

    #[test]
    fn test_status_of_new_bucket_does_not_save() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let runner = runner(&adapter, &clock, json!({}));

        let status = runner
            .execute(&Command::Status {
                id: "fresh".to_string(),
            })
            .unwrap();

        assert_eq!(status["exists"], json!(false));
        assert_eq!(status["drops"], json!(0.0));
        assert_eq!(status["capacity"], json!(10));
        assert_eq!(status["data"], json!({}));
        assert!(adapter.is_empty());
    }

    #[test]
    fn test_fill_leaks_first_and_saves() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let runner = runner(&adapter, &clock, json!({"capacity": 10, "leak": 10}));

        runner.execute(&fill("api", 10, false)).unwrap();
        clock.advance(30);

        // 5 drops leaked, so 5 more fit
        let status = runner.execute(&fill("api", 5, false)).unwrap();
        assert_eq!(status["drops"], json!(10.0));
        assert_eq!(status["exists"], json!(true));
        assert_eq!(status["full"], json!(true));
        assert_eq!(status["last_time"], json!(START + 30));
    }

    #[test]
    fn test_fill_rejected_keeps_stored_state() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let runner = runner(&adapter, &clock, json!({"capacity": 5}));

        runner.execute(&fill("api", 3, false)).unwrap();
        let err = runner.execute(&fill("api", 3, false)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BucketError>(),
            Some(BucketError::InsufficientCapacity { .. })
        ));

        let status = runner
            .execute(&Command::Status {
                id: "api".to_string(),
            })
            .unwrap();
        assert_eq!(status["drops"], json!(3.0));

        let status = runner.execute(&fill("api", 3, true)).unwrap();
        assert_eq!(status["drops"], json!(6.0));

        let status = runner
            .execute(&Command::Overflow {
                id: "api".to_string(),
            })
            .unwrap();
        assert_eq!(status["drops"], json!(5.0));
    }

    #[test]
    fn test_no_leak_flag() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let settings = json!({"leak": 60});
        let runner = Runner::new(&adapter, &clock, settings.as_object().unwrap(), false).unwrap();

        runner.execute(&fill("slow", 5, false)).unwrap();
        clock.advance(3);
        let status = runner
            .execute(&Command::Spill {
                id: "slow".to_string(),
                drops: 1,
            })
            .unwrap();
        assert_eq!(status["drops"], json!(4.0));

        let status = runner
            .execute(&Command::Leak {
                id: "slow".to_string(),
            })
            .unwrap();
        assert_eq!(status["drops"], json!(4.0));

        clock.advance(2);
        let status = runner
            .execute(&Command::Leak {
                id: "slow".to_string(),
            })
            .unwrap();
        assert_eq!(status["drops"], json!(2.0));
    }

    #[test]
    fn test_dump_touch_and_delete() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let runner = runner(&adapter, &clock, json!({}));

        runner.execute(&fill("jobs", 4, false)).unwrap();
        let status = runner
            .execute(&Command::Dump {
                id: "jobs".to_string(),
            })
            .unwrap();
        assert_eq!(status["drops"], json!(0.0));

        clock.advance(45);
        let status = runner
            .execute(&Command::Touch {
                id: "jobs".to_string(),
            })
            .unwrap();
        assert_eq!(status["last_time"], json!(START + 45));

        let status = runner
            .execute(&Command::Delete {
                id: "jobs".to_string(),
            })
            .unwrap();
        assert_eq!(status["exists"], json!(false));
        assert!(adapter.is_empty());

        assert!(
            runner
                .execute(&Command::Delete {
                    id: "jobs".to_string()
                })
                .is_err()
        );
    }

    #[test]
    fn test_data_commands() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let runner = runner(&adapter, &clock, json!({}));

        runner
            .execute(&Command::Data {
                action: DataCommand::Set {
                    id: "meta".to_string(),
                    key: "user.id".to_string(),
                    value: "42".to_string(),
                },
            })
            .unwrap();
        runner
            .execute(&Command::Data {
                action: DataCommand::Set {
                    id: "meta".to_string(),
                    key: "user.name".to_string(),
                    value: "ada".to_string(),
                },
            })
            .unwrap();

        let value = runner
            .execute(&Command::Data {
                action: DataCommand::Get {
                    id: "meta".to_string(),
                    key: Some("user".to_string()),
                },
            })
            .unwrap();
        assert_eq!(value, json!({"id": 42, "name": "ada"}));

        let status = runner
            .execute(&Command::Data {
                action: DataCommand::Forget {
                    id: "meta".to_string(),
                    key: Some("user.id".to_string()),
                },
            })
            .unwrap();
        assert_eq!(status["data"], json!({"user": {"name": "ada"}}));

        let value = runner
            .execute(&Command::Data {
                action: DataCommand::Get {
                    id: "meta".to_string(),
                    key: Some("user.id".to_string()),
                },
            })
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_invalid_settings_rejected_up_front() {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(START);
        let settings = json!({"capacity": "ten"});

        let result = Runner::new(&adapter, &clock, settings.as_object().unwrap(), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("{\"a\":[1]}"), json!({"a": [1]}));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("hello world"), json!("hello world"));
    }
}
