use super::{Adapter, AdapterError};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

/// In-process adapter backed by a hash map
///
/// Records live only as long as the adapter. Useful in tests and for
/// single-process services that do not need durability across restarts.
///
/// # Example
///
/// ```
/// use spillway::{Adapter, MemoryAdapter};
///
/// let adapter = MemoryAdapter::new();
/// adapter.save("api:alice", r#"{"drops":"1","time":0}"#).unwrap();
/// assert!(adapter.exists("api:alice").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryAdapter {
    /// Create an empty adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    ///
    /// Counts the records even if a writer panicked while holding the lock.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self, id: &str) -> Result<MutexGuard<'_, HashMap<String, String>>, AdapterError> {
        self.records
            .lock()
            .map_err(|e| AdapterError::backend(id, e.to_string()))
    }
}

impl Adapter for MemoryAdapter {
    fn exists(&self, id: &str) -> Result<bool, AdapterError> {
        Ok(self.records(id)?.contains_key(id))
    }

    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError> {
        self.records(id)?.insert(id.to_string(), contents.to_string());
        Ok(())
    }

    fn read(&self, id: &str) -> Result<String, AdapterError> {
        self.records(id)?
            .get(id)
            .cloned()
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<(), AdapterError> {
        self.records(id)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))
    }
}
