use std::sync::Arc;
use thiserror::Error;

mod local;
mod memory;

pub use local::LocalAdapter;
pub use memory::MemoryAdapter;

/// Storage backend for bucket records
///
/// An adapter stores one opaque string per bucket ID and knows nothing about
/// bucket semantics. All methods take `&self` so that a single adapter can
/// back many buckets; implementations provide their own synchronization.
///
/// There is no compare-and-swap: two holders of the same bucket ID that load,
/// mutate and save concurrently will race, and the last save wins.
///
/// `read` and `delete` report [`AdapterError::NotFound`] when no record
/// exists for the ID.
pub trait Adapter {
    /// Whether a record exists for `id`
    fn exists(&self, id: &str) -> Result<bool, AdapterError>;

    /// Write `contents` for `id`, replacing any previous record
    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError>;

    /// Read the record stored for `id`
    fn read(&self, id: &str) -> Result<String, AdapterError>;

    /// Remove the record stored for `id`
    fn delete(&self, id: &str) -> Result<(), AdapterError>;
}

/// Errors reported by storage adapters
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No record is stored for the bucket ID
    #[error("bucket not found: {0}")]
    NotFound(String),

    /// The bucket ID cannot be mapped onto the backend's key space
    #[error("invalid bucket ID: {0:?}")]
    InvalidId(String),

    /// A filesystem operation failed
    #[error("unable to {op} bucket ({id}): {source}")]
    Io {
        op: &'static str,
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure
    #[error("storage backend failed for bucket ({id}): {source}")]
    Backend {
        id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AdapterError {
    /// Wrap an arbitrary backend error
    pub fn backend(
        id: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AdapterError::Backend {
            id: id.into(),
            source: source.into(),
        }
    }

    /// Whether this error means the record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound(_))
    }
}

impl<A: Adapter + ?Sized> Adapter for &A {
    fn exists(&self, id: &str) -> Result<bool, AdapterError> {
        (**self).exists(id)
    }

    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError> {
        (**self).save(id, contents)
    }

    fn read(&self, id: &str) -> Result<String, AdapterError> {
        (**self).read(id)
    }

    fn delete(&self, id: &str) -> Result<(), AdapterError> {
        (**self).delete(id)
    }
}

impl<A: Adapter + ?Sized> Adapter for Box<A> {
    fn exists(&self, id: &str) -> Result<bool, AdapterError> {
        (**self).exists(id)
    }

    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError> {
        (**self).save(id, contents)
    }

    fn read(&self, id: &str) -> Result<String, AdapterError> {
        (**self).read(id)
    }

    fn delete(&self, id: &str) -> Result<(), AdapterError> {
        (**self).delete(id)
    }
}

impl<A: Adapter + ?Sized> Adapter for Arc<A> {
    fn exists(&self, id: &str) -> Result<bool, AdapterError> {
        (**self).exists(id)
    }

    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError> {
        (**self).save(id, contents)
    }

    fn read(&self, id: &str) -> Result<String, AdapterError> {
        (**self).read(id)
    }

    fn delete(&self, id: &str) -> Result<(), AdapterError> {
        (**self).delete(id)
    }
}
