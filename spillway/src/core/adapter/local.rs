use super::{Adapter, AdapterError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Adapter that keeps one JSON file per bucket in a local directory
///
/// Each bucket is stored as `<root>/bucket-<id>.json`. The root directory is
/// created on the first save. Each save writes a uniquely named temporary
/// sibling file and renames it into place, so a failed save leaves the
/// previous record intact and concurrent saves of one bucket never share a
/// staging file.
///
/// Bucket IDs must be non-empty and must not contain path separators, `..`
/// or NUL bytes. A path that cannot be inspected is reported as missing by
/// [`exists`](Adapter::exists); the subsequent read surfaces the real error.
///
/// # Example
///
/// ```no_run
/// use spillway::{Bucket, BucketConfig, LocalAdapter};
///
/// let adapter = LocalAdapter::new("/var/lib/myapp/buckets");
/// let mut bucket = Bucket::new("login:10.0.0.7", adapter, BucketConfig::default())?;
/// bucket.leak().fill(1, false)?;
/// bucket.save()?;
/// # Ok::<(), spillway::BucketError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    /// Store buckets under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalAdapter { root: root.into() }
    }

    /// Directory holding the bucket files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file that stores bucket `id`
    pub fn path_for(&self, id: &str) -> Result<PathBuf, AdapterError> {
        Ok(self.root.join(file_name(id)?))
    }
}

fn file_name(id: &str) -> Result<String, AdapterError> {
    if id.is_empty() || id.contains(['/', '\\', '\0']) || id.contains("..") {
        return Err(AdapterError::InvalidId(id.to_string()));
    }
    Ok(format!("bucket-{id}.json"))
}

fn io_error(op: &'static str, id: &str, source: io::Error) -> AdapterError {
    if source.kind() == io::ErrorKind::NotFound {
        AdapterError::NotFound(id.to_string())
    } else {
        AdapterError::Io {
            op,
            id: id.to_string(),
            source,
        }
    }
}

impl Adapter for LocalAdapter {
    fn exists(&self, id: &str) -> Result<bool, AdapterError> {
        // Paths that cannot be inspected count as missing
        Ok(self.path_for(id)?.is_file())
    }

    fn save(&self, id: &str, contents: &str) -> Result<(), AdapterError> {
        let name = file_name(id)?;
        let path = self.root.join(&name);
        let save_error = |source: io::Error| AdapterError::Io {
            op: "save",
            id: id.to_string(),
            source,
        };

        if !self.root.is_dir() {
            tracing::debug!("Creating bucket directory {}", self.root.display());
            fs::create_dir_all(&self.root).map_err(save_error)?;
        }

        // Every save stages into its own file, the staging file is removed on drop
        let mut staging = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(save_error)?;
        staging.write_all(contents.as_bytes()).map_err(save_error)?;
        staging.persist(&path).map_err(|e| save_error(e.error))?;
        Ok(())
    }

    fn read(&self, id: &str) -> Result<String, AdapterError> {
        let path = self.path_for(id)?;
        let contents = fs::read_to_string(&path).map_err(|e| io_error("read", id, e))?;
        if contents.is_empty() {
            return Err(AdapterError::Io {
                op: "read",
                id: id.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidData, "record is empty"),
            });
        }
        Ok(contents)
    }

    fn delete(&self, id: &str) -> Result<(), AdapterError> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| io_error("delete", id, e))
    }
}
