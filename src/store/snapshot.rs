//! Whole-file snapshot persistence shared by the message store and the
//! listening flags. Every mutation rewrites the full snapshot; writes go to a
//! sibling temp file first and are renamed into place so a crash mid-write
//! never leaves a truncated snapshot behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot (de)serialization failure at {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn serde_err(path: &Path, source: serde_json::Error) -> StoreError {
    StoreError::Serde {
        path: path.display().to_string(),
        source,
    }
}

/// Load a snapshot, or initialize an empty one if the file does not exist.
/// A present-but-unreadable snapshot is an error; callers treat that as fatal
/// at startup.
pub fn load_or_init<T>(path: &Path) -> Result<T, StoreError>
where
    T: Default + Serialize + DeserializeOwned,
{
    if path.is_file() {
        let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
        let value = serde_json::from_slice(&bytes).map_err(|e| serde_err(path, e))?;
        debug!("Loaded snapshot from {}", path.display());
        Ok(value)
    } else {
        let value = T::default();
        write_atomic(path, &value)?;
        debug!("Initialized empty snapshot at {}", path.display());
        Ok(value)
    }
}

/// Serialize `value` and atomically replace the snapshot at `path`.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }

    let bytes = serde_json::to_vec(value).map_err(|e| serde_err(path, e))?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
