use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use super::snapshot::{self, StoreError};

/// Per-guild listening flag. Default is not listening; only explicit
/// `listen`/`stop` commands flip it. Same snapshot-on-write discipline as the
/// message store.
pub struct ListeningFlags {
    path: PathBuf,
    inner: Mutex<HashMap<u64, bool>>,
}

impl ListeningFlags {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = snapshot::load_or_init(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    pub fn is_listening(&self, guild_id: u64) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.get(&guild_id).copied().unwrap_or(false)
    }

    pub fn set_listening(&self, guild_id: u64, listening: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(guild_id, listening);
        info!("Guild {}: listening set to {}", guild_id, listening);
        snapshot::write_atomic(&self.path, &*inner)
    }

    /// Drop the entry so the guild falls back to the not-listening default.
    pub fn forget(&self, guild_id: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(&guild_id);
        snapshot::write_atomic(&self.path, &*inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_listening() {
        let dir = tempfile::tempdir().unwrap();
        let flags = ListeningFlags::load(dir.path().join("listening.json")).unwrap();
        assert!(!flags.is_listening(1));
    }

    #[test]
    fn set_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listening.json");

        let flags = ListeningFlags::load(&path).unwrap();
        flags.set_listening(1, true).unwrap();
        flags.set_listening(2, false).unwrap();
        assert!(flags.is_listening(1));
        assert!(!flags.is_listening(2));
        drop(flags);

        let reloaded = ListeningFlags::load(&path).unwrap();
        assert!(reloaded.is_listening(1));
        assert!(!reloaded.is_listening(2));
    }

    #[test]
    fn forget_resets_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let flags = ListeningFlags::load(dir.path().join("listening.json")).unwrap();

        flags.set_listening(1, true).unwrap();
        flags.forget(1).unwrap();
        assert!(!flags.is_listening(1));
    }
}
