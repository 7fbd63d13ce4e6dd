//! Disk-file user cache backend.

use super::{User, UserCache};
use crate::error::CacheError;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Stores each slot as a JSON file under a directory.
///
/// No cross-process locking: concurrent writers can race, so a reader treats
/// unparsable content as a missing record rather than a fatal error, and a
/// corrupt file is removed so the next write starts clean.
#[derive(Debug)]
pub struct DiskUserCache {
    dir: PathBuf,
}

impl DiskUserCache {
    /// Cache rooted at `dir`. The directory is created on first write. Slot
    /// names are expected to be simple identifiers; they become file names.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl UserCache for DiskUserCache {
    fn get(&self, slot: &str) -> Result<Option<User>, CacheError> {
        let path = self.slot_path(slot);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::Io(err)),
        };
        match serde_json::from_str(&data) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                // Self-heal: drop the corrupt record so the next get is a
                // clean miss instead of a repeated failure.
                warn!(path = %path.display(), "removing corrupt user record: {err}");
                let _ = std::fs::remove_file(&path);
                Err(CacheError::Corrupt(format!(
                    "user record `{}`: {err}",
                    path.display()
                )))
            }
        }
    }

    fn set(&self, slot: &str, user: &User) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700));
        }
        let text = serde_json::to_string_pretty(user)
            .map_err(|err| CacheError::Backend(format!("failed to serialize user: {err}")))?;
        let mut options = std::fs::OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(self.slot_path(slot))?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn delete(&self, slot: &str) {
        let _ = std::fs::remove_file(self.slot_path(slot));
    }
}
