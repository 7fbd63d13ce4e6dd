//! Pluggable storage for the locally signed-in user.
//!
//! Backends are interchangeable behind the [`UserCache`] contract: an
//! in-memory map, a disk file, or the OS keyring (behind the `keyring`
//! feature). "Not found" is a successful empty result everywhere; only
//! genuine backend failures surface as errors.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

mod disk;
#[cfg(feature = "keyring")]
mod keyring;

pub use self::disk::DiskUserCache;
#[cfg(feature = "keyring")]
pub use self::keyring::KeyringUserCache;

/// Slot name for the single locally signed-in identity.
pub const DEFAULT_SLOT: &str = "default";

/// The locally authenticated identity. Created on sign-in, its
/// `refresh_token` rotates on every token refresh, and the record is deleted
/// on sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: String,
    pub photo_url: String,
    pub refresh_token: String,
}

/// Capability contract for user persistence backends.
pub trait UserCache: Send + Sync {
    /// Fetch the user stored under `slot`. Absent slots are `Ok(None)`;
    /// errors mean the backend itself failed.
    fn get(&self, slot: &str) -> Result<Option<User>, CacheError>;

    /// Store `user` under `slot`, replacing any existing record.
    fn set(&self, slot: &str, user: &User) -> Result<(), CacheError>;

    /// Remove the record under `slot`. Best-effort; absent slots are fine.
    fn delete(&self, slot: &str);
}

/// In-memory backend; useful for tests and sessions that should not outlive
/// the process.
#[derive(Debug, Default)]
pub struct MemoryUserCache {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserCache for MemoryUserCache {
    fn get(&self, slot: &str) -> Result<Option<User>, CacheError> {
        let users = self
            .users
            .lock()
            .map_err(|_| CacheError::Backend("user map lock poisoned".to_string()))?;
        Ok(users.get(slot).cloned())
    }

    fn set(&self, slot: &str, user: &User) -> Result<(), CacheError> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| CacheError::Backend("user map lock poisoned".to_string()))?;
        users.insert(slot.to_string(), user.clone());
        Ok(())
    }

    fn delete(&self, slot: &str) {
        if let Ok(mut users) = self.users.lock() {
            users.remove(slot);
        }
    }
}
