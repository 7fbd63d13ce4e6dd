//! OS keyring user cache backend (Secret Service, macOS Keychain, Windows
//! Credential Manager).

use super::{User, UserCache};
use crate::error::CacheError;
use keyring::{Entry, Error as KeyringError};
use tracing::warn;

/// Stores each slot as a keyring entry under a service name (typically the
/// provider project id).
#[derive(Debug)]
pub struct KeyringUserCache {
    service: String,
}

impl KeyringUserCache {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: &str) -> Result<Entry, CacheError> {
        Entry::new(&self.service, slot)
            .map_err(|err| CacheError::Backend(format!("keyring entry `{slot}`: {err}")))
    }
}

impl UserCache for KeyringUserCache {
    fn get(&self, slot: &str) -> Result<Option<User>, CacheError> {
        let entry = self.entry(slot)?;
        let data = match entry.get_password() {
            Ok(data) => data,
            Err(KeyringError::NoEntry) => return Ok(None),
            Err(err) => return Err(CacheError::Backend(format!("keyring get: {err}"))),
        };
        match serde_json::from_str(&data) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                // Self-heal: drop the corrupt entry so the next get is a
                // clean miss instead of a repeated failure.
                warn!(slot, "removing corrupt keyring user record: {err}");
                let _ = entry.delete_credential();
                Err(CacheError::Corrupt(format!("keyring record `{slot}`: {err}")))
            }
        }
    }

    fn set(&self, slot: &str, user: &User) -> Result<(), CacheError> {
        let data = serde_json::to_string(user)
            .map_err(|err| CacheError::Backend(format!("failed to serialize user: {err}")))?;
        self.entry(slot)?
            .set_password(&data)
            .map_err(|err| CacheError::Backend(format!("keyring set: {err}")))
    }

    fn delete(&self, slot: &str) {
        if let Ok(entry) = self.entry(slot) {
            let _ = entry.delete_credential();
        }
    }
}
