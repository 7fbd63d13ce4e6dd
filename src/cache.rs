//! Token caching decorator over an arbitrary token source.
//!
//! The decorator adds persistence-backed reuse: a valid token survives
//! process restarts without a network round trip. Writing bearer credentials
//! to a plain file is not secure storage; prefer the OS keyring for the user
//! record and keep the token file permissions tight.

use crate::error::AuthError;
use crate::token::Token;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Anything that can produce a currently valid token on demand, performing
/// whatever fetch or refresh work is necessary.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token, AuthError>;
}

/// Decorator that reuses a token from memory or a disk record before
/// delegating to the wrapped source.
pub struct DiskReuseTokenSource<S> {
    cache_path: PathBuf,
    inner: S,
    cached: Mutex<Option<Token>>,
}

impl<S: TokenSource> DiskReuseTokenSource<S> {
    pub fn new(cache_path: impl Into<PathBuf>, inner: S) -> Self {
        Self {
            cache_path: cache_path.into(),
            inner,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for DiskReuseTokenSource<S> {
    async fn token(&self) -> Result<Token, AuthError> {
        let mut cached = self.cached.lock().await;
        // No token in memory yet; try the disk record first.
        if cached.is_none() {
            *cached = load_disk_token(&self.cache_path);
        }
        if let Some(token) = cached.as_ref() {
            if token.valid() {
                return Ok(token.clone());
            }
        }
        // No valid token anywhere; ask the wrapped source. Failures propagate
        // and cache nothing.
        let token = self.inner.token().await?;
        if let Err(err) = persist_disk_token(&self.cache_path, &token) {
            warn!(
                path = %self.cache_path.display(),
                "failed to persist token record: {err}"
            );
        }
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Attempt to load a cached token from disk.
///
/// A missing or unparsable record is a cache miss, never an error; another
/// process may be mid-write to the same file.
pub fn load_disk_token(path: &Path) -> Option<Token> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PersistedToken>(&data) {
        Ok(record) => Some(record.into_token()),
        Err(err) => {
            debug!(path = %path.display(), "ignoring unparsable token record: {err}");
            None
        }
    }
}

fn persist_disk_token(path: &Path, token: &Token) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
        }
    }
    let record = PersistedToken::from_token(token);
    let text = serde_json::to_string_pretty(&record)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let mut options = std::fs::OpenOptions::new();
    options.create(true).truncate(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

/// On-disk record for a cached token: the OAuth2 token fields plus the
/// associated user identifier when one is known.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedToken {
    access_token: String,
    refresh_token: String,
    token_type: String,
    #[serde(default)]
    expiry_unix: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl PersistedToken {
    fn from_token(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            token_type: token.token_type.clone(),
            expiry_unix: token.expiry.map(|expiry| {
                expiry
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs() as i64
            }),
            id_token: token.id_token.clone(),
            user_id: token.user_id.clone(),
        }
    }

    fn into_token(self) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expiry: self
                .expiry_unix
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)),
            id_token: self.id_token,
            user_id: self.user_id,
        }
    }
}
