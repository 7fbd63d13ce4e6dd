//! Shared test fixtures for the protocol, cache, and session test modules.
//!
//! Keeping the canned users, tokens, and stub response bodies here prevents
//! each test module from rebuilding ad-hoc fixture code.

use crate::oauth::{OauthConfig, OOB_REDIRECT_URL};
use crate::store::User;
use crate::token::Token;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const TEST_API_KEY: &str = "test_api_key";
pub const TEST_OAUTH_CODE: &str = "test_auth_code";

/// Emulator-shaped endpoint paths: the real host folded into the path of a
/// local HTTP server.
pub const EXCHANGE_EMULATOR_PATH: &str =
    "/identitytoolkit.googleapis.com/v1/accounts:signInWithIdp";
pub const REFRESH_EMULATOR_PATH: &str = "/securetoken.googleapis.com/v1/token";

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("signon-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as
    /// needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture parent directories");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// OAuth client config pointed at a stub server's `/auth` and `/token`.
pub fn test_oauth_config(base_url: &str) -> OauthConfig {
    OauthConfig {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        auth_url: format!("{base_url}/auth"),
        token_url: format!("{base_url}/token"),
        scopes: vec!["openid".to_string()],
        redirect_url: OOB_REDIRECT_URL.to_string(),
    }
}

/// Canned user with a versioned refresh token.
pub fn test_user(version: u32) -> User {
    User {
        user_id: "test_local_id".to_string(),
        email: "user@example.com".to_string(),
        email_verified: true,
        display_name: "Test User".to_string(),
        photo_url: "https://example.com/avatar.png".to_string(),
        refresh_token: format!("test_refresh_token_{version}"),
    }
}

/// Canned token with versioned credentials and a whole-second expiry so it
/// survives a disk round trip byte-for-byte. Negative TTLs produce an
/// already-expired token.
pub fn test_token(version: u32, ttl_secs: i64) -> Token {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    Token {
        access_token: format!("test_access_token_{version}"),
        refresh_token: format!("test_refresh_token_{version}"),
        token_type: "Bearer".to_string(),
        expiry: Some(UNIX_EPOCH + Duration::from_secs((now + ttl_secs).max(0) as u64)),
        id_token: None,
        user_id: None,
    }
}

/// OAuth access token as produced by a code exchange, carrying an embedded
/// ID token.
pub fn test_access_token() -> Token {
    Token {
        access_token: "test_auth_token".to_string(),
        refresh_token: String::new(),
        token_type: "Bearer".to_string(),
        expiry: None,
        id_token: Some("test_embedded_id_token".to_string()),
        user_id: None,
    }
}

/// Stub OAuth token-endpoint response body.
pub fn oauth_token_response_json() -> String {
    json!({
        "access_token": "test_auth_token",
        "token_type": "Bearer",
        "id_token": "test_embedded_id_token",
    })
    .to_string()
}

/// Stub identity-platform exchange response body.
pub fn idp_exchange_response_json(expires_in: &str) -> String {
    json!({
        "federatedId": "https://accounts.google.com/test_local_id",
        "providerId": "google.com",
        "localId": "test_local_id",
        "emailVerified": true,
        "email": "user@example.com",
        "displayName": "Test User",
        "photoUrl": "https://example.com/avatar.png",
        "idToken": "test_idp_id_token",
        "refreshToken": "test_refresh_token_1",
        "expiresIn": expires_in,
    })
    .to_string()
}

/// Stub identity-platform refresh response body with versioned rotation.
pub fn idp_refresh_response_json(version: u32, expires_in: &str) -> String {
    json!({
        "expires_in": expires_in,
        "token_type": "Bearer",
        "refresh_token": format!("test_refresh_token_{version}"),
        "id_token": format!("test_id_token_{version}"),
        "user_id": "test_local_id",
        "project_id": "test-project",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).expect("read fixture"), "hello");
    }

    #[test]
    fn canned_token_respects_requested_ttl_sign() {
        assert!(test_token(1, 3600).valid());
        assert!(!test_token(1, -60).valid());
    }

    #[test]
    fn exchange_fixture_carries_provider_field_names() {
        let raw = idp_exchange_response_json("3600");
        assert!(raw.contains("\"localId\""));
        assert!(raw.contains("\"expiresIn\""));
    }
}
