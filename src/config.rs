//! Provider project configuration with embedded defaults.
//!
//! Both documents the provider hands out are JSON: the web-app config
//! (API key, project id) and the OAuth "installed application" client
//! secret. Defaults are compiled in; parsing happens at construction time
//! and malformed defaults surface as errors, never panics.

use crate::error::ConfigError;
use crate::oauth::OauthConfig;
use serde::Deserialize;
use std::path::Path;

/// Embedded default web-app config. Replace at build time for a different
/// deployment; the CLI can also point at a file instead.
const DEFAULT_APP_JSON: &str = r#"{
  "apiKey": "AIzaSyA-signon-default-api-key",
  "authDomain": "signon-demo.example.com",
  "projectId": "signon-demo"
}
"#;

/// Embedded default OAuth client secret in the Google "installed" shape.
const DEFAULT_CLIENT_SECRET_JSON: &str = r#"{
  "installed": {
    "client_id": "signon-demo.apps.googleusercontent.com",
    "project_id": "signon-demo",
    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
    "token_uri": "https://oauth2.googleapis.com/token",
    "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
    "client_secret": "signon-demo-client-secret",
    "redirect_uris": [
      "urn:ietf:wg:oauth:2.0:oob",
      "http://localhost"
    ]
  }
}
"#;

/// Identity-platform project configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub api_key: String,
    pub project_id: String,
    #[serde(default)]
    pub auth_domain: Option<String>,
}

impl AppConfig {
    /// Parse a web-app config document.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(data)?;
        if config.api_key.is_empty() {
            return Err(ConfigError::Invalid(
                "app config has no apiKey".to_string(),
            ));
        }
        if config.project_id.is_empty() {
            return Err(ConfigError::Invalid(
                "app config has no projectId".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Load the app config from `path`, or the embedded default when no path is
/// given.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::from_json(&std::fs::read_to_string(path)?),
        None => AppConfig::from_json(DEFAULT_APP_JSON),
    }
}

/// Load the OAuth client config from a client-secret file, or the embedded
/// default when no path is given.
pub fn load_oauth_config(path: Option<&Path>) -> Result<OauthConfig, ConfigError> {
    match path {
        Some(path) => OauthConfig::from_installed_json(&std::fs::read_to_string(path)?),
        None => OauthConfig::from_installed_json(DEFAULT_CLIENT_SECRET_JSON),
    }
}
