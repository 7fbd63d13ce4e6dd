//! Identity-platform token exchange and refresh protocol client.
//!
//! This layer turns an OAuth2 access token into a platform identity (user
//! profile plus refresh token) and turns a refresh token into a fresh
//! short-lived ID token. It holds no mutable state beyond its immutable
//! endpoint configuration.

use crate::cache::TokenSource;
use crate::error::{AuthError, ConfigError, StatusError};
use crate::store::User;
use crate::token::{expiry_from_ttl, Token};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_AUTH_HOST: &str = "identitytoolkit.googleapis.com";
const DEFAULT_AUTH_PATH: &str = "v1/accounts:signInWithIdp";
const DEFAULT_TOKEN_HOST: &str = "securetoken.googleapis.com";
const DEFAULT_TOKEN_PATH: &str = "v1/token";

/// Identity-provider endpoint configuration. Immutable after construction.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Endpoint that exchanges OAuth2 access tokens for identity ID tokens.
    auth_url: String,
    /// Endpoint that refreshes identity ID tokens.
    token_url: String,
}

fn build_api_url(
    emulator_host: Option<&str>,
    api_host: &str,
    api_path: &str,
    api_key: &str,
) -> Result<String, ConfigError> {
    // The emulator serves both endpoints over plain HTTP, with the real host
    // name folded into the path.
    let base = match emulator_host {
        None => format!("https://{api_host}/{api_path}"),
        Some(host) => format!("http://{host}/{api_host}/{api_path}"),
    };
    let mut url = reqwest::Url::parse(&base)
        .map_err(|err| ConfigError::Invalid(format!("bad identity endpoint `{base}`: {err}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.to_string())
}

impl IdpConfig {
    /// Build endpoint URLs for the given API key, optionally redirected to a
    /// local emulator host for testing.
    pub fn new(api_key: &str, emulator_host: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            auth_url: build_api_url(emulator_host, DEFAULT_AUTH_HOST, DEFAULT_AUTH_PATH, api_key)?,
            token_url: build_api_url(
                emulator_host,
                DEFAULT_TOKEN_HOST,
                DEFAULT_TOKEN_PATH,
                api_key,
            )?,
        })
    }

    /// Exchange an OAuth2 access token for a platform identity and an ID
    /// token usable as a bearer credential.
    pub async fn exchange(
        &self,
        http: &reqwest::Client,
        access: &Token,
    ) -> Result<(User, Token), AuthError> {
        // Prefer the embedded ID token when the OAuth exchange returned one;
        // fall back to the raw access token. Exactly one of the two is sent.
        let post_body = match &access.id_token {
            Some(id_token) => serde_urlencoded::to_string([("id_token", id_token.as_str())]),
            None => {
                serde_urlencoded::to_string([("access_token", access.access_token.as_str())])
            }
        }
        .map_err(|err| AuthError::Decode(format!("failed to encode postBody: {err}")))?;

        let request = ExchangeRequest {
            post_body,
            provider_id: "google.com",
            request_uri: "http://localhost",
            return_idp_credential: true,
            return_secure_token: true,
        };
        let response = http.post(&self.auth_url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), body).into());
        }

        let parsed: ExchangeResponse = serde_json::from_str(&body)
            .map_err(|err| AuthError::Decode(format!("failed to parse exchange response: {err}")))?;
        let expiry = expiry_from_ttl(&parsed.expires_in)?;

        let user = User {
            user_id: parsed.local_id.clone(),
            email: parsed.email,
            email_verified: parsed.email_verified,
            display_name: parsed.display_name,
            photo_url: parsed.photo_url,
            refresh_token: parsed.refresh_token.clone(),
        };
        let token = Token {
            access_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            token_type: "Bearer".to_string(),
            expiry: Some(expiry),
            id_token: None,
            user_id: Some(parsed.local_id),
        };
        Ok((user, token))
    }

    /// Get a new ID token with the provided refresh token. The provider
    /// rotates the refresh token on every call.
    pub async fn refresh(
        &self,
        http: &reqwest::Client,
        refresh_token: &str,
    ) -> Result<Token, AuthError> {
        let form = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), body).into());
        }

        let parsed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|err| AuthError::Decode(format!("failed to parse refresh response: {err}")))?;
        let expiry = expiry_from_ttl(&parsed.expires_in)?;
        debug!(user_id = %parsed.user_id, "refreshed identity token");

        Ok(Token {
            access_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            token_type: if parsed.token_type.is_empty() {
                "Bearer".to_string()
            } else {
                parsed.token_type
            },
            expiry: Some(expiry),
            id_token: None,
            user_id: Some(parsed.user_id),
        })
    }

    /// Wrap this config and a starting token as a [`TokenSource`] that
    /// refreshes on every call. Wrap it with a caching decorator to avoid
    /// redundant refresh round trips.
    pub fn token_source(&self, http: reqwest::Client, initial: Token) -> IdpTokenSource {
        IdpTokenSource {
            cfg: self.clone(),
            http,
            current: Mutex::new(initial),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    post_body: String,
    provider_id: &'a str,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExchangeResponse {
    local_id: String,
    email: String,
    email_verified: bool,
    display_name: String,
    photo_url: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefreshResponse {
    expires_in: String,
    token_type: String,
    refresh_token: String,
    id_token: String,
    user_id: String,
}

/// Token source that calls the refresh endpoint on every request, keeping
/// the rotated refresh token for the next call.
pub struct IdpTokenSource {
    cfg: IdpConfig,
    http: reqwest::Client,
    current: Mutex<Token>,
}

#[async_trait]
impl TokenSource for IdpTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        let mut current = self.current.lock().await;
        let fresh = self.cfg.refresh(&self.http, &current.refresh_token).await?;
        *current = fresh.clone();
        Ok(fresh)
    }
}
