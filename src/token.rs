//! Token model shared by the OAuth and identity-provider layers.

use crate::error::AuthError;
use std::time::{Duration, SystemTime};

/// Fraction of the provider-declared TTL a token is considered usable for.
///
/// Expiry is always computed as `now + 0.75 * ttl` rather than the provider's
/// literal expiry, so refresh happens well before the token actually dies and
/// clock skew or caller latency cannot push a "valid" token past its real
/// lifetime.
pub const EXPIRY_MARGIN: f64 = 0.75;

/// A bearer credential issued by the OAuth or identity-provider endpoints.
///
/// The optional fields carry provider extras that may or may not be present:
/// an ID token embedded in an OAuth code-exchange response, and the
/// provider-assigned user id attached to identity-platform tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Margin-adjusted expiry. `None` means the provider declared no TTL and
    /// the token never goes stale on its own.
    pub expiry: Option<SystemTime>,
    /// ID token embedded in the response, when the provider returned one.
    pub id_token: Option<String>,
    /// Provider-assigned user id, when the provider returned one.
    pub user_id: Option<String>,
}

impl Token {
    /// True when the token exists and has time left before its margin-adjusted
    /// expiry. Tokens without a declared expiry never go invalid here.
    pub fn valid(&self) -> bool {
        !self.access_token.is_empty()
            && self
                .expiry
                .map_or(true, |expiry| SystemTime::now() < expiry)
    }
}

/// Compute a margin-adjusted expiry from a TTL in seconds.
pub fn expiry_from_secs(ttl_secs: f64) -> SystemTime {
    let margin = (ttl_secs * EXPIRY_MARGIN).max(0.0);
    SystemTime::now() + Duration::from_secs_f64(margin)
}

/// Parse a provider-declared TTL string (e.g. `"3600"`) into a
/// margin-adjusted expiry. An unparsable TTL is a permanent decode error.
pub fn expiry_from_ttl(ttl: &str) -> Result<SystemTime, AuthError> {
    let secs: f64 = ttl
        .trim()
        .parse()
        .map_err(|err| AuthError::Decode(format!("invalid expiresIn value `{ttl}`: {err}")))?;
    Ok(expiry_from_secs(secs))
}
