//! Unified error types for the credential subsystem.

use std::fmt;

// ---------------------------------------------------------------------------
// StatusError
// ---------------------------------------------------------------------------

/// A non-2xx response from a provider endpoint, classified for retry policy.
///
/// Callers decide retry behavior from the two predicates: a non-temporary
/// error means the request itself was invalid or unauthorized and retrying
/// without changing input cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    code: u16,
    body: String,
}

impl StatusError {
    pub fn new(code: u16, body: String) -> Self {
        Self { code, body }
    }

    /// HTTP status code of the failed response.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Raw response body, useful for surfacing provider error detail.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// False for 400/401/403/501; retrying those with the same input will
    /// never help. Everything else is worth another attempt.
    pub fn temporary(&self) -> bool {
        !matches!(self.code, 400 | 401 | 403 | 501)
    }

    /// True only for HTTP 408.
    pub fn timeout(&self) -> bool {
        self.code == 408
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.code, self.body)
    }
}

impl std::error::Error for StatusError {}

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// Errors surfaced by the sign-in, exchange, and refresh paths.
#[derive(Debug)]
pub enum AuthError {
    /// Network / reqwest-level failure. Not classified; surfaced directly.
    Http(reqwest::Error),
    /// Non-2xx response from a provider endpoint.
    Api(StatusError),
    /// Malformed response body or unparsable expiry. Permanent, never retried.
    Decode(String),
    /// Provider or OAuth client configuration problem.
    Config(ConfigError),
    /// The interactive input stream failed or hit EOF before a code was read.
    Input(std::io::Error),
    /// `token()` was called with no signed-in user.
    NotAuthenticated,
}

impl AuthError {
    /// The classified API failure, when that is what this error holds.
    pub fn status(&self) -> Option<&StatusError> {
        match self {
            Self::Api(status) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "http: {err}"),
            Self::Api(err) => write!(f, "api: {err}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Input(err) => write!(f, "input: {err}"),
            Self::NotAuthenticated => write!(f, "no user is currently authenticated"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<StatusError> for AuthError {
    fn from(err: StatusError) -> Self {
        Self::Api(err)
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Errors from user cache backends.
///
/// "Not found" is never an error; backends report it as a successful empty
/// result. These variants cover genuine backend failures only.
#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    /// Backend-specific failure (e.g. the OS keyring service).
    Backend(String),
    /// A stored record failed to parse. The backend removes the entry before
    /// returning this, so the next read starts clean.
    Corrupt(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Backend(msg) => write!(f, "backend: {msg}"),
            Self::Corrupt(msg) => write!(f, "corrupt record: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing provider or OAuth client configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
