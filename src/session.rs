//! Concurrency-safe session manager over the sign-in and refresh flows.
//!
//! One `AuthSession` per process holds the current user and the current
//! cached token. Callers that need a bearer credential ask [`AuthSession::token`];
//! everything else (interactive sign-in, restore, sign-out) exists to put the
//! session into a state where that call can succeed.

use crate::cache::TokenSource;
use crate::error::AuthError;
use crate::idp::IdpConfig;
use crate::oauth::{random_state, read_code, OauthConfig};
use crate::store::{User, UserCache, DEFAULT_SLOT};
use crate::token::Token;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent("signon/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Debug, Default)]
struct SessionState {
    current_user: Option<User>,
    cached_token: Option<Token>,
}

/// Stateful façade over the credential lifecycle.
///
/// A single reader/writer lock guards the current user and cached token: the
/// fast path of [`token`](Self::token) and [`current_user`](Self::current_user)
/// take the read half, every mutation takes the write half. Refresh is
/// strictly demand-driven; there is no background timer.
pub struct AuthSession {
    http: reqwest::Client,
    idp: IdpConfig,
    cache: Arc<dyn UserCache>,
    state: RwLock<SessionState>,
}

impl AuthSession {
    /// Create a session over the given identity endpoints and user cache,
    /// restoring a previously signed-in user from the cache when one exists.
    /// Any cache failure during restore is treated as "no user".
    pub fn new(idp: IdpConfig, cache: Arc<dyn UserCache>) -> Self {
        let current_user = cache.get(DEFAULT_SLOT).unwrap_or_else(|err| {
            warn!("failed to restore cached user: {err}");
            None
        });
        Self {
            http: default_http_client(),
            idp,
            cache,
            state: RwLock::new(SessionState {
                current_user,
                cached_token: None,
            }),
        }
    }

    /// Snapshot of the currently signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.current_user.clone()
    }

    /// Run the interactive console sign-in: print the authorization URL to
    /// `output`, read the pasted code from `input`, exchange it, and sign the
    /// resulting identity in. Failure at any step leaves the session
    /// untouched.
    pub async fn sign_in_with_console<R, W>(
        &self,
        oauth: &OauthConfig,
        input: R,
        mut output: W,
    ) -> Result<(User, Token), AuthError>
    where
        R: BufRead + Send,
        W: Write + Send,
    {
        let state = random_state();
        let url = oauth.auth_code_url(&state)?;
        // Prompt writes are best-effort; the read below is what gates the flow.
        let _ = writeln!(output, "Visit this url to authenticate: {url}");
        let _ = write!(output, "Input code: ");
        let _ = output.flush();
        let code = read_code(input)?;
        let access = oauth.exchange_code(&self.http, &code).await?;
        self.sign_in_with_token(&access).await
    }

    /// Exchange an already-obtained OAuth2 access token for a platform
    /// identity and make it the session's current user.
    pub async fn sign_in_with_token(&self, access: &Token) -> Result<(User, Token), AuthError> {
        let (user, token) = self.idp.exchange(&self.http, access).await?;
        let mut state = self.state.write().await;
        state.current_user = Some(user.clone());
        state.cached_token = Some(token.clone());
        self.write_through(&user);
        Ok((user, token))
    }

    /// Restore a session from a previously cached user: refresh with the
    /// user's stored refresh token and adopt the rotated credentials.
    pub async fn sign_in_with_user(&self, user: User) -> Result<Token, AuthError> {
        let mut state = self.state.write().await;
        self.refresh_user_locked(&mut state, user).await
    }

    /// Sign the current user out, removing it from the user cache and
    /// dropping the cached token.
    pub async fn sign_out(&self) {
        let mut state = self.state.write().await;
        if state.current_user.is_some() {
            self.cache.delete(DEFAULT_SLOT);
        }
        state.current_user = None;
        state.cached_token = None;
    }

    /// Return a currently valid token for the signed-in user, refreshing on
    /// demand.
    ///
    /// Fast path: a read lock and a validity check. Slow path: take the write
    /// lock and re-check, because a concurrent caller may have refreshed
    /// while this one waited; a burst of callers hitting an expired token
    /// collapses into a single refresh request, with the losers adopting the
    /// winner's result.
    pub async fn token(&self) -> Result<Token, AuthError> {
        {
            let state = self.state.read().await;
            if let Some(token) = &state.cached_token {
                if token.valid() {
                    return Ok(token.clone());
                }
            }
            if state.current_user.is_none() {
                return Err(AuthError::NotAuthenticated);
            }
        }

        let mut state = self.state.write().await;
        if let Some(token) = &state.cached_token {
            if token.valid() {
                debug!("token already refreshed by a concurrent caller");
                return Ok(token.clone());
            }
        }
        let Some(user) = state.current_user.clone() else {
            return Err(AuthError::NotAuthenticated);
        };
        self.refresh_user_locked(&mut state, user).await
    }

    /// Refresh `user`'s credentials and store the result. Caller holds the
    /// write lock. On failure the session state is left as it was, so a
    /// failed refresh never signs the user out.
    async fn refresh_user_locked(
        &self,
        state: &mut SessionState,
        mut user: User,
    ) -> Result<Token, AuthError> {
        let token = self.idp.refresh(&self.http, &user.refresh_token).await?;
        user.refresh_token = token.refresh_token.clone();
        state.current_user = Some(user.clone());
        state.cached_token = Some(token.clone());
        self.write_through(&user);
        Ok(token)
    }

    /// Persist the user to the cache. The in-memory session stays the source
    /// of truth, so a failed write degrades restart convenience but never the
    /// running session.
    fn write_through(&self, user: &User) {
        if let Err(err) = self.cache.set(DEFAULT_SLOT, user) {
            warn!("failed to write user through to cache: {err}");
        }
    }
}

#[async_trait]
impl TokenSource for AuthSession {
    async fn token(&self) -> Result<Token, AuthError> {
        AuthSession::token(self).await
    }
}
