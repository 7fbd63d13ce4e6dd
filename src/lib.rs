//! signon — client-side identity credential acquisition and caching.
//!
//! This crate signs a single local user in against a Google-style identity
//! platform and keeps a valid short-lived token available for long-running
//! clients: the interactive authorization-code flow, the identity-provider
//! exchange/refresh protocol, persistence-backed token caching, and a
//! concurrency-safe session manager that answers "give me a currently valid
//! token".
//!
//! # Quick start
//!
//! ```no_run
//! use signon::config::load_app_config;
//! use signon::idp::IdpConfig;
//! use signon::session::AuthSession;
//! use signon::store::DiskUserCache;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = load_app_config(None)?;
//! let idp = IdpConfig::new(&app.api_key, None)?;
//! let session = AuthSession::new(idp, Arc::new(DiskUserCache::new("/var/lib/signon/users")));
//! let token = session.token().await?;
//! println!("{}", token.access_token);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod idp;
pub mod oauth;
pub mod session;
pub mod store;
#[cfg(test)]
pub mod testsupport;
pub mod token;
