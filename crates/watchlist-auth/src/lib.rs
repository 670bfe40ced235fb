//! Watchlist Auth - token caching and request authentication
//!
//! This crate owns the credential lifecycle for the Watchlist client SDK:
//!
//! - **[`TokenCache`]**: caches one bearer credential, refreshing it through a
//!   delegate when the (jittered) refresh interval elapses. Concurrent
//!   callers share a single in-flight refresh.
//! - **[`BackoffPolicy`] / [`retry_backoff`]**: bounded exponential backoff
//!   wrapped around the refresh delegate so a transient network failure does
//!   not immediately fail every waiting caller.
//! - **[`RequestAuthenticator`]**: injects the cached credential into
//!   outbound requests as an `Authorization: Bearer` header, mapping token
//!   failures into structured identity failures.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use watchlist_auth::TokenCache;
//!
//! let tokens = TokenCache::new(
//!     || async { fetch_signed_token().await },
//!     Duration::from_secs(300),
//! );
//!
//! let credential = tokens.get_token().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod authenticator;
mod error;
mod retry;
mod token;

pub use authenticator::*;
pub use error::*;
pub use retry::*;
pub use token::*;
