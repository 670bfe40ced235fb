//! Watchlist Gateway - typed client for the remote Watchlist web service
//!
//! The [`WatchlistGateway`] is the SDK's root object. It is started once,
//! decorates every REST call with a cached bearer credential, tags mutations
//! with a per-instance client identity, and exposes a single push
//! subscription over WebSocket.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use watchlist_gateway::{Impersonation, WatchlistGateway};
//!
//! let identity = Impersonation::new("user-123", "barchart")?;
//! let gateway = WatchlistGateway::for_test(identity).await?;
//!
//! let watchlists = gateway.read_watchlists().await?;
//!
//! gateway.dispose();
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod endpoints;
mod error;
mod gateway;
mod impersonation;

pub use config::*;
pub use error::*;
pub use gateway::*;
pub use impersonation::*;

pub use watchlist_auth::{AuthError, TokenCache};
pub use watchlist_core::{
    ServiceMetadata, Sorting, SymbolQueryResult, Watchlist, WatchlistEntry, WatchlistPreferences,
};
pub use watchlist_streaming::{StreamError, SubscriptionStatus};
