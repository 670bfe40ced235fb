//! Watchlist Core - shared types for the Watchlist client SDK
//!
//! This crate carries the pieces every other SDK crate needs:
//!
//! - **Endpoint descriptors**: names the logical operation behind a request,
//!   carried inside identity failures so callers can see which call could not
//!   be authenticated.
//! - **Client identity**: a process-lifetime-unique identifier attached to
//!   mutation requests and used to recognize self-originated push
//!   notifications.
//! - **Disposal**: a capability object held by composition; once disposed, an
//!   owner fails all further use permanently.
//! - **Domain objects**: the watchlist request/response contracts.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod disposal;
mod endpoint;
mod identity;
mod types;

pub use disposal::*;
pub use endpoint::*;
pub use identity::*;
pub use types::*;

/// Header carrying the originating client identity on mutation requests.
pub const CLIENT_ID_HEADER: &str = "X-Client-ID";
