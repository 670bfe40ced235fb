//! Watchlist Streaming - push notifications over WebSocket
//!
//! A [`SubscriptionChannel`] keeps one authenticated WebSocket open to the
//! watchlist push service, reconnecting after a fixed delay whenever the
//! socket drops. Keep-alive `PING` frames are answered transparently, and
//! notifications caused by this client instance can be filtered out (echo
//! suppression).
//!
//! The socket itself sits behind the [`SocketConnector`] trait, so tests
//! substitute a scripted transport.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod channel;
mod error;
mod transport;

pub use channel::*;
pub use error::*;
pub use transport::*;
