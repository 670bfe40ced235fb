//! Gateway error taxonomy.

use thiserror::Error;
use watchlist_auth::AuthError;
use watchlist_streaming::StreamError;

/// Errors surfaced by gateway operations.
///
/// Validation and lifecycle errors are raised before any network activity and
/// are never retried. Identity failures already carry the bounded-retry
/// outcome of the token cache. Service and transport failures are passed
/// through for the caller's own retry decision.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway has been disposed; permanent.
    #[error("Unable to use gateway, the gateway has been disposed")]
    Disposed,

    /// The gateway has not started; call `start` first.
    #[error("Unable to use gateway, the gateway has not started")]
    NotStarted,

    /// A required argument was missing or malformed.
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// One-time setup failed; a later `start` call retries from scratch.
    #[error("Unable to start gateway: {0}")]
    StartFailed(String),

    /// The request could not be authenticated; the HTTP call was never made.
    #[error(transparent)]
    Identity(#[from] AuthError),

    /// The subscription channel rejected the request.
    #[error(transparent)]
    Subscription(#[from] StreamError),

    /// The server answered with a non-success status.
    #[error("Service call failed with status {status}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body, or the status reason when the body is empty.
        message: String,
    },

    /// The HTTP call itself failed, or the response body could not be
    /// decoded.
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_messages() {
        assert_eq!(
            GatewayError::Disposed.to_string(),
            "Unable to use gateway, the gateway has been disposed"
        );
        assert_eq!(
            GatewayError::NotStarted.to_string(),
            "Unable to use gateway, the gateway has not started"
        );
    }

    #[test]
    fn identity_failures_convert() {
        use watchlist_core::{EndpointDescriptor, Verb};

        let source = AuthError::IdentityFailure {
            endpoint: EndpointDescriptor::new("read-watchlists", Verb::Get, "/v1/watchlists"),
        };

        let error = GatewayError::from(source);
        assert!(matches!(error, GatewayError::Identity(_)));
        assert_eq!(
            error.to_string(),
            "Unable to authenticate request to read-watchlists (GET /v1/watchlists)"
        );
    }
}
