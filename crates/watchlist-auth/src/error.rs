//! Authentication error types.

use watchlist_core::EndpointDescriptor;

/// Authentication errors.
///
/// Variants are `Clone` because a single refresh outcome is delivered to
/// every caller sharing the in-flight refresh.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The token delegate failed to produce a credential.
    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    /// A request could not be authenticated; the call was never issued.
    #[error("Unable to authenticate request to {endpoint}")]
    IdentityFailure {
        /// The operation that could not be authenticated.
        endpoint: EndpointDescriptor,
    },

    /// The token cache has been disposed.
    #[error("The token cache has been disposed")]
    Disposed,
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use watchlist_core::Verb;

    use super::*;

    #[test]
    fn generation_failed_display() {
        let e = AuthError::GenerationFailed("connection refused".into());
        assert_eq!(e.to_string(), "Token generation failed: connection refused");
    }

    #[test]
    fn identity_failure_names_the_endpoint() {
        let e = AuthError::IdentityFailure {
            endpoint: EndpointDescriptor::new("read-watchlists", Verb::Get, "/v1/watchlists"),
        };
        assert_eq!(
            e.to_string(),
            "Unable to authenticate request to read-watchlists (GET /v1/watchlists)"
        );
    }

    #[test]
    fn disposed_display() {
        let e = AuthError::Disposed;
        assert_eq!(e.to_string(), "The token cache has been disposed");
    }
}
