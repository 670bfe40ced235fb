//! Request authentication.

use tracing::warn;
use watchlist_core::EndpointDescriptor;

use crate::{AuthError, AuthResult, TokenCache};

/// Injects the cached credential into outbound requests.
///
/// Any token failure is mapped into [`AuthError::IdentityFailure`] carrying
/// the originating endpoint descriptor; the underlying HTTP call is never
/// attempted, so callers can distinguish "could not authenticate" from
/// "the server rejected the request".
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    tokens: TokenCache,
}

impl RequestAuthenticator {
    /// Create an authenticator over a token cache.
    #[must_use]
    pub const fn new(tokens: TokenCache) -> Self {
        Self { tokens }
    }

    /// Get the underlying token cache.
    #[must_use]
    pub const fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    /// Attach an `Authorization: Bearer` header to a request.
    ///
    /// # Errors
    /// Returns [`AuthError::IdentityFailure`] when no credential could be
    /// produced for the request.
    pub async fn decorate(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &EndpointDescriptor,
    ) -> AuthResult<reqwest::RequestBuilder> {
        match self.tokens.get_token().await {
            Ok(credential) => Ok(request.bearer_auth(credential)),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "request could not be authenticated");

                Err(AuthError::IdentityFailure {
                    endpoint: endpoint.clone(),
                })
            }
        }
    }
}
