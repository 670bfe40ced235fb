//! Impersonation tokens for the non-secure environments.

use std::time::Duration;

use serde_json::{Value, json};
use watchlist_auth::{AuthError, TokenCache};

use crate::{Environment, GatewayError, GatewayResult, IMPERSONATION_HOST, endpoints};

/// How long an impersonation token is reused before a refresh (five
/// minutes, plus the cache's jitter).
pub const IMPERSONATION_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// The user to impersonate when requesting tokens from the public issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impersonation {
    user_id: String,
    context_id: String,
    permissions: Option<String>,
}

impl Impersonation {
    /// Describe the user to impersonate.
    ///
    /// # Errors
    /// Returns [`GatewayError::Validation`] when either identifier is blank.
    pub fn new(user_id: impl Into<String>, context_id: impl Into<String>) -> GatewayResult<Self> {
        let user_id = user_id.into();
        let context_id = context_id.into();

        if user_id.trim().is_empty() {
            return Err(GatewayError::Validation(
                "the \"user_id\" argument is required".to_string(),
            ));
        }

        if context_id.trim().is_empty() {
            return Err(GatewayError::Validation(
                "the \"context_id\" argument is required".to_string(),
            ));
        }

        Ok(Self {
            user_id,
            context_id,
            permissions: None,
        })
    }

    /// Request a specific permission level.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "userId": self.user_id,
            "contextId": self.context_id,
        });

        if let (Some(permissions), Some(map)) = (&self.permissions, body.as_object_mut()) {
            map.insert("permissions".to_string(), json!(permissions));
        }

        body
    }
}

/// Build a token cache that impersonates a user against the public issuer.
///
/// Impersonation is a convenience for the non-secure environments; anything
/// else must supply real credentials through its own [`TokenCache`].
///
/// # Errors
/// Returns [`GatewayError::Validation`] for environments other than
/// development and test.
pub fn impersonation_token_cache(
    environment: Environment,
    identity: &Impersonation,
) -> GatewayResult<TokenCache> {
    if !matches!(environment, Environment::Development | Environment::Test) {
        return Err(GatewayError::Validation(format!(
            "impersonation is not available in the \"{environment}\" environment"
        )));
    }

    let endpoint = endpoints::impersonate(environment.code());
    let url = format!("https://{IMPERSONATION_HOST}{}", endpoint.path);

    Ok(token_cache_for_issuer(&url, identity))
}

/// Build a token cache against an arbitrary issuer URL.
///
/// The issuer answers a POST with the token, either as raw text or as a
/// JSON-encoded string.
#[must_use]
pub fn token_cache_for_issuer(url: &str, identity: &Impersonation) -> TokenCache {
    let client = reqwest::Client::new();
    let url = url.to_string();
    let body = identity.body();

    TokenCache::new(
        move || {
            let client = client.clone();
            let url = url.clone();
            let body = body.clone();

            async move {
                let response = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AuthError::GenerationFailed(e.to_string()))?;

                let status = response.status();

                if !status.is_success() {
                    return Err(AuthError::GenerationFailed(format!(
                        "token issuer answered with status {status}"
                    )));
                }

                let text = response
                    .text()
                    .await
                    .map_err(|e| AuthError::GenerationFailed(e.to_string()))?;

                let token = serde_json::from_str::<String>(&text).unwrap_or(text);

                if token.is_empty() {
                    return Err(AuthError::GenerationFailed(
                        "token issuer returned an empty body".to_string(),
                    ));
                }

                Ok(token)
            }
        },
        IMPERSONATION_REFRESH_INTERVAL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_requires_both_identifiers() {
        assert!(Impersonation::new("user-1", "barchart").is_ok());
        assert!(Impersonation::new("", "barchart").is_err());
        assert!(Impersonation::new("user-1", "  ").is_err());
    }

    #[test]
    fn body_includes_permissions_only_when_requested() {
        let plain = Impersonation::new("user-1", "barchart").unwrap();
        assert_eq!(
            plain.body(),
            json!({ "userId": "user-1", "contextId": "barchart" })
        );

        let elevated = plain.clone().with_permissions("registered");
        assert_eq!(
            elevated.body(),
            json!({
                "userId": "user-1",
                "contextId": "barchart",
                "permissions": "registered"
            })
        );
    }

    #[test]
    fn impersonation_is_limited_to_non_secure_environments() {
        let identity = Impersonation::new("user-1", "barchart").unwrap();

        assert!(impersonation_token_cache(Environment::Test, &identity).is_ok());
        assert!(impersonation_token_cache(Environment::Development, &identity).is_ok());

        let rejected = impersonation_token_cache(Environment::Production, &identity);
        assert!(matches!(rejected, Err(GatewayError::Validation(_))));
    }
}
