//! The watchlist gateway.

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;
use watchlist_auth::{RequestAuthenticator, TokenCache};
use watchlist_core::{
    CLIENT_ID_HEADER, ClientIdentity, DisposalGuard, EndpointDescriptor, ServiceMetadata,
    SymbolQueryResult, Verb, Watchlist, WatchlistEntry, WatchlistPreferences,
};
use watchlist_streaming::{SubscriptionChannel, SubscriptionStatus};

use crate::{Environment, GatewayError, GatewayResult, Impersonation, ServiceAddress, endpoints};

/// Server error code signalling that the user's entitlements changed.
const ENTITLEMENT_FAILURE_CODE: &str = "ENTITLEMENTS_FAILED";

#[derive(Clone)]
struct StartFailure(String);

type StartFuture = Shared<BoxFuture<'static, Result<(), StartFailure>>>;

type AuthorizationObserver = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct StartState {
    started: bool,
    inflight: Option<StartFuture>,
}

/// Client gateway for the remote watchlist service.
///
/// A gateway must be started before use and is permanently unusable after
/// disposal; every operation checks disposal first, then startup. Clones
/// share one lifecycle, one credential cache, and one subscription channel.
#[derive(Clone)]
pub struct WatchlistGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    address: ServiceAddress,
    authenticator: RequestAuthenticator,
    client_id: ClientIdentity,
    channel: SubscriptionChannel,
    start: Mutex<StartState>,
    observers: Mutex<Vec<AuthorizationObserver>>,
    disposal: DisposalGuard,
}

impl WatchlistGateway {
    /// Create an unstarted gateway against an explicit address.
    ///
    /// `websocket` is the push endpoint without the token query parameter.
    #[must_use]
    pub fn with_address(address: ServiceAddress, websocket: Url, tokens: TokenCache) -> Self {
        let client_id = ClientIdentity::generate();
        let channel = SubscriptionChannel::new(websocket, tokens.clone(), client_id.clone());

        Self {
            inner: Arc::new(GatewayInner {
                http: reqwest::Client::new(),
                address,
                authenticator: RequestAuthenticator::new(tokens),
                client_id,
                channel,
                start: Mutex::new(StartState::default()),
                observers: Mutex::new(Vec::new()),
                disposal: DisposalGuard::new(),
            }),
        }
    }

    /// Create and start a gateway for a named environment.
    ///
    /// # Errors
    /// Fails when the initial credential cannot be obtained.
    pub async fn for_environment(
        environment: Environment,
        tokens: TokenCache,
    ) -> GatewayResult<Self> {
        let gateway = Self::with_address(
            environment.rest_address(),
            environment.websocket_endpoint(),
            tokens,
        );

        gateway.start().await?;

        Ok(gateway)
    }

    /// Create and start a gateway for the test environment, impersonating
    /// the given user.
    ///
    /// # Errors
    /// Fails when the identity is invalid or the impersonation token cannot
    /// be obtained.
    pub async fn for_test(identity: Impersonation) -> GatewayResult<Self> {
        let tokens = crate::impersonation_token_cache(Environment::Test, &identity)?;

        Self::for_environment(Environment::Test, tokens).await
    }

    /// Create and start a gateway for the development environment,
    /// impersonating the given user.
    ///
    /// # Errors
    /// Fails when the identity is invalid or the impersonation token cannot
    /// be obtained.
    pub async fn for_development(identity: Impersonation) -> GatewayResult<Self> {
        let tokens = crate::impersonation_token_cache(Environment::Development, &identity)?;

        Self::for_environment(Environment::Development, tokens).await
    }

    /// Start the gateway.
    ///
    /// The first call performs one-time setup (obtaining an initial
    /// credential); concurrent and later calls share that work, so setup
    /// never runs twice for a started gateway. A failed setup is cleared,
    /// letting a later call retry from scratch.
    ///
    /// # Errors
    /// Returns [`GatewayError::Disposed`] after disposal or
    /// [`GatewayError::StartFailed`] when setup fails.
    pub async fn start(&self) -> GatewayResult<()> {
        if self.inner.disposal.is_disposed() {
            return Err(GatewayError::Disposed);
        }

        let setup = {
            let mut state = self.inner.start.lock();

            if state.started {
                return Ok(());
            }

            if let Some(inflight) = &state.inflight {
                inflight.clone()
            } else {
                debug!("starting gateway");

                let inner = Arc::clone(&self.inner);

                let setup: StartFuture = async move {
                    inner
                        .authenticator
                        .token_cache()
                        .get_token()
                        .await
                        .map_err(|e| StartFailure(e.to_string()))?;

                    Ok(())
                }
                .boxed()
                .shared();

                state.inflight = Some(setup.clone());

                setup
            }
        };

        let outcome = setup.clone().await;

        let mut state = self.inner.start.lock();

        // Only the future we awaited is cleared; a retry started by another
        // caller stays in place.
        if state.inflight.as_ref().is_some_and(|f| f.ptr_eq(&setup)) {
            state.inflight = None;
        }

        match outcome {
            Ok(()) => {
                if !state.started {
                    state.started = true;
                    info!(address = %self.inner.address, "gateway started");
                }

                Ok(())
            }
            Err(failure) => Err(GatewayError::StartFailed(failure.0)),
        }
    }

    /// Retrieve the service metadata, including the authenticated user.
    ///
    /// # Errors
    /// Fails on lifecycle, identity, or service errors.
    pub async fn read_service_metadata(&self) -> GatewayResult<ServiceMetadata> {
        let response = self
            .send(&endpoints::read_service_metadata(), None::<&Value>, false)
            .await?;

        Ok(response.json().await?)
    }

    /// Retrieve all of the user's watchlists.
    ///
    /// # Errors
    /// Fails on lifecycle, identity, or service errors.
    pub async fn read_watchlists(&self) -> GatewayResult<Vec<Watchlist>> {
        let response = self
            .send(&endpoints::read_watchlists(), None::<&Value>, false)
            .await?;

        Ok(response.json().await?)
    }

    /// Create a watchlist, returning the saved copy (with its assigned
    /// identifier).
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn create_watchlist(&self, watchlist: &Watchlist) -> GatewayResult<Watchlist> {
        required(&watchlist.name, "watchlist.name")?;

        let response = self
            .send(&endpoints::create_watchlist(), Some(watchlist), true)
            .await?;

        Ok(response.json().await?)
    }

    /// Replace a watchlist, returning the saved copy.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn edit_watchlist(&self, watchlist: &Watchlist) -> GatewayResult<Watchlist> {
        let id = watchlist.id.clone().unwrap_or_default();
        required(&id, "watchlist.id")?;
        required(&watchlist.name, "watchlist.name")?;

        let response = self
            .send(&endpoints::edit_watchlist(&id), Some(watchlist), true)
            .await?;

        Ok(response.json().await?)
    }

    /// Delete a watchlist.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn delete_watchlist(&self, id: &str) -> GatewayResult<()> {
        required(id, "id")?;

        self.send(&endpoints::delete_watchlist(id), None::<&Value>, true)
            .await?;

        Ok(())
    }

    /// Add a symbol to a watchlist, returning the updated watchlist.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn add_symbol(&self, id: &str, entry: &WatchlistEntry) -> GatewayResult<Watchlist> {
        required(id, "id")?;
        required(&entry.symbol, "entry.symbol")?;

        let body = json!({ "entry": entry });

        let response = self
            .send(&endpoints::add_symbol(id), Some(&body), true)
            .await?;

        Ok(response.json().await?)
    }

    /// Remove a symbol from a watchlist, returning the updated watchlist.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn delete_symbol(&self, id: &str, symbol: &str) -> GatewayResult<Watchlist> {
        required(id, "id")?;
        required(symbol, "symbol")?;

        let response = self
            .send(&endpoints::delete_symbol(id, symbol), None::<&Value>, true)
            .await?;

        Ok(response.json().await?)
    }

    /// Find the watchlists containing a symbol.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn query_symbol(&self, symbol: &str) -> GatewayResult<SymbolQueryResult> {
        required(symbol, "symbol")?;

        let response = self
            .send(&endpoints::query_symbol(symbol), None::<&Value>, false)
            .await?;

        Ok(response.json().await?)
    }

    /// Replace a watchlist's display preferences, returning the saved copy.
    ///
    /// # Errors
    /// Fails on validation, lifecycle, identity, or service errors.
    pub async fn edit_preferences(
        &self,
        id: &str,
        preferences: &WatchlistPreferences,
    ) -> GatewayResult<WatchlistPreferences> {
        required(id, "id")?;

        let response = self
            .send(&endpoints::edit_preferences(id), Some(preferences), false)
            .await?;

        Ok(response.json().await?)
    }

    /// Subscribe to push notifications about the user's watchlists.
    ///
    /// One subscription per gateway; see
    /// [`SubscriptionChannel::subscribe`](watchlist_streaming::SubscriptionChannel::subscribe)
    /// for the callback contract. When `echo` is `false`, notifications
    /// caused by this gateway's own mutations are withheld.
    ///
    /// # Errors
    /// Fails on lifecycle errors or when a subscription already exists.
    pub fn subscribe(
        &self,
        messages: impl Fn(Value) + Send + Sync + 'static,
        status: impl Fn(SubscriptionStatus) + Send + Sync + 'static,
        echo: bool,
    ) -> GatewayResult<()> {
        self.guard()?;

        self.inner.channel.subscribe(messages, status, echo)?;

        Ok(())
    }

    /// Register an observer invoked when the server reports that the user's
    /// entitlements changed. The triggering call still fails with
    /// [`GatewayError::Service`].
    pub fn on_authorization_change(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.inner.observers.lock().push(Arc::new(observer));
    }

    /// Get the identity attached to this gateway's mutations.
    #[must_use]
    pub fn client_id(&self) -> &ClientIdentity {
        &self.inner.client_id
    }

    /// Get the current subscription status.
    #[must_use]
    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.inner.channel.status()
    }

    /// Dispose the gateway, closing the subscription channel and the
    /// credential cache. Every later operation fails with
    /// [`GatewayError::Disposed`].
    pub fn dispose(&self) {
        if self.inner.disposal.dispose() {
            self.inner.channel.dispose();
            self.inner.authenticator.token_cache().dispose();
            self.inner.observers.lock().clear();

            info!("gateway disposed");
        }
    }

    /// Check whether the gateway has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposal.is_disposed()
    }

    // Disposal is checked before startup on every operation.
    fn guard(&self) -> GatewayResult<()> {
        if self.inner.disposal.is_disposed() {
            return Err(GatewayError::Disposed);
        }

        if !self.inner.start.lock().started {
            return Err(GatewayError::NotStarted);
        }

        Ok(())
    }

    async fn send<B>(
        &self,
        endpoint: &EndpointDescriptor,
        body: Option<&B>,
        tag_client: bool,
    ) -> GatewayResult<reqwest::Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.guard()?;

        let url = self.inner.address.url_for(&endpoint.path);

        let mut builder = match endpoint.verb {
            Verb::Get => self.inner.http.get(&url),
            Verb::Post => self.inner.http.post(&url),
            Verb::Put => self.inner.http.put(&url),
            Verb::Delete => self.inner.http.delete(&url),
        };

        if tag_client {
            builder = builder.header(CLIENT_ID_HEADER, self.inner.client_id.as_str());
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        let builder = self.inner.authenticator.decorate(builder, endpoint).await?;

        debug!(endpoint = %endpoint, "invoking endpoint");

        let response = builder.send().await?;

        self.intercept(endpoint, response).await
    }

    // Non-success responses become service errors; an entitlement failure
    // additionally notifies the authorization observers.
    async fn intercept(
        &self,
        endpoint: &EndpointDescriptor,
        response: reqwest::Response,
    ) -> GatewayResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        warn!(endpoint = %endpoint, status = status.as_u16(), "endpoint rejected the request");

        if status == reqwest::StatusCode::FORBIDDEN && entitlement_failed(&body) {
            let observers: Vec<AuthorizationObserver> =
                self.inner.observers.lock().iter().cloned().collect();

            for observer in observers {
                observer();
            }
        }

        let message = if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body
        };

        Err(GatewayError::Service {
            status: status.as_u16(),
            message,
        })
    }
}

impl fmt::Debug for WatchlistGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchlistGateway")
            .field("address", &self.inner.address)
            .field("client_id", &self.inner.client_id)
            .field("started", &self.inner.start.lock().started)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn required(value: &str, label: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::Validation(format!(
            "the \"{label}\" argument is required"
        )));
    }

    Ok(())
}

fn entitlement_failed(body: &str) -> bool {
    serde_json::from_str::<Value>(body).is_ok_and(|value| contains_failure_code(&value))
}

fn contains_failure_code(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.get("code").and_then(Value::as_str) == Some(ENTITLEMENT_FAILURE_CODE)
                || map.values().any(contains_failure_code)
        }
        Value::Array(items) => items.iter().any(contains_failure_code),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_arguments() {
        assert!(required("abc", "id").is_ok());
        assert!(matches!(
            required("", "id"),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            required("   ", "id"),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn entitlement_code_is_found_in_nested_bodies() {
        assert!(entitlement_failed(r#"{"code":"ENTITLEMENTS_FAILED"}"#));
        assert!(entitlement_failed(
            r#"[{"value":{"code":"ENTITLEMENTS_FAILED"}}]"#
        ));
        assert!(!entitlement_failed(r#"{"code":"NOT_FOUND"}"#));
        assert!(!entitlement_failed("entitlements failed"));
    }
}
