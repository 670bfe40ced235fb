//! Credential caching with single-flight refresh.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;
use watchlist_core::DisposalGuard;

use crate::{AuthError, AuthResult, BackoffPolicy, retry_backoff};

/// An opaque bearer credential.
///
/// The client never parses or inspects it; expiry is understood only by the
/// remote issuer.
pub type Credential = String;

/// Base delay between refresh attempts (750ms, doubling).
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_millis(750);

/// Total refresh tries before the failure surfaces to waiters.
pub const REFRESH_RETRY_ATTEMPTS: u32 = 3;

const REFRESH_LABEL: &str = "read watchlist token";

/// Produces fresh credentials, possibly over the network.
///
/// Implemented for any `Fn() -> Future<Output = AuthResult<Credential>>`
/// closure, so callers can pass an async closure directly.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    /// Produce a fresh credential.
    async fn generate(&self) -> AuthResult<Credential>;
}

#[async_trait]
impl<F, Fut> TokenGenerator for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = AuthResult<Credential>> + Send,
{
    async fn generate(&self) -> AuthResult<Credential> {
        self().await
    }
}

type RefreshFuture = Shared<BoxFuture<'static, AuthResult<Credential>>>;

/// Caches one credential, refreshing it through a delegate.
///
/// A refresh begins when no credential is cached or the cache age exceeds the
/// refresh interval plus a per-instance jitter. Concurrent callers during an
/// in-flight refresh share its outcome; the delegate is never invoked twice
/// for one refresh. A refresh interval of zero disables time-based expiry, so
/// the credential is reused until a failed refresh forces a refetch.
///
/// Clones share the same cache.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    generator: Arc<dyn TokenGenerator>,
    refresh_interval: Duration,
    jitter: Duration,
    policy: BackoffPolicy,
    state: Mutex<CacheState>,
    disposal: DisposalGuard,
}

#[derive(Default)]
struct CacheState {
    inflight: Option<RefreshFuture>,
    refreshed_at: Option<Instant>,
    refreshing: bool,
}

impl TokenCache {
    /// Create a cache around a token delegate.
    ///
    /// The jitter is chosen once, uniformly in `[0, refresh_interval / 10]`,
    /// so many clients created together do not refresh in lockstep.
    #[must_use]
    pub fn new(generator: impl TokenGenerator + 'static, refresh_interval: Duration) -> Self {
        let max_jitter = u64::try_from(refresh_interval.as_millis() / 10).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter));

        Self::with_jitter(generator, refresh_interval, jitter)
    }

    /// Create a cache with an explicit jitter.
    #[must_use]
    pub fn with_jitter(
        generator: impl TokenGenerator + 'static,
        refresh_interval: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                generator: Arc::new(generator),
                refresh_interval,
                jitter,
                policy: BackoffPolicy::new(REFRESH_RETRY_DELAY, Some(REFRESH_RETRY_ATTEMPTS)),
                state: Mutex::new(CacheState::default()),
                disposal: DisposalGuard::new(),
            }),
        }
    }

    /// Read the cached credential, refreshing it first if necessary.
    ///
    /// # Errors
    /// Returns [`AuthError::Disposed`] after disposal, or the delegate's last
    /// error once the bounded refresh attempts are exhausted. A failed
    /// refresh clears the cache, so the next call starts a fresh attempt
    /// rather than reusing the poisoned outcome.
    pub async fn get_token(&self) -> AuthResult<Credential> {
        if self.inner.disposal.is_disposed() {
            return Err(AuthError::Disposed);
        }

        let refresh = {
            let mut state = self.inner.state.lock();

            let stale = state.refreshed_at.is_some_and(|at| {
                !self.inner.refresh_interval.is_zero()
                    && at.elapsed() > self.inner.refresh_interval + self.inner.jitter
            });

            let reuse = match (&state.inflight, state.refreshing) {
                (Some(inflight), true) => Some(inflight.clone()),
                (Some(inflight), false) if !stale => Some(inflight.clone()),
                _ => None,
            };

            if let Some(inflight) = reuse {
                inflight
            } else {
                debug!(stale, "beginning token refresh");

                let refresh = self.refresh_future();

                state.refreshing = true;
                state.inflight = Some(refresh.clone());

                refresh
            }
        };

        refresh.await
    }

    /// Dispose the cache; later calls fail with [`AuthError::Disposed`].
    pub fn dispose(&self) {
        if self.inner.disposal.dispose() {
            let mut state = self.inner.state.lock();
            state.inflight = None;
            state.refreshed_at = None;
        }
    }

    /// Check whether the cache has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposal.is_disposed()
    }

    // The stored future updates the cache itself; the credential and
    // timestamp are assigned only after the refresh resolves.
    fn refresh_future(&self) -> RefreshFuture {
        let inner = Arc::clone(&self.inner);

        async move {
            let result = retry_backoff(&inner.policy, REFRESH_LABEL, || {
                inner.generator.generate()
            })
            .await;

            let mut state = inner.state.lock();
            state.refreshing = false;

            match result {
                Ok(credential) => {
                    state.refreshed_at = Some(Instant::now());
                    Ok(credential)
                }
                Err(e) => {
                    state.inflight = None;
                    state.refreshed_at = None;
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("refresh_interval", &self.inner.refresh_interval)
            .field("jitter", &self.inner.jitter)
            .field("disposed", &self.inner.disposal.is_disposed())
            .finish_non_exhaustive()
    }
}
