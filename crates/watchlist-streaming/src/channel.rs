//! The subscription channel state machine.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use watchlist_auth::{BackoffPolicy, TokenCache};
use watchlist_core::{ClientIdentity, DisposalGuard};

use crate::{Socket, SocketConnector, StreamError, StreamResult, TungsteniteConnector};

/// Delay between a socket drop and the next connection attempt (5s, fixed).
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Reserved keep-alive action sent by the server.
const ACTION_PING: &str = "PING";

/// Subscription connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// No subscription has been requested yet.
    Idle,
    /// Subscribed, but no socket is open.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The socket is open and frames are flowing.
    Connected,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };

        f.write_str(label)
    }
}

/// Receives push notification frames.
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Receives status transitions.
pub type StatusCallback = Arc<dyn Fn(SubscriptionStatus) + Send + Sync>;

/// A WebSocket subscription to the watchlist push service.
///
/// One channel carries at most one subscription for its whole life. Once
/// subscribed, the channel cycles `disconnected -> connecting -> connected`
/// indefinitely, reconnecting with a fresh credential after a fixed delay
/// whenever the socket drops, until the channel is disposed.
pub struct SubscriptionChannel {
    shared: Arc<ChannelShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct ChannelShared {
    endpoint: Url,
    tokens: TokenCache,
    client_id: ClientIdentity,
    connector: Arc<dyn SocketConnector>,
    // Fixed schedule: every reconnect waits the base delay, unlike the
    // growing token-refresh backoff.
    reconnect: BackoffPolicy,
    status: Mutex<SubscriptionStatus>,
    disposal: DisposalGuard,
}

impl SubscriptionChannel {
    /// Create a channel over the production WebSocket transport.
    ///
    /// `endpoint` is the socket URL without the token query parameter (e.g.
    /// `wss://host/v1/`); a fresh credential is appended on every connection
    /// attempt.
    #[must_use]
    pub fn new(endpoint: Url, tokens: TokenCache, client_id: ClientIdentity) -> Self {
        Self::with_connector(endpoint, tokens, client_id, Arc::new(TungsteniteConnector))
    }

    /// Create a channel over a caller-supplied transport.
    #[must_use]
    pub fn with_connector(
        endpoint: Url,
        tokens: TokenCache,
        client_id: ClientIdentity,
        connector: Arc<dyn SocketConnector>,
    ) -> Self {
        Self {
            shared: Arc::new(ChannelShared {
                endpoint,
                tokens,
                client_id,
                connector,
                reconnect: BackoffPolicy::new(RECONNECT_DELAY, None),
                status: Mutex::new(SubscriptionStatus::Idle),
                disposal: DisposalGuard::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> SubscriptionStatus {
        *self.shared.status.lock()
    }

    /// Get the identity attached to this channel's gateway.
    #[must_use]
    pub fn client_id(&self) -> &ClientIdentity {
        &self.shared.client_id
    }

    /// Begin the subscription.
    ///
    /// `messages` receives every data frame; `status` receives every status
    /// transition. When `echo` is `false`, frames carrying this channel's own
    /// client identity are withheld from `messages`; foreign frames are
    /// always delivered. A panic inside either callback is caught and logged,
    /// never allowed to break the reconnect loop.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`StreamError::Disposed`] after disposal, or
    /// [`StreamError::AlreadySubscribed`] when a subscription already exists;
    /// neither has side effects.
    pub fn subscribe(
        &self,
        messages: impl Fn(Value) + Send + Sync + 'static,
        status: impl Fn(SubscriptionStatus) + Send + Sync + 'static,
        echo: bool,
    ) -> StreamResult<()> {
        if self.shared.disposal.is_disposed() {
            return Err(StreamError::Disposed);
        }

        {
            let mut current = self.shared.status.lock();

            if *current != SubscriptionStatus::Idle {
                return Err(StreamError::AlreadySubscribed);
            }

            *current = SubscriptionStatus::Disconnected;
        }

        let messages: MessageCallback = Arc::new(messages);
        let status: StatusCallback = Arc::new(status);

        guard_callback("status", || status(SubscriptionStatus::Disconnected));

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            messages,
            Arc::clone(&status),
            echo,
        ));

        *self.task.lock() = Some(task);

        Ok(())
    }

    /// Dispose the channel, cancelling any pending reconnect.
    pub fn dispose(&self) {
        if self.shared.disposal.dispose() {
            if let Some(task) = self.task.lock().take() {
                task.abort();
            }

            info!("subscription channel disposed");
        }
    }

    /// Check whether the channel has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposal.is_disposed()
    }
}

impl fmt::Debug for SubscriptionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionChannel")
            .field("endpoint", &self.shared.endpoint.as_str())
            .field("status", &self.status())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    shared: Arc<ChannelShared>,
    messages: MessageCallback,
    status: StatusCallback,
    echo: bool,
) {
    loop {
        if shared.disposal.is_disposed() {
            break;
        }

        transition(&shared, &status, SubscriptionStatus::Connecting);

        match open_socket(&shared).await {
            Ok(mut socket) => {
                transition(&shared, &status, SubscriptionStatus::Connected);
                read_frames(&shared, socket.as_mut(), &messages, echo).await;
            }
            Err(e) => {
                warn!(error = %e, "subscription connect failed");
            }
        }

        if shared.disposal.is_disposed() {
            break;
        }

        transition(&shared, &status, SubscriptionStatus::Disconnected);

        let delay = shared.reconnect.delay_for_attempt(0);

        debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        tokio::time::sleep(delay).await;
    }
}

async fn open_socket(shared: &ChannelShared) -> StreamResult<Box<dyn Socket>> {
    let credential = shared
        .tokens
        .get_token()
        .await
        .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

    let mut url = shared.endpoint.clone();
    url.query_pairs_mut().append_pair("token", &credential);

    shared.connector.connect(&url).await
}

async fn read_frames(
    shared: &ChannelShared,
    socket: &mut dyn Socket,
    messages: &MessageCallback,
    echo: bool,
) {
    while let Some(next) = socket.next_message().await {
        let text = match next {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "socket failed");
                break;
            }
        };

        let frame: Value = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "discarding malformed frame");
                continue;
            }
        };

        if frame.get("action").and_then(Value::as_str) == Some(ACTION_PING) {
            let pong = json!({ "action": "PONG", "response": "" });

            if let Err(e) = socket.send(pong.to_string()).await {
                warn!(error = %e, "failed to answer keep-alive");
                break;
            }

            continue;
        }

        let own = frame
            .get("clientId")
            .and_then(Value::as_str)
            .is_some_and(|id| id == shared.client_id.as_str());

        if own && !echo {
            debug!("suppressing self-originated notification");
            continue;
        }

        guard_callback("message", || messages(frame));
    }
}

fn transition(shared: &ChannelShared, status: &StatusCallback, next: SubscriptionStatus) {
    {
        let mut current = shared.status.lock();

        if *current == next {
            return;
        }

        *current = next;
    }

    debug!(status = %next, "subscription status changed");
    guard_callback("status", || status(next));
}

// Callback failures are the subscriber's bug; the reconnect loop survives
// them by contract.
fn guard_callback(kind: &str, f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(kind, "subscription callback panicked");
    }
}
