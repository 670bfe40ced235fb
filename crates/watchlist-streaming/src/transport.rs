//! Socket transport abstraction.
//!
//! The channel never touches `tokio-tungstenite` directly; it talks to a
//! [`SocketConnector`] supplied at construction, which lets tests drive the
//! state machine with scripted sockets.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::{StreamError, StreamResult};

/// One open socket.
///
/// The watchlist push service speaks text frames only, so the interface is a
/// text-in/text-out pair plus close.
#[async_trait]
pub trait Socket: Send {
    /// Send a text frame.
    async fn send(&mut self, text: String) -> StreamResult<()>;

    /// Receive the next text frame. `None` means the socket closed.
    async fn next_message(&mut self) -> Option<StreamResult<String>>;

    /// Close the socket.
    async fn close(&mut self) -> StreamResult<()>;
}

/// Opens sockets for the channel.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Open a socket to the given URL.
    async fn connect(&self, url: &Url) -> StreamResult<Box<dyn Socket>>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> StreamResult<Box<dyn Socket>> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(TungsteniteSocket { inner: stream }))
    }
}

struct TungsteniteSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn send(&mut self, text: String) -> StreamResult<()> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| StreamError::WebSocketError(e.to_string()))
    }

    async fn next_message(&mut self) -> Option<StreamResult<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    // Non-UTF-8 frames are not part of the protocol.
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => return None,
                // Protocol-level ping/pong is handled by tungstenite.
                Ok(_) => continue,
                Err(e) => return Some(Err(StreamError::WebSocketError(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> StreamResult<()> {
        self.inner
            .close(None)
            .await
            .map_err(|e| StreamError::WebSocketError(e.to_string()))
    }
}
