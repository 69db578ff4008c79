//! WebSocket transport implementation
//!
//! Engine.IO frames travel as WebSocket text frames. Uses rustls for `wss://`.

use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use leaderboard_core::{BridgeError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket read wrapper
pub struct WsReadWrapper(pub SplitStream<WsStream>);

/// WebSocket write wrapper
pub struct WsWriteWrapper(pub SplitSink<WsStream, Message>);

/// Build the Engine.IO WebSocket URL for an endpoint such as `https://host/`
pub fn socket_url(endpoint: &str, path: &str) -> Result<String> {
    let (scheme, rest) = if let Some(rest) = endpoint.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = endpoint.strip_prefix("wss://") {
        ("wss", rest)
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        ("ws", rest)
    } else {
        return Err(BridgeError::ConfigError(format!(
            "Unsupported endpoint scheme: {}",
            endpoint
        )));
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return Err(BridgeError::ConfigError(format!(
            "Endpoint has no host: {}",
            endpoint
        )));
    }

    let path = path.trim_matches('/');
    Ok(format!(
        "{}://{}/{}/?EIO=4&transport=websocket",
        scheme, authority, path
    ))
}

/// Select ring as the process-wide rustls provider, unless one is set already
fn install_crypto_provider() {
    // Err means another provider was installed first; that one is used
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Open a WebSocket connection and split it into read/write halves
pub async fn connect(url: &str, timeout: Duration) -> Result<(WsReadWrapper, WsWriteWrapper)> {
    info!("Connecting to {}", url);
    install_crypto_provider();

    let (stream, response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
        .await
        .map_err(|_| BridgeError::ConnectionError(format!("Connection timeout to {}", url)))?
        .map_err(|e| BridgeError::ConnectionError(format!("Failed to connect to {}: {}", url, e)))?;

    debug!("WebSocket upgrade status {}", response.status());

    let (write_half, read_half) = stream.split();
    Ok((WsReadWrapper(read_half), WsWriteWrapper(write_half)))
}

fn map_ws_error(e: tungstenite::Error) -> BridgeError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            BridgeError::ConnectionClosed
        }
        other => BridgeError::ConnectionError(other.to_string()),
    }
}

#[async_trait]
impl FrameReader for WsReadWrapper {
    async fn read_frame(&mut self) -> Result<String> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket close frame: {:?}", frame);
                    return Err(BridgeError::ConnectionClosed);
                }
                // Control frames are answered by tungstenite itself
                Some(Ok(other)) => debug!("Skipping non-text frame: {:?}", other),
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => return Err(BridgeError::ConnectionClosed),
            }
        }
    }
}

#[async_trait]
impl FrameWriter for WsWriteWrapper {
    async fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.0
            .send(Message::Text(frame.to_string()))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close().await.map_err(map_ws_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_https() {
        assert_eq!(
            socket_url("https://clearlang.org/", "/socket.io/").unwrap(),
            "wss://clearlang.org/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_http_with_port() {
        assert_eq!(
            socket_url("http://127.0.0.1:3000", "socket.io").unwrap(),
            "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_rejects_bad_endpoint() {
        assert!(matches!(
            socket_url("ftp://example.com/", "/socket.io/"),
            Err(BridgeError::ConfigError(_))
        ));
        assert!(socket_url("https:///", "/socket.io/").is_err());
        assert!(socket_url("https://?x=1", "/socket.io/").is_err());
    }

    #[test]
    fn test_socket_url_strips_query_and_fragment() {
        assert_eq!(
            socket_url("https://clearlang.org?room=1", "/socket.io/").unwrap(),
            "wss://clearlang.org/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("http://127.0.0.1:3000#lobby", "/socket.io/").unwrap(),
            "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket"
        );
    }
}
