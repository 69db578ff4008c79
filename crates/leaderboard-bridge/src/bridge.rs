//! Bridge between the game runtime and the leaderboard server

use crate::protocol::{
    DEFAULT_NAMESPACE, EnginePacket, OpenPacket, OutboundEvent, SocketPacket, serialize,
};
use crate::transport::{FrameReader, FrameWriter, Outbound, handshake, reader_task, writer_task};
use crate::ws;
use leaderboard_core::{BridgeError, HostRuntime, PlayerName, PlayerTime, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the leaderboard server connection
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Server endpoint (default: https://clearlang.org/)
    pub endpoint: String,
    /// Socket.IO request path (default: /socket.io/)
    pub path: String,
    /// Socket.IO namespace to join (default: /)
    pub namespace: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://clearlang.org/".into(),
            path: "/socket.io/".into(),
            namespace: DEFAULT_NAMESPACE.into(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Namespaces are `/` or `/<name>`
fn check_namespace(namespace: &str) -> Result<()> {
    if namespace.starts_with('/') {
        Ok(())
    } else {
        Err(BridgeError::ConfigError(format!(
            "Namespace must start with '/': {}",
            namespace
        )))
    }
}

/// Cloneable sending side of a bridge.
///
/// Both entry points are fire-and-forget: they queue a frame and return
/// immediately, and never report whether it reached the server.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    namespace: String,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl BridgeHandle {
    /// Emit `player_name` carrying the player's identity
    pub fn register_name(&self, name: &PlayerName) {
        self.emit(OutboundEvent::PlayerName(name.clone()));
    }

    /// Emit `player_time` carrying `[identity, time]`
    pub fn register_time(&self, name: &PlayerName, time: f64) {
        self.emit(OutboundEvent::PlayerTime(PlayerTime::new(name.clone(), time)));
    }

    fn emit(&self, event: OutboundEvent) {
        let frame = match serialize(&event, &self.namespace) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {}: {}", event.name(), e);
                return;
            }
        };

        if self.outbound_tx.send(Outbound::Frame(frame)).is_err() {
            warn!("Bridge not connected, dropping {}", event.name());
        }
    }

    fn send_raw(&self, item: Outbound) {
        // Ignore send errors (writer gone)
        let _ = self.outbound_tx.send(item);
    }
}

/// Live connection to the leaderboard server
pub struct Bridge {
    /// Sending side shared with clients
    handle: BridgeHandle,
    /// Engine.IO session, when a handshake was performed
    session: Option<OpenPacket>,
    /// Background reader task handle
    reader_handle: Option<JoinHandle<()>>,
    /// Background writer task handle
    writer_handle: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Connect to the configured endpoint over WebSocket and join the namespace
    pub async fn connect(config: &BridgeConfig, runtime: Arc<dyn HostRuntime>) -> Result<Self> {
        check_namespace(&config.namespace)?;
        let url = ws::socket_url(&config.endpoint, &config.path)?;
        let (reader, writer) = ws::connect(&url, config.connect_timeout).await?;
        Self::establish(reader, writer, &config.namespace, runtime).await
    }

    /// Run the handshake over an open transport, then start the tasks
    pub async fn establish<R, W>(
        mut reader: R,
        mut writer: W,
        namespace: &str,
        runtime: Arc<dyn HostRuntime>,
    ) -> Result<Self>
    where
        R: FrameReader + 'static,
        W: FrameWriter + 'static,
    {
        check_namespace(namespace)?;
        let open = handshake(&mut reader, &mut writer, namespace).await?;
        let mut bridge = Self::spawn(reader, writer, namespace, runtime);
        bridge.session = Some(open);
        Ok(bridge)
    }

    /// Start the reader and writer tasks on a transport whose namespace is
    /// already joined
    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        namespace: &str,
        runtime: Arc<dyn HostRuntime>,
    ) -> Self
    where
        R: FrameReader + 'static,
        W: FrameWriter + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let writer_handle = tokio::spawn(writer_task(Box::new(writer), outbound_rx));
        let reader_handle = tokio::spawn(reader_task(
            reader,
            namespace.to_string(),
            outbound_tx.clone(),
            runtime,
        ));

        Self {
            handle: BridgeHandle {
                namespace: namespace.to_string(),
                outbound_tx,
            },
            session: None,
            reader_handle: Some(reader_handle),
            writer_handle: Some(writer_handle),
        }
    }

    /// Cloneable sending side, for clients and host hooks
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Engine.IO session data from the handshake
    pub fn session(&self) -> Option<&OpenPacket> {
        self.session.as_ref()
    }

    /// See [`BridgeHandle::register_name`]
    pub fn register_name(&self, name: &PlayerName) {
        self.handle.register_name(name);
    }

    /// See [`BridgeHandle::register_time`]
    pub fn register_time(&self, name: &PlayerName, time: f64) {
        self.handle.register_time(name, time);
    }

    /// Leave the namespace, flush queued frames and stop both tasks
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down bridge");

        let disconnect = EnginePacket::Message(
            SocketPacket::disconnect(&self.handle.namespace).encode()?,
        )
        .encode()?;
        self.handle.send_raw(Outbound::Frame(disconnect));
        self.handle.send_raw(Outbound::Close);

        if let Some(reader) = self.reader_handle.take() {
            reader.abort();
        }

        if let Some(writer) = self.writer_handle.take() {
            if let Err(e) = writer.await {
                debug!("Writer task ended abnormally: {}", e);
            }
        }
        Ok(())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(reader) = self.reader_handle.take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{self, MemoryPeer};
    use async_trait::async_trait;
    use leaderboard_core::Leaderboard;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OPEN: &str = r#"0{"sid":"abc123","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    fn recording_runtime() -> (Arc<dyn HostRuntime>, mpsc::UnboundedReceiver<(PlayerName, f64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime: Arc<dyn HostRuntime> = Arc::new(move |player: PlayerName, time: f64| {
            let _ = tx.send((player, time));
        });
        (runtime, rx)
    }

    fn spawn_bridge() -> (Bridge, MemoryPeer) {
        let (reader, writer, peer) = memory::channel();
        let bridge = Bridge::spawn(reader, writer, DEFAULT_NAMESPACE, Arc::new(Leaderboard::new()));
        (bridge, peer)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_register_name_emits_one_frame() {
        let (bridge, mut peer) = spawn_bridge();

        bridge.register_name(&"Alice".into());

        assert_eq!(
            peer.recv().await.as_deref(),
            Some(r#"42["player_name","Alice"]"#)
        );
        settle().await;
        assert!(peer.drain().is_empty());
    }

    #[tokio::test]
    async fn test_register_time_emits_pair() {
        let (bridge, mut peer) = spawn_bridge();

        bridge.register_time(&"Alice".into(), 42.0);

        assert_eq!(
            peer.recv().await.as_deref(),
            Some(r#"42["player_time",["Alice",42]]"#)
        );
        settle().await;
        assert!(peer.drain().is_empty());
    }

    #[tokio::test]
    async fn test_handle_emits_in_order() {
        let (bridge, mut peer) = spawn_bridge();
        let handle = bridge.handle();

        handle.register_name(&"Alice".into());
        handle.register_time(&"Alice".into(), 12.5);

        assert_eq!(
            peer.recv().await.as_deref(),
            Some(r#"42["player_name","Alice"]"#)
        );
        assert_eq!(
            peer.recv().await.as_deref(),
            Some(r#"42["player_time",["Alice",12.5]]"#)
        );
    }

    #[tokio::test]
    async fn test_no_spontaneous_emission() {
        let (_bridge, mut peer) = spawn_bridge();
        settle().await;
        assert!(peer.drain().is_empty());
    }

    #[tokio::test]
    async fn test_update_player_calls_runtime_once() {
        let (reader, writer, mut peer) = memory::channel();
        let (runtime, mut calls) = recording_runtime();
        let _bridge = Bridge::spawn(reader, writer, DEFAULT_NAMESPACE, runtime);

        peer.send(r#"42["update_player",["Bob",7]]"#).unwrap();

        let (player, time) = calls.recv().await.unwrap();
        assert_eq!(player.as_str(), "Bob");
        assert_eq!(time, 7.0);

        settle().await;
        assert!(calls.try_recv().is_err());
        // No acknowledgment goes back
        assert!(peer.drain().is_empty());
    }

    #[tokio::test]
    async fn test_update_player_feeds_leaderboard() {
        let (reader, writer, peer) = memory::channel();
        let board = Leaderboard::new();
        let _bridge = Bridge::spawn(reader, writer, DEFAULT_NAMESPACE, Arc::new(board.clone()));

        peer.send(r#"42["update_player",["Bob",7]]"#).unwrap();
        peer.send(r#"42["update_player",["Carol",9.25]]"#).unwrap();
        peer.send(r#"42["update_player",["Bob",-1]]"#).unwrap();
        settle().await;

        assert!(!board.contains("Bob"));
        assert_eq!(board.get("Carol"), Some(9.25));
    }

    #[tokio::test]
    async fn test_malformed_update_is_dropped() {
        let (reader, writer, peer) = memory::channel();
        let (runtime, mut calls) = recording_runtime();
        let _bridge = Bridge::spawn(reader, writer, DEFAULT_NAMESPACE, runtime);

        peer.send(r#"42["update_player",["Bob"]]"#).unwrap();
        peer.send(r#"42["update_player",["Bob","fast"]]"#).unwrap();
        peer.send("4garbage").unwrap();
        peer.send(r#"42["update_player",["Dan",3]]"#).unwrap();

        // Reader survives bad frames and still delivers the good one
        let (player, _) = calls.recv().await.unwrap();
        assert_eq!(player.as_str(), "Dan");
    }

    #[tokio::test]
    async fn test_ping_answered_with_pong() {
        let (_bridge, mut peer) = spawn_bridge();

        peer.send("2").unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("3"));
    }

    struct FailingWriter(Arc<AtomicUsize>);

    #[async_trait]
    impl FrameWriter for FailingWriter {
        async fn write_frame(&mut self, _frame: &str) -> leaderboard_core::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::ConnectionError("broken pipe".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_send_not_retried() {
        let (reader, _writer, _peer) = memory::channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let bridge = Bridge::spawn(
            reader,
            FailingWriter(attempts.clone()),
            DEFAULT_NAMESPACE,
            Arc::new(Leaderboard::new()),
        );

        bridge.register_name(&"Alice".into());
        settle().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_establish_handshake() {
        let (reader, writer, mut peer) = memory::channel();
        peer.send(OPEN).unwrap();
        peer.send("2").unwrap();
        peer.send(r#"40{"sid":"xyz"}"#).unwrap();

        let bridge = Bridge::establish(reader, writer, DEFAULT_NAMESPACE, Arc::new(Leaderboard::new()))
            .await
            .unwrap();

        assert_eq!(bridge.session().map(|s| s.sid.as_str()), Some("abc123"));
        assert_eq!(peer.recv().await.as_deref(), Some("40"));
        assert_eq!(peer.recv().await.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_establish_custom_namespace() {
        let (reader, writer, mut peer) = memory::channel();
        peer.send(OPEN).unwrap();
        peer.send(r#"40/race,{"sid":"xyz"}"#).unwrap();

        let bridge = Bridge::establish(reader, writer, "/race", Arc::new(Leaderboard::new()))
            .await
            .unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("40/race,"));

        bridge.register_name(&"Alice".into());
        assert_eq!(
            peer.recv().await.as_deref(),
            Some(r#"42/race,["player_name","Alice"]"#)
        );
    }

    #[tokio::test]
    async fn test_other_namespace_updates_ignored() {
        let (reader, writer, peer) = memory::channel();
        let (runtime, mut calls) = recording_runtime();
        let _bridge = Bridge::spawn(reader, writer, "/race", runtime);

        peer.send(r#"42["update_player",["Bob",7]]"#).unwrap();
        peer.send(r#"42/race,["update_player",["Dan",3]]"#).unwrap();

        let (player, time) = calls.recv().await.unwrap();
        assert_eq!(player.as_str(), "Dan");
        assert_eq!(time, 3.0);

        settle().await;
        assert!(calls.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_relative_namespace() {
        let config = BridgeConfig {
            namespace: "race".into(),
            ..Default::default()
        };

        // Rejected before any network access
        let result = Bridge::connect(&config, Arc::new(Leaderboard::new())).await;
        assert!(matches!(result, Err(BridgeError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_establish_rejects_relative_namespace() {
        let (reader, writer, mut peer) = memory::channel();
        peer.send(OPEN).unwrap();

        let result = Bridge::establish(reader, writer, "race", Arc::new(Leaderboard::new())).await;
        assert!(matches!(result, Err(BridgeError::ConfigError(_))));
        assert!(peer.drain().is_empty());
    }

    #[tokio::test]
    async fn test_establish_connect_error() {
        let (reader, writer, peer) = memory::channel();
        peer.send(OPEN).unwrap();
        peer.send(r#"44{"message":"Not authorized"}"#).unwrap();

        let result =
            Bridge::establish(reader, writer, DEFAULT_NAMESPACE, Arc::new(Leaderboard::new())).await;
        match result {
            Err(BridgeError::HandshakeFailed(msg)) => assert_eq!(msg, "Not authorized"),
            Err(e) => panic!("Wrong error: {}", e),
            Ok(_) => panic!("Handshake should fail"),
        }
    }

    #[tokio::test]
    async fn test_establish_requires_open() {
        let (reader, writer, peer) = memory::channel();
        peer.send(r#"42["update_player",["Bob",7]]"#).unwrap();

        let result =
            Bridge::establish(reader, writer, DEFAULT_NAMESPACE, Arc::new(Leaderboard::new())).await;
        assert!(matches!(result, Err(BridgeError::HandshakeFailed(_))));
    }

    #[tokio::test]
    async fn test_shutdown_sends_disconnect() {
        let (bridge, mut peer) = spawn_bridge();
        let handle = bridge.handle();

        tokio_test::assert_ok!(bridge.shutdown().await);
        assert_eq!(peer.recv().await.as_deref(), Some("41"));

        // Writer is gone; later emissions are dropped quietly
        handle.register_name(&"Alice".into());
        assert!(peer.recv().await.is_none());
    }
}
