//! Transport abstractions for the leaderboard bridge
//!
//! Provides FrameReader/FrameWriter traits that can be implemented
//! for different transport mechanisms (WebSocket, in-memory channels),
//! plus the background tasks that own each half of a connection.

use crate::protocol::{EnginePacket, InboundEvent, OpenPacket, SocketPacket, SocketPacketKind};
use async_trait::async_trait;
use leaderboard_core::{BridgeError, HostRuntime, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Trait for async reading from a transport
#[async_trait]
pub trait FrameReader: Send {
    /// Read one complete text frame.
    /// Returns `BridgeError::ConnectionClosed` once the peer has gone away.
    async fn read_frame(&mut self) -> Result<String>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Write one complete text frame
    async fn write_frame(&mut self, frame: &str) -> Result<()>;

    /// Close the transport after the last frame
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Item queued for the writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(String),
    Close,
}

fn preview(frame: &str) -> String {
    frame.chars().take(200).collect()
}

/// Perform the Engine.IO open + Socket.IO connect exchange.
///
/// Pings that arrive before the namespace is joined are answered inline.
pub async fn handshake<R: FrameReader, W: FrameWriter + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    namespace: &str,
) -> Result<OpenPacket> {
    let frame = reader.read_frame().await?;
    debug!("[Server→Rust] handshake {}", preview(&frame));

    let open = match EnginePacket::decode(&frame)? {
        EnginePacket::Open(open) => open,
        other => {
            return Err(BridgeError::HandshakeFailed(format!(
                "Expected open packet, got {:?}",
                other
            )));
        }
    };
    info!(
        "Engine.IO session {} (ping interval {}ms)",
        open.sid, open.ping_interval
    );

    let connect = EnginePacket::Message(SocketPacket::connect(namespace).encode()?).encode()?;
    writer.write_frame(&connect).await?;

    loop {
        let frame = reader.read_frame().await?;
        debug!("[Server→Rust] handshake {}", preview(&frame));

        match EnginePacket::decode(&frame)? {
            EnginePacket::Ping(data) => {
                writer.write_frame(&EnginePacket::Pong(data).encode()?).await?;
            }
            EnginePacket::Message(payload) => {
                let packet = SocketPacket::decode(&payload)?;
                if packet.namespace != namespace {
                    debug!("Ignoring packet for namespace {}", packet.namespace);
                    continue;
                }
                match packet.kind {
                    SocketPacketKind::Connect => {
                        info!("Joined namespace {}", namespace);
                        return Ok(open);
                    }
                    SocketPacketKind::ConnectError => {
                        let message = packet
                            .data
                            .as_ref()
                            .and_then(|d| d.get("message"))
                            .and_then(|m| m.as_str())
                            .unwrap_or("connect_error")
                            .to_string();
                        return Err(BridgeError::HandshakeFailed(message));
                    }
                    other => {
                        debug!("Ignoring {:?} packet during handshake", other);
                    }
                }
            }
            EnginePacket::Close => return Err(BridgeError::ConnectionClosed),
            EnginePacket::Noop => {}
            other => {
                return Err(BridgeError::HandshakeFailed(format!(
                    "Unexpected packet during handshake: {:?}",
                    other
                )));
            }
        }
    }
}

/// Background writer task
///
/// Drains queued frames and writes each one exactly once. A failed write is
/// logged and dropped; it is never retried.
pub async fn writer_task<W: FrameWriter + ?Sized>(
    mut writer: Box<W>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = outbound_rx.recv().await {
        let frame = match item {
            Outbound::Frame(frame) => frame,
            Outbound::Close => {
                if let Err(e) = writer.close().await {
                    debug!("Transport close failed: {}", e);
                }
                info!("Writer task closed");
                return;
            }
        };

        debug!("[Rust→Server] len={} frame={}", frame.len(), preview(&frame));

        match writer.write_frame(&frame).await {
            Ok(()) => {}
            Err(BridgeError::ConnectionClosed) => {
                warn!("Connection closed, dropping frame and stopping writer");
                break;
            }
            Err(e) => warn!("Dropping frame after failed write: {}", e),
        }
    }
    debug!("Outbound queue closed, writer task exiting");
}

/// Background reader task that handles incoming frames
///
/// This task:
/// - Answers server pings through the outbound queue
/// - Decodes `update_player` events and hands them to the runtime
/// - Exits when the server closes the connection or a read fails
pub async fn reader_task<R: FrameReader>(
    mut reader: R,
    namespace: String,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    runtime: Arc<dyn HostRuntime>,
) {
    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(BridgeError::ConnectionClosed) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                break;
            }
        };

        debug!("[Server→Rust] len={} frame={}", frame.len(), preview(&frame));

        let packet = match EnginePacket::decode(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                continue;
            }
        };

        match packet {
            EnginePacket::Ping(data) => {
                if let Ok(pong) = EnginePacket::Pong(data).encode() {
                    // Ignore send errors (writer gone)
                    let _ = outbound_tx.send(Outbound::Frame(pong));
                }
            }
            EnginePacket::Message(payload) => handle_message(&payload, &namespace, &*runtime),
            EnginePacket::Close => {
                info!("Server sent close");
                break;
            }
            other => debug!("Ignoring {:?}", other),
        }
    }
}

fn handle_message(payload: &str, namespace: &str, runtime: &dyn HostRuntime) {
    let packet = match SocketPacket::decode(payload) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping undecodable packet: {}", e);
            return;
        }
    };

    if packet.namespace != namespace {
        debug!("Ignoring packet for namespace {}", packet.namespace);
        return;
    }

    match packet.kind {
        SocketPacketKind::Disconnect => {
            info!("Server disconnected namespace {}", packet.namespace);
            return;
        }
        SocketPacketKind::Event => {}
        other => {
            debug!("Ignoring {:?} packet", other);
            return;
        }
    }

    match InboundEvent::decode(&packet) {
        Ok(Some(InboundEvent::UpdatePlayer(update))) => {
            runtime.update_player(update.player, update.time);
        }
        Ok(None) => {
            if let Some((name, _)) = packet.event_parts() {
                debug!("Unhandled event {}", name);
            }
        }
        Err(e) => warn!("Dropping malformed event: {}", e),
    }
}
