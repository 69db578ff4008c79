//! In-memory transport
//!
//! A channel-backed connection for embedding the bridge without a network
//! and for driving it from tests. The `MemoryPeer` plays the server side.

use crate::transport::{FrameReader, FrameWriter};
use async_trait::async_trait;
use leaderboard_core::{BridgeError, Result};
use tokio::sync::mpsc;

/// Bridge-side read half
pub struct MemoryReader(mpsc::UnboundedReceiver<String>);

/// Bridge-side write half
pub struct MemoryWriter(mpsc::UnboundedSender<String>);

/// Server side of an in-memory connection
pub struct MemoryPeer {
    /// Frames written by the bridge
    pub incoming: mpsc::UnboundedReceiver<String>,
    /// Frames delivered to the bridge
    pub outgoing: mpsc::UnboundedSender<String>,
}

/// Create a connected reader/writer pair and its peer
pub fn channel() -> (MemoryReader, MemoryWriter, MemoryPeer) {
    let (to_bridge_tx, to_bridge_rx) = mpsc::unbounded_channel();
    let (from_bridge_tx, from_bridge_rx) = mpsc::unbounded_channel();

    (
        MemoryReader(to_bridge_rx),
        MemoryWriter(from_bridge_tx),
        MemoryPeer {
            incoming: from_bridge_rx,
            outgoing: to_bridge_tx,
        },
    )
}

impl MemoryPeer {
    /// Deliver a frame to the bridge
    pub fn send(&self, frame: impl Into<String>) -> Result<()> {
        self.outgoing
            .send(frame.into())
            .map_err(|_| BridgeError::ConnectionClosed)
    }

    /// Next frame written by the bridge, or `None` once the bridge side is gone
    pub async fn recv(&mut self) -> Option<String> {
        self.incoming.recv().await
    }

    /// Frames written so far, without waiting
    pub fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.incoming.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<String> {
        self.0.recv().await.ok_or(BridgeError::ConnectionClosed)
    }
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.0
            .send(frame.to_string())
            .map_err(|_| BridgeError::ConnectionClosed)
    }
}
