//! Socket.IO bridge between a game runtime and a leaderboard server
//!
//! This crate provides:
//! - Engine.IO / Socket.IO wire protocol and typed leaderboard events
//! - Transport abstractions (FrameReader/FrameWriter traits)
//! - WebSocket and in-memory transports
//! - Background reader/writer tasks and the `Bridge` that owns them
//! - A player `Client` session and a `RunTimer`

pub mod bridge;
pub mod client;
pub mod memory;
pub mod protocol;
pub mod timer;
pub mod transport;
pub mod ws;

pub use bridge::{Bridge, BridgeConfig, BridgeHandle};
pub use client::Client;
pub use protocol::{InboundEvent, OutboundEvent, deserialize, serialize};
pub use timer::RunTimer;
pub use transport::{FrameReader, FrameWriter, reader_task, writer_task};
