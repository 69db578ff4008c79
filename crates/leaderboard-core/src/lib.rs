//! # leaderboard-core
//!
//! Core types and traits shared by the leaderboard bridge crates:
//! - Player identity and timing values
//! - The `HostRuntime` trait the bridge calls into
//! - A shared leaderboard store
//! - Error types

pub mod error;
pub mod leaderboard;
pub mod player;
pub mod runtime;

pub use error::{BridgeError, Result};
pub use leaderboard::Leaderboard;
pub use player::{PlayerName, PlayerTime};
pub use runtime::HostRuntime;
