//! Player session on top of a bridge

use crate::bridge::BridgeHandle;
use leaderboard_core::{BridgeError, Leaderboard, PlayerName, Result};
use std::collections::BTreeMap;
use tracing::info;

/// Time reported when a player leaves; the server treats it as removal
pub const DEPARTURE_TIME: f64 = -1.0;

/// The local player's session.
///
/// Registers the player's name on creation and reports departure on drop.
pub struct Client {
    name: PlayerName,
    bridge: BridgeHandle,
    board: Leaderboard,
    snapshot: BTreeMap<String, f32>,
}

impl Client {
    /// Join the leaderboard under `name`.
    ///
    /// Fails with `NameTaken` if the shared leaderboard already lists the name.
    pub fn new(name: impl Into<PlayerName>, bridge: BridgeHandle, board: Leaderboard) -> Result<Self> {
        let name = name.into();
        if board.contains(name.as_str()) {
            return Err(BridgeError::NameTaken(name.into_string()));
        }

        let client = Self {
            snapshot: board.snapshot(),
            name,
            bridge,
            board,
        };
        client.register_name();
        info!("Registered player {}", client.name);

        Ok(client)
    }

    pub fn name(&self) -> &PlayerName {
        &self.name
    }

    pub fn register_name(&self) {
        self.bridge.register_name(&self.name);
    }

    /// Report a finished run
    pub fn register_time(&self, time: f64) {
        self.bridge.register_time(&self.name, time);
    }

    /// Refresh the local copy of the leaderboard
    pub fn sync(&mut self) {
        self.snapshot = self.board.snapshot();
    }

    /// Leaderboard as of the last `sync`
    pub fn leaderboard(&self) -> &BTreeMap<String, f32> {
        &self.snapshot
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.register_time(DEPARTURE_TIME);
    }
}
