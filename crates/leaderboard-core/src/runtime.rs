//! Host runtime trait

use crate::player::PlayerName;

/// Entry point the bridge calls when the server pushes a player update.
///
/// Called from the connection's reader task, once per inbound
/// `update_player` event, with the time passed through unchanged.
pub trait HostRuntime: Send + Sync + 'static {
    /// Apply a pushed player update
    fn update_player(&self, player: PlayerName, time: f64);
}

impl<F> HostRuntime for F
where
    F: Fn(PlayerName, f64) + Send + Sync + 'static,
{
    fn update_player(&self, player: PlayerName, time: f64) {
        self(player, time)
    }
}
