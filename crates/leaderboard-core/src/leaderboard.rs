//! Shared leaderboard store

use crate::player::PlayerName;
use crate::runtime::HostRuntime;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Player times keyed by name.
///
/// Cloning yields another handle to the same table. A negative time is a
/// departure and removes the player.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: Arc<RwLock<BTreeMap<String, f32>>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a pushed update
    pub fn apply(&self, player: &PlayerName, time: f64) {
        let mut entries = self.write();
        if time < 0.0 {
            debug!("Removing {} from leaderboard", player);
            entries.remove(player.as_str());
        } else {
            debug!("Leaderboard {} = {}", player, time);
            entries.insert(player.as_str().to_owned(), time as f32);
        }
    }

    pub fn contains(&self, player: &str) -> bool {
        self.read().contains_key(player)
    }

    pub fn get(&self, player: &str) -> Option<f32> {
        self.read().get(player).copied()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current table
    pub fn snapshot(&self) -> BTreeMap<String, f32> {
        self.read().clone()
    }

    /// Entries ordered by time ascending, ties by name
    pub fn ranked(&self) -> Vec<(String, f32)> {
        rank(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, f32>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, f32>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Order a table by time ascending, ties by name
pub fn rank(entries: &BTreeMap<String, f32>) -> Vec<(String, f32)> {
    let mut ranked: Vec<(String, f32)> = entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

impl HostRuntime for Leaderboard {
    fn update_player(&self, player: PlayerName, time: f64) {
        self.apply(&player, time);
    }
}
