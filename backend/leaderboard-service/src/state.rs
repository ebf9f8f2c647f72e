use crate::error::Result;
use crate::services::{Leaderboard, LeaderboardOptions};
use leaderboard_store::LeaderboardStore;
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LeaderboardStore>,
    pub defaults: LeaderboardOptions,
}

impl AppState {
    pub fn new(store: Arc<dyn LeaderboardStore>, defaults: LeaderboardOptions) -> Self {
        Self { store, defaults }
    }

    /// Fresh handle for `name` carrying the configured defaults.
    pub fn leaderboard(&self, name: &str) -> Result<Leaderboard> {
        Leaderboard::new(self.store.clone(), name, self.defaults.clone())
    }
}
