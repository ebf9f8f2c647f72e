//! Leaderboard service
//!
//! Ranking, pagination, percentile and multi-board operations over a
//! [`leaderboard_store::LeaderboardStore`], exposed over HTTP.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, LeaderboardError, Result};
pub use models::{MemberScore, RankCondition, RankInfo};
pub use services::{Leaderboard, LeaderboardOptions, PendingRank, RequestOptions, SortBy};
pub use state::AppState;
