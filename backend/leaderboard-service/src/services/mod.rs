pub mod leaderboard;

pub use leaderboard::{Leaderboard, LeaderboardOptions, PendingRank, RequestOptions, SortBy};
