//! Leaderboard store capability
//!
//! The leaderboard engine only needs two primitives from its backing store:
//! - Ordered sets (member -> numeric score, queryable by rank or score)
//! - Hashes (field -> string value) for per-member auxiliary data
//!
//! plus key expiry and deletion, and a way to submit several commands as one
//! transaction. [`LeaderboardStore`] is that contract. Two backends implement
//! it: [`RedisStore`] and the in-process [`MemoryStore`].

mod batch;
mod error;
mod memory;
mod redis_store;

pub use batch::{Batch, Reply, StoreOp};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::{RedisStore, SharedConnectionManager};

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Direction in which an ordered set is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Ascending,
    Descending,
}

/// Set combination applied by [`LeaderboardStore::combine_and_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperation {
    Union,
    Intersect,
}

/// How scores of the same member are merged across source sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }

    pub fn combine(&self, current: f64, next: f64) -> f64 {
        match self {
            Aggregate::Sum => current + next,
            Aggregate::Min => current.min(next),
            Aggregate::Max => current.max(next),
        }
    }
}

/// Ordered-set and hash store used by the leaderboard engine.
///
/// Backends implement [`run`](Self::run) and [`execute`](Self::execute);
/// the typed helpers are thin wrappers around single-op runs.
#[async_trait::async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Run one op outside of any transaction.
    async fn run(&self, op: StoreOp) -> StoreResult<Reply>;

    /// Run every queued op as one isolated unit. Replies come back in queue
    /// order.
    ///
    /// An error means the batch failed, not that nothing was written:
    /// [`MemoryStore`] restores the touched keys, while [`RedisStore`] keeps
    /// whatever `EXEC` already applied.
    async fn execute(&self, batch: Batch) -> StoreResult<Vec<Reply>>;

    // ============= Ordered set =============

    async fn add(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.run(StoreOp::Add {
            key: key.to_string(),
            member: member.to_string(),
            score,
        })
        .await?
        .into_unit()
    }

    /// Returns the member's new score.
    async fn increment(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let score = self
            .run(StoreOp::Increment {
                key: key.to_string(),
                member: member.to_string(),
                delta,
            })
            .await?
            .into_score()?;
        score.ok_or(StoreError::UnexpectedReply {
            expected: "score",
            got: "nil".to_string(),
        })
    }

    async fn remove(&self, key: &str, member: &str) -> StoreResult<u64> {
        self.run(StoreOp::Remove {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await?
        .into_count()
    }

    async fn remove_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.run(StoreOp::RemoveRangeByScore {
            key: key.to_string(),
            min,
            max,
        })
        .await?
        .into_count()
    }

    async fn remove_range_by_rank(&self, key: &str, start: isize, stop: isize) -> StoreResult<u64> {
        self.run(StoreOp::RemoveRangeByRank {
            key: key.to_string(),
            start,
            stop,
        })
        .await?
        .into_count()
    }

    /// 0-based rank under `order`.
    async fn rank(&self, key: &str, member: &str, order: Order) -> StoreResult<Option<u64>> {
        self.run(StoreOp::Rank {
            key: key.to_string(),
            member: member.to_string(),
            order,
        })
        .await?
        .into_rank()
    }

    async fn score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.run(StoreOp::Score {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await?
        .into_score()
    }

    async fn count(&self, key: &str) -> StoreResult<u64> {
        self.run(StoreOp::Count {
            key: key.to_string(),
        })
        .await?
        .into_count()
    }

    async fn count_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.run(StoreOp::CountByScore {
            key: key.to_string(),
            min,
            max,
        })
        .await?
        .into_count()
    }

    async fn range_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        order: Order,
    ) -> StoreResult<Vec<String>> {
        self.run(StoreOp::RangeByRank {
            key: key.to_string(),
            start,
            stop,
            order,
        })
        .await?
        .into_members()
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        order: Order,
    ) -> StoreResult<Vec<String>> {
        self.run(StoreOp::RangeByScore {
            key: key.to_string(),
            min,
            max,
            order,
        })
        .await?
        .into_members()
    }

    async fn range_by_rank_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.run(StoreOp::RangeByRankWithScores {
            key: key.to_string(),
            start,
            stop,
        })
        .await?
        .into_scored()
    }

    /// Returns the cardinality of `destination` after the write.
    async fn combine_and_store(
        &self,
        operation: SetOperation,
        destination: &str,
        sources: &[String],
        aggregate: Aggregate,
    ) -> StoreResult<u64> {
        self.run(StoreOp::CombineAndStore {
            operation,
            destination: destination.to_string(),
            sources: sources.to_vec(),
            aggregate,
        })
        .await?
        .into_count()
    }

    // ============= Hash =============

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.run(StoreOp::HashGet {
            key: key.to_string(),
            field: field.to_string(),
        })
        .await?
        .into_value()
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.run(StoreOp::HashSet {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
        .await?
        .into_unit()
    }

    async fn hash_delete(&self, key: &str, field: &str) -> StoreResult<u64> {
        self.run(StoreOp::HashDelete {
            key: key.to_string(),
            field: field.to_string(),
        })
        .await?
        .into_count()
    }

    // ============= Keys =============

    async fn expire_in(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.run(StoreOp::ExpireIn {
            key: key.to_string(),
            ttl,
        })
        .await?
        .into_unit()
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.run(StoreOp::ExpireAt {
            key: key.to_string(),
            at,
        })
        .await?
        .into_unit()
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        self.run(StoreOp::Delete {
            key: key.to_string(),
        })
        .await?
        .into_count()
    }
}
