//! Backend-neutral operations and replies
//!
//! Every capability of the store is expressed as a [`StoreOp`]. Backends run
//! a single op directly, or a whole [`Batch`] as one transaction, and answer
//! with one [`Reply`] per op in queue order.

use crate::error::{StoreError, StoreResult};
use crate::{Aggregate, Order, SetOperation};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A single store command.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    // ============= Ordered set =============
    Add {
        key: String,
        member: String,
        score: f64,
    },
    Increment {
        key: String,
        member: String,
        delta: f64,
    },
    Remove {
        key: String,
        member: String,
    },
    RemoveRangeByScore {
        key: String,
        min: f64,
        max: f64,
    },
    /// Rank bounds follow Redis conventions: 0-based, negative from the end.
    RemoveRangeByRank {
        key: String,
        start: isize,
        stop: isize,
    },
    Rank {
        key: String,
        member: String,
        order: Order,
    },
    Score {
        key: String,
        member: String,
    },
    Count {
        key: String,
    },
    CountByScore {
        key: String,
        min: f64,
        max: f64,
    },
    RangeByRank {
        key: String,
        start: isize,
        stop: isize,
        order: Order,
    },
    RangeByScore {
        key: String,
        min: f64,
        max: f64,
        order: Order,
    },
    /// Always ascending.
    RangeByRankWithScores {
        key: String,
        start: isize,
        stop: isize,
    },
    CombineAndStore {
        operation: SetOperation,
        destination: String,
        sources: Vec<String>,
        aggregate: Aggregate,
    },

    // ============= Hash =============
    HashGet {
        key: String,
        field: String,
    },
    HashSet {
        key: String,
        field: String,
        value: String,
    },
    HashDelete {
        key: String,
        field: String,
    },

    // ============= Keys =============
    ExpireIn {
        key: String,
        ttl: Duration,
    },
    ExpireAt {
        key: String,
        at: DateTime<Utc>,
    },
    Delete {
        key: String,
    },
}

impl StoreOp {
    /// Every key the op reads or writes.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            StoreOp::CombineAndStore {
                destination,
                sources,
                ..
            } => std::iter::once(destination.as_str())
                .chain(sources.iter().map(String::as_str))
                .collect(),
            StoreOp::Add { key, .. }
            | StoreOp::Increment { key, .. }
            | StoreOp::Remove { key, .. }
            | StoreOp::RemoveRangeByScore { key, .. }
            | StoreOp::RemoveRangeByRank { key, .. }
            | StoreOp::Rank { key, .. }
            | StoreOp::Score { key, .. }
            | StoreOp::Count { key }
            | StoreOp::CountByScore { key, .. }
            | StoreOp::RangeByRank { key, .. }
            | StoreOp::RangeByScore { key, .. }
            | StoreOp::RangeByRankWithScores { key, .. }
            | StoreOp::HashGet { key, .. }
            | StoreOp::HashSet { key, .. }
            | StoreOp::HashDelete { key, .. }
            | StoreOp::ExpireIn { key, .. }
            | StoreOp::ExpireAt { key, .. }
            | StoreOp::Delete { key } => vec![key.as_str()],
        }
    }

    /// Short command name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StoreOp::Add { .. } => "add",
            StoreOp::Increment { .. } => "increment",
            StoreOp::Remove { .. } => "remove",
            StoreOp::RemoveRangeByScore { .. } => "remove_range_by_score",
            StoreOp::RemoveRangeByRank { .. } => "remove_range_by_rank",
            StoreOp::Rank { .. } => "rank",
            StoreOp::Score { .. } => "score",
            StoreOp::Count { .. } => "count",
            StoreOp::CountByScore { .. } => "count_by_score",
            StoreOp::RangeByRank { .. } => "range_by_rank",
            StoreOp::RangeByScore { .. } => "range_by_score",
            StoreOp::RangeByRankWithScores { .. } => "range_by_rank_with_scores",
            StoreOp::CombineAndStore { .. } => "combine_and_store",
            StoreOp::HashGet { .. } => "hash_get",
            StoreOp::HashSet { .. } => "hash_set",
            StoreOp::HashDelete { .. } => "hash_delete",
            StoreOp::ExpireIn { .. } => "expire_in",
            StoreOp::ExpireAt { .. } => "expire_at",
            StoreOp::Delete { .. } => "delete",
        }
    }
}

/// Result of one [`StoreOp`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Write with no meaningful result.
    Done,
    /// Cardinality, or number of entries removed / deleted.
    Count(u64),
    /// 0-based rank, `None` when the member is absent.
    Rank(Option<u64>),
    Score(Option<f64>),
    Members(Vec<String>),
    Scored(Vec<(String, f64)>),
    Value(Option<String>),
}

impl Reply {
    fn describe(&self) -> String {
        format!("{:?}", self)
    }

    pub fn into_unit(self) -> StoreResult<()> {
        match self {
            Reply::Done | Reply::Count(_) => Ok(()),
            other => Err(StoreError::UnexpectedReply {
                expected: "unit",
                got: other.describe(),
            }),
        }
    }

    pub fn into_count(self) -> StoreResult<u64> {
        match self {
            Reply::Count(count) => Ok(count),
            other => Err(StoreError::UnexpectedReply {
                expected: "count",
                got: other.describe(),
            }),
        }
    }

    pub fn into_rank(self) -> StoreResult<Option<u64>> {
        match self {
            Reply::Rank(rank) => Ok(rank),
            other => Err(StoreError::UnexpectedReply {
                expected: "rank",
                got: other.describe(),
            }),
        }
    }

    pub fn into_score(self) -> StoreResult<Option<f64>> {
        match self {
            Reply::Score(score) => Ok(score),
            other => Err(StoreError::UnexpectedReply {
                expected: "score",
                got: other.describe(),
            }),
        }
    }

    pub fn into_members(self) -> StoreResult<Vec<String>> {
        match self {
            Reply::Members(members) => Ok(members),
            other => Err(StoreError::UnexpectedReply {
                expected: "members",
                got: other.describe(),
            }),
        }
    }

    pub fn into_scored(self) -> StoreResult<Vec<(String, f64)>> {
        match self {
            Reply::Scored(entries) => Ok(entries),
            other => Err(StoreError::UnexpectedReply {
                expected: "scored members",
                got: other.describe(),
            }),
        }
    }

    pub fn into_value(self) -> StoreResult<Option<String>> {
        match self {
            Reply::Value(value) => Ok(value),
            other => Err(StoreError::UnexpectedReply {
                expected: "value",
                got: other.describe(),
            }),
        }
    }
}

/// Ops queued for one transactional round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<StoreOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an op and return its index in the reply vector.
    pub fn queue(&mut self, op: StoreOp) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<StoreOp> {
        self.ops
    }
}

impl FromIterator<StoreOp> for Batch {
    fn from_iter<I: IntoIterator<Item = StoreOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
