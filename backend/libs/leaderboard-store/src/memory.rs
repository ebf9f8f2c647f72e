//! In-process backend
//!
//! Mirrors the Redis semantics the engine relies on: members tie-break
//! lexicographically, rank bounds may be negative, emptied keys disappear,
//! and expired keys are purged before every access. A batch runs under one
//! lock and is rolled back if any op fails.

use crate::batch::{Batch, Reply, StoreOp};
use crate::error::{StoreError, StoreResult};
use crate::{Aggregate, LeaderboardStore, Order, SetOperation};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

/// [`LeaderboardStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn key_count(&self) -> usize {
        let mut keyspace = self.keyspace.lock().await;
        keyspace.purge_expired(Utc::now());
        keyspace.entries.len()
    }

    /// Expiry deadline of `key`, if one is set.
    pub async fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let mut keyspace = self.keyspace.lock().await;
        keyspace.purge_expired(Utc::now());
        keyspace.entries.get(key).and_then(|entry| entry.expires_at)
    }
}

#[async_trait::async_trait]
impl LeaderboardStore for MemoryStore {
    async fn run(&self, op: StoreOp) -> StoreResult<Reply> {
        let mut keyspace = self.keyspace.lock().await;
        let now = Utc::now();
        keyspace.purge_expired(now);
        debug!(op = op.name(), keys = ?op.keys(), "Memory store command");
        keyspace.apply(op, now)
    }

    async fn execute(&self, batch: Batch) -> StoreResult<Vec<Reply>> {
        let mut keyspace = self.keyspace.lock().await;
        let now = Utc::now();
        keyspace.purge_expired(now);

        let ops = batch.into_ops();
        let snapshot = keyspace.snapshot(&ops);

        let mut replies = Vec::with_capacity(ops.len());
        for op in ops {
            match keyspace.apply(op, now) {
                Ok(reply) => replies.push(reply),
                Err(err) => {
                    keyspace.restore(snapshot);
                    return Err(err);
                }
            }
        }

        debug!(count = replies.len(), "Memory store transaction committed");
        Ok(replies)
    }
}

// ============= Ordered set =============

#[derive(Debug, Clone)]
struct ScoredMember {
    score: f64,
    member: String,
}

impl PartialEq for ScoredMember {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredMember {}

impl PartialOrd for ScoredMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredMember {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.member.cmp(&other.member))
    }
}

#[derive(Debug, Clone, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<ScoredMember>,
}

impl SortedSet {
    fn len(&self) -> usize {
        self.scores.len()
    }

    fn insert(&mut self, member: &str, score: f64) {
        if let Some(previous) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&ScoredMember {
                score: previous,
                member: member.to_string(),
            });
        }
        self.ordered.insert(ScoredMember {
            score,
            member: member.to_string(),
        });
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&ScoredMember {
                    score,
                    member: member.to_string(),
                });
                true
            }
            None => false,
        }
    }

    fn iter(&self, order: Order) -> Box<dyn Iterator<Item = &ScoredMember> + '_> {
        match order {
            Order::Ascending => Box::new(self.ordered.iter()),
            Order::Descending => Box::new(self.ordered.iter().rev()),
        }
    }

    fn rank(&self, member: &str, order: Order) -> Option<u64> {
        self.scores.get(member)?;
        self.iter(order)
            .position(|entry| entry.member == member)
            .map(|index| index as u64)
    }

    fn in_score_range(&self, min: f64, max: f64, order: Order) -> Vec<&ScoredMember> {
        self.iter(order)
            .filter(|entry| entry.score >= min && entry.score <= max)
            .collect()
    }

    fn by_rank(&self, start: isize, stop: isize, order: Order) -> Vec<&ScoredMember> {
        match normalize_rank_range(start, stop, self.len()) {
            Some((start, stop)) => self
                .iter(order)
                .skip(start)
                .take(stop - start + 1)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Resolve Redis-style rank bounds against a set of `len` members.
/// Returns an inclusive `(start, stop)` pair, or `None` for an empty window.
fn normalize_rank_range(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

// ============= Keyspace =============

#[derive(Debug, Clone)]
enum Value {
    Sorted(SortedSet),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

type Snapshot = Vec<(String, Option<Entry>)>;

impl Keyspace {
    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.entries
            .retain(|_, entry| entry.expires_at.map_or(true, |deadline| deadline > now));
    }

    fn snapshot(&self, ops: &[StoreOp]) -> Snapshot {
        let mut saved: Snapshot = Vec::new();
        for op in ops {
            for key in op.keys() {
                if saved.iter().all(|(saved_key, _)| saved_key != key) {
                    saved.push((key.to_string(), self.entries.get(key).cloned()));
                }
            }
        }
        saved
    }

    fn restore(&mut self, snapshot: Snapshot) {
        for (key, entry) in snapshot {
            match entry {
                Some(entry) => {
                    self.entries.insert(key, entry);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
    }

    fn sorted(&self, key: &str) -> StoreResult<Option<&SortedSet>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Sorted(set),
                ..
            }) => Ok(Some(set)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn sorted_mut(&mut self, key: &str) -> StoreResult<&mut SortedSet> {
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Sorted(SortedSet::default()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Sorted(set) => Ok(set),
            Value::Hash(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash(&self, key: &str) -> StoreResult<Option<&HashMap<String, String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(Some(hash)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash_mut(&mut self, key: &str) -> StoreResult<&mut HashMap<String, String>> {
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(hash) => Ok(hash),
            Value::Sorted(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Drop `key` if its value no longer holds anything.
    fn drop_if_empty(&mut self, key: &str) {
        let empty = match self.entries.get(key) {
            Some(Entry {
                value: Value::Sorted(set),
                ..
            }) => set.len() == 0,
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => hash.is_empty(),
            None => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    fn remove_members(&mut self, key: &str, members: Vec<String>) -> StoreResult<u64> {
        if self.sorted(key)?.is_none() {
            return Ok(0);
        }
        let set = self.sorted_mut(key)?;
        let removed = members.iter().filter(|member| set.remove(member)).count() as u64;
        self.drop_if_empty(key);
        Ok(removed)
    }

    fn combine(
        &self,
        operation: SetOperation,
        sources: &[String],
        aggregate: Aggregate,
    ) -> StoreResult<SortedSet> {
        let mut sets = Vec::with_capacity(sources.len());
        for source in sources {
            sets.push(self.sorted(source)?);
        }

        let mut combined: HashMap<String, f64> = HashMap::new();
        match operation {
            SetOperation::Union => {
                for set in sets.iter().flatten() {
                    for (member, score) in &set.scores {
                        combined
                            .entry(member.clone())
                            .and_modify(|current| *current = aggregate.combine(*current, *score))
                            .or_insert(*score);
                    }
                }
            }
            SetOperation::Intersect => {
                if let Some(Some(first)) = sets.first() {
                    'members: for (member, score) in &first.scores {
                        let mut value = *score;
                        for other in &sets[1..] {
                            match other.and_then(|set| set.scores.get(member)) {
                                Some(next) => value = aggregate.combine(value, *next),
                                None => continue 'members,
                            }
                        }
                        combined.insert(member.clone(), value);
                    }
                }
            }
        }

        let mut result = SortedSet::default();
        for (member, score) in combined {
            result.insert(&member, score);
        }
        Ok(result)
    }

    fn apply(&mut self, op: StoreOp, now: DateTime<Utc>) -> StoreResult<Reply> {
        let reply = match op {
            StoreOp::Add { key, member, score } => {
                self.sorted_mut(&key)?.insert(&member, score);
                Reply::Done
            }
            StoreOp::Increment { key, member, delta } => {
                let set = self.sorted_mut(&key)?;
                let score = set.scores.get(&member).copied().unwrap_or(0.0) + delta;
                set.insert(&member, score);
                Reply::Score(Some(score))
            }
            StoreOp::Remove { key, member } => Reply::Count(self.remove_members(&key, vec![member])?),
            StoreOp::RemoveRangeByScore { key, min, max } => {
                let members = match self.sorted(&key)? {
                    Some(set) => set
                        .in_score_range(min, max, Order::Ascending)
                        .into_iter()
                        .map(|entry| entry.member.clone())
                        .collect(),
                    None => Vec::new(),
                };
                Reply::Count(self.remove_members(&key, members)?)
            }
            StoreOp::RemoveRangeByRank { key, start, stop } => {
                let members = match self.sorted(&key)? {
                    Some(set) => set
                        .by_rank(start, stop, Order::Ascending)
                        .into_iter()
                        .map(|entry| entry.member.clone())
                        .collect(),
                    None => Vec::new(),
                };
                Reply::Count(self.remove_members(&key, members)?)
            }
            StoreOp::Rank { key, member, order } => {
                Reply::Rank(self.sorted(&key)?.and_then(|set| set.rank(&member, order)))
            }
            StoreOp::Score { key, member } => Reply::Score(
                self.sorted(&key)?
                    .and_then(|set| set.scores.get(&member).copied()),
            ),
            StoreOp::Count { key } => {
                Reply::Count(self.sorted(&key)?.map_or(0, |set| set.len() as u64))
            }
            StoreOp::CountByScore { key, min, max } => Reply::Count(
                self.sorted(&key)?.map_or(0, |set| {
                    set.in_score_range(min, max, Order::Ascending).len() as u64
                }),
            ),
            StoreOp::RangeByRank {
                key,
                start,
                stop,
                order,
            } => Reply::Members(self.sorted(&key)?.map_or_else(Vec::new, |set| {
                set.by_rank(start, stop, order)
                    .into_iter()
                    .map(|entry| entry.member.clone())
                    .collect()
            })),
            StoreOp::RangeByScore {
                key,
                min,
                max,
                order,
            } => Reply::Members(self.sorted(&key)?.map_or_else(Vec::new, |set| {
                set.in_score_range(min, max, order)
                    .into_iter()
                    .map(|entry| entry.member.clone())
                    .collect()
            })),
            StoreOp::RangeByRankWithScores { key, start, stop } => {
                Reply::Scored(self.sorted(&key)?.map_or_else(Vec::new, |set| {
                    set.by_rank(start, stop, Order::Ascending)
                        .into_iter()
                        .map(|entry| (entry.member.clone(), entry.score))
                        .collect()
                }))
            }
            StoreOp::CombineAndStore {
                operation,
                destination,
                sources,
                aggregate,
            } => {
                let combined = self.combine(operation, &sources, aggregate)?;
                let size = combined.len() as u64;
                if size == 0 {
                    self.entries.remove(&destination);
                } else {
                    self.entries.insert(
                        destination,
                        Entry {
                            value: Value::Sorted(combined),
                            expires_at: None,
                        },
                    );
                }
                Reply::Count(size)
            }
            StoreOp::HashGet { key, field } => {
                Reply::Value(self.hash(&key)?.and_then(|hash| hash.get(&field).cloned()))
            }
            StoreOp::HashSet { key, field, value } => {
                self.hash_mut(&key)?.insert(field, value);
                Reply::Done
            }
            StoreOp::HashDelete { key, field } => {
                if self.hash(&key)?.is_none() {
                    return Ok(Reply::Count(0));
                }
                let removed = self.hash_mut(&key)?.remove(&field).is_some();
                self.drop_if_empty(&key);
                Reply::Count(u64::from(removed))
            }
            StoreOp::ExpireIn { key, ttl } => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    let deadline = chrono::Duration::from_std(ttl)
                        .ok()
                        .and_then(|ttl| now.checked_add_signed(ttl))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    entry.expires_at = Some(deadline);
                }
                Reply::Done
            }
            StoreOp::ExpireAt { key, at } => {
                if at <= now {
                    self.entries.remove(&key);
                } else if let Some(entry) = self.entries.get_mut(&key) {
                    entry.expires_at = Some(at);
                }
                Reply::Done
            }
            StoreOp::Delete { key } => Reply::Count(u64::from(self.entries.remove(&key).is_some())),
        };
        Ok(reply)
    }
}
