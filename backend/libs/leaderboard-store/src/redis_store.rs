//! Redis backend
//!
//! Single ops are sent as plain commands; batches go out as one
//! `MULTI`/`EXEC` pipeline so no other client interleaves with them.
//!
//! `EXEC` does not roll back. A command that fails while the transaction
//! runs (a `WRONGTYPE` reply, say) fails the batch, but the commands around
//! it have already been applied.

use crate::batch::{Batch, Reply, StoreOp};
use crate::error::{StoreError, StoreResult};
use crate::{LeaderboardStore, Order, SetOperation};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// [`LeaderboardStore`] backed by Redis sorted sets and hashes.
#[derive(Clone)]
pub struct RedisStore {
    manager: SharedConnectionManager,
}

impl RedisStore {
    pub fn new(manager: SharedConnectionManager) -> Self {
        Self { manager }
    }

    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .map_err(|e| StoreError::Connection(format!("failed to parse REDIS_URL: {}", e)))?;
        let addr = format!("{:?}", info.addr);

        let client = Client::open(info)?;
        let manager = ConnectionManager::new(client).await?;

        info!(addr = %addr, "Redis connection manager initialized");
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

#[async_trait::async_trait]
impl LeaderboardStore for RedisStore {
    async fn run(&self, op: StoreOp) -> StoreResult<Reply> {
        let cmd = command(&op);
        let value: redis::Value = {
            let mut conn = self.manager.lock().await;
            cmd.query_async(&mut *conn).await?
        };

        debug!(op = op.name(), keys = ?op.keys(), "Redis command");
        decode(&op, &value)
    }

    async fn execute(&self, batch: Batch) -> StoreResult<Vec<Reply>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let ops = batch.into_ops();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            pipe.add_command(command(op));
        }

        let values: Vec<redis::Value> = {
            let mut conn = self.manager.lock().await;
            pipe.query_async(&mut *conn).await?
        };

        if values.len() != ops.len() {
            return Err(StoreError::UnexpectedReply {
                expected: "one reply per queued command",
                got: format!("{} replies for {} commands", values.len(), ops.len()),
            });
        }

        debug!(count = ops.len(), "Redis transaction committed");
        ops.iter()
            .zip(values.iter())
            .map(|(op, value)| decode(op, value))
            .collect()
    }
}

/// Score bound in the textual form Redis accepts, including infinities.
fn score_arg(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

fn command(op: &StoreOp) -> redis::Cmd {
    match op {
        StoreOp::Add { key, member, score } => {
            let mut cmd = redis::cmd("ZADD");
            cmd.arg(key).arg(score_arg(*score)).arg(member);
            cmd
        }
        StoreOp::Increment { key, member, delta } => {
            let mut cmd = redis::cmd("ZINCRBY");
            cmd.arg(key).arg(score_arg(*delta)).arg(member);
            cmd
        }
        StoreOp::Remove { key, member } => {
            let mut cmd = redis::cmd("ZREM");
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::RemoveRangeByScore { key, min, max } => {
            let mut cmd = redis::cmd("ZREMRANGEBYSCORE");
            cmd.arg(key).arg(score_arg(*min)).arg(score_arg(*max));
            cmd
        }
        StoreOp::RemoveRangeByRank { key, start, stop } => {
            let mut cmd = redis::cmd("ZREMRANGEBYRANK");
            cmd.arg(key).arg(*start).arg(*stop);
            cmd
        }
        StoreOp::Rank { key, member, order } => {
            let mut cmd = match order {
                Order::Ascending => redis::cmd("ZRANK"),
                Order::Descending => redis::cmd("ZREVRANK"),
            };
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::Score { key, member } => {
            let mut cmd = redis::cmd("ZSCORE");
            cmd.arg(key).arg(member);
            cmd
        }
        StoreOp::Count { key } => {
            let mut cmd = redis::cmd("ZCARD");
            cmd.arg(key);
            cmd
        }
        StoreOp::CountByScore { key, min, max } => {
            let mut cmd = redis::cmd("ZCOUNT");
            cmd.arg(key).arg(score_arg(*min)).arg(score_arg(*max));
            cmd
        }
        StoreOp::RangeByRank {
            key,
            start,
            stop,
            order,
        } => {
            let mut cmd = match order {
                Order::Ascending => redis::cmd("ZRANGE"),
                Order::Descending => redis::cmd("ZREVRANGE"),
            };
            cmd.arg(key).arg(*start).arg(*stop);
            cmd
        }
        StoreOp::RangeByScore {
            key,
            min,
            max,
            order,
        } => match order {
            Order::Ascending => {
                let mut cmd = redis::cmd("ZRANGEBYSCORE");
                cmd.arg(key).arg(score_arg(*min)).arg(score_arg(*max));
                cmd
            }
            Order::Descending => {
                let mut cmd = redis::cmd("ZREVRANGEBYSCORE");
                cmd.arg(key).arg(score_arg(*max)).arg(score_arg(*min));
                cmd
            }
        },
        StoreOp::RangeByRankWithScores { key, start, stop } => {
            let mut cmd = redis::cmd("ZRANGE");
            cmd.arg(key).arg(*start).arg(*stop).arg("WITHSCORES");
            cmd
        }
        StoreOp::CombineAndStore {
            operation,
            destination,
            sources,
            aggregate,
        } => {
            let mut cmd = match operation {
                SetOperation::Union => redis::cmd("ZUNIONSTORE"),
                SetOperation::Intersect => redis::cmd("ZINTERSTORE"),
            };
            cmd.arg(destination)
                .arg(sources.len())
                .arg(sources)
                .arg("AGGREGATE")
                .arg(aggregate.as_str());
            cmd
        }
        StoreOp::HashGet { key, field } => {
            let mut cmd = redis::cmd("HGET");
            cmd.arg(key).arg(field);
            cmd
        }
        StoreOp::HashSet { key, field, value } => {
            let mut cmd = redis::cmd("HSET");
            cmd.arg(key).arg(field).arg(value);
            cmd
        }
        StoreOp::HashDelete { key, field } => {
            let mut cmd = redis::cmd("HDEL");
            cmd.arg(key).arg(field);
            cmd
        }
        StoreOp::ExpireIn { key, ttl } => {
            let mut cmd = redis::cmd("PEXPIRE");
            cmd.arg(key).arg(ttl.as_millis() as u64);
            cmd
        }
        StoreOp::ExpireAt { key, at } => {
            let mut cmd = redis::cmd("PEXPIREAT");
            cmd.arg(key).arg(at.timestamp_millis());
            cmd
        }
        StoreOp::Delete { key } => {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(key);
            cmd
        }
    }
}

fn decode(op: &StoreOp, value: &redis::Value) -> StoreResult<Reply> {
    let reply = match op {
        StoreOp::Add { .. }
        | StoreOp::HashSet { .. }
        | StoreOp::ExpireIn { .. }
        | StoreOp::ExpireAt { .. } => Reply::Done,
        StoreOp::Increment { .. } | StoreOp::Score { .. } => {
            Reply::Score(redis::from_redis_value(value)?)
        }
        StoreOp::Remove { .. }
        | StoreOp::RemoveRangeByScore { .. }
        | StoreOp::RemoveRangeByRank { .. }
        | StoreOp::Count { .. }
        | StoreOp::CountByScore { .. }
        | StoreOp::CombineAndStore { .. }
        | StoreOp::HashDelete { .. }
        | StoreOp::Delete { .. } => Reply::Count(redis::from_redis_value(value)?),
        StoreOp::Rank { .. } => Reply::Rank(redis::from_redis_value(value)?),
        StoreOp::RangeByRank { .. } | StoreOp::RangeByScore { .. } => {
            Reply::Members(redis::from_redis_value(value)?)
        }
        StoreOp::RangeByRankWithScores { .. } => Reply::Scored(redis::from_redis_value(value)?),
        StoreOp::HashGet { .. } => Reply::Value(redis::from_redis_value(value)?),
    };
    Ok(reply)
}
