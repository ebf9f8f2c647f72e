use super::{validate_member, validate_name, Leaderboard, Replies};
use crate::error::{LeaderboardError, Result};
use crate::models::{MemberScore, RankCondition};
use chrono::{DateTime, Utc};
use leaderboard_store::{Batch, StoreOp};
use std::time::Duration;
use tracing::debug;

/// First half of a conditional write: the member's stored score has been
/// read, nothing has been written yet.
///
/// Another writer may change the member between
/// [`Leaderboard::read_rank_condition_in`] and
/// [`Leaderboard::commit_rank_if`]; the commit does not re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRank {
    pub leaderboard_name: String,
    pub condition: RankCondition,
}

impl Leaderboard {
    // ============= Ranking =============

    pub async fn rank_member(
        &self,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<()> {
        self.rank_member_in(&self.name, member, score, member_data)
            .await
    }

    /// Set `member`'s score and, when given, its data in one batch.
    pub async fn rank_member_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<()> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let mut batch = Batch::new();
        self.queue_rank(&mut batch, leaderboard_name, member, score, member_data);
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, member, score, "Ranked member");
        Ok(())
    }

    /// Rank `member` in every leaderboard of `leaderboard_names` in one batch.
    pub async fn rank_member_across(
        &self,
        leaderboard_names: &[String],
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<()> {
        validate_member(member)?;
        for name in leaderboard_names {
            validate_name(name)?;
        }
        if leaderboard_names.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::new();
        for name in leaderboard_names {
            self.queue_rank(&mut batch, name, member, score, member_data);
        }
        self.store.execute(batch).await?;

        debug!(
            leaderboards = leaderboard_names.len(),
            member, score, "Ranked member across leaderboards"
        );
        Ok(())
    }

    fn queue_rank(
        &self,
        batch: &mut Batch,
        leaderboard_name: &str,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) {
        batch.queue(StoreOp::Add {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
            score,
        });
        if let Some(data) = member_data {
            batch.queue(StoreOp::HashSet {
                key: self.member_data_key(leaderboard_name),
                field: member.to_string(),
                value: data.to_string(),
            });
        }
    }

    // ============= Conditional ranking =============

    pub async fn read_rank_condition(
        &self,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<PendingRank> {
        self.read_rank_condition_in(&self.name, member, score, member_data)
            .await
    }

    /// Read the member's current score and describe the write that would
    /// follow.
    pub async fn read_rank_condition_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<PendingRank> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let current_score = self.store.score(leaderboard_name, member).await?;
        Ok(PendingRank {
            leaderboard_name: leaderboard_name.to_string(),
            condition: RankCondition {
                member: member.to_string(),
                current_score,
                score,
                member_data: member_data.map(str::to_string),
                reverse: self.options.reverse,
            },
        })
    }

    /// Write the pending rank if `predicate` holds. Returns whether it wrote.
    pub async fn commit_rank_if<F>(&self, pending: PendingRank, predicate: F) -> Result<bool>
    where
        F: FnOnce(&RankCondition) -> bool,
    {
        if !predicate(&pending.condition) {
            debug!(
                leaderboard = %pending.leaderboard_name,
                member = %pending.condition.member,
                "Rank condition rejected"
            );
            return Ok(false);
        }

        let condition = pending.condition;
        self.rank_member_in(
            &pending.leaderboard_name,
            &condition.member,
            condition.score,
            condition.member_data.as_deref(),
        )
        .await?;
        Ok(true)
    }

    pub async fn rank_member_if<F>(
        &self,
        predicate: F,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<bool>
    where
        F: FnOnce(&RankCondition) -> bool,
    {
        self.rank_member_if_in(&self.name, predicate, member, score, member_data)
            .await
    }

    /// Read, then write if `predicate` holds. Two round trips, not atomic.
    pub async fn rank_member_if_in<F>(
        &self,
        leaderboard_name: &str,
        predicate: F,
        member: &str,
        score: f64,
        member_data: Option<&str>,
    ) -> Result<bool>
    where
        F: FnOnce(&RankCondition) -> bool,
    {
        let pending = self
            .read_rank_condition_in(leaderboard_name, member, score, member_data)
            .await?;
        self.commit_rank_if(pending, predicate).await
    }

    // ============= Bulk =============

    pub async fn rank_members(&self, members: &[MemberScore]) -> Result<()> {
        self.rank_members_in(&self.name, members).await
    }

    /// One add per member, all in one batch. Member data is not touched.
    pub async fn rank_members_in(&self, leaderboard_name: &str, members: &[MemberScore]) -> Result<()> {
        validate_name(leaderboard_name)?;
        for entry in members {
            validate_member(&entry.member)?;
        }
        if members.is_empty() {
            return Ok(());
        }

        let batch: Batch = members
            .iter()
            .map(|entry| StoreOp::Add {
                key: leaderboard_name.to_string(),
                member: entry.member.clone(),
                score: entry.score,
            })
            .collect();
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, count = members.len(), "Ranked members");
        Ok(())
    }

    // ============= Score changes =============

    pub async fn change_score_for(
        &self,
        member: &str,
        delta: f64,
        member_data: Option<&str>,
    ) -> Result<f64> {
        self.change_score_for_in(&self.name, member, delta, member_data)
            .await
    }

    /// Add `delta` to the member's score (starting from 0 when unranked) and
    /// update its data in the same batch. Returns the new score.
    pub async fn change_score_for_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        delta: f64,
        member_data: Option<&str>,
    ) -> Result<f64> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::Increment {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
            delta,
        });
        if let Some(data) = member_data {
            batch.queue(StoreOp::HashSet {
                key: self.member_data_key(leaderboard_name),
                field: member.to_string(),
                value: data.to_string(),
            });
        }

        let mut replies = Replies::execute(self.store.as_ref(), batch).await?;
        let score = replies.next()?.into_score()?.ok_or_else(|| {
            LeaderboardError::Store(leaderboard_store::StoreError::UnexpectedReply {
                expected: "score",
                got: "nil".to_string(),
            })
        })?;

        debug!(leaderboard = leaderboard_name, member, delta, score, "Changed score");
        Ok(score)
    }

    // ============= Member data =============

    pub async fn update_member_data(&self, member: &str, member_data: &str) -> Result<()> {
        self.update_member_data_in(&self.name, member, member_data)
            .await
    }

    pub async fn update_member_data_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        member_data: &str,
    ) -> Result<()> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        self.store
            .hash_set(&self.member_data_key(leaderboard_name), member, member_data)
            .await?;
        Ok(())
    }

    pub async fn remove_member_data(&self, member: &str) -> Result<bool> {
        self.remove_member_data_in(&self.name, member).await
    }

    /// Returns whether any data was removed.
    pub async fn remove_member_data_in(&self, leaderboard_name: &str, member: &str) -> Result<bool> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let removed = self
            .store
            .hash_delete(&self.member_data_key(leaderboard_name), member)
            .await?;
        Ok(removed > 0)
    }

    // ============= Removal =============

    pub async fn remove_member(&self, member: &str) -> Result<()> {
        self.remove_member_from(&self.name, member).await
    }

    /// Remove the member and its data in one batch.
    pub async fn remove_member_from(&self, leaderboard_name: &str, member: &str) -> Result<()> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::Remove {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
        });
        batch.queue(StoreOp::HashDelete {
            key: self.member_data_key(leaderboard_name),
            field: member.to_string(),
        });
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, member, "Removed member");
        Ok(())
    }

    pub async fn remove_members_in_score_range(&self, min_score: f64, max_score: f64) -> Result<u64> {
        self.remove_members_in_score_range_in(&self.name, min_score, max_score)
            .await
    }

    /// Inclusive on both bounds. Member data is left in place.
    pub async fn remove_members_in_score_range_in(
        &self,
        leaderboard_name: &str,
        min_score: f64,
        max_score: f64,
    ) -> Result<u64> {
        validate_name(leaderboard_name)?;

        let removed = self
            .store
            .remove_range_by_score(leaderboard_name, min_score, max_score)
            .await?;
        debug!(leaderboard = leaderboard_name, removed, "Removed members in score range");
        Ok(removed)
    }

    pub async fn remove_members_outside_rank(&self, rank: usize) -> Result<u64> {
        self.remove_members_outside_rank_in(&self.name, rank).await
    }

    /// Keep the best `rank` members and remove the rest.
    pub async fn remove_members_outside_rank_in(
        &self,
        leaderboard_name: &str,
        rank: usize,
    ) -> Result<u64> {
        validate_name(leaderboard_name)?;

        let rank = isize::try_from(rank).unwrap_or(isize::MAX);
        // Ranks here are ascending store ranks: the worst members sit at the
        // low end of a normal board and at the high end of a reverse one.
        let (start, stop) = if self.options.reverse {
            (rank, -1)
        } else {
            (0, -rank - 1)
        };

        let removed = self
            .store
            .remove_range_by_rank(leaderboard_name, start, stop)
            .await?;
        debug!(leaderboard = leaderboard_name, removed, "Removed members outside rank");
        Ok(removed)
    }

    // ============= Lifetime =============

    pub async fn expire_leaderboard(&self, ttl: Duration) -> Result<()> {
        self.expire_leaderboard_in(&self.name, ttl).await
    }

    /// Expire the leaderboard and its member data after `ttl`.
    pub async fn expire_leaderboard_in(&self, leaderboard_name: &str, ttl: Duration) -> Result<()> {
        validate_name(leaderboard_name)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::ExpireIn {
            key: leaderboard_name.to_string(),
            ttl,
        });
        batch.queue(StoreOp::ExpireIn {
            key: self.member_data_key(leaderboard_name),
            ttl,
        });
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, ttl_secs = ttl.as_secs(), "Set leaderboard expiry");
        Ok(())
    }

    pub async fn expire_leaderboard_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.expire_leaderboard_at_in(&self.name, at).await
    }

    pub async fn expire_leaderboard_at_in(
        &self,
        leaderboard_name: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        validate_name(leaderboard_name)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::ExpireAt {
            key: leaderboard_name.to_string(),
            at,
        });
        batch.queue(StoreOp::ExpireAt {
            key: self.member_data_key(leaderboard_name),
            at,
        });
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, %at, "Set leaderboard expiry");
        Ok(())
    }

    pub async fn delete_leaderboard(&self) -> Result<()> {
        self.delete_leaderboard_in(&self.name).await
    }

    /// Delete the ordered set and its member data in one batch.
    pub async fn delete_leaderboard_in(&self, leaderboard_name: &str) -> Result<()> {
        validate_name(leaderboard_name)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::Delete {
            key: leaderboard_name.to_string(),
        });
        batch.queue(StoreOp::Delete {
            key: self.member_data_key(leaderboard_name),
        });
        self.store.execute(batch).await?;

        debug!(leaderboard = leaderboard_name, "Deleted leaderboard");
        Ok(())
    }
}
