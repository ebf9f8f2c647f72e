use super::{validate_member, validate_name, Leaderboard, Replies};
use crate::error::Result;
use crate::models::RankInfo;
use leaderboard_store::{Batch, Order, StoreOp};
use std::collections::HashMap;
use tracing::debug;

impl Leaderboard {
    // ============= Point lookups =============

    pub async fn rank_for(&self, member: &str) -> Result<Option<u64>> {
        self.rank_for_in(&self.name, member).await
    }

    /// 1-based rank under the board's sort order, `None` when unranked.
    pub async fn rank_for_in(&self, leaderboard_name: &str, member: &str) -> Result<Option<u64>> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let rank = self
            .store
            .rank(leaderboard_name, member, self.options.rank_order())
            .await?;
        Ok(rank.map(|index| index + 1))
    }

    pub async fn score_for(&self, member: &str) -> Result<Option<f64>> {
        self.score_for_in(&self.name, member).await
    }

    pub async fn score_for_in(&self, leaderboard_name: &str, member: &str) -> Result<Option<f64>> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        Ok(self.store.score(leaderboard_name, member).await?)
    }

    pub async fn member_exists(&self, member: &str) -> Result<bool> {
        self.member_exists_in(&self.name, member).await
    }

    pub async fn member_exists_in(&self, leaderboard_name: &str, member: &str) -> Result<bool> {
        Ok(self.score_for_in(leaderboard_name, member).await?.is_some())
    }

    pub async fn score_and_rank(&self, member: &str) -> Result<RankInfo> {
        self.score_and_rank_in(&self.name, member).await
    }

    /// Score and rank read in one batch. Both are `None` when unranked.
    pub async fn score_and_rank_in(&self, leaderboard_name: &str, member: &str) -> Result<RankInfo> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::Score {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
        });
        batch.queue(StoreOp::Rank {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
            order: self.options.rank_order(),
        });

        let mut replies = Replies::execute(self.store.as_ref(), batch).await?;
        let score = replies.next()?.into_score()?;
        let rank = replies.next()?.into_rank()?;

        Ok(RankInfo {
            member: member.to_string(),
            score,
            position: rank.map(|index| index + 1),
            member_data: None,
        })
    }

    // ============= Member data =============

    pub async fn member_data_for(&self, member: &str) -> Result<Option<String>> {
        self.member_data_for_in(&self.name, member).await
    }

    pub async fn member_data_for_in(
        &self,
        leaderboard_name: &str,
        member: &str,
    ) -> Result<Option<String>> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        Ok(self
            .store
            .hash_get(&self.member_data_key(leaderboard_name), member)
            .await?)
    }

    /// Data of every listed member, fetched in one batch. Members without
    /// data are absent from the map.
    pub async fn members_data_for_in(
        &self,
        leaderboard_name: &str,
        members: &[String],
    ) -> Result<HashMap<String, String>> {
        validate_name(leaderboard_name)?;
        if members.is_empty() {
            return Ok(HashMap::new());
        }

        let key = self.member_data_key(leaderboard_name);
        let batch: Batch = members
            .iter()
            .map(|member| StoreOp::HashGet {
                key: key.clone(),
                field: member.clone(),
            })
            .collect();

        let mut replies = Replies::execute(self.store.as_ref(), batch).await?;
        let mut data = HashMap::with_capacity(members.len());
        for member in members {
            if let Some(value) = replies.next()?.into_value()? {
                data.insert(member.clone(), value);
            }
        }
        Ok(data)
    }

    // ============= Cardinality =============

    pub async fn total_members(&self) -> Result<u64> {
        self.total_members_in(&self.name).await
    }

    pub async fn total_members_in(&self, leaderboard_name: &str) -> Result<u64> {
        validate_name(leaderboard_name)?;
        Ok(self.store.count(leaderboard_name).await?)
    }

    pub async fn total_members_in_score_range(&self, min_score: f64, max_score: f64) -> Result<u64> {
        self.total_members_in_score_range_in(&self.name, min_score, max_score)
            .await
    }

    pub async fn total_members_in_score_range_in(
        &self,
        leaderboard_name: &str,
        min_score: f64,
        max_score: f64,
    ) -> Result<u64> {
        validate_name(leaderboard_name)?;
        Ok(self
            .store
            .count_by_score(leaderboard_name, min_score, max_score)
            .await?)
    }

    pub async fn total_pages(&self, page_size: Option<usize>) -> Result<u64> {
        self.total_pages_in(&self.name, page_size).await
    }

    /// Pages needed to list the whole board at `page_size`, or the board's
    /// own page size when not given.
    pub async fn total_pages_in(&self, leaderboard_name: &str, page_size: Option<usize>) -> Result<u64> {
        let page_size = self.effective_page_size(page_size) as u64;
        let total = self.total_members_in(leaderboard_name).await?;
        Ok(total.div_ceil(page_size))
    }

    pub async fn page_for(&self, member: &str, page_size: Option<usize>) -> Result<u64> {
        self.page_for_in(&self.name, member, page_size).await
    }

    /// Page holding the member, 0 when unranked.
    pub async fn page_for_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        page_size: Option<usize>,
    ) -> Result<u64> {
        let page_size = self.effective_page_size(page_size) as u64;
        let page = match self.rank_for_in(leaderboard_name, member).await? {
            Some(rank) => rank.div_ceil(page_size),
            None => 0,
        };
        Ok(page)
    }

    // ============= Percentiles =============

    pub async fn percentile_for(&self, member: &str) -> Result<f64> {
        self.percentile_for_in(&self.name, member).await
    }

    /// Share of the board the member outperforms, 0 to 100. Returns 0 when
    /// the member is unranked.
    pub async fn percentile_for_in(&self, leaderboard_name: &str, member: &str) -> Result<f64> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let mut batch = Batch::new();
        batch.queue(StoreOp::Count {
            key: leaderboard_name.to_string(),
        });
        // Always descending; reverse boards invert the result instead.
        batch.queue(StoreOp::Rank {
            key: leaderboard_name.to_string(),
            member: member.to_string(),
            order: Order::Descending,
        });

        let mut replies = Replies::execute(self.store.as_ref(), batch).await?;
        let count = replies.next()?.into_count()?;
        let Some(index) = replies.next()?.into_rank()? else {
            return Ok(0.0);
        };
        if count == 0 {
            return Ok(0.0);
        }

        let count = count as f64;
        let percentile = (count - index as f64 - 1.0) / count * 100.0;
        Ok(if self.options.reverse {
            100.0 - percentile
        } else {
            percentile
        })
    }

    pub async fn score_for_percentile(&self, percentile: f64) -> Result<f64> {
        self.score_for_percentile_in(&self.name, percentile).await
    }

    /// Score at `percentile`, interpolated between the two nearest members.
    /// Returns 0 for percentiles outside 0..=100 and for empty boards.
    pub async fn score_for_percentile_in(&self, leaderboard_name: &str, percentile: f64) -> Result<f64> {
        validate_name(leaderboard_name)?;
        if !(0.0..=100.0).contains(&percentile) {
            return Ok(0.0);
        }

        let total = self.store.count(leaderboard_name).await?;
        if total < 1 {
            return Ok(0.0);
        }

        let percentile = if self.options.reverse {
            100.0 - percentile
        } else {
            percentile
        };
        let index = (total - 1) as f64 * percentile / 100.0;
        let lower = index.floor();
        let upper = index.ceil();

        let entries = self
            .store
            .range_by_rank_with_scores(leaderboard_name, lower as isize, upper as isize)
            .await?;
        let score = match entries.as_slice() {
            [] => 0.0,
            [(_, only)] => *only,
            [(_, s0), (_, s1), ..] if upper > lower => s0 + (index - lower) * (s1 - s0),
            [(_, s0), ..] => *s0,
        };

        debug!(leaderboard = leaderboard_name, percentile, index, score, "Score for percentile");
        Ok(score)
    }
}
