//! Turning raw member lists into ranked rows

use super::{validate_name, Leaderboard, Replies, RequestOptions, SortBy};
use crate::error::Result;
use crate::models::RankInfo;
use leaderboard_store::{Batch, StoreOp};
use std::cmp::Ordering;
use tracing::debug;

impl Leaderboard {
    pub async fn ranked_in_list(
        &self,
        members: Vec<String>,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        self.ranked_in_list_in(&self.name, members, options).await
    }

    /// Resolve rank, score and optionally member data for `members`.
    ///
    /// Rank and score come from one batch. Members that are no longer ranked
    /// by the time it runs are dropped from the result.
    pub async fn ranked_in_list_in(
        &self,
        leaderboard_name: &str,
        members: Vec<String>,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;
        let options = self.request_options(options);

        if options.members_only {
            return Ok(members.into_iter().map(RankInfo::member_only).collect());
        }
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let order = self.options.rank_order();
        let mut batch = Batch::new();
        for member in &members {
            batch.queue(StoreOp::Rank {
                key: leaderboard_name.to_string(),
                member: member.clone(),
                order,
            });
            batch.queue(StoreOp::Score {
                key: leaderboard_name.to_string(),
                member: member.clone(),
            });
        }

        let requested = members.len();
        let mut replies = Replies::execute(self.store.as_ref(), batch).await?;
        let mut rows = Vec::with_capacity(requested);
        for member in members {
            let rank = replies.next()?.into_rank()?;
            let score = replies.next()?.into_score()?;
            if let Some(index) = rank {
                rows.push(RankInfo {
                    member,
                    score,
                    position: Some(index + 1),
                    member_data: None,
                });
            }
        }

        if rows.len() < requested {
            debug!(
                leaderboard = leaderboard_name,
                dropped = requested - rows.len(),
                "Dropped members removed during listing"
            );
        }

        if options.with_member_data && !rows.is_empty() {
            let names: Vec<String> = rows.iter().map(|row| row.member.clone()).collect();
            let mut data = self.members_data_for_in(leaderboard_name, &names).await?;
            for row in &mut rows {
                row.member_data = data.remove(&row.member);
            }
        }

        sort_rows(&mut rows, options.sort_by);
        Ok(rows)
    }
}

/// Stable sort of assembled rows. Rows without a position or score go last.
pub(crate) fn sort_rows(rows: &mut [RankInfo], sort_by: SortBy) {
    match sort_by {
        SortBy::Rank => rows.sort_by(|a, b| nulls_last(a.position, b.position, |x, y| x.cmp(&y))),
        SortBy::Score => rows.sort_by(|a, b| nulls_last(a.score, b.score, |x, y| x.total_cmp(&y))),
        SortBy::None => {}
    }
}

fn nulls_last<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: FnOnce(T, T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
