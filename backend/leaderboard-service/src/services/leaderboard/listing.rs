use super::{validate_member, validate_name, Leaderboard, RequestOptions, SortBy};
use crate::error::Result;
use crate::models::RankInfo;
use tracing::debug;

fn store_index(value: u64) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

impl Leaderboard {
    // ============= Pages =============

    pub async fn leaders(&self, page: u64, options: Option<&RequestOptions>) -> Result<Vec<RankInfo>> {
        self.leaders_in(&self.name, page, options).await
    }

    /// One page of the board in rank order. Pages start at 1; lower values
    /// are treated as 1.
    pub async fn leaders_in(
        &self,
        leaderboard_name: &str,
        page: u64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;
        let resolved = self.request_options(options);

        let page = page.max(1);
        let page_size = resolved.page_size as u64;
        let start = (page - 1).saturating_mul(page_size);
        let stop = start.saturating_add(page_size - 1);

        let members = self
            .store
            .range_by_rank(
                leaderboard_name,
                store_index(start),
                store_index(stop),
                self.options.rank_order(),
            )
            .await?;

        debug!(leaderboard = leaderboard_name, page, count = members.len(), "Fetched leaders");
        self.ranked_in_list_in(leaderboard_name, members, Some(&resolved))
            .await
    }

    pub async fn all_leaders(&self, options: Option<&RequestOptions>) -> Result<Vec<RankInfo>> {
        self.all_leaders_in(&self.name, options).await
    }

    /// Every member in rank order.
    pub async fn all_leaders_in(
        &self,
        leaderboard_name: &str,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;

        let members = self
            .store
            .range_by_rank(leaderboard_name, 0, -1, self.options.rank_order())
            .await?;
        self.ranked_in_list_in(leaderboard_name, members, options)
            .await
    }

    // ============= Ranges =============

    pub async fn members_from_score_range(
        &self,
        min_score: f64,
        max_score: f64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        self.members_from_score_range_in(&self.name, min_score, max_score, options)
            .await
    }

    /// Members scoring within `min_score..=max_score`, best first.
    pub async fn members_from_score_range_in(
        &self,
        leaderboard_name: &str,
        min_score: f64,
        max_score: f64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;

        let members = self
            .store
            .range_by_score(
                leaderboard_name,
                min_score,
                max_score,
                self.options.rank_order(),
            )
            .await?;
        self.ranked_in_list_in(leaderboard_name, members, options)
            .await
    }

    pub async fn members_from_rank_range(
        &self,
        start_rank: i64,
        end_rank: i64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        self.members_from_rank_range_in(&self.name, start_rank, end_rank, options)
            .await
    }

    /// Members ranked `start_rank..=end_rank` (1-based). The range is clamped
    /// to the board; an inverted range yields nothing.
    pub async fn members_from_rank_range_in(
        &self,
        leaderboard_name: &str,
        start_rank: i64,
        end_rank: i64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;

        let start = start_rank.saturating_sub(1).max(0);
        let total = self.store.count(leaderboard_name).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        let last = i64::try_from(total - 1).unwrap_or(i64::MAX);
        let stop = end_rank.saturating_sub(1).min(last);
        if stop < start {
            return Ok(Vec::new());
        }

        let members = self
            .store
            .range_by_rank(
                leaderboard_name,
                store_index(start as u64),
                store_index(stop as u64),
                self.options.rank_order(),
            )
            .await?;
        self.ranked_in_list_in(leaderboard_name, members, options)
            .await
    }

    pub async fn top(&self, count: u64, options: Option<&RequestOptions>) -> Result<Vec<RankInfo>> {
        self.top_in(&self.name, count, options).await
    }

    /// The best `count` members.
    pub async fn top_in(
        &self,
        leaderboard_name: &str,
        count: u64,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        let end_rank = i64::try_from(count).unwrap_or(i64::MAX);
        self.members_from_rank_range_in(leaderboard_name, 1, end_rank, options)
            .await
    }

    // ============= Positions =============

    pub async fn member_at(
        &self,
        position: u64,
        options: Option<&RequestOptions>,
    ) -> Result<Option<RankInfo>> {
        self.member_at_in(&self.name, position, options).await
    }

    /// Member ranked at `position` (1-based), fetched through its page.
    pub async fn member_at_in(
        &self,
        leaderboard_name: &str,
        position: u64,
        options: Option<&RequestOptions>,
    ) -> Result<Option<RankInfo>> {
        validate_name(leaderboard_name)?;
        if position == 0 || position > self.store.count(leaderboard_name).await? {
            return Ok(None);
        }

        // The in-page offset only holds for rows in rank order.
        let mut resolved = self.request_options(options);
        resolved.sort_by = SortBy::Rank;

        let page_size = resolved.page_size as u64;
        let page = position.div_ceil(page_size);
        let offset = ((position - 1) % page_size) as usize;

        let rows = self
            .leaders_in(leaderboard_name, page, Some(&resolved))
            .await?;
        Ok(rows.into_iter().nth(offset))
    }

    pub async fn around_me(&self, member: &str, options: Option<&RequestOptions>) -> Result<Vec<RankInfo>> {
        self.around_me_in(&self.name, member, options).await
    }

    /// One page of members centred on `member`. Empty when the member is
    /// not ranked.
    pub async fn around_me_in(
        &self,
        leaderboard_name: &str,
        member: &str,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<RankInfo>> {
        validate_name(leaderboard_name)?;
        validate_member(member)?;

        let order = self.options.rank_order();
        let Some(index) = self.store.rank(leaderboard_name, member, order).await? else {
            return Ok(Vec::new());
        };

        let resolved = self.request_options(options);
        let page_size = resolved.page_size as u64;
        let start = index.saturating_sub(page_size / 2);
        let stop = start.saturating_add(page_size - 1);

        let members = self
            .store
            .range_by_rank(leaderboard_name, store_index(start), store_index(stop), order)
            .await?;

        debug!(leaderboard = leaderboard_name, member, start, stop, "Fetched members around");
        self.ranked_in_list_in(leaderboard_name, members, Some(&resolved))
            .await
    }
}
