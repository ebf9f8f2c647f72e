//! Leaderboard ranking engine
//!
//! A [`Leaderboard`] is a cheap handle: a store, a bound leaderboard name and
//! the options that apply to it. Nothing is cached between calls; every
//! operation goes to the store, and every multi-command write is submitted
//! as one [`Batch`] so no other writer interleaves with it.
//!
//! Each operation has an `*_in` form taking an explicit leaderboard name and,
//! where it makes sense, a bound form that uses the handle's own name.

mod assembly;
mod listing;
mod multi_board;
mod options;
mod queries;
mod writes;

pub use options::{
    LeaderboardOptions, RequestOptions, SortBy, DEFAULT_MEMBER_DATA_NAMESPACE, DEFAULT_PAGE_SIZE,
};
pub use writes::PendingRank;

use crate::error::{LeaderboardError, Result};
use leaderboard_store::{Batch, LeaderboardStore, Reply, StoreError};
use std::sync::Arc;

pub struct Leaderboard {
    store: Arc<dyn LeaderboardStore>,
    name: String,
    options: LeaderboardOptions,
}

impl Leaderboard {
    /// Bind a handle to `name`. A blank name is rejected.
    pub fn new(
        store: Arc<dyn LeaderboardStore>,
        name: impl Into<String>,
        options: LeaderboardOptions,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;

        Ok(Self {
            store,
            name,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &LeaderboardOptions {
        &self.options
    }

    /// Merge `other` into the bound options.
    pub fn merge_options(&mut self, other: Option<&LeaderboardOptions>) {
        self.options.merge(other);
    }

    fn member_data_key(&self, leaderboard_name: &str) -> String {
        self.options.member_data_key(leaderboard_name)
    }

    /// Request options resolved against the handle's page size.
    fn request_options(&self, options: Option<&RequestOptions>) -> RequestOptions {
        let mut resolved = RequestOptions::resolve(options);
        resolved.page_size = self.options.validate_page_size(resolved.page_size);
        resolved
    }

    fn effective_page_size(&self, page_size: Option<usize>) -> usize {
        self.options
            .validate_page_size(page_size.unwrap_or(self.options.page_size))
    }
}

fn validate_name(leaderboard_name: &str) -> Result<()> {
    if leaderboard_name.trim().is_empty() {
        return Err(LeaderboardError::invalid("leaderboard name must not be blank"));
    }
    Ok(())
}

fn validate_member(member: &str) -> Result<()> {
    if member.trim().is_empty() {
        return Err(LeaderboardError::invalid("member must not be blank"));
    }
    Ok(())
}

/// Replies of an executed batch, consumed in queue order.
struct Replies(std::vec::IntoIter<Reply>);

impl Replies {
    async fn execute(store: &dyn LeaderboardStore, batch: Batch) -> Result<Self> {
        let replies = store.execute(batch).await?;
        Ok(Self(replies.into_iter()))
    }

    fn next(&mut self) -> Result<Reply> {
        self.0.next().ok_or_else(|| {
            LeaderboardError::Store(StoreError::UnexpectedReply {
                expected: "reply",
                got: "end of batch".to_string(),
            })
        })
    }
}
