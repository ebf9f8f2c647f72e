//! Leaderboard and per-request options

use leaderboard_store::Order;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MEMBER_DATA_NAMESPACE: &str = "member_data";

/// Configuration bound to a leaderboard handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardOptions {
    /// Page length for paginated queries. Always at least 1.
    pub page_size: usize,
    /// Rank 1 is the lowest score when set.
    pub reverse: bool,
    pub member_data_namespace: String,
    /// Share one member-data hash across every leaderboard.
    pub global_member_data: bool,
    /// Carried through merges, not used for ranking.
    pub member_key: Option<String>,
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reverse: false,
            member_data_namespace: DEFAULT_MEMBER_DATA_NAMESPACE.to_string(),
            global_member_data: false,
            member_key: None,
        }
    }
}

impl LeaderboardOptions {
    /// Defaults overridden by whichever values are given. A page size below 1
    /// is ignored.
    pub fn new(
        page_size: Option<usize>,
        reverse: Option<bool>,
        global_member_data: Option<bool>,
        member_data_namespace: Option<String>,
    ) -> Self {
        let mut options = Self::default();
        if let Some(page_size) = page_size.filter(|size| *size >= 1) {
            options.page_size = page_size;
        }
        if let Some(reverse) = reverse {
            options.reverse = reverse;
        }
        if let Some(global) = global_member_data {
            options.global_member_data = global;
        }
        if let Some(namespace) = member_data_namespace {
            options.member_data_namespace = namespace;
        }
        options
    }

    /// Overwrite every field where `other` differs. Blank namespaces, page
    /// sizes below 1 and absent member keys never overwrite.
    pub fn merge(&mut self, other: Option<&LeaderboardOptions>) {
        let Some(other) = other else {
            return;
        };

        if other.page_size >= 1 && other.page_size != self.page_size {
            self.page_size = other.page_size;
        }
        if other.reverse != self.reverse {
            self.reverse = other.reverse;
        }
        if !other.member_data_namespace.is_empty()
            && other.member_data_namespace != self.member_data_namespace
        {
            self.member_data_namespace = other.member_data_namespace.clone();
        }
        if other.global_member_data != self.global_member_data {
            self.global_member_data = other.global_member_data;
        }
        if other.member_key.is_some() {
            self.member_key = other.member_key.clone();
        }
    }

    /// Hash key holding member data for `leaderboard_name`.
    /// Format: {leaderboard_name}:{namespace}, or {namespace} when global.
    pub fn member_data_key(&self, leaderboard_name: &str) -> String {
        if self.global_member_data {
            self.member_data_namespace.clone()
        } else {
            format!("{}:{}", leaderboard_name, self.member_data_namespace)
        }
    }

    /// `page_size`, or the configured page size when it is below 1.
    pub fn validate_page_size(&self, page_size: usize) -> usize {
        if page_size < 1 {
            self.page_size.max(1)
        } else {
            page_size
        }
    }

    /// Store order in which rank 1 comes first.
    pub fn rank_order(&self) -> Order {
        if self.reverse {
            Order::Ascending
        } else {
            Order::Descending
        }
    }
}

/// Ordering applied to assembled result rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Rank,
    Score,
    /// Keep store order.
    None,
}

impl SortBy {
    /// Case-insensitive; anything unrecognised keeps store order.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rank" => SortBy::Rank,
            "score" => SortBy::Score,
            _ => SortBy::None,
        }
    }
}

impl<'de> Deserialize<'de> for SortBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SortBy::from_name(&raw))
    }
}

/// Display options for a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    pub with_member_data: bool,
    /// 0 falls back to the leaderboard's page size.
    pub page_size: usize,
    /// Return bare member identifiers without rank, score or data.
    pub members_only: bool,
    pub sort_by: SortBy,
    /// Reserved. Rows for members that vanished mid-query are always dropped.
    pub include_missing: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            with_member_data: false,
            page_size: 0,
            members_only: false,
            sort_by: SortBy::Rank,
            include_missing: true,
        }
    }
}

impl RequestOptions {
    /// Take every field from `other`.
    pub fn merge(&mut self, other: Option<&RequestOptions>) {
        if let Some(other) = other {
            self.with_member_data = other.with_member_data;
            self.page_size = other.page_size;
            self.members_only = other.members_only;
            self.sort_by = other.sort_by;
            self.include_missing = other.include_missing;
        }
    }

    /// Defaults with `options` merged on top.
    pub fn resolve(options: Option<&RequestOptions>) -> Self {
        let mut resolved = Self::default();
        resolved.merge(options);
        resolved
    }
}
