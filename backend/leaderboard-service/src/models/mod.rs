use serde::{Deserialize, Serialize};

/// One row of a leaderboard query.
///
/// `position` is the 1-based rank; `None` means the member was not found in
/// the ordered set when the query ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankInfo {
    pub member: String,
    pub score: Option<f64>,
    pub position: Option<u64>,
    pub member_data: Option<String>,
}

impl RankInfo {
    /// Row carrying only the member identifier.
    pub fn member_only(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            score: None,
            position: None,
            member_data: None,
        }
    }
}

/// Member and score pair for bulk writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberScore {
    pub member: String,
    pub score: f64,
}

impl MemberScore {
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Input to the predicate of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub struct RankCondition {
    pub member: String,
    /// Score currently stored, `None` if the member is not ranked yet.
    pub current_score: Option<f64>,
    /// Score that would be written.
    pub score: f64,
    pub member_data: Option<String>,
    pub reverse: bool,
}

impl RankCondition {
    /// True when `score` would improve on the stored score under the
    /// leaderboard's sort order, or when nothing is stored yet.
    pub fn is_improvement(&self) -> bool {
        match self.current_score {
            None => true,
            Some(current) if self.reverse => self.score < current,
            Some(current) => self.score > current,
        }
    }
}
