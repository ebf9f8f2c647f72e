use super::{validate_name, Leaderboard};
use crate::error::{LeaderboardError, Result};
use leaderboard_store::{Aggregate, SetOperation};
use tracing::debug;

impl Leaderboard {
    /// Write the union of `sources` into `destination`. Returns the size of
    /// the destination. Member data is not combined.
    pub async fn union_leaderboards(
        &self,
        destination: &str,
        sources: &[String],
        aggregate: Aggregate,
    ) -> Result<u64> {
        self.combine_leaderboards(SetOperation::Union, destination, sources, aggregate)
            .await
    }

    /// Write the members present in every source into `destination`.
    pub async fn intersect_leaderboards(
        &self,
        destination: &str,
        sources: &[String],
        aggregate: Aggregate,
    ) -> Result<u64> {
        self.combine_leaderboards(SetOperation::Intersect, destination, sources, aggregate)
            .await
    }

    async fn combine_leaderboards(
        &self,
        operation: SetOperation,
        destination: &str,
        sources: &[String],
        aggregate: Aggregate,
    ) -> Result<u64> {
        validate_name(destination)?;
        if sources.is_empty() {
            return Err(LeaderboardError::invalid("at least one source leaderboard is required"));
        }
        for source in sources {
            validate_name(source)?;
        }

        let size = self
            .store
            .combine_and_store(operation, destination, sources, aggregate)
            .await?;

        debug!(
            destination,
            sources = sources.len(),
            ?operation,
            aggregate = aggregate.as_str(),
            size,
            "Combined leaderboards"
        );
        Ok(size)
    }
}
