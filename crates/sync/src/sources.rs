use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use adpulse_core::domain::daterange::DateRange;
use adpulse_core::domain::feed::{FeedKind, FeedSnapshot};
use adpulse_core::domain::row::{AccountId, PerformanceRow};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name} is unavailable: {message}")]
    Unavailable { source_name: String, message: String },
    #[error("{source_name} rejected the request: {message}")]
    Rejected { source_name: String, message: String },
}

/// Supplies a full replacement row set for one account and window. A failure
/// must leave the caller's last-known-good rows untouched.
#[async_trait]
pub trait PerformanceSource: Send + Sync {
    async fn fetch_rows(
        &self,
        account: &AccountId,
        range: &DateRange,
        today: NaiveDate,
    ) -> Result<Vec<PerformanceRow>, SourceError>;
}

/// Supplies one attribution feed's per-entity observations for a window.
#[async_trait]
pub trait AttributionSource: Send + Sync {
    fn kind(&self) -> FeedKind;

    async fn fetch_snapshot(
        &self,
        account: &AccountId,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<FeedSnapshot, SourceError>;
}

/// Feed failures are recovered at the engine boundary: the merge sees an
/// empty snapshot (zero contribution) and only the log carries the failure.
pub async fn snapshot_or_empty<S>(
    source: &S,
    account: &AccountId,
    since: NaiveDate,
    until: NaiveDate,
) -> FeedSnapshot
where
    S: AttributionSource + ?Sized,
{
    match source.fetch_snapshot(account, since, until).await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(
                event_name = "feed.fetch_failed",
                feed_kind = source.kind().as_str(),
                account_id = %account.0,
                error = %error,
                "attribution feed unavailable, continuing with empty snapshot"
            );
            FeedSnapshot::new()
        }
    }
}
