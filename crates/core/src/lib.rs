pub mod budget;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod reconcile;
pub mod selection;
pub mod store;

pub use budget::{budget_totals, BudgetOwnership, BudgetTotals, OwnershipBreakdown};
pub use cache::{CacheEntry, CacheKey, ResultCache};
pub use domain::daterange::{DatePreset, DateRange};
pub use domain::feed::{FeedKind, FeedRecord, FeedSnapshot};
pub use domain::row::{
    AccountId, AdId, AdSetId, Budget, CampaignId, EntityStatus, PerformanceRow, Platform,
};
pub use engine::{rows_for_request, PortfolioView, ReportEngine};
pub use errors::{ApplicationError, DomainError};
pub use metrics::AggregateTotals;
pub use reconcile::{
    BaseTotals, Bucket, FeedSet, PortfolioReport, ReconciledEntity, Reconciler, RevenueSource,
};
pub use selection::{
    AdSetNode, CampaignNode, CampaignSnapshot, SelectionCascade, SelectionKey, SelectionState,
};
pub use store::{PerformanceRowStore, QueryScope};
