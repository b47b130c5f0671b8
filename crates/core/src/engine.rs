use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::{budget_totals, BudgetTotals};
use crate::cache::{CacheKey, ResultCache};
use crate::domain::daterange::DateRange;
use crate::domain::row::PerformanceRow;
use crate::metrics::AggregateTotals;
use crate::reconcile::{FeedSet, ReconciledEntity, Reconciler, RevenueSource};
use crate::selection::{CampaignSnapshot, SelectionCascade};
use crate::store::{PerformanceRowStore, QueryScope};

/// Everything a dashboard screen needs for one selection and window. Built
/// through one path so a single ad's row and a thousand-ad portfolio total
/// can never disagree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioView {
    pub entities: Vec<ReconciledEntity>,
    pub totals: AggregateTotals,
    pub budgets: BudgetTotals,
}

/// Resolves the row set for a request: a valid cache entry narrowed
/// client-side to the requested bounds, or a synchronous recompute from the
/// row store (which is then cached for the next screen).
pub fn rows_for_request(
    cache: &mut ResultCache,
    store: &PerformanceRowStore,
    scope: &QueryScope,
    range: &DateRange,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<PerformanceRow> {
    let key = CacheKey::from_scope(scope);

    if let Some(entry) = cache.lookup(&key, range) {
        let (since, until) = range.bounds(today);
        return entry
            .rows
            .iter()
            .filter(|row| since <= row.date && row.date <= until)
            .cloned()
            .collect();
    }

    let rows = store.rows_for(scope, range, today);
    cache.put(key, rows.clone(), range.clone(), now);
    rows
}

#[derive(Clone, Copy, Debug)]
pub struct ReportEngine {
    reconciler: Reconciler,
}

impl ReportEngine {
    pub fn new(revenue_source: RevenueSource) -> Self {
        Self { reconciler: Reconciler::new(revenue_source) }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Selection filter, then the priority merge, then derived metrics and
    /// budget totals.
    pub fn portfolio(
        &self,
        rows: &[PerformanceRow],
        selection: &SelectionCascade,
        feeds: &FeedSet<'_>,
    ) -> PortfolioView {
        let snapshot = CampaignSnapshot::from_rows(rows);
        let selected = selection.filter_rows(rows);
        let report = self.reconciler.reconcile(&selected, feeds);

        PortfolioView {
            entities: report.entities,
            totals: AggregateTotals::from_base(&report.totals),
            budgets: budget_totals(&snapshot, selection),
        }
    }
}
