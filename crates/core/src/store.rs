use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::daterange::DateRange;
use crate::domain::row::{AccountId, PerformanceRow};

/// Which accounts a dashboard query covers: one selected account, or a
/// workspace grouping several. Workspace ids are kept sorted and deduplicated
/// so two scopes over the same accounts always compare equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryScope {
    Account(AccountId),
    Workspace(Vec<AccountId>),
}

impl QueryScope {
    pub fn account(id: AccountId) -> Self {
        Self::Account(id)
    }

    pub fn workspace(mut accounts: Vec<AccountId>) -> Self {
        accounts.sort();
        accounts.dedup();
        Self::Workspace(accounts)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        match self {
            Self::Account(id) => id == account,
            Self::Workspace(ids) => ids.iter().any(|id| id == account),
        }
    }
}

/// In-memory daily performance rows, keyed by account. A sync replaces the
/// full row set for its account; there is no partial-row mutation.
#[derive(Debug, Default)]
pub struct PerformanceRowStore {
    rows: HashMap<AccountId, Vec<PerformanceRow>>,
}

impl PerformanceRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, account: AccountId, rows: Vec<PerformanceRow>) {
        let rows = rows.into_iter().map(PerformanceRow::normalize).collect();
        self.rows.insert(account, rows);
    }

    pub fn account_row_count(&self, account: &AccountId) -> usize {
        self.rows.get(account).map_or(0, Vec::len)
    }

    /// Rows within scope whose date lies in the range's inclusive bounds.
    /// Dates are account-local calendar days, never UTC-shifted: ad platforms
    /// report in the account's timezone.
    pub fn rows_for(
        &self,
        scope: &QueryScope,
        range: &DateRange,
        today: NaiveDate,
    ) -> Vec<PerformanceRow> {
        let (since, until) = range.bounds(today);
        let mut selected = Vec::new();

        for (account, rows) in &self.rows {
            if !scope.contains(account) {
                continue;
            }
            selected.extend(
                rows.iter().filter(|row| since <= row.date && row.date <= until).cloned(),
            );
        }

        selected.sort_by(|a, b| (&a.ad_id, a.date).cmp(&(&b.ad_id, b.date)));
        selected
    }
}
