use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::daterange::DateRange;
use crate::domain::row::{AccountId, PerformanceRow};
use crate::store::QueryScope;

/// Cache keys are namespaced by whether they describe a single account or a
/// sorted workspace account list, so an account query and a workspace query
/// touching the same accounts can never alias.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Account(AccountId),
    Workspace(Vec<AccountId>),
}

impl CacheKey {
    pub fn account(id: AccountId) -> Self {
        Self::Account(id)
    }

    pub fn workspace(mut accounts: Vec<AccountId>) -> Self {
        accounts.sort();
        accounts.dedup();
        Self::Workspace(accounts)
    }

    pub fn from_scope(scope: &QueryScope) -> Self {
        match scope {
            QueryScope::Account(id) => Self::Account(id.clone()),
            QueryScope::Workspace(ids) => Self::workspace(ids.clone()),
        }
    }

    /// Whether a sync for `account` must evict this entry.
    pub fn covers(&self, account: &AccountId) -> bool {
        match self {
            Self::Account(id) => id == account,
            Self::Workspace(ids) => ids.iter().any(|id| id == account),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub rows: Vec<PerformanceRow>,
    pub range: DateRange,
    pub fetched_at: DateTime<Utc>,
}

/// Staleness-aware result cache. Historical data for a fixed window is
/// immutable, so entries never expire by wall-clock time: validity is decided
/// by range containment and entries are dropped only by explicit eviction
/// when a sync lands.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn put(
        &mut self,
        key: CacheKey,
        rows: Vec<PerformanceRow>,
        range: DateRange,
        fetched_at: DateTime<Utc>,
    ) {
        self.entries.insert(key, CacheEntry { rows, range, fetched_at });
    }

    /// `get` plus the containment rule; returns the entry only when it may be
    /// served for `requested`. Never fails; a miss means the caller
    /// recomputes from the row store.
    pub fn lookup(&self, key: &CacheKey, requested: &DateRange) -> Option<&CacheEntry> {
        self.get(key).filter(|entry| Self::is_valid(entry, requested))
    }

    /// An identical descriptor is always valid. Otherwise a cached named
    /// preset that spans at least as many calendar days as the requested
    /// named preset is valid, since the wider window can be narrowed
    /// client-side. Custom ranges only ever match themselves.
    pub fn is_valid(entry: &CacheEntry, requested: &DateRange) -> bool {
        if entry.range == *requested {
            return true;
        }
        match (entry.range.preset(), requested.preset()) {
            (Some(cached), Some(requested)) => cached.span_days() >= requested.span_days(),
            _ => false,
        }
    }

    pub fn evict(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Drops the account's own entry and every workspace entry the account
    /// participates in. Runs before a sync's fetch so a stale read is never
    /// served mid-sync.
    pub fn evict_account(&mut self, account: &AccountId) {
        self.entries.retain(|key, _| !key.covers(account));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
