use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use adpulse_core::cache::ResultCache;
use adpulse_core::domain::daterange::DateRange;
use adpulse_core::domain::row::{AccountId, PerformanceRow};
use adpulse_core::engine::rows_for_request;
use adpulse_core::store::{PerformanceRowStore, QueryScope};

use crate::guard::{SyncGuard, SyncRejection};
use crate::sources::{PerformanceSource, SourceError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Rejected(#[from] SyncRejection),
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl From<SyncError> for adpulse_core::ApplicationError {
    fn from(value: SyncError) -> Self {
        adpulse_core::ApplicationError::Source(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub sync_id: Uuid,
    pub rows_loaded: usize,
    /// True when the account context changed while the fetch was in flight
    /// and the result was thrown away instead of applied.
    pub discarded: bool,
}

/// Which account or workspace the operator is currently looking at. Shared
/// with in-flight syncs so a result landing after a context switch can be
/// recognized and discarded.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    scope: Arc<RwLock<Option<QueryScope>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_scope(&self, scope: QueryScope) {
        *self.scope.write().await = Some(scope);
    }

    pub async fn scope(&self) -> Option<QueryScope> {
        self.scope.read().await.clone()
    }

    /// With no scope set there is nothing to contradict, so every account is
    /// considered current.
    pub async fn covers(&self, account: &AccountId) -> bool {
        match &*self.scope.read().await {
            Some(scope) => scope.contains(account),
            None => true,
        }
    }
}

/// Owns the row store, the result cache, and one guard per account, and runs
/// the sync lifecycle: guard begin, cache eviction, fetch, context check,
/// store replacement, guard settle.
pub struct SyncOrchestrator<S> {
    source: S,
    store: PerformanceRowStore,
    cache: ResultCache,
    guards: HashMap<AccountId, SyncGuard>,
    cooldown: Duration,
    context: SessionContext,
}

impl<S: PerformanceSource> SyncOrchestrator<S> {
    pub fn new(source: S, cooldown: Duration, context: SessionContext) -> Self {
        Self {
            source,
            store: PerformanceRowStore::new(),
            cache: ResultCache::new(),
            guards: HashMap::new(),
            cooldown,
            context,
        }
    }

    pub fn store(&self) -> &PerformanceRowStore {
        &self.store
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The read path every screen goes through: cache hit narrowed to the
    /// requested window, or a synchronous recompute from the row store.
    pub fn query(
        &mut self,
        scope: &QueryScope,
        range: &DateRange,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<PerformanceRow> {
        rows_for_request(&mut self.cache, &self.store, scope, range, today, now)
    }

    pub async fn run_sync(
        &mut self,
        account: AccountId,
        range: DateRange,
        today: NaiveDate,
    ) -> Result<SyncOutcome, SyncError> {
        let sync_id = Uuid::new_v4();
        let cooldown = self.cooldown;
        let guard =
            self.guards.entry(account.clone()).or_insert_with(|| SyncGuard::new(cooldown));

        if let Err(rejection) = guard.try_begin(Utc::now()) {
            warn!(
                event_name = "sync.rejected",
                correlation_id = %sync_id,
                account_id = %account.0,
                reason = %rejection,
                "sync request dropped"
            );
            return Err(rejection.into());
        }

        // Evict before fetching so a stale entry is never served mid-sync.
        self.cache.evict_account(&account);
        info!(
            event_name = "sync.started",
            correlation_id = %sync_id,
            account_id = %account.0,
            "platform sync started"
        );

        let result = self.source.fetch_rows(&account, &range, today).await;
        let settled_at = Utc::now();
        if let Some(guard) = self.guards.get_mut(&account) {
            guard.settle(settled_at);
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(error) => {
                warn!(
                    event_name = "sync.failed",
                    correlation_id = %sync_id,
                    account_id = %account.0,
                    error = %error,
                    "platform sync failed, keeping last-known-good rows"
                );
                return Err(error.into());
            }
        };

        if !self.context.covers(&account).await {
            info!(
                event_name = "sync.discarded",
                correlation_id = %sync_id,
                account_id = %account.0,
                "account context changed mid-flight, result discarded"
            );
            return Ok(SyncOutcome { sync_id, rows_loaded: 0, discarded: true });
        }

        let rows_loaded = rows.len();
        self.store.replace(account.clone(), rows);
        info!(
            event_name = "sync.completed",
            correlation_id = %sync_id,
            account_id = %account.0,
            rows_loaded,
            "platform sync applied"
        );
        Ok(SyncOutcome { sync_id, rows_loaded, discarded: false })
    }
}
