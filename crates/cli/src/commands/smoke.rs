use std::time::Instant;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use adpulse_core::config::{AppConfig, LoadOptions};
use adpulse_core::{
    budget_totals, AccountId, AdId, AdSetId, Budget, CacheKey, CampaignId, CampaignSnapshot,
    DatePreset, DateRange, EntityStatus, FeedRecord, FeedSet, FeedSnapshot, PerformanceRow,
    Platform, ReportEngine, ResultCache, RevenueSource, SelectionCascade, SelectionKey,
    SelectionState,
};
use adpulse_sync::{SyncGuard, SyncRejection};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    checks.push(timed("config_validation", check_config));
    checks.push(timed("priority_merge", check_priority_merge));
    checks.push(timed("cache_containment", check_cache_containment));
    checks.push(timed("selection_cascade", check_selection_cascade));
    checks.push(timed("budget_exclusivity", check_budget_exclusivity));
    checks.push(timed("sync_guard", check_sync_guard));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn timed(name: &'static str, check: impl FnOnce() -> Result<String, String>) -> SmokeCheck {
    let started = Instant::now();
    let (status, message) = match check() {
        Ok(message) => (SmokeStatus::Pass, message),
        Err(message) => (SmokeStatus::Fail, message),
    };
    SmokeCheck { name, status, elapsed_ms: started.elapsed().as_millis() as u64, message }
}

fn check_config() -> Result<String, String> {
    AppConfig::load(LoadOptions::default())
        .map(|_| "configuration loaded and validated".to_string())
        .map_err(|error| error.to_string())
}

fn fixture_row(ad: &str, conversions: i64, revenue: i64) -> PerformanceRow {
    PerformanceRow {
        ad_id: AdId(ad.to_string()),
        ad_set_id: AdSetId(format!("{ad}-set")),
        campaign_id: CampaignId("cmp-demo".to_string()),
        account_id: AccountId("acct-demo".to_string()),
        platform: Platform::Meta,
        date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap_or_default(),
        impressions: 10_000,
        clicks: 300,
        spend: Decimal::from(200),
        platform_conversions: Decimal::from(conversions),
        platform_revenue: Decimal::from(revenue),
        ad_status: EntityStatus::Active,
        ad_set_status: EntityStatus::Active,
        campaign_status: EntityStatus::Active,
        campaign_budget: Budget { daily: Some(Decimal::from(150)), lifetime: None },
        ad_set_budget: Budget::default(),
    }
}

fn check_priority_merge() -> Result<String, String> {
    let rows = vec![fixture_row("ad-demo", 10, 500)];
    let snapshot = CampaignSnapshot::from_rows(&rows);
    let mut selection = SelectionCascade::new();
    selection.select_all(&snapshot);

    let pixel = FeedSnapshot::from_records([(
        AdId("ad-demo".to_string()),
        FeedRecord::new(Decimal::from(7), Decimal::from(300)),
    )]);

    let engine = ReportEngine::new(RevenueSource::Pixel);
    let view =
        engine.portfolio(&rows, &selection, &FeedSet { pixel: Some(&pixel), ..FeedSet::none() });

    let entity = view.entities.first().ok_or("expected one reconciled entity")?;
    if entity.verified.conversions != Decimal::from(7)
        || entity.verified.revenue != Decimal::from(350)
    {
        return Err(format!(
            "verified bucket mismatch: {} conversions / {} revenue",
            entity.verified.conversions, entity.verified.revenue
        ));
    }
    if view.totals.conversions != Decimal::from(10) || view.totals.revenue != Decimal::from(500) {
        return Err(format!(
            "deduplicated totals mismatch: {} conversions / {} revenue",
            view.totals.conversions, view.totals.revenue
        ));
    }
    Ok("verified 7/$350, platform-only 3/$150, no double counting".to_string())
}

fn check_cache_containment() -> Result<String, String> {
    let mut cache = ResultCache::new();
    let key = CacheKey::account(AccountId("acct-demo".to_string()));
    let fetched_at = Utc
        .with_ymd_and_hms(2025, 6, 15, 9, 0, 0)
        .single()
        .ok_or("fixture timestamp should resolve")?;
    cache.put(key.clone(), Vec::new(), DateRange::Preset(DatePreset::Last30d), fetched_at);

    if cache.lookup(&key, &DateRange::Preset(DatePreset::Last7d)).is_none() {
        return Err("last_30d entry should serve last_7d".to_string());
    }
    if cache.lookup(&key, &DateRange::Preset(DatePreset::Last90d)).is_some() {
        return Err("last_30d entry must not serve last_90d".to_string());
    }
    Ok("wider presets serve narrower requests, never the reverse".to_string())
}

fn check_selection_cascade() -> Result<String, String> {
    let mut rows = vec![fixture_row("ad-1", 1, 10), fixture_row("ad-2", 1, 10)];
    for row in &mut rows {
        row.ad_set_budget = Budget { daily: Some(Decimal::from(40)), lifetime: None };
        row.campaign_budget = Budget::default();
    }
    let snapshot = CampaignSnapshot::from_rows(&rows);
    let campaign_id = CampaignId("cmp-demo".to_string());

    let mut cascade = SelectionCascade::new();
    cascade.select_all(&snapshot);
    cascade.toggle(
        SelectionKey::AdSet { campaign: campaign_id.clone(), ad_set: AdSetId("ad-1-set".to_string()) },
        &snapshot,
    );

    let campaign =
        snapshot.campaign(&campaign_id).ok_or("fixture campaign should be present")?;
    if cascade.campaign_state(campaign) != SelectionState::Partial {
        return Err("expected partial tri-state after deselecting one sibling".to_string());
    }
    if cascade.is_selected(&SelectionKey::Campaign(campaign_id)) {
        return Err("campaign key must be removed on partial selection".to_string());
    }
    Ok("tri-state derives from sibling membership".to_string())
}

fn check_budget_exclusivity() -> Result<String, String> {
    let mut row = fixture_row("ad-1", 1, 10);
    row.ad_set_budget = Budget { daily: Some(Decimal::from(45)), lifetime: None };
    let rows = vec![row];
    let snapshot = CampaignSnapshot::from_rows(&rows);
    let mut cascade = SelectionCascade::new();
    cascade.select_all(&snapshot);

    let totals = budget_totals(&snapshot, &cascade);
    if totals.by_ownership.cbo != Decimal::ZERO {
        return Err("campaign budget must not count alongside ABO budgets".to_string());
    }
    if totals.total != Decimal::from(45) {
        return Err(format!("expected ABO-only total of 45, got {}", totals.total));
    }
    Ok("CBO and ABO ceilings never counted together".to_string())
}

fn check_sync_guard() -> Result<String, String> {
    let start =
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).single().ok_or("fixture timestamp")?;
    let mut guard = SyncGuard::new(Duration::seconds(120));

    guard.try_begin(start).map_err(|error| error.to_string())?;
    match guard.try_begin(start + Duration::seconds(1)) {
        Err(SyncRejection::InFlight) => {}
        other => return Err(format!("expected in-flight drop, got {other:?}")),
    }

    guard.settle(start + Duration::seconds(10));
    match guard.try_begin(start + Duration::seconds(60)) {
        Err(SyncRejection::CoolingDown { .. }) => {}
        other => return Err(format!("expected cooldown rejection, got {other:?}")),
    }
    guard
        .try_begin(start + Duration::seconds(140))
        .map_err(|error| format!("cooldown should have elapsed: {error}"))?;

    Ok("concurrent syncs drop, cooldown enforced".to_string())
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
