use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdSetId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Meta,
    Google,
    Tiktok,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    Paused,
}

impl EntityStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Budget ceiling as reported by the platform. Presence of either field means
/// the entity owns a budget at its level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub daily: Option<Decimal>,
    #[serde(default)]
    pub lifetime: Option<Decimal>,
}

impl Budget {
    pub fn is_set(&self) -> bool {
        self.daily.is_some() || self.lifetime.is_some()
    }
}

/// One ad, one account-local calendar day of platform-reported performance.
///
/// Rows are immutable once stored; a sync supersedes the full per-account row
/// set rather than mutating rows in place. Numeric fields missing from a
/// source payload deserialize to zero so one malformed record never rejects a
/// whole batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub ad_id: AdId,
    pub ad_set_id: AdSetId,
    pub campaign_id: CampaignId,
    pub account_id: AccountId,
    pub platform: Platform,
    pub date: NaiveDate,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub spend: Decimal,
    #[serde(default)]
    pub platform_conversions: Decimal,
    #[serde(default)]
    pub platform_revenue: Decimal,
    pub ad_status: EntityStatus,
    pub ad_set_status: EntityStatus,
    pub campaign_status: EntityStatus,
    #[serde(default)]
    pub campaign_budget: Budget,
    #[serde(default)]
    pub ad_set_budget: Budget,
}

impl PerformanceRow {
    /// Clamps negative money and count fields to zero. Platforms occasionally
    /// report negative adjustments; the engine treats those as zero rather
    /// than letting them corrupt downstream sums.
    pub fn normalize(mut self) -> Self {
        self.spend = self.spend.max(Decimal::ZERO);
        self.platform_conversions = self.platform_conversions.max(Decimal::ZERO);
        self.platform_revenue = self.platform_revenue.max(Decimal::ZERO);
        self
    }
}
