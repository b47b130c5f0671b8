use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::feed::{FeedRecord, FeedSnapshot};
use crate::domain::row::{AdId, PerformanceRow};

/// Which feed is the designated ground truth for conversions and revenue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    Pixel,
    Ecommerce,
}

/// One deduplication bucket: conversions plus the revenue attributed to them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub conversions: Decimal,
    pub revenue: Decimal,
}

impl Bucket {
    fn new(conversions: Decimal, revenue: Decimal) -> Self {
        Self { conversions, revenue }
    }
}

/// Per-entity reconciled output. The platform's original observation is kept
/// alongside the merged figures so a consumer can render "platform saw 12,
/// we counted 15".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconciledEntity {
    pub ad_id: AdId,
    pub spend: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub platform_conversions: Decimal,
    pub platform_revenue: Decimal,
    pub verified: Bucket,
    pub feed_only: Bucket,
    pub platform_only: Bucket,
    pub manual: Bucket,
    pub conversions: Decimal,
    pub revenue: Decimal,
}

/// Base metric sums over a reconciled selection, before ratio derivation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseTotals {
    pub spend: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: Decimal,
    pub revenue: Decimal,
    pub platform_conversions: Decimal,
    pub platform_revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub entities: Vec<ReconciledEntity>,
    pub totals: BaseTotals,
}

/// The attribution feeds available for one reporting window. A feed that is
/// absent behaves exactly like an empty snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeedSet<'a> {
    pub pixel: Option<&'a FeedSnapshot>,
    pub ecommerce: Option<&'a FeedSnapshot>,
    pub manual: Option<&'a FeedSnapshot>,
}

impl<'a> FeedSet<'a> {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Priority Merge deduplication across the ad platform's own reporting and
/// the attribution feeds.
///
/// Per entity: spend comes exclusively from platform rows; the overlap
/// between platform and feed counts is "verified" and takes its revenue from
/// the platform side; the excess on either side keeps its own source's
/// proportional revenue; manually-logged events add on top unconditionally.
/// Portfolio totals are sums of per-entity results; the min/max split is
/// never re-run at the aggregate level, which would reintroduce double
/// counting across entities that individually had no overlap.
#[derive(Clone, Copy, Debug)]
pub struct Reconciler {
    revenue_source: RevenueSource,
}

impl Reconciler {
    pub fn new(revenue_source: RevenueSource) -> Self {
        Self { revenue_source }
    }

    pub fn revenue_source(&self) -> RevenueSource {
        self.revenue_source
    }

    pub fn reconcile(&self, rows: &[PerformanceRow], feeds: &FeedSet<'_>) -> PortfolioReport {
        let empty = FeedSnapshot::new();
        let pixel = feeds.pixel.unwrap_or(&empty);
        let ecommerce = feeds.ecommerce.unwrap_or(&empty);
        let manual = feeds.manual.unwrap_or(&empty);

        let platform_sides = sum_platform_sides(rows);

        let mut entities = Vec::with_capacity(platform_sides.len());
        for (ad_id, side) in platform_sides {
            let entity = match self.revenue_source {
                RevenueSource::Pixel => merge_entity(ad_id.clone(), &side, pixel.get(&ad_id)),
                RevenueSource::Ecommerce => {
                    ground_truth_entity(ad_id.clone(), &side, ecommerce.get(&ad_id))
                }
            };
            entities.push(apply_manual(entity, manual.get(&ad_id)));
        }

        let mut totals = BaseTotals::default();
        for entity in &entities {
            totals.spend += entity.spend;
            totals.impressions += entity.impressions;
            totals.clicks += entity.clicks;
            totals.conversions += entity.conversions;
            totals.revenue += entity.revenue;
            totals.platform_conversions += entity.platform_conversions;
            totals.platform_revenue += entity.platform_revenue;
        }

        if self.revenue_source == RevenueSource::Ecommerce {
            // The storefront's aggregate is already deduplicated upstream and
            // counts revenue it attributes to ads the platform no longer
            // shows, so portfolio conversions/revenue are read from the
            // feed's own totals instead of the selected-entity sum. Manual
            // events stay additive.
            let feed_totals = ecommerce.totals();
            totals.conversions = feed_totals.conversions;
            totals.revenue = feed_totals.revenue;
            for entity in &entities {
                totals.conversions += entity.manual.conversions;
                totals.revenue += entity.manual.revenue;
            }
        }

        PortfolioReport { entities, totals }
    }
}

struct PlatformSide {
    spend: Decimal,
    impressions: u64,
    clicks: u64,
    conversions: Decimal,
    revenue: Decimal,
}

fn sum_platform_sides(rows: &[PerformanceRow]) -> BTreeMap<AdId, PlatformSide> {
    let mut sides: BTreeMap<AdId, PlatformSide> = BTreeMap::new();
    for row in rows {
        let side = sides.entry(row.ad_id.clone()).or_insert_with(|| PlatformSide {
            spend: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
            conversions: Decimal::ZERO,
            revenue: Decimal::ZERO,
        });
        side.spend += row.spend;
        side.impressions += row.impressions;
        side.clicks += row.clicks;
        side.conversions += row.platform_conversions;
        side.revenue += row.platform_revenue;
    }
    sides
}

/// The min/max split for one entity against the pixel-style feed.
///
/// Guarantees reconciled conversions == max(platform, feed): verified +
/// feed_only + platform_only collapses to the larger single observation.
fn merge_entity(
    ad_id: AdId,
    side: &PlatformSide,
    feed: FeedRecord,
) -> ReconciledEntity {
    let platform_n = side.conversions;
    let feed_n = feed.conversions;

    let verified_n = platform_n.min(feed_n);
    let feed_only_n = (feed_n - platform_n).max(Decimal::ZERO);
    let platform_only_n = (platform_n - feed_n).max(Decimal::ZERO);

    // Verified revenue is drawn from the platform side even when the feed's
    // average order value differs; scenario-level product policy, not a
    // derived necessity.
    let verified = Bucket::new(verified_n, proportion(verified_n, platform_n, side.revenue));
    let feed_only = Bucket::new(feed_only_n, proportion(feed_only_n, feed_n, feed.revenue));
    let platform_only =
        Bucket::new(platform_only_n, proportion(platform_only_n, platform_n, side.revenue));

    let conversions = verified.conversions + feed_only.conversions + platform_only.conversions;
    let revenue = verified.revenue + feed_only.revenue + platform_only.revenue;

    ReconciledEntity {
        ad_id,
        spend: side.spend,
        impressions: side.impressions,
        clicks: side.clicks,
        platform_conversions: side.conversions,
        platform_revenue: side.revenue,
        verified,
        feed_only,
        platform_only,
        manual: Bucket::default(),
        conversions,
        revenue,
    }
}

/// E-commerce ground-truth mode: the split is bypassed and the feed's
/// per-entity figures are taken as-is. Spend stays platform-side.
fn ground_truth_entity(
    ad_id: AdId,
    side: &PlatformSide,
    feed: FeedRecord,
) -> ReconciledEntity {
    ReconciledEntity {
        ad_id,
        spend: side.spend,
        impressions: side.impressions,
        clicks: side.clicks,
        platform_conversions: side.conversions,
        platform_revenue: side.revenue,
        verified: Bucket::default(),
        feed_only: Bucket::default(),
        platform_only: Bucket::default(),
        manual: Bucket::default(),
        conversions: feed.conversions,
        revenue: feed.revenue,
    }
}

/// Offline events neither automated source could see: added on top without
/// participating in the split.
fn apply_manual(
    mut entity: ReconciledEntity,
    manual: FeedRecord,
) -> ReconciledEntity {
    entity.manual = Bucket::new(manual.conversions, manual.revenue);
    entity.conversions += manual.conversions;
    entity.revenue += manual.revenue;
    entity
}

fn proportion(part: Decimal, whole: Decimal, amount: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        amount * part / whole
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{FeedSet, Reconciler, RevenueSource};
    use crate::domain::feed::{FeedRecord, FeedSnapshot};
    use crate::domain::row::{
        AccountId, AdId, AdSetId, Budget, CampaignId, EntityStatus, PerformanceRow, Platform,
    };

    fn row(ad: &str, conversions: i64, revenue: i64) -> PerformanceRow {
        PerformanceRow {
            ad_id: AdId(ad.to_string()),
            ad_set_id: AdSetId(format!("{ad}-set")),
            campaign_id: CampaignId(format!("{ad}-cmp")),
            account_id: AccountId("acct-1".to_string()),
            platform: Platform::Meta,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            impressions: 1_000,
            clicks: 50,
            spend: Decimal::from(100),
            platform_conversions: Decimal::from(conversions),
            platform_revenue: Decimal::from(revenue),
            ad_status: EntityStatus::Active,
            ad_set_status: EntityStatus::Active,
            campaign_status: EntityStatus::Active,
            campaign_budget: Budget::default(),
            ad_set_budget: Budget::default(),
        }
    }

    fn pixel(entries: &[(&str, i64, i64)]) -> FeedSnapshot {
        FeedSnapshot::from_records(entries.iter().map(|(ad, conversions, revenue)| {
            (
                AdId(ad.to_string()),
                FeedRecord::new(Decimal::from(*conversions), Decimal::from(*revenue)),
            )
        }))
    }

    #[test]
    fn platform_ahead_of_feed_splits_verified_and_platform_only() {
        // Platform reports 10 conversions / $500; pixel reports 7 / $300.
        let rows = vec![row("ad-a", 10, 500)];
        let feed = pixel(&[("ad-a", 7, 300)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        let entity = &report.entities[0];

        assert_eq!(entity.verified.conversions, Decimal::from(7));
        assert_eq!(entity.verified.revenue, Decimal::from(350));
        assert_eq!(entity.platform_only.conversions, Decimal::from(3));
        assert_eq!(entity.platform_only.revenue, Decimal::from(150));
        assert_eq!(entity.feed_only.conversions, Decimal::ZERO);
        assert_eq!(entity.conversions, Decimal::from(10));
        assert_eq!(entity.revenue, Decimal::from(500));
    }

    #[test]
    fn feed_ahead_of_platform_keeps_platform_side_verified_revenue() {
        // Platform reports 10 / $500; pixel reports 15 / $900. Verified
        // revenue is 10/10 x 500, not 10/15 x 900.
        let rows = vec![row("ad-a", 10, 500)];
        let feed = pixel(&[("ad-a", 15, 900)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        let entity = &report.entities[0];

        assert_eq!(entity.verified.conversions, Decimal::from(10));
        assert_eq!(entity.verified.revenue, Decimal::from(500));
        assert_eq!(entity.feed_only.conversions, Decimal::from(5));
        assert_eq!(entity.feed_only.revenue, Decimal::from(300));
        assert_eq!(entity.platform_only.conversions, Decimal::ZERO);
        assert_eq!(entity.conversions, Decimal::from(15));
        assert_eq!(entity.revenue, Decimal::from(800));
    }

    #[test]
    fn missing_feed_reduces_to_platform_values() {
        let rows = vec![row("ad-a", 4, 210)];
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report = reconciler.reconcile(&rows, &FeedSet::none());
        let entity = &report.entities[0];

        assert_eq!(entity.conversions, Decimal::from(4));
        assert_eq!(entity.revenue, Decimal::from(210));
        assert_eq!(entity.feed_only.conversions, Decimal::ZERO);
    }

    #[test]
    fn zero_platform_side_reduces_to_feed_values() {
        let rows = vec![row("ad-a", 0, 0)];
        let feed = pixel(&[("ad-a", 6, 240)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        let entity = &report.entities[0];

        assert_eq!(entity.conversions, Decimal::from(6));
        assert_eq!(entity.revenue, Decimal::from(240));
        assert_eq!(entity.verified.conversions, Decimal::ZERO);
        assert_eq!(entity.verified.revenue, Decimal::ZERO);
    }

    #[test]
    fn spend_comes_only_from_platform_rows() {
        let rows = vec![row("ad-a", 2, 100)];
        let feed = pixel(&[("ad-a", 9, 999)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        assert_eq!(report.totals.spend, Decimal::from(100));
        assert_eq!(report.entities[0].spend, Decimal::from(100));
    }

    #[test]
    fn manual_events_add_on_top_of_the_split() {
        let rows = vec![row("ad-a", 10, 500)];
        let feed = pixel(&[("ad-a", 7, 300)]);
        let manual = pixel(&[("ad-a", 2, 80)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report = reconciler.reconcile(
            &rows,
            &FeedSet { pixel: Some(&feed), manual: Some(&manual), ..FeedSet::none() },
        );
        let entity = &report.entities[0];

        assert_eq!(entity.manual.conversions, Decimal::from(2));
        assert_eq!(entity.conversions, Decimal::from(12));
        assert_eq!(entity.revenue, Decimal::from(580));
    }

    #[test]
    fn ecommerce_mode_reads_portfolio_totals_from_the_feed_aggregate() {
        // "ad-gone" was deleted on the platform side but the storefront
        // still attributes revenue to it.
        let rows = vec![row("ad-a", 10, 500)];
        let ecommerce = pixel(&[("ad-a", 8, 400), ("ad-gone", 3, 150)]);
        let reconciler = Reconciler::new(RevenueSource::Ecommerce);

        let report = reconciler
            .reconcile(&rows, &FeedSet { ecommerce: Some(&ecommerce), ..FeedSet::none() });

        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.entities[0].conversions, Decimal::from(8));
        assert_eq!(report.entities[0].revenue, Decimal::from(400));
        assert_eq!(report.totals.conversions, Decimal::from(11));
        assert_eq!(report.totals.revenue, Decimal::from(550));
        assert_eq!(report.totals.spend, Decimal::from(100));
    }

    #[test]
    fn totals_are_per_entity_sums_not_a_re_merge() {
        // ad-a: platform ahead (10 vs 7); ad-b: feed ahead (2 vs 9). A
        // re-merge at the aggregate level (12 vs 16 -> 16) would drop the
        // 3 platform-only conversions of ad-a.
        let rows = vec![row("ad-a", 10, 500), row("ad-b", 2, 100)];
        let feed = pixel(&[("ad-a", 7, 300), ("ad-b", 9, 450)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });

        let entity_sum: Decimal =
            report.entities.iter().map(|entity| entity.conversions).sum();
        assert_eq!(report.totals.conversions, entity_sum);
        assert_eq!(report.totals.conversions, Decimal::from(19));
    }

    #[test]
    fn pixel_entities_without_rows_are_excluded() {
        let rows = vec![row("ad-a", 1, 50)];
        let feed = pixel(&[("ad-a", 1, 50), ("ad-filtered-out", 99, 9_999)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.totals.conversions, Decimal::ONE);
    }

    #[test]
    fn multi_day_rows_sum_before_the_split() {
        let mut day_two = row("ad-a", 4, 200);
        day_two.date = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");
        let rows = vec![row("ad-a", 6, 300), day_two];
        let feed = pixel(&[("ad-a", 7, 300)]);
        let reconciler = Reconciler::new(RevenueSource::Pixel);

        let report =
            reconciler.reconcile(&rows, &FeedSet { pixel: Some(&feed), ..FeedSet::none() });
        let entity = &report.entities[0];

        // platform_n = 10 across both days; verified = 7 of 10 at $500.
        assert_eq!(entity.platform_conversions, Decimal::from(10));
        assert_eq!(entity.verified.revenue, Decimal::from(350));
        assert_eq!(entity.conversions, Decimal::from(10));
    }
}
