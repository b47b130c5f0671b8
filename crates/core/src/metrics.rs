use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reconcile::BaseTotals;

/// Portfolio totals with derived ratio metrics. Every ratio yields zero on a
/// zero denominator (never NaN, infinity, or null) so each display surface
/// renders the same number for the same selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub spend: Decimal,
    pub conversions: Decimal,
    pub revenue: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub roas: Decimal,
    pub cpm: Decimal,
    pub cpc: Decimal,
    pub cpa: Decimal,
    pub cost_per_result: Decimal,
    pub aov: Decimal,
    pub conversion_rate: Decimal,
}

impl AggregateTotals {
    pub fn from_base(base: &BaseTotals) -> Self {
        let impressions = Decimal::from(base.impressions);
        let clicks = Decimal::from(base.clicks);

        Self {
            spend: base.spend,
            conversions: base.conversions,
            revenue: base.revenue,
            impressions: base.impressions,
            clicks: base.clicks,
            roas: ratio(base.revenue, base.spend),
            cpm: ratio(base.spend * Decimal::from(1_000u32), impressions),
            cpc: ratio(base.spend, clicks),
            // CPA divides by the deduplicated count; cost-per-result divides
            // by the platform's own reported results, matching the platform
            // UI figure.
            cpa: ratio(base.spend, base.conversions),
            cost_per_result: ratio(base.spend, base.platform_conversions),
            aov: ratio(base.revenue, base.conversions),
            conversion_rate: ratio(base.conversions, clicks),
        }
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::AggregateTotals;
    use crate::reconcile::BaseTotals;

    #[test]
    fn derives_ratio_metrics_from_base_sums() {
        let totals = AggregateTotals::from_base(&BaseTotals {
            spend: Decimal::from(200),
            impressions: 50_000,
            clicks: 400,
            conversions: Decimal::from(20),
            revenue: Decimal::from(800),
            platform_conversions: Decimal::from(16),
            platform_revenue: Decimal::from(700),
        });

        assert_eq!(totals.roas, Decimal::from(4));
        assert_eq!(totals.cpm, Decimal::from(4));
        assert_eq!(totals.cpc, Decimal::new(5, 1));
        assert_eq!(totals.cpa, Decimal::from(10));
        assert_eq!(totals.cost_per_result, Decimal::new(125, 1));
        assert_eq!(totals.aov, Decimal::from(40));
        assert_eq!(totals.conversion_rate, Decimal::new(5, 2));
    }

    #[test]
    fn zero_denominators_yield_zero_not_nan_or_infinity() {
        let totals = AggregateTotals::from_base(&BaseTotals::default());

        assert_eq!(totals.roas, Decimal::ZERO);
        assert_eq!(totals.cpm, Decimal::ZERO);
        assert_eq!(totals.cpc, Decimal::ZERO);
        assert_eq!(totals.cpa, Decimal::ZERO);
        assert_eq!(totals.cost_per_result, Decimal::ZERO);
        assert_eq!(totals.aov, Decimal::ZERO);
        assert_eq!(totals.conversion_rate, Decimal::ZERO);
    }

    #[test]
    fn revenue_without_spend_still_reports_zero_roas() {
        let totals = AggregateTotals::from_base(&BaseTotals {
            revenue: Decimal::from(500),
            ..BaseTotals::default()
        });
        assert_eq!(totals.roas, Decimal::ZERO);
    }
}
