use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::row::AdId;

/// The independent conversion-tracking sources the reconciler knows about.
/// All of them produce the same `FeedSnapshot` shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Pixel,
    Ecommerce,
    Manual,
}

impl FeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pixel => "pixel",
            Self::Ecommerce => "ecommerce",
            Self::Manual => "manual",
        }
    }
}

/// One entity's observation for a reporting window. Conversions may be
/// fractional under multi-touch credit models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    #[serde(default)]
    pub conversions: Decimal,
    #[serde(default)]
    pub revenue: Decimal,
}

impl FeedRecord {
    pub fn new(conversions: Decimal, revenue: Decimal) -> Self {
        Self { conversions, revenue }
    }

    fn normalize(mut self) -> Self {
        self.conversions = self.conversions.max(Decimal::ZERO);
        self.revenue = self.revenue.max(Decimal::ZERO);
        self
    }
}

/// Per-entity observations from one feed for one reporting window.
///
/// A feed that is not configured, or saw nothing, is an empty snapshot,
/// never an error. The snapshot keeps its own aggregate so portfolio totals
/// can be read from the feed side even for entities the current row
/// selection no longer contains.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    records: BTreeMap<AdId, FeedRecord>,
}

impl FeedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = (AdId, FeedRecord)>) -> Self {
        let mut snapshot = Self::new();
        for (ad_id, record) in records {
            snapshot.insert(ad_id, record);
        }
        snapshot
    }

    pub fn insert(&mut self, ad_id: AdId, record: FeedRecord) {
        self.records.insert(ad_id, record.normalize());
    }

    /// Absent entities read as a zero record, matching the rule that a
    /// missing feed entry and a zero observation are indistinguishable.
    pub fn get(&self, ad_id: &AdId) -> FeedRecord {
        self.records.get(ad_id).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AdId, &FeedRecord)> {
        self.records.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The feed's own portfolio aggregate over every entity it observed.
    pub fn totals(&self) -> FeedRecord {
        let mut totals = FeedRecord::default();
        for record in self.records.values() {
            totals.conversions += record.conversions;
            totals.revenue += record.revenue;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{FeedRecord, FeedSnapshot};
    use crate::domain::row::AdId;

    #[test]
    fn absent_entity_reads_as_zero_record() {
        let snapshot = FeedSnapshot::new();
        let record = snapshot.get(&AdId("ad-missing".to_string()));
        assert_eq!(record.conversions, Decimal::ZERO);
        assert_eq!(record.revenue, Decimal::ZERO);
    }

    #[test]
    fn insert_clamps_negative_observations() {
        let mut snapshot = FeedSnapshot::new();
        snapshot.insert(
            AdId("ad-1".to_string()),
            FeedRecord::new(Decimal::new(-3, 0), Decimal::new(-10_00, 2)),
        );

        let record = snapshot.get(&AdId("ad-1".to_string()));
        assert_eq!(record.conversions, Decimal::ZERO);
        assert_eq!(record.revenue, Decimal::ZERO);
    }

    #[test]
    fn totals_cover_every_observed_entity() {
        let snapshot = FeedSnapshot::from_records([
            (AdId("ad-1".to_string()), FeedRecord::new(Decimal::from(2), Decimal::from(80))),
            (AdId("ad-2".to_string()), FeedRecord::new(Decimal::from(5), Decimal::from(120))),
        ]);

        let totals = snapshot.totals();
        assert_eq!(totals.conversions, Decimal::from(7));
        assert_eq!(totals.revenue, Decimal::from(200));
    }
}
