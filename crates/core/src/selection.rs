use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::row::{AdSetId, CampaignId, EntityStatus, PerformanceRow, Platform};

/// A selection entry: a whole campaign, or one ABO ad set. Composite ad-set
/// keys exist only for ad sets that own their budget; everything else follows
/// its campaign key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SelectionKey {
    Campaign(CampaignId),
    AdSet { campaign: CampaignId, ad_set: AdSetId },
}

/// Derived tri-state for a campaign's selection checkbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    All,
    Partial,
    None,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AdSetNode {
    pub id: AdSetId,
    pub status: EntityStatus,
    pub daily_budget: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CampaignNode {
    pub id: CampaignId,
    pub platform: Platform,
    pub status: EntityStatus,
    pub daily_budget: Option<Decimal>,
    /// Ad sets that own their budget. Empty for CBO campaigns; always empty
    /// for Google campaigns, which are CBO regardless of field presence.
    pub abo_ad_sets: Vec<AdSetNode>,
}

/// The campaign/ad-set tree visible in the current row data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CampaignSnapshot {
    campaigns: Vec<CampaignNode>,
}

impl CampaignSnapshot {
    pub fn from_rows(rows: &[PerformanceRow]) -> Self {
        struct AdSetAcc {
            status: EntityStatus,
            daily_budget: Option<Decimal>,
        }
        struct CampaignAcc {
            platform: Platform,
            status: EntityStatus,
            daily_budget: Option<Decimal>,
            ad_sets: BTreeMap<AdSetId, AdSetAcc>,
        }

        let mut campaigns: BTreeMap<CampaignId, CampaignAcc> = BTreeMap::new();
        for row in rows {
            let campaign =
                campaigns.entry(row.campaign_id.clone()).or_insert_with(|| CampaignAcc {
                    platform: row.platform,
                    status: row.campaign_status,
                    daily_budget: None,
                    ad_sets: BTreeMap::new(),
                });
            campaign.status = row.campaign_status;
            if let Some(daily) = row.campaign_budget.daily {
                campaign.daily_budget = Some(daily);
            }

            // Google reports no ad-set-level budgets that matter for
            // ownership, so its ad sets never become ABO nodes.
            if row.platform == Platform::Google || !row.ad_set_budget.is_set() {
                continue;
            }
            let ad_set = campaign.ad_sets.entry(row.ad_set_id.clone()).or_insert(AdSetAcc {
                status: row.ad_set_status,
                daily_budget: None,
            });
            ad_set.status = row.ad_set_status;
            if let Some(daily) = row.ad_set_budget.daily {
                ad_set.daily_budget = Some(daily);
            }
        }

        let campaigns = campaigns
            .into_iter()
            .map(|(id, acc)| CampaignNode {
                id,
                platform: acc.platform,
                status: acc.status,
                daily_budget: acc.daily_budget,
                abo_ad_sets: acc
                    .ad_sets
                    .into_iter()
                    .map(|(id, ad_set)| AdSetNode {
                        id,
                        status: ad_set.status,
                        daily_budget: ad_set.daily_budget,
                    })
                    .collect(),
            })
            .collect();

        Self { campaigns }
    }

    pub fn from_campaigns(campaigns: Vec<CampaignNode>) -> Self {
        Self { campaigns }
    }

    pub fn campaigns(&self) -> &[CampaignNode] {
        &self.campaigns
    }

    pub fn campaign(&self, id: &CampaignId) -> Option<&CampaignNode> {
        self.campaigns.iter().find(|campaign| &campaign.id == id)
    }
}

/// Tri-state tree selection over campaigns and ABO ad sets.
///
/// The campaign "partial" state is never stored: it is derived from sibling
/// composite-key membership, and the campaign key itself is present exactly
/// when every sibling ABO composite is present.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionCascade {
    selected: BTreeSet<SelectionKey>,
    known_campaigns: BTreeSet<CampaignId>,
    auto_select_enabled: bool,
}

impl Default for SelectionCascade {
    fn default() -> Self {
        Self { selected: BTreeSet::new(), known_campaigns: BTreeSet::new(), auto_select_enabled: true }
    }
}

impl SelectionCascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &BTreeSet<SelectionKey> {
        &self.selected
    }

    pub fn is_selected(&self, key: &SelectionKey) -> bool {
        self.selected.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn auto_select_enabled(&self) -> bool {
        self.auto_select_enabled
    }

    pub fn toggle(&mut self, key: SelectionKey, snapshot: &CampaignSnapshot) {
        match key {
            SelectionKey::Campaign(campaign_id) => self.toggle_campaign(campaign_id, snapshot),
            SelectionKey::AdSet { campaign, ad_set } => {
                self.toggle_ad_set(campaign, ad_set, snapshot);
            }
        }
        if !self.selected.is_empty() {
            self.auto_select_enabled = true;
        }
    }

    fn toggle_campaign(&mut self, campaign_id: CampaignId, snapshot: &CampaignSnapshot) {
        let key = SelectionKey::Campaign(campaign_id.clone());
        let abo_keys: Vec<SelectionKey> = snapshot
            .campaign(&campaign_id)
            .map(|campaign| {
                campaign
                    .abo_ad_sets
                    .iter()
                    .map(|ad_set| SelectionKey::AdSet {
                        campaign: campaign_id.clone(),
                        ad_set: ad_set.id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.selected.contains(&key) {
            self.selected.remove(&key);
            for abo_key in abo_keys {
                self.selected.remove(&abo_key);
            }
        } else {
            self.selected.insert(key);
            self.selected.extend(abo_keys);
        }
    }

    fn toggle_ad_set(
        &mut self,
        campaign_id: CampaignId,
        ad_set_id: AdSetId,
        snapshot: &CampaignSnapshot,
    ) {
        let Some(campaign) = snapshot.campaign(&campaign_id) else {
            return;
        };
        if !campaign.abo_ad_sets.iter().any(|ad_set| ad_set.id == ad_set_id) {
            return;
        }

        let key = SelectionKey::AdSet { campaign: campaign_id.clone(), ad_set: ad_set_id };
        if !self.selected.remove(&key) {
            self.selected.insert(key);
        }

        // The campaign key mirrors the all-siblings-selected condition; the
        // partial indicator is derived from sibling membership, not from the
        // campaign key's own presence.
        let all_present = campaign.abo_ad_sets.iter().all(|ad_set| {
            self.selected.contains(&SelectionKey::AdSet {
                campaign: campaign_id.clone(),
                ad_set: ad_set.id.clone(),
            })
        });
        let campaign_key = SelectionKey::Campaign(campaign_id);
        if all_present {
            self.selected.insert(campaign_key);
        } else {
            self.selected.remove(&campaign_key);
        }
    }

    pub fn select_all(&mut self, snapshot: &CampaignSnapshot) {
        self.selected.clear();
        self.populate_all(snapshot);
        self.auto_select_enabled = true;
    }

    /// Deselecting everything is remembered as a deliberate action so the
    /// next data load does not silently re-select.
    pub fn deselect_all(&mut self) {
        self.selected.clear();
        self.auto_select_enabled = false;
    }

    /// Called when new data arrives (sync completed, account switched).
    /// Empty selections auto-populate unless the user just cleared them;
    /// non-empty selections gain newly-appeared campaigns undisturbed.
    pub fn apply_snapshot(&mut self, snapshot: &CampaignSnapshot) {
        if self.selected.is_empty() {
            if self.auto_select_enabled {
                self.populate_all(snapshot);
            }
        } else {
            for campaign in snapshot.campaigns() {
                if !self.known_campaigns.contains(&campaign.id) {
                    self.insert_campaign(campaign);
                }
            }
        }
        self.known_campaigns =
            snapshot.campaigns().iter().map(|campaign| campaign.id.clone()).collect();
    }

    fn populate_all(&mut self, snapshot: &CampaignSnapshot) {
        for campaign in snapshot.campaigns() {
            self.insert_campaign(campaign);
        }
    }

    fn insert_campaign(&mut self, campaign: &CampaignNode) {
        self.selected.insert(SelectionKey::Campaign(campaign.id.clone()));
        for ad_set in &campaign.abo_ad_sets {
            self.selected.insert(SelectionKey::AdSet {
                campaign: campaign.id.clone(),
                ad_set: ad_set.id.clone(),
            });
        }
    }

    /// Pure derived tri-state; never cached.
    pub fn campaign_state(&self, campaign: &CampaignNode) -> SelectionState {
        if campaign.abo_ad_sets.is_empty() {
            return if self.selected.contains(&SelectionKey::Campaign(campaign.id.clone())) {
                SelectionState::All
            } else {
                SelectionState::None
            };
        }

        let present = campaign
            .abo_ad_sets
            .iter()
            .filter(|ad_set| {
                self.selected.contains(&SelectionKey::AdSet {
                    campaign: campaign.id.clone(),
                    ad_set: ad_set.id.clone(),
                })
            })
            .count();

        if present == campaign.abo_ad_sets.len() {
            SelectionState::All
        } else if present == 0 {
            SelectionState::None
        } else {
            SelectionState::Partial
        }
    }

    /// Row inclusion: an ABO ad set's rows follow its composite key; every
    /// other row follows its campaign key. Keys referencing entities no
    /// longer in the data match nothing and are silently ignored.
    pub fn is_row_selected(&self, row: &PerformanceRow) -> bool {
        if self.selected.contains(&SelectionKey::AdSet {
            campaign: row.campaign_id.clone(),
            ad_set: row.ad_set_id.clone(),
        }) {
            return true;
        }
        self.selected.contains(&SelectionKey::Campaign(row.campaign_id.clone()))
    }

    pub fn filter_rows(&self, rows: &[PerformanceRow]) -> Vec<PerformanceRow> {
        rows.iter().filter(|row| self.is_row_selected(row)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{CampaignSnapshot, SelectionCascade, SelectionKey, SelectionState};
    use crate::domain::row::{
        AccountId, AdId, AdSetId, Budget, CampaignId, EntityStatus, PerformanceRow, Platform,
    };

    fn row(campaign: &str, ad_set: &str, ad_set_daily: Option<i64>) -> PerformanceRow {
        PerformanceRow {
            ad_id: AdId(format!("{ad_set}-ad")),
            ad_set_id: AdSetId(ad_set.to_string()),
            campaign_id: CampaignId(campaign.to_string()),
            account_id: AccountId("acct-1".to_string()),
            platform: Platform::Meta,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            impressions: 100,
            clicks: 10,
            spend: Decimal::from(5),
            platform_conversions: Decimal::ONE,
            platform_revenue: Decimal::from(20),
            ad_status: EntityStatus::Active,
            ad_set_status: EntityStatus::Active,
            campaign_status: EntityStatus::Active,
            campaign_budget: Budget::default(),
            ad_set_budget: Budget {
                daily: ad_set_daily.map(Decimal::from),
                lifetime: None,
            },
        }
    }

    fn abo_snapshot() -> CampaignSnapshot {
        CampaignSnapshot::from_rows(&[
            row("cmp-1", "as-1", Some(40)),
            row("cmp-1", "as-2", Some(60)),
        ])
    }

    fn campaign_key(id: &str) -> SelectionKey {
        SelectionKey::Campaign(CampaignId(id.to_string()))
    }

    fn ad_set_key(campaign: &str, ad_set: &str) -> SelectionKey {
        SelectionKey::AdSet {
            campaign: CampaignId(campaign.to_string()),
            ad_set: AdSetId(ad_set.to_string()),
        }
    }

    #[test]
    fn campaign_toggle_cascades_to_abo_ad_sets() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();

        cascade.toggle(campaign_key("cmp-1"), &snapshot);
        assert!(cascade.is_selected(&campaign_key("cmp-1")));
        assert!(cascade.is_selected(&ad_set_key("cmp-1", "as-1")));
        assert!(cascade.is_selected(&ad_set_key("cmp-1", "as-2")));

        cascade.toggle(campaign_key("cmp-1"), &snapshot);
        assert!(cascade.is_empty());
    }

    #[test]
    fn partial_selection_removes_the_campaign_key() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();
        cascade.toggle(campaign_key("cmp-1"), &snapshot);

        cascade.toggle(ad_set_key("cmp-1", "as-1"), &snapshot);

        assert!(!cascade.is_selected(&campaign_key("cmp-1")));
        assert!(cascade.is_selected(&ad_set_key("cmp-1", "as-2")));
        let campaign = snapshot.campaign(&CampaignId("cmp-1".to_string())).expect("campaign");
        assert_eq!(cascade.campaign_state(campaign), SelectionState::Partial);
    }

    #[test]
    fn reselecting_the_last_sibling_restores_the_campaign_key() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();
        cascade.toggle(ad_set_key("cmp-1", "as-1"), &snapshot);
        assert!(!cascade.is_selected(&campaign_key("cmp-1")));

        cascade.toggle(ad_set_key("cmp-1", "as-2"), &snapshot);
        assert!(cascade.is_selected(&campaign_key("cmp-1")));

        let campaign = snapshot.campaign(&CampaignId("cmp-1".to_string())).expect("campaign");
        assert_eq!(cascade.campaign_state(campaign), SelectionState::All);
    }

    #[test]
    fn select_all_is_idempotent() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();

        cascade.select_all(&snapshot);
        let first = cascade.selected().clone();
        cascade.select_all(&snapshot);

        assert_eq!(&first, cascade.selected());
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn deselect_all_disables_auto_population() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();
        cascade.apply_snapshot(&snapshot);
        assert!(!cascade.is_empty());

        cascade.deselect_all();
        cascade.apply_snapshot(&snapshot);

        assert!(cascade.is_empty());
        assert!(!cascade.auto_select_enabled());
    }

    #[test]
    fn toggling_back_in_re_enables_auto_population() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();
        cascade.deselect_all();

        cascade.toggle(ad_set_key("cmp-1", "as-1"), &snapshot);
        assert!(cascade.auto_select_enabled());
    }

    #[test]
    fn new_campaigns_join_without_disturbing_existing_selection() {
        let first = abo_snapshot();
        let mut cascade = SelectionCascade::new();
        cascade.apply_snapshot(&first);
        cascade.toggle(ad_set_key("cmp-1", "as-1"), &first);

        let second = CampaignSnapshot::from_rows(&[
            row("cmp-1", "as-1", Some(40)),
            row("cmp-1", "as-2", Some(60)),
            row("cmp-2", "as-9", None),
        ]);
        cascade.apply_snapshot(&second);

        assert!(cascade.is_selected(&campaign_key("cmp-2")));
        assert!(!cascade.is_selected(&ad_set_key("cmp-1", "as-1")));
        assert!(cascade.is_selected(&ad_set_key("cmp-1", "as-2")));
    }

    #[test]
    fn unknown_composite_keys_are_ignored() {
        let snapshot = abo_snapshot();
        let mut cascade = SelectionCascade::new();

        cascade.toggle(ad_set_key("cmp-404", "as-404"), &snapshot);
        assert!(cascade.is_empty());
    }

    #[test]
    fn google_campaigns_expose_no_abo_ad_sets() {
        let mut google = row("g-cmp", "g-as", Some(75));
        google.platform = Platform::Google;
        let snapshot = CampaignSnapshot::from_rows(&[google]);

        let campaign = snapshot.campaign(&CampaignId("g-cmp".to_string())).expect("campaign");
        assert!(campaign.abo_ad_sets.is_empty());
    }

    #[test]
    fn row_filtering_follows_composite_then_campaign_keys() {
        let rows = vec![row("cmp-1", "as-1", Some(40)), row("cmp-1", "as-2", Some(60))];
        let snapshot = CampaignSnapshot::from_rows(&rows);
        let mut cascade = SelectionCascade::new();
        cascade.toggle(ad_set_key("cmp-1", "as-1"), &snapshot);

        let filtered = cascade.filter_rows(&rows);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ad_set_id, AdSetId("as-1".to_string()));
    }
}
