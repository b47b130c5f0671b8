use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::row::Platform;
use crate::selection::{CampaignNode, CampaignSnapshot, SelectionCascade, SelectionKey};

/// Who owns a campaign's spend ceiling. Exactly one side contributes to a
/// campaign's daily-budget total, so the ceiling is never counted twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetOwnership {
    Cbo,
    Abo,
    Unbudgeted,
}

pub fn ownership_of(campaign: &CampaignNode) -> BudgetOwnership {
    if campaign.platform == Platform::Google {
        return BudgetOwnership::Cbo;
    }
    if !campaign.abo_ad_sets.is_empty() {
        return BudgetOwnership::Abo;
    }
    if campaign.daily_budget.is_some() {
        return BudgetOwnership::Cbo;
    }
    BudgetOwnership::Unbudgeted
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipBreakdown {
    pub cbo: Decimal,
    pub abo: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub total: Decimal,
    pub by_ownership: OwnershipBreakdown,
    pub by_platform: BTreeMap<Platform, Decimal>,
}

/// Daily-budget total over the current selection. A CBO campaign's budget
/// counts iff its campaign key is selected and the campaign is active; an
/// ABO ad set's budget counts iff its composite key is selected and neither
/// it nor its campaign is paused.
pub fn budget_totals(snapshot: &CampaignSnapshot, selection: &SelectionCascade) -> BudgetTotals {
    let mut totals = BudgetTotals::default();

    for campaign in snapshot.campaigns() {
        let contribution = match ownership_of(campaign) {
            BudgetOwnership::Cbo => {
                let selected =
                    selection.is_selected(&SelectionKey::Campaign(campaign.id.clone()));
                if selected && campaign.status.is_active() {
                    let amount = campaign.daily_budget.unwrap_or(Decimal::ZERO);
                    totals.by_ownership.cbo += amount;
                    amount
                } else {
                    Decimal::ZERO
                }
            }
            BudgetOwnership::Abo => {
                let mut amount = Decimal::ZERO;
                if campaign.status.is_active() {
                    for ad_set in &campaign.abo_ad_sets {
                        let selected = selection.is_selected(&SelectionKey::AdSet {
                            campaign: campaign.id.clone(),
                            ad_set: ad_set.id.clone(),
                        });
                        if selected && ad_set.status.is_active() {
                            amount += ad_set.daily_budget.unwrap_or(Decimal::ZERO);
                        }
                    }
                }
                totals.by_ownership.abo += amount;
                amount
            }
            BudgetOwnership::Unbudgeted => Decimal::ZERO,
        };

        if !contribution.is_zero() {
            totals.total += contribution;
            *totals.by_platform.entry(campaign.platform).or_insert(Decimal::ZERO) += contribution;
        }
    }

    totals
}
