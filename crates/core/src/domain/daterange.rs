use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Named reporting windows with a fixed calendar-day span. The span table is
/// what the result cache uses to decide whether a wider cached window can be
/// narrowed client-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Today,
    Yesterday,
    Last7d,
    Last14d,
    Last30d,
    Last90d,
}

impl DatePreset {
    pub fn span_days(self) -> u32 {
        match self {
            Self::Today | Self::Yesterday => 1,
            Self::Last7d => 7,
            Self::Last14d => 14,
            Self::Last30d => 30,
            Self::Last90d => 90,
        }
    }

    /// Inclusive `[since, until]` bounds in account-local calendar days.
    pub fn resolve(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Today => (today, today),
            Self::Yesterday => {
                let yesterday = today - Duration::days(1);
                (yesterday, yesterday)
            }
            Self::Last7d | Self::Last14d | Self::Last30d | Self::Last90d => {
                (today - Duration::days(i64::from(self.span_days()) - 1), today)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Preset(DatePreset),
    Custom { since: NaiveDate, until: NaiveDate },
}

impl DateRange {
    pub fn custom(since: NaiveDate, until: NaiveDate) -> Result<Self, DomainError> {
        if since > until {
            return Err(DomainError::InvalidDateRange { since, until });
        }
        Ok(Self::Custom { since, until })
    }

    pub fn preset(&self) -> Option<DatePreset> {
        match self {
            Self::Preset(preset) => Some(*preset),
            Self::Custom { .. } => None,
        }
    }

    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Preset(preset) => preset.resolve(today),
            Self::Custom { since, until } => (*since, *until),
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let (since, until) = self.bounds(today);
        since <= date && date <= until
    }
}
