use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar bucket a usage counter is partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Total,
    Week,
    Month,
    Year,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Total => "total",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(PeriodKind::Total),
            "week" => Ok(PeriodKind::Week),
            "month" => Ok(PeriodKind::Month),
            "year" => Ok(PeriodKind::Year),
            other => Err(format!("unknown period kind '{other}'")),
        }
    }
}

/// Canonical key for the period containing `date`.
///
/// Weeks follow ISO-8601: they start on Monday and carry the ISO week-numbering
/// year, so 2024-12-30 belongs to `2025-W01`.
pub fn period_key(kind: PeriodKind, date: NaiveDate) -> String {
    match kind {
        PeriodKind::Total => "all".to_string(),
        PeriodKind::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        PeriodKind::Month => format!("{}-{:02}", date.year(), date.month()),
        PeriodKind::Year => format!("{}", date.year()),
    }
}

/// `YYYY-MM-DD`, used by the device counter key.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
