use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::ObligationError;
use crate::schedule::add_months;

/// unique identifier for an obligation instance
pub type ObligationId = Uuid;

/// owning or dependent user
pub type UserId = Uuid;

/// credit card identifier
pub type CardId = Uuid;

/// bank account identifier
pub type AccountId = Uuid;

/// category identifier
pub type CategoryId = Uuid;

/// explicit series identifier assigned at creation
pub type SeriesId = Uuid;

/// whether money comes in or goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

/// obligation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObligationStatus {
    /// expected, still editable
    Pending,
    /// paid or received, immutable
    Settled,
    /// voided, immutable
    Cancelled,
}

impl ObligationStatus {
    pub fn is_mutable(self) -> bool {
        matches!(self, ObligationStatus::Pending)
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObligationStatus::Pending => "pending",
            ObligationStatus::Settled => "settled",
            ObligationStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// cadence of a recurring series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
}

impl Periodicity {
    pub const ALL: [Periodicity; 8] = [
        Periodicity::Daily,
        Periodicity::Weekly,
        Periodicity::Biweekly,
        Periodicity::Monthly,
        Periodicity::Bimonthly,
        Periodicity::Quarterly,
        Periodicity::Semiannual,
        Periodicity::Annual,
    ];

    /// advance one step on the calendar
    pub fn step(self, from: NaiveDate) -> NaiveDate {
        match self {
            Periodicity::Daily => from + Duration::days(1),
            Periodicity::Weekly => from + Duration::weeks(1),
            Periodicity::Biweekly => from + Duration::weeks(2),
            Periodicity::Monthly => add_months(from, 1),
            Periodicity::Bimonthly => add_months(from, 2),
            Periodicity::Quarterly => add_months(from, 3),
            Periodicity::Semiannual => add_months(from, 6),
            Periodicity::Annual => add_months(from, 12),
        }
    }

    /// advance `steps` chained steps; each step starts from the previous result
    pub fn step_n(self, from: NaiveDate, steps: usize) -> NaiveDate {
        (0..steps).fold(from, |date, _| self.step(date))
    }

    pub fn code(self) -> &'static str {
        match self {
            Periodicity::Daily => "daily",
            Periodicity::Weekly => "weekly",
            Periodicity::Biweekly => "biweekly",
            Periodicity::Monthly => "monthly",
            Periodicity::Bimonthly => "bimonthly",
            Periodicity::Quarterly => "quarterly",
            Periodicity::Semiannual => "semiannual",
            Periodicity::Annual => "annual",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Periodicity {
    type Err = ObligationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Periodicity::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| ObligationError::validation(format!("unknown periodicity: {s}")))
    }
}

/// scope of an edit or delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationScope {
    /// only the targeted instance
    Single,
    /// the targeted instance and every later instance of its series
    Series,
}

/// structured installment marker written by the newest record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentInfo {
    #[serde(alias = "current")]
    pub index: u32,
    #[serde(alias = "total")]
    pub count: u32,
    #[serde(default)]
    pub original_amount: Option<Money>,
}
