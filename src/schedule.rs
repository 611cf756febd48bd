//! Calendar sequencing for recurring and installment series.
//!
//! All arithmetic runs on `NaiveDate`, i.e. on the caller's local calendar.
//! Nothing here converts through UTC instants, so month boundaries never
//! shift by a day.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::Periodicity;

/// how an installment total is divided across its instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// every part is `floor(total / count)`, the last part absorbs the remainder
    #[default]
    RemainderToLast,
    /// every part is `round(total / count)`; the sum may drift from the total
    EqualDrift,
}

/// add calendar months, clamping the day to the end of the target month
///
/// Jan 31 + 1 month is Feb 28 (or 29). Saturates at the representable range.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// `YYYY-MM` key of the month containing `date`
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// dates of a recurring series from `start` through `end` inclusive
///
/// The first element is always `start`, even when `start > end`. Each later
/// element is one periodicity step after the previous one, and generation
/// stops at the first step that would pass `end`.
pub fn generate_recurring_dates(
    start: NaiveDate,
    end: NaiveDate,
    periodicity: Periodicity,
) -> Vec<NaiveDate> {
    let mut dates = vec![start];
    let mut current = start;
    loop {
        let next = periodicity.step(current);
        // a saturated step cannot advance any further
        if next > end || next <= current {
            break;
        }
        dates.push(next);
        current = next;
    }
    dates
}

/// `count` monthly dates anchored on `start` (`start + i` months)
pub fn generate_installment_dates(start: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| add_months(start, i as i32))
        .collect()
}

/// split `total` into `count` per-instance amounts
pub fn split_installment_amount(total: Money, count: u32, policy: SplitPolicy) -> Vec<Money> {
    if count == 0 {
        return Vec::new();
    }

    match policy {
        SplitPolicy::EqualDrift => {
            let part = total / Decimal::from(count);
            vec![part; count as usize]
        }
        SplitPolicy::RemainderToLast => {
            let part = total.split_floor(count);
            let mut parts = vec![part; count as usize];
            let allocated = part * Decimal::from(count - 1);
            if let Some(last) = parts.last_mut() {
                *last = total - allocated;
            }
            parts
        }
    }
}
