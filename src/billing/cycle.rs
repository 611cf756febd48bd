use chrono::{Datelike, NaiveDate};

use crate::billing::card::CreditCard;
use crate::schedule::{add_months, month_key};

/// `YYYY-MM` of the invoice currently accepting charges for a closing day
///
/// Up to and including the closing day, charges fall on this month's
/// invoice; after it they roll to the next month.
pub fn open_cycle_month(today: NaiveDate, closing_day: u8) -> String {
    if today.day() <= u32::from(closing_day) {
        return month_key(today);
    }
    let first = today.with_day(1).unwrap_or(today);
    month_key(add_months(first, 1))
}

/// earliest closing day among active cards
pub fn earliest_closing_day<'a>(cards: impl IntoIterator<Item = &'a CreditCard>) -> Option<u8> {
    cards
        .into_iter()
        .filter(|card| card.active)
        .map(|card| card.closing_day)
        .min()
}

/// one open month shared by every active card, from the earliest closing day
///
/// Cards closing later than the earliest one can be shown against a month
/// other than their own open invoice.
pub fn reference_month<'a>(
    today: NaiveDate,
    cards: impl IntoIterator<Item = &'a CreditCard>,
) -> Option<String> {
    earliest_closing_day(cards).map(|day| open_cycle_month(today, day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_closing_day_boundary() {
        assert_eq!(open_cycle_month(date(2025, 5, 10), 10), "2025-05");
        assert_eq!(open_cycle_month(date(2025, 5, 11), 10), "2025-06");
        assert_eq!(open_cycle_month(date(2025, 5, 15), 10), "2025-06");
        assert_eq!(open_cycle_month(date(2025, 5, 1), 10), "2025-05");
    }

    #[test]
    fn test_december_rolls_to_next_year() {
        assert_eq!(open_cycle_month(date(2025, 12, 31), 30), "2026-01");
        assert_eq!(open_cycle_month(date(2025, 12, 31), 31), "2025-12");
    }

    #[test]
    fn test_closing_day_past_month_end() {
        // no day after the 28th exists in February 2025
        assert_eq!(open_cycle_month(date(2025, 2, 28), 31), "2025-02");
    }

    #[test]
    fn test_reference_month_uses_earliest_active_card() {
        let cards = vec![
            CreditCard::new("A", Money::from_major(1000), 25),
            CreditCard::new("B", Money::from_major(1000), 5),
            CreditCard::new("C", Money::from_major(1000), 1).inactive(),
        ];
        assert_eq!(earliest_closing_day(&cards), Some(5));
        assert_eq!(reference_month(date(2025, 5, 15), &cards).as_deref(), Some("2025-06"));
        assert_eq!(reference_month(date(2025, 5, 15), &cards[2..]), None);
    }
}
