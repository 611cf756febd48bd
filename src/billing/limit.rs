use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::billing::card::CreditCard;
use crate::billing::cycle::{open_cycle_month, reference_month};
use crate::config::ReferenceMonthMode;
use crate::decimal::{Money, Rate};
use crate::obligation::ObligationInstance;
use crate::types::CardId;

fn charged_to<'a>(
    card: &'a CreditCard,
    instances: &'a [ObligationInstance],
) -> impl Iterator<Item = &'a ObligationInstance> + 'a {
    instances
        .iter()
        .filter(move |i| i.is_pending() && i.card_id == Some(card.id))
}

/// pending charges that hold the card's limit
///
/// A recurring charge only counts in the open month. Installments and
/// one-off charges count whatever their month, since later installments
/// already encumber the limit.
pub fn used_limit(
    card: &CreditCard,
    instances: &[ObligationInstance],
    open_month: &str,
) -> Money {
    charged_to(card, instances)
        .filter(|i| !i.is_recurring || i.expected_month() == open_month)
        .map(|i| i.amount)
        .sum()
}

pub fn available_limit(card: &CreditCard, used: Money) -> Money {
    card.total_limit - used
}

/// pending charges on the card's invoice for `month`
pub fn invoice_instances<'a>(
    card: &'a CreditCard,
    instances: &'a [ObligationInstance],
    month: &'a str,
) -> Vec<&'a ObligationInstance> {
    charged_to(card, instances)
        .filter(|i| i.expected_month() == month)
        .collect()
}

/// limit position of one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardLimitView {
    pub card_id: CardId,
    pub name: String,
    pub open_cycle_month: String,
    pub invoice_total: Money,
    pub used_limit: Money,
    pub available_limit: Money,
    pub utilization: Rate,
}

impl CardLimitView {
    pub fn compute(card: &CreditCard, instances: &[ObligationInstance], month: &str) -> Self {
        let used = used_limit(card, instances, month);
        let invoice_total = invoice_instances(card, instances, month)
            .into_iter()
            .map(|i| i.amount)
            .sum();
        Self {
            card_id: card.id,
            name: card.name.clone(),
            open_cycle_month: month.to_string(),
            invoice_total,
            used_limit: used,
            available_limit: available_limit(card, used),
            utilization: used.ratio_of(card.total_limit),
        }
    }

    /// view against the card's own open cycle
    pub fn for_today(
        card: &CreditCard,
        instances: &[ObligationInstance],
        today: NaiveDate,
    ) -> Self {
        Self::compute(card, instances, &open_cycle_month(today, card.closing_day))
    }

    pub fn json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// limit positions of every active card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardsSummary {
    /// open month of the earliest-closing active card
    pub reference_month: Option<String>,
    pub mode: ReferenceMonthMode,
    pub cards: Vec<CardLimitView>,
}

impl CardsSummary {
    pub fn total_used(&self) -> Money {
        self.cards.iter().map(|c| c.used_limit).sum()
    }

    pub fn total_available(&self) -> Money {
        self.cards.iter().map(|c| c.available_limit).sum()
    }

    pub fn json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// per-card views for a combined display; inactive cards are left out
pub fn summarize_cards(
    today: NaiveDate,
    cards: &[CreditCard],
    instances: &[ObligationInstance],
    mode: ReferenceMonthMode,
) -> CardsSummary {
    let shared = reference_month(today, cards);

    let views: Vec<_> = cards
        .iter()
        .filter(|card| card.active)
        .map(|card| match (mode, shared.as_deref()) {
            (ReferenceMonthMode::EarliestClosingDay, Some(month)) => {
                CardLimitView::compute(card, instances, month)
            }
            _ => CardLimitView::for_today(card, instances, today),
        })
        .collect();

    debug!(
        cards = views.len(),
        reference_month = ?shared,
        "card summary computed"
    );

    CardsSummary {
        reference_month: shared,
        mode,
        cards: views,
    }
}
