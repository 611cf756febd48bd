//! Selecting the instances a series-scoped mutation applies to.

use chrono::NaiveDate;

use crate::obligation::ObligationInstance;
use crate::series::identity::{canonicalize, is_installment_series};
use crate::store::ObligationQuery;
use crate::types::{CardId, Direction, Periodicity, SeriesId, UserId};

/// how members of the target's series are recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesMatcher {
    /// rows stamped with an explicit series id at creation
    BySeriesId(SeriesId),
    /// legacy installment rows flagged as installments, with the same base
    /// description and installment count
    ByCanonicalDescription { base: String, installment_count: u32 },
    /// legacy recurring rows: same description, cadence and direction
    ByRecurringKey {
        description: String,
        periodicity: Option<Periodicity>,
        direction: Direction,
    },
}

impl SeriesMatcher {
    pub fn matches(&self, candidate: &ObligationInstance) -> bool {
        match self {
            SeriesMatcher::BySeriesId(id) => candidate.series_id == Some(*id),
            SeriesMatcher::ByCanonicalDescription {
                base,
                installment_count,
            } => {
                let count = candidate.installment_position().map(|(_, count)| count);
                count == Some(*installment_count) && canonicalize(&candidate.description) == *base
            }
            SeriesMatcher::ByRecurringKey {
                description,
                periodicity,
                direction,
            } => {
                candidate.is_recurring
                    && candidate.description == *description
                    && candidate.periodicity == *periodicity
                    && candidate.direction == *direction
            }
        }
    }
}

/// where the target sits in its series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesPosition {
    /// installment index, 1-based
    Index(u32),
    Date(NaiveDate),
}

/// the target's series from the target onward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSelector {
    pub user_id: UserId,
    pub card_id: Option<CardId>,
    pub matcher: SeriesMatcher,
    pub position: SeriesPosition,
}

impl SeriesSelector {
    /// None when the target is not addressable as a series
    pub fn for_target(target: &ObligationInstance) -> Option<Self> {
        if is_installment_series(target) {
            let (index, count) = target.installment_position()?;
            let matcher = match target.series_id {
                Some(id) => SeriesMatcher::BySeriesId(id),
                None => SeriesMatcher::ByCanonicalDescription {
                    base: canonicalize(&target.description),
                    installment_count: count,
                },
            };
            return Some(Self {
                user_id: target.user_id,
                card_id: target.card_id,
                matcher,
                position: SeriesPosition::Index(index),
            });
        }

        if target.is_recurring {
            let matcher = match target.series_id {
                Some(id) => SeriesMatcher::BySeriesId(id),
                None => SeriesMatcher::ByRecurringKey {
                    description: target.description.clone(),
                    periodicity: target.periodicity,
                    direction: target.direction,
                },
            };
            return Some(Self {
                user_id: target.user_id,
                card_id: None,
                matcher,
                position: SeriesPosition::Date(target.expected_date),
            });
        }

        None
    }

    pub fn is_installment(&self) -> bool {
        matches!(self.position, SeriesPosition::Index(_))
    }

    /// store query narrowing candidates; statuses are not filtered here
    pub fn query(&self) -> ObligationQuery {
        let mut query = ObligationQuery::for_user(self.user_id);
        if let Some(card_id) = self.card_id {
            query = query.card(card_id);
        }
        match &self.matcher {
            SeriesMatcher::BySeriesId(id) => query = query.series(*id),
            SeriesMatcher::ByCanonicalDescription { .. } => {}
            SeriesMatcher::ByRecurringKey {
                description,
                periodicity,
                ..
            } => query = query.description(description.clone()).recurring(*periodicity),
        }
        if let SeriesPosition::Date(from) = self.position {
            query = query.from_date(from);
        }
        query
    }

    fn at_or_after(&self, candidate: &ObligationInstance) -> bool {
        match self.position {
            SeriesPosition::Index(index) => candidate
                .installment_position()
                .map_or(false, |(candidate_index, _)| candidate_index >= index),
            SeriesPosition::Date(date) => candidate.expected_date >= date,
        }
    }

    pub fn includes(&self, candidate: &ObligationInstance) -> bool {
        candidate.user_id == self.user_id
            && self.card_id.map_or(true, |card| candidate.card_id == Some(card))
            && self.matcher.matches(candidate)
            && self.at_or_after(candidate)
    }

    /// members at or after the target, in series order
    pub fn select(
        &self,
        candidates: impl IntoIterator<Item = ObligationInstance>,
    ) -> Vec<ObligationInstance> {
        let mut members: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| self.includes(candidate))
            .collect();
        if self.is_installment() {
            members.sort_by_key(|m| {
                let index = m.installment_position().map(|(index, _)| index);
                (index, m.expected_date)
            });
        } else {
            members.sort_by_key(|m| m.expected_date);
        }
        members
    }
}

/// the target's series members at or after it, empty when it is not a series
pub fn resolve_series_members(
    target: &ObligationInstance,
    candidates: impl IntoIterator<Item = ObligationInstance>,
) -> Vec<ObligationInstance> {
    match SeriesSelector::for_target(target) {
        Some(selector) => selector.select(candidates),
        None => Vec::new(),
    }
}
