//! Persistence port for obligation rows.
//!
//! The backend is a remote row store reached through single calls. It gives
//! no transaction spanning several calls, so callers must treat every write
//! as independently committed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::errors::{ObligationError, Result};
use crate::obligation::ObligationInstance;
use crate::types::{CardId, ObligationId, ObligationStatus, Periodicity, SeriesId, UserId};

/// row filter understood by every store; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObligationQuery {
    pub user_id: Option<UserId>,
    pub card_id: Option<CardId>,
    pub status: Option<ObligationStatus>,
    pub description: Option<String>,
    pub is_recurring: Option<bool>,
    pub periodicity: Option<Periodicity>,
    pub series_id: Option<SeriesId>,
    /// inclusive lower bound on the expected date
    pub date_from: Option<NaiveDate>,
    /// `YYYY-MM`
    pub month: Option<String>,
}

impl ObligationQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }

    pub fn status(mut self, status: ObligationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn pending(self) -> Self {
        self.status(ObligationStatus::Pending)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn recurring(mut self, periodicity: Option<Periodicity>) -> Self {
        self.is_recurring = Some(true);
        self.periodicity = periodicity;
        self
    }

    pub fn series(mut self, series_id: SeriesId) -> Self {
        self.series_id = Some(series_id);
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn matches(&self, row: &ObligationInstance) -> bool {
        self.user_id.map_or(true, |id| row.user_id == id)
            && self.card_id.map_or(true, |id| row.card_id == Some(id))
            && self.status.map_or(true, |status| row.status == status)
            && self.description.as_ref().map_or(true, |d| &row.description == d)
            && self.is_recurring.map_or(true, |flag| row.is_recurring == flag)
            && self.periodicity.map_or(true, |p| row.periodicity == Some(p))
            && self.series_id.map_or(true, |id| row.series_id == Some(id))
            && self.date_from.map_or(true, |from| row.expected_date >= from)
            && self.month.as_ref().map_or(true, |m| row.expected_month() == m)
    }
}

/// row-level operations against the obligation table
pub trait ObligationStore {
    /// one bulk write; returns the ids in input order
    ///
    /// A backend that is not atomic may commit a prefix of `rows` before
    /// failing; it reports that through `PartialBatchFailure`.
    fn insert_many(&mut self, rows: Vec<ObligationInstance>) -> Result<Vec<ObligationId>>;

    fn get(&self, id: ObligationId) -> Result<Option<ObligationInstance>>;

    fn update(&mut self, row: &ObligationInstance) -> Result<()>;

    fn delete(&mut self, id: ObligationId) -> Result<()>;

    /// bulk delete; same partial-commit contract as `insert_many`
    fn delete_many(&mut self, ids: &[ObligationId]) -> Result<()>;

    /// matching rows ordered by expected date, then installment index
    fn query(&self, query: &ObligationQuery) -> Result<Vec<ObligationInstance>>;
}

/// in-process store with failure injection for exercising partial writes
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: BTreeMap<ObligationId, ObligationInstance>,
    writes_before_failure: Option<usize>,
    bulk_rows_before_failure: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// seed rows as-is, bypassing failure injection
    pub fn with_rows(rows: impl IntoIterator<Item = ObligationInstance>) -> Self {
        let mut store = Self::new();
        for row in rows {
            store.rows.insert(row.id, row.normalized());
        }
        store
    }

    /// let `n` more single-row writes succeed, then fail every write
    pub fn fail_after(&mut self, n: usize) {
        self.writes_before_failure = Some(n);
    }

    /// bulk calls commit `n` rows and then fail
    pub fn fail_bulk_after(&mut self, n: usize) {
        self.bulk_rows_before_failure = Some(n);
    }

    pub fn clear_failures(&mut self) {
        self.writes_before_failure = None;
        self.bulk_rows_before_failure = None;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &ObligationInstance> {
        self.rows.values()
    }

    fn take_write(&mut self) -> Result<()> {
        match self.writes_before_failure.as_mut() {
            Some(0) => Err(ObligationError::backend("injected write failure")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn bulk_budget(&self, requested: usize) -> usize {
        self.bulk_rows_before_failure
            .map_or(requested, |limit| limit.min(requested))
    }
}

impl ObligationStore for MemoryStore {
    fn insert_many(&mut self, rows: Vec<ObligationInstance>) -> Result<Vec<ObligationId>> {
        self.take_write()?;

        let total = rows.len();
        let budget = self.bulk_budget(total);
        let mut ids = Vec::with_capacity(total);

        for row in rows.into_iter().take(budget) {
            ids.push(row.id);
            self.rows.insert(row.id, row.normalized());
        }

        if ids.len() < total {
            return Err(ObligationError::backend(format!(
                "bulk insert accepted {} of {} rows",
                ids.len(),
                total
            )));
        }

        debug!(rows = total, "memory store bulk insert");
        Ok(ids)
    }

    fn get(&self, id: ObligationId) -> Result<Option<ObligationInstance>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn update(&mut self, row: &ObligationInstance) -> Result<()> {
        if !self.rows.contains_key(&row.id) {
            return Err(ObligationError::NotFound { id: row.id });
        }
        self.take_write()?;
        self.rows.insert(row.id, row.clone().normalized());
        Ok(())
    }

    fn delete(&mut self, id: ObligationId) -> Result<()> {
        if !self.rows.contains_key(&id) {
            return Err(ObligationError::NotFound { id });
        }
        self.take_write()?;
        self.rows.remove(&id);
        Ok(())
    }

    fn delete_many(&mut self, ids: &[ObligationId]) -> Result<()> {
        self.take_write()?;

        let budget = self.bulk_budget(ids.len());
        for id in &ids[..budget] {
            self.rows.remove(id);
        }

        if budget < ids.len() {
            return Err(ObligationError::backend(format!(
                "bulk delete removed {} of {} rows",
                budget,
                ids.len()
            )));
        }
        Ok(())
    }

    fn query(&self, query: &ObligationQuery) -> Result<Vec<ObligationInstance>> {
        let mut rows: Vec<_> = self
            .rows
            .values()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.expected_date, row.resolved_installment_index()));
        Ok(rows)
    }
}
