//! Edit and delete of single instances and whole series.
//!
//! Writes go out one call at a time against a store without transactions.
//! Every mutation checks its full affected set before the first write, then
//! applies rows in series order so that a truncated run leaves the earlier
//! part of the series consistent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::batch::{BatchOperation, BatchOutcome};
use crate::decimal::Money;
use crate::errors::{ObligationError, Result};
use crate::obligation::ObligationInstance;
use crate::schedule::add_months;
use crate::series::identity::{canonicalize, installment_label, is_true_series};
use crate::series::members::SeriesSelector;
use crate::store::ObligationStore;
use crate::types::{CategoryId, MutationScope, ObligationId};

/// new field values for an edit; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObligationChanges {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
}

impl ObligationChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn expected_date(mut self, date: NaiveDate) -> Self {
        self.expected_date = Some(date);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.category_id.is_none()
            && self.expected_date.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ObligationError::validation("edit carries no changes"));
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(ObligationError::validation("description is required"));
            }
        }
        if let Some(amount) = self.amount {
            if !amount.is_positive() {
                return Err(ObligationError::validation(format!(
                    "amount must be positive, got {}",
                    amount
                )));
            }
        }
        Ok(())
    }

    /// description, amount and category; dates are placed by the caller
    fn apply_fields(&self, row: &mut ObligationInstance) {
        if let Some(description) = &self.description {
            row.description = relabel(row, description.trim());
        }
        if let Some(amount) = self.amount {
            row.amount = amount;
        }
        if let Some(category_id) = self.category_id {
            row.category_id = category_id;
        }
    }
}

/// label a new description with the row's installment position
///
/// Rows not flagged as installments of a multi-part purchase take the new
/// description as given, even when it ends in something like `03/2025`.
fn relabel(row: &ObligationInstance, description: &str) -> String {
    match row.installment_position() {
        Some((index, count)) if count > 1 => {
            installment_label(&canonicalize(description), index, count)
        }
        _ => description.to_string(),
    }
}

/// scope actually applied to a request
///
/// Series scope on anything but a true series collapses to the target alone.
pub fn effective_scope(target: &ObligationInstance, requested: MutationScope) -> MutationScope {
    match requested {
        MutationScope::Series if is_true_series(target) => MutationScope::Series,
        _ => MutationScope::Single,
    }
}

fn ensure_mutable(row: &ObligationInstance) -> Result<()> {
    if row.status.is_mutable() {
        return Ok(());
    }
    Err(ObligationError::validation(format!(
        "obligation {} is {} and cannot be changed",
        row.id, row.status
    )))
}

/// rewrite the members of a series edit, in the order they must be written
///
/// `members` are the target's series from the target onward, in series
/// order. Installment members keep their own index and move by the same
/// month offset as the target. Recurring members are re-stepped from the
/// target's new date.
pub fn plan_series_edit(
    target: &ObligationInstance,
    members: Vec<ObligationInstance>,
    changes: &ObligationChanges,
) -> Result<Vec<ObligationInstance>> {
    if let Some(blocked) = members.iter().find(|m| !m.status.is_mutable()) {
        return Err(ObligationError::validation(format!(
            "series member {} is {}; series edit refused",
            blocked.id, blocked.status
        )));
    }

    let target_index = target.installment_position().map(|(index, _)| index);
    let installment = target_index.is_some() && !target.is_recurring;

    let mut planned = Vec::with_capacity(members.len());
    for (position, mut row) in members.into_iter().enumerate() {
        changes.apply_fields(&mut row);

        if let Some(anchor) = changes.expected_date {
            let row_index = row.installment_position().map(|(index, _)| index);
            let date = match (installment, target_index, row_index) {
                (true, Some(from), Some(index)) => add_months(anchor, index as i32 - from as i32),
                _ => match target.periodicity {
                    Some(periodicity) => periodicity.step_n(anchor, position),
                    None => anchor,
                },
            };
            row.set_expected_date(date);
        } else {
            row.normalize();
        }
        planned.push(row);
    }
    Ok(planned)
}

/// write rows one by one, stopping at the first failure
pub fn apply_updates<S: ObligationStore>(
    store: &mut S,
    rows: &[ObligationInstance],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::new(BatchOperation::Update, rows.len());
    for row in rows {
        match store.update(row) {
            Ok(()) => outcome.record_success(row.id),
            Err(e) => {
                warn!(id = %row.id, error = %e, "update stopped");
                outcome.record_failure(Some(row.id), &e);
                break;
            }
        }
    }
    outcome
}

/// one bulk delete; on failure the store is re-read to learn which rows went
pub fn apply_bulk_delete<S: ObligationStore>(
    store: &mut S,
    ids: &[ObligationId],
) -> BatchOutcome {
    match store.delete_many(ids) {
        Ok(()) => BatchOutcome::complete(BatchOperation::Delete, ids.to_vec()),
        Err(e) => {
            warn!(rows = ids.len(), error = %e, "bulk delete failed");
            let mut outcome = BatchOutcome::new(BatchOperation::Delete, ids.len());
            for id in ids {
                if let Ok(None) = store.get(*id) {
                    outcome.record_success(*id);
                }
            }
            outcome.record_failure(None, &e);
            outcome
        }
    }
}

/// what a mutation did
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub requested: MutationScope,
    pub applied: MutationScope,
    /// rows as written by an edit, or as they were before a delete
    pub rows: Vec<ObligationInstance>,
    pub outcome: BatchOutcome,
}

impl Mutation {
    pub fn downgraded(&self) -> bool {
        self.requested != self.applied
    }
}

/// runs edits and deletes against a store
pub struct SeriesMutator<'s, S: ObligationStore> {
    store: &'s mut S,
}

impl<'s, S: ObligationStore> SeriesMutator<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// the target's series from the target onward, in series order
    ///
    /// The target always leads, whatever its status.
    pub fn members(&self, target: &ObligationInstance) -> Result<Vec<ObligationInstance>> {
        let selector = match SeriesSelector::for_target(target) {
            Some(selector) => selector,
            None => return Ok(vec![target.clone()]),
        };
        let candidates = self.store.query(&selector.query())?;
        let mut members: Vec<_> = selector
            .select(candidates)
            .into_iter()
            .filter(|m| m.id != target.id)
            .collect();
        members.insert(0, target.clone());
        debug!(target = %target.id, members = members.len(), "series resolved");
        Ok(members)
    }

    pub fn edit(
        &mut self,
        target: &ObligationInstance,
        requested: MutationScope,
        changes: &ObligationChanges,
    ) -> Result<Mutation> {
        changes.validate()?;
        ensure_mutable(target)?;

        let applied = effective_scope(target, requested);
        let rows = match applied {
            MutationScope::Single => {
                let mut row = target.clone();
                changes.apply_fields(&mut row);
                match changes.expected_date {
                    Some(date) => row.set_expected_date(date),
                    None => row.normalize(),
                }
                vec![row]
            }
            MutationScope::Series => {
                let members = self.members(target)?;
                plan_series_edit(target, members, changes)?
            }
        };

        let outcome = apply_updates(&mut *self.store, &rows);
        Ok(Mutation {
            requested,
            applied,
            rows,
            outcome,
        })
    }

    pub fn delete(
        &mut self,
        target: &ObligationInstance,
        requested: MutationScope,
    ) -> Result<Mutation> {
        ensure_mutable(target)?;

        let applied = effective_scope(target, requested);
        let (rows, outcome) = match applied {
            MutationScope::Single => {
                self.store.delete(target.id)?;
                let outcome = BatchOutcome::complete(BatchOperation::Delete, vec![target.id]);
                (vec![target.clone()], outcome)
            }
            MutationScope::Series => {
                let members = self.members(target)?;
                if let Some(blocked) = members.iter().find(|m| !m.status.is_mutable()) {
                    return Err(ObligationError::validation(format!(
                        "series member {} is {}; series delete refused",
                        blocked.id, blocked.status
                    )));
                }
                let ids: Vec<_> = members.iter().map(|m| m.id).collect();
                let outcome = apply_bulk_delete(&mut *self.store, &ids);
                (members, outcome)
            }
        };

        Ok(Mutation {
            requested,
            applied,
            rows,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::series::builder::{ObligationRequest, SeriesBuilder};
    use crate::store::{MemoryStore, ObligationQuery};
    use crate::types::{Direction, ObligationStatus, Periodicity, UserId};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn build(config: &EngineConfig, request: ObligationRequest) -> Vec<ObligationInstance> {
        SeriesBuilder::new(config).build(&request).unwrap()
    }

    fn installments(user: UserId, card: Uuid, count: u32) -> Vec<ObligationInstance> {
        let request = ObligationRequest::new(
            user,
            "Geladeira",
            Money::from_major(1500),
            Direction::Outflow,
            Uuid::new_v4(),
            date(2025, 1, 10),
        )
        .installments(count)
        .on_card(card);
        build(&EngineConfig::legacy(), request)
    }

    fn weekly(user: UserId) -> Vec<ObligationInstance> {
        let request = ObligationRequest::new(
            user,
            "Feira",
            Money::from_major(120),
            Direction::Outflow,
            Uuid::new_v4(),
            date(2025, 3, 1),
        )
        .recurring(Periodicity::Weekly, date(2025, 3, 29));
        build(&EngineConfig::default(), request)
    }

    fn plain(user: UserId, description: &str) -> ObligationInstance {
        ObligationInstance::new(
            user,
            description,
            Money::from_major(60),
            Direction::Outflow,
            date(2025, 2, 10),
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_effective_scope_forces_single() {
        let user = Uuid::new_v4();
        let row = plain(user, "Cinema");
        assert_eq!(effective_scope(&row, MutationScope::Series), MutationScope::Single);

        let mut one_shot = plain(user, "Fone");
        one_shot.is_installment = true;
        one_shot.installment_count = Some(1);
        assert_eq!(effective_scope(&one_shot, MutationScope::Series), MutationScope::Single);

        let series = weekly(user);
        assert_eq!(effective_scope(&series[0], MutationScope::Series), MutationScope::Series);
        assert_eq!(effective_scope(&series[0], MutationScope::Single), MutationScope::Single);
    }

    #[test]
    fn test_series_delete_on_plain_row_spares_identical_rows() {
        let user = Uuid::new_v4();
        let target = plain(user, "Academia");
        let twin = plain(user, "Academia");
        let mut store = MemoryStore::with_rows(vec![target.clone(), twin.clone()]);

        let mutation = SeriesMutator::new(&mut store)
            .delete(&target, MutationScope::Series)
            .unwrap();

        assert!(mutation.downgraded());
        assert_eq!(mutation.outcome.succeeded, vec![target.id]);
        assert_eq!(store.len(), 1);
        assert!(store.get(twin.id).unwrap().is_some());
    }

    #[test]
    fn test_series_delete_removes_from_target_index() {
        let user = Uuid::new_v4();
        let card = Uuid::new_v4();
        let series = installments(user, card, 5);
        // an unrelated purchase with the same shape on the same card
        let other = installments(user, card, 4);
        let rows = series.iter().cloned().chain(other.iter().cloned());
        let mut store = MemoryStore::with_rows(rows);

        let mutation = SeriesMutator::new(&mut store)
            .delete(&series[2], MutationScope::Series)
            .unwrap();

        assert!(mutation.outcome.is_complete());
        assert_eq!(mutation.outcome.total, 3);
        let remaining = store.query(&ObligationQuery::for_user(user)).unwrap();
        assert_eq!(remaining.len(), 2 + 4);
        assert!(store.get(series[0].id).unwrap().is_some());
        assert!(store.get(series[1].id).unwrap().is_some());
        assert!(series[2..].iter().all(|row| store.get(row.id).unwrap().is_none()));
    }

    #[test]
    fn test_delete_rejects_settled_target() {
        let user = Uuid::new_v4();
        let target = plain(user, "Luz").with_status(ObligationStatus::Settled);
        let mut store = MemoryStore::with_rows(vec![target.clone()]);

        let err = SeriesMutator::new(&mut store)
            .delete(&target, MutationScope::Single)
            .unwrap_err();
        assert!(matches!(err, ObligationError::Validation { .. }));
        assert!(err.to_string().contains("settled"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_series_delete_fails_closed_on_settled_member() {
        let user = Uuid::new_v4();
        let card = Uuid::new_v4();
        let mut series = installments(user, card, 4);
        series[3].status = ObligationStatus::Settled;
        let mut store = MemoryStore::with_rows(series.clone());

        let err = SeriesMutator::new(&mut store)
            .delete(&series[1], MutationScope::Series)
            .unwrap_err();
        assert!(matches!(err, ObligationError::Validation { .. }));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_installment_series_edit_shifts_dates_and_keeps_suffix() {
        let user = Uuid::new_v4();
        let card = Uuid::new_v4();
        let series = installments(user, card, 4);
        let mut store = MemoryStore::with_rows(series.clone());

        let changes = ObligationChanges::new()
            .description("Geladeira Inox")
            .amount(Money::from_decimal(dec!(400)))
            .expected_date(date(2025, 2, 20));
        let mutation = SeriesMutator::new(&mut store)
            .edit(&series[1], MutationScope::Series, &changes)
            .unwrap();
        assert_eq!(mutation.outcome.total, 3);

        let first = store.get(series[0].id).unwrap().unwrap();
        assert_eq!(first.description, "Geladeira - Parcela 1/4");
        assert_eq!(first.expected_date, date(2025, 1, 10));

        let expected = [
            (1, date(2025, 2, 20)),
            (2, date(2025, 3, 20)),
            (3, date(2025, 4, 20)),
        ];
        for (i, day) in expected {
            let row = store.get(series[i].id).unwrap().unwrap();
            assert_eq!(row.expected_date, day);
            assert_eq!(row.expected_month(), &day.format("%Y-%m").to_string());
            assert_eq!(row.installment_index, Some(i as u32 + 1));
            assert_eq!(row.amount, Money::from_major(400));
            assert_eq!(row.description, format!("Geladeira Inox - Parcela {}/4", i + 1));
        }
    }

    #[test]
    fn test_recurring_series_edit_restep_from_new_anchor() {
        let user = Uuid::new_v4();
        let series = weekly(user);
        let mut store = MemoryStore::with_rows(series.clone());

        let changes = ObligationChanges::new().expected_date(date(2025, 3, 10));
        let mutation = SeriesMutator::new(&mut store)
            .edit(&series[1], MutationScope::Series, &changes)
            .unwrap();
        assert_eq!(mutation.rows.len(), series.len() - 1);

        let dates: Vec<_> = mutation.rows.iter().map(|r| r.expected_date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 3, 10), date(2025, 3, 17), date(2025, 3, 24), date(2025, 3, 31)]
        );
        assert_eq!(store.get(series[0].id).unwrap().unwrap().expected_date, date(2025, 3, 1));
    }

    #[test]
    fn test_single_edit_touches_only_target() {
        let user = Uuid::new_v4();
        let series = weekly(user);
        let mut store = MemoryStore::with_rows(series.clone());

        let changes = ObligationChanges::new().amount(Money::from_major(99));
        SeriesMutator::new(&mut store)
            .edit(&series[2], MutationScope::Single, &changes)
            .unwrap();

        let changed: Vec<_> = store.rows().filter(|r| r.amount == Money::from_major(99)).collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, series[2].id);
    }

    #[test]
    fn test_partial_edit_reports_progress() {
        let user = Uuid::new_v4();
        let series = weekly(user);
        let mut store = MemoryStore::with_rows(series.clone());
        store.fail_after(2);

        let changes = ObligationChanges::new().category(Uuid::new_v4());
        let mutation = SeriesMutator::new(&mut store)
            .edit(&series[0], MutationScope::Series, &changes)
            .unwrap();

        assert!(!mutation.outcome.is_complete());
        assert_eq!(mutation.outcome.succeeded, vec![series[0].id, series[1].id]);
        assert_eq!(mutation.outcome.failed.as_ref().unwrap().id, Some(series[2].id));

        let err = mutation.outcome.into_result().unwrap_err();
        assert!(err.to_string().starts_with("update stopped after 2 of 5"));
    }

    #[test]
    fn test_partial_bulk_delete_counts_removed_rows() {
        let user = Uuid::new_v4();
        let series = weekly(user);
        let mut store = MemoryStore::with_rows(series.clone());
        store.fail_bulk_after(3);

        let mutation = SeriesMutator::new(&mut store)
            .delete(&series[0], MutationScope::Series)
            .unwrap();
        assert_eq!(mutation.outcome.succeeded_count(), 3);
        assert_eq!(mutation.outcome.total, 5);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_single_edit_of_plain_row_keeps_new_description() {
        let user = Uuid::new_v4();
        let target = plain(user, "Fatura 03/2025");
        let mut store = MemoryStore::with_rows(vec![target.clone()]);

        let changes = ObligationChanges::new().description("Fatura marco");
        SeriesMutator::new(&mut store)
            .edit(&target, MutationScope::Single, &changes)
            .unwrap();

        let row = store.get(target.id).unwrap().unwrap();
        assert_eq!(row.description, "Fatura marco");
    }

    #[test]
    fn test_series_delete_spares_unflagged_lookalike() {
        let user = Uuid::new_v4();
        let card = Uuid::new_v4();
        let make = |description: &str, index: Option<u32>| {
            let mut row = plain(user, description).with_card(card);
            row.is_installment = index.is_some();
            row.installment_index = index;
            row.installment_count = index.map(|_| 2);
            row
        };
        let target = make("Curso - Parcela 1/2", Some(1));
        let member = make("Curso - Parcela 2/2", Some(2));
        let lookalike = make("Curso 2/2", None);
        let mut store =
            MemoryStore::with_rows(vec![target.clone(), member.clone(), lookalike.clone()]);

        let mutation = SeriesMutator::new(&mut store)
            .delete(&target, MutationScope::Series)
            .unwrap();

        assert_eq!(mutation.applied, MutationScope::Series);
        assert_eq!(mutation.outcome.succeeded, vec![target.id, member.id]);
        assert!(store.get(lookalike.id).unwrap().is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_changes_rejected() {
        let user = Uuid::new_v4();
        let target = plain(user, "Agua");
        let mut store = MemoryStore::with_rows(vec![target.clone()]);
        let err = SeriesMutator::new(&mut store)
            .edit(&target, MutationScope::Single, &ObligationChanges::new())
            .unwrap_err();
        assert!(err.is_rejection());
    }
}
