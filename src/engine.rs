use std::collections::BTreeSet;

use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::batch::{BatchOperation, BatchOutcome};
use crate::billing::{summarize_cards, CardLimitView, CardsSummary, CreditCard};
use crate::config::EngineConfig;
use crate::errors::{ObligationError, Result};
use crate::events::{Event, EventStore};
use crate::obligation::ObligationInstance;
use crate::series::{
    Mutation, ObligationChanges, ObligationRequest, SeriesBuilder, SeriesMutator,
};
use crate::store::{ObligationQuery, ObligationStore};
use crate::types::{CardId, MutationScope, ObligationId, UserId};

/// rows the outcome reports as applied
fn committed<'r>(
    rows: &'r [ObligationInstance],
    outcome: &BatchOutcome,
) -> Vec<&'r ObligationInstance> {
    rows.iter()
        .filter(|row| outcome.succeeded.contains(&row.id))
        .collect()
}

/// entry point for creating, changing and reading obligations
pub struct ObligationEngine<S: ObligationStore> {
    store: S,
    pub config: EngineConfig,
    pub events: EventStore,
}

impl<S: ObligationStore> ObligationEngine<S> {
    /// create new engine over a store
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            events: EventStore::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// load one instance by id
    pub fn get(&self, id: ObligationId) -> Result<ObligationInstance> {
        self.store
            .get(id)?
            .ok_or(ObligationError::NotFound { id })
    }

    /// build every instance a request describes and write them in one call
    pub fn create(
        &mut self,
        request: &ObligationRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchOutcome> {
        let rows = SeriesBuilder::new(&self.config).build(request)?;
        let series_id = rows.first().and_then(|row| row.series_id);
        let outcome = match self.store.insert_many(rows.clone()) {
            Ok(ids) => BatchOutcome::complete(BatchOperation::Create, ids),
            Err(ObligationError::PartialBatchFailure {
                succeeded_ids,
                failed_id,
                cause,
                ..
            }) => {
                let mut outcome = BatchOutcome::new(BatchOperation::Create, rows.len());
                succeeded_ids
                    .into_iter()
                    .for_each(|id| outcome.record_success(id));
                outcome.record_failure(failed_id, &ObligationError::backend(cause));
                outcome
            }
            Err(e) => self.probe_inserted(&rows, e),
        };

        let written = committed(&rows, &outcome);
        if !written.is_empty() {
            self.events.emit(Event::ObligationsCreated {
                ids: outcome.succeeded.clone(),
                series_id,
                timestamp: time_provider.now(),
            });
        }
        self.finish(outcome, &written, time_provider)
    }

    /// apply changes to an instance, or to it and the rest of its series
    pub fn edit(
        &mut self,
        id: ObligationId,
        scope: MutationScope,
        changes: &ObligationChanges,
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchOutcome> {
        let target = self.get(id)?;
        let mutation = SeriesMutator::new(&mut self.store).edit(&target, scope, changes)?;
        self.note_downgrade(&mutation, time_provider);

        let written = committed(&mutation.rows, &mutation.outcome);
        if !written.is_empty() {
            self.events.emit(Event::ObligationsUpdated {
                ids: mutation.outcome.succeeded.clone(),
                timestamp: time_provider.now(),
            });
        }
        self.finish(mutation.outcome, &written, time_provider)
    }

    /// remove a pending instance, or it and the rest of its series
    pub fn delete(
        &mut self,
        id: ObligationId,
        scope: MutationScope,
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchOutcome> {
        let target = self.get(id)?;
        let mutation = SeriesMutator::new(&mut self.store).delete(&target, scope)?;
        self.note_downgrade(&mutation, time_provider);

        let written = committed(&mutation.rows, &mutation.outcome);
        if !written.is_empty() {
            self.events.emit(Event::ObligationsDeleted {
                ids: mutation.outcome.succeeded.clone(),
                timestamp: time_provider.now(),
            });
        }
        self.finish(mutation.outcome, &written, time_provider)
    }

    /// limit positions of a user's active cards as of today
    pub fn card_summary(
        &self,
        user_id: UserId,
        cards: &[CreditCard],
        time_provider: &SafeTimeProvider,
    ) -> Result<CardsSummary> {
        for card in cards {
            card.validate()?;
        }
        let today = self.config.today(time_provider)?;
        let pending = self.store.query(&ObligationQuery::for_user(user_id).pending())?;
        Ok(summarize_cards(
            today,
            cards,
            &pending,
            self.config.reference_month_mode,
        ))
    }

    /// limit position of one card against its own open cycle
    pub fn card_view(
        &self,
        user_id: UserId,
        card: &CreditCard,
        time_provider: &SafeTimeProvider,
    ) -> Result<CardLimitView> {
        card.validate()?;
        let today = self.config.today(time_provider)?;
        let pending = self
            .store
            .query(&ObligationQuery::for_user(user_id).card(card.id).pending())?;
        Ok(CardLimitView::for_today(card, &pending, today))
    }

    /// a failed bulk insert may still have committed a prefix
    fn probe_inserted(&self, rows: &[ObligationInstance], error: ObligationError) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(BatchOperation::Create, rows.len());
        for row in rows {
            if let Ok(Some(_)) = self.store.get(row.id) {
                outcome.record_success(row.id);
            }
        }
        outcome.record_failure(None, &error);
        outcome
    }

    fn note_downgrade(&mut self, mutation: &Mutation, time_provider: &SafeTimeProvider) {
        if !mutation.downgraded() {
            return;
        }
        if let Some(row) = mutation.rows.first() {
            warn!(
                id = %row.id,
                "series scope requested on a non-series instance; applied to it alone"
            );
            self.events.emit(Event::SeriesScopeDowngraded {
                id: row.id,
                timestamp: time_provider.now(),
            });
        }
    }

    fn finish(
        &mut self,
        outcome: BatchOutcome,
        committed: &[&ObligationInstance],
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchOutcome> {
        let card_ids: BTreeSet<CardId> = committed.iter().filter_map(|row| row.card_id).collect();
        if !card_ids.is_empty() {
            self.events.emit(Event::CardsChanged {
                card_ids: card_ids.into_iter().collect(),
                timestamp: time_provider.now(),
            });
        }

        if outcome.is_complete() {
            info!(
                operation = %outcome.operation,
                rows = outcome.total,
                "obligations written"
            );
        } else {
            warn!(
                operation = %outcome.operation,
                succeeded = outcome.succeeded_count(),
                total = outcome.total,
                "obligation batch stopped early"
            );
        }
        outcome.into_result()
    }
}
