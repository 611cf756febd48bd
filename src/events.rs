use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CardId, ObligationId, SeriesId};

/// change signals for read models that depend on obligations or cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ObligationsCreated {
        ids: Vec<ObligationId>,
        series_id: Option<SeriesId>,
        timestamp: DateTime<Utc>,
    },
    ObligationsUpdated {
        ids: Vec<ObligationId>,
        timestamp: DateTime<Utc>,
    },
    ObligationsDeleted {
        ids: Vec<ObligationId>,
        timestamp: DateTime<Utc>,
    },
    /// card-linked obligations changed, so invoice totals and limits are stale
    CardsChanged {
        card_ids: Vec<CardId>,
        timestamp: DateTime<Utc>,
    },
    /// a series-scoped request was applied to the target alone
    SeriesScopeDowngraded {
        id: ObligationId,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// true for events that invalidate obligation read models
    pub fn is_obligation_change(&self) -> bool {
        matches!(
            self,
            Event::ObligationsCreated { .. }
                | Event::ObligationsUpdated { .. }
                | Event::ObligationsDeleted { .. }
        )
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
