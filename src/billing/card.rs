use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{ObligationError, Result};
use crate::types::CardId;

/// credit card as read from the card read model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: CardId,
    pub name: String,
    #[serde(alias = "limit")]
    pub total_limit: Money,
    /// last day of a cycle; `1..=31`
    pub closing_day: u8,
    #[serde(default)]
    pub due_day: Option<u8>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CreditCard {
    /// create new active card
    pub fn new(name: impl Into<String>, total_limit: Money, closing_day: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_limit,
            closing_day,
            due_day: None,
            active: true,
        }
    }

    pub fn with_due_day(mut self, due_day: u8) -> Self {
        self.due_day = Some(due_day);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.closing_day) {
            return Err(ObligationError::validation(format!(
                "closing day must be within 1..=31, got {}",
                self.closing_day
            )));
        }
        if let Some(due_day) = self.due_day {
            if !(1..=31).contains(&due_day) {
                return Err(ObligationError::validation(format!(
                    "due day must be within 1..=31, got {}",
                    due_day
                )));
            }
        }
        if self.total_limit.is_negative() {
            return Err(ObligationError::validation("card limit cannot be negative"));
        }
        Ok(())
    }
}
