use chrono::{FixedOffset, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::errors::{ObligationError, Result};
pub use crate::schedule::SplitPolicy;

/// how the combined card summary picks the month it displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMonthMode {
    /// one month for every card, taken from the earliest closing day
    ///
    /// Cards with a later closing day may be shown against a month that is
    /// not their own open invoice.
    #[default]
    EarliestClosingDay,
    /// each card uses its own open cycle
    PerCard,
}

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub split_policy: SplitPolicy,
    pub reference_month_mode: ReferenceMonthMode,
    /// offset of the local calendar from UTC, in minutes
    pub utc_offset_minutes: i32,
    /// most instances a single create request may produce
    pub max_series_length: u32,
    /// stamp new series with an explicit series id
    pub assign_series_ids: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            split_policy: SplitPolicy::RemainderToLast,
            reference_month_mode: ReferenceMonthMode::EarliestClosingDay,
            utc_offset_minutes: 0,
            max_series_length: 1200,
            assign_series_ids: true,
        }
    }
}

impl EngineConfig {
    /// behaviour of the historical writers: drifting splits, no series ids
    pub fn legacy() -> Self {
        Self {
            split_policy: SplitPolicy::EqualDrift,
            assign_series_ids: false,
            ..Self::default()
        }
    }

    /// local calendar at a fixed offset, e.g. `-180` for UTC-3
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_reference_month_mode(mut self, mode: ReferenceMonthMode) -> Self {
        self.reference_month_mode = mode;
        self
    }

    pub fn with_split_policy(mut self, policy: SplitPolicy) -> Self {
        self.split_policy = policy;
        self
    }

    /// parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ObligationError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.offset()?;
        if self.max_series_length == 0 {
            return Err(ObligationError::InvalidConfiguration {
                message: "max_series_length must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ObligationError::InvalidConfiguration {
                message: format!("utc offset out of range: {} minutes", self.utc_offset_minutes),
            }
        })
    }

    /// today's date on the configured local calendar
    pub fn today(&self, time_provider: &SafeTimeProvider) -> Result<NaiveDate> {
        let offset = self.offset()?;
        Ok(time_provider.now().with_timezone(&offset).date_naive())
    }
}
