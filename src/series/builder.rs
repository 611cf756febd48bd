use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{ObligationError, Result};
use crate::obligation::ObligationInstance;
use crate::schedule::{
    generate_installment_dates, generate_recurring_dates, split_installment_amount,
};
use crate::series::identity::{canonicalize, installment_label};
use crate::types::{
    AccountId, CardId, CategoryId, Direction, InstallmentInfo, Periodicity, SeriesId, UserId,
};

/// shape of the series a request asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesPlan {
    /// exactly one instance
    Single,
    /// one instance per periodicity step from the anchor through `end_date`
    Recurring {
        periodicity: Periodicity,
        end_date: Option<NaiveDate>,
    },
    /// `count` monthly instances splitting the amount
    Installments { count: Option<u32> },
}

/// creation payload from the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub dependent_id: Option<UserId>,
    pub description: String,
    /// per-instance amount for single and recurring plans, purchase total for installments
    pub amount: Money,
    pub direction: Direction,
    pub category_id: CategoryId,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub card_id: Option<CardId>,
    pub anchor_date: NaiveDate,
    pub plan: SeriesPlan,
}

impl ObligationRequest {
    pub fn new(
        user_id: UserId,
        description: impl Into<String>,
        amount: Money,
        direction: Direction,
        category_id: CategoryId,
        anchor_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            dependent_id: None,
            description: description.into(),
            amount,
            direction,
            category_id,
            account_id: None,
            card_id: None,
            anchor_date,
            plan: SeriesPlan::Single,
        }
    }

    pub fn recurring(mut self, periodicity: Periodicity, end_date: NaiveDate) -> Self {
        self.plan = SeriesPlan::Recurring {
            periodicity,
            end_date: Some(end_date),
        };
        self
    }

    pub fn installments(mut self, count: u32) -> Self {
        self.plan = SeriesPlan::Installments { count: Some(count) };
        self
    }

    pub fn on_card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }

    pub fn on_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn for_dependent(mut self, dependent_id: UserId) -> Self {
        self.dependent_id = Some(dependent_id);
        self
    }
}

/// materializes every instance a request describes, without touching storage
pub struct SeriesBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> SeriesBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, request: &ObligationRequest) -> Result<Vec<ObligationInstance>> {
        self.validate(request)?;

        let instances = match &request.plan {
            SeriesPlan::Single => vec![self.base_instance(request, request.anchor_date)],
            SeriesPlan::Recurring {
                periodicity,
                end_date,
            } => {
                let end = end_date.ok_or_else(|| {
                    ObligationError::validation("recurring obligation requires an end date")
                })?;
                self.build_recurring(request, *periodicity, end)?
            }
            SeriesPlan::Installments { count } => {
                let count = count.ok_or_else(|| {
                    ObligationError::validation("installment obligation requires a count")
                })?;
                self.build_installments(request, count)?
            }
        };

        debug!(
            user_id = %request.user_id,
            instances = instances.len(),
            "series built"
        );
        Ok(instances)
    }

    fn validate(&self, request: &ObligationRequest) -> Result<()> {
        if request.description.trim().is_empty() {
            return Err(ObligationError::validation("description is required"));
        }
        if !request.amount.is_positive() {
            return Err(ObligationError::validation(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        Ok(())
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.config.max_series_length as usize {
            return Err(ObligationError::validation(format!(
                "series would create {} instances, limit is {}",
                len, self.config.max_series_length
            )));
        }
        Ok(())
    }

    fn series_id(&self) -> Option<SeriesId> {
        self.config.assign_series_ids.then(Uuid::new_v4)
    }

    fn base_instance(&self, request: &ObligationRequest, date: NaiveDate) -> ObligationInstance {
        let mut instance = ObligationInstance::new(
            request.user_id,
            request.description.trim(),
            request.amount,
            request.direction,
            date,
            request.category_id,
        );
        instance.dependent_id = request.dependent_id;
        instance.account_id = request.account_id;
        instance.card_id = request.card_id;
        instance
    }

    fn build_recurring(
        &self,
        request: &ObligationRequest,
        periodicity: Periodicity,
        end: NaiveDate,
    ) -> Result<Vec<ObligationInstance>> {
        let dates = generate_recurring_dates(request.anchor_date, end, periodicity);
        self.check_length(dates.len())?;

        let series_id = self.series_id();
        Ok(dates
            .into_iter()
            .map(|date| {
                let mut instance = self.base_instance(request, date);
                instance.is_recurring = true;
                instance.periodicity = Some(periodicity);
                instance.series_end_date = Some(end);
                instance.series_id = series_id;
                instance
            })
            .collect())
    }

    fn build_installments(
        &self,
        request: &ObligationRequest,
        count: u32,
    ) -> Result<Vec<ObligationInstance>> {
        if count == 0 {
            return Err(ObligationError::validation("installment count must be at least 1"));
        }
        // one installment is a plain purchase, not a series
        if count == 1 {
            return Ok(vec![self.base_instance(request, request.anchor_date)]);
        }
        self.check_length(count as usize)?;

        let base = canonicalize(&request.description);
        let amounts = split_installment_amount(request.amount, count, self.config.split_policy);
        let dates = generate_installment_dates(request.anchor_date, count);
        let series_id = self.series_id();

        Ok(dates
            .into_iter()
            .zip(amounts)
            .enumerate()
            .map(|(i, (date, amount))| {
                let index = i as u32 + 1;
                let mut instance = self.base_instance(request, date);
                instance.description = installment_label(&base, index, count);
                instance.amount = amount;
                instance.is_installment = true;
                instance.installment_index = Some(index);
                instance.installment_count = Some(count);
                instance.installment_info = Some(InstallmentInfo {
                    index,
                    count,
                    original_amount: Some(request.amount),
                });
                instance.series_id = series_id;
                instance
            })
            .collect())
    }
}
