use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::schedule::month_key;
use crate::series::identity::parse_installment_suffix;
use crate::types::{
    AccountId, CardId, CategoryId, Direction, InstallmentInfo, ObligationId, ObligationStatus,
    Periodicity, SeriesId, UserId,
};

/// one dated expected income or expense
///
/// Rows written by older producers carry their installment position in
/// different places: flat `installment_index`/`installment_count` fields, a
/// structured `installment_info`, or only a ` - Parcela n/m` style suffix in
/// the description. All three deserialize into this type. The `resolved_*`
/// accessors read the two structured shapes; the suffix is only consulted by
/// [`ObligationInstance::installment_position`] on rows flagged as
/// installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationInstance {
    pub id: ObligationId,
    pub user_id: UserId,
    #[serde(default)]
    pub dependent_id: Option<UserId>,
    pub description: String,
    pub amount: Money,
    pub direction: Direction,
    pub expected_date: NaiveDate,
    #[serde(default)]
    expected_month: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default, alias = "credit_card_id")]
    pub card_id: Option<CardId>,
    pub status: ObligationStatus,
    #[serde(default, alias = "settlement_date")]
    pub settled_on: Option<NaiveDate>,

    // installment markers
    #[serde(default)]
    pub is_installment: bool,
    #[serde(default, alias = "current_installment")]
    pub installment_index: Option<u32>,
    #[serde(default, alias = "total_installments")]
    pub installment_count: Option<u32>,
    #[serde(default)]
    pub installment_info: Option<InstallmentInfo>,

    // recurring markers
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub periodicity: Option<Periodicity>,
    #[serde(default)]
    pub series_end_date: Option<NaiveDate>,

    #[serde(default)]
    pub series_id: Option<SeriesId>,
}

impl ObligationInstance {
    /// create a plain pending instance
    pub fn new(
        user_id: UserId,
        description: impl Into<String>,
        amount: Money,
        direction: Direction,
        expected_date: NaiveDate,
        category_id: CategoryId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            dependent_id: None,
            description: description.into(),
            amount,
            direction,
            expected_date,
            expected_month: month_key(expected_date),
            category_id,
            account_id: None,
            card_id: None,
            status: ObligationStatus::Pending,
            settled_on: None,
            is_installment: false,
            installment_index: None,
            installment_count: None,
            installment_info: None,
            is_recurring: false,
            periodicity: None,
            series_end_date: None,
            series_id: None,
        }
    }

    pub fn with_card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_status(mut self, status: ObligationStatus) -> Self {
        self.status = status;
        self
    }

    /// `YYYY-MM` of the expected date
    pub fn expected_month(&self) -> &str {
        &self.expected_month
    }

    /// move the instance, keeping `expected_month` in step
    pub fn set_expected_date(&mut self, date: NaiveDate) {
        self.expected_date = date;
        self.expected_month = month_key(date);
    }

    /// re-derive fields that rows from older writers may lack or carry stale
    pub fn normalize(&mut self) {
        self.expected_month = month_key(self.expected_date);
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ObligationStatus::Pending
    }

    /// installment count from flat fields, then structured info
    pub fn resolved_installment_count(&self) -> Option<u32> {
        self.installment_count
            .filter(|count| *count > 0)
            .or_else(|| self.installment_info.map(|info| info.count))
    }

    /// 1-based position from flat fields, then structured info
    pub fn resolved_installment_index(&self) -> Option<u32> {
        self.installment_index
            .filter(|index| *index > 0)
            .or_else(|| self.installment_info.map(|info| info.index))
    }

    /// `(index, count)` of a row flagged as an installment
    ///
    /// Structured markers win. A flagged row without them falls back to the
    /// description suffix; an unflagged row never has a position.
    pub fn installment_position(&self) -> Option<(u32, u32)> {
        if !self.is_installment {
            return None;
        }
        match (self.resolved_installment_index(), self.resolved_installment_count()) {
            (Some(index), Some(count)) => Some((index, count)),
            _ => parse_installment_suffix(&self.description),
        }
    }

    /// original purchase total recorded on the structured marker
    pub fn original_amount(&self) -> Option<Money> {
        self.installment_info.and_then(|info| info.original_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample() -> ObligationInstance {
        ObligationInstance::new(
            Uuid::new_v4(),
            "Internet",
            Money::from_major(120),
            Direction::Outflow,
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_expected_month_follows_date() {
        let mut instance = sample();
        assert_eq!(instance.expected_month(), "2025-01");

        instance.set_expected_date(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(instance.expected_month(), "2025-02");
    }

    #[test]
    fn test_deserialize_flat_installment_record() {
        let value = json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "description": "Notebook",
            "amount": "250.00",
            "direction": "outflow",
            "expected_date": "2025-03-10",
            "category_id": Uuid::new_v4(),
            "credit_card_id": Uuid::new_v4(),
            "status": "pending",
            "is_installment": true,
            "current_installment": 2,
            "total_installments": 4
        });

        let instance: ObligationInstance = serde_json::from_value(value).unwrap();
        let instance = instance.normalized();
        assert_eq!(instance.expected_month(), "2025-03");
        assert!(instance.card_id.is_some());
        assert_eq!(instance.resolved_installment_index(), Some(2));
        assert_eq!(instance.resolved_installment_count(), Some(4));
        assert_eq!(instance.amount, Money::from_decimal(dec!(250)));
    }

    #[test]
    fn test_deserialize_structured_installment_record() {
        let value = json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "description": "Sofa",
            "amount": "300.00",
            "direction": "outflow",
            "expected_date": "2025-04-05",
            "category_id": Uuid::new_v4(),
            "status": "pending",
            "is_installment": true,
            "installment_info": { "current": 3, "total": 10, "original_amount": "3000.00" }
        });

        let instance: ObligationInstance = serde_json::from_value(value).unwrap();
        assert_eq!(instance.resolved_installment_index(), Some(3));
        assert_eq!(instance.resolved_installment_count(), Some(10));
        assert_eq!(instance.original_amount(), Some(Money::from_major(3000)));
    }

    #[test]
    fn test_description_suffix_needs_installment_flag() {
        let mut instance = sample();
        instance.description = "TV - Parcela 5/12".to_string();
        assert_eq!(instance.resolved_installment_index(), None);
        assert_eq!(instance.resolved_installment_count(), None);
        assert_eq!(instance.installment_position(), None);

        instance.is_installment = true;
        assert_eq!(instance.resolved_installment_count(), None);
        assert_eq!(instance.installment_position(), Some((5, 12)));

        instance.installment_count = Some(10);
        instance.installment_index = Some(4);
        assert_eq!(instance.resolved_installment_index(), Some(4));
        assert_eq!(instance.resolved_installment_count(), Some(10));
        assert_eq!(instance.installment_position(), Some((4, 10)));
    }
}
