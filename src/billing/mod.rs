pub mod card;
pub mod cycle;
pub mod limit;

pub use card::CreditCard;
pub use cycle::{earliest_closing_day, open_cycle_month, reference_month};
pub use limit::{
    available_limit, invoice_instances, summarize_cards, used_limit, CardLimitView, CardsSummary,
};
