pub mod batch;
pub mod billing;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod obligation;
pub mod schedule;
pub mod series;
pub mod store;
pub mod telemetry;
pub mod types;

// re-export key types
pub use batch::{BatchOperation, BatchOutcome, FailedRow};
pub use billing::{
    available_limit, invoice_instances, open_cycle_month, reference_month, summarize_cards,
    used_limit, CardLimitView, CardsSummary, CreditCard,
};
pub use config::{EngineConfig, ReferenceMonthMode, SplitPolicy};
pub use decimal::{Money, Rate};
pub use engine::ObligationEngine;
pub use errors::{ObligationError, Result};
pub use events::{Event, EventStore};
pub use obligation::ObligationInstance;
pub use schedule::{
    add_months, generate_installment_dates, generate_recurring_dates, month_key,
    split_installment_amount,
};
pub use series::{
    canonicalize, is_true_series, resolve_series_members, ObligationChanges, ObligationRequest,
    SeriesBuilder, SeriesMatcher, SeriesMutator, SeriesPlan,
};
pub use store::{MemoryStore, ObligationQuery, ObligationStore};
pub use types::{
    AccountId, CardId, CategoryId, Direction, InstallmentInfo, MutationScope, ObligationId,
    ObligationStatus, Periodicity, SeriesId, UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
