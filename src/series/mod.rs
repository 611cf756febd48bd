pub mod builder;
pub mod identity;
pub mod members;
pub mod mutation;

pub use builder::{ObligationRequest, SeriesBuilder, SeriesPlan};
pub use identity::{
    canonicalize, installment_label, is_installment_series, is_true_series,
    parse_installment_suffix,
};
pub use members::{resolve_series_members, SeriesMatcher, SeriesPosition, SeriesSelector};
pub use mutation::{
    apply_bulk_delete, apply_updates, effective_scope, plan_series_edit, Mutation,
    ObligationChanges, SeriesMutator,
};
