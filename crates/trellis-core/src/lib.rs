//! Faceting engine for trellis (small multiples) displays
//!
//! This crate turns a flat row set into an ordered list of labelled subsets,
//! one per chart, together with a value domain shared by every chart. It
//! knows nothing about drawing; a presentation layer consumes the layout.
//!
//! Pipeline: rows → [`FacetIndex`] → filter by query → metric sort →
//! [`TrellisLayout`] with the [`Domain`] computed over all rows.

pub mod accessor;
pub mod debounce;
pub mod domain;
pub mod error;
pub mod events;
pub mod facet;
pub mod layout;
pub mod metric;
pub mod sort;
pub mod state;

// Re-export commonly used types
pub use accessor::{
    FacetKey, FieldValue, KeyAccessor, Record, ValueAccessor, ValueKey,
    DEFAULT_FACET_SEPARATOR,
};
pub use debounce::{QueryDebouncer, DEFAULT_DEBOUNCE};
pub use domain::{compute_domain, Domain};
pub use error::{Result, TrellisError};
pub use events::EventBus;
pub use facet::{group, Facet, FacetIndex};
pub use layout::{layout, FacetCounts, LayoutOptions, TrellisLayout};
pub use metric::{calculate_metric, MetricKind};
pub use sort::{
    compare_labels, filter_facets, matches_query, sort_facets, SortDirection, SortSpec,
    SortType,
};
pub use state::TrellisState;
