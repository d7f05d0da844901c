#![forbid(unsafe_code)]

//! AeroLens core: the filter-and-aggregate pipeline behind the incident
//! dashboard.
//!
//! # Key Components
//!
//! - [`taxonomy`] - Manufacturers, flight phases, severities and their sets
//! - [`RawRow`] - Loosely-typed input row produced by any loader
//! - [`Normalizer`] - Raw rows to [`IncidentRecord`]s, dropping malformed rows
//! - [`FilterState`] - The four narrowing criteria and their invariants
//! - [`aggregate`] - Records + filter to a [`DerivedView`]
//!
//! # How it fits in the system
//! Loading and interaction live in `aerolens-runtime`; rendering lives
//! wherever the view is consumed. Everything here is pure and synchronous:
//! the same records and filter always produce the same view.

pub mod aggregate;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod raw;
pub mod record;
pub mod taxonomy;

pub use aggregate::{
    DerivedView, PhaseRow, YearDetail, YearPoint, aggregate, aggregate_parallel, year_detail,
};
pub use filter::{Change, FilterState, Rejection, YearPreset, YearRange};
pub use normalize::{NormalizeConfig, NormalizeReport, Normalized, Normalizer, normalize};
pub use raw::RawRow;
pub use record::{Casualties, IncidentRecord, YearBound};
pub use taxonomy::{Manufacturer, ManufacturerSet, Phase, PhaseFilter, Severity, SeveritySet};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, info, trace, trace_span, warn};
