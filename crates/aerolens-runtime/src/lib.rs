#![forbid(unsafe_code)]

//! Runtime around the AeroLens core.
//!
//! - [`controller`]: the [`SelectionController`] that owns the filter state
//!   and keeps the derived view in step with it.
//! - [`memo`]: bounded cache of views keyed by filter fingerprint.
//! - [`worker`]: background recompute with latest-wins delivery.
//! - [`load`]: CSV and JSON dataset readers.

pub mod controller;
pub mod csv;
pub mod load;
pub mod memo;
pub mod worker;

pub use controller::{Command, ControllerConfig, SelectionController, Universe};
pub use load::{Format, LoadError, LoadResult, load_dataset, load_path, read_csv, read_json, read_json_lines};
pub use memo::{CacheStats, ViewCache};
pub use worker::{Computed, RecomputeWorker};
