#![forbid(unsafe_code)]

//! Selection controller: the single owner and mutator of the filter state.
//!
//! Presentation layers send discrete commands (toggle a manufacturer, move a
//! slider handle, pick a phase) and read back an immutable view. Each command
//! is one atomic unit: mutate the filter, then recompute the view, before the
//! next command can be observed.
//!
//! # Diagnostic Logging
//!
//! - `debug` on every applied command, with the new filter fingerprint
//! - `info` on every rejected command, with the rejection reason
//! - `trace` on cache hits
//!
//! Enable with: `RUST_LOG=aerolens_runtime::controller=debug`
//!
//! # Deferred mode
//!
//! [`SelectionController::dispatch_deferred`] mutates the filter and hands the
//! recompute to a [`RecomputeWorker`]. The view stays as-is until
//! [`SelectionController::sync`] installs a result, and a result is installed
//! only when it was computed for the filter that is current *now*.

use std::fmt;
use std::sync::Arc;

use aerolens_core::{
    Change, DerivedView, FilterState, IncidentRecord, Manufacturer, ManufacturerSet, Phase,
    PhaseFilter, Rejection, Severity, YearBound, YearDetail, YearPreset, aggregate,
    aggregate_parallel, year_detail,
};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::memo::{CacheStats, DEFAULT_CAPACITY, ViewCache};
use crate::worker::{Computed, RecomputeWorker};

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Views remembered by filter fingerprint. Zero disables the memo.
    pub cache_capacity: usize,
    /// Compute the two views on separate threads.
    pub parallel: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            parallel: false,
        }
    }
}

/// A discrete user intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleManufacturer(Manufacturer),
    ToggleSeverity(Severity),
    SetPhase(PhaseFilter),
    /// Cross-chart drill-down: a breakdown bar was picked.
    FocusPhase(Phase),
    SetYearRange { min: i32, max: i32 },
    SetYearMin(i32),
    SetYearMax(i32),
    Preset(YearPreset),
    Reset,
}

impl Command {
    /// Apply to a filter in place.
    pub fn apply(self, filter: &mut FilterState) -> Change {
        match self {
            Command::ToggleManufacturer(m) => filter.toggle_manufacturer(m),
            Command::ToggleSeverity(s) => filter.toggle_severity(s),
            Command::SetPhase(p) => filter.set_phase(p),
            Command::FocusPhase(p) => filter.set_phase(PhaseFilter::Only(p)),
            Command::SetYearRange { min, max } => filter.set_year_range(min, max),
            Command::SetYearMin(v) => filter.set_year_min(v),
            Command::SetYearMax(v) => filter.set_year_max(v),
            Command::Preset(p) => filter.apply_preset(p),
            Command::Reset => filter.reset(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::ToggleManufacturer(_) => "toggle_manufacturer",
            Command::ToggleSeverity(_) => "toggle_severity",
            Command::SetPhase(_) => "set_phase",
            Command::FocusPhase(_) => "focus_phase",
            Command::SetYearRange { .. } => "set_year_range",
            Command::SetYearMin(_) => "set_year_min",
            Command::SetYearMax(_) => "set_year_max",
            Command::Preset(_) => "preset",
            Command::Reset => "reset",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ToggleManufacturer(m) => write!(f, "toggle manufacturer {m}"),
            Command::ToggleSeverity(s) => write!(f, "toggle severity {s}"),
            Command::SetPhase(p) => write!(f, "set phase {p}"),
            Command::FocusPhase(p) => write!(f, "focus phase {p}"),
            Command::SetYearRange { min, max } => write!(f, "set years {min}..{max}"),
            Command::SetYearMin(v) => write!(f, "set year min {v}"),
            Command::SetYearMax(v) => write!(f, "set year max {v}"),
            Command::Preset(p) => write!(f, "preset {}", p.label()),
            Command::Reset => write!(f, "reset"),
        }
    }
}

/// Everything a presentation layer needs to build its controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Universe {
    pub manufacturers: Vec<Manufacturer>,
    pub phases: Vec<Phase>,
    pub severities: Vec<Severity>,
    pub bound: YearBound,
    /// Recognized manufacturers that occur in the loaded records.
    pub observed_manufacturers: ManufacturerSet,
}

/// Owns records, filter and current view.
pub struct SelectionController {
    records: Arc<[IncidentRecord]>,
    filter: FilterState,
    view: Arc<DerivedView>,
    cache: ViewCache,
    config: ControllerConfig,
    recomputes: u64,
    pending: Option<u64>,
}

impl fmt::Debug for SelectionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionController")
            .field("records", &self.records.len())
            .field("filter", &self.filter)
            .field("qualifying", &self.view.qualifying)
            .field("recomputes", &self.recomputes)
            .field("pending", &self.pending)
            .finish()
    }
}

impl SelectionController {
    /// Controller over the dataset year bound with everything selected.
    pub fn new(records: impl Into<Arc<[IncidentRecord]>>) -> Self {
        Self::with_config(records, YearBound::DATASET, ControllerConfig::default())
    }

    pub fn with_config(
        records: impl Into<Arc<[IncidentRecord]>>,
        bound: YearBound,
        config: ControllerConfig,
    ) -> Self {
        let records = records.into();
        let filter = FilterState::new(bound);
        let mut controller = Self {
            view: Arc::new(DerivedView::default()),
            records,
            filter,
            cache: ViewCache::new(config.cache_capacity),
            config,
            recomputes: 0,
            pending: None,
        };
        controller.refresh();
        info!(
            records = controller.records.len(),
            bound_min = bound.min,
            bound_max = bound.max,
            qualifying = controller.view.qualifying,
            "selection controller ready"
        );
        controller
    }

    // ── Read-only surface ───────────────────────────────────────────────

    pub fn view(&self) -> &DerivedView {
        &self.view
    }

    /// The current view as a shareable handle.
    pub fn shared_view(&self) -> Arc<DerivedView> {
        Arc::clone(&self.view)
    }

    /// Snapshot of the current filter.
    pub fn filter_state(&self) -> FilterState {
        self.filter
    }

    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Shared handle to the record set, e.g. for a [`RecomputeWorker`].
    pub fn shared_records(&self) -> Arc<[IncidentRecord]> {
        Arc::clone(&self.records)
    }

    pub fn universe(&self) -> Universe {
        Universe {
            manufacturers: Manufacturer::ALL.to_vec(),
            phases: Phase::RECOGNIZED.to_vec(),
            severities: Severity::ALL.to_vec(),
            bound: self.filter.bound(),
            observed_manufacturers: self.records.iter().filter_map(|r| r.manufacturer).collect(),
        }
    }

    /// Number of views actually computed (cache hits excluded).
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether a deferred recompute has not been installed yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Tooltip-style drill-down under the current filter.
    pub fn year_detail(&self, year: i32, manufacturer: Manufacturer) -> YearDetail {
        year_detail(&self.records, &self.filter, year, manufacturer)
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Apply `command` and recompute synchronously when it changed the filter.
    pub fn dispatch(&mut self, command: Command) -> Change {
        let change = self.mutate(command);
        if change.needs_recompute() {
            self.pending = None;
            self.refresh();
        }
        change
    }

    pub fn toggle_manufacturer(&mut self, m: Manufacturer) -> Change {
        self.dispatch(Command::ToggleManufacturer(m))
    }

    pub fn toggle_severity(&mut self, s: Severity) -> Change {
        self.dispatch(Command::ToggleSeverity(s))
    }

    pub fn set_phase(&mut self, phase: PhaseFilter) -> Change {
        self.dispatch(Command::SetPhase(phase))
    }

    /// Parse `"all"` or a phase label; anything else is rejected.
    pub fn set_phase_str(&mut self, raw: &str) -> Change {
        match PhaseFilter::parse(raw) {
            Some(phase) => self.set_phase(phase),
            None => {
                info!(input = raw, "rejected phase selection");
                Change::Rejected(Rejection::UnrecognizedPhase)
            }
        }
    }

    /// Drill down into a breakdown bar.
    pub fn focus_phase(&mut self, phase: Phase) -> Change {
        self.dispatch(Command::FocusPhase(phase))
    }

    pub fn set_year_range(&mut self, min: i32, max: i32) -> Change {
        self.dispatch(Command::SetYearRange { min, max })
    }

    pub fn set_year_min(&mut self, min: i32) -> Change {
        self.dispatch(Command::SetYearMin(min))
    }

    pub fn set_year_max(&mut self, max: i32) -> Change {
        self.dispatch(Command::SetYearMax(max))
    }

    pub fn apply_preset(&mut self, preset: YearPreset) -> Change {
        self.dispatch(Command::Preset(preset))
    }

    pub fn reset(&mut self) -> Change {
        self.dispatch(Command::Reset)
    }

    // ── Deferred recompute ──────────────────────────────────────────────

    /// Apply `command` and queue the recompute on `worker` instead of
    /// computing inline.
    pub fn dispatch_deferred(&mut self, command: Command, worker: &mut RecomputeWorker) -> Change {
        let change = self.mutate(command);
        if change.needs_recompute() {
            if let Some(view) = self.cache.get(&self.filter) {
                trace!(fingerprint = self.filter.fingerprint(), "deferred recompute served from cache");
                self.view = view;
                self.pending = None;
            } else {
                self.pending = Some(worker.submit(self.filter));
            }
        }
        change
    }

    /// Install the newest finished result, if it matches the current filter.
    /// Returns whether the view changed.
    pub fn sync(&mut self, worker: &mut RecomputeWorker) -> bool {
        match worker.poll_latest() {
            Some(computed) => self.install(computed),
            None => false,
        }
    }

    /// Install a computed view. Refused unless it was computed for the
    /// filter that is current now.
    pub fn install(&mut self, computed: Computed) -> bool {
        if computed.filter != self.filter {
            debug!(ticket = computed.ticket, "discarding view for superseded filter");
            return false;
        }
        self.recomputes += 1;
        self.cache.insert(computed.filter, Arc::clone(&computed.view));
        self.view = computed.view;
        self.pending = None;
        true
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn mutate(&mut self, command: Command) -> Change {
        let change = command.apply(&mut self.filter);
        match change {
            Change::Applied => debug!(
                command = command.name(),
                detail = %command,
                fingerprint = self.filter.fingerprint(),
                "filter updated"
            ),
            Change::Unchanged => trace!(command = command.name(), "filter unchanged"),
            Change::Rejected(why) => info!(
                command = command.name(),
                detail = %command,
                reason = %why,
                "command rejected"
            ),
        }
        change
    }

    fn refresh(&mut self) {
        if let Some(view) = self.cache.get(&self.filter) {
            trace!(fingerprint = self.filter.fingerprint(), "view served from cache");
            self.view = view;
            return;
        }
        let view = if self.config.parallel {
            aggregate_parallel(&self.records, &self.filter)
        } else {
            aggregate(&self.records, &self.filter)
        };
        self.recomputes += 1;
        let view = Arc::new(view);
        self.cache.insert(self.filter, Arc::clone(&view));
        self.view = view;
    }
}
