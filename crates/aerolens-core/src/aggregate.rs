#![forbid(unsafe_code)]

//! Aggregation engine: records + filter state to a [`DerivedView`].
//!
//! # Algorithm
//!
//! A record *qualifies* when [`FilterState::admits`] holds. Two count matrices
//! are built over qualifying records:
//!
//! - **Time series**: year × manufacturer. Every year of the selected range
//!   gets a point, and every point holds a count for every selected
//!   manufacturer, zero included.
//! - **Phase breakdown**: recognized phase × severity. Every row keeps the
//!   full four-severity shape; deselected severities read zero. Rows with a
//!   zero total are omitted, and the remaining rows are stable-sorted by total
//!   descending, so ties keep phase enumeration order.
//!
//! # Key Invariants
//!
//! 1. **Complete**: `time_series.len() == year_range.len()`, years strictly
//!    increasing.
//! 2. **Conserving**: the breakdown totals sum to the number of qualifying
//!    records with a recognized phase.
//! 3. **Pure**: output depends only on the inputs; repeated calls are equal.
//! 4. **Total**: the empty record set yields a zero-filled series and an empty
//!    breakdown, never an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::FilterState;
use crate::record::IncidentRecord;
use crate::taxonomy::{Manufacturer, Phase, Severity};
use crate::{trace, trace_span};

const MAKES: usize = Manufacturer::ALL.len();
const PHASES: usize = Phase::RECOGNIZED.len();
const SEVERITIES: usize = Severity::ALL.len();

// ─────────────────────────────────────────────────────────────────────────────
// Output types
// ─────────────────────────────────────────────────────────────────────────────

/// Per-manufacturer incident counts for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub counts: BTreeMap<Manufacturer, u32>,
}

impl YearPoint {
    /// Count for `m`, zero when `m` is not selected.
    pub fn count(&self, m: Manufacturer) -> u32 {
        self.counts.get(&m).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Per-severity incident counts for one flight phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRow {
    pub phase: Phase,
    pub counts: BTreeMap<Severity, u32>,
    pub total: u32,
}

impl PhaseRow {
    pub fn count(&self, s: Severity) -> u32 {
        self.counts.get(&s).copied().unwrap_or(0)
    }

    /// Share of this phase's incidents in severity `s`, as a rounded percent.
    pub fn share(&self, s: Severity) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let count = u64::from(self.count(s));
        let total = u64::from(self.total);
        ((200 * count + total) / (2 * total)) as u32
    }
}

/// The two aggregate tables handed to renderers. Read-only by contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DerivedView {
    pub time_series: Vec<YearPoint>,
    pub phase_breakdown: Vec<PhaseRow>,
    /// Number of records that passed the filter.
    pub qualifying: usize,
}

impl DerivedView {
    /// Largest single manufacturer-year count, zero for an empty view.
    pub fn peak(&self) -> u32 {
        self.time_series
            .iter()
            .flat_map(|p| p.counts.values().copied())
            .max()
            .unwrap_or(0)
    }

    /// One manufacturer's `(year, count)` line across the series.
    pub fn series(&self, m: Manufacturer) -> Vec<(i32, u32)> {
        self.time_series
            .iter()
            .map(|p| (p.year, p.count(m)))
            .collect()
    }

    /// Sum of every breakdown cell.
    pub fn breakdown_total(&self) -> u64 {
        self.phase_breakdown
            .iter()
            .map(|row| u64::from(row.total))
            .sum()
    }

    /// Whether no record qualified.
    pub fn is_empty(&self) -> bool {
        self.qualifying == 0
    }

    /// Breakdown row for `phase`, if it has any incidents.
    pub fn phase_row(&self, phase: Phase) -> Option<&PhaseRow> {
        self.phase_breakdown.iter().find(|row| row.phase == phase)
    }
}

/// Drill-down for one manufacturer in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearDetail {
    pub year: i32,
    pub manufacturer: Manufacturer,
    pub total: u32,
    pub fatal: u32,
    pub non_fatal: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Time series and qualifying count.
pub fn time_series(records: &[IncidentRecord], filter: &FilterState) -> (Vec<YearPoint>, usize) {
    let range = filter.year_range();
    let mut matrix = vec![[0u32; MAKES]; range.len()];
    let mut qualifying = 0usize;

    for record in records.iter().filter(|r| filter.admits(r)) {
        // `admits` guarantees a recognized manufacturer and an in-range year.
        if let Some(m) = record.manufacturer {
            let row = (record.year - range.min) as usize;
            matrix[row][m as usize] += 1;
            qualifying += 1;
        }
    }

    let selected = filter.manufacturers();
    let points = range
        .years()
        .zip(matrix)
        .map(|(year, row)| YearPoint {
            year,
            counts: selected.members().map(|m| (m, row[m as usize])).collect(),
        })
        .collect();

    (points, qualifying)
}

/// Phase × severity breakdown, sorted by total descending.
pub fn phase_breakdown(records: &[IncidentRecord], filter: &FilterState) -> Vec<PhaseRow> {
    let mut matrix = [[0u32; SEVERITIES]; PHASES];

    for record in records.iter().filter(|r| filter.admits(r)) {
        if record.phase.is_recognized() {
            matrix[record.phase.ordinal()][record.severity as usize] += 1;
        }
    }

    let mut rows: Vec<PhaseRow> = Phase::RECOGNIZED
        .into_iter()
        .zip(matrix)
        .filter_map(|(phase, cells)| {
            let total: u32 = cells.iter().sum();
            (total > 0).then(|| PhaseRow {
                phase,
                counts: Severity::ALL.into_iter().zip(cells).collect(),
                total,
            })
        })
        .collect();

    // Stable: equal totals keep enumeration order.
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Compute both views.
pub fn aggregate(records: &[IncidentRecord], filter: &FilterState) -> DerivedView {
    let span = trace_span!("aggregate", records = records.len());
    let _guard = span.enter();
    let (time_series, qualifying) = time_series(records, filter);
    let phase_breakdown = phase_breakdown(records, filter);
    trace!(
        records = records.len(),
        qualifying,
        phases = phase_breakdown.len(),
        "aggregated derived view"
    );
    DerivedView {
        time_series,
        phase_breakdown,
        qualifying,
    }
}

/// Compute the two views on separate threads.
///
/// Both are pure reads over `records` writing disjoint outputs, so the result
/// is identical to [`aggregate`].
pub fn aggregate_parallel(records: &[IncidentRecord], filter: &FilterState) -> DerivedView {
    let (series, phase_breakdown) = std::thread::scope(|scope| {
        let breakdown = scope.spawn(|| phase_breakdown(records, filter));
        let series = time_series(records, filter);
        // Re-run inline if the worker thread panicked.
        let rows = breakdown
            .join()
            .unwrap_or_else(|_| phase_breakdown(records, filter));
        (series, rows)
    });
    let (time_series, qualifying) = series;
    DerivedView {
        time_series,
        phase_breakdown,
        qualifying,
    }
}

/// Qualifying incidents for `manufacturer` in `year`, split by outcome.
pub fn year_detail(
    records: &[IncidentRecord],
    filter: &FilterState,
    year: i32,
    manufacturer: Manufacturer,
) -> YearDetail {
    let mut detail = YearDetail {
        year,
        manufacturer,
        total: 0,
        fatal: 0,
        non_fatal: 0,
    };
    for record in records
        .iter()
        .filter(|r| r.year == year && r.manufacturer == Some(manufacturer) && filter.admits(r))
    {
        detail.total += 1;
        match record.severity {
            Severity::Fatal => detail.fatal += 1,
            Severity::NonFatal => detail.non_fatal += 1,
            Severity::Incident | Severity::Unavailable => {}
        }
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{ManufacturerSet, PhaseFilter, SeveritySet};

    fn rec(year: i32, m: Option<Manufacturer>, phase: Phase, s: Severity) -> IncidentRecord {
        IncidentRecord::new(year, m, phase, s)
    }

    fn two_cruise_records() -> Vec<IncidentRecord> {
        vec![
            rec(1999, Some(Manufacturer::Boeing), Phase::Cruise, Severity::Fatal),
            rec(1999, Some(Manufacturer::Airbus), Phase::Cruise, Severity::Incident),
        ]
    }

    #[test]
    fn single_year_time_series() {
        let records = two_cruise_records();
        let filter = FilterState::default().with_year_range(1999, 1999);
        let view = aggregate(&records, &filter);

        assert_eq!(view.time_series.len(), 1);
        let point = &view.time_series[0];
        assert_eq!(point.year, 1999);
        assert_eq!(point.count(Manufacturer::Boeing), 1);
        assert_eq!(point.count(Manufacturer::Airbus), 1);
        assert_eq!(point.count(Manufacturer::Embraer), 0);
        assert_eq!(point.counts.len(), Manufacturer::ALL.len());
        assert_eq!(view.qualifying, 2);
    }

    #[test]
    fn fatal_only_breakdown_keeps_full_shape() {
        let records = two_cruise_records();
        let filter = FilterState::default()
            .with_year_range(1999, 1999)
            .with_severities(Severity::Fatal.flag())
            .unwrap();
        let view = aggregate(&records, &filter);

        assert_eq!(view.phase_breakdown.len(), 1);
        let row = &view.phase_breakdown[0];
        assert_eq!(row.phase, Phase::Cruise);
        assert_eq!(row.count(Severity::Fatal), 1);
        assert_eq!(row.count(Severity::NonFatal), 0);
        assert_eq!(row.count(Severity::Incident), 0);
        assert_eq!(row.count(Severity::Unavailable), 0);
        assert_eq!(row.counts.len(), 4);
        assert_eq!(row.total, 1);
    }

    #[test]
    fn empty_year_zero_fills() {
        let records = two_cruise_records();
        let filter = FilterState::default().with_year_range(2000, 2000);
        let view = aggregate(&records, &filter);

        assert_eq!(view.time_series.len(), 1);
        assert_eq!(view.time_series[0].year, 2000);
        assert!(view.time_series[0].counts.values().all(|&c| c == 0));
        assert_eq!(view.time_series[0].counts.len(), 5);
        assert!(view.phase_breakdown.is_empty());
        assert!(view.is_empty());
        assert_eq!(view.peak(), 0);
    }

    #[test]
    fn empty_record_set() {
        let view = aggregate(&[], &FilterState::default());
        assert_eq!(view.time_series.len(), 22);
        assert!(view.phase_breakdown.is_empty());
        assert_eq!(view.qualifying, 0);
    }

    #[test]
    fn counts_only_selected_manufacturers() {
        let records = two_cruise_records();
        let filter = FilterState::default()
            .with_manufacturers(ManufacturerSet::BOEING | ManufacturerSet::EMBRAER)
            .unwrap();
        let view = aggregate(&records, &filter);
        let point = view.time_series.iter().find(|p| p.year == 1999).unwrap();
        let keys: Vec<_> = point.counts.keys().copied().collect();
        assert_eq!(keys, vec![Manufacturer::Boeing, Manufacturer::Embraer]);
        assert_eq!(point.count(Manufacturer::Boeing), 1);
        assert_eq!(view.qualifying, 1);
    }

    #[test]
    fn unknown_manufacturer_never_counts() {
        let records = vec![
            rec(2001, None, Phase::Landing, Severity::Fatal),
            rec(2001, Some(Manufacturer::Embraer), Phase::Landing, Severity::Fatal),
        ];
        let view = aggregate(&records, &FilterState::default());
        assert_eq!(view.qualifying, 1);
        assert_eq!(view.breakdown_total(), 1);
    }

    #[test]
    fn unknown_phase_counts_in_series_not_breakdown() {
        let records = vec![
            rec(2001, Some(Manufacturer::Boeing), Phase::Unknown, Severity::Fatal),
            rec(2001, Some(Manufacturer::Boeing), Phase::Taxi, Severity::Fatal),
        ];
        let view = aggregate(&records, &FilterState::default());
        assert_eq!(view.qualifying, 2);
        assert_eq!(view.breakdown_total(), 1);
        assert!(view.phase_row(Phase::Unknown).is_none());
    }

    #[test]
    fn phase_filter_narrows_both_views() {
        let records = vec![
            rec(2001, Some(Manufacturer::Boeing), Phase::Taxi, Severity::Incident),
            rec(2001, Some(Manufacturer::Boeing), Phase::Climb, Severity::Fatal),
        ];
        let filter = FilterState::default()
            .with_phase(PhaseFilter::Only(Phase::Climb))
            .unwrap();
        let view = aggregate(&records, &filter);
        assert_eq!(view.qualifying, 1);
        assert_eq!(view.phase_breakdown.len(), 1);
        assert_eq!(view.phase_breakdown[0].phase, Phase::Climb);
    }

    #[test]
    fn breakdown_sorted_desc_with_stable_ties() {
        let b = Some(Manufacturer::Boeing);
        let records = vec![
            rec(2000, b, Phase::Other, Severity::Fatal),
            rec(2000, b, Phase::Landing, Severity::Fatal),
            rec(2000, b, Phase::Taxi, Severity::Fatal),
            rec(2000, b, Phase::Taxi, Severity::Incident),
            rec(2000, b, Phase::Takeoff, Severity::NonFatal),
        ];
        let view = aggregate(&records, &FilterState::default());
        let order: Vec<_> = view.phase_breakdown.iter().map(|r| r.phase).collect();
        assert_eq!(
            order,
            vec![Phase::Taxi, Phase::Takeoff, Phase::Landing, Phase::Other]
        );
    }

    #[test]
    fn share_rounds_half_up() {
        let row = PhaseRow {
            phase: Phase::Cruise,
            counts: [(Severity::Fatal, 1), (Severity::Incident, 2)]
                .into_iter()
                .collect(),
            total: 3,
        };
        assert_eq!(row.share(Severity::Fatal), 33);
        assert_eq!(row.share(Severity::Incident), 67);
        assert_eq!(row.share(Severity::NonFatal), 0);

        let even = PhaseRow {
            phase: Phase::Cruise,
            counts: [(Severity::Fatal, 1)].into_iter().collect(),
            total: 8,
        };
        // 12.5% rounds up.
        assert_eq!(even.share(Severity::Fatal), 13);
    }

    #[test]
    fn series_and_peak() {
        let b = Some(Manufacturer::Boeing);
        let records = vec![
            rec(1996, b, Phase::Taxi, Severity::Fatal),
            rec(1996, b, Phase::Taxi, Severity::Fatal),
            rec(1997, b, Phase::Taxi, Severity::Fatal),
        ];
        let filter = FilterState::default().with_year_range(1995, 1997);
        let view = aggregate(&records, &filter);
        assert_eq!(
            view.series(Manufacturer::Boeing),
            vec![(1995, 0), (1996, 2), (1997, 1)]
        );
        assert_eq!(view.peak(), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let b = Some(Manufacturer::Boeing);
        let a = Some(Manufacturer::Airbus);
        let records = vec![
            rec(1996, b, Phase::Taxi, Severity::Fatal),
            rec(2003, a, Phase::Cruise, Severity::NonFatal),
            rec(2010, a, Phase::Unknown, Severity::Unavailable),
            rec(2010, None, Phase::Cruise, Severity::Incident),
        ];
        let filter = FilterState::default()
            .with_severities(SeveritySet::all() - SeveritySet::INCIDENT)
            .unwrap();
        assert_eq!(
            aggregate(&records, &filter),
            aggregate_parallel(&records, &filter)
        );
    }

    #[test]
    fn year_detail_splits_outcomes() {
        let b = Some(Manufacturer::Boeing);
        let records = vec![
            rec(2005, b, Phase::Taxi, Severity::Fatal),
            rec(2005, b, Phase::Cruise, Severity::NonFatal),
            rec(2005, b, Phase::Cruise, Severity::Incident),
            rec(2006, b, Phase::Cruise, Severity::Fatal),
            rec(2005, Some(Manufacturer::Airbus), Phase::Cruise, Severity::Fatal),
        ];
        let detail = year_detail(&records, &FilterState::default(), 2005, Manufacturer::Boeing);
        assert_eq!(detail.total, 3);
        assert_eq!(detail.fatal, 1);
        assert_eq!(detail.non_fatal, 1);

        let narrowed = FilterState::default().with_year_range(2006, 2010);
        let outside = year_detail(&records, &narrowed, 2005, Manufacturer::Boeing);
        assert_eq!(outside.total, 0);
    }

    #[test]
    fn view_serializes_with_labels() {
        let records = two_cruise_records();
        let filter = FilterState::default().with_year_range(1999, 1999);
        let json = serde_json::to_value(aggregate(&records, &filter)).unwrap();
        assert_eq!(json["time_series"][0]["counts"]["Boeing"], 1);
        assert_eq!(json["time_series"][0]["counts"]["McDonnell Douglas"], 0);
        assert_eq!(json["phase_breakdown"][0]["phase"], "CRUISE");
        assert_eq!(json["phase_breakdown"][0]["counts"]["NON-FATAL"], 0);
    }
}
