//! Property-based invariant tests for the aggregation engine.
//!
//! 1. Time series covers every year of the range, strictly increasing.
//! 2. Counts are conserved: breakdown totals equal qualifying records with a
//!    recognized phase; series totals equal all qualifying records.
//! 3. Aggregation is idempotent.
//! 4. Narrowing years, manufacturers, or severities never increases a count.
//! 5. Toggling every member off leaves exactly one selected.
//! 6. Breakdown is sorted by total descending, ties in phase order.
//! 7. Parallel aggregation equals sequential aggregation.

use aerolens_core::{
    FilterState, IncidentRecord, Manufacturer, ManufacturerSet, Phase, PhaseFilter, Severity,
    SeveritySet, YearBound, aggregate, aggregate_parallel,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const ALL_PHASES: [Phase; 12] = [
    Phase::Takeoff,
    Phase::Landing,
    Phase::Cruise,
    Phase::Approach,
    Phase::Standing,
    Phase::Taxi,
    Phase::Climb,
    Phase::Descent,
    Phase::GoAround,
    Phase::Maneuvering,
    Phase::Other,
    Phase::Unknown,
];

fn record_strategy() -> impl Strategy<Value = IncidentRecord> {
    let bound = YearBound::DATASET;
    (
        bound.min..=bound.max,
        0usize..=Manufacturer::ALL.len(),
        0usize..ALL_PHASES.len(),
        0usize..Severity::ALL.len(),
    )
        .prop_map(|(year, make, phase, sev)| {
            // Index == len stands for "Unknown".
            let manufacturer = Manufacturer::ALL.get(make).copied();
            IncidentRecord::new(year, manufacturer, ALL_PHASES[phase], Severity::ALL[sev])
        })
}

fn records_strategy() -> impl Strategy<Value = Vec<IncidentRecord>> {
    prop::collection::vec(record_strategy(), 0..200)
}

fn manufacturer_set_strategy() -> impl Strategy<Value = ManufacturerSet> {
    (1u8..32).prop_map(ManufacturerSet::from_bits_truncate)
}

fn severity_set_strategy() -> impl Strategy<Value = SeveritySet> {
    (1u8..16).prop_map(SeveritySet::from_bits_truncate)
}

fn phase_filter_strategy() -> impl Strategy<Value = PhaseFilter> {
    prop_oneof![
        Just(PhaseFilter::All),
        (0usize..Phase::RECOGNIZED.len()).prop_map(|i| PhaseFilter::Only(Phase::RECOGNIZED[i])),
    ]
}

fn filter_strategy() -> impl Strategy<Value = FilterState> {
    let bound = YearBound::DATASET;
    (
        bound.min..=bound.max,
        bound.min..=bound.max,
        manufacturer_set_strategy(),
        severity_set_strategy(),
        phase_filter_strategy(),
    )
        .prop_map(|(a, b, makes, sevs, phase)| {
            FilterState::default()
                .with_year_range(a.min(b), a.max(b))
                .with_manufacturers(makes)
                .and_then(|f| f.with_severities(sevs))
                .and_then(|f| f.with_phase(phase))
                .unwrap_or_default()
        })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Completeness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn time_series_is_complete(records in records_strategy(), filter in filter_strategy()) {
        let view = aggregate(&records, &filter);
        let range = filter.year_range();
        prop_assert_eq!(view.time_series.len(), (range.max - range.min + 1) as usize);
        for (offset, point) in view.time_series.iter().enumerate() {
            prop_assert_eq!(point.year, range.min + offset as i32);
            let keys: Vec<_> = point.counts.keys().copied().collect();
            let selected: Vec<_> = filter.manufacturers().members().collect();
            prop_assert_eq!(keys, selected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Conservation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn counts_are_conserved(records in records_strategy(), filter in filter_strategy()) {
        let view = aggregate(&records, &filter);
        let qualifying = records.iter().filter(|r| filter.admits(r)).count();
        let recognized = records
            .iter()
            .filter(|r| filter.admits(r) && r.phase.is_recognized())
            .count();

        prop_assert_eq!(view.qualifying, qualifying);
        prop_assert_eq!(view.breakdown_total(), recognized as u64);

        let series_total: u64 = view.time_series.iter().map(|p| u64::from(p.total())).sum();
        prop_assert_eq!(series_total, qualifying as u64);

        for row in &view.phase_breakdown {
            prop_assert!(row.total > 0);
            prop_assert_eq!(row.counts.len(), Severity::ALL.len());
            prop_assert_eq!(row.counts.values().sum::<u32>(), row.total);
            for s in Severity::ALL {
                if !filter.severities().has(s) {
                    prop_assert_eq!(row.count(s), 0);
                }
            }
        }
        prop_assert_eq!(view.phase_breakdown.is_empty(), recognized == 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregate_is_idempotent(records in records_strategy(), filter in filter_strategy()) {
        prop_assert_eq!(aggregate(&records, &filter), aggregate(&records, &filter));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Monotonic narrowing
// ═════════════════════════════════════════════════════════════════════════

fn assert_no_count_grows(
    records: &[IncidentRecord],
    wide: &FilterState,
    narrow: &FilterState,
) -> Result<(), TestCaseError> {
    let wide_view = aggregate(records, wide);
    let narrow_view = aggregate(records, narrow);

    prop_assert!(narrow_view.qualifying <= wide_view.qualifying);
    for point in &narrow_view.time_series {
        let Some(wide_point) = wide_view.time_series.iter().find(|p| p.year == point.year) else {
            return Err(TestCaseError::fail(format!("year {} missing from wide view", point.year)));
        };
        for (m, count) in &point.counts {
            prop_assert!(*count <= wide_point.count(*m));
        }
    }
    for row in &narrow_view.phase_breakdown {
        let Some(wide_row) = wide_view.phase_row(row.phase) else {
            return Err(TestCaseError::fail(format!("phase {} missing from wide view", row.phase)));
        };
        for (s, count) in &row.counts {
            prop_assert!(*count <= wide_row.count(*s));
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn narrowing_years_never_increases(
        records in records_strategy(),
        filter in filter_strategy(),
        trim_lo in 0i32..5,
        trim_hi in 0i32..5,
    ) {
        let range = filter.year_range();
        let lo = (range.min + trim_lo).min(range.max);
        let hi = (range.max - trim_hi).max(lo);
        let narrow = filter.with_year_range(lo, hi);
        prop_assert!(narrow.year_range().within(range));
        assert_no_count_grows(&records, &filter, &narrow)?;
    }

    #[test]
    fn narrowing_manufacturers_never_increases(
        records in records_strategy(),
        filter in filter_strategy(),
        mask in manufacturer_set_strategy(),
    ) {
        let subset = filter.manufacturers() & mask;
        prop_assume!(!subset.is_empty());
        let narrow = filter.with_manufacturers(subset).unwrap();
        assert_no_count_grows(&records, &filter, &narrow)?;
    }

    #[test]
    fn narrowing_severities_never_increases(
        records in records_strategy(),
        filter in filter_strategy(),
        mask in severity_set_strategy(),
    ) {
        let subset = filter.severities() & mask;
        prop_assume!(!subset.is_empty());
        let narrow = filter.with_severities(subset).unwrap();
        assert_no_count_grows(&records, &filter, &narrow)?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Empty-set guard
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn toggling_everything_off_leaves_one(filter in filter_strategy(), rounds in 1usize..4) {
        let mut f = filter;
        for _ in 0..rounds {
            for m in Manufacturer::ALL {
                if f.manufacturers().has(m) {
                    let _ = f.toggle_manufacturer(m);
                }
            }
            for s in Severity::ALL {
                if f.severities().has(s) {
                    let _ = f.toggle_severity(s);
                }
            }
        }
        prop_assert_eq!(f.manufacturers().len(), 1);
        prop_assert_eq!(f.severities().len(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Sort stability
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn breakdown_order_is_total_then_enumeration(
        records in records_strategy(),
        filter in filter_strategy(),
    ) {
        let view = aggregate(&records, &filter);
        for pair in view.phase_breakdown.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.total >= b.total);
            if a.total == b.total {
                prop_assert!(a.phase.ordinal() < b.phase.ordinal());
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Parallel equivalence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parallel_equals_sequential(records in records_strategy(), filter in filter_strategy()) {
        prop_assert_eq!(aggregate(&records, &filter), aggregate_parallel(&records, &filter));
    }
}
