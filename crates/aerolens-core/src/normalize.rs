#![forbid(unsafe_code)]

//! Record normalizer: raw rows to typed [`IncidentRecord`]s.
//!
//! # Year resolution
//!
//! 1. The event date cell, if it parses to a year (`YYYY-MM-DD[...]`,
//!    `M/D/YYYY[...]`, or a bare `YYYY`).
//! 2. Otherwise the explicit year cell, as an integer (integral floats such as
//!    `1999.0` are accepted).
//!
//! Rows with no resolvable year, or a year outside the configured
//! [`YearBound`], are dropped. The default bound is the fixed
//! [`YearBound::DATASET`].
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Unparseable or missing year | Row dropped, counted as [`DropReason::MissingYear`] |
//! | Year outside bound | Row dropped, counted as [`DropReason::YearOutOfBound`] |
//! | Missing/unknown severity | `UNAVAILABLE` |
//! | Missing/unknown make | Kept with manufacturer `None` ("Unknown") |
//! | Missing/unknown phase | Kept with `Phase::Unknown` |
//! | Every row malformed | Empty record set, never an error |

use std::fmt;

use serde::Serialize;

use crate::raw::{RawRow, fields};
use crate::record::{Casualties, IncidentRecord, YearBound};
use crate::taxonomy::{Manufacturer, Phase, Severity};
use crate::{debug, info, warn};

/// Normalizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeConfig {
    /// Records outside this span are dropped.
    pub bound: YearBound,
}

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    MissingYear,
    YearOutOfBound,
}

/// Counts from one normalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NormalizeReport {
    pub rows_seen: usize,
    pub accepted: usize,
    pub missing_year: usize,
    pub out_of_bound: usize,
    /// Accepted rows whose manufacturer is unrecognized.
    pub unknown_make: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.missing_year + self.out_of_bound
    }

    fn note_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingYear => self.missing_year += 1,
            DropReason::YearOutOfBound => self.out_of_bound += 1,
        }
    }
}

impl fmt::Display for NormalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows read, {} accepted, {} without year, {} outside bound, {} unknown make",
            self.rows_seen, self.accepted, self.missing_year, self.out_of_bound, self.unknown_make
        )
    }
}

/// Records plus the report that produced them.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<IncidentRecord>,
    pub report: NormalizeReport,
}

/// Stateless row normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn bound(&self) -> YearBound {
        self.config.bound
    }

    /// Normalize a single row.
    pub fn normalize_row(&self, row: &RawRow) -> Result<IncidentRecord, DropReason> {
        let year = resolve_year(row).ok_or(DropReason::MissingYear)?;
        if !self.config.bound.contains(year) {
            return Err(DropReason::YearOutOfBound);
        }

        let manufacturer = row.first_of(fields::MAKE).and_then(Manufacturer::parse);
        let phase = row
            .first_of(fields::PHASE)
            .map_or(Phase::Unknown, Phase::parse);
        let severity = row
            .first_of(fields::SEVERITY)
            .map_or(Severity::Unavailable, Severity::normalize);

        Ok(IncidentRecord {
            year,
            manufacturer,
            phase,
            severity,
            casualties: Casualties {
                fatal: count_cell(row, fields::FATAL),
                serious: count_cell(row, fields::SERIOUS),
                minor: count_cell(row, fields::MINOR),
                uninjured: count_cell(row, fields::UNINJURED),
            },
        })
    }

    /// Normalize every row, keeping input order and counting drops.
    pub fn normalize_with_report(&self, rows: &[RawRow]) -> Normalized {
        let mut report = NormalizeReport {
            rows_seen: rows.len(),
            ..NormalizeReport::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            match self.normalize_row(row) {
                Ok(record) => {
                    if record.manufacturer.is_none() {
                        report.unknown_make += 1;
                    }
                    records.push(record);
                }
                Err(reason) => {
                    debug!(row = idx, reason = ?reason, "dropping malformed row");
                    report.note_drop(reason);
                }
            }
        }
        report.accepted = records.len();

        info!(
            rows = report.rows_seen,
            accepted = report.accepted,
            missing_year = report.missing_year,
            out_of_bound = report.out_of_bound,
            unknown_make = report.unknown_make,
            "normalized incident rows"
        );
        if report.rows_seen > 0 && report.accepted == 0 {
            warn!(rows = report.rows_seen, "no row survived normalization");
        }

        Normalized { records, report }
    }
}

/// Normalize with the default configuration, discarding the report.
pub fn normalize(rows: &[RawRow]) -> Vec<IncidentRecord> {
    Normalizer::new().normalize_with_report(rows).records
}

fn resolve_year(row: &RawRow) -> Option<i32> {
    row.first_of(fields::DATE)
        .and_then(year_from_date)
        .or_else(|| row.first_of(fields::YEAR).and_then(year_from_field))
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the year from a date cell.
pub fn year_from_date(raw: &str) -> Option<i32> {
    let date = raw
        .trim()
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()?;

    let token = if date.contains('-') {
        date.split('-').next()?
    } else if date.contains('/') {
        date.rsplit('/').next()?
    } else {
        date
    };

    if is_year_token(token) {
        token.parse().ok()
    } else {
        None
    }
}

/// Parse an explicit year cell.
pub fn year_from_field(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

fn count_cell(row: &RawRow, aliases: &[&str]) -> Option<u32> {
    let raw = row.first_of(aliases)?;
    raw.parse::<u32>().ok().or_else(|| {
        let value = raw.parse::<f64>().ok()?;
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
            .then_some(value as u32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: &str, make: &str, phase: &str, severity: &str) -> RawRow {
        RawRow::new()
            .with("Event_Year", year)
            .with("Make", make)
            .with("Broad_Phase_of_Flight", phase)
            .with("Injury_Severity", severity)
    }

    #[test]
    fn date_formats() {
        assert_eq!(year_from_date("2001-09-11"), Some(2001));
        assert_eq!(year_from_date("2001-09-11T08:46:00"), Some(2001));
        assert_eq!(year_from_date("9/11/2001"), Some(2001));
        assert_eq!(year_from_date("09/11/2001 08:46"), Some(2001));
        assert_eq!(year_from_date("2001"), Some(2001));
        assert_eq!(year_from_date("09/11/01"), None);
        assert_eq!(year_from_date("yesterday"), None);
        assert_eq!(year_from_date(""), None);
    }

    #[test]
    fn year_field_formats() {
        assert_eq!(year_from_field("1999"), Some(1999));
        assert_eq!(year_from_field(" 1999 "), Some(1999));
        assert_eq!(year_from_field("1999.0"), Some(1999));
        assert_eq!(year_from_field("1999.5"), None);
        assert_eq!(year_from_field("NaN"), None);
        assert_eq!(year_from_field("n/a"), None);
    }

    #[test]
    fn date_wins_over_year_field() {
        let r = row("1999", "Boeing", "CRUISE", "FATAL").with("Event_Date", "2004-01-03");
        let rec = Normalizer::new().normalize_row(&r).unwrap();
        assert_eq!(rec.year, 2004);
    }

    #[test]
    fn bad_date_falls_back_to_year_field() {
        let r = row("1999", "Boeing", "CRUISE", "FATAL").with("Event_Date", "unknown");
        let rec = Normalizer::new().normalize_row(&r).unwrap();
        assert_eq!(rec.year, 1999);
    }

    #[test]
    fn unparseable_year_is_dropped() {
        let rows = vec![
            row("nineteen", "Boeing", "CRUISE", "FATAL"),
            row("1999", "Boeing", "CRUISE", "FATAL"),
        ];
        let out = Normalizer::new().normalize_with_report(&rows);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].year, 1999);
        assert_eq!(out.report.missing_year, 1);
        assert_eq!(out.report.dropped(), 1);
    }

    #[test]
    fn out_of_bound_year_is_dropped() {
        let rows = vec![
            row("1994", "Boeing", "CRUISE", "FATAL"),
            row("2017", "Boeing", "CRUISE", "FATAL"),
            row("1995", "Boeing", "CRUISE", "FATAL"),
            row("2016", "Boeing", "CRUISE", "FATAL"),
        ];
        let out = Normalizer::new().normalize_with_report(&rows);
        assert_eq!(out.report.out_of_bound, 2);
        assert_eq!(out.report.accepted, 2);
    }

    #[test]
    fn custom_bound() {
        let n = Normalizer::with_config(NormalizeConfig {
            bound: YearBound::new(1980, 1990),
        });
        assert_eq!(
            n.normalize_row(&row("1985", "Boeing", "CRUISE", "FATAL"))
                .map(|r| r.year),
            Ok(1985)
        );
        assert_eq!(
            n.normalize_row(&row("1999", "Boeing", "CRUISE", "FATAL")),
            Err(DropReason::YearOutOfBound)
        );
    }

    #[test]
    fn defaults_for_missing_fields() {
        let r = RawRow::new().with("Event_Year", "2000");
        let rec = Normalizer::new().normalize_row(&r).unwrap();
        assert_eq!(rec.manufacturer, None);
        assert_eq!(rec.make_label(), "Unknown");
        assert_eq!(rec.phase, Phase::Unknown);
        assert_eq!(rec.severity, Severity::Unavailable);
        assert_eq!(rec.casualties, Casualties::default());
    }

    #[test]
    fn unrecognized_severity_is_unavailable() {
        let rec = Normalizer::new()
            .normalize_row(&row("2000", "Airbus", "TAXI", "SERIOUS"))
            .unwrap();
        assert_eq!(rec.severity, Severity::Unavailable);
    }

    #[test]
    fn unknown_make_is_kept_and_counted() {
        let rows = vec![row("2000", "Cessna", "TAXI", "INCIDENT")];
        let out = Normalizer::new().normalize_with_report(&rows);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.report.unknown_make, 1);
        assert_eq!(
            out.report.to_string(),
            "1 rows read, 1 accepted, 0 without year, 0 outside bound, 1 unknown make"
        );
    }

    #[test]
    fn casualties_pass_through() {
        let r = row("2000", "Airbus", "TAXI", "FATAL")
            .with("Total_Fatal_Injuries", "3")
            .with("Total_Uninjured", "120.0")
            .with("Total_Serious_Injuries", "-1");
        let rec = Normalizer::new().normalize_row(&r).unwrap();
        assert_eq!(rec.casualties.fatal, Some(3));
        assert_eq!(rec.casualties.uninjured, Some(120));
        assert_eq!(rec.casualties.serious, None);
        assert_eq!(rec.casualties.minor, None);
    }

    #[test]
    fn fully_unparseable_dataset_is_empty_not_error() {
        let rows = vec![RawRow::new(), RawRow::new().with("Make", "Boeing")];
        assert!(normalize(&rows).is_empty());
    }
}
