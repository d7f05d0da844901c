#![forbid(unsafe_code)]

//! Normalized incident records and the dataset year bound.

use serde::Serialize;

use crate::taxonomy::{Manufacturer, Phase, Severity};

/// Inclusive span of years the dataset supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct YearBound {
    pub min: i32,
    pub max: i32,
}

impl YearBound {
    /// The fixed span covered by the incident dataset.
    pub const DATASET: YearBound = YearBound {
        min: 1995,
        max: 2016,
    };

    /// Build a bound, swapping the ends if they arrive inverted.
    #[must_use]
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Tightest bound covering every record, or `None` for an empty set.
    #[must_use]
    pub fn from_records(records: &[IncidentRecord]) -> Option<Self> {
        let mut years = records.iter().map(|r| r.year);
        let first = years.next()?;
        let (min, max) = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn contains(self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }

    #[inline]
    pub fn clamp(self, year: i32) -> i32 {
        year.clamp(self.min, self.max)
    }

    /// Number of years in the bound.
    pub fn span(self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

impl Default for YearBound {
    fn default() -> Self {
        Self::DATASET
    }
}

/// Passthrough casualty counts. Carried, never aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Casualties {
    pub fatal: Option<u32>,
    pub serious: Option<u32>,
    pub minor: Option<u32>,
    pub uninjured: Option<u32>,
}

/// One normalized incident.
///
/// Invariants upheld by the normalizer: `year` lies within the bound the
/// records were normalized against, and `severity` is always one of the four
/// categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentRecord {
    pub year: i32,
    /// `None` is the explicit "Unknown" manufacturer.
    #[serde(serialize_with = "serialize_make")]
    pub manufacturer: Option<Manufacturer>,
    pub phase: Phase,
    pub severity: Severity,
    pub casualties: Casualties,
}

/// Label used for records without a recognized manufacturer.
pub const UNKNOWN_MAKE: &str = "Unknown";

impl IncidentRecord {
    /// Convenience constructor, mostly for fixtures.
    pub fn new(
        year: i32,
        manufacturer: Option<Manufacturer>,
        phase: Phase,
        severity: Severity,
    ) -> Self {
        Self {
            year,
            manufacturer,
            phase,
            severity,
            casualties: Casualties::default(),
        }
    }

    /// Manufacturer label, `"Unknown"` when unrecognized.
    pub fn make_label(&self) -> &'static str {
        self.manufacturer.map_or(UNKNOWN_MAKE, Manufacturer::label)
    }
}

fn serialize_make<S: serde::Serializer>(
    make: &Option<Manufacturer>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(make.map_or(UNKNOWN_MAKE, Manufacturer::label))
}
