#![forbid(unsafe_code)]

//! Filter state: the four independent narrowing criteria.
//!
//! # Invariants
//!
//! 1. `year_range.min <= year_range.max`, both inside the bound.
//! 2. The manufacturer selection is never empty.
//! 3. The severity selection is never empty.
//! 4. The phase filter is `All` or a recognized phase.
//!
//! Fields are private and every mutator re-establishes the invariants, so a
//! `FilterState` observed from outside this module is always valid. Mutators
//! report a [`Change`]; a rejected mutation leaves the state untouched.

use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::record::{IncidentRecord, YearBound};
use crate::taxonomy::{Manufacturer, ManufacturerSet, PhaseFilter, Severity, SeveritySet};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv_hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= *byte as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Toggling off the only selected manufacturer.
    LastManufacturer(Manufacturer),
    /// Toggling off the only selected severity.
    LastSeverity(Severity),
    /// Phase filter names `UNKNOWN` or an unparseable label.
    UnrecognizedPhase,
    /// A bulk selection with no members.
    EmptySelection,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LastManufacturer(m) => {
                write!(f, "cannot deselect {m}: at least one manufacturer must stay selected")
            }
            Rejection::LastSeverity(s) => {
                write!(f, "cannot deselect {s}: at least one severity must stay selected")
            }
            Rejection::UnrecognizedPhase => write!(f, "phase filter must be 'all' or a known phase"),
            Rejection::EmptySelection => write!(f, "selection must not be empty"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Result of a filter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Change {
    /// State changed; derived views are stale.
    Applied,
    /// The command left the state identical.
    Unchanged,
    /// The command was refused; state is untouched.
    Rejected(Rejection),
}

impl Change {
    /// Whether the derived view must be recomputed.
    pub fn needs_recompute(self) -> bool {
        matches!(self, Change::Applied)
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, Change::Rejected(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Year range
// ─────────────────────────────────────────────────────────────────────────────

/// Inclusive year window selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    #[inline]
    pub fn contains(self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }

    pub fn years(self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    /// Number of years covered, always at least one.
    pub fn len(self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Whether `self` lies entirely inside `outer`.
    pub fn within(self, outer: YearRange) -> bool {
        self.min >= outer.min && self.max <= outer.max
    }
}

impl From<YearBound> for YearRange {
    fn from(b: YearBound) -> Self {
        Self {
            min: b.min,
            max: b.max,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

/// Canned year windows offered next to the range slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearPreset {
    /// The whole bound.
    Full,
    /// The first five years of the bound.
    FirstFive,
    /// The last five years of the bound.
    LastFive,
}

impl YearPreset {
    pub const ALL: [YearPreset; 3] = [YearPreset::Full, YearPreset::FirstFive, YearPreset::LastFive];

    pub fn label(self) -> &'static str {
        match self {
            YearPreset::Full => "full",
            YearPreset::FirstFive => "first5",
            YearPreset::LastFive => "last5",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(raw))
    }

    /// The window this preset selects inside `bound`.
    pub fn range(self, bound: YearBound) -> YearRange {
        match self {
            YearPreset::Full => bound.into(),
            YearPreset::FirstFive => YearRange {
                min: bound.min,
                max: (bound.min + 4).min(bound.max),
            },
            YearPreset::LastFive => YearRange {
                min: (bound.max - 4).max(bound.min),
                max: bound.max,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FilterState
// ─────────────────────────────────────────────────────────────────────────────

/// Current narrowing criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FilterState {
    bound: YearBound,
    year_range: YearRange,
    manufacturers: ManufacturerSet,
    phase: PhaseFilter,
    severities: SeveritySet,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(YearBound::DATASET)
    }
}

impl FilterState {
    /// Everything selected over the whole bound.
    #[must_use]
    pub fn new(bound: YearBound) -> Self {
        Self {
            bound,
            year_range: bound.into(),
            manufacturers: ManufacturerSet::all(),
            phase: PhaseFilter::All,
            severities: SeveritySet::all(),
        }
    }

    // ── Construction helpers ────────────────────────────────────────────

    /// Replace the year range (slider semantics, see [`Self::set_year_range`]).
    #[must_use]
    pub fn with_year_range(mut self, min: i32, max: i32) -> Self {
        let _ = self.set_year_range(min, max);
        self
    }

    /// Replace the manufacturer selection wholesale.
    pub fn with_manufacturers(mut self, set: ManufacturerSet) -> Result<Self, Rejection> {
        if set.is_empty() {
            return Err(Rejection::EmptySelection);
        }
        self.manufacturers = set;
        Ok(self)
    }

    /// Replace the severity selection wholesale.
    pub fn with_severities(mut self, set: SeveritySet) -> Result<Self, Rejection> {
        if set.is_empty() {
            return Err(Rejection::EmptySelection);
        }
        self.severities = set;
        Ok(self)
    }

    pub fn with_phase(mut self, phase: PhaseFilter) -> Result<Self, Rejection> {
        match self.set_phase(phase) {
            Change::Rejected(why) => Err(why),
            _ => Ok(self),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn bound(&self) -> YearBound {
        self.bound
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    pub fn manufacturers(&self) -> ManufacturerSet {
        self.manufacturers
    }

    pub fn phase(&self) -> PhaseFilter {
        self.phase
    }

    pub fn severities(&self) -> SeveritySet {
        self.severities
    }

    // ── Mutators ────────────────────────────────────────────────────────

    fn commit_range(&mut self, next: YearRange) -> Change {
        if next == self.year_range {
            Change::Unchanged
        } else {
            self.year_range = next;
            Change::Applied
        }
    }

    /// Set both ends at once. Never fails.
    ///
    /// Both ends are clamped into the bound. If they end up inverted, the end
    /// that moved wins: a new minimum drags the maximum up to it, otherwise
    /// the maximum drags the minimum down.
    pub fn set_year_range(&mut self, min: i32, max: i32) -> Change {
        let mut lo = self.bound.clamp(min);
        let mut hi = self.bound.clamp(max);
        if lo > hi {
            if lo != self.year_range.min {
                hi = lo;
            } else {
                lo = hi;
            }
        }
        self.commit_range(YearRange { min: lo, max: hi })
    }

    /// Move the lower handle; a minimum above the maximum pins the maximum.
    pub fn set_year_min(&mut self, min: i32) -> Change {
        let lo = self.bound.clamp(min);
        let hi = self.year_range.max.max(lo);
        self.commit_range(YearRange { min: lo, max: hi })
    }

    /// Move the upper handle; a maximum below the minimum pins the minimum.
    pub fn set_year_max(&mut self, max: i32) -> Change {
        let hi = self.bound.clamp(max);
        let lo = self.year_range.min.min(hi);
        self.commit_range(YearRange { min: lo, max: hi })
    }

    pub fn apply_preset(&mut self, preset: YearPreset) -> Change {
        self.commit_range(preset.range(self.bound))
    }

    /// Add `m` if absent, remove it if present and not the last one.
    pub fn toggle_manufacturer(&mut self, m: Manufacturer) -> Change {
        if self.manufacturers.has(m) {
            if self.manufacturers.len() == 1 {
                return Change::Rejected(Rejection::LastManufacturer(m));
            }
            self.manufacturers.remove(m.flag());
        } else {
            self.manufacturers.insert(m.flag());
        }
        Change::Applied
    }

    /// Add `s` if absent, remove it if present and not the last one.
    pub fn toggle_severity(&mut self, s: Severity) -> Change {
        if self.severities.has(s) {
            if self.severities.len() == 1 {
                return Change::Rejected(Rejection::LastSeverity(s));
            }
            self.severities.remove(s.flag());
        } else {
            self.severities.insert(s.flag());
        }
        Change::Applied
    }

    pub fn set_phase(&mut self, phase: PhaseFilter) -> Change {
        if !phase.is_valid() {
            return Change::Rejected(Rejection::UnrecognizedPhase);
        }
        if phase == self.phase {
            return Change::Unchanged;
        }
        self.phase = phase;
        Change::Applied
    }

    /// Back to everything selected over the whole bound.
    pub fn reset(&mut self) -> Change {
        let fresh = Self::new(self.bound);
        if fresh == *self {
            Change::Unchanged
        } else {
            *self = fresh;
            Change::Applied
        }
    }

    // ── Predicate ───────────────────────────────────────────────────────

    /// Whether `record` satisfies every active criterion.
    ///
    /// Records with an unrecognized manufacturer never qualify.
    #[inline]
    pub fn admits(&self, record: &IncidentRecord) -> bool {
        self.year_range.contains(record.year)
            && record
                .manufacturer
                .is_some_and(|m| self.manufacturers.has(m))
            && self.phase.matches(record.phase)
            && self.severities.has(record.severity)
    }

    /// Stable 64-bit fingerprint of the criteria, for memoization.
    pub fn fingerprint(&self) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        fnv_hash_bytes(&mut hash, &self.bound.min.to_le_bytes());
        fnv_hash_bytes(&mut hash, &self.bound.max.to_le_bytes());
        fnv_hash_bytes(&mut hash, &self.year_range.min.to_le_bytes());
        fnv_hash_bytes(&mut hash, &self.year_range.max.to_le_bytes());
        fnv_hash_bytes(&mut hash, &[self.manufacturers.bits(), self.severities.bits()]);
        let phase_tag = match self.phase {
            PhaseFilter::All => 0xff,
            PhaseFilter::Only(p) => p.ordinal() as u8,
        };
        fnv_hash_bytes(&mut hash, &[phase_tag]);
        hash
    }
}
