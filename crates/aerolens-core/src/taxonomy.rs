#![forbid(unsafe_code)]

//! Closed vocabularies of the incident dataset.
//!
//! Manufacturers, flight phases and injury severities are fixed enumerations.
//! Their declaration order is the canonical order used everywhere a view is
//! laid out (time-series columns, breakdown tie-breaks, control lists).
//!
//! Selections over the two multi-select vocabularies are bit sets
//! ([`ManufacturerSet`], [`SeveritySet`]) so a filter is a handful of bytes and
//! hashes cheaply.

use std::fmt;

use bitflags::bitflags;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Fold a free-form label for comparison: trim, ASCII-uppercase, and treat
/// `-`, `_` and runs of whitespace as a single space.
fn fold(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch.to_ascii_uppercase());
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Manufacturer
// ─────────────────────────────────────────────────────────────────────────────

/// A recognized aircraft manufacturer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Manufacturer {
    Boeing,
    #[serde(rename = "McDonnell Douglas")]
    McDonnellDouglas,
    Airbus,
    Embraer,
    Bombardier,
}

impl Manufacturer {
    pub const ALL: [Manufacturer; 5] = [
        Manufacturer::Boeing,
        Manufacturer::McDonnellDouglas,
        Manufacturer::Airbus,
        Manufacturer::Embraer,
        Manufacturer::Bombardier,
    ];

    /// Display name, as it appears in the dataset.
    pub fn label(self) -> &'static str {
        match self {
            Manufacturer::Boeing => "Boeing",
            Manufacturer::McDonnellDouglas => "McDonnell Douglas",
            Manufacturer::Airbus => "Airbus",
            Manufacturer::Embraer => "Embraer",
            Manufacturer::Bombardier => "Bombardier",
        }
    }

    /// Resolve a raw make string. Returns `None` for blank or unrecognized
    /// makes, which the dataset treats as "Unknown".
    pub fn parse(raw: &str) -> Option<Self> {
        let folded = fold(raw);
        Self::ALL
            .into_iter()
            .find(|m| fold(m.label()) == folded)
    }

    /// The single-member set for this manufacturer.
    pub fn flag(self) -> ManufacturerSet {
        match self {
            Manufacturer::Boeing => ManufacturerSet::BOEING,
            Manufacturer::McDonnellDouglas => ManufacturerSet::MCDONNELL_DOUGLAS,
            Manufacturer::Airbus => ManufacturerSet::AIRBUS,
            Manufacturer::Embraer => ManufacturerSet::EMBRAER,
            Manufacturer::Bombardier => ManufacturerSet::BOMBARDIER,
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

bitflags! {
    /// A selection of manufacturers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ManufacturerSet: u8 {
        const BOEING            = 0b0_0001;
        const MCDONNELL_DOUGLAS = 0b0_0010;
        const AIRBUS            = 0b0_0100;
        const EMBRAER           = 0b0_1000;
        const BOMBARDIER        = 0b1_0000;
    }
}

impl ManufacturerSet {
    /// Whether `m` is selected.
    pub fn has(self, m: Manufacturer) -> bool {
        self.contains(m.flag())
    }

    /// Selected manufacturers in canonical order.
    pub fn members(self) -> impl Iterator<Item = Manufacturer> {
        Manufacturer::ALL.into_iter().filter(move |m| self.has(*m))
    }

    /// Number of selected manufacturers.
    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }
}

impl FromIterator<Manufacturer> for ManufacturerSet {
    fn from_iter<I: IntoIterator<Item = Manufacturer>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ManufacturerSet::empty(), |acc, m| acc | m.flag())
    }
}

impl Serialize for ManufacturerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for m in self.members() {
            seq.serialize_element(&m)?;
        }
        seq.end()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase
// ─────────────────────────────────────────────────────────────────────────────

/// Broad phase of flight.
///
/// [`Phase::Unknown`] is the catch-all for missing or unrecognized input; it
/// is never part of [`Phase::RECOGNIZED`] and never appears in a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Phase {
    Takeoff,
    Landing,
    Cruise,
    Approach,
    Standing,
    Taxi,
    Climb,
    Descent,
    GoAround,
    Maneuvering,
    Other,
    Unknown,
}

impl Phase {
    /// Recognized phases in enumeration order (the breakdown tie-break order).
    pub const RECOGNIZED: [Phase; 11] = [
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
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::Takeoff => "TAKEOFF",
            Phase::Landing => "LANDING",
            Phase::Cruise => "CRUISE",
            Phase::Approach => "APPROACH",
            Phase::Standing => "STANDING",
            Phase::Taxi => "TAXI",
            Phase::Climb => "CLIMB",
            Phase::Descent => "DESCENT",
            Phase::GoAround => "GO-AROUND",
            Phase::Maneuvering => "MANEUVERING",
            Phase::Other => "OTHER",
            Phase::Unknown => "UNKNOWN",
        }
    }

    pub fn is_recognized(self) -> bool {
        self != Phase::Unknown
    }

    /// Position in [`Phase::RECOGNIZED`]; `Unknown` sorts last.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Resolve a raw phase string; anything unrecognized maps to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let folded = fold(raw);
        Self::RECOGNIZED
            .into_iter()
            .find(|p| fold(p.label()) == folded)
            .unwrap_or(Phase::Unknown)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The phase criterion of a filter: everything, or a single recognized phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhaseFilter {
    #[default]
    All,
    Only(Phase),
}

impl PhaseFilter {
    /// Sentinel label for [`PhaseFilter::All`].
    pub const ALL_LABEL: &'static str = "all";

    pub fn label(self) -> &'static str {
        match self {
            PhaseFilter::All => Self::ALL_LABEL,
            PhaseFilter::Only(p) => p.label(),
        }
    }

    /// Parse `"all"` or a recognized phase label. `None` for anything else,
    /// including `"UNKNOWN"`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case(Self::ALL_LABEL) {
            return Some(PhaseFilter::All);
        }
        match Phase::parse(raw) {
            Phase::Unknown => None,
            p => Some(PhaseFilter::Only(p)),
        }
    }

    /// Whether this filter names only recognized phases.
    pub fn is_valid(self) -> bool {
        match self {
            PhaseFilter::All => true,
            PhaseFilter::Only(p) => p.is_recognized(),
        }
    }

    pub fn matches(self, phase: Phase) -> bool {
        match self {
            PhaseFilter::All => true,
            PhaseFilter::Only(p) => p == phase,
        }
    }
}

impl fmt::Display for PhaseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for PhaseFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Severity
// ─────────────────────────────────────────────────────────────────────────────

/// Injury severity category. Exactly four; missing input is `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Severity {
    Fatal,
    NonFatal,
    Incident,
    Unavailable,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Fatal,
        Severity::NonFatal,
        Severity::Incident,
        Severity::Unavailable,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::NonFatal => "NON-FATAL",
            Severity::Incident => "INCIDENT",
            Severity::Unavailable => "UNAVAILABLE",
        }
    }

    /// Strict lookup of a category label. Used for user-facing selections.
    pub fn from_label(raw: &str) -> Option<Self> {
        let folded = fold(raw);
        Self::ALL.into_iter().find(|s| fold(s.label()) == folded)
    }

    /// Normalize a raw severity cell.
    ///
    /// Blank and unrecognized values become `Unavailable`. The NTSB export
    /// form `Fatal(3)` is accepted as `Fatal`.
    pub fn normalize(raw: &str) -> Self {
        let head = match raw.find('(') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        Self::from_label(head).unwrap_or(Severity::Unavailable)
    }

    pub fn flag(self) -> SeveritySet {
        match self {
            Severity::Fatal => SeveritySet::FATAL,
            Severity::NonFatal => SeveritySet::NON_FATAL,
            Severity::Incident => SeveritySet::INCIDENT,
            Severity::Unavailable => SeveritySet::UNAVAILABLE,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

bitflags! {
    /// A selection of severity categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SeveritySet: u8 {
        const FATAL       = 0b0001;
        const NON_FATAL   = 0b0010;
        const INCIDENT    = 0b0100;
        const UNAVAILABLE = 0b1000;
    }
}

impl SeveritySet {
    pub fn has(self, s: Severity) -> bool {
        self.contains(s.flag())
    }

    /// Selected categories in canonical order.
    pub fn members(self) -> impl Iterator<Item = Severity> {
        Severity::ALL.into_iter().filter(move |s| self.has(*s))
    }

    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }
}

impl FromIterator<Severity> for SeveritySet {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SeveritySet::empty(), |acc, s| acc | s.flag())
    }
}

impl Serialize for SeveritySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for s in self.members() {
            seq.serialize_element(&s)?;
        }
        seq.end()
    }
}
