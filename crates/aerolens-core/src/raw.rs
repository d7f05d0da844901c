#![forbid(unsafe_code)]

//! Raw input rows.
//!
//! A [`RawRow`] is the loosely-typed shape every loader produces: column name
//! to cell text. Blank cells are stored as absent so the normalizer only has
//! one notion of "missing".

use std::collections::BTreeMap;

/// Column names recognized by the normalizer, with their aliases.
pub mod fields {
    pub const DATE: &[&str] = &["Event_Date", "Date"];
    pub const YEAR: &[&str] = &["Event_Year", "Year"];
    pub const MAKE: &[&str] = &["Make", "Aircraft_Make", "Manufacturer"];
    pub const PHASE: &[&str] = &["Broad_Phase_of_Flight", "Phase"];
    pub const SEVERITY: &[&str] = &["Injury_Severity", "Severity"];
    pub const FATAL: &[&str] = &["Total_Fatal_Injuries"];
    pub const SERIOUS: &[&str] = &["Total_Serious_Injuries"];
    pub const MINOR: &[&str] = &["Total_Minor_Injuries"];
    pub const UNINJURED: &[&str] = &["Total_Uninjured"];
}

/// One input row: column name to non-blank cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: BTreeMap<String, String>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    /// Set a cell. Blank values are dropped.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.cells.remove(&column);
        } else {
            self.cells.insert(column, value);
        }
    }

    /// Builder form of [`RawRow::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    /// Cell text for a single column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// First present cell among `aliases`, trimmed.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|name| self.get(name))
            .map(str::trim)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}
