#![forbid(unsafe_code)]

//! Plain-text and JSON renderings of a derived view.

use std::fmt::Write as _;

use aerolens_core::{DerivedView, FilterState, NormalizeReport, Severity};
use serde::Serialize;

/// Everything the report shows, as one serializable document.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub filter: &'a FilterState,
    pub dataset: &'a NormalizeReport,
    pub view: &'a DerivedView,
}

impl<'a> Report<'a> {
    pub fn new(filter: &'a FilterState, dataset: &'a NormalizeReport, view: &'a DerivedView) -> Self {
        Self {
            filter,
            dataset,
            view,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        let filter = self.filter;
        let makes: Vec<_> = filter.manufacturers().members().collect();
        let sevs: Vec<_> = filter.severities().members().map(|s| s.label()).collect();

        writeln!(out, "Years:         {}", filter.year_range())?;
        writeln!(
            out,
            "Manufacturers: {}",
            makes.iter().map(|m| m.label()).collect::<Vec<_>>().join(", ")
        )?;
        writeln!(out, "Phase:         {}", filter.phase())?;
        writeln!(out, "Severities:    {}", sevs.join(", "))?;
        writeln!(out, "Dataset:       {}", self.dataset)?;
        writeln!(out, "Qualifying:    {}", self.view.qualifying)?;

        writeln!(out)?;
        writeln!(out, "INCIDENTS PER YEAR")?;
        let widths: Vec<usize> = makes.iter().map(|m| m.label().len().max(5)).collect();
        write!(out, "{:<6}", "year")?;
        for (m, w) in makes.iter().zip(&widths) {
            write!(out, "  {:>w$}", m.label(), w = *w)?;
        }
        writeln!(out, "  {:>5}", "total")?;
        for point in &self.view.time_series {
            write!(out, "{:<6}", point.year)?;
            for (m, w) in makes.iter().zip(&widths) {
                write!(out, "  {:>w$}", point.count(*m), w = *w)?;
            }
            writeln!(out, "  {:>5}", point.total())?;
        }

        writeln!(out)?;
        writeln!(out, "INCIDENTS BY PHASE OF FLIGHT")?;
        if self.view.phase_breakdown.is_empty() {
            writeln!(out, "(no incidents with a known phase)")?;
            return Ok(());
        }
        write!(out, "{:<12}  {:>5}", "phase", "total")?;
        for s in Severity::ALL {
            write!(out, "  {:>16}", s.label())?;
        }
        writeln!(out)?;
        for row in &self.view.phase_breakdown {
            write!(out, "{:<12}  {:>5}", row.phase.label(), row.total)?;
            for s in Severity::ALL {
                let cell = format!("{} ({}%)", row.count(s), row.share(s));
                write!(out, "  {cell:>16}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
