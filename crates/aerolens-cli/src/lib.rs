#![forbid(unsafe_code)]

//! The `aerolens` command: load a dataset, apply the requested filters
//! through the selection controller, and render the derived view.

pub mod cli;
pub mod report;

use std::fmt;

use aerolens_core::{Change, NormalizeConfig, YearBound};
use aerolens_runtime::{ControllerConfig, LoadError, SelectionController, load_dataset};
use tracing::{info, warn};

use crate::cli::{Opts, OutputFormat};
use crate::report::Report;

/// Failure of a whole run.
#[derive(Debug)]
pub enum RunError {
    /// The dataset could not be read.
    Load(LoadError),
    /// The report could not be serialized.
    Render(serde_json::Error),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Load(_) => 2,
            RunError::Render(_) => 1,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Load(e) => write!(f, "failed to load dataset: {e}"),
            RunError::Render(e) => write!(f, "failed to render report: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Load(e) => Some(e),
            RunError::Render(e) => Some(e),
        }
    }
}

impl From<LoadError> for RunError {
    fn from(e: LoadError) -> Self {
        RunError::Load(e)
    }
}

impl From<serde_json::Error> for RunError {
    fn from(e: serde_json::Error) -> Self {
        RunError::Render(e)
    }
}

/// Run the pipeline for `opts` and return the rendered report.
pub fn execute(opts: &Opts) -> Result<String, RunError> {
    let normalized = load_dataset(&opts.dataset, NormalizeConfig::default())?;
    if normalized.records.is_empty() {
        warn!(
            path = %opts.dataset.display(),
            report = %normalized.report,
            "dataset has no usable records"
        );
    }

    let config = ControllerConfig {
        parallel: opts.parallel,
        ..ControllerConfig::default()
    };
    let mut controller = SelectionController::with_config(normalized.records, YearBound::DATASET, config);
    for command in opts.commands() {
        if let Change::Rejected(why) = controller.dispatch(command) {
            warn!(%command, reason = %why, "option ignored");
        }
    }
    info!(qualifying = controller.view().qualifying, "filters applied");

    let filter = controller.filter_state();
    let report = Report::new(&filter, &normalized.report, controller.view());
    match opts.format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => Ok(report.to_json()?),
    }
}
