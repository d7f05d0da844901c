#![forbid(unsafe_code)]

//! Command-line argument parsing for the `aerolens` binary.
//!
//! Parses args manually, with environment overrides via the `AEROLENS_*`
//! prefix. Explicit flags beat environment values, which beat defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;

use aerolens_core::{Manufacturer, PhaseFilter, Severity, YearPreset};
use aerolens_runtime::Command;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
AeroLens: filter and aggregate an aviation incident dataset

USAGE:
    aerolens [OPTIONS] <DATASET>

DATASET:
    A .csv, .json (array of objects) or .jsonl/.ndjson file of incident rows.

OPTIONS:
    --years=MIN..MAX         Year range; ends are clamped to 1995..2016
    --preset=NAME            Year preset: 'full', 'first5' or 'last5'
    --manufacturers=A,B      Keep only these manufacturers
    --severities=A,B         Keep only these severities
    --phase=PHASE            Flight phase, or 'all' (default)
    --format=FORMAT          Output: 'text' (default) or 'json'
    --log-format=FORMAT      Logs on stderr: 'pretty' (default) or 'json'
    --parallel               Compute the two views on separate threads
    --help, -h               Show this help message
    --version, -V            Show version

MANUFACTURERS:
    Boeing, McDonnell Douglas, Airbus, Embraer, Bombardier

SEVERITIES:
    FATAL, NON-FATAL, INCIDENT, UNAVAILABLE

PHASES:
    TAKEOFF, LANDING, CRUISE, APPROACH, STANDING, TAXI, CLIMB, DESCENT,
    GO-AROUND, MANEUVERING, OTHER

ENVIRONMENT VARIABLES:
    AEROLENS_FORMAT          Override --format
    AEROLENS_YEARS           Override --years
    AEROLENS_PHASE           Override --phase
    AEROLENS_LOG_FORMAT      Override --log-format
    AEROLENS_LOG             Log filter directives (falls back to RUST_LOG, default 'warn')";

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Invalid command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    UnknownArgument(String),
    InvalidValue { flag: &'static str, value: String },
    MissingDataset,
    ExtraDataset(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::UnknownArgument(arg) => write!(f, "Unknown argument: {arg}"),
            CliError::InvalidValue { flag, value } => write!(f, "Invalid {flag} value: {value}"),
            CliError::MissingDataset => write!(f, "Missing <DATASET> argument"),
            CliError::ExtraDataset(arg) => write!(f, "Unexpected extra argument: {arg}"),
        }
    }
}

impl std::error::Error for CliError {}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Opts {
    pub dataset: PathBuf,
    /// Requested `(min, max)` year range.
    pub years: Option<(i32, i32)>,
    pub preset: Option<YearPreset>,
    /// Manufacturers to keep; `None` keeps all.
    pub manufacturers: Option<Vec<Manufacturer>>,
    /// Severities to keep; `None` keeps all.
    pub severities: Option<Vec<Severity>>,
    pub phase: Option<PhaseFilter>,
    pub format: OutputFormat,
    pub log_format: LogFormat,
    pub parallel: bool,
}

impl Opts {
    /// Parse process arguments and environment; prints help or errors and
    /// exits when there is nothing to run.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(args, |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("aerolens {VERSION}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("{e}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse from explicit arguments and an environment lookup.
    pub fn parse_from<I, F>(args: I, env_var: F) -> Result<Parsed, CliError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        let mut dataset: Option<PathBuf> = None;

        // Apply environment variable defaults first
        if let Some(val) = env_var("AEROLENS_FORMAT") {
            opts.format = OutputFormat::parse(&val).ok_or_else(|| invalid("AEROLENS_FORMAT", &val))?;
        }
        if let Some(val) = env_var("AEROLENS_YEARS") {
            opts.years = Some(parse_years(&val).ok_or_else(|| invalid("AEROLENS_YEARS", &val))?);
        }
        if let Some(val) = env_var("AEROLENS_PHASE") {
            opts.phase = Some(PhaseFilter::parse(&val).ok_or_else(|| invalid("AEROLENS_PHASE", &val))?);
        }
        if let Some(val) = env_var("AEROLENS_LOG_FORMAT") {
            opts.log_format =
                LogFormat::parse(&val).ok_or_else(|| invalid("AEROLENS_LOG_FORMAT", &val))?;
        }

        // Command-line args override env vars
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-V" => return Ok(Parsed::Version),
                "--parallel" => opts.parallel = true,
                other => {
                    if let Some(val) = other.strip_prefix("--years=") {
                        opts.years = Some(parse_years(val).ok_or_else(|| invalid("--years", val))?);
                    } else if let Some(val) = other.strip_prefix("--preset=") {
                        opts.preset = Some(YearPreset::parse(val).ok_or_else(|| invalid("--preset", val))?);
                    } else if let Some(val) = other.strip_prefix("--manufacturers=") {
                        let list = parse_list(val, Manufacturer::parse)
                            .ok_or_else(|| invalid("--manufacturers", val))?;
                        opts.manufacturers = Some(list);
                    } else if let Some(val) = other.strip_prefix("--severities=") {
                        let list = parse_list(val, Severity::from_label)
                            .ok_or_else(|| invalid("--severities", val))?;
                        opts.severities = Some(list);
                    } else if let Some(val) = other.strip_prefix("--phase=") {
                        opts.phase = Some(PhaseFilter::parse(val).ok_or_else(|| invalid("--phase", val))?);
                    } else if let Some(val) = other.strip_prefix("--format=") {
                        opts.format = OutputFormat::parse(val).ok_or_else(|| invalid("--format", val))?;
                    } else if let Some(val) = other.strip_prefix("--log-format=") {
                        opts.log_format =
                            LogFormat::parse(val).ok_or_else(|| invalid("--log-format", val))?;
                    } else if other.starts_with('-') && other.len() > 1 {
                        return Err(CliError::UnknownArgument(other.to_string()));
                    } else if dataset.is_some() {
                        return Err(CliError::ExtraDataset(other.to_string()));
                    } else {
                        dataset = Some(PathBuf::from(other));
                    }
                }
            }
        }

        opts.dataset = dataset.ok_or(CliError::MissingDataset)?;
        Ok(Parsed::Run(opts))
    }

    /// The options as controller commands, in application order: years
    /// first, then phase, then selections.
    ///
    /// Selections start from "everything selected", so keeping a list means
    /// toggling off every member not in it.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(preset) = self.preset {
            commands.push(Command::Preset(preset));
        }
        if let Some((min, max)) = self.years {
            commands.push(Command::SetYearRange { min, max });
        }
        if let Some(phase) = self.phase {
            commands.push(Command::SetPhase(phase));
        }
        if let Some(keep) = &self.manufacturers {
            commands.extend(
                Manufacturer::ALL
                    .into_iter()
                    .filter(|m| !keep.contains(m))
                    .map(Command::ToggleManufacturer),
            );
        }
        if let Some(keep) = &self.severities {
            commands.extend(
                Severity::ALL
                    .into_iter()
                    .filter(|s| !keep.contains(s))
                    .map(Command::ToggleSeverity),
            );
        }
        commands
    }
}

fn invalid(flag: &'static str, value: &str) -> CliError {
    CliError::InvalidValue {
        flag,
        value: value.to_string(),
    }
}

/// `MIN..MAX`, `MIN-MAX` or a single `YEAR`.
fn parse_years(raw: &str) -> Option<(i32, i32)> {
    let raw = raw.trim();
    let (lo, hi) = raw
        .split_once("..")
        .or_else(|| raw.split_once('-'))
        .unwrap_or((raw, raw));
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

/// Comma-separated non-empty list; any unknown entry fails the whole list.
fn parse_list<T: PartialEq>(raw: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let mut out = Vec::new();
    for item in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let value = parse(item)?;
        if !out.contains(&value) {
            out.push(value);
        }
    }
    (!out.is_empty()).then_some(out)
}
