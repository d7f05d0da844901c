#![forbid(unsafe_code)]

//! AeroLens binary entry point.

use std::env;
use std::io;
use std::process;

use aerolens_cli::cli::{LogFormat, Opts};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Filter directives from `AEROLENS_LOG`, then `RUST_LOG`, then `warn`.
fn env_filter() -> EnvFilter {
    env::var("AEROLENS_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn init_tracing(format: LogFormat) {
    let registry = Registry::default().with(env_filter());
    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.log_format);

    match aerolens_cli::execute(&opts) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    }
}
