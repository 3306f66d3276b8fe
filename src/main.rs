mod branch;
mod error;
mod lines;
mod sales;

use clap::{error::ErrorKind, Parser};
use error::SalesError;
use sales::SalesProcessor;
use std::{error::Error as _, path::PathBuf, process::ExitCode};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Totals branch sales from the record files in a directory into branch.out
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Directory holding branch.lst and the NNNNNNNN.rcd record files
    directory: PathBuf,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => return report(SalesError::unknown()),
    };

    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

fn run(args: Args) -> Result<(), SalesError> {
    let mut sales_processor = SalesProcessor::load(&args.directory)?;
    sales_processor.process_sales()?;
    sales_processor.write_summary()?;

    Ok(())
}

fn report(err: SalesError) -> ExitCode {
    if let Some(source) = err.source() {
        error!(%source, "{err}");
    }
    println!("{err}");

    ExitCode::FAILURE
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}
