use std::fs::File;

use anyhow::{Context, Result};
use branch_ledger::{
    bin_utils::{RowError, Service},
    config::LedgerConfig,
    processor::ProcessError,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // logs go to stderr, stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let filename = args
        .next()
        .context("Expected an operations file name as the first argument")?;
    let config = match args.next() {
        Some(path) => LedgerConfig::load(&path)
            .with_context(|| format!("Failed to load config `{path}`"))?,
        None => LedgerConfig::default(),
    };
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    tracing::info!(bank = %config.name, branch = %config.branch_code, "replaying {filename}");
    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| match err {
            RowError::Malformed(err) => eprintln!("Error at line {line}: {err}"),
            RowError::Rejected(ProcessError::CommandErr(err)) => {
                eprintln!("Error at line {line}: {err}")
            }
            RowError::Rejected(ProcessError::LedgerErr(err)) => {
                // business rule rejections, not technical errors
                tracing::info!(line, "operation rejected: {err}")
            }
        }),
    };
    service.run()
}
