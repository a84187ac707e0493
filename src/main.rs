mod data;
mod error;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use data::{aggregate, extract, loader};
use error::UsageError;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let input = match parse_args(&args) {
        Ok(path) => path,
        Err(usage) => {
            println!("{usage}");
            std::process::exit(1);
        }
    };

    run(&input)
}

/// Exactly one argument: the input file.
fn parse_args(args: &[String]) -> Result<PathBuf, UsageError> {
    match args {
        [_, input] => Ok(PathBuf::from(input)),
        _ => Err(UsageError {
            program: args
                .first()
                .cloned()
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
        }),
    }
}

/// Load → derive → aggregate → print.
fn run(input: &Path) -> Result<()> {
    let mut table = loader::load_file(input)
        .with_context(|| format!("loading {}", input.display()))?;

    extract::derive_fields(&mut table).context("deriving csl and cores")?;

    let summary = aggregate::summarize(&table).context("summarising records")?;
    if summary.is_empty() {
        log::warn!("No (experiment, algorithm) groups to report");
    }
    log::info!("{} groups from {} records", summary.len(), table.len());

    let text = report::render_summary(&summary).context("rendering summary")?;
    println!("{text}");

    Ok(())
}
