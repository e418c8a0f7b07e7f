mod cli;
mod exit_code;
mod output;

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dedupe_core::{run_with_progress, DedupeError, Options};

use crate::cli::Cli;
use crate::output::HashProgress;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code::GENERAL_ERROR)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let color = !cli.boring && std::io::stdout().is_terminal();
    setup_tracing(cli.verbose);

    let options = build_options(&cli)?;

    let progress = HashProgress::new(color, !cli.verbose);
    let report = run_with_progress(&options, Some(&mut |bytes| progress.inc(bytes)))
        .context("deduplication run failed")?;
    progress.finish();

    output::print_report(&report, cli.verbose, color);

    Ok(())
}

/// Translate parsed flags into `dedupe_core::Options`.
fn build_options(cli: &Cli) -> Result<Options> {
    let roots = if cli.dirs.is_empty() {
        vec![std::path::PathBuf::from(".")]
    } else {
        cli.dirs
            .iter()
            .map(|dir| {
                let trimmed = dir.to_string_lossy().trim_end_matches('/').to_string();
                if trimmed.is_empty() {
                    std::path::PathBuf::from("/")
                } else {
                    std::path::PathBuf::from(trimmed)
                }
            })
            .collect()
    };

    let excludes = cli
        .excludes
        .iter()
        .map(|pattern| {
            glob::Pattern::new(pattern).map_err(|source| DedupeError::InvalidExclude {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --exclude pattern")?;

    Ok(Options {
        roots,
        excludes,
        dry_run: cli.dry_run,
        interactive: cli.interactive,
        use_xattrs: cli.use_xattrs,
        verbose: cli.verbose,
    })
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();
}
