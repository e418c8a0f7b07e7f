//! Flag parsing. Translated into a [`dedupe_core::Options`] at the
//! `main`/`run` boundary before entering the library.

use std::path::PathBuf;

use clap::Parser;

/// Find and collapse duplicate files into hard links.
#[derive(Parser, Debug)]
#[command(name = "dedupe")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Report duplicates under the current directory without changing anything
    dedupe --dry-run --verbose .

    # Deduplicate two trees, skipping anything under a .git directory
    dedupe -e .git ~/Photos ~/Photos-backup

    # Confirm every merge interactively, caching digests in xattrs
    dedupe -i -x ~/Downloads
")]
pub struct Cli {
    /// Directories to scan. Defaults to the current directory if none given.
    #[arg(value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Disable color/ANSI output.
    #[arg(short = 'b', long = "boring")]
    pub boring: bool,

    /// Emit progress and duplicate-group reports.
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip all filesystem mutations.
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Prompt per duplicate group before relinking it.
    #[arg(short, long)]
    pub interactive: bool,

    /// Exclude entries matching this glob pattern (repeatable).
    #[arg(short, long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Read/write the digest cache in extended attributes.
    #[arg(short = 'x', long = "use-xattrs")]
    pub use_xattrs: bool,
}
