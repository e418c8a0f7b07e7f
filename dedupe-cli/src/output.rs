//! Presentation: progress bar during hashing and the final human-readable
//! summary. Purely a rendering layer over `dedupe_core::Report` — it never
//! influences which files get relinked.

use std::time::Duration;

use dedupe_core::{Report, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Wraps an `indicatif` spinner tracking cumulative bytes hashed. The total
/// worklist volume isn't known until the walk finishes (inside the library
/// call), so this renders as an indeterminate spinner with a running byte
/// count rather than a bounded bar; hidden entirely when `--verbose` is off.
pub struct HashProgress {
    bar: ProgressBar,
}

impl HashProgress {
    pub fn new(color: bool, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };

        let template = if color {
            "  {spinner:.cyan} hashing... {msg}"
        } else {
            "  {spinner} hashing... {msg}"
        };
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn inc(&self, bytes: u64) {
        self.bar.inc(bytes);
        self.bar.set_message(human_bytes(self.bar.position()));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Render the final report to stdout. `verbose` controls whether individual
/// duplicate groups and diagnostics are listed; the summary line is always
/// printed.
pub fn print_report(report: &Report, verbose: bool, color: bool) {
    if verbose {
        for group in &report.groups {
            print_group(group, color);
        }
        for diag in &report.diagnostics {
            print_diagnostic(diag, color);
        }
    }

    let summary = format!(
        "{} duplicate group{} found, {} file{} relinked, {} reclaimed",
        report.duplicate_groups,
        plural(report.duplicate_groups),
        report.relinked_count,
        plural(report.relinked_count),
        human_bytes(report.relinked_size),
    );
    if color {
        println!("{}", summary.bold());
    } else {
        println!("{summary}");
    }
}

fn print_group(group: &dedupe_core::RelinkedGroup, color: bool) {
    let keeper = group.keeper_path.display().to_string();
    if color {
        println!("{} {}", "keeper:".green().bold(), keeper.green());
    } else {
        println!("keeper: {keeper}");
    }
    for path in &group.replaced_paths {
        let rendered = path.display().to_string();
        if color {
            println!("  {} {}", "->".dimmed(), rendered);
        } else {
            println!("  -> {rendered}");
        }
    }
}

fn print_diagnostic(diag: &dedupe_core::Diagnostic, color: bool) {
    let stage = match diag.stage {
        Stage::Walk => "walk",
        Stage::Hash => "hash",
        Stage::Relink => "relink",
    };
    let line = format!("[{stage}] {}: {}", diag.path.display(), diag.message);
    if color {
        eprintln!("{}", line.yellow());
    } else {
        eprintln!("{line}");
    }
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_formats_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(10 * 1024 * 1024), "10.0 MiB");
    }

    #[test]
    fn plural_suffix() {
        assert_eq!(plural(0), "s");
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }
}
