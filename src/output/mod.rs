//! User-facing output for the `pdfstitch` binary.
//!
//! [`OutputFormatter`] prints messages according to the quiet/verbose flags;
//! the functions here turn the statistics produced by loading, assembling
//! and writing into summary lines.

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter, Verbosity};

use crate::io::{LoadStatistics, WriteStatistics};
use crate::merge::AssemblyStatistics;

/// Display load statistics to the user.
pub fn display_load_statistics(formatter: &OutputFormatter, stats: &LoadStatistics) {
    if stats.failure_count > 0 {
        formatter.warning(&format!("{} file(s) failed to load", stats.failure_count));
    }

    formatter.info(&format!(
        "Loaded {} file(s) in {:.2}s: {} pages, {}",
        stats.success_count,
        stats.total_time.as_secs_f64(),
        stats.total_pages,
        stats.format_total_size()
    ));
}

/// Display what an assembly produced.
pub fn display_assembly(formatter: &OutputFormatter, stats: &AssemblyStatistics) {
    if !stats.dropped.is_empty() {
        formatter.warning(&format!(
            "Ignored page numbers outside the document: {}",
            join_numbers(&stats.dropped)
        ));
    }
    formatter.detail("Pages", &stats.pages.to_string());
    formatter.detail("Sources", &stats.sources.to_string());
    formatter.detail("Objects copied", &stats.copy.objects.to_string());
    if stats.copy.dangling > 0 {
        formatter.detail(
            "Dangling references",
            &format!("{} (written as null)", stats.copy.dangling),
        );
    }
}

/// Display where the output went.
pub fn display_write_statistics(formatter: &OutputFormatter, pages: usize, stats: &WriteStatistics) {
    formatter.success(&format!(
        "Wrote {} ({pages} pages, {})",
        stats.output_path.display(),
        stats.format_file_size()
    ));
    formatter.detail(
        "Write time",
        &format!("{:.2}s", stats.write_time.as_secs_f64()),
    );
}

fn join_numbers(numbers: &[i64]) -> String {
    numbers
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
