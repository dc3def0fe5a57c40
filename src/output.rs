//! CLI output formatting.
//!
//! # Output Format
//!
//! Every file gets one result line, followed by indented context lines when
//! there is something to add:
//!
//! ```text
//! Compressing images in frontend/uploads to ~8KB (dry_run=false, backup=false)
//!     3 images
//! frontend/uploads/logo.png: 4120 -> 4120 (skipped=true)
//! frontend/uploads/hero.jpg: 412338 -> 8011 (skipped=false)
//!     quality 20, 405x270, 12 iterations (accepted)
//! frontend/uploads/broken.jpg: 30000 -> 30000 (skipped=true)
//!     Error: Failed to decode image: unknown image format
//!
//! Compressed 1, skipped 1, failed 1
//! Done. Total before: 416458 after: 12131
//! ```
//!
//! Byte counts are raw integers so the output stays easy to grep and diff.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, FileReport};
use crate::types::{CompressionResult, StopReason};
use std::path::Path;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn stop_label(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Accepted => "accepted",
        StopReason::ForcedStop => "floors reached",
        StopReason::IterationCap => "iteration cap",
    }
}

/// The per-file line: `{path}: {original} -> {final} (skipped={bool})`.
pub fn format_result_line(path: &Path, result: &CompressionResult) -> String {
    format!(
        "{}: {} -> {} (skipped={})",
        path.display(),
        result.original_size,
        result.final_size,
        result.skipped
    )
}

/// Result line plus indented search details or error context.
pub fn format_file_report(report: &FileReport) -> Vec<String> {
    let mut lines = vec![format_result_line(&report.path, &report.result)];
    if let Some(err) = &report.error {
        lines.push(format!("{}Error: {}", indent(1), err.message));
        return lines;
    }
    let result = &report.result;
    if let (Some(q), Some(dims), Some(stop)) =
        (result.final_quality, result.final_dimensions, result.stop)
    {
        lines.push(format!(
            "{}quality {}, {}x{}, {} iterations ({})",
            indent(1),
            q,
            dims.width,
            dims.height,
            result.iterations_used,
            stop_label(stop)
        ));
    }
    if let Some(bak) = &result.backup_path {
        lines.push(format!("{}Backup: {}", indent(1), bak.display()));
    }
    lines
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started {
            root,
            file_count,
            target_kb,
            dry_run,
            backup,
        } => vec![
            format!(
                "Compressing images in {} to ~{}KB (dry_run={}, backup={})",
                root.display(),
                target_kb,
                dry_run,
                backup
            ),
            format!("{}{} images", indent(1), file_count),
        ],
        BatchEvent::FileFinished { report } => format_file_report(report),
    }
}

/// Closing lines of a batch run. The final line is always the byte totals.
pub fn format_summary(summary: &BatchSummary, dry_run: bool) -> Vec<String> {
    let mut counts = format!(
        "Compressed {}, skipped {}, failed {}",
        summary.compressed, summary.skipped, summary.failed
    );
    if summary.cancelled > 0 {
        counts.push_str(&format!(", cancelled {}", summary.cancelled));
    }
    if dry_run {
        counts.push_str(" (dry run, nothing written)");
    }
    vec![
        String::new(),
        counts,
        format!(
            "Done. Total before: {} after: {}",
            summary.total_before, summary.total_after
        ),
    ]
}

pub fn print_summary(summary: &BatchSummary, dry_run: bool) {
    for line in format_summary(summary, dry_run) {
        println!("{}", line);
    }
}

pub fn print_file_report(report: &FileReport) {
    for line in format_file_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::FileError;
    use crate::compress::FailureKind;
    use crate::imaging::Dimensions;
    use std::path::PathBuf;

    fn compressed_result() -> CompressionResult {
        CompressionResult {
            original_size: 412_338,
            final_size: 8_011,
            iterations_used: 12,
            was_compressed: true,
            skipped: false,
            skip_reason: None,
            final_quality: Some(20),
            final_dimensions: Some(Dimensions::new(405, 270)),
            stop: Some(StopReason::Accepted),
            backup_path: None,
            attempts: Vec::new(),
        }
    }

    #[test]
    fn result_line_matches_fixed_format() {
        let line = format_result_line(
            Path::new("frontend/uploads/logo.png"),
            &CompressionResult::already_small(4_120),
        );
        assert_eq!(line, "frontend/uploads/logo.png: 4120 -> 4120 (skipped=true)");
    }

    #[test]
    fn compressed_report_has_detail_line() {
        let report = FileReport {
            path: PathBuf::from("up/hero.jpg"),
            result: compressed_result(),
            error: None,
        };
        let lines = format_file_report(&report);
        assert_eq!(lines[0], "up/hero.jpg: 412338 -> 8011 (skipped=false)");
        assert_eq!(lines[1], "    quality 20, 405x270, 12 iterations (accepted)");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn backup_path_is_shown() {
        let mut result = compressed_result();
        result.stop = Some(StopReason::ForcedStop);
        result.backup_path = Some(PathBuf::from("up/hero.jpg.bak"));
        let report = FileReport {
            path: PathBuf::from("up/hero.jpg"),
            result,
            error: None,
        };
        let lines = format_file_report(&report);
        assert!(lines[1].ends_with("(floors reached)"));
        assert_eq!(lines[2], "    Backup: up/hero.jpg.bak");
    }

    #[test]
    fn failed_report_shows_error_context() {
        let report = FileReport {
            path: PathBuf::from("up/broken.jpg"),
            result: CompressionResult::failed(30_000),
            error: Some(FileError {
                kind: FailureKind::Decode,
                message: "Failed to decode image: unknown image format".into(),
            }),
        };
        let lines = format_file_report(&report);
        assert_eq!(lines[0], "up/broken.jpg: 30000 -> 30000 (skipped=true)");
        assert_eq!(
            lines[1],
            "    Error: Failed to decode image: unknown image format"
        );
    }

    #[test]
    fn started_event_shows_target_and_flags() {
        let event = BatchEvent::Started {
            root: PathBuf::from("frontend/uploads"),
            file_count: 3,
            target_kb: 8,
            dry_run: true,
            backup: false,
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "Compressing images in frontend/uploads to ~8KB (dry_run=true, backup=false)",
                "    3 images",
            ]
        );
    }

    #[test]
    fn summary_ends_with_totals_line() {
        let summary = BatchSummary {
            files_found: 3,
            compressed: 1,
            skipped: 1,
            failed: 1,
            cancelled: 0,
            total_before: 416_458,
            total_after: 12_131,
        };
        let lines = format_summary(&summary, false);
        assert_eq!(lines[1], "Compressed 1, skipped 1, failed 1");
        assert_eq!(
            lines.last().unwrap(),
            "Done. Total before: 416458 after: 12131"
        );
    }

    #[test]
    fn summary_mentions_cancellation_and_dry_run() {
        let summary = BatchSummary {
            files_found: 4,
            cancelled: 2,
            ..Default::default()
        };
        let lines = format_summary(&summary, true);
        assert_eq!(
            lines[1],
            "Compressed 0, skipped 0, failed 0, cancelled 2 (dry run, nothing written)"
        );
    }
}
