//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress (one block per document, in completion order)
//!
//! ```text
//! Rewriting 3 documents
//! blog/post.html
//!     Images: 2 (1 rewritten, 1 excluded)
//!     WebP: 1 queued
//! broken.html
//!     Error: picture: src/broken.html: cannot read image public/gone.png: ...
//! index.html
//!     Images: none
//! ```
//!
//! ## Summary
//!
//! ```text
//! Rewrote 2 of 3 documents (1 failed)
//! Images: 2 (1 rewritten, 1 excluded), 1 WebP queued
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Logging goes to stderr
//! through `tracing` and never mixes with this output.

use crate::picture::Summary;
use crate::process::{BatchReport, DocumentEvent, DocumentReport, DocumentStatus, Mode};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// `2 (1 rewritten, 1 excluded)`, omitting zero counts; `none` when empty.
fn image_counts(summary: &Summary) -> String {
    if summary.images == 0 {
        return "none".to_string();
    }
    let parts: Vec<String> = [
        (summary.rewritten, "rewritten"),
        (summary.excluded, "excluded"),
        (summary.skipped, "skipped"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{n} {label}"))
    .collect();
    format!("{} ({})", summary.images, parts.join(", "))
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &DocumentEvent) -> Vec<String> {
    match event {
        DocumentEvent::BatchStarted { documents, mode } => {
            let verb = match mode {
                Mode::Rewrite => "Rewriting",
                Mode::Check => "Checking",
            };
            vec![format!("{verb} {}", plural(*documents, "document", "documents"))]
        }
        DocumentEvent::DocumentFinished(report) => format_document_report(report),
    }
}

/// Document path followed by its indented outcome.
pub fn format_document_report(report: &DocumentReport) -> Vec<String> {
    let mut lines = vec![report.path.display().to_string()];
    match &report.status {
        DocumentStatus::Rewritten { summary } => {
            lines.push(format!("{}Images: {}", indent(1), image_counts(summary)));
            if summary.conversions > 0 {
                lines.push(format!("{}WebP: {} queued", indent(1), summary.conversions));
            }
        }
        DocumentStatus::Checked { summary } => {
            lines.push(format!("{}Images: {}", indent(1), image_counts(summary)));
            if summary.conversions > 0 {
                lines.push(format!("{}WebP: {} would be queued", indent(1), summary.conversions));
            }
        }
        DocumentStatus::Failed { error } => {
            lines.push(format!("{}Error: {}", indent(1), error));
        }
    }
    lines
}

/// Print a progress event to stdout.
pub fn print_batch_event(event: &DocumentEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the closing summary of a batch.
pub fn format_batch_summary(report: &BatchReport, mode: Mode) -> Vec<String> {
    let total = report.documents.len();
    let failed = report.failure_count();
    let verb = match mode {
        Mode::Rewrite => "Rewrote",
        Mode::Check => "Checked",
    };
    let mut headline = format!(
        "{verb} {} of {}",
        total - failed,
        plural(total, "document", "documents")
    );
    if failed > 0 {
        headline.push_str(&format!(" ({failed} failed)"));
    }

    let mut images = format!("Images: {}", image_counts(&report.totals));
    if report.totals.conversions > 0 {
        images.push_str(&format!(", {} WebP queued", report.totals.conversions));
    }
    vec![headline, images]
}

/// Print the batch summary to stdout.
pub fn print_batch_summary(report: &BatchReport, mode: Mode) {
    for line in format_batch_summary(report, mode) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary(images: usize, rewritten: usize, excluded: usize, skipped: usize) -> Summary {
        Summary {
            images,
            rewritten,
            excluded,
            skipped,
            conversions: rewritten,
        }
    }

    fn report(path: &str, status: DocumentStatus) -> DocumentReport {
        DocumentReport {
            path: PathBuf::from(path),
            status,
        }
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn image_counts_omits_zeroes() {
        assert_eq!(image_counts(&summary(0, 0, 0, 0)), "none");
        assert_eq!(image_counts(&summary(3, 2, 0, 1)), "3 (2 rewritten, 1 skipped)");
    }

    #[test]
    fn format_batch_started() {
        let lines = format_batch_event(&DocumentEvent::BatchStarted {
            documents: 1,
            mode: Mode::Rewrite,
        });
        assert_eq!(lines, vec!["Rewriting 1 document"]);

        let lines = format_batch_event(&DocumentEvent::BatchStarted {
            documents: 4,
            mode: Mode::Check,
        });
        assert_eq!(lines, vec!["Checking 4 documents"]);
    }

    #[test]
    fn format_rewritten_document() {
        let lines = format_document_report(&report(
            "blog/post.html",
            DocumentStatus::Rewritten {
                summary: summary(2, 1, 1, 0),
            },
        ));
        assert_eq!(
            lines,
            vec![
                "blog/post.html",
                "    Images: 2 (1 rewritten, 1 excluded)",
                "    WebP: 1 queued",
            ]
        );
    }

    #[test]
    fn format_checked_document() {
        let lines = format_document_report(&report(
            "index.html",
            DocumentStatus::Checked {
                summary: summary(1, 1, 0, 0),
            },
        ));
        assert_eq!(lines[2], "    WebP: 1 would be queued");
    }

    #[test]
    fn format_failed_document() {
        let lines = format_batch_event(&DocumentEvent::DocumentFinished(report(
            "broken.html",
            DocumentStatus::Failed {
                error: "picture: src/broken.html: cannot read image".to_string(),
            },
        )));
        assert_eq!(
            lines,
            vec![
                "broken.html",
                "    Error: picture: src/broken.html: cannot read image",
            ]
        );
    }

    #[test]
    fn format_summary_with_failures() {
        let batch = BatchReport {
            documents: vec![
                report(
                    "a.html",
                    DocumentStatus::Rewritten {
                        summary: summary(2, 1, 1, 0),
                    },
                ),
                report(
                    "b.html",
                    DocumentStatus::Failed {
                        error: "boom".to_string(),
                    },
                ),
            ],
            totals: summary(2, 1, 1, 0),
        };
        assert_eq!(
            format_batch_summary(&batch, Mode::Rewrite),
            vec![
                "Rewrote 1 of 2 documents (1 failed)",
                "Images: 2 (1 rewritten, 1 excluded), 1 WebP queued",
            ]
        );
    }

    #[test]
    fn format_summary_empty_batch() {
        assert_eq!(
            format_batch_summary(&BatchReport::default(), Mode::Check),
            vec!["Checked 0 of 0 documents", "Images: none"]
        );
    }
}
