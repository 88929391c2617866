//! CLI output formatting.
//!
//! # Output Format
//!
//! ## thumb
//!
//! The first line is the reference alone, so scripts can take it with
//! `head -1`. Context follows, indented:
//!
//! ```text
//! https://cdn.example.com/thumbs/3f9a…e1.jpg
//!     Path: cache/3f9a…e1.jpg
//!     200x100, encoded
//! ```
//!
//! An absent result prints `no thumbnail` and still exits successfully.
//!
//! ## batch
//!
//! ```text
//! 001 photos/dawn.jpg
//!     cache/3f9a…e1.jpg (200x100, cached)
//! 002 https://example.com/gone.png
//!     no thumbnail
//! 003 photos/huge.png
//!     failed: Encode failed: …
//! Cache: 1 cached, 0 encoded, 1 absent (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchReport, Outcome};
use crate::thumbnail::{CacheStatus, Thumbnail};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn status_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Hit => "cached",
        CacheStatus::Encoded => "encoded",
    }
}

/// `200x100, cached`
fn size_and_status(thumbnail: &Thumbnail) -> String {
    format!(
        "{}x{}, {}",
        thumbnail.geometry.width,
        thumbnail.geometry.height,
        status_label(thumbnail.status)
    )
}

// ============================================================================
// thumb
// ============================================================================

/// Format the result of a single `thumb` invocation.
pub fn format_thumb_output(result: Option<&Thumbnail>) -> Vec<String> {
    match result {
        Some(t) => {
            let mut lines = vec![t.reference.clone()];
            let path = t.path.display().to_string();
            if path != t.reference {
                lines.push(format!("{}Path: {}", indent(1), path));
            }
            lines.push(format!("{}{}", indent(1), size_and_status(t)));
            lines
        }
        None => vec!["no thumbnail".to_string()],
    }
}

pub fn print_thumb_output(result: Option<&Thumbnail>) {
    for line in format_thumb_output(result) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format a batch report: one entry per request in input order, then the
/// cache summary.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in report.entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), entry.source));
        let detail = match &entry.outcome {
            Outcome::Hit(t) | Outcome::Encoded(t) => {
                format!("{} ({})", t.reference, size_and_status(t))
            }
            Outcome::Absent => "no thumbnail".to_string(),
            Outcome::Failed(msg) => format!("failed: {}", msg),
        };
        lines.push(format!("{}{}", indent(1), detail));
    }
    lines.push(format!("Cache: {}", report.stats));
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchEntry;
    use crate::cache::CacheStats;
    use crate::imaging::{CropRegion, Geometry};
    use std::path::PathBuf;

    fn thumbnail(reference: &str, status: CacheStatus) -> Thumbnail {
        Thumbnail {
            path: PathBuf::from("cache/ab12.jpg"),
            reference: reference.to_string(),
            geometry: Geometry {
                width: 200,
                height: 100,
                crop: CropRegion {
                    x: 0,
                    y: 50,
                    width: 600,
                    height: 300,
                },
            },
            status,
        }
    }

    #[test]
    fn format_index_padding() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    // =========================================================================
    // thumb
    // =========================================================================

    #[test]
    fn thumb_output_plain_path() {
        let t = thumbnail("cache/ab12.jpg", CacheStatus::Encoded);
        assert_eq!(
            format_thumb_output(Some(&t)),
            vec!["cache/ab12.jpg", "    200x100, encoded"]
        );
    }

    #[test]
    fn thumb_output_with_base_url_shows_path() {
        let t = thumbnail("https://cdn.example.com/ab12.jpg", CacheStatus::Hit);
        assert_eq!(
            format_thumb_output(Some(&t)),
            vec![
                "https://cdn.example.com/ab12.jpg",
                "    Path: cache/ab12.jpg",
                "    200x100, cached",
            ]
        );
    }

    #[test]
    fn thumb_output_absent() {
        assert_eq!(format_thumb_output(None), vec!["no thumbnail"]);
    }

    // =========================================================================
    // batch
    // =========================================================================

    #[test]
    fn batch_report_lines() {
        let report = BatchReport {
            entries: vec![
                BatchEntry {
                    source: "photos/dawn.jpg".into(),
                    outcome: Outcome::Hit(thumbnail("cache/ab12.jpg", CacheStatus::Hit)),
                },
                BatchEntry {
                    source: "https://example.com/gone.png".into(),
                    outcome: Outcome::Absent,
                },
                BatchEntry {
                    source: "photos/huge.png".into(),
                    outcome: Outcome::Failed("Encode failed: disk full".into()),
                },
            ],
            stats: CacheStats {
                hits: 1,
                misses: 0,
                absent: 1,
            },
        };
        assert_eq!(
            format_batch_report(&report),
            vec![
                "001 photos/dawn.jpg",
                "    cache/ab12.jpg (200x100, cached)",
                "002 https://example.com/gone.png",
                "    no thumbnail",
                "003 photos/huge.png",
                "    failed: Encode failed: disk full",
                "Cache: 1 cached, 0 encoded, 1 absent (2 total)",
            ]
        );
    }

    #[test]
    fn batch_report_empty() {
        let report = BatchReport {
            entries: Vec::new(),
            stats: CacheStats::default(),
        };
        assert_eq!(format_batch_report(&report), vec!["Cache: 0 encoded"]);
    }
}
