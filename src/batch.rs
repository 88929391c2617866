//! Batch execution of many thumbnail requests.
//!
//! A batch file is TOML with one `[[thumb]]` table per request. Keys mirror
//! the `thumb` command's flags:
//!
//! ```toml
//! [[thumb]]
//! source = "photos/dawn.jpg"
//! width = 200
//! height = 100
//! mode = "crop"
//! sharpen = true
//!
//! [[thumb]]
//! source = "https://example.com/cat.png"
//! long_side = 300
//! type = "jpeg"
//! default = "static/missing.png"
//! ```
//!
//! Requests run in parallel on the global rayon pool. Results come back in
//! input order regardless of completion order. Identical requests in one
//! batch encode once; the rest report a cache hit.

use crate::cache::CacheStats;
use crate::imaging::ImageBackend;
use crate::remote::RemoteSource;
use crate::request::RequestSpec;
use crate::thumbnail::{CacheStatus, Thumbnail, Thumbnailer};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch file parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchFile {
    #[serde(default)]
    thumb: Vec<RequestSpec>,
}

/// Parse batch file contents.
pub fn parse_batch(content: &str) -> Result<Vec<RequestSpec>, BatchError> {
    let file: BatchFile = toml::from_str(content)?;
    Ok(file.thumb)
}

/// Read and parse a batch file.
pub fn load_batch(path: &Path) -> Result<Vec<RequestSpec>, BatchError> {
    parse_batch(&std::fs::read_to_string(path)?)
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Hit(Thumbnail),
    Encoded(Thumbnail),
    /// No thumbnail could be made from the input.
    Absent,
    /// Environment failure; the message of the error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The request's source as written in the batch file.
    pub source: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub stats: CacheStats,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Failed(_)))
            .count()
    }
}

/// Run every request and collect an ordered report.
pub fn run_batch<B: ImageBackend, R: RemoteSource>(
    thumbnailer: &Thumbnailer<B, R>,
    specs: Vec<RequestSpec>,
) -> BatchReport {
    let entries: Vec<BatchEntry> = specs
        .into_par_iter()
        .map(|spec| {
            let source = spec.source.clone();
            let outcome = match thumbnailer.thumb(&spec.into_request()) {
                Ok(Some(t)) if t.status == CacheStatus::Hit => Outcome::Hit(t),
                Ok(Some(t)) => Outcome::Encoded(t),
                Ok(None) => Outcome::Absent,
                Err(e) => Outcome::Failed(e.to_string()),
            };
            BatchEntry { source, outcome }
        })
        .collect();

    let mut stats = CacheStats::default();
    for entry in &entries {
        match entry.outcome {
            Outcome::Hit(_) => stats.hit(),
            Outcome::Encoded(_) => stats.miss(),
            Outcome::Absent => stats.absent(),
            Outcome::Failed(_) => {}
        }
    }
    info!(requests = entries.len(), %stats, "Batch complete");

    BatchReport { entries, stats }
}
