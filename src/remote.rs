//! Remote sources: download once, keep a local copy, revalidate lazily.
//!
//! A URL source is resolved to a file in the remote cache directory named
//! `remote-image.<url-hash>.<ext>`, where `<ext>` comes from the URL path
//! when it is a known image extension and is `url` otherwise.
//!
//! ## Freshness
//!
//! [`RemoteFetcher::fetch`] decides between three outcomes, in order:
//!
//! 1. **Reused**: a local copy exists and is younger than the lifetime. No
//!    network traffic at all, even with `force_refresh`.
//! 2. **Revalidated**: the copy is stale, refresh is not forced, and the
//!    server reports a `Last-Modified` time no newer than the copy. The
//!    copy's mtime is bumped to now, restarting its lifetime.
//! 3. **Downloaded**: anything else. The body replaces the local copy
//!    atomically.
//!
//! A probe that fails or reports no usable time counts as "changed" and
//! leads to a download. Probe results are remembered per URL for the life
//! of the fetcher, so a batch touching the same URL many times sends one
//! `HEAD`.

use crate::cache::{hash_url, write_atomic};
use chrono::DateTime;
use reqwest::blocking::Client;
use reqwest::header::LAST_MODIFIED;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

/// Extensions carried over from the URL into the local file name.
const KNOWN_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Empty response body from {0}")]
    Empty(String),
}

/// The network side of a remote fetch.
pub trait RemoteSource: Sync {
    /// Server-reported modification time in seconds since the epoch.
    /// `None` when the server does not say, or says something unusable.
    fn last_modified(&self, url: &str) -> Result<Option<u64>, FetchError>;

    /// Full response body.
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`RemoteSource`] over HTTP(S) with a blocking `reqwest` client.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

/// Parse an HTTP date into positive epoch seconds.
fn parse_http_date(value: &str) -> Option<u64> {
    let parsed = DateTime::parse_from_rfc2822(value.trim()).ok()?;
    u64::try_from(parsed.timestamp()).ok().filter(|&t| t > 0)
}

impl RemoteSource for HttpSource {
    fn last_modified(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let response = self.client.head(url).send()?.error_for_status()?;
        Ok(response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.bytes()?;
        if body.is_empty() {
            return Err(FetchError::Empty(url.to_string()));
        }
        Ok(body.to_vec())
    }
}

/// How a remote source was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Reused,
    Revalidated,
    Downloaded,
}

/// A remote source resolved to a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: PathBuf,
    pub freshness: Freshness,
}

impl RemoteFile {
    /// True when the bytes on disk were just replaced, so any thumbnail
    /// derived from the previous copy must be rebuilt.
    pub fn freshly_fetched(&self) -> bool {
        self.freshness == Freshness::Downloaded
    }
}

/// Extension for the local copy of `url`.
fn local_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    let ext = match last.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "url",
    };
    KNOWN_EXTENSIONS
        .iter()
        .find(|known| **known == ext)
        .copied()
        .unwrap_or("url")
}

/// Resolves URLs to local files under a cache directory.
pub struct RemoteFetcher<R> {
    source: R,
    cache_dir: PathBuf,
    probes: Mutex<HashMap<String, Option<u64>>>,
}

impl<R: RemoteSource> RemoteFetcher<R> {
    pub fn new(source: R, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            cache_dir: cache_dir.into(),
            probes: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Where the local copy of `url` lives.
    pub fn local_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!(
            "remote-image.{}.{}",
            hash_url(url),
            local_extension(url)
        ))
    }

    /// Probe `url` once per fetcher; failures are remembered as `None`.
    fn probe(&self, url: &str) -> Option<u64> {
        if let Some(cached) = self
            .probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
        {
            return *cached;
        }
        let result = match self.source.last_modified(url) {
            Ok(time) => time,
            Err(e) => {
                debug!(url, error = %e, "Last-Modified probe failed");
                None
            }
        };
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), result);
        result
    }

    /// Resolve `url` to a local file, downloading only when needed.
    pub fn fetch(
        &self,
        url: &str,
        lifetime: Duration,
        force_refresh: bool,
    ) -> Result<RemoteFile, FetchError> {
        let path = self.local_path(url);

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age < lifetime {
                debug!(url, age_secs = age.as_secs(), "Reusing remote copy");
                return Ok(RemoteFile {
                    path,
                    freshness: Freshness::Reused,
                });
            }

            if !force_refresh
                && let Some(remote) = self.probe(url)
                && mtime_secs(modified) >= remote
            {
                touch(&path)?;
                debug!(url, "Remote copy revalidated");
                return Ok(RemoteFile {
                    path,
                    freshness: Freshness::Revalidated,
                });
            }
        }

        let body = self.source.download(url).inspect_err(|e| {
            warn!(url, error = %e, "Remote download failed");
        })?;
        fs::create_dir_all(&self.cache_dir)?;
        write_atomic(&path, &body)?;
        debug!(url, bytes = body.len(), path = %path.display(), "Downloaded remote image");
        Ok(RemoteFile {
            path,
            freshness: Freshness::Downloaded,
        })
    }
}

fn mtime_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Set a file's modification time to now.
fn touch(path: &Path) -> io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}
