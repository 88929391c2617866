//! Thumbnail cache: keys, paths, writes and per-path locking.
//!
//! The cache is a flat directory of encoded thumbnails. There is no
//! manifest: a thumbnail's file name *is* its cache key, so a lookup is a
//! single `exists` check on the output path.
//!
//! ## Cache keys
//!
//! [`cache_key`] hashes everything that influences the output bytes:
//!
//! - the resolved **source path** (remote sources use their local copy),
//! - the source **modification time** in whole seconds, so touching or
//!   replacing the source invalidates every thumbnail made from it,
//! - every **request field** (sizing, mode, flags, name, default image, base
//!   URL, remote lifetime and refresh), plus the effective output format and
//!   quality after configuration defaults are applied.
//!
//! Fields are fed to SHA-256 with a tag byte each, so `width=1, height=None`
//! and `width=None, height=1` never collide. The hex digest is truncated to
//! 128 bits, which keeps file names short while leaving collisions
//! practically impossible.
//!
//! ## Writes
//!
//! Thumbnails are written through [`write_atomic`]: a temp file in the
//! destination directory, renamed into place. A reader never sees a
//! half-written file, and two concurrent writers of the same key produce
//! identical bytes. [`KeyedLocks`] additionally serializes work per output
//! path so concurrent identical requests encode once.

use crate::imaging::{ImageKind, Quality, ResizeMode, SideConstraint};
use crate::request::{Source, ThumbnailRequest};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::UNIX_EPOCH;

/// Length of a cache key in hex characters (128 bits).
pub const KEY_LEN: usize = 32;

fn update_opt_u32(hasher: &mut Sha256, value: Option<u32>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.to_le_bytes());
        }
        None => hasher.update(b"\x00"),
    }
}

fn update_opt_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(s) => {
            hasher.update(b"\x01");
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        None => hasher.update(b"\x00"),
    }
}

/// Derive the cache key for a thumbnail of `source` as of `modified`.
///
/// `kind` and `quality` are the effective output settings, which may come
/// from configuration rather than the request.
pub fn cache_key(
    source: &Path,
    modified: u64,
    request: &ThumbnailRequest,
    kind: ImageKind,
    quality: Quality,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"thumbnail\0");
    let path = source.to_string_lossy();
    hasher.update((path.len() as u64).to_le_bytes());
    hasher.update(path.as_bytes());
    hasher.update(modified.to_le_bytes());

    // Original source identity, so a remote URL and its cached copy never
    // share keys with a local file of the same path.
    match &request.source {
        Source::Local(p) => {
            hasher.update(b"L");
            update_opt_str(&mut hasher, Some(&p.to_string_lossy()));
        }
        Source::Remote(url) => {
            hasher.update(b"R");
            update_opt_str(&mut hasher, Some(url));
        }
    }

    update_opt_u32(&mut hasher, request.width);
    update_opt_u32(&mut hasher, request.height);
    match request.side {
        Some(SideConstraint::Long(n)) => {
            hasher.update(b"l");
            hasher.update(n.to_le_bytes());
        }
        Some(SideConstraint::Short(n)) => {
            hasher.update(b"s");
            hasher.update(n.to_le_bytes());
        }
        None => hasher.update(b"-"),
    }
    hasher.update([match request.mode {
        ResizeMode::Scale => 0u8,
        ResizeMode::Crop => 1,
        ResizeMode::FitIn => 2,
    }]);
    hasher.update([request.extrapolate as u8, request.sharpen as u8]);
    hasher.update([kind.code(), quality.value()]);
    update_opt_str(&mut hasher, request.name.as_deref());
    update_opt_str(
        &mut hasher,
        request
            .default_image
            .as_ref()
            .map(|p| p.to_string_lossy())
            .as_deref(),
    );
    update_opt_str(&mut hasher, request.base_url.as_deref());
    match request.cache_lifetime {
        Some(lifetime) => {
            hasher.update(b"\x01");
            hasher.update(lifetime.as_secs().to_le_bytes());
        }
        None => hasher.update(b"\x00"),
    }
    hasher.update([request.force_refresh as u8]);

    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(KEY_LEN);
    hex
}

/// Hash of a remote URL, used to name its local copy.
pub fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"remote\0");
    hasher.update(url.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(KEY_LEN);
    hex
}

/// Reduce a caller-supplied name to a bare file stem.
///
/// Directory components are dropped so a name can never escape the cache
/// directory. Returns `None` when nothing usable remains.
pub fn sanitize_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

/// `<cache_dir>/<stem><ext>`, where `ext` includes its leading dot.
pub fn output_path(cache_dir: &Path, stem: &str, ext: &str) -> PathBuf {
    cache_dir.join(format!("{stem}{ext}"))
}

/// The string handed back to callers for a cached file.
///
/// Without a base URL this is the path itself. With one, the path's leading
/// component is replaced by the base URL, so `cache/ab12.jpg` with base
/// `https://cdn.example.com/thumbs` becomes
/// `https://cdn.example.com/thumbs/ab12.jpg`.
pub fn public_reference(path: &Path, base_url: Option<&str>) -> String {
    let Some(base) = base_url else {
        return path.to_string_lossy().into_owned();
    };
    let tail: Vec<String> = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .skip(1)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), tail.join("/"))
}

/// Write `bytes` to `path` via a temp file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Modification time of a file in whole seconds since the Unix epoch.
pub fn file_mtime_secs(path: &Path) -> io::Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}

/// One mutex per output path.
///
/// Entries are never removed; the map grows with the number of distinct
/// thumbnails produced by one process.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `path`. Callers hold its guard for the duration of
    /// the check-then-write sequence.
    pub fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(path.to_path_buf()).or_default().clone()
    }
}

/// Summary of cache behaviour for a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub absent: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn absent(&mut self) {
        self.absent += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses + self.absent
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 || self.absent > 0 {
            if self.absent > 0 {
                write!(
                    f,
                    "{} cached, {} encoded, {} absent ({} total)",
                    self.hits,
                    self.misses,
                    self.absent,
                    self.total()
                )
            } else {
                write!(
                    f,
                    "{} cached, {} encoded ({} total)",
                    self.hits,
                    self.misses,
                    self.total()
                )
            }
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}
