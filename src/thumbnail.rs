//! The `thumb` operation: request in, cached thumbnail out.
//!
//! ## Pipeline
//!
//! ```text
//! resolve source ─→ identify ─→ pixel budget ─→ geometry ─→ cache key
//!   (remote fetch,    (header      (refuse huge     (pure)       │
//!    default image)    only)        sources)                     ▼
//!                                            output path ─→ lock ─→ exists? ── hit
//!                                                                     │ no
//!                                                                     ▼
//!                                          decode ─→ resample ─→ sharpen ─→ encode ─→ write
//! ```
//!
//! Decoding happens *after* the cache check, so a hit costs one header read
//! and one `stat`. A source that was just downloaded skips the cache check:
//! its bytes may differ from whatever produced the existing file.
//!
//! ## Failures
//!
//! Bad input is not an error. A missing source, an unreadable or oversized
//! image, a destination too large to render, or an impossible geometry all
//! yield `Ok(None)`, which callers treat as "no thumbnail to show". Only
//! environment problems (the cache directory cannot be created, the encoder
//! or the disk refuses the output) come back as `Err`. See [`ThumbError::is_recoverable`].

use crate::cache::{
    KeyedLocks, cache_key, file_mtime_secs, output_path, public_reference, sanitize_name,
    write_atomic,
};
use crate::config::ThumbConfig;
use crate::imaging::{
    BackendError, Geometry, GeometryError, ImageBackend, ImageKind, RustBackend, UnsharpMask,
    resample, resolve_geometry, unsharp_mask,
};
use crate::remote::{FetchError, HttpSource, RemoteFetcher, RemoteSource};
use crate::request::{Source, ThumbnailRequest};
use std::fs;
use std::path::PathBuf;
use std::sync::PoisonError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ThumbError {
    #[error("No source image: {0}")]
    NoSource(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Unreadable source image: {0}")]
    Unreadable(BackendError),
    #[error("Source has {pixels} pixels, limit is {limit}")]
    OversizePixelBudget { pixels: u64, limit: u64 },
    #[error("Thumbnail of {width}x{height} is too large to render")]
    OversizeDestination { width: u32, height: u32 },
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),
    #[error("Remote fetch failed: {0}")]
    RemoteFetchFailure(#[from] FetchError),
    #[error("Encode failed: {0}")]
    EncodeFailure(BackendError),
    #[error("Cache directory error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThumbError {
    /// Recoverable errors describe the input and become an absent result.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::EncodeFailure(_) | Self::Io(_))
    }

    fn from_source_read(e: BackendError) -> Self {
        match e {
            BackendError::UnsupportedFormat(msg) => Self::UnsupportedFormat(msg),
            other => Self::Unreadable(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The output already existed; nothing was decoded.
    Hit,
    /// The output was rendered by this call.
    Encoded,
}

/// A thumbnail on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub path: PathBuf,
    /// The path, or the base-URL form of it when the request set one.
    pub reference: String,
    pub geometry: Geometry,
    pub status: CacheStatus,
}

impl Thumbnail {
    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// A source resolved to a readable local file.
struct LocalSource {
    path: PathBuf,
    /// Bytes were just downloaded; existing outputs must not be trusted.
    fresh: bool,
}

/// Produces and caches thumbnails.
///
/// Holds the configuration, the codec backend, the remote fetcher (with its
/// per-run probe memory) and the per-output-path locks. `Sync`, so one
/// instance serves concurrent requests.
pub struct Thumbnailer<B = RustBackend, R = HttpSource> {
    config: ThumbConfig,
    backend: B,
    fetcher: RemoteFetcher<R>,
    locks: KeyedLocks,
}

impl Thumbnailer {
    /// Production setup: `image` codecs and an HTTP client built from the
    /// `[remote]` settings.
    pub fn new(config: ThumbConfig) -> Result<Self, FetchError> {
        let source = HttpSource::new(config.remote.timeout(), &config.remote.user_agent)?;
        Ok(Self::with_parts(config, RustBackend::new(), source))
    }
}

impl<B: ImageBackend, R: RemoteSource> Thumbnailer<B, R> {
    pub fn with_parts(config: ThumbConfig, backend: B, source: R) -> Self {
        let fetcher = RemoteFetcher::new(source, config.remote.cache_dir.clone());
        Self {
            config,
            backend,
            fetcher,
            locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &ThumbConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn fetcher(&self) -> &RemoteFetcher<R> {
        &self.fetcher
    }

    /// Produce (or find) the thumbnail for `request`.
    ///
    /// `Ok(None)` means no thumbnail can be made from this input.
    pub fn thumb(&self, request: &ThumbnailRequest) -> Result<Option<Thumbnail>, ThumbError> {
        let source = request.source.display();
        match self.render(request) {
            Ok(thumbnail) => Ok(Some(thumbnail)),
            Err(e) if e.is_recoverable() => {
                match &e {
                    ThumbError::NoSource(_)
                    | ThumbError::OversizePixelBudget { .. }
                    | ThumbError::OversizeDestination { .. } => {
                        debug!(source = %source, reason = %e, "No thumbnail")
                    }
                    _ => warn!(source = %source, reason = %e, "No thumbnail"),
                }
                Ok(None)
            }
            Err(e) => {
                error!(source = %source, error = %e, "Thumbnail failed");
                Err(e)
            }
        }
    }

    /// Like [`thumb`](Self::thumb), returning only the reference string.
    pub fn generate(&self, request: &ThumbnailRequest) -> Result<Option<String>, ThumbError> {
        Ok(self.thumb(request)?.map(|t| t.reference))
    }

    fn render(&self, request: &ThumbnailRequest) -> Result<Thumbnail, ThumbError> {
        let source = self.resolve_source(request)?;

        let info = self
            .backend
            .identify(&source.path)
            .map_err(ThumbError::from_source_read)?;
        let limit = self.config.limits.max_pixels;
        if info.pixels() > limit {
            return Err(ThumbError::OversizePixelBudget {
                pixels: info.pixels(),
                limit,
            });
        }

        let geometry = resolve_geometry((info.width, info.height), &request.geometry_params())?;
        let kind = request.output_type.unwrap_or(info.kind);
        let quality = request
            .quality
            .unwrap_or_else(|| self.config.jpeg_quality());
        check_destination(&geometry, kind, limit)?;

        let modified = file_mtime_secs(&source.path)
            .map_err(|e| ThumbError::Unreadable(BackendError::Io(e)))?;
        let absolute = fs::canonicalize(&source.path).unwrap_or_else(|_| source.path.clone());
        let key = cache_key(&absolute, modified, request, kind, quality);
        let stem = request
            .name
            .as_deref()
            .and_then(sanitize_name)
            .unwrap_or(key);
        let path = output_path(
            &self.config.cache_dir,
            &stem,
            self.config.extensions.for_kind(kind),
        );
        let reference = public_reference(&path, request.base_url.as_deref());

        fs::create_dir_all(&self.config.cache_dir)?;

        let lock = self.locks.for_path(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !source.fresh && path.is_file() {
            debug!(path = %path.display(), "Cache hit");
            return Ok(Thumbnail {
                path,
                reference,
                geometry,
                status: CacheStatus::Hit,
            });
        }

        let pixels = self
            .backend
            .decode(&source.path, info.kind)
            .map_err(ThumbError::from_source_read)?;
        let mut resized = resample(pixels, &geometry);
        if request.sharpen {
            unsharp_mask(&mut resized, UnsharpMask::thumbnail());
        }
        let bytes = self
            .backend
            .encode(&resized, kind, quality)
            .map_err(ThumbError::EncodeFailure)?;
        drop(resized);
        write_atomic(&path, &bytes).map_err(|e| ThumbError::EncodeFailure(BackendError::Io(e)))?;

        info!(
            source = %source.path.display(),
            path = %path.display(),
            width = geometry.width,
            height = geometry.height,
            "Encoded thumbnail"
        );
        Ok(Thumbnail {
            path,
            reference,
            geometry,
            status: CacheStatus::Encoded,
        })
    }

    /// Turn the request's source into a readable local file, falling back to
    /// the default image when the primary source is unavailable.
    fn resolve_source(&self, request: &ThumbnailRequest) -> Result<LocalSource, ThumbError> {
        let primary = match &request.source {
            Source::Remote(url) => {
                let lifetime = request
                    .cache_lifetime
                    .unwrap_or_else(|| self.config.remote.lifetime());
                self.fetcher
                    .fetch(url, lifetime, request.force_refresh)
                    .map(|file| LocalSource {
                        fresh: file.freshly_fetched(),
                        path: file.path,
                    })
                    .map_err(ThumbError::from)
            }
            Source::Local(path) if path.is_file() => Ok(LocalSource {
                path: path.clone(),
                fresh: false,
            }),
            Source::Local(path) => Err(ThumbError::NoSource(path.display().to_string())),
        };

        match (primary, &request.default_image) {
            (Ok(source), _) => Ok(source),
            (Err(e), Some(default)) if default.is_file() => {
                debug!(source = %request.source.display(), reason = %e, "Using default image");
                Ok(LocalSource {
                    path: default.clone(),
                    fresh: false,
                })
            }
            (Err(e), _) => Err(e),
        }
    }
}

/// Refuse a destination that exceeds the pixel budget or the output format.
///
/// The coarse resample pass never exceeds the crop region, which the source
/// budget already covers.
fn check_destination(geometry: &Geometry, kind: ImageKind, limit: u64) -> Result<(), ThumbError> {
    let (width, height) = (geometry.width, geometry.height);
    let max_side = kind.max_side();
    if width as u64 * height as u64 > limit || width > max_side || height > max_side {
        return Err(ThumbError::OversizeDestination { width, height });
    }
    Ok(())
}
