//! Thumbnail requests.
//!
//! A [`ThumbnailRequest`] is an immutable description of one thumbnail:
//! where the source lives, how to size it, and how to name and reference
//! the result. Requests are assembled with [`ThumbnailRequestBuilder`]:
//!
//! ```
//! use thumbcache::request::ThumbnailRequest;
//!
//! let request = ThumbnailRequest::builder("photos/dawn.jpg")
//!     .resize(200, 100)
//!     .crop()
//!     .sharpen()
//!     .build();
//! assert!(request.sharpen);
//! ```
//!
//! Batch files and the CLI describe requests as a flat [`RequestSpec`]
//! instead, which converts into the same builder calls.

use crate::imaging::{GeometryParams, ImageKind, Quality, ResizeMode, SideConstraint};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where the source image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    Remote(String),
}

impl Source {
    /// `http://` and `https://` strings are remote; anything else is a path.
    pub fn parse(source: &str) -> Self {
        let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(source.to_string())
        } else {
            Self::Local(PathBuf::from(source))
        }
    }

    /// The source as originally given, for logs and output.
    pub fn display(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// One thumbnail request. Build with [`ThumbnailRequest::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    pub source: Source,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Long/short side pin; overrides `width` and `height`.
    pub side: Option<SideConstraint>,
    pub mode: ResizeMode,
    /// Allow upscaling beyond the source resolution.
    pub extrapolate: bool,
    pub sharpen: bool,
    /// Output format; defaults to the source format.
    pub output_type: Option<ImageKind>,
    /// JPEG quality; defaults to the configured quality.
    pub quality: Option<Quality>,
    /// File stem for the cached thumbnail instead of the derived key.
    pub name: Option<String>,
    /// Local image used when the source is unavailable.
    pub default_image: Option<PathBuf>,
    /// Prefix for the returned reference instead of the bare path.
    pub base_url: Option<String>,
    /// Remote-copy lifetime override.
    pub cache_lifetime: Option<Duration>,
    /// Skip remote revalidation and download again once the lifetime expired.
    pub force_refresh: bool,
}

impl ThumbnailRequest {
    pub fn builder(source: impl AsRef<str>) -> ThumbnailRequestBuilder {
        ThumbnailRequestBuilder::new(Source::parse(source.as_ref()))
    }

    /// The subset of the request the geometry resolver reads.
    pub fn geometry_params(&self) -> GeometryParams {
        GeometryParams {
            width: self.width,
            height: self.height,
            side: self.side,
            mode: self.mode,
            extrapolate: self.extrapolate,
        }
    }
}

/// Fluent builder for [`ThumbnailRequest`].
///
/// Every method takes and returns the builder by value, so a partially
/// configured builder can be cloned as a template without sharing state.
#[derive(Debug, Clone)]
pub struct ThumbnailRequestBuilder {
    request: ThumbnailRequest,
}

impl ThumbnailRequestBuilder {
    pub fn new(source: Source) -> Self {
        Self {
            request: ThumbnailRequest {
                source,
                width: None,
                height: None,
                side: None,
                mode: ResizeMode::Scale,
                extrapolate: false,
                sharpen: false,
                output_type: None,
                quality: None,
                name: None,
                default_image: None,
                base_url: None,
                cache_lifetime: None,
                force_refresh: false,
            },
        }
    }

    pub fn resize(self, width: u32, height: u32) -> Self {
        self.width(width).height(height)
    }

    pub fn width(mut self, width: u32) -> Self {
        self.request.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.request.height = Some(height);
        self
    }

    pub fn long_side(mut self, size: u32) -> Self {
        self.request.side = Some(SideConstraint::Long(size));
        self
    }

    pub fn short_side(mut self, size: u32) -> Self {
        self.request.side = Some(SideConstraint::Short(size));
        self
    }

    /// Fill the requested box exactly. Clears any side constraint.
    pub fn crop(mut self) -> Self {
        self.request.mode = ResizeMode::Crop;
        self.request.side = None;
        self
    }

    /// Fit inside the requested box. Clears any side constraint.
    pub fn fit(mut self) -> Self {
        self.request.mode = ResizeMode::FitIn;
        self.request.side = None;
        self
    }

    pub fn extrapolate(mut self) -> Self {
        self.request.extrapolate = true;
        self
    }

    pub fn sharpen(mut self) -> Self {
        self.request.sharpen = true;
        self
    }

    pub fn output_type(mut self, kind: ImageKind) -> Self {
        self.request.output_type = Some(kind);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.request.quality = Some(Quality::new(quality));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.request.name = Some(name.into());
        self
    }

    pub fn default_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.default_image = Some(path.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.request.base_url = Some(url.into());
        self
    }

    pub fn cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.request.cache_lifetime = Some(lifetime);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.request.force_refresh = true;
        self
    }

    pub fn build(self) -> ThumbnailRequest {
        self.request
    }
}

/// Flat, serde-friendly request description used by batch files and the CLI.
///
/// `long_side` wins over `short_side` when both are given.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RequestSpec {
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub long_side: Option<u32>,
    pub short_side: Option<u32>,
    pub mode: Option<ResizeMode>,
    #[serde(default)]
    pub extrapolate: bool,
    #[serde(default)]
    pub sharpen: bool,
    #[serde(rename = "type")]
    pub output_type: Option<ImageKind>,
    pub quality: Option<u8>,
    pub name: Option<String>,
    pub default: Option<PathBuf>,
    pub base_url: Option<String>,
    /// Seconds.
    pub cache_lifetime: Option<u64>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl RequestSpec {
    pub fn into_request(self) -> ThumbnailRequest {
        let mut b = ThumbnailRequest::builder(&self.source);
        match self.mode {
            Some(ResizeMode::Crop) => b = b.crop(),
            Some(ResizeMode::FitIn) => b = b.fit(),
            Some(ResizeMode::Scale) | None => {}
        }
        if let Some(w) = self.width {
            b = b.width(w);
        }
        if let Some(h) = self.height {
            b = b.height(h);
        }
        if let Some(n) = self.short_side {
            b = b.short_side(n);
        }
        if let Some(n) = self.long_side {
            b = b.long_side(n);
        }
        if self.extrapolate {
            b = b.extrapolate();
        }
        if self.sharpen {
            b = b.sharpen();
        }
        if let Some(kind) = self.output_type {
            b = b.output_type(kind);
        }
        if let Some(q) = self.quality {
            b = b.quality(q);
        }
        if let Some(name) = self.name {
            b = b.name(name);
        }
        if let Some(path) = self.default {
            b = b.default_image(path);
        }
        if let Some(url) = self.base_url {
            b = b.base_url(url);
        }
        if let Some(secs) = self.cache_lifetime {
            b = b.cache_lifetime(Duration::from_secs(secs));
        }
        if self.force_refresh {
            b = b.force_refresh();
        }
        b.build()
    }
}
