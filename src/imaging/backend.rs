//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the thumbnail
//! pipeline needs from a codec: identify, decode, and encode. Geometry,
//! resampling and sharpening are backend-independent and live in their own
//! modules.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on top of the `image`
//! crate.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::params::Quality;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// The three raster formats the pipeline reads and writes.
///
/// Numeric codes follow the classic `getimagesize` convention
/// (1 = GIF, 2 = JPEG, 3 = PNG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Gif,
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Gif => 1,
            Self::Jpeg => 2,
            Self::Png => 3,
        }
    }

    /// Largest width or height the format can store.
    pub fn max_side(self) -> u32 {
        match self {
            Self::Gif | Self::Jpeg => u16::MAX as u32,
            Self::Png => i32::MAX as u32,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Gif),
            2 => Some(Self::Jpeg),
            3 => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Gif => image::ImageFormat::Gif,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// Result of an identify operation: header-level facts, no pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub kind: ImageKind,
}

impl SourceInfo {
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Trait for image codec backends.
///
/// `identify` must not decode pixel data: the orchestrator calls it before
/// the pixel-budget guard and the cache check.
pub trait ImageBackend: Sync {
    /// Read format and dimensions from the file header.
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError>;

    /// Decode a file of the given kind into an RGBA pixel buffer.
    fn decode(&self, path: &Path, kind: ImageKind) -> Result<RgbaImage, BackendError>;

    /// Encode a pixel buffer. `quality` only applies to JPEG.
    fn encode(
        &self,
        image: &RgbaImage,
        kind: ImageKind,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Real backend wrapper that counts calls, so tests can tell a cache hit
    /// (identify only) from a full render (identify + decode + encode).
    /// Atomics keep it Sync for rayon batch tests.
    #[derive(Default)]
    pub struct CountingBackend {
        inner: RustBackend,
        pub identifies: AtomicUsize,
        pub decodes: AtomicUsize,
        pub encodes: AtomicUsize,
    }

    impl CountingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn decode_count(&self) -> usize {
            self.decodes.load(Ordering::SeqCst)
        }

        pub fn encode_count(&self) -> usize {
            self.encodes.load(Ordering::SeqCst)
        }
    }

    impl ImageBackend for CountingBackend {
        fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError> {
            self.identifies.fetch_add(1, Ordering::SeqCst);
            self.inner.identify(path)
        }

        fn decode(&self, path: &Path, kind: ImageKind) -> Result<RgbaImage, BackendError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(path, kind)
        }

        fn encode(
            &self,
            image: &RgbaImage,
            kind: ImageKind,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(image, kind, quality)
        }
    }

    /// Backend whose encoder always fails, for hard-failure paths.
    #[derive(Default)]
    pub struct FailingEncoder {
        inner: RustBackend,
    }

    impl ImageBackend for FailingEncoder {
        fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError> {
            self.inner.identify(path)
        }

        fn decode(&self, path: &Path, kind: ImageKind) -> Result<RgbaImage, BackendError> {
            self.inner.decode(path, kind)
        }

        fn encode(&self, _: &RgbaImage, kind: ImageKind, _: Quality) -> Result<Vec<u8>, BackendError> {
            Err(BackendError::Encode(format!("{kind:?} encoder unavailable")))
        }
    }

    #[test]
    fn kind_codes_roundtrip() {
        for kind in [ImageKind::Gif, ImageKind::Jpeg, ImageKind::Png] {
            assert_eq!(ImageKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ImageKind::from_code(4), None);
        assert_eq!(ImageKind::from_code(0), None);
    }

    #[test]
    fn kind_codes_match_convention() {
        assert_eq!(ImageKind::Gif.code(), 1);
        assert_eq!(ImageKind::Jpeg.code(), 2);
        assert_eq!(ImageKind::Png.code(), 3);
    }

    #[test]
    fn kind_from_image_format() {
        assert_eq!(
            ImageKind::from_image_format(image::ImageFormat::Png),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::from_image_format(image::ImageFormat::WebP), None);
        assert_eq!(ImageKind::from_image_format(image::ImageFormat::Tiff), None);
    }

    #[test]
    fn source_info_pixels_does_not_overflow() {
        let info = SourceInfo {
            width: 100_000,
            height: 100_000,
            kind: ImageKind::Png,
        };
        assert_eq!(info.pixels(), 10_000_000_000);
    }
}
