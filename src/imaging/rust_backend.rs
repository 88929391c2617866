//! Pure Rust codec backend on the `image` crate, with `jpeg-encoder` for
//! progressive JPEG output.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Decode (GIF, JPEG, PNG) | `image::ImageReader::decode` → RGBA8 |
//! | Encode → JPEG | `jpeg_encoder::Encoder`, progressive, with quality, alpha dropped |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (single frame, palette-quantized) |

use super::backend::{BackendError, ImageBackend, ImageKind, SourceInfo};
use super::params::Quality;
use image::codecs::gif::GifEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Frame, ImageReader, RgbImage, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a file and sniff its format from the leading bytes.
fn open_reader(path: &Path) -> Result<(ImageReader<BufReader<File>>, ImageKind), BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let kind = match reader.format() {
        Some(format) => ImageKind::from_image_format(format).ok_or_else(|| {
            BackendError::UnsupportedFormat(format!("{format:?} ({})", path.display()))
        })?,
        None => {
            return Err(BackendError::UnsupportedFormat(format!(
                "unrecognized data in {}",
                path.display()
            )));
        }
    };
    Ok((reader, kind))
}

/// JPEG stores each side in 16 bits.
fn jpeg_dimensions(image: &RgbImage) -> Result<(u16, u16), BackendError> {
    let (width, height) = image.dimensions();
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(BackendError::Encode(format!(
            "{width}x{height} exceeds the JPEG size limit"
        ))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError> {
        let (reader, kind) = open_reader(path)?;
        let (width, height) = reader.into_dimensions().map_err(|e| {
            BackendError::Decode(format!("Failed to read dimensions of {}: {e}", path.display()))
        })?;
        Ok(SourceInfo {
            width,
            height,
            kind,
        })
    }

    fn decode(&self, path: &Path, kind: ImageKind) -> Result<RgbaImage, BackendError> {
        let (mut reader, sniffed) = open_reader(path)?;
        if sniffed != kind {
            return Err(BackendError::Decode(format!(
                "{} is {sniffed:?}, expected {kind:?}",
                path.display()
            )));
        }
        reader.set_format(kind.image_format());
        let decoded = reader.decode().map_err(|e| {
            BackendError::Decode(format!("Failed to decode {}: {e}", path.display()))
        })?;
        Ok(decoded.into_rgba8())
    }

    fn encode(
        &self,
        image: &RgbaImage,
        kind: ImageKind,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        match kind {
            ImageKind::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
                let (width, height) = jpeg_dimensions(&rgb)?;
                let mut encoder = jpeg_encoder::Encoder::new(&mut buf, quality.value());
                encoder.set_progressive(true);
                encoder
                    .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
                    .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
            }
            ImageKind::Png => {
                image
                    .write_with_encoder(PngEncoder::new(&mut buf))
                    .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
            }
            ImageKind::Gif => {
                // The GIF trailer is written when the encoder drops.
                let mut encoder = GifEncoder::new(&mut buf);
                encoder
                    .encode_frame(Frame::new(image.clone()))
                    .map_err(|e| BackendError::Encode(format!("GIF encode failed: {e}")))?;
            }
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::fs;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    /// Encode a gradient with the backend itself and write it to `path`.
    fn write_test_image(path: &Path, width: u32, height: u32, kind: ImageKind) {
        let bytes = RustBackend::new()
            .encode(&gradient(width, height), kind, Quality::default())
            .unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn identify_each_supported_kind() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        for (name, kind) in [
            ("a.gif", ImageKind::Gif),
            ("a.jpg", ImageKind::Jpeg),
            ("a.png", ImageKind::Png),
        ] {
            let path = tmp.path().join(name);
            write_test_image(&path, 40, 30, kind);
            let info = backend.identify(&path).unwrap();
            assert_eq!(
                info,
                SourceInfo {
                    width: 40,
                    height: 30,
                    kind
                },
                "{name}"
            );
        }
    }

    #[test]
    fn identify_sniffs_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mislabeled.jpg");
        write_test_image(&path, 10, 10, ImageKind::Png);
        let info = RustBackend::new().identify(&path).unwrap();
        assert_eq!(info.kind, ImageKind::Png);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn identify_unrecognized_data_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let text = tmp.path().join("notes.png");
        fs::write(&text, "definitely not an image").unwrap();
        assert!(matches!(
            RustBackend::new().identify(&text),
            Err(BackendError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn decode_png_preserves_pixels() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        let original = gradient(16, 9);
        let bytes = RustBackend::new()
            .encode(&original, ImageKind::Png, Quality::default())
            .unwrap();
        fs::write(&path, bytes).unwrap();

        let decoded = RustBackend::new().decode(&path, ImageKind::Png).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_kind_mismatch_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        write_test_image(&path, 8, 8, ImageKind::Png);
        let result = RustBackend::new().decode(&path, ImageKind::Jpeg);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn encode_jpeg_quality_affects_size() {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([((x * 37 + y * 11) % 256) as u8, ((x * y) % 256) as u8, (y * 4) as u8, 255])
        });
        let backend = RustBackend::new();
        let low = backend.encode(&img, ImageKind::Jpeg, Quality::new(10)).unwrap();
        let high = backend.encode(&img, ImageKind::Jpeg, Quality::new(95)).unwrap();
        assert!(low.len() < high.len());
        assert_eq!(&low[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_jpeg_is_progressive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("p.jpg");
        let bytes = RustBackend::new()
            .encode(&gradient(40, 30), ImageKind::Jpeg, Quality::default())
            .unwrap();

        // SOF2 starts a progressive frame; SOF0 would be baseline.
        assert!(bytes.windows(2).any(|w| w == [0xFF, 0xC2]));
        assert!(!bytes.windows(2).any(|w| w == [0xFF, 0xC0]));

        fs::write(&path, &bytes).unwrap();
        let decoded = RustBackend::new().decode(&path, ImageKind::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn encode_jpeg_rejects_sides_beyond_16_bits() {
        let wide = RgbaImage::new(70_000, 1);
        assert!(matches!(
            RustBackend::new().encode(&wide, ImageKind::Jpeg, Quality::default()),
            Err(BackendError::Encode(_))
        ));
    }

    #[test]
    fn encode_gif_writes_complete_stream() {
        let bytes = RustBackend::new()
            .encode(&gradient(12, 12), ImageKind::Gif, Quality::default())
            .unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(bytes.last(), Some(&0x3B));
    }
}
