//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. The geometry
//! resolver in [`calculations`](super::calculations) turns them into concrete
//! pixel dimensions, and the pixel stages in [`resample`](super::resample) and
//! [`sharpen`](super::sharpen) consume the result.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`ResizeMode`]: how requested width/height relate to the source aspect ratio.
//! - [`SideConstraint`]: pin the long or short source side to a size.
//! - [`GeometryParams`]: everything the geometry resolver needs from a request.
//! - [`UnsharpMask`]: raw unsharp-mask parameters before calibration.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// How the requested box is applied to the source.
///
/// `Crop` and `FitIn` are mutually exclusive; whichever was set last on a
/// request builder wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Use the requested dimensions as given, deriving a missing one from
    /// the source aspect ratio. Both given means the image is stretched.
    #[default]
    Scale,
    /// Fill the requested box exactly, trimming the excess along one axis.
    Crop,
    /// Shrink to fit entirely inside the requested box, preserving aspect ratio.
    #[serde(rename = "fit")]
    FitIn,
}

/// Pin one side of the source to a size, deriving the other from aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideConstraint {
    /// The larger source dimension (width for square sources).
    Long(u32),
    /// The smaller source dimension (height for square sources).
    Short(u32),
}

impl SideConstraint {
    pub fn size(self) -> u32 {
        match self {
            Self::Long(n) | Self::Short(n) => n,
        }
    }
}

/// Inputs to [`resolve_geometry`](super::calculations::resolve_geometry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Overrides `width`/`height` when set.
    pub side: Option<SideConstraint>,
    pub mode: ResizeMode,
    /// Allow the destination to exceed the source in both dimensions.
    pub extrapolate: bool,
}

/// Unsharp-mask parameters in Photoshop-like units.
///
/// - `amount`: strength in percent (capped at 500)
/// - `radius`: blur radius in pixels (capped at 50)
/// - `threshold`: minimum per-channel difference to sharpen (capped at 255)
///
/// See [`sharpen`](super::sharpen) for the calibration applied before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub amount: f64,
    pub radius: f64,
    pub threshold: u32,
}

impl UnsharpMask {
    /// Fixed sharpening used for sharpened thumbnails.
    pub fn thumbnail() -> Self {
        Self {
            amount: 80.0,
            radius: 0.5,
            threshold: 3,
        }
    }
}
