//! Image processing: geometry, codecs, resampling, sharpening.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader` header sniffing |
//! | **Geometry** | [`resolve_geometry`] (pure) |
//! | **Resample** | nearest pre-shrink + `Triangle` resize |
//! | **Sharpen** | shifted-overlay blur + unsharp mask |
//! | **Encode** | GIF / JPEG / PNG encoders from `image` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Resample / Sharpen**: Pixel stages on RGBA buffers

pub mod backend;
mod calculations;
mod params;
pub mod resample;
pub mod rust_backend;
pub mod sharpen;

pub use backend::{BackendError, ImageBackend, ImageKind, SourceInfo};
pub use calculations::{CropRegion, Geometry, GeometryError, resolve_geometry};
pub use params::{GeometryParams, Quality, ResizeMode, SideConstraint, UnsharpMask};
pub use resample::resample;
pub use rust_backend::RustBackend;
pub use sharpen::unsharp_mask;
