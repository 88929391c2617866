//! Two-stage resampling of the decoded source into the destination size.
//!
//! Interpolating filters get expensive at extreme downscale ratios, so large
//! reductions run in two passes:
//!
//! 1. **Coarse**: nearest-neighbour shrink of the crop region to 4× the
//!    destination size. Only when *both* destination sides are under a
//!    quarter of the crop region.
//! 2. **Final**: bilinear (`Triangle`) resample to the exact destination size.
//!
//! The crop region is applied by whichever pass reads the original buffer;
//! after a coarse pass the working buffer *is* the crop, so the final pass
//! reads it whole.

use super::calculations::{CropRegion, Geometry};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Factor between the coarse pass output and the destination size.
const COARSE_FACTOR: u32 = 4;

/// Which passes a resample will run, derived from geometry alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplePlan {
    /// Intermediate size of the nearest-neighbour pass, if any.
    pub coarse: Option<(u32, u32)>,
    /// Region read by the final pass.
    pub final_region: CropRegion,
    pub width: u32,
    pub height: u32,
}

/// Decide whether the coarse pass runs and what the final pass reads.
pub fn plan_resample(geometry: &Geometry) -> ResamplePlan {
    let crop = geometry.crop;
    let (dst_w, dst_h) = (geometry.width as u64, geometry.height as u64);
    let factor = COARSE_FACTOR as u64;

    if dst_w * factor < crop.width as u64 && dst_h * factor < crop.height as u64 {
        let coarse = (geometry.width * COARSE_FACTOR, geometry.height * COARSE_FACTOR);
        ResamplePlan {
            coarse: Some(coarse),
            final_region: CropRegion {
                x: 0,
                y: 0,
                width: coarse.0,
                height: coarse.1,
            },
            width: geometry.width,
            height: geometry.height,
        }
    } else {
        ResamplePlan {
            coarse: None,
            final_region: crop,
            width: geometry.width,
            height: geometry.height,
        }
    }
}

/// Copy out a region, skipping the copy when it covers the whole buffer.
fn region(image: RgbaImage, r: CropRegion) -> RgbaImage {
    if r.x == 0 && r.y == 0 && (r.width, r.height) == image.dimensions() {
        image
    } else {
        imageops::crop_imm(&image, r.x, r.y, r.width, r.height).to_image()
    }
}

/// Resample `source` into the destination described by `geometry`.
pub fn resample(source: RgbaImage, geometry: &Geometry) -> RgbaImage {
    let plan = plan_resample(geometry);

    let working = match plan.coarse {
        Some((w, h)) => {
            let cropped = region(source, geometry.crop);
            imageops::resize(&cropped, w, h, FilterType::Nearest)
        }
        None => source,
    };

    let cropped = region(working, plan.final_region);
    if cropped.dimensions() == (plan.width, plan.height) {
        return cropped;
    }
    imageops::resize(&cropped, plan.width, plan.height, FilterType::Triangle)
}
