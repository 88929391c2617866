//! Unsharp mask: sharpen by amplifying the difference from a blurred copy.
//!
//! The blur approximates a 3×3 Gaussian (`1 2 1 / 2 4 2 / 1 2 1`) without a
//! convolution kernel: shifted copies of the image are blended into the blur
//! buffer one at a time, with weights that stand in for the matrix entries.
//! Larger radii repeat the same sequence.
//!
//! Parameters are calibrated to Photoshop-like units before use:
//!
//! | Parameter | Cap | Transform |
//! |---|---|---|
//! | amount | 500 | × 0.016 |
//! | radius | 50 | × 2, rounded (0 → no-op) |
//! | threshold | 255 | - |

use super::params::UnsharpMask;
use image::RgbaImage;

/// One shifted overlay: copy a `(w - shrink_w) × (h - shrink_h)` block from
/// `src` at `(src_x, src_y)` onto the blur at `(dst_x, dst_y)`, blended at
/// `pct` percent.
struct Overlay {
    dst: (u32, u32),
    src: (u32, u32),
    shrink: (u32, u32),
    pct: u32,
}

const fn overlay(dst: (u32, u32), src: (u32, u32), shrink: (u32, u32), pct: u32) -> Overlay {
    Overlay {
        dst,
        src,
        shrink,
        pct,
    }
}

/// The blur pass. The first overlay is a plain copy; the rest blend.
const OVERLAYS: [Overlay; 9] = [
    overlay((0, 0), (1, 1), (1, 1), 100), // up left
    overlay((1, 1), (0, 0), (0, 0), 50),  // down right
    overlay((0, 1), (1, 0), (1, 0), 33),  // down left
    overlay((1, 0), (0, 1), (0, 1), 25),  // up right
    overlay((0, 0), (1, 0), (1, 0), 33),  // left
    overlay((1, 0), (0, 0), (0, 0), 25),  // right
    overlay((0, 0), (0, 1), (0, 1), 20),  // up
    overlay((0, 1), (0, 0), (0, 0), 16),  // down
    overlay((0, 0), (0, 0), (0, 0), 50),  // center
];

/// Unsharp-mask parameters after calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrated {
    pub amount: f64,
    /// Number of blur passes.
    pub radius: u32,
    pub threshold: i32,
}

impl UnsharpMask {
    pub fn calibrate(self) -> Calibrated {
        let amount = self.amount.min(500.0) * 0.016;
        let radius = (self.radius.min(50.0) * 2.0).round().abs() as u32;
        let threshold = self.threshold.min(255) as i32;
        Calibrated {
            amount,
            radius,
            threshold,
        }
    }
}

/// Blend `src` over `dst` channel-wise at `pct` percent, truncating.
#[inline]
fn blend(src: u8, dst: u8, pct: u32) -> u8 {
    (src as f64 * (pct as f64 / 100.0) + dst as f64 * ((100 - pct) as f64 / 100.0)) as u8
}

fn apply_overlay(blur: &mut RgbaImage, src: &RgbaImage, o: &Overlay) {
    let (w, h) = src.dimensions();
    let copy_w = w - o.shrink.0;
    let copy_h = h - o.shrink.1;

    for j in 0..copy_h {
        let (sy, dy) = (o.src.1 + j, o.dst.1 + j);
        if sy >= h || dy >= h {
            continue;
        }
        for i in 0..copy_w {
            let (sx, dx) = (o.src.0 + i, o.dst.0 + i);
            if sx >= w || dx >= w {
                continue;
            }
            let s = src.get_pixel(sx, sy).0;
            let d = blur.get_pixel_mut(dx, dy);
            for c in 0..3 {
                d.0[c] = blend(s[c], d.0[c], o.pct);
            }
            d.0[3] = s[3];
        }
    }
}

/// Build the blurred copy used as the mask.
pub fn blur(image: &RgbaImage, passes: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut blurred = RgbaImage::new(w, h);
    for _ in 0..passes {
        for o in &OVERLAYS {
            apply_overlay(&mut blurred, image, o);
        }
    }
    blurred
}

/// Sharpen one channel value against its blurred counterpart.
#[inline]
fn sharpen_channel(orig: u8, blurred: u8, mask: &Calibrated) -> u8 {
    let diff = orig as i32 - blurred as i32;
    if diff.abs() >= mask.threshold {
        (mask.amount * diff as f64 + orig as f64)
            .clamp(0.0, 255.0)
            .round() as u8
    } else {
        orig
    }
}

/// Apply an unsharp mask in place. Returns the number of rewritten pixels.
///
/// Alpha is left untouched and pixels whose color does not change are not
/// written.
pub fn unsharp_mask(image: &mut RgbaImage, params: UnsharpMask) -> usize {
    let mask = params.calibrate();
    if mask.radius == 0 || image.width() == 0 || image.height() == 0 {
        return 0;
    }

    let blurred = blur(image, mask.radius);
    let mut changed = 0;
    for (x, y, px) in image.enumerate_pixels_mut() {
        let b = blurred.get_pixel(x, y).0;
        let new = [
            sharpen_channel(px.0[0], b[0], &mask),
            sharpen_channel(px.0[1], b[1], &mask),
            sharpen_channel(px.0[2], b[2], &mask),
        ];
        if new != [px.0[0], px.0[1], px.0[2]] {
            px.0[..3].copy_from_slice(&new);
            changed += 1;
        }
    }
    changed
}
