//! Pure calculation functions for thumbnail geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! [`resolve_geometry`] maps source dimensions plus request parameters to the
//! destination size and the region of the source that gets resampled into
//! it. The steps run in a fixed order, each refining the previous result:
//!
//! 1. **Default**: no width, height or side constraint → keep the source width.
//! 2. **Baseline**: a missing width or height is derived from the source aspect ratio.
//! 3. **Side constraint**: long/short side overrides both dimensions.
//! 4. **Fit-in**: scale the source by the larger of the two axis ratios.
//! 5. **Crop**: trim the axis with the larger ratio, centered.
//! 6. **Extrapolation guard**: without extrapolation, never exceed the
//!    (cropped) source in both dimensions.

use super::params::{GeometryParams, ResizeMode, SideConstraint};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("source dimensions must be positive, got {width}x{height}")]
    EmptySource { width: u32, height: u32 },
    #[error("requested {field} must be positive")]
    ZeroRequest { field: &'static str },
    #[error("resolved {what} {width}x{height} has an empty side")]
    Degenerate {
        what: &'static str,
        width: u32,
        height: u32,
    },
}

/// Region of the source image that is resampled into the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Resolved destination geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Source region; the full source unless crop mode trimmed an axis.
    pub crop: CropRegion,
}

/// `value * num / den` in floating point, rounded half away from zero.
fn scale(value: f64, num: f64, den: f64) -> f64 {
    (value * num / den).round()
}

/// Resolve destination dimensions and source crop region.
///
/// # Arguments
/// * `source` - Source image dimensions (width, height)
/// * `params` - Requested geometry
///
/// # Examples
/// ```
/// # use thumbcache::imaging::{GeometryParams, ResizeMode, resolve_geometry};
/// let params = GeometryParams {
///     width: Some(200),
///     height: Some(100),
///     mode: ResizeMode::Crop,
///     ..GeometryParams::default()
/// };
/// let g = resolve_geometry((600, 400), &params).unwrap();
/// assert_eq!((g.width, g.height), (200, 100));
/// assert_eq!((g.crop.y, g.crop.height), (50, 300));
/// ```
pub fn resolve_geometry(
    source: (u32, u32),
    params: &GeometryParams,
) -> Result<Geometry, GeometryError> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return Err(GeometryError::EmptySource {
            width: src_w,
            height: src_h,
        });
    }
    for (field, value) in [
        ("width", params.width),
        ("height", params.height),
        ("side", params.side.map(SideConstraint::size)),
    ] {
        if value == Some(0) {
            return Err(GeometryError::ZeroRequest { field });
        }
    }

    let mut eff_w = src_w as f64;
    let mut eff_h = src_h as f64;

    let width = match (params.width, params.height, params.side) {
        (None, None, None) => Some(src_w),
        _ => params.width,
    };

    let (mut dst_w, mut dst_h) = match (width, params.height) {
        (Some(w), Some(h)) => (w as f64, h as f64),
        (Some(w), None) => (w as f64, scale(w as f64, eff_h, eff_w)),
        (None, Some(h)) => (scale(h as f64, eff_w, eff_h), h as f64),
        (None, None) => (0.0, 0.0),
    };

    if let Some(side) = params.side {
        let n = side.size() as f64;
        let portrait = src_w < src_h;
        let pin_height = match side {
            SideConstraint::Long(_) => portrait,
            SideConstraint::Short(_) => !portrait,
        };
        if pin_height {
            dst_h = n;
            dst_w = scale(n, eff_w, eff_h);
        } else {
            dst_w = n;
            dst_h = scale(n, eff_h, eff_w);
        }
    }

    if dst_w < 1.0 || dst_h < 1.0 {
        return Err(GeometryError::Degenerate {
            what: "destination",
            width: dst_w as u32,
            height: dst_h as u32,
        });
    }

    let mut offset_x = 0.0;
    let mut offset_y = 0.0;
    let width_ratio = eff_w / dst_w;
    let height_ratio = eff_h / dst_h;

    match params.mode {
        ResizeMode::FitIn => {
            let ratio = width_ratio.max(height_ratio);
            dst_w = (eff_w / ratio).round();
            dst_h = (eff_h / ratio).round();
        }
        ResizeMode::Crop if width_ratio > height_ratio => {
            let kept = dst_w * height_ratio;
            offset_x = ((eff_w - kept) / 2.0).round();
            eff_w = kept.round();
        }
        ResizeMode::Crop if width_ratio < height_ratio => {
            let kept = dst_h * width_ratio;
            offset_y = ((eff_h - kept) / 2.0).round();
            eff_h = kept.round();
        }
        ResizeMode::Crop | ResizeMode::Scale => {}
    }

    if !params.extrapolate && dst_w > eff_w && dst_h > eff_h {
        dst_w = eff_w;
        dst_h = eff_h;
    }

    let geometry = Geometry {
        width: dst_w as u32,
        height: dst_h as u32,
        crop: CropRegion {
            x: offset_x as u32,
            y: offset_y as u32,
            width: eff_w as u32,
            height: eff_h as u32,
        },
    };

    if geometry.width == 0 || geometry.height == 0 {
        return Err(GeometryError::Degenerate {
            what: "destination",
            width: geometry.width,
            height: geometry.height,
        });
    }
    if geometry.crop.width == 0 || geometry.crop.height == 0 {
        return Err(GeometryError::Degenerate {
            what: "crop region",
            width: geometry.crop.width,
            height: geometry.crop.height,
        });
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GeometryParams {
        GeometryParams::default()
    }

    fn resolve(source: (u32, u32), p: GeometryParams) -> Geometry {
        resolve_geometry(source, &p).unwrap()
    }

    fn full(w: u32, h: u32) -> CropRegion {
        CropRegion {
            x: 0,
            y: 0,
            width: w,
            height: h,
        }
    }

    // =========================================================================
    // Baseline sizing
    // =========================================================================

    #[test]
    fn no_constraints_keeps_source_size() {
        let g = resolve((640, 480), params());
        assert_eq!((g.width, g.height), (640, 480));
        assert_eq!(g.crop, full(640, 480));
    }

    #[test]
    fn width_only_derives_height() {
        let g = resolve(
            (600, 400),
            GeometryParams {
                width: Some(300),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (300, 200));
    }

    #[test]
    fn height_only_derives_width() {
        let g = resolve(
            (600, 400),
            GeometryParams {
                height: Some(100),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (150, 100));
    }

    #[test]
    fn width_only_height_matches_rounding_formula() {
        for &(sw, sh) in &[(600, 400), (1024, 768), (333, 777), (5, 3), (1000, 1)] {
            for w in [1u32, 7, 64, 199, 200, 1500] {
                let expected_h = (w as f64 * sh as f64 / sw as f64).round() as u32;
                let result = resolve_geometry(
                    (sw, sh),
                    &GeometryParams {
                        width: Some(w),
                        extrapolate: true,
                        ..params()
                    },
                );
                match result {
                    Ok(g) => {
                        assert_eq!(g.width, w, "{sw}x{sh} w={w}");
                        assert_eq!(g.height, expected_h, "{sw}x{sh} w={w}");
                    }
                    Err(GeometryError::Degenerate { .. }) => assert_eq!(expected_h, 0),
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
        }
    }

    #[test]
    fn both_dimensions_in_scale_mode_stretch() {
        let g = resolve(
            (600, 400),
            GeometryParams {
                width: Some(100),
                height: Some(100),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (100, 100));
        assert_eq!(g.crop, full(600, 400));
    }

    // =========================================================================
    // Long / short side
    // =========================================================================

    #[test]
    fn long_side_on_portrait_pins_height() {
        let g = resolve(
            (300, 600),
            GeometryParams {
                side: Some(SideConstraint::Long(200)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (100, 200));
    }

    #[test]
    fn long_side_on_landscape_pins_width() {
        let g = resolve(
            (800, 600),
            GeometryParams {
                side: Some(SideConstraint::Long(400)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (400, 300));
    }

    #[test]
    fn long_side_on_square_pins_width() {
        let g = resolve(
            (500, 500),
            GeometryParams {
                side: Some(SideConstraint::Long(100)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (100, 100));
    }

    #[test]
    fn short_side_on_portrait_pins_width() {
        let g = resolve(
            (300, 600),
            GeometryParams {
                side: Some(SideConstraint::Short(150)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (150, 300));
    }

    #[test]
    fn short_side_on_landscape_pins_height() {
        let g = resolve(
            (800, 600),
            GeometryParams {
                side: Some(SideConstraint::Short(300)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (400, 300));
    }

    #[test]
    fn side_overrides_explicit_dimensions() {
        let g = resolve(
            (800, 600),
            GeometryParams {
                width: Some(50),
                height: Some(50),
                side: Some(SideConstraint::Long(400)),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (400, 300));
    }

    // =========================================================================
    // Fit-in
    // =========================================================================

    #[test]
    fn fit_in_landscape_into_square_box() {
        let g = resolve(
            (800, 600),
            GeometryParams {
                width: Some(200),
                height: Some(200),
                mode: ResizeMode::FitIn,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (200, 150));
        assert_eq!(g.crop, full(800, 600));
    }

    #[test]
    fn fit_in_portrait_into_wide_box() {
        let g = resolve(
            (300, 600),
            GeometryParams {
                width: Some(400),
                height: Some(100),
                mode: ResizeMode::FitIn,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (50, 100));
    }

    #[test]
    fn fit_in_never_exceeds_box() {
        for &(sw, sh) in &[(800, 600), (600, 800), (1920, 1080), (333, 777), (10, 1000)] {
            for &(bw, bh) in &[(100, 100), (200, 50), (37, 91), (640, 480)] {
                let g = resolve(
                    (sw, sh),
                    GeometryParams {
                        width: Some(bw),
                        height: Some(bh),
                        mode: ResizeMode::FitIn,
                        extrapolate: true,
                        ..params()
                    },
                );
                assert!(g.width <= bw, "{sw}x{sh} in {bw}x{bh} gave {}x{}", g.width, g.height);
                assert!(g.height <= bh, "{sw}x{sh} in {bw}x{bh} gave {}x{}", g.width, g.height);
            }
        }
    }

    // =========================================================================
    // Crop
    // =========================================================================

    #[test]
    fn crop_trims_height_when_height_ratio_larger() {
        // width_ratio = 3, height_ratio = 4 → trim vertically
        let g = resolve(
            (600, 400),
            GeometryParams {
                width: Some(200),
                height: Some(100),
                mode: ResizeMode::Crop,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (200, 100));
        assert_eq!(
            g.crop,
            CropRegion {
                x: 0,
                y: 50,
                width: 600,
                height: 300
            }
        );
    }

    #[test]
    fn crop_trims_width_when_width_ratio_larger() {
        // width_ratio = 4, height_ratio = 3 → trim horizontally
        let g = resolve(
            (800, 300),
            GeometryParams {
                width: Some(200),
                height: Some(100),
                mode: ResizeMode::Crop,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (200, 100));
        assert_eq!(
            g.crop,
            CropRegion {
                x: 100,
                y: 0,
                width: 600,
                height: 300
            }
        );
    }

    #[test]
    fn crop_equal_ratios_keeps_full_source() {
        let g = resolve(
            (800, 400),
            GeometryParams {
                width: Some(200),
                height: Some(100),
                mode: ResizeMode::Crop,
                ..params()
            },
        );
        assert_eq!(g.crop, full(800, 400));
    }

    #[test]
    fn crop_aspect_matches_destination() {
        for &(sw, sh) in &[(800, 600), (600, 800), (1920, 1080), (333, 777), (4000, 100)] {
            for &(bw, bh) in &[(100, 100), (200, 50), (37, 91), (64, 48)] {
                let g = resolve(
                    (sw, sh),
                    GeometryParams {
                        width: Some(bw),
                        height: Some(bh),
                        mode: ResizeMode::Crop,
                        extrapolate: true,
                        ..params()
                    },
                );
                assert_eq!((g.width, g.height), (bw, bh));
                assert!(g.crop.x + g.crop.width <= sw);
                assert!(g.crop.y + g.crop.height <= sh);
                let crop_aspect = g.crop.width as f64 / g.crop.height as f64;
                let dst_aspect = bw as f64 / bh as f64;
                // One crop side is rounded to the nearest pixel.
                let tolerance = dst_aspect / g.crop.width.min(g.crop.height) as f64 + 1e-9;
                assert!(
                    (crop_aspect - dst_aspect).abs() <= tolerance,
                    "{sw}x{sh} → {bw}x{bh}: crop {:?}",
                    g.crop
                );
            }
        }
    }

    // =========================================================================
    // Extrapolation guard
    // =========================================================================

    #[test]
    fn upscale_clamped_without_extrapolate() {
        let g = resolve(
            (100, 80),
            GeometryParams {
                width: Some(400),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (100, 80));
    }

    #[test]
    fn upscale_allowed_with_extrapolate() {
        let g = resolve(
            (100, 80),
            GeometryParams {
                width: Some(400),
                extrapolate: true,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (400, 320));
    }

    #[test]
    fn single_axis_upscale_not_clamped() {
        let g = resolve(
            (100, 80),
            GeometryParams {
                width: Some(200),
                height: Some(40),
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (200, 40));
    }

    #[test]
    fn crop_upscale_clamps_to_cropped_source() {
        let g = resolve(
            (100, 100),
            GeometryParams {
                width: Some(400),
                height: Some(200),
                mode: ResizeMode::Crop,
                ..params()
            },
        );
        assert_eq!((g.width, g.height), (100, 50));
        assert_eq!(
            g.crop,
            CropRegion {
                x: 0,
                y: 25,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn never_exceeds_source_on_both_axes_without_extrapolate() {
        for &(sw, sh) in &[(100, 80), (80, 100), (1, 1), (640, 480)] {
            for &(w, h) in &[(Some(1000), None), (None, Some(900)), (Some(700), Some(800))] {
                for mode in [ResizeMode::Scale, ResizeMode::Crop, ResizeMode::FitIn] {
                    let g = resolve(
                        (sw, sh),
                        GeometryParams {
                            width: w,
                            height: h,
                            mode,
                            ..params()
                        },
                    );
                    assert!(g.width <= sw || g.height <= sh, "{sw}x{sh} {mode:?} {w:?}x{h:?}");
                }
            }
        }
    }

    // =========================================================================
    // Invalid input
    // =========================================================================

    #[test]
    fn zero_source_rejected() {
        assert_eq!(
            resolve_geometry((0, 100), &params()),
            Err(GeometryError::EmptySource {
                width: 0,
                height: 100
            })
        );
    }

    #[test]
    fn zero_request_rejected() {
        let err = resolve_geometry(
            (100, 100),
            &GeometryParams {
                height: Some(0),
                ..params()
            },
        )
        .unwrap_err();
        assert_eq!(err, GeometryError::ZeroRequest { field: "height" });

        let err = resolve_geometry(
            (100, 100),
            &GeometryParams {
                side: Some(SideConstraint::Short(0)),
                ..params()
            },
        )
        .unwrap_err();
        assert_eq!(err, GeometryError::ZeroRequest { field: "side" });
    }

    #[test]
    fn derived_dimension_rounding_to_zero_rejected() {
        let err = resolve_geometry(
            (1000, 1),
            &GeometryParams {
                width: Some(10),
                ..params()
            },
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));
    }

    #[test]
    fn crop_region_rounding_to_zero_rejected() {
        let err = resolve_geometry(
            (1000, 1),
            &GeometryParams {
                width: Some(1),
                height: Some(10),
                mode: ResizeMode::Crop,
                extrapolate: true,
                ..params()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Degenerate {
                what: "crop region",
                ..
            }
        ));
    }
}
