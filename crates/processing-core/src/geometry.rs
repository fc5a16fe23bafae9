//! Aspect-ratio-preserving placement of visual layers.
//!
//! The canvas is split into two columns: the camera column, whose width
//! is a configured share of the canvas, and the slides region taking the
//! rest. Slides, annotations, cursor, and screen share all live in the
//! slides region; credits and the backdrop use the whole canvas.

use recast_common::config::{AssemblyConfig, WebcamCorner};
use recast_common::error::{RecastError, RecastResult};
use recast_project_model::composition::Rect;

/// Fit `dimensions` into `bounds`, preserving aspect ratio.
///
/// Width is filled first; only when the resulting height overflows is
/// the height filled instead. Rounding is half-to-even so results are
/// reproducible against reference projects.
pub fn constrain(dimensions: (f64, f64), bounds: (u32, u32)) -> RecastResult<(u32, u32)> {
    let (width, height) = dimensions;
    let (max_width, max_height) = bounds;

    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(RecastError::geometry(format!(
            "cannot fit degenerate source size {width}x{height}"
        )));
    }

    let new_height = (height * max_width as f64 / width).round_ties_even();
    if new_height <= max_height as f64 {
        return Ok((max_width, new_height as u32));
    }
    let new_width = (width * max_height as f64 / height).round_ties_even();
    Ok((new_width as u32, max_height))
}

/// Integer-size convenience wrapper around [`constrain`].
pub fn constrain_size(dimensions: (u32, u32), bounds: (u32, u32)) -> RecastResult<(u32, u32)> {
    constrain((dimensions.0 as f64, dimensions.1 as f64), bounds)
}

/// Camera sources are optionally stretched to 16:9 from 4:3 capture.
pub fn stretch_to_widescreen(dimensions: (u32, u32)) -> (f64, f64) {
    (dimensions.0 as f64 * 16.0 / 12.0, dimensions.1 as f64)
}

/// Fixed regions of the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    /// The whole output canvas.
    pub canvas: Rect,

    /// Column reserved for the camera.
    pub camera_column: Rect,

    /// Column for slides and everything drawn over them.
    pub slides_region: Rect,

    corner: WebcamCorner,
}

impl CanvasLayout {
    pub fn from_config(config: &AssemblyConfig) -> Self {
        let camera_width = config.camera_width();
        let slides_width = config.slides_width();
        let corner = config.webcam_corner;

        let (camera_x, slides_x) = if corner.is_left() {
            (0, camera_width as i64)
        } else {
            (slides_width as i64, 0)
        };

        Self {
            canvas: Rect::new(0, 0, config.width, config.height),
            camera_column: Rect::new(camera_x, 0, camera_width, config.height),
            slides_region: Rect::new(slides_x, 0, slides_width, config.height),
            corner,
        }
    }

    /// Bounding box for the slides region.
    pub fn slides_bounds(&self) -> (u32, u32) {
        (self.slides_region.width, self.slides_region.height)
    }

    /// Bounding box for the camera column.
    pub fn camera_bounds(&self) -> (u32, u32) {
        (self.camera_column.width, self.camera_column.height)
    }

    /// Bounding box for full-canvas clips.
    pub fn canvas_bounds(&self) -> (u32, u32) {
        (self.canvas.width, self.canvas.height)
    }

    /// Anchor a fitted camera of `size` to the configured canvas corner.
    pub fn camera_rect(&self, size: (u32, u32)) -> Rect {
        let (width, height) = size;
        let x = if self.corner.is_left() {
            self.canvas.x
        } else {
            self.canvas.right() - width as i64
        };
        let y = if self.corner.is_top() {
            self.canvas.y
        } else {
            self.canvas.bottom() - height as i64
        };
        Rect::new(x, y, width, height)
    }

    /// Place a fitted slide-sized layer at the top-left of the slides region.
    pub fn slide_rect(&self, size: (u32, u32)) -> Rect {
        Rect::new(self.slides_region.x, self.slides_region.y, size.0, size.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_width_first_fit() {
        // 4:3 slide into a 1440x1080 region fills the width exactly
        assert_eq!(constrain_size((1600, 1200), (1440, 1080)).unwrap(), (1440, 1080));
        // 16:9 into the same region is width-limited
        assert_eq!(constrain_size((1920, 1080), (1440, 1080)).unwrap(), (1440, 810));
    }

    #[test]
    fn test_height_limited_fit() {
        // 4:3 camera into a narrow-but-short box falls back to height
        assert_eq!(constrain_size((640, 480), (480, 200)).unwrap(), (267, 200));
        assert_eq!(constrain_size((1280, 720), (480, 200)).unwrap(), (356, 200));
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        // 5 * 5 / 2 = 12.5 rounds to 12, 7 * 5 / 2 = 17.5 rounds to 18
        assert_eq!(constrain_size((2, 5), (5, 100)).unwrap(), (5, 12));
        assert_eq!(constrain_size((2, 7), (5, 100)).unwrap(), (5, 18));
    }

    #[test]
    fn test_stretched_camera_fit() {
        let dims = stretch_to_widescreen((640, 480));
        assert!((dims.0 - 853.333).abs() < 1e-3);
        assert_eq!(constrain(dims, (480, 1080)).unwrap(), (480, 270));
    }

    #[test]
    fn test_degenerate_source_rejected() {
        assert!(matches!(
            constrain_size((0, 480), (100, 100)),
            Err(RecastError::Geometry { .. })
        ));
        assert!(constrain_size((640, 0), (100, 100)).is_err());
        assert!(constrain((f64::NAN, 10.0), (100, 100)).is_err());
    }

    #[test]
    fn test_constrain_idempotent_for_common_sizes() {
        let sources = [(1600, 1200), (1920, 1080), (640, 480), (1280, 720), (1024, 768), (800, 1200)];
        let boxes = [(1440, 1080), (480, 1080), (1920, 1080), (960, 540), (480, 200)];
        for source in sources {
            for bounds in boxes {
                let once = constrain_size(source, bounds).unwrap();
                let twice = constrain_size(once, bounds).unwrap();
                assert_eq!(once, twice, "source {source:?} bounds {bounds:?}");
            }
        }
    }

    #[test]
    fn test_layout_camera_on_right() {
        let config = AssemblyConfig::default();
        let layout = CanvasLayout::from_config(&config);
        assert_eq!(layout.slides_region, Rect::new(0, 0, 1440, 1080));
        assert_eq!(layout.camera_column, Rect::new(1440, 0, 480, 1080));
        assert_eq!(layout.camera_rect((480, 360)), Rect::new(1440, 0, 480, 360));
    }

    #[test]
    fn test_layout_camera_bottom_left() {
        let config = AssemblyConfig {
            webcam_corner: WebcamCorner::BottomLeft,
            ..Default::default()
        };
        let layout = CanvasLayout::from_config(&config);
        assert_eq!(layout.slides_region, Rect::new(480, 0, 1440, 1080));
        assert_eq!(layout.camera_rect((480, 360)), Rect::new(0, 720, 480, 360));
        assert_eq!(layout.slide_rect((1440, 810)), Rect::new(480, 0, 1440, 810));
    }

    proptest! {
        #[test]
        fn prop_constrain_fits_bounds_and_keeps_aspect(
            sw in 1u32..5000,
            sh in 1u32..5000,
            bw in 1u32..5000,
            bh in 1u32..5000,
        ) {
            let (w, h) = constrain_size((sw, sh), (bw, bh)).unwrap();
            prop_assert!(w <= bw);
            prop_assert!(h <= bh);

            let (sw, sh) = (sw as f64, sh as f64);
            let height_error = (h as f64 - w as f64 * sh / sw).abs();
            let width_error = (w as f64 - h as f64 * sw / sh).abs();
            prop_assert!(height_error <= 0.5 + 1e-9 || width_error <= 0.5 + 1e-9);
        }

        #[test]
        fn prop_constrain_fills_one_side(
            sw in 1u32..5000,
            sh in 1u32..5000,
            bw in 1u32..5000,
            bh in 1u32..5000,
        ) {
            let (w, h) = constrain_size((sw, sh), (bw, bh)).unwrap();
            prop_assert!(w == bw || h == bh);
        }
    }
}
