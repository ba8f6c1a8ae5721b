//! Isometric projection of a grid window onto a canvas.

use super::raster::Point;
use super::RenderParams;

const HALF_SQRT3: f64 = 0.866_025_403_784_438_6;

/// Extra canvas width on each side, in cells, so a displaced shadow pass stays
/// on the canvas.
const SHADOW_MARGIN: f64 = 10.0;

/// Largest canvas a render may allocate (16384 × 16384 pixels).
pub const MAX_CANVAS_PIXELS: f64 = 16_384.0 * 16_384.0;

/// Maps window-relative cells and elevations to pixels.
///
/// ```text
/// iso_x = (dx - dy) * √3/2 * sep + center_x
/// iso_y = ((dx + dy) / 2 - e * height_multiplier) * sep + center_y - vertical_trim
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsoProjection {
    pub pixel_separation: f64,
    pub height_multiplier: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub vertical_trim: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl IsoProjection {
    /// Canvas sized to hold a `window_width`×`window_height` window at any
    /// elevation, including the lifted cloud plane.
    pub fn new(window_width: u32, window_height: u32, params: &RenderParams) -> Self {
        let sep = params.pixel_separation;
        let h = window_height as f64;
        let (canvas_width, canvas_height) = Self::canvas_size(window_width, window_height, params);
        let lift = params.height_multiplier + params.cloud_offset;

        let center_y = (canvas_height / 2.0).floor();
        // Top edge of the canvas sits at the highest possible cloud vertex.
        let top = lift * sep + params.y_pixel_offset;
        Self {
            pixel_separation: sep,
            height_multiplier: params.height_multiplier,
            center_x: h * HALF_SQRT3 * sep + SHADOW_MARGIN * sep,
            center_y,
            vertical_trim: center_y - top,
            canvas_width: canvas_width as u32,
            canvas_height: canvas_height as u32,
        }
    }

    /// Canvas `(width, height)` in pixels, before conversion to integers.
    pub fn canvas_size(window_width: u32, window_height: u32, params: &RenderParams) -> (f64, f64) {
        let sep = params.pixel_separation;
        let (w, h) = (window_width as f64, window_height as f64);
        let lift = params.height_multiplier + params.cloud_offset;
        (
            ((w + h) * HALF_SQRT3 * sep + 2.0 * SHADOW_MARGIN * sep).ceil().max(1.0),
            (((w + h) / 2.0 + lift) * sep).ceil().max(1.0),
        )
    }

    /// Pixel position of window cell `(dx, dy)` at normalized elevation `e`.
    pub fn project(&self, dx: f64, dy: f64, e: f64) -> Point {
        let sep = self.pixel_separation;
        let x = (dx - dy) * HALF_SQRT3 * sep + self.center_x;
        let y = ((dx + dy) / 2.0 - e * self.height_multiplier) * sep + self.center_y - self.vertical_trim;
        (x, y)
    }

    /// Same as [`project`](Self::project) with an extra lift in cells.
    pub fn project_lifted(&self, dx: f64, dy: f64, e: f64, lift: f64) -> Point {
        let (x, y) = self.project(dx, dy, e);
        (x, y - lift * self.pixel_separation)
    }

    /// Flat diamond of one cell's footprint with its top vertex at `top`.
    pub fn diamond(&self, top: Point) -> [Point; 4] {
        let sep = self.pixel_separation;
        let (x, y) = top;
        [
            (x, y),
            (x + sep * HALF_SQRT3, y + sep / 2.0),
            (x, y + sep),
            (x - sep * HALF_SQRT3, y + sep / 2.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RenderParams {
        RenderParams {
            height_multiplier: 10.0,
            pixel_separation: 4.0,
            cloud_offset: 2.0,
            y_pixel_offset: 0.0,
            ..RenderParams::default()
        }
    }

    #[test]
    fn test_window_fits_on_canvas() {
        let proj = IsoProjection::new(20, 20, &params());
        let corners = [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0), (20.0, 20.0)];
        for &(dx, dy) in &corners {
            for e in [0.0, 1.0] {
                let (x, y) = proj.project(dx, dy, e);
                assert!(x >= 0.0 && x <= proj.canvas_width as f64, "x={x}");
                assert!(y >= 0.0 && y <= proj.canvas_height as f64, "y={y}");
            }
            let (_, y) = proj.project_lifted(dx, dy, 1.0, 2.0);
            assert!(y >= -1e-9);
        }
    }

    #[test]
    fn test_higher_cells_project_higher() {
        let proj = IsoProjection::new(8, 8, &params());
        let low = proj.project(3.0, 3.0, 0.2);
        let high = proj.project(3.0, 3.0, 0.8);
        assert_eq!(low.0, high.0);
        assert!(high.1 < low.1);
    }

    #[test]
    fn test_x_axis_runs_down_right() {
        let proj = IsoProjection::new(8, 8, &params());
        let origin = proj.project(0.0, 0.0, 0.0);
        let right = proj.project(1.0, 0.0, 0.0);
        let down = proj.project(0.0, 1.0, 0.0);
        assert!(right.0 > origin.0 && right.1 > origin.1);
        assert!(down.0 < origin.0 && down.1 > origin.1);
    }

    #[test]
    fn test_y_pixel_offset_shifts_everything() {
        let base = IsoProjection::new(8, 8, &params());
        let shifted = IsoProjection::new(
            8,
            8,
            &RenderParams {
                y_pixel_offset: 12.0,
                ..params()
            },
        );
        let a = base.project(2.0, 5.0, 0.5);
        let b = shifted.project(2.0, 5.0, 0.5);
        assert!((b.1 - a.1 - 12.0).abs() < 1e-9);
    }
}
