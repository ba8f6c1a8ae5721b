//! Isometric viewport renderer.
//!
//! A render is three passes over the same window, each drawn into its own RGBA
//! layer and alpha-composited back to front:
//!
//! 1. terrain: opaque quads, darkened by ambient light and cloud shadow,
//!    displaced horizontally by the time-of-day shadow offset
//! 2. water: a translucent plane at the water level over submerged cells
//! 3. clouds: translucent quads lifted above the terrain
//!
//! Wanderer markers sit between the water and the clouds. Within a layer,
//! cells are drawn in diagonal order (`i + j` ascending) so nearer quads
//! overwrite farther ones.

pub mod daylight;
pub mod projection;
pub mod raster;

use image::{Rgba, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::biomes::{lerp_color, Rgb8};
use crate::error::ConfigError;
use crate::store::{GridCoord, TileCell, TileWindow, WorldStore};
use crate::viewport::Viewport;

pub use daylight::{DayClock, Lighting};
pub use projection::{IsoProjection, MAX_CANVAS_PIXELS};
use raster::{composite_over, darken, fill_polygon, flatten, rgba, stroke_polygon, Point};

const BACKGROUND: Rgb8 = [255, 255, 255];
const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Cloud cells at or below this density are not drawn.
const CLOUD_THRESHOLD: f64 = 0.5;

/// Tunable drawing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Elevation exaggeration, in cells per unit of normalized height.
    pub height_multiplier: f64,
    /// Pixels per cell step.
    pub pixel_separation: f64,
    /// Extra downward shift of the whole scene, in pixels.
    pub y_pixel_offset: f64,
    /// Height of the cloud plane above the terrain, in cells.
    pub cloud_offset: f64,
    /// How strongly a visible cloud darkens the terrain below it.
    pub cloud_shadow: f64,
    pub cloud_transparency: f64,
    /// Added to every cloud alpha (0-255 scale).
    pub cloud_brightness: f64,
    pub water_alpha: u8,
    pub water_tint: Rgb8,
    /// Blend toward `water_tint`, 0 keeps the terrain color.
    pub water_tint_strength: f64,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            height_multiplier: 32.0,
            pixel_separation: 8.0,
            y_pixel_offset: 0.0,
            cloud_offset: 8.0,
            cloud_shadow: 0.3,
            cloud_transparency: 1.0,
            cloud_brightness: 154.0,
            water_alpha: 128,
            water_tint: [40, 90, 200],
            water_tint_strength: 0.35,
        }
    }
}

impl RenderParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidRender(format!("{name} must be finite and >= 0 (got {v})")))
            }
        };
        if !(self.pixel_separation.is_finite() && self.pixel_separation > 0.0) {
            return Err(ConfigError::InvalidRender(format!(
                "pixel_separation must be positive (got {})",
                self.pixel_separation
            )));
        }
        finite_non_negative("height_multiplier", self.height_multiplier)?;
        finite_non_negative("cloud_offset", self.cloud_offset)?;
        finite_non_negative("cloud_transparency", self.cloud_transparency)?;
        if !self.y_pixel_offset.is_finite() || !self.cloud_brightness.is_finite() {
            return Err(ConfigError::InvalidRender("offsets must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&self.cloud_shadow) {
            return Err(ConfigError::InvalidRender(format!(
                "cloud_shadow must lie in [0, 1] (got {})",
                self.cloud_shadow
            )));
        }
        if !(0.0..=1.0).contains(&self.water_tint_strength) {
            return Err(ConfigError::InvalidRender(format!(
                "water_tint_strength must lie in [0, 1] (got {})",
                self.water_tint_strength
            )));
        }
        self.check_canvas(1, 1)
    }

    /// [`validate`](Self::validate), plus a check that a
    /// `window_width`×`window_height` render fits under [`MAX_CANVAS_PIXELS`].
    pub fn validate_for_window(&self, window_width: u32, window_height: u32) -> Result<(), ConfigError> {
        self.validate()?;
        self.check_canvas(window_width, window_height)
    }

    fn check_canvas(&self, window_width: u32, window_height: u32) -> Result<(), ConfigError> {
        let (w, h) = IsoProjection::canvas_size(window_width, window_height, self);
        if w * h > MAX_CANVAS_PIXELS {
            return Err(ConfigError::InvalidRender(format!(
                "a {window_width}x{window_height} render needs a {w}x{h} pixel canvas (limit {MAX_CANVAS_PIXELS} pixels)"
            )));
        }
        Ok(())
    }

    /// Alpha of a cloud cell with normalized density `v`.
    pub fn cloud_alpha(&self, v: f64) -> u8 {
        if v <= CLOUD_THRESHOLD {
            return 0;
        }
        let alpha = 255.0 * (v - CLOUD_THRESHOLD) * 2.0 * self.cloud_transparency + self.cloud_brightness;
        alpha.clamp(0.0, 255.0) as u8
    }
}

/// Everything a render call needs besides the tiles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderContext {
    pub params: RenderParams,
    pub lighting: Lighting,
}

impl RenderContext {
    pub fn new(params: RenderParams, lighting: Lighting) -> Self {
        Self { params, lighting }
    }
}

/// A point of interest drawn on top of the water layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    pub coord: GridCoord,
    pub color: Rgb8,
}

/// Render the square viewport, wrapping across world edges.
pub fn render_viewport(store: &WorldStore, viewport: &Viewport, ctx: &RenderContext, markers: &[Marker]) -> RgbImage {
    // One extra row and column so edge cells still get full quads.
    let span = viewport.size + 1;
    let terrain = store.terrain.query_wrapped(viewport.x_start, viewport.y_start, span, span);
    let clouds = store.clouds.query_wrapped(viewport.x_start, viewport.y_start, span, span);
    let draw = viewport.size.min(terrain.width).min(terrain.height);
    render_windows(&terrain, &clouds, (draw, draw), store.config().water_level, ctx, markers)
}

/// Render cells with `x_start <= x < x_end` and `y_start <= y < y_end`
/// without wrapping.
pub fn render_section(
    store: &WorldStore,
    (x_start, x_end): (u32, u32),
    (y_start, y_end): (u32, u32),
    ctx: &RenderContext,
    markers: &[Marker],
) -> RgbImage {
    let x_end = x_end.max(x_start);
    let y_end = y_end.max(y_start);
    let terrain = store.terrain.query_range(x_start, x_end, y_start, y_end);
    let clouds = store.clouds.query_range(x_start, x_end, y_start, y_end);
    let extent = (
        (x_end - x_start).min(terrain.width),
        (y_end - y_start).min(terrain.height),
    );
    render_windows(&terrain, &clouds, extent, store.config().water_level, ctx, markers)
}

/// Render the first `extent` cells of two aligned windows. Cells past `extent`
/// only serve as quad neighbours.
pub fn render_windows(
    terrain: &TileWindow,
    clouds: &TileWindow,
    extent: (u32, u32),
    water_level: f64,
    ctx: &RenderContext,
    markers: &[Marker],
) -> RgbImage {
    let params = &ctx.params;
    let proj = IsoProjection::new(extent.0, extent.1, params);
    let mut scene = RgbaImage::new(proj.canvas_width, proj.canvas_height);
    let mut layer = RgbaImage::new(proj.canvas_width, proj.canvas_height);

    draw_terrain(&mut scene, terrain, clouds, extent, &proj, ctx);

    draw_water(&mut layer, terrain, extent, water_level, &proj, ctx);
    composite_over(&mut scene, &layer);

    if !markers.is_empty() {
        clear(&mut layer);
        draw_markers(&mut layer, terrain, markers, &proj);
        composite_over(&mut scene, &layer);
    }

    clear(&mut layer);
    draw_clouds(&mut layer, clouds, extent, &proj, params);
    composite_over(&mut scene, &layer);

    flatten(&scene, BACKGROUND)
}

fn clear(layer: &mut RgbaImage) {
    layer.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
}

/// Visit `(i, j)` in back-to-front order: by diagonal, then by column.
fn diagonal_order(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let diagonals = if width == 0 || height == 0 { 0 } else { width + height - 1 };
    (0..diagonals).flat_map(move |d| {
        let first = d.saturating_sub(height.saturating_sub(1));
        let last = d.min(width.saturating_sub(1));
        (first..=last).map(move |i| (i, d - i))
    })
}

/// The cell's three forward neighbours, if all are present.
fn forward_neighbours(window: &TileWindow, i: u32, j: u32) -> Option<[TileCell; 3]> {
    let (i, j) = (i as i64, j as i64);
    Some([
        *window.get_local(i + 1, j)?,
        *window.get_local(i + 1, j + 1)?,
        *window.get_local(i, j + 1)?,
    ])
}

/// Quad corners in drawing order: cell, right, diagonal, down.
fn quad(proj: &IsoProjection, i: u32, j: u32, heights: [f64; 4], lift: f64, shift_x: f64) -> [Point; 4] {
    let (fi, fj) = (i as f64, j as f64);
    let corners = [(fi, fj), (fi + 1.0, fj), (fi + 1.0, fj + 1.0), (fi, fj + 1.0)];
    let mut points = [(0.0, 0.0); 4];
    for (k, &(x, y)) in corners.iter().enumerate() {
        let (px, py) = proj.project_lifted(x, y, heights[k], lift);
        points[k] = (px + shift_x, py);
    }
    points
}

fn visible_cloud(clouds: &TileWindow, i: u32, j: u32) -> f64 {
    clouds
        .get_local(i as i64, j as i64)
        .map(|c| c.normalized())
        .filter(|&v| v > CLOUD_THRESHOLD)
        .unwrap_or(0.0)
}

fn draw_terrain(
    img: &mut RgbaImage,
    terrain: &TileWindow,
    clouds: &TileWindow,
    extent: (u32, u32),
    proj: &IsoProjection,
    ctx: &RenderContext,
) {
    let shift_x = ctx.lighting.shadow_offset_x * proj.pixel_separation;
    let dimming = 1.0 - ctx.lighting.ambient_light.clamp(0.0, 1.0);

    for (i, j) in diagonal_order(extent.0, extent.1) {
        let Some(cell) = terrain.get_local(i as i64, j as i64) else {
            continue;
        };
        let color = darken(cell.color, dimming);
        let e = cell.normalized();

        match forward_neighbours(terrain, i, j) {
            Some([right, diag, down]) => {
                let shadow = ctx.params.cloud_shadow * visible_cloud(clouds, i, j);
                let shaded = darken(color, shadow);
                let heights = [e, right.normalized(), diag.normalized(), down.normalized()];
                let points = quad(proj, i, j, heights, 0.0, shift_x);
                fill_polygon(img, &points, rgba(shaded, 255));
                stroke_polygon(img, &points, OUTLINE);
            }
            None => {
                let points = proj.diamond(proj.project(i as f64, j as f64, e));
                fill_polygon(img, &points, rgba(color, 255));
                stroke_polygon(img, &points, OUTLINE);
            }
        }
    }
}

fn draw_water(
    img: &mut RgbaImage,
    terrain: &TileWindow,
    extent: (u32, u32),
    water_level: f64,
    proj: &IsoProjection,
    ctx: &RenderContext,
) {
    let params = &ctx.params;
    let dimming = 1.0 - ctx.lighting.ambient_light.clamp(0.0, 1.0);

    for (i, j) in diagonal_order(extent.0, extent.1) {
        let Some(cell) = terrain.get_local(i as i64, j as i64) else {
            continue;
        };
        if cell.normalized() >= water_level || forward_neighbours(terrain, i, j).is_none() {
            continue;
        }
        let tinted = lerp_color(darken(cell.color, dimming), params.water_tint, params.water_tint_strength);
        let points = quad(proj, i, j, [water_level; 4], 0.0, 0.0);
        fill_polygon(img, &points, rgba(tinted, params.water_alpha));
    }
}

fn draw_markers(img: &mut RgbaImage, terrain: &TileWindow, markers: &[Marker], proj: &IsoProjection) {
    for marker in markers {
        let Some((i, j)) = terrain.local_offset(marker.coord) else {
            continue;
        };
        let Some(cell) = terrain.get_local(i as i64, j as i64) else {
            continue;
        };
        let top = proj.project(i as f64, j as f64, cell.normalized());
        // Stand the pin one cell above the ground.
        let top = (top.0, top.1 - proj.pixel_separation);
        let points = proj.diamond(top);
        fill_polygon(img, &points, rgba(marker.color, 255));
        stroke_polygon(img, &points, OUTLINE);
    }
}

fn draw_clouds(img: &mut RgbaImage, clouds: &TileWindow, extent: (u32, u32), proj: &IsoProjection, params: &RenderParams) {
    for (i, j) in diagonal_order(extent.0, extent.1) {
        let Some(cell) = clouds.get_local(i as i64, j as i64) else {
            continue;
        };
        let v = cell.normalized();
        if v <= CLOUD_THRESHOLD {
            continue;
        }
        let Some([right, diag, down]) = forward_neighbours(clouds, i, j) else {
            continue;
        };
        let heights = [v, right.normalized(), diag.normalized(), down.normalized()];
        let points = quad(proj, i, j, heights, params.cloud_offset, 0.0);
        fill_polygon(img, &points, rgba(cell.color, params.cloud_alpha(v)));
    }
}
