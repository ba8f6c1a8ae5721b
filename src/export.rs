use std::f64::consts::PI;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::store::{GridCoord, TileTable};
use crate::viewport::Viewport;

const CROSSHAIR: Rgb<u8> = Rgb([255, 0, 0]);
const CROSSHAIR_ARM: i64 = 6;
const SPACE: Rgb<u8> = Rgb([5, 5, 15]);
const NO_DATA: [u8; 3] = [30, 30, 30];

/// Output dimensions of a map down-scaled by `scale` (at least 1×1).
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let scale = scale.max(1.0);
    (
        ((width as f64 / scale) as u32).max(1),
        ((height as f64 / scale) as u32).max(1),
    )
}

fn scaled_pixel(coord: GridCoord, scale: f64, dims: (u32, u32)) -> Option<(u32, u32)> {
    let x = (coord.x as f64 / scale) as u32;
    let y = (coord.y as f64 / scale) as u32;
    (x < dims.0 && y < dims.1).then_some((x, y))
}

/// Equirectangular color map of the whole table, one pass over all cells.
/// Where several cells land on one pixel the last one in row-major order wins.
pub fn render_color_map(terrain: &TileTable, scale: f64) -> RgbImage {
    let scale = scale.max(1.0);
    let dims = scaled_dimensions(terrain.width(), terrain.height(), scale);
    let mut img: RgbImage = ImageBuffer::from_pixel(dims.0, dims.1, Rgb([0, 0, 0]));
    for (coord, cell) in terrain.iter() {
        if let Some((x, y)) = scaled_pixel(coord, scale, dims) {
            img.put_pixel(x, y, Rgb(cell.color));
        }
    }
    img
}

/// Grayscale elevation map: `floor(e / 65535 * 255)`.
pub fn render_height_map(terrain: &TileTable, scale: f64) -> GrayImage {
    let scale = scale.max(1.0);
    let dims = scaled_dimensions(terrain.width(), terrain.height(), scale);
    let mut img: GrayImage = ImageBuffer::new(dims.0, dims.1);
    for (coord, cell) in terrain.iter() {
        if let Some((x, y)) = scaled_pixel(coord, scale, dims) {
            let gray = (cell.elevation as f64 / 65535.0 * 255.0) as u8;
            img.put_pixel(x, y, Luma([gray]));
        }
    }
    img
}

/// Color map `width_px` wide with a red crosshair on the viewport centre.
pub fn render_overview(terrain: &TileTable, width_px: u32, viewport: &Viewport) -> RgbImage {
    let scale = overview_scale(terrain, width_px);
    let mut img = render_color_map(terrain, scale);
    draw_crosshair(&mut img, viewport.center(), scale);
    img
}

/// Down-scale factor that makes a `width_px` wide overview.
pub fn overview_scale(terrain: &TileTable, width_px: u32) -> f64 {
    (terrain.width() as f64 / width_px.max(1) as f64).max(1.0)
}

/// Mark a grid coordinate on a map rendered at `scale`.
pub fn draw_crosshair(img: &mut RgbImage, center: GridCoord, scale: f64) {
    let scale = scale.max(1.0);
    let cx = (center.x as f64 / scale) as i64;
    let cy = (center.y as f64 / scale) as i64;
    let (w, h) = (img.width() as i64, img.height() as i64);
    if w == 0 || h == 0 {
        return;
    }
    for d in -CROSSHAIR_ARM..=CROSSHAIR_ARM {
        // Horizontal arm wraps like the map; the vertical arm is clipped.
        img.put_pixel((cx + d).rem_euclid(w) as u32, cy.clamp(0, h - 1) as u32, CROSSHAIR);
        let y = cy + d;
        if (0..h).contains(&y) {
            img.put_pixel(cx.clamp(0, w - 1) as u32, y as u32, CROSSHAIR);
        }
    }
}

/// Grid coordinate under pixel `(px, py)` of an overview image.
pub fn overview_to_grid(px: u32, py: u32, overview: (u32, u32), world: (u32, u32)) -> GridCoord {
    let fx = px as f64 / overview.0.max(1) as f64;
    let fy = py as f64 / overview.1.max(1) as f64;
    GridCoord::new(
        ((fx * world.0 as f64) as u32).min(world.0.saturating_sub(1)),
        ((fy * world.1 as f64) as u32).min(world.1.saturating_sub(1)),
    )
}

/// Orthographic, Lambert-lit globe of the terrain colors, turned so that
/// `center` faces the viewer.
pub fn render_globe(terrain: &TileTable, center: GridCoord, size: u32) -> RgbImage {
    let (map_w, map_h) = (terrain.width().max(1), terrain.height().max(1));
    let mut img: RgbImage = ImageBuffer::from_pixel(size, size, SPACE);

    let radius = size as f64 / 2.0 - 10.0;
    if radius <= 0.0 {
        return img;
    }
    let center_px = size as f64 / 2.0;
    let light_dir = normalize_vec(1.0, 1.0, 0.8);

    let rotation = -(center.x as f64 / map_w as f64) * 2.0 * PI;
    let tilt = PI / 2.0 - (center.y as f64 / map_h as f64) * PI;
    let (cos_rot, sin_rot) = (rotation.cos(), rotation.sin());
    let (cos_tilt, sin_tilt) = (tilt.cos(), tilt.sin());

    for py in 0..size {
        for px in 0..size {
            let x = (px as f64 - center_px) / radius;
            let y = (center_px - py as f64) / radius;
            let r_squared = x * x + y * y;
            if r_squared > 1.0 {
                continue;
            }
            let z = (1.0 - r_squared).sqrt();

            // Inverse tilt (around X), then inverse spin (around Y).
            let y2 = y * cos_tilt + z * sin_tilt;
            let z2 = -y * sin_tilt + z * cos_tilt;
            let x3 = x * cos_rot - z2 * sin_rot;
            let z3 = x * sin_rot + z2 * cos_rot;

            let lat = y2.clamp(-1.0, 1.0).asin();
            let lon = x3.atan2(z3).rem_euclid(2.0 * PI);

            let map_x = (lon / (2.0 * PI) * map_w as f64) as u32 % map_w;
            let map_y = ((0.5 - lat / PI) * map_h as f64).clamp(0.0, map_h as f64 - 1.0) as u32;
            let base = terrain
                .get(GridCoord::new(map_x, map_y))
                .map(|c| c.color)
                .unwrap_or(NO_DATA);

            let diffuse = (x * light_dir.0 + y * light_dir.1 + z * light_dir.2).max(0.0);
            let ambient = 0.3;
            let intensity = ambient + (1.0 - ambient) * diffuse;
            let shade = |c: u8| (c as f64 * intensity).clamp(0.0, 255.0) as u8;
            img.put_pixel(px, py, Rgb([shade(base[0]), shade(base[1]), shade(base[2])]));
        }
    }

    add_atmosphere_glow(&mut img, radius, center_px);
    img
}

/// Faint blue halo just outside the globe's limb.
fn add_atmosphere_glow(img: &mut RgbImage, radius: f64, center: f64) {
    let glow_radius = radius * 1.15;
    let (w, h) = img.dimensions();
    for py in 0..h {
        for px in 0..w {
            let x = px as f64 - center;
            let y = py as f64 - center;
            let dist = (x * x + y * y).sqrt();
            if dist > radius && dist < glow_radius {
                let t = (dist - radius) / (glow_radius - radius);
                let glow = (1.0 - t).powi(2) * 0.4;
                let pixel = img.get_pixel(px, py);
                let r = (pixel[0] as f64 + 100.0 * glow).min(255.0) as u8;
                let g = (pixel[1] as f64 + 150.0 * glow).min(255.0) as u8;
                let b = (pixel[2] as f64 + 255.0 * glow).min(255.0) as u8;
                img.put_pixel(px, py, Rgb([r, g, b]));
            }
        }
    }
}

fn normalize_vec(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let len = (x * x + y * y + z * z).sqrt();
    (x / len, y / len, z / len)
}

pub fn export_color_map(terrain: &TileTable, scale: f64, path: &str) -> Result<(), image::ImageError> {
    render_color_map(terrain, scale).save(path)
}

pub fn export_height_map(terrain: &TileTable, scale: f64, path: &str) -> Result<(), image::ImageError> {
    render_height_map(terrain, scale).save(path)
}

pub fn export_overview(
    terrain: &TileTable,
    width_px: u32,
    viewport: &Viewport,
    path: &str,
) -> Result<(), image::ImageError> {
    render_overview(terrain, width_px, viewport).save(path)
}

pub fn export_globe(terrain: &TileTable, center: GridCoord, size: u32, path: &str) -> Result<(), image::ImageError> {
    render_globe(terrain, center, size).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Layer, TileCell};

    fn gradient(width: u32, height: u32) -> TileTable {
        let mut table = TileTable::in_memory(Layer::Terrain, width, height);
        let cells = (0..height).flat_map(|y| {
            (0..width).map(move |x| {
                let color = [(x * 10) as u8, (y * 10) as u8, 0];
                (GridCoord::new(x, y), TileCell::new(color, (x * 1000) as u16))
            })
        });
        table.populate(cells).unwrap();
        table
    }

    #[test]
    fn test_color_map_full_scale() {
        let table = gradient(8, 4);
        let img = render_color_map(&table, 1.0);
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(*img.get_pixel(3, 2), Rgb([30, 20, 0]));
    }

    #[test]
    fn test_color_map_downscaled_keeps_last_write() {
        let table = gradient(8, 4);
        let img = render_color_map(&table, 2.0);
        assert_eq!(img.dimensions(), (4, 2));
        // Pixel (1, 0) collects cells x in {2, 3}, y in {0, 1}; (3, 1) is last.
        assert_eq!(*img.get_pixel(1, 0), Rgb([30, 10, 0]));
        // Scales below 1 are treated as 1.
        assert_eq!(render_color_map(&table, 0.25).dimensions(), (8, 4));
    }

    #[test]
    fn test_height_map_gray_levels() {
        let mut table = TileTable::in_memory(Layer::Terrain, 3, 1);
        table
            .populate([
                (GridCoord::new(0, 0), TileCell::new([0, 0, 0], 0)),
                (GridCoord::new(1, 0), TileCell::new([0, 0, 0], 32768)),
                (GridCoord::new(2, 0), TileCell::new([0, 0, 0], 65535)),
            ])
            .unwrap();
        let img = render_height_map(&table, 1.0);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 127);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_overview_crosshair() {
        let table = gradient(20, 10);
        let viewport = Viewport::centered(4, 20, 10);
        let img = render_overview(&table, 20, &viewport);
        let center = viewport.center();
        assert_eq!(*img.get_pixel(center.x, center.y), CROSSHAIR);
    }

    #[test]
    fn test_overview_click_maps_back_to_grid() {
        assert_eq!(overview_to_grid(50, 25, (100, 50), (1000, 500)), GridCoord::new(500, 250));
        assert_eq!(overview_to_grid(100, 50, (100, 50), (1000, 500)), GridCoord::new(999, 499));
    }

    #[test]
    fn test_globe_faces_center() {
        let mut table = TileTable::in_memory(Layer::Terrain, 16, 8);
        let cells = (0..8).flat_map(|y| {
            (0..16).map(move |x| {
                let color = if (3..=5).contains(&x) { [250, 0, 0] } else { [0, 0, 250] };
                (GridCoord::new(x, y), TileCell::new(color, 0))
            })
        });
        table.populate(cells).unwrap();
        let img = render_globe(&table, GridCoord::new(4, 4), 64);
        let mid = img.get_pixel(32, 32);
        assert!(mid[0] > mid[2], "center pixel {mid:?} should show the red meridian");
        assert_eq!(*img.get_pixel(0, 0), SPACE);
    }
}
