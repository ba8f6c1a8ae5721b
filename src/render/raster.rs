//! Minimal rasterization on `image` buffers: polygon fill, lines, compositing.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::biomes::{lerp_color, Rgb8};

/// A point in pixel space.
pub type Point = (f64, f64);

/// Fill a polygon with the even-odd rule, sampling at pixel centres.
/// Pixels are overwritten, not blended.
pub fn fill_polygon(img: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    if points.len() < 3 {
        return;
    }
    let (w, h) = (img.width() as i64, img.height() as i64);
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let row_start = (min_y.floor() as i64).max(0);
    let row_end = (max_y.ceil() as i64).min(h - 1);

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for row in row_start..=row_end {
        let yc = row as f64 + 0.5;
        crossings.clear();
        for i in 0..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let first = ((span[0] - 0.5).ceil() as i64).max(0);
            let last = ((span[1] - 0.5).ceil() as i64 - 1).min(w - 1);
            for col in first..=last {
                img.put_pixel(col as u32, row as u32, color);
            }
        }
    }
}

/// Bresenham line between two points, clipped to the image.
pub fn draw_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (mut x, mut y) = (from.0.round() as i64, from.1.round() as i64);
    let (x1, y1) = (to.0.round() as i64, to.1.round() as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (w, h) = (img.width() as i64, img.height() as i64);

    loop {
        if x >= 0 && y >= 0 && x < w && y < h {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Outline a closed polygon.
pub fn stroke_polygon(img: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    for i in 0..points.len() {
        draw_line(img, points[i], points[(i + 1) % points.len()], color);
    }
}

/// Alpha-composite `layer` over `base` in place (source-over).
pub fn composite_over(base: &mut RgbaImage, layer: &RgbaImage) {
    for (dst, src) in base.pixels_mut().zip(layer.pixels()) {
        let sa = src[3] as u32;
        if sa == 0 {
            continue;
        }
        if sa == 255 {
            *dst = *src;
            continue;
        }
        let da = dst[3] as u32;
        // out_a = sa + da (1 - sa), all in 0..=255 fixed point.
        let out_a = sa * 255 + da * (255 - sa);
        if out_a == 0 {
            *dst = Rgba([0, 0, 0, 0]);
            continue;
        }
        let mut out = [0u8; 4];
        for c in 0..3 {
            let v = src[c] as u32 * sa * 255 + dst[c] as u32 * da * (255 - sa);
            out[c] = ((v + out_a / 2) / out_a).min(255) as u8;
        }
        out[3] = ((out_a + 127) / 255).min(255) as u8;
        *dst = Rgba(out);
    }
}

/// Drop the alpha channel over an opaque background.
pub fn flatten(layer: &RgbaImage, background: Rgb8) -> RgbImage {
    let mut out = RgbImage::from_pixel(layer.width(), layer.height(), Rgb(background));
    for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
        let a = src[3] as f64 / 255.0;
        *dst = Rgb(lerp_color(background, [src[0], src[1], src[2]], a));
    }
    out
}

/// Scale a color toward black: `amount` 0 keeps it, 1 gives black.
pub fn darken(color: Rgb8, amount: f64) -> Rgb8 {
    lerp_color(color, [0, 0, 0], amount)
}

pub fn rgba(color: Rgb8, alpha: u8) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], alpha])
}
