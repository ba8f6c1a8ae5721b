//! Viewport origin and toroidal panning.

use crate::store::GridCoord;

/// A square window into the grid. The origin always lies inside the world;
/// panning past any edge wraps to the opposite side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x_start: u32,
    pub y_start: u32,
    pub size: u32,
    world_width: u32,
    world_height: u32,
}

impl Viewport {
    pub fn new(x_start: u32, y_start: u32, size: u32, world_width: u32, world_height: u32) -> Self {
        let world_width = world_width.max(1);
        let world_height = world_height.max(1);
        Self {
            x_start: x_start % world_width,
            y_start: y_start % world_height,
            size: size.clamp(1, world_width.min(world_height)),
            world_width,
            world_height,
        }
    }

    /// Window of `size` cells centred on the grid.
    pub fn centered(size: u32, world_width: u32, world_height: u32) -> Self {
        let mut viewport = Self::new(0, 0, size, world_width, world_height);
        viewport.center_on(GridCoord::new(world_width / 2, world_height / 2));
        viewport
    }

    pub fn world_width(&self) -> u32 {
        self.world_width
    }

    pub fn world_height(&self) -> u32 {
        self.world_height
    }

    /// Move the origin by `(dx, dy)` cells, wrapping on both axes.
    pub fn pan(&mut self, dx: i64, dy: i64) {
        self.x_start = (self.x_start as i64 + dx).rem_euclid(self.world_width as i64) as u32;
        self.y_start = (self.y_start as i64 + dy).rem_euclid(self.world_height as i64) as u32;
    }

    /// Place the window so that `coord` is its centre cell.
    pub fn center_on(&mut self, coord: GridCoord) {
        let half = (self.size / 2) as i64;
        self.x_start = (coord.x as i64 - half).rem_euclid(self.world_width as i64) as u32;
        self.y_start = (coord.y as i64 - half).rem_euclid(self.world_height as i64) as u32;
    }

    /// Centre cell of the window.
    pub fn center(&self) -> GridCoord {
        let half = self.size / 2;
        GridCoord::new(
            (self.x_start + half) % self.world_width,
            (self.y_start + half) % self.world_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_left_from_origin_wraps() {
        let mut viewport = Viewport::new(0, 0, 100, 1000, 500);
        viewport.pan(-1, 0);
        assert_eq!(viewport.x_start, 999);
    }

    #[test]
    fn test_pan_wraps_both_axes() {
        let mut viewport = Viewport::new(990, 495, 20, 1000, 500);
        viewport.pan(15, 10);
        assert_eq!((viewport.x_start, viewport.y_start), (5, 5));
        viewport.pan(-2005, -1010);
        assert_eq!((viewport.x_start, viewport.y_start), (0, 495));
    }

    #[test]
    fn test_centered_and_recenter() {
        let mut viewport = Viewport::centered(100, 1000, 500);
        assert_eq!(viewport.center(), GridCoord::new(500, 250));
        assert_eq!((viewport.x_start, viewport.y_start), (450, 200));

        viewport.center_on(GridCoord::new(10, 10));
        assert_eq!((viewport.x_start, viewport.y_start), (960, 460));
        assert_eq!(viewport.center(), GridCoord::new(10, 10));
    }

    #[test]
    fn test_size_clamped_to_world() {
        let viewport = Viewport::new(0, 0, 500, 64, 32);
        assert_eq!(viewport.size, 32);
    }
}
