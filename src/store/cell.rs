//! Cell types shared by the terrain and cloud tables.

use serde::{Deserialize, Serialize};

use crate::biomes::{decode_elevation, Rgb8};
use crate::error::StoreError;

/// Integer grid coordinate. x is longitude, y is latitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

impl GridCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Stored value of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileCell {
    pub color: Rgb8,
    /// Normalized height in fixed point (0 = 0.0, 65535 = 1.0).
    pub elevation: u16,
}

impl TileCell {
    pub const fn new(color: Rgb8, elevation: u16) -> Self {
        Self { color, elevation }
    }

    /// Elevation as a float in [0, 1].
    pub fn normalized(&self) -> f64 {
        decode_elevation(self.elevation)
    }
}

/// "r,g,b" with decimal components.
pub fn format_color(color: Rgb8) -> String {
    format!("{},{},{}", color[0], color[1], color[2])
}

pub fn parse_color(text: &str) -> Result<Rgb8, StoreError> {
    let malformed = || StoreError::MalformedColor(text.to_string());
    let mut parts = text.split(',');
    let mut color = [0u8; 3];
    for channel in color.iter_mut() {
        *channel = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(malformed)?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok(color)
}

/// On-disk form of one table row.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Record {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub elevation: u16,
}

impl Record {
    pub fn from_cell(coord: GridCoord, cell: &TileCell) -> Self {
        Self {
            x: coord.x,
            y: coord.y,
            color: format_color(cell.color),
            elevation: cell.elevation,
        }
    }

    pub fn into_cell(self) -> Result<(GridCoord, TileCell), StoreError> {
        let color = parse_color(&self.color)?;
        Ok((GridCoord::new(self.x, self.y), TileCell::new(color, self.elevation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_text_form() {
        assert_eq!(format_color([10, 20, 30]), "10,20,30");
        assert_eq!(parse_color("10,20,30").unwrap(), [10, 20, 30]);
        assert_eq!(parse_color(" 1, 2 ,3").unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_malformed_colors_rejected() {
        for bad in ["", "1,2", "1,2,3,4", "1,2,300", "a,b,c"] {
            assert!(
                matches!(parse_color(bad), Err(StoreError::MalformedColor(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_normalized_elevation() {
        assert_eq!(TileCell::new([0, 0, 0], 65535).normalized(), 1.0);
        assert_eq!(TileCell::new([0, 0, 0], 0).normalized(), 0.0);
    }
}
