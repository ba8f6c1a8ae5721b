//! Biome classification: normalized noise + latitude -> color and elevation.
//!
//! Four elevation bands (water, coast, lowland, mountain) partition [0, 1].
//! Band boundaries are continuous in latitude so they migrate smoothly toward the
//! poles, and a snow override whitens land at high latitudes.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// An 8-bit RGB triple.
pub type Rgb8 = [u8; 3];

// =============================================================================
// PALETTE
// =============================================================================

const DEEP_WATER: Rgb8 = [0, 0, 128];
const SHALLOW_WATER: Rgb8 = [200, 200, 255];
const WET_SAND: Rgb8 = [250, 240, 190];
const DRY_SAND: Rgb8 = [244, 164, 96];
const FOREST_GREEN: Rgb8 = [34, 139, 34];
const OLIVE: Rgb8 = [107, 142, 35];
const ROCK_GREY: Rgb8 = [200, 200, 200];
const WHITE: Rgb8 = [255, 255, 255];
const ICE: Rgb8 = [255, 250, 250];
const CLOUD_SHADE: Rgb8 = [200, 200, 200];

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Coast threshold at the equator, before blending with the water level.
const COAST_EQUATOR: f64 = 0.45;
/// Coast threshold from 45° latitude poleward.
const COAST_HIGH_LATITUDE: f64 = 0.425;
/// Width of the coastal band above the water level at the equator.
const COAST_WIDTH: f64 = 0.05;
/// Start of the mountain band.
const MOUNTAIN_START: f64 = 0.7;
/// Above this latitude, land is solid ice.
const ICE_LATITUDE: f64 = 2.0 * PI / 5.0;
/// Above this latitude, land is partially snow covered.
const SNOW_LATITUDE: f64 = FRAC_PI_4;
/// Latitude span over which the snow blend ramps from 0 to full.
const SNOW_RAMP: f64 = PI / 20.0;

/// Elevation band of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Water,
    Coast,
    Lowland,
    Mountain,
}

impl Biome {
    pub fn all() -> &'static [Biome] {
        &[Biome::Water, Biome::Coast, Biome::Lowland, Biome::Mountain]
    }

    pub fn is_land(&self) -> bool {
        !matches!(self, Biome::Water)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Water => "water",
            Biome::Coast => "coast",
            Biome::Lowland => "lowland",
            Biome::Mountain => "mountain",
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Linear interpolation between two colors, rounded per channel.
pub fn lerp_color(a: Rgb8, b: Rgb8, t: f64) -> Rgb8 {
    let t = t.clamp(0.0, 1.0);
    let channel = |i: usize| lerp(a[i] as f64, b[i] as f64, t).round().clamp(0.0, 255.0) as u8;
    [channel(0), channel(1), channel(2)]
}

/// Position of `value` inside `[lo, hi)`, in [0, 1]. A zero-width band yields 0.
#[inline]
pub fn band_factor(value: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fixed-point encoding of a normalized height.
#[inline]
pub fn encode_elevation(normalized: f64) -> u16 {
    (normalized.clamp(0.0, 1.0) * 65535.0).round() as u16
}

/// Inverse of [`encode_elevation`].
#[inline]
pub fn decode_elevation(elevation: u16) -> f64 {
    elevation as f64 / 65535.0
}

/// Raw coast threshold for a latitude: 0.45 at the equator easing to 0.425 at
/// 45°, then blended from `water_level + 0.05` (equator) toward that value
/// (poles). The coastal band is widest at the equator.
pub fn coast_threshold(abs_latitude: f64, water_level: f64) -> f64 {
    let band = if abs_latitude < FRAC_PI_4 {
        lerp(COAST_EQUATOR, COAST_HIGH_LATITUDE, abs_latitude / FRAC_PI_4)
    } else {
        COAST_HIGH_LATITUDE
    };
    lerp(water_level + COAST_WIDTH, band, abs_latitude / FRAC_PI_2)
}

/// Band boundaries for one latitude. Bands are `[0, water_end)`,
/// `[water_end, coast_end)`, `[coast_end, lowland_end)`, `[lowland_end, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandThresholds {
    pub water_end: f64,
    pub coast_end: f64,
    pub lowland_end: f64,
}

impl BandThresholds {
    pub fn new(abs_latitude: f64, water_level: f64) -> Self {
        let lowland_end = MOUNTAIN_START.max(water_level);
        // Near the poles the blended threshold dips under the water level; the
        // coast band then has zero width instead of overlapping the water band.
        let coast_end = coast_threshold(abs_latitude, water_level).clamp(water_level, lowland_end);
        Self {
            water_end: water_level,
            coast_end,
            lowland_end,
        }
    }

    pub fn band_of(&self, value: f64) -> Biome {
        if value < self.water_end {
            Biome::Water
        } else if value < self.coast_end {
            Biome::Coast
        } else if value < self.lowland_end {
            Biome::Lowland
        } else {
            Biome::Mountain
        }
    }

    /// Half-open range `[lo, hi)` covered by a band (the mountain band also
    /// includes 1.0).
    pub fn range(&self, biome: Biome) -> (f64, f64) {
        match biome {
            Biome::Water => (0.0, self.water_end),
            Biome::Coast => (self.water_end, self.coast_end),
            Biome::Lowland => (self.coast_end, self.lowland_end),
            Biome::Mountain => (self.lowland_end, 1.0),
        }
    }
}

/// Result of classifying one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classified {
    pub biome: Biome,
    pub color: Rgb8,
    pub elevation: u16,
}

/// Classify a normalized sample with a smooth (unperturbed) snow line.
pub fn classify(normalized: f64, abs_latitude: f64, water_level: f64) -> Classified {
    classify_with_snow(normalized, abs_latitude, water_level, 1.0)
}

/// Classify a normalized sample. `snow_roughness` in [0, 1] scales the snow
/// blend between 45° and 72° latitude.
pub fn classify_with_snow(
    normalized: f64,
    abs_latitude: f64,
    water_level: f64,
    snow_roughness: f64,
) -> Classified {
    let normalized = normalized.clamp(0.0, 1.0);
    let abs_latitude = abs_latitude.clamp(0.0, FRAC_PI_2);
    let bands = BandThresholds::new(abs_latitude, water_level);
    let biome = bands.band_of(normalized);
    let (lo, hi) = bands.range(biome);
    let t = band_factor(normalized, lo, hi);
    let polar = abs_latitude / FRAC_PI_2;

    let mut color = match biome {
        Biome::Water => lerp_color(DEEP_WATER, SHALLOW_WATER, t),
        Biome::Coast => lerp_color(WET_SAND, DRY_SAND, t),
        Biome::Lowland => {
            let base = lerp_color(DRY_SAND, FOREST_GREEN, polar);
            lerp_color(base, OLIVE, t)
        }
        Biome::Mountain => lerp_color(ROCK_GREY, WHITE, t),
    };

    if biome.is_land() {
        if abs_latitude > ICE_LATITUDE {
            color = ICE;
        } else if abs_latitude > SNOW_LATITUDE {
            let snow = ((abs_latitude - SNOW_LATITUDE) / SNOW_RAMP) * snow_roughness.clamp(0.0, 1.0);
            color = lerp_color(color, WHITE, snow);
        }
    }

    Classified {
        biome,
        color,
        elevation: encode_elevation(normalized),
    }
}

/// Cloud cell: white thinning to grey as density rises.
pub fn classify_cloud(normalized: f64) -> (Rgb8, u16) {
    let normalized = normalized.clamp(0.0, 1.0);
    (
        lerp_color(WHITE, CLOUD_SHADE, normalized),
        encode_elevation(normalized),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_example() {
        let c = classify(0.3, 0.0, 0.5);
        assert_eq!(c.biome, Biome::Water);
        assert_eq!(c.color, [120, 120, 204]);
    }

    #[test]
    fn test_mountain_example() {
        let c = classify(0.8, 0.0, 0.5);
        assert_eq!(c.biome, Biome::Mountain);
        assert_eq!(c.color, [218, 218, 218]);
    }

    #[test]
    fn test_elevation_in_unit_range() {
        for i in 0..=100 {
            let v = i as f64 / 100.0;
            for j in 0..=10 {
                let lat = FRAC_PI_2 * j as f64 / 10.0;
                let c = classify(v, lat, 0.5);
                let e = c.elevation as f64 / 65535.0;
                assert!((0.0..=1.0).contains(&e));
            }
        }
        assert_eq!(classify(1.0, 0.0, 0.5).elevation, 65535);
        assert_eq!(classify(0.0, 0.0, 0.5).elevation, 0);
    }

    #[test]
    fn test_bands_partition_unit_interval() {
        for wl_step in 1..20 {
            let water_level = wl_step as f64 / 20.0;
            for lat_step in 0..=12 {
                let lat = FRAC_PI_2 * lat_step as f64 / 12.0;
                let bands = BandThresholds::new(lat, water_level);

                // Contiguous, ordered, and spanning [0, 1].
                let ranges: Vec<(f64, f64)> = Biome::all().iter().map(|&b| bands.range(b)).collect();
                assert_eq!(ranges[0].0, 0.0);
                assert_eq!(ranges[3].1, 1.0);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].1, pair[1].0);
                }
                for (lo, hi) in &ranges {
                    assert!(lo <= hi);
                }

                // Every value lands in exactly the band whose range contains it.
                for i in 0..=200 {
                    let v = i as f64 / 200.0;
                    let owners: Vec<Biome> = Biome::all()
                        .iter()
                        .copied()
                        .filter(|&b| {
                            let (lo, hi) = bands.range(b);
                            v >= lo && (v < hi || (b == Biome::Mountain && v <= hi))
                        })
                        .collect();
                    assert_eq!(owners.len(), 1, "v={v} wl={water_level} lat={lat}");
                    assert_eq!(owners[0], bands.band_of(v));
                }
            }
        }
    }

    #[test]
    fn test_coast_band_shrinks_toward_poles() {
        let equator = BandThresholds::new(0.0, 0.5);
        let polar = BandThresholds::new(FRAC_PI_2, 0.5);
        let width = |b: &BandThresholds| b.coast_end - b.water_end;
        assert!((width(&equator) - 0.05).abs() < 1e-12);
        assert!(width(&polar) < width(&equator));
    }

    #[test]
    fn test_zero_width_band_has_zero_factor() {
        assert_eq!(band_factor(0.5, 0.5, 0.5), 0.0);
        // At the pole the coast band collapses; a value on the water level is lowland.
        let c = classify(0.5, FRAC_PI_2, 0.5);
        assert!(c.biome.is_land());
    }

    #[test]
    fn test_ice_caps_on_polar_land() {
        let c = classify(0.6, 1.3, 0.5);
        assert_eq!(c.color, ICE);
        // Polar water is not frozen.
        let w = classify(0.2, 1.3, 0.5);
        assert_eq!(w.biome, Biome::Water);
        assert_ne!(w.color, ICE);
    }

    #[test]
    fn test_snow_roughness_scales_blend() {
        let lat = SNOW_LATITUDE + SNOW_RAMP * 0.5;
        let bare = classify_with_snow(0.6, lat, 0.5, 0.0);
        let rough = classify_with_snow(0.6, lat, 0.5, 1.0);
        assert!(rough.color[0] >= bare.color[0]);
        assert!(rough.color[2] > bare.color[2]);
        // No snow below 45°.
        let south = classify_with_snow(0.6, 0.5, 0.5, 1.0);
        let south_bare = classify_with_snow(0.6, 0.5, 0.5, 0.0);
        assert_eq!(south.color, south_bare.color);
    }

    #[test]
    fn test_lowland_palette_shifts_with_latitude() {
        let equator = classify(0.6, 0.0, 0.5);
        let temperate = classify(0.6, 0.7, 0.5);
        assert_eq!(equator.biome, Biome::Lowland);
        assert_eq!(temperate.biome, Biome::Lowland);
        // Warm sand at the equator, greener toward the poles.
        assert!(equator.color[0] > temperate.color[0]);
    }

    #[test]
    fn test_cloud_classification() {
        assert_eq!(classify_cloud(0.0), ([255, 255, 255], 0));
        assert_eq!(classify_cloud(1.0), ([200, 200, 200], 65535));
    }
}
