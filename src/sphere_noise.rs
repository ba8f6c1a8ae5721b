//! Seamless noise sampling on the sphere.
//!
//! Grid coordinates are equirectangular: x maps to longitude, y to latitude.
//! Sampling 3-D noise on the unit sphere (instead of 2-D noise on the flat grid)
//! makes the antimeridian columns and the polar rows meet without seams.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::seeds::perlin_seed;

/// Fractal noise settings for one layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Multiplier applied to the unit-sphere point (higher = smaller features)
    pub scale: f64,
    /// Number of octaves summed
    pub octaves: u32,
    /// Amplitude decay per octave
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
}

impl NoiseParams {
    /// Macro terrain defaults.
    pub fn terrain() -> Self {
        Self {
            scale: 5.0,
            octaves: 16,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }

    /// Cloud layer defaults: larger scale, fewer octaves.
    pub fn clouds() -> Self {
        Self {
            scale: 7.0,
            octaves: 8,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }

    pub(crate) fn validate(&self, layer: &'static str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidNoise { layer, reason };
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid(format!("scale must be positive (got {})", self.scale)));
        }
        if self.octaves == 0 {
            return Err(invalid("octaves must be at least 1".to_string()));
        }
        if !(self.persistence.is_finite() && self.persistence > 0.0) {
            return Err(invalid(format!(
                "persistence must be positive (got {})",
                self.persistence
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return Err(invalid(format!(
                "lacunarity must be positive (got {})",
                self.lacunarity
            )));
        }
        Ok(())
    }
}

/// Convert a grid coordinate to `(latitude, longitude)` in radians.
///
/// Longitude spans [0, 2π), latitude spans [−π/2, π/2).
#[inline]
pub fn grid_to_lat_lon(x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
    let lon = (x / width as f64) * TAU;
    let lat = (y / height as f64) * PI - FRAC_PI_2;
    (lat, lon)
}

/// Absolute latitude of a grid row, in [0, π/2].
#[inline]
pub fn abs_latitude(y: u32, height: u32) -> f64 {
    grid_to_lat_lon(0.0, y as f64, 1, height).0.abs()
}

/// Point on the unit sphere for the given angles.
#[inline]
pub fn unit_sphere_point(lat: f64, lon: f64) -> [f64; 3] {
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Fractional Brownian Motion in 3-D, normalized by the summed amplitudes.
fn fbm3(noise: &Perlin, point: [f64; 3], octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude
            * noise.get([
                point[0] * frequency,
                point[1] * frequency,
                point[2] * frequency,
            ]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

/// Seeded fractal noise evaluated on the sphere surface.
#[derive(Clone, Debug)]
pub struct SphereSampler {
    noise: Perlin,
    params: NoiseParams,
}

impl SphereSampler {
    pub fn new(seed: u64, params: NoiseParams) -> Self {
        Self {
            noise: Perlin::new(perlin_seed(seed)),
            params,
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Sample the field at grid `(x, y)` of a `width`×`height` world.
    /// Returns a value in [−1, 1].
    pub fn sample(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        let (lat, lon) = grid_to_lat_lon(x as f64, y as f64, width, height);
        let [px, py, pz] = unit_sphere_point(lat, lon);
        let s = self.params.scale;
        let value = fbm3(
            &self.noise,
            [px * s, py * s, pz * s],
            self.params.octaves,
            self.params.persistence,
            self.params.lacunarity,
        );
        value.clamp(-1.0, 1.0)
    }

    /// Sample and rescale from [−1, 1] to [0, 1].
    pub fn sample_normalized(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        (self.sample(x, y, width, height) + 1.0) / 2.0
    }
}

/// One-shot form of [`SphereSampler::sample`].
#[allow(clippy::too_many_arguments)]
pub fn sample(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    seed: u64,
    scale: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    let params = NoiseParams {
        scale,
        octaves,
        persistence,
        lacunarity,
    };
    SphereSampler::new(seed, params).sample(x, y, width, height)
}

/// Low-frequency roughness for the snow line, sampled on flat grid coordinates
/// so it varies independently of the macro terrain.
#[derive(Clone, Debug)]
pub struct SnowNoise {
    noise: Perlin,
}

/// Grid cells per noise unit for the snow roughness field.
const SNOW_NOISE_PERIOD: f64 = 100.0;

impl SnowNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            noise: Perlin::new(perlin_seed(seed)),
        }
    }

    /// Roughness factor in [0, 1].
    pub fn factor(&self, x: u32, y: u32) -> f64 {
        let value = self
            .noise
            .get([x as f64 / SNOW_NOISE_PERIOD, y as f64 / SNOW_NOISE_PERIOD]);
        ((value + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}
