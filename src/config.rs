//! World-generation configuration.
//!
//! A [`WorldConfig`] is fixed once a world has been precomputed: the tile store
//! records it in its manifest and refuses to reopen a world under different
//! parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sphere_noise::NoiseParams;

/// Parameters that define a world. Immutable after precompute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Grid width (longitude samples).
    pub width: u32,
    /// Grid height (latitude samples).
    pub height: u32,
    /// Master seed; terrain, cloud and snow seeds are derived from it.
    pub seed: u64,
    /// Normalized elevation below which a cell is water.
    pub water_level: f64,
    /// Macro terrain noise.
    pub terrain_noise: NoiseParams,
    /// Cloud layer noise.
    pub cloud_noise: NoiseParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
            seed: 0,
            water_level: 0.5,
            terrain_noise: NoiseParams::terrain(),
            cloud_noise: NoiseParams::clouds(),
        }
    }
}

impl WorldConfig {
    /// Create a config with default noise settings for the given world.
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            width,
            height,
            seed,
            ..Self::default()
        }
    }

    /// Reject parameters that would make precompute meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if (self.width as u64) * (self.height as u64) > usize::MAX as u64 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.water_level > 0.0 && self.water_level < 1.0) {
            return Err(ConfigError::InvalidWaterLevel(self.water_level));
        }
        self.terrain_noise.validate("terrain")?;
        self.cloud_noise.validate("cloud")?;
        Ok(())
    }

    /// Total number of cells in one layer.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Load a config from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WorldConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }
}
