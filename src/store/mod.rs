//! Persistent tile storage.
//!
//! A world lives in its own directory, keyed by seed and dimensions:
//!
//! ```text
//! {data_dir}/world_{seed}_{width}x{height}/
//!     world.json      manifest: format version + WorldConfig
//!     terrain.jsonl   one record per terrain cell
//!     clouds.jsonl    one record per cloud cell
//! ```
//!
//! Tables are filled once by precompute and then only read.

mod cell;
mod table;
mod window;

pub use cell::{format_color, parse_color, GridCoord, TileCell};
pub use table::{Layer, PopulateOutcome, TileTable};
pub use window::{split_wrapped, TileWindow};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::WorldConfig;
use crate::error::StoreError;

/// Current on-disk layout version.
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "world.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    config: WorldConfig,
}

/// Directory name for a world under the data directory.
pub fn world_dir_name(config: &WorldConfig) -> String {
    format!("world_{}_{}x{}", config.seed, config.width, config.height)
}

/// Terrain and cloud tables of one world.
#[derive(Debug)]
pub struct WorldStore {
    dir: Option<PathBuf>,
    config: WorldConfig,
    pub terrain: TileTable,
    pub clouds: TileTable,
}

impl WorldStore {
    /// Open (or create) the world directory for `config` under `data_dir`.
    ///
    /// Reopening a directory written under different parameters is an error.
    pub fn open(data_dir: &Path, config: &WorldConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let dir = data_dir.join(world_dir_name(config));
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            let text = fs::read_to_string(&manifest_path)
                .map_err(|e| StoreError::io(&manifest_path, e))?;
            let manifest: Manifest =
                serde_json::from_str(&text).map_err(|e| StoreError::json(&manifest_path, e))?;
            if manifest.version > FORMAT_VERSION {
                return Err(StoreError::UnsupportedVersion {
                    found: manifest.version,
                    supported: FORMAT_VERSION,
                });
            }
            if manifest.config != *config {
                return Err(StoreError::ManifestMismatch { path: manifest_path });
            }
        } else {
            let manifest = Manifest {
                version: FORMAT_VERSION,
                config: config.clone(),
            };
            let text = serde_json::to_string_pretty(&manifest)
                .map_err(|e| StoreError::json(&manifest_path, e))?;
            fs::write(&manifest_path, text).map_err(|e| StoreError::io(&manifest_path, e))?;
            info!(path = %dir.display(), "created world directory");
        }

        let (w, h) = (config.width, config.height);
        Ok(Self {
            terrain: TileTable::open(Layer::Terrain, &dir.join(Layer::Terrain.file_name()), w, h)?,
            clouds: TileTable::open(Layer::Clouds, &dir.join(Layer::Clouds.file_name()), w, h)?,
            dir: Some(dir),
            config: config.clone(),
        })
    }

    /// Open a world that `generate` has already written, without creating
    /// anything on disk.
    pub fn open_existing(data_dir: &Path, config: &WorldConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let dir = data_dir.join(world_dir_name(config));
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(StoreError::NotGenerated { path: dir });
        }
        Self::open(data_dir, config)
    }

    /// A store that lives only in memory.
    pub fn in_memory(config: &WorldConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            dir: None,
            config: config.clone(),
            terrain: TileTable::in_memory(Layer::Terrain, config.width, config.height),
            clouds: TileTable::in_memory(Layer::Clouds, config.width, config.height),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn table(&self, layer: Layer) -> &TileTable {
        match layer {
            Layer::Terrain => &self.terrain,
            Layer::Clouds => &self.clouds,
        }
    }

    pub fn table_mut(&mut self, layer: Layer) -> &mut TileTable {
        match layer {
            Layer::Terrain => &mut self.terrain,
            Layer::Clouds => &mut self.clouds,
        }
    }

    /// Both layers complete.
    pub fn has_data(&self) -> bool {
        self.terrain.has_data() && self.clouds.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::new(8, 4, 77);
        let store = WorldStore::open(dir.path(), &config).unwrap();
        let world_dir = dir.path().join("world_77_8x4");
        assert_eq!(store.dir(), Some(world_dir.as_path()));
        assert!(world_dir.join("world.json").exists());
        assert!(!store.has_data());
    }

    #[test]
    fn test_open_existing_requires_a_generated_world() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::new(8, 4, 77);
        assert!(matches!(
            WorldStore::open_existing(dir.path(), &config),
            Err(StoreError::NotGenerated { .. })
        ));
        assert!(!dir.path().join(world_dir_name(&config)).exists());

        WorldStore::open(dir.path(), &config).unwrap();
        assert!(WorldStore::open_existing(dir.path(), &config).is_ok());
    }

    #[test]
    fn test_reopen_with_other_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::new(8, 4, 77);
        WorldStore::open(dir.path(), &config).unwrap();

        let changed = WorldConfig {
            water_level: 0.4,
            ..config.clone()
        };
        assert!(matches!(
            WorldStore::open(dir.path(), &changed),
            Err(StoreError::ManifestMismatch { .. })
        ));
        assert!(WorldStore::open(dir.path(), &config).is_ok());
    }

    #[test]
    fn test_newer_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::new(8, 4, 1);
        let world_dir = dir.path().join(world_dir_name(&config));
        fs::create_dir_all(&world_dir).unwrap();
        let manifest = Manifest {
            version: FORMAT_VERSION + 1,
            config: config.clone(),
        };
        fs::write(
            world_dir.join("world.json"),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            WorldStore::open(dir.path(), &config),
            Err(StoreError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::new(0, 4, 1);
        assert!(matches!(
            WorldStore::open(dir.path(), &config),
            Err(StoreError::Config(_))
        ));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
