//! Precompute: fill the terrain and cloud tables in parallel.
//!
//! Parallelization: the x axis is cut into contiguous column bands, one rayon
//! task per band. Each band evaluates noise and classification independently;
//! results are concatenated and handed to the store in a single bulk write.
//! Band boundaries never change the output.

use std::ops::Range;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::biomes::{classify_cloud, classify_with_snow};
use crate::config::WorldConfig;
use crate::error::StoreError;
use crate::seeds::WorldSeeds;
use crate::sphere_noise::{abs_latitude, SnowNoise, SphereSampler};
use crate::store::{GridCoord, Layer, PopulateOutcome, TileCell, WorldStore};

/// Produces the cell for any grid coordinate of one layer.
pub trait CellGenerator: Sync {
    fn layer(&self) -> Layer;

    fn generate_cell(&self, x: u32, y: u32) -> TileCell;

    /// Evaluate a whole rectangle, column-major within the rectangle.
    fn generate_rect(&self, xs: Range<u32>, ys: Range<u32>) -> Vec<(GridCoord, TileCell)> {
        let mut cells = Vec::with_capacity(xs.len() * ys.len());
        for x in xs {
            for y in ys.clone() {
                cells.push((GridCoord::new(x, y), self.generate_cell(x, y)));
            }
        }
        cells
    }
}

/// Terrain: sphere noise -> biome classifier with snow roughness.
pub struct TerrainGenerator {
    sampler: SphereSampler,
    snow: SnowNoise,
    width: u32,
    height: u32,
    water_level: f64,
}

impl TerrainGenerator {
    pub fn new(config: &WorldConfig, seeds: &WorldSeeds) -> Self {
        Self {
            sampler: SphereSampler::new(seeds.terrain, config.terrain_noise),
            snow: SnowNoise::new(seeds.snow),
            width: config.width,
            height: config.height,
            water_level: config.water_level,
        }
    }
}

impl CellGenerator for TerrainGenerator {
    fn layer(&self) -> Layer {
        Layer::Terrain
    }

    fn generate_cell(&self, x: u32, y: u32) -> TileCell {
        let v = self.sampler.sample_normalized(x, y, self.width, self.height);
        let lat = abs_latitude(y, self.height);
        let c = classify_with_snow(v, lat, self.water_level, self.snow.factor(x, y));
        TileCell::new(c.color, c.elevation)
    }
}

/// Clouds: sphere noise -> white/grey density.
pub struct CloudGenerator {
    sampler: SphereSampler,
    width: u32,
    height: u32,
}

impl CloudGenerator {
    pub fn new(config: &WorldConfig, seeds: &WorldSeeds) -> Self {
        Self {
            sampler: SphereSampler::new(seeds.clouds, config.cloud_noise),
            width: config.width,
            height: config.height,
        }
    }
}

impl CellGenerator for CloudGenerator {
    fn layer(&self) -> Layer {
        Layer::Clouds
    }

    fn generate_cell(&self, x: u32, y: u32) -> TileCell {
        let v = self.sampler.sample_normalized(x, y, self.width, self.height);
        let (color, elevation) = classify_cloud(v);
        TileCell::new(color, elevation)
    }
}

/// Split `0..width` into `bands` contiguous ranges of near-equal size.
/// Never returns empty ranges; asks for at least one band.
pub fn partition_columns(width: u32, bands: usize) -> Vec<Range<u32>> {
    let bands = (bands.max(1) as u32).min(width.max(1));
    let base = width / bands;
    let extra = width % bands;
    let mut ranges = Vec::with_capacity(bands as usize);
    let mut start = 0;
    for band in 0..bands {
        let len = base + u32::from(band < extra);
        if len > 0 {
            ranges.push(start..start + len);
        }
        start += len;
    }
    ranges
}

/// Evaluate every cell of a layer across `bands` parallel column bands.
pub fn compute_layer<G: CellGenerator>(
    generator: &G,
    width: u32,
    height: u32,
    bands: usize,
) -> Vec<(GridCoord, TileCell)> {
    let ranges = partition_columns(width, bands);
    debug!(layer = %generator.layer(), bands = ranges.len(), "computing layer");
    let parts: Vec<Vec<(GridCoord, TileCell)>> = ranges
        .into_par_iter()
        .map(|xs| generator.generate_rect(xs, 0..height))
        .collect();
    parts.concat()
}

/// Summary of one precompute run.
#[derive(Clone, Debug)]
pub struct PrecomputeReport {
    pub bands: usize,
    pub terrain: PopulateOutcome,
    pub clouds: PopulateOutcome,
    pub elapsed: Duration,
}

/// Fill both tables of `store` using one band per rayon worker.
pub fn populate_world(config: &WorldConfig, store: &mut WorldStore) -> Result<PrecomputeReport, StoreError> {
    populate_world_with_bands(config, store, rayon::current_num_threads())
}

pub fn populate_world_with_bands(
    config: &WorldConfig,
    store: &mut WorldStore,
    bands: usize,
) -> Result<PrecomputeReport, StoreError> {
    config.validate()?;
    if store.config() != config {
        let path = store.dir().unwrap_or_else(|| Path::new("<memory>")).to_path_buf();
        return Err(StoreError::ManifestMismatch { path });
    }

    let start = Instant::now();
    let seeds = WorldSeeds::from_master(config.seed);
    info!(
        width = config.width,
        height = config.height,
        seed = config.seed,
        bands,
        "starting precompute"
    );

    let terrain = populate_layer(store, &TerrainGenerator::new(config, &seeds), config, bands)?;
    let clouds = populate_layer(store, &CloudGenerator::new(config, &seeds), config, bands)?;

    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "precompute finished");
    Ok(PrecomputeReport {
        bands,
        terrain,
        clouds,
        elapsed,
    })
}

fn populate_layer<G: CellGenerator>(
    store: &mut WorldStore,
    generator: &G,
    config: &WorldConfig,
    bands: usize,
) -> Result<PopulateOutcome, StoreError> {
    let layer = generator.layer();
    let table = store.table_mut(layer);
    if table.has_data() {
        info!(layer = %layer, rows = table.row_count(), "layer already complete");
        return Ok(PopulateOutcome::Skipped);
    }

    let start = Instant::now();
    let cells = compute_layer(generator, config.width, config.height, bands);
    info!(
        layer = %layer,
        cells = cells.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "layer computed"
    );
    table.populate(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere_noise::NoiseParams;

    fn small_config(width: u32, height: u32) -> WorldConfig {
        WorldConfig {
            terrain_noise: NoiseParams {
                octaves: 3,
                ..NoiseParams::terrain()
            },
            cloud_noise: NoiseParams {
                octaves: 2,
                ..NoiseParams::clouds()
            },
            ..WorldConfig::new(width, height, 2024)
        }
    }

    #[test]
    fn test_partition_covers_width() {
        for (width, bands) in [(1000, 4), (10, 3), (7, 7), (3, 8), (1, 1), (1000, 1)] {
            let ranges = partition_columns(width, bands);
            assert!(ranges.len() <= bands.max(1));
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges.last().map(|r| r.end), Some(width));
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            assert!(ranges.iter().all(|r| !r.is_empty()));
        }
        assert_eq!(partition_columns(10, 0), vec![0..10]);
    }

    #[test]
    fn test_band_count_does_not_change_output() {
        let config = small_config(1000, 3);
        let seeds = WorldSeeds::from_master(config.seed);
        let generator = TerrainGenerator::new(&config, &seeds);

        let mut one = compute_layer(&generator, config.width, config.height, 1);
        let mut four = compute_layer(&generator, config.width, config.height, 4);
        one.sort_by_key(|(coord, _)| *coord);
        four.sort_by_key(|(coord, _)| *coord);
        assert_eq!(one.len(), 3000);
        assert_eq!(one, four);
    }

    #[test]
    fn test_populate_world_fills_both_layers() {
        let config = small_config(16, 8);
        let mut store = WorldStore::in_memory(&config).unwrap();
        let report = populate_world_with_bands(&config, &mut store, 3).unwrap();
        assert_eq!(report.terrain, PopulateOutcome::Written { cells: 128 });
        assert_eq!(report.clouds, PopulateOutcome::Written { cells: 128 });
        assert!(store.has_data());

        let again = populate_world(&config, &mut store).unwrap();
        assert_eq!(again.terrain, PopulateOutcome::Skipped);
        assert_eq!(again.clouds, PopulateOutcome::Skipped);
    }

    #[test]
    fn test_same_seed_same_world() {
        let config = small_config(12, 6);
        let mut a = WorldStore::in_memory(&config).unwrap();
        let mut b = WorldStore::in_memory(&config).unwrap();
        populate_world_with_bands(&config, &mut a, 1).unwrap();
        populate_world_with_bands(&config, &mut b, 5).unwrap();
        let left: Vec<_> = a.terrain.iter().map(|(c, t)| (c, *t)).collect();
        let right: Vec<_> = b.terrain.iter().map(|(c, t)| (c, *t)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_mismatched_config_rejected() {
        let config = small_config(12, 6);
        let mut store = WorldStore::in_memory(&config).unwrap();
        let other = WorldConfig {
            seed: 1,
            ..config.clone()
        };
        assert!(matches!(
            populate_world(&other, &mut store),
            Err(StoreError::ManifestMismatch { .. })
        ));
    }
}
