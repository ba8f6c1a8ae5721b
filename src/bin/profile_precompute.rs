//! Profiling tool for precompute band scaling and viewport rendering

use std::time::Instant;

use iso_planet::config::WorldConfig;
use iso_planet::logging::init_logging;
use iso_planet::precompute::populate_world_with_bands;
use iso_planet::render::{render_viewport, RenderContext};
use iso_planet::store::WorldStore;
use iso_planet::viewport::Viewport;

fn main() {
    init_logging(Some("warn"));

    let config = WorldConfig::new(512, 256, 1337);
    let threads = rayon::current_num_threads();

    println!("=== Precompute Profiling ===");
    println!(
        "Map size: {}x{} ({} cells), {} threads",
        config.width,
        config.height,
        config.cell_count(),
        threads
    );
    println!();

    let mut band_counts = vec![1, 2, 4];
    if !band_counts.contains(&threads) {
        band_counts.push(threads);
    }

    let mut last_store = None;
    for bands in band_counts {
        let mut store = match WorldStore::in_memory(&config) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("failed to create store: {e}");
                return;
            }
        };
        let start = Instant::now();
        if let Err(e) = populate_world_with_bands(&config, &mut store, bands) {
            eprintln!("precompute failed with {bands} bands: {e}");
            return;
        }
        println!("Precompute ({bands:>2} bands): {:?}", start.elapsed());
        last_store = Some(store);
    }

    let Some(store) = last_store else {
        return;
    };

    println!();
    for size in [32, 64, 128] {
        let viewport = Viewport::centered(size, store.width(), store.height());
        let start = Instant::now();
        let img = render_viewport(&store, &viewport, &RenderContext::default(), &[]);
        println!(
            "Viewport render {size:>3}x{size:<3} -> {}x{} px: {:?}",
            img.width(),
            img.height(),
            start.elapsed()
        );
    }
}
