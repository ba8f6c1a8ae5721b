use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use iso_planet::config::WorldConfig;
use iso_planet::export;
use iso_planet::logging::init_logging;
use iso_planet::precompute::populate_world;
use iso_planet::render::{render_viewport, DayClock, RenderContext, RenderParams};
use iso_planet::server::MapServer;
use iso_planet::store::{GridCoord, Layer, PopulateOutcome, WorldStore};
use iso_planet::viewer::{run_viewer, ViewerOptions};
use iso_planet::viewport::Viewport;

#[derive(Parser, Debug)]
#[command(name = "iso_planet")]
#[command(about = "Procedural spherical planets rendered as an isometric tile map")]
struct Cli {
    /// Log filter (e.g. "debug", "iso_planet=trace"); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory holding world stores
    #[arg(long, global = true, default_value = "worlds")]
    data_dir: PathBuf,

    /// World config JSON; flags below override its fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    world: WorldArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct WorldArgs {
    /// Grid width (longitude samples)
    #[arg(short = 'W', long, global = true)]
    width: Option<u32>,

    /// Grid height (latitude samples)
    #[arg(short = 'H', long, global = true)]
    height: Option<u32>,

    /// Master seed
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Normalized elevation below which cells are water, in (0, 1)
    #[arg(long, global = true)]
    water_level: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Render parameters JSON; flags below override its fields
    #[arg(long)]
    render_config: Option<PathBuf>,

    #[arg(long)]
    height_multiplier: Option<f64>,

    #[arg(long)]
    pixel_separation: Option<f64>,

    #[arg(long)]
    cloud_offset: Option<f64>,

    #[arg(long)]
    cloud_transparency: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Precompute terrain and cloud tiles into the world store
    Generate,

    /// Render one isometric viewport to a PNG
    Render {
        /// Viewport centre column (default: map centre)
        #[arg(long)]
        x: Option<u32>,

        /// Viewport centre row (default: map centre)
        #[arg(long)]
        y: Option<u32>,

        /// Viewport side, in cells
        #[arg(long, default_value = "64")]
        size: u32,

        /// Time of day in hours
        #[arg(long, default_value = "12")]
        hour: f64,

        #[arg(short, long, default_value = "viewport.png")]
        output: String,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Export a full-extent map image
    Export {
        #[arg(value_enum)]
        kind: ExportKind,

        /// Down-scale factor (>= 1) for color and height maps
        #[arg(long, default_value = "1")]
        scale: f64,

        /// Output width of the overview, side of the globe
        #[arg(long, default_value = "512")]
        size: u32,

        #[arg(short, long)]
        output: String,
    },

    /// Open the interactive viewer
    View {
        #[arg(long, default_value = "64")]
        size: u32,

        #[arg(long, default_value = "8")]
        wanderers: usize,

        #[arg(long, default_value = "1280")]
        window_width: usize,

        #[arg(long, default_value = "800")]
        window_height: usize,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Serve terrain maps over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    Color,
    Height,
    Overview,
    Globe,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = world_config(cli.config.as_deref(), &cli.world)?;

    match cli.command {
        Command::Generate => {
            let mut store = WorldStore::open(&cli.data_dir, &config)?;
            let report = populate_world(&config, &mut store)?;
            for (layer, outcome) in [(Layer::Terrain, report.terrain), (Layer::Clouds, report.clouds)] {
                match outcome {
                    PopulateOutcome::Skipped => println!("{layer}: already complete"),
                    PopulateOutcome::Written { cells } => println!("{layer}: wrote {cells} cells"),
                }
            }
            println!(
                "World {} ready in {:?} ({} bands)",
                store.dir().map(|d| d.display().to_string()).unwrap_or_default(),
                report.elapsed,
                report.bands
            );
        }
        Command::Render {
            x,
            y,
            size,
            hour,
            output,
            render,
        } => {
            let store = open_existing(&cli.data_dir, &config)?;
            let params = render_params(&render)?;
            let mut viewport = Viewport::centered(size, store.width(), store.height());
            params.validate_for_window(viewport.size, viewport.size)?;
            if x.is_some() || y.is_some() {
                let center = viewport.center();
                viewport.center_on(GridCoord::new(x.unwrap_or(center.x), y.unwrap_or(center.y)));
            }
            let ctx = RenderContext::new(params, DayClock::new(hour, 1.0).lighting());
            let img = render_viewport(&store, &viewport, &ctx, &[]);
            img.save(&output)?;
            println!("Saved {}x{} viewport to {}", img.width(), img.height(), output);
        }
        Command::Export {
            kind,
            scale,
            size,
            output,
        } => {
            if !scale.is_finite() || scale < 1.0 {
                return Err(format!("scale must be >= 1 (got {scale})").into());
            }
            let store = open_existing(&cli.data_dir, &config)?;
            let terrain = store.table(Layer::Terrain);
            let viewport = Viewport::centered(64, store.width(), store.height());
            match kind {
                ExportKind::Color => export::export_color_map(terrain, scale, &output)?,
                ExportKind::Height => export::export_height_map(terrain, scale, &output)?,
                ExportKind::Overview => export::export_overview(terrain, size, &viewport, &output)?,
                ExportKind::Globe => export::export_globe(terrain, viewport.center(), size, &output)?,
            }
            println!("Exported {kind:?} map to {output}");
        }
        Command::View {
            size,
            wanderers,
            window_width,
            window_height,
            render,
        } => {
            let store = open_existing(&cli.data_dir, &config)?;
            let params = render_params(&render)?;
            let viewport = Viewport::centered(size, store.width(), store.height());
            params.validate_for_window(viewport.size, viewport.size)?;
            let options = ViewerOptions {
                window_width,
                window_height,
                viewport_size: size,
                wanderers,
                params,
                seed: config.seed,
            };
            run_viewer(&store, options)?;
        }
        Command::Serve { addr } => {
            let store = open_existing(&cli.data_dir, &config)?;
            let server = MapServer::bind(&addr, Arc::new(store))?;
            println!("Serving on http://{}", server.local_addr());
            server.run();
        }
    }
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn world_config(path: Option<&Path>, args: &WorldArgs) -> Result<WorldConfig, Box<dyn Error>> {
    let mut config = match path {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(water_level) = args.water_level {
        config.water_level = water_level;
    }
    config.validate()?;
    Ok(config)
}

fn render_params(args: &RenderArgs) -> Result<RenderParams, Box<dyn Error>> {
    let mut params = match &args.render_config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => RenderParams::default(),
    };
    if let Some(v) = args.height_multiplier {
        params.height_multiplier = v;
    }
    if let Some(v) = args.pixel_separation {
        params.pixel_separation = v;
    }
    if let Some(v) = args.cloud_offset {
        params.cloud_offset = v;
    }
    if let Some(v) = args.cloud_transparency {
        params.cloud_transparency = v;
    }
    params.validate()?;
    Ok(params)
}

/// Open a generated world for reading; incomplete stores render with gaps.
fn open_existing(data_dir: &Path, config: &WorldConfig) -> Result<WorldStore, Box<dyn Error>> {
    let store = WorldStore::open_existing(data_dir, config)?;
    if store.terrain.row_count() == 0 && store.clouds.row_count() == 0 {
        return Err(format!(
            "world {} has no tiles; run `generate` first",
            store.dir().map(|d| d.display().to_string()).unwrap_or_default()
        )
        .into());
    }
    if !store.has_data() {
        warn!(
            terrain_rows = store.terrain.row_count(),
            cloud_rows = store.clouds.row_count(),
            "world store is incomplete; run `generate` first"
        );
    } else {
        info!(cells = config.cell_count(), "world store loaded");
    }
    Ok(store)
}
