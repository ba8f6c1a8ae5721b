//! Error types for world configuration and tile persistence.

use std::path::PathBuf;

/// Invalid world-generation parameters. Raised before any precompute runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("world dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("water level must lie strictly between 0 and 1 (got {0})")]
    InvalidWaterLevel(f64),

    #[error("invalid {layer} noise parameters: {reason}")]
    InvalidNoise { layer: &'static str, reason: String },

    #[error("invalid render parameters: {0}")]
    InvalidRender(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while loading or writing a tile table.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed color string {0:?} (expected \"r,g,b\")")]
    MalformedColor(String),

    #[error("record ({x}, {y}) lies outside the {width}x{height} world")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    #[error("world manifest at {path} does not match the requested configuration")]
    ManifestMismatch { path: PathBuf },

    #[error("no world at {path}; run `generate` with the same parameters first")]
    NotGenerated { path: PathBuf },

    #[error("unsupported store format version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json { path: path.into(), source }
    }
}
