//! Procedural spherical planets rendered as an isometric tile map.
//!
//! Worlds are precomputed once into a [`store::WorldStore`] and then drawn by
//! the renderer, the viewer, the exporters and the map server.

pub mod biomes;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod precompute;
pub mod render;
pub mod seeds;
pub mod server;
pub mod sphere_noise;
pub mod store;
pub mod tilemap;
pub mod viewer;
pub mod viewport;
pub mod wanderers;
