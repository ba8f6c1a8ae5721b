//! Seed management for world generation
//!
//! Every noise field gets its own seed, derived from the world's master seed.
//! Derivation must be stable across platforms and compiler versions because the
//! tile store persists its output: regenerating a world from the same master seed
//! has to reproduce bit-identical cells.

/// Seeds for all noise fields of a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Macro terrain field sampled on the sphere
    pub terrain: u64,
    /// Cloud layer field sampled on the sphere
    pub clouds: u64,
    /// Snow-line roughness, sampled on flat grid coordinates
    pub snow: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            terrain: derive_seed(master, "terrain"),
            clouds: derive_seed(master, "clouds"),
            snow: derive_seed(master, "snow"),
        }
    }
}

/// Fold a 64-bit seed into the 32-bit seed space of `noise::Perlin`.
pub fn perlin_seed(seed: u64) -> u32 {
    ((seed >> 32) ^ seed) as u32
}

/// Derive a sub-seed from a master seed and a system name.
///
/// FNV-1a over the name, then a SplitMix64 finalizer over the combination.
/// Both are fixed algorithms, unlike `DefaultHasher`.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut name_hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in system.bytes() {
        name_hash ^= byte as u64;
        name_hash = name_hash.wrapping_mul(0x0100_0000_01b3);
    }
    splitmix64(master ^ name_hash)
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
