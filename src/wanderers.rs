//! Wanderers: placeholder NPCs that random-walk over land.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::render::Marker;
use crate::store::{GridCoord, TileTable};

const MARKER_COLORS: [[u8; 3]; 6] = [
    [220, 40, 40],
    [240, 200, 30],
    [150, 60, 200],
    [255, 120, 0],
    [0, 180, 200],
    [230, 80, 160],
];

/// Spawn attempts per requested wanderer before giving up.
const SPAWN_ATTEMPTS_PER_WANDERER: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    pub fn delta(self) -> (i64, i64) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }

    fn turned(self, turn: Turn) -> Heading {
        let idx = Heading::ALL.iter().position(|&h| h == self).unwrap_or(0);
        let shift = match turn {
            Turn::Forward => 0,
            Turn::Right => 1,
            Turn::Left => 3,
        };
        Heading::ALL[(idx + shift) % 4]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Turn {
    Forward,
    Left,
    Right,
}

/// True when the terrain table has a cell at `coord` at or above the water level.
pub fn is_land(terrain: &TileTable, coord: GridCoord, water_level: f64) -> bool {
    terrain
        .get(coord)
        .map(|cell| cell.normalized() >= water_level)
        .unwrap_or(false)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wanderer {
    pub id: u32,
    pub position: GridCoord,
    pub heading: Heading,
    pub color: [u8; 3],
    last_turn: Option<Turn>,
}

impl Wanderer {
    pub fn new(id: u32, position: GridCoord, heading: Heading) -> Self {
        Self {
            id,
            position,
            heading,
            color: MARKER_COLORS[id as usize % MARKER_COLORS.len()],
            last_turn: None,
        }
    }

    /// Take one step onto an adjacent land cell. Options are forward, left and
    /// right in random order; the wanderer never reverses and does not repeat
    /// the turn it made last step. Returns false when boxed in.
    pub fn step<R: Rng>(&mut self, terrain: &TileTable, water_level: f64, rng: &mut R) -> bool {
        let mut turns = [Turn::Forward, Turn::Left, Turn::Right];
        turns.shuffle(rng);

        let (w, h) = (terrain.width() as i64, terrain.height() as i64);
        for turn in turns {
            if turn != Turn::Forward && Some(turn) == self.last_turn {
                continue;
            }
            let heading = self.heading.turned(turn);
            let (dx, dy) = heading.delta();
            let target = GridCoord::new(
                (self.position.x as i64 + dx).rem_euclid(w) as u32,
                (self.position.y as i64 + dy).rem_euclid(h) as u32,
            );
            if is_land(terrain, target, water_level) {
                self.position = target;
                self.heading = heading;
                self.last_turn = Some(turn);
                return true;
            }
        }
        false
    }

    pub fn marker(&self) -> Marker {
        Marker {
            coord: self.position,
            color: self.color,
        }
    }
}

/// Place up to `count` wanderers on random land cells. Fewer are returned
/// when land is too scarce to find in a bounded number of attempts.
pub fn spawn_wanderers<R: Rng>(count: usize, terrain: &TileTable, water_level: f64, rng: &mut R) -> Vec<Wanderer> {
    let mut wanderers = Vec::with_capacity(count);
    if terrain.width() == 0 || terrain.height() == 0 {
        return wanderers;
    }
    let mut attempts = 0;
    while wanderers.len() < count && attempts < count * SPAWN_ATTEMPTS_PER_WANDERER {
        attempts += 1;
        let coord = GridCoord::new(rng.gen_range(0..terrain.width()), rng.gen_range(0..terrain.height()));
        if is_land(terrain, coord, water_level) {
            let heading = Heading::ALL[rng.gen_range(0..4)];
            wanderers.push(Wanderer::new(wanderers.len() as u32, coord, heading));
        }
    }
    wanderers
}

/// Advance every wanderer by one step.
pub fn step_all<R: Rng>(wanderers: &mut [Wanderer], terrain: &TileTable, water_level: f64, rng: &mut R) {
    for wanderer in wanderers.iter_mut() {
        wanderer.step(terrain, water_level, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Layer, TileCell};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const LAND: u16 = 50000;
    const SEA: u16 = 10000;

    /// Terrain where `land(x, y)` decides each cell.
    fn terrain(width: u32, height: u32, land: impl Fn(u32, u32) -> bool) -> TileTable {
        let mut table = TileTable::in_memory(Layer::Terrain, width, height);
        let mut cells = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let e = if land(x, y) { LAND } else { SEA };
                cells.push((GridCoord::new(x, y), TileCell::new([0, 0, 0], e)));
            }
        }
        table.populate(cells).unwrap();
        table
    }

    #[test]
    fn test_turns() {
        assert_eq!(Heading::North.turned(Turn::Right), Heading::East);
        assert_eq!(Heading::North.turned(Turn::Left), Heading::West);
        assert_eq!(Heading::West.turned(Turn::Right), Heading::North);
        assert_eq!(Heading::South.turned(Turn::Forward), Heading::South);
    }

    #[test]
    fn test_wanderers_stay_on_land() {
        // A land strip two rows tall wrapping around the world.
        let table = terrain(20, 10, |_, y| y == 4 || y == 5);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut wanderers = spawn_wanderers(5, &table, 0.5, &mut rng);
        assert_eq!(wanderers.len(), 5);
        for _ in 0..200 {
            step_all(&mut wanderers, &table, 0.5, &mut rng);
            for w in &wanderers {
                assert!(is_land(&table, w.position, 0.5));
            }
        }
    }

    #[test]
    fn test_steps_wrap_around_edges() {
        let table = terrain(5, 1, |_, _| true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut w = Wanderer::new(0, GridCoord::new(4, 0), Heading::East);
        // Only east/west are distinct cells; north/south wrap onto the same row.
        assert!(w.step(&table, 0.5, &mut rng));
        assert_eq!(w.position.y, 0);
    }

    #[test]
    fn test_boxed_in_wanderer_stays_put() {
        let table = terrain(5, 5, |x, y| x == 2 && y == 2);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut w = Wanderer::new(0, GridCoord::new(2, 2), Heading::North);
        assert!(!w.step(&table, 0.5, &mut rng));
        assert_eq!(w.position, GridCoord::new(2, 2));
    }

    #[test]
    fn test_never_reverses() {
        // Dead-end corridor: the only exit is backwards, so the wanderer stops.
        let table = terrain(5, 5, |x, y| y == 2 && x <= 2);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut w = Wanderer::new(0, GridCoord::new(2, 2), Heading::East);
        assert!(!w.step(&table, 0.5, &mut rng));
    }

    #[test]
    fn test_spawn_gives_up_without_land() {
        let table = terrain(8, 8, |_, _| false);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(spawn_wanderers(3, &table, 0.5, &mut rng).is_empty());
    }
}
