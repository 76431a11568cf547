//! Island generation: noise-shaped land mask, beacon, connectivity crawl,
//! cosmetic styling, and render-tile derivation.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::TerrariumConfig;
use crate::grid::GridPos;
use crate::noise::NoiseField;
use crate::tile::{Tile, TileCode, TileCorner};
use crate::world::{Slab, SlabStyle, World};

/// Divisor applied to the noise sample before the farness comparison.
/// Biases land toward the center without hard-clipping the coastline.
const LAND_BIAS: f32 = 1.1;
/// Attempts at placing one flower patch seed before giving up silently.
const FLOWER_SEED_TRIES: u32 = 1000;

/// Generate a fresh island world. Deterministic for a given config and
/// RNG state: the same seed always yields the same map.
pub fn generate(config: &TerrariumConfig, rng: &mut SmallRng) -> World {
    let radius = config.world_size / 2;
    let noise = NoiseField::new(rng.random::<i32>());
    let mut world = World::empty();

    // Land mask: noise perturbs a center-biased falloff.
    for y in -radius..radius {
        for x in -radius..radius {
            let farness =
                (1.0 - (x.abs() + y.abs()) as f32 / (2 * radius) as f32).clamp(0.0, 1.0);
            if noise.sample(x as f32, y as f32) / LAND_BIAS < farness {
                world.insert_slab(Slab::ground(GridPos::new(x, y)));
            }
        }
    }

    // Beacon: the origin and its 4 neighbors always exist, so the crawl
    // below always finds an origin component.
    let beacon = beacon_grids();
    for grid in beacon {
        world.insert_slab(Slab::ground(grid));
    }

    prune_to_main_island(&mut world);
    mark_borders(&mut world);
    for grid in beacon {
        if let Some(slab) = world.slab_mut(grid) {
            slab.style = SlabStyle::Plain;
        }
    }
    grow_flower_patches(&mut world, config.flower_patches, rng);

    let tiles = derive_tiles(&world);
    world.set_tiles(tiles);
    world.seed_spawn_pool(rng);

    let bounds = world.bounds();
    debug!(
        slabs = world.slab_count(),
        tiles = world.tiles().len(),
        spawnable = world.spawn_pool().len(),
        min = %bounds.min,
        max = %bounds.max,
        "world generated"
    );
    world
}

/// The origin and its 4 cardinal neighbors.
fn beacon_grids() -> [GridPos; 5] {
    let n = GridPos::ORIGIN.neighbors4();
    [GridPos::ORIGIN, n[0], n[1], n[2], n[3]]
}

/// 4-neighbor flood fill from `start` over existing slabs.
fn flood_island(world: &World, start: GridPos, seen: &mut HashSet<GridPos>) -> Vec<GridPos> {
    let mut island = Vec::new();
    let mut queue = VecDeque::from([start]);
    seen.insert(start);
    while let Some(grid) = queue.pop_front() {
        island.push(grid);
        for neighbor in grid.neighbors4() {
            if world.slab(neighbor).is_some() && seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    island
}

/// Partition the slabs into islands and delete every island except the
/// main one. The main island is the largest; if the largest somehow does
/// not contain the origin the origin's island is kept instead, since the
/// rest of the simulation assumes everything is reachable from `0:0`.
fn prune_to_main_island(world: &mut World) {
    let mut grids: Vec<GridPos> = world.slabs().map(|slab| slab.pos).collect();
    grids.sort_unstable_by_key(|grid| (grid.y, grid.x));

    let mut seen = HashSet::new();
    let mut islands: Vec<Vec<GridPos>> = Vec::new();
    for grid in grids {
        if !seen.contains(&grid) {
            islands.push(flood_island(world, grid, &mut seen));
        }
    }

    let largest = islands
        .iter()
        .enumerate()
        .max_by_key(|(i, island)| (island.len(), usize::MAX - i))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let main = if islands[largest].contains(&GridPos::ORIGIN) {
        largest
    } else {
        let with_origin = islands
            .iter()
            .position(|island| island.contains(&GridPos::ORIGIN))
            .unwrap_or(largest);
        warn!(
            largest_len = islands[largest].len(),
            origin_len = islands[with_origin].len(),
            "largest island misses the origin; keeping the origin island"
        );
        with_origin
    };

    for (i, island) in islands.iter().enumerate() {
        if i != main {
            for &grid in island {
                world.remove_slab(grid);
            }
        }
    }
    world.set_main_island_len(islands[main].len());
}

/// Flag slabs adjacent to void. Runs after pruning so freshly exposed
/// edges are included.
fn mark_borders(world: &mut World) {
    let border: Vec<GridPos> = world
        .slabs()
        .filter(|slab| {
            slab.pos
                .neighbors4()
                .iter()
                .any(|n| world.slab(*n).is_none())
        })
        .map(|slab| slab.pos)
        .collect();
    for grid in border {
        if let Some(slab) = world.slab_mut(grid) {
            slab.border = true;
            slab.style = SlabStyle::Plain;
        }
    }
}

/// True when every 8-neighbor of `grid` is a slab with one of the given
/// styles. Flower logic only: cosmetic, never consulted for walkability.
fn neighborhood_is(world: &World, grid: GridPos, styles: &[SlabStyle]) -> bool {
    grid.neighbors8()
        .iter()
        .all(|n| world.slab(*n).is_some_and(|slab| styles.contains(&slab.style)))
}

/// Sprinkle up to `patches` flower patches on the island interior. A
/// patch seed must be grass surrounded by grass; failing to find one
/// within the try cap skips the patch silently.
fn grow_flower_patches(world: &mut World, patches: u32, rng: &mut SmallRng) {
    let mut grids: Vec<GridPos> = world.slabs().map(|slab| slab.pos).collect();
    grids.sort_unstable();
    if grids.is_empty() {
        return;
    }

    for _ in 0..patches {
        let mut seed = None;
        for _ in 0..FLOWER_SEED_TRIES {
            let grid = grids[rng.random_range(0..grids.len())];
            let is_grass = world
                .slab(grid)
                .is_some_and(|slab| slab.style == SlabStyle::Grass);
            if is_grass && neighborhood_is(world, grid, &[SlabStyle::Grass]) {
                seed = Some(grid);
                break;
            }
        }
        let Some(seed) = seed else { continue };

        if let Some(slab) = world.slab_mut(seed) {
            slab.style = SlabStyle::Flowers;
        }
        let mut spread = seed.neighbors4();
        spread.shuffle(rng);
        let count = rng.random_range(1..=4);
        for &grid in spread.iter().take(count) {
            let grass_ring =
                neighborhood_is(world, grid, &[SlabStyle::Grass, SlabStyle::Flowers]);
            if grass_ring && let Some(slab) = world.slab_mut(grid) {
                if slab.style == SlabStyle::Grass {
                    slab.style = SlabStyle::Flowers;
                }
            }
        }
    }
}

fn style_corner(world: &World, grid: GridPos) -> TileCorner {
    match world.slab(grid).map(|slab| slab.style) {
        Some(SlabStyle::Grass) => TileCorner::G,
        Some(SlabStyle::Plain) => TileCorner::S,
        Some(SlabStyle::Flowers) => TileCorner::F,
        None => TileCorner::E,
    }
}

/// One render tile per grid corner touching at least one slab, coded from
/// the styles of the 4 slabs meeting there (NW-NE-SE-SW, void ⇒ `E`).
pub(crate) fn derive_tiles(world: &World) -> Vec<Tile> {
    let mut corners: HashMap<GridPos, f32> = HashMap::new();
    for slab in world.slabs() {
        let GridPos { x, y } = slab.pos;
        for corner in [
            GridPos::new(x, y),
            GridPos::new(x + 1, y),
            GridPos::new(x, y + 1),
            GridPos::new(x + 1, y + 1),
        ] {
            corners.entry(corner).or_insert_with(|| slab.surface());
        }
    }

    let mut tiles: Vec<Tile> = corners
        .into_iter()
        .map(|(corner, z)| {
            let code = TileCode([
                style_corner(world, corner.offset(-1, -1)),
                style_corner(world, corner.offset(0, -1)),
                style_corner(world, corner),
                style_corner(world, corner.offset(-1, 0)),
            ]);
            Tile { corner, z, code }
        })
        .collect();
    tiles.sort_unstable_by_key(|tile| tile.corner);
    tiles
}
