//! The island world: slab grid, sparse column occupancy, and the walkable
//! table every actor queries before it moves.

use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::ActorId;
use crate::grid::GridPos;
use crate::tile::{PixelBounds, Tile, TileSheet};

/// Base height of a ground slab.
pub const SLAB_BASE_Z: f32 = -0.5;
/// Vertical thickness of a ground slab; surface sits at `z + height`.
pub const SLAB_HEIGHT: f32 = 0.5;
/// Vertical extent reserved by an actor standing on a surface.
pub const ACTOR_HEIGHT: f32 = 0.5;

/// Visual style of a terrain slab. Cosmetic only: never consulted for
/// walkability or connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlabStyle {
    Grass,
    Plain,
    Flowers,
}

/// One terrain tile cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slab {
    pub pos: GridPos,
    pub z: f32,
    pub height: f32,
    pub style: SlabStyle,
    pub border: bool,
}

impl Slab {
    /// A standard ground slab, as produced by world generation.
    #[must_use]
    pub fn ground(pos: GridPos) -> Self {
        Self {
            pos,
            z: SLAB_BASE_Z,
            height: SLAB_HEIGHT,
            style: SlabStyle::Grass,
            border: false,
        }
    }

    /// Height actors stand on.
    #[must_use]
    pub fn surface(&self) -> f32 {
        self.z + self.height
    }

    /// Paint-order depth for the renderer.
    #[must_use]
    pub fn z_depth(&self) -> f32 {
        (self.pos.x + self.pos.y) as f32
    }
}

/// What occupies an exact `(x, y, z)` cell of the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupantKind {
    /// The terrain slab itself.
    Slab,
    /// An actor standing (or mid-hop, still logically standing) here.
    Actor(ActorId),
    /// A hop destination reserved by an actor that has not arrived yet.
    Reservation(ActorId),
}

/// An entry in the sparse column occupancy index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    pub kind: OccupantKind,
    pub height: f32,
    /// When true and this occupant is topmost, the column is blocked.
    pub blocks_walk: bool,
}

impl Occupant {
    #[must_use]
    pub const fn slab(height: f32) -> Self {
        Self {
            kind: OccupantKind::Slab,
            height,
            blocks_walk: false,
        }
    }

    #[must_use]
    pub const fn actor(id: ActorId) -> Self {
        Self {
            kind: OccupantKind::Actor(id),
            height: ACTOR_HEIGHT,
            blocks_walk: true,
        }
    }

    #[must_use]
    pub const fn reservation(id: ActorId) -> Self {
        Self {
            kind: OccupantKind::Reservation(id),
            height: 0.0,
            blocks_walk: true,
        }
    }
}

/// Occupancy bookkeeping failures. Non-fatal: callers treat them as "do
/// not proceed with this move".
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    #[error("cell {grid} at z {z} is already occupied")]
    CellOccupied { grid: GridPos, z: f32 },
    #[error("no occupant at {grid} z {z}")]
    MissingOccupant { grid: GridPos, z: f32 },
}

/// One-shot pool of spawnable grid keys, owned by the world instance so a
/// server switch (new world) can never leak grids from the old one.
#[derive(Debug, Default)]
pub struct SpawnPool {
    remaining: Vec<GridPos>,
}

impl SpawnPool {
    fn new(mut grids: Vec<GridPos>, rng: &mut SmallRng) -> Self {
        grids.sort_unstable();
        grids.shuffle(rng);
        Self { remaining: grids }
    }

    fn pop(&mut self) -> Option<GridPos> {
        self.remaining.pop()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Inclusive grid-space bounding box of the generated island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapBounds {
    pub min: GridPos,
    pub max: GridPos,
}

impl MapBounds {
    fn empty() -> Self {
        Self {
            min: GridPos::new(i32::MAX, i32::MAX),
            max: GridPos::new(i32::MIN, i32::MIN),
        }
    }

    fn include(&mut self, grid: GridPos) {
        self.min.x = self.min.x.min(grid.x);
        self.min.y = self.min.y.min(grid.y);
        self.max.x = self.max.x.max(grid.x);
        self.max.y = self.max.y.max(grid.y);
    }
}

type Column = BTreeMap<OrderedFloat<f32>, Occupant>;

/// The generated island plus all derived lookup tables.
///
/// Invariants:
/// - every slab grid appears at most once and (post-generation) is
///   4-connected to the origin;
/// - each column holds at most one occupant per exact z;
/// - `walkable` has an entry for a grid iff a slab exists there and the
///   topmost occupant does not block. The table is the single source of
///   truth: `can_walk` and `height_at` both read it.
#[derive(Debug)]
pub struct World {
    slabs: HashMap<GridPos, Slab>,
    columns: HashMap<GridPos, Column>,
    walkable: HashMap<GridPos, f32>,
    tiles: Vec<Tile>,
    tile_sheet: TileSheet,
    spawn_pool: SpawnPool,
    bounds: MapBounds,
    main_island_len: usize,
}

impl World {
    pub(crate) fn empty() -> Self {
        Self {
            slabs: HashMap::new(),
            columns: HashMap::new(),
            walkable: HashMap::new(),
            tiles: Vec::new(),
            tile_sheet: TileSheet::default(),
            spawn_pool: SpawnPool::default(),
            bounds: MapBounds::empty(),
            main_island_len: 0,
        }
    }

    /// Build a hand-laid world from bare ground slabs (tools and tests).
    /// Derives occupancy and walkability; tiles and the spawn pool follow
    /// the same rules as generation.
    #[must_use]
    pub fn from_grids(grids: impl IntoIterator<Item = GridPos>, rng: &mut SmallRng) -> Self {
        let mut world = Self::empty();
        for grid in grids {
            world.insert_slab(Slab::ground(grid));
        }
        let tiles = crate::worldgen::derive_tiles(&world);
        world.set_tiles(tiles);
        world.seed_spawn_pool(rng);
        world
    }

    // ---- slabs -----------------------------------------------------------

    #[must_use]
    pub fn slab(&self, grid: GridPos) -> Option<&Slab> {
        self.slabs.get(&grid)
    }

    pub(crate) fn slab_mut(&mut self, grid: GridPos) -> Option<&mut Slab> {
        self.slabs.get_mut(&grid)
    }

    #[must_use]
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    pub fn slabs(&self) -> impl Iterator<Item = &Slab> {
        self.slabs.values()
    }

    /// Register a slab and its column occupant. Generation-time only;
    /// re-inserting over an existing slab is ignored.
    pub(crate) fn insert_slab(&mut self, slab: Slab) {
        if self.slabs.contains_key(&slab.pos) {
            return;
        }
        let grid = slab.pos;
        let z = slab.z;
        let height = slab.height;
        self.bounds.include(grid);
        self.slabs.insert(grid, slab);
        self.columns
            .entry(grid)
            .or_default()
            .insert(OrderedFloat(z), Occupant::slab(height));
        self.update_walkable(grid);
    }

    /// Delete a slab during island pruning.
    pub(crate) fn remove_slab(&mut self, grid: GridPos) {
        if let Some(slab) = self.slabs.remove(&grid) {
            if let Some(column) = self.columns.get_mut(&grid) {
                column.remove(&OrderedFloat(slab.z));
                if column.is_empty() {
                    self.columns.remove(&grid);
                }
            }
            self.update_walkable(grid);
        }
    }

    // ---- occupancy -------------------------------------------------------

    /// Insert an occupant at an exact cell. A conflict on the exact
    /// `(x, y, z)` is logged and rejected, never silently overwritten.
    pub fn add_occupant(&mut self, grid: GridPos, z: f32, occupant: Occupant) -> Result<(), WorldError> {
        let column = self.columns.entry(grid).or_default();
        if column.contains_key(&OrderedFloat(z)) {
            warn!(%grid, z, "occupancy conflict: cell already taken");
            return Err(WorldError::CellOccupied { grid, z });
        }
        column.insert(OrderedFloat(z), occupant);
        self.update_walkable(grid);
        Ok(())
    }

    /// Remove the occupant at an exact cell.
    pub fn remove_occupant(&mut self, grid: GridPos, z: f32) -> Result<Occupant, WorldError> {
        let column = self
            .columns
            .get_mut(&grid)
            .ok_or(WorldError::MissingOccupant { grid, z })?;
        let removed = column
            .remove(&OrderedFloat(z))
            .ok_or(WorldError::MissingOccupant { grid, z })?;
        if column.is_empty() {
            self.columns.remove(&grid);
        }
        self.update_walkable(grid);
        Ok(removed)
    }

    /// Relocate an actor occupant between columns, consuming its
    /// reservation at the destination. Walkability is re-derived for both
    /// columns.
    pub fn move_actor(
        &mut self,
        id: ActorId,
        from: GridPos,
        from_z: f32,
        to: GridPos,
        to_z: f32,
    ) -> Result<(), WorldError> {
        let occupant = self.remove_occupant(from, from_z)?;
        debug_assert_eq!(occupant.kind, OccupantKind::Actor(id));
        match self.remove_occupant(to, to_z) {
            Ok(reserved) => debug_assert_eq!(reserved.kind, OccupantKind::Reservation(id)),
            Err(WorldError::MissingOccupant { .. }) => {}
            Err(err) => return Err(err),
        }
        self.add_occupant(to, to_z, occupant)
    }

    /// Topmost occupant of a column, if any.
    #[must_use]
    pub fn top_occupant(&self, grid: GridPos) -> Option<(f32, Occupant)> {
        self.columns
            .get(&grid)?
            .iter()
            .next_back()
            .map(|(z, occupant)| (z.into_inner(), *occupant))
    }

    /// Re-derive the walkable entry for one column from its top occupant.
    fn update_walkable(&mut self, grid: GridPos) {
        let top = self
            .columns
            .get(&grid)
            .and_then(|column| column.iter().next_back());
        match top {
            Some((z, occupant)) if !occupant.blocks_walk => {
                self.walkable.insert(grid, z.into_inner() + occupant.height);
            }
            _ => {
                self.walkable.remove(&grid);
            }
        }
    }

    // ---- queries ---------------------------------------------------------

    /// True when a slab exists here and the top occupant does not block.
    #[must_use]
    pub fn can_walk(&self, grid: GridPos) -> bool {
        self.walkable.contains_key(&grid)
    }

    /// Standable surface height: the walkable entry when present, else the
    /// bare slab surface (e.g. under a standing actor), else `None`.
    #[must_use]
    pub fn height_at(&self, grid: GridPos) -> Option<f32> {
        self.walkable
            .get(&grid)
            .copied()
            .or_else(|| self.slabs.get(&grid).map(Slab::surface))
    }

    /// Pop one spawnable grid. Destructive: each key is handed out at most
    /// once per world; keys blocked at pop time are discarded, and the
    /// pool is never refilled. `(0, 0)` is never in the pool.
    pub fn random_empty_grid(&mut self) -> Option<GridPos> {
        while let Some(grid) = self.spawn_pool.pop() {
            if self.can_walk(grid) {
                return Some(grid);
            }
        }
        None
    }

    #[must_use]
    pub fn spawn_pool(&self) -> &SpawnPool {
        &self.spawn_pool
    }

    #[must_use]
    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    #[must_use]
    pub fn main_island_len(&self) -> usize {
        self.main_island_len
    }

    pub(crate) fn set_main_island_len(&mut self, len: usize) {
        self.main_island_len = len;
    }

    // ---- render-facing derived data -------------------------------------

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[must_use]
    pub fn tile_sheet(&self) -> &TileSheet {
        &self.tile_sheet
    }

    pub(crate) fn set_tiles(&mut self, tiles: Vec<Tile>) {
        self.tile_sheet = TileSheet::from_tiles(&tiles);
        self.tiles = tiles;
    }

    /// Pixel extents of all tile sprites, used by the renderer to size its
    /// static offscreen composite.
    #[must_use]
    pub fn pixel_bounds(&self) -> PixelBounds {
        let mut bounds = PixelBounds::empty();
        for tile in &self.tiles {
            bounds.include_sprite(tile.screen());
        }
        bounds
    }

    /// Seed the spawn pool from every slab grid except the origin.
    pub(crate) fn seed_spawn_pool(&mut self, rng: &mut SmallRng) {
        let grids: Vec<GridPos> = self
            .slabs
            .keys()
            .copied()
            .filter(|grid| *grid != GridPos::ORIGIN)
            .collect();
        self.spawn_pool = SpawnPool::new(grids, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn three_by_three() -> World {
        let grids = (0..3).flat_map(|x| (0..3).map(move |y| GridPos::new(x, y)));
        World::from_grids(grids, &mut rng())
    }

    #[test]
    fn slab_columns_are_walkable() {
        let world = three_by_three();
        assert_eq!(world.slab_count(), 9);
        for slab in world.slabs() {
            assert!(world.can_walk(slab.pos));
            assert_eq!(world.height_at(slab.pos), Some(0.0));
        }
        assert!(!world.can_walk(GridPos::new(5, 5)));
        assert_eq!(world.height_at(GridPos::new(5, 5)), None);
    }

    #[test]
    fn add_remove_round_trips_walkable() {
        let mut world = three_by_three();
        let grid = GridPos::new(1, 1);
        let before = world.height_at(grid);

        world
            .add_occupant(grid, 0.0, Occupant::actor(ActorId::default()))
            .expect("add");
        assert!(!world.can_walk(grid));
        // The bare slab surface is still reported for rendering.
        assert_eq!(world.height_at(grid), Some(0.0));

        world.remove_occupant(grid, 0.0).expect("remove");
        assert!(world.can_walk(grid));
        assert_eq!(world.height_at(grid), before);
    }

    #[test]
    fn exact_cell_conflicts_are_rejected() {
        let mut world = three_by_three();
        let grid = GridPos::new(0, 2);
        world
            .add_occupant(grid, 0.0, Occupant::actor(ActorId::default()))
            .expect("first add");
        let err = world
            .add_occupant(grid, 0.0, Occupant::reservation(ActorId::default()))
            .expect_err("conflict");
        assert_eq!(err, WorldError::CellOccupied { grid, z: 0.0 });
        // Original occupant survives.
        let (z, top) = world.top_occupant(grid).expect("top");
        assert_eq!(z, 0.0);
        assert_eq!(top.kind, OccupantKind::Actor(ActorId::default()));
    }

    #[test]
    fn reservation_blocks_without_hiding_slab() {
        let mut world = three_by_three();
        let grid = GridPos::new(2, 0);
        world
            .add_occupant(grid, 0.0, Occupant::reservation(ActorId::default()))
            .expect("reserve");
        assert!(!world.can_walk(grid));
        world.remove_occupant(grid, 0.0).expect("release");
        assert!(world.can_walk(grid));
    }

    #[test]
    fn spawn_pool_excludes_origin_and_never_repeats() {
        let mut world = three_by_three();
        let mut seen = std::collections::HashSet::new();
        while let Some(grid) = world.random_empty_grid() {
            assert_ne!(grid, GridPos::ORIGIN);
            assert!(seen.insert(grid), "grid {grid} handed out twice");
        }
        assert_eq!(seen.len(), 8);
        assert!(world.random_empty_grid().is_none());
    }
}
