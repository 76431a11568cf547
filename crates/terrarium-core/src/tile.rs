//! Render tiles derived from slab corners.
//!
//! A tile is a full diamond centered on a grid *corner*, stitched from the
//! styles of the up-to-4 slabs meeting there. Tiles are derived once per
//! world and never mutate; they are pure render data.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::grid::{GridPos, ScreenPoint, iso_screen};

/// Pixel width of a tile sprite (one full diamond).
pub const TILE_SPRITE_WIDTH: f32 = 32.0;
/// Pixel height of a tile sprite: diamond plus the slab side face.
pub const TILE_SPRITE_HEIGHT: f32 = 24.0;
/// Sprite origin offsets from the diamond center.
pub const TILE_SPRITE_ORIGIN_X: f32 = 16.0;
pub const TILE_SPRITE_ORIGIN_Y: f32 = 8.0;

/// One-letter style code for a quarter of a tile diamond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TileCorner {
    /// Grass.
    G,
    /// Plain slab.
    S,
    /// Flowers.
    F,
    /// Empty (no slab on that side).
    E,
}

impl TileCorner {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::G => 'G',
            Self::S => 'S',
            Self::F => 'F',
            Self::E => 'E',
        }
    }
}

/// Four corner codes in fixed NW-NE-SE-SW order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TileCode(pub [TileCorner; 4]);

impl TileCode {
    /// A tile that is empty on every side.
    pub const EMPTY: Self = Self([TileCorner::E; 4]);
}

impl fmt::Display for TileCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for corner in self.0 {
            write!(f, "{}", corner.letter())?;
        }
        Ok(())
    }
}

/// A corner-centered render diamond.
#[derive(Debug, Clone, Serialize)]
pub struct Tile {
    /// Corner coordinate. The corner `(x, y)` touches the slabs at
    /// `(x-1, y-1)` NW, `(x, y-1)` NE, `(x, y)` SE and `(x-1, y)` SW.
    pub corner: GridPos,
    /// Surface height the diamond is drawn at.
    pub z: f32,
    pub code: TileCode,
}

impl Tile {
    /// Canonical `"z:x:y"` key used by the renderer's tile cache.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.z, self.corner.x, self.corner.y)
    }

    /// Screen-space center of the diamond.
    #[must_use]
    pub fn screen(&self) -> ScreenPoint {
        iso_screen(
            self.corner.x as f32 - 0.5,
            self.corner.y as f32 - 0.5,
            self.z,
        )
    }

    /// Paint-order depth. Tiles sit behind any actor standing on the
    /// slabs they cover.
    #[must_use]
    pub fn z_depth(&self) -> f32 {
        (self.corner.x + self.corner.y) as f32 - 1.0
    }
}

/// Rectangle into a sprite sheet, with its draw-origin offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetMetrics {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub ox: f32,
    pub oy: f32,
}

/// Procedural layout of the tile sprite sheet: one slot per distinct
/// code, assigned in sorted code order so the layout is deterministic
/// for a given world.
#[derive(Debug, Default)]
pub struct TileSheet {
    slots: BTreeMap<TileCode, usize>,
}

impl TileSheet {
    #[must_use]
    pub fn from_tiles(tiles: &[Tile]) -> Self {
        let mut codes: Vec<TileCode> = tiles.iter().map(|tile| tile.code).collect();
        codes.sort_unstable();
        codes.dedup();
        let slots = codes.into_iter().enumerate().map(|(i, c)| (c, i)).collect();
        Self { slots }
    }

    /// Sheet rectangle for a code. `None` for codes absent from this
    /// world's tile set.
    #[must_use]
    pub fn metrics(&self, code: TileCode) -> Option<SheetMetrics> {
        self.slots.get(&code).map(|&slot| SheetMetrics {
            x: slot as f32 * TILE_SPRITE_WIDTH,
            y: 0.0,
            w: TILE_SPRITE_WIDTH,
            h: TILE_SPRITE_HEIGHT,
            ox: TILE_SPRITE_ORIGIN_X,
            oy: TILE_SPRITE_ORIGIN_Y,
        })
    }

    #[must_use]
    pub fn code_count(&self) -> usize {
        self.slots.len()
    }
}

/// Min/max screen-pixel extents, used to size the renderer's static
/// offscreen composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl PixelBounds {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min_x: f32::MAX,
            min_y: f32::MAX,
            max_x: f32::MIN,
            max_y: f32::MIN,
        }
    }

    /// Expand to cover a tile sprite centered at `point`.
    pub fn include_sprite(&mut self, point: ScreenPoint) {
        self.min_x = self.min_x.min(point.x - TILE_SPRITE_ORIGIN_X);
        self.min_y = self.min_y.min(point.y - TILE_SPRITE_ORIGIN_Y);
        self.max_x = self.max_x.max(point.x - TILE_SPRITE_ORIGIN_X + TILE_SPRITE_WIDTH);
        self.max_y = self.max_y.max(point.y - TILE_SPRITE_ORIGIN_Y + TILE_SPRITE_HEIGHT);
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_renders_four_letters() {
        let code = TileCode([TileCorner::G, TileCorner::S, TileCorner::F, TileCorner::E]);
        assert_eq!(code.to_string(), "GSFE");
        assert_eq!(TileCode::EMPTY.to_string(), "EEEE");
    }

    #[test]
    fn tile_key_uses_z_x_y() {
        let tile = Tile {
            corner: GridPos::new(-2, 5),
            z: 0.0,
            code: TileCode::EMPTY,
        };
        assert_eq!(tile.key(), "0:-2:5");
    }

    #[test]
    fn sheet_slots_are_sorted_and_deduped() {
        let all_g = TileCode([TileCorner::G; 4]);
        let mixed = TileCode([TileCorner::E, TileCorner::G, TileCorner::G, TileCorner::G]);
        let tiles: Vec<Tile> = [all_g, mixed, all_g]
            .into_iter()
            .enumerate()
            .map(|(i, code)| Tile {
                corner: GridPos::new(i as i32, 0),
                z: 0.0,
                code,
            })
            .collect();
        let sheet = TileSheet::from_tiles(&tiles);
        assert_eq!(sheet.code_count(), 2);
        let a = sheet.metrics(all_g).expect("slot");
        let b = sheet.metrics(mixed).expect("slot");
        assert_ne!(a.x, b.x);
        assert!(sheet.metrics(TileCode::EMPTY).is_none());
    }

    #[test]
    fn pixel_bounds_cover_sprites() {
        let mut bounds = PixelBounds::empty();
        bounds.include_sprite(ScreenPoint { x: 0.0, y: 0.0 });
        bounds.include_sprite(ScreenPoint { x: 64.0, y: 32.0 });
        assert_eq!(bounds.min_x, -TILE_SPRITE_ORIGIN_X);
        assert_eq!(bounds.max_x, 64.0 - TILE_SPRITE_ORIGIN_X + TILE_SPRITE_WIDTH);
        assert_eq!(bounds.width(), 96.0);
        assert_eq!(bounds.height(), 56.0);
    }
}
