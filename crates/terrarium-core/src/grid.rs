//! Isometric grid math shared by world generation, pathfinding, and rendering.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Horizontal half-width of a diamond tile in pixels.
pub const TILE_HALF_WIDTH: f32 = 16.0;
/// Vertical half-height of a diamond tile in pixels.
pub const TILE_HALF_HEIGHT: f32 = 8.0;
/// Pixel rise per unit of world height.
pub const HEIGHT_STEP: f32 = 16.0;

/// The four single-tile hop offsets, in fixed N/E/S/W precedence order.
pub const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Integer coordinate of one diamond tile column.
///
/// The canonical textual form is `"x:y"` (see the `Display` impl); map
/// lookups use the typed value directly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    /// The world origin, center of the beacon.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a raw offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The 4 edge-adjacent grids in N/E/S/W order. No bounds checking:
    /// callers must null-check against the slab map.
    #[must_use]
    pub fn neighbors4(self) -> [Self; 4] {
        CARDINAL_OFFSETS.map(|(dx, dy)| self.offset(dx, dy))
    }

    /// The 8 surrounding grids (edges then diagonals). No bounds checking.
    #[must_use]
    pub fn neighbors8(self) -> [Self; 8] {
        [
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
            self.offset(-1, 0),
            self.offset(1, -1),
            self.offset(1, 1),
            self.offset(-1, 1),
            self.offset(-1, -1),
        ]
    }

    /// Euclidean distance to another grid.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Iso-cardinal facing, derived from hop deltas and used for sprite rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    North,
    East,
    #[default]
    South,
    West,
}

impl Facing {
    /// Facing implied by a hop delta. Vertical movement wins ties; a zero
    /// delta keeps the default.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Self {
        if dy < 0 {
            Self::North
        } else if dy > 0 {
            Self::South
        } else if dx > 0 {
            Self::East
        } else if dx < 0 {
            Self::West
        } else {
            Self::default()
        }
    }
}

/// Screen-space point produced by the isometric projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// The canonical isometric projection. Every screen-space computation in
/// the core reduces to this formula.
///
/// Non-finite inputs are logged and collapse to the origin so NaN can
/// never reach a paint call.
#[must_use]
pub fn iso_screen(x: f32, y: f32, z: f32) -> ScreenPoint {
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        warn!(x, y, z, "non-finite coordinates reached the iso projection");
        return ScreenPoint::default();
    }
    ScreenPoint {
        x: (x - y) * TILE_HALF_WIDTH,
        y: (x + y) * TILE_HALF_HEIGHT - z * HEIGHT_STEP,
    }
}

/// Offsets within `[-size, size]²` (origin included, at rank 0) ordered by
/// ascending Euclidean length, ties broken by `(y, x)` scan order.
///
/// Computed once and cached by the pathfinder for deterministic
/// tie-breaking; this is a plain Euclidean ranking, not iso-specific.
#[must_use]
pub fn closest_offsets(size: i32) -> Vec<(i32, i32)> {
    let mut offsets = Vec::with_capacity(((size * 2 + 1) * (size * 2 + 1)) as usize);
    for y in -size..=size {
        for x in -size..=size {
            offsets.push((x, y));
        }
    }
    offsets.sort_by_key(|&(x, y)| ((x as i64 * x as i64 + y as i64 * y as i64), y, x));
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_projection_matches_formula() {
        let p = iso_screen(3.0, 1.0, -0.5);
        assert_eq!(p.x, (3.0 - 1.0) * 16.0);
        assert_eq!(p.y, (3.0 + 1.0) * 8.0 + 0.5 * 16.0);
    }

    #[test]
    fn iso_projection_rejects_nan() {
        let p = iso_screen(f32::NAN, 0.0, 0.0);
        assert_eq!(p, ScreenPoint::default());
        let p = iso_screen(0.0, f32::INFINITY, 0.0);
        assert_eq!(p, ScreenPoint::default());
    }

    #[test]
    fn neighbors4_are_edge_adjacent() {
        let grids = GridPos::new(2, -3).neighbors4();
        for n in grids {
            assert_eq!((n.x - 2).abs() + (n.y + 3).abs(), 1);
        }
    }

    #[test]
    fn closest_offsets_rank_by_distance() {
        let offsets = closest_offsets(2);
        assert_eq!(offsets[0], (0, 0));
        for pair in offsets.windows(2) {
            let d = |o: (i32, i32)| o.0 * o.0 + o.1 * o.1;
            assert!(d(pair[0]) <= d(pair[1]));
        }
        assert_eq!(offsets.len(), 25);
    }

    #[test]
    fn facing_from_delta_prefers_vertical() {
        assert_eq!(Facing::from_delta(0, -1), Facing::North);
        assert_eq!(Facing::from_delta(1, 0), Facing::East);
        assert_eq!(Facing::from_delta(0, 1), Facing::South);
        assert_eq!(Facing::from_delta(-1, 0), Facing::West);
        assert_eq!(Facing::from_delta(0, 0), Facing::South);
    }

    #[test]
    fn grid_key_format() {
        assert_eq!(GridPos::new(-4, 7).to_string(), "-4:7");
    }
}
