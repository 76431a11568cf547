//! Sprite descriptors handed to the renderer. The core never draws; it
//! only says which sheet rectangle to paint and where its origin sits.

use serde::Serialize;

use crate::grid::Facing;
use crate::world::SlabStyle;

/// Pixel size of one creature animation cell.
pub const ACTOR_CELL_W: f32 = 32.0;
pub const ACTOR_CELL_H: f32 = 32.0;
/// Creature draw origin: horizontally centered, feet on the surface.
pub const ACTOR_ORIGIN_X: f32 = 16.0;
pub const ACTOR_ORIGIN_Y: f32 = 28.0;

/// Pixel size of one slab cell on the terrain sheet.
pub const SLAB_CELL_W: f32 = 32.0;
pub const SLAB_CELL_H: f32 = 24.0;

/// Rectangle into a sprite sheet plus draw-origin offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpriteMetrics {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub ox: f32,
    pub oy: f32,
}

/// A renderable sprite reference: sheet name plus rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpriteDescriptor {
    pub image: &'static str,
    pub metrics: SpriteMetrics,
}

/// Sheet row per facing. Rows 0-3 are the idle/hop cycle; the talk cycle
/// lives 4 rows below with the same facing order.
fn facing_row(facing: Facing) -> f32 {
    match facing {
        Facing::North => 0.0,
        Facing::East => 1.0,
        Facing::South => 2.0,
        Facing::West => 3.0,
    }
}

/// Creature sprite for the current animation state. `frame` indexes the
/// hop cycle; idle actors always show cell 0. Talking swaps to the talk
/// rows but keeps the movement frame so a mid-hop chatter still hops.
#[must_use]
pub fn actor_sprite(facing: Facing, frame: u32, hopping: bool, talking: bool) -> SpriteDescriptor {
    let column = if hopping { frame as f32 } else { 0.0 };
    let mut row = facing_row(facing);
    if talking {
        row += 4.0;
    }
    SpriteDescriptor {
        image: "creatures",
        metrics: SpriteMetrics {
            x: column * ACTOR_CELL_W,
            y: row * ACTOR_CELL_H,
            w: ACTOR_CELL_W,
            h: ACTOR_CELL_H,
            ox: ACTOR_ORIGIN_X,
            oy: ACTOR_ORIGIN_Y,
        },
    }
}

/// Terrain sprite for one slab style.
#[must_use]
pub fn slab_sprite(style: SlabStyle) -> SpriteDescriptor {
    let column = match style {
        SlabStyle::Grass => 0.0,
        SlabStyle::Plain => 1.0,
        SlabStyle::Flowers => 2.0,
    };
    SpriteDescriptor {
        image: "terrain",
        metrics: SpriteMetrics {
            x: column * SLAB_CELL_W,
            y: 0.0,
            w: SLAB_CELL_W,
            h: SLAB_CELL_H,
            ox: SLAB_CELL_W / 2.0,
            oy: SLAB_CELL_H / 3.0,
        },
    }
}
