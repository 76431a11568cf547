//! Actor behaviors: ambient wandering and chat-triggered seeking.
//!
//! Behaviors are plain data driven by the tick loop. Each decision tick
//! the state resolves any cross-actor references (the seek target's
//! current cell) and hands a behavior a [`DecisionCtx`]; the behavior
//! answers with a [`Decision`] and never touches the world directly.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::grid::{CARDINAL_OFFSETS, GridPos};
use crate::path::Pathfinder;
use crate::world::World;
use crate::{TerrariumConfig, Tick};

/// Discriminant used to enforce the at-most-one-of-each invariant on an
/// actor's behavior list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    Wander,
    GoTo,
}

/// What a behavior wants this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Stay,
    Hop { dx: i32, dy: i32 },
    /// Remove this behavior from the actor.
    Detach,
}

/// Per-decision view handed to behaviors. `target` is the seek target's
/// current cell, resolved by the caller; `None` means the target left.
pub struct DecisionCtx<'a> {
    pub now: Tick,
    pub pos: GridPos,
    pub world: &'a World,
    pub pathfinder: &'a Pathfinder,
    pub config: &'a TerrariumConfig,
    pub rng: &'a mut SmallRng,
    pub target: Option<GridPos>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Ambient idle roaming: every so often, try one random hop.
    Wander { next_decision: Tick },
    /// Walk toward another actor until close enough or hopeless.
    GoTo { target_uid: String, stalled: u32 },
}

impl Behavior {
    /// A wander whose first decision is jittered so freshly spawned
    /// actors do not all hop in lockstep.
    #[must_use]
    pub fn wander(now: Tick, config: &TerrariumConfig, rng: &mut SmallRng) -> Self {
        Self::Wander {
            next_decision: now + rng.random_range(config.wander_delay_min..=config.wander_delay_max),
        }
    }

    #[must_use]
    pub fn go_to(target_uid: impl Into<String>) -> Self {
        Self::GoTo {
            target_uid: target_uid.into(),
            stalled: 0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Self::Wander { .. } => BehaviorKind::Wander,
            Self::GoTo { .. } => BehaviorKind::GoTo,
        }
    }

    /// Seek target uid, when this is a `GoTo`.
    #[must_use]
    pub fn target_uid(&self) -> Option<&str> {
        match self {
            Self::GoTo { target_uid, .. } => Some(target_uid),
            Self::Wander { .. } => None,
        }
    }

    /// One decision tick. Only called while the actor is idle (no hop in
    /// flight) and online.
    pub fn decide(&mut self, ctx: &mut DecisionCtx<'_>) -> Decision {
        match self {
            Self::Wander { next_decision } => {
                if ctx.now < *next_decision {
                    return Decision::Stay;
                }
                *next_decision = ctx.now
                    + ctx
                        .rng
                        .random_range(ctx.config.wander_delay_min..=ctx.config.wander_delay_max);
                let (dx, dy) = CARDINAL_OFFSETS[ctx.rng.random_range(0..CARDINAL_OFFSETS.len())];
                // The hop may still be rejected against the world; that is
                // fine, the next interval simply rolls again.
                Decision::Hop { dx, dy }
            }
            Self::GoTo { stalled, .. } => {
                let Some(goal) = ctx.target else {
                    return Decision::Detach;
                };
                if ctx.pos.distance(goal) <= ctx.config.goto_proximity {
                    return Decision::Detach;
                }
                match ctx.pathfinder.next_step(ctx.world, ctx.pos, goal) {
                    Some(step) => {
                        *stalled = 0;
                        Decision::Hop {
                            dx: step.x - ctx.pos.x,
                            dy: step.y - ctx.pos.y,
                        }
                    }
                    None => {
                        *stalled += 1;
                        if *stalled >= ctx.config.goto_patience {
                            Decision::Detach
                        } else {
                            Decision::Stay
                        }
                    }
                }
            }
        }
    }
}
