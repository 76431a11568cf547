//! Single-hop greedy pathfinding.
//!
//! No global search: each call picks the best immediate cardinal step
//! toward the goal, reading the live walkable table. This detours around
//! single-tile holes but cannot route around larger obstacles; callers
//! treat a string of `None` results as "unreachable for now".

use std::collections::HashMap;

use crate::grid::{CARDINAL_OFFSETS, GridPos, closest_offsets};
use crate::world::World;

/// Greedy next-step chooser with a precomputed closeness ranking for
/// deterministic tie-breaking.
pub struct Pathfinder {
    rank: HashMap<(i32, i32), u64>,
}

impl Pathfinder {
    /// Build the ranking table for deltas within `[-size, size]²`.
    /// `size` should cover the world diameter so in-map deltas always
    /// rank exactly.
    #[must_use]
    pub fn new(size: i32) -> Self {
        let rank = closest_offsets(size)
            .into_iter()
            .enumerate()
            .map(|(i, offset)| (offset, i as u64))
            .collect();
        Self { rank }
    }

    /// Closeness rank of a remaining delta; lower is better. Deltas
    /// outside the table fall back to a distance-ordered overflow band.
    fn rank_of(&self, dx: i32, dy: i32) -> u64 {
        match self.rank.get(&(dx, dy)) {
            Some(&rank) => rank,
            None => {
                let d2 = dx as i64 * dx as i64 + dy as i64 * dy as i64;
                self.rank.len() as u64 + d2 as u64
            }
        }
    }

    /// Best walkable single hop from `from` toward `to`, or `None` when
    /// every candidate is blocked or the actor is already there. Ties
    /// fall to the fixed N/E/S/W candidate precedence.
    #[must_use]
    pub fn next_step(&self, world: &World, from: GridPos, to: GridPos) -> Option<GridPos> {
        if from == to {
            return None;
        }
        CARDINAL_OFFSETS
            .iter()
            .map(|&(dx, dy)| from.offset(dx, dy))
            .filter(|candidate| world.can_walk(*candidate))
            .min_by_key(|candidate| self.rank_of(to.x - candidate.x, to.y - candidate.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActorId;
    use crate::world::Occupant;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn square(size: i32) -> World {
        let grids = (0..size).flat_map(move |x| (0..size).map(move |y| GridPos::new(x, y)));
        World::from_grids(grids, &mut SmallRng::seed_from_u64(1))
    }

    #[test]
    fn steps_straight_when_clear() {
        let world = square(5);
        let finder = Pathfinder::new(8);
        let step = finder
            .next_step(&world, GridPos::new(0, 2), GridPos::new(4, 2))
            .expect("step");
        assert_eq!(step, GridPos::new(1, 2));
    }

    #[test]
    fn already_at_goal_stays_put() {
        let world = square(3);
        let finder = Pathfinder::new(8);
        assert!(
            finder
                .next_step(&world, GridPos::new(1, 1), GridPos::new(1, 1))
                .is_none()
        );
    }

    #[test]
    fn detours_around_a_single_hole() {
        // 3x3 with the center missing: the straight line is blocked but a
        // sideways step keeps progress toward the far side.
        let grids = (0..3)
            .flat_map(|x| (0..3).map(move |y| GridPos::new(x, y)))
            .filter(|g| *g != GridPos::new(1, 1));
        let world = World::from_grids(grids, &mut SmallRng::seed_from_u64(1));
        let finder = Pathfinder::new(8);

        let mut pos = GridPos::new(0, 1);
        let goal = GridPos::new(2, 1);
        for _ in 0..6 {
            if pos == goal {
                break;
            }
            let step = finder.next_step(&world, pos, goal).expect("viable step");
            assert_ne!(step, GridPos::new(1, 1));
            assert_eq!(pos.distance(step), 1.0);
            pos = step;
        }
        assert_eq!(pos, goal);
    }

    #[test]
    fn fully_blocked_returns_none() {
        let mut world = square(3);
        let center = GridPos::new(1, 1);
        for neighbor in center.neighbors4() {
            world
                .add_occupant(neighbor, 0.0, Occupant::actor(ActorId::default()))
                .expect("block");
        }
        let finder = Pathfinder::new(8);
        assert!(finder.next_step(&world, center, GridPos::new(2, 2)).is_none());
    }

    #[test]
    fn skips_occupied_cells() {
        let mut world = square(5);
        world
            .add_occupant(GridPos::new(1, 2), 0.0, Occupant::actor(ActorId::default()))
            .expect("block");
        let finder = Pathfinder::new(8);
        let step = finder
            .next_step(&world, GridPos::new(0, 2), GridPos::new(4, 2))
            .expect("step");
        assert_ne!(step, GridPos::new(1, 2));
        assert!(world.can_walk(step));
    }
}
