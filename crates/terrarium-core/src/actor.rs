//! Community members rendered as creatures: presence, hop interpolation,
//! talking state, and per-actor scheduled tasks.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::grid::{Facing, GridPos, ScreenPoint, iso_screen};
use crate::sprite::{SpriteDescriptor, actor_sprite};
use crate::world::{Occupant, World, WorldError};
use crate::{ActorId, Tick};
use crate::behavior::{Behavior, BehaviorKind};

/// Chat presence as reported by the roster feed. Only `Online` actors
/// wander or react to chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
}

impl Presence {
    /// Parse a roster presence string. Unknown values are treated as
    /// offline rather than rejected; the feed is not under our control.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" => Self::Dnd,
            _ => Self::Offline,
        }
    }

    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// An in-flight single-tile hop. Logical position stays at `from` until
/// the final tick; only the rendered screen position moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    pub from: GridPos,
    pub from_z: f32,
    pub to: GridPos,
    pub to_z: f32,
    /// Tick the hop was started on. The interpolation does not advance
    /// on this tick, so a hop lasts exactly `total` ticks after it.
    pub started: Tick,
    pub ticks: u32,
    pub total: u32,
}

impl Hop {
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.ticks as f32 / self.total as f32
    }
}

/// A deferred per-actor action, cancellable as a group when presence
/// drops or behaviors are replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub due: Tick,
    pub action: TaskAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Replace all behaviors with a `GoTo` toward this sender.
    SeekSender { sender_uid: String },
}

#[derive(Debug)]
pub struct Actor {
    pub uid: String,
    pub username: String,
    pub presence: Presence,
    pub pos: GridPos,
    pub z: f32,
    pub facing: Facing,
    /// Hop animation frame; 0 while idle.
    pub frame: u32,
    hop: Option<Hop>,
    pub behaviors: Vec<Behavior>,
    talking_until: Option<Tick>,
    /// Channel and tick of the actor's own most recent message.
    last_message: Option<(String, Tick)>,
    tasks: Vec<ScheduledTask>,
}

impl Actor {
    #[must_use]
    pub fn new(uid: impl Into<String>, username: impl Into<String>, pos: GridPos, z: f32) -> Self {
        Self {
            uid: uid.into(),
            username: username.into(),
            presence: Presence::default(),
            pos,
            z,
            facing: Facing::default(),
            frame: 0,
            hop: None,
            behaviors: Vec::new(),
            talking_until: None,
            last_message: None,
            tasks: Vec::new(),
        }
    }

    // ---- hops ------------------------------------------------------------

    #[must_use]
    pub fn hop(&self) -> Option<&Hop> {
        self.hop.as_ref()
    }

    #[must_use]
    pub fn is_hopping(&self) -> bool {
        self.hop.is_some()
    }

    /// Destination cell while mid-hop.
    #[must_use]
    pub fn destination(&self) -> Option<GridPos> {
        self.hop.map(|hop| hop.to)
    }

    /// Validate and start a single-tile hop: the target must be walkable
    /// right now, and its surface cell is reserved atomically so no other
    /// actor deciding later this tick can claim it. Returns false without
    /// side effects when the hop is rejected.
    pub fn begin_hop(
        &mut self,
        id: ActorId,
        world: &mut World,
        dx: i32,
        dy: i32,
        total: u32,
        now: Tick,
    ) -> bool {
        if self.hop.is_some() || (dx, dy) == (0, 0) {
            return false;
        }
        let target = self.pos.offset(dx, dy);
        if !world.can_walk(target) {
            return false;
        }
        let Some(to_z) = world.height_at(target) else {
            return false;
        };
        if world
            .add_occupant(target, to_z, Occupant::reservation(id))
            .is_err()
        {
            return false;
        }
        self.facing = Facing::from_delta(dx, dy);
        self.frame = 0;
        self.hop = Some(Hop {
            from: self.pos,
            from_z: self.z,
            to: target,
            to_z,
            started: now,
            ticks: 0,
            total,
        });
        true
    }

    /// Advance the hop interpolation by one tick. Returns true when the
    /// hop just reached its final tick; the caller then finalizes it.
    /// The start tick itself never advances the hop.
    pub fn advance_hop(&mut self, now: Tick) -> bool {
        let Some(hop) = self.hop.as_mut() else {
            return false;
        };
        if hop.started == now {
            return false;
        }
        hop.ticks += 1;
        self.frame = hop.ticks / 3;
        hop.ticks >= hop.total
    }

    /// Complete the hop: consume the reservation, relocate the occupant,
    /// and snap the logical position to the destination.
    pub fn finish_hop(&mut self, id: ActorId, world: &mut World) -> Result<(), WorldError> {
        let Some(hop) = self.hop.take() else {
            return Ok(());
        };
        world.move_actor(id, hop.from, hop.from_z, hop.to, hop.to_z)?;
        self.pos = hop.to;
        self.z = hop.to_z;
        self.frame = 0;
        Ok(())
    }

    /// Abort an in-flight hop, releasing its reservation. The actor stays
    /// at its origin cell.
    pub fn cancel_hop(&mut self, world: &mut World) {
        if let Some(hop) = self.hop.take() {
            if let Err(err) = world.remove_occupant(hop.to, hop.to_z) {
                warn!(uid = %self.uid, %err, "hop reservation already gone");
            }
            self.frame = 0;
        }
    }

    // ---- rendering -------------------------------------------------------

    /// Screen-space position: a linear interpolation of the iso-projected
    /// hop endpoints while mid-hop, else the standing cell.
    #[must_use]
    pub fn screen_position(&self) -> ScreenPoint {
        match &self.hop {
            Some(hop) => {
                let a = iso_screen(hop.from.x as f32, hop.from.y as f32, hop.from_z);
                let b = iso_screen(hop.to.x as f32, hop.to.y as f32, hop.to_z);
                let t = hop.progress();
                ScreenPoint {
                    x: a.x + (b.x - a.x) * t,
                    y: a.y + (b.y - a.y) * t,
                }
            }
            None => iso_screen(self.pos.x as f32, self.pos.y as f32, self.z),
        }
    }

    /// Paint-order depth. Stepped in thirds during a hop instead of
    /// continuously, so the depth sort does not flicker mid-animation.
    #[must_use]
    pub fn z_depth(&self) -> f32 {
        let depth = |grid: GridPos| (grid.x + grid.y) as f32;
        match &self.hop {
            Some(hop) => {
                let t = hop.progress();
                if t < 1.0 / 3.0 {
                    depth(hop.from)
                } else if t < 2.0 / 3.0 {
                    (depth(hop.from) + depth(hop.to)) / 2.0
                } else {
                    depth(hop.to)
                }
            }
            None => depth(self.pos),
        }
    }

    #[must_use]
    pub fn sprite(&self, now: Tick) -> SpriteDescriptor {
        actor_sprite(self.facing, self.frame, self.is_hopping(), self.is_talking(now))
    }

    // ---- talking / chat --------------------------------------------------

    pub fn set_talking_until(&mut self, until: Tick) {
        self.talking_until = Some(until);
    }

    #[must_use]
    pub fn is_talking(&self, now: Tick) -> bool {
        self.talking_until.is_some_and(|until| now < until)
    }

    /// Drop the talking flag once expired. Returns true if it expired
    /// this call.
    pub fn expire_talking(&mut self, now: Tick) -> bool {
        if self.talking_until.is_some_and(|until| now >= until) {
            self.talking_until = None;
            return true;
        }
        false
    }

    /// Record the actor's own message, which sets its active channel.
    pub fn note_own_message(&mut self, channel: impl Into<String>, now: Tick) {
        self.last_message = Some((channel.into(), now));
    }

    /// The channel this actor is currently engaged in, if its own last
    /// message is recent enough.
    #[must_use]
    pub fn active_channel(&self, now: Tick, window: u64) -> Option<&str> {
        self.last_message
            .as_ref()
            .filter(|(_, at)| now.0.saturating_sub(at.0) <= window)
            .map(|(channel, _)| channel.as_str())
    }

    // ---- behaviors & tasks -----------------------------------------------

    #[must_use]
    pub fn has_behavior(&self, kind: BehaviorKind) -> bool {
        self.behaviors.iter().any(|b| b.kind() == kind)
    }

    /// Attach a behavior, replacing any existing one of the same kind so
    /// the list never holds two wanders or two seeks.
    pub fn attach_behavior(&mut self, behavior: Behavior) {
        self.behaviors.retain(|b| b.kind() != behavior.kind());
        self.behaviors.push(behavior);
    }

    pub fn detach_behavior(&mut self, kind: BehaviorKind) {
        self.behaviors.retain(|b| b.kind() != kind);
    }

    pub fn schedule_task(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    /// Remove and return every task due at `now`.
    pub fn take_due_tasks(&mut self, now: Tick) -> Vec<TaskAction> {
        let mut due = Vec::new();
        self.tasks.retain(|task| {
            if task.due <= now {
                due.push(task.action.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// Cancel every pending task. Used on presence loss and behavior
    /// replacement so a stale timer cannot move a frozen actor.
    pub fn cancel_tasks(&mut self) {
        self.tasks.clear();
    }

    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }
}
