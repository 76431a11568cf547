//! Simulation core for the terrarium: an isometric island inhabited by
//! ambient creatures mirroring the members of a chat community.
//!
//! The crate owns world generation, occupancy and walkability, greedy
//! pathfinding, actor state, and the fixed-tick pipeline. It performs no
//! I/O of its own beyond `tracing` diagnostics; inbound roster, presence
//! and chat events are queued from outside and applied at the next
//! [`TerrariumState::step`].

pub mod actor;
pub mod behavior;
pub mod grid;
pub mod noise;
pub mod path;
pub mod sprite;
pub mod tile;
pub mod world;
pub mod worldgen;

use std::collections::{HashMap, VecDeque};
use std::ops::Add;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use actor::{Actor, Presence, ScheduledTask, TaskAction};
pub use behavior::{Behavior, BehaviorKind, Decision, DecisionCtx};
pub use grid::{Facing, GridPos, ScreenPoint, iso_screen};
pub use path::Pathfinder;
pub use sprite::{SpriteDescriptor, SpriteMetrics};
pub use tile::{Tile, TileCode, TileSheet};
pub use world::{Occupant, OccupantKind, Slab, SlabStyle, World, WorldError};

new_key_type! {
    /// Generational handle for an actor in the simulation.
    pub struct ActorId;
}

/// Monotonic simulation tick counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Tick(pub u64);

impl Add<u64> for Tick {
    type Output = Tick;

    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fatal configuration and setup failures.
#[derive(Debug, Error)]
pub enum TerrariumError {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

/// Tunable simulation parameters. Tick-valued fields assume the nominal
/// 20 ticks per second of the demo loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrariumConfig {
    /// Diameter of the generation area in grid cells. Even, at least 24.
    pub world_size: i32,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    /// Flower patches attempted during generation.
    pub flower_patches: u32,
    /// Frames in one hop animation cycle; a hop lasts three ticks per frame.
    pub animation_frames: u32,
    /// Idle ticks between wander decisions (inclusive bounds).
    pub wander_delay_min: u64,
    pub wander_delay_max: u64,
    /// Distance at which a seek behavior considers itself arrived.
    pub goto_proximity: f32,
    /// Blocked decision ticks a seek tolerates before giving up.
    pub goto_patience: u32,
    /// Maximum random delay before reacting to a chat message.
    pub chat_jitter_ticks: u64,
    /// How long an actor's own message keeps its channel active.
    pub active_channel_ticks: u64,
    /// How long the talk animation plays after a message.
    pub talk_ticks: u64,
    /// Retained tick summaries.
    pub history_capacity: usize,
}

impl Default for TerrariumConfig {
    fn default() -> Self {
        Self {
            world_size: 32,
            rng_seed: None,
            flower_patches: 8,
            animation_frames: 8,
            wander_delay_min: 30,
            wander_delay_max: 180,
            goto_proximity: 2.0,
            goto_patience: 60,
            chat_jitter_ticks: 60,
            active_channel_ticks: 3 * 60 * 20,
            talk_ticks: 120,
            history_capacity: 256,
        }
    }
}

impl TerrariumConfig {
    /// Validate and return the config, or say exactly what is wrong.
    pub fn validated(self) -> Result<Self, TerrariumError> {
        let invalid = |reason: String| TerrariumError::InvalidConfig { reason };
        if self.world_size < 24 || self.world_size % 2 != 0 {
            return Err(invalid(format!(
                "world_size must be even and at least 24, got {}",
                self.world_size
            )));
        }
        if self.animation_frames == 0 {
            return Err(invalid("animation_frames must be positive".into()));
        }
        if self.wander_delay_min > self.wander_delay_max {
            return Err(invalid(format!(
                "wander delay bounds inverted: {} > {}",
                self.wander_delay_min, self.wander_delay_max
            )));
        }
        if self.goto_proximity < 1.0 {
            return Err(invalid(
                "goto_proximity below 1 can never be satisfied".into(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be positive".into()));
        }
        Ok(self)
    }

    /// Ticks one hop takes from start to landing.
    #[must_use]
    pub fn hop_ticks(&self) -> u32 {
        3 * self.animation_frames
    }
}

/// Roster, presence and chat events queued from the boundary layer and
/// applied at the start of the next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    ActorJoined {
        uid: String,
        username: String,
        presence: Presence,
    },
    ActorLeft {
        uid: String,
    },
    PresenceChanged {
        uid: String,
        presence: Presence,
    },
    ChatMessage {
        uid: String,
        channel: String,
        text: String,
    },
}

/// Per-tick digest kept in a bounded history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub actors: usize,
    pub events: u32,
    pub hops_started: u32,
    pub hops_completed: u32,
    pub messages: u32,
}

#[derive(Default)]
struct TickCounters {
    events: u32,
    hops_started: u32,
    hops_completed: u32,
    messages: u32,
}

/// The whole simulation: world, actors, and the tick pipeline.
///
/// All mutation happens synchronously inside [`step`](Self::step); the
/// stages run in a fixed order so every behavior decision observes the
/// occupancy state left by the actors processed before it in the same
/// tick.
pub struct TerrariumState {
    config: TerrariumConfig,
    rng: SmallRng,
    tick: Tick,
    world: World,
    pathfinder: Pathfinder,
    actors: SlotMap<ActorId, Actor>,
    /// Stable processing order (join order).
    order: Vec<ActorId>,
    by_uid: HashMap<String, ActorId>,
    inbox: VecDeque<InboundEvent>,
    history: VecDeque<TickSummary>,
}

impl TerrariumState {
    /// Build a state with a freshly generated world.
    pub fn new(config: TerrariumConfig) -> Result<Self, TerrariumError> {
        let config = config.validated()?;
        let mut rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let world = worldgen::generate(&config, &mut rng);
        let pathfinder = Pathfinder::new(config.world_size);
        info!(
            world_size = config.world_size,
            slabs = world.slab_count(),
            "terrarium ready"
        );
        Ok(Self {
            config,
            rng,
            tick: Tick(0),
            world,
            pathfinder,
            actors: SlotMap::with_key(),
            order: Vec::new(),
            by_uid: HashMap::new(),
            inbox: VecDeque::new(),
            history: VecDeque::new(),
        })
    }

    // ---- accessors -------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &TerrariumConfig {
        &self.config
    }

    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    #[must_use]
    pub fn actor_by_uid(&self, uid: &str) -> Option<&Actor> {
        self.by_uid.get(uid).and_then(|id| self.actors.get(*id))
    }

    /// Actors in stable join order, for deterministic iteration and the
    /// render feed.
    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.order
            .iter()
            .filter_map(|id| self.actors.get(*id).map(|actor| (*id, actor)))
    }

    #[must_use]
    pub fn history(&self) -> &VecDeque<TickSummary> {
        &self.history
    }

    /// Queue a boundary event for the next step.
    pub fn queue_event(&mut self, event: InboundEvent) {
        self.inbox.push_back(event);
    }

    /// Destroy every actor and its occupancy, e.g. on a server switch.
    /// The world itself stays; the spawn pool is not refilled.
    pub fn clear_actors(&mut self) {
        let ids: Vec<ActorId> = self.order.drain(..).collect();
        for id in ids {
            if let Some(mut actor) = self.actors.remove(id) {
                actor.cancel_hop(&mut self.world);
                if let Err(err) = self.world.remove_occupant(actor.pos, actor.z) {
                    warn!(uid = %actor.uid, %err, "actor occupant missing during clear");
                }
            }
        }
        self.by_uid.clear();
        self.inbox.clear();
    }

    // ---- tick pipeline ---------------------------------------------------

    /// Advance the simulation by one tick and return its summary.
    pub fn step(&mut self) -> TickSummary {
        self.tick = self.tick + 1;
        let now = self.tick;
        let mut counters = TickCounters::default();

        self.stage_inbox(now, &mut counters);
        self.stage_talk_expiry(now);
        self.stage_tasks(now);
        self.stage_decisions(now, &mut counters);
        self.stage_hops(now, &mut counters);
        self.stage_summary(now, &counters)
    }

    /// Drain queued boundary events.
    fn stage_inbox(&mut self, now: Tick, counters: &mut TickCounters) {
        while let Some(event) = self.inbox.pop_front() {
            counters.events += 1;
            match event {
                InboundEvent::ActorJoined {
                    uid,
                    username,
                    presence,
                } => self.spawn_actor(uid, username, presence, now),
                InboundEvent::ActorLeft { uid } => self.despawn_actor(&uid),
                InboundEvent::PresenceChanged { uid, presence } => {
                    if let Some(&id) = self.by_uid.get(&uid) {
                        self.apply_presence(id, presence, now);
                    } else {
                        debug!(%uid, "presence change for unknown actor");
                    }
                }
                InboundEvent::ChatMessage { uid, channel, .. } => {
                    counters.messages += 1;
                    self.apply_chat_message(&uid, &channel, now);
                }
            }
        }
    }

    fn spawn_actor(&mut self, uid: String, username: String, presence: Presence, now: Tick) {
        if let Some(&id) = self.by_uid.get(&uid) {
            // Duplicate join doubles as a presence refresh.
            self.apply_presence(id, presence, now);
            return;
        }
        let Some(pos) = self.world.random_empty_grid() else {
            warn!(%uid, "spawn pool exhausted, dropping join");
            return;
        };
        let Some(z) = self.world.height_at(pos) else {
            warn!(%uid, %pos, "spawn cell has no surface, dropping join");
            return;
        };
        let id = self.actors.insert(Actor::new(uid.clone(), username, pos, z));
        if let Err(err) = self.world.add_occupant(pos, z, Occupant::actor(id)) {
            warn!(%uid, %err, "spawn cell collision, dropping join");
            self.actors.remove(id);
            return;
        }
        self.order.push(id);
        self.by_uid.insert(uid, id);
        self.apply_presence(id, presence, now);
        debug!(actor = %pos, actors = self.actors.len(), "actor joined");
    }

    fn despawn_actor(&mut self, uid: &str) {
        let Some(id) = self.by_uid.remove(uid) else {
            debug!(%uid, "leave for unknown actor");
            return;
        };
        self.order.retain(|other| *other != id);
        if let Some(mut actor) = self.actors.remove(id) {
            actor.cancel_hop(&mut self.world);
            if let Err(err) = self.world.remove_occupant(actor.pos, actor.z) {
                warn!(%uid, %err, "actor occupant missing on leave");
            }
        }
    }

    /// Presence transitions. Dropping out of `Online` freezes the actor:
    /// behaviors are cleared, pending tasks cancelled, and any in-flight
    /// hop aborted so nothing can move it while away.
    fn apply_presence(&mut self, id: ActorId, presence: Presence, now: Tick) {
        let Some(actor) = self.actors.get_mut(id) else {
            return;
        };
        let was_online = actor.presence.is_online();
        actor.presence = presence;
        if presence.is_online() {
            if !actor.has_behavior(BehaviorKind::Wander) {
                let wander = Behavior::wander(now, &self.config, &mut self.rng);
                actor.attach_behavior(wander);
            }
        } else if was_online || actor.is_hopping() || !actor.behaviors.is_empty() {
            actor.behaviors.clear();
            actor.cancel_tasks();
            actor.cancel_hop(&mut self.world);
        }
    }

    /// A chat message marks the sender as talking and schedules a
    /// jittered seek for every listener engaged in the same channel. The
    /// jitter spreads reactions over following ticks so a broadcast does
    /// not path the whole herd at once.
    fn apply_chat_message(&mut self, uid: &str, channel: &str, now: Tick) {
        let Some(&sender_id) = self.by_uid.get(uid) else {
            debug!(%uid, "message from unknown actor");
            return;
        };
        if let Some(sender) = self.actors.get_mut(sender_id) {
            sender.note_own_message(channel, now);
            sender.set_talking_until(now + self.config.talk_ticks);
        }

        let window = self.config.active_channel_ticks;
        for &id in &self.order {
            if id == sender_id {
                continue;
            }
            let Some(actor) = self.actors.get_mut(id) else {
                continue;
            };
            if !actor.presence.is_online() {
                continue;
            }
            if actor.active_channel(now, window) != Some(channel) {
                continue;
            }
            let due = now + self.rng.random_range(0..=self.config.chat_jitter_ticks);
            actor.schedule_task(ScheduledTask {
                due,
                action: TaskAction::SeekSender {
                    sender_uid: uid.to_string(),
                },
            });
        }
    }

    fn stage_talk_expiry(&mut self, now: Tick) {
        for (_, actor) in self.actors.iter_mut() {
            actor.expire_talking(now);
        }
    }

    /// Fire due scheduled tasks. A seek that is already within proximity
    /// of its sender dissolves without touching the behavior list.
    fn stage_tasks(&mut self, now: Tick) {
        let positions = self.uid_positions();
        let ids: Vec<ActorId> = self.order.clone();
        for id in ids {
            let Some(actor) = self.actors.get_mut(id) else {
                continue;
            };
            for action in actor.take_due_tasks(now) {
                match action {
                    TaskAction::SeekSender { sender_uid } => {
                        if !actor.presence.is_online() {
                            continue;
                        }
                        let Some(&goal) = positions.get(sender_uid.as_str()) else {
                            continue;
                        };
                        if actor.pos.distance(goal) <= self.config.goto_proximity {
                            continue;
                        }
                        actor.behaviors.clear();
                        actor.attach_behavior(Behavior::go_to(sender_uid));
                    }
                }
            }
        }
    }

    /// Run behavior decisions for idle online actors. Each decision sees
    /// the occupancy left by earlier actors this tick; the reservation
    /// placed by a successful hop start makes check-and-claim atomic.
    fn stage_decisions(&mut self, now: Tick, counters: &mut TickCounters) {
        let positions = self.uid_positions();
        let hop_ticks = self.config.hop_ticks();
        let ids: Vec<ActorId> = self.order.clone();
        for id in ids {
            let Some(actor) = self.actors.get_mut(id) else {
                continue;
            };
            if !actor.presence.is_online() || actor.is_hopping() {
                continue;
            }
            let pos = actor.pos;
            let mut behaviors = std::mem::take(&mut actor.behaviors);
            let mut hop: Option<(i32, i32)> = None;
            let mut detached: Vec<BehaviorKind> = Vec::new();
            for behavior in behaviors.iter_mut() {
                let target = behavior
                    .target_uid()
                    .and_then(|uid| positions.get(uid).copied());
                let mut ctx = DecisionCtx {
                    now,
                    pos,
                    world: &self.world,
                    pathfinder: &self.pathfinder,
                    config: &self.config,
                    rng: &mut self.rng,
                    target,
                };
                match behavior.decide(&mut ctx) {
                    Decision::Stay => {}
                    Decision::Hop { dx, dy } => {
                        if hop.is_none() {
                            hop = Some((dx, dy));
                        }
                    }
                    Decision::Detach => detached.push(behavior.kind()),
                }
            }
            behaviors.retain(|behavior| !detached.contains(&behavior.kind()));
            actor.behaviors = behaviors;

            if detached.contains(&BehaviorKind::GoTo) {
                // Seek is over: drop its pending tasks and go back to roaming.
                actor.cancel_tasks();
                if !actor.has_behavior(BehaviorKind::Wander) {
                    let wander = Behavior::wander(now, &self.config, &mut self.rng);
                    actor.attach_behavior(wander);
                }
            }

            if let Some((dx, dy)) = hop {
                if actor.begin_hop(id, &mut self.world, dx, dy, hop_ticks, now) {
                    counters.hops_started += 1;
                }
            }
        }
    }

    /// Advance in-flight hops and finalize arrivals.
    fn stage_hops(&mut self, now: Tick, counters: &mut TickCounters) {
        let ids: Vec<ActorId> = self.order.clone();
        for id in ids {
            let Some(actor) = self.actors.get_mut(id) else {
                continue;
            };
            if actor.advance_hop(now) {
                match actor.finish_hop(id, &mut self.world) {
                    Ok(()) => counters.hops_completed += 1,
                    Err(err) => warn!(uid = %actor.uid, %err, "hop completion failed"),
                }
            }
        }
    }

    fn stage_summary(&mut self, now: Tick, counters: &TickCounters) -> TickSummary {
        let summary = TickSummary {
            tick: now,
            actors: self.actors.len(),
            events: counters.events,
            hops_started: counters.hops_started,
            hops_completed: counters.hops_completed,
            messages: counters.messages,
        };
        self.history.push_back(summary);
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
        summary
    }

    fn uid_positions(&self) -> HashMap<String, GridPos> {
        self.actors
            .values()
            .map(|actor| (actor.uid.clone(), actor.pos))
            .collect()
    }
}
