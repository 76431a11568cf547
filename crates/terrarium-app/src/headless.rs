//! Headless renderer: drives the tick loop at a fixed rate and logs what
//! a graphical frontend would draw.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use terrarium_core::{ScreenPoint, SpriteDescriptor, Tick};

use crate::renderer::{Renderer, RendererContext};

/// Nominal tick rate of the demo loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// What one actor looks like to a frontend this tick.
#[derive(Debug, Serialize)]
struct ActorFrame {
    uid: String,
    screen: ScreenPoint,
    z_depth: f32,
    sprite: SpriteDescriptor,
    talking: bool,
}

#[derive(Debug, Serialize)]
struct RenderSnapshot {
    tick: Tick,
    actors: Vec<ActorFrame>,
}

/// Renderer that draws nothing: it steps the simulation and periodically
/// serializes the render feed so the pipeline can be observed in logs.
pub struct Headless {
    /// Total ticks to run before returning.
    pub ticks: u64,
    /// Ticks between render snapshot dumps.
    pub snapshot_every: u64,
}

impl Default for Headless {
    fn default() -> Self {
        Self {
            ticks: 1200,
            snapshot_every: 100,
        }
    }
}

impl Renderer for Headless {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn run(&self, ctx: RendererContext) -> Result<()> {
        for _ in 0..self.ticks {
            let started = Instant::now();
            let summary = {
                let mut state = ctx
                    .state
                    .lock()
                    .map_err(|_| anyhow::anyhow!("simulation mutex poisoned"))?;
                ctx.roster.drain_into(&mut state);
                let summary = state.step();

                if summary.tick.0 % self.snapshot_every == 0 {
                    let snapshot = RenderSnapshot {
                        tick: summary.tick,
                        actors: state
                            .actors()
                            .map(|(_, actor)| ActorFrame {
                                uid: actor.uid.clone(),
                                screen: actor.screen_position(),
                                z_depth: actor.z_depth(),
                                sprite: actor.sprite(summary.tick),
                                talking: actor.is_talking(summary.tick),
                            })
                            .collect(),
                    };
                    let json = serde_json::to_string(&snapshot)
                        .context("serializing render snapshot")?;
                    debug!(frame = %json, "render snapshot");
                }
                summary
            };

            if summary.tick.0 % 200 == 0 {
                info!(
                    tick = summary.tick.0,
                    actors = summary.actors,
                    hops_started = summary.hops_started,
                    hops_completed = summary.hops_completed,
                    messages = summary.messages,
                    "tick summary"
                );
            }

            if let Some(rest) = TICK_INTERVAL.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        Ok(())
    }
}
