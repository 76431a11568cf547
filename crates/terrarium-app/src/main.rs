use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use terrarium_app::headless::Headless;
use terrarium_app::renderer::{Renderer, RendererContext};
use terrarium_app::roster::{MessageRecord, Roster, RosterHandle, UserRecord};
use terrarium_app::SharedTerrarium;
use terrarium_core::{TerrariumConfig, TerrariumState};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();
    let state = bootstrap_world()?;
    let roster = Roster::new();
    let feed = spawn_demo_feed(roster.handle());

    info!("Starting terrarium demo loop");
    let renderer = Headless::default();
    renderer.run(RendererContext { state, roster })?;
    drop(feed);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap_world() -> Result<SharedTerrarium> {
    let config = TerrariumConfig {
        rng_seed: std::env::var("TERRARIUM_SEED")
            .ok()
            .and_then(|raw| raw.parse().ok()),
        ..TerrariumConfig::default()
    };
    let state = TerrariumState::new(config)?;
    let bounds = state.world().pixel_bounds();
    info!(
        slabs = state.world().slab_count(),
        tiles = state.world().tiles().len(),
        width = bounds.width(),
        height = bounds.height(),
        "World bootstrapped"
    );
    Ok(Arc::new(Mutex::new(state)))
}

/// Feed a scripted community into the roster from a side thread, the way
/// network traffic would arrive.
fn spawn_demo_feed(handle: RosterHandle) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let members = [
            ("u-ada", "ada"),
            ("u-grace", "grace"),
            ("u-edsger", "edsger"),
            ("u-barbara", "barbara"),
            ("u-donald", "donald"),
            ("u-alan", "alan"),
        ];
        for (uid, username) in members {
            handle.add_actor(UserRecord {
                uid: uid.into(),
                username: username.into(),
                presence: "online".into(),
            });
        }

        // Let everyone settle into the same channel, then have one member
        // call the others over every so often.
        std::thread::sleep(Duration::from_secs(2));
        for (uid, _) in members {
            handle.queue_message(MessageRecord {
                uid: uid.into(),
                channel: "general".into(),
                text: "hello".into(),
            });
        }
        for round in 0..4u32 {
            std::thread::sleep(Duration::from_secs(10));
            let (uid, _) = members[round as usize % members.len()];
            handle.queue_message(MessageRecord {
                uid: uid.into(),
                channel: "general".into(),
                text: format!("gather round ({round})"),
            });
        }
        std::thread::sleep(Duration::from_secs(5));
        handle.update_actor("u-alan", "offline");
    })
}
