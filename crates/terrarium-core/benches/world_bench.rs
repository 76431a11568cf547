use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use terrarium_core::{InboundEvent, Presence, TerrariumConfig, TerrariumState};

fn populated_state(actors: usize) -> TerrariumState {
    let config = TerrariumConfig {
        rng_seed: Some(42),
        wander_delay_min: 5,
        wander_delay_max: 30,
        ..TerrariumConfig::default()
    };
    let mut state = TerrariumState::new(config).expect("state");
    for i in 0..actors {
        state.queue_event(InboundEvent::ActorJoined {
            uid: format!("u{i}"),
            username: format!("member-{i}"),
            presence: Presence::Online,
        });
    }
    state.step();
    state
}

fn bench_generation(c: &mut Criterion) {
    c.bench_function("generate_world_32", |b| {
        b.iter(|| {
            let config = TerrariumConfig {
                rng_seed: Some(7),
                ..TerrariumConfig::default()
            };
            black_box(TerrariumState::new(config).expect("state"))
        });
    });
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for actors in [10usize, 50, 200] {
        group.bench_function(format!("{actors}_actors"), |b| {
            let mut state = populated_state(actors);
            b.iter(|| black_box(state.step()));
        });
    }
    group.finish();
}

fn bench_chat_burst(c: &mut Criterion) {
    c.bench_function("chat_burst_50_actors", |b| {
        let mut state = populated_state(50);
        for i in 0..50 {
            state.queue_event(InboundEvent::ChatMessage {
                uid: format!("u{i}"),
                channel: "general".into(),
                text: "hello".into(),
            });
        }
        state.step();
        b.iter(|| {
            state.queue_event(InboundEvent::ChatMessage {
                uid: "u0".into(),
                channel: "general".into(),
                text: "ping".into(),
            });
            black_box(state.step())
        });
    });
}

criterion_group!(benches, bench_generation, bench_step, bench_chat_burst);
criterion_main!(benches);
