//! The roster feed: already-deserialized member, presence and chat
//! records arriving from the network layer, queued over a channel and
//! translated into core events at the tick boundary.

use crossbeam_channel::{Receiver, Sender, TrySendError, unbounded};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use terrarium_core::{InboundEvent, Presence, TerrariumState};

/// One community member as the network layer reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    pub username: String,
    /// Raw presence string; unknown values count as offline.
    pub presence: String,
}

/// One chat message as the network layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub uid: String,
    pub channel: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Joined(UserRecord),
    Left { uid: String },
    Presence { uid: String, presence: String },
    Message(MessageRecord),
    /// Server switch: drop every actor before anything else arrives.
    Clear,
}

/// Cloneable producer side of the roster feed, handed to whatever thread
/// receives network traffic.
#[derive(Debug, Clone)]
pub struct RosterHandle {
    tx: Sender<FeedEvent>,
}

impl RosterHandle {
    pub fn add_actor(&self, user: UserRecord) {
        self.send(FeedEvent::Joined(user));
    }

    pub fn remove_actor(&self, uid: impl Into<String>) {
        self.send(FeedEvent::Left { uid: uid.into() });
    }

    pub fn update_actor(&self, uid: impl Into<String>, presence: impl Into<String>) {
        self.send(FeedEvent::Presence {
            uid: uid.into(),
            presence: presence.into(),
        });
    }

    pub fn queue_message(&self, message: MessageRecord) {
        self.send(FeedEvent::Message(message));
    }

    /// Tear down all actors, e.g. when the user switches servers.
    pub fn clear(&self) {
        self.send(FeedEvent::Clear);
    }

    fn send(&self, event: FeedEvent) {
        if let Err(TrySendError::Disconnected(_)) = self.tx.try_send(event) {
            warn!("roster feed consumer is gone, dropping event");
        }
    }
}

/// Consumer side of the roster feed. Owned by the tick loop; drained
/// right before each step so network arrivals only ever take effect at a
/// tick boundary.
#[derive(Debug)]
pub struct Roster {
    tx: Sender<FeedEvent>,
    rx: Receiver<FeedEvent>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    #[must_use]
    pub fn handle(&self) -> RosterHandle {
        RosterHandle {
            tx: self.tx.clone(),
        }
    }

    /// Move every pending feed event into the simulation. Returns how
    /// many events were forwarded.
    pub fn drain_into(&self, state: &mut TerrariumState) -> usize {
        let mut forwarded = 0;
        while let Ok(event) = self.rx.try_recv() {
            forwarded += 1;
            match event {
                FeedEvent::Joined(user) => state.queue_event(InboundEvent::ActorJoined {
                    uid: user.uid,
                    username: user.username,
                    presence: Presence::parse(&user.presence),
                }),
                FeedEvent::Left { uid } => state.queue_event(InboundEvent::ActorLeft { uid }),
                FeedEvent::Presence { uid, presence } => {
                    state.queue_event(InboundEvent::PresenceChanged {
                        uid,
                        presence: Presence::parse(&presence),
                    });
                }
                FeedEvent::Message(message) => state.queue_event(InboundEvent::ChatMessage {
                    uid: message.uid,
                    channel: message.channel,
                    text: message.text,
                }),
                FeedEvent::Clear => {
                    debug!("roster clear: destroying all actors");
                    state.clear_actors();
                }
            }
        }
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrarium_core::TerrariumConfig;

    fn state() -> TerrariumState {
        let config = TerrariumConfig {
            rng_seed: Some(8),
            ..TerrariumConfig::default()
        };
        TerrariumState::new(config).expect("state")
    }

    #[test]
    fn feed_events_reach_the_simulation() {
        let roster = Roster::new();
        let handle = roster.handle();
        let mut state = state();

        handle.add_actor(UserRecord {
            uid: "u1".into(),
            username: "pat".into(),
            presence: "online".into(),
        });
        handle.queue_message(MessageRecord {
            uid: "u1".into(),
            channel: "general".into(),
            text: "hi".into(),
        });

        assert_eq!(roster.drain_into(&mut state), 2);
        let summary = state.step();
        assert_eq!(summary.events, 2);
        assert_eq!(summary.messages, 1);
        assert!(state.actor_by_uid("u1").is_some());
    }

    #[test]
    fn unknown_presence_strings_spawn_frozen_actors() {
        let roster = Roster::new();
        let handle = roster.handle();
        let mut state = state();

        handle.add_actor(UserRecord {
            uid: "u1".into(),
            username: "pat".into(),
            presence: "streaming".into(),
        });
        roster.drain_into(&mut state);
        state.step();
        let actor = state.actor_by_uid("u1").expect("actor");
        assert!(!actor.presence.is_online());
        assert!(actor.behaviors.is_empty());
    }

    #[test]
    fn clear_destroys_all_actors() {
        let roster = Roster::new();
        let handle = roster.handle();
        let mut state = state();

        for i in 0..3 {
            handle.add_actor(UserRecord {
                uid: format!("u{i}"),
                username: format!("name{i}"),
                presence: "online".into(),
            });
        }
        roster.drain_into(&mut state);
        state.step();
        assert_eq!(state.actor_count(), 3);

        handle.clear();
        roster.drain_into(&mut state);
        assert_eq!(state.actor_count(), 0);
    }
}
