//! Boundary plumbing around the terrarium core: the roster feed and the
//! renderer seam.

use std::sync::{Arc, Mutex};

use terrarium_core::TerrariumState;

pub type SharedTerrarium = Arc<Mutex<TerrariumState>>;

pub mod headless;
pub mod roster;

pub mod renderer {
    use anyhow::Result;

    use crate::SharedTerrarium;
    use crate::roster::Roster;

    /// Shared context passed to renderer implementations.
    pub struct RendererContext {
        pub state: SharedTerrarium,
        pub roster: Roster,
    }

    pub trait Renderer {
        /// Stable identifier describing the renderer implementation
        /// (e.g., "headless", "canvas").
        fn name(&self) -> &'static str;

        /// Launch the renderer; blocks until the session completes.
        fn run(&self, ctx: RendererContext) -> Result<()>;
    }
}

pub use roster::{FeedEvent, MessageRecord, Roster, RosterHandle, UserRecord};
