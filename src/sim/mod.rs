//! Deterministic simulation core.
//!
//! All gameplay logic lives here. This module must stay pure and
//! deterministic: seeded RNG only, no rendering or platform dependencies.
//! The shell feeds in a `TickInput` each frame and reads back a `Snapshot`
//! plus queued audio cues.

pub mod bosses;
pub mod bullet;
pub mod effects;
pub mod enemy;
pub mod entity;
pub mod game;
pub mod geom;
pub mod hazards;
pub mod interact;
pub mod obstacle;
pub mod player;
pub mod scheduler;
pub mod stages;

pub use game::{Game, GamePhase, Snapshot, TickInput};
