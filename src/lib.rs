//! Void Arena - a top-down arena shooter simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, bosses, game flow)
//! - `audio`: Fire-and-forget sound/music event boundary
//! - `persistence`: Save/load of the permanent upgrades record
//! - `lore`: Streaming lore-oracle boundary
//! - `settings`: User preferences

pub mod audio;
pub mod lore;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use persistence::SaveData;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Arena dimensions (world units)
    pub const ARENA_WIDTH: f32 = 1280.0;
    pub const ARENA_HEIGHT: f32 = 720.0;

    /// Frame delta is clamped to this to bound integration error on hitches
    pub const MAX_DT: f32 = 0.05;

    /// Player defaults
    pub const PLAYER_WIDTH: f32 = 30.0;
    pub const PLAYER_HEIGHT: f32 = 40.0;
    pub const PLAYER_BASE_SPEED: f32 = 300.0;
    pub const PLAYER_BASE_SHOOT_RATE: f32 = 5.0;
    pub const PLAYER_BASE_DASH_COOLDOWN: f32 = 1.5;
    pub const PLAYER_BASE_MAX_HEALTH: f32 = 10.0;
    pub const PLAYER_BULLET_SPEED: f32 = 800.0;

    /// Dash tuning
    pub const DASH_DURATION: f32 = 0.15;
    pub const DASH_SPEED: f32 = 1000.0;
    pub const DASH_INVINCIBILITY: f32 = 0.3;

    /// Invincibility window after taking a hit
    pub const HIT_INVINCIBILITY: f32 = 0.8;

    /// Ultimate meter
    pub const MAX_ULTIMATE_CHARGE: f32 = 100.0;
    pub const ULTIMATE_CHARGE_RATE: f32 = 2.0;

    /// Boss flow windows (seconds)
    pub const BOSS_INTRO_DURATION: f32 = 3.0;
    pub const PHASE_TRANSITION_DURATION: f32 = 2.0;

    /// Gravity wells don't pull bullets inside this squared distance,
    /// so captured bullets don't jitter at the core
    pub const WELL_BULLET_EXCLUSION_SQ: f32 = 2500.0;

    /// Hub interactable activation radius
    pub const INTERACT_RADIUS: f32 = 100.0;
}
