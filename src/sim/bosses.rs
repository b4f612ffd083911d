//! The seven arena bosses and the glitch clone.
//!
//! Bosses share one struct; per-variant behavior and mutable pattern state
//! live in `BossKind`. Staggered attacks go through the deferred scheduler
//! so a boss killed mid-volley stops firing.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;
use crate::consts;

use super::bullet::{self, Bullet, BulletOwner};
use super::effects::{self, FloatingText, Particle, ScreenShake};
use super::enemy::Enemy;
use super::entity::{Body, EntityId, IdGen};
use super::hazards::{GravityWell, Hazard, SlowZone};
use super::obstacle::Obstacle;
use super::scheduler::{DeferredAction, Owner, Scheduler};

/// Stable boss identity, used by stage config and the test chamber roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossId {
    CyberStallion,
    SwarmSovereign,
    GlitchEntity,
    ForgeMaster,
    CrystalWeaver,
    SunkenHorror,
    VoidTitan,
}

impl BossId {
    pub const ALL: [BossId; 7] = [
        BossId::CyberStallion,
        BossId::SwarmSovereign,
        BossId::GlitchEntity,
        BossId::ForgeMaster,
        BossId::CrystalWeaver,
        BossId::SunkenHorror,
        BossId::VoidTitan,
    ];

    pub fn from_config(id: &str) -> Option<Self> {
        match id {
            "stallion" => Some(BossId::CyberStallion),
            "sovereign" => Some(BossId::SwarmSovereign),
            "glitch" => Some(BossId::GlitchEntity),
            "forge" => Some(BossId::ForgeMaster),
            "weaver" => Some(BossId::CrystalWeaver),
            "horror" => Some(BossId::SunkenHorror),
            "titan" => Some(BossId::VoidTitan),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BossId::CyberStallion => "Cyber Stallion",
            BossId::SwarmSovereign => "Swarm Sovereign",
            BossId::GlitchEntity => "Glitch Entity",
            BossId::ForgeMaster => "Forge Master",
            BossId::CrystalWeaver => "Crystal Weaver",
            BossId::SunkenHorror => "Sunken Horror",
            BossId::VoidTitan => "Void Titan",
        }
    }
}

/// Per-variant pattern state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BossKind {
    CyberStallion {
        move_target: Vec2,
        move_timer: f32,
        attack_timer: f32,
        charge_timer: f32,
        telegraphing: bool,
        charging: bool,
        charge_target: Vec2,
    },
    SwarmSovereign {
        attack_timer: f32,
        spawn_timer: f32,
        spawning: bool,
    },
    GlitchEntity {
        teleport_timer: f32,
        attack_timer: f32,
    },
    GlitchClone {
        lifespan: f32,
    },
    ForgeMaster {
        attack_timer: f32,
    },
    CrystalWeaver {
        move_target: Vec2,
        move_timer: f32,
        attack_timer: f32,
        crystal_timer: f32,
    },
    SunkenHorror {
        attack_timer: f32,
        pulling: bool,
    },
    VoidTitan {
        attack_timer: f32,
        pattern: u32,
        spiral_angle: f32,
    },
}

/// Player state visible to bosses this tick.
#[derive(Debug, Clone, Copy)]
pub struct PlayerRef {
    pub center: Vec2,
    pub pos: Vec2,
}

/// Disjoint slices of game state a boss may touch during its update.
pub struct BossCtx<'a> {
    pub ids: &'a mut IdGen,
    pub rng: &'a mut Pcg32,
    pub player: Option<PlayerRef>,
    pub enemy_bullets: &'a mut Vec<Bullet>,
    pub enemies: &'a mut Vec<Enemy>,
    pub obstacles: &'a mut Vec<Obstacle>,
    pub hazards: &'a mut Vec<Hazard>,
    pub slow_zones: &'a mut Vec<SlowZone>,
    pub floating_text: &'a mut Vec<FloatingText>,
    pub particles: &'a mut Vec<Particle>,
    /// Bosses spawned mid-update (glitch clones).
    pub spawned: &'a mut Vec<Boss>,
    pub scheduler: &'a mut Scheduler,
    pub well: &'a mut Option<GravityWell>,
    pub shake: &'a mut ScreenShake,
    pub cues: &'a mut Vec<SoundCue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Boss {
    pub body: Body,
    pub name: &'static str,
    pub shard_value: u32,
    pub phase: u8,
    pub transitioning: bool,
    transition_timer: f32,
    taunt_timer: f32,
    taunts: &'static [&'static str],
    pub kind: BossKind,
}

const STALLION_TAUNTS: &[&str] = &[
    "Resistance is futile.",
    "Your efforts are insignificant.",
    "Behold, true power!",
];
const SOVEREIGN_TAUNTS: &[&str] = &[
    "The hive is eternal!",
    "You face a legion.",
    "We are one.",
];
const GLITCH_TAUNTS: &[&str] = &[
    "3rr0r: P@th_n0t_f0und",
    "UnExPeCtEd iNpUt.",
    "NullReferenceException: player.hope",
];
const FORGE_TAUNTS: &[&str] = &[
    "Feel the heat of the forge!",
    "I will smelt you down!",
    "Your end will be tempered in fire.",
];
const WEAVER_TAUNTS: &[&str] = &[
    "Behold my crystalline perfection!",
    "You will shatter!",
    "Gaze upon true beauty before you perish.",
];
const HORROR_TAUNTS: &[&str] = &[
    "The abyss calls to you.",
    "You are out of your depth.",
    "Drown in despair.",
];
const TITAN_TAUNTS: &[&str] = &[
    "I am the end of all things.",
    "The void is inevitable.",
    "You are but a speck of dust.",
];

impl Boss {
    pub fn spawn(id: BossId, entity_id: EntityId, pos: Vec2, rng: &mut Pcg32) -> Self {
        let (size, health, shard_value, taunts, kind) = match id {
            BossId::CyberStallion => (
                Vec2::new(100.0, 120.0),
                400.0,
                150,
                STALLION_TAUNTS,
                BossKind::CyberStallion {
                    move_target: Vec2::new(
                        rng.random_range(100.0..consts::ARENA_WIDTH - 100.0),
                        rng.random_range(100.0..consts::ARENA_HEIGHT / 2.0),
                    ),
                    move_timer: rng.random_range(2.0..4.0),
                    attack_timer: 2.0,
                    charge_timer: 5.0,
                    telegraphing: false,
                    charging: false,
                    charge_target: Vec2::ZERO,
                },
            ),
            BossId::SwarmSovereign => (
                Vec2::splat(120.0),
                500.0,
                200,
                SOVEREIGN_TAUNTS,
                BossKind::SwarmSovereign {
                    attack_timer: 2.5,
                    spawn_timer: 5.0,
                    spawning: false,
                },
            ),
            BossId::GlitchEntity => (
                Vec2::splat(80.0),
                600.0,
                250,
                GLITCH_TAUNTS,
                BossKind::GlitchEntity {
                    teleport_timer: 2.5,
                    attack_timer: 0.5,
                },
            ),
            BossId::ForgeMaster => (
                Vec2::splat(150.0),
                700.0,
                300,
                FORGE_TAUNTS,
                BossKind::ForgeMaster { attack_timer: 4.0 },
            ),
            BossId::CrystalWeaver => (
                Vec2::splat(100.0),
                550.0,
                350,
                WEAVER_TAUNTS,
                BossKind::CrystalWeaver {
                    move_target: Vec2::new(
                        rng.random_range(100.0..consts::ARENA_WIDTH - 100.0),
                        rng.random_range(100.0..consts::ARENA_HEIGHT - 100.0),
                    ),
                    move_timer: rng.random_range(3.0..5.0),
                    attack_timer: 2.0,
                    crystal_timer: 8.0,
                },
            ),
            BossId::SunkenHorror => (
                Vec2::new(200.0, 180.0),
                800.0,
                400,
                HORROR_TAUNTS,
                BossKind::SunkenHorror {
                    attack_timer: 3.0,
                    pulling: false,
                },
            ),
            BossId::VoidTitan => (
                Vec2::splat(250.0),
                1000.0,
                500,
                TITAN_TAUNTS,
                BossKind::VoidTitan {
                    attack_timer: 3.5,
                    pattern: 0,
                    spiral_angle: 0.0,
                },
            ),
        };

        Self {
            body: Body::new(entity_id, pos, size, health),
            name: id.display_name(),
            shard_value,
            phase: 1,
            transitioning: false,
            transition_timer: 0.0,
            taunt_timer: rng.random_range(3.0..5.0),
            taunts,
            kind,
        }
    }

    /// Decoy left behind by the glitch entity's phase-2 teleport. Unkillable,
    /// burns out on its own, never counts as a boss defeat.
    pub fn spawn_clone(entity_id: EntityId, pos: Vec2) -> Self {
        let mut body = Body::new(entity_id, pos, Vec2::splat(80.0), f32::INFINITY);
        body.invincible = true;
        Self {
            body,
            name: "clone",
            shard_value: 0,
            phase: 1,
            transitioning: false,
            transition_timer: 0.0,
            taunt_timer: f32::INFINITY,
            taunts: &[],
            kind: BossKind::GlitchClone { lifespan: 1.5 },
        }
    }

    pub fn is_clone(&self) -> bool {
        matches!(self.kind, BossKind::GlitchClone { .. })
    }

    pub fn update(&mut self, dt: f32, ctx: &mut BossCtx) {
        if let BossKind::GlitchClone { .. } = self.kind {
            self.update_clone(dt, ctx);
            return;
        }

        if self.transitioning {
            self.transition_timer -= dt;
            if self.transition_timer <= 0.0 {
                self.transitioning = false;
                self.body.invincible = false;
            }
            return;
        }

        // Committed states freeze the boss until the scheduler releases it
        let busy = matches!(
            self.kind,
            BossKind::CyberStallion { telegraphing: true, .. }
                | BossKind::SwarmSovereign { spawning: true, .. }
                | BossKind::SunkenHorror { pulling: true, .. }
        );
        if busy {
            self.body.vel = Vec2::ZERO;
            return;
        }

        self.handle_taunts(dt, ctx);

        if self.phase == 1 && self.body.health < self.body.max_health * 0.5 {
            self.phase = 2;
            self.begin_transition(ctx);
        }

        let phase2 = self.phase == 2;
        let id = self.body.id;
        let owner = Owner::Boss(id);
        let center = self.body.center();

        match &mut self.kind {
            BossKind::GlitchClone { .. } => unreachable!("handled above"),
            BossKind::CyberStallion {
                move_target,
                move_timer,
                attack_timer,
                charge_timer,
                telegraphing,
                charging,
                charge_target,
            } => {
                if *charging {
                    if center.distance(*charge_target) < 50.0 {
                        self.body.vel = Vec2::ZERO;
                        *charging = false;
                        ctx.shake.trigger(8.0, 0.2);
                    }
                } else {
                    waypoint_move(
                        &mut self.body,
                        dt,
                        move_target,
                        move_timer,
                        150.0,
                        5.0,
                        consts::ARENA_HEIGHT / 2.0,
                        (2.0, 4.0),
                        ctx.rng,
                    );

                    *attack_timer -= dt;
                    if *attack_timer <= 0.0 && ctx.player.is_some() {
                        if phase2 && ctx.rng.random_range(0.0..10.0) > 6.0 {
                            // Homing missile pair
                            for i in 0..2 {
                                ctx.scheduler.schedule(
                                    i as f32 * 0.2,
                                    owner,
                                    DeferredAction::StallionShot {
                                        speed: 300.0,
                                        homing: 200.0,
                                    },
                                );
                            }
                        } else {
                            // Staggered laser burst
                            for i in 0..3 {
                                ctx.scheduler.schedule(
                                    i as f32 * 0.1,
                                    owner,
                                    DeferredAction::StallionShot {
                                        speed: 450.0,
                                        homing: 0.0,
                                    },
                                );
                            }
                        }
                        *attack_timer = if phase2 {
                            ctx.rng.random_range(0.8..1.5)
                        } else {
                            ctx.rng.random_range(1.5..2.5)
                        };
                    }

                    *charge_timer -= dt;
                    if *charge_timer <= 0.0 && phase2 {
                        if let Some(player) = ctx.player {
                            *telegraphing = true;
                            self.body.vel = Vec2::ZERO;
                            *charge_target = player.center;
                            ctx.hazards.push(Hazard::beam(
                                ctx.ids.next(),
                                center,
                                player.center - center,
                                1.0,
                                0.0,
                                true,
                            ));
                            ctx.scheduler.schedule(
                                1.0,
                                owner,
                                DeferredAction::StallionCharge {
                                    target: player.center,
                                },
                            );
                            *charge_timer = ctx.rng.random_range(6.0..8.0);
                        }
                    }
                }
                self.body.integrate(dt);
            }
            BossKind::SwarmSovereign {
                attack_timer,
                spawn_timer,
                spawning,
            } => {
                if let Some(player) = ctx.player {
                    let delta = player.center - center;
                    let dist = delta.length();
                    if dist > 300.0 {
                        self.body.vel = delta.normalize_or_zero() * 50.0;
                    } else {
                        let strafe = delta.y.atan2(delta.x) + std::f32::consts::FRAC_PI_2;
                        self.body.vel = Vec2::from_angle(strafe) * 50.0 * 0.7;
                    }

                    *spawn_timer -= dt;
                    if *spawn_timer <= 0.0 {
                        *spawning = true;
                        self.body.invincible = true;
                        ctx.cues.push(SoundCue::Shoot);
                        let count = if phase2 { 3 } else { 2 };
                        for i in 0..count {
                            ctx.scheduler.schedule(
                                i as f32 * 0.3,
                                owner,
                                DeferredAction::SovereignSpawn,
                            );
                        }
                        ctx.scheduler.schedule(
                            count as f32 * 0.3,
                            owner,
                            DeferredAction::SovereignSpawnEnd,
                        );
                        *spawn_timer = if phase2 {
                            ctx.rng.random_range(3.0..5.0)
                        } else {
                            ctx.rng.random_range(5.0..7.0)
                        };
                    }

                    *attack_timer -= dt;
                    if *attack_timer <= 0.0 {
                        let aim = angle_to(center, player.center);
                        let count = if phase2 { 8 } else { 5 };
                        for _ in 0..count {
                            let angle = aim
                                + ctx.rng.random_range(
                                    -std::f32::consts::FRAC_PI_8..std::f32::consts::FRAC_PI_8,
                                );
                            let speed = ctx.rng.random_range(300.0..450.0);
                            ctx.enemy_bullets.push(Bullet::new(
                                ctx.ids.next(),
                                center,
                                Vec2::from_angle(angle) * speed,
                                Vec2::splat(8.0),
                                BulletOwner::Enemy,
                                0.8,
                            ));
                        }
                        *attack_timer = if phase2 {
                            ctx.rng.random_range(1.0..2.0)
                        } else {
                            ctx.rng.random_range(2.0..3.0)
                        };
                    }
                } else {
                    self.body.vel = Vec2::ZERO;
                }
                self.body.integrate(dt);
            }
            BossKind::GlitchEntity {
                teleport_timer,
                attack_timer,
            } => {
                self.body.vel = Vec2::ZERO;

                *teleport_timer -= dt;
                if *teleport_timer <= 0.0 {
                    if phase2 {
                        ctx.spawned
                            .push(Boss::spawn_clone(ctx.ids.next(), self.body.pos));
                    }
                    effects::spawn_burst(ctx.particles, ctx.rng, center, "#f0f", true);
                    self.body.pos = Vec2::new(
                        ctx.rng
                            .random_range(50.0..consts::ARENA_WIDTH - 50.0 - self.body.size.x),
                        ctx.rng
                            .random_range(50.0..consts::ARENA_HEIGHT - 50.0 - self.body.size.y),
                    );
                    effects::spawn_burst(ctx.particles, ctx.rng, self.body.center(), "#f0f", true);
                    *teleport_timer = if phase2 {
                        ctx.rng.random_range(1.5..2.5)
                    } else {
                        ctx.rng.random_range(2.0..3.0)
                    };
                }

                *attack_timer -= dt;
                if *attack_timer <= 0.0 {
                    if let Some(player) = ctx.player {
                        let angle = angle_to(self.body.center(), player.center)
                            + ctx.rng.random_range(-0.5..0.5);
                        let speed = ctx.rng.random_range(200.0..600.0);
                        ctx.enemy_bullets.push(Bullet::new(
                            ctx.ids.next(),
                            self.body.center(),
                            Vec2::from_angle(angle) * speed,
                            Vec2::splat(10.0),
                            BulletOwner::Enemy,
                            1.0,
                        ));
                    }
                    *attack_timer = if phase2 {
                        ctx.rng.random_range(0.1..0.3)
                    } else {
                        ctx.rng.random_range(0.3..0.6)
                    };
                }
            }
            BossKind::ForgeMaster { attack_timer } => {
                self.body.vel = Vec2::ZERO;

                *attack_timer -= dt;
                if *attack_timer <= 0.0 && ctx.player.is_some() {
                    if ctx.rng.random_range(0.0..10.0) > 5.0 {
                        // Hammer slam, arena-wide shock
                        effects::spawn_burst(ctx.particles, ctx.rng, center, "#fa0", true);
                        ctx.shake.trigger(15.0, 0.5);
                    } else {
                        let count = if phase2 { 5 } else { 3 };
                        for i in 0..count {
                            ctx.scheduler.schedule(
                                i as f32 * 0.2,
                                owner,
                                DeferredAction::MortarTelegraph,
                            );
                        }
                    }
                    *attack_timer = if phase2 {
                        ctx.rng.random_range(2.0..3.0)
                    } else {
                        ctx.rng.random_range(3.0..4.0)
                    };
                }
                self.body.integrate(dt);
            }
            BossKind::CrystalWeaver {
                move_target,
                move_timer,
                attack_timer,
                crystal_timer,
            } => {
                waypoint_move(
                    &mut self.body,
                    dt,
                    move_target,
                    move_timer,
                    100.0,
                    10.0,
                    consts::ARENA_HEIGHT - 100.0,
                    (3.0, 5.0),
                    ctx.rng,
                );

                if let Some(player) = ctx.player {
                    *attack_timer -= dt;
                    if *attack_timer <= 0.0 {
                        let aim = angle_to(center, player.center);
                        let count: i32 = if phase2 { 5 } else { 3 };
                        let ricochet = if phase2 { 2 } else { 1 };
                        for i in 0..count {
                            let angle =
                                aim + (i - count / 2) as f32 * std::f32::consts::PI / 8.0;
                            ctx.enemy_bullets.push(
                                Bullet::new(
                                    ctx.ids.next(),
                                    center,
                                    Vec2::from_angle(angle) * 400.0,
                                    Vec2::splat(10.0),
                                    BulletOwner::Enemy,
                                    1.0,
                                )
                                .with_ricochet(ricochet),
                            );
                        }
                        *attack_timer = if phase2 {
                            ctx.rng.random_range(0.8..1.2)
                        } else {
                            ctx.rng.random_range(1.5..2.5)
                        };
                    }

                    *crystal_timer -= dt;
                    if *crystal_timer <= 0.0 {
                        let total = if phase2 { 3 } else { 2 };
                        for i in 0..total {
                            let spot = if i == 0 {
                                player.center
                                    + Vec2::new(
                                        ctx.rng.random_range(-150.0..150.0),
                                        ctx.rng.random_range(-150.0..150.0),
                                    )
                            } else {
                                Vec2::new(
                                    ctx.rng.random_range(100.0..consts::ARENA_WIDTH - 100.0),
                                    ctx.rng.random_range(100.0..consts::ARENA_HEIGHT - 100.0),
                                )
                            };
                            ctx.obstacles.push(Obstacle::new(ctx.ids.next(), spot, ctx.rng));
                        }
                        *crystal_timer = if phase2 {
                            ctx.rng.random_range(5.0..8.0)
                        } else {
                            ctx.rng.random_range(8.0..12.0)
                        };
                    }
                }
                self.body.integrate(dt);
            }
            BossKind::SunkenHorror {
                attack_timer,
                pulling,
            } => {
                if let Some(player) = ctx.player {
                    let delta = player.center - center;
                    self.body.vel = delta.normalize_or_zero() * 80.0;

                    *attack_timer -= dt;
                    if *attack_timer <= 0.0 {
                        let roll = ctx.rng.random_range(0.0..10.0);
                        if roll > 6.0 && phase2 {
                            *pulling = true;
                            self.body.vel = Vec2::ZERO;
                            *ctx.well = Some(GravityWell {
                                center,
                                radius: 800.0,
                                strength: 150.0,
                            });
                            ctx.scheduler.schedule(
                                3.0,
                                Owner::Run,
                                DeferredAction::WhirlpoolEnd { boss: id, center },
                            );
                        } else if roll > 3.0 {
                            let count = if phase2 { 24 } else { 12 };
                            let aim = angle_to(center, player.center);
                            for i in 0..count {
                                ctx.scheduler.schedule(
                                    i as f32 / count as f32 * 1.5,
                                    owner,
                                    DeferredAction::TorrentShot {
                                        origin: center,
                                        angle: aim
                                            + (i as f32 / 3.0).sin()
                                                * std::f32::consts::FRAC_PI_4,
                                    },
                                );
                            }
                        } else {
                            let count = if phase2 { 3 } else { 1 };
                            for _ in 0..count {
                                let spot = player.center
                                    + Vec2::new(
                                        ctx.rng.random_range(-150.0..150.0),
                                        ctx.rng.random_range(-150.0..150.0),
                                    );
                                ctx.hazards.push(Hazard::ink_pool(ctx.ids.next(), spot));
                                ctx.slow_zones.push(SlowZone::new(spot, 70.0, 0.5, 8.0));
                            }
                        }
                        *attack_timer = if phase2 {
                            ctx.rng.random_range(1.0..2.0)
                        } else {
                            ctx.rng.random_range(2.0..3.0)
                        };
                    }
                } else {
                    self.body.vel = Vec2::ZERO;
                }
                self.body.integrate(dt);
            }
            BossKind::VoidTitan {
                attack_timer,
                pattern,
                spiral_angle,
            } => {
                self.body.vel = Vec2::ZERO;

                *attack_timer -= dt;
                if *attack_timer <= 0.0 {
                    if let Some(player) = ctx.player {
                        let patterns = if phase2 { 4 } else { 3 };
                        match *pattern % patterns {
                            0 => {
                                let arms = if phase2 { 6 } else { 4 };
                                for i in 0..arms {
                                    let angle = *spiral_angle
                                        + i as f32 * std::f32::consts::TAU / arms as f32;
                                    ctx.enemy_bullets.push(Bullet::new(
                                        ctx.ids.next(),
                                        center,
                                        Vec2::from_angle(angle) * 350.0,
                                        Vec2::splat(15.0),
                                        BulletOwner::Enemy,
                                        1.0,
                                    ));
                                }
                            }
                            1 => {
                                let count: i32 = if phase2 { 11 } else { 7 };
                                let spread = std::f32::consts::FRAC_PI_3;
                                let aim = angle_to(center, player.center);
                                for i in 0..count {
                                    let angle =
                                        aim + (i - count / 2) as f32 * (spread / count as f32);
                                    ctx.enemy_bullets.push(Bullet::new(
                                        ctx.ids.next(),
                                        center,
                                        Vec2::from_angle(angle) * 400.0,
                                        Vec2::new(12.0, 22.0),
                                        BulletOwner::Enemy,
                                        1.0,
                                    ));
                                }
                            }
                            2 => {
                                let count = if phase2 { 3 } else { 2 };
                                for _ in 0..count {
                                    let spot = self.body.pos
                                        + Vec2::new(
                                            ctx.rng.random_range(-50.0..50.0),
                                            ctx.rng.random_range(-50.0..50.0),
                                        );
                                    ctx.enemies.push(Enemy::new(ctx.ids.next(), spot, ctx.rng));
                                }
                            }
                            _ => {
                                // Phase 2 only: telegraphed laser sweep
                                let horizontal = ctx.rng.random_range(0.0..1.0) < 0.5;
                                let span = if horizontal {
                                    consts::ARENA_HEIGHT
                                } else {
                                    consts::ARENA_WIDTH
                                };
                                let offset = ctx.rng.random_range(100.0..span - 100.0);
                                let (origin, extent) = sweep_segment(horizontal, offset);
                                ctx.hazards.push(Hazard::beam(
                                    ctx.ids.next(),
                                    origin,
                                    extent,
                                    1.2,
                                    0.0,
                                    true,
                                ));
                                ctx.scheduler.schedule(
                                    1.2,
                                    owner,
                                    DeferredAction::SweepFire { horizontal, offset },
                                );
                            }
                        }
                        *pattern += 1;
                    }
                    *attack_timer = if phase2 { 2.5 } else { 4.0 };
                }

                *spiral_angle += dt * if phase2 { 1.5 } else { 1.0 };
            }
        }
    }

    fn update_clone(&mut self, dt: f32, ctx: &mut BossCtx) {
        let BossKind::GlitchClone { lifespan } = &mut self.kind else {
            return;
        };
        *lifespan -= dt;
        if *lifespan <= 0.0 {
            self.body.removed = true;
            return;
        }

        if let Some(player) = ctx.player {
            if ctx.rng.random_range(0.0..1.0) < 0.2 {
                let angle = angle_to(self.body.center(), player.center)
                    + ctx.rng.random_range(-0.8..0.8);
                let speed = ctx.rng.random_range(100.0..400.0);
                ctx.enemy_bullets.push(Bullet::new(
                    ctx.ids.next(),
                    self.body.center(),
                    Vec2::from_angle(angle) * speed,
                    Vec2::splat(8.0),
                    BulletOwner::Enemy,
                    0.5,
                ));
            }
        }
    }

    fn handle_taunts(&mut self, dt: f32, ctx: &mut BossCtx) {
        self.taunt_timer -= dt;
        if self.taunt_timer <= 0.0 && !self.taunts.is_empty() {
            let line = self.taunts[ctx.rng.random_range(0..self.taunts.len())];
            ctx.floating_text.push(FloatingText::new(
                Vec2::new(self.body.center().x, self.body.pos.y - 20.0),
                line,
                22.0,
            ));
            self.taunt_timer = ctx.rng.random_range(10.0..15.0);
        }
    }

    fn begin_transition(&mut self, ctx: &mut BossCtx) {
        self.transitioning = true;
        self.transition_timer = consts::PHASE_TRANSITION_DURATION;
        self.body.invincible = true;
        ctx.cues.push(SoundCue::BossTransition);
        ctx.shake.trigger(20.0, consts::PHASE_TRANSITION_DURATION);
        ctx.floating_text.push(FloatingText::new(
            Vec2::new(self.body.center().x, self.body.pos.y - 40.0),
            "PHASE 2",
            32.0,
        ));
    }

    /// Telegraph resolved: commit to the recorded position.
    pub fn start_charge(&mut self, target: Vec2) {
        if let BossKind::CyberStallion {
            telegraphing,
            charging,
            charge_target,
            ..
        } = &mut self.kind
        {
            *telegraphing = false;
            *charging = true;
            *charge_target = target;
            self.body.invincible = true;
            let dir = (target - self.body.center()).normalize_or_zero();
            self.body.vel = dir * 1200.0;
        }
    }

    pub fn end_charge_invincibility(&mut self) {
        if matches!(self.kind, BossKind::CyberStallion { .. }) && !self.transitioning {
            self.body.invincible = false;
        }
    }

    pub fn end_spawn_window(&mut self) {
        if let BossKind::SwarmSovereign { spawning, .. } = &mut self.kind {
            *spawning = false;
            if !self.transitioning {
                self.body.invincible = false;
            }
        }
    }

    pub fn end_whirlpool(&mut self) {
        if let BossKind::SunkenHorror { pulling, .. } = &mut self.kind {
            *pulling = false;
        }
    }
}

/// Endpoints of a full-arena laser sweep lane.
pub fn sweep_segment(horizontal: bool, offset: f32) -> (Vec2, Vec2) {
    if horizontal {
        (
            Vec2::new(0.0, offset),
            Vec2::new(consts::ARENA_WIDTH, 0.0),
        )
    } else {
        (
            Vec2::new(offset, 0.0),
            Vec2::new(0.0, consts::ARENA_HEIGHT),
        )
    }
}

pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Drift toward a waypoint, repicking when reached or on timer expiry.
#[allow(clippy::too_many_arguments)]
fn waypoint_move(
    body: &mut Body,
    dt: f32,
    target: &mut Vec2,
    timer: &mut f32,
    speed: f32,
    stop_within: f32,
    max_y: f32,
    repick: (f32, f32),
    rng: &mut Pcg32,
) {
    *timer -= dt;
    let center = body.center();
    let dist = center.distance(*target);
    if *timer <= 0.0 || dist < stop_within {
        *target = Vec2::new(
            rng.random_range(100.0..consts::ARENA_WIDTH - 100.0),
            rng.random_range(100.0..max_y),
        );
        *timer = rng.random_range(repick.0..repick.1);
    }

    if dist > stop_within {
        body.vel = (*target - center).normalize_or_zero() * speed;
    } else {
        body.vel = Vec2::ZERO;
    }
}
