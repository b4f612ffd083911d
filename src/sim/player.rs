use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;
use crate::consts;
use crate::persistence::SaveData;

use super::bullet::{Bullet, BulletOwner};
use super::effects::{self, Particle, PowerUpKind, ScreenShake};
use super::entity::{Body, IdGen};
use super::game::TickInput;
use super::hazards::{GravityWell, Singularity, SlowZone};
use super::obstacle::Obstacle;

/// Per-run boost picked at intermission. Cleared on hub entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempBuff {
    Health,
    Damage,
    FireRate,
    Piercing,
}

impl TempBuff {
    pub const ALL: [TempBuff; 4] = [
        TempBuff::Health,
        TempBuff::Damage,
        TempBuff::FireRate,
        TempBuff::Piercing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TempBuff::Health => "Reinforced Hull",
            TempBuff::Damage => "Overcharged Rounds",
            TempBuff::FireRate => "Rapid Servos",
            TempBuff::Piercing => "Piercing Shots",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TempBuff::Health => "+5 max health this run",
            TempBuff::Damage => "+20% damage this run",
            TempBuff::FireRate => "+25% fire rate this run",
            TempBuff::Piercing => "Bullets pass through targets this run",
        }
    }
}

/// Timed power-up from a pickup. Picking up a duplicate refreshes the timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActiveBuff {
    pub kind: PowerUpKind,
    pub remaining: f32,
}

/// Outcome of a damage attempt against the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Invincibility window, no effect.
    Ignored,
    /// Shield ate the hit.
    Shielded,
    /// Health absorbed the hit.
    Hit { died: bool },
}

/// Everything the player needs to touch during its tick.
pub struct PlayerCtx<'a> {
    pub ids: &'a mut IdGen,
    pub rng: &'a mut Pcg32,
    pub slow_zones: &'a [SlowZone],
    pub obstacles: &'a [Obstacle],
    pub well: Option<GravityWell>,
    pub bullets: &'a mut Vec<Bullet>,
    pub singularities: &'a mut Vec<Singularity>,
    pub particles: &'a mut Vec<Particle>,
    pub shake: &'a mut ScreenShake,
    pub cues: &'a mut Vec<SoundCue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    pub speed: f32,
    pub shoot_rate: f32,
    pub dash_cooldown: f32,
    pub ultimate: f32,
    pub shield_health: f32,
    pub buffs: Vec<ActiveBuff>,

    pub temp_health: f32,
    pub temp_damage: f32,
    pub temp_fire_rate: f32,
    pub piercing: bool,

    base_damage: f32,
    shoot_timer: f32,
    dash_cooldown_timer: f32,
    dash_timer: f32,
    dashing: bool,
    invincibility_timer: f32,
}

impl Player {
    pub fn new(pos: Vec2, save: &SaveData) -> Self {
        let size = Vec2::new(consts::PLAYER_WIDTH, consts::PLAYER_HEIGHT);
        let mut player = Self {
            body: Body::new(0, pos, size, consts::PLAYER_BASE_MAX_HEALTH),
            speed: consts::PLAYER_BASE_SPEED,
            shoot_rate: consts::PLAYER_BASE_SHOOT_RATE,
            dash_cooldown: consts::PLAYER_BASE_DASH_COOLDOWN,
            ultimate: 0.0,
            shield_health: 0.0,
            buffs: Vec::new(),
            temp_health: 0.0,
            temp_damage: 0.0,
            temp_fire_rate: 0.0,
            piercing: false,
            base_damage: 1.0,
            shoot_timer: 0.0,
            dash_cooldown_timer: 0.0,
            dash_timer: 0.0,
            dashing: false,
            invincibility_timer: 0.0,
        };
        player.apply_upgrades(save);
        player.body.health = player.body.max_health;
        player
    }

    /// Recompute derived stats from permanent levels plus run buffs.
    /// Current health is left alone.
    pub fn apply_upgrades(&mut self, save: &SaveData) {
        self.body.max_health =
            consts::PLAYER_BASE_MAX_HEALTH + save.health_level as f32 * 2.0 + self.temp_health;
        self.shoot_rate = consts::PLAYER_BASE_SHOOT_RATE
            * (1.0 + save.fire_rate_level as f32 * 0.15 + self.temp_fire_rate);
        self.dash_cooldown =
            consts::PLAYER_BASE_DASH_COOLDOWN * (1.0 - save.dash_cooldown_level as f32 * 0.1);
        self.base_damage = 1.0 + save.damage_level as f32 * 0.25;
    }

    /// Hub entry wipes everything run-scoped and heals to full.
    pub fn reset_temporary_buffs(&mut self, save: &SaveData) {
        self.temp_health = 0.0;
        self.temp_damage = 0.0;
        self.temp_fire_rate = 0.0;
        self.piercing = false;
        self.apply_upgrades(save);
        self.body.health = self.body.max_health;
    }

    pub fn apply_temp_buff(&mut self, buff: TempBuff, save: &SaveData) {
        match buff {
            TempBuff::Health => self.temp_health += 5.0,
            TempBuff::Damage => self.temp_damage += 0.2,
            TempBuff::FireRate => self.temp_fire_rate += 0.25,
            TempBuff::Piercing => self.piercing = true,
        }
        self.apply_upgrades(save);
    }

    pub fn bullet_damage(&self) -> f32 {
        self.base_damage * (1.0 + self.temp_damage)
    }

    pub fn add_ultimate(&mut self, amount: f32) {
        self.ultimate = (self.ultimate + amount).min(consts::MAX_ULTIMATE_CHARGE);
    }

    pub fn has_buff(&self, kind: PowerUpKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind)
    }

    pub fn is_dashing(&self) -> bool {
        self.dashing
    }

    pub fn activate_powerup(&mut self, kind: PowerUpKind) {
        if kind == PowerUpKind::Shield {
            self.shield_health = 1.0;
        }
        match self.buffs.iter_mut().find(|b| b.kind == kind) {
            Some(buff) => buff.remaining = kind.duration(),
            None => self.buffs.push(ActiveBuff {
                kind,
                remaining: kind.duration(),
            }),
        }
    }

    /// Routes a hit through invincibility, then shield, then health.
    /// Only `Hit` consumes the incoming attack.
    pub fn take_damage(&mut self, amount: f32) -> HitOutcome {
        if self.body.invincible {
            return HitOutcome::Ignored;
        }
        if self.shield_health > 0.0 {
            self.shield_health = 0.0;
            self.buffs.retain(|b| b.kind != PowerUpKind::Shield);
            return HitOutcome::Shielded;
        }

        self.body.health -= amount;
        self.body.invincible = true;
        self.invincibility_timer = consts::HIT_INVINCIBILITY;
        let died = self.body.health <= 0.0;
        if died {
            self.body.removed = true;
        }
        HitOutcome::Hit { died }
    }

    pub fn update(&mut self, dt: f32, input: &TickInput, hub: bool, ctx: &mut PlayerCtx) {
        if hub {
            self.update_hub(dt, input);
        } else {
            self.update_combat(dt, input, ctx);
        }
    }

    /// Free movement, no combat, can't be hurt.
    fn update_hub(&mut self, dt: f32, input: &TickInput) {
        self.body.invincible = true;
        self.dashing = false;
        self.body.vel = move_dir(input) * self.speed;
        self.body.integrate(dt);
        self.clamp_to_arena();
    }

    fn update_combat(&mut self, dt: f32, input: &TickInput, ctx: &mut PlayerCtx) {
        self.add_ultimate(dt * consts::ULTIMATE_CHARGE_RATE);

        // Timed power-ups
        self.buffs.retain_mut(|buff| {
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                if buff.kind == PowerUpKind::Shield {
                    self.shield_health = 0.0;
                }
                false
            } else {
                true
            }
        });

        self.shoot_timer -= dt;
        self.dash_cooldown_timer -= dt;
        self.invincibility_timer -= dt;
        self.body.invincible = self.invincibility_timer > 0.0;

        let slow = ctx
            .slow_zones
            .iter()
            .find(|z| z.contains(self.body.pos, self.body.size))
            .map(|z| z.factor)
            .unwrap_or(1.0);

        if self.dashing {
            self.dash_timer -= dt;
            if self.dash_timer <= 0.0 {
                self.dashing = false;
                self.body.vel = Vec2::ZERO;
            }
        } else {
            let dir = move_dir(input);
            self.body.vel = dir * self.speed * slow;

            if input.dash && self.dash_cooldown_timer <= 0.0 && dir != Vec2::ZERO {
                self.dashing = true;
                self.dash_timer = consts::DASH_DURATION;
                self.dash_cooldown_timer = self.dash_cooldown;
                self.invincibility_timer =
                    self.invincibility_timer.max(consts::DASH_INVINCIBILITY);
                self.body.invincible = true;
                self.body.vel = dir.normalize() * consts::DASH_SPEED;
                ctx.cues.push(SoundCue::Dash);
                ctx.shake.trigger(4.0, 0.15);
                effects::spawn_burst(ctx.particles, ctx.rng, self.body.center(), "", true);
            }

            if input.ultimate && self.ultimate >= consts::MAX_ULTIMATE_CHARGE {
                self.ultimate = 0.0;
                ctx.singularities.push(Singularity::new(input.cursor));
                ctx.shake.trigger(12.0, 0.4);
            }
        }

        // Wells drag the player positionally, unlike bullets
        if let Some(well) = ctx.well {
            let delta = well.center - self.body.center();
            let dist = delta.length();
            if dist > 0.0 && dist < well.radius {
                let falloff = 1.0 - dist / well.radius;
                self.body.pos += (delta / dist) * well.strength * falloff * dt;
            }
        }

        if input.fire && self.shoot_timer <= 0.0 && !self.dashing {
            self.shoot(input.cursor, ctx);
        }

        self.body.integrate(dt);
        self.resolve_obstacles(dt, ctx.obstacles);
        self.clamp_to_arena();
    }

    fn shoot(&mut self, cursor: Vec2, ctx: &mut PlayerCtx) {
        ctx.cues.push(SoundCue::Shoot);

        let mut rate = self.shoot_rate;
        if self.has_buff(PowerUpKind::RapidFire) {
            rate *= 2.0;
        }

        let origin = Vec2::new(
            self.body.pos.x + self.body.size.x * 0.5,
            self.body.pos.y + 10.0,
        );
        let damage = self.bullet_damage();
        let base_angle = (cursor.y - origin.y).atan2(cursor.x - origin.x);
        let size = Vec2::new(8.0, 20.0);

        if self.has_buff(PowerUpKind::QuadShot) {
            for i in [-1.5f32, -0.5, 0.5, 1.5] {
                let angle = base_angle + i * std::f32::consts::PI / 18.0;
                let vel = Vec2::from_angle(angle) * consts::PLAYER_BULLET_SPEED;
                ctx.bullets.push(
                    Bullet::new(
                        ctx.ids.next(),
                        origin,
                        vel,
                        size,
                        BulletOwner::Player,
                        damage * 0.5,
                    )
                    .with_piercing(self.piercing),
                );
            }
        } else {
            let vel = Vec2::from_angle(base_angle) * consts::PLAYER_BULLET_SPEED;
            ctx.bullets.push(
                Bullet::new(ctx.ids.next(), origin, vel, size, BulletOwner::Player, damage)
                    .with_piercing(self.piercing),
            );
        }

        self.shoot_timer = 1.0 / rate;
    }

    /// Undo this tick's displacement, then push out along the axis of
    /// least penetration if still overlapping.
    fn resolve_obstacles(&mut self, dt: f32, obstacles: &[Obstacle]) {
        for obstacle in obstacles {
            if obstacle.body.removed || !self.body.overlaps(&obstacle.body) {
                continue;
            }

            self.body.pos -= self.body.vel * dt;
            if !self.body.overlaps(&obstacle.body) {
                continue;
            }

            let o = &obstacle.body;
            let left = (self.body.pos.x + self.body.size.x) - o.pos.x;
            let right = (o.pos.x + o.size.x) - self.body.pos.x;
            let up = (self.body.pos.y + self.body.size.y) - o.pos.y;
            let down = (o.pos.y + o.size.y) - self.body.pos.y;
            let min_pen = left.min(right).min(up).min(down);

            if min_pen == left {
                self.body.pos.x = o.pos.x - self.body.size.x;
            } else if min_pen == right {
                self.body.pos.x = o.pos.x + o.size.x;
            } else if min_pen == up {
                self.body.pos.y = o.pos.y - self.body.size.y;
            } else {
                self.body.pos.y = o.pos.y + o.size.y;
            }
        }
    }

    fn clamp_to_arena(&mut self) {
        self.body.pos.x = self
            .body
            .pos
            .x
            .clamp(0.0, consts::ARENA_WIDTH - self.body.size.x);
        self.body.pos.y = self
            .body
            .pos
            .y
            .clamp(0.0, consts::ARENA_HEIGHT - self.body.size.y);
    }
}

fn move_dir(input: &TickInput) -> Vec2 {
    let mut dir = Vec2::ZERO;
    if input.up {
        dir.y -= 1.0;
    }
    if input.down {
        dir.y += 1.0;
    }
    if input.left {
        dir.x -= 1.0;
    }
    if input.right {
        dir.x += 1.0;
    }
    if dir.x != 0.0 && dir.y != 0.0 {
        dir /= std::f32::consts::SQRT_2;
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_player() -> Player {
        Player::new(Vec2::new(600.0, 400.0), &SaveData::default())
    }

    #[test]
    fn damage_routes_invincibility_then_shield_then_health() {
        let mut p = fresh_player();

        p.activate_powerup(PowerUpKind::Shield);
        assert_eq!(p.take_damage(1.0), HitOutcome::Shielded);
        assert_eq!(p.body.health, p.body.max_health);
        assert_eq!(p.shield_health, 0.0);
        assert!(!p.has_buff(PowerUpKind::Shield));

        // Shield is gone, next hit lands and opens an invincibility window
        assert_eq!(p.take_damage(1.0), HitOutcome::Hit { died: false });
        assert_eq!(p.body.health, p.body.max_health - 1.0);
        assert!(p.body.invincible);
        assert_eq!(p.take_damage(1.0), HitOutcome::Ignored);
        assert_eq!(p.body.health, p.body.max_health - 1.0);
    }

    #[test]
    fn lethal_hit_flags_removal() {
        let mut p = fresh_player();
        p.body.health = 0.5;
        assert_eq!(p.take_damage(1.0), HitOutcome::Hit { died: true });
        assert!(p.body.removed);
    }

    #[test]
    fn duplicate_pickup_refreshes_without_stacking() {
        let mut p = fresh_player();
        p.activate_powerup(PowerUpKind::RapidFire);
        p.buffs[0].remaining = 2.0;
        p.activate_powerup(PowerUpKind::RapidFire);
        assert_eq!(p.buffs.len(), 1);
        assert_eq!(p.buffs[0].remaining, PowerUpKind::RapidFire.duration());
    }

    #[test]
    fn ultimate_clamps_at_full() {
        let mut p = fresh_player();
        p.add_ultimate(60.0);
        p.add_ultimate(60.0);
        assert_eq!(p.ultimate, consts::MAX_ULTIMATE_CHARGE);
    }

    #[test]
    fn upgrade_levels_shape_stats() {
        let save = SaveData {
            health_level: 3,
            fire_rate_level: 2,
            dash_cooldown_level: 1,
            damage_level: 4,
            shards: 0,
        };
        let p = Player::new(Vec2::ZERO, &save);
        assert_eq!(p.body.max_health, 16.0);
        assert!((p.shoot_rate - 5.0 * 1.3).abs() < 1e-4);
        assert!((p.dash_cooldown - 1.35).abs() < 1e-4);
        assert!((p.bullet_damage() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn temp_buffs_stack_and_reset() {
        let save = SaveData::default();
        let mut p = Player::new(Vec2::ZERO, &save);
        p.apply_temp_buff(TempBuff::Health, &save);
        p.apply_temp_buff(TempBuff::Damage, &save);
        p.apply_temp_buff(TempBuff::Piercing, &save);
        assert_eq!(p.body.max_health, 15.0);
        assert!((p.bullet_damage() - 1.2).abs() < 1e-4);
        assert!(p.piercing);

        p.reset_temporary_buffs(&save);
        assert_eq!(p.body.max_health, 10.0);
        assert_eq!(p.body.health, 10.0);
        assert!(!p.piercing);
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let input = TickInput {
            up: true,
            right: true,
            ..TickInput::default()
        };
        let dir = move_dir(&input);
        assert!((dir.length() - 1.0).abs() < 1e-4);

        let straight = TickInput {
            right: true,
            ..TickInput::default()
        };
        assert_eq!(move_dir(&straight), Vec2::new(1.0, 0.0));
    }
}
