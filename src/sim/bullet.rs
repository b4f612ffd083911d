use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts;

use super::entity::{Body, EntityId};
use super::hazards::GravityWell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletOwner {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub body: Body,
    pub owner: BulletOwner,
    pub damage: f32,
    /// Steering acceleration toward the player, enemy bullets only.
    pub homing: f32,
    /// Remaining boundary/obstacle bounces.
    pub ricochet: u32,
    pub piercing: bool,
}

impl Bullet {
    /// `center` is the spawn midpoint; the body stores the top-left corner.
    pub fn new(
        id: EntityId,
        center: Vec2,
        vel: Vec2,
        size: Vec2,
        owner: BulletOwner,
        damage: f32,
    ) -> Self {
        let mut body = Body::new(id, center - size * 0.5, size, 1.0);
        body.vel = vel;
        Self {
            body,
            owner,
            damage,
            homing: 0.0,
            ricochet: 0,
            piercing: false,
        }
    }

    pub fn with_homing(mut self, homing: f32) -> Self {
        self.homing = homing;
        self
    }

    pub fn with_ricochet(mut self, count: u32) -> Self {
        self.ricochet = count;
        self
    }

    pub fn with_piercing(mut self, piercing: bool) -> Self {
        self.piercing = piercing;
        self
    }

    pub fn update(&mut self, dt: f32, player_center: Option<Vec2>, well: Option<GravityWell>) {
        // Homing steers while preserving speed
        if self.owner == BulletOwner::Enemy && self.homing > 0.0 {
            if let Some(target) = player_center {
                let speed = self.body.vel.length();
                let dir = target - self.body.center();
                if dir != Vec2::ZERO {
                    self.body.vel += dir.normalize() * self.homing * dt;
                    if self.body.vel != Vec2::ZERO {
                        self.body.vel = self.body.vel.normalize() * speed;
                    }
                }
            }
        }

        if let Some(well) = well {
            let delta = well.center - self.body.center();
            let dist_sq = delta.length_squared();
            if dist_sq < well.radius * well.radius
                && dist_sq > consts::WELL_BULLET_EXCLUSION_SQ
            {
                let dist = dist_sq.sqrt();
                let falloff = 1.0 - dist / well.radius;
                self.body.vel += (delta / dist) * well.strength * falloff * dt * 2.0;
            }
        }

        self.body.integrate(dt);

        // Arena edges: bounce while charges remain, otherwise expire
        if self.body.pos.x < 0.0 || self.body.pos.x + self.body.size.x > consts::ARENA_WIDTH {
            if self.ricochet > 0 {
                self.ricochet -= 1;
                self.body.vel.x = -self.body.vel.x;
                self.body.pos.x = self
                    .body
                    .pos
                    .x
                    .clamp(0.0, consts::ARENA_WIDTH - self.body.size.x);
            } else {
                self.body.removed = true;
            }
        }
        if self.body.pos.y < 0.0 || self.body.pos.y + self.body.size.y > consts::ARENA_HEIGHT {
            if self.ricochet > 0 {
                self.ricochet -= 1;
                self.body.vel.y = -self.body.vel.y;
                self.body.pos.y = self
                    .body
                    .pos
                    .y
                    .clamp(0.0, consts::ARENA_HEIGHT - self.body.size.y);
            } else {
                self.body.removed = true;
            }
        }
    }
}

/// Aimed bullet helper shared by enemies and bosses.
pub fn aimed(
    id: EntityId,
    from_center: Vec2,
    target: Vec2,
    speed: f32,
    size: Vec2,
    damage: f32,
) -> Bullet {
    let dir = target - from_center;
    let vel = if dir == Vec2::ZERO {
        Vec2::new(0.0, speed)
    } else {
        dir.normalize() * speed
    };
    Bullet::new(id, from_center, vel, size, BulletOwner::Enemy, damage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_bullet(center: Vec2, vel: Vec2) -> Bullet {
        Bullet::new(1, center, vel, Vec2::new(8.0, 14.0), BulletOwner::Enemy, 1.0)
    }

    #[test]
    fn homing_preserves_speed() {
        let mut b = enemy_bullet(Vec2::new(100.0, 100.0), Vec2::new(300.0, 0.0)).with_homing(200.0);
        b.update(0.016, Some(Vec2::new(100.0, 400.0)), None);
        assert!((b.body.vel.length() - 300.0).abs() < 1e-2);
        assert!(b.body.vel.y > 0.0);
    }

    #[test]
    fn ricochet_reflects_and_decrements() {
        let mut b = enemy_bullet(Vec2::new(10.0, 100.0), Vec2::new(-2000.0, 0.0)).with_ricochet(1);
        b.update(0.016, None, None);
        assert_eq!(b.ricochet, 0);
        assert!(b.body.vel.x > 0.0);
        assert!(!b.body.removed);
        assert!(b.body.pos.x >= 0.0);
    }

    #[test]
    fn exhausted_ricochet_expires_at_edge() {
        let mut b = enemy_bullet(Vec2::new(10.0, 100.0), Vec2::new(-2000.0, 0.0));
        b.update(0.016, None, None);
        assert!(b.body.removed);
    }

    #[test]
    fn well_ignores_point_blank_bullets() {
        let well = GravityWell {
            center: Vec2::new(100.0, 100.0),
            radius: 400.0,
            strength: 250.0,
        };
        // Inside the exclusion zone (dist 10 < 50): no pull
        let mut near = enemy_bullet(Vec2::new(110.0, 100.0), Vec2::new(0.0, 100.0));
        let before = near.body.vel;
        near.update(0.016, None, Some(well));
        assert_eq!(near.body.vel, before);

        // Outside the exclusion zone: accelerates toward the core
        let mut far = enemy_bullet(Vec2::new(300.0, 100.0), Vec2::new(0.0, 100.0));
        far.update(0.016, None, Some(well));
        assert!(far.body.vel.x < 0.0);
    }
}
