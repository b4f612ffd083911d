use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::{self, Bullet};
use super::entity::{Body, EntityId, IdGen};

const ENEMY_SIZE: f32 = 40.0;
const ENEMY_HEALTH: f32 = 3.0;
const ENEMY_SPEED: f32 = 80.0;
const ENEMY_BULLET_SPEED: f32 = 350.0;

/// Basic chaser. Homes at the player and fires an aimed shot on a
/// randomized cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub body: Body,
    shoot_timer: f32,
}

impl Enemy {
    pub fn new(id: EntityId, pos: Vec2, rng: &mut Pcg32) -> Self {
        Self {
            body: Body::new(id, pos, Vec2::splat(ENEMY_SIZE), ENEMY_HEALTH),
            shoot_timer: rng.random_range(1.0..3.0),
        }
    }

    pub fn update(
        &mut self,
        dt: f32,
        player_center: Option<Vec2>,
        rng: &mut Pcg32,
        ids: &mut IdGen,
        bullets: &mut Vec<Bullet>,
    ) {
        if let Some(target) = player_center {
            let dir = target - self.body.center();
            if dir != Vec2::ZERO {
                self.body.vel = dir.normalize() * ENEMY_SPEED;
            }

            self.shoot_timer -= dt;
            if self.shoot_timer <= 0.0 {
                bullets.push(bullet::aimed(
                    ids.next(),
                    self.body.center(),
                    target,
                    ENEMY_BULLET_SPEED,
                    Vec2::new(8.0, 14.0),
                    1.0,
                ));
                self.shoot_timer = rng.random_range(2.0..4.0);
            }
        } else {
            self.body.vel = Vec2::ZERO;
        }

        self.body.integrate(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn homes_toward_player() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ids = IdGen::default();
        let mut e = Enemy::new(ids.next(), Vec2::new(0.0, 0.0), &mut rng);
        let mut bullets = Vec::new();
        e.update(0.1, Some(Vec2::new(500.0, 20.0)), &mut rng, &mut ids, &mut bullets);
        assert!(e.body.vel.x > 0.0);
        assert!((e.body.vel.length() - ENEMY_SPEED).abs() < 1e-3);
        assert!(e.body.pos.x > 0.0);
    }

    #[test]
    fn fires_aimed_bullets_on_cooldown() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ids = IdGen::default();
        let mut e = Enemy::new(ids.next(), Vec2::new(100.0, 100.0), &mut rng);
        let mut bullets = Vec::new();
        // Initial cooldown is at most 3 s
        for _ in 0..200 {
            e.update(0.016, Some(Vec2::new(600.0, 120.0)), &mut rng, &mut ids, &mut bullets);
        }
        assert!(!bullets.is_empty());
        let b = &bullets[0];
        assert!((b.body.vel.length() - ENEMY_BULLET_SPEED).abs() < 1e-2);
        assert!(b.body.vel.x > 0.0);
    }

    #[test]
    fn idles_without_a_player() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ids = IdGen::default();
        let mut e = Enemy::new(ids.next(), Vec2::new(100.0, 100.0), &mut rng);
        let mut bullets = Vec::new();
        for _ in 0..400 {
            e.update(0.016, None, &mut rng, &mut ids, &mut bullets);
        }
        assert!(bullets.is_empty());
        assert_eq!(e.body.pos, Vec2::new(100.0, 100.0));
    }
}
