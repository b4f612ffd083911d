//! Ground hazards, slow zones, and the singularity ultimate.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bosses::Boss;
use super::bullet::Bullet;
use super::effects::FloatingText;
use super::enemy::Enemy;
use super::entity::{Body, EntityId};
use super::geom;

/// The single global pull affecting bullets and the player. Last writer wins
/// when several sources are active in the same tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GravityWell {
    pub center: Vec2,
    pub radius: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HazardKind {
    /// Damaging floor area, AABB contact, dt-scaled damage.
    Pool { dps: f32 },
    /// Line hazard from `pos` to `pos + size`. Telegraphs deal no damage.
    Beam { damage: f32, telegraph: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub body: Body,
    pub kind: HazardKind,
    pub lifespan: f32,
}

impl Hazard {
    pub fn lava_pool(id: EntityId, center: Vec2) -> Self {
        Self::pool(id, center, 60.0, 8.0, 10.0)
    }

    pub fn ink_pool(id: EntityId, center: Vec2) -> Self {
        Self::pool(id, center, 70.0, 8.0, 5.0)
    }

    fn pool(id: EntityId, center: Vec2, radius: f32, lifespan: f32, dps: f32) -> Self {
        let size = Vec2::splat(radius * 2.0);
        let mut body = Body::new(id, center - size * 0.5, size, 1.0);
        body.invincible = true;
        Self {
            body,
            kind: HazardKind::Pool { dps },
            lifespan,
        }
    }

    pub fn beam(
        id: EntityId,
        origin: Vec2,
        extent: Vec2,
        lifespan: f32,
        damage: f32,
        telegraph: bool,
    ) -> Self {
        let mut body = Body::new(id, origin, extent, 1.0);
        body.invincible = true;
        Self {
            body,
            kind: HazardKind::Beam { damage, telegraph },
            lifespan,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.lifespan -= dt;
        if self.lifespan <= 0.0 {
            self.body.removed = true;
        }
    }

    /// Segment endpoints for beam proximity checks.
    pub fn segment(&self) -> (Vec2, Vec2) {
        (self.body.pos, self.body.pos + self.body.size)
    }
}

/// Area that multiplies player speed while inside. First match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowZone {
    pub pos: Vec2,
    pub size: Vec2,
    pub factor: f32,
    pub lifespan: f32,
}

impl SlowZone {
    pub fn new(center: Vec2, radius: f32, factor: f32, lifespan: f32) -> Self {
        let size = Vec2::splat(radius * 2.0);
        Self {
            pos: center - size * 0.5,
            size,
            factor,
            lifespan,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.lifespan -= dt;
    }

    pub fn expired(&self) -> bool {
        self.lifespan <= 0.0
    }

    pub fn contains(&self, pos: Vec2, size: Vec2) -> bool {
        geom::aabb_overlap(self.pos, self.size, pos, size)
    }
}

pub const SINGULARITY_LIFESPAN: f32 = 5.0;
pub const SINGULARITY_WELL_RADIUS: f32 = 400.0;
pub const SINGULARITY_WELL_STRENGTH: f32 = 250.0;
pub const SINGULARITY_DAMAGE_RADIUS: f32 = 80.0;
pub const SINGULARITY_DAMAGE: f32 = 0.75;
pub const SINGULARITY_DAMAGE_INTERVAL: f32 = 0.2;

/// Player ultimate. Publishes the global gravity well while alive, drags
/// enemies and bosses toward its core, and chews anything that stays inside
/// the inner radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Singularity {
    pub center: Vec2,
    pub lifespan: f32,
    pub removed: bool,
    damage_cooldowns: HashMap<EntityId, f32>,
}

impl Singularity {
    pub fn new(center: Vec2) -> Self {
        Self {
            center,
            lifespan: SINGULARITY_LIFESPAN,
            removed: false,
            damage_cooldowns: HashMap::new(),
        }
    }

    /// Returns the ultimate charge refunded to the player this tick
    /// (10% of damage dealt).
    pub fn update(
        &mut self,
        dt: f32,
        enemies: &mut [Enemy],
        bosses: &mut [Boss],
        enemy_bullets: &mut [Bullet],
        well: &mut Option<GravityWell>,
        floating_text: &mut Vec<FloatingText>,
    ) -> f32 {
        self.lifespan -= dt;
        if self.lifespan <= 0.0 {
            self.removed = true;
            *well = None;
            return 0.0;
        }

        *well = Some(GravityWell {
            center: self.center,
            radius: SINGULARITY_WELL_RADIUS,
            strength: SINGULARITY_WELL_STRENGTH,
        });

        for cooldown in self.damage_cooldowns.values_mut() {
            *cooldown -= dt;
        }

        // Enemy bullets are dragged but never damaged
        for bullet in enemy_bullets.iter_mut() {
            if !bullet.body.removed {
                pull_body(self.center, &mut bullet.body, dt);
            }
        }

        let mut charge = 0.0;
        for body in enemies
            .iter_mut()
            .map(|e| &mut e.body)
            .chain(bosses.iter_mut().map(|b| &mut b.body))
        {
            if body.removed {
                continue;
            }
            let Some(dist) = pull_body(self.center, body, dt) else {
                continue;
            };

            if dist < SINGULARITY_DAMAGE_RADIUS && !body.invincible {
                let ready = self
                    .damage_cooldowns
                    .get(&body.id)
                    .copied()
                    .unwrap_or(0.0)
                    <= 0.0;
                if ready {
                    body.health -= SINGULARITY_DAMAGE;
                    if body.health <= 0.0 {
                        body.removed = true;
                    }
                    floating_text.push(FloatingText::new(
                        Vec2::new(body.center().x, body.pos.y),
                        geom::format_damage(SINGULARITY_DAMAGE),
                        16.0,
                    ));
                    self.damage_cooldowns
                        .insert(body.id, SINGULARITY_DAMAGE_INTERVAL);
                    charge += SINGULARITY_DAMAGE * 0.1;
                }
            }
        }
        charge
    }
}

/// Positional drag toward the core with linear falloff. Returns the
/// distance when the body is inside the well.
fn pull_body(center: Vec2, body: &mut Body, dt: f32) -> Option<f32> {
    let delta = center - body.center();
    let dist = delta.length();
    if dist >= SINGULARITY_WELL_RADIUS || dist == 0.0 {
        return None;
    }
    let falloff = 1.0 - dist / SINGULARITY_WELL_RADIUS;
    body.pos += (delta / dist) * SINGULARITY_WELL_STRENGTH * falloff * dt;
    Some(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pools_expire_by_lifespan() {
        let mut pool = Hazard::lava_pool(0, Vec2::new(100.0, 100.0));
        pool.update(7.9);
        assert!(!pool.body.removed);
        pool.update(0.2);
        assert!(pool.body.removed);
    }

    #[test]
    fn pool_rect_is_centered() {
        let pool = Hazard::ink_pool(0, Vec2::new(200.0, 200.0));
        assert_eq!(pool.body.pos, Vec2::new(130.0, 130.0));
        assert_eq!(pool.body.size, Vec2::splat(140.0));
    }

    #[test]
    fn singularity_publishes_and_clears_well() {
        let mut s = Singularity::new(Vec2::new(400.0, 300.0));
        let mut well = None;
        let mut texts = Vec::new();
        s.update(0.016, &mut [], &mut [], &mut [], &mut well, &mut texts);
        assert!(well.is_some());

        s.lifespan = 0.01;
        s.update(0.016, &mut [], &mut [], &mut [], &mut well, &mut texts);
        assert!(s.removed);
        assert!(well.is_none());
    }

    #[test]
    fn singularity_damage_respects_cooldown_and_invincibility() {
        let mut rng = rand_pcg::Pcg32::seed_from_u64(9);
        let mut s = Singularity::new(Vec2::new(400.0, 300.0));
        let mut well = None;
        let mut texts = Vec::new();
        let mut enemies = vec![
            Enemy::new(1, Vec2::new(390.0, 290.0), &mut rng),
            Enemy::new(2, Vec2::new(395.0, 295.0), &mut rng),
        ];
        enemies[1].body.invincible = true;

        let charge = s.update(0.016, &mut enemies, &mut [], &mut [], &mut well, &mut texts);
        assert!((enemies[0].body.health - (3.0 - SINGULARITY_DAMAGE)).abs() < 1e-4);
        assert_eq!(enemies[1].body.health, 3.0);
        assert!(charge > 0.0);
        // Each damage tick shows its number
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, geom::format_damage(SINGULARITY_DAMAGE));

        // Second tick inside the cooldown window: no extra damage, no text
        let charge = s.update(0.016, &mut enemies, &mut [], &mut [], &mut well, &mut texts);
        assert!((enemies[0].body.health - (3.0 - SINGULARITY_DAMAGE)).abs() < 1e-4);
        assert_eq!(charge, 0.0);
        assert_eq!(texts.len(), 1);
    }

    #[test]
    fn singularity_pulls_toward_core() {
        let mut rng = rand_pcg::Pcg32::seed_from_u64(9);
        let mut s = Singularity::new(Vec2::new(400.0, 300.0));
        let mut well = None;
        let mut texts = Vec::new();
        let mut enemies = vec![Enemy::new(1, Vec2::new(600.0, 300.0), &mut rng)];
        let before = enemies[0].body.pos.x;
        s.update(0.016, &mut enemies, &mut [], &mut [], &mut well, &mut texts);
        assert!(enemies[0].body.pos.x < before);
    }

    #[test]
    fn singularity_drags_enemy_bullets_without_damaging_them() {
        use super::super::bullet::BulletOwner;

        let mut s = Singularity::new(Vec2::new(400.0, 300.0));
        let mut well = None;
        let mut texts = Vec::new();
        let mut bullets = vec![
            // Stationary bullet 200 px out
            Bullet::new(
                1,
                Vec2::new(600.0, 300.0),
                Vec2::ZERO,
                Vec2::splat(8.0),
                BulletOwner::Enemy,
                1.0,
            ),
            // Inside the damage radius: dragged, never chewed
            Bullet::new(
                2,
                Vec2::new(420.0, 300.0),
                Vec2::ZERO,
                Vec2::splat(8.0),
                BulletOwner::Enemy,
                1.0,
            ),
        ];
        let before = bullets[0].body.pos.x;

        let charge = s.update(0.016, &mut [], &mut [], &mut bullets, &mut well, &mut texts);

        // 250 * (1 - 200/400) * 0.016 = 2 px of positional drag
        assert!((before - bullets[0].body.pos.x - 2.0).abs() < 1e-3);
        assert!(!bullets[0].body.removed);
        assert_eq!(bullets[1].body.health, 1.0);
        assert!(!bullets[1].body.removed);
        assert_eq!(charge, 0.0);
        assert!(texts.is_empty());
    }
}
