//! Cosmetic and pickup entities: particles, floating combat text, power-ups.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Body, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Shield,
    QuadShot,
    RapidFire,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Shield,
        PowerUpKind::QuadShot,
        PowerUpKind::RapidFire,
    ];

    pub fn duration(self) -> f32 {
        match self {
            PowerUpKind::Shield => 15.0,
            PowerUpKind::QuadShot | PowerUpKind::RapidFire => 10.0,
        }
    }
}

/// Dropped pickup. Bobs in place until the player touches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub body: Body,
    pub kind: PowerUpKind,
    bob_timer: f32,
}

impl PowerUp {
    pub fn new(id: EntityId, center: Vec2, kind: PowerUpKind, rng: &mut Pcg32) -> Self {
        let size = Vec2::splat(30.0);
        let mut body = Body::new(id, center - size * 0.5, size, 1.0);
        body.invincible = true;
        Self {
            body,
            kind,
            bob_timer: rng.random_range(0.0..std::f32::consts::TAU),
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.bob_timer += dt * 3.0;
        self.body.pos.y += self.bob_timer.sin() * 0.5;
    }
}

/// Damage numbers, taunts, phase banners. Drifts upward, fades after 1 s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingText {
    pub pos: Vec2,
    pub text: String,
    pub font_size: f32,
    pub lifespan: f32,
}

impl FloatingText {
    pub fn new(pos: Vec2, text: impl Into<String>, font_size: f32) -> Self {
        Self {
            pos,
            text: text.into(),
            font_size,
            lifespan: 1.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.pos.y -= 50.0 * dt;
        self.lifespan -= dt;
    }

    pub fn expired(&self) -> bool {
        self.lifespan <= 0.0
    }
}

/// Short-lived debris square.
#[derive(Debug, Clone, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub lifespan: f32,
    pub color: &'static str,
}

impl Particle {
    pub fn update(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.lifespan -= dt;
    }

    pub fn expired(&self) -> bool {
        self.lifespan <= 0.0
    }
}

/// Camera shake state. Presentation samples `magnitude()` each frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScreenShake {
    pub intensity: f32,
    pub timer: f32,
}

impl ScreenShake {
    pub fn trigger(&mut self, intensity: f32, duration: f32) {
        self.intensity = intensity;
        self.timer = duration;
    }

    pub fn update(&mut self, dt: f32) {
        if self.timer > 0.0 {
            self.timer -= dt;
        }
    }

    pub fn magnitude(&self) -> f32 {
        if self.timer > 0.0 { self.intensity } else { 0.0 }
    }
}

/// Scatter a burst of particles from a point. Rainbow bursts are bigger
/// (20 vs 5) and pick a random hue per particle.
pub fn spawn_burst(
    particles: &mut Vec<Particle>,
    rng: &mut Pcg32,
    center: Vec2,
    color: &'static str,
    rainbow: bool,
) {
    let count = if rainbow { 20 } else { 5 };
    for _ in 0..count {
        particles.push(Particle {
            pos: center,
            vel: Vec2::new(
                rng.random_range(-150.0..150.0),
                rng.random_range(-150.0..150.0),
            ),
            size: rng.random_range(2.0..5.0),
            lifespan: rng.random_range(0.5..1.5),
            color: if rainbow { "rainbow" } else { color },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn floating_text_drifts_up_and_expires() {
        let mut text = FloatingText::new(Vec2::new(100.0, 100.0), "5", 16.0);
        text.update(0.5);
        assert!(text.pos.y < 100.0);
        assert!(!text.expired());
        text.update(0.6);
        assert!(text.expired());
    }

    #[test]
    fn rainbow_bursts_are_larger() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut particles = Vec::new();
        spawn_burst(&mut particles, &mut rng, Vec2::ZERO, "#fa0", false);
        assert_eq!(particles.len(), 5);
        spawn_burst(&mut particles, &mut rng, Vec2::ZERO, "#fa0", true);
        assert_eq!(particles.len(), 25);
    }

    #[test]
    fn powerup_bobs_in_place() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut p = PowerUp::new(0, Vec2::new(100.0, 100.0), PowerUpKind::Shield, &mut rng);
        let x = p.body.pos.x;
        p.update(0.016);
        assert_eq!(p.body.pos.x, x);
    }
}
