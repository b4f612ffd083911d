use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::effects::{self, Particle};
use super::entity::{Body, EntityId};

const PULSE_DURATION: f32 = 0.5;

/// Destructible crystal growth. Periodically pulses; contact during the
/// pulse window hurts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub body: Body,
    pub pulsing: bool,
    pulse_cooldown: f32,
    pulse_timer: f32,
}

impl Obstacle {
    pub fn new(id: EntityId, center: Vec2, rng: &mut Pcg32) -> Self {
        let size = Vec2::splat(rng.random_range(50.0..90.0));
        Self {
            body: Body::new(id, center - size * 0.5, size, 20.0),
            pulsing: false,
            pulse_cooldown: rng.random_range(3.0..5.0),
            pulse_timer: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32, rng: &mut Pcg32, particles: &mut Vec<Particle>) {
        if self.pulsing {
            self.pulse_timer -= dt;
            if self.pulse_timer <= 0.0 {
                self.pulsing = false;
                self.pulse_cooldown = rng.random_range(4.0..6.0);
            }
            return;
        }

        self.pulse_cooldown -= dt;
        if self.pulse_cooldown <= 0.0 {
            self.pulsing = true;
            self.pulse_timer = PULSE_DURATION;
            effects::spawn_burst(particles, rng, self.body.center(), "#8ff", false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pulses_and_recovers() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut particles = Vec::new();
        let mut o = Obstacle::new(0, Vec2::new(400.0, 300.0), &mut rng);
        assert!(!o.pulsing);

        // Initial cooldown is under 5 s
        for _ in 0..320 {
            o.update(0.016, &mut rng, &mut particles);
            if o.pulsing {
                break;
            }
        }
        assert!(o.pulsing);
        assert!(!particles.is_empty());

        for _ in 0..40 {
            o.update(0.016, &mut rng, &mut particles);
        }
        assert!(!o.pulsing);
    }

    #[test]
    fn size_is_within_crystal_range() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..20 {
            let o = Obstacle::new(0, Vec2::ZERO, &mut rng);
            assert!(o.body.size.x >= 50.0 && o.body.size.x < 90.0);
            assert_eq!(o.body.size.x, o.body.size.y);
            assert_eq!(o.body.health, 20.0);
        }
    }
}
