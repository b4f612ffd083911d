use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable handle for an entity within a run.
pub type EntityId = u32;

/// Monotonic id source. One per `Game`, never reused within a run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IdGen {
    next: EntityId,
}

impl IdGen {
    pub fn next(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Shared physical state for everything in the arena.
///
/// `pos` is the top-left corner; `center()` derives the midpoint. Removal is
/// lazy: flagged here during the tick, swept by the orchestrator afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: EntityId,
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub invincible: bool,
    pub removed: bool,
}

impl Body {
    pub fn new(id: EntityId, pos: Vec2, size: Vec2, health: f32) -> Self {
        Self {
            id,
            pos,
            size,
            vel: Vec2::ZERO,
            health,
            max_health: health,
            invincible: false,
            removed: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn integrate(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    pub fn overlaps(&self, other: &Body) -> bool {
        super::geom::aabb_overlap(self.pos, self.size, other.pos, other.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut ids = IdGen::default();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn center_is_midpoint() {
        let body = Body::new(0, Vec2::new(10.0, 20.0), Vec2::new(30.0, 40.0), 1.0);
        assert_eq!(body.center(), Vec2::new(25.0, 40.0));
    }

    #[test]
    fn integrate_applies_velocity() {
        let mut body = Body::new(0, Vec2::ZERO, Vec2::splat(10.0), 1.0);
        body.vel = Vec2::new(100.0, -50.0);
        body.integrate(0.1);
        assert_eq!(body.pos, Vec2::new(10.0, -5.0));
    }
}
