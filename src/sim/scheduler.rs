//! Deferred one-shot actions.
//!
//! Staggered attack volleys and delayed transitions are queued here instead
//! of being tracked ad hoc by each boss. Actions carry an owner handle; the
//! orchestrator drops due actions whose owner is no longer alive, so a boss
//! killed mid-volley stops attacking. The whole queue is cleared on run
//! reset and hub entry.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Run-scoped: survives the death of whoever queued it.
    Run,
    /// Valid only while the boss is alive and unremoved.
    Boss(EntityId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Stallion commits to the recorded position after its telegraph.
    StallionCharge { target: Vec2 },
    /// Charge invincibility wears off.
    StallionChargeEnd,
    /// One shot of a staggered laser burst or missile pair.
    StallionShot { speed: f32, homing: f32 },
    /// One minion out of a spawn window.
    SovereignSpawn,
    /// Spawn window closes, boss becomes vulnerable again.
    SovereignSpawnEnd,
    /// Mark a mortar target under the player's feet.
    MortarTelegraph,
    /// Telegraphed mortar lands as a lava pool.
    MortarImpact { center: Vec2 },
    /// One shot of a torrent volley, angle precomputed at volley start.
    TorrentShot { origin: Vec2, angle: f32 },
    /// Whirlpool releases: clear the well, fire the bullet ring.
    WhirlpoolEnd { boss: EntityId, center: Vec2 },
    /// Telegraphed laser sweep turns live.
    SweepFire { horizontal: bool, offset: f32 },
    /// Post-death pause before leaving the arena.
    PlayerDeath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduled {
    pub delay: f32,
    pub owner: Owner,
    pub action: DeferredAction,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    pending: Vec<Scheduled>,
}

impl Scheduler {
    pub fn schedule(&mut self, delay: f32, owner: Owner, action: DeferredAction) {
        self.pending.push(Scheduled {
            delay,
            owner,
            action,
        });
    }

    /// Advances all timers and drains the due actions in queue order.
    pub fn tick(&mut self, dt: f32) -> Vec<Scheduled> {
        for entry in &mut self.pending {
            entry.delay -= dt;
        }
        let (due, pending) = self
            .pending
            .drain(..)
            .partition(|entry| entry.delay <= 0.0);
        self.pending = pending;
        due
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_queue_order_when_due() {
        let mut s = Scheduler::default();
        s.schedule(0.1, Owner::Run, DeferredAction::SovereignSpawn);
        s.schedule(0.3, Owner::Run, DeferredAction::SovereignSpawnEnd);
        s.schedule(0.1, Owner::Boss(4), DeferredAction::MortarTelegraph);

        assert!(s.tick(0.05).is_empty());

        let due = s.tick(0.06);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].action, DeferredAction::SovereignSpawn);
        assert_eq!(due[1].action, DeferredAction::MortarTelegraph);

        let due = s.tick(0.2);
        assert_eq!(due.len(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = Scheduler::default();
        s.schedule(1.0, Owner::Boss(1), DeferredAction::StallionChargeEnd);
        s.clear();
        assert!(s.tick(2.0).is_empty());
    }
}
