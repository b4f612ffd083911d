//! Static hub triggers.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractAction {
    StartRun,
    OpenTestChamber,
    OpenUpgrades,
    OpenLore,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interactable {
    pub pos: Vec2,
    pub size: Vec2,
    pub prompt: &'static str,
    pub action: InteractAction,
    pub highlighted: bool,
}

impl Interactable {
    fn new(pos: Vec2, size: Vec2, prompt: &'static str, action: InteractAction) -> Self {
        Self {
            pos,
            size,
            prompt,
            action,
            highlighted: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }
}

/// The four fixtures of the hub.
pub fn hub_layout() -> Vec<Interactable> {
    let w = consts::ARENA_WIDTH;
    let h = consts::ARENA_HEIGHT;
    vec![
        Interactable::new(
            Vec2::new(w / 2.0 - 75.0, 100.0),
            Vec2::new(150.0, 200.0),
            "Enter the Void",
            InteractAction::StartRun,
        ),
        Interactable::new(
            Vec2::new(150.0, 400.0),
            Vec2::new(100.0, 80.0),
            "Test Chamber",
            InteractAction::OpenTestChamber,
        ),
        Interactable::new(
            Vec2::new(w - 250.0, 400.0),
            Vec2::new(120.0, 120.0),
            "Shard Synthesizer",
            InteractAction::OpenUpgrades,
        ),
        Interactable::new(
            Vec2::new(w / 2.0 - 50.0, h - 200.0),
            Vec2::new(100.0, 150.0),
            "Void Sanctum",
            InteractAction::OpenLore,
        ),
    ]
}

/// Highlights the closest fixture within interaction range and returns its
/// index. Everything else is un-highlighted.
pub fn update_highlight(interactables: &mut [Interactable], player_center: Vec2) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, fixture) in interactables.iter_mut().enumerate() {
        fixture.highlighted = false;
        let dist = fixture.center().distance(player_center);
        if dist <= consts::INTERACT_RADIUS && best.is_none_or(|(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    if let Some((i, _)) = best {
        interactables[i].highlighted = true;
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_fixture_wins() {
        let mut fixtures = hub_layout();
        // Standing right at the test console
        let console_center = fixtures[1].center();
        let idx = update_highlight(&mut fixtures, console_center);
        assert_eq!(idx, Some(1));
        assert!(fixtures[1].highlighted);
        assert!(!fixtures[0].highlighted);
    }

    #[test]
    fn out_of_range_highlights_nothing() {
        let mut fixtures = hub_layout();
        let idx = update_highlight(&mut fixtures, Vec2::new(640.0, 420.0));
        assert_eq!(idx, None);
        assert!(fixtures.iter().all(|f| !f.highlighted));
    }
}
