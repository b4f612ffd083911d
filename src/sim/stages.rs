//! Run progression config: stages, waves, and boss assignments.
//!
//! Boss ids are config strings resolved through `BossId::from_config`; an
//! unknown id is a logged no-op rather than a crash.

#[derive(Debug, Clone, Copy)]
pub struct WaveConfig {
    pub enemies: u32,
    pub spawn_interval: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    pub name: &'static str,
    pub waves: &'static [WaveConfig],
    pub boss: &'static str,
}

const fn wave(enemies: u32, spawn_interval: f32) -> WaveConfig {
    WaveConfig {
        enemies,
        spawn_interval,
    }
}

pub const STAGES: [StageConfig; 7] = [
    StageConfig {
        name: "Neon Plains",
        waves: &[wave(5, 2.0), wave(8, 1.5)],
        boss: "stallion",
    },
    StageConfig {
        name: "Hive Reaches",
        waves: &[wave(8, 1.8), wave(10, 1.4)],
        boss: "sovereign",
    },
    StageConfig {
        name: "Corrupted Sector",
        waves: &[wave(8, 1.5), wave(10, 1.2), wave(12, 1.0)],
        boss: "glitch",
    },
    StageConfig {
        name: "Molten Forge",
        waves: &[wave(10, 1.5), wave(12, 1.2), wave(14, 1.0)],
        boss: "forge",
    },
    StageConfig {
        name: "Crystal Caverns",
        waves: &[wave(10, 1.2), wave(14, 1.0), wave(16, 0.9)],
        boss: "weaver",
    },
    StageConfig {
        name: "Drowned Deep",
        waves: &[wave(12, 1.2), wave(16, 0.9), wave(18, 0.8)],
        boss: "horror",
    },
    StageConfig {
        name: "The Maw",
        waves: &[wave(14, 1.0), wave(18, 0.8), wave(22, 0.7)],
        boss: "titan",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bosses::BossId;

    #[test]
    fn every_stage_names_a_real_boss() {
        for stage in &STAGES {
            assert!(
                BossId::from_config(stage.boss).is_some(),
                "stage {} has unknown boss id {}",
                stage.name,
                stage.boss
            );
            assert!(!stage.waves.is_empty());
        }
    }

    #[test]
    fn difficulty_ramps_across_stages() {
        let first: u32 = STAGES[0].waves.iter().map(|w| w.enemies).sum();
        let last: u32 = STAGES[6].waves.iter().map(|w| w.enemies).sum();
        assert!(last > first);
    }
}
