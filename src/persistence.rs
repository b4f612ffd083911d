//! Save/load of the permanent progression record.
//!
//! Failures here are never fatal to the sim: callers log and fall back to
//! defaults.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Permanent progression: upgrade levels and banked shards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub health_level: u32,
    pub fire_rate_level: u32,
    pub dash_cooldown_level: u32,
    pub damage_level: u32,
    pub shards: u32,
}

/// Shop tracks. Costs escalate linearly per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    Health,
    FireRate,
    DashCooldown,
    Damage,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 4] = [
        UpgradeKind::Health,
        UpgradeKind::FireRate,
        UpgradeKind::DashCooldown,
        UpgradeKind::Damage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UpgradeKind::Health => "Hull Plating",
            UpgradeKind::FireRate => "Autoloader",
            UpgradeKind::DashCooldown => "Thruster Coils",
            UpgradeKind::Damage => "Shard Core",
        }
    }

    pub fn cost(self, level: u32) -> u32 {
        match self {
            UpgradeKind::Health => 25 + level * 25,
            UpgradeKind::FireRate => 40 + level * 40,
            UpgradeKind::DashCooldown => 30 + level * 30,
            UpgradeKind::Damage => 40 + level * 40,
        }
    }
}

impl SaveData {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Health => self.health_level,
            UpgradeKind::FireRate => self.fire_rate_level,
            UpgradeKind::DashCooldown => self.dash_cooldown_level,
            UpgradeKind::Damage => self.damage_level,
        }
    }

    pub fn raise(&mut self, kind: UpgradeKind) {
        match kind {
            UpgradeKind::Health => self.health_level += 1,
            UpgradeKind::FireRate => self.fire_rate_level += 1,
            UpgradeKind::DashCooldown => self.dash_cooldown_level += 1,
            UpgradeKind::Damage => self.damage_level += 1,
        }
    }
}

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "save file io error: {e}"),
            PersistError::Parse(e) => write!(f, "save file parse error: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Parse(e)
    }
}

pub trait SaveStore {
    fn load(&self) -> Result<SaveData, PersistError>;
    fn save(&self, data: &SaveData) -> Result<(), PersistError>;
}

/// JSON file on disk. A missing file is a fresh profile, not an error.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SaveStore for JsonFileStore {
    fn load(&self) -> Result<SaveData, PersistError> {
        if !self.path.exists() {
            return Ok(SaveData::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, data: &SaveData) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}

/// In-memory store for tests and demos. The handle stays readable after the
/// store moves into the game.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Rc<RefCell<SaveData>>,
}

impl MemoryStore {
    pub fn with_data(data: SaveData) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<SaveData>> {
        Rc::clone(&self.data)
    }
}

impl SaveStore for MemoryStore {
    fn load(&self) -> Result<SaveData, PersistError> {
        Ok(self.data.borrow().clone())
    }

    fn save(&self, data: &SaveData) -> Result<(), PersistError> {
        *self.data.borrow_mut() = data.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("void-arena-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn file_store_round_trips() {
        let path = temp_path("roundtrip");
        let store = JsonFileStore::new(&path);
        let data = SaveData {
            health_level: 2,
            fire_rate_level: 1,
            dash_cooldown_level: 0,
            damage_level: 3,
            shards: 640,
        };
        store.save(&data).expect("save");
        assert_eq!(store.load().expect("load"), data);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_a_fresh_profile() {
        let store = JsonFileStore::new(temp_path("missing-nonexistent"));
        assert_eq!(store.load().expect("load"), SaveData::default());
    }

    #[test]
    fn corrupted_file_reports_parse_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").expect("write");
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(PersistError::Parse(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn costs_escalate_per_level() {
        assert_eq!(UpgradeKind::Health.cost(0), 25);
        assert_eq!(UpgradeKind::Health.cost(2), 75);
        assert_eq!(UpgradeKind::Damage.cost(1), 80);
        assert_eq!(UpgradeKind::DashCooldown.cost(3), 120);
    }

    #[test]
    fn memory_store_shares_its_handle() {
        let store = MemoryStore::default();
        let handle = store.handle();
        let mut data = SaveData::default();
        data.shards = 99;
        store.save(&data).expect("save");
        assert_eq!(handle.borrow().shards, 99);
    }
}
