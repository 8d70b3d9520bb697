use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::error::EngineResult;
use crate::games::{EnergyConfig, FocusConfig, GameKind, MemoryConfig};

/// Tunable parameters for all three games.
///
/// Unknown or missing fields fall back to defaults so older settings files
/// keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub focus: FocusConfig,
    pub energy: EnergyConfig,
    pub memory: MemoryConfig,
    /// Fixed RNG seed for reproducible layouts; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl GameSettings {
    pub fn validate(&self) -> EngineResult<()> {
        self.focus.validate()?;
        self.energy.validate()?;
        self.memory.validate()
    }

    pub fn validate_kind(&self, kind: GameKind) -> EngineResult<()> {
        match kind {
            GameKind::Focus => self.focus.validate(),
            GameKind::Energy => self.energy.validate(),
            GameKind::Memory => self.memory.validate(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<GameSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file yields defaults; an
    /// unreadable or malformed one also yields defaults, with a warning.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                GameSettings::default()
            })
        } else {
            GameSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn game_settings(&self) -> GameSettings {
        self.read().clone()
    }

    /// Replace the stored settings. Invalid settings are rejected before
    /// anything is written.
    pub fn update(&self, settings: GameSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: GameSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &GameSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, GameSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GameSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("teddy-games-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        assert_eq!(store.game_settings(), GameSettings::default());
        assert!(store.game_settings().validate().is_ok());
    }

    #[test]
    fn update_persists_and_reloads() {
        let path = temp_path("roundtrip");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = GameSettings::default();
        settings.focus.duration_ms = 30_000;
        settings.rng_seed = Some(99);
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.game_settings(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.game_settings().focus.duration_ms, 30_000);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_update_is_rejected() {
        let store = SettingsStore::new(temp_path("invalid")).unwrap();
        let mut settings = GameSettings::default();
        settings.energy.duration_ms = 0;

        assert!(store.update(settings).is_err());
        assert_eq!(store.game_settings().energy.duration_ms, 90_000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let parsed: GameSettings =
            serde_json::from_str(r#"{"focus":{"durationMs":5000}}"#).unwrap();
        assert_eq!(parsed.focus.duration_ms, 5_000);
        assert_eq!(parsed.focus.spawn_delay_min_ms, 800);
        assert_eq!(parsed.memory, MemoryConfig::default());
    }
}
