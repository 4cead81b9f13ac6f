//! TOML-based application configuration.
//!
//! Stores:
//! - Selection limits and cache TTL
//! - Carousel rotation cadence and cooldowns
//! - An optional custom catalog file
//!
//! Configuration is stored at `~/.config/mealpromo/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::rotation::RotationConfig;
use crate::selector::SelectionConfig;

/// Selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    #[serde(default = "default_max_promos")]
    pub max_promos: usize,
    #[serde(default = "default_min_promos")]
    pub min_promos: usize,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u32,
}

/// Carousel rotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_drag_cooldown_ms")]
    pub drag_cooldown_ms: u64,
    #[serde(default = "default_jump_cooldown_ms")]
    pub jump_cooldown_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mealpromo/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub rotation: RotationSettings,
    /// Custom TOML catalog; the builtin sample catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

// Default functions
fn default_max_promos() -> usize {
    5
}
fn default_min_promos() -> usize {
    2
}
fn default_cache_ttl_hours() -> u32 {
    24
}
fn default_interval_ms() -> u64 {
    5000
}
fn default_drag_cooldown_ms() -> u64 {
    2000
}
fn default_jump_cooldown_ms() -> u64 {
    500
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_promos: default_max_promos(),
            min_promos: default_min_promos(),
            cache_ttl_hours: default_cache_ttl_hours(),
        }
    }
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            drag_cooldown_ms: default_drag_cooldown_ms(),
            jump_cooldown_ms: default_jump_cooldown_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                    // Optional strings serialize as null when unset.
                    serde_json::Value::Null | serde_json::Value::String(_) => {
                        if value.is_empty() {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mealpromo"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string())),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value does not fit the
    /// key's type.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selection.max_promos == 0 {
            return Err(ConfigError::InvalidValue {
                key: "selection.max_promos".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.selection.min_promos > self.selection.max_promos {
            return Err(ConfigError::InvalidValue {
                key: "selection.min_promos".into(),
                message: format!("must not exceed max_promos ({})", self.selection.max_promos),
            });
        }
        if self.rotation.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rotation.interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    pub fn selection(&self) -> SelectionConfig {
        SelectionConfig {
            max_promos: self.selection.max_promos,
            min_promos: self.selection.min_promos,
            cache_ttl: chrono::Duration::hours(i64::from(self.selection.cache_ttl_hours)),
        }
    }

    pub fn rotation(&self) -> RotationConfig {
        RotationConfig {
            interval_ms: self.rotation.interval_ms,
            drag_cooldown_ms: self.rotation.drag_cooldown_ms,
            jump_cooldown_ms: self.rotation.jump_cooldown_ms,
        }
    }
}
