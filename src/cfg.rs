use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, File, FileFormat, Value, ValueKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::paths::write_private;

/// Value reported for a setting that has never been configured.
pub const DEFAULT_VALUE: i64 = 0;

/// The user-adjustable settings, addressed by their dotted TOML path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    FreezeRows,
    FreezeCols,
    FilterHeaderRow,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [Self::FreezeRows, Self::FreezeCols, Self::FilterHeaderRow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreezeRows => "freeze.rows",
            Self::FreezeCols => "freeze.cols",
            Self::FilterHeaderRow => "filter.header_row",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AppError::UnknownSettingKey(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(default)]
    pub freeze: FreezeSettings,
    #[serde(default)]
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<i64>,
}

impl SettingsRecord {
    /// The stored value, or `None` when the key was never set.
    pub fn get(&self, key: SettingKey) -> Option<i64> {
        match key {
            SettingKey::FreezeRows => self.freeze.rows,
            SettingKey::FreezeCols => self.freeze.cols,
            SettingKey::FilterHeaderRow => self.filter.header_row,
        }
    }

    /// The stored value, falling back to [`DEFAULT_VALUE`].
    pub fn effective(&self, key: SettingKey) -> i64 {
        self.get(key).unwrap_or(DEFAULT_VALUE)
    }

    /// Stores `value` as is; callers validate it first.
    pub fn set(&mut self, key: SettingKey, value: i64) {
        *self.slot_mut(key) = Some(value);
    }

    pub fn unset(&mut self, key: SettingKey) {
        *self.slot_mut(key) = None;
    }

    fn slot_mut(&mut self, key: SettingKey) -> &mut Option<i64> {
        match key {
            SettingKey::FreezeRows => &mut self.freeze.rows,
            SettingKey::FreezeCols => &mut self.freeze.cols,
            SettingKey::FilterHeaderRow => &mut self.filter.header_row,
        }
    }
}

/// `config.toml` in the user's config directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings, returning an empty record when the file is missing.
    pub fn load(&self) -> AppResult<SettingsRecord> {
        if !self.path.exists() {
            debug!("Config file not found, using defaults: {:?}", self.path);
            return Ok(SettingsRecord::default());
        }

        info!("Loading configuration from: {:?}", self.path);
        let config = Config::builder()
            .add_source(File::from(self.path.as_path()).format(FileFormat::Toml))
            .build()
            .map_err(|e| self.corrupt(e))?;

        let mut record = SettingsRecord::default();
        for key in SettingKey::ALL {
            // get_int would coerce bools, floats and numeric strings
            match config.get::<Value>(key.as_str()) {
                Ok(Value {
                    kind: ValueKind::I64(value),
                    ..
                }) => record.set(key, value),
                Ok(other) => {
                    return Err(AppError::SettingsCorrupt {
                        path: self.path.clone(),
                        reason: format!("{} must be an integer (got: {})", key, other),
                    })
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(self.corrupt(e)),
            }
        }

        debug!("Loaded configuration: {:?}", record);
        Ok(record)
    }

    pub fn save(&self, record: &SettingsRecord) -> AppResult<()> {
        let content = toml::to_string_pretty(record).map_err(|e| {
            AppError::persistence(
                "serialize",
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        write_private(&self.path, content.as_bytes())?;
        info!("Saved configuration to {:?}", self.path);
        Ok(())
    }

    fn corrupt(&self, err: ConfigError) -> AppError {
        AppError::SettingsCorrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
