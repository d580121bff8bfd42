use tracing::debug;

use crate::cfg::{SettingKey, SettingsRecord, DEFAULT_VALUE};
use crate::error::{AppError, AppResult};

/// Values given explicitly on the command line. `None` means the flag was absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub freeze_rows: Option<i64>,
    pub freeze_cols: Option<i64>,
    pub filter_header_row: Option<i64>,
}

impl Overrides {
    fn get(&self, key: SettingKey) -> Option<i64> {
        match key {
            SettingKey::FreezeRows => self.freeze_rows,
            SettingKey::FreezeCols => self.freeze_cols,
            SettingKey::FilterHeaderRow => self.filter_header_row,
        }
    }
}

/// The presentation options applied to one spreadsheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedParams {
    pub freeze_rows: i64,
    pub freeze_cols: i64,
    pub filter_header_row: i64,
}

impl ResolvedParams {
    /// Resolves every setting and rejects negative results.
    pub fn resolve(overrides: &Overrides, settings: &SettingsRecord) -> AppResult<Self> {
        let pick = |key: SettingKey| resolve(overrides.get(key), settings.get(key), DEFAULT_VALUE);
        let params = Self {
            freeze_rows: pick(SettingKey::FreezeRows),
            freeze_cols: pick(SettingKey::FreezeCols),
            filter_header_row: pick(SettingKey::FilterHeaderRow),
        };
        debug!("Resolved parameters: {:?}", params);
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            ("freeze-rows", self.freeze_rows),
            ("freeze-cols", self.freeze_cols),
            ("filter-header-row", self.filter_header_row),
        ];
        for (name, value) in fields {
            if value < 0 {
                return Err(AppError::invalid_parameter(
                    name,
                    format!("must be non-negative (got: {})", value),
                ));
            }
        }
        Ok(())
    }
}

/// Explicit value first, then the stored one, then `default`.
pub fn resolve(explicit: Option<i64>, stored: Option<i64>, default: i64) -> i64 {
    explicit.or(stored).unwrap_or(default)
}
