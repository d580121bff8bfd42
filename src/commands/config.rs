//! `config list|get|set|unset`.
//!
//! `list` and `get` always show the effective value, so an unset key and a key
//! set to 0 print the same.

use std::io::Write;

use tracing::debug;

use crate::cfg::{SettingKey, SettingsStore};
use crate::error::{AppError, AppResult};

pub fn list(store: &SettingsStore, out: &mut impl Write) -> AppResult<()> {
    let record = store.load()?;
    writeln!(out, "Current configuration:")?;
    for key in SettingKey::ALL {
        writeln!(out, "  {} = {}", key, record.effective(key))?;
    }
    Ok(())
}

pub fn get(store: &SettingsStore, key: &str, out: &mut impl Write) -> AppResult<()> {
    let key: SettingKey = key.parse()?;
    let record = store.load()?;
    writeln!(out, "{}", record.effective(key))?;
    Ok(())
}

pub fn set(store: &SettingsStore, key: &str, value: &str, out: &mut impl Write) -> AppResult<()> {
    let key: SettingKey = key.parse()?;
    let value = parse_value(key, value)?;

    let mut record = store.load()?;
    record.set(key, value);
    store.save(&record)?;
    debug!("Set {} = {}", key, value);

    writeln!(out, "Set {} = {}", key, value)?;
    writeln!(out, "Configuration saved to: {}", store.path().display())?;
    Ok(())
}

pub fn unset(store: &SettingsStore, key: &str, out: &mut impl Write) -> AppResult<()> {
    let key: SettingKey = key.parse()?;

    let mut record = store.load()?;
    record.unset(key);
    store.save(&record)?;

    writeln!(out, "Unset {}", key)?;
    writeln!(out, "Configuration saved to: {}", store.path().display())?;
    Ok(())
}

/// Accepts non-negative integers only. Surrounding whitespace is rejected.
pub fn parse_value(key: SettingKey, raw: &str) -> AppResult<i64> {
    let value: i64 = raw
        .parse()
        .map_err(|_| AppError::invalid_parameter(key.as_str(), "must be an integer"))?;
    if value < 0 {
        return Err(AppError::invalid_parameter(
            key.as_str(),
            format!("must be non-negative (got: {})", value),
        ));
    }
    Ok(value)
}
