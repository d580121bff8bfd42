//! `info`: dump the stored settings and credentials with secrets masked.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::auth::CredentialStore;
use crate::cfg::SettingsStore;
use crate::error::{AppError, AppResult};
use crate::paths::AppPaths;
use crate::redact::SettingsTree;

pub fn run(
    paths: &AppPaths,
    settings: &SettingsStore,
    credentials: &CredentialStore,
    out: &mut impl Write,
) -> AppResult<()> {
    let tree = collect(paths, settings, credentials)?;
    let rendered = serde_json::to_string_pretty(&tree.redacted()).map_err(std::io::Error::from)?;
    writeln!(out, "{}", rendered)?;
    Ok(())
}

fn collect(
    paths: &AppPaths,
    settings: &SettingsStore,
    credentials: &CredentialStore,
) -> AppResult<SettingsTree> {
    let mut tree = SettingsTree::map();
    tree.insert(
        "config_dir",
        SettingsTree::Scalar(Value::String(paths.dir().display().to_string())),
    );
    tree.insert("settings", to_tree(&settings.load()?)?);

    let (auth, status) = match credentials.load() {
        Ok(record) => {
            let status = if record.token.is_valid() { "valid" } else { "expired" };
            (to_tree(&record)?, status)
        }
        Err(AppError::NotAuthenticated { .. }) => (SettingsTree::Scalar(Value::Null), "missing"),
        Err(e) => return Err(e),
    };
    tree.insert("auth", auth);
    tree.insert("auth_status", SettingsTree::Scalar(Value::String(status.to_string())));

    Ok(tree)
}

fn to_tree(value: &impl Serialize) -> AppResult<SettingsTree> {
    let value = serde_json::to_value(value).map_err(std::io::Error::from)?;
    Ok(SettingsTree::from(value))
}
