use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, AppResult};

pub const CONFIG_DIR_ENV: &str = "GS_WRITE_CONFIG_DIR";
const APP_DIR: &str = ".config/gs-write";
const AUTH_FILE: &str = "auth.json";
const CONFIG_FILE: &str = "config.toml";

/// Location of the per-user files: `auth.json` and `config.toml`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    dir: PathBuf,
}

impl AppPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses `dir` when given, otherwise `$HOME/.config/gs-write`.
    pub fn resolve(dir: Option<PathBuf>) -> AppResult<Self> {
        if let Some(dir) = dir {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            AppError::persistence(
                "resolve",
                APP_DIR,
                std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found"),
            )
        })?;
        Ok(Self::new(home.join(APP_DIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn auth_file(&self) -> PathBuf {
        self.dir.join(AUTH_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }
}

/// Writes `contents` to `path` readable only by the owner.
///
/// The parent directory is created with mode 0700 if missing. The data lands in
/// a sibling temp file first and is renamed over `path`.
pub fn write_private(path: &Path, contents: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        create_private_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = open_private(&temp_path)
        .map_err(|e| AppError::persistence("write", &temp_path, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| AppError::persistence("write", &temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| AppError::persistence("write", path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| AppError::persistence("set permissions on", path, e))?;
    }

    debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

fn create_private_dir(dir: &Path) -> AppResult<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| AppError::persistence("create directory", dir, e))?;
    debug!("Created config directory {:?}", dir);
    Ok(())
}

fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
