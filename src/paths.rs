// File: src/paths.rs
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

// Set from the app's `filesDir` by the mobile constructor.
static ANDROID_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Points every directory lookup below this root, one subdirectory per kind.
pub const TEST_DIR_ENV: &str = "CLUBDIR_TEST_DIR";

const SESSION_FILE: &str = "session.json";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppDir {
    Data,
    Config,
}

impl AppDir {
    fn name(self) -> &'static str {
        match self {
            AppDir::Data => "data",
            AppDir::Config => "config",
        }
    }
}

pub struct AppPaths;

impl AppPaths {
    /// Only the first call wins.
    pub fn init_android_path(path: String) {
        let _ = ANDROID_DATA_DIR.set(PathBuf::from(path));
    }

    fn resolve(kind: AppDir) -> Option<PathBuf> {
        if let Some(root) = ANDROID_DATA_DIR.get() {
            return Some(root.join(kind.name()));
        }
        if let Ok(root) = env::var(TEST_DIR_ENV) {
            return Some(PathBuf::from(root).join(kind.name()));
        }

        let proj = ProjectDirs::from("edu", "clubdir", "clubdir")?;
        Some(match kind {
            AppDir::Data => proj.data_dir().to_path_buf(),
            AppDir::Config => proj.config_dir().to_path_buf(),
        })
    }

    fn dir(kind: AppDir) -> Result<PathBuf> {
        let path = Self::resolve(kind)
            .ok_or_else(|| anyhow::anyhow!("Could not determine {} directory", kind.name()))?;
        if !path.exists() {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    pub fn get_data_dir() -> Result<PathBuf> {
        Self::dir(AppDir::Data)
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        Self::dir(AppDir::Config)
    }

    pub fn get_config_file_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join(CONFIG_FILE))
    }

    pub fn get_session_path() -> Result<PathBuf> {
        Ok(Self::get_data_dir()?.join(SESSION_FILE))
    }
}
