use crate::paths::AppPaths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CATEGORY_KEYWORD: &str = "stem";

fn default_category_keyword() -> String {
    DEFAULT_CATEGORY_KEYWORD.to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Project URL, e.g. `https://<project>.supabase.co`
    pub base_url: String,
    /// Public (anon) API key sent as the `apikey` header.
    pub api_key: String,

    /// Keyword the "category only" toggle looks for.
    #[serde(default = "default_category_keyword")]
    pub category_keyword: String,

    #[serde(default)]
    pub allow_insecure_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            category_keyword: default_category_keyword(),
            allow_insecure_certs: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::get_config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            return Ok(config);
        }
        Err(anyhow::anyhow!("Config file not found"))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::get_config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get_path_string() -> Result<String> {
        let path = AppPaths::get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    /// A config is usable once both the backend URL and the API key are filled in.
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}
