use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use diagrams::ExtractOptions;
use probe::ProbeConfig;
use vectors::VectorStoreConfig;

const APP_NAME: &str = "kiln";

/// Overrides the config directory
pub const CONFIG_PATH_ENV: &str = "KILN_CONFIG_PATH";
/// Overrides `vectors.url`
pub const VECTORS_URL_ENV: &str = "KILN_VECTORS_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vectors: VectorStoreConfig,
    #[serde(default)]
    pub diagrams: ExtractOptions,
    #[serde(default)]
    pub probe: ProbeConfig,
}

impl Config {
    /// Apply environment overrides on top of the file values
    pub fn with_env_overrides(mut self, vectors_url: Option<String>) -> Self {
        if let Some(url) = vectors_url.filter(|u| !u.trim().is_empty()) {
            self.vectors.url = url;
        }
        self
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .context("Could not determine config directory")
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let config = load_config_from(&get_config_file()?)?;
    Ok(config.with_env_overrides(std::env::var(VECTORS_URL_ENV).ok()))
}

/// Read a config file; a missing file yields the defaults
pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_file()?)
}

pub fn save_config_to(config: &Config, config_file: &Path) -> Result<()> {
    if let Some(config_dir) = config_file.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(config_dir, perms)?;
            }
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(config_file, contents)
        .with_context(|| format!("Failed to write config file: {}", config_file.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(config_file, perms)?;
    }

    Ok(())
}
