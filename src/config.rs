use crate::expand_tilde;
use anyhow::Result;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_DIRECTORY: &str = "Tributary";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const DATABASE_FILENAME: &str = "tributary.db";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub remote: RemoteConfig,
    pub browse: BrowseConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Emit a "data changed" signal after this many files.
    pub notify_every: usize,
    /// Directories containing this file are not indexed.
    pub marker_file: String,
    pub excluded_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub share: String,
    pub poll_interval_ms: u64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    /// Top-level device directories that belong to other sources.
    pub ignore_markers: Vec<String>,
    pub probe_limit_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            notify_every: 10,
            marker_file: String::from(".nomedia"),
            excluded_paths: Vec::new(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            share: String::from("Android"),
            poll_interval_ms: 1000,
            reconnect_attempts: 3,
            reconnect_delay_ms: 500,
            ignore_markers: vec![
                String::from("sdcard"),
                String::from("usb1"),
                String::from("usb2"),
            ],
            probe_limit_bytes: 32 * 1024 * 1024,
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        BrowseConfig { limit: 300 }
    }
}

impl Config {
    /// Load the config from the user's config directory. A missing file is
    /// not an error, the defaults are used instead.
    pub fn load() -> Result<Self> {
        match Self::config_dir() {
            Some(dir) if dir.join(CONFIG_FILENAME).exists() => {
                Self::load_from_file(dir.join(CONFIG_FILENAME))
            }
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_str = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&file_str)
    }

    pub fn from_toml(file_str: &str) -> Result<Self> {
        let mut config = toml::from_str::<Config>(file_str)?;

        config.scan.excluded_paths = config
            .scan
            .excluded_paths
            .iter()
            .map(expand_tilde)
            .collect::<Result<Vec<_>>>()?;

        if config.scan.notify_every == 0 {
            config.scan.notify_every = ScanConfig::default().notify_every;
        }

        Ok(config)
    }

    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIRECTORY))
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join(DATABASE_FILENAME)))
    }
}

impl RemoteConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
