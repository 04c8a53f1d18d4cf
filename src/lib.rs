use anyhow::{Result, anyhow};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use xxhash_rust::xxh3::xxh3_64;

pub mod app_core;
pub mod config;
pub mod database;
pub mod domain;
pub mod library;
pub mod player;

pub use app_core::MediaService;
pub use config::Config;
pub use database::{CatalogStore, CatalogSynchronizer, Database, MemoryCatalogStore};
pub use library::{PathIndex, SourceRegistry, SourceScanner};
pub use player::{PlaybackQueueEngine, PlayerHandle};

/// Create a media id based on...
///  - file name as bytes
///  - file size (bytes)
///  - date of last modification (millis)
///
/// The parent directory is left out so a file moved between folders keeps
/// its id. Copies of one file share an id, so persisted rows are keyed by
/// source and path instead. Zero is reserved for records that were never
/// probed.
pub fn calculate_media_id(file_name: &str, size: u64, last_mod_millis: i64) -> u64 {
    let mut data = Vec::with_capacity(file_name.len() + 16);

    data.extend_from_slice(file_name.as_bytes());
    data.extend_from_slice(&last_mod_millis.to_le_bytes());
    data.extend_from_slice(&size.to_le_bytes());

    match xxh3_64(&data) {
        0 => 1,
        hash => hash,
    }
}

/// Stable key for an album or artist aggregate owned by one source.
pub fn catalog_key(source_id: &str, name: &str) -> u64 {
    let mut data = Vec::with_capacity(source_id.len() + name.len() + 1);

    data.extend_from_slice(source_id.as_bytes());
    data.push(0);
    data.extend_from_slice(name.as_bytes());

    xxh3_64(&data)
}

pub enum DurationStyle {
    Clean,
    Compact,
}

pub fn get_readable_duration(duration: Duration, style: DurationStyle) -> String {
    let mut secs = duration.as_secs();
    let mins = secs / 60;
    secs %= 60;

    match style {
        DurationStyle::Clean => match mins {
            0 => format!("{secs:02}s"),
            _ => format!("{mins}m {secs:02}s"),
        },
        DurationStyle::Compact => format!("{mins}:{secs:02}"),
    }
}

pub fn expand_tilde<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    if path_str == "~" {
        return Err(anyhow!(
            "Indexing the home directory would read every file on the system. Please provide a more specific path!"
        ));
    }

    if path_str.starts_with("~/") || path_str.starts_with("~\\") {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory!"))?;
        return Ok(home.join(&path_str[2..]));
    }

    Err(anyhow!("Error reading directory with tilde (~)"))
}
