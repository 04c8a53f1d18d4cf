use anyhow::Result;
use lofty::{
    file::{AudioFile, TaggedFile, TaggedFileExt},
    probe::Probe,
    tag::Accessor,
};
use std::{
    io::Cursor,
    path::Path,
    time::{Duration, UNIX_EPOCH},
};

/// Best-effort metadata for one file. Missing fields stay empty.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: String,
    pub album: String,
    pub duration: Duration,
    pub year: Option<u32>,
    /// Millis since the epoch, zero when unknown.
    pub last_modified: i64,
}

/// Metadata extraction seam. Implementations never fail: anything that goes
/// wrong collapses to `MediaMetadata::default()`.
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, path: &Path) -> MediaMetadata;

    /// Probe an in-memory copy of a file that lives on a remote share.
    fn probe_bytes(&self, _name: &str, _bytes: Vec<u8>) -> MediaMetadata {
        MediaMetadata::default()
    }
}

/// Tag reader backed by `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyProbe;

impl LoftyProbe {
    fn read_path(path: &Path) -> Result<MediaMetadata> {
        let tagged = Probe::open(path)?.read()?;
        let mut meta = Self::from_tagged(&tagged);

        let last_mod = std::fs::metadata(path)?
            .modified()?
            .duration_since(UNIX_EPOCH)?
            .as_millis() as i64;
        meta.last_modified = last_mod;

        Ok(meta)
    }

    fn read_bytes(bytes: Vec<u8>) -> Result<MediaMetadata> {
        let tagged = Probe::new(Cursor::new(bytes)).guess_file_type()?.read()?;
        Ok(Self::from_tagged(&tagged))
    }

    fn from_tagged(tagged: &TaggedFile) -> MediaMetadata {
        let duration = tagged.properties().duration();

        match tagged.primary_tag().or_else(|| tagged.first_tag()) {
            Some(tag) => MediaMetadata {
                title: tag
                    .title()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                artist: tag.artist().map(|a| a.trim().to_string()).unwrap_or_default(),
                album: tag.album().map(|a| a.trim().to_string()).unwrap_or_default(),
                duration,
                year: tag.year(),
                last_modified: 0,
            },
            None => MediaMetadata {
                duration,
                ..Default::default()
            },
        }
    }
}

impl MetadataProbe for LoftyProbe {
    fn probe(&self, path: &Path) -> MediaMetadata {
        Self::read_path(path).unwrap_or_else(|e| {
            tracing::debug!("metadata probe failed for {}: {e}", path.display());
            MediaMetadata::default()
        })
    }

    fn probe_bytes(&self, name: &str, bytes: Vec<u8>) -> MediaMetadata {
        Self::read_bytes(bytes).unwrap_or_else(|e| {
            tracing::debug!("metadata probe failed for {name}: {e}");
            MediaMetadata::default()
        })
    }
}
