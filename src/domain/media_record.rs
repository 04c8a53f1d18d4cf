use super::MediaKind;
use crate::get_readable_duration;
use std::time::Duration;

/// Which scan pass produced a snapshot.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub enum Fidelity {
    /// Filename-derived titles only, still enriching.
    #[default]
    Fast,
    /// Metadata probed for every file.
    Full,
}

impl Fidelity {
    pub fn is_loading(&self) -> bool {
        *self == Fidelity::Fast
    }
}

/// One indexed file. Identity is `(id, path)`; `id` is zero for records
/// that came out of a fast scan.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: u64,
    pub kind: MediaKind,
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artist_id: u64,
    pub album_id: u64,
    pub duration: Duration,
    pub year: Option<u32>,
    pub folder: String,
    pub date_added: i64,
    pub size: u64,
    pub source_id: String,
}

impl MediaRecord {
    /// Build a record from nothing but its location. Title is the file name
    /// without extension, folder is the name of the parent directory.
    pub fn from_path(kind: MediaKind, path: &str, delimiter: char, source_id: &str) -> Self {
        let mut segments = path.rsplit(delimiter);
        let file_name = segments.next().unwrap_or(path);
        let folder = segments.next().unwrap_or_default();

        let title = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };

        MediaRecord {
            kind,
            path: path.to_string(),
            title: title.to_string(),
            folder: folder.to_string(),
            source_id: source_id.to_string(),
            ..Default::default()
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.path)
    }

    pub fn get_duration_str(&self) -> String {
        get_readable_duration(self.duration, crate::DurationStyle::Compact)
    }

    pub fn is_same_item(&self, other: &MediaRecord) -> bool {
        self.id == other.id && self.path == other.path
    }
}
