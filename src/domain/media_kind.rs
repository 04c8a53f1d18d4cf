use rusqlite::{
    Result as RusqliteResult, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef},
};
use std::{
    collections::HashSet,
    fmt::Display,
    sync::LazyLock,
};

static AUDIO_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "mp3", "wav", "wma", "ogg", "m4a", "opus", "flac", "aac", "m4b", "amr",
    ])
});

static IMAGE_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "jpg", "png", "jpeg", "bmp", "webp", "heic", "heif", "apng", "avif", "gif",
    ])
});

static VIDEO_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "mp4", "mkv", "webm", "avi", "3gp", "mov", "m4v", "m2v", "3gpp", "mts", "m2ts",
    ])
});

#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub enum MediaKind {
    Audio = 1,
    Image = 2,
    Video = 3,
    #[default]
    Other = 0,
}

/// Single point of truth for extension based classification.
///
/// Works on both `/` and `\` separated names, the extension is matched
/// case-insensitively.
pub fn classify(name: &str) -> MediaKind {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let ext = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => return MediaKind::Other,
    };

    match ext.as_str() {
        e if AUDIO_EXTENSIONS.contains(e) => MediaKind::Audio,
        e if IMAGE_EXTENSIONS.contains(e) => MediaKind::Image,
        e if VIDEO_EXTENSIONS.contains(e) => MediaKind::Video,
        _ => MediaKind::Other,
    }
}

impl MediaKind {
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::Audio,
            2 => Self::Image,
            3 => Self::Video,
            _ => Self::Other,
        }
    }

    pub fn to_i64(&self) -> i64 {
        *self as i64
    }

    pub fn is_playable(&self) -> bool {
        matches!(self, MediaKind::Audio | MediaKind::Video)
    }
}

impl FromSql for MediaKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(MediaKind::from_i64(i)),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl ToSql for MediaKind {
    fn to_sql(&self) -> RusqliteResult<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(self.to_i64())))
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify("/m/song1.mp3"), MediaKind::Audio);
        assert_eq!(classify("/m/cover.JPG"), MediaKind::Image);
        assert_eq!(classify(r"usb3\clips\holiday.M2TS"), MediaKind::Video);
        assert_eq!(classify("/m/notes.txt"), MediaKind::Other);
    }

    #[test]
    fn names_without_extension_are_other() {
        assert_eq!(classify("/m/README"), MediaKind::Other);
        assert_eq!(classify("/m/.flac"), MediaKind::Other);
        assert_eq!(classify("/m.d/file"), MediaKind::Other);
    }

    #[test]
    fn playable_kinds() {
        assert!(MediaKind::Audio.is_playable());
        assert!(MediaKind::Video.is_playable());
        assert!(!MediaKind::Image.is_playable());
    }
}
