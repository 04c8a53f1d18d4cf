// ===========
//   SONGS
// ===========

pub const UPSERT_SONG: &str = "
    INSERT OR REPLACE INTO songs (
        id,
        source_id,
        path,
        kind,
        title,
        artist,
        album,
        artist_id,
        album_id,
        duration,
        year,
        folder,
        date_added,
        size
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
";

pub const GET_SONGS_BY_SOURCE: &str = "
    SELECT
        id,
        source_id,
        path,
        kind,
        title,
        artist,
        album,
        artist_id,
        album_id,
        duration,
        year,
        folder,
        date_added,
        size
    FROM songs
    WHERE source_id = ?
    ORDER BY path ASC
";

pub const DELETE_SONG: &str = "
    DELETE FROM songs WHERE source_id = ? AND path = ?
";

// ===========
//   ALBUMS
// ===========

pub const UPSERT_ALBUM: &str = "
    INSERT OR REPLACE INTO albums (
        id,
        source_id,
        title,
        artist,
        artist_id,
        year,
        song_count,
        date_added
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
";

pub const GET_ALBUMS_BY_SOURCE: &str = "
    SELECT
        id,
        source_id,
        title,
        artist,
        artist_id,
        year,
        song_count,
        date_added
    FROM albums
    WHERE source_id = ?
    ORDER BY title ASC
";

pub const DELETE_ALBUM: &str = "
    DELETE FROM albums WHERE id = ?
";

// ===========
//   ARTISTS
// ===========

pub const UPSERT_ARTIST: &str = "
    INSERT OR REPLACE INTO artists (
        id,
        source_id,
        name,
        album_count,
        song_count
    ) VALUES (?1, ?2, ?3, ?4, ?5)
";

pub const GET_ARTISTS_BY_SOURCE: &str = "
    SELECT
        id,
        source_id,
        name,
        album_count,
        song_count
    FROM artists
    WHERE source_id = ?
    ORDER BY name ASC
";

pub const DELETE_ARTIST: &str = "
    DELETE FROM artists WHERE id = ?
";

// =================
//   SESSION STATE
// =================

pub const GET_SESSION_STATE: &str = "
    SELECT value FROM session_state WHERE key = ?
";

pub const SET_SESSION_STATE: &str = "
    INSERT OR REPLACE INTO session_state (key, value) VALUES (?, ?)
";

pub const GET_PLAYBACK_SETTINGS: &str = "
    SELECT key, value FROM session_state WHERE key LIKE 'playback_%'
";
