pub const CREATE_TABLES: &str = r"
    CREATE TABLE IF NOT EXISTS songs(
        id BLOB NOT NULL,
        source_id TEXT NOT NULL,
        path TEXT NOT NULL,
        kind INTEGER NOT NULL,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT NOT NULL,
        artist_id BLOB NOT NULL,
        album_id BLOB NOT NULL,
        duration REAL,
        year INTEGER,
        folder TEXT NOT NULL,
        date_added INTEGER,
        size INTEGER,
        PRIMARY KEY (source_id, path)
    );

    CREATE TABLE IF NOT EXISTS albums(
        id BLOB PRIMARY KEY,
        source_id TEXT NOT NULL,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        artist_id BLOB NOT NULL,
        year INTEGER,
        song_count INTEGER NOT NULL,
        date_added INTEGER
    );

    CREATE TABLE IF NOT EXISTS artists(
        id BLOB PRIMARY KEY,
        source_id TEXT NOT NULL,
        name TEXT NOT NULL,
        album_count INTEGER NOT NULL,
        song_count INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS session_state(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_songs_id ON songs(id);
    CREATE INDEX IF NOT EXISTS idx_albums_source ON albums(source_id);
    CREATE INDEX IF NOT EXISTS idx_artists_source ON artists(source_id);
";
