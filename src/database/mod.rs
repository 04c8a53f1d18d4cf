use anyhow::{Result, anyhow};
use queries::*;
use rusqlite::{Connection, Row, params, types::Type};
use std::{
    fs,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

mod memory;
pub mod queries;
mod snapshot;
mod store;
mod sync;
mod tables;

pub use memory::MemoryCatalogStore;
pub use store::CatalogStore;
pub use sync::{CatalogSynchronizer, SyncReport, derive_albums, derive_artists};

use crate::{
    config::Config,
    domain::{CatalogAlbum, CatalogArtist, MediaRecord},
};

/// SQLite backed catalog.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at the configured location, creating the config
    /// directory when needed.
    pub fn open(config: &Config) -> Result<Self> {
        let db_path = config
            .database_path()
            .ok_or_else(|| anyhow!("Config folder not present on system!"))?;

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Self::open_at(&db_path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;

        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_tables(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute_batch(tables::CREATE_TABLES)?;
        tx.commit()?;

        Ok(())
    }

    fn delete_by_id(&self, query: &str, ids: &[u64]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(query)?;
            for id in ids {
                stmt.execute([id.to_le_bytes()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn read_id(row: &Row, column: &str) -> rusqlite::Result<u64> {
    let bytes: Vec<u8> = row.get(column)?;
    let array: [u8; 8] = bytes.try_into().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, "Invalid id bytes length".into())
    })?;
    Ok(u64::from_le_bytes(array))
}

impl CatalogStore for Database {
    // ===================
    //   SONG OPERATIONS
    // ===================

    fn upsert_songs(&self, songs: &[MediaRecord]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SONG)?;

            for song in songs {
                stmt.execute(params![
                    song.id.to_le_bytes(),
                    &song.source_id,
                    &song.path,
                    &song.kind,
                    &song.title,
                    &song.artist,
                    &song.album,
                    song.artist_id.to_le_bytes(),
                    song.album_id.to_le_bytes(),
                    song.duration.as_secs_f64(),
                    &song.year,
                    &song.folder,
                    song.date_added,
                    song.size as i64,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn songs_by_source(&self, source_id: &str) -> Result<Vec<MediaRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(GET_SONGS_BY_SOURCE)?;

        let songs = stmt
            .query_map([source_id], |row| {
                Ok(MediaRecord {
                    id: read_id(row, "id")?,
                    kind: row.get("kind")?,
                    path: row.get("path")?,
                    title: row.get("title")?,
                    artist: row.get("artist")?,
                    album: row.get("album")?,
                    artist_id: read_id(row, "artist_id")?,
                    album_id: read_id(row, "album_id")?,
                    duration: Duration::from_secs_f64(
                        row.get::<_, Option<f64>>("duration")?.unwrap_or_default().max(0.0),
                    ),
                    year: row.get("year")?,
                    folder: row.get("folder")?,
                    date_added: row.get::<_, Option<i64>>("date_added")?.unwrap_or_default(),
                    size: row.get::<_, Option<i64>>("size")?.unwrap_or_default() as u64,
                    source_id: row.get("source_id")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(songs)
    }

    fn delete_songs(&self, source_id: &str, paths: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(DELETE_SONG)?;
            for path in paths {
                stmt.execute(params![source_id, path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ====================
    //   ALBUM OPERATIONS
    // ====================

    fn upsert_albums(&self, albums: &[CatalogAlbum]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_ALBUM)?;

            for album in albums {
                stmt.execute(params![
                    album.id.to_le_bytes(),
                    &album.source_id,
                    &album.title,
                    &album.artist,
                    album.artist_id.to_le_bytes(),
                    &album.year,
                    album.song_count,
                    album.date_added,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn albums_by_source(&self, source_id: &str) -> Result<Vec<CatalogAlbum>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(GET_ALBUMS_BY_SOURCE)?;

        let albums = stmt
            .query_map([source_id], |row| {
                Ok(CatalogAlbum {
                    id: read_id(row, "id")?,
                    title: row.get("title")?,
                    artist: row.get("artist")?,
                    artist_id: read_id(row, "artist_id")?,
                    year: row.get("year")?,
                    song_count: row.get("song_count")?,
                    date_added: row.get::<_, Option<i64>>("date_added")?.unwrap_or_default(),
                    source_id: row.get("source_id")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(albums)
    }

    fn delete_albums(&self, ids: &[u64]) -> Result<()> {
        self.delete_by_id(DELETE_ALBUM, ids)
    }

    // =====================
    //   ARTIST OPERATIONS
    // =====================

    fn upsert_artists(&self, artists: &[CatalogArtist]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_ARTIST)?;

            for artist in artists {
                stmt.execute(params![
                    artist.id.to_le_bytes(),
                    &artist.source_id,
                    &artist.name,
                    artist.album_count,
                    artist.song_count,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn artists_by_source(&self, source_id: &str) -> Result<Vec<CatalogArtist>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(GET_ARTISTS_BY_SOURCE)?;

        let artists = stmt
            .query_map([source_id], |row| {
                Ok(CatalogArtist {
                    id: read_id(row, "id")?,
                    name: row.get("name")?,
                    album_count: row.get("album_count")?,
                    song_count: row.get("song_count")?,
                    source_id: row.get("source_id")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(artists)
    }

    fn delete_artists(&self, ids: &[u64]) -> Result<()> {
        self.delete_by_id(DELETE_ARTIST, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;

    fn song(id: u64, path: &str, source: &str) -> MediaRecord {
        MediaRecord {
            id,
            kind: MediaKind::Audio,
            path: path.to_string(),
            title: String::from("Title"),
            artist: String::from("Artist"),
            album: String::from("Album"),
            artist_id: 7,
            album_id: u64::MAX,
            duration: Duration::from_secs(215),
            year: Some(1999),
            folder: String::from("m"),
            date_added: 1_700_000_000,
            size: 4096,
            source_id: source.to_string(),
        }
    }

    #[test]
    fn songs_round_trip_by_source() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_songs(&[
            song(1, "/m/a.mp3", "usb1"),
            song(2, "/m/b.mp3", "usb1"),
            song(3, "/n/c.mp3", "usb2"),
        ])
        .unwrap();

        let songs = db.songs_by_source("usb1").unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0], song(1, "/m/a.mp3", "usb1"));

        db.delete_songs("usb1", &[String::from("/m/a.mp3")]).unwrap();
        let songs = db.songs_by_source("usb1").unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, 2);
        assert_eq!(db.songs_by_source("usb2").unwrap().len(), 1);
    }

    #[test]
    fn upsert_replaces_by_source_and_path() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_songs(&[song(1, "/m/a.mp3", "usb1")]).unwrap();

        // edited file keeps its path
        db.upsert_songs(&[song(9, "/m/a.mp3", "usb1")]).unwrap();
        let songs = db.songs_by_source("usb1").unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, 9);

        // a copy elsewhere is a separate row
        db.upsert_songs(&[song(9, "/m/sub/a.mp3", "usb1")]).unwrap();
        let paths: Vec<String> = db
            .songs_by_source("usb1")
            .unwrap()
            .into_iter()
            .map(|s| s.path)
            .collect();
        assert_eq!(paths, vec!["/m/a.mp3", "/m/sub/a.mp3"]);
    }

    #[test]
    fn equal_ids_on_two_sources_stay_apart() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_songs(&[song(4, "/hit.mp3", "usb1")]).unwrap();
        db.upsert_songs(&[song(4, "/hit.mp3", "usb2")]).unwrap();

        assert_eq!(db.songs_by_source("usb1").unwrap().len(), 1);
        assert_eq!(db.songs_by_source("usb2").unwrap().len(), 1);

        db.delete_songs("usb2", &[String::from("/hit.mp3")]).unwrap();
        assert_eq!(db.songs_by_source("usb1").unwrap()[0].id, 4);
        assert!(db.songs_by_source("usb2").unwrap().is_empty());
    }

    #[test]
    fn albums_and_artists_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let album = CatalogAlbum {
            id: 11,
            title: String::from("Blue"),
            artist: String::from("Joni Mitchell"),
            artist_id: 12,
            year: Some(1971),
            song_count: 10,
            date_added: 5,
            source_id: String::from("usb1"),
        };
        let artist = CatalogArtist {
            id: 12,
            name: String::from("Joni Mitchell"),
            album_count: 1,
            song_count: 10,
            source_id: String::from("usb1"),
        };

        db.upsert_albums(&[album.clone()]).unwrap();
        db.upsert_artists(&[artist.clone()]).unwrap();

        assert_eq!(db.albums_by_source("usb1").unwrap(), vec![album]);
        assert_eq!(db.artists_by_source("usb1").unwrap(), vec![artist]);

        db.delete_albums(&[11]).unwrap();
        db.delete_artists(&[12]).unwrap();
        assert!(db.albums_by_source("usb1").unwrap().is_empty());
        assert!(db.artists_by_source("usb1").unwrap().is_empty());
    }

    #[test]
    fn opens_database_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.upsert_songs(&[song(1, "/m/a.mp3", "usb1")]).unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.songs_by_source("usb1").unwrap().len(), 1);
    }
}
