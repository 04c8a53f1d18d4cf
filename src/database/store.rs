use crate::domain::{CatalogAlbum, CatalogArtist, MediaRecord};
use anyhow::Result;

/// Persisted keyed tables for songs, albums and artists. Writes are upserts
/// by primary key, deletes are by primary key. Songs are keyed by
/// `(source_id, path)`, so equal content ids never merge rows.
pub trait CatalogStore: Send + Sync {
    // =========
    //   SONGS
    // =========

    fn upsert_songs(&self, songs: &[MediaRecord]) -> Result<()>;
    fn songs_by_source(&self, source_id: &str) -> Result<Vec<MediaRecord>>;
    fn delete_songs(&self, source_id: &str, paths: &[String]) -> Result<()>;

    // ==========
    //   ALBUMS
    // ==========

    fn upsert_albums(&self, albums: &[CatalogAlbum]) -> Result<()>;
    fn albums_by_source(&self, source_id: &str) -> Result<Vec<CatalogAlbum>>;
    fn delete_albums(&self, ids: &[u64]) -> Result<()>;

    // ===========
    //   ARTISTS
    // ===========

    fn upsert_artists(&self, artists: &[CatalogArtist]) -> Result<()>;
    fn artists_by_source(&self, source_id: &str) -> Result<Vec<CatalogArtist>>;
    fn delete_artists(&self, ids: &[u64]) -> Result<()>;
}
