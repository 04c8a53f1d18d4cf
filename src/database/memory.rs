use crate::{
    database::CatalogStore,
    domain::{CatalogAlbum, CatalogArtist, MediaRecord},
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Default)]
struct Tables {
    songs: HashMap<(String, String), MediaRecord>,
    albums: HashMap<u64, CatalogAlbum>,
    artists: HashMap<u64, CatalogArtist>,
}

/// Catalog kept entirely in memory. Used when no database can be opened and
/// in tests.
#[derive(Default)]
pub struct MemoryCatalogStore {
    tables: Mutex<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn upsert_songs(&self, songs: &[MediaRecord]) -> Result<()> {
        let mut tables = self.tables();
        for song in songs {
            let key = (song.source_id.clone(), song.path.clone());
            tables.songs.insert(key, song.clone());
        }
        Ok(())
    }

    fn songs_by_source(&self, source_id: &str) -> Result<Vec<MediaRecord>> {
        let mut songs: Vec<MediaRecord> = self
            .tables()
            .songs
            .values()
            .filter(|s| s.source_id == source_id)
            .cloned()
            .collect();
        songs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(songs)
    }

    fn delete_songs(&self, source_id: &str, paths: &[String]) -> Result<()> {
        let mut tables = self.tables();
        for path in paths {
            tables.songs.remove(&(source_id.to_string(), path.clone()));
        }
        Ok(())
    }

    fn upsert_albums(&self, albums: &[CatalogAlbum]) -> Result<()> {
        let mut tables = self.tables();
        for album in albums {
            tables.albums.insert(album.id, album.clone());
        }
        Ok(())
    }

    fn albums_by_source(&self, source_id: &str) -> Result<Vec<CatalogAlbum>> {
        let mut albums: Vec<CatalogAlbum> = self
            .tables()
            .albums
            .values()
            .filter(|a| a.source_id == source_id)
            .cloned()
            .collect();
        albums.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(albums)
    }

    fn delete_albums(&self, ids: &[u64]) -> Result<()> {
        let mut tables = self.tables();
        for id in ids {
            tables.albums.remove(id);
        }
        Ok(())
    }

    fn upsert_artists(&self, artists: &[CatalogArtist]) -> Result<()> {
        let mut tables = self.tables();
        for artist in artists {
            tables.artists.insert(artist.id, artist.clone());
        }
        Ok(())
    }

    fn artists_by_source(&self, source_id: &str) -> Result<Vec<CatalogArtist>> {
        let mut artists: Vec<CatalogArtist> = self
            .tables()
            .artists
            .values()
            .filter(|a| a.source_id == source_id)
            .cloned()
            .collect();
        artists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artists)
    }

    fn delete_artists(&self, ids: &[u64]) -> Result<()> {
        let mut tables = self.tables();
        for id in ids {
            tables.artists.remove(id);
        }
        Ok(())
    }
}
