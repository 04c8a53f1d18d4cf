use crate::{
    catalog_key,
    database::CatalogStore,
    domain::{CatalogAlbum, CatalogArtist, MediaRecord},
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub songs_upserted: usize,
    pub songs_evicted: usize,
    pub albums_upserted: usize,
    pub albums_evicted: usize,
    pub artists_upserted: usize,
    pub artists_replaced: usize,
    pub artists_evicted: usize,
}

/// Group songs by album name. The first song of each group provides the
/// album's artist, year and date.
pub fn derive_albums(source_id: &str, songs: &[MediaRecord]) -> Vec<CatalogAlbum> {
    let mut groups: IndexMap<&str, CatalogAlbum> = IndexMap::new();

    for song in songs {
        groups
            .entry(song.album.as_str())
            .and_modify(|album| album.song_count += 1)
            .or_insert_with(|| CatalogAlbum {
                id: catalog_key(source_id, &song.album),
                title: song.album.clone(),
                artist: song.artist.clone(),
                artist_id: song.artist_id,
                year: song.year,
                song_count: 1,
                date_added: song.date_added,
                source_id: source_id.to_string(),
            });
    }

    groups.into_values().collect()
}

/// Group songs by artist name, counting songs and distinct albums.
pub fn derive_artists(source_id: &str, songs: &[MediaRecord]) -> Vec<CatalogArtist> {
    let mut groups: IndexMap<&str, (u32, HashSet<&str>)> = IndexMap::new();

    for song in songs {
        let (count, albums) = groups.entry(song.artist.as_str()).or_default();
        *count += 1;
        albums.insert(song.album.as_str());
    }

    groups
        .into_iter()
        .map(|(name, (song_count, albums))| CatalogArtist {
            id: catalog_key(source_id, name),
            name: name.to_string(),
            album_count: albums.len() as u32,
            song_count,
            source_id: source_id.to_string(),
        })
        .collect()
}

/// Aligns the persisted catalog of one source with its latest full scan.
pub struct CatalogSynchronizer {
    store: Arc<dyn CatalogStore>,
}

impl CatalogSynchronizer {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        CatalogSynchronizer { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Upsert `new_songs` and their aggregates, then evict whatever the scan
    /// no longer backs. A failing step aborts the pass without rolling back
    /// earlier steps; the next successful pass repairs the leftovers.
    pub fn reconcile(&self, source_id: &str, new_songs: &[MediaRecord]) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let old_songs = self
            .store
            .songs_by_source(source_id)
            .context("loading persisted songs")?;
        let old_albums = self
            .store
            .albums_by_source(source_id)
            .context("loading persisted albums")?;
        let old_artists: HashMap<u64, CatalogArtist> = self
            .store
            .artists_by_source(source_id)
            .context("loading persisted artists")?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        // Step 1: upsert songs and derived aggregates
        let albums = derive_albums(source_id, new_songs);
        let artists = derive_artists(source_id, new_songs);

        self.store.upsert_songs(new_songs).context("upserting songs")?;
        self.store.upsert_albums(&albums).context("upserting albums")?;
        self.store.upsert_artists(&artists).context("upserting artists")?;

        report.songs_upserted = new_songs.len();
        report.albums_upserted = albums.len();
        report.artists_upserted = artists.len();

        // Step 2: a song is stale only when neither its id nor its path survived
        let new_ids: HashSet<u64> = new_songs.iter().map(|s| s.id).collect();
        let new_paths: HashSet<&str> = new_songs.iter().map(|s| s.path.as_str()).collect();

        let stale_songs: Vec<String> = old_songs
            .into_iter()
            .filter(|s| !new_ids.contains(&s.id) && !new_paths.contains(s.path.as_str()))
            .map(|s| s.path)
            .collect();

        self.store
            .delete_songs(source_id, &stale_songs)
            .context("evicting songs")?;
        report.songs_evicted = stale_songs.len();

        // Step 3: albums no longer derived, or derived but referenced by no song
        let derived_ids: HashSet<u64> = albums.iter().map(|a| a.id).collect();
        let referenced: HashSet<u64> = new_songs.iter().map(|s| s.album_id).collect();

        let mut stale_albums: Vec<u64> = old_albums
            .iter()
            .map(|a| a.id)
            .filter(|id| !derived_ids.contains(id) || !referenced.contains(id))
            .collect();
        stale_albums.extend(
            albums
                .iter()
                .map(|a| a.id)
                .filter(|id| !referenced.contains(id)),
        );
        stale_albums.sort_unstable();
        stale_albums.dedup();

        self.store.delete_albums(&stale_albums).context("evicting albums")?;
        report.albums_evicted = stale_albums.len();

        let final_albums: Vec<&CatalogAlbum> = albums
            .iter()
            .filter(|a| referenced.contains(&a.id))
            .collect();

        // Step 4: artists are validated against the final album set
        let derived_artist_ids: HashSet<u64> = artists.iter().map(|a| a.id).collect();
        let mut evicted_artists: Vec<u64> = old_artists
            .keys()
            .copied()
            .filter(|id| !derived_artist_ids.contains(id))
            .collect();

        for artist in &artists {
            let owned: Vec<&&CatalogAlbum> = final_albums
                .iter()
                .filter(|album| album.artist_id == artist.id)
                .collect();

            if owned.is_empty() {
                evicted_artists.push(artist.id);
                continue;
            }

            let recomputed = CatalogArtist {
                album_count: owned.len() as u32,
                song_count: owned.iter().map(|album| album.song_count).sum(),
                ..artist.clone()
            };

            let persisted = old_artists.get(&artist.id).unwrap_or(artist);
            let stale_counts = persisted.album_count != recomputed.album_count
                || persisted.song_count != recomputed.song_count
                || artist.album_count != recomputed.album_count
                || artist.song_count != recomputed.song_count;

            if stale_counts {
                debug!(
                    "replacing artist {} ({} albums / {} songs -> {} / {})",
                    artist.name,
                    persisted.album_count,
                    persisted.song_count,
                    recomputed.album_count,
                    recomputed.song_count
                );
                self.store
                    .delete_artists(&[artist.id])
                    .context("replacing artist")?;
                self.store
                    .upsert_artists(&[recomputed])
                    .context("replacing artist")?;
                report.artists_replaced += 1;
            }
        }

        evicted_artists.sort_unstable();
        evicted_artists.dedup();
        self.store
            .delete_artists(&evicted_artists)
            .context("evicting artists")?;
        report.artists_evicted = evicted_artists.len();

        info!(
            "reconciled {source_id}: {} songs (-{}), {} albums (-{}), {} artists (-{}, {} replaced)",
            report.songs_upserted,
            report.songs_evicted,
            report.albums_upserted,
            report.albums_evicted,
            report.artists_upserted,
            report.artists_evicted,
            report.artists_replaced
        );

        Ok(report)
    }
}
