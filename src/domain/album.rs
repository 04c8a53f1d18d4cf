/// Album aggregate derived from the songs of one source.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatalogAlbum {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub artist_id: u64,
    pub year: Option<u32>,
    pub song_count: u32,
    pub date_added: i64,
    pub source_id: String,
}
