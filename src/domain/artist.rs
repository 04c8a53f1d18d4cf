/// Artist aggregate. Counts are always recomputed, never incremented.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatalogArtist {
    pub id: u64,
    pub name: String,
    pub album_count: u32,
    pub song_count: u32,
    pub source_id: String,
}
