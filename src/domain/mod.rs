mod album;
mod artist;
mod media_kind;
mod media_record;

pub use album::CatalogAlbum;
pub use artist::CatalogArtist;
pub use media_kind::{MediaKind, classify};
pub use media_record::{Fidelity, MediaRecord};
