mod browse;
mod path_index;
pub mod probe;
mod registry;
pub mod remote;
mod scanner;
mod source;

pub use browse::{BrowseId, BrowseItem};
pub use path_index::{PathIndex, PathNode};
pub use probe::{LoftyProbe, MediaMetadata, MetadataProbe};
pub use registry::{CatalogObserver, ChannelObserver, SourceRegistry};
pub use remote::{
    RemoteShareClient, SHARE_DELIMITER, ShareConnector, ShareEntry, ShareError, SharePoller,
    ShareStatus,
};
pub use scanner::{ScanObserver, ScanSummary, SourceScanner};
pub use source::{MediaCatalog, Source, SourceBackend, SourceEvent};
