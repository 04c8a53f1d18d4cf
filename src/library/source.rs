use crate::{
    domain::{Fidelity, MediaKind, MediaRecord},
    library::{PathIndex, PathNode, RemoteShareClient, SHARE_DELIMITER},
};
use indexmap::IndexMap;
use std::{
    fmt,
    path::PathBuf,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Where a source's files live.
#[derive(Clone)]
pub enum SourceBackend {
    Local {
        root: PathBuf,
    },
    Remote {
        client: Arc<dyn RemoteShareClient>,
        root: String,
    },
}

impl SourceBackend {
    pub fn delimiter(&self) -> char {
        match self {
            SourceBackend::Local { .. } => '/',
            SourceBackend::Remote { .. } => SHARE_DELIMITER,
        }
    }

    /// Root of the source as it appears in record paths.
    pub fn root_path(&self) -> String {
        match self {
            SourceBackend::Local { root } => root.to_string_lossy().into_owned(),
            SourceBackend::Remote { root, .. } => root.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceBackend::Remote { .. })
    }
}

impl fmt::Debug for SourceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceBackend::Local { root } => write!(f, "Local({})", root.display()),
            SourceBackend::Remote { root, .. } => write!(f, "Remote({root})"),
        }
    }
}

/// Discrete attach/detach signals. Delivery order relative to scan
/// completion is not guaranteed.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Attached { id: String, backend: SourceBackend },
    Detached { id: String },
    Unreachable { id: String },
}

impl SourceEvent {
    pub fn local(id: &str, root: impl Into<PathBuf>) -> Self {
        SourceEvent::Attached {
            id: id.to_string(),
            backend: SourceBackend::Local { root: root.into() },
        }
    }

    pub fn remote(id: &str, client: Arc<dyn RemoteShareClient>) -> Self {
        SourceEvent::Attached {
            id: id.to_string(),
            backend: SourceBackend::Remote {
                client,
                root: id.to_string(),
            },
        }
    }
}

/// Per-type record maps keyed by path plus the path tree, for one pass.
#[derive(Debug, Clone)]
pub struct MediaCatalog {
    pub songs: IndexMap<String, Arc<MediaRecord>>,
    pub images: IndexMap<String, Arc<MediaRecord>>,
    pub videos: IndexMap<String, Arc<MediaRecord>>,
    pub tree: PathIndex,
}

impl MediaCatalog {
    pub fn new(delimiter: char) -> Self {
        MediaCatalog {
            songs: IndexMap::new(),
            images: IndexMap::new(),
            videos: IndexMap::new(),
            tree: PathIndex::new(delimiter),
        }
    }

    /// Records of kind `Other` are dropped. A path seen twice keeps the
    /// latest record.
    pub fn insert(&mut self, record: MediaRecord) {
        let map = match record.kind {
            MediaKind::Audio => &mut self.songs,
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
            MediaKind::Other => return,
        };

        self.tree.insert(&record.path);
        map.insert(record.path.clone(), Arc::new(record));
    }

    pub fn get(&self, path: &str) -> Option<Arc<MediaRecord>> {
        self.songs
            .get(path)
            .or_else(|| self.videos.get(path))
            .or_else(|| self.images.get(path))
            .cloned()
    }

    pub fn song_list(&self) -> Vec<MediaRecord> {
        self.songs.values().map(|s| MediaRecord::clone(s)).collect()
    }

    pub fn len(&self) -> usize {
        self.songs.len() + self.images.len() + self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One attached volume or share. Holds a fast snapshot and a full snapshot;
/// readers are routed to whichever one matches the current fidelity.
pub struct Source {
    id: String,
    backend: SourceBackend,
    full_ready: AtomicBool,
    reachable: AtomicBool,
    fast: RwLock<MediaCatalog>,
    full: RwLock<MediaCatalog>,
}

impl Source {
    pub fn new(id: &str, backend: SourceBackend) -> Arc<Self> {
        let delimiter = backend.delimiter();
        Arc::new(Source {
            id: id.to_string(),
            backend,
            full_ready: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            fast: RwLock::new(MediaCatalog::new(delimiter)),
            full: RwLock::new(MediaCatalog::new(delimiter)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &SourceBackend {
        &self.backend
    }

    pub fn root_path(&self) -> String {
        self.backend.root_path()
    }

    pub fn delimiter(&self) -> char {
        self.backend.delimiter()
    }

    pub fn fidelity(&self) -> Fidelity {
        match self.full_ready.load(Ordering::Acquire) {
            true => Fidelity::Full,
            false => Fidelity::Fast,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.fidelity().is_loading()
    }

    /// Full results become visible to readers only through this call.
    pub fn publish_full(&self) {
        self.full_ready.store(true, Ordering::Release);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Write target for a scan pass.
    pub fn sink(&self, fidelity: Fidelity) -> &RwLock<MediaCatalog> {
        match fidelity {
            Fidelity::Fast => &self.fast,
            Fidelity::Full => &self.full,
        }
    }

    /// Run `f` against the snapshot readers should currently see.
    pub fn with_catalog<R>(&self, f: impl FnOnce(&MediaCatalog, Fidelity) -> R) -> R {
        let fidelity = self.fidelity();
        let catalog = self
            .sink(fidelity)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&catalog, fidelity)
    }

    pub fn find_node(&self, path: &str) -> Option<PathNode> {
        self.with_catalog(|catalog, _| catalog.tree.find_node(path))
    }

    pub fn lookup(&self, path: &str) -> Option<(Arc<MediaRecord>, Fidelity)> {
        self.with_catalog(|catalog, fidelity| catalog.get(path).map(|r| (r, fidelity)))
    }

    /// Songs directly inside `folder`, in walk order, taken from the snapshot
    /// readers currently see. Subfolders and non-audio leaves are skipped.
    pub fn playable_in(&self, folder: &str) -> Vec<Arc<MediaRecord>> {
        self.with_catalog(|catalog, _| {
            let Some(node) = catalog.tree.find_node(folder) else {
                return Vec::new();
            };

            node.children
                .values()
                .filter(|child| child.is_leaf())
                .filter_map(|child| catalog.songs.get(&child.value).cloned())
                .collect()
        })
    }

    /// Songs of the completed full pass, for reconciliation.
    pub fn full_songs(&self) -> Vec<MediaRecord> {
        self.full
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .song_list()
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("fidelity", &self.fidelity())
            .finish()
    }
}
