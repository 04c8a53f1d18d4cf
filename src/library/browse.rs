use crate::{
    domain::MediaKind,
    library::{PathNode, Source, SourceRegistry},
};
use std::{sync::Arc, time::Duration};

/// Address of a node in the browse hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BrowseId {
    /// List of attached sources.
    Root,
    /// Top folder of one source.
    Source(String),
    Folder { source: String, path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseItem {
    Source {
        id: String,
        selected: bool,
        loading: bool,
        reachable: bool,
    },
    Folder {
        id: BrowseId,
        name: String,
    },
    /// Audio or video.
    Playable {
        source: String,
        path: String,
        title: String,
        subtitle: String,
        kind: MediaKind,
        duration: Duration,
        loading: bool,
    },
    /// Images.
    Viewable {
        source: String,
        path: String,
        title: String,
        loading: bool,
    },
}

impl BrowseItem {
    pub fn title(&self) -> &str {
        match self {
            BrowseItem::Source { id, .. } => id,
            BrowseItem::Folder { name, .. } => name,
            BrowseItem::Playable { title, .. } | BrowseItem::Viewable { title, .. } => title,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            BrowseItem::Playable { path, .. } | BrowseItem::Viewable { path, .. } => Some(path),
            BrowseItem::Folder {
                id: BrowseId::Folder { path, .. },
                ..
            } => Some(path),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        match self {
            BrowseItem::Source { loading, .. }
            | BrowseItem::Playable { loading, .. }
            | BrowseItem::Viewable { loading, .. } => *loading,
            BrowseItem::Folder { .. } => false,
        }
    }
}

// ==============
//   BROWSING
// ==============

impl SourceRegistry {
    /// Children of `id`, folders first, at most `limit` entries. Browsing
    /// into a source other than the selected one switches the selection.
    pub fn browse(&self, id: &BrowseId, limit: usize) -> Vec<BrowseItem> {
        self.set_observed(id.clone());

        let mut items = match id {
            BrowseId::Root => self.list_sources(),
            BrowseId::Source(source_id) => match self.enter(source_id) {
                Some(source) => {
                    let root = source.root_path();
                    Self::list_folder(&source, &root)
                }
                None => Vec::new(),
            },
            BrowseId::Folder { source, path } => match self.enter(source) {
                Some(source) => Self::list_folder(&source, path),
                None => Vec::new(),
            },
        };

        items.truncate(limit);
        items
    }

    fn enter(&self, source_id: &str) -> Option<Arc<Source>> {
        let source = self.get(Some(source_id))?;
        self.select(source_id);
        Some(source)
    }

    fn list_sources(&self) -> Vec<BrowseItem> {
        let selected = self.selected_id();

        self.sources()
            .into_iter()
            .map(|source| BrowseItem::Source {
                id: source.id().to_string(),
                selected: selected.as_deref() == Some(source.id()),
                loading: source.is_loading(),
                reachable: source.is_reachable(),
            })
            .collect()
    }

    fn list_folder(source: &Source, path: &str) -> Vec<BrowseItem> {
        let Some(node) = source.find_node(path) else {
            return Vec::new();
        };

        let delimiter = source.delimiter();
        let (folders, leaves): (Vec<&PathNode>, Vec<&PathNode>) =
            node.children.values().partition(|child| !child.is_leaf());

        let folders = folders.into_iter().map(|child| BrowseItem::Folder {
            id: BrowseId::Folder {
                source: source.id().to_string(),
                path: child.value.clone(),
            },
            name: child.name(delimiter).to_string(),
        });

        let leaves = leaves.into_iter().filter_map(|child| {
            let (record, fidelity) = source.lookup(&child.value)?;
            let loading = fidelity.is_loading();

            let item = match record.kind {
                MediaKind::Audio | MediaKind::Video => BrowseItem::Playable {
                    source: source.id().to_string(),
                    path: record.path.clone(),
                    title: record.title.clone(),
                    subtitle: record.artist.clone(),
                    kind: record.kind,
                    duration: record.duration,
                    loading,
                },
                MediaKind::Image => BrowseItem::Viewable {
                    source: source.id().to_string(),
                    path: record.path.clone(),
                    title: record.title.clone(),
                    loading,
                },
                MediaKind::Other => return None,
            };
            Some(item)
        });

        folders.chain(leaves).collect()
    }
}
