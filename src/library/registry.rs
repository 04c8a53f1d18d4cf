use crate::library::{BrowseId, Source};
use crossbeam_channel::Sender;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::info;

/// Receives "children of this node changed" notices.
pub trait CatalogObserver: Send + Sync {
    fn children_changed(&self, node: &BrowseId);
}

/// Forwards notices over an unbounded channel so the caller never blocks.
pub struct ChannelObserver(pub Sender<BrowseId>);

impl CatalogObserver for ChannelObserver {
    fn children_changed(&self, node: &BrowseId) {
        let _ = self.0.send(node.clone());
    }
}

#[derive(Default)]
struct RegistryState {
    sources: HashMap<String, Arc<Source>>,
    selected: Option<String>,
    observed: Option<BrowseId>,
}

/// Attached sources, the current selection and the node a client is
/// looking at. Mutations are serialized, published `Source` data is read
/// without holding the registry lock.
pub struct SourceRegistry {
    state: Mutex<RegistryState>,
    observer: Arc<dyn CatalogObserver>,
}

impl SourceRegistry {
    pub fn new(observer: Arc<dyn CatalogObserver>) -> Self {
        SourceRegistry {
            state: Mutex::new(RegistryState::default()),
            observer,
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a source, replacing any previous one with the same id. The
    /// first source added becomes the selection.
    pub fn add(&self, source: Arc<Source>) {
        {
            let mut state = self.state();
            let id = source.id().to_string();

            if state.selected.is_none() {
                state.selected = Some(id.clone());
            }
            info!("source {id} added");
            state.sources.insert(id, source);
        }
        self.notify_changed(true);
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Source>> {
        let removed = {
            let mut state = self.state();
            let removed = state.sources.remove(id);

            if removed.is_some() && state.selected.as_deref() == Some(id) {
                state.selected = state.sources.keys().next().cloned();
            }
            removed
        };

        if removed.is_some() {
            info!("source {id} removed");
            self.notify_changed(true);
        }
        removed
    }

    /// `None` resolves to the selected source.
    pub fn get(&self, id: Option<&str>) -> Option<Arc<Source>> {
        let state = self.state();
        let id = match id {
            Some(id) => id,
            None => state.selected.as_deref()?,
        };
        state.sources.get(id).cloned()
    }

    pub fn select(&self, id: &str) -> bool {
        let changed = {
            let mut state = self.state();
            match state.sources.contains_key(id) && state.selected.as_deref() != Some(id) {
                true => {
                    state.selected = Some(id.to_string());
                    true
                }
                false => false,
            }
        };

        if changed {
            self.notify_changed(true);
        }
        changed
    }

    pub fn selected_id(&self) -> Option<String> {
        self.state().selected.clone()
    }

    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn sources(&self) -> Vec<Arc<Source>> {
        let mut sources: Vec<Arc<Source>> = self.state().sources.values().cloned().collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        sources
    }

    pub fn len(&self) -> usize {
        self.state().sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_observed(&self, node: BrowseId) {
        self.state().observed = Some(node);
    }

    pub fn observed(&self) -> Option<BrowseId> {
        self.state().observed.clone()
    }

    /// Fan out a change notice to the observed node, and to the top-level
    /// source list when asked.
    pub fn notify_changed(&self, include_top_level: bool) {
        let observed = self.observed();

        if include_top_level {
            self.observer.children_changed(&BrowseId::Root);
        }

        match observed {
            Some(BrowseId::Root) if include_top_level => {}
            Some(node) => self.observer.children_changed(&node),
            None => {}
        }
    }
}
