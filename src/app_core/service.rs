use crate::{
    config::Config,
    database::{CatalogStore, CatalogSynchronizer, SyncReport},
    domain::{Fidelity, MediaRecord},
    library::{
        BrowseId, BrowseItem, ChannelObserver, MetadataProbe, ScanSummary, ShareConnector,
        SharePoller, Source, SourceBackend, SourceEvent, SourceRegistry, SourceScanner,
    },
    player::PlayerHandle,
};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::{
    collections::HashSet,
    mem,
    sync::{Arc, Mutex, PoisonError, Weak, atomic::AtomicBool},
    thread::{self, JoinHandle},
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    ScanFinished {
        id: String,
        fidelity: Fidelity,
        summary: ScanSummary,
    },
    Synced {
        id: String,
        report: SyncReport,
    },
    SyncFailed {
        id: String,
        error: String,
    },
    SourceUnreachable {
        id: String,
    },
}

/// Glue between attach/detach signals, the scanner, the registry and the
/// persisted catalog.
pub struct MediaService {
    config: Config,
    registry: Arc<SourceRegistry>,
    scanner: Arc<SourceScanner>,
    synchronizer: Arc<CatalogSynchronizer>,
    excluded: Arc<HashSet<String>>,

    events_tx: Sender<ServiceEvent>,
    events_rx: Receiver<ServiceEvent>,
    changes: Receiver<BrowseId>,

    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MediaService {
    pub fn new(
        config: Config,
        probe: Arc<dyn MetadataProbe>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        let (change_tx, change_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();

        let registry = Arc::new(SourceRegistry::new(Arc::new(ChannelObserver(change_tx))));

        let (progress_tx, progress_rx) = unbounded();
        let scanner = SourceScanner::new(probe, &config).with_observer(Arc::new(move || {
            let _ = progress_tx.send(());
        }));
        forward_scan_progress(progress_rx, Arc::downgrade(&registry));

        let excluded = config
            .scan
            .excluded_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        MediaService {
            config,
            registry,
            scanner: Arc::new(scanner),
            synchronizer: Arc::new(CatalogSynchronizer::new(store)),
            excluded: Arc::new(excluded),

            events_tx,
            events_rx,
            changes: change_rx,

            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn handle_event(&self, event: SourceEvent) {
        match event {
            SourceEvent::Attached { id, backend } => {
                self.attach(&id, backend);
            }
            SourceEvent::Detached { id } => {
                self.detach(&id);
            }
            SourceEvent::Unreachable { id } => self.mark_unreachable(&id),
        }
    }

    /// Consume events until every sender is gone.
    pub fn run(&self, events: Receiver<SourceEvent>) {
        for event in events.iter() {
            self.handle_event(event);
        }
        debug!("source event stream closed");
    }

    /// Register the source and start its fast and full scans in the
    /// background.
    pub fn attach(&self, id: &str, backend: SourceBackend) -> Arc<Source> {
        let source = Source::new(id, backend);
        self.registry.add(Arc::clone(&source));

        let worker = ScanWorker {
            source: Arc::clone(&source),
            registry: Arc::clone(&self.registry),
            scanner: Arc::clone(&self.scanner),
            synchronizer: Arc::clone(&self.synchronizer),
            excluded: Arc::clone(&self.excluded),
            events: self.events_tx.clone(),
        };

        let handle = thread::spawn(move || worker.run());
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);

        source
    }

    /// Returns true when the removed source was the selected one.
    pub fn detach(&self, id: &str) -> bool {
        let was_selected = self.registry.selected_id().as_deref() == Some(id);
        self.registry.remove(id).is_some() && was_selected
    }

    fn mark_unreachable(&self, id: &str) {
        if let Some(source) = self.registry.get(Some(id)) {
            warn!("source {id} is unreachable");
            source.set_reachable(false);
            self.registry.notify_changed(true);
        }
        let _ = self.events_tx.send(ServiceEvent::SourceUnreachable { id: id.to_string() });
    }

    /// Poll a network share for devices on a background thread and feed
    /// what it finds into this service.
    pub fn watch_share(
        self: &Arc<Self>,
        connector: Arc<dyn ShareConnector>,
        shutdown: Arc<AtomicBool>,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let (tx, rx) = unbounded();
        let poller = SharePoller::new(connector, self.config.remote.clone(), tx).spawn(shutdown);

        let service = Arc::clone(self);
        let dispatcher = thread::spawn(move || service.run(rx));

        (poller, dispatcher)
    }

    pub fn browse(&self, id: &BrowseId) -> Vec<BrowseItem> {
        self.registry.browse(id, self.config.browse.limit)
    }

    /// Songs directly inside a browsed folder as a queue, plus the index of
    /// `start` in it. A `start` that is absent or not among the songs begins
    /// at the first one. `None` when the node is not a folder of an attached
    /// source or holds no songs.
    pub fn queue_from(
        &self,
        folder: &BrowseId,
        start: Option<&str>,
    ) -> Option<(Vec<Arc<MediaRecord>>, usize)> {
        let (source, path) = match folder {
            BrowseId::Root => return None,
            BrowseId::Source(id) => {
                let source = self.registry.get(Some(id))?;
                let root = source.root_path();
                (source, root)
            }
            BrowseId::Folder { source, path } => (self.registry.get(Some(source))?, path.clone()),
        };

        let records = source.playable_in(&path);
        if records.is_empty() {
            return None;
        }

        let index = start
            .and_then(|start| records.iter().position(|r| r.path == start))
            .unwrap_or(0);

        Some((records, index))
    }

    /// Replace the player's queue with the songs of `folder` and start
    /// playing at `start`. Returns false when there is nothing to play.
    pub fn play_from(
        &self,
        player: &PlayerHandle,
        folder: &BrowseId,
        start: Option<&str>,
    ) -> Result<bool> {
        let Some((records, index)) = self.queue_from(folder, start) else {
            debug!("nothing playable under {folder:?}");
            return Ok(false);
        };

        info!("queueing {} songs from {folder:?} at {index}", records.len());
        player.open_queue(records, index, true)?;
        Ok(true)
    }

    /// Block until every scan started so far has finished and reconciled.
    pub fn join_scans(&self) {
        loop {
            let workers = mem::take(
                &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if workers.is_empty() {
                break;
            }
            for handle in workers {
                if handle.join().is_err() {
                    error!("scan worker panicked");
                }
            }
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn synchronizer(&self) -> &Arc<CatalogSynchronizer> {
        &self.synchronizer
    }

    pub fn events(&self) -> &Receiver<ServiceEvent> {
        &self.events_rx
    }

    /// Browse nodes whose children changed.
    pub fn changes(&self) -> &Receiver<BrowseId> {
        &self.changes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Relay scan progress to the registry from a thread of its own, so scan
/// threads never wait on the registry lock. Bursts collapse into one notice.
/// Ends when every scanner is dropped or the registry is gone.
fn forward_scan_progress(
    progress: Receiver<()>,
    registry: Weak<SourceRegistry>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while progress.recv().is_ok() {
            progress.try_iter().count();

            match registry.upgrade() {
                Some(registry) => registry.notify_changed(false),
                None => break,
            }
        }
    })
}

struct ScanWorker {
    source: Arc<Source>,
    registry: Arc<SourceRegistry>,
    scanner: Arc<SourceScanner>,
    synchronizer: Arc<CatalogSynchronizer>,
    excluded: Arc<HashSet<String>>,
    events: Sender<ServiceEvent>,
}

impl ScanWorker {
    fn run(self) {
        let id = self.source.id().to_string();

        for fidelity in [Fidelity::Fast, Fidelity::Full] {
            let summary = self.scanner.scan(
                &id,
                self.source.backend(),
                &self.excluded,
                fidelity,
                self.source.sink(fidelity),
            );

            if fidelity == Fidelity::Full {
                self.source.publish_full();
                self.registry.notify_changed(true);
            }

            self.emit(ServiceEvent::ScanFinished {
                id: id.clone(),
                fidelity,
                summary,
            });
        }

        if !self.is_attached() {
            debug!("source {id} detached during scan, dropping results");
            return;
        }

        let event = match self.synchronizer.reconcile(&id, &self.source.full_songs()) {
            Ok(report) => {
                info!("catalog for {id} synced: {report:?}");
                ServiceEvent::Synced { id, report }
            }
            Err(e) => {
                error!("catalog sync for {id} failed: {e:#}");
                ServiceEvent::SyncFailed {
                    id,
                    error: format!("{e:#}"),
                }
            }
        };
        self.emit(event);
    }

    fn is_attached(&self) -> bool {
        self.registry
            .get(Some(self.source.id()))
            .is_some_and(|current| Arc::ptr_eq(&current, &self.source))
    }

    fn emit(&self, event: ServiceEvent) {
        let _ = self.events.send(event);
    }
}
