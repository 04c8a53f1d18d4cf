use crate::{
    calculate_media_id, catalog_key,
    config::Config,
    domain::{Fidelity, MediaKind, MediaRecord, classify},
    library::{
        MediaCatalog, MetadataProbe, RemoteShareClient, SourceBackend,
        probe::MediaMetadata,
        remote::{ShareEntry, join_share_path},
    },
};
use rayon::prelude::*;
use std::{
    collections::HashSet,
    io::Read,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    time::UNIX_EPOCH,
};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Fire-and-forget "data changed" signal raised while a scan is running.
/// Implementations must not block.
pub type ScanObserver = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub songs: usize,
    pub images: usize,
    pub videos: usize,
    pub skipped_dirs: usize,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.songs + self.images + self.videos
    }
}

/// A file found by the walk that still has to be turned into a record.
enum Candidate {
    Local {
        kind: MediaKind,
        path: PathBuf,
    },
    Remote {
        kind: MediaKind,
        path: String,
        entry: ShareEntry,
    },
}

pub struct SourceScanner {
    probe: Arc<dyn MetadataProbe>,
    notify_every: usize,
    marker_file: String,
    ignore_markers: Vec<String>,
    probe_limit: u64,
    observer: Option<ScanObserver>,
}

impl SourceScanner {
    pub fn new(probe: Arc<dyn MetadataProbe>, config: &Config) -> Self {
        SourceScanner {
            probe,
            notify_every: config.scan.notify_every.max(1),
            marker_file: config.scan.marker_file.clone(),
            ignore_markers: config.remote.ignore_markers.clone(),
            probe_limit: config.remote.probe_limit_bytes,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: ScanObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Walk `backend` depth-first and stream every media file into `sink`.
    /// Unreadable directories are logged and skipped, the walk carries on
    /// with their siblings.
    pub fn scan(
        &self,
        source_id: &str,
        backend: &SourceBackend,
        excluded: &HashSet<String>,
        fidelity: Fidelity,
        sink: &RwLock<MediaCatalog>,
    ) -> ScanSummary {
        let mut pass = ScanPass {
            scanner: self,
            source_id,
            fidelity,
            sink,
            client: None,
            pending: Vec::with_capacity(self.notify_every),
            summary: ScanSummary::default(),
        };

        match backend {
            SourceBackend::Local { root } => pass.walk_local(root, excluded),
            SourceBackend::Remote { client, root } => {
                pass.client = Some(client.as_ref());
                pass.walk_remote(root, excluded);
            }
        }

        pass.flush();
        self.notify();

        info!(
            "{fidelity:?} scan of {source_id} finished: {} songs, {} images, {} videos, {} skipped",
            pass.summary.songs, pass.summary.images, pass.summary.videos, pass.summary.skipped_dirs
        );

        pass.summary
    }

    /// Scan into a fresh catalog.
    pub fn scan_to_catalog(
        &self,
        source_id: &str,
        backend: &SourceBackend,
        excluded: &HashSet<String>,
        fidelity: Fidelity,
    ) -> (MediaCatalog, ScanSummary) {
        let sink = RwLock::new(MediaCatalog::new(backend.delimiter()));
        let summary = self.scan(source_id, backend, excluded, fidelity, &sink);
        let catalog = sink.into_inner().unwrap_or_else(PoisonError::into_inner);
        (catalog, summary)
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer();
        }
    }

    fn is_excluded(path: &str, parent: &str, excluded: &HashSet<String>) -> bool {
        excluded.contains(path) || excluded.contains(parent)
    }

    fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    fn should_descend(&self, entry: &DirEntry, excluded: &HashSet<String>) -> bool {
        if entry.depth() > 0 && Self::is_hidden(&entry.file_name().to_string_lossy()) {
            return false;
        }

        let path = entry.path().to_string_lossy();
        let parent = entry
            .path()
            .parent()
            .map(|p| p.to_string_lossy())
            .unwrap_or_default();
        if Self::is_excluded(&path, &parent, excluded) {
            return false;
        }

        !(entry.file_type().is_dir() && entry.path().join(&self.marker_file).exists())
    }

    fn build_local(&self, source_id: &str, kind: MediaKind, path: &Path, fidelity: Fidelity) -> MediaRecord {
        let path_str = path.to_string_lossy();
        let mut record = MediaRecord::from_path(kind, &path_str, '/', source_id);

        if fidelity == Fidelity::Fast {
            return record;
        }

        let (size, last_mod) = match std::fs::metadata(path) {
            Ok(meta) => {
                let last_mod = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or_default();
                (meta.len(), last_mod)
            }
            Err(e) => {
                debug!("could not stat {}: {e}", path.display());
                (0, 0)
            }
        };

        let meta = match kind.is_playable() {
            true => self.probe.probe(path),
            false => MediaMetadata::default(),
        };

        Self::enrich(&mut record, meta, size, last_mod);
        record
    }

    fn build_remote(
        &self,
        client: &dyn RemoteShareClient,
        source_id: &str,
        kind: MediaKind,
        path: &str,
        entry: &ShareEntry,
        fidelity: Fidelity,
    ) -> MediaRecord {
        let mut record = MediaRecord::from_path(kind, path, crate::library::SHARE_DELIMITER, source_id);

        if fidelity == Fidelity::Fast {
            return record;
        }

        let meta = match kind == MediaKind::Audio && entry.size <= self.probe_limit {
            true => self.probe_remote(client, path),
            false => MediaMetadata::default(),
        };

        Self::enrich(&mut record, meta, entry.size, entry.last_write_time);
        record
    }

    fn probe_remote(&self, client: &dyn RemoteShareClient, path: &str) -> MediaMetadata {
        let mut bytes = Vec::new();
        let read = client
            .open_file(path)
            .map_err(anyhow::Error::from)
            .and_then(|reader| {
                reader
                    .take(self.probe_limit)
                    .read_to_end(&mut bytes)
                    .map_err(anyhow::Error::from)
            });

        match read {
            Ok(_) => self.probe.probe_bytes(path, bytes),
            Err(e) => {
                warn!("could not read {path} for metadata: {e}");
                MediaMetadata::default()
            }
        }
    }

    /// Apply probed metadata and derive the record's identities.
    fn enrich(record: &mut MediaRecord, meta: MediaMetadata, size: u64, last_mod: i64) {
        let last_mod = match meta.last_modified {
            0 => last_mod,
            probed => probed,
        };

        record.id = calculate_media_id(record.file_name(), size, last_mod);
        record.size = size;
        record.date_added = last_mod / 1000;

        if let Some(title) = meta.title {
            record.title = title;
        }
        record.artist = meta.artist;
        record.album = meta.album;
        record.duration = meta.duration;
        record.year = meta.year;
        record.artist_id = catalog_key(&record.source_id, &record.artist);
        record.album_id = catalog_key(&record.source_id, &record.album);
    }
}

struct ScanPass<'a> {
    scanner: &'a SourceScanner,
    source_id: &'a str,
    fidelity: Fidelity,
    sink: &'a RwLock<MediaCatalog>,
    client: Option<&'a dyn RemoteShareClient>,
    pending: Vec<Candidate>,
    summary: ScanSummary,
}

impl ScanPass<'_> {
    fn walk_local(&mut self, root: &Path, excluded: &HashSet<String>) {
        let scanner = self.scanner;
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| scanner.should_descend(e, excluded));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let kind = classify(&entry.file_name().to_string_lossy());
                    if kind != MediaKind::Other {
                        self.push(Candidate::Local {
                            kind,
                            path: entry.into_path(),
                        });
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {e}", root.display());
                    self.summary.skipped_dirs += 1;
                }
            }
        }
    }

    fn walk_remote(&mut self, dir: &str, excluded: &HashSet<String>) {
        let Some(client) = self.client else {
            return;
        };

        let entries = match client.open_directory(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping remote directory {dir}: {e}");
                self.summary.skipped_dirs += 1;
                return;
            }
        };

        if entries.iter().any(|e| e.name == self.scanner.marker_file) {
            debug!("{dir} opted out of indexing");
            return;
        }

        for entry in entries {
            if entry.name == "." || entry.name == ".." || SourceScanner::is_hidden(&entry.name) {
                continue;
            }

            let path = join_share_path(dir, &entry.name);
            if SourceScanner::is_excluded(&path, dir, excluded) {
                continue;
            }

            if entry.is_directory {
                if !self.scanner.ignore_markers.iter().any(|m| *m == entry.name) {
                    self.walk_remote(&path, excluded);
                }
                continue;
            }

            let kind = classify(&entry.name);
            if kind != MediaKind::Other {
                self.push(Candidate::Remote { kind, path, entry });
            }
        }
    }

    fn push(&mut self, candidate: Candidate) {
        self.pending.push(candidate);

        if self.pending.len() >= self.scanner.notify_every {
            self.flush();
            self.scanner.notify();
        }
    }

    /// Turn pending candidates into records and publish them to the sink.
    /// Local files are probed in parallel, order is preserved.
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        let (scanner, source_id, fidelity) = (self.scanner, self.source_id, self.fidelity);

        let records: Vec<MediaRecord> = match self.client {
            Some(client) => batch
                .iter()
                .filter_map(|c| match c {
                    Candidate::Remote { kind, path, entry } => Some(
                        scanner.build_remote(client, source_id, *kind, path, entry, fidelity),
                    ),
                    Candidate::Local { .. } => None,
                })
                .collect(),
            None => batch
                .par_iter()
                .filter_map(|c| match c {
                    Candidate::Local { kind, path } => {
                        Some(scanner.build_local(source_id, *kind, path, fidelity))
                    }
                    Candidate::Remote { .. } => None,
                })
                .collect(),
        };

        let mut catalog = self.sink.write().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            match record.kind {
                MediaKind::Audio => self.summary.songs += 1,
                MediaKind::Image => self.summary.images += 1,
                MediaKind::Video => self.summary.videos += 1,
                MediaKind::Other => continue,
            }
            catalog.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::remote::tests::{FakeShare, file, folder};
    use std::{
        collections::HashMap,
        fs,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// Probe that answers from a table keyed by file name.
    #[derive(Default)]
    struct TableProbe {
        tags: HashMap<String, (String, String)>,
    }

    impl MetadataProbe for TableProbe {
        fn probe(&self, path: &Path) -> MediaMetadata {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.lookup(&name)
        }

        fn probe_bytes(&self, name: &str, _bytes: Vec<u8>) -> MediaMetadata {
            let file_name = name.rsplit('\\').next().unwrap().to_string();
            self.lookup(&file_name)
        }
    }

    impl TableProbe {
        fn lookup(&self, name: &str) -> MediaMetadata {
            match self.tags.get(name) {
                Some((artist, album)) => MediaMetadata {
                    title: Some(format!("{name} (tagged)")),
                    artist: artist.clone(),
                    album: album.clone(),
                    duration: Duration::from_secs(200),
                    year: Some(1971),
                    last_modified: 0,
                },
                None => MediaMetadata::default(),
            }
        }
    }

    fn scanner_with(probe: TableProbe, notify_every: usize) -> SourceScanner {
        let mut config = Config::default();
        config.scan.notify_every = notify_every;
        SourceScanner::new(Arc::new(probe), &config)
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn fast_local_scan_classifies_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "song1.mp3");
        touch(root, "sub/song2.mp3");
        touch(root, "cover.jpg");
        touch(root, "clip.MP4");
        touch(root, "notes.txt");

        let backend = SourceBackend::Local { root: root.to_path_buf() };
        let scanner = scanner_with(TableProbe::default(), 10);
        let (catalog, summary) =
            scanner.scan_to_catalog("usb1", &backend, &HashSet::new(), Fidelity::Fast);

        assert_eq!(summary.songs, 2);
        assert_eq!(summary.images, 1);
        assert_eq!(summary.videos, 1);

        let song1 = root.join("song1.mp3").to_string_lossy().into_owned();
        let record = catalog.songs.get(&song1).unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(record.title, "song1");

        let root_node = catalog.tree.find_node(&backend.root_path()).unwrap();
        assert_eq!(root_node.children.len(), 4);
        assert!(!catalog.tree.contains(&root.join("notes.txt").to_string_lossy()));
    }

    #[test]
    fn full_local_scan_probes_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "a.mp3");
        touch(root, "b.flac");
        touch(root, "cover.png");

        let probe = TableProbe {
            tags: HashMap::from([(
                String::from("a.mp3"),
                (String::from("Can"), String::from("Tago Mago")),
            )]),
        };
        let backend = SourceBackend::Local { root: root.to_path_buf() };
        let (catalog, _) = scanner_with(probe, 10).scan_to_catalog(
            "usb1",
            &backend,
            &HashSet::new(),
            Fidelity::Full,
        );

        let a = catalog.get(&root.join("a.mp3").to_string_lossy()).unwrap();
        assert_ne!(a.id, 0);
        assert_eq!(a.title, "a.mp3 (tagged)");
        assert_eq!(a.artist, "Can");
        assert_eq!(a.album_id, catalog_key("usb1", "Tago Mago"));
        assert_eq!(a.duration, Duration::from_secs(200));
        assert_eq!(a.size, 1);

        // probe failures degrade to defaults, never drop the file
        let b = catalog.get(&root.join("b.flac").to_string_lossy()).unwrap();
        assert_eq!(b.title, "b");
        assert!(b.artist.is_empty());

        let cover = catalog.get(&root.join("cover.png").to_string_lossy()).unwrap();
        assert_ne!(cover.id, 0);
    }

    #[test]
    fn hidden_marked_and_excluded_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "keep/a.mp3");
        touch(root, ".hidden/b.mp3");
        touch(root, ".c.mp3");
        touch(root, "private/.nomedia");
        touch(root, "private/c.mp3");
        touch(root, "excluded/d.mp3");

        let excluded = HashSet::from([root.join("excluded").to_string_lossy().into_owned()]);
        let backend = SourceBackend::Local { root: root.to_path_buf() };
        let (catalog, summary) = scanner_with(TableProbe::default(), 10).scan_to_catalog(
            "usb1",
            &backend,
            &excluded,
            Fidelity::Fast,
        );

        assert_eq!(summary.songs, 1);
        assert!(catalog.songs.contains_key(&*root.join("keep/a.mp3").to_string_lossy()));
    }

    #[test]
    fn progress_is_signalled_every_n_files_and_at_the_end() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..25 {
            touch(dir.path(), &format!("track{i:02}.mp3"));
        }

        let signals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&signals);
        let scanner = scanner_with(TableProbe::default(), 10).with_observer(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let backend = SourceBackend::Local { root: dir.path().to_path_buf() };
        let (_, summary) = scanner.scan_to_catalog("usb1", &backend, &HashSet::new(), Fidelity::Fast);

        assert_eq!(summary.songs, 25);
        assert_eq!(signals.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn partial_results_are_visible_mid_scan() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            touch(dir.path(), &format!("track{i}.mp3"));
        }

        let sink = Arc::new(RwLock::new(MediaCatalog::new('/')));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (observed_sink, observed) = (Arc::clone(&sink), Arc::clone(&seen));

        let scanner = scanner_with(TableProbe::default(), 2).with_observer(Arc::new(move || {
            let len = observed_sink.read().unwrap().len();
            observed.lock().unwrap().push(len);
        }));

        let backend = SourceBackend::Local { root: dir.path().to_path_buf() };
        scanner.scan("usb1", &backend, &HashSet::new(), Fidelity::Fast, &sink);

        assert_eq!(*seen.lock().unwrap(), vec![2, 4, 4]);
    }

    fn remote_fixture() -> Arc<FakeShare> {
        let mut share = FakeShare::new()
            .dir(
                "usb3",
                vec![
                    folder("."),
                    folder(".."),
                    folder("Broken"),
                    folder("Music"),
                    folder("Pictures"),
                    folder("usb1"),
                    file("intro.mp3", 10),
                ],
            )
            .dir(
                r"usb3\Music",
                vec![file("a.mp3", 10), file("b.mp3", 10), file("readme.txt", 3)],
            )
            .dir(r"usb3\Pictures", vec![file("beach.jpg", 10), file("trip.mkv", 10)])
            .dir(r"usb3\usb1", vec![file("mirror.mp3", 10)])
            .fail(r"usb3\Broken");

        share
            .files
            .insert(String::from(r"usb3\Music\a.mp3"), vec![1, 2, 3]);
        Arc::new(share)
    }

    #[test]
    fn remote_walk_survives_failing_subdirectory() {
        let share = remote_fixture();
        let backend = SourceBackend::Remote {
            client: share,
            root: String::from("usb3"),
        };

        let (catalog, summary) = scanner_with(TableProbe::default(), 10).scan_to_catalog(
            "usb3",
            &backend,
            &HashSet::new(),
            Fidelity::Fast,
        );

        assert_eq!(summary.skipped_dirs, 1);
        assert_eq!(summary.songs, 3);
        assert_eq!(summary.images, 1);
        assert_eq!(summary.videos, 1);
        assert!(catalog.songs.contains_key(r"usb3\Music\b.mp3"));
        assert!(!catalog.songs.contains_key(r"usb3\usb1\mirror.mp3"));

        let music = catalog.tree.find_node(r"usb3\Music").unwrap();
        assert_eq!(music.children.len(), 2);
    }

    #[test]
    fn remote_full_scan_reads_tags_from_stream() {
        let probe = TableProbe {
            tags: HashMap::from([(
                String::from("a.mp3"),
                (String::from("Broadcast"), String::from("Tender Buttons")),
            )]),
        };
        let backend = SourceBackend::Remote {
            client: remote_fixture(),
            root: String::from("usb3"),
        };

        let (catalog, _) =
            scanner_with(probe, 10).scan_to_catalog("usb3", &backend, &HashSet::new(), Fidelity::Full);

        let a = catalog.get(r"usb3\Music\a.mp3").unwrap();
        assert_eq!(a.artist, "Broadcast");
        assert_eq!(a.id, calculate_media_id("a.mp3", 10, 1_700_000_000_000));

        // unreadable stream, defaults but still indexed
        let b = catalog.get(r"usb3\Music\b.mp3").unwrap();
        assert!(b.artist.is_empty());
        assert_eq!(b.folder, "Music");
    }

    #[test]
    fn remote_marker_file_opts_directory_out() {
        let share = Arc::new(
            FakeShare::new()
                .dir("usb3", vec![folder("Private"), file("a.mp3", 1)])
                .dir(r"usb3\Private", vec![file(".nomedia", 0), file("b.mp3", 1)]),
        );
        let backend = SourceBackend::Remote {
            client: share,
            root: String::from("usb3"),
        };

        let (catalog, _) = scanner_with(TableProbe::default(), 10).scan_to_catalog(
            "usb3",
            &backend,
            &HashSet::new(),
            Fidelity::Fast,
        );

        assert_eq!(catalog.songs.len(), 1);
        assert!(catalog.songs.contains_key(r"usb3\a.mp3"));
    }
}
