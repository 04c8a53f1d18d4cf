use crate::{config::RemoteConfig, library::SourceEvent};
use crossbeam_channel::Sender;
use std::{
    collections::HashSet,
    io::Read,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SHARE_DELIMITER: char = '\\';

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share protocol error: {0}")]
    Protocol(String),
    #[error("share connection error: {0}")]
    Connection(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShareError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ShareError::Connection(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    /// Millis since the epoch.
    pub last_write_time: i64,
}

/// A session on a network share. Paths are relative to the share root and
/// use `\` between segments.
pub trait RemoteShareClient: Send + Sync {
    fn open_directory(&self, path: &str) -> Result<Vec<ShareEntry>, ShareError>;
    fn open_file(&self, path: &str) -> Result<Box<dyn Read + Send>, ShareError>;
    fn is_connected(&self) -> bool;
}

pub trait ShareConnector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn RemoteShareClient>, ShareError>;
}

pub fn join_share_path(parent: &str, name: &str) -> String {
    match parent.is_empty() {
        true => name.to_string(),
        false => format!("{parent}{SHARE_DELIMITER}{name}"),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ShareStatus {
    Disconnected = 0,
    Reachable = 1,
    Unreachable = 2,
}

impl TryFrom<u8> for ShareStatus {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShareStatus::Disconnected),
            1 => Ok(ShareStatus::Reachable),
            2 => Ok(ShareStatus::Unreachable),
            _ => Err(()),
        }
    }
}

/// Watches the top level of a share and turns device directories appearing
/// or disappearing into attach/detach events.
pub struct SharePoller {
    connector: Arc<dyn ShareConnector>,
    config: RemoteConfig,
    events: Sender<SourceEvent>,

    client: Mutex<Option<Arc<dyn RemoteShareClient>>>,
    known: Mutex<HashSet<String>>,
    reattach: AtomicBool,
    retrying: AtomicBool,
    status: AtomicU8,
}

impl SharePoller {
    pub fn new(
        connector: Arc<dyn ShareConnector>,
        config: RemoteConfig,
        events: Sender<SourceEvent>,
    ) -> Arc<Self> {
        Arc::new(SharePoller {
            connector,
            config,
            events,

            client: Mutex::new(None),
            known: Mutex::new(HashSet::new()),
            reattach: AtomicBool::new(false),
            retrying: AtomicBool::new(false),
            status: AtomicU8::new(ShareStatus::Disconnected as u8),
        })
    }

    pub fn spawn(self: Arc<Self>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::spawn(move || {
            info!("polling share {}", self.config.share);
            while !shutdown.load(Ordering::Acquire) {
                self.poll_once();
                thread::sleep(self.config.poll_interval());
            }
            debug!("share poller stopped");
        })
    }

    pub fn status(&self) -> ShareStatus {
        self.status
            .load(Ordering::Acquire)
            .try_into()
            .unwrap_or(ShareStatus::Disconnected)
    }

    fn set_status(&self, status: ShareStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn known_devices(&self) -> HashSet<String> {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn poll_once(&self) {
        let client = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match client {
            Some(client) if client.is_connected() => self.scan_devices(client),
            _ => {
                self.reconnect();
            }
        }
    }

    /// Try to establish a new session. Concurrent callers return `false`
    /// immediately while an attempt is running.
    pub fn reconnect(&self) -> bool {
        if self
            .retrying
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("reconnect already in progress");
            return false;
        }

        let attempts = self.config.reconnect_attempts.max(1);
        let mut connected = false;

        for attempt in 1..=attempts {
            match self.connector.connect() {
                Ok(client) => {
                    *self.client.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);
                    connected = true;
                    break;
                }
                Err(e) => {
                    warn!("connecting to {} failed ({attempt}/{attempts}): {e}", self.config.share);
                    if attempt < attempts {
                        thread::sleep(self.config.reconnect_delay());
                    }
                }
            }
        }

        match connected {
            true => {
                info!("connected to share {}", self.config.share);
                self.set_status(ShareStatus::Reachable);
                self.reattach.store(true, Ordering::Release);
            }
            false => self.mark_unreachable(),
        }

        self.retrying.store(false, Ordering::Release);
        connected
    }

    fn mark_unreachable(&self) {
        if self.status() == ShareStatus::Unreachable {
            return;
        }
        warn!("share {} is unreachable", self.config.share);
        self.set_status(ShareStatus::Unreachable);

        for id in self.known_devices() {
            let _ = self.events.send(SourceEvent::Unreachable { id });
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        name == "."
            || name == ".."
            || name.starts_with('.')
            || self.config.ignore_markers.iter().any(|m| m == name)
    }

    fn scan_devices(&self, client: Arc<dyn RemoteShareClient>) {
        let entries = match client.open_directory("") {
            Ok(entries) => entries,
            Err(e) => {
                warn!("listing share {} failed: {e}", self.config.share);
                if e.is_connection() {
                    *self.client.lock().unwrap_or_else(PoisonError::into_inner) = None;
                    self.set_status(ShareStatus::Disconnected);
                }
                return;
            }
        };

        let present: HashSet<String> = entries
            .into_iter()
            .filter(|e| e.is_directory && !self.is_ignored(&e.name))
            .map(|e| e.name)
            .collect();

        let reattach = self.reattach.swap(false, Ordering::AcqRel);
        let mut known = self.known.lock().unwrap_or_else(PoisonError::into_inner);

        for id in known.difference(&present) {
            info!("remote device {id} removed");
            let _ = self.events.send(SourceEvent::Detached { id: id.clone() });
        }

        let mut added: Vec<&String> = present
            .iter()
            .filter(|id| reattach || !known.contains(*id))
            .collect();
        added.sort();

        for id in added {
            info!("remote device {id} attached");
            let _ = self.events.send(SourceEvent::remote(id, Arc::clone(&client)));
        }

        *known = present;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::{collections::HashMap, io::Cursor, sync::atomic::AtomicUsize};

    /// In-memory share: directory path -> entries, file path -> bytes.
    #[derive(Default)]
    pub(crate) struct FakeShare {
        pub dirs: Mutex<HashMap<String, Vec<ShareEntry>>>,
        pub files: HashMap<String, Vec<u8>>,
        pub failing: HashSet<String>,
        pub connected: AtomicBool,
    }

    impl FakeShare {
        pub fn new() -> Self {
            FakeShare {
                connected: AtomicBool::new(true),
                ..Default::default()
            }
        }

        pub fn dir(self, path: &str, entries: Vec<ShareEntry>) -> Self {
            self.dirs
                .lock()
                .unwrap()
                .insert(path.to_string(), entries);
            self
        }

        pub fn fail(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }
    }

    pub(crate) fn folder(name: &str) -> ShareEntry {
        ShareEntry {
            name: name.to_string(),
            is_directory: true,
            size: 0,
            last_write_time: 0,
        }
    }

    pub(crate) fn file(name: &str, size: u64) -> ShareEntry {
        ShareEntry {
            name: name.to_string(),
            is_directory: false,
            size,
            last_write_time: 1_700_000_000_000,
        }
    }

    impl RemoteShareClient for FakeShare {
        fn open_directory(&self, path: &str) -> Result<Vec<ShareEntry>, ShareError> {
            if self.failing.contains(path) {
                return Err(ShareError::Protocol(format!("STATUS_ACCESS_DENIED on {path}")));
            }
            self.dirs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| ShareError::Protocol(format!("no such directory {path}")))
        }

        fn open_file(&self, path: &str) -> Result<Box<dyn Read + Send>, ShareError> {
            self.files
                .get(path)
                .map(|bytes| Box::new(Cursor::new(bytes.clone())) as Box<dyn Read + Send>)
                .ok_or_else(|| ShareError::Protocol(format!("no such file {path}")))
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Acquire)
        }
    }

    struct FlakyConnector {
        share: Arc<FakeShare>,
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ShareConnector for FlakyConnector {
        fn connect(&self) -> Result<Arc<dyn RemoteShareClient>, ShareError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(ShareError::Connection(String::from("host unreachable")));
            }
            Ok(Arc::clone(&self.share) as Arc<dyn RemoteShareClient>)
        }
    }

    fn fast_config(attempts: u32) -> RemoteConfig {
        RemoteConfig {
            reconnect_attempts: attempts,
            reconnect_delay_ms: 1,
            poll_interval_ms: 1,
            ..Default::default()
        }
    }

    fn attached_ids(events: &crossbeam_channel::Receiver<SourceEvent>) -> Vec<String> {
        events
            .try_iter()
            .filter_map(|e| match e {
                SourceEvent::Attached { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn share_paths_join_with_backslash() {
        assert_eq!(join_share_path("", "usb3"), "usb3");
        assert_eq!(join_share_path("usb3", "Music"), r"usb3\Music");
    }

    #[test]
    fn device_diff_emits_attach_and_detach() {
        let share = Arc::new(FakeShare::new().dir(
            "",
            vec![folder("."), folder(".."), folder("usb1"), folder("usb3"), folder("sdcard")],
        ));
        let connector = Arc::new(FlakyConnector {
            share: Arc::clone(&share),
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = unbounded();
        let poller = SharePoller::new(connector, fast_config(3), tx);

        poller.poll_once(); // connect
        poller.poll_once(); // list
        assert_eq!(attached_ids(&rx), vec![String::from("usb3")]);

        poller.poll_once();
        assert!(rx.try_recv().is_err());

        share
            .dirs
            .lock()
            .unwrap()
            .insert(String::new(), vec![folder("usb4")]);
        poller.poll_once();

        let events: Vec<SourceEvent> = rx.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, SourceEvent::Detached { id } if id == "usb3")));
        assert!(events.iter().any(|e| matches!(e, SourceEvent::Attached { id, .. } if id == "usb4")));
        assert_eq!(poller.known_devices(), HashSet::from([String::from("usb4")]));
    }

    #[test]
    fn reconnect_is_bounded_and_reports_unreachable() {
        let share = Arc::new(FakeShare::new().dir("", vec![folder("usb3")]));
        let connector = Arc::new(FlakyConnector {
            share,
            failures_left: AtomicUsize::new(10),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = unbounded();
        let poller = SharePoller::new(Arc::clone(&connector) as Arc<dyn ShareConnector>, fast_config(3), tx);

        assert!(!poller.reconnect());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
        assert_eq!(poller.status(), ShareStatus::Unreachable);
    }

    #[test]
    fn reconnect_recovers_and_reattaches_devices() {
        let share = Arc::new(FakeShare::new().dir("", vec![folder("usb3")]));
        let connector = Arc::new(FlakyConnector {
            share: Arc::clone(&share),
            failures_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = unbounded();
        let poller = SharePoller::new(connector, fast_config(3), tx);

        poller.poll_once();
        assert_eq!(poller.status(), ShareStatus::Reachable);
        poller.poll_once();
        assert_eq!(attached_ids(&rx), vec![String::from("usb3")]);

        share.connected.store(false, Ordering::Release);
        poller.poll_once();
        share.connected.store(true, Ordering::Release);
        poller.poll_once();

        // fresh session, known devices are announced again
        assert_eq!(attached_ids(&rx), vec![String::from("usb3")]);
    }

    #[test]
    fn concurrent_reconnect_is_guarded() {
        let share = Arc::new(FakeShare::new());
        let connector = Arc::new(FlakyConnector {
            share,
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = unbounded();
        let poller = SharePoller::new(connector, fast_config(1), tx);

        poller.retrying.store(true, Ordering::Release);
        assert!(!poller.reconnect());

        poller.retrying.store(false, Ordering::Release);
        assert!(poller.reconnect());
    }
}
