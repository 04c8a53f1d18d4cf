use crate::{
    database::Database,
    domain::MediaRecord,
    player::{
        PlaybackBackend, PlaybackMetrics, PlaybackQueueEngine, PlaybackSettings, PlaybackState,
        PlayerCommand, PlayerEvent, RepeatMode, ShuffleMode, core::PlayerCore,
    },
};
use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::{sync::Arc, thread::JoinHandle, time::Duration};
use tracing::warn;

/// Client side of the playback control thread.
pub struct PlayerHandle {
    commands: Sender<PlayerCommand>,
    events: Receiver<PlayerEvent>,
    metrics: Arc<PlaybackMetrics>,
    thread: JoinHandle<()>,
}

impl PlayerHandle {
    /// Start the control thread. Repeat and shuffle are restored from and
    /// saved to `settings_store` when one is given.
    pub fn spawn(
        backend: Box<dyn PlaybackBackend>,
        settings_store: Option<Arc<Database>>,
    ) -> Self {
        let settings = match &settings_store {
            Some(db) => db.load_playback_settings().unwrap_or_else(|e| {
                warn!("Could not load playback settings: {e}");
                PlaybackSettings::default()
            }),
            None => PlaybackSettings::default(),
        };

        let engine = PlaybackQueueEngine::new(backend).with_settings(settings);
        Self::from_engine(engine, settings_store)
    }

    pub(crate) fn from_engine(
        engine: PlaybackQueueEngine,
        settings_store: Option<Arc<Database>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let metrics = PlaybackMetrics::new();

        let engine = engine.with_events(event_tx);
        let thread = PlayerCore::spawn(engine, cmd_rx, Arc::clone(&metrics), settings_store);

        PlayerHandle {
            commands: cmd_tx,
            events: event_rx,
            metrics,
            thread,
        }
    }

    fn send(&self, cmd: PlayerCommand) -> Result<()> {
        self.commands.send(cmd)?;
        Ok(())
    }

    pub fn open_queue(
        &self,
        records: Vec<Arc<MediaRecord>>,
        start: usize,
        autoplay: bool,
    ) -> Result<()> {
        self.send(PlayerCommand::OpenQueue {
            records,
            start,
            autoplay,
        })
    }

    pub fn add_records(&self, records: Vec<Arc<MediaRecord>>) -> Result<()> {
        self.send(PlayerCommand::AddRecords(records))
    }

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_playback(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayback)
    }

    pub fn next(&self) -> Result<()> {
        self.send(PlayerCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(PlayerCommand::Previous)
    }

    pub fn back(&self) -> Result<()> {
        self.send(PlayerCommand::Back)
    }

    pub fn play_at(&self, index: usize) -> Result<()> {
        self.send(PlayerCommand::PlayAt(index))
    }

    pub fn seek(&self, position: Duration) -> Result<()> {
        self.send(PlayerCommand::Seek(position.as_millis() as u64))
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.send(PlayerCommand::ClearQueue)
    }

    pub fn cycle_repeat(&self) -> Result<()> {
        self.send(PlayerCommand::CycleRepeat)
    }

    pub fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        self.send(PlayerCommand::SetRepeat(mode))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleShuffle)
    }

    pub fn set_shuffle(&self, mode: ShuffleMode) -> Result<()> {
        self.send(PlayerCommand::SetShuffle(mode))
    }

    // Signals raised by the audio backend

    pub fn track_ended(&self) -> Result<()> {
        self.send(PlayerCommand::TrackEnded)
    }

    pub fn track_ended_with_crossfade(&self) -> Result<()> {
        self.send(PlayerCommand::TrackEndedWithCrossfade)
    }

    pub fn track_went_to_next(&self) -> Result<()> {
        self.send(PlayerCommand::TrackWentToNext)
    }

    pub fn state(&self) -> PlaybackState {
        self.metrics.get_state()
    }

    pub fn elapsed(&self) -> Duration {
        self.metrics.get_elapsed()
    }

    pub fn queue_position(&self) -> Option<usize> {
        self.metrics.get_queue_position()
    }

    pub fn metrics(&self) -> Arc<PlaybackMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn events(&self) -> &Receiver<PlayerEvent> {
        &self.events
    }

    pub fn poll_events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }

    /// Close the command channel and wait for the control thread.
    pub fn shutdown(self) -> Result<()> {
        let PlayerHandle {
            commands, thread, ..
        } = self;
        drop(commands);

        thread
            .join()
            .map_err(|_| anyhow!("Player thread panicked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{
        engine::tests::{Call, RecordingBackend},
        queue::tests::records,
    };

    const WAIT: Duration = Duration::from_secs(2);

    fn wait_for(handle: &PlayerHandle, wanted: impl Fn(&PlayerEvent) -> bool) -> bool {
        while let Ok(event) = handle.events().recv_timeout(WAIT) {
            if wanted(&event) {
                return true;
            }
        }
        false
    }

    #[test]
    fn commands_drive_the_engine_on_its_thread() {
        let backend = RecordingBackend::default();
        let engine = PlaybackQueueEngine::with_seed(Box::new(backend.clone()), 9);
        let handle = PlayerHandle::from_engine(engine, None);

        handle.open_queue(records(3), 0, true).unwrap();
        assert!(wait_for(&handle, |e| *e
            == PlayerEvent::StateChanged(PlaybackState::Playing)));

        handle.next().unwrap();
        assert!(wait_for(&handle, |e| matches!(
            e,
            PlayerEvent::TrackStarted(r) if r.id == 2
        )));

        handle.pause().unwrap();
        assert!(wait_for(&handle, |e| *e
            == PlayerEvent::StateChanged(PlaybackState::Paused)));

        handle.shutdown().unwrap();
        assert!(backend.take().contains(&Call::Stop));
    }

    #[test]
    fn settings_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_at(&dir.path().join("t.db")).unwrap());

        let handle = PlayerHandle::spawn(Box::new(RecordingBackend::default()), Some(Arc::clone(&db)));
        handle.set_repeat(RepeatMode::This).unwrap();
        handle.set_shuffle(ShuffleMode::On).unwrap();
        handle.shutdown().unwrap();

        assert_eq!(
            db.load_playback_settings().unwrap(),
            PlaybackSettings {
                repeat: RepeatMode::This,
                shuffle: ShuffleMode::On,
            }
        );

        // restored as This, so one cycle lands on None
        let handle = PlayerHandle::spawn(Box::new(RecordingBackend::default()), Some(db));
        handle.cycle_repeat().unwrap();
        assert!(wait_for(&handle, |e| matches!(
            e,
            PlayerEvent::SettingsChanged(s) if s.repeat == RepeatMode::None
        )));
        handle.shutdown().unwrap();
    }
}
