use crate::{
    domain::MediaRecord,
    player::{
        BACK_THRESHOLD_MS, PlaybackBackend, PlaybackQueue, PlaybackSettings, PlaybackState,
        PlayerEvent, RepeatMode, ShuffleMode,
    },
};
use crossbeam_channel::Sender;
use rand::{SeedableRng, rngs::StdRng};
use std::{mem, sync::Arc};
use tracing::{debug, warn};

/// Queue state machine. Owns the playback order and tells the backend what
/// to load next.
pub struct PlaybackQueueEngine {
    backend: Box<dyn PlaybackBackend>,
    queue: PlaybackQueue,
    repeat: RepeatMode,
    shuffle: ShuffleMode,
    state: PlaybackState,
    ended_by_crossfade: bool,
    rng: StdRng,
    events: Option<Sender<PlayerEvent>>,
}

impl PlaybackQueueEngine {
    pub fn new(backend: Box<dyn PlaybackBackend>) -> Self {
        Self::build(backend, StdRng::from_os_rng())
    }

    pub fn with_seed(backend: Box<dyn PlaybackBackend>, seed: u64) -> Self {
        Self::build(backend, StdRng::seed_from_u64(seed))
    }

    fn build(backend: Box<dyn PlaybackBackend>, rng: StdRng) -> Self {
        PlaybackQueueEngine {
            backend,
            queue: PlaybackQueue::new(),
            repeat: RepeatMode::default(),
            shuffle: ShuffleMode::default(),
            state: PlaybackState::Idle,
            ended_by_crossfade: false,
            rng,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<PlayerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_settings(mut self, settings: PlaybackSettings) -> Self {
        self.repeat = settings.repeat;
        self.shuffle = settings.shuffle;
        self
    }

    // ===========
    //   QUEUE
    // ===========

    /// Replace the queue and load `start`. Empty input or an out of range
    /// start leaves everything untouched.
    pub fn open_queue(&mut self, records: Vec<Arc<MediaRecord>>, start: usize, autoplay: bool) {
        if records.is_empty() || start >= records.len() {
            debug!(len = records.len(), start, "Ignoring queue request");
            return;
        }

        self.queue
            .open(records, start, self.shuffle.is_on(), &mut self.rng);
        self.open_current(autoplay);
    }

    pub fn add_record(&mut self, record: Arc<MediaRecord>) {
        self.add_records(vec![record]);
    }

    pub fn add_records(&mut self, records: Vec<Arc<MediaRecord>>) {
        if records.is_empty() {
            return;
        }

        let was_last = self.queue.is_last();
        for record in records {
            self.queue.add(record);
        }

        match self.queue.position() {
            None => self.queue.set_position(0),
            // gapless target may have changed
            Some(_) if was_last && self.state != PlaybackState::Idle => self.prepare_next(),
            _ => {}
        }
    }

    pub fn clear_queue(&mut self) {
        self.backend.stop();
        self.queue.clear();
        self.ended_by_crossfade = false;
        self.set_state(PlaybackState::Idle);
    }

    // ===============
    //   TRANSPORT
    // ===============

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                if self.queue.current().is_some() {
                    self.open_current(true);
                }
            }
            PlaybackState::Playing => {}
            _ => {
                self.backend.start();
                self.set_state(PlaybackState::Playing);
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.backend.pause();
            self.set_state(PlaybackState::Paused);
        }
    }

    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    pub fn seek(&mut self, position_ms: u64) {
        if self.state == PlaybackState::Idle {
            return;
        }
        if let Err(e) = self.backend.seek(position_ms) {
            warn!("Seek failed: {e}");
            self.emit(PlayerEvent::Error(e.to_string()));
        }
    }

    /// Explicit skips pass `force`, finished tracks do not.
    pub fn play_next(&mut self, force: bool) {
        let Some(current) = self.queue.position() else {
            return;
        };

        if self.repeat == RepeatMode::None && self.queue.is_last() {
            self.end_of_queue();
            return;
        }

        let next = self.repeat.next_index(current, self.queue.len(), force);
        self.play_at(next);
    }

    pub fn play_previous(&mut self, force: bool) {
        let Some(current) = self.queue.position() else {
            return;
        };

        let previous = self.repeat.previous_index(current, self.queue.len(), force);
        self.play_at(previous);
    }

    /// Rewind the current track, or step back when it has barely started.
    pub fn back(&mut self) {
        match self.backend.position_ms() > BACK_THRESHOLD_MS {
            true => self.seek(0),
            false => self.play_previous(true),
        }
    }

    pub fn play_at(&mut self, index: usize) {
        if index >= self.queue.len() {
            return;
        }
        self.queue.set_position(index);
        self.open_current(true);
    }

    // ===========
    //   MODES
    // ===========

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        if self.repeat == repeat {
            return;
        }
        self.repeat = repeat;
        if self.state != PlaybackState::Idle {
            self.prepare_next();
        }
        self.emit(PlayerEvent::SettingsChanged(self.settings()));
    }

    pub fn cycle_repeat(&mut self) {
        self.set_repeat(self.repeat.cycle());
    }

    pub fn set_shuffle(&mut self, shuffle: ShuffleMode) {
        if self.shuffle == shuffle {
            return;
        }
        self.shuffle = shuffle;

        match shuffle {
            ShuffleMode::On => self.queue.shuffle(&mut self.rng),
            ShuffleMode::Off => self.queue.unshuffle(),
        }

        if self.state != PlaybackState::Idle {
            self.prepare_next();
        }
        self.emit(PlayerEvent::SettingsChanged(self.settings()));
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(self.shuffle.toggle());
    }

    // ====================
    //   BACKEND SIGNALS
    // ====================

    pub fn on_track_ended(&mut self) {
        if self.queue.position().is_none() {
            return;
        }
        self.set_state(PlaybackState::TrackEnding);

        match self.repeat == RepeatMode::None && self.queue.is_last() {
            true => self.end_of_queue(),
            false => self.play_next(false),
        }
    }

    /// The backend already faded into the next stream, so the next load
    /// must not restart it.
    pub fn on_track_ended_with_crossfade(&mut self) {
        self.ended_by_crossfade = true;
        self.on_track_ended();
    }

    /// The backend moved on to the prepared source by itself.
    pub fn on_track_went_to_next(&mut self) {
        let Some(current) = self.queue.position() else {
            return;
        };

        if self.repeat == RepeatMode::None && self.queue.is_last() {
            self.end_of_queue();
            return;
        }

        let next = self.repeat.next_index(current, self.queue.len(), false);
        self.queue.set_position(next);

        if let Some(record) = self.queue.current() {
            self.emit(PlayerEvent::TrackStarted(record));
        }
        self.prepare_next();
    }

    // ==============
    //   INTERNALS
    // ==============

    fn open_current(&mut self, autoplay: bool) {
        let Some(record) = self.queue.current() else {
            return;
        };

        let force = !mem::take(&mut self.ended_by_crossfade);

        if let Err(e) = self.backend.set_data_source(&record, force) {
            warn!("Failed to open {}: {e}", record.path);
            self.emit(PlayerEvent::Error(e.to_string()));
            self.set_state(PlaybackState::Idle);
            return;
        }

        self.set_state(PlaybackState::Loaded);
        self.emit(PlayerEvent::TrackStarted(record));

        if autoplay {
            self.backend.start();
            self.set_state(PlaybackState::Playing);
        }

        self.prepare_next();
    }

    fn prepare_next(&mut self) {
        let next = match self.queue.position() {
            Some(_) if self.repeat == RepeatMode::None && self.queue.is_last() => None,
            Some(current) => {
                let index = self.repeat.next_index(current, self.queue.len(), false);
                self.queue.get(index)
            }
            None => None,
        };

        let path = next.as_ref().map(|record| record.path.as_str());
        if let Err(e) = self.backend.set_next_data_source(path) {
            warn!("Could not prepare next track: {e}");
        }
    }

    fn end_of_queue(&mut self) {
        self.ended_by_crossfade = false;

        if let Err(e) = self.backend.set_next_data_source(None) {
            warn!("Could not clear next track: {e}");
        }
        self.backend.pause();
        if let Err(e) = self.backend.seek(0) {
            warn!("Seek failed: {e}");
        }

        self.set_state(PlaybackState::Paused);
        self.emit(PlayerEvent::QueueEnded);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    // ===============
    //   ACCESSORS
    // ===============

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            repeat: self.repeat,
            shuffle: self.shuffle,
        }
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn current(&self) -> Option<Arc<MediaRecord>> {
        self.queue.current()
    }

    pub fn position_ms(&self) -> u64 {
        self.backend.position_ms()
    }
}
