use crate::player::PlaybackState;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

const NO_POSITION: u64 = u64::MAX;

/// Lock free view of the control thread, readable from any thread.
pub struct PlaybackMetrics {
    state: AtomicU8,
    elapsed_ms: AtomicU64,
    queue_position: AtomicU64,
}

impl PlaybackMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(PlaybackMetrics {
            state: AtomicU8::new(PlaybackState::Idle.into()),
            elapsed_ms: AtomicU64::new(0),
            queue_position: AtomicU64::new(NO_POSITION),
        })
    }

    pub fn get_state(&self) -> PlaybackState {
        self.state
            .load(Ordering::Relaxed)
            .try_into()
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn get_elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }

    pub fn get_queue_position(&self) -> Option<usize> {
        match self.queue_position.load(Ordering::Relaxed) {
            NO_POSITION => None,
            p => Some(p as usize),
        }
    }

    pub fn is_playing(&self) -> bool {
        PlaybackState::Playing == self.get_state()
    }

    pub fn is_idle(&self) -> bool {
        PlaybackState::Idle == self.get_state()
    }

    pub fn set_playback_state(&self, state: PlaybackState) {
        self.state.store(state.into(), Ordering::Relaxed);
    }

    pub fn set_elapsed_ms(&self, ms: u64) {
        self.elapsed_ms.store(ms, Ordering::Relaxed)
    }

    pub fn set_queue_position(&self, position: Option<usize>) {
        let raw = position.map_or(NO_POSITION, |p| p as u64);
        self.queue_position.store(raw, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.set_elapsed_ms(0);
        self.set_queue_position(None);
        self.set_playback_state(PlaybackState::Idle);
    }
}
