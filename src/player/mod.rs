mod backend;
mod core;
mod engine;
mod handle;
mod metrics;
mod modes;
mod queue;

pub use backend::PlaybackBackend;
pub use engine::PlaybackQueueEngine;
pub use handle::PlayerHandle;
pub use metrics::PlaybackMetrics;
pub use modes::{PlaybackSettings, RepeatMode, ShuffleMode};
pub use queue::PlaybackQueue;

use crate::domain::MediaRecord;
use std::{sync::Arc, time::Duration};

/// Rewinding instead of going back once a track has played this long.
pub const BACK_THRESHOLD_MS: u64 = 2000;

pub(crate) const REFRESH_RATE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackStarted(Arc<MediaRecord>),
    StateChanged(PlaybackState),
    SettingsChanged(PlaybackSettings),
    QueueEnded,
    Error(String),
}

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    OpenQueue {
        records: Vec<Arc<MediaRecord>>,
        start: usize,
        autoplay: bool,
    },
    AddRecords(Vec<Arc<MediaRecord>>),
    Play,
    Pause,
    TogglePlayback,
    Next,
    Previous,
    Back,
    PlayAt(usize),
    Seek(u64),
    ClearQueue,
    CycleRepeat,
    SetRepeat(RepeatMode),
    ToggleShuffle,
    SetShuffle(ShuffleMode),
    TrackEnded,
    TrackEndedWithCrossfade,
    TrackWentToNext,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum PlaybackState {
    #[default]
    Idle = 0,
    Loaded = 1,
    Playing = 2,
    Paused = 3,
    TrackEnding = 4,
}

impl From<PlaybackState> for u8 {
    fn from(state: PlaybackState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for PlaybackState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlaybackState::Idle),
            1 => Ok(PlaybackState::Loaded),
            2 => Ok(PlaybackState::Playing),
            3 => Ok(PlaybackState::Paused),
            4 => Ok(PlaybackState::TrackEnding),
            _ => Err(()),
        }
    }
}
