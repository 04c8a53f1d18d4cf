use crate::{
    database::Database,
    player::{PlaybackMetrics, PlaybackQueueEngine, PlayerCommand, REFRESH_RATE},
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

/// Playback control thread. Every queue mutation happens here.
pub struct PlayerCore {
    engine: PlaybackQueueEngine,
    commands: Receiver<PlayerCommand>,
    metrics: Arc<PlaybackMetrics>,
    settings_store: Option<Arc<Database>>,
}

impl PlayerCore {
    pub fn spawn(
        engine: PlaybackQueueEngine,
        commands: Receiver<PlayerCommand>,
        metrics: Arc<PlaybackMetrics>,
        settings_store: Option<Arc<Database>>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            let mut core = PlayerCore {
                engine,
                commands,
                metrics,
                settings_store,
            };

            core.run();
        })
    }

    fn run(&mut self) {
        loop {
            match self.commands.recv_timeout(REFRESH_RATE) {
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.update_metrics();
        }

        self.engine.clear_queue();
        self.metrics.reset();
        debug!("Player thread finished");
    }

    fn handle(&mut self, cmd: PlayerCommand) {
        let settings = self.engine.settings();

        match cmd {
            PlayerCommand::OpenQueue {
                records,
                start,
                autoplay,
            } => self.engine.open_queue(records, start, autoplay),
            PlayerCommand::AddRecords(records) => self.engine.add_records(records),
            PlayerCommand::Play => self.engine.play(),
            PlayerCommand::Pause => self.engine.pause(),
            PlayerCommand::TogglePlayback => self.engine.toggle(),
            PlayerCommand::Next => self.engine.play_next(true),
            PlayerCommand::Previous => self.engine.play_previous(true),
            PlayerCommand::Back => self.engine.back(),
            PlayerCommand::PlayAt(index) => self.engine.play_at(index),
            PlayerCommand::Seek(ms) => self.engine.seek(ms),
            PlayerCommand::ClearQueue => self.engine.clear_queue(),
            PlayerCommand::CycleRepeat => self.engine.cycle_repeat(),
            PlayerCommand::SetRepeat(mode) => self.engine.set_repeat(mode),
            PlayerCommand::ToggleShuffle => self.engine.toggle_shuffle(),
            PlayerCommand::SetShuffle(mode) => self.engine.set_shuffle(mode),
            PlayerCommand::TrackEnded => self.engine.on_track_ended(),
            PlayerCommand::TrackEndedWithCrossfade => self.engine.on_track_ended_with_crossfade(),
            PlayerCommand::TrackWentToNext => self.engine.on_track_went_to_next(),
        }

        if settings != self.engine.settings() {
            self.save_settings();
        }
    }

    fn save_settings(&self) {
        if let Some(db) = &self.settings_store {
            if let Err(e) = db.save_playback_settings(&self.engine.settings()) {
                warn!("Could not persist playback settings: {e}");
            }
        }
    }

    fn update_metrics(&self) {
        self.metrics.set_playback_state(self.engine.state());
        self.metrics
            .set_queue_position(self.engine.queue().position());
        self.metrics.set_elapsed_ms(self.engine.position_ms());
    }
}
