use crate::domain::MediaRecord;
use anyhow::Result;

/// Audio output driven by the queue engine.
///
/// The engine decides what plays; implementations only load, start and
/// report. `force` on `set_data_source` is false when a crossfade has
/// already started the track, so the backend may keep the running stream.
pub trait PlaybackBackend: Send {
    fn set_data_source(&mut self, record: &MediaRecord, force: bool) -> Result<()>;

    /// Path to prepare for a gapless handoff. `None` clears it.
    fn set_next_data_source(&mut self, path: Option<&str>) -> Result<()>;

    fn start(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position_ms: u64) -> Result<()>;
    fn position_ms(&self) -> u64;
}
