use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::{
    Database,
    database::queries::{GET_PLAYBACK_SETTINGS, GET_SESSION_STATE, SET_SESSION_STATE},
    player::PlaybackSettings,
};

impl Database {
    pub fn save_session_state(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(SET_SESSION_STATE, params![key, value])?;
        Ok(())
    }

    pub fn get_session_state(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(GET_SESSION_STATE, params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    pub fn save_playback_settings(&self, settings: &PlaybackSettings) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(SET_SESSION_STATE)?;
            for (key, value) in settings.to_pairs() {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Missing keys fall back to the default modes.
    pub fn load_playback_settings(&self) -> Result<PlaybackSettings> {
        let conn = self.conn();
        let mut stmt = conn.prepare(GET_PLAYBACK_SETTINGS)?;

        let values: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(Result::ok)
            .collect();

        Ok(PlaybackSettings::from_values(values))
    }
}
