use std::fmt::Display;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum RepeatMode {
    #[default]
    None,
    All,
    This,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ShuffleMode {
    #[default]
    Off,
    On,
}

impl RepeatMode {
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::This,
            RepeatMode::This => RepeatMode::None,
        }
    }

    /// Index that follows `current` in a queue of `len` items. A forced
    /// advance is an explicit skip, a natural one is a finished track.
    /// With `None` the last index is returned unchanged; callers check
    /// `is_last` to detect the end of the queue.
    pub fn next_index(self, current: usize, len: usize, force: bool) -> usize {
        let last = len.saturating_sub(1);

        match self {
            RepeatMode::All if current >= last => 0,
            RepeatMode::This if !force => current,
            RepeatMode::This if current >= last => 0,
            RepeatMode::None if current >= last => last,
            _ => current + 1,
        }
    }

    pub fn previous_index(self, current: usize, len: usize, force: bool) -> usize {
        let last = len.saturating_sub(1);

        match self {
            RepeatMode::All if current == 0 => last,
            RepeatMode::This if !force => current,
            RepeatMode::This if current == 0 => last,
            RepeatMode::None if current == 0 => 0,
            _ => current - 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::This => "this",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "all" => RepeatMode::All,
            "this" => RepeatMode::This,
            _ => RepeatMode::None,
        }
    }
}

impl ShuffleMode {
    pub fn toggle(self) -> Self {
        match self {
            ShuffleMode::Off => ShuffleMode::On,
            ShuffleMode::On => ShuffleMode::Off,
        }
    }

    pub fn is_on(&self) -> bool {
        *self == ShuffleMode::On
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShuffleMode::Off => "off",
            ShuffleMode::On => "on",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "on" => ShuffleMode::On,
            _ => ShuffleMode::Off,
        }
    }
}

impl Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for ShuffleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Modes that survive a restart, stored as key/value session state.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct PlaybackSettings {
    pub repeat: RepeatMode,
    pub shuffle: ShuffleMode,
}

impl PlaybackSettings {
    pub const REPEAT_KEY: &'static str = "playback_repeat";
    pub const SHUFFLE_KEY: &'static str = "playback_shuffle";

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (Self::REPEAT_KEY, self.repeat.to_string()),
            (Self::SHUFFLE_KEY, self.shuffle.to_string()),
        ]
    }

    pub fn from_values(values: Vec<(String, String)>) -> Self {
        let mut settings = PlaybackSettings::default();

        for (key, value) in values {
            match key.as_str() {
                Self::REPEAT_KEY => settings.repeat = RepeatMode::from_str(&value),
                Self::SHUFFLE_KEY => settings.shuffle = ShuffleMode::from_str(&value),
                _ => {}
            }
        }

        settings
    }
}
