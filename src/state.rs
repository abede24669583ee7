/// Raw playback states the host player is known to report through its
/// state attribute. Anything else is vocabulary drift and is handled by the
/// watcher, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPlaybackState {
    /// Media is audibly advancing ("PLAYING")
    Playing,
    /// Playback interrupted by buffering but still active ("STALLED")
    Stalled,
    /// Playback explicitly stopped ("NOT_PLAYING")
    NotPlaying,
    /// Nothing queued or player idle ("IDLE")
    Idle,
}

impl RawPlaybackState {
    /// Parse a raw attribute value. Returns `None` for values outside the
    /// recognized vocabulary; the caller decides whether that is a bind
    /// failure or a recoverable drift.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PLAYING" => Some(RawPlaybackState::Playing),
            "STALLED" => Some(RawPlaybackState::Stalled),
            "NOT_PLAYING" => Some(RawPlaybackState::NotPlaying),
            "IDLE" => Some(RawPlaybackState::Idle),
            _ => None,
        }
    }

    /// Get string representation of the raw state
    pub fn as_str(self) -> &'static str {
        match self {
            RawPlaybackState::Playing => "PLAYING",
            RawPlaybackState::Stalled => "STALLED",
            RawPlaybackState::NotPlaying => "NOT_PLAYING",
            RawPlaybackState::Idle => "IDLE",
        }
    }

    /// Collapse the vendor state into the two-value normalized signal.
    /// Multiple raw states map to the same normalized class; `Stalled` counts
    /// as playing because the player considers the stream still active.
    pub fn normalized(self) -> PlaybackState {
        match self {
            RawPlaybackState::Playing | RawPlaybackState::Stalled => PlaybackState::Playing,
            RawPlaybackState::NotPlaying | RawPlaybackState::Idle => PlaybackState::Paused,
        }
    }
}

/// Normalized two-state playback signal derived from the raw vendor states.
/// The sole source of truth for "is media audibly advancing".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }
}

/// Reconciliation state of the wake lock, derived on demand from resource
/// occupancy and the desired lock state. `Locking` and `Unlocking` are
/// transient: the convergence worker keeps running until occupancy matches
/// desire, so neither is a resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Resource held and wanted
    Locked,
    /// Resource not held and not wanted
    Unlocked,
    /// Resource wanted but not yet held (acquire pending or retrying)
    Locking,
    /// Resource held but no longer wanted (release pending)
    Unlocking,
}

impl LockState {
    /// Derive the reconciliation state from (occupancy, desire).
    pub fn derive(held: bool, desired: bool) -> Self {
        match (held, desired) {
            (true, true) => LockState::Locked,
            (false, false) => LockState::Unlocked,
            (false, true) => LockState::Locking,
            (true, false) => LockState::Unlocking,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Locked => "locked",
            LockState::Unlocked => "unlocked",
            LockState::Locking => "locking",
            LockState::Unlocking => "unlocking",
        }
    }
}
