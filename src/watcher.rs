use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::element::{PlayerElement, PLAYBACK_STATE_ATTR};
use crate::state::{PlaybackState, RawPlaybackState};
use crate::{WakelockError, WakelockEvent};

/// Observes the player element's raw playback state attribute, normalizes it
/// into the two-state playing/paused signal, and emits edge-triggered
/// `play`/`pause` notifications on the shared event channel.
///
/// Binding is fail-fast: construction checks that the state attribute is
/// present, non-empty, and within the recognized vocabulary, so observation
/// can never fail later for a value that was valid at bind time. Values that
/// drift outside the vocabulary *after* arming are normalized to paused (the
/// state that does not hold the lock) and logged, never fatal.
pub struct PlaybackStateWatcher {
    player: PlayerElement,
    // Shared with the observation task; `send_if_modified` gives us edge
    // detection by value equality.
    state_tx: Arc<watch::Sender<PlaybackState>>,
    event_sender: broadcast::Sender<WakelockEvent>,
    watching: Arc<AtomicBool>,
}

impl PlaybackStateWatcher {
    /// Bind to a player element. Fails immediately, before any observation
    /// starts, if the state attribute is absent, empty, or unrecognized.
    pub fn new(
        player: PlayerElement,
        event_sender: broadcast::Sender<WakelockEvent>,
    ) -> Result<Self, WakelockError> {
        let raw = player
            .attribute(PLAYBACK_STATE_ATTR)
            .ok_or_else(|| WakelockError::MissingStateAttribute(PLAYBACK_STATE_ATTR.to_string()))?;
        if raw.is_empty() {
            return Err(WakelockError::EmptyStateAttribute(
                PLAYBACK_STATE_ATTR.to_string(),
            ));
        }
        let initial = RawPlaybackState::parse(&raw)
            .ok_or_else(|| WakelockError::UnrecognizedState(raw.clone()))?;
        debug!(raw = %raw, state = initial.normalized().as_str(), "bound to player element");

        let (state_tx, _) = watch::channel(initial.normalized());
        Ok(Self {
            player,
            state_tx: Arc::new(state_tx),
            event_sender,
            watching: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Current normalized playback state.
    pub fn state(&self) -> PlaybackState {
        *self.state_tx.borrow()
    }

    /// Subscribe to normalized state changes. The channel conflates rapid
    /// mutations down to the latest value and only wakes on actual changes.
    pub fn state_receiver(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    /// Arm the watcher. Idempotent: only the first call starts observing.
    ///
    /// Performs one synchronous normalization pass to establish the initial
    /// state (no notification is emitted for it; there is no prior state to
    /// compare against), then consumes the element's mutation stream on a
    /// background task. Must be called within a tokio runtime.
    pub fn watch(&self) {
        if self.watching.swap(true, Ordering::SeqCst) {
            debug!("watch() called while already watching, ignoring");
            return;
        }

        // Subscribe before the initial pass so no mutation between the pass
        // and the task startup is lost.
        let mut mutations = self.player.observe();
        Self::refresh(&self.player, &self.state_tx, None);

        let player = self.player.clone();
        let state_tx = self.state_tx.clone();
        let event_sender = self.event_sender.clone();
        tokio::spawn(async move {
            debug!("playback observation task started");
            loop {
                match mutations.recv().await {
                    Ok(attribute) if attribute == PLAYBACK_STATE_ATTR => {
                        Self::refresh(&player, &state_tx, Some(&event_sender));
                    }
                    Ok(_) => {} // mutation on some other attribute
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed notifications don't matter as long as we
                        // re-read the current value.
                        warn!(skipped, "mutation stream lagged, resynchronizing");
                        Self::refresh(&player, &state_tx, Some(&event_sender));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("playback observation task stopped");
        });
    }

    /// Re-read the raw attribute, normalize it, and publish on change.
    /// `events` is `None` for the initial arming pass.
    fn refresh(
        player: &PlayerElement,
        state_tx: &watch::Sender<PlaybackState>,
        events: Option<&broadcast::Sender<WakelockEvent>>,
    ) {
        let raw = player.attribute(PLAYBACK_STATE_ATTR).unwrap_or_default();
        let state = match RawPlaybackState::parse(&raw) {
            Some(known) => known.normalized(),
            None => {
                // Host vocabulary drift after a successful bind. Default to
                // the state that does not hold the lock.
                warn!(raw = %raw, "unrecognized playback state, treating as paused");
                PlaybackState::Paused
            }
        };

        let changed = state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
        if !changed {
            return;
        }

        info!(state = state.as_str(), "detected playback state change");
        if let Some(sender) = events {
            let event = match state {
                PlaybackState::Playing => WakelockEvent::Play,
                PlaybackState::Paused => WakelockEvent::Pause,
            };
            let _ = sender.send(event);
        }
    }
}

impl std::fmt::Debug for PlaybackStateWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackStateWatcher")
            .field("state", &self.state())
            .field("watching", &self.watching.load(Ordering::SeqCst))
            .finish()
    }
}
