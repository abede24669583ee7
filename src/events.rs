// Event types for the status-view callback surface. Events carry no payload;
// consumers needing detail call back into `WakelockController::lock_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakelockEvent {
    /// Normalized playback state changed to playing
    Play,
    /// Normalized playback state changed to paused
    Pause,
    /// Wake lock acquire attempt starting
    Locking,
    /// Wake lock acquire succeeded
    Locked,
    /// Wake lock release attempt starting
    Releasing,
    /// Wake lock release completed while playback was paused
    Released,
    /// Wake lock revoked externally while playback continues, re-acquire pending
    Relocking,
}

impl WakelockEvent {
    // Get the name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            WakelockEvent::Play => "play",
            WakelockEvent::Pause => "pause",
            WakelockEvent::Locking => "locking",
            WakelockEvent::Locked => "locked",
            WakelockEvent::Releasing => "releasing",
            WakelockEvent::Released => "released",
            WakelockEvent::Relocking => "relocking",
        }
    }
}
