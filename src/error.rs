use thiserror::Error;

// Basic error handling with thiserror
#[derive(Error, Debug)]
pub enum WakelockError {
    #[error("player is missing the '{0}' state attribute")]
    MissingStateAttribute(String),

    #[error("player state attribute '{0}' is empty")]
    EmptyStateAttribute(String),

    #[error("player reports unrecognized playback state '{0}'")]
    UnrecognizedState(String),

    #[error("wake lock request denied: {0}")]
    AcquireDenied(String),

    #[error("wake lock release failed: {0}")]
    ReleaseFailed(String),

    #[error("player element not found after {0} attempts")]
    PlayerNotFound(u32),
}

impl WakelockError {
    /// Helper to check whether an error is a binding failure, i.e. the
    /// watcher could never have started observing. These are the only errors
    /// that surface to the caller as a blocking failure.
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            WakelockError::MissingStateAttribute(_)
                | WakelockError::EmptyStateAttribute(_)
                | WakelockError::UnrecognizedState(_)
        )
    }
}
