use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::{PlayerElement, WakeLockProvider, WakelockController, WakelockError};

/// Interval between attempts to locate the player element.
pub const ATTACH_INTERVAL: Duration = Duration::from_secs(2);

/// How many times to look for the player element before giving up
/// (30 x 2s = up to a minute for the page to finish rendering).
pub const MAX_ATTACH_ATTEMPTS: u32 = 30;

/// Bootstrap: poll for the player element at a fixed interval, then construct
/// the controller.
///
/// `find_player` is called once per attempt and returns the element once the
/// host page has rendered it. Binding errors from controller construction
/// propagate immediately (the element was found but is not watchable, so
/// further polling cannot help); exhausting all attempts yields
/// [`WakelockError::PlayerNotFound`].
pub async fn attach<F>(
    find_player: F,
    provider: Arc<dyn WakeLockProvider>,
) -> Result<WakelockController, WakelockError>
where
    F: Fn() -> Option<PlayerElement>,
{
    for attempt in 1..=MAX_ATTACH_ATTEMPTS {
        debug!(attempt, "searching for player element");
        if let Some(player) = find_player() {
            debug!(?player, "player found");
            let controller = WakelockController::new(player, provider)?;
            info!("wakelock controller attached to player");
            return Ok(controller);
        }
        if attempt < MAX_ATTACH_ATTEMPTS {
            sleep(ATTACH_INTERVAL).await;
        }
    }
    error!(
        attempts = MAX_ATTACH_ATTEMPTS,
        "failed to find player element"
    );
    Err(WakelockError::PlayerNotFound(MAX_ATTACH_ATTEMPTS))
}
