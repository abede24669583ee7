mod attach;
pub use attach::{attach, ATTACH_INTERVAL, MAX_ATTACH_ATTEMPTS};
mod element;
pub use element::{PlayerElement, PLAYBACK_STATE_ATTR};
mod error;
pub use error::WakelockError;
mod events;
pub use events::WakelockEvent;
mod lock;
pub use lock::{WakeLockProvider, WakeLockSentinel};
mod state;
pub use state::{LockState, PlaybackState, RawPlaybackState};
mod watcher;
pub use watcher::PlaybackStateWatcher;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const EVENT_BUFFER_CAPACITY: usize = 100;

/// Fixed delay between wake lock acquisition attempts. Constant rather than
/// exponential: the request is idempotent and retries are unbounded, so a
/// steady cadence is enough.
pub const ACQUIRE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fixed settle delay between an external revocation and the re-acquire
/// attempt, bridging rapid revoke/reacquire storms (e.g. quick tab focus
/// changes).
pub const RELOCK_SETTLE_DELAY: Duration = Duration::from_secs(1);

// Everything the convergence worker needs, bundled so the spawned task owns
// one struct instead of a pile of clones.
struct ConvergenceContext {
    provider: Arc<dyn WakeLockProvider>,
    desired: Arc<AtomicBool>,
    held: Arc<AtomicBool>,
    event_sender: broadcast::Sender<WakelockEvent>,
}

/// Keeps a screen wake lock held if and only if the watched player is
/// playing, despite an acquisition call that can fail transiently and a held
/// lock the platform can revoke at any time.
///
/// Construction binds and arms a [`PlaybackStateWatcher`] over the player
/// element, then runs a single convergence worker that drives wake lock
/// occupancy toward the desired state. All acquire/release calls are
/// serialized through that one worker, so no two are ever in flight at once.
/// Lifecycle events (`play`, `pause`, `locking`, `locked`, `releasing`,
/// `released`, `relocking`) are published on one broadcast surface for the
/// status view; they carry no payload, consumers call [`Self::lock_state`]
/// for detail.
///
/// # Logging
///
/// This library uses the `tracing` crate for logging. To enable logs,
/// initialize a tracing subscriber in your application:
/// ```no_run
/// use tracing::Level;
/// use tracing_subscriber::FmtSubscriber;
///
/// let subscriber = FmtSubscriber::builder()
///     .with_max_level(Level::DEBUG)
///     .finish();
/// tracing::subscriber::set_global_default(subscriber)
///     .expect("Failed to set tracing subscriber");
/// ```
pub struct WakelockController {
    watcher: PlaybackStateWatcher,
    desired: Arc<AtomicBool>,
    held: Arc<AtomicBool>,
    event_sender: broadcast::Sender<WakelockEvent>,
}

impl WakelockController {
    /// Bind to a player element and start reconciling. Fails only on binding
    /// errors (missing/empty/unrecognized state attribute); everything after
    /// construction degrades gracefully with background retry.
    ///
    /// Must be called within a tokio runtime; the controller lives for the
    /// session with no explicit teardown.
    pub fn new(
        player: PlayerElement,
        provider: Arc<dyn WakeLockProvider>,
    ) -> Result<Self, WakelockError> {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER_CAPACITY);

        let watcher = PlaybackStateWatcher::new(player, event_tx.clone())?;
        watcher.watch();

        let mut state_rx = watcher.state_receiver();
        let initial = *state_rx.borrow_and_update();
        let desired = Arc::new(AtomicBool::new(initial.is_playing()));
        let held = Arc::new(AtomicBool::new(false));
        debug!(
            playing = initial.is_playing(),
            "controller reflecting watcher state at construction"
        );

        // Depth-1 queue: a full channel means a convergence pass is already
        // pending, and that pass re-reads desire, so requests coalesce.
        let (update_tx, update_rx) = mpsc::channel::<()>(1);
        if initial.is_playing() {
            let _ = update_tx.try_send(());
        }

        // Bridge task: the observer side only flips desire and enqueues work;
        // it never touches the lock itself.
        {
            let desired = desired.clone();
            tokio::spawn(async move {
                while state_rx.changed().await.is_ok() {
                    let playing = state_rx.borrow_and_update().is_playing();
                    debug!(target_state = playing, "wake lock target state");
                    desired.store(playing, Ordering::SeqCst);
                    let _ = update_tx.try_send(());
                }
                debug!("desire bridge task stopped");
            });
        }

        let ctx = ConvergenceContext {
            provider,
            desired: desired.clone(),
            held: held.clone(),
            event_sender: event_tx.clone(),
        };
        tokio::spawn(Self::run_convergence_worker(ctx, update_rx));

        Ok(Self {
            watcher,
            desired,
            held,
            event_sender: event_tx,
        })
    }

    /// Subscribe to lifecycle notifications.
    pub fn event_receiver(&self) -> broadcast::Receiver<WakelockEvent> {
        self.event_sender.subscribe()
    }

    /// Current normalized playback state as seen by the watcher.
    pub fn playback_state(&self) -> PlaybackState {
        self.watcher.state()
    }

    /// Reconciliation state, derived from occupancy and desire on every call,
    /// never cached.
    pub fn lock_state(&self) -> LockState {
        LockState::derive(
            self.held.load(Ordering::SeqCst),
            self.desired.load(Ordering::SeqCst),
        )
    }

    // The single logical worker. Owning the sentinel slot here is what makes
    // the single-flight guarantee structural: nothing else can start an
    // acquire or release.
    async fn run_convergence_worker(ctx: ConvergenceContext, mut update_rx: mpsc::Receiver<()>) {
        debug!("convergence worker started");
        let mut sentinel: Option<WakeLockSentinel> = None;
        loop {
            // Owned clone of the revocation handle, so the select below does
            // not borrow the slot its handlers mutate.
            let revocation = sentinel.as_ref().map(WakeLockSentinel::revocation);
            tokio::select! {
                biased;

                queued = update_rx.recv() => match queued {
                    Some(()) => Self::converge(&ctx, &mut sentinel).await,
                    None => break, // controller and bridge gone
                },

                _ = Self::wait_revoked(revocation) => {
                    // The platform invalidated the lock out-of-band.
                    sentinel = None;
                    ctx.held.store(false, Ordering::SeqCst);
                    if ctx.desired.load(Ordering::SeqCst) {
                        warn!("wake lock revoked by platform while playing, queueing relock");
                        let _ = ctx.event_sender.send(WakelockEvent::Relocking);
                        sleep(RELOCK_SETTLE_DELAY).await;
                        if ctx.desired.load(Ordering::SeqCst) {
                            Self::converge(&ctx, &mut sentinel).await;
                        } else {
                            // Playback stopped during the settle delay; the
                            // revoked lock is already down, so this counts as
                            // a clean release.
                            debug!("playback stopped during relock settle, cleanly released");
                            let _ = ctx.event_sender.send(WakelockEvent::Released);
                        }
                    } else {
                        debug!("wake lock revoked after playback stopped, cleanly released");
                        let _ = ctx.event_sender.send(WakelockEvent::Released);
                    }
                }
            }
        }
        debug!("convergence worker stopped");
    }

    async fn wait_revoked(revocation: Option<Arc<Notify>>) {
        match revocation {
            Some(notify) => notify.notified().await,
            // Nothing held, nothing to revoke.
            None => future::pending().await,
        }
    }

    /// One convergence pass: repeatedly compare occupancy against desire and
    /// perform at most one corrective action per iteration. The re-check
    /// after each action is what reconciles a desire that flipped while an
    /// acquire or release was in flight.
    async fn converge(ctx: &ConvergenceContext, sentinel: &mut Option<WakeLockSentinel>) {
        loop {
            let want = ctx.desired.load(Ordering::SeqCst);
            match (sentinel.is_some(), want) {
                // Occupancy already matches desire.
                (true, true) | (false, false) => return,

                (false, true) => {
                    info!("requesting wake lock");
                    let _ = ctx.event_sender.send(WakelockEvent::Locking);
                    loop {
                        match ctx.provider.request().await {
                            Ok(lock) => {
                                debug!("wake lock acquired");
                                *sentinel = Some(lock);
                                ctx.held.store(true, Ordering::SeqCst);
                                let _ = ctx.event_sender.send(WakelockEvent::Locked);
                                break;
                            }
                            Err(e) => {
                                // Desire may have flipped while the request
                                // was in flight; no point waiting out the
                                // backoff for a lock nobody wants.
                                if !ctx.desired.load(Ordering::SeqCst) {
                                    debug!("playback paused while request was in flight, abandoning");
                                    break;
                                }
                                warn!(error = %e, "wake lock request failed, retrying in {:?}", ACQUIRE_RETRY_DELAY);
                                sleep(ACQUIRE_RETRY_DELAY).await;
                                if !ctx.desired.load(Ordering::SeqCst) {
                                    debug!("playback paused during acquire retries, abandoning");
                                    break;
                                }
                            }
                        }
                    }
                }

                (true, false) => {
                    info!("releasing wake lock");
                    let _ = ctx.event_sender.send(WakelockEvent::Releasing);
                    if let Some(lock) = sentinel.take() {
                        if let Err(e) = lock.release().await {
                            // Treated as released; holding the slot on a
                            // failed release would wedge the worker.
                            warn!(error = %e, "wake lock release failed");
                        } else {
                            debug!("release request complete");
                        }
                    }
                    // Occupancy stays "held" until the release resolves, so
                    // the derived state reads unlocking while it is pending.
                    ctx.held.store(false, Ordering::SeqCst);
                    // `released` means the lock came down and stayed down; if
                    // desire flipped back mid-release the next iteration
                    // re-acquires instead.
                    if !ctx.desired.load(Ordering::SeqCst) {
                        let _ = ctx.event_sender.send(WakelockEvent::Released);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for WakelockController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakelockController")
            .field("playback_state", &self.playback_state())
            .field("lock_state", &self.lock_state())
            .finish()
    }
}
