use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};

use playback_wakelock_rs::{
    PlaybackState, PlaybackStateWatcher, PlayerElement, WakelockError, WakelockEvent,
    PLAYBACK_STATE_ATTR,
};

fn watcher_over(raw: Option<&str>) -> Result<PlaybackStateWatcher, WakelockError> {
    let player = PlayerElement::new();
    if let Some(value) = raw {
        player.set_attribute(PLAYBACK_STATE_ATTR, value);
    }
    let (event_tx, _) = broadcast::channel(100);
    PlaybackStateWatcher::new(player, event_tx)
}

async fn next_event(events: &mut broadcast::Receiver<WakelockEvent>) -> WakelockEvent {
    timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn assert_no_event(events: &mut broadcast::Receiver<WakelockEvent>) {
    let result = timeout(Duration::from_secs(10), events.recv()).await;
    assert!(result.is_err(), "unexpected event: {:?}", result);
}

// Binding fails before any observation begins: absent, empty, and
// unrecognized field values are all fatal.
#[tokio::test]
async fn test_bind_fails_fast() {
    match watcher_over(None) {
        Err(WakelockError::MissingStateAttribute(attr)) => {
            assert_eq!(attr, PLAYBACK_STATE_ATTR);
        }
        other => panic!("expected MissingStateAttribute, got {:?}", other),
    }

    match watcher_over(Some("")) {
        Err(WakelockError::EmptyStateAttribute(attr)) => {
            assert_eq!(attr, PLAYBACK_STATE_ATTR);
        }
        other => panic!("expected EmptyStateAttribute, got {:?}", other),
    }

    match watcher_over(Some("FOO")) {
        Err(WakelockError::UnrecognizedState(raw)) => assert_eq!(raw, "FOO"),
        other => panic!("expected UnrecognizedState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bind_succeeds_over_recognized_values() {
    let watcher = watcher_over(Some("PLAYING")).expect("PLAYING is in the vocabulary");
    assert_eq!(watcher.state(), PlaybackState::Playing);

    // The whole vocabulary is bindable, each seeding its normalized class.
    for (raw, expected) in [
        ("STALLED", PlaybackState::Playing),
        ("NOT_PLAYING", PlaybackState::Paused),
        ("IDLE", PlaybackState::Paused),
    ] {
        let watcher = watcher_over(Some(raw)).expect(raw);
        assert_eq!(watcher.state(), expected, "bind over {}", raw);
    }
}

// The arming pass establishes initial state without emitting a notification.
#[tokio::test(start_paused = true)]
async fn test_arming_emits_no_initial_notification() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player, event_tx).unwrap();

    watcher.watch();
    assert_eq!(watcher.state(), PlaybackState::Playing);
    assert_no_event(&mut events).await;
}

// Emitting the same raw value twice yields at most one notification, and a
// mutation within the same normalized class yields none.
#[tokio::test(start_paused = true)]
async fn test_edge_triggering() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "IDLE");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    watcher.watch();

    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    assert_eq!(next_event(&mut events).await, WakelockEvent::Play);

    // Same raw value again: debounced by value equality.
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    // Same normalized class: still no edge.
    player.set_attribute(PLAYBACK_STATE_ATTR, "STALLED");
    player.set_attribute(PLAYBACK_STATE_ATTR, "NOT_PLAYING");
    assert_eq!(next_event(&mut events).await, WakelockEvent::Pause);
    assert_no_event(&mut events).await;
}

// Vocabulary drift after arming is recovered locally: the value normalizes
// to paused and observation keeps running.
#[tokio::test(start_paused = true)]
async fn test_unknown_value_after_arming_defaults_to_paused() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    watcher.watch();

    player.set_attribute(PLAYBACK_STATE_ATTR, "SOME_NEW_VENDOR_STATE");
    assert_eq!(next_event(&mut events).await, WakelockEvent::Pause);
    assert_eq!(watcher.state(), PlaybackState::Paused);

    // The watcher is still alive and observing.
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    assert_eq!(next_event(&mut events).await, WakelockEvent::Play);
}

// watch() is idempotent: a second call must not double observation.
#[tokio::test(start_paused = true)]
async fn test_watch_is_idempotent() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    watcher.watch();
    watcher.watch();

    player.set_attribute(PLAYBACK_STATE_ATTR, "NOT_PLAYING");
    assert_eq!(next_event(&mut events).await, WakelockEvent::Pause);
    assert_no_event(&mut events).await;
}

// Mutations on other attributes are filtered out.
#[tokio::test(start_paused = true)]
async fn test_unrelated_attributes_are_ignored() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    watcher.watch();

    player.set_attribute("class", "player player--expanded");
    player.set_attribute("data-test-volume", "0.8");
    assert_no_event(&mut events).await;
    assert_eq!(watcher.state(), PlaybackState::Playing);
}

// A mutation burst that overflows the observation channel must not lose the
// final value: a lagged stream resynchronizes from the attribute map.
#[tokio::test(start_paused = true)]
async fn test_lagged_mutation_stream_resynchronizes() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "IDLE");
    let (event_tx, mut events) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    watcher.watch();

    // No await between these mutations, so they all queue before the
    // observation task gets to run, overflowing its subscription buffer.
    for _ in 0..40 {
        player.set_attribute(PLAYBACK_STATE_ATTR, "NOT_PLAYING");
        player.set_attribute(PLAYBACK_STATE_ATTR, "IDLE");
    }
    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");

    // The watcher re-reads the current value after the lag: one play edge,
    // no spurious notifications from the dropped intermediate mutations.
    assert_eq!(next_event(&mut events).await, WakelockEvent::Play);
    assert_no_event(&mut events).await;
    assert_eq!(watcher.state(), PlaybackState::Playing);
}

// The state receiver conflates to the latest value and reflects changes.
#[tokio::test(start_paused = true)]
async fn test_state_receiver_tracks_changes() {
    let player = PlayerElement::new();
    player.set_attribute(PLAYBACK_STATE_ATTR, "IDLE");
    let (event_tx, _) = broadcast::channel(100);
    let watcher = PlaybackStateWatcher::new(player.clone(), event_tx).unwrap();
    let mut state_rx = watcher.state_receiver();
    assert_eq!(*state_rx.borrow_and_update(), PlaybackState::Paused);
    watcher.watch();

    player.set_attribute(PLAYBACK_STATE_ATTR, "PLAYING");
    timeout(Duration::from_secs(60), state_rx.changed())
        .await
        .expect("timed out waiting for state change")
        .expect("state channel closed");
    assert_eq!(*state_rx.borrow_and_update(), PlaybackState::Playing);
}
