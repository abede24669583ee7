use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// Attribute the host player exposes its raw playback state through.
pub const PLAYBACK_STATE_ATTR: &str = "data-test-playback-state";

// Mutations are tiny (attribute names), so a modest buffer is enough; the
// watcher resynchronizes from the attribute map if it ever lags.
const MUTATION_BUFFER_CAPACITY: usize = 64;

/// A DOM-like host element: a mutable string attribute map whose mutations
/// can be observed through a broadcast subscription. The host page mutates
/// attributes at arbitrary times; observers re-read the map on notification
/// rather than trusting a carried value.
///
/// Cloning yields another handle to the same element.
#[derive(Clone)]
pub struct PlayerElement {
    inner: Arc<ElementInner>,
}

struct ElementInner {
    attributes: Mutex<HashMap<String, String>>,
    mutations: broadcast::Sender<String>,
}

impl PlayerElement {
    pub fn new() -> Self {
        let (mutation_tx, _) = broadcast::channel(MUTATION_BUFFER_CAPACITY);
        Self {
            inner: Arc::new(ElementInner {
                attributes: Mutex::new(HashMap::new()),
                mutations: mutation_tx,
            }),
        }
    }

    /// Read an attribute value. `None` means the attribute is structurally
    /// absent, which is distinct from present-but-empty.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.lock().get(name).cloned()
    }

    /// Set an attribute and notify observers. The notification carries only
    /// the attribute name; observers re-read the current value.
    pub fn set_attribute(&self, name: &str, value: &str) {
        trace!(attribute = name, value, "element attribute mutated");
        self.inner
            .attributes
            .lock()
            .insert(name.to_string(), value.to_string());
        // No receivers is fine; nobody is observing yet.
        let _ = self.inner.mutations.send(name.to_string());
    }

    /// Subscribe to attribute mutation notifications. Receivers are expected
    /// to filter by attribute name.
    pub fn observe(&self) -> broadcast::Receiver<String> {
        self.inner.mutations.subscribe()
    }
}

impl Default for PlayerElement {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlayerElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerElement")
            .field("attributes", &*self.inner.attributes.lock())
            .finish()
    }
}
