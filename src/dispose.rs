//! Handles for releasing bus handlers and store subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

static HANDLER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a bus handler or store subscription.
#[derive(Clone)]
pub struct HandlerId {
    /// Human-readable name, used in logs only.
    pub name: String,
    id: u64,
}

impl HandlerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: HANDLER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({}:{})", self.id, self.name)
    }
}

impl PartialEq for HandlerId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerId {}

impl std::hash::Hash for HandlerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Releases a handler or subscription when [`dispose`](Self::dispose) is called.
///
/// Dropping a `Disposer` does *not* release anything; the owner must dispose
/// explicitly, or convert it into a [`DisposeGuard`].
#[must_use = "a handler stays registered until the disposer is called"]
pub struct Disposer {
    id: HandlerId,
    release: Mutex<Option<Release>>,
}

impl Disposer {
    pub(crate) fn new(id: HandlerId, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    /// Release the handler. Calling this more than once is a no-op.
    pub fn dispose(&self) {
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release.lock().is_none()
    }

    /// Dispose automatically when the returned guard goes out of scope.
    pub fn guard(self) -> DisposeGuard {
        DisposeGuard(self)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Scoped owner of a [`Disposer`]; disposes on drop.
#[derive(Debug)]
pub struct DisposeGuard(Disposer);

impl DisposeGuard {
    pub fn id(&self) -> &HandlerId {
        self.0.id()
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.0.dispose();
    }
}
