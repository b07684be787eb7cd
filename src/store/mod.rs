//! The single authoritative [`State`] and selector-scoped change
//! notification.
//!
//! Every change publishes a brand-new `Arc<State>`; the previous value is
//! never modified. After publishing, each live subscription re-runs its
//! selector against the new state and compares the result to the slice it
//! saw last time. Listeners fire synchronously, in subscription order, and
//! only for subscriptions whose comparator reports a change.
//!
//! No lock is held while selectors, comparators or listeners run, so a
//! listener may call [`Store::set_state`] again; that starts a complete
//! nested notification pass.

pub mod equality;
mod subscription;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::dispose::{Disposer, HandlerId};
use crate::events::event_bus::panic_message;
use crate::model::{State, StatePatch};

use subscription::{SelectorSubscription, Subscriber};

struct StoreInner {
    state: RwLock<Arc<State>>,
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
    revision: AtomicU64,
}

impl StoreInner {
    fn unsubscribe(&self, id: &HandlerId) {
        let mut subscribers = self.subscribers.write();
        if let Some(index) = subscribers.iter().position(|s| s.id() == id) {
            subscribers.remove(index).deactivate();
        }
    }
}

/// Cheaply cloneable handle to one store; clones share state and subscribers.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::default())
    }
}

impl Store {
    pub fn new(initial: State) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(initial)),
                subscribers: RwLock::new(Vec::new()),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// The current state. Hold on to it as long as needed; later changes
    /// publish a new value instead of touching this one.
    pub fn get_state(&self) -> Arc<State> {
        self.inner.state.read().clone()
    }

    /// Number of state replacements so far.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    /// Shallow-merge `patch` into the current state. Returns the revision
    /// that was published.
    pub fn set_state(&self, patch: StatePatch) -> u64 {
        self.update_state(|current| current.merged(patch))
    }

    /// Replace the state with whatever `f` builds from the current one.
    /// Returns the revision that was published.
    pub fn update_state(&self, f: impl FnOnce(&State) -> State) -> u64 {
        let current = self.get_state();
        let next = Arc::new(f(&current));
        // Revision order must match publication order across writers.
        let revision = {
            let mut slot = self.inner.state.write();
            *slot = next.clone();
            self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.notify(&next, revision);
        revision
    }

    /// Replace the state wholesale. Returns the revision that was published.
    pub fn replace_state(&self, state: State) -> u64 {
        self.update_state(|_| state)
    }

    fn notify(&self, state: &Arc<State>, revision: u64) {
        let subscribers: Vec<Arc<dyn Subscriber>> = self.inner.subscribers.read().clone();
        for subscriber in &subscribers {
            // A listener replaced the state again; that nested pass has
            // already brought every subscriber up to date.
            if self.revision() != revision {
                break;
            }
            let result = catch_unwind(AssertUnwindSafe(|| subscriber.notify(state)));
            if let Err(panic) = result {
                log::error!(
                    "[Store] subscriber {:?} panicked: {}",
                    subscriber.id(),
                    panic_message(&panic)
                );
            }
        }
    }

    /// Subscribe to a slice of the state, compared by value.
    ///
    /// The selector runs once immediately to seed the last-seen slice; the
    /// listener does not fire for that initial value.
    pub fn subscribe<T, S, L>(&self, selector: S, listener: L) -> Disposer
    where
        T: PartialEq + Clone + Send + 'static,
        S: Fn(&State) -> T + Send + Sync + 'static,
        L: Fn(&T, &State) + Send + Sync + 'static,
    {
        self.subscribe_with(selector, listener, equality::value_eq::<T>)
    }

    /// Subscribe to a slice of the state with a custom comparator.
    ///
    /// `equals(previous, next)` returning `false` counts as a change.
    pub fn subscribe_with<T, S, L, E>(&self, selector: S, listener: L, equals: E) -> Disposer
    where
        T: Clone + Send + 'static,
        S: Fn(&State) -> T + Send + Sync + 'static,
        L: Fn(&T, &State) + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let id = HandlerId::new("store-subscription");
        let initial = selector(&self.get_state());
        let subscription: Arc<dyn Subscriber> = Arc::new(SelectorSubscription::new(
            id.clone(),
            initial,
            Box::new(selector),
            Box::new(equals),
            Box::new(listener),
        ));
        self.inner.subscribers.write().push(subscription);

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let release_id = id.clone();
        Disposer::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(&release_id);
            }
        })
    }

    /// Subscribe to the whole state, compared with
    /// [`equality::shallow_state`].
    pub fn subscribe_state<L>(&self, listener: L) -> Disposer
    where
        L: Fn(&State, &State) + Send + Sync + 'static,
    {
        self.subscribe_with(|state: &State| state.clone(), listener, equality::shallow_state)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Slide};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    fn with_slides() -> Store {
        Store::new(State {
            slides: vec![Arc::new(Slide::new("s1", vec![Node::new("n1", json!({}))]))],
            active_slide_id: Some("s1".into()),
            ..State::default()
        })
    }

    #[test]
    fn test_set_state_merges_and_replaces_atomically() {
        let store = with_slides();
        let before = store.get_state();

        store.set_state(StatePatch::new().active_slide_id(None));
        let after = store.get_state();

        assert_eq!(before.active_slide_id.as_deref(), Some("s1"));
        assert_eq!(after.active_slide_id, None);
        assert!(Arc::ptr_eq(&before.slides[0], &after.slides[0]));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_update_state_uses_return_value_wholesale() {
        let store = with_slides();
        store.update_state(|_| State::default());
        assert!(store.get_state().slides.is_empty());
        assert_eq!(store.get_state().active_slide_id, None);
    }

    #[test]
    fn test_listener_receives_slice_and_state() {
        let store = with_slides();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = store.subscribe(
            |s: &State| s.active_slide_id.clone(),
            move |slice: &Option<String>, state: &State| {
                sink.lock().push((slice.clone(), state.slides.len()));
            },
        );

        store.set_state(StatePatch::new().active_slide_id(Some("s2".into())));
        store.set_state(StatePatch::new().active_slide_id(Some("s2".into())));

        assert_eq!(*seen.lock(), vec![(Some("s2".to_owned()), 1)]);
    }

    #[test]
    fn test_equal_but_new_slice_does_not_fire() {
        let store = with_slides();
        let fired = Arc::new(Mutex::new(0));
        let count = fired.clone();
        let _sub = store.subscribe(
            |s: &State| json!({ "active": s.active_slide_id }),
            move |_: &Value, _: &State| *count.lock() += 1,
        );

        store.set_state(StatePatch::new().slides(vec![]));
        store.replace_state((*store.get_state()).clone());

        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    fn test_never_equal_fires_on_every_change() {
        let store = with_slides();
        let fired = Arc::new(Mutex::new(0));
        let count = fired.clone();
        let _sub = store.subscribe_with(
            |s: &State| s.active_slide_id.clone(),
            move |_: &Option<String>, _: &State| *count.lock() += 1,
            equality::never,
        );

        store.set_state(StatePatch::new());
        store.set_state(StatePatch::new());

        assert_eq!(*fired.lock(), 2);
    }

    #[test]
    fn test_listeners_fire_in_subscription_order() {
        let store = Store::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            subs.push(store.subscribe_with(
                |_: &State| (),
                move |_: &(), _: &State| order.lock().push(tag),
                equality::never,
            ));
        }

        store.set_state(StatePatch::new());

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let store = Store::default();
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        let _bad = store.subscribe_with(
            |_: &State| (),
            |_: &(), _: &State| panic!("listener failure"),
            equality::never,
        );
        let _good = store.subscribe_with(
            |_: &State| (),
            move |_: &(), _: &State| *flag.lock() = true,
            equality::never,
        );

        store.set_state(StatePatch::new());

        assert!(*fired.lock());
    }

    #[test]
    fn test_reentrant_set_state_runs_nested_pass() {
        let store = Store::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_store = store.clone();
        let _redirect = store.subscribe(
            |s: &State| s.active_slide_id.clone(),
            move |slice: &Option<String>, _: &State| {
                if slice.as_deref() == Some("draft") {
                    inner_store.set_state(StatePatch::new().active_slide_id(Some("final".into())));
                }
            },
        );
        let sink = seen.clone();
        let _observer = store.subscribe(
            |s: &State| s.active_slide_id.clone(),
            move |slice: &Option<String>, _: &State| sink.lock().push(slice.clone()),
        );

        store.set_state(StatePatch::new().active_slide_id(Some("draft".into())));

        // The nested pass reaches the observer first; the outer pass is
        // superseded and never shows it the intermediate value.
        assert_eq!(*seen.lock(), vec![Some("final".to_owned())]);
        assert_eq!(store.get_state().active_slide_id.as_deref(), Some("final"));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_dispose_stops_notifications() {
        let store = Store::default();
        let fired = Arc::new(Mutex::new(0));
        let count = fired.clone();
        let sub = store.subscribe_with(
            |_: &State| (),
            move |_: &(), _: &State| *count.lock() += 1,
            equality::never,
        );

        store.set_state(StatePatch::new());
        sub.dispose();
        store.set_state(StatePatch::new());

        assert_eq!(*fired.lock(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_during_pass_skips_later_subscriber() {
        let store = Store::default();
        let fired = Arc::new(Mutex::new(0));
        let victim: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));

        let target = victim.clone();
        let _killer = store.subscribe_with(
            |_: &State| (),
            move |_: &(), _: &State| {
                if let Some(disposer) = target.lock().as_ref() {
                    disposer.dispose();
                }
            },
            equality::never,
        );
        let count = fired.clone();
        *victim.lock() = Some(store.subscribe_with(
            |_: &State| (),
            move |_: &(), _: &State| *count.lock() += 1,
            equality::never,
        ));

        store.set_state(StatePatch::new());

        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    fn test_latest_revision_holds_the_published_state() {
        let store = Store::default();
        let published = Arc::new(Mutex::new(Vec::new()));

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let store = store.clone();
                let published = published.clone();
                std::thread::spawn(move || {
                    for step in 0..250 {
                        let id = format!("{writer}-{step}");
                        let revision = store.replace_state(State {
                            active_slide_id: Some(id.clone()),
                            ..State::default()
                        });
                        published.lock().push((revision, id));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let published = published.lock();
        let (revision, id) = published.iter().max_by_key(|(revision, _)| *revision).unwrap();
        assert_eq!(*revision, 1000);
        assert_eq!(store.revision(), 1000);
        assert_eq!(store.get_state().active_slide_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_subscribe_state_uses_shallow_comparison() {
        let store = with_slides();
        let fired = Arc::new(Mutex::new(0));
        let count = fired.clone();
        let _sub = store.subscribe_state(move |_: &State, _: &State| *count.lock() += 1);

        store.set_state(StatePatch::new());
        assert_eq!(*fired.lock(), 0);

        store.set_state(StatePatch::new().active_slide_id(Some("s9".into())));
        assert_eq!(*fired.lock(), 1);
    }
}
