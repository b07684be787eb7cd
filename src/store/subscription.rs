use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::dispose::HandlerId;
use crate::model::State;

pub(crate) type Selector<T> = Box<dyn Fn(&State) -> T + Send + Sync>;
pub(crate) type Comparator<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;
pub(crate) type Listener<T> = Box<dyn Fn(&T, &State) + Send + Sync>;

/// Type-erased subscription so the store can hold slices of any type.
pub(crate) trait Subscriber: Send + Sync {
    fn id(&self) -> &HandlerId;

    /// Re-select against `state` and run the listener if the slice changed.
    fn notify(&self, state: &State);

    fn deactivate(&self);
}

pub(crate) struct SelectorSubscription<T> {
    id: HandlerId,
    active: AtomicBool,
    selector: Selector<T>,
    equals: Comparator<T>,
    listener: Listener<T>,
    last: Mutex<T>,
}

impl<T> SelectorSubscription<T> {
    pub(crate) fn new(
        id: HandlerId,
        initial: T,
        selector: Selector<T>,
        equals: Comparator<T>,
        listener: Listener<T>,
    ) -> Self {
        Self {
            id,
            active: AtomicBool::new(true),
            selector,
            equals,
            listener,
            last: Mutex::new(initial),
        }
    }
}

impl<T: Clone + Send> Subscriber for SelectorSubscription<T> {
    fn id(&self) -> &HandlerId {
        &self.id
    }

    fn notify(&self, state: &State) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let next = (self.selector)(state);
        let changed = {
            let mut last = self.last.lock();
            let changed = !(self.equals)(&*last, &next);
            *last = next.clone();
            changed
        };

        // The lock is released so the listener may call back into the store.
        if changed {
            (self.listener)(&next, state);
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}
