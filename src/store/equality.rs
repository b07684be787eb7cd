//! Comparators for store subscriptions.
//!
//! A comparator decides whether a freshly selected slice differs from the
//! slice the subscription saw last time; the listener only runs when it does.

use std::sync::Arc;

use crate::model::State;

/// Value equality. The default for [`Store::subscribe`](super::Store::subscribe).
pub fn value_eq<T: PartialEq>(previous: &T, next: &T) -> bool {
    previous == next
}

/// Never equal: the listener runs after every state replacement.
pub fn never<T>(_previous: &T, _next: &T) -> bool {
    false
}

/// Identity of a shared slice, ignoring contents.
pub fn same_arc<T: ?Sized>(previous: &Arc<T>, next: &Arc<T>) -> bool {
    Arc::ptr_eq(previous, next)
}

/// Field-by-field comparison of two states where shared parts are compared
/// by identity and scalars by value.
///
/// Two states built by merging an unchanged slice back in compare equal;
/// any replaced slide, `ui` map or selection makes them differ even when the
/// contents happen to match.
pub fn shallow_state(previous: &State, next: &State) -> bool {
    let slides_same = previous.slides.len() == next.slides.len()
        && previous
            .slides
            .iter()
            .zip(&next.slides)
            .all(|(a, b)| Arc::ptr_eq(a, b));
    let selection_same = match (&previous.selected_node, &next.selected_node) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };

    slides_same
        && selection_same
        && Arc::ptr_eq(&previous.ui, &next.ui)
        && previous.active_slide_id == next.active_slide_id
}
