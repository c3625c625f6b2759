#![forbid(unsafe_code)]

//! Subscriber registries and the RAII [`Subscription`] guard.
//!
//! Every externally observable change in this crate (value, error state,
//! edit lifecycle) is exposed as its own [`EventSource`], so a subscriber
//! interested only in error state never has to filter value-change
//! notifications (and vice versa).
//!
//! # Architecture
//!
//! An `EventSource<A>` holds its subscriber list as an immutable snapshot
//! behind an [`arc_swap::ArcSwap`]. Emission iterates a loaded snapshot
//! without taking any lock, which makes notification re-entrant-safe: a
//! handler may subscribe, unsubscribe, or mutate the cell that is currently
//! notifying. Mutations of the list (subscribe/unsubscribe) swap in a new
//! snapshot and only affect later emissions.
//!
//! # Invariants
//!
//! 1. Handlers are invoked in subscription order.
//! 2. Dropping a [`Subscription`] removes its handler before the next
//!    emission begins; an emission already in flight still sees the old
//!    snapshot.
//! 3. An `EventSource` never keeps its subscribers alive past the guard:
//!    no guard, no handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Entry<A: 'static> {
    id: u64,
    handler: Handler<A>,
}

impl<A: 'static> Clone for Entry<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

struct EventCore<A: 'static> {
    entries: ArcSwap<Vec<Entry<A>>>,
    next_id: AtomicU64,
}

/// An independently subscribable notification stream.
///
/// Cloning an `EventSource` yields a handle to the same subscriber list.
pub struct EventSource<A: 'static> {
    core: Arc<EventCore<A>>,
}

impl<A: 'static> Clone for EventSource<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A: 'static> Default for EventSource<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> EventSource<A> {
    /// Create an event source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Arc::new(EventCore {
                entries: ArcSwap::from_pointee(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `handler`, returning the guard that keeps it subscribed.
    pub fn subscribe(&self, handler: impl Fn(&A) + Send + Sync + 'static) -> Subscription {
        let id = self.core.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler<A> = Arc::new(handler);
        self.core.entries.rcu(|entries| {
            let mut next = (**entries).clone();
            next.push(Entry {
                id,
                handler: Arc::clone(&handler),
            });
            next
        });
        let weak = Arc::downgrade(&self.core);
        Subscription::new(move || {
            if let Some(core) = weak.upgrade() {
                core.entries.rcu(|entries| {
                    entries
                        .iter()
                        .filter(|entry| entry.id != id)
                        .cloned()
                        .collect::<Vec<_>>()
                });
            }
        })
    }

    /// Invoke every subscribed handler, in subscription order.
    pub fn emit(&self, args: &A) {
        let snapshot = self.core.entries.load();
        for entry in snapshot.iter() {
            (entry.handler.as_ref())(args);
        }
    }

    /// Whether any handler is currently subscribed.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        !self.core.entries.load().is_empty()
    }
}

impl<A: 'static> std::fmt::Debug for EventSource<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("subscribers", &self.core.entries.load().len())
            .finish()
    }
}

/// RAII guard for a single event subscription.
///
/// Dropping the guard unsubscribes the handler. This replaces the weak-event
/// pattern used by GC'd view-model frameworks: subscription lifetime is tied
/// to an owner explicitly, never to finalization.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emits_in_subscription_order() {
        let source = EventSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = Arc::clone(&seen);
        let _a = source.subscribe(move |v: &i32| s1.lock().unwrap().push(("a", *v)));
        let s2 = Arc::clone(&seen);
        let _b = source.subscribe(move |v: &i32| s2.lock().unwrap().push(("b", *v)));

        source.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn drop_unsubscribes() {
        let source = EventSource::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let sub = source.subscribe(move |_: &()| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        source.emit(&());
        drop(sub);
        source.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_unsubscribe_during_emit() {
        let source: EventSource<()> = EventSource::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let fired = Arc::new(AtomicUsize::new(0));

        let slot_in_handler = Arc::clone(&slot);
        let f = Arc::clone(&fired);
        let sub = source.subscribe(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
            // Dropping our own guard mid-emit must not panic or deadlock.
            slot_in_handler.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(sub);

        source.emit(&());
        source.emit(&());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn has_subscribers_tracks_guards() {
        let source: EventSource<i32> = EventSource::new();
        assert!(!source.has_subscribers());
        let sub = source.subscribe(|_| {});
        assert!(source.has_subscribers());
        drop(sub);
        assert!(!source.has_subscribers());
    }

    #[test]
    fn subscription_outlives_source() {
        let sub;
        {
            let source: EventSource<i32> = EventSource::new();
            sub = source.subscribe(|_| {});
        }
        // Source gone; dropping the guard must be a quiet no-op.
        drop(sub);
    }
}
