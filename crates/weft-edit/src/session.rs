#![forbid(unsafe_code)]

//! [`EditSession<T>`]: the display/edit content switcher.
//!
//! # States
//!
//! - **Displaying** (initial): `is_editing` is false, [`EditSession::current`]
//!   is [`ActiveContent::Display`].
//! - **Editing**: `is_editing` is true, current content is
//!   [`ActiveContent::Edit`].
//!
//! # Transitions
//!
//! - Displaying → Editing when `is_editing` becomes true. If `is_editable`
//!   is false at that moment the transition is immediately reverted and no
//!   edit-started notification fires. Otherwise the session snapshots the
//!   (display, edit) values, applies the value-transfer policy, fires
//!   edit-started, and switches the current content.
//! - A second start-edit request while editing is a no-op.
//! - Editing → Displaying via **commit**: the edit content's
//!   `complete_edit` marks the completed flag and drops `is_editing`; the
//!   session fires edit-completed and switches back.
//! - Editing → Displaying via **cancel**: `cancel_edit`, forcing
//!   `is_editable` to false mid-edit, or forcing `is_editing` to false all
//!   fire edit-canceled instead.
//!
//! The session itself copies no values between contents; that policy lives
//! in [`ValueTransfer`] and is what the concrete editable kinds
//! ([`EditableText`](crate::EditableText) and friends) opt into.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;
use weft_reactive::{EventSource, ObservableValue, Subscription};

use crate::content::{DisplayContent, EditContent};

/// Which content object a session currently exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveContent {
    /// The display content is visible.
    Display,
    /// The edit content is visible.
    Edit,
}

/// Value-transfer policy between display and edit content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueTransfer {
    /// The session never copies values; contents evolve independently.
    None,
    /// Copy display → edit when an edit starts and edit → display when it
    /// completes, so canceling leaves the display value untouched.
    Copy,
}

/// The (display, edit) value pair snapshotted at a lifecycle transition,
/// taken before any value transfer runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditSnapshot<T> {
    display: T,
    edit: T,
}

impl<T> EditSnapshot<T> {
    fn new(display: T, edit: T) -> Self {
        Self { display, edit }
    }

    /// The display value at transition time.
    #[must_use]
    pub fn display_value(&self) -> &T {
        &self.display
    }

    /// The edit value at transition time.
    #[must_use]
    pub fn edit_value(&self) -> &T {
        &self.edit
    }
}

#[derive(Default)]
struct Flags {
    edit_started: bool,
    edit_completed: bool,
}

struct SessionInner<T: 'static> {
    is_editable: ObservableValue<bool>,
    is_editing: ObservableValue<bool>,
    display: DisplayContent<T>,
    edit: EditContent<T>,
    current: ObservableValue<ActiveContent>,
    transfer: ValueTransfer,
    flags: Mutex<Flags>,
    edit_started: EventSource<EditSnapshot<T>>,
    edit_completed: EventSource<EditSnapshot<T>>,
    edit_canceled: EventSource<EditSnapshot<T>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<T: Clone + PartialEq + Send + 'static> SessionInner<T> {
    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> EditSnapshot<T> {
        EditSnapshot::new(self.display.value().value(), self.edit.value().value())
    }

    fn editing_changed(&self, now_editing: bool) {
        if now_editing {
            self.editing_started();
        } else {
            self.editing_finished();
        }
    }

    fn editing_started(&self) {
        self.flags().edit_completed = false;

        if !self.is_editable.value() {
            trace!("reverting edit start: session is not editable");
            self.is_editing.set(false);
            return;
        }

        let snapshot = self.snapshot();
        if self.transfer == ValueTransfer::Copy {
            self.edit.value().set(snapshot.display_value().clone());
        }
        self.edit_started.emit(&snapshot);
        self.current.set(ActiveContent::Edit);
        self.flags().edit_started = true;
        trace!("edit started");
    }

    fn editing_finished(&self) {
        if !self.flags().edit_started {
            return;
        }

        let completed = self.flags().edit_completed;
        let snapshot = self.snapshot();
        if completed {
            if self.transfer == ValueTransfer::Copy {
                self.display.value().set(snapshot.edit_value().clone());
            }
            self.edit_completed.emit(&snapshot);
            trace!("edit completed");
        } else {
            self.edit_canceled.emit(&snapshot);
            trace!("edit canceled");
        }
        self.current.set(ActiveContent::Display);
        self.flags().edit_started = false;
    }
}

/// Layers commit-or-cancel editing on top of two content cells.
///
/// Cloning yields a handle to the same session.
pub struct EditSession<T: 'static> {
    inner: Arc<SessionInner<T>>,
}

impl<T: 'static> Clone for EditSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> EditSession<T> {
    /// Create a session with independent display and edit values and no
    /// value transfer.
    #[must_use]
    pub fn new(display_value: T, edit_value: T) -> Self {
        Self::from_contents(
            DisplayContent::new(display_value),
            EditContent::new(edit_value),
            ValueTransfer::None,
        )
    }

    /// Create a session with an explicit value-transfer policy.
    #[must_use]
    pub fn with_transfer(display_value: T, edit_value: T, transfer: ValueTransfer) -> Self {
        Self::from_contents(
            DisplayContent::new(display_value),
            EditContent::new(edit_value),
            transfer,
        )
    }

    /// Create a session from pre-built content objects.
    #[must_use]
    pub fn from_contents(
        display: DisplayContent<T>,
        edit: EditContent<T>,
        transfer: ValueTransfer,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            is_editable: ObservableValue::new(true),
            is_editing: ObservableValue::new(false),
            display,
            edit,
            current: ObservableValue::new(ActiveContent::Display),
            transfer,
            flags: Mutex::new(Flags::default()),
            edit_started: EventSource::new(),
            edit_completed: EventSource::new(),
            edit_canceled: EventSource::new(),
            subscriptions: Mutex::new(Vec::new()),
        });

        inner
            .display
            .is_editable()
            .bind_two_way(&inner.is_editable)
            .expect("fresh content cells are never pre-bound");

        let mut subscriptions = Vec::new();

        let weak = Arc::downgrade(&inner);
        subscriptions.push(inner.display.on_edit_requested(move |()| {
            if let Some(session) = weak.upgrade() {
                session.is_editing.set(true);
            }
        }));

        let weak = Arc::downgrade(&inner);
        subscriptions.push(inner.edit.on_completed(move |()| {
            if let Some(session) = weak.upgrade() {
                session.flags().edit_completed = true;
                session.is_editing.set(false);
            }
        }));

        let weak = Arc::downgrade(&inner);
        subscriptions.push(inner.edit.on_canceled(move |()| {
            if let Some(session) = weak.upgrade() {
                session.is_editing.set(false);
            }
        }));

        let weak = Arc::downgrade(&inner);
        subscriptions.push(inner.is_editable.on_value_changed(move |args| {
            if let Some(session) = weak.upgrade() {
                if session.is_editing.value() && !*args.new_value() {
                    session.is_editing.set(false);
                }
            }
        }));

        let weak = Arc::downgrade(&inner);
        subscriptions.push(inner.is_editing.on_value_changed(move |args| {
            if let Some(session) = weak.upgrade() {
                session.editing_changed(*args.new_value());
            }
        }));

        *inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;

        Self { inner }
    }

    /// The displayed value cell (the session's public value).
    #[must_use]
    pub fn value(&self) -> &ObservableValue<T> {
        self.inner.display.value()
    }

    /// Whether editing may currently be started.
    #[must_use]
    pub fn is_editable(&self) -> &ObservableValue<bool> {
        &self.inner.is_editable
    }

    /// Whether an edit is in progress. Writable: forcing it to false
    /// mid-edit cancels.
    #[must_use]
    pub fn is_editing(&self) -> &ObservableValue<bool> {
        &self.inner.is_editing
    }

    /// Which content object is currently exposed.
    #[must_use]
    pub fn current(&self) -> &ObservableValue<ActiveContent> {
        &self.inner.current
    }

    /// The display content object.
    #[must_use]
    pub fn display_content(&self) -> &DisplayContent<T> {
        &self.inner.display
    }

    /// The edit content object.
    #[must_use]
    pub fn edit_content(&self) -> &EditContent<T> {
        &self.inner.edit
    }

    /// Request an edit start through the display content.
    pub fn start_edit(&self) {
        self.inner.display.start_edit();
    }

    /// Commit the current edit through the edit content.
    pub fn complete_edit(&self) {
        self.inner.edit.complete_edit();
    }

    /// Cancel the current edit through the edit content.
    pub fn cancel_edit(&self) {
        self.inner.edit.cancel_edit();
    }

    /// Subscribe to edit-started notifications.
    pub fn on_edit_started(
        &self,
        handler: impl Fn(&EditSnapshot<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.edit_started.subscribe(handler)
    }

    /// Subscribe to edit-completed notifications.
    pub fn on_edit_completed(
        &self,
        handler: impl Fn(&EditSnapshot<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.edit_completed.subscribe(handler)
    }

    /// Subscribe to edit-canceled notifications.
    pub fn on_edit_canceled(
        &self,
        handler: impl Fn(&EditSnapshot<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.edit_canceled.subscribe(handler)
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug for EditSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("is_editing", &self.inner.is_editing.value())
            .field("is_editable", &self.inner.is_editable.value())
            .field("current", &self.inner.current.value())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event_counters<T: Clone + PartialEq + Send + 'static>(
        session: &EditSession<T>,
    ) -> (
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
        Vec<Subscription>,
    ) {
        let started = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let canceled = Arc::new(AtomicUsize::new(0));
        let subs = vec![
            {
                let c = Arc::clone(&started);
                session.on_edit_started(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            },
            {
                let c = Arc::clone(&completed);
                session.on_edit_completed(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            },
            {
                let c = Arc::clone(&canceled);
                session.on_edit_canceled(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            },
        ];
        (started, completed, canceled, subs)
    }

    #[test]
    fn starts_displaying() {
        let session = EditSession::new(String::from("v"), String::new());
        assert!(!session.is_editing().value());
        assert!(session.is_editable().value());
        assert_eq!(session.current().value(), ActiveContent::Display);
    }

    #[test]
    fn start_then_complete_switches_content_and_fires_events() {
        let session = EditSession::new(String::from("v"), String::new());
        let (started, completed, canceled, _subs) = event_counters(&session);

        session.start_edit();
        assert!(session.is_editing().value());
        assert_eq!(session.current().value(), ActiveContent::Edit);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        session.complete_edit();
        assert!(!session.is_editing().value());
        assert_eq!(session.current().value(), ActiveContent::Display);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(canceled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_paths_all_fire_canceled() {
        for cancel in [
            (|s: &EditSession<i32>| s.cancel_edit()) as fn(&EditSession<i32>),
            |s| s.is_editing().set(false),
            |s| s.is_editable().set(false),
        ] {
            let session = EditSession::new(1, 0);
            let (started, completed, canceled, _subs) = event_counters(&session);

            session.start_edit();
            assert_eq!(started.load(Ordering::SeqCst), 1);

            cancel(&session);
            assert!(!session.is_editing().value());
            assert_eq!(session.current().value(), ActiveContent::Display);
            assert_eq!(completed.load(Ordering::SeqCst), 0);
            assert_eq!(canceled.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn cancel_before_start_is_silent() {
        let session = EditSession::new(1, 0);
        let (started, completed, canceled, _subs) = event_counters(&session);

        session.cancel_edit();
        assert!(!session.is_editing().value());
        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(completed.load(Ordering::SeqCst), 0);
        assert_eq!(canceled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_edit_blocked_while_not_editable() {
        let session = EditSession::new(1, 0);
        let (started, _completed, _canceled, _subs) = event_counters(&session);

        session.is_editable().set(false);
        session.start_edit();
        assert!(!session.is_editing().value());
        assert_eq!(session.current().value(), ActiveContent::Display);
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forced_is_editing_reverts_when_not_editable() {
        let session = EditSession::new(1, 0);
        let (started, _completed, canceled, _subs) = event_counters(&session);

        session.is_editable().set(false);
        // Bypass the display content's gate entirely.
        session.is_editing().set(true);
        assert!(!session.is_editing().value());
        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(canceled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_start_edit_is_idempotent() {
        let session = EditSession::new(1, 0);
        let (started, _completed, _canceled, _subs) = event_counters(&session);

        session.start_edit();
        session.start_edit();
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(session.is_editing().value());
    }

    #[test]
    fn base_session_copies_no_values() {
        let session = EditSession::new(String::from("display"), String::from("edit"));
        session.start_edit();
        assert_eq!(session.edit_content().value().value(), "edit");

        session.edit_content().value().set(String::from("changed"));
        session.complete_edit();
        assert_eq!(session.value().value(), "display");
    }

    #[test]
    fn copy_transfer_promotes_on_complete_only() {
        let session = EditSession::with_transfer(
            String::from("Initial"),
            String::new(),
            ValueTransfer::Copy,
        );
        let completions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&completions);
        let _sub = session.on_edit_completed(move |snapshot| {
            sink.lock()
                .unwrap()
                .push((snapshot.display_value().clone(), snapshot.edit_value().clone()));
        });

        session.start_edit();
        assert_eq!(
            session.edit_content().value().value(),
            "Initial",
            "edit content picks up the display value on start"
        );

        session.edit_content().value().set(String::from("Edited"));
        session.complete_edit();
        assert_eq!(session.value().value(), "Edited");
        assert_eq!(
            *completions.lock().unwrap(),
            vec![(String::from("Initial"), String::from("Edited"))],
            "the snapshot is taken before the edit value is promoted"
        );

        // The same flow canceled leaves the display value untouched.
        session.start_edit();
        session.edit_content().value().set(String::from("Discarded"));
        session.cancel_edit();
        assert_eq!(session.value().value(), "Edited");
    }

    #[test]
    fn editable_flag_syncs_with_display_content() {
        let session = EditSession::new(1, 0);
        assert!(session.display_content().is_editable().value());

        session.is_editable().set(false);
        assert!(!session.display_content().is_editable().value());

        session.display_content().is_editable().set(true);
        assert!(session.is_editable().value());
    }
}
