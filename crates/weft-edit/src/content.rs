#![forbid(unsafe_code)]

//! The two content objects an [`EditSession`](crate::EditSession) switches
//! between.
//!
//! [`DisplayContent`] is what observers see while nothing is being edited;
//! its `start_edit` request is gated by its own `is_editable` cell (which a
//! session keeps two-way bound to the session-level flag). [`EditContent`]
//! is the scratch value being edited; `complete_edit` and `cancel_edit`
//! raise the requests the session turns into commit or cancel transitions.
//!
//! Neither content object transitions anything by itself; they only raise
//! requests. The session owns the state machine.

use tracing::trace;
use weft_reactive::{EventSource, ObservableValue, Subscription};

/// The content shown while not editing.
pub struct DisplayContent<T: 'static> {
    value: ObservableValue<T>,
    is_editable: ObservableValue<bool>,
    edit_requested: EventSource<()>,
}

impl<T: Clone + PartialEq + Send + 'static> DisplayContent<T> {
    /// Create a display content holding `value`. Starts non-editable until
    /// an owner (usually a session) flips `is_editable`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: ObservableValue::new(value),
            is_editable: ObservableValue::new(false),
            edit_requested: EventSource::new(),
        }
    }

    /// The displayed value cell.
    #[must_use]
    pub fn value(&self) -> &ObservableValue<T> {
        &self.value
    }

    /// Whether an edit may currently be started.
    #[must_use]
    pub fn is_editable(&self) -> &ObservableValue<bool> {
        &self.is_editable
    }

    /// Request an edit. Silently ignored while not editable.
    pub fn start_edit(&self) {
        if !self.is_editable.value() {
            trace!("ignored start_edit request: content is not editable");
            return;
        }
        self.edit_requested.emit(&());
    }

    /// Subscribe to granted edit requests.
    pub fn on_edit_requested(
        &self,
        handler: impl Fn(&()) + Send + Sync + 'static,
    ) -> Subscription {
        self.edit_requested.subscribe(handler)
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug
    for DisplayContent<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayContent")
            .field("value", &self.value)
            .field("is_editable", &self.is_editable.value())
            .finish()
    }
}

/// The scratch content mutated during an edit.
pub struct EditContent<T: 'static> {
    value: ObservableValue<T>,
    completed: EventSource<()>,
    canceled: EventSource<()>,
}

impl<T: Clone + PartialEq + Send + 'static> EditContent<T> {
    /// Create an edit content holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: ObservableValue::new(value),
            completed: EventSource::new(),
            canceled: EventSource::new(),
        }
    }

    /// The value cell being edited.
    #[must_use]
    pub fn value(&self) -> &ObservableValue<T> {
        &self.value
    }

    /// Request completion of the current edit.
    pub fn complete_edit(&self) {
        self.completed.emit(&());
    }

    /// Request cancellation of the current edit.
    pub fn cancel_edit(&self) {
        self.canceled.emit(&());
    }

    /// Subscribe to completion requests.
    pub fn on_completed(&self, handler: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
        self.completed.subscribe(handler)
    }

    /// Subscribe to cancellation requests.
    pub fn on_canceled(&self, handler: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
        self.canceled.subscribe(handler)
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug for EditContent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditContent")
            .field("value", &self.value)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
