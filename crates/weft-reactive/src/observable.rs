#![forbid(unsafe_code)]

//! [`ObservableValue<T>`]: the fundamental reactive cell.
//!
//! A cell holds a current value and runs every mutation through a
//! three-phase protocol:
//!
//! 1. **Changing** (cancelable): subscribers see the old/new pair and may
//!    veto. A veto blocks the commit; the stored value never changes.
//! 2. **Validate**: the registered rule set and any ad-hoc validate
//!    subscribers evaluate the candidate value. Validation always runs,
//!    even when the commit is blocked by a veto or by invalidity, so error
//!    observers stay current on attempted-but-rejected edits.
//! 3. **Commit**: the value is stored and the changed notification fires
//!    (immediately, or deferred through an armed [`ChangeTimer`]).
//!
//! Setting a value equal (by `PartialEq`) to the current one is a complete
//! no-op: no events, no validation.
//!
//! # Threading
//!
//! Cell handles are cheap clones sharing one state. State lives behind a
//! short mutex; **all notification happens outside the lock** on a snapshot
//! of the subscriber list, so handlers may freely read or write the same
//! cell re-entrantly. The lock exists for the [`ChangeTimer`] hand-off; the
//! intended usage model is still one logical thread of control per cell
//! graph.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscription order.
//! 2. A vetoed change leaves the stored value untouched and fires no
//!    changed notification; only validation state may move.
//! 3. Error notifications fire only when the error set actually changes;
//!    an empty set replaced by an empty set is silent.
//! 4. `validated` resets whenever validation is enabled or disabled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{trace, warn};

use crate::event::{EventSource, Subscription};
use crate::timer::{ChangeTimer, ExecutionContext};
use crate::validation::{FieldIdentity, RuleSet, ValidationFailure};

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Payload of the cancelable pre-change notification.
pub struct ValueChangingArgs<T> {
    old: T,
    new: T,
    canceled: AtomicBool,
}

impl<T> ValueChangingArgs<T> {
    pub(crate) fn new(old: T, new: T) -> Self {
        Self {
            old,
            new,
            canceled: AtomicBool::new(false),
        }
    }

    /// The value currently stored in the cell.
    #[must_use]
    pub fn old_value(&self) -> &T {
        &self.old
    }

    /// The candidate value.
    #[must_use]
    pub fn new_value(&self) -> &T {
        &self.new
    }

    /// Veto the change. Once any subscriber cancels, the mutation aborts.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Whether some subscriber has vetoed the change.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Payload of the post-commit notification.
pub struct ValueChangedArgs<T> {
    old: T,
    new: T,
}

impl<T> ValueChangedArgs<T> {
    pub(crate) fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// The value the cell held before the commit.
    #[must_use]
    pub fn old_value(&self) -> &T {
        &self.old
    }

    /// The value the cell holds now.
    #[must_use]
    pub fn new_value(&self) -> &T {
        &self.new
    }
}

/// Payload handed to ad-hoc validate subscribers.
///
/// Subscribers inspect the candidate value and push failures into the args;
/// rule-set failures are already present when subscribers run.
pub struct ValidateArgs<T> {
    value: T,
    failures: Mutex<Vec<ValidationFailure>>,
}

impl<T> ValidateArgs<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// The candidate value being validated.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Record a failure with just a message.
    pub fn add(&self, message: impl Into<String>) {
        self.add_failure(ValidationFailure::new(message));
    }

    /// Record a structured failure.
    pub fn add_failure(&self, failure: ValidationFailure) {
        self.lock().push(failure);
    }

    /// Whether any failure has been recorded so far.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.lock().is_empty()
    }

    pub(crate) fn take_failures(&self) -> Vec<ValidationFailure> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ValidationFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Payload of the errors-changed notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorsChangedArgs {
    errors: Vec<String>,
}

impl ErrorsChangedArgs {
    pub(crate) fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    /// The full error set after the change (empty means valid).
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

// ---------------------------------------------------------------------------
// Cell internals
// ---------------------------------------------------------------------------

/// Where a mutation request came from. Binding-originated sets are dropped
/// when they re-enter a cell that is mid-notification, which turns a binding
/// cycle into a logged no-op instead of unbounded recursion.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Direct,
    Binding,
}

#[derive(Clone, Copy, Default)]
struct ValidationState {
    enabled: bool,
    validated: bool,
}

pub(crate) struct ActiveValidation<T: 'static> {
    pub(crate) field: FieldIdentity,
    pub(crate) rules: RuleSet<T>,
}

pub(crate) struct State<T: 'static> {
    pub(crate) value: T,
    pub(crate) errors: Vec<String>,
    validation: ValidationState,
    active: Option<Arc<ActiveValidation<T>>>,
    cancel_commit_if_invalid: bool,
    pub(crate) bindings: Vec<Subscription>,
    timer: Option<ChangeTimer<T>>,
}

pub(crate) struct CellEvents<T: 'static> {
    pub(crate) changing: EventSource<ValueChangingArgs<T>>,
    pub(crate) changed: EventSource<ValueChangedArgs<T>>,
    pub(crate) validate: EventSource<ValidateArgs<T>>,
    pub(crate) errors_changed: EventSource<ErrorsChangedArgs>,
    pub(crate) has_errors_changed: EventSource<bool>,
    pub(crate) error_text_changed: EventSource<String>,
    pub(crate) errors_collection_changed: EventSource<Vec<String>>,
}

pub(crate) struct Inner<T: 'static> {
    state: Mutex<State<T>>,
    pub(crate) events: CellEvents<T>,
    notify_depth: AtomicUsize,
}

impl<T: Clone + PartialEq + Send + 'static> Inner<T> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_notifying(&self) -> bool {
        self.notify_depth.load(Ordering::Acquire) > 0
    }

    pub(crate) fn set_value(&self, value: T, origin: Origin) {
        let old = {
            let state = self.lock();
            if state.value == value {
                return;
            }
            state.value.clone()
        };

        if origin == Origin::Binding && self.is_notifying() {
            warn!(
                "dropped a binding propagation that re-entered a cell mid-notification; \
                 the binding graph contains a cycle"
            );
            return;
        }

        let changing = ValueChangingArgs::new(old.clone(), value.clone());
        self.events.changing.emit(&changing);

        // Validation runs on the candidate even when the commit is about to
        // be blocked by a veto or by invalidity, so error observers see
        // attempted-but-rejected edits.
        self.run_validation(&value);
        if changing.is_canceled() {
            trace!("value change vetoed by a changing subscriber");
            return;
        }
        {
            let state = self.lock();
            if state.cancel_commit_if_invalid && !state.errors.is_empty() {
                trace!("value change canceled: candidate failed validation");
                return;
            }
        }

        let timer = { self.lock().timer.clone() };
        match timer {
            Some(timer) => timer.restart(old, value),
            None => self.commit(old, value),
        }
    }

    pub(crate) fn commit(&self, old: T, new: T) {
        {
            let mut state = self.lock();
            state.value = new.clone();
        }
        self.notify_depth.fetch_add(1, Ordering::AcqRel);
        self.events.changed.emit(&ValueChangedArgs::new(old, new));
        self.notify_depth.fetch_sub(1, Ordering::AcqRel);
    }

    fn run_validation(&self, candidate: &T) {
        let active = {
            let mut state = self.lock();
            state.validation.validated = true;
            state.active.clone()
        };
        let args = ValidateArgs::new(candidate.clone());
        if let Some(active) = &active {
            for failure in active.rules.evaluate(candidate, &active.field) {
                args.add_failure(failure);
            }
        }
        self.events.validate.emit(&args);
        let errors: Vec<String> = args
            .take_failures()
            .into_iter()
            .map(|failure| failure.message)
            .collect();
        self.apply_errors(errors);
    }

    fn apply_errors(&self, errors: Vec<String>) {
        let changed = {
            let mut state = self.lock();
            if state.errors == errors {
                false
            } else {
                state.errors = errors.clone();
                true
            }
        };
        if !changed {
            return;
        }
        let has_errors = !errors.is_empty();
        self.events
            .errors_changed
            .emit(&ErrorsChangedArgs::new(errors.clone()));
        self.events.has_errors_changed.emit(&has_errors);
        self.events.error_text_changed.emit(&errors.join("\n"));
        self.events.errors_collection_changed.emit(&errors);
    }
}

// ---------------------------------------------------------------------------
// ObservableValue<T>
// ---------------------------------------------------------------------------

/// A value container that notifies subscribers of changes, validates
/// candidates, and can track one or more source cells through a binding.
///
/// Cloning yields a handle to the same cell.
pub struct ObservableValue<T: 'static> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T: 'static> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> ObservableValue<T> {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    value: initial,
                    errors: Vec::new(),
                    validation: ValidationState::default(),
                    active: None,
                    cancel_commit_if_invalid: false,
                    bindings: Vec::new(),
                    timer: None,
                }),
                events: CellEvents {
                    changing: EventSource::new(),
                    changed: EventSource::new(),
                    validate: EventSource::new(),
                    errors_changed: EventSource::new(),
                    has_errors_changed: EventSource::new(),
                    error_text_changed: EventSource::new(),
                    errors_collection_changed: EventSource::new(),
                },
                notify_depth: AtomicUsize::new(0),
            }),
        }
    }

    /// Alias of [`ObservableValue::new`], reading well in expression position:
    /// `ObservableValue::of(42)`.
    #[must_use]
    pub fn of(initial: T) -> Self {
        Self::new(initial)
    }

    /// Clone of the current value. No side effects.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// The cell's lock is held while `f` runs: do not call back into this
    /// cell from inside the closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().value)
    }

    /// Set the value through the full change protocol. Equal values are a
    /// complete no-op.
    pub fn set(&self, value: T) {
        self.inner.set_value(value, Origin::Direct);
    }

    // -- change events ------------------------------------------------------

    /// Subscribe to the cancelable pre-change notification.
    pub fn on_value_changing(
        &self,
        handler: impl Fn(&ValueChangingArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.changing.subscribe(handler)
    }

    /// Subscribe to the post-commit notification. This is also the
    /// notification bindings listen to: error-state churn never fires it.
    pub fn on_value_changed(
        &self,
        handler: impl Fn(&ValueChangedArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.changed.subscribe(handler)
    }

    /// Subscribe an ad-hoc validator, run after the registered rule set on
    /// every validation pass.
    pub fn on_validate(
        &self,
        handler: impl Fn(&ValidateArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.validate.subscribe(handler)
    }

    /// Subscribe to error-set changes.
    pub fn on_errors_changed(
        &self,
        handler: impl Fn(&ErrorsChangedArgs) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.errors_changed.subscribe(handler)
    }

    /// Subscribe to changes of the has-errors flag attribute.
    pub fn on_has_errors_changed(
        &self,
        handler: impl Fn(&bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.has_errors_changed.subscribe(handler)
    }

    /// Subscribe to changes of the joined error text attribute.
    pub fn on_error_text_changed(
        &self,
        handler: impl Fn(&String) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.error_text_changed.subscribe(handler)
    }

    /// Subscribe to changes of the error collection attribute.
    pub fn on_errors_collection_changed(
        &self,
        handler: impl Fn(&Vec<String>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.errors_collection_changed.subscribe(handler)
    }

    // -- validation ---------------------------------------------------------

    /// Enable validation with the given field identity and rule set.
    pub fn enable_validation(&self, field: FieldIdentity, rules: RuleSet<T>) -> &Self {
        self.enable_validation_with(field, rules, false)
    }

    /// Enable validation; when `cancel_commit_if_invalid` is set, a candidate
    /// that fails validation never becomes the stored value (its failures are
    /// still published to error observers).
    pub fn enable_validation_with(
        &self,
        field: FieldIdentity,
        rules: RuleSet<T>,
        cancel_commit_if_invalid: bool,
    ) -> &Self {
        self.disable_validation();
        let mut state = self.inner.lock();
        state.validation.enabled = true;
        state.validation.validated = false;
        state.active = Some(Arc::new(ActiveValidation { field, rules }));
        state.cancel_commit_if_invalid = cancel_commit_if_invalid;
        self
    }

    /// Remove the active rule set and clear any current errors (firing the
    /// error notifications if the set was non-empty).
    pub fn disable_validation(&self) -> &Self {
        {
            let mut state = self.inner.lock();
            state.active = None;
            state.cancel_commit_if_invalid = false;
            state.validation.enabled = false;
            state.validation.validated = false;
        }
        self.inner.apply_errors(Vec::new());
        self
    }

    /// Validate the current value now if no validation pass has run yet.
    /// Lets freshly constructed required fields surface their errors on
    /// demand, without a mutation.
    pub fn ensure_validation(&self) -> &Self {
        let (validated, value) = {
            let state = self.inner.lock();
            (state.validation.validated, state.value.clone())
        };
        if !validated {
            self.inner.run_validation(&value);
        }
        self
    }

    /// Whether the current error set is non-empty.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.inner.lock().errors.is_empty()
    }

    /// The current error messages, in rule-evaluation order.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.inner.lock().errors.clone()
    }

    /// All current error messages joined with newlines.
    #[must_use]
    pub fn error_text(&self) -> String {
        self.inner.lock().errors.join("\n")
    }

    /// Whether validation is currently enabled.
    #[must_use]
    pub fn is_validation_enabled(&self) -> bool {
        self.inner.lock().validation.enabled
    }

    /// Whether a validation pass has run since validation state last changed.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.inner.lock().validation.validated
    }

    // -- delayed commit -----------------------------------------------------

    /// Defer commits through a debounce timer: rapid successive changes
    /// coalesce and only the latest value is stored after `delay`.
    ///
    /// Without an execution context the deferred commit (and its
    /// notifications) runs on the timer's worker thread; supply one via
    /// [`ObservableValue::enable_delay_value_change_on`] when subscribers
    /// must stay on a UI thread.
    pub fn enable_delay_value_change(&self, delay: Duration) -> &Self {
        self.enable_delay(delay, None)
    }

    /// Like [`ObservableValue::enable_delay_value_change`], with deferred
    /// commits marshaled through `context`.
    pub fn enable_delay_value_change_on(
        &self,
        delay: Duration,
        context: Arc<dyn ExecutionContext>,
    ) -> &Self {
        self.enable_delay(delay, Some(context))
    }

    fn enable_delay(&self, delay: Duration, context: Option<Arc<dyn ExecutionContext>>) -> &Self {
        let timer = {
            let mut state = self.inner.lock();
            if state.timer.is_none() {
                let weak = Arc::downgrade(&self.inner);
                state.timer = Some(ChangeTimer::new(move |old, new| {
                    if let Some(inner) = weak.upgrade() {
                        inner.commit(old, new);
                    }
                }));
            }
            state
                .timer
                .clone()
                .expect("delay timer was just installed")
        };
        timer.enable(delay, context);
        self
    }

    /// Drop the debounce timer; any pending deferred commit is discarded and
    /// subsequent commits are synchronous again.
    pub fn disable_delay_value_change(&self) -> &Self {
        let timer = { self.inner.lock().timer.take() };
        if let Some(timer) = timer {
            timer.disable();
        }
        self
    }
}

impl<T: Clone + PartialEq + Send + Default + 'static> Default for ObservableValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + 'static> PartialEq for ObservableValue<T> {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let mine = self.value();
        let theirs = other.value();
        mine == theirs
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Display + 'static> std::fmt::Display
    for ObservableValue<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with(|value| write!(f, "{value}"))
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug
    for ObservableValue<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ObservableValue")
            .field("value", &state.value)
            .field("errors", &state.errors)
            .finish()
    }
}

/// Converts a plain value into an [`ObservableValue`]:
/// `42.into_observable()`.
pub trait IntoObservable: Clone + PartialEq + Send + Sized + 'static {
    /// Wrap `self` in a new cell.
    fn into_observable(self) -> ObservableValue<Self>;
}

impl<T: Clone + PartialEq + Send + 'static> IntoObservable for T {
    fn into_observable(self) -> ObservableValue<Self> {
        ObservableValue::new(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
