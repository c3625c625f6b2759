#![forbid(unsafe_code)]

//! Reactive value cells for view-model state.
//!
//! This crate provides the core reactive-property engine:
//!
//! - [`ObservableValue`]: a shared value cell running every mutation through
//!   a cancelable-changing / validate / commit protocol, with independent
//!   notification streams per observable attribute.
//! - [`BoundValue`]: the same cell, read-only from outside; mutation only
//!   through its binding.
//! - Binding: one-way ([`ObservableValue::bind`]), two-way
//!   ([`ObservableValue::bind_two_way`]), and multi-source
//!   ([`ObservableValue::bind_multi`]) with a strict [`MultiSourceContext`]
//!   accessor for converters.
//! - Validation: [`RuleSet`]s of [`ValidationRule`]s resolved against a
//!   [`FieldIdentity`], plus ad-hoc validate subscribers. Failures are
//!   observable state, never errors.
//! - [`ChangeTimer`]: debounced commit delivery, optionally marshaled
//!   through an [`ExecutionContext`].
//! - [`ProgressScope`]: RAII boolean indicator toggle.
//!
//! # Architecture
//!
//! Cells are cheap-clone handles over shared state. Subscriber lists are
//! immutable snapshots swapped on change (`arc-swap`), so notification never
//! holds a lock and handlers may re-enter the cell freely. The only
//! background concurrency is the [`ChangeTimer`] worker; everything else is
//! synchronous on the caller's thread.
//!
//! # Invariants
//!
//! 1. Setting an equal value is a complete no-op: no events, no validation.
//! 2. Validation always runs on a candidate value, even when the commit is
//!    blocked by a veto or by `cancel_commit_if_invalid`.
//! 3. A target cell holds at most one binding attachment at a time.
//! 4. Error notifications fire only when the error set actually changes.
//! 5. With a debounce delay enabled, only the most recent pending value
//!    survives coalescing; exactly one delivery happens per expiry.

mod binding;
mod bound;
mod event;
mod observable;
mod progress;
mod timer;
mod validation;

pub use binding::{BindingError, BindingSource, MultiSourceContext, MultiSourceError};
pub use bound::BoundValue;
pub use event::{EventSource, Subscription};
pub use observable::{
    ErrorsChangedArgs, IntoObservable, ObservableValue, ValidateArgs, ValueChangedArgs,
    ValueChangingArgs,
};
pub use progress::ProgressScope;
pub use timer::{ChangeTimer, ExecutionContext};
pub use validation::{FieldIdentity, RuleSet, ValidationFailure, ValidationRule, rules};
