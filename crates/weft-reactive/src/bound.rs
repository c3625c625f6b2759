#![forbid(unsafe_code)]

//! [`BoundValue<T>`]: a cell whose value can only change through a binding.
//!
//! This is a thin wrapper restricting the mutation entry point of
//! [`ObservableValue`], not a separate implementation: everything except
//! `set` is delegated. Use it for derived view-model state that outside code
//! must be able to observe and validate but never assign.
//!
//! ```
//! use weft_reactive::{BoundValue, ObservableValue};
//!
//! let source = ObservableValue::new(2);
//! let doubled = BoundValue::new(0);
//! doubled.bind(&source, |v| v * 2).unwrap();
//!
//! source.set(21);
//! assert_eq!(doubled.value(), 42);
//! // doubled.set(...) does not exist.
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::binding::{BindingError, BindingSource, MultiSourceContext};
use crate::event::Subscription;
use crate::observable::{
    ErrorsChangedArgs, ObservableValue, ValidateArgs, ValueChangedArgs, ValueChangingArgs,
};
use crate::timer::ExecutionContext;
use crate::validation::{FieldIdentity, RuleSet};

/// A read-only-from-outside observable cell. Mutation happens exclusively
/// through its binding attachment.
pub struct BoundValue<T: 'static> {
    cell: ObservableValue<T>,
}

impl<T: 'static> Clone for BoundValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> BoundValue<T> {
    /// Create a bound cell holding `initial` until a binding replaces it.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            cell: ObservableValue::new(initial),
        }
    }

    /// Alias of [`BoundValue::new`].
    #[must_use]
    pub fn of(initial: T) -> Self {
        Self::new(initial)
    }

    /// Clone of the current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.cell.value()
    }

    /// Borrow the current value without cloning. The cell's lock is held
    /// while `f` runs.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Erase into a [`BindingSource`] handle for multi-source binding.
    #[must_use]
    pub fn as_source(&self) -> Arc<dyn BindingSource> {
        self.cell.as_source()
    }

    /// Whether a binding attachment is currently active.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.cell.is_bound()
    }

    /// See [`ObservableValue::bind`].
    pub fn bind<S>(
        &self,
        source: &ObservableValue<S>,
        converter: impl Fn(&S) -> T + Send + Sync + 'static,
    ) -> Result<(), BindingError>
    where
        S: Clone + PartialEq + Send + 'static,
    {
        self.cell.bind(source, converter)
    }

    /// See [`ObservableValue::bind_identity`].
    pub fn bind_identity(&self, source: &ObservableValue<T>) -> Result<(), BindingError> {
        self.cell.bind_identity(source)
    }

    /// See [`ObservableValue::bind_multi`].
    pub fn bind_multi(
        &self,
        sources: &[Arc<dyn BindingSource>],
        converter: impl Fn(&MultiSourceContext) -> T + Send + Sync + 'static,
    ) -> Result<(), BindingError> {
        self.cell.bind_multi(sources, converter)
    }

    /// See [`ObservableValue::unbind`].
    pub fn unbind(&self) -> Result<(), BindingError> {
        self.cell.unbind()
    }

    /// See [`ObservableValue::enable_validation`].
    pub fn enable_validation(&self, field: FieldIdentity, rules: RuleSet<T>) -> &Self {
        self.cell.enable_validation(field, rules);
        self
    }

    /// See [`ObservableValue::enable_validation_with`].
    pub fn enable_validation_with(
        &self,
        field: FieldIdentity,
        rules: RuleSet<T>,
        cancel_commit_if_invalid: bool,
    ) -> &Self {
        self.cell
            .enable_validation_with(field, rules, cancel_commit_if_invalid);
        self
    }

    /// See [`ObservableValue::disable_validation`].
    pub fn disable_validation(&self) -> &Self {
        self.cell.disable_validation();
        self
    }

    /// See [`ObservableValue::ensure_validation`].
    pub fn ensure_validation(&self) -> &Self {
        self.cell.ensure_validation();
        self
    }

    /// Whether the current error set is non-empty.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.cell.has_errors()
    }

    /// The current error messages.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.cell.errors()
    }

    /// All current error messages joined with newlines.
    #[must_use]
    pub fn error_text(&self) -> String {
        self.cell.error_text()
    }

    /// See [`ObservableValue::enable_delay_value_change`].
    pub fn enable_delay_value_change(&self, delay: Duration) -> &Self {
        self.cell.enable_delay_value_change(delay);
        self
    }

    /// See [`ObservableValue::enable_delay_value_change_on`].
    pub fn enable_delay_value_change_on(
        &self,
        delay: Duration,
        context: Arc<dyn ExecutionContext>,
    ) -> &Self {
        self.cell.enable_delay_value_change_on(delay, context);
        self
    }

    /// See [`ObservableValue::disable_delay_value_change`].
    pub fn disable_delay_value_change(&self) -> &Self {
        self.cell.disable_delay_value_change();
        self
    }

    /// Subscribe to the cancelable pre-change notification.
    pub fn on_value_changing(
        &self,
        handler: impl Fn(&ValueChangingArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.cell.on_value_changing(handler)
    }

    /// Subscribe to the post-commit notification.
    pub fn on_value_changed(
        &self,
        handler: impl Fn(&ValueChangedArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.cell.on_value_changed(handler)
    }

    /// Subscribe an ad-hoc validator.
    pub fn on_validate(
        &self,
        handler: impl Fn(&ValidateArgs<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.cell.on_validate(handler)
    }

    /// Subscribe to error-set changes.
    pub fn on_errors_changed(
        &self,
        handler: impl Fn(&ErrorsChangedArgs) + Send + Sync + 'static,
    ) -> Subscription {
        self.cell.on_errors_changed(handler)
    }

    /// Subscribe to changes of the has-errors flag attribute.
    pub fn on_has_errors_changed(
        &self,
        handler: impl Fn(&bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.cell.on_has_errors_changed(handler)
    }
}

impl<T: Clone + PartialEq + Send + Default + 'static> Default for BoundValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug for BoundValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoundValue").field(&self.cell).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_its_source() {
        let source = ObservableValue::new(1);
        let bound = BoundValue::new(0);
        bound.bind(&source, |v| v + 100).unwrap();
        assert_eq!(bound.value(), 101);

        source.set(2);
        assert_eq!(bound.value(), 102);
    }

    #[test]
    fn rejects_a_second_binding() {
        let a = ObservableValue::new(1);
        let b = ObservableValue::new(2);
        let bound = BoundValue::of(0);
        bound.bind_identity(&a).unwrap();
        assert_eq!(bound.bind_identity(&b), Err(BindingError::AlreadyBound));
        assert!(bound.is_bound());
    }

    #[test]
    fn validates_bound_values() {
        use crate::validation::{FieldIdentity, RuleSet, rules};

        let source = ObservableValue::new(String::from("fine"));
        let bound = BoundValue::new(String::new());
        bound.enable_validation(
            FieldIdentity::new("derived"),
            RuleSet::new().rule(rules::max_length(5)),
        );
        bound.bind_identity(&source).unwrap();
        assert!(!bound.has_errors());

        source.set(String::from("far too long"));
        assert!(bound.has_errors());
        assert_eq!(bound.value(), "far too long");
    }

    #[test]
    fn usable_as_multi_binding_source() {
        let source = ObservableValue::new(2);
        let bound = BoundValue::new(0);
        bound.bind(&source, |v| v * 3).unwrap();

        let total = ObservableValue::new(0);
        total
            .bind_multi(&[bound.as_source(), source.as_source()], |ctx| {
                ctx.values::<i32>().iter().sum()
            })
            .unwrap();
        assert_eq!(total.value(), 8);

        source.set(5);
        assert_eq!(total.value(), 20);
    }
}
