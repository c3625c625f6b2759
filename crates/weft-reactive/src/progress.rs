#![forbid(unsafe_code)]

//! [`ProgressScope`]: RAII toggle for a boolean indicator cell.
//!
//! The indicator is set to `true` when the scope is entered and back to
//! `false` when the scope is dropped, however the scope exits.

use crate::observable::ObservableValue;

/// Keeps a boolean indicator `true` for the lifetime of the scope.
///
/// ```
/// use weft_reactive::{ObservableValue, ProgressScope};
///
/// let busy = ObservableValue::new(false);
/// {
///     let _scope = ProgressScope::enter(&busy);
///     assert!(busy.value());
/// }
/// assert!(!busy.value());
/// ```
#[must_use = "dropping a ProgressScope immediately clears the indicator"]
pub struct ProgressScope {
    indicator: ObservableValue<bool>,
}

impl ProgressScope {
    /// Set `indicator` to `true` until the returned scope is dropped.
    pub fn enter(indicator: &ObservableValue<bool>) -> Self {
        indicator.set(true);
        Self {
            indicator: indicator.clone(),
        }
    }
}

impl Drop for ProgressScope {
    fn drop(&mut self) {
        self.indicator.set(false);
    }
}

impl std::fmt::Debug for ProgressScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressScope").finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_for_the_scope_lifetime() {
        let busy = ObservableValue::new(false);
        {
            let _scope = ProgressScope::enter(&busy);
            assert!(busy.value());
        }
        assert!(!busy.value());
    }

    #[test]
    fn nested_scopes_clear_on_the_last_drop_only_if_not_reentered() {
        let busy = ObservableValue::new(false);
        let outer = ProgressScope::enter(&busy);
        {
            let _inner = ProgressScope::enter(&busy);
            assert!(busy.value());
        }
        // The inner drop already cleared the shared indicator.
        assert!(!busy.value());
        drop(outer);
        assert!(!busy.value());
    }

    #[test]
    fn observers_see_both_transitions() {
        use std::sync::{Arc, Mutex};

        let busy = ObservableValue::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = busy.on_value_changed(move |args| s.lock().unwrap().push(*args.new_value()));

        {
            let _scope = ProgressScope::enter(&busy);
        }
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }
}
