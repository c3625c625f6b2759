#![forbid(unsafe_code)]

//! Value binding: one-way, two-way, and multi-source composition.
//!
//! A binding makes a target cell track a converter function of one or more
//! source cells. The target re-runs the converter on every **value commit**
//! of a source; error-state notifications on a source never re-trigger
//! conversion. Converted values flow through the target's normal change
//! protocol, so validation applies to bound values exactly as to direct
//! sets, including the initial synchronization at bind time.
//!
//! A target holds at most one binding attachment: a second `bind` while one
//! is active fails with [`BindingError::AlreadyBound`] and leaves the
//! original binding intact. Two-way binding is two independent one-way
//! attachments, one per direction, established all-or-nothing.
//!
//! # Usage
//!
//! ```
//! use weft_reactive::ObservableValue;
//!
//! let count = ObservableValue::new(3);
//! let label = ObservableValue::new(String::new());
//! label.bind(&count, |n| format!("items: {n}")).unwrap();
//! assert_eq!(label.value(), "items: 3");
//!
//! count.set(7);
//! assert_eq!(label.value(), "items: 7");
//!
//! label.unbind().unwrap();
//! count.set(9);
//! assert_eq!(label.value(), "items: 7");
//! ```
//!
//! # Failure Modes
//!
//! - Binding when already bound / unbinding when not bound: immediate
//!   [`BindingError`], no state touched.
//! - Cycles in the binding graph are not detected at bind time. A
//!   propagation that would recurse forever is dropped by the cell's
//!   re-entrancy guard and logged.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::event::Subscription;
use crate::observable::{ObservableValue, Origin};

/// Protocol-misuse errors for binding operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The target already holds a binding attachment.
    #[error("the value is already bound to another source")]
    AlreadyBound,
    /// The target holds no binding attachment.
    #[error("the value is not bound to any source")]
    NotBound,
}

/// Strict accessor errors of [`MultiSourceContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MultiSourceError {
    /// The requested index lies outside the captured source list.
    #[error("binding source index {index} is out of range (sources: {len})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of captured sources.
        len: usize,
    },
    /// The source at the index is not an observable of the requested type.
    #[error("binding source at index {index} is not an observable holding {expected}")]
    TypeMismatch {
        /// The requested index.
        index: usize,
        /// Name of the requested element type.
        expected: &'static str,
    },
}

/// A type-erased binding source: anything that notifies on value commits and
/// can be downcast back to a concrete `ObservableValue<T>`.
pub trait BindingSource: Send + Sync {
    /// Subscribe to value commits, ignoring the payload.
    fn subscribe_value_changed(&self, handler: Box<dyn Fn() + Send + Sync>) -> Subscription;

    /// Downcast support for [`MultiSourceContext`] accessors.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Clone + PartialEq + Send + 'static> BindingSource for ObservableValue<T> {
    fn subscribe_value_changed(&self, handler: Box<dyn Fn() + Send + Sync>) -> Subscription {
        self.on_value_changed(move |_| handler())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed snapshot accessor over the fixed, ordered source list captured at
/// bind time. Handed to multi-source converters.
///
/// Accessors are strict: a bad index or a type mismatch is an error, never a
/// silently substituted default.
pub struct MultiSourceContext {
    sources: Arc<Vec<Arc<dyn BindingSource>>>,
}

impl Clone for MultiSourceContext {
    fn clone(&self) -> Self {
        Self {
            sources: Arc::clone(&self.sources),
        }
    }
}

impl MultiSourceContext {
    pub(crate) fn new(sources: Vec<Arc<dyn BindingSource>>) -> Self {
        Self {
            sources: Arc::new(sources),
        }
    }

    /// The value of the source at `index`, which must be an
    /// `ObservableValue<T>`.
    pub fn value_at<T: Clone + PartialEq + Send + 'static>(
        &self,
        index: usize,
    ) -> Result<T, MultiSourceError> {
        let source = self
            .sources
            .get(index)
            .ok_or(MultiSourceError::IndexOutOfRange {
                index,
                len: self.sources.len(),
            })?;
        source
            .as_any()
            .downcast_ref::<ObservableValue<T>>()
            .map(ObservableValue::value)
            .ok_or(MultiSourceError::TypeMismatch {
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// The values of every source holding element type `T`, preserving the
    /// original source order. May be empty.
    #[must_use]
    pub fn values<T: Clone + PartialEq + Send + 'static>(&self) -> Vec<T> {
        self.sources
            .iter()
            .filter_map(|source| source.as_any().downcast_ref::<ObservableValue<T>>())
            .map(ObservableValue::value)
            .collect()
    }

    /// Number of captured sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no sources were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for MultiSourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceContext")
            .field("sources", &self.sources.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Binding operations
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + Send + 'static> ObservableValue<T> {
    /// Erase this cell into a shareable [`BindingSource`] handle for
    /// multi-source binding.
    #[must_use]
    pub fn as_source(&self) -> Arc<dyn BindingSource> {
        Arc::new(self.clone())
    }

    /// Whether a binding attachment is currently active.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.inner.lock().bindings.is_empty()
    }

    /// Bind this cell to `source`: immediately takes `converter(source)` and
    /// tracks every subsequent source commit.
    pub fn bind<S>(
        &self,
        source: &ObservableValue<S>,
        converter: impl Fn(&S) -> T + Send + Sync + 'static,
    ) -> Result<(), BindingError>
    where
        S: Clone + PartialEq + Send + 'static,
    {
        let converter = Arc::new(converter);
        {
            let mut state = self.inner.lock();
            if !state.bindings.is_empty() {
                debug!("rejected bind: the target already holds a binding");
                return Err(BindingError::AlreadyBound);
            }
            let target = Arc::downgrade(&self.inner);
            let convert = Arc::clone(&converter);
            let subscription = source.on_value_changed(move |args| {
                if let Some(target) = target.upgrade() {
                    target.set_value((convert.as_ref())(args.new_value()), Origin::Binding);
                }
            });
            state.bindings.push(subscription);
        }
        self.inner
            .set_value((converter.as_ref())(&source.value()), Origin::Binding);
        Ok(())
    }

    /// Bind without conversion: the target mirrors the source value.
    pub fn bind_identity(&self, source: &ObservableValue<T>) -> Result<(), BindingError> {
        self.bind(source, T::clone)
    }

    /// Bind this cell to several sources at once through a converter over a
    /// [`MultiSourceContext`] snapshot of them.
    pub fn bind_multi(
        &self,
        sources: &[Arc<dyn BindingSource>],
        converter: impl Fn(&MultiSourceContext) -> T + Send + Sync + 'static,
    ) -> Result<(), BindingError> {
        let converter = Arc::new(converter);
        let context = MultiSourceContext::new(sources.to_vec());
        {
            let mut state = self.inner.lock();
            if !state.bindings.is_empty() {
                debug!("rejected bind_multi: the target already holds a binding");
                return Err(BindingError::AlreadyBound);
            }
            for source in sources {
                let target = Arc::downgrade(&self.inner);
                let convert = Arc::clone(&converter);
                let ctx = context.clone();
                let subscription = source.subscribe_value_changed(Box::new(move || {
                    if let Some(target) = target.upgrade() {
                        target.set_value((convert.as_ref())(&ctx), Origin::Binding);
                    }
                }));
                state.bindings.push(subscription);
            }
        }
        self.inner
            .set_value((converter.as_ref())(&context), Origin::Binding);
        Ok(())
    }

    /// Remove the active binding attachment, releasing every handler
    /// registered on the sources.
    pub fn unbind(&self) -> Result<(), BindingError> {
        let subscriptions = {
            let mut state = self.inner.lock();
            if state.bindings.is_empty() {
                debug!("rejected unbind: the target holds no binding");
                return Err(BindingError::NotBound);
            }
            std::mem::take(&mut state.bindings)
        };
        drop(subscriptions);
        Ok(())
    }

    /// Bind this cell and `source` to each other so a change to either
    /// propagates to the other. Fails if either side already holds a
    /// binding; the check happens before any mutation, so failure leaves
    /// both sides untouched.
    pub fn bind_two_way(&self, source: &ObservableValue<T>) -> Result<(), BindingError> {
        self.bind_two_way_with(source, T::clone, T::clone)
    }

    /// Two-way binding with a converter per direction: `converter` maps the
    /// source value into this cell, `back_converter` maps this cell's value
    /// back into the source.
    pub fn bind_two_way_with<S>(
        &self,
        source: &ObservableValue<S>,
        converter: impl Fn(&S) -> T + Send + Sync + 'static,
        back_converter: impl Fn(&T) -> S + Send + Sync + 'static,
    ) -> Result<(), BindingError>
    where
        S: Clone + PartialEq + Send + 'static,
    {
        if self.is_bound() || source.is_bound() {
            debug!("rejected bind_two_way: one side already holds a binding");
            return Err(BindingError::AlreadyBound);
        }
        self.bind(source, converter)?;
        source.bind(self, back_converter)?;
        Ok(())
    }

    /// Unwind a two-way binding on both sides. Fails if either side holds no
    /// binding; the check happens before any mutation.
    pub fn unbind_two_way<S>(&self, source: &ObservableValue<S>) -> Result<(), BindingError>
    where
        S: Clone + PartialEq + Send + 'static,
    {
        if !self.is_bound() || !source.is_bound() {
            debug!("rejected unbind_two_way: one side holds no binding");
            return Err(BindingError::NotBound);
        }
        source.unbind()?;
        self.unbind()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
