#![forbid(unsafe_code)]

//! Concrete editable kinds: plain value, text, and single-selection.
//!
//! Each kind is an [`EditSession`] with the [`ValueTransfer::Copy`] policy:
//! starting an edit seeds the edit content with the display value, and
//! completing promotes the edited value back, so canceling always leaves
//! the display value untouched. The kinds deref to their session, which
//! carries the whole lifecycle API.

use std::ops::Deref;
use std::sync::Arc;

use weft_reactive::ObservableValue;

use crate::session::{EditSession, ValueTransfer};

/// A plain editable value.
pub struct EditableValue<T: 'static> {
    session: EditSession<T>,
}

impl<T: Clone + PartialEq + Send + 'static> EditableValue<T> {
    /// Create an editable value; the edit content is seeded with a copy of
    /// the initial value.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            session: EditSession::with_transfer(initial.clone(), initial, ValueTransfer::Copy),
        }
    }
}

impl<T: 'static> Deref for EditableValue<T> {
    type Target = EditSession<T>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug
    for EditableValue<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EditableValue").field(&self.session).finish()
    }
}

type TextValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// An editable text with an optional text validator and a multi-line flag.
pub struct EditableText {
    session: EditSession<String>,
    is_multi_line: ObservableValue<bool>,
    validator: Option<TextValidator>,
}

impl EditableText {
    /// Create a single-line editable text.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            session: EditSession::with_transfer(
                initial.into(),
                String::new(),
                ValueTransfer::Copy,
            ),
            is_multi_line: ObservableValue::new(false),
            validator: None,
        }
    }

    /// Attach a validator consulted by [`EditableText::validate`].
    #[must_use]
    pub fn with_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Mark the text as multi-line.
    #[must_use]
    pub fn multi_line(self, multi_line: bool) -> Self {
        self.is_multi_line.set(multi_line);
        self
    }

    /// Whether the text spans multiple lines.
    #[must_use]
    pub fn is_multi_line(&self) -> &ObservableValue<bool> {
        &self.is_multi_line
    }

    /// Run the attached validator against the current edit value. Texts
    /// without a validator are always valid.
    #[must_use]
    pub fn validate(&self) -> bool {
        match &self.validator {
            Some(validator) => self
                .session
                .edit_content()
                .value()
                .with(|text| (validator.as_ref())(text)),
            None => true,
        }
    }
}

impl Deref for EditableText {
    type Target = EditSession<String>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl std::fmt::Debug for EditableText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableText")
            .field("session", &self.session)
            .field("is_multi_line", &self.is_multi_line.value())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// An editable value chosen from a fixed list of selection items.
pub struct EditableSelection<T: 'static> {
    session: EditSession<T>,
    items: Vec<T>,
    is_selecting: ObservableValue<bool>,
}

impl<T: Clone + PartialEq + Send + 'static> EditableSelection<T> {
    /// Create an editable selection with the given initial value and the
    /// items it may be chosen from.
    #[must_use]
    pub fn new(initial: T, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            session: EditSession::with_transfer(initial.clone(), initial, ValueTransfer::Copy),
            items: items.into_iter().collect(),
            is_selecting: ObservableValue::new(false),
        }
    }

    /// The items the value may be selected from, in their original order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Whether a selection control is currently open.
    #[must_use]
    pub fn is_selecting(&self) -> &ObservableValue<bool> {
        &self.is_selecting
    }
}

impl<T: 'static> Deref for EditableSelection<T> {
    type Target = EditSession<T>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<T: Clone + PartialEq + Send + std::fmt::Debug + 'static> std::fmt::Debug
    for EditableSelection<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableSelection")
            .field("session", &self.session)
            .field("items", &self.items.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
