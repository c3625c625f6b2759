#![forbid(unsafe_code)]

//! Edit/commit/cancel lifecycle on top of `weft-reactive` cells.
//!
//! An [`EditSession`] exposes two content objects ([`DisplayContent`] while
//! nothing is being edited, [`EditContent`] during an edit) and drives the
//! transitions between them:
//!
//! ```text
//! Displaying --start_edit--> Editing --complete_edit--> Displaying (commit)
//!                                    --cancel_edit----> Displaying (cancel)
//! ```
//!
//! The session fires edit-started / edit-completed / edit-canceled
//! notifications carrying a snapshot of both values, and guards the start
//! transition on its `is_editable` cell. Value transfer between the
//! contents is a policy ([`ValueTransfer`]): the base session copies
//! nothing, while the concrete kinds ([`EditableValue`], [`EditableText`],
//! [`EditableSelection`]) copy display to edit on start and edit to display
//! on completion, so canceling never disturbs the displayed value.
//!
//! # Example
//!
//! ```
//! use weft_edit::EditableText;
//!
//! let name = EditableText::new("Initial");
//! name.start_edit();
//! name.edit_content().value().set("Edited".to_string());
//! name.complete_edit();
//! assert_eq!(name.value().value(), "Edited");
//! ```

mod content;
mod kinds;
mod session;

pub use content::{DisplayContent, EditContent};
pub use kinds::{EditableSelection, EditableText, EditableValue};
pub use session::{ActiveContent, EditSession, EditSnapshot, ValueTransfer};
