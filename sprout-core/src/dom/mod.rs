//! Output Tree
//!
//! The reconciler mutates a live output tree. This module provides an
//! in-memory document with the subset of DOM behaviour the reconciler relies
//! on: element and text nodes, ordered children with `insert_before`
//! semantics, attributes, event listeners, focus, and the caret position of
//! text inputs.
//!
//! # Ownership
//!
//! [`Document`] is a cheap, clonable handle. Event listeners may re-enter the
//! document (a click handler that writes an atom triggers a re-render that
//! inserts and removes nodes), so no internal borrow is ever held while a
//! listener runs.

mod document;
mod event;

pub use document::{Document, Listener, NodeId};
pub use event::Event;
