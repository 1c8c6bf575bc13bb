//! Hooks
//!
//! Hooks give a component function state that survives re-renders. Each
//! component context keeps an array of hook slots and a cursor; every hook
//! call takes the slot under the cursor and advances it. The slot is
//! therefore identified by call order, and a component must call the same
//! hooks in the same order on every render. Breaking that rule is reported
//! as [`Error::HookOrderChanged`](crate::Error::HookOrderChanged).
//!
//! # Primitives
//!
//! - [`use_constant`]: a value created on first render and kept.
//! - [`use_atom`]: the value of an atom plus a stable setter; the component
//!   re-renders when the atom changes.
//! - [`memo`]: wraps a component so it is skipped when its props are
//!   shallow-equal to the last render's.
//!
//! Everything else ([`use_state`], [`use_effect`], ...) is built from these.

mod atom;
mod compat;
mod constant;
mod memo;

pub use atom::use_atom;
pub use compat::{use_callback, use_effect, use_memo, use_reducer, use_ref, use_state, Dispatch};
pub use constant::use_constant;
pub use memo::{memo, memo_by};

use crate::error::{Error, Result};
use crate::render::context::ContextRef;
use crate::render::stack::{self, Frame};

/// The rendering component's frame, or an error naming `hook`.
fn current(hook: &'static str) -> Result<Frame> {
    stack::current().ok_or(Error::HookOutsideRender { hook })
}

/// Take the slot under the cursor and advance it.
fn claim_slot(ctx: &ContextRef) -> usize {
    let mut c = ctx.borrow_mut();
    let index = c.hook_index;
    c.hook_index += 1;
    index
}
