//! Subscriber types for the atom store.
//!
//! A Subscriber is a callback registered on one atom. Component contexts
//! subscribe through `use_atom`; any other code may subscribe directly.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// Used to remove exactly one registration when several subscribers listen
/// to the same atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A change callback registered on an atom.
#[derive(Clone)]
pub(crate) struct Subscriber {
    id: SubscriberId,
    notify: Rc<dyn Fn() -> Result<()>>,
}

impl Subscriber {
    pub(crate) fn new<F>(notify: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Rc::new(notify),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Tell the subscriber that the atom (or one of its dependencies) changed.
    pub(crate) fn notify(&self) -> Result<()> {
        (self.notify)()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
