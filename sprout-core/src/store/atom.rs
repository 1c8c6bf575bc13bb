//! Atom Definitions
//!
//! An atom is a unit of reactive state. The atom itself holds no value: it
//! is a stable identity plus a recipe for producing the value (an initial
//! value for primitive atoms, a read function for derived ones). Values live
//! in a [`Store`](super::Store), so the same atom can be used with several
//! independent stores.
//!
//! # Kinds
//!
//! - **Primitive** atoms ([`Atom::new`]) are writable and start with their
//!   initial value.
//! - **Derived** atoms ([`Atom::derived`]) compute their value from other
//!   atoms through a [`Getter`]. They have no writer; writing one is an
//!   [`Error::ReadOnlyAtom`](crate::Error::ReadOnlyAtom).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use super::Store;
use crate::error::Result;

/// Counter for generating unique atom IDs.
static ATOM_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identity of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u64);

impl AtomId {
    fn next() -> Self {
        Self(ATOM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Cleanup returned by an on-mount callback.
pub type MountCleanup = Box<dyn FnOnce()>;

/// Called when an atom gains its first subscriber.
pub type OnMount = Rc<dyn Fn() -> Option<MountCleanup>>;

pub(crate) type ReadFn<T> = Rc<dyn Fn(&Getter<'_>) -> Result<T>>;

pub(crate) enum Source<T> {
    Primitive(T),
    Derived(ReadFn<T>),
}

/// A handle to a piece of reactive state.
///
/// Cloning an atom clones the handle, not the state: clones share the same
/// [`AtomId`] and compare equal.
pub struct Atom<T> {
    id: AtomId,
    source: Rc<Source<T>>,
    on_mount: Option<OnMount>,
}

impl<T: 'static> Atom<T> {
    /// Create a writable atom with an initial value.
    pub fn new(initial: T) -> Self {
        Self {
            id: AtomId::next(),
            source: Rc::new(Source::Primitive(initial)),
            on_mount: None,
        }
    }

    /// Create a read-only atom computed from other atoms.
    ///
    /// The read function is evaluated on every read. Atoms read through the
    /// getter become dependencies: writing any of them notifies this atom's
    /// subscribers.
    pub fn derived<F>(read: F) -> Self
    where
        F: Fn(&Getter<'_>) -> Result<T> + 'static,
    {
        Self {
            id: AtomId::next(),
            source: Rc::new(Source::Derived(Rc::new(read))),
            on_mount: None,
        }
    }

    /// Run `on_mount` when the atom gains its first subscriber in a store.
    ///
    /// The returned cleanup, if any, runs when the last subscriber leaves.
    pub fn with_on_mount<F>(mut self, on_mount: F) -> Self
    where
        F: Fn() -> Option<MountCleanup> + 'static,
    {
        self.on_mount = Some(Rc::new(on_mount));
        self
    }

    /// Whether the atom accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(*self.source, Source::Primitive(_))
    }

    pub(crate) fn source(&self) -> &Source<T> {
        &self.source
    }

    pub(crate) fn on_mount(&self) -> Option<OnMount> {
        self.on_mount.clone()
    }
}

impl<T> Atom<T> {
    pub fn id(&self) -> AtomId {
        self.id
    }
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            source: Rc::clone(&self.source),
            on_mount: self.on_mount.clone(),
        }
    }
}

impl<T> PartialEq for Atom<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Atom<T> {}

impl<T> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("writable", &matches!(*self.source, Source::Primitive(_)))
            .finish()
    }
}

/// Read access handed to derived atoms.
///
/// Every atom read through the getter is recorded as a dependency of the
/// atom being computed.
pub struct Getter<'a> {
    store: &'a Store,
    dependencies: RefCell<IndexSet<AtomId>>,
}

impl<'a> Getter<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            dependencies: RefCell::new(IndexSet::new()),
        }
    }

    /// Read another atom and record it as a dependency.
    pub fn get<U: Clone + 'static>(&self, atom: &Atom<U>) -> Result<U> {
        self.dependencies.borrow_mut().insert(atom.id());
        self.store.read(atom)
    }

    pub(crate) fn into_dependencies(self) -> IndexSet<AtomId> {
        self.dependencies.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_ids_are_unique() {
        let a = Atom::new(0);
        let b = Atom::new(0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clones_share_identity() {
        let a = Atom::new("x".to_string());
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn id_needs_no_bounds() {
        fn id_of<T>(atom: &Atom<T>) -> AtomId {
            atom.id()
        }
        let a = Atom::new(1u8);
        assert_eq!(id_of(&a), a.id());
    }

    #[test]
    fn derived_atoms_are_read_only() {
        let base = Atom::new(2);
        let doubled = Atom::derived(move |get: &Getter<'_>| Ok(get.get(&base)? * 2));
        assert!(!doubled.is_writable());
        assert!(Atom::new(()).is_writable());
    }
}
