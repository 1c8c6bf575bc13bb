//! Atom Store
//!
//! The store holds the current value of every primitive atom used with it,
//! the subscribers of every atom, and the dependency edges between derived
//! atoms and the atoms they read.
//!
//! # Notification
//!
//! Writing an atom marks it as changed, then walks the dependency edges
//! breadth-first to mark every derived atom that (transitively) read it. The
//! marked atoms are queued as pending and [`Store::flush`] notifies their
//! subscribers. A write flushes before returning, so a setter invoked from an
//! event handler has re-rendered every subscribed component by the time it
//! returns.
//!
//! # Re-entrancy
//!
//! Subscribers usually re-render components, and components read and write
//! atoms. The store therefore never holds its internal borrow while calling
//! out to user code (read functions, subscribers, on-mount callbacks).

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, trace};

use super::atom::{Atom, AtomId, Getter, MountCleanup, Source};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{Error, Result};

/// Per-atom bookkeeping.
#[derive(Default)]
struct AtomState {
    /// Current value of a primitive atom, created lazily from its initial value.
    value: Option<Rc<dyn Any>>,
    subscribers: Vec<Subscriber>,
    /// Atoms this derived atom read during its last evaluation.
    dependencies: IndexSet<AtomId>,
    /// Derived atoms that read this atom.
    dependents: IndexSet<AtomId>,
    mount_cleanup: Option<MountCleanup>,
}

#[derive(Default)]
struct StoreState {
    atoms: HashMap<AtomId, AtomState>,
    pending: IndexSet<AtomId>,
}

impl StoreState {
    /// Mark an atom and everything derived from it as changed.
    fn mark_changed(&mut self, source: AtomId) {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([source]);

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            self.pending.insert(id);
            if let Some(state) = self.atoms.get(&id) {
                queue.extend(state.dependents.iter().copied());
            }
        }
    }

    /// Replace the recorded dependencies of a derived atom.
    fn set_dependencies(&mut self, atom: AtomId, dependencies: IndexSet<AtomId>) {
        let previous = std::mem::take(&mut self.atoms.entry(atom).or_default().dependencies);
        for dependency in previous.difference(&dependencies) {
            if let Some(state) = self.atoms.get_mut(dependency) {
                state.dependents.shift_remove(&atom);
            }
        }
        for dependency in &dependencies {
            self.atoms.entry(*dependency).or_default().dependents.insert(atom);
        }
        self.atoms.entry(atom).or_default().dependencies = dependencies;
    }
}

/// Shared container for atom values.
///
/// Cloning the handle shares the store. A store is injected into each
/// [`Renderer`](crate::render::Renderer) rather than living in a global, so
/// independent roots can use independent stores.
#[derive(Clone, Default)]
pub struct Store {
    state: Rc<RefCell<StoreState>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Store")
            .field("atoms", &state.atoms.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current value of an atom.
    pub fn read<T: Clone + 'static>(&self, atom: &Atom<T>) -> Result<T> {
        match atom.source() {
            Source::Primitive(initial) => {
                let mut state = self.state.borrow_mut();
                let entry = state.atoms.entry(atom.id()).or_default();
                let value = entry
                    .value
                    .get_or_insert_with(|| Rc::new(initial.clone()) as Rc<dyn Any>);
                value
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or(Error::AtomType { atom: atom.id() })
            }
            Source::Derived(read) => {
                let read = Rc::clone(read);
                let getter = Getter::new(self);
                let value = read(&getter)?;
                self.state
                    .borrow_mut()
                    .set_dependencies(atom.id(), getter.into_dependencies());
                Ok(value)
            }
        }
    }

    /// Apply an update to a writable atom and notify its subscribers.
    pub fn write<T: Clone + 'static>(&self, atom: &Atom<T>, update: Update<T>) -> Result<()> {
        if !atom.is_writable() {
            return Err(Error::ReadOnlyAtom { atom: atom.id() });
        }
        let next = match update {
            Update::Set(value) => value,
            Update::With(f) => f(&self.read(atom)?),
        };
        {
            let mut state = self.state.borrow_mut();
            state.atoms.entry(atom.id()).or_default().value = Some(Rc::new(next));
            state.mark_changed(atom.id());
        }
        trace!(atom = %atom.id(), "write");
        self.flush()
    }

    /// Register `listener` to run whenever the atom (or a dependency) changes.
    ///
    /// The first subscriber of an atom runs the atom's on-mount callback.
    pub fn subscribe<T, F>(&self, atom: &Atom<T>, listener: F) -> Result<Unsubscribe>
    where
        T: Clone + 'static,
        F: Fn() -> Result<()> + 'static,
    {
        if !atom.is_writable() {
            // Evaluate once so the dependency edges exist before any write.
            self.read(atom)?;
        }
        let subscriber = Subscriber::new(listener);
        let id = subscriber.id();
        let mount = {
            let mut state = self.state.borrow_mut();
            let entry = state.atoms.entry(atom.id()).or_default();
            entry.subscribers.push(subscriber);
            if entry.subscribers.len() == 1 {
                atom.on_mount()
            } else {
                None
            }
        };
        debug!(atom = %atom.id(), subscriber = ?id, "subscribe");
        if let Some(on_mount) = mount {
            let cleanup = on_mount();
            if let Some(entry) = self.state.borrow_mut().atoms.get_mut(&atom.id()) {
                entry.mount_cleanup = cleanup;
            }
        }
        Ok(Unsubscribe {
            store: self.clone(),
            atom: atom.id(),
            subscriber: id,
        })
    }

    /// Notify the subscribers of every pending atom.
    ///
    /// Subscribers may write atoms while being notified; the loop runs until
    /// nothing is pending. The first subscriber error stops the flush.
    pub fn flush(&self) -> Result<()> {
        loop {
            let pending: Vec<AtomId> = self.state.borrow_mut().pending.drain(..).collect();
            if pending.is_empty() {
                return Ok(());
            }
            for atom in pending {
                let subscribers = self
                    .state
                    .borrow()
                    .atoms
                    .get(&atom)
                    .map(|state| state.subscribers.clone())
                    .unwrap_or_default();
                for subscriber in subscribers {
                    subscriber.notify()?;
                }
            }
        }
    }

    /// Number of subscribers currently registered on an atom.
    pub fn subscriber_count<T>(&self, atom: &Atom<T>) -> usize {
        self.state
            .borrow()
            .atoms
            .get(&atom.id())
            .map_or(0, |state| state.subscribers.len())
    }

    /// A stable write handle for an atom.
    pub fn setter<T: Clone + 'static>(&self, atom: &Atom<T>) -> Setter<T> {
        Setter {
            inner: Rc::new(SetterInner {
                store: self.clone(),
                atom: atom.clone(),
            }),
        }
    }

    fn unsubscribe(&self, atom: AtomId, subscriber: SubscriberId) {
        let cleanup = {
            let mut state = self.state.borrow_mut();
            match state.atoms.get_mut(&atom) {
                Some(entry) => {
                    entry.subscribers.retain(|s| s.id() != subscriber);
                    if entry.subscribers.is_empty() {
                        entry.mount_cleanup.take()
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        debug!(%atom, ?subscriber, "unsubscribe");
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

/// How a write changes an atom.
pub enum Update<T> {
    /// Replace the value.
    Set(T),
    /// Compute the next value from the current one.
    With(Box<dyn FnOnce(&T) -> T>),
}

impl<T> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Set(_) => f.write_str("Update::Set(..)"),
            Update::With(_) => f.write_str("Update::With(..)"),
        }
    }
}

/// Handle that removes one subscription.
#[must_use = "dropping an Unsubscribe keeps the subscription alive"]
pub struct Unsubscribe {
    store: Store,
    atom: AtomId,
    subscriber: SubscriberId,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        self.store.unsubscribe(self.atom, self.subscriber);
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("atom", &self.atom)
            .field("subscriber", &self.subscriber)
            .finish()
    }
}

struct SetterInner<T> {
    store: Store,
    atom: Atom<T>,
}

/// Write handle for one atom in one store.
///
/// `use_atom` hands out the same setter for as long as a component keeps
/// reading the same atom, so setters can be compared with [`Setter::ptr_eq`]
/// to detect a changed dependency.
pub struct Setter<T> {
    inner: Rc<SetterInner<T>>,
}

impl<T: Clone + 'static> Setter<T> {
    /// Replace the atom's value.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.store.write(&self.inner.atom, Update::Set(value))
    }

    /// Compute the next value from the current one.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.inner.store.write(&self.inner.atom, Update::With(Box::new(f)))
    }

    pub fn atom(&self) -> &Atom<T> {
        &self.inner.atom
    }
}

impl<T> Setter<T> {
    /// Whether both handles are the same setter instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("atom", &self.inner.atom.id()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
