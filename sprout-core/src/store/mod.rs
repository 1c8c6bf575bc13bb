//! Atom Store
//!
//! The reactive value store behind `use_atom`. The reconciler only talks to
//! it through four operations:
//!
//! - `read(atom)`: the current value, or an error from a derived reader.
//! - `write(atom, update)`: fails for atoms without a writer.
//! - `subscribe(atom, on_change)`: returns an [`Unsubscribe`] handle.
//! - `flush()`: delivers pending change notifications.
//!
//! # Concepts
//!
//! ## Atoms
//!
//! An [`Atom`] is an identity plus a recipe for its value. Primitive atoms
//! hold state; derived atoms compute from other atoms and are read-only.
//!
//! ## Stores
//!
//! A [`Store`] owns the values. Atoms are cheap to create and can be shared
//! by any number of components; the store decides what each of them sees.

mod atom;
#[allow(clippy::module_inception)]
mod store;
mod subscriber;

pub use atom::{Atom, AtomId, Getter, MountCleanup, OnMount};
pub use store::{Setter, Store, Unsubscribe, Update};
pub use subscriber::SubscriberId;
