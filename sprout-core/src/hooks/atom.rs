use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{claim_slot, current};
use crate::error::{Error, Result};
use crate::render::context::{ContextRef, HookSlot};
use crate::store::{Atom, Setter, Store};

/// Read `atom` and subscribe the rendering component to it.
///
/// Returns the current value and a setter. The subscription itself is set
/// up in the commit phase; from then on the component re-renders (forced,
/// so a [`memo`](super::memo) wrapper does not swallow it) whenever the
/// atom's value changes. The setter stays the same object for as long as
/// the component keeps passing the same atom.
pub fn use_atom<T>(atom: &Atom<T>) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
{
    let frame = current("use_atom")?;
    let store = frame.reconciler.store().clone();
    let value = store.read(atom)?;
    let ctx = &frame.context;
    let index = claim_slot(ctx);

    let (setter, generation) = {
        let mut c = ctx.borrow_mut();
        let existing = match c.hooks.get(index) {
            Some(HookSlot::Subscription {
                atom: tracked,
                setter,
                ..
            }) if *tracked == atom.id() => Some(
                setter
                    .downcast_ref::<Setter<T>>()
                    .cloned()
                    .ok_or(Error::AtomType { atom: atom.id() })?,
            ),
            // a different atom: the commit phase swaps the subscription
            Some(HookSlot::Subscription { .. }) => Some(store.setter(atom)),
            Some(other) => {
                return Err(Error::HookOrderChanged {
                    index,
                    expected: "atom",
                    found: other.kind(),
                })
            }
            None => None,
        };
        let setter = match existing {
            Some(setter) => setter,
            None => {
                let setter = store.setter(atom);
                c.hooks.push(HookSlot::Subscription {
                    atom: atom.id(),
                    setter: Rc::new(setter.clone()),
                    cleanup: None,
                });
                setter
            }
        };
        (setter, c.generation)
    };

    let task = subscribe_task(
        ctx,
        index,
        generation,
        atom.clone(),
        setter.clone(),
        value.clone(),
        store,
    );
    frame.reconciler.queue().defer(task);
    Ok((value, setter))
}

/// Commit-phase half of [`use_atom`]: make sure slot `index` holds a live
/// subscription to `atom`, then flush the store.
fn subscribe_task<T>(
    ctx: &ContextRef,
    index: usize,
    generation: u64,
    atom: Atom<T>,
    setter: Setter<T>,
    seen: T,
    store: Store,
) -> impl FnOnce() -> Result<()>
where
    T: Clone + PartialEq + 'static,
{
    let weak = Rc::downgrade(ctx);
    move || {
        let Some(ctx) = weak.upgrade() else { return Ok(()) };
        let stale = {
            let mut c = ctx.borrow_mut();
            if c.generation != generation {
                trace!(index, "hook slots released before commit");
                return Ok(());
            }
            match c.hooks.get_mut(index) {
                Some(HookSlot::Subscription {
                    atom: tracked,
                    cleanup: Some(_),
                    ..
                }) if *tracked == atom.id() => None,
                Some(HookSlot::Subscription { cleanup, .. }) => Some(cleanup.take()),
                _ => return Ok(()),
            }
        };
        // already subscribed to this atom
        let Some(stale) = stale else { return store.flush() };
        if let Some(unsubscribe) = stale {
            unsubscribe();
        }

        let listener = {
            let weak = Rc::downgrade(&ctx);
            let store = store.clone();
            let atom = atom.clone();
            let previous = RefCell::new(seen);
            move || -> Result<()> {
                let next = store.read(&atom)?;
                if *previous.borrow() == next {
                    return Ok(());
                }
                *previous.borrow_mut() = next;
                let rerender = match weak.upgrade() {
                    Some(ctx) => {
                        let c = ctx.borrow();
                        if c.generation == generation {
                            c.rerender.clone()
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                match rerender {
                    Some(rerender) => rerender(true),
                    None => Ok(()),
                }
            }
        };
        let unsubscribe = store.subscribe(&atom, listener)?;
        debug!(atom = %atom.id(), index, "subscribed");

        let cleanup: Box<dyn FnOnce()> = Box::new(move || unsubscribe.unsubscribe());
        let leftover = {
            let mut c = ctx.borrow_mut();
            let current = c.generation == generation;
            match c.hooks.get_mut(index) {
                Some(slot) if current => {
                    *slot = HookSlot::Subscription {
                        atom: atom.id(),
                        setter: Rc::new(setter),
                        cleanup: Some(cleanup),
                    };
                    None
                }
                _ => Some(cleanup),
            }
        };
        // slots were released while subscribing
        if let Some(cleanup) = leftover {
            cleanup();
            return Ok(());
        }
        store.flush()
    }
}
