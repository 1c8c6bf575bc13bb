//! Familiar hooks built on [`use_constant`] and [`use_atom`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{use_atom, use_constant};
use crate::error::Result;
use crate::store::{Atom, MountCleanup, Setter};

/// A mutable cell that lives as long as the component instance.
pub fn use_ref<T: 'static>(initial: T) -> Result<Rc<RefCell<T>>> {
    use_constant(|| Rc::new(RefCell::new(initial)))
}

/// Component-local state backed by a private atom.
pub fn use_state<T, F>(init: F) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
    F: FnOnce() -> T,
{
    let atom = use_constant(|| Atom::new(init()))?;
    use_atom(&atom)
}

/// Recompute `compute` only when `deps` changed since the last render.
pub fn use_memo<T, D, F>(compute: F, deps: D) -> Result<T>
where
    T: Clone + 'static,
    D: PartialEq + 'static,
    F: FnOnce() -> T,
{
    let cell = use_constant(|| Rc::new(RefCell::new(None::<(D, T)>)))?;
    if let Some((last, value)) = cell.borrow().as_ref() {
        if *last == deps {
            return Ok(value.clone());
        }
    }
    let value = compute();
    *cell.borrow_mut() = Some((deps, value.clone()));
    Ok(value)
}

/// Keep the first `callback` until `deps` change.
pub fn use_callback<F, D>(callback: F, deps: D) -> Result<F>
where
    F: Clone + 'static,
    D: PartialEq + 'static,
{
    use_memo(move || callback, deps)
}

struct EffectState<D> {
    atom: Option<Atom<()>>,
    deps: Option<D>,
}

/// Run `effect` after the render is committed, and again whenever `deps`
/// change (or after every render when `deps` is `None`). The cleanup it
/// returns runs before the next run and when the component unmounts.
///
/// The effect is the on-mount callback of a private atom: a new atom is
/// created when `deps` change, so switching the subscription over tears the
/// old effect down and starts the new one.
pub fn use_effect<F, D>(effect: F, deps: Option<D>) -> Result<()>
where
    F: Fn() -> Option<MountCleanup> + 'static,
    D: PartialEq + 'static,
{
    let state = use_constant(|| {
        Rc::new(RefCell::new(EffectState::<D> {
            atom: None,
            deps: None,
        }))
    })?;
    let atom = {
        let mut state = state.borrow_mut();
        let unchanged = matches!((&deps, &state.deps), (Some(next), Some(last)) if next == last);
        if !unchanged {
            state.atom = None;
            state.deps = deps;
        }
        state
            .atom
            .get_or_insert_with(|| Atom::new(()).with_on_mount(effect))
            .clone()
    };
    use_atom(&atom)?;
    Ok(())
}

/// Stable handle for sending actions to a [`use_reducer`] state.
pub struct Dispatch<A> {
    inner: Rc<dyn Fn(A) -> Result<()>>,
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) -> Result<()> {
        (self.inner)(action)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dispatch({:p})", Rc::as_ptr(&self.inner) as *const ())
    }
}

type Reducer<S, A> = Rc<dyn Fn(&S, A) -> S>;

/// State updated by a reducer. The dispatch handle is stable; it always
/// applies the reducer passed on the most recent render.
pub fn use_reducer<S, A, R, I>(reducer: R, init: I) -> Result<(S, Dispatch<A>)>
where
    S: Clone + PartialEq + 'static,
    A: 'static,
    R: Fn(&S, A) -> S + 'static,
    I: FnOnce() -> S,
{
    let (state, setter) = use_state(init)?;
    let latest = use_constant(|| Rc::new(RefCell::new(None::<Reducer<S, A>>)))?;
    *latest.borrow_mut() = Some(Rc::new(reducer));

    let dispatch = use_constant(move || Dispatch {
        inner: Rc::new(move |action: A| -> Result<()> {
            let reducer = latest.borrow().clone();
            match reducer {
                Some(reducer) => setter.update(move |state: &S| reducer(state, action)),
                None => Ok(()),
            }
        }),
    })?;
    Ok((state, dispatch))
}
