//! Render Contexts
//!
//! The shadow tree. One [`RenderContext`] exists per (parent, key) position
//! that the reconciler has visited. It remembers what was rendered there
//! last, which output node that produced, where to reinsert output among
//! its siblings, and, for component positions, the hook slots that give
//! hooks their identity across renders.
//!
//! Contexts are shared as `Rc<RefCell<_>>`. Closures stored on the output
//! tree or in the store (event listeners, subscriptions) only ever hold a
//! `Weak` to a context, so dropping a subtree from its parent frees it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::dom::NodeId;
use crate::element::{Element, Key, Props};
use crate::error::Result;
use crate::store::AtomId;

pub(crate) type ContextRef = Rc<RefCell<RenderContext>>;

/// Re-run a component in place; `true` marks a forced render.
pub(crate) type Rerender = Rc<dyn Fn(bool) -> Result<()>>;

/// Child position key: `None` is the key of an element without one.
pub(crate) type ChildKey = Option<Key>;

/// State kept for one hook call site.
pub(crate) enum HookSlot {
    Constant(Rc<dyn Any>),
    Subscription {
        atom: AtomId,
        /// The `Setter<T>` handed out for `atom`.
        setter: Rc<dyn Any>,
        /// `None` until the commit phase has subscribed.
        cleanup: Option<Box<dyn FnOnce()>>,
    },
}

impl HookSlot {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            HookSlot::Constant(_) => "constant",
            HookSlot::Subscription { .. } => "atom",
        }
    }

    /// Run whatever the slot must tear down.
    pub(crate) fn release(self) {
        if let HookSlot::Subscription {
            cleanup: Some(cleanup),
            ..
        } = self
        {
            cleanup();
        }
    }
}

impl fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookSlot::Constant(_) => f.write_str("Constant"),
            HookSlot::Subscription { atom, cleanup, .. } => f
                .debug_struct("Subscription")
                .field("atom", atom)
                .field("subscribed", &cleanup.is_some())
                .finish(),
        }
    }
}

pub(crate) struct RenderContext {
    pub(crate) key: ChildKey,
    /// The context whose children map holds this one.
    pub(crate) owner: Weak<RefCell<RenderContext>>,
    /// Last element rendered at this position.
    pub(crate) element: Option<Element>,
    /// Output container; `None` once the output has been removed.
    pub(crate) parent: Option<NodeId>,
    /// Present iff the last element was text or a host element.
    pub(crate) node: Option<NodeId>,
    /// Where output is reinserted among its siblings.
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) children: IndexMap<ChildKey, ContextRef>,
    pub(crate) rerender: Option<Rerender>,
    /// Caret of a controlled text input, recorded on user input.
    pub(crate) selection_start: Option<usize>,
    pub(crate) hooks: SmallVec<[HookSlot; 4]>,
    pub(crate) hook_index: usize,
    pub(crate) force: bool,
    pub(crate) memo: Option<(Props, Element)>,
    /// Bumped whenever hook slots are released, so deferred work queued
    /// against an older set of slots can tell it is stale.
    pub(crate) generation: u64,
}

impl RenderContext {
    pub(crate) fn new(key: ChildKey) -> ContextRef {
        Rc::new(RefCell::new(Self {
            key,
            owner: Weak::new(),
            element: None,
            parent: None,
            node: None,
            next_sibling: None,
            children: IndexMap::new(),
            rerender: None,
            selection_start: None,
            hooks: SmallVec::new(),
            hook_index: 0,
            force: false,
            memo: None,
            generation: 0,
        }))
    }

    /// Give up every hook slot and reset the cursor.
    pub(crate) fn take_hooks(&mut self) -> SmallVec<[HookSlot; 4]> {
        self.hook_index = 0;
        self.rerender = None;
        self.memo = None;
        self.generation += 1;
        std::mem::take(&mut self.hooks)
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("key", &self.key)
            .field("element", &self.element.as_ref().map(Element::kind))
            .field("parent", &self.parent)
            .field("node", &self.node)
            .field("next_sibling", &self.next_sibling)
            .field("children", &self.children.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// The existing child at `key`, or a fresh context for it.
pub(crate) fn child_context(ctx: &ContextRef, key: &ChildKey) -> ContextRef {
    if let Some(child) = ctx.borrow().children.get(key) {
        return Rc::clone(child);
    }
    let child = RenderContext::new(key.clone());
    child.borrow_mut().owner = Rc::downgrade(ctx);
    child
}

/// First output node of `ctx` in document order, if it is attached.
pub(crate) fn first_node(ctx: &ContextRef) -> Option<NodeId> {
    let c = ctx.borrow();
    if c.parent.is_none() {
        return None;
    }
    if c.node.is_some() {
        return c.node;
    }
    c.children.values().find_map(first_node)
}

/// The output node that currently follows everything `ctx` renders.
///
/// Looks at the later siblings of `ctx`, then of its owner, and so on
/// outwards. The search stops at a host element (output goes last inside
/// it) or at the root, whose recorded anchor is returned.
pub(crate) fn following_node(ctx: &ContextRef) -> Option<NodeId> {
    let mut current = Rc::clone(ctx);
    loop {
        let owner = current.borrow().owner.upgrade();
        let Some(owner) = owner else {
            return current.borrow().next_sibling;
        };
        {
            let o = owner.borrow();
            if o.node.is_some() {
                return None;
            }
            let later = o
                .children
                .values()
                .skip_while(|child| !Rc::ptr_eq(child, &current))
                .skip(1)
                .find_map(first_node);
            if later.is_some() {
                return later;
            }
        }
        current = owner;
    }
}

/// Set `anchor` as the reinsertion point of `ctx` and of the descendants
/// that share its output position (those without an output node of their
/// own).
pub(crate) fn propagate_next_sibling(ctx: &ContextRef, anchor: Option<NodeId>) {
    let children: Vec<ContextRef> = {
        let mut c = ctx.borrow_mut();
        c.next_sibling = anchor;
        if c.node.is_some() {
            return;
        }
        c.children.values().cloned().collect()
    };
    for child in &children {
        propagate_next_sibling(child, anchor);
    }
}
