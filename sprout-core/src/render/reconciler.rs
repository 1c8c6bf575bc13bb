//! Reconciler
//!
//! Walks a new element against the [`RenderContext`] that rendered the
//! previous one and patches the output tree to match.
//!
//! # Algorithm
//!
//! For each `render(element, parent, ctx)`:
//!
//! 1. **Identity short-circuit.** If `element` is the element the context
//!    rendered last and it produced an output node, the node is at most
//!    moved (when the container changed). Children are not revisited.
//! 2. **Stale children.** Child contexts whose key the new element no
//!    longer uses are unmounted. Unless the context keeps rendering the same
//!    component, its own hook slots are released as well.
//! 3. **Remove output.** Every output node of the context is detached and
//!    the position after the last one becomes the anchor for reinsertion.
//!    A text or host node that is about to be replaced stays in place until
//!    its replacement is inserted. A render that starts a pass of its own
//!    (a component reacting to an atom) first looks the anchor up among
//!    the live output of its siblings.
//! 4. **Dispatch** on the element shape and recurse into child contexts.
//! 5. **Record** element, container, output node and children. Output
//!    nodes and child contexts that were not carried over are released
//!    from the document.
//!
//! Output is never patched in place: a host element that is not identical
//! to the last one produces a fresh node. Reuse comes from step 1, which
//! is why stable element identities (memoized components, hoisted
//! elements) matter.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::attach::attach_props;
use super::commit::CommitQueue;
use super::context::{
    child_context, following_node, propagate_next_sibling, ChildKey, ContextRef, Rerender,
};
use super::stack::{self, Frame, RenderGuard};
use crate::config::RendererOptions;
use crate::dom::{Document, NodeId};
use crate::element::{format_number, ComponentElement, Element, Key};
use crate::error::{Error, Result};
use crate::store::Store;

/// Counters collected while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Component function invocations.
    pub component_renders: u64,
    /// Output nodes created.
    pub nodes_created: u64,
    /// Sibling key collisions (last one wins).
    pub key_collisions: u64,
}

struct Shared {
    document: Document,
    store: Store,
    queue: CommitQueue,
    options: RendererOptions,
    in_render: Rc<Cell<usize>>,
    stats: Cell<RenderStats>,
}

/// Outcome of removing a context's output.
enum Removed {
    /// The context had no output at all.
    Nothing,
    /// Output removed; reinsert before this node (`None` appends).
    Before(Option<NodeId>),
}

/// Decrements the in-render depth when dropped.
struct InRender(Rc<Cell<usize>>);

impl InRender {
    fn enter(depth: &Rc<Cell<usize>>) -> Self {
        depth.set(depth.get() + 1);
        Self(Rc::clone(depth))
    }
}

impl Drop for InRender {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Renderer state shared by every context of one [`Renderer`](super::Renderer).
///
/// Cloning is cheap. The reconciler never owns contexts, so closures that
/// capture it do not keep the shadow tree alive.
#[derive(Clone)]
pub(crate) struct Reconciler {
    shared: Rc<Shared>,
}

impl Reconciler {
    pub(crate) fn new(document: Document, store: Store, options: RendererOptions) -> Self {
        Self {
            shared: Rc::new(Shared {
                document,
                store,
                queue: CommitQueue::default(),
                options,
                in_render: Rc::new(Cell::new(0)),
                stats: Cell::new(RenderStats::default()),
            }),
        }
    }

    pub(crate) fn document(&self) -> &Document {
        &self.shared.document
    }

    pub(crate) fn store(&self) -> &Store {
        &self.shared.store
    }

    pub(crate) fn queue(&self) -> &CommitQueue {
        &self.shared.queue
    }

    pub(crate) fn options(&self) -> &RendererOptions {
        &self.shared.options
    }

    pub(crate) fn stats(&self) -> RenderStats {
        self.shared.stats.get()
    }

    fn count(&self, update: impl FnOnce(&mut RenderStats)) {
        let mut stats = self.shared.stats.get();
        update(&mut stats);
        self.shared.stats.set(stats);
    }

    /// Make `ctx`'s output under `parent` match `element`.
    pub(crate) fn render(&self, element: &Element, parent: NodeId, ctx: &ContextRef) -> Result<()> {
        if self.short_circuit(element, parent, ctx) {
            return Ok(());
        }

        if self.shared.in_render.get() == 0 {
            let anchor = following_node(ctx)
                .filter(|anchor| self.shared.document.parent(*anchor) == Some(parent));
            propagate_next_sibling(ctx, anchor);
        }
        let _depth = InRender::enter(&self.shared.in_render);
        trace!(kind = element.kind(), %parent, "render");

        self.unmount_stale(element, ctx);

        let produces_node = matches!(
            element,
            Element::Text(_) | Element::Number(_) | Element::Host(_)
        );
        let replaced = if produces_node {
            self.take_replaceable(ctx, parent)
        } else {
            None
        };
        self.remove_all_nodes(ctx)?;
        let anchor = ctx.borrow().next_sibling;

        let mut node = None;
        let mut children: IndexMap<ChildKey, ContextRef> = IndexMap::new();

        match element {
            Element::Empty | Element::Bool(_) => {}
            Element::Text(text) => {
                node = Some(self.place_text(text, parent, replaced, anchor)?);
            }
            Element::Number(number) => {
                node = Some(self.place_text(&format_number(*number), parent, replaced, anchor)?);
            }
            Element::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    let child = self.child_slot(ctx, &mut children, list_key(item, index))?;
                    self.render(item, parent, &child)?;
                }
            }
            Element::Fragment(fragment) => {
                let child = self.child_slot(ctx, &mut children, fragment.key().cloned())?;
                self.render(fragment.children(), parent, &child)?;
            }
            Element::Host(host) => {
                if host.tag().is_empty() {
                    return Err(Error::UnhandledElement {
                        description: format!("host element without a tag ({host:?})"),
                    });
                }
                let created = self.shared.document.create_element(host.tag());
                self.count(|stats| stats.nodes_created += 1);
                attach_props(&self.shared.document, &self.shared.in_render, host, created, ctx);
                self.place(parent, created, replaced, anchor)?;
                self.restore_focus(ctx, created)?;
                let child = self.child_slot(ctx, &mut children, host.key().cloned())?;
                self.render(host.children(), created, &child)?;
                node = Some(created);
            }
            Element::Component(component) => {
                let child = self.child_slot(ctx, &mut children, component.key().cloned())?;
                let rerender = self.component_rerender(ctx, Rc::clone(component), parent, child);
                ctx.borrow_mut().rerender = Some(Rc::clone(&rerender));
                rerender(false)?;
            }
        }

        let (previous, dropped) = {
            let mut c = ctx.borrow_mut();
            c.element = Some(element.clone());
            c.parent = Some(parent);
            let previous = std::mem::replace(&mut c.node, node).filter(|old| Some(*old) != node);
            let old = std::mem::replace(&mut c.children, children);
            let dropped: Vec<ContextRef> = old
                .into_values()
                .filter(|child| !c.children.values().any(|kept| Rc::ptr_eq(kept, child)))
                .collect();
            (previous, dropped)
        };
        if let Some(old) = previous {
            self.shared.document.release(old);
        }
        for child in &dropped {
            self.release_nodes(child);
        }
        Ok(())
    }

    /// Free every output node a discarded subtree still refers to.
    fn release_nodes(&self, ctx: &ContextRef) {
        let (node, children) = {
            let c = ctx.borrow();
            (c.node, c.children.values().cloned().collect::<Vec<_>>())
        };
        if let Some(node) = node {
            self.shared.document.release(node);
        }
        for child in &children {
            self.release_nodes(child);
        }
    }

    /// Step 1; returns whether the render is complete.
    fn short_circuit(&self, element: &Element, parent: NodeId, ctx: &ContextRef) -> bool {
        let mut c = ctx.borrow_mut();
        let Some(node) = c.node else { return false };
        if !c.element.as_ref().is_some_and(|last| last.is_same(element)) {
            return false;
        }
        if c.parent != Some(parent) {
            let anchor = c
                .next_sibling
                .filter(|anchor| self.shared.document.parent(*anchor) == Some(parent));
            trace!(%node, %parent, ?anchor, "moving unchanged node");
            self.shared.document.insert_before(parent, node, anchor);
            c.parent = Some(parent);
        }
        true
    }

    fn unmount_stale(&self, element: &Element, ctx: &ContextRef) {
        let keep: IndexSet<ChildKey> = match element {
            Element::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| list_key(item, index))
                .collect(),
            Element::Fragment(_) | Element::Host(_) | Element::Component(_) => {
                std::iter::once(element.key().cloned()).collect()
            }
            _ => IndexSet::new(),
        };
        let stale: Vec<ContextRef> = ctx
            .borrow()
            .children
            .iter()
            .filter(|(key, _)| !keep.contains(*key))
            .map(|(_, child)| Rc::clone(child))
            .collect();
        for child in &stale {
            self.unmount(child, true);
        }

        let keeps_hooks = match (element, &ctx.borrow().element) {
            (Element::Component(next), Some(Element::Component(last))) => {
                next.component().ptr_eq(last.component())
            }
            (Element::Component(_), _) => true,
            _ => false,
        };
        if !keeps_hooks {
            self.unmount(ctx, false);
        }
    }

    /// Release hook slots of `ctx` (and of its subtree when `recursive`).
    ///
    /// Cleanups are deferred to the commit phase: children first, and each
    /// context's slots in reverse acquisition order.
    pub(crate) fn unmount(&self, ctx: &ContextRef, recursive: bool) {
        if recursive {
            let children: Vec<ContextRef> = ctx.borrow().children.values().cloned().collect();
            for child in &children {
                self.unmount(child, true);
            }
        }
        let released = ctx.borrow_mut().take_hooks();
        if released.is_empty() {
            return;
        }
        debug!(slots = released.len(), key = ?ctx.borrow().key, "releasing hook slots");
        self.shared.queue.defer(move || {
            for slot in released.into_iter().rev() {
                slot.release();
            }
            Ok(())
        });
    }

    /// Detach the old node for in-place replacement when it lives in
    /// `parent`. The node itself stays attached until [`Self::place`].
    fn take_replaceable(&self, ctx: &ContextRef, parent: NodeId) -> Option<NodeId> {
        let mut c = ctx.borrow_mut();
        let old = c.node?;
        if c.parent != Some(parent) {
            return None;
        }
        c.next_sibling = self.shared.document.next_sibling(old);
        c.parent = None;
        Some(old)
    }

    /// Unmount a whole subtree and remove everything it rendered.
    pub(crate) fn teardown(&self, ctx: &ContextRef) -> Result<()> {
        let _depth = InRender::enter(&self.shared.in_render);
        self.unmount(ctx, true);
        self.remove_all_nodes(ctx)?;
        self.release_nodes(ctx);
        let mut c = ctx.borrow_mut();
        c.element = None;
        c.node = None;
        c.children.clear();
        Ok(())
    }

    /// Step 3.
    fn remove_all_nodes(&self, ctx: &ContextRef) -> Result<Removed> {
        let (attached, node, children) = {
            let c = ctx.borrow();
            (
                c.parent.is_some(),
                c.node,
                c.children.values().cloned().collect::<Vec<_>>(),
            )
        };
        if !attached {
            return Ok(Removed::Nothing);
        }
        if let Some(node) = node {
            let next = self.shared.document.next_sibling(node);
            {
                let mut c = ctx.borrow_mut();
                c.next_sibling = next;
                c.parent = None;
            }
            // may dispatch blur into a listener that borrows `ctx`
            self.shared.document.remove(node)?;
            return Ok(Removed::Before(next));
        }
        let mut removed = None;
        for child in &children {
            if let Removed::Before(next) = self.remove_all_nodes(child)? {
                removed = Some(next);
            }
        }
        // nothing came out: the recorded anchor still holds for every child
        let anchor = removed.unwrap_or_else(|| ctx.borrow().next_sibling);
        propagate_next_sibling(ctx, anchor);
        ctx.borrow_mut().parent = None;
        Ok(removed.map_or(Removed::Nothing, Removed::Before))
    }

    fn place_text(
        &self,
        text: &str,
        parent: NodeId,
        replaced: Option<NodeId>,
        anchor: Option<NodeId>,
    ) -> Result<NodeId> {
        let node = self.shared.document.create_text(text);
        self.count(|stats| stats.nodes_created += 1);
        self.place(parent, node, replaced, anchor)?;
        Ok(node)
    }

    fn place(
        &self,
        parent: NodeId,
        node: NodeId,
        replaced: Option<NodeId>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let document = &self.shared.document;
        match replaced {
            Some(old) if document.parent(old) == Some(parent) => document.replace(parent, node, old),
            _ => {
                document.insert_before(parent, node, anchor);
                Ok(())
            }
        }
    }

    fn restore_focus(&self, ctx: &ContextRef, node: NodeId) -> Result<()> {
        if !self.shared.options.restore_focus || !self.shared.document.is_text_input(node) {
            return Ok(());
        }
        let selection = ctx.borrow().selection_start;
        if let Some(start) = selection {
            trace!(%node, start, "restoring focus");
            self.shared.document.focus(node)?;
            self.shared.document.set_selection_range(node, start, start);
        }
        Ok(())
    }

    /// The context for `key` in the children being built. A key seen twice
    /// in one pass resolves to the same context, so the later element wins.
    fn child_slot(
        &self,
        ctx: &ContextRef,
        children: &mut IndexMap<ChildKey, ContextRef>,
        key: ChildKey,
    ) -> Result<ContextRef> {
        if let Some(existing) = children.get(&key) {
            let shown = key.as_ref().map_or_else(|| "<none>".to_string(), Key::to_string);
            if self.shared.options.strict_keys {
                return Err(Error::DuplicateKey { key: shown });
            }
            warn!(key = %shown, "duplicate key among siblings, last one wins");
            self.count(|stats| stats.key_collisions += 1);
            return Ok(Rc::clone(existing));
        }
        let child = child_context(ctx, &key);
        children.insert(key, Rc::clone(&child));
        Ok(child)
    }

    fn component_rerender(
        &self,
        ctx: &ContextRef,
        element: Rc<ComponentElement>,
        parent: NodeId,
        child: ContextRef,
    ) -> Rerender {
        let reconciler = self.clone();
        let weak = Rc::downgrade(ctx);
        Rc::new(move |force: bool| -> Result<()> {
            let Some(ctx) = weak.upgrade() else { return Ok(()) };
            {
                let mut c = ctx.borrow_mut();
                c.hook_index = 0;
                c.force = force;
            }
            let _frame = RenderGuard::enter(Frame {
                context: Rc::clone(&ctx),
                reconciler: reconciler.clone(),
            });
            trace!(
                component = element.component().name(),
                force,
                depth = stack::depth(),
                "component render"
            );
            reconciler.count(|stats| stats.component_renders += 1);
            let output = element.component().call(element.props());
            ctx.borrow_mut().force = false;
            reconciler.render(&output?, parent, &child)
        })
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("document", &self.shared.document)
            .field("queue", &self.shared.queue)
            .field("options", &self.shared.options)
            .field("in_render", &self.shared.in_render.get())
            .finish()
    }
}

fn list_key(item: &Element, index: usize) -> ChildKey {
    Some(item.key().cloned().unwrap_or(Key::Number(index as i64)))
}
