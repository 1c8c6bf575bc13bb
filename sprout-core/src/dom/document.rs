//! In-memory document.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::Event;
use crate::error::Result;

/// Callback registered on a node with [`Document::add_event_listener`].
pub type Listener = Rc<dyn Fn(&Event) -> Result<()>>;

/// Handle to a node owned by a [`Document`].
///
/// Slots of released nodes are reused; the generation tells a stale handle
/// apart from the node that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Tags serialized without a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, Listener)>,
    /// Value edited by the user; falls back to the `value` attribute.
    value: Option<String>,
    selection: Option<(usize, usize)>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
            value: None,
            selection: None,
        }
    }
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: NodeId,
    focused: Option<NodeId>,
    mutations: u64,
}

impl Tree {
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.mutations += 1;
        let data = Some(NodeData::new(kind));
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.data = data;
                return NodeId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, data });
        NodeId { index, generation: 0 }
    }

    /// Free `id` and everything below it, handing back the freed data.
    fn release(&mut self, id: NodeId) -> Vec<NodeData> {
        self.detach(id);
        let mut freed = Vec::new();
        let mut pending = vec![id];
        while let Some(node) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(node.index as usize)
                .filter(|slot| slot.generation == node.generation)
            else {
                continue;
            };
            let Some(data) = slot.data.take() else { continue };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
            if self.focused == Some(node) {
                self.focused = None;
            }
            pending.extend(data.children.iter().copied());
            freed.push(data);
        }
        freed
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
        self.mutations += 1;
    }

    fn contains(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.get(id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn value_of(&self, id: NodeId) -> Option<String> {
        let node = self.get(id)?;
        match &node.kind {
            NodeKind::Element { attributes, .. } => node
                .value
                .clone()
                .or_else(|| attributes.get("value").cloned()),
            NodeKind::Text(_) => None,
        }
    }

    fn listeners_for(&self, id: NodeId, kind: &str) -> Vec<Listener> {
        self.get(id).map_or_else(Vec::new, |node| {
            node.listeners
                .iter()
                .filter(|(event, _)| event == kind)
                .map(|(_, listener)| Rc::clone(listener))
                .collect()
        })
    }

    fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or_default()
    }
}

/// A live output tree.
///
/// Cloning the handle shares the tree. Nodes stay addressable by their
/// [`NodeId`] until [`Document::release`] frees them; detached nodes simply
/// have no parent. Operations on a released node do nothing.
#[derive(Clone)]
pub struct Document {
    tree: Rc<RefCell<Tree>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("Document")
            .field("nodes", &(tree.slots.len() - tree.free.len()))
            .field("slots", &tree.slots.len())
            .field("focused", &tree.focused)
            .field("mutations", &tree.mutations)
            .finish()
    }
}

impl Document {
    /// Create a document containing an empty `<body>`.
    pub fn new() -> Self {
        let mut tree = Tree {
            slots: Vec::new(),
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
            mutations: 0,
        };
        tree.body = tree.alloc(NodeKind::Element {
            tag: "body".to_string(),
            attributes: IndexMap::new(),
        });
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    pub fn body(&self) -> NodeId {
        self.tree.borrow().body
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.borrow_mut().alloc(NodeKind::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
        })
    }

    pub fn create_text(&self, data: &str) -> NodeId {
        self.tree.borrow_mut().alloc(NodeKind::Text(data.to_string()))
    }

    /// Detach `node` and free it together with its descendants.
    ///
    /// Listeners go with the node. Its slot is reused by later nodes, and
    /// the old [`NodeId`] stops matching anything. No events are dispatched.
    pub fn release(&self, node: NodeId) {
        let freed = {
            let mut tree = self.tree.borrow_mut();
            if node == tree.body {
                return;
            }
            tree.release(node)
        };
        trace!(%node, nodes = freed.len(), "release");
        // listeners may own document handles; drop them outside the borrow
        drop(freed);
    }

    /// Whether `node` has not been released.
    pub fn is_live(&self, node: NodeId) -> bool {
        self.tree.borrow().get(node).is_some()
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        let tree = self.tree.borrow();
        tree.slots.len() - tree.free.len()
    }

    /// Tag name of an element node, `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether the node is an `<input>` or `<textarea>`.
    pub fn is_text_input(&self, node: NodeId) -> bool {
        matches!(
            self.tree.borrow().get(node).map(|node| &node.kind),
            Some(NodeKind::Element { tag, .. }) if tag == "input" || tag == "textarea"
        )
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().get(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.borrow().children_of(node).to_vec()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let tree = self.tree.borrow();
        let parent = tree.get(node)?.parent?;
        let siblings = tree.children_of(parent);
        let index = siblings.iter().position(|child| *child == node)?;
        siblings.get(index + 1).copied()
    }

    /// Insert `node` into `parent` before `anchor`.
    ///
    /// The node is first detached from wherever it currently lives. When the
    /// anchor is absent or not a child of `parent`, the node is appended.
    pub fn insert_before(&self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) {
        let mut tree = self.tree.borrow_mut();
        if tree.get(parent).is_none() || tree.get(node).is_none() {
            return;
        }
        tree.detach(node);
        let index = anchor.and_then(|anchor| tree.children_of(parent).iter().position(|child| *child == anchor));
        if let Some(data) = tree.get_mut(parent) {
            match index {
                Some(index) => data.children.insert(index, node),
                None => data.children.push(node),
            }
        }
        if let Some(data) = tree.get_mut(node) {
            data.parent = Some(parent);
        }
        tree.mutations += 1;
        trace!(%parent, %node, ?anchor, "insert_before");
    }

    /// Detach a node from its parent.
    ///
    /// Removing the focused node (or one of its ancestors) also blurs it,
    /// which dispatches `blur` to its listeners.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        let blurred = {
            let mut tree = self.tree.borrow_mut();
            let blurred = tree.focused.filter(|focused| tree.contains(node, *focused));
            if blurred.is_some() {
                tree.focused = None;
            }
            tree.detach(node);
            blurred
        };
        match blurred {
            Some(focused) => self.dispatch(focused, "blur"),
            None => Ok(()),
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        self.insert_before(parent, new, Some(old));
        self.remove(old)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut tree = self.tree.borrow_mut();
        if let Some(NodeKind::Element { attributes, .. }) = tree.get_mut(node).map(|node| &mut node.kind) {
            attributes.insert(name.to_string(), value.to_string());
            tree.mutations += 1;
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.tree.borrow().get(node)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    /// Data of a text node.
    pub fn text(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().get(node)?.kind {
            NodeKind::Text(data) => Some(data.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        fn collect(tree: &Tree, node: NodeId, out: &mut String) {
            match tree.get(node).map(|data| &data.kind) {
                Some(NodeKind::Text(data)) => out.push_str(data),
                Some(NodeKind::Element { .. }) => {
                    for child in tree.children_of(node) {
                        collect(tree, *child, out);
                    }
                }
                None => {}
            }
        }
        let mut out = String::new();
        collect(&self.tree.borrow(), node, &mut out);
        out
    }

    /// Current value of an input: what the user typed, else the `value` attribute.
    pub fn value(&self, node: NodeId) -> Option<String> {
        self.tree.borrow().value_of(node)
    }

    pub fn add_event_listener(&self, node: NodeId, event: &str, listener: Listener) {
        let mut tree = self.tree.borrow_mut();
        if let Some(data) = tree.get_mut(node) {
            data.listeners.push((event.to_string(), listener));
            tree.mutations += 1;
        }
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.tree.borrow().get(node).map_or(0, |node| node.listeners.len())
    }

    /// Deliver an event of `kind` to the node's listeners, in registration order.
    ///
    /// Events do not bubble. The first listener error stops delivery.
    pub fn dispatch(&self, node: NodeId, kind: &str) -> Result<()> {
        let (listeners, event) = {
            let tree = self.tree.borrow();
            let selection = tree.get(node).and_then(|data| data.selection).map(|(start, _)| start);
            let event = Event::new(kind, node).with_input_state(tree.value_of(node), selection);
            (tree.listeners_for(node, kind), event)
        };
        trace!(%node, kind, listeners = listeners.len(), "dispatch");
        for listener in listeners {
            listener(&event)?;
        }
        Ok(())
    }

    pub fn click(&self, node: NodeId) -> Result<()> {
        self.dispatch(node, "click")
    }

    /// Move focus to `node`, blurring the previously focused node.
    pub fn focus(&self, node: NodeId) -> Result<()> {
        let previous = self.tree.borrow().focused;
        if previous == Some(node) || !self.is_live(node) {
            return Ok(());
        }
        self.blur()?;
        self.tree.borrow_mut().focused = Some(node);
        self.dispatch(node, "focus")
    }

    /// Clear focus, dispatching `blur` to the node that had it.
    pub fn blur(&self) -> Result<()> {
        let previous = self.tree.borrow_mut().focused.take();
        match previous {
            Some(node) => self.dispatch(node, "blur"),
            None => Ok(()),
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.tree.borrow().focused
    }

    pub fn set_selection_range(&self, node: NodeId, start: usize, end: usize) {
        if let Some(data) = self.tree.borrow_mut().get_mut(node) {
            data.selection = Some((start, end));
        }
    }

    pub fn selection_start(&self, node: NodeId) -> Option<usize> {
        self.tree.borrow().get(node)?.selection.map(|(start, _)| start)
    }

    /// Simulate the user editing a text input: focus it, replace its value,
    /// place the caret, and dispatch `input`.
    pub fn type_text(&self, node: NodeId, value: &str, caret: usize) -> Result<()> {
        self.focus(node)?;
        if let Some(data) = self.tree.borrow_mut().get_mut(node) {
            data.value = Some(value.to_string());
            data.selection = Some((caret, caret));
        }
        self.dispatch(node, "input")
    }

    /// Elements below `root` with the given tag, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        fn walk(tree: &Tree, node: NodeId, tag: &str, out: &mut Vec<NodeId>) {
            for child in tree.children_of(node) {
                if matches!(
                    tree.get(*child).map(|data| &data.kind),
                    Some(NodeKind::Element { tag: t, .. }) if t == tag
                ) {
                    out.push(*child);
                }
                walk(tree, *child, tag, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.tree.borrow(), root, tag, &mut out);
        out
    }

    /// HTML serialization of the node's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        let tree = self.tree.borrow();
        let mut out = String::new();
        for child in tree.children_of(node) {
            write_html(&tree, *child, &mut out);
        }
        out
    }

    /// Number of mutations applied since the document was created.
    pub fn mutation_count(&self) -> u64 {
        self.tree.borrow().mutations
    }
}

fn write_html(tree: &Tree, node: NodeId, out: &mut String) {
    let Some(data) = tree.get(node) else { return };
    match &data.kind {
        NodeKind::Text(text) => escape_into(text, false, out),
        NodeKind::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&tag.as_str()) {
                return;
            }
            for child in &data.children {
                write_html(tree, *child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn insert_before_orders_children() {
        let doc = Document::new();
        let body = doc.body();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");

        doc.insert_before(body, a, None);
        doc.insert_before(body, c, None);
        doc.insert_before(body, b, Some(c));

        assert_eq!(doc.inner_html(body), "abc");
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(c), None);
    }

    #[test]
    fn released_slots_are_reused() {
        let doc = Document::new();
        let body = doc.body();
        let p = doc.create_element("p");
        let text = doc.create_text("old");
        doc.insert_before(p, text, None);
        doc.insert_before(body, p, None);
        doc.add_event_listener(p, "click", Rc::new(|_: &Event| -> Result<()> { Ok(()) }));
        assert_eq!(doc.node_count(), 3);

        doc.release(p);
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.inner_html(body), "");
        assert!(!doc.is_live(text));

        let reused = doc.create_text("new");
        assert_ne!(reused, p);
        assert_ne!(reused, text);
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.listener_count(p), 0);
        assert_eq!(doc.text(text), None);
        // stale handles are inert
        doc.insert_before(body, p, None);
        doc.click(p).unwrap();
        assert_eq!(doc.inner_html(body), "");

        doc.release(body);
        assert!(doc.is_live(body));
    }

    #[test]
    fn foreign_anchor_appends() {
        let doc = Document::new();
        let body = doc.body();
        let div = doc.create_element("div");
        let stray = doc.create_text("stray");
        doc.insert_before(div, stray, None);

        let text = doc.create_text("x");
        doc.insert_before(body, div, None);
        doc.insert_before(body, text, Some(stray));

        assert_eq!(doc.inner_html(body), "<div>stray</div>x");
    }

    #[test]
    fn inserting_moves_between_parents() {
        let doc = Document::new();
        let body = doc.body();
        let p = doc.create_element("p");
        let text = doc.create_text("moved");
        doc.insert_before(body, p, None);
        doc.insert_before(body, text, None);

        doc.insert_before(p, text, None);

        assert_eq!(doc.parent(text), Some(p));
        assert_eq!(doc.inner_html(body), "<p>moved</p>");
    }

    #[test]
    fn serializes_attributes_and_escapes() {
        let doc = Document::new();
        let body = doc.body();
        let button = doc.create_element("button");
        doc.set_attribute(button, "type", "button");
        doc.set_attribute(button, "title", "say \"hi\"");
        let label = doc.create_text("a < b & c");
        doc.insert_before(button, label, None);
        doc.insert_before(body, button, None);
        let input = doc.create_element("input");
        doc.insert_before(body, input, None);

        assert_eq!(
            doc.inner_html(body),
            "<button type=\"button\" title=\"say &quot;hi&quot;\">a &lt; b &amp; c</button><input>"
        );
    }

    #[test]
    fn removing_focused_node_dispatches_blur() {
        let doc = Document::new();
        let body = doc.body();
        let form = doc.create_element("form");
        let input = doc.create_element("input");
        doc.insert_before(body, form, None);
        doc.insert_before(form, input, None);

        let blurs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&blurs);
        doc.add_event_listener(
            input,
            "blur",
            Rc::new(move |_: &Event| -> Result<()> {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        );

        doc.focus(input).unwrap();
        doc.remove(form).unwrap();

        assert_eq!(doc.focused(), None);
        assert_eq!(blurs.get(), 1);
    }

    #[test]
    fn type_text_reports_caret() {
        let doc = Document::new();
        let input = doc.create_element("input");
        doc.insert_before(doc.body(), input, None);

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        doc.add_event_listener(
            input,
            "input",
            Rc::new(move |event: &Event| -> Result<()> {
                *sink.borrow_mut() = Some((event.value().map(str::to_string), event.selection_start()));
                Ok(())
            }),
        );

        doc.type_text(input, "hello", 3).unwrap();

        assert_eq!(*seen.borrow(), Some((Some("hello".to_string()), Some(3))));
        assert_eq!(doc.focused(), Some(input));
    }

    #[test]
    fn listeners_may_reenter_the_document() {
        let doc = Document::new();
        let body = doc.body();
        let button = doc.create_element("button");
        doc.insert_before(body, button, None);

        let handle = doc.clone();
        doc.add_event_listener(
            button,
            "click",
            Rc::new(move |_: &Event| -> Result<()> {
                let text = handle.create_text("clicked");
                handle.insert_before(handle.body(), text, None);
                Ok(())
            }),
        );
        doc.click(button).unwrap();

        assert_eq!(doc.text_content(body), "clicked");
    }

    #[test]
    fn elements_by_tag_in_document_order() {
        let doc = Document::new();
        let body = doc.body();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let p = doc.create_element("p");
        doc.insert_before(body, outer, None);
        doc.insert_before(outer, inner, None);
        doc.insert_before(body, p, None);

        assert_eq!(doc.elements_by_tag(body, "div"), vec![outer, inner]);
        assert_eq!(doc.elements_by_tag(body, "p"), vec![p]);
    }
}
