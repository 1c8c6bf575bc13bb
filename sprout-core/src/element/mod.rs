//! Elements
//!
//! An [`Element`] is the immutable description of desired output passed to
//! the renderer. Elements are cheap to clone: every variant that owns
//! children sits behind an `Rc`, and the reconciler relies on that pointer
//! identity to skip subtrees that did not change (see [`Element::is_same`]).
//!
//! # Shapes
//!
//! | Variant      | Renders                                             |
//! |--------------|-----------------------------------------------------|
//! | `Empty`      | nothing                                             |
//! | `Bool`       | nothing (lets `cond && el` patterns compile down)   |
//! | `Text`       | a text node                                         |
//! | `Number`     | a text node with the number's string form           |
//! | `List`       | each item, keyed by its own key or its position     |
//! | `Fragment`   | its children, without a wrapper node                |
//! | `Host`       | an output-tree element with attributes and children |
//! | `Component`  | whatever the component function returns             |

mod builder;
mod key;
mod props;

pub use builder::{fragment, fragment_keyed, h, Component, HostBuilder, RenderFn};
pub use key::Key;
pub use props::{format_number, EventHandler, PropValue, Props, Style};

use std::fmt;
use std::rc::Rc;

/// A declarative description of output.
#[derive(Clone, Default)]
pub enum Element {
    #[default]
    Empty,
    Bool(bool),
    Text(Rc<str>),
    Number(f64),
    List(Rc<[Element]>),
    Fragment(Rc<Fragment>),
    Host(Rc<HostElement>),
    Component(Rc<ComponentElement>),
}

/// Transparent grouping of children.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub(crate) key: Option<Key>,
    pub(crate) children: Element,
}

impl Fragment {
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn children(&self) -> &Element {
        &self.children
    }
}

/// An element naming a concrete output-tree node.
#[derive(Clone, Debug)]
pub struct HostElement {
    pub(crate) tag: Rc<str>,
    pub(crate) key: Option<Key>,
    pub(crate) props: Props,
    pub(crate) children: Element,
}

impl HostElement {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &Element {
        &self.children
    }
}

/// An element that invokes a component function.
#[derive(Clone, Debug)]
pub struct ComponentElement {
    pub(crate) component: Component,
    pub(crate) key: Option<Key>,
    pub(crate) props: Props,
}

impl ComponentElement {
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }
}

impl Element {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Element::Text(text.into())
    }

    /// A list of elements; items without a key are keyed by position.
    pub fn list<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        Element::List(items.into_iter().map(Into::into).collect())
    }

    /// The user-supplied key, if the element can carry one.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Element::Fragment(fragment) => fragment.key.as_ref(),
            Element::Host(host) => host.key.as_ref(),
            Element::Component(component) => component.key.as_ref(),
            _ => None,
        }
    }

    /// Identity comparison used by the reconciler's fast path.
    ///
    /// Text and numbers compare by value, every other shape by pointer.
    /// Two structurally equal elements built separately are *not* the same.
    pub fn is_same(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Empty, Element::Empty) => true,
            (Element::Bool(a), Element::Bool(b)) => a == b,
            (Element::Text(a), Element::Text(b)) => a == b,
            (Element::Number(a), Element::Number(b)) => a == b,
            (Element::List(a), Element::List(b)) => Rc::ptr_eq(a, b),
            (Element::Fragment(a), Element::Fragment(b)) => Rc::ptr_eq(a, b),
            (Element::Host(a), Element::Host(b)) => Rc::ptr_eq(a, b),
            (Element::Component(a), Element::Component(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the element's shape, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Empty => "empty",
            Element::Bool(_) => "bool",
            Element::Text(_) => "text",
            Element::Number(_) => "number",
            Element::List(_) => "list",
            Element::Fragment(_) => "fragment",
            Element::Host(_) => "host",
            Element::Component(_) => "component",
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Empty => f.write_str("Empty"),
            Element::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Element::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Element::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Element::List(items) => f.debug_list().entries(items.iter()).finish(),
            Element::Fragment(fragment) => fmt::Debug::fmt(fragment, f),
            Element::Host(host) => fmt::Debug::fmt(host, f),
            Element::Component(component) => fmt::Debug::fmt(component, f),
        }
    }
}

impl From<()> for Element {
    fn from(_: ()) -> Self {
        Element::Empty
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::Bool(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Text(value.into())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Text(value.into())
    }
}

impl From<Rc<str>> for Element {
    fn from(value: Rc<str>) -> Self {
        Element::Text(value)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::Number(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::Number(f64::from(value))
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::Number(value as f64)
    }
}

impl From<usize> for Element {
    fn from(value: usize) -> Self {
        Element::Number(value as f64)
    }
}

impl From<Vec<Element>> for Element {
    fn from(items: Vec<Element>) -> Self {
        Element::List(items.into())
    }
}

impl<E: Into<Element>> From<Option<E>> for Element {
    fn from(value: Option<E>) -> Self {
        value.map_or(Element::Empty, Into::into)
    }
}
