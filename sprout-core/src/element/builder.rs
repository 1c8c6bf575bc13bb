//! Element constructors.
//!
//! ```
//! use sprout_core::element::{h, Component, Element, Props};
//!
//! let greeting = Component::new("Greeting", |props: &Props| {
//!     let name = props.str("name").unwrap_or("world");
//!     Ok(h("p").child(format!("hello {name}")).build())
//! });
//!
//! let page: Element = h("div")
//!     .class_name("page")
//!     .child(greeting.element(Props::new().with("name", "sprout")))
//!     .build();
//! ```

use std::fmt;
use std::rc::Rc;

use super::{
    ComponentElement, Element, EventHandler, Fragment, HostElement, Key, PropValue, Props, Style,
};
use crate::dom::Event;
use crate::error::Result;

/// Signature of a component's render function.
pub type RenderFn = dyn Fn(&Props) -> Result<Element>;

/// A named render function.
///
/// Components are compared by pointer: two components created from the same
/// closure with separate calls to [`Component::new`] are different
/// components, and switching between them remounts the subtree.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props) -> Result<Element> + 'static,
    {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, props: &Props) -> Result<Element> {
        (self.render)(props)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }

    /// An unkeyed element rendering this component.
    pub fn element(&self, props: Props) -> Element {
        Element::Component(Rc::new(ComponentElement {
            component: self.clone(),
            key: None,
            props,
        }))
    }

    pub fn keyed(&self, key: impl Into<Key>, props: Props) -> Element {
        Element::Component(Rc::new(ComponentElement {
            component: self.clone(),
            key: Some(key.into()),
            props,
        }))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// Start building a host element.
pub fn h(tag: &str) -> HostBuilder {
    HostBuilder {
        tag: tag.into(),
        key: None,
        props: Props::new(),
        children: Vec::new(),
    }
}

/// Group children without a wrapper node.
pub fn fragment<I, E>(children: I) -> Element
where
    I: IntoIterator<Item = E>,
    E: Into<Element>,
{
    Element::Fragment(Rc::new(Fragment {
        key: None,
        children: pack(children.into_iter().map(Into::into).collect()),
    }))
}

pub fn fragment_keyed<I, E>(key: impl Into<Key>, children: I) -> Element
where
    I: IntoIterator<Item = E>,
    E: Into<Element>,
{
    Element::Fragment(Rc::new(Fragment {
        key: Some(key.into()),
        children: pack(children.into_iter().map(Into::into).collect()),
    }))
}

// zero children is empty, one is itself, more become a list
fn pack(mut children: Vec<Element>) -> Element {
    match children.len() {
        0 => Element::Empty,
        1 => children.pop().unwrap_or_default(),
        _ => Element::List(children.into()),
    }
}

/// Builder for [`HostElement`].
#[derive(Debug)]
pub struct HostBuilder {
    tag: Rc<str>,
    key: Option<Key>,
    props: Props,
    children: Vec<Element>,
}

impl HostBuilder {
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn class_name(self, class: impl Into<PropValue>) -> Self {
        self.prop("className", class)
    }

    pub fn style(self, style: Style) -> Self {
        self.prop("style", style)
    }

    /// Listen to `event` (a lowercase event name such as `"click"`).
    pub fn on<F>(self, event: &str, handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        let mut name = String::with_capacity(event.len() + 2);
        name.push_str("on");
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
        self.prop(&name, EventHandler::new(handler))
    }

    pub fn on_click<F>(self, handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        self.on("click", handler)
    }

    /// Change handler; on controlled inputs this also keeps the caret
    /// position across re-renders.
    pub fn on_change<F>(self, handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        self.on("change", handler)
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Element {
        Element::Host(Rc::new(HostElement {
            tag: self.tag,
            key: self.key,
            props: self.props,
            children: pack(self.children),
        }))
    }
}

impl From<HostBuilder> for Element {
    fn from(builder: HostBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_packed() {
        let none = h("div").build();
        let one = h("div").child("a").build();
        let many = h("div").child("a").child("b").build();

        let Element::Host(none) = none else { panic!("host") };
        assert!(matches!(none.children(), Element::Empty));
        let Element::Host(one) = one else { panic!("host") };
        assert!(matches!(one.children(), Element::Text(_)));
        let Element::Host(many) = many else { panic!("host") };
        assert!(matches!(many.children(), Element::List(items) if items.len() == 2));
    }

    #[test]
    fn on_builds_camel_case_prop_names() {
        let element = h("button")
            .on_click(|_: &Event| -> Result<()> { Ok(()) })
            .on("mousedown", |_: &Event| -> Result<()> { Ok(()) })
            .build();
        let Element::Host(host) = element else { panic!("host") };
        assert!(host.props().handler("onClick").is_some());
        assert!(host.props().handler("onMousedown").is_some());
    }

    #[test]
    fn component_elements_carry_props_and_key() {
        let component = Component::new("Label", |props: &Props| {
            Ok(Element::from(props.str("text").unwrap_or_default().to_string()))
        });
        let element = component.keyed("k", Props::new().with("text", "hi"));
        let Element::Component(inner) = &element else { panic!("component") };
        assert!(inner.component().ptr_eq(&component));
        assert_eq!(inner.key(), Some(&Key::from("k")));
        let rendered = inner.component().call(inner.props()).unwrap();
        assert!(rendered.is_same(&Element::from("hi")));
    }
}
