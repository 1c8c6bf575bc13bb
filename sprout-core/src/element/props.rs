//! Element properties.
//!
//! Props are an ordered map from name to [`PropValue`]. Equality between
//! props is shallow: strings, booleans and numbers compare by value, while
//! styles, handlers, nested elements and opaque values compare by pointer. That is
//! the comparison `memo` uses to decide whether a component may be skipped.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::Element;
use crate::dom::{Event, Listener};
use crate::error::Result;

/// An event listener stored in props.
#[derive(Clone)]
pub struct EventHandler(Listener);

impl EventHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) -> Result<()> {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn listener(&self) -> Listener {
        Rc::clone(&self.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Inline style in one of the accepted shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum Style {
    /// Already-serialized CSS text.
    Inline(String),
    /// camelCase property names to values.
    Map(IndexMap<String, PropValue>),
    /// Several styles concatenated in order.
    List(Vec<Style>),
}

impl Style {
    pub fn new() -> Self {
        Style::Map(IndexMap::new())
    }

    pub fn inline(css: impl Into<String>) -> Self {
        Style::Inline(css.into())
    }

    /// Add a camelCase property. Only valid on a map style; other shapes
    /// are wrapped into a list with the new entry appended.
    pub fn set(self, name: &str, value: impl Into<PropValue>) -> Self {
        match self {
            Style::Map(mut map) => {
                map.insert(name.to_string(), value.into());
                Style::Map(map)
            }
            other => {
                let mut map = IndexMap::new();
                map.insert(name.to_string(), value.into());
                Style::List(vec![other, Style::Map(map)])
            }
        }
    }

    /// Serialize to a CSS declaration string.
    ///
    /// Map entries whose value is null or `false` are dropped, names are
    /// converted to kebab-case and declarations are joined with `;`.
    pub fn to_css(&self) -> String {
        match self {
            Style::Inline(css) => css.clone(),
            Style::Map(map) => map
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_attribute()
                        .map(|value| format!("{}:{}", kebab_case(name), value))
                })
                .collect::<Vec<_>>()
                .join(";"),
            Style::List(styles) => styles
                .iter()
                .map(Style::to_css)
                .filter(|css| !css.is_empty())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Format a number the way it appears in text and attributes.
///
/// Uses the shortest digits that round-trip, switching to exponent form
/// below `1e-6` and from `1e21` up (`1e+21`, `1.5e-7`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits as `d.ddde<exp>`
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if n > 0 { '+' } else { '-' });
        out.push_str(&(n - 1).abs().to_string());
    }
    out
}

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Style(Rc<Style>),
    Handler(EventHandler),
    Element(Element),
    Any(Rc<dyn Any>),
}

impl PropValue {
    /// Wrap an arbitrary value; it compares by pointer.
    pub fn any<T: 'static>(value: T) -> Self {
        PropValue::Any(Rc::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            PropValue::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            PropValue::Any(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// The string form used for an attribute, or `None` when the attribute
    /// should be left off.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Null | PropValue::Bool(false) => None,
            PropValue::Bool(true) => Some("true".to_string()),
            PropValue::Number(n) => Some(format_number(*n)),
            PropValue::Str(s) => Some(s.to_string()),
            PropValue::Style(style) => Some(style.to_css()),
            PropValue::Handler(_) | PropValue::Element(_) | PropValue::Any(_) => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            // same-value equality: NaN equals itself, 0 and -0 differ
            (PropValue::Number(a), PropValue::Number(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => Rc::ptr_eq(a, b),
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Element(a), PropValue::Element(b)) => a.is_same(b),
            (PropValue::Any(a), PropValue::Any(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Number(n) => write!(f, "{n}"),
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Style(style) => fmt::Debug::fmt(style, f),
            PropValue::Handler(handler) => fmt::Debug::fmt(handler, f),
            PropValue::Element(element) => fmt::Debug::fmt(element, f),
            PropValue::Any(value) => write!(f, "Any({:p})", Rc::as_ptr(value) as *const ()),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<Style> for PropValue {
    fn from(value: Style) -> Self {
        PropValue::Style(Rc::new(value))
    }
}

impl From<Rc<Style>> for PropValue {
    fn from(value: Rc<Style>) -> Self {
        PropValue::Style(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<Element> for PropValue {
    fn from(value: Element) -> Self {
        PropValue::Element(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// JSON scalars map onto their prop counterparts; arrays and objects are
/// kept whole as an opaque value.
impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PropValue::Null,
            Value::Bool(b) => PropValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(PropValue::Null, PropValue::Number),
            Value::String(s) => PropValue::Str(s.into()),
            other @ (Value::Array(_) | Value::Object(_)) => PropValue::any(other),
        }
    }
}

/// Ordered property map of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props(IndexMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<PropValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(PropValue::as_number)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_bool)
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.get(name).and_then(PropValue::as_element)
    }

    pub fn handler(&self, name: &str) -> Option<&EventHandler> {
        self.get(name).and_then(PropValue::as_handler)
    }

    pub fn downcast<T: 'static>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(PropValue::downcast_ref)
    }

    /// Children passed to a component, or [`Element::Empty`].
    pub fn children(&self) -> Element {
        self.element("children").cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build props from a JSON object. Non-object values give empty props.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(
                map.into_iter()
                    .map(|(name, value)| (name, PropValue::from(value)))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
