//! Integration Tests for Atom Subscriptions
//!
//! These tests drive components through `use_atom` the way a user would:
//! render, let the commit phase subscribe, then click.

use sprout_core::store::Getter;
use sprout_core::{
    fragment, h, use_atom, Atom, Component, Document, Element, Error, NodeId, Props, Renderer,
    Store, Update,
};

fn setup() -> (Document, NodeId, Renderer) {
    let document = Document::new();
    let body = document.body();
    let renderer = Renderer::new(document.clone(), Store::new());
    (document, body, renderer)
}

fn counter(count: &Atom<i32>) -> Component {
    let count = count.clone();
    Component::new("Counter", move |_: &Props| {
        let (value, set) = use_atom(&count)?;
        Ok(fragment([
            h("p").child(value).build(),
            h("button")
                .prop("type", "button")
                .on_click(move |_| set.update(|c: &i32| c + 1))
                .child("button")
                .build(),
        ]))
    })
}

fn button(document: &Document, index: usize) -> NodeId {
    document.elements_by_tag(document.body(), "button")[index]
}

/// Test that the first render shows the atom's initial value.
#[test]
fn default_value() {
    let (document, body, mut renderer) = setup();
    let count = Atom::new(1);
    let display = Component::new("Counter", move |_: &Props| {
        let (value, _) = use_atom(&count)?;
        Ok(h("p").child(value).build())
    });
    renderer
        .render(h("div").child("body").child(display.element(Props::new())), body)
        .unwrap();
    assert_eq!(document.inner_html(body), "<div>body<p>1</p></div>");
}

/// Test the round trip from a click through the setter to new output.
#[test]
fn increment_value() {
    let (document, body, mut renderer) = setup();
    let count = Atom::new(1);
    renderer
        .render(
            h("div").child("body").child(counter(&count).element(Props::new())),
            body,
        )
        .unwrap();
    assert_eq!(
        document.inner_html(body),
        r#"<div>body<p>1</p><button type="button">button</button></div>"#
    );

    // subscriptions are wired in the commit phase
    renderer.flush().unwrap();
    document.click(button(&document, 0)).unwrap();
    assert_eq!(
        document.inner_html(body),
        r#"<div>body<p>2</p><button type="button">button</button></div>"#
    );
}

/// Test that two components reading one atom both update, and the text
/// between them stays where it was.
#[test]
fn flat_two_counters() {
    let (document, body, mut renderer) = setup();
    let count = Atom::new(1);
    let component = counter(&count);
    renderer
        .render(
            h("div")
                .child("body")
                .child(component.element(Props::new()))
                .child("another")
                .child(component.element(Props::new())),
            body,
        )
        .unwrap();
    let counter_html = |n: i32| format!(r#"<p>{n}</p><button type="button">button</button>"#);
    assert_eq!(
        document.inner_html(body),
        format!("<div>body{}another{}</div>", counter_html(1), counter_html(1))
    );

    renderer.flush().unwrap();
    document.click(button(&document, 1)).unwrap();
    assert_eq!(
        document.inner_html(body),
        format!("<div>body{}another{}</div>", counter_html(2), counter_html(2))
    );
}

/// Test that conditional output appears and disappears in place.
#[test]
fn mount_and_unmount() {
    let (document, body, mut renderer) = setup();
    let visible = Atom::new(true);
    let toggle = Component::new("Toggle", move |_: &Props| {
        let (shown, set) = use_atom(&visible)?;
        Ok(fragment([
            Element::from(shown.then_some("visible")),
            h("button")
                .prop("type", "button")
                .on_click(move |_| set.update(|v: &bool| !v))
                .child("toggle")
                .build(),
        ]))
    });
    renderer
        .render(fragment([toggle.element(Props::new())]), body)
        .unwrap();
    assert_eq!(
        document.inner_html(body),
        r#"visible<button type="button">toggle</button>"#
    );

    renderer.flush().unwrap();
    document.click(button(&document, 0)).unwrap();
    assert_eq!(document.inner_html(body), r#"<button type="button">toggle</button>"#);

    renderer.flush().unwrap();
    document.click(button(&document, 0)).unwrap();
    assert_eq!(
        document.inner_html(body),
        r#"visible<button type="button">toggle</button>"#
    );
}

/// Test that writes from outside any component reach subscribed output.
#[test]
fn external_writes_rerender() {
    let (document, body, mut renderer) = setup();
    let store = renderer.store().clone();
    let name = Atom::new("ada".to_string());
    let tracked = name.clone();
    let greeting = Component::new("Greeting", move |_: &Props| {
        let (name, _) = use_atom(&tracked)?;
        Ok(h("p").child(format!("hello {name}")).build())
    });
    renderer.render(greeting.element(Props::new()), body).unwrap();
    renderer.flush().unwrap();

    store.write(&name, Update::Set("grace".to_string())).unwrap();
    assert_eq!(document.inner_html(body), "<p>hello grace</p>");
}

/// Test that a derived atom follows its source.
#[test]
fn derived_atom_follows_source() {
    let (document, body, mut renderer) = setup();
    let count = Atom::new(1);
    let source = count.clone();
    let doubled = Atom::derived(move |get: &Getter<'_>| Ok(get.get(&source)? * 2));
    let view = Component::new("Doubled", move |_: &Props| {
        Ok(Element::from(use_atom(&doubled)?.0))
    });
    renderer
        .render(
            fragment([counter(&count).element(Props::new()), view.element(Props::new())]),
            body,
        )
        .unwrap();
    renderer.flush().unwrap();

    document.click(button(&document, 0)).unwrap();
    assert_eq!(
        document.inner_html(body),
        r#"<p>2</p><button type="button">button</button>4"#
    );
}

/// Test that a failing derived read aborts the render with an error.
#[test]
fn failing_derived_read_is_an_error() {
    let (_, body, mut renderer) = setup();
    let remote = Atom::new(0).id();
    let broken: Atom<i32> =
        Atom::derived(move |_: &Getter<'_>| Err(Error::atom_read(remote, "offline")));
    let view = Component::new("Broken", move |_: &Props| {
        Ok(Element::from(use_atom(&broken)?.0))
    });
    let err = renderer.render(view.element(Props::new()), body).unwrap_err();
    assert!(matches!(err, Error::AtomRead { ref message, .. } if message == "offline"));
}

/// Test that replaced components drop their subscriptions.
#[test]
fn unmounted_components_stop_listening() {
    let (document, body, mut renderer) = setup();
    let store = renderer.store().clone();
    let count = Atom::new(0);
    renderer
        .render(counter(&count).element(Props::new()), body)
        .unwrap();
    renderer.flush().unwrap();
    assert_eq!(store.subscriber_count(&count), 1);

    renderer.render(h("p").child("gone"), body).unwrap();
    renderer.flush().unwrap();
    assert_eq!(store.subscriber_count(&count), 0);

    store.write(&count, Update::Set(9)).unwrap();
    assert_eq!(document.inner_html(body), "<p>gone</p>");
}

fn maybe(flag: &Atom<bool>, text: &'static str) -> Component {
    let flag = flag.clone();
    Component::new("Maybe", move |_: &Props| {
        let (shown, _) = use_atom(&flag)?;
        Ok(Element::from(shown.then_some(text)))
    })
}

/// Test that output appearing later lands before the siblings after it,
/// even when its position rendered nothing so far.
#[test]
fn late_output_keeps_its_place() {
    let (document, body, mut renderer) = setup();
    let store = renderer.store().clone();
    let (first, second) = (Atom::new(false), Atom::new(false));
    renderer
        .render(
            fragment([
                maybe(&first, "a").element(Props::new()),
                maybe(&second, "b").element(Props::new()),
                Element::from("tail"),
            ]),
            body,
        )
        .unwrap();
    renderer.flush().unwrap();
    assert_eq!(document.inner_html(body), "tail");

    store.write(&second, Update::Set(true)).unwrap();
    assert_eq!(document.inner_html(body), "btail");
    store.write(&first, Update::Set(true)).unwrap();
    assert_eq!(document.inner_html(body), "abtail");

    store.write(&second, Update::Set(false)).unwrap();
    store.write(&first, Update::Set(false)).unwrap();
    store.write(&first, Update::Set(true)).unwrap();
    assert_eq!(document.inner_html(body), "atail");
}

/// Test that re-rendered output hands its old nodes back to the document.
#[test]
fn replaced_output_is_released() {
    let (document, body, mut renderer) = setup();
    let store = renderer.store().clone();
    let count = Atom::new(0);
    let source = count.clone();
    let display = Component::new("Display", move |_: &Props| {
        let (value, _) = use_atom(&source)?;
        Ok(h("p").child(value).build())
    });
    renderer.render(display.element(Props::new()), body).unwrap();
    renderer.flush().unwrap();
    let live = document.node_count();

    for n in 1..=1000 {
        store.write(&count, Update::Set(n)).unwrap();
    }
    assert_eq!(document.inner_html(body), "<p>1000</p>");
    assert_eq!(document.node_count(), live);
}
