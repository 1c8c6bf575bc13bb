//! Property attachment for freshly created host nodes.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use super::context::{ContextRef, RenderContext};
use crate::dom::{Document, Event, NodeId};
use crate::element::{EventHandler, HostElement, PropValue};
use crate::error::Result;

/// Apply `host`'s props to `node`, which will become `ctx`'s output node.
///
/// Listeners forward events only while `node` is still the context's output
/// node; events reaching a node that has since been replaced are dropped.
pub(crate) fn attach_props(
    document: &Document,
    in_render: &Rc<Cell<usize>>,
    host: &HostElement,
    node: NodeId,
    ctx: &ContextRef,
) {
    let props = host.props();
    let controlled = document.is_text_input(node) && props.contains("value");

    for (name, value) in props.iter() {
        match (name, value) {
            ("children" | "key", _) => {}
            ("onChange", PropValue::Handler(handler)) if controlled => {
                listen_controlled(document, in_render, node, ctx, handler.clone());
            }
            (_, PropValue::Handler(handler)) if name.starts_with("on") => {
                let event = name[2..].to_lowercase();
                listen(document, node, ctx, &event, handler.clone());
            }
            ("style", PropValue::Style(style)) => {
                document.set_attribute(node, "style", &style.to_css());
            }
            ("className", value) => {
                if let Some(class) = value.to_attribute() {
                    document.set_attribute(node, "class", &class);
                }
            }
            (name, value) => match value.to_attribute() {
                Some(text) => document.set_attribute(node, name, &text),
                None => trace!(%node, name, "attribute suppressed"),
            },
        }
    }
}

fn is_current(ctx: &Weak<RefCell<RenderContext>>, node: NodeId) -> Option<ContextRef> {
    let ctx = ctx.upgrade()?;
    let current = ctx.borrow().node == Some(node);
    current.then_some(ctx)
}

fn listen(document: &Document, node: NodeId, ctx: &ContextRef, event: &str, handler: EventHandler) {
    let weak = Rc::downgrade(ctx);
    document.add_event_listener(
        node,
        event,
        Rc::new(move |event: &Event| -> Result<()> {
            if is_current(&weak, node).is_none() {
                warn!(%node, kind = event.kind(), "event on replaced node dropped");
                return Ok(());
            }
            handler.call(event)
        }),
    );
}

// Controlled text inputs remember the caret so it survives the input being
// replaced by the re-render its own change handler triggers.
fn listen_controlled(
    document: &Document,
    in_render: &Rc<Cell<usize>>,
    node: NodeId,
    ctx: &ContextRef,
    handler: EventHandler,
) {
    let weak = Rc::downgrade(ctx);
    document.add_event_listener(
        node,
        "input",
        Rc::new(move |event: &Event| -> Result<()> {
            let Some(ctx) = is_current(&weak, node) else {
                warn!(%node, "input on replaced node dropped");
                return Ok(());
            };
            ctx.borrow_mut().selection_start = event.selection_start();
            handler.call(event)
        }),
    );

    let weak = Rc::downgrade(ctx);
    let in_render = Rc::clone(in_render);
    document.add_event_listener(
        node,
        "blur",
        Rc::new(move |_: &Event| -> Result<()> {
            // blur caused by the reconciler removing the node keeps the caret
            if in_render.get() == 0 {
                if let Some(ctx) = is_current(&weak, node) {
                    ctx.borrow_mut().selection_start = None;
                }
            }
            Ok(())
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{h, Element, Style};

    fn host(element: Element) -> Rc<HostElement> {
        match element {
            Element::Host(host) => host,
            other => panic!("expected host, got {other:?}"),
        }
    }

    #[test]
    fn attributes_style_and_class() {
        let document = Document::new();
        let ctx = RenderContext::new(None);
        let element = host(
            h("div")
                .class_name("box")
                .style(Style::new().set("backgroundColor", "red"))
                .prop("title", "t")
                .prop("hidden", false)
                .prop("data-n", 3)
                .key("k")
                .child("x")
                .build(),
        );
        let node = document.create_element("div");
        attach_props(&document, &Rc::new(Cell::new(0)), &element, node, &ctx);

        assert_eq!(document.attribute(node, "class").as_deref(), Some("box"));
        assert_eq!(document.attribute(node, "style").as_deref(), Some("background-color:red"));
        assert_eq!(document.attribute(node, "title").as_deref(), Some("t"));
        assert_eq!(document.attribute(node, "data-n").as_deref(), Some("3"));
        assert_eq!(document.attribute(node, "hidden"), None);
        assert_eq!(document.attribute(node, "key"), None);
    }

    #[test]
    fn listeners_forward_only_for_the_current_node() {
        let document = Document::new();
        let ctx = RenderContext::new(None);
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        let element = host(
            h("button")
                .on_click(move |_: &Event| -> Result<()> {
                    counter.set(counter.get() + 1);
                    Ok(())
                })
                .build(),
        );
        let node = document.create_element("button");
        attach_props(&document, &Rc::new(Cell::new(0)), &element, node, &ctx);

        document.click(node).unwrap();
        assert_eq!(clicks.get(), 0);

        ctx.borrow_mut().node = Some(node);
        document.click(node).unwrap();
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn controlled_input_tracks_caret() {
        let document = Document::new();
        let in_render = Rc::new(Cell::new(0));
        let ctx = RenderContext::new(None);
        let element = host(
            h("input")
                .prop("value", "ab")
                .on_change(|_: &Event| -> Result<()> { Ok(()) })
                .build(),
        );
        let node = document.create_element("input");
        attach_props(&document, &in_render, &element, node, &ctx);
        ctx.borrow_mut().node = Some(node);

        document.type_text(node, "abc", 3).unwrap();
        assert_eq!(ctx.borrow().selection_start, Some(3));

        in_render.set(1);
        document.blur().unwrap();
        assert_eq!(ctx.borrow().selection_start, Some(3));

        in_render.set(0);
        document.focus(node).unwrap();
        document.blur().unwrap();
        assert_eq!(ctx.borrow().selection_start, None);
    }
}
