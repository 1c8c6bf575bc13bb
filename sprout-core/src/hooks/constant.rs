use std::any::type_name;
use std::rc::Rc;

use super::{claim_slot, current};
use crate::error::{Error, Result};
use crate::render::context::HookSlot;

/// A value created by `create` on the first render and returned unchanged
/// on every later render of the same component instance.
///
/// The value is cloned out of its slot, so shared mutable state should be
/// wrapped in `Rc<RefCell<_>>` (see [`use_ref`](super::use_ref)).
pub fn use_constant<T, F>(create: F) -> Result<T>
where
    T: Clone + 'static,
    F: FnOnce() -> T,
{
    let frame = current("use_constant")?;
    let ctx = &frame.context;
    let index = claim_slot(ctx);

    match ctx.borrow().hooks.get(index) {
        Some(HookSlot::Constant(value)) => {
            return value
                .downcast_ref::<T>()
                .cloned()
                .ok_or(Error::HookOrderChanged {
                    index,
                    expected: type_name::<T>(),
                    found: "a constant of another type",
                });
        }
        Some(other) => {
            return Err(Error::HookOrderChanged {
                index,
                expected: "constant",
                found: other.kind(),
            })
        }
        None => {}
    }

    let value = create();
    let mut c = ctx.borrow_mut();
    if c.hooks.len() != index {
        return Err(Error::HookOrderChanged {
            index,
            expected: "constant",
            found: "a hook called while creating the constant",
        });
    }
    c.hooks.push(HookSlot::Constant(Rc::new(value.clone())));
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::element::{Component, Element, Props};
    use crate::render::Renderer;
    use crate::store::Store;
    use std::cell::Cell;

    #[test]
    fn outside_render_is_an_error() {
        let err = use_constant(|| 1).unwrap_err();
        assert!(matches!(err, Error::HookOutsideRender { hook: "use_constant" }));
    }

    #[test]
    fn value_is_created_once() {
        let created = Rc::new(Cell::new(0));
        let seen = Rc::new(Cell::new(0));
        let (c, s) = (Rc::clone(&created), Rc::clone(&seen));
        let component = Component::new("Constant", move |_: &Props| {
            let value = use_constant(|| {
                c.set(c.get() + 1);
                41
            })?;
            s.set(value + 1);
            Ok(Element::from(value))
        });

        let document = Document::new();
        let mut renderer = Renderer::new(document.clone(), Store::new());
        renderer.render(component.element(Props::new()), document.body()).unwrap();
        renderer.render(component.element(Props::new()), document.body()).unwrap();

        assert_eq!(created.get(), 1);
        assert_eq!(seen.get(), 42);
        assert_eq!(document.inner_html(document.body()), "41");
    }

    #[test]
    fn changing_the_stored_type_is_an_order_error() {
        let flip = Rc::new(Cell::new(false));
        let toggle = Rc::clone(&flip);
        let component = Component::new("Flip", move |_: &Props| {
            if toggle.get() {
                let text = use_constant(|| "x".to_string())?;
                Ok(Element::from(text))
            } else {
                Ok(Element::from(use_constant(|| 1)?))
            }
        });

        let document = Document::new();
        let mut renderer = Renderer::new(document.clone(), Store::new());
        renderer.render(component.element(Props::new()), document.body()).unwrap();
        flip.set(true);
        let err = renderer
            .render(component.element(Props::new()), document.body())
            .unwrap_err();
        assert!(matches!(err, Error::HookOrderChanged { index: 0, .. }));
    }
}
