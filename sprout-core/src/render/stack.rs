//! Render Stack
//!
//! Tracks which component is currently executing so that hook primitives
//! can find their context without it being passed around.
//!
//! The stack is thread-local: rendering is synchronous and single-threaded,
//! and a component nested inside another one simply pushes a frame on top
//! of its parent's. A [`RenderGuard`] pops its frame when dropped, so the
//! stack stays balanced when a component returns an error.

use std::cell::RefCell;
use std::rc::Rc;

use super::context::ContextRef;
use super::reconciler::Reconciler;

thread_local! {
    static RENDER_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// The component being rendered and the renderer rendering it.
#[derive(Clone)]
pub(crate) struct Frame {
    pub(crate) context: ContextRef,
    pub(crate) reconciler: Reconciler,
}

/// Guard that pops its frame when dropped.
pub(crate) struct RenderGuard {
    context: *const (),
}

impl RenderGuard {
    pub(crate) fn enter(frame: Frame) -> Self {
        let context = Rc::as_ptr(&frame.context) as *const ();
        RENDER_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { context }
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        RENDER_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert_eq!(
                    Rc::as_ptr(&frame.context) as *const (),
                    self.context,
                    "render stack mismatch"
                );
            }
        });
    }
}

/// Frame of the innermost rendering component.
pub(crate) fn current() -> Option<Frame> {
    RENDER_STACK.with(|stack| stack.borrow().last().cloned())
}

pub(crate) fn depth() -> usize {
    RENDER_STACK.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererOptions;
    use crate::dom::Document;
    use crate::render::context::RenderContext;
    use crate::store::Store;

    fn frame() -> Frame {
        Frame {
            context: RenderContext::new(None),
            reconciler: Reconciler::new(Document::new(), Store::new(), RendererOptions::default()),
        }
    }

    #[test]
    fn guard_pushes_and_pops() {
        assert!(current().is_none());
        let outer = frame();
        {
            let _guard = RenderGuard::enter(outer.clone());
            assert_eq!(depth(), 1);
            let top = current().unwrap();
            assert!(Rc::ptr_eq(&top.context, &outer.context));
        }
        assert_eq!(depth(), 0);
    }

    #[test]
    fn nested_frames_shadow_outer_ones() {
        let outer = frame();
        let inner = frame();
        let _outer_guard = RenderGuard::enter(outer.clone());
        {
            let _inner_guard = RenderGuard::enter(inner.clone());
            assert!(Rc::ptr_eq(&current().unwrap().context, &inner.context));
        }
        assert!(Rc::ptr_eq(&current().unwrap().context, &outer.context));
    }
}
