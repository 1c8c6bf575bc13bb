//! Rendering
//!
//! [`Renderer`] is the entry point: it owns one root context per output
//! container and drives the reconciler over them.
//!
//! ```
//! use sprout_core::dom::Document;
//! use sprout_core::element::h;
//! use sprout_core::render::Renderer;
//! use sprout_core::store::Store;
//!
//! let document = Document::new();
//! let body = document.body();
//! let mut renderer = Renderer::new(document.clone(), Store::new());
//!
//! renderer.render(h("p").child("hello"), body)?;
//! renderer.flush()?;
//! assert_eq!(document.inner_html(body), "<p>hello</p>");
//! # Ok::<(), sprout_core::Error>(())
//! ```
//!
//! # Commit phase
//!
//! Rendering never subscribes to atoms or runs cleanups directly. That work
//! is queued while the tree is walked and executed by [`Renderer::flush`].
//! Call it after [`Renderer::render`], much like awaiting a microtask in a
//! browser. Work still queued when the next [`Renderer::render`] starts is
//! flushed first, so a pass never sees subscriptions or effects of
//! components that an earlier pass removed.

mod attach;
mod commit;
pub(crate) mod context;
mod reconciler;
pub(crate) mod stack;

pub use reconciler::RenderStats;
pub(crate) use reconciler::Reconciler;

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::config::RendererOptions;
use crate::dom::{Document, NodeId};
use crate::element::Element;
use crate::error::Result;
use crate::store::Store;
use context::{ContextRef, RenderContext};

/// Renders element trees into containers of one [`Document`].
pub struct Renderer {
    reconciler: Reconciler,
    roots: HashMap<NodeId, ContextRef>,
}

impl Renderer {
    pub fn new(document: Document, store: Store) -> Self {
        Self::with_options(document, store, RendererOptions::default())
    }

    pub fn with_options(document: Document, store: Store, options: RendererOptions) -> Self {
        Self {
            reconciler: Reconciler::new(document, store, options),
            roots: HashMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.reconciler.document()
    }

    pub fn store(&self) -> &Store {
        self.reconciler.store()
    }

    pub fn options(&self) -> &RendererOptions {
        self.reconciler.options()
    }

    /// Render `element` into `container`.
    ///
    /// The first call for a container creates its root context; later calls
    /// reconcile against what the previous call rendered. Pending commit work
    /// runs before anything is reconciled.
    #[instrument(skip_all, fields(container = %container))]
    pub fn render(&mut self, element: impl Into<Element>, container: NodeId) -> Result<()> {
        self.flush()?;
        let element = element.into();
        let root = self
            .roots
            .entry(container)
            .or_insert_with(|| {
                debug!("creating root context");
                RenderContext::new(None)
            })
            .clone();
        self.reconciler.render(&element, container, &root)
    }

    /// Run the commit phase: pending subscriptions, store flushes and hook
    /// cleanups, in the order they were queued.
    #[instrument(skip_all)]
    pub fn flush(&self) -> Result<()> {
        self.reconciler
            .queue()
            .drain(self.reconciler.options().flush_limit)?;
        Ok(())
    }

    /// Tear down everything rendered into `container`.
    ///
    /// Hook cleanups run before this returns. A later [`render`](Self::render)
    /// into the same container starts from scratch. Returns whether anything
    /// was mounted there.
    pub fn unmount(&mut self, container: NodeId) -> Result<bool> {
        let Some(root) = self.roots.remove(&container) else {
            return Ok(false);
        };
        debug!(%container, "unmounting root");
        self.reconciler.teardown(&root)?;
        self.flush()?;
        Ok(true)
    }

    /// Number of tasks waiting for [`flush`](Self::flush).
    pub fn pending(&self) -> usize {
        self.reconciler.queue().len()
    }

    pub fn stats(&self) -> RenderStats {
        self.reconciler.stats()
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("reconciler", &self.reconciler)
            .field("roots", &self.roots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::h;

    #[test]
    fn roots_are_per_container() {
        let document = Document::new();
        let body = document.body();
        let a = document.create_element("section");
        let b = document.create_element("section");
        document.insert_before(body, a, None);
        document.insert_before(body, b, None);

        let mut renderer = Renderer::new(document.clone(), Store::new());
        renderer.render(h("p").child("a"), a).unwrap();
        renderer.render(h("p").child("b"), b).unwrap();
        assert_eq!(
            document.inner_html(body),
            "<section><p>a</p></section><section><p>b</p></section>"
        );

        assert!(renderer.unmount(a).unwrap());
        assert!(!renderer.unmount(a).unwrap());
        assert_eq!(document.inner_html(body), "<section></section><section><p>b</p></section>");
    }

    #[test]
    fn render_after_unmount_starts_over() {
        let document = Document::new();
        let body = document.body();
        let mut renderer = Renderer::new(document.clone(), Store::new());
        let element = h("p").child("x").build();
        renderer.render(element.clone(), body).unwrap();
        renderer.unmount(body).unwrap();
        renderer.render(element, body).unwrap();
        assert_eq!(document.inner_html(body), "<p>x</p>");
    }
}
