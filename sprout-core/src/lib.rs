//! Sprout Core
//!
//! This crate provides the core of the Sprout incremental UI renderer.
//! It implements:
//!
//! - An element model (host elements, components, fragments, keyed lists)
//! - A reconciler that patches a live output tree in place
//! - An atom store with derived atoms and change subscriptions
//! - Hooks that give component functions persistent state
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: Immutable descriptions of desired output
//! - `render`: The renderer, its shadow tree and commit queue
//! - `hooks`: Per-instance state and atom subscriptions
//! - `store`: Atoms and the store that holds their values
//! - `dom`: The in-memory output tree the renderer mutates
//!
//! # Example
//!
//! ```rust
//! use sprout_core::{h, use_atom, Atom, Component, Document, Props, Renderer, Store};
//!
//! let count = Atom::new(0);
//! let counter = {
//!     let count = count.clone();
//!     Component::new("Counter", move |_: &Props| {
//!         let (value, set) = use_atom(&count)?;
//!         Ok(h("button")
//!             .on_click(move |_| set.update(|n: &i32| n + 1))
//!             .child(value)
//!             .build())
//!     })
//! };
//!
//! let document = Document::new();
//! let body = document.body();
//! let mut renderer = Renderer::new(document.clone(), Store::new());
//! renderer.render(counter.element(Props::new()), body)?;
//! renderer.flush()?;
//!
//! let button = document.elements_by_tag(body, "button")[0];
//! document.click(button)?;
//! assert_eq!(document.inner_html(body), "<button>1</button>");
//! # Ok::<(), sprout_core::Error>(())
//! ```

pub mod config;
pub mod dom;
pub mod element;
pub mod error;
pub mod hooks;
pub mod render;
pub mod store;

pub use config::RendererOptions;
pub use dom::{Document, Event, NodeId};
pub use element::{fragment, h, Component, Element, Key, Props};
pub use error::{Error, Result};
pub use hooks::{
    memo, use_atom, use_callback, use_constant, use_effect, use_memo, use_reducer, use_ref,
    use_state,
};
pub use render::{RenderStats, Renderer};
pub use store::{Atom, Setter, Store, Update};
