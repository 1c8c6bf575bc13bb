//! Memoization gate for components.
//!
//! A memoized component remembers, per instance, the props it was last
//! called with and what it returned. When it is rendered again with equal
//! props it returns the remembered element instead of running, and because
//! that element is identical to the last one the reconciler skips the whole
//! subtree.
//!
//! A re-render the component triggers for itself (an atom it reads changed)
//! is forced and always runs the wrapped function.

use tracing::trace;

use super::current;
use crate::element::{Component, Element, Props};
use crate::error::Result;

/// Skip re-running `component` while its props stay shallow-equal.
///
/// Props compare as [`Props`]'s `PartialEq` does: scalars by value,
/// handlers, elements and opaque values by identity. A component without
/// props is never skipped.
pub fn memo(component: &Component) -> Component {
    memo_by(component, same_props)
}

fn same_props(last: &Props, next: &Props) -> bool {
    !last.is_empty() && last == next
}

/// [`memo`] with a custom props comparison.
pub fn memo_by<F>(component: &Component, are_equal: F) -> Component
where
    F: Fn(&Props, &Props) -> bool + 'static,
{
    let inner = component.clone();
    Component::new(component.name(), move |props: &Props| -> Result<Element> {
        let frame = current("memo")?;
        let cached = {
            let c = frame.context.borrow();
            match &c.memo {
                Some((last, result)) if !c.force && are_equal(last, props) => Some(result.clone()),
                _ => None,
            }
        };
        if let Some(result) = cached {
            trace!(component = inner.name(), "memo hit");
            return Ok(result);
        }
        let result = inner.call(props)?;
        frame.context.borrow_mut().memo = Some((props.clone(), result.clone()));
        Ok(result)
    })
}
