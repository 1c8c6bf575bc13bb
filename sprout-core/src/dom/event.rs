//! Events dispatched to output-tree listeners.

use super::NodeId;

/// An event delivered to the listeners of a single node.
///
/// The event carries a snapshot of the target's input state taken at
/// dispatch time, so listeners can read the caret without going back to the
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: String,
    target: NodeId,
    value: Option<String>,
    selection_start: Option<usize>,
}

impl Event {
    /// Create an event of the given kind (`"click"`, `"input"`, `"blur"`, ...).
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
            selection_start: None,
        }
    }

    pub(crate) fn with_input_state(mut self, value: Option<String>, selection_start: Option<usize>) -> Self {
        self.value = value;
        self.selection_start = selection_start;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The node the event was dispatched to.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Current value of the target, for text inputs.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Caret offset of the target, for text inputs.
    pub fn selection_start(&self) -> Option<usize> {
        self.selection_start
    }
}
