//! Error Types
//!
//! Every fatal condition in the renderer is a variant of [`Error`]. Errors
//! are raised synchronously where they are detected and propagated with `?`
//! through component functions, hooks, event handlers and store listeners.
//! Nothing in the core catches or retries them: they indicate programming
//! errors in the code that drives the renderer.

use thiserror::Error;

use crate::store::AtomId;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the reconciler, the hook primitives and the atom store.
#[derive(Debug, Error)]
pub enum Error {
    /// An element that none of the reconciler's branches can render.
    #[error("unhandled element: {description}")]
    UnhandledElement { description: String },

    /// A hook primitive found a slot recorded by a different primitive.
    ///
    /// This happens when a component calls hooks conditionally, so the
    /// call order differs between two renders of the same instance.
    #[error("hook order changed at slot {index}: expected {expected}, found {found}")]
    HookOrderChanged {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A hook primitive was called while no component was rendering.
    #[error("`{hook}` called outside of a component render")]
    HookOutsideRender { hook: &'static str },

    /// A setter was invoked on an atom that has no writer.
    #[error("atom {atom} is not writable")]
    ReadOnlyAtom { atom: AtomId },

    /// A stored atom value does not have the type the handle expects.
    #[error("atom {atom} holds a value of an unexpected type")]
    AtomType { atom: AtomId },

    /// A derived atom's read function failed.
    #[error("reading atom {atom} failed: {message}")]
    AtomRead { atom: AtomId, message: String },

    /// Two siblings resolved to the same key while strict keys are enabled.
    #[error("duplicate key {key} among siblings")]
    DuplicateKey { key: String },

    /// The commit phase kept scheduling work beyond the configured limit.
    #[error("commit phase exceeded {limit} tasks")]
    FlushLimit { limit: usize },

    /// Renderer options could not be parsed.
    #[error("invalid renderer options: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for failures inside derived atom readers.
    pub fn atom_read(atom: AtomId, message: impl Into<String>) -> Self {
        Self::AtomRead {
            atom,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_order_message_names_both_kinds() {
        let err = Error::HookOrderChanged {
            index: 2,
            expected: "constant",
            found: "atom subscription",
        };
        assert_eq!(
            err.to_string(),
            "hook order changed at slot 2: expected constant, found atom subscription"
        );
    }

    #[test]
    fn config_errors_convert_from_serde() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
