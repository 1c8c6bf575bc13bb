//! Renderer Configuration
//!
//! Options are plain data so they can be embedded in an application's own
//! configuration file and loaded with [`RendererOptions::from_json`]. Every
//! field has a default; an empty JSON object yields [`RendererOptions::default`].

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a [`Renderer`](crate::render::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Treat two siblings with the same key as an error instead of a warning.
    pub strict_keys: bool,

    /// Restore focus and caret on text inputs that are replaced while focused.
    pub restore_focus: bool,

    /// Upper bound on commit tasks executed by a single `flush()`.
    pub flush_limit: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            strict_keys: false,
            restore_focus: true,
            flush_limit: 10_000,
        }
    }
}

impl RendererOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let options = RendererOptions::from_json("{}").unwrap();
        assert_eq!(options, RendererOptions::default());
    }

    #[test]
    fn partial_override() {
        let options = RendererOptions::from_json(r#"{"strict_keys": true}"#).unwrap();
        assert!(options.strict_keys);
        assert!(options.restore_focus);
        assert_eq!(options.flush_limit, 10_000);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RendererOptions::from_json("strict").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
