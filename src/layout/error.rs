//! Error types for the layout engine

use thiserror::Error;

use super::types::AnchorSite;

/// Errors raised by the layout engine
///
/// All of these are composition-time precondition failures: they are reported
/// where they are discovered and never retried by the engine.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A coordinate or size was read before it was set
    #[error("geometry of '{entity}' is unresolved: {property} has not been set")]
    UnresolvedGeometry { entity: String, property: String },

    /// An anchor site name outside `here`, `centre`, `far`
    #[error("unknown anchor site '{name}' (valid sites: {})", AnchorSite::NAMES.join(", "))]
    UnknownAnchorSite { name: String },

    /// A configuration or request the engine does not support
    #[error("unsupported configuration for '{entity}': {reason}")]
    UnsupportedConfiguration { entity: String, reason: String },

    /// A binding cycle, detected at registration or by re-entry during propagation
    #[error("binding cycle: {}", cycle.join(" -> "))]
    BindingCycle { cycle: Vec<String> },

    /// A handle that does not refer to a live entity
    #[error("unknown entity {id}")]
    UnknownEntity { id: String },

    /// A child index past the end of a container
    #[error("index {index} out of range for '{container}' with {len} children")]
    IndexOutOfRange {
        container: String,
        index: usize,
        len: usize,
    },

    /// An entity that is not a child of the given container
    #[error("'{child}' is not a child of '{container}'")]
    NotAChild { container: String, child: String },
}

impl LayoutError {
    /// Create an unresolved geometry error
    pub fn unresolved(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnresolvedGeometry {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Create an unknown anchor site error
    pub fn unknown_anchor_site(name: impl Into<String>) -> Self {
        Self::UnknownAnchorSite { name: name.into() }
    }

    /// Create an unsupported configuration error
    pub fn unsupported(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create a binding cycle error
    pub fn cycle(cycle: Vec<String>) -> Self {
        Self::BindingCycle { cycle }
    }

    /// Whether this error reports a binding cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::BindingCycle { .. })
    }
}
