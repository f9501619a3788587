//! Configuration for the layout engine and its entities
//!
//! Every entity type has a typed configuration with documented defaults.
//! Configurations are validated when the entity is created.

use serde::Deserialize;

use super::error::LayoutError;
use super::types::{Alignment, Axis, Padding};

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Times one entity may be re-entered by the wave it is already part of
    /// before the wave is reported as a cycle
    ///
    /// Containers legitimately appear a few times while their bounds settle;
    /// feedback through aggregation keeps re-entering without limit.
    pub max_reentries: usize,

    /// Decimal places `centre` anchors are rounded to
    pub position_decimals: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reentries: 8,
            position_decimals: 6,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the re-entry bound used for cycle detection
    pub fn with_max_reentries(mut self, entries: usize) -> Self {
        self.max_reentries = entries;
        self
    }

    /// Set the rounding precision of `centre` anchors
    pub fn with_position_decimals(mut self, decimals: i32) -> Self {
        self.position_decimals = decimals;
        self
    }
}

/// Settings shared by every entity
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Name used in diagnostics, scene references and SVG ids
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Content width
    pub width: Option<f64>,
    /// Content height
    pub height: Option<f64>,
    pub padding: Padding,
    /// Rendering nudge, not a layout input
    pub offset: (f64, f64),
}

impl EntityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Set the content size
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_offset(mut self, dx: f64, dy: f64) -> Self {
        self.offset = (dx, dy);
        self
    }

    pub(crate) fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<anon>".to_string())
    }

    /// Check values are finite and sizes and padding non-negative
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (property, value) in [("x", self.x), ("y", self.y)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(LayoutError::unsupported(
                    self.label(),
                    format!("{property} must be finite"),
                ));
            }
        }
        for (property, value) in [("width", self.width), ("height", self.height)] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(LayoutError::unsupported(
                    self.label(),
                    format!("{property} must be a finite, non-negative number"),
                ));
            }
        }
        if !self.padding.is_valid() {
            return Err(LayoutError::unsupported(
                self.label(),
                "padding must be finite and non-negative",
            ));
        }
        if !self.offset.0.is_finite() || !self.offset.1.is_finite() {
            return Err(LayoutError::unsupported(self.label(), "offset must be finite"));
        }
        Ok(())
    }
}

/// Settings for a plain aggregating container
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    #[serde(flatten)]
    pub entity: EntityConfig,
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.entity = self.entity.with_name(name);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.entity = self.entity.with_position(x, y);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.entity = self.entity.with_padding(padding);
        self
    }

    /// Containers derive their size from their children
    pub fn validate(&self) -> Result<(), LayoutError> {
        self.entity.validate()?;
        if self.entity.width.is_some() || self.entity.height.is_some() {
            return Err(LayoutError::unsupported(
                self.entity.label(),
                "container size is derived from its children and cannot be configured",
            ));
        }
        Ok(())
    }
}

/// Settings for an axis-stacking container
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub entity: EntityConfig,
    /// Stacking direction
    pub axis: Axis,
    /// Chain children far-to-here along the main axis
    pub bind_main_axis: bool,
    /// Default cross-axis alignment of children
    pub alignment: Alignment,
    /// Lower bound of the squeezed cross-axis size
    pub min_cross_axis: Option<f64>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            entity: EntityConfig::default(),
            axis: Axis::X,
            bind_main_axis: true,
            alignment: Alignment::Here,
            min_cross_axis: None,
        }
    }
}

impl StackConfig {
    /// Create a stack along `axis` with default settings
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.entity = self.entity.with_name(name);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.entity = self.entity.with_position(x, y);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.entity = self.entity.with_padding(padding);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_bind_main_axis(mut self, bind: bool) -> Self {
        self.bind_main_axis = bind;
        self
    }

    pub fn with_min_cross_axis(mut self, size: f64) -> Self {
        self.min_cross_axis = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        ContainerConfig {
            entity: self.entity.clone(),
        }
        .validate()?;
        if self
            .min_cross_axis
            .is_some_and(|v| !v.is_finite() || v < 0.0)
        {
            return Err(LayoutError::unsupported(
                self.entity.label(),
                "min_cross_axis must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}
