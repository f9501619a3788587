//! Configuration for SVG rendering
//!
//! Options here only change how drawn entities are turned into markup; the
//! layout itself is never affected.

/// Configuration options for the SVG surface
#[derive(Debug, Clone, PartialEq)]
pub struct SvgConfig {
    /// Padding around the union of all drawn boxes
    pub viewbox_padding: f64,

    /// Whether to include the XML declaration
    pub standalone: bool,

    /// Whether to put each element on its own line, indented by tree depth
    pub pretty_print: bool,

    /// Prefix for CSS class names (e.g., "pl-" for "pl-stack")
    pub class_prefix: Option<String>,

    /// Whether entity offsets nudge the drawn boxes
    pub apply_offsets: bool,

    /// Draw each entity's content box inside its outer box
    pub show_content_boxes: bool,

    /// Draw entity names at the near corner of their outer box
    pub show_labels: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            viewbox_padding: 10.0,
            standalone: true,
            pretty_print: true,
            class_prefix: Some("pl-".to_string()),
            apply_offsets: true,
            show_content_boxes: false,
            show_labels: false,
        }
    }
}

impl SvgConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viewBox padding
    pub fn with_viewbox_padding(mut self, padding: f64) -> Self {
        self.viewbox_padding = padding;
        self
    }

    /// Set whether output is standalone
    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    /// Set whether to pretty-print output
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Set the CSS class prefix
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    /// Remove the CSS class prefix
    pub fn without_class_prefix(mut self) -> Self {
        self.class_prefix = None;
        self
    }

    /// Set whether entity offsets are applied to drawn boxes
    pub fn with_offsets(mut self, apply: bool) -> Self {
        self.apply_offsets = apply;
        self
    }

    /// Turn the debug overlay (content boxes and labels) on or off
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.show_content_boxes = debug;
        self.show_labels = debug;
        self
    }

    /// Whether anything beyond the outer boxes is drawn
    pub fn has_overlay(&self) -> bool {
        self.show_content_boxes || self.show_labels
    }
}
