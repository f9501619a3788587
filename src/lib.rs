//! Pulse Layout - spatial binding and incremental layout for timing diagrams
//!
//! This library provides a layout engine in which entities are positioned by
//! directed anchor bindings and grouped into containers and stacks, a TOML
//! scene format for composing diagrams, and an SVG renderer.
//!
//! # Example
//!
//! ```rust
//! use pulse_layout::render;
//!
//! let svg = render(r#"
//!     [[node]]
//!     kind = "box"
//!     name = "p90"
//!     x = 0.0
//!     y = 0.0
//!     width = 10.0
//!     height = 20.0
//! "#).unwrap();
//! assert!(svg.contains("<svg"));
//! assert!(svg.contains("p90"));
//! ```

pub mod error;
pub mod layout;
pub mod renderer;
pub mod scene;

pub use error::SceneError;
pub use layout::{Diagram, EngineConfig, EntityId, LayoutError};
pub use renderer::{Surface, SvgConfig, SvgSurface};
pub use scene::{BuiltScene, Scene};

use thiserror::Error;
use tracing::warn;

/// Errors that can occur during the render pipeline
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error loading the scene
    #[error("scene error: {0}")]
    Scene(SceneError),

    /// Error during layout
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl From<SceneError> for RenderError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::Layout(err) => RenderError::Layout(err),
            other => RenderError::Scene(other),
        }
    }
}

/// Configuration for the complete render pipeline
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Layout engine configuration
    pub engine: EngineConfig,
    /// SVG output configuration
    pub svg: SvgConfig,
    /// Debug mode: dump the layout tree and draw content boxes and names
    pub debug: bool,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    pub fn with_svg(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Render a TOML scene to SVG with default configuration
pub fn render(source: &str) -> Result<String, RenderError> {
    render_with_config(source, RenderConfig::default())
}

/// Render a TOML scene to SVG with custom configuration
///
/// # Example
///
/// ```rust
/// use pulse_layout::{render_with_config, RenderConfig, SvgConfig};
///
/// let config = RenderConfig::new().with_svg(SvgConfig::default().with_standalone(false));
/// let svg = render_with_config("", config).unwrap();
/// assert!(svg.starts_with("<svg"));
/// ```
pub fn render_with_config(source: &str, config: RenderConfig) -> Result<String, RenderError> {
    let scene = Scene::parse(source)?;
    let mut built = scene.build(config.engine.clone())?;
    Ok(render_diagram(&mut built.diagram, &config))
}

/// Draw a diagram onto a fresh [`SvgSurface`] and build the document
pub fn render_diagram(diagram: &mut Diagram, config: &RenderConfig) -> String {
    if config.debug {
        eprintln!("=== Layout Debug ===");
        eprint!("{}", diagram.dump());
        eprintln!("====================");
    }

    let svg = if config.debug {
        config.svg.clone().with_debug(true)
    } else {
        config.svg.clone()
    };
    let mut surface = SvgSurface::new(svg);
    diagram.draw(&mut surface);

    for (id, _) in diagram.tree_order() {
        if !diagram.is_resolved(id).unwrap_or(false) {
            warn!(entity = %diagram.describe(id), "entity left unresolved and not drawn");
        }
    }
    surface.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_scene() {
        let svg = render("").unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn test_invalid_toml() {
        let result = render("[[node]\nkind = ");
        assert!(matches!(result, Err(RenderError::Scene(SceneError::Toml(_)))));
    }

    #[test]
    fn test_layout_error_flattened() {
        let result = render(
            r#"
            [[node]]
            kind = "container"
            width = 3.0
            "#,
        );
        assert!(matches!(
            result,
            Err(RenderError::Layout(LayoutError::UnsupportedConfiguration { .. }))
        ));
    }

    #[test]
    fn test_unresolved_entities_skipped() {
        let svg = render(
            r#"
            [[node]]
            kind = "box"
            name = "floating"
            width = 3.0
            height = 3.0
            "#,
        )
        .unwrap();
        assert!(!svg.contains("floating"));
    }
}
