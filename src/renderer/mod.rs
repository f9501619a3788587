//! Rendering of resolved diagrams
//!
//! A [`Diagram`](crate::layout::Diagram) draws itself onto any [`Surface`];
//! [`SvgSurface`] collects the drawn entities into an SVG document with CSS
//! classes for styling.

pub mod config;
pub mod surface;
pub mod svg;

pub use config::SvgConfig;
pub use surface::{DrawItem, RenderHandle, Surface};
pub use svg::SvgSurface;
