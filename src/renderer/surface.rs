//! The drawing contract between a diagram and a backend

use crate::layout::{EntityId, EntityKind, Rect};

/// Opaque handle to something a [`Surface`] has drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u64);

/// Everything a surface needs to draw one entity
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem<'a> {
    pub id: EntityId,
    pub name: Option<&'a str>,
    pub kind: EntityKind,
    /// Outer (padded) box
    pub outer: Rect,
    pub content: Rect,
    /// Rendering nudge applied on top of the layout position
    pub offset: (f64, f64),
    /// Nesting depth in the container tree
    pub depth: usize,
}

/// A drawing backend
///
/// Entities are drawn when dirty. A redraw passes the handle returned by the
/// previous draw so the backend can update in place.
pub trait Surface {
    fn draw(&mut self, item: &DrawItem<'_>, previous: Option<RenderHandle>) -> RenderHandle;

    /// Forget a drawn element
    fn release(&mut self, handle: RenderHandle);
}
