//! Entity storage records

use super::container::LayoutPolicy;
use super::id::EntityId;
use super::types::{Alignment, Axis, ChildBounds, Padding};
use crate::renderer::RenderHandle;

/// Position and content size, each possibly unresolved
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub content_width: Option<f64>,
    pub content_height: Option<f64>,
}

impl Geometry {
    /// Outer-box near coordinate on an axis
    pub fn position(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub(crate) fn position_mut(&mut self, axis: Axis) -> &mut Option<f64> {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    /// Content size on an axis
    pub fn size(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.content_width,
            Axis::Y => self.content_height,
        }
    }

    pub(crate) fn size_mut(&mut self, axis: Axis) -> &mut Option<f64> {
        match axis {
            Axis::X => &mut self.content_width,
            Axis::Y => &mut self.content_height,
        }
    }

    /// Position and size both set on `axis`
    pub fn is_defined(&self, axis: Axis) -> bool {
        self.position(axis).is_some() && self.size(axis).is_some()
    }

    pub fn is_resolved(&self) -> bool {
        Axis::ALL.iter().all(|axis| self.is_defined(*axis))
    }
}

/// A child slot of a container, with its effective cross-axis alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildSlot {
    pub id: EntityId,
    pub alignment: Alignment,
}

/// Container-only state
#[derive(Debug, Clone)]
pub struct ContainerState {
    pub(crate) policy: LayoutPolicy,
    pub(crate) children: Vec<ChildSlot>,
    pub(crate) child_bounds: ChildBounds,
}

impl ContainerState {
    pub(crate) fn new(policy: LayoutPolicy) -> Self {
        Self {
            policy,
            children: Vec::new(),
            child_bounds: ChildBounds::default(),
        }
    }

    pub fn policy(&self) -> &LayoutPolicy {
        &self.policy
    }

    pub fn child_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.children.iter().map(|slot| slot.id)
    }

    pub(crate) fn position_of(&self, child: EntityId) -> Option<usize> {
        self.children.iter().position(|slot| slot.id == child)
    }
}

/// What kind of entity a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A drawable leaf
    Leaf,
    /// A plain aggregating container
    Container,
    /// An axis-stacking container
    Stack,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Leaf => "leaf",
            EntityKind::Container => "container",
            EntityKind::Stack => "stack",
        }
    }
}

/// One entity in a [`Diagram`](super::Diagram)
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) name: Option<String>,
    pub(crate) geometry: Geometry,
    pub(crate) padding: Padding,
    pub(crate) offset: (f64, f64),
    pub(crate) dirty: bool,
    /// Set while a propagation wave is about to move this entity
    pub(crate) displaced: bool,
    /// Removed from the drawing until shown again
    pub(crate) erased: bool,
    pub(crate) parent: Option<EntityId>,
    /// Containers recomputing their bounds when this entity changes
    pub(crate) subscribers: Vec<EntityId>,
    pub(crate) container: Option<ContainerState>,
    pub(crate) handle: Option<RenderHandle>,
}

impl Entity {
    pub(crate) fn new(
        name: Option<String>,
        geometry: Geometry,
        padding: Padding,
        offset: (f64, f64),
        container: Option<ContainerState>,
    ) -> Self {
        Self {
            name,
            geometry,
            padding,
            offset,
            dirty: true,
            displaced: false,
            erased: false,
            parent: None,
            subscribers: Vec::new(),
            container,
            handle: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn offset(&self) -> (f64, f64) {
        self.offset
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_displaced(&self) -> bool {
        self.displaced
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn container(&self) -> Option<&ContainerState> {
        self.container.as_ref()
    }

    pub fn kind(&self) -> EntityKind {
        match &self.container {
            None => EntityKind::Leaf,
            Some(state) => match state.policy {
                LayoutPolicy::Aggregate(_) => EntityKind::Container,
                LayoutPolicy::Stack(_) => EntityKind::Stack,
            },
        }
    }

    /// Outer size on an axis: content plus padding
    pub fn outer_size(&self, axis: Axis) -> Option<f64> {
        self.geometry
            .size(axis)
            .map(|size| size + self.padding.total(axis))
    }

    /// Content-box near coordinate on an axis
    pub fn content_position(&self, axis: Axis) -> Option<f64> {
        self.geometry
            .position(axis)
            .map(|pos| pos + self.padding.near(axis))
    }
}
