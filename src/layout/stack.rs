//! Axis-stacking containers
//!
//! A stack chains its children along its main axis: the first child's near
//! edge is bound to the stack's content box, every other child's near edge to
//! its predecessor's far edge. On the cross axis each child is bound to the
//! stack according to its alignment, and the stack's cross size is squeezed
//! to the largest aligned child.

use tracing::debug;

use super::binding::Binding;
use super::config::StackConfig;
use super::container::ContainerPolicy;
use super::engine::Diagram;
use super::error::LayoutError;
use super::id::EntityId;
use super::types::{Alignment, AnchorSite, Axis};

const HEAD_LABEL: &str = "stack head";
const CHAIN_LABEL: &str = "stack chain";
const ALIGN_LABEL: &str = "stack align";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackLayout {
    /// Main (stacking) axis
    pub axis: Axis,
    pub bind_main_axis: bool,
    /// Default cross-axis alignment of inserted children
    pub alignment: Alignment,
    pub min_cross_axis: Option<f64>,
}

impl StackLayout {
    pub(crate) fn from_config(config: &StackConfig) -> Self {
        Self {
            axis: config.axis,
            bind_main_axis: config.bind_main_axis,
            alignment: config.alignment,
            min_cross_axis: config.min_cross_axis,
        }
    }

    pub fn cross_axis(&self) -> Axis {
        self.axis.other()
    }

    /// The main-axis binding that places the child at `index`
    fn link(&self, diagram: &Diagram, stack: EntityId, index: usize) -> Result<(EntityId, Binding), LayoutError> {
        let children = diagram.children(stack)?;
        let child = children[index];
        if index == 0 {
            let binding = Binding::new(child, self.axis, AnchorSite::Here, AnchorSite::Here)
                .with_label(HEAD_LABEL);
            Ok((stack, binding))
        } else {
            let binding = Binding::new(child, self.axis, AnchorSite::Far, AnchorSite::Here)
                .box_relative()
                .with_label(CHAIN_LABEL);
            Ok((children[index - 1], binding))
        }
    }

    /// Squeezed cross size: the largest aligned child, at least `min_cross_axis`
    fn squeezed_cross(&self, diagram: &Diagram, stack: EntityId) -> Result<f64, LayoutError> {
        let cross = self.cross_axis();
        let mut size = self.min_cross_axis.unwrap_or(0.0);
        for slot in &diagram.container_state(stack)?.children {
            if slot.alignment == Alignment::None {
                continue;
            }
            if let Some(child) = diagram.entity(slot.id)?.outer_size(cross) {
                size = size.max(child);
            }
        }
        Ok(size)
    }

    /// Grow the cross size to fit a new child, or squeeze it
    fn fit_cross_axis(&self, diagram: &mut Diagram, stack: EntityId, index: usize) -> Result<(), LayoutError> {
        if self.alignment == Alignment::None {
            return Ok(());
        }
        let cross = self.cross_axis();
        let slot = diagram.container_state(stack)?.children[index];
        let child_size = if slot.alignment == Alignment::None {
            None
        } else {
            diagram.entity(slot.id)?.outer_size(cross)
        };
        let current = diagram.entity(stack)?.geometry.size(cross);
        match child_size {
            Some(size) if current.map_or(true, |current| size > current) => {
                let size = size.max(self.min_cross_axis.unwrap_or(0.0));
                diagram.write_size(stack, cross, size).map(|_| ())
            }
            _ => diagram.squeeze_cross_axis(stack),
        }
    }
}

impl ContainerPolicy for StackLayout {
    fn attach(&self, diagram: &mut Diagram, stack: EntityId, index: usize) -> Result<(), LayoutError> {
        let children = diagram.children(stack)?;
        let child = children[index];

        let mut source = None;
        if self.bind_main_axis {
            let (from, binding) = self.link(diagram, stack, index)?;
            if let Some(&next) = children.get(index + 1) {
                diagram.graph.remove(from, next, Some(self.axis));
                let (_, relink) = self.link(diagram, stack, index + 1)?;
                diagram.bind(child, relink)?;
            }
            diagram.bind(from, binding)?;
            source = Some(from);
        }

        let alignment = diagram.container_state(stack)?.children[index].alignment;
        if let Some(site) = alignment.site() {
            let binding = Binding::new(child, self.cross_axis(), site, site).with_label(ALIGN_LABEL);
            diagram.bind(stack, binding)?;
        }

        self.fit_cross_axis(diagram, stack, index)?;

        if let Some(source) = source {
            diagram.enforce_binding(source)?;
            diagram.enforce_binding(child)?;
        }
        Ok(())
    }

    fn detach(&self, diagram: &mut Diagram, stack: EntityId, index: usize) -> Result<Vec<EntityId>, LayoutError> {
        if !self.bind_main_axis {
            return Ok(Vec::new());
        }
        let children = diagram.children(stack)?;
        let child = children[index];
        let (source, _) = self.link(diagram, stack, index)?;
        diagram.graph.remove(source, child, Some(self.axis));

        if let Some(&next) = children.get(index + 1) {
            diagram.graph.remove(child, next, Some(self.axis));
            let bridge = if index == 0 {
                Binding::new(next, self.axis, AnchorSite::Here, AnchorSite::Here).with_label(HEAD_LABEL)
            } else {
                Binding::new(next, self.axis, AnchorSite::Far, AnchorSite::Here)
                    .box_relative()
                    .with_label(CHAIN_LABEL)
            };
            diagram.bind(source, bridge)?;
        }
        Ok(vec![source])
    }

    fn extent(&self, diagram: &Diagram, stack: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        if axis == self.cross_axis() && self.alignment != Alignment::None {
            return self.squeezed_cross(diagram, stack);
        }
        Ok(diagram
            .children_span(stack, axis)?
            .map_or(0.0, |(near, far)| far - near))
    }

    fn after_remove(&self, diagram: &mut Diagram, stack: EntityId) -> Result<(), LayoutError> {
        diagram.squeeze_cross_axis(stack)
    }

    fn child_alignment(&self, requested: Option<Alignment>) -> Alignment {
        requested.unwrap_or(self.alignment)
    }
}

impl Diagram {
    /// Shrink a stack's cross size to its largest aligned child
    pub fn squeeze_cross_axis(&mut self, stack: EntityId) -> Result<(), LayoutError> {
        let Some(layout) = self.container_state(stack)?.policy.as_stack().copied() else {
            return Err(LayoutError::unsupported(self.describe(stack), "entity is not a stack"));
        };
        if layout.alignment == Alignment::None {
            return Ok(());
        }
        let size = layout.squeezed_cross(self, stack)?;
        debug!(stack = %self.describe(stack), size, "cross axis squeezed");
        self.write_size(stack, layout.cross_axis(), size).map(|_| ())
    }

    /// Main and cross axis of a stack
    pub fn stack_layout(&self, stack: EntityId) -> Result<StackLayout, LayoutError> {
        self.container_state(stack)?
            .policy
            .as_stack()
            .copied()
            .ok_or_else(|| LayoutError::unsupported(self.describe(stack), "entity is not a stack"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::config::EntityConfig;

    fn sized(diagram: &mut Diagram, name: &str, w: f64, h: f64) -> EntityId {
        diagram
            .create(EntityConfig::new().with_name(name).with_size(w, h))
            .unwrap()
    }

    #[test]
    fn test_children_chain_on_main_axis() {
        let mut diagram = Diagram::new();
        let stack = diagram
            .create_stack(StackConfig::new(Axis::Y).with_position(0.0, 0.0))
            .unwrap();
        let a = sized(&mut diagram, "a", 30.0, 10.0);
        let b = sized(&mut diagram, "b", 20.0, 20.0);
        diagram.add(stack, a, None).unwrap();
        diagram.add(stack, b, None).unwrap();

        assert_eq!(diagram.y(a).unwrap(), 0.0);
        assert_eq!(diagram.y(b).unwrap(), 10.0);
        assert_eq!(diagram.content_height(stack).unwrap(), 30.0);
        assert_eq!(diagram.content_width(stack).unwrap(), 30.0);
    }

    #[test]
    fn test_insert_at_front_relinks_successor() {
        let mut diagram = Diagram::new();
        let stack = diagram
            .create_stack(StackConfig::new(Axis::X).with_position(0.0, 0.0))
            .unwrap();
        let a = sized(&mut diagram, "a", 10.0, 5.0);
        let b = sized(&mut diagram, "b", 4.0, 5.0);
        diagram.add(stack, a, None).unwrap();
        diagram.add(stack, b, Some(0)).unwrap();

        assert_eq!(diagram.x(b).unwrap(), 0.0);
        assert_eq!(diagram.x(a).unwrap(), 4.0);
        assert_eq!(diagram.children(stack).unwrap(), vec![b, a]);
        assert!(diagram.graph.find(stack, a, Axis::X).is_none());
    }

    #[test]
    fn test_unbound_main_axis_keeps_positions() {
        let mut diagram = Diagram::new();
        let stack = diagram
            .create_stack(
                StackConfig::new(Axis::X)
                    .with_position(0.0, 0.0)
                    .with_bind_main_axis(false),
            )
            .unwrap();
        let a = diagram
            .create(EntityConfig::new().with_position(7.0, 0.0).with_size(3.0, 3.0))
            .unwrap();
        diagram.add(stack, a, None).unwrap();
        assert_eq!(diagram.x(a).unwrap(), 7.0);
        assert_eq!(diagram.content_width(stack).unwrap(), 3.0);
    }

    #[test]
    fn test_min_cross_axis_floor() {
        let mut diagram = Diagram::new();
        let stack = diagram
            .create_stack(
                StackConfig::new(Axis::X)
                    .with_position(0.0, 0.0)
                    .with_min_cross_axis(50.0),
            )
            .unwrap();
        let a = sized(&mut diagram, "a", 10.0, 5.0);
        diagram.add(stack, a, None).unwrap();
        assert_eq!(diagram.content_height(stack).unwrap(), 50.0);
    }

    #[test]
    fn test_squeeze_requires_stack() {
        let mut diagram = Diagram::new();
        let a = sized(&mut diagram, "a", 1.0, 1.0);
        assert!(diagram.squeeze_cross_axis(a).is_err());
    }
}
