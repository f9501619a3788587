//! Containers: ordered children and derived bounds
//!
//! A container subscribes to each of its children. Whenever a child changes,
//! [`Diagram::compute_boundary`] re-derives the container's content size from
//! the union of its children, one axis at a time. How children are wired on
//! insertion and removal is delegated to a [`ContainerPolicy`].

use tracing::debug;

use super::engine::Diagram;
use super::entity::ChildSlot;
use super::error::LayoutError;
use super::id::EntityId;
use super::stack::StackLayout;
use super::types::{Alignment, Axis};

/// Per-kind container behaviour
///
/// Policies are plain values copied out of the container before being
/// invoked, so they receive the whole diagram mutably.
pub trait ContainerPolicy {
    /// Wire the child just inserted at `index`
    fn attach(&self, diagram: &mut Diagram, container: EntityId, index: usize) -> Result<(), LayoutError>;

    /// Unwire the child at `index`, which is still in the child list.
    ///
    /// Returns entities whose bindings must be re-enforced once the child is gone.
    fn detach(
        &self,
        diagram: &mut Diagram,
        container: EntityId,
        index: usize,
    ) -> Result<Vec<EntityId>, LayoutError>;

    /// Content size on `axis` derived from the current children
    fn extent(&self, diagram: &Diagram, container: EntityId, axis: Axis) -> Result<f64, LayoutError>;

    /// Called after a child has left the container
    fn after_remove(&self, _diagram: &mut Diagram, _container: EntityId) -> Result<(), LayoutError> {
        Ok(())
    }

    /// Cross-axis alignment a child gets when inserted
    fn child_alignment(&self, requested: Option<Alignment>) -> Alignment;
}

/// Plain container: bounds are the union of the children, nothing is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aggregate;

impl ContainerPolicy for Aggregate {
    fn attach(&self, _: &mut Diagram, _: EntityId, _: usize) -> Result<(), LayoutError> {
        Ok(())
    }

    fn detach(&self, _: &mut Diagram, _: EntityId, _: usize) -> Result<Vec<EntityId>, LayoutError> {
        Ok(Vec::new())
    }

    fn extent(&self, diagram: &Diagram, container: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        Ok(diagram
            .children_span(container, axis)?
            .map_or(0.0, |(near, far)| far - near))
    }

    fn child_alignment(&self, _requested: Option<Alignment>) -> Alignment {
        Alignment::None
    }
}

/// Layout policy stored on a container
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutPolicy {
    Aggregate(Aggregate),
    Stack(StackLayout),
}

impl LayoutPolicy {
    pub fn as_policy(&self) -> &dyn ContainerPolicy {
        match self {
            LayoutPolicy::Aggregate(policy) => policy,
            LayoutPolicy::Stack(policy) => policy,
        }
    }

    pub fn as_stack(&self) -> Option<&StackLayout> {
        match self {
            LayoutPolicy::Stack(stack) => Some(stack),
            LayoutPolicy::Aggregate(_) => None,
        }
    }
}

impl Diagram {
    /// Append or insert `child` into `container`
    ///
    /// `index` defaults to the end of the child list.
    pub fn add(
        &mut self,
        container: EntityId,
        child: EntityId,
        index: Option<usize>,
    ) -> Result<(), LayoutError> {
        self.insert_child(container, child, index, None)
    }

    /// Insert into a stack with a per-child cross-axis alignment
    pub fn add_aligned(
        &mut self,
        container: EntityId,
        child: EntityId,
        index: Option<usize>,
        alignment: Alignment,
    ) -> Result<(), LayoutError> {
        if self.container_state(container)?.policy.as_stack().is_none() {
            return Err(LayoutError::unsupported(
                self.describe(container),
                "per-child alignment requires a stack",
            ));
        }
        self.insert_child(container, child, index, Some(alignment))
    }

    fn insert_child(
        &mut self,
        container: EntityId,
        child: EntityId,
        index: Option<usize>,
        alignment: Option<Alignment>,
    ) -> Result<(), LayoutError> {
        let state = self.container_state(container)?;
        let policy = state.policy;
        let len = state.children.len();
        if let Some(parent) = self.entity(child)?.parent {
            return Err(LayoutError::unsupported(
                self.describe(child),
                format!("already a child of '{}'", self.describe(parent)),
            ));
        }
        if self.is_ancestor(child, container)? {
            return Err(LayoutError::unsupported(
                self.describe(child),
                format!("cannot be nested inside its own descendant '{}'", self.describe(container)),
            ));
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(LayoutError::IndexOutOfRange {
                container: self.describe(container),
                index,
                len,
            });
        }

        let slot = ChildSlot {
            id: child,
            alignment: policy.as_policy().child_alignment(alignment),
        };
        self.container_state_mut(container)?.children.insert(index, slot);
        self.entity_mut(child)?.parent = Some(container);
        self.show(child)?;
        self.subscribe(child, container)?;
        debug!(
            container = %self.describe(container),
            child = %self.describe(child),
            index,
            "child added"
        );

        policy.as_policy().attach(self, container, index)?;
        self.compute_boundary(container)?;
        if self.is_resolved(container)? {
            self.enforce_binding(container)?;
        }
        Ok(())
    }

    /// Whether `ancestor` is `id` or contains it, transitively
    fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> Result<bool, LayoutError> {
        let mut current = Some(id);
        while let Some(entity) = current {
            if entity == ancestor {
                return Ok(true);
            }
            current = self.entity(entity)?.parent;
        }
        Ok(false)
    }

    /// Remove `child` from `container`; see [`remove_at`](Self::remove_at)
    pub fn remove(&mut self, container: EntityId, child: EntityId) -> Result<EntityId, LayoutError> {
        let index = self
            .container_state(container)?
            .position_of(child)
            .ok_or_else(|| LayoutError::NotAChild {
                container: self.describe(container),
                child: self.describe(child),
            })?;
        self.remove_at(container, index)
    }

    /// Remove the child at `index`
    ///
    /// The child is erased from the drawing and loses every binding, but
    /// stays alive in the diagram; use [`destroy`](Self::destroy) to free it.
    pub fn remove_at(&mut self, container: EntityId, index: usize) -> Result<EntityId, LayoutError> {
        let state = self.container_state(container)?;
        let policy = state.policy;
        let len = state.children.len();
        let Some(child) = state.children.get(index).map(|slot| slot.id) else {
            return Err(LayoutError::IndexOutOfRange {
                container: self.describe(container),
                index,
                len,
            });
        };

        let reenforce = policy.as_policy().detach(self, container, index)?;
        self.container_state_mut(container)?.children.remove(index);
        self.entity_mut(child)?.parent = None;
        self.unsubscribe(child, container)?;
        self.erase(child)?;
        self.graph.detach(child);
        debug!(
            container = %self.describe(container),
            child = %self.describe(child),
            index,
            "child removed"
        );

        policy.as_policy().after_remove(self, container)?;
        self.compute_boundary(container)?;
        if self.is_resolved(container)? {
            self.enforce_binding(container)?;
        }
        for id in reenforce {
            if self.contains(id) {
                self.enforce_binding(id)?;
            }
        }
        Ok(child)
    }

    /// Re-derive a container's content size from its children
    ///
    /// Skipped while any child is displaced by an in-flight wave. Each axis is
    /// written as soon as it is computed, so nested recomputation triggered by
    /// the write is never overwritten by a stale value.
    pub fn compute_boundary(&mut self, container: EntityId) -> Result<(), LayoutError> {
        let state = self.container_state(container)?;
        let policy = state.policy;
        let displaced = state
            .child_ids()
            .find(|child| self.entity(*child).is_ok_and(|e| e.displaced));
        if let Some(child) = displaced {
            debug!(
                container = %self.describe(container),
                child = %self.describe(child),
                "bounds deferred while child is displaced"
            );
            return Ok(());
        }

        self.enter_wave(container)?;
        let result = self.fit_to_children(container, &policy);
        self.leave_wave();
        result
    }

    fn fit_to_children(&mut self, container: EntityId, policy: &LayoutPolicy) -> Result<(), LayoutError> {
        for axis in Axis::ALL {
            let span = match self.children_span(container, axis)? {
                Some(span) => span,
                None => {
                    let own = self.entity(container)?.content_position(axis).unwrap_or(0.0);
                    (own, own)
                }
            };
            self.container_state_mut(container)?
                .child_bounds
                .set_span(axis, span.0, span.1);
            let size = policy.as_policy().extent(self, container, axis)?;
            self.write_size(container, axis, size)?;
        }
        Ok(())
    }

    /// Union of the outer boxes of children placed on `axis`
    pub(crate) fn children_span(
        &self,
        container: EntityId,
        axis: Axis,
    ) -> Result<Option<(f64, f64)>, LayoutError> {
        let mut span: Option<(f64, f64)> = None;
        for child in self.container_state(container)?.child_ids() {
            let entity = self.entity(child)?;
            let (Some(near), Some(size)) = (entity.geometry.position(axis), entity.outer_size(axis))
            else {
                continue;
            };
            let far = near + size;
            span = Some(match span {
                Some((lo, hi)) => (lo.min(near), hi.max(far)),
                None => (near, far),
            });
        }
        Ok(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::config::{ContainerConfig, EntityConfig};
    use crate::layout::types::Padding;

    fn placed(diagram: &mut Diagram, x: f64, y: f64, w: f64, h: f64) -> EntityId {
        diagram
            .create(EntityConfig::new().with_position(x, y).with_size(w, h))
            .unwrap()
    }

    #[test]
    fn test_bounds_are_union_of_children() {
        let mut diagram = Diagram::new();
        let group = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 10.0, 10.0);
        let b = placed(&mut diagram, 20.0, 5.0, 10.0, 10.0);
        diagram.add(group, a, None).unwrap();
        diagram.add(group, b, None).unwrap();
        assert_eq!(diagram.content_width(group).unwrap(), 30.0);
        assert_eq!(diagram.content_height(group).unwrap(), 15.0);
        let bounds = diagram.child_bounds(group).unwrap();
        assert_eq!(bounds.span(Axis::X), (0.0, 30.0));
    }

    #[test]
    fn test_bounds_track_child_moves() {
        let mut diagram = Diagram::new();
        let group = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 10.0, 10.0);
        diagram.add(group, a, None).unwrap();
        diagram.set_content_width(a, 40.0).unwrap();
        assert_eq!(diagram.content_width(group).unwrap(), 40.0);
    }

    #[test]
    fn test_empty_container_has_zero_size() {
        let mut diagram = Diagram::new();
        let group = diagram
            .create_container(ContainerConfig::new().with_position(3.0, 4.0))
            .unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 10.0, 10.0);
        diagram.add(group, a, None).unwrap();
        diagram.remove(group, a).unwrap();
        assert_eq!(diagram.content_width(group).unwrap(), 0.0);
        assert_eq!(diagram.child_bounds(group).unwrap().span(Axis::X), (3.0, 3.0));
    }

    #[test]
    fn test_padding_added_outside_union() {
        let mut diagram = Diagram::new();
        let group = diagram
            .create_container(ContainerConfig::new().with_padding(Padding::uniform(2.0)))
            .unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 10.0, 10.0);
        diagram.add(group, a, None).unwrap();
        assert_eq!(diagram.content_width(group).unwrap(), 10.0);
        assert_eq!(diagram.outer_size(group, Axis::X).unwrap(), 14.0);
    }

    #[test]
    fn test_child_with_parent_rejected() {
        let mut diagram = Diagram::new();
        let g1 = diagram.create_container(ContainerConfig::new()).unwrap();
        let g2 = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 1.0, 1.0);
        diagram.add(g1, a, None).unwrap();
        assert!(matches!(
            diagram.add(g2, a, None),
            Err(LayoutError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn test_nesting_into_descendant_rejected() {
        let mut diagram = Diagram::new();
        let outer = diagram.create_container(ContainerConfig::new()).unwrap();
        let inner = diagram.create_container(ContainerConfig::new()).unwrap();
        diagram.add(outer, inner, None).unwrap();
        assert!(diagram.add(inner, outer, None).is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut diagram = Diagram::new();
        let group = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 1.0, 1.0);
        let err = diagram.add(group, a, Some(3)).unwrap_err();
        assert!(matches!(err, LayoutError::IndexOutOfRange { index: 3, len: 0, .. }));
        assert!(diagram.remove_at(group, 0).is_err());
    }

    #[test]
    fn test_remove_unknown_child() {
        let mut diagram = Diagram::new();
        let group = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 1.0, 1.0);
        assert!(matches!(diagram.remove(group, a), Err(LayoutError::NotAChild { .. })));
    }

    #[test]
    fn test_aligned_add_requires_stack() {
        let mut diagram = Diagram::new();
        let group = diagram.create_container(ContainerConfig::new()).unwrap();
        let a = placed(&mut diagram, 0.0, 0.0, 1.0, 1.0);
        assert!(diagram.add_aligned(group, a, None, Alignment::Centre).is_err());
    }
}
