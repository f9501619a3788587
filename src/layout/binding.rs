//! Binding edges between entities
//!
//! Bindings are stored apart from the entities they relate, as explicit
//! `(source, target, axis)` edges. The graph never owns entities; removing an
//! entity from the diagram must be paired with [`BindingGraph::detach`].

use std::collections::{BTreeMap, BTreeSet};

use super::id::EntityId;
use super::types::{AnchorSite, Axis};

/// A directed edge pushing a source anchor coordinate onto a target anchor
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub target: EntityId,
    pub axis: Axis,
    /// Site read on the source
    pub anchor: AnchorSite,
    /// Site written on the target
    pub target_anchor: AnchorSite,
    pub offset: f64,
    /// Read the source's content box rather than its outer box
    pub reference_content: bool,
    pub label: Option<String>,
}

impl Binding {
    /// Create a binding with no offset that reads the source's content box
    pub fn new(target: EntityId, axis: Axis, anchor: AnchorSite, target_anchor: AnchorSite) -> Self {
        Self {
            target,
            axis,
            anchor,
            target_anchor,
            offset: 0.0,
            reference_content: true,
            label: None,
        }
    }

    /// Set the offset added to the source coordinate
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Attach a label for inspection
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Read the source's outer (padded) box instead of its content box
    pub fn box_relative(mut self) -> Self {
        self.reference_content = false;
        self
    }
}

/// Mirrors the source's content size onto the target on one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBinding {
    pub target: EntityId,
    pub axis: Axis,
}

/// Position and size edges of a diagram
#[derive(Debug, Default)]
pub struct BindingGraph {
    outgoing: BTreeMap<EntityId, Vec<Binding>>,
    incoming: BTreeMap<EntityId, BTreeSet<EntityId>>,
    sizes: BTreeMap<EntityId, Vec<SizeBinding>>,
}

impl BindingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge, overwriting any existing edge for the same
    /// `(source, target, axis)`. Returns the replaced edge.
    pub fn insert(&mut self, source: EntityId, binding: Binding) -> Option<Binding> {
        let target = binding.target;
        let edges = self.outgoing.entry(source).or_default();
        let replaced = match edges
            .iter_mut()
            .find(|e| e.target == binding.target && e.axis == binding.axis)
        {
            Some(existing) => Some(std::mem::replace(existing, binding)),
            None => {
                edges.push(binding);
                None
            }
        };
        self.incoming.entry(target).or_default().insert(source);
        replaced
    }

    /// Remove edges from `source` to `target`, on one axis or all axes.
    /// Returns the number of edges removed.
    pub fn remove(&mut self, source: EntityId, target: EntityId, axis: Option<Axis>) -> usize {
        let Some(edges) = self.outgoing.get_mut(&source) else {
            return 0;
        };
        let before = edges.len();
        edges.retain(|e| !(e.target == target && axis.map_or(true, |a| e.axis == a)));
        let removed = before - edges.len();
        if edges.is_empty() {
            self.outgoing.remove(&source);
        }
        self.unlink_incoming(source, target);
        removed
    }

    /// Remove every outgoing edge of `source` on `axis`
    pub fn clear_axis(&mut self, source: EntityId, axis: Axis) -> Vec<Binding> {
        let Some(edges) = self.outgoing.get_mut(&source) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) = edges.drain(..).partition(|e| e.axis == axis);
        *edges = kept;
        if edges.is_empty() {
            self.outgoing.remove(&source);
        }
        for edge in &removed {
            self.unlink_incoming(source, edge.target);
        }
        removed
    }

    /// Drop every position and size edge that starts or ends at `entity`
    pub fn detach(&mut self, entity: EntityId) {
        if let Some(edges) = self.outgoing.remove(&entity) {
            for edge in edges {
                self.unlink_incoming(entity, edge.target);
            }
        }
        if let Some(sources) = self.incoming.remove(&entity) {
            for source in sources {
                if let Some(edges) = self.outgoing.get_mut(&source) {
                    edges.retain(|e| e.target != entity);
                    if edges.is_empty() {
                        self.outgoing.remove(&source);
                    }
                }
            }
        }
        self.sizes.remove(&entity);
        self.sizes.retain(|_, edges| {
            edges.retain(|e| e.target != entity);
            !edges.is_empty()
        });
    }

    /// Outgoing edges of `source` in registration order
    pub fn outgoing(&self, source: EntityId) -> &[Binding] {
        self.outgoing.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges ending at `target`, paired with their source
    pub fn incoming(&self, target: EntityId) -> Vec<(EntityId, Binding)> {
        let Some(sources) = self.incoming.get(&target) else {
            return Vec::new();
        };
        sources
            .iter()
            .flat_map(|source| {
                self.outgoing(*source)
                    .iter()
                    .filter(|e| e.target == target)
                    .map(|e| (*source, e.clone()))
            })
            .collect()
    }

    /// Look up the edge for `(source, target, axis)`
    pub fn find(&self, source: EntityId, target: EntityId, axis: Axis) -> Option<&Binding> {
        self.outgoing(source)
            .iter()
            .find(|e| e.target == target && e.axis == axis)
    }

    /// Total number of position edges
    pub fn len(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }

    /// If adding `source -> target` on `axis` would close a cycle, return it
    /// as `[source, target, ..., source]`.
    pub fn find_cycle(&self, source: EntityId, target: EntityId, axis: Axis) -> Option<Vec<EntityId>> {
        self.search_path(target, source, |node| {
            self.outgoing(node)
                .iter()
                .filter(|e| e.axis == axis)
                .map(|e| e.target)
                .collect()
        })
        .map(|path| std::iter::once(source).chain(path).collect())
    }

    /// Register a size edge, overwriting an existing one for `(source, target, axis)`
    pub fn insert_size(&mut self, source: EntityId, binding: SizeBinding) -> bool {
        let edges = self.sizes.entry(source).or_default();
        if edges.contains(&binding) {
            return false;
        }
        edges.push(binding);
        true
    }

    /// Remove size edges from `source` to `target`
    pub fn remove_size(&mut self, source: EntityId, target: EntityId, axis: Option<Axis>) -> usize {
        let Some(edges) = self.sizes.get_mut(&source) else {
            return 0;
        };
        let before = edges.len();
        edges.retain(|e| !(e.target == target && axis.map_or(true, |a| e.axis == a)));
        let removed = before - edges.len();
        if edges.is_empty() {
            self.sizes.remove(&source);
        }
        removed
    }

    /// Outgoing size edges of `source`
    pub fn size_outgoing(&self, source: EntityId) -> &[SizeBinding] {
        self.sizes.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cycle check for size edges, as [`find_cycle`](Self::find_cycle)
    pub fn find_size_cycle(
        &self,
        source: EntityId,
        target: EntityId,
        axis: Axis,
    ) -> Option<Vec<EntityId>> {
        self.search_path(target, source, |node| {
            self.size_outgoing(node)
                .iter()
                .filter(|e| e.axis == axis)
                .map(|e| e.target)
                .collect()
        })
        .map(|path| std::iter::once(source).chain(path).collect())
    }

    /// Depth-first search for a path `from -> ... -> to`
    fn search_path(
        &self,
        from: EntityId,
        to: EntityId,
        next: impl Fn(EntityId) -> Vec<EntityId>,
    ) -> Option<Vec<EntityId>> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![(from, vec![from])];
        while let Some((node, path)) = stack.pop() {
            if node == to {
                return Some(path);
            }
            if !visited.insert(node) {
                continue;
            }
            for succ in next(node) {
                if !visited.contains(&succ) {
                    let mut path = path.clone();
                    path.push(succ);
                    stack.push((succ, path));
                }
            }
        }
        None
    }

    fn unlink_incoming(&mut self, source: EntityId, target: EntityId) {
        let still_linked = self.outgoing(source).iter().any(|e| e.target == target);
        if still_linked {
            return;
        }
        if let Some(sources) = self.incoming.get_mut(&target) {
            sources.remove(&source);
            if sources.is_empty() {
                self.incoming.remove(&target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> EntityId {
        EntityId::new(n, 0)
    }

    fn edge(target: u32, axis: Axis) -> Binding {
        Binding::new(id(target), axis, AnchorSite::Far, AnchorSite::Here)
    }

    #[test]
    fn test_insert_overwrites_same_target_and_axis() {
        let mut graph = BindingGraph::new();
        assert!(graph.insert(id(0), edge(1, Axis::X)).is_none());
        let replaced = graph.insert(id(0), edge(1, Axis::X).with_offset(5.0));
        assert_eq!(replaced.map(|b| b.offset), Some(0.0));
        assert_eq!(graph.outgoing(id(0)).len(), 1);
        assert_eq!(graph.outgoing(id(0))[0].offset, 5.0);
    }

    #[test]
    fn test_insert_keeps_registration_order() {
        let mut graph = BindingGraph::new();
        graph.insert(id(0), edge(2, Axis::X));
        graph.insert(id(0), edge(1, Axis::X));
        graph.insert(id(0), edge(2, Axis::Y));
        let targets: Vec<_> = graph.outgoing(id(0)).iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![id(2), id(1), id(2)]);
    }

    #[test]
    fn test_remove_single_axis_keeps_incoming() {
        let mut graph = BindingGraph::new();
        graph.insert(id(0), edge(1, Axis::X));
        graph.insert(id(0), edge(1, Axis::Y));
        assert_eq!(graph.remove(id(0), id(1), Some(Axis::X)), 1);
        assert_eq!(graph.incoming(id(1)).len(), 1);
        assert_eq!(graph.remove(id(0), id(1), None), 1);
        assert!(graph.incoming(id(1)).is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_clear_axis() {
        let mut graph = BindingGraph::new();
        graph.insert(id(0), edge(1, Axis::X));
        graph.insert(id(0), edge(2, Axis::X));
        graph.insert(id(0), edge(3, Axis::Y));
        let removed = graph.clear_axis(id(0), Axis::X);
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.len(), 1);
        assert!(graph.incoming(id(1)).is_empty());
    }

    #[test]
    fn test_detach_removes_both_directions() {
        let mut graph = BindingGraph::new();
        graph.insert(id(0), edge(1, Axis::X));
        graph.insert(id(1), edge(2, Axis::X));
        graph.insert_size(id(0), SizeBinding { target: id(1), axis: Axis::Y });
        graph.detach(id(1));
        assert!(graph.is_empty());
        assert!(graph.size_outgoing(id(0)).is_empty());
    }

    #[test]
    fn test_find_cycle_same_axis_only() {
        let mut graph = BindingGraph::new();
        graph.insert(id(0), edge(1, Axis::X));
        graph.insert(id(1), edge(2, Axis::X));
        assert_eq!(
            graph.find_cycle(id(2), id(0), Axis::X),
            Some(vec![id(2), id(0), id(1), id(2)])
        );
        assert_eq!(graph.find_cycle(id(2), id(0), Axis::Y), None);
    }

    #[test]
    fn test_size_cycle() {
        let mut graph = BindingGraph::new();
        graph.insert_size(id(0), SizeBinding { target: id(1), axis: Axis::X });
        assert!(graph.find_size_cycle(id(1), id(0), Axis::X).is_some());
        assert!(!graph.insert_size(id(0), SizeBinding { target: id(1), axis: Axis::X }));
    }
}
