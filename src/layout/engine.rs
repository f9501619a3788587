//! The entity arena and binding propagation
//!
//! A [`Diagram`] owns every entity and the [`BindingGraph`] relating them.
//! Mutating a coordinate or size pushes the change synchronously through the
//! bindings of the mutated entity and then notifies subscribed containers,
//! which re-derive their bounds and continue the wave upwards.
//!
//! ## Propagation
//!
//! [`Diagram::enforce_binding`] runs in two phases over the outgoing edges of
//! an entity, in registration order:
//!
//! 1. every target whose anchor would change is flagged `displaced`;
//! 2. each flagged target has its flag cleared just before it is written.
//!
//! A container never aggregates over a displaced child, so siblings moved by
//! the same wave are only measured once all of them have settled. Edges that
//! would not change a value perform no write, which makes repeated
//! enforcement over an acyclic graph idempotent.
//!
//! Cycles among plain bindings are rejected when they are registered. Feedback
//! through container aggregation only shows up while a wave runs: an entity
//! re-entered more than [`EngineConfig::max_reentries`] times on the current
//! wave fails with [`LayoutError::BindingCycle`] instead of exhausting the
//! call stack. Long acyclic chains are never re-entered and are not bounded.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use super::binding::{Binding, BindingGraph, SizeBinding};
use super::config::{ContainerConfig, EngineConfig, EntityConfig, StackConfig};
use super::container::{Aggregate, LayoutPolicy};
use super::entity::{ContainerState, Entity, EntityKind, Geometry};
use super::error::LayoutError;
use super::id::EntityId;
use super::stack::StackLayout;
use super::types::{AnchorSite, Axis, ChildBounds, Padding, Rect};
use crate::renderer::{DrawItem, RenderHandle, Surface};

/// Relative tolerance when comparing anchor coordinates
const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// What changed in a [`GeometryEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryChange {
    Position(Axis),
    Size(Axis),
    Padding,
}

/// A geometry mutation, recorded in the order it was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryEvent {
    pub entity: EntityId,
    pub change: GeometryChange,
}

/// Counters for inspecting propagation behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationStats {
    /// Coordinate and size writes that changed a value
    pub writes: u64,
    /// Deepest wave observed
    pub max_depth: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Arena of spatial entities and the bindings between them
#[derive(Debug)]
pub struct Diagram {
    config: EngineConfig,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    pub(crate) graph: BindingGraph,
    wave: Vec<EntityId>,
    on_wave: BTreeMap<EntityId, usize>,
    events: Vec<GeometryEvent>,
    released: Vec<RenderHandle>,
    stats: PropagationStats,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            free_list: Vec::new(),
            graph: BindingGraph::new(),
            wave: Vec::new(),
            on_wave: BTreeMap::new(),
            events: Vec::new(),
            released: Vec::new(),
            stats: PropagationStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Creation and lookup
    // ------------------------------------------------------------------

    /// Create a drawable leaf entity
    pub fn create(&mut self, config: EntityConfig) -> Result<EntityId, LayoutError> {
        config.validate()?;
        Ok(self.insert_entity(&config, None))
    }

    /// Create a plain aggregating container
    pub fn create_container(&mut self, config: ContainerConfig) -> Result<EntityId, LayoutError> {
        config.validate()?;
        let state = ContainerState::new(LayoutPolicy::Aggregate(Aggregate));
        Ok(self.insert_entity(&config.entity, Some(state)))
    }

    /// Create an axis-stacking container
    pub fn create_stack(&mut self, config: StackConfig) -> Result<EntityId, LayoutError> {
        config.validate()?;
        let layout = StackLayout::from_config(&config);
        let state = ContainerState::new(LayoutPolicy::Stack(layout));
        Ok(self.insert_entity(&config.entity, Some(state)))
    }

    fn insert_entity(&mut self, config: &EntityConfig, container: Option<ContainerState>) -> EntityId {
        let geometry = Geometry {
            x: config.x,
            y: config.y,
            content_width: config.width,
            content_height: config.height,
        };
        let entity = Entity::new(
            config.name.clone(),
            geometry,
            config.padding,
            config.offset,
            container,
        );
        let id = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            slot.entity = Some(entity);
            EntityId::new(idx, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                entity: Some(entity),
            });
            EntityId::new(self.slots.len() as u32 - 1, 0)
        };
        debug!(entity = %self.describe(id), "created entity");
        id
    }

    /// Whether `id` refers to a live entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots
            .get(id.idx as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.entity.is_some())
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, LayoutError> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entity.as_ref())
            .ok_or_else(|| LayoutError::UnknownEntity { id: id.to_string() })
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, LayoutError> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entity.as_mut())
            .ok_or_else(|| LayoutError::UnknownEntity { id: id.to_string() })
    }

    /// Human-readable label: the entity's name, or its handle
    pub fn describe(&self, id: EntityId) -> String {
        match self.entity(id).ok().and_then(|e| e.name()) {
            Some(name) => name.to_string(),
            None => id.to_string(),
        }
    }

    /// Find an entity by name
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.iter()
            .find(|(_, entity)| entity.name() == Some(name))
            .map(|(id, _)| id)
    }

    /// All live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.entity
                .as_ref()
                .map(|entity| (EntityId::new(idx as u32, slot.generation), entity))
        })
    }

    /// Entities without a parent, in creation order
    pub fn roots(&self) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, entity)| entity.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self, id: EntityId) -> Result<EntityKind, LayoutError> {
        Ok(self.entity(id)?.kind())
    }

    pub fn parent(&self, id: EntityId) -> Result<Option<EntityId>, LayoutError> {
        Ok(self.entity(id)?.parent)
    }

    // ------------------------------------------------------------------
    // Geometry reads
    // ------------------------------------------------------------------

    /// Outer-box near coordinate on an axis
    pub fn position(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        self.entity(id)?
            .geometry
            .position(axis)
            .ok_or_else(|| LayoutError::unresolved(self.describe(id), axis.to_string()))
    }

    pub fn x(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.position(id, Axis::X)
    }

    pub fn y(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.position(id, Axis::Y)
    }

    /// Content size on an axis
    pub fn content_size(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        self.entity(id)?
            .geometry
            .size(axis)
            .ok_or_else(|| LayoutError::unresolved(self.describe(id), size_property(axis)))
    }

    pub fn content_width(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.content_size(id, Axis::X)
    }

    pub fn content_height(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.content_size(id, Axis::Y)
    }

    /// Outer size on an axis (content plus padding)
    pub fn outer_size(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        let padding = self.entity(id)?.padding;
        Ok(self.content_size(id, axis)? + padding.total(axis))
    }

    pub fn width(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.outer_size(id, Axis::X)
    }

    pub fn height(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.outer_size(id, Axis::Y)
    }

    /// Content-box near coordinate on an axis
    pub fn content_position(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        let padding = self.entity(id)?.padding;
        Ok(self.position(id, axis)? + padding.near(axis))
    }

    pub fn content_x(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.content_position(id, Axis::X)
    }

    pub fn content_y(&self, id: EntityId) -> Result<f64, LayoutError> {
        self.content_position(id, Axis::Y)
    }

    /// Outer-box anchor coordinate
    pub fn anchor(&self, id: EntityId, axis: Axis, site: AnchorSite) -> Result<f64, LayoutError> {
        let near = self.position(id, axis)?;
        if site == AnchorSite::Here {
            return Ok(near);
        }
        let size = self.outer_size(id, axis)?;
        Ok(self.site_coordinate(near, size, site))
    }

    /// Content-box anchor coordinate
    pub fn content_anchor(
        &self,
        id: EntityId,
        axis: Axis,
        site: AnchorSite,
    ) -> Result<f64, LayoutError> {
        let near = self.content_position(id, axis)?;
        if site == AnchorSite::Here {
            return Ok(near);
        }
        let size = self.content_size(id, axis)?;
        Ok(self.site_coordinate(near, size, site))
    }

    pub fn here(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        self.anchor(id, axis, AnchorSite::Here)
    }

    pub fn centre(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        self.anchor(id, axis, AnchorSite::Centre)
    }

    pub fn far(&self, id: EntityId, axis: Axis) -> Result<f64, LayoutError> {
        self.anchor(id, axis, AnchorSite::Far)
    }

    pub fn outer_box(&self, id: EntityId) -> Result<Rect, LayoutError> {
        Ok(Rect::new(
            self.x(id)?,
            self.y(id)?,
            self.width(id)?,
            self.height(id)?,
        ))
    }

    pub fn content_box(&self, id: EntityId) -> Result<Rect, LayoutError> {
        Ok(Rect::new(
            self.content_x(id)?,
            self.content_y(id)?,
            self.content_width(id)?,
            self.content_height(id)?,
        ))
    }

    /// Position and size resolved on both axes
    pub fn is_resolved(&self, id: EntityId) -> Result<bool, LayoutError> {
        Ok(self.entity(id)?.geometry.is_resolved())
    }

    pub fn padding(&self, id: EntityId) -> Result<Padding, LayoutError> {
        Ok(self.entity(id)?.padding)
    }

    pub fn offset(&self, id: EntityId) -> Result<(f64, f64), LayoutError> {
        Ok(self.entity(id)?.offset)
    }

    pub fn is_dirty(&self, id: EntityId) -> Result<bool, LayoutError> {
        Ok(self.entity(id)?.dirty)
    }

    pub fn is_displaced(&self, id: EntityId) -> Result<bool, LayoutError> {
        Ok(self.entity(id)?.displaced)
    }

    fn site_coordinate(&self, near: f64, size: f64, site: AnchorSite) -> f64 {
        match site {
            AnchorSite::Here => near,
            AnchorSite::Centre => self.round_position(near + size / 2.0),
            AnchorSite::Far => near + size,
        }
    }

    fn round_position(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.config.position_decimals);
        (value * factor).round() / factor
    }

    /// Anchor coordinate if the geometry it depends on is resolved
    fn try_anchor(&self, entity: &Entity, axis: Axis, site: AnchorSite, content: bool) -> Option<f64> {
        let (near, size) = if content {
            (entity.content_position(axis)?, entity.geometry.size(axis))
        } else {
            (entity.geometry.position(axis)?, entity.outer_size(axis))
        };
        match site {
            AnchorSite::Here => Some(near),
            _ => Some(self.site_coordinate(near, size?, site)),
        }
    }

    // ------------------------------------------------------------------
    // Geometry writes
    // ------------------------------------------------------------------

    /// Move the outer box's near edge on an axis
    pub fn set_position(&mut self, id: EntityId, axis: Axis, value: f64) -> Result<(), LayoutError> {
        if !value.is_finite() {
            return Err(LayoutError::unsupported(
                self.describe(id),
                format!("{axis} must be finite"),
            ));
        }
        self.write_position(id, axis, value).map(|_| ())
    }

    pub fn set_x(&mut self, id: EntityId, value: f64) -> Result<(), LayoutError> {
        self.set_position(id, Axis::X, value)
    }

    pub fn set_y(&mut self, id: EntityId, value: f64) -> Result<(), LayoutError> {
        self.set_position(id, Axis::Y, value)
    }

    pub fn move_to(&mut self, id: EntityId, x: f64, y: f64) -> Result<(), LayoutError> {
        self.set_x(id, x)?;
        self.set_y(id, y)
    }

    /// Set the content size on an axis
    ///
    /// Container sizes are derived from their children and cannot be set.
    pub fn set_content_size(
        &mut self,
        id: EntityId,
        axis: Axis,
        value: f64,
    ) -> Result<(), LayoutError> {
        if self.entity(id)?.container.is_some() {
            return Err(LayoutError::unsupported(
                self.describe(id),
                "container size is derived from its children",
            ));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(LayoutError::unsupported(
                self.describe(id),
                format!("{} must be a finite, non-negative number", size_property(axis)),
            ));
        }
        self.write_size(id, axis, value).map(|_| ())
    }

    pub fn set_content_width(&mut self, id: EntityId, value: f64) -> Result<(), LayoutError> {
        self.set_content_size(id, Axis::X, value)
    }

    pub fn set_content_height(&mut self, id: EntityId, value: f64) -> Result<(), LayoutError> {
        self.set_content_size(id, Axis::Y, value)
    }

    pub fn resize(&mut self, id: EntityId, width: f64, height: f64) -> Result<(), LayoutError> {
        self.set_content_width(id, width)?;
        self.set_content_height(id, height)
    }

    /// Move the entity so that its outer-box anchor lands on `value`
    pub fn set_anchor(
        &mut self,
        id: EntityId,
        axis: Axis,
        site: AnchorSite,
        value: f64,
    ) -> Result<(), LayoutError> {
        let near = match site {
            AnchorSite::Here => value,
            _ => value - self.outer_size(id, axis)? * site.fraction(),
        };
        self.set_position(id, axis, near)
    }

    pub fn set_padding(&mut self, id: EntityId, padding: Padding) -> Result<(), LayoutError> {
        if !padding.is_valid() {
            return Err(LayoutError::unsupported(
                self.describe(id),
                "padding must be finite and non-negative",
            ));
        }
        let entity = self.entity_mut(id)?;
        if entity.padding == padding {
            return Ok(());
        }
        entity.padding = padding;
        entity.dirty = true;
        self.record(id, GeometryChange::Padding);
        for axis in Axis::ALL {
            self.reanchor_incoming(id, axis)?;
        }
        self.enforce_binding(id)?;
        self.notify_change(id)
    }

    /// Set the rendering nudge; layout is unaffected
    pub fn set_offset(&mut self, id: EntityId, dx: f64, dy: f64) -> Result<(), LayoutError> {
        let entity = self.entity_mut(id)?;
        if entity.offset != (dx, dy) {
            entity.offset = (dx, dy);
            entity.dirty = true;
        }
        Ok(())
    }

    pub fn mark_dirty(&mut self, id: EntityId) -> Result<(), LayoutError> {
        self.entity_mut(id)?.dirty = true;
        Ok(())
    }

    /// Write a position and propagate: dirty, own bindings, subscribers
    pub(crate) fn write_position(
        &mut self,
        id: EntityId,
        axis: Axis,
        value: f64,
    ) -> Result<bool, LayoutError> {
        let entity = self.entity_mut(id)?;
        if entity.geometry.position(axis) == Some(value) {
            return Ok(false);
        }
        *entity.geometry.position_mut(axis) = Some(value);
        entity.dirty = true;
        self.record(id, GeometryChange::Position(axis));
        trace!(entity = %self.describe(id), %axis, value, "position written");

        self.enforce_binding(id)?;
        self.notify_change(id)?;
        Ok(true)
    }

    /// Write a content size and propagate
    pub(crate) fn write_size(
        &mut self,
        id: EntityId,
        axis: Axis,
        value: f64,
    ) -> Result<bool, LayoutError> {
        let entity = self.entity_mut(id)?;
        if entity.geometry.size(axis) == Some(value) {
            return Ok(false);
        }
        *entity.geometry.size_mut(axis) = Some(value);
        entity.dirty = true;
        self.record(id, GeometryChange::Size(axis));
        trace!(entity = %self.describe(id), %axis, value, "size written");

        self.reanchor_incoming(id, axis)?;
        self.enforce_binding(id)?;
        self.enforce_size_binding(id)?;
        self.notify_change(id)?;
        Ok(true)
    }

    fn record(&mut self, id: EntityId, change: GeometryChange) {
        self.stats.writes += 1;
        self.events.push(GeometryEvent { entity: id, change });
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Register a binding from `source` onto `binding.target`
    ///
    /// An existing binding for the same target and axis is overwritten.
    /// Registration does not enforce; call [`enforce_binding`](Self::enforce_binding).
    pub fn bind(&mut self, source: EntityId, binding: Binding) -> Result<(), LayoutError> {
        self.entity(source)?;
        self.entity(binding.target)?;
        if source == binding.target {
            return Err(LayoutError::unsupported(
                self.describe(source),
                "an entity cannot be bound to itself",
            ));
        }
        if !binding.offset.is_finite() {
            return Err(LayoutError::unsupported(
                self.describe(source),
                "binding offset must be finite",
            ));
        }
        if let Some(cycle) = self.graph.find_cycle(source, binding.target, binding.axis) {
            return Err(LayoutError::cycle(
                cycle.into_iter().map(|id| self.describe(id)).collect(),
            ));
        }

        let target = binding.target;
        let axis = binding.axis;
        if let Some(previous) = self.graph.insert(source, binding) {
            warn!(
                source = %self.describe(source),
                target = %self.describe(target),
                %axis,
                previous = ?previous.label,
                "binding overwritten"
            );
        }
        Ok(())
    }

    /// Remove bindings from `source` to `target`, on one axis or all
    pub fn remove_bind(
        &mut self,
        source: EntityId,
        target: EntityId,
        axis: Option<Axis>,
    ) -> Result<usize, LayoutError> {
        self.entity(source)?;
        Ok(self.graph.remove(source, target, axis))
    }

    /// Remove every outgoing binding of `source` on `axis`
    pub fn clear_bindings(&mut self, source: EntityId, axis: Axis) -> Result<Vec<Binding>, LayoutError> {
        self.entity(source)?;
        Ok(self.graph.clear_axis(source, axis))
    }

    /// Outgoing bindings in registration order
    pub fn bindings(&self, source: EntityId) -> &[Binding] {
        self.graph.outgoing(source)
    }

    /// Bindings ending at `target`, with their sources
    pub fn incoming(&self, target: EntityId) -> Vec<(EntityId, Binding)> {
        self.graph.incoming(target)
    }

    /// Mirror `source`'s content size onto `target` on `axis`
    pub fn bind_size(&mut self, source: EntityId, target: EntityId, axis: Axis) -> Result<(), LayoutError> {
        self.entity(source)?;
        if self.entity(target)?.container.is_some() {
            return Err(LayoutError::unsupported(
                self.describe(target),
                "container size is derived from its children and cannot be size-bound",
            ));
        }
        if source == target {
            return Err(LayoutError::unsupported(
                self.describe(source),
                "an entity cannot be size-bound to itself",
            ));
        }
        if let Some(cycle) = self.graph.find_size_cycle(source, target, axis) {
            return Err(LayoutError::cycle(
                cycle.into_iter().map(|id| self.describe(id)).collect(),
            ));
        }
        if !self.graph.insert_size(source, SizeBinding { target, axis }) {
            warn!(
                source = %self.describe(source),
                target = %self.describe(target),
                %axis,
                "size binding already registered"
            );
        }
        Ok(())
    }

    pub fn remove_size_bind(
        &mut self,
        source: EntityId,
        target: EntityId,
        axis: Option<Axis>,
    ) -> Result<usize, LayoutError> {
        self.entity(source)?;
        Ok(self.graph.remove_size(source, target, axis))
    }

    pub fn size_bindings(&self, source: EntityId) -> &[SizeBinding] {
        self.graph.size_outgoing(source)
    }

    /// Push this entity's anchors onto every bound target
    pub fn enforce_binding(&mut self, id: EntityId) -> Result<(), LayoutError> {
        self.enter_wave(id)?;
        let result = self.push_bindings(id);
        self.leave_wave();
        result
    }

    fn push_bindings(&mut self, source: EntityId) -> Result<(), LayoutError> {
        let edges = self.graph.outgoing(source).to_vec();
        if edges.is_empty() {
            return Ok(());
        }

        let mut pending = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.pending_value(source, &edge)?.is_some() {
                self.entity_mut(edge.target)?.displaced = true;
                pending.push(edge);
            }
        }

        let mut outcome = Ok(());
        for edge in &pending {
            if let Ok(target) = self.entity_mut(edge.target) {
                target.displaced = false;
            }
            if outcome.is_ok() {
                outcome = self.apply_binding(source, edge);
            }
        }
        outcome
    }

    fn apply_binding(&mut self, source: EntityId, edge: &Binding) -> Result<(), LayoutError> {
        match self.pending_value(source, edge)? {
            Some(value) => {
                trace!(
                    source = %self.describe(source),
                    target = %self.describe(edge.target),
                    axis = %edge.axis,
                    site = %edge.target_anchor,
                    value,
                    "binding applied"
                );
                self.place(edge.target, edge.axis, edge.target_anchor, value)
            }
            // Settled by an earlier edge of the same wave; containers that
            // skipped this target while it was displaced must still see it.
            None => self.notify_change(edge.target),
        }
    }

    /// The value an edge would write, or `None` if it is satisfied or
    /// cannot be evaluated yet
    fn pending_value(&self, source: EntityId, edge: &Binding) -> Result<Option<f64>, LayoutError> {
        let entity = self.entity(source)?;
        let Some(value) = self.try_anchor(entity, edge.axis, edge.anchor, edge.reference_content)
        else {
            return Ok(None);
        };
        let desired = value + edge.offset;

        let target = self.entity(edge.target)?;
        if edge.target_anchor != AnchorSite::Here && target.outer_size(edge.axis).is_none() {
            return Ok(None);
        }
        match self.try_anchor(target, edge.axis, edge.target_anchor, false) {
            Some(current) if approx_eq(current, desired) => Ok(None),
            _ => Ok(Some(desired)),
        }
    }

    /// Move `id` so that its outer anchor `site` sits at `value`
    fn place(&mut self, id: EntityId, axis: Axis, site: AnchorSite, value: f64) -> Result<(), LayoutError> {
        let near = match site {
            AnchorSite::Here => value,
            _ => value - self.outer_size(id, axis)? * site.fraction(),
        };
        self.write_position(id, axis, near).map(|_| ())
    }

    /// Re-satisfy edges that pin this entity's centre or far edge after its
    /// extent on `axis` changed
    fn reanchor_incoming(&mut self, id: EntityId, axis: Axis) -> Result<(), LayoutError> {
        for (source, edge) in self.graph.incoming(id) {
            if edge.axis != axis || edge.target_anchor == AnchorSite::Here {
                continue;
            }
            if let Some(value) = self.pending_value(source, &edge)? {
                self.place(id, axis, edge.target_anchor, value)?;
            }
        }
        Ok(())
    }

    /// Mirror this entity's content size onto its size-bound targets
    pub fn enforce_size_binding(&mut self, id: EntityId) -> Result<(), LayoutError> {
        let edges = self.graph.size_outgoing(id).to_vec();
        if edges.is_empty() {
            return Ok(());
        }
        self.enter_wave(id)?;
        let mut outcome = Ok(());
        for edge in edges {
            if let Some(size) = self.entity(id)?.geometry.size(edge.axis) {
                outcome = self.write_size(edge.target, edge.axis, size).map(|_| ());
                if outcome.is_err() {
                    break;
                }
            }
        }
        self.leave_wave();
        outcome
    }

    pub(crate) fn enter_wave(&mut self, id: EntityId) -> Result<(), LayoutError> {
        let entries = self.on_wave.get(&id).copied().unwrap_or(0);
        if entries > self.config.max_reentries {
            // path from the latest entry of `id` back to itself
            let start = self.wave.iter().rposition(|e| *e == id).unwrap_or(0);
            let mut cycle: Vec<String> = self.wave[start..].iter().map(|e| self.describe(*e)).collect();
            cycle.push(self.describe(id));
            warn!(
                depth = self.wave.len(),
                entries,
                entity = %self.describe(id),
                "entity re-entered by its own propagation wave"
            );
            return Err(LayoutError::cycle(cycle));
        }
        self.wave.push(id);
        *self.on_wave.entry(id).or_insert(0) += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.wave.len());
        Ok(())
    }

    pub(crate) fn leave_wave(&mut self) {
        if let Some(id) = self.wave.pop() {
            if let Some(entries) = self.on_wave.get_mut(&id) {
                *entries -= 1;
                if *entries == 0 {
                    self.on_wave.remove(&id);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions and events
    // ------------------------------------------------------------------

    /// Recompute `container`'s bounds whenever `source` changes
    pub fn subscribe(&mut self, source: EntityId, container: EntityId) -> Result<(), LayoutError> {
        if self.entity(container)?.container.is_none() {
            return Err(LayoutError::unsupported(
                self.describe(container),
                "only containers can subscribe to geometry changes",
            ));
        }
        let entity = self.entity_mut(source)?;
        if !entity.subscribers.contains(&container) {
            entity.subscribers.push(container);
        }
        Ok(())
    }

    pub fn unsubscribe(&mut self, source: EntityId, container: EntityId) -> Result<(), LayoutError> {
        self.entity_mut(source)?
            .subscribers
            .retain(|sub| *sub != container);
        Ok(())
    }

    /// Tell subscribed containers that `id` changed
    pub fn notify_change(&mut self, id: EntityId) -> Result<(), LayoutError> {
        let subscribers = self.entity(id)?.subscribers.clone();
        for container in subscribers {
            if self.contains(container) {
                self.compute_boundary(container)?;
            }
        }
        Ok(())
    }

    /// Geometry mutations recorded since the last drain
    pub fn events(&self) -> &[GeometryEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GeometryEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> PropagationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PropagationStats::default();
    }

    // ------------------------------------------------------------------
    // Container state helpers
    // ------------------------------------------------------------------

    pub(crate) fn container_state(&self, id: EntityId) -> Result<&ContainerState, LayoutError> {
        self.entity(id)?.container.as_ref().ok_or_else(|| {
            LayoutError::unsupported(self.describe(id), "entity is not a container")
        })
    }

    pub(crate) fn container_state_mut(
        &mut self,
        id: EntityId,
    ) -> Result<&mut ContainerState, LayoutError> {
        let label = self.describe(id);
        self.entity_mut(id)?
            .container
            .as_mut()
            .ok_or_else(|| LayoutError::unsupported(label, "entity is not a container"))
    }

    /// Children of a container in order
    pub fn children(&self, container: EntityId) -> Result<Vec<EntityId>, LayoutError> {
        Ok(self.container_state(container)?.child_ids().collect())
    }

    /// Cached union of a container's children
    pub fn child_bounds(&self, container: EntityId) -> Result<ChildBounds, LayoutError> {
        Ok(self.container_state(container)?.child_bounds)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Release erased render handles, then draw every dirty entity with
    /// resolved geometry in tree order. Returns the number drawn.
    pub fn draw(&mut self, surface: &mut impl Surface) -> usize {
        for handle in self.released.drain(..) {
            surface.release(handle);
        }
        let mut drawn = 0;
        for (id, depth) in self.tree_order() {
            let Some((handle, previous)) = self.draw_one(surface, id, depth) else {
                continue;
            };
            if let Ok(entity) = self.entity_mut(id) {
                entity.handle = Some(handle);
                entity.dirty = false;
            }
            if previous.is_none() {
                trace!(entity = %self.describe(id), "first draw");
            }
            drawn += 1;
        }
        drawn
    }

    fn draw_one(
        &self,
        surface: &mut impl Surface,
        id: EntityId,
        depth: usize,
    ) -> Option<(RenderHandle, Option<RenderHandle>)> {
        let entity = self.entity(id).ok()?;
        if !entity.dirty || entity.erased {
            return None;
        }
        let item = DrawItem {
            id,
            name: entity.name(),
            kind: entity.kind(),
            outer: self.outer_box(id).ok()?,
            content: self.content_box(id).ok()?,
            offset: entity.offset,
            depth,
        };
        Some((surface.draw(&item, entity.handle), entity.handle))
    }

    /// Take `id` and its descendants off the drawing
    ///
    /// Their render handles are released on the next [`draw`](Self::draw).
    pub fn erase(&mut self, id: EntityId) -> Result<(), LayoutError> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let entity = self.entity_mut(current)?;
            let handle = entity.handle.take();
            entity.erased = true;
            entity.dirty = true;
            if let Some(state) = &entity.container {
                stack.extend(state.child_ids());
            }
            self.released.extend(handle);
        }
        Ok(())
    }

    /// Put an erased subtree back on the drawing
    pub fn show(&mut self, id: EntityId) -> Result<(), LayoutError> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let entity = self.entity_mut(current)?;
            entity.erased = false;
            entity.dirty = true;
            if let Some(state) = &entity.container {
                stack.extend(state.child_ids());
            }
        }
        Ok(())
    }

    /// Remove an entity and its descendants from the diagram
    pub fn destroy(&mut self, id: EntityId) -> Result<(), LayoutError> {
        if let Some(parent) = self.entity(id)?.parent {
            self.remove(parent, id)?;
        } else {
            self.erase(id)?;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(state) = &self.entity(current)?.container {
                stack.extend(state.child_ids());
            }
            self.graph.detach(current);
            let slot = &mut self.slots[current.idx as usize];
            slot.entity = None;
            self.free_list.push(current.idx);
            debug!(entity = %current, "destroyed entity");
        }
        for slot in &mut self.slots {
            if let Some(entity) = &mut slot.entity {
                entity.subscribers.retain(|sub| *sub != id);
            }
        }
        Ok(())
    }

    /// Depth-first order of all entities, paired with their depth
    pub fn tree_order(&self) -> Vec<(EntityId, usize)> {
        let mut order = Vec::new();
        let mut stack: Vec<(EntityId, usize)> = self.roots().into_iter().rev().map(|id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            order.push((id, depth));
            if let Some(state) = self.entity(id).ok().and_then(|e| e.container.as_ref()) {
                let children: Vec<_> = state.child_ids().collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
        }
        order
    }

    /// Indented text dump of the resolved layout tree
    pub fn dump(&self) -> String {
        let fmt = |value: Option<f64>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        let mut out = String::new();
        for (id, depth) in self.tree_order() {
            let Ok(entity) = self.entity(id) else {
                continue;
            };
            let geometry = entity.geometry;
            out.push_str(&format!(
                "{}{} {} x={} y={} w={} h={}\n",
                "  ".repeat(depth),
                entity.kind().as_str(),
                self.describe(id),
                fmt(geometry.x),
                fmt(geometry.y),
                fmt(entity.outer_size(Axis::X)),
                fmt(entity.outer_size(Axis::Y)),
            ));
        }
        out
    }
}

fn size_property(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "content width",
        Axis::Y => "content height",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(diagram: &mut Diagram, name: &str, width: f64, height: f64) -> EntityId {
        diagram
            .create(EntityConfig::new().with_name(name).with_size(width, height))
            .unwrap()
    }

    #[test]
    fn test_unresolved_read_fails() {
        let mut diagram = Diagram::new();
        let a = diagram.create(EntityConfig::new().with_name("a")).unwrap();
        let err = diagram.x(a).unwrap_err();
        assert!(matches!(err, LayoutError::UnresolvedGeometry { .. }));
        assert!(err.to_string().contains("'a'"));
        assert!(diagram.content_width(a).is_err());
    }

    #[test]
    fn test_far_is_here_plus_size() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 12.0, 4.0);
        diagram.move_to(a, 3.0, 7.0).unwrap();
        for axis in Axis::ALL {
            assert_eq!(
                diagram.far(a, axis).unwrap(),
                diagram.here(a, axis).unwrap() + diagram.outer_size(a, axis).unwrap()
            );
        }
    }

    #[test]
    fn test_centre_is_rounded() {
        let mut diagram = Diagram::with_config(EngineConfig::new().with_position_decimals(2));
        let a = leaf(&mut diagram, "a", 1.0 / 3.0, 1.0);
        diagram.move_to(a, 0.0, 0.0).unwrap();
        assert_eq!(diagram.centre(a, Axis::X).unwrap(), 0.17);
    }

    #[test]
    fn test_padding_separates_boxes() {
        let mut diagram = Diagram::new();
        let a = diagram
            .create(
                EntityConfig::new()
                    .with_size(10.0, 10.0)
                    .with_position(0.0, 0.0)
                    .with_padding(Padding::new(1.0, 2.0, 3.0, 4.0)),
            )
            .unwrap();
        assert_eq!(diagram.outer_box(a).unwrap(), Rect::new(0.0, 0.0, 16.0, 14.0));
        assert_eq!(diagram.content_box(a).unwrap(), Rect::new(4.0, 1.0, 10.0, 10.0));
        assert_eq!(diagram.content_anchor(a, Axis::X, AnchorSite::Far).unwrap(), 14.0);
    }

    #[test]
    fn test_set_anchor_far() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        diagram.set_anchor(a, Axis::X, AnchorSite::Far, 50.0).unwrap();
        assert_eq!(diagram.x(a).unwrap(), 40.0);
    }

    #[test]
    fn test_set_anchor_far_needs_size() {
        let mut diagram = Diagram::new();
        let a = diagram.create(EntityConfig::new()).unwrap();
        let err = diagram.set_anchor(a, Axis::X, AnchorSite::Far, 50.0).unwrap_err();
        assert!(matches!(err, LayoutError::UnresolvedGeometry { .. }));
    }

    #[test]
    fn test_binding_pushes_offset() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        let b = leaf(&mut diagram, "b", 10.0, 10.0);
        diagram
            .bind(a, Binding::new(b, Axis::X, AnchorSite::Far, AnchorSite::Here).with_offset(5.0))
            .unwrap();
        diagram.set_x(a, 0.0).unwrap();
        assert_eq!(diagram.x(b).unwrap(), 15.0);
        diagram.set_x(a, 100.0).unwrap();
        assert_eq!(diagram.x(b).unwrap(), 115.0);
    }

    #[test]
    fn test_rebinding_overwrites() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        let b = leaf(&mut diagram, "b", 10.0, 10.0);
        diagram
            .bind(a, Binding::new(b, Axis::X, AnchorSite::Here, AnchorSite::Here))
            .unwrap();
        diagram
            .bind(a, Binding::new(b, Axis::X, AnchorSite::Far, AnchorSite::Here))
            .unwrap();
        assert_eq!(diagram.bindings(a).len(), 1);
        diagram.set_x(a, 0.0).unwrap();
        assert_eq!(diagram.x(b).unwrap(), 10.0);
    }

    #[test]
    fn test_self_binding_rejected() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        let err = diagram
            .bind(a, Binding::new(a, Axis::X, AnchorSite::Far, AnchorSite::Here))
            .unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedConfiguration { .. }));
    }

    #[test]
    fn test_size_change_reanchors_far_binding() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        let b = leaf(&mut diagram, "b", 4.0, 4.0);
        diagram
            .bind(a, Binding::new(b, Axis::X, AnchorSite::Far, AnchorSite::Far))
            .unwrap();
        diagram.set_x(a, 0.0).unwrap();
        assert_eq!(diagram.x(b).unwrap(), 6.0);
        diagram.set_content_width(b, 8.0).unwrap();
        assert_eq!(diagram.x(b).unwrap(), 2.0);
        assert_eq!(diagram.far(b, Axis::X).unwrap(), 10.0);
    }

    #[test]
    fn test_size_binding_mirrors() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        let b = leaf(&mut diagram, "b", 1.0, 1.0);
        diagram.bind_size(a, b, Axis::X).unwrap();
        diagram.set_content_width(a, 25.0).unwrap();
        assert_eq!(diagram.content_width(b).unwrap(), 25.0);
        assert_eq!(diagram.content_height(b).unwrap(), 1.0);
    }

    #[test]
    fn test_container_size_cannot_be_set() {
        let mut diagram = Diagram::new();
        let c = diagram.create_container(ContainerConfig::new()).unwrap();
        assert!(diagram.set_content_width(c, 5.0).is_err());
    }

    #[test]
    fn test_events_and_stats() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        diagram.set_x(a, 1.0).unwrap();
        diagram.set_x(a, 1.0).unwrap();
        assert_eq!(diagram.stats().writes, 1);
        let events = diagram.drain_events();
        assert_eq!(
            events,
            vec![GeometryEvent {
                entity: a,
                change: GeometryChange::Position(Axis::X)
            }]
        );
        assert!(diagram.events().is_empty());
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "a", 10.0, 10.0);
        diagram.destroy(a).unwrap();
        assert!(!diagram.contains(a));
        assert!(matches!(diagram.x(a), Err(LayoutError::UnknownEntity { .. })));
        let b = leaf(&mut diagram, "b", 1.0, 1.0);
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
    }

    #[test]
    fn test_find_by_name() {
        let mut diagram = Diagram::new();
        let a = leaf(&mut diagram, "pulse", 10.0, 10.0);
        assert_eq!(diagram.find("pulse"), Some(a));
        assert_eq!(diagram.find("missing"), None);
    }
}
