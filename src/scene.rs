//! TOML scene descriptions
//!
//! A scene is a forest of nodes plus the bindings between them, referenced by
//! name:
//!
//! ```toml
//! [[node]]
//! kind = "stack"
//! name = "sequence"
//! axis = "x"
//! x = 0.0
//! y = 0.0
//! alignment = "centre"
//!
//!   [[node.children]]
//!   kind = "box"
//!   name = "p90"
//!   width = 10.0
//!   height = 20.0
//!
//! [[node]]
//! kind = "box"
//! name = "label"
//! width = 6.0
//! height = 4.0
//!
//! [[binding]]
//! from = "p90"
//! to = "label"
//! axis = "x"
//! anchor = "centre"
//! target_anchor = "centre"
//! ```
//!
//! Building creates the node tree first, then registers position and size
//! bindings, then enforces them in declaration order.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SceneError;
use crate::layout::{
    find_similar, Alignment, AnchorSite, Axis, Binding, ContainerConfig, Diagram, EngineConfig,
    EntityConfig, EntityId, StackConfig,
};

/// A parsed scene
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    #[serde(rename = "node", default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(rename = "binding", default)]
    pub bindings: Vec<BindingSpec>,
    #[serde(rename = "size_binding", default)]
    pub size_bindings: Vec<SizeBindingSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSpec {
    Box(BoxNode),
    Container(ContainerNode),
    Stack(StackNode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxNode {
    #[serde(flatten)]
    pub entity: EntityConfig,
    /// Alignment inside a parent stack
    pub align: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerNode {
    #[serde(flatten)]
    pub entity: EntityConfig,
    pub align: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackNode {
    #[serde(flatten)]
    pub entity: EntityConfig,
    pub axis: Axis,
    /// Default alignment of this stack's children
    pub alignment: Option<String>,
    pub bind_main_axis: Option<bool>,
    pub min_cross_axis: Option<f64>,
    pub align: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindingSpec {
    pub from: String,
    pub to: String,
    pub axis: Axis,
    pub anchor: String,
    /// Defaults to `anchor`
    pub target_anchor: Option<String>,
    #[serde(default)]
    pub offset: f64,
    pub label: Option<String>,
    pub reference_content: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizeBindingSpec {
    pub from: String,
    pub to: String,
    pub axis: Axis,
}

impl NodeSpec {
    fn align(&self) -> Option<&str> {
        match self {
            NodeSpec::Box(node) => node.align.as_deref(),
            NodeSpec::Container(node) => node.align.as_deref(),
            NodeSpec::Stack(node) => node.align.as_deref(),
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            NodeSpec::Box(node) => node.entity.name.as_deref(),
            NodeSpec::Container(node) => node.entity.name.as_deref(),
            NodeSpec::Stack(node) => node.entity.name.as_deref(),
        }
    }

    fn children(&self) -> &[NodeSpec] {
        match self {
            NodeSpec::Box(_) => &[],
            NodeSpec::Container(node) => &node.children,
            NodeSpec::Stack(node) => &node.children,
        }
    }
}

/// A diagram built from a scene, with its node names
#[derive(Debug)]
pub struct BuiltScene {
    pub diagram: Diagram,
    pub names: HashMap<String, EntityId>,
}

impl BuiltScene {
    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }
}

impl Scene {
    pub fn parse(source: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    /// Build the scene into a fresh diagram
    pub fn build(&self, config: EngineConfig) -> Result<BuiltScene, SceneError> {
        let mut builder = Builder {
            diagram: Diagram::with_config(config),
            names: HashMap::new(),
        };

        for node in &self.nodes {
            builder.create_tree(node, None)?;
        }

        let mut sources = Vec::new();
        for spec in &self.bindings {
            let from = builder.resolve(&spec.from)?;
            let to = builder.resolve(&spec.to)?;
            let anchor: AnchorSite = spec.anchor.parse()?;
            let target_anchor: AnchorSite = match &spec.target_anchor {
                Some(site) => site.parse()?,
                None => anchor,
            };
            let mut binding = Binding::new(to, spec.axis, anchor, target_anchor).with_offset(spec.offset);
            if let Some(label) = &spec.label {
                binding = binding.with_label(label.clone());
            }
            if spec.reference_content == Some(false) {
                binding = binding.box_relative();
            }
            builder.diagram.bind(from, binding)?;
            sources.push(from);
        }

        let mut size_sources = Vec::new();
        for spec in &self.size_bindings {
            let from = builder.resolve(&spec.from)?;
            let to = builder.resolve(&spec.to)?;
            builder.diagram.bind_size(from, to, spec.axis)?;
            size_sources.push(from);
        }

        for source in sources {
            builder.diagram.enforce_binding(source)?;
        }
        for source in size_sources {
            builder.diagram.enforce_size_binding(source)?;
        }

        info!(
            entities = builder.diagram.len(),
            bindings = self.bindings.len(),
            "scene built"
        );
        Ok(BuiltScene {
            diagram: builder.diagram,
            names: builder.names,
        })
    }
}

struct Builder {
    diagram: Diagram,
    names: HashMap<String, EntityId>,
}

impl Builder {
    fn create_tree(&mut self, node: &NodeSpec, parent: Option<EntityId>) -> Result<EntityId, SceneError> {
        if let Some(name) = node.name() {
            if self.names.contains_key(name) {
                return Err(SceneError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        let id = match node {
            NodeSpec::Box(spec) => self.diagram.create(spec.entity.clone())?,
            NodeSpec::Container(spec) => self.diagram.create_container(ContainerConfig {
                entity: spec.entity.clone(),
            })?,
            NodeSpec::Stack(spec) => {
                let mut config = StackConfig::new(spec.axis);
                config.entity = spec.entity.clone();
                if let Some(alignment) = &spec.alignment {
                    config = config.with_alignment(alignment.parse()?);
                }
                if let Some(bind) = spec.bind_main_axis {
                    config = config.with_bind_main_axis(bind);
                }
                if let Some(min) = spec.min_cross_axis {
                    config = config.with_min_cross_axis(min);
                }
                self.diagram.create_stack(config)?
            }
        };
        if let Some(name) = node.name() {
            self.names.insert(name.to_string(), id);
        }

        if let Some(parent) = parent {
            match node.align() {
                Some(align) => {
                    let alignment: Alignment = align.parse()?;
                    self.diagram.add_aligned(parent, id, None, alignment)?;
                }
                None => self.diagram.add(parent, id, None)?,
            }
        }

        for child in node.children() {
            self.create_tree(child, Some(id))?;
        }
        debug!(node = %self.diagram.describe(id), "node built");
        Ok(id)
    }

    fn resolve(&self, name: &str) -> Result<EntityId, SceneError> {
        self.names.get(name).copied().ok_or_else(|| {
            let suggestions = find_similar(self.names.keys().map(String::as_str), name, 2);
            SceneError::unknown_node(name, suggestions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutError;

    #[test]
    fn test_parse_nested_nodes() {
        let scene = Scene::parse(
            r#"
            [[node]]
            kind = "stack"
            name = "seq"
            axis = "y"

              [[node.children]]
              kind = "box"
              name = "a"
              width = 3.0
              height = 4.0
            "#,
        )
        .unwrap();
        assert_eq!(scene.nodes.len(), 1);
        let NodeSpec::Stack(stack) = &scene.nodes[0] else {
            panic!("expected a stack");
        };
        assert_eq!(stack.axis, Axis::Y);
        assert_eq!(stack.children.len(), 1);
        assert_eq!(stack.children[0].name(), Some("a"));
    }

    #[test]
    fn test_unknown_node_suggests() {
        let scene = Scene::parse(
            r#"
            [[node]]
            kind = "box"
            name = "gradient"

            [[node]]
            kind = "box"
            name = "pulse"

            [[binding]]
            from = "gradent"
            to = "pulse"
            axis = "x"
            anchor = "far"
            "#,
        )
        .unwrap();
        let err = scene.build(EngineConfig::default()).unwrap_err();
        match err {
            SceneError::UnknownNode { name, suggestions } => {
                assert_eq!(name, "gradent");
                assert_eq!(suggestions, vec!["gradient".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_name() {
        let scene = Scene::parse(
            r#"
            [[node]]
            kind = "box"
            name = "a"

            [[node]]
            kind = "box"
            name = "a"
            "#,
        )
        .unwrap();
        assert!(matches!(
            scene.build(EngineConfig::default()),
            Err(SceneError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_bad_anchor_site() {
        let scene = Scene::parse(
            r#"
            [[node]]
            kind = "box"
            name = "a"

            [[node]]
            kind = "box"
            name = "b"

            [[binding]]
            from = "a"
            to = "b"
            axis = "x"
            anchor = "middle"
            "#,
        )
        .unwrap();
        assert!(matches!(
            scene.build(EngineConfig::default()),
            Err(SceneError::Layout(LayoutError::UnknownAnchorSite { .. }))
        ));
    }

    #[test]
    fn test_bindings_enforced_after_build() {
        let scene = Scene::parse(
            r#"
            [[node]]
            kind = "box"
            name = "a"
            x = 0.0
            y = 0.0
            width = 10.0
            height = 10.0

            [[node]]
            kind = "box"
            name = "b"
            y = 0.0
            width = 4.0
            height = 4.0

            [[binding]]
            from = "a"
            to = "b"
            axis = "x"
            anchor = "far"
            target_anchor = "here"
            offset = 2.0

            [[size_binding]]
            from = "a"
            to = "b"
            axis = "y"
            "#,
        )
        .unwrap();
        let built = scene.build(EngineConfig::default()).unwrap();
        let b = built.get("b").unwrap();
        assert_eq!(built.diagram.x(b).unwrap(), 12.0);
        assert_eq!(built.diagram.content_height(b).unwrap(), 10.0);
    }
}
