//! Spatial binding and incremental layout
//!
//! Entities live in a [`Diagram`] arena and are related by directed
//! [`Binding`] edges. Mutations propagate synchronously through bindings and
//! up into [containers](container) and [stacks](stack), which re-derive their
//! bounds from their children.

pub mod binding;
pub mod config;
pub mod container;
pub mod engine;
pub mod entity;
pub mod error;
pub mod id;
pub mod stack;
pub mod types;

pub use binding::{Binding, BindingGraph, SizeBinding};
pub use config::{ContainerConfig, EngineConfig, EntityConfig, StackConfig};
pub use container::{Aggregate, ContainerPolicy, LayoutPolicy};
pub use engine::{Diagram, GeometryChange, GeometryEvent, PropagationStats};
pub use entity::{ChildSlot, Entity, EntityKind, Geometry};
pub use error::LayoutError;
pub use id::EntityId;
pub use stack::StackLayout;
pub use types::*;

/// Calculate Levenshtein distance between two strings
pub(crate) fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for i in 1..=m {
        row[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Names within `max_distance` edits of `target`, closest first
pub(crate) fn find_similar<'a>(
    names: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = names
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist > 0 && dist <= max_distance).then_some((name, dist))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    candidates.dedup();
    candidates
        .into_iter()
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}
