//! Error types for loading scenes

use thiserror::Error;

use crate::layout::LayoutError;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid scene: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot read scene: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown node '{name}'{}", format_suggestions(.suggestions))]
    UnknownNode {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("node name '{name}' is used more than once")]
    DuplicateName { name: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl SceneError {
    pub fn unknown_node(name: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::UnknownNode {
            name: name.into(),
            suggestions,
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean {}?", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node_with_suggestions() {
        let err = SceneError::unknown_node("p9", vec!["p90".to_string()]);
        assert_eq!(err.to_string(), "unknown node 'p9'; did you mean p90?");
    }

    #[test]
    fn test_unknown_node_without_suggestions() {
        let err = SceneError::unknown_node("zz", vec![]);
        assert_eq!(err.to_string(), "unknown node 'zz'");
    }

    #[test]
    fn test_layout_error_is_transparent() {
        let err: SceneError = LayoutError::unknown_anchor_site("middle").into();
        assert!(err.to_string().starts_with("unknown anchor site 'middle'"));
    }
}
