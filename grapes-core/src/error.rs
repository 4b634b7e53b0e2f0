//! Error types for grapes-core.
//!
//! Structural and query errors surface immediately. Evaluation errors raised
//! while running a recipe are either swallowed (tolerant mode) or wrapped in
//! [`GraphError::Evaluation`] together with the name of the failing node.

use thiserror::Error;

use crate::value::RecipeError;

/// Errors that can occur while building, querying or evaluating a graph.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// A step declared dependencies but no recipe to consume them.
    #[error("cannot add node `{0}` with dependencies without a recipe")]
    DependencyWithoutRecipe(String),

    /// The named node is not part of the graph.
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    /// A structural attribute was queried before being set.
    #[error("node `{node}` has no {attribute}")]
    MissingAttribute {
        /// Node name.
        node: String,
        /// Attribute name.
        attribute: &'static str,
    },

    /// The node holds no value.
    #[error("node `{0}` has no value")]
    MissingValue(String),

    /// The node holds no reachability.
    #[error("node `{0}` has no reachability")]
    MissingReachability(String),

    /// A reachability was not one of `unreachable`, `uncertain`, `reachable`.
    #[error("`{0}` is not a valid reachability value")]
    InvalidReachability(String),

    /// A node kind other than `standard` or `conditional`.
    #[error("nodes of kind `{0}` are not supported")]
    UnsupportedNodeKind(String),

    /// Fusion was asked to inline something that is not a standard step.
    #[error("simplification only supports standard nodes, but `{node}` is {kind}")]
    UnsupportedSimplification {
        /// Offending node.
        node: String,
        /// Its kind.
        kind: String,
    },

    /// A conditional was evaluated, no condition held and there is no default.
    #[error("no condition of conditional `{0}` is true and it has no default")]
    NoTrueCondition(String),

    /// A conditional cannot be collapsed because its branch is still unknown.
    #[error("cannot convert conditional `{0}` if no condition is true")]
    UndecidedConditional(String),

    /// Conditions and possibilities have incompatible lengths.
    #[error(
        "conditional `{node}` has {conditions} conditions but {possibilities} possibilities"
    )]
    InvalidPossibilities {
        /// Conditional name.
        node: String,
        /// Number of conditions.
        conditions: usize,
        /// Number of possibilities.
        possibilities: usize,
    },

    /// Two graphs disagree on a shared node.
    #[error("cannot merge incompatible graphs")]
    IncompatibleGraphs,

    /// A value handed to a recipe-deriving builder is not usable as a recipe.
    #[error("value given for `{0}` is not a recipe with a fixed parameter list")]
    NonFunctionRecipe(String),

    /// Graph contains a cycle.
    #[error("cycle detected in graph")]
    CycleDetected,

    /// A recipe returned an error.
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// Failure while computing a specific node.
    #[error("While evaluating `{node}`: {source}")]
    Evaluation {
        /// The node whose recipe failed.
        node: String,
        /// Underlying cause.
        source: Box<GraphError>,
    },
}

impl GraphError {
    pub(crate) fn missing(node: &str, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            node: node.to_owned(),
            attribute,
        }
    }

    /// Name of the node an [`Evaluation`](GraphError::Evaluation) error refers to.
    pub fn failing_node(&self) -> Option<&str> {
        match self {
            Self::Evaluation { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_is_prefixed_with_node_name() {
        let err = GraphError::Evaluation {
            node: "sum".into(),
            source: Box::new(RecipeError::new("boom").into()),
        };
        assert_eq!(err.to_string(), "While evaluating `sum`: boom");
        assert_eq!(err.failing_node(), Some("sum"));
    }

    #[test]
    fn missing_attribute_message() {
        let err = GraphError::missing("a", "recipe");
        assert_eq!(err.to_string(), "node `a` has no recipe");
        assert!(err.failing_node().is_none());
    }
}
