//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! A node has a shared header (cached value, frozen flag, recipe flag,
//! generation index, cached reachability, adjacency) and a body that depends
//! on its kind: a standard step names a recipe and its dependencies, a
//! conditional names its conditions and possibilities. Dependencies inside a
//! body are referenced by name; edges are referenced by [`NodeId`].

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::error::GraphError;
use crate::value::Value;

new_key_type! {
    /// Handle to a node in a graph's arena.
    ///
    /// Handles are versioned: once a node is removed its handle never
    /// resolves again, even if the slot is reused.
    pub struct NodeId;
}

/// Whether a node can ever obtain a value.
///
/// Ordered from worst to best, so the worst of several reachabilities is
/// their minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Unreachable,
    Uncertain,
    Reachable,
}

impl Reachability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reachability::Unreachable => "unreachable",
            Reachability::Uncertain => "uncertain",
            Reachability::Reachable => "reachable",
        }
    }
}

impl FromStr for Reachability {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unreachable" => Ok(Reachability::Unreachable),
            "uncertain" => Ok(Reachability::Uncertain),
            "reachable" => Ok(Reachability::Reachable),
            other => Err(GraphError::InvalidReachability(other.to_owned())),
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Standard,
    Conditional,
}

impl FromStr for Kind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Kind::Standard),
            "conditional" => Ok(Kind::Conditional),
            other => Err(GraphError::UnsupportedNodeKind(other.to_owned())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Standard => f.write_str("standard"),
            Kind::Conditional => f.write_str("conditional"),
        }
    }
}

/// Recipe and dependencies of a standard node.
///
/// Steps are declared through the graph builders, which also add the
/// matching edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Name of the node holding the callable.
    pub(crate) recipe: String,
    /// Dependencies bound positionally, in order.
    pub(crate) args: SmallVec<[String; 4]>,
    /// Parameter name to dependency node name.
    pub(crate) kwargs: IndexMap<String, String>,
}

impl Step {
    /// Name of the node holding the callable.
    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    /// Positional dependencies, in call order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Parameter name to dependency node name.
    pub fn kwargs(&self) -> &IndexMap<String, String> {
        &self.kwargs
    }

    /// Argument and keyword dependencies, recipe excluded.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .chain(self.kwargs.values())
            .map(String::as_str)
    }
}

/// Conditions and possibilities of a conditional node.
///
/// Only [`Branches::new`] builds one, so `possibilities` always has as many
/// entries as `conditions`, or one more:
///
/// ```compile_fail
/// use grapes_core::graph::Branches;
///
/// let branches = Branches {
///     conditions: vec!["p".to_owned()],
///     possibilities: Vec::new(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Branches {
    pub(crate) conditions: Vec<String>,
    /// Same length as `conditions`, or one longer when the last entry is the
    /// default taken when no condition holds.
    pub(crate) possibilities: Vec<String>,
}

impl Branches {
    /// Pair `conditions` with `possibilities`, failing with
    /// [`GraphError::InvalidPossibilities`] when the lengths do not fit.
    pub fn new(
        node: &str,
        conditions: Vec<String>,
        possibilities: Vec<String>,
    ) -> Result<Self, GraphError> {
        let n = conditions.len();
        if possibilities.len() != n && possibilities.len() != n + 1 {
            return Err(GraphError::InvalidPossibilities {
                node: node.to_owned(),
                conditions: n,
                possibilities: possibilities.len(),
            });
        }
        Ok(Self {
            conditions,
            possibilities,
        })
    }

    /// Conditions in the order they are tried.
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Possibilities paired with `conditions`, default last.
    pub fn possibilities(&self) -> &[String] {
        &self.possibilities
    }

    /// The default possibility, if there is one.
    pub fn default_possibility(&self) -> Option<&str> {
        (self.possibilities.len() == self.conditions.len() + 1)
            .then(|| self.possibilities.last().map(String::as_str))
            .flatten()
    }

    /// Every condition and possibility, conditions first.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .chain(self.possibilities.iter())
            .map(String::as_str)
    }
}

/// Kind-specific part of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A value, or a step computed by a recipe. `None` until a recipe is declared.
    Standard(Option<Step>),
    /// A choice among possibilities driven by conditions.
    Conditional(Branches),
}

impl NodeKind {
    /// The kind tag of this body.
    pub fn kind(&self) -> Kind {
        match self {
            NodeKind::Standard(_) => Kind::Standard,
            NodeKind::Conditional(_) => Kind::Conditional,
        }
    }

    /// The step of a standard node with a recipe.
    pub fn step(&self) -> Option<&Step> {
        match self {
            NodeKind::Standard(step) => step.as_ref(),
            NodeKind::Conditional(_) => None,
        }
    }

    pub fn branches(&self) -> Option<&Branches> {
        match self {
            NodeKind::Conditional(branches) => Some(branches),
            NodeKind::Standard(_) => None,
        }
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Standard(None)
    }
}

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    kind: NodeKind,

    /// Cached result. Kept when unset so that `has_value` alone decides
    /// visibility.
    value: Option<Value>,
    has_value: bool,

    frozen: bool,
    recipe: bool,

    /// Topological layer, -1 until computed.
    generation: i64,

    reachability: Option<Reachability>,
    has_reachability: bool,

    /// Nodes this node consumes, in declaration order.
    dependencies: IndexSet<NodeId>,

    /// Nodes consuming this node.
    dependents: IndexSet<NodeId>,
}

impl Node {
    /// Create a fresh standard node with no value and no recipe.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::default(),
            value: None,
            has_value: false,
            frozen: false,
            recipe: false,
            generation: -1,
            reachability: None,
            has_reachability: false,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind-specific body.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Replace the body. Edges are not touched, so callers keep them in step.
    pub(crate) fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    /// The cached value, if the node currently has one.
    pub fn value(&self) -> Option<&Value> {
        if self.has_value {
            self.value.as_ref()
        } else {
            None
        }
    }

    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// Cache a value and make it visible.
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
        self.has_value = true;
    }

    /// Hide the cached value without dropping it.
    pub fn unset_value(&mut self) {
        self.has_value = false;
    }

    /// Whether the cached value holds and counts as true.
    pub fn is_true(&self) -> bool {
        self.value().map_or(false, Value::is_truthy)
    }

    /// Whether bulk clears skip this node.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Whether this node holds a callable used by other nodes.
    pub fn is_recipe(&self) -> bool {
        self.recipe
    }

    pub fn set_recipe(&mut self, is_recipe: bool) {
        self.recipe = is_recipe;
    }

    /// Topological layer, -1 until computed.
    pub fn generation_index(&self) -> i64 {
        self.generation
    }

    pub fn set_generation_index(&mut self, index: i64) {
        self.generation = index;
    }

    /// The cached reachability, if computed.
    pub fn reachability(&self) -> Option<Reachability> {
        if self.has_reachability {
            self.reachability
        } else {
            None
        }
    }

    pub fn has_reachability(&self) -> bool {
        self.reachability().is_some()
    }

    pub fn set_reachability(&mut self, reachability: Reachability) {
        self.reachability = Some(reachability);
        self.has_reachability = true;
    }

    /// Forget the cached reachability.
    pub fn unset_reachability(&mut self) {
        self.has_reachability = false;
    }

    /// Return every runtime and structural attribute to its starting state.
    /// Edges are left alone.
    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.name);
        let dependencies = std::mem::take(&mut self.dependencies);
        let dependents = std::mem::take(&mut self.dependents);
        *self = Node::new(name);
        self.dependencies = dependencies;
        self.dependents = dependents;
    }

    /// Compare every attribute except the name and the edges.
    pub fn same_attributes(&self, other: &Node) -> bool {
        self.kind == other.kind
            && self.value() == other.value()
            && self.frozen == other.frozen
            && self.recipe == other.recipe
            && self.generation == other.generation
            && self.reachability() == other.reachability()
    }

    /// Nodes this node consumes, in declaration order.
    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    /// Nodes consuming this node.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }

    pub(crate) fn add_dependency(&mut self, node_id: NodeId) {
        self.dependencies.insert(node_id);
    }

    pub(crate) fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.shift_remove(&node_id);
    }

    pub(crate) fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    pub(crate) fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn new_node_starts_empty() {
        let node = Node::new("a");
        assert_eq!(node.name(), "a");
        assert_eq!(node.kind().kind(), Kind::Standard);
        assert!(!node.has_value());
        assert!(!node.is_frozen());
        assert!(!node.is_recipe());
        assert_eq!(node.generation_index(), -1);
        assert!(node.reachability().is_none());
    }

    #[test]
    fn unset_value_hides_payload() {
        let mut node = Node::new("a");
        node.set_value(Value::from(3));
        assert_eq!(node.value(), Some(&Value::from(3)));
        node.unset_value();
        assert!(node.value().is_none());
        assert!(!node.is_true());
    }

    #[test]
    fn reachability_order_is_worst_first() {
        assert!(Reachability::Unreachable < Reachability::Uncertain);
        assert!(Reachability::Uncertain < Reachability::Reachable);
        assert_eq!(
            [Reachability::Reachable, Reachability::Uncertain].iter().min(),
            Some(&Reachability::Uncertain)
        );
    }

    #[test]
    fn reachability_parsing() {
        assert_eq!("uncertain".parse::<Reachability>().unwrap(), Reachability::Uncertain);
        assert!(matches!(
            "maybe".parse::<Reachability>(),
            Err(GraphError::InvalidReachability(s)) if s == "maybe"
        ));
        let json = serde_json::to_string(&Reachability::Reachable).unwrap();
        assert_eq!(json, "\"reachable\"");
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("conditional".parse::<Kind>().unwrap(), Kind::Conditional);
        assert!(matches!("loop".parse::<Kind>(), Err(GraphError::UnsupportedNodeKind(_))));
    }

    #[test]
    fn branches_length_rule() {
        let ok = Branches::new("c", vec!["p".into()], vec!["x".into(), "y".into()]).unwrap();
        assert_eq!(ok.default_possibility(), Some("y"));

        let exact = Branches::new("c", vec!["p".into()], vec!["x".into()]).unwrap();
        assert_eq!(exact.default_possibility(), None);

        let bad = Branches::new("c", vec!["p".into()], vec![]);
        assert!(matches!(bad, Err(GraphError::InvalidPossibilities { .. })));
    }

    #[test]
    fn reset_keeps_edges() {
        let mut ids: SlotMap<NodeId, ()> = SlotMap::with_key();
        let dep = ids.insert(());

        let mut node = Node::new("c");
        node.add_dependency(dep);
        node.set_value(Value::from(1));
        node.set_frozen(true);
        node.reset();

        assert!(!node.has_value());
        assert!(!node.is_frozen());
        assert!(node.dependencies().contains(&dep));
    }

    #[test]
    fn attribute_comparison_ignores_edges() {
        let mut ids: SlotMap<NodeId, ()> = SlotMap::with_key();
        let dep = ids.insert(());

        let mut a = Node::new("n");
        let b = Node::new("n");
        a.add_dependency(dep);
        assert!(a.same_attributes(&b));

        a.set_recipe(true);
        assert!(!a.same_attributes(&b));
    }
}
