//! Simplification
//!
//! Structural rewrites that shrink a graph while preserving what its nodes
//! evaluate to.
//!
//! # Fusion
//!
//! [`Graph::simplify_dependency`] inlines a dependency into its consumer.
//! For `y = f(x)` and `x = g(u)`, the result is `y = f∘g(u)`: `x` is no
//! longer a dependency of `y`, `u` is. After fusion the consumer only has
//! keyword dependencies, each keyed by the name of the node providing it,
//! and its recipe is a [`Composition`] that rebuilds the original call.
//!
//! The composed callable is stored on the consumer's recipe node when
//! nothing else uses that node. Otherwise it goes to a dedicated
//! `composed_recipe_for_<node>` node so other consumers keep the original.
//!
//! # Trivial Steps
//!
//! Once a conditional's branch is decided it can be rewritten as a plain
//! step returning the chosen possibility through an identity recipe.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::{Graph, Kind, NodeId, NodeKind, Step};
use crate::error::{GraphError, Result};
use crate::value::{Composition, Recipe, Slot};

impl Graph {
    /// Inline `dependency`'s recipe into `node`'s recipe.
    pub fn simplify_dependency(&mut self, node: &str, dependency: &str) -> Result<()> {
        let step = self.fusible_step(node)?.clone();
        let inner = self.fusible_step(dependency)?.clone();
        if !step.dependencies().any(|d| d == dependency) {
            return Err(GraphError::missing(node, "such dependency"));
        }
        let outer_recipe = self.recipe_value(&step.recipe)?;
        let inner_recipe = self.recipe_value(&inner.recipe)?;

        let slot = |source: &str| {
            if source == dependency {
                Slot::Inline {
                    recipe: inner_recipe.clone(),
                    args: inner.args.to_vec(),
                    kwargs: inner.kwargs.clone(),
                }
            } else {
                Slot::Identity(source.to_owned())
            }
        };
        let composed = Composition {
            outer: outer_recipe,
            args: step.args.iter().map(|a| slot(a.as_str())).collect(),
            kwargs: step
                .kwargs
                .iter()
                .map(|(param, source)| (param.clone(), slot(source.as_str())))
                .collect(),
        }
        .into_recipe();

        let kwargs: IndexMap<String, String> = step
            .dependencies()
            .chain(inner.dependencies())
            .filter(|&d| d != dependency)
            .map(|d| (d.to_owned(), d.to_owned()))
            .collect();

        let id = self.id(node)?;
        let recipe = self.recipe_target(id, &step.recipe)?;
        self.set_value(&recipe, composed)?;

        let dependency_id = self.id(dependency)?;
        self.unlink(dependency_id, id);
        for upstream in inner.dependencies() {
            let upstream_id = self.id(upstream)?;
            self.link(upstream_id, id);
        }
        self.nodes[id].set_kind(NodeKind::Standard(Some(Step {
            recipe,
            args: Default::default(),
            kwargs,
        })));
        debug!(node, dependency, "fused dependency");
        Ok(())
    }

    /// Fuse every dependency of `node` that is neither excluded nor a source.
    pub fn simplify_all_dependencies(&mut self, node: &str, exclude: &[&str]) -> Result<()> {
        let sources = self.sources(false);
        let candidates: IndexSet<String> = self
            .fusible_step(node)?
            .dependencies()
            .filter(|d| !exclude.contains(d) && !sources.contains(d))
            .map(str::to_owned)
            .collect();
        for dependency in candidates {
            self.simplify_dependency(node, &dependency)?;
        }
        Ok(())
    }

    /// Rewrite a decided conditional as a step returning its selected
    /// possibility. With `force_decide`, conditions are evaluated first.
    pub fn convert_conditional_to_trivial_step(
        &mut self,
        conditional: &str,
        force_decide: bool,
    ) -> Result<()> {
        if force_decide {
            self.execute_towards_all_conditions_of_conditional(conditional)?;
        }
        let branches = self.branches_of(conditional)?.clone();
        let mut decided = None;
        for (index, condition) in branches.conditions.iter().enumerate() {
            if self.is_true(condition)? {
                decided = Some(index);
                break;
            }
        }
        let selected = match decided {
            Some(index) => branches.possibilities[index].clone(),
            None => branches
                .default_possibility()
                .map(str::to_owned)
                .ok_or_else(|| GraphError::UndecidedConditional(conditional.to_owned()))?,
        };

        let id = self.id(conditional)?;
        for member in branches.members() {
            let member_id = self.id(member)?;
            self.unlink(member_id, id);
        }
        self.nodes[id].reset();

        let recipe = format!("trivial_recipe_for_{}", conditional);
        self.add_step(conditional, Some(recipe.as_str()), &[selected.as_str()], &[])?;
        self.set_value(&recipe, Recipe::identity())?;
        debug!(node = conditional, branch = %selected, "collapsed conditional");
        Ok(())
    }

    /// Collapse every conditional in the graph.
    pub fn convert_all_conditionals_to_trivial_steps(&mut self, force_decide: bool) -> Result<()> {
        let conditionals: Vec<String> =
            self.conditionals().into_iter().map(str::to_owned).collect();
        for conditional in conditionals {
            self.convert_conditional_to_trivial_step(&conditional, force_decide)?;
        }
        Ok(())
    }

    /// The step of a node that may take part in fusion, together with a
    /// check that its recipe node is a standard node.
    fn fusible_step(&self, name: &str) -> Result<&Step> {
        let unsupported = |node: &str, kind: Kind| GraphError::UnsupportedSimplification {
            node: node.to_owned(),
            kind: kind.to_string(),
        };
        let node = self.node(name)?;
        let step = match node.kind() {
            NodeKind::Standard(Some(step)) => step,
            NodeKind::Standard(None) => return Err(GraphError::missing(name, "recipe")),
            NodeKind::Conditional(_) => return Err(unsupported(name, Kind::Conditional)),
        };
        match self.kind(&step.recipe)? {
            Kind::Standard => Ok(step),
            kind => Err(unsupported(&step.recipe, kind)),
        }
    }

    fn recipe_value(&self, name: &str) -> Result<Recipe> {
        self.get_value(name)?
            .as_recipe()
            .cloned()
            .ok_or_else(|| GraphError::NonFunctionRecipe(name.to_owned()))
    }

    /// Name of the node that should hold `node`'s composed recipe, creating
    /// and wiring a dedicated one when `current` is shared or computed.
    fn recipe_target(&mut self, node: NodeId, current: &str) -> Result<String> {
        let current_id = self.id(current)?;
        let recipe = &self.nodes[current_id];
        let exclusive = recipe.dependents().len() == 1 && recipe.dependencies().is_empty();
        if exclusive {
            return Ok(current.to_owned());
        }

        let dedicated = format!("composed_recipe_for_{}", self.name_of(node));
        let dedicated_id = self.add_node_if_absent(&dedicated);
        self.nodes[dedicated_id].set_recipe(true);
        self.unlink(current_id, node);
        self.link(dedicated_id, node);
        Ok(dedicated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalMode;
    use crate::value::{Arguments, Value};

    fn double() -> Recipe {
        Recipe::named("double", |a: &Arguments| Ok(Value::from(a.arg(0)?.try_i64()? * 2)))
    }

    fn minus() -> Recipe {
        Recipe::named("minus", |a: &Arguments| {
            Ok(Value::from(a.arg(0)?.try_i64()? - a.kwarg("rhs")?.try_i64()?))
        })
    }

    /// y = minus(x, rhs=v), x = double(u)
    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph.add_step("x", Some("g"), &["u"], &[]).unwrap();
        graph.add_step("y", Some("f"), &["x"], &[("rhs", "v")]).unwrap();
        graph.set_value("g", double()).unwrap();
        graph.set_value("f", minus()).unwrap();
        graph.set_value("u", 5).unwrap();
        graph.set_value("v", 3).unwrap();
        graph
    }

    #[test]
    fn fused_chain_evaluates_the_same() {
        let mut reference = chain();
        reference.evaluate("y", EvalMode::Strict).unwrap();

        let mut fused = chain();
        fused.simplify_dependency("y", "x").unwrap();
        fused.evaluate("y", EvalMode::Strict).unwrap();

        assert_eq!(fused.get_value("y").unwrap(), reference.get_value("y").unwrap());
        assert_eq!(fused.get_value("y").unwrap(), &Value::from(7));
        assert!(!fused.has_value("x").unwrap());
    }

    #[test]
    fn fusion_rewires_dependencies() {
        let mut graph = chain();
        graph.simplify_dependency("y", "x").unwrap();

        assert_eq!(graph.predecessors("y").unwrap(), vec!["f", "v", "u"]);
        assert!(graph.args_of("y").unwrap().is_empty());
        let kwargs = graph.kwargs_of("y").unwrap();
        assert_eq!(kwargs.len(), 2);
        assert_eq!(kwargs["u"], "u");
        assert_eq!(kwargs["v"], "v");
        assert_eq!(graph.recipe_of("y").unwrap(), "f");
    }

    #[test]
    fn shared_recipe_is_left_alone() {
        let mut graph = chain();
        graph.add_step("z", Some("f"), &["u"], &[("rhs", "v")]).unwrap();
        graph.simplify_dependency("y", "x").unwrap();

        assert_eq!(graph.recipe_of("y").unwrap(), "composed_recipe_for_y");
        assert!(graph.is_recipe("composed_recipe_for_y").unwrap());
        assert_eq!(graph.successors("f").unwrap(), vec!["z"]);

        graph.execute_to_targets(&["y", "z"]).unwrap();
        assert_eq!(graph.get_value("y").unwrap(), &Value::from(7));
        assert_eq!(graph.get_value("z").unwrap(), &Value::from(2));
    }

    #[test]
    fn fusing_a_conditional_is_unsupported() {
        let mut graph = chain();
        graph.add_simple_conditional("w", "p", "u", "v").unwrap();
        graph.add_step("out", Some("g"), &["w"], &[]).unwrap();

        let err = graph.simplify_dependency("out", "w").unwrap_err();
        match err {
            GraphError::UnsupportedSimplification { node, kind } => {
                assert_eq!(node, "w");
                assert_eq!(kind, "conditional");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn simplify_all_skips_sources_and_excluded() {
        let mut graph = chain();
        graph.add_step("k", Some("g"), &["v"], &[]).unwrap();
        graph.edit_step("y", Some("f"), &["x"], &[("rhs", "k")]).unwrap();

        graph.simplify_all_dependencies("y", &["k"]).unwrap();
        let mut predecessors = graph.predecessors("y").unwrap();
        predecessors.sort_unstable();
        assert_eq!(predecessors, vec!["f", "k", "u"]);

        graph.evaluate("y", EvalMode::Strict).unwrap();
        // double(5) - double(3)
        assert_eq!(graph.get_value("y").unwrap(), &Value::from(4));
    }

    #[test]
    fn conditional_collapses_to_selected_branch() {
        let mut graph = Graph::new();
        graph.add_simple_conditional("c", "p", "x", "y").unwrap();
        graph.set_value("p", true).unwrap();
        graph.set_value("x", 1).unwrap();
        graph.set_value("y", 2).unwrap();

        graph.convert_conditional_to_trivial_step("c", false).unwrap();

        assert_eq!(graph.kind("c").unwrap(), Kind::Standard);
        assert_eq!(graph.recipe_of("c").unwrap(), "trivial_recipe_for_c");
        assert_eq!(
            graph.predecessors("c").unwrap(),
            vec!["trivial_recipe_for_c", "x"]
        );
        assert!(graph.successors("y").unwrap().is_empty());

        graph.evaluate("c", EvalMode::Strict).unwrap();
        assert_eq!(graph.get_value("c").unwrap(), &Value::from(1));
    }

    #[test]
    fn undecided_conditional_uses_default_or_fails() {
        let mut graph = Graph::new();
        graph.add_simple_conditional("c", "p", "x", "y").unwrap();
        graph.add_multiple_conditional("d", &["p"], &["x"]).unwrap();

        assert!(matches!(
            graph.convert_conditional_to_trivial_step("d", false),
            Err(GraphError::UndecidedConditional(_))
        ));
        graph.convert_conditional_to_trivial_step("c", false).unwrap();
        assert_eq!(graph.args_of("c").unwrap(), ["y".to_string()]);
    }

    #[test]
    fn forced_decision_evaluates_conditions() {
        let mut graph = Graph::new();
        graph.add_simple_conditional("c", "p", "x", "y").unwrap();
        graph.add_step("p", Some("check"), &["flag"], &[]).unwrap();
        graph.set_value("check", Recipe::identity()).unwrap();
        graph.set_value("flag", true).unwrap();

        graph.convert_all_conditionals_to_trivial_steps(true).unwrap();
        assert!(graph.conditionals().is_empty());
        assert_eq!(graph.args_of("c").unwrap(), ["x".to_string()]);
    }
}
