//! Structure Builders
//!
//! Nodes are created implicitly the first time a builder mentions their name,
//! as a target, a recipe or a dependency. Existing nodes are never
//! re-initialized, so their value and frozen flag survive re-declaration.

use super::{Branches, Graph, NodeKind, Step};
use crate::error::{GraphError, Result};
use crate::value::Value;

impl Graph {
    /// Add a step computed by `recipe` from positional `args` and keyword
    /// `kwargs` (parameter name, dependency node).
    ///
    /// Without a recipe the node is a plain value holder and may not declare
    /// dependencies. One edge is added from the recipe and from each
    /// dependency into `name`.
    pub fn add_step(
        &mut self,
        name: &str,
        recipe: Option<&str>,
        args: &[&str],
        kwargs: &[(&str, &str)],
    ) -> Result<()> {
        let Some(recipe) = recipe else {
            if !args.is_empty() || !kwargs.is_empty() {
                return Err(GraphError::DependencyWithoutRecipe(name.to_owned()));
            }
            self.add_node_if_absent(name);
            return Ok(());
        };

        let id = self.add_node_if_absent(name);
        self.nodes[id].set_kind(NodeKind::Standard(Some(Step {
            recipe: recipe.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            kwargs: kwargs
                .iter()
                .map(|(param, dep)| ((*param).to_owned(), (*dep).to_owned()))
                .collect(),
        })));

        let recipe_id = self.add_node_if_absent(recipe);
        self.nodes[recipe_id].set_recipe(true);
        self.link(recipe_id, id);

        for dep in args.iter().chain(kwargs.iter().map(|(_, dep)| dep)) {
            let dep_id = self.add_node_if_absent(dep);
            self.link(dep_id, id);
        }
        Ok(())
    }

    /// Add a step whose dependencies are named after the recipe's declared
    /// parameters, each bound by keyword (`p -> p`).
    ///
    /// The recipe node takes the recipe's name, or `recipe_for_<name>` when
    /// the recipe is anonymous, and receives the recipe as its value.
    pub fn add_step_quick(&mut self, name: &str, recipe: impl Into<Value>) -> Result<()> {
        let value = recipe.into();
        let parameters = match &value {
            Value::Recipe(r) => r
                .parameters()
                .ok_or_else(|| GraphError::NonFunctionRecipe(name.to_owned()))?,
            Value::Data(_) => return Err(GraphError::NonFunctionRecipe(name.to_owned())),
        };
        let recipe_name = value
            .as_recipe()
            .and_then(|r| r.name())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("recipe_for_{}", name));
        let kwargs: Vec<(&str, &str)> = parameters
            .iter()
            .map(|p| (p.as_str(), p.as_str()))
            .collect();

        self.add_step(name, Some(recipe_name.as_str()), &[], &kwargs)?;
        self.set_value(&recipe_name, value)
    }

    /// Add a conditional with a single condition: `value_true` when it holds,
    /// `value_false` otherwise.
    pub fn add_simple_conditional(
        &mut self,
        name: &str,
        condition: &str,
        value_true: &str,
        value_false: &str,
    ) -> Result<()> {
        self.add_multiple_conditional(name, &[condition], &[value_true, value_false])
    }

    /// Add a conditional choosing the possibility paired with the first true
    /// condition. One extra trailing possibility acts as the default.
    pub fn add_multiple_conditional(
        &mut self,
        name: &str,
        conditions: &[&str],
        possibilities: &[&str],
    ) -> Result<()> {
        let branches = Branches::new(
            name,
            conditions.iter().map(|c| (*c).to_owned()).collect(),
            possibilities.iter().map(|p| (*p).to_owned()).collect(),
        )?;

        let id = self.add_node_if_absent(name);
        for member in conditions.iter().chain(possibilities) {
            let member_id = self.add_node_if_absent(member);
            self.link(member_id, id);
        }
        self.nodes[id].set_kind(NodeKind::Conditional(branches));
        Ok(())
    }

    /// Re-declare an existing node's recipe and dependencies.
    ///
    /// Only incoming edges are replaced. Consumers of the node keep pointing
    /// at it, and its recipe flag, frozen flag and value are restored after
    /// the re-declaration.
    pub fn edit_step(
        &mut self,
        name: &str,
        recipe: Option<&str>,
        args: &[&str],
        kwargs: &[(&str, &str)],
    ) -> Result<()> {
        let node = self.node(name)?;
        if recipe.is_none() && (!args.is_empty() || !kwargs.is_empty()) {
            return Err(GraphError::DependencyWithoutRecipe(name.to_owned()));
        }
        let was_recipe = node.is_recipe();
        let was_frozen = node.is_frozen();
        let old_value = node.value().cloned();

        self.remove_incoming_edges(name)?;
        self.set_kind(name, NodeKind::default())?;
        self.add_step(name, recipe, args, kwargs)?;

        let node = self.node_mut(name)?;
        node.set_recipe(was_recipe);
        node.set_frozen(was_frozen);
        match old_value {
            Some(value) => node.set_value(value),
            None => node.unset_value(),
        }
        Ok(())
    }

    /// Delete a node and its incident edges.
    pub fn remove_step(&mut self, name: &str) -> Result<()> {
        self.delete(name)
    }
}
