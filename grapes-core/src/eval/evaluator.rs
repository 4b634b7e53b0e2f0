//! Recursive evaluator.

use tracing::{debug, trace};

use super::EvalMode;
use crate::error::{GraphError, Result};
use crate::graph::{Graph, Kind, NodeId};
use crate::value::{Arguments, RecipeError, Value};

impl Graph {
    /// Evaluate `target` and everything it needs.
    pub fn evaluate(&mut self, target: &str, mode: EvalMode) -> Result<()> {
        let id = self.id(target)?;
        self.evaluate_id(id, mode)
    }

    /// Evaluate a standard node.
    pub fn evaluate_standard(&mut self, name: &str, mode: EvalMode) -> Result<()> {
        let id = self.id(name)?;
        self.evaluate_standard_id(id, mode)
    }

    /// Evaluate a conditional node.
    pub fn evaluate_conditional(&mut self, name: &str, mode: EvalMode) -> Result<()> {
        let id = self.id(name)?;
        self.evaluate_conditional_id(id, mode)
    }

    /// Evaluate every target, stopping at the first failure.
    pub fn execute_to_targets(&mut self, targets: &[&str]) -> Result<()> {
        for target in targets {
            self.evaluate(target, EvalMode::Strict)?;
        }
        Ok(())
    }

    /// Compute as much as possible towards every target. Recipe failures
    /// leave nodes valueless instead of being reported.
    pub fn progress_towards_targets(&mut self, targets: &[&str]) -> Result<()> {
        for target in targets {
            self.evaluate(target, EvalMode::Tolerant)?;
        }
        Ok(())
    }

    /// Evaluate conditions in order, tolerantly, until one is true.
    pub fn execute_towards_conditions(&mut self, conditions: &[&str]) -> Result<()> {
        for condition in conditions {
            self.evaluate(condition, EvalMode::Tolerant)?;
            if self.is_true(condition)? {
                break;
            }
        }
        Ok(())
    }

    /// [`execute_towards_conditions`](Self::execute_towards_conditions) on the
    /// conditions of one conditional.
    pub fn execute_towards_all_conditions_of_conditional(
        &mut self,
        conditional: &str,
    ) -> Result<()> {
        let conditions = self.conditions_of(conditional)?.to_vec();
        let conditions: Vec<&str> = conditions.iter().map(String::as_str).collect();
        self.execute_towards_conditions(&conditions)
    }

    pub(crate) fn evaluate_id(&mut self, id: NodeId, mode: EvalMode) -> Result<()> {
        match self.nodes[id].kind().kind() {
            Kind::Standard => self.evaluate_standard_id(id, mode),
            Kind::Conditional => self.evaluate_conditional_id(id, mode),
        }
    }

    fn evaluate_standard_id(&mut self, id: NodeId, mode: EvalMode) -> Result<()> {
        if self.nodes[id].has_value() {
            trace!(node = self.name_of(id), "cached");
            return Ok(());
        }
        for dep in self.dependency_ids(id) {
            self.evaluate_id(dep, mode)?;
        }

        match self.invoke(id) {
            Ok(value) => {
                self.nodes[id].set_value(value);
                Ok(())
            }
            Err(err) if mode.is_tolerant() => {
                debug!(node = self.name_of(id), error = %err, "left without a value");
                Ok(())
            }
            Err(err) => Err(GraphError::Evaluation {
                node: self.name_of(id).to_owned(),
                source: Box::new(err),
            }),
        }
    }

    /// Call the node's recipe on the values of its dependencies.
    fn invoke(&self, id: NodeId) -> Result<Value> {
        let name = self.name_of(id);
        let step = self.step_of(name)?;
        let recipe = self.get_value(&step.recipe)?.as_recipe().ok_or_else(|| {
            RecipeError::new(format!("value of `{}` is not a recipe", step.recipe))
        })?;
        let args = Arguments::new(
            self.values_of(step.args.as_slice())?,
            self.keyword_values(&step.kwargs)?,
        );
        debug!(node = name, recipe = %step.recipe, "invoking recipe");
        Ok(recipe.call(&args)?)
    }

    fn evaluate_conditional_id(&mut self, id: NodeId, mode: EvalMode) -> Result<()> {
        if self.nodes[id].has_value() {
            trace!(node = self.name_of(id), "cached");
            return Ok(());
        }
        let name = self.name_of(id).to_owned();
        let branches = self.branches_of(&name)?.clone();
        let conditions = branches
            .conditions
            .iter()
            .map(|c| self.id(c))
            .collect::<Result<Vec<_>>>()?;

        let mut chosen = conditions.iter().position(|&c| self.nodes[c].is_true());
        if chosen.is_none() {
            for (index, &condition) in conditions.iter().enumerate() {
                self.evaluate_id(condition, mode)?;
                let node = &self.nodes[condition];
                if node.is_true() {
                    chosen = Some(index);
                    break;
                }
                if !node.has_value() {
                    return self.unresolved(&name, node.name().to_owned(), mode);
                }
            }
        }

        let index = match chosen {
            Some(index) => index,
            None if branches.default_possibility().is_some() => branches.conditions.len(),
            None if mode.is_tolerant() => return Ok(()),
            None => return Err(GraphError::NoTrueCondition(name)),
        };
        let possibility = self.id(&branches.possibilities[index])?;
        debug!(node = %name, branch = self.name_of(possibility), "branch selected");

        self.evaluate_id(possibility, mode)?;
        match self.nodes[possibility].value().cloned() {
            Some(value) => {
                self.nodes[id].set_value(value);
                Ok(())
            }
            None => self.unresolved(&name, self.name_of(possibility).to_owned(), mode),
        }
    }

    /// A conditional could not be resolved because `missing` has no value.
    fn unresolved(&self, conditional: &str, missing: String, mode: EvalMode) -> Result<()> {
        if mode.is_tolerant() {
            debug!(node = conditional, missing = %missing, "left without a value");
            return Ok(());
        }
        Err(GraphError::Evaluation {
            node: conditional.to_owned(),
            source: Box::new(GraphError::MissingValue(missing)),
        })
    }
}
