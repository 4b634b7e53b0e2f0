//! Reachability analysis.
//!
//! Predicts whether a node could ever get a value given what is cached now,
//! without running any recipe. Results are memoized on the nodes and only
//! go away through [`Graph::clear_reachabilities`].

use tracing::trace;

use crate::error::Result;
use crate::graph::{Graph, Kind, NodeId, Reachability};

impl Graph {
    /// Compute (or return the cached) reachability of `target`.
    pub fn find_reachability(&mut self, target: &str) -> Result<Reachability> {
        let id = self.id(target)?;
        self.reachability_id(id)
    }

    /// [`find_reachability`](Self::find_reachability) for several targets.
    pub fn find_reachabilities(&mut self, targets: &[&str]) -> Result<Vec<Reachability>> {
        targets
            .iter()
            .map(|target| self.find_reachability(target))
            .collect()
    }

    /// The worst cached reachability among `names`. An empty list is
    /// `Reachable`.
    pub fn worst_reachability(&self, names: &[&str]) -> Result<Reachability> {
        let mut worst = Reachability::Reachable;
        for name in names {
            worst = worst.min(self.get_reachability(name)?);
        }
        Ok(worst)
    }

    /// The best cached reachability among `names`. An empty list is
    /// `Unreachable`.
    pub fn best_reachability(&self, names: &[&str]) -> Result<Reachability> {
        let mut best = Reachability::Unreachable;
        for name in names {
            best = best.max(self.get_reachability(name)?);
        }
        Ok(best)
    }

    /// Forget the reachability of the named nodes (all nodes when empty),
    /// leaving frozen nodes alone.
    pub fn clear_reachabilities(&mut self, names: &[&str]) {
        for id in self.selection(names) {
            let node = &mut self.nodes[id];
            if !node.is_frozen() {
                node.unset_reachability();
            }
        }
    }

    fn reachability_id(&mut self, id: NodeId) -> Result<Reachability> {
        if let Some(cached) = self.nodes[id].reachability() {
            return Ok(cached);
        }
        let reachability = match self.nodes[id].kind().kind() {
            Kind::Standard => self.standard_reachability(id)?,
            Kind::Conditional => self.conditional_reachability(id)?,
        };
        trace!(node = self.name_of(id), %reachability, "reachability");
        self.nodes[id].set_reachability(reachability);
        Ok(reachability)
    }

    fn standard_reachability(&mut self, id: NodeId) -> Result<Reachability> {
        if self.nodes[id].has_value() {
            return Ok(Reachability::Reachable);
        }
        let dependencies = self.dependency_ids(id);
        if dependencies.is_empty() {
            return Ok(Reachability::Unreachable);
        }
        let mut worst = Reachability::Reachable;
        for dep in dependencies {
            worst = worst.min(self.reachability_id(dep)?);
        }
        Ok(worst)
    }

    fn conditional_reachability(&mut self, id: NodeId) -> Result<Reachability> {
        if self.nodes[id].has_value() {
            return Ok(Reachability::Reachable);
        }
        let name = self.name_of(id).to_owned();
        let branches = self.branches_of(&name)?.clone();
        let resolve = |graph: &Self, names: &[String]| {
            names.iter().map(|n| graph.id(n)).collect::<Result<Vec<_>>>()
        };
        let conditions = resolve(self, &branches.conditions)?;
        let possibilities = resolve(self, &branches.possibilities)?;

        if let Some(index) = conditions.iter().position(|&c| self.nodes[c].is_true()) {
            return self.reachability_id(possibilities[index]);
        }

        let mut condition_states = Vec::with_capacity(conditions.len());
        for &condition in &conditions {
            condition_states.push(self.reachability_id(condition)?);
        }
        let mut possibility_states = Vec::with_capacity(possibilities.len());
        for &possibility in &possibilities {
            possibility_states.push(self.reachability_id(possibility)?);
        }

        let all = || condition_states.iter().chain(&possibility_states);
        if all().all(|&r| r == Reachability::Reachable) {
            return Ok(Reachability::Reachable);
        }
        if all().all(|&r| r == Reachability::Unreachable) {
            return Ok(Reachability::Unreachable);
        }

        // Only branches whose condition might still hold can provide a value.
        let open_branch = condition_states
            .iter()
            .zip(&possibility_states)
            .any(|(&c, &p)| c != Reachability::Unreachable && p != Reachability::Unreachable);
        Ok(if open_branch {
            Reachability::Uncertain
        } else {
            Reachability::Unreachable
        })
    }
}
