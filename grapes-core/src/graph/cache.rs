//! Value & Freeze Subsystem
//!
//! Per-node value cache, bulk invalidation and immutability marking.
//! Frozen nodes are exempt from bulk clears: values supplied while a graph is
//! being defined are constants, computed ones are not.

use indexmap::IndexMap;
use tracing::debug;

use super::{Graph, NodeId};
use crate::error::Result;
use crate::value::Value;

impl Graph {
    /// Handles of the named nodes, or of every node when `names` is empty.
    /// Unknown names are skipped.
    pub(crate) fn selection(&self, names: &[&str]) -> Vec<NodeId> {
        if names.is_empty() {
            self.index.values().copied().collect()
        } else {
            names
                .iter()
                .filter_map(|name| self.index.get(*name).copied())
                .collect()
        }
    }

    /// Clear the cached value of the named nodes (all nodes when empty),
    /// leaving frozen nodes alone.
    pub fn clear_values(&mut self, names: &[&str]) {
        for id in self.selection(names) {
            let node = &mut self.nodes[id];
            if !node.is_frozen() {
                node.unset_value();
            }
        }
    }

    /// Mark the named nodes (all nodes when empty) as frozen. Only nodes that
    /// currently have a value are marked.
    pub fn freeze(&mut self, names: &[&str]) {
        for id in self.selection(names) {
            let node = &mut self.nodes[id];
            if node.has_value() {
                node.set_frozen(true);
            }
        }
    }

    /// Lift the frozen mark from the named nodes (all nodes when empty).
    pub fn unfreeze(&mut self, names: &[&str]) {
        for id in self.selection(names) {
            self.nodes[id].set_frozen(false);
        }
    }

    /// Mark as recipes the dependencies of recipes whose consumers are all
    /// recipes themselves.
    pub fn make_recipe_dependencies_also_recipes(&mut self) -> Result<()> {
        let order = self.topological_ids()?;
        for &id in order.iter().rev() {
            if !self.nodes[id].is_recipe() {
                continue;
            }
            for parent in self.dependency_ids(id) {
                if self.nodes[parent].is_recipe() {
                    continue;
                }
                let all_recipes = self.nodes[parent]
                    .dependents()
                    .iter()
                    .all(|&child| self.nodes[child].is_recipe());
                if all_recipes {
                    self.nodes[parent].set_recipe(true);
                }
            }
        }
        Ok(())
    }

    /// One-shot setup after a graph has been defined: propagate the recipe
    /// flag, stamp generation indexes and freeze every node holding a value.
    pub fn finalize_definition(&mut self) -> Result<()> {
        self.make_recipe_dependencies_also_recipes()?;
        self.update_generation_indexes()?;
        self.freeze(&[]);
        debug!(nodes = self.len(), "finalized graph definition");
        Ok(())
    }

    /// Set values for every known name in `values`; other names are ignored.
    pub fn update_internal_context<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in values {
            if let Some(&id) = self.index.get(name.as_ref()) {
                self.nodes[id].set_value(value.into());
            }
        }
    }

    /// Clear all non-frozen values, then apply `values`.
    pub fn set_internal_context<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.clear_values(&[]);
        self.update_internal_context(values);
    }

    /// Every node value currently cached, optionally skipping recipes.
    pub fn internal_context(&self, exclude_recipes: bool) -> IndexMap<String, Value> {
        self.index
            .iter()
            .filter_map(|(name, &id)| {
                let node = &self.nodes[id];
                if exclude_recipes && node.is_recipe() {
                    return None;
                }
                node.value().map(|v| (name.clone(), v.clone()))
            })
            .collect()
    }

    /// Values of the named nodes, in order.
    pub fn values_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Value>> {
        names
            .iter()
            .map(|name| self.get_value(name.as_ref()).cloned())
            .collect()
    }

    /// Values of the named nodes, keyed by name.
    pub fn values_by_name<S: AsRef<str>>(&self, names: &[S]) -> Result<IndexMap<String, Value>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                Ok((name.to_owned(), self.get_value(name)?.clone()))
            })
            .collect()
    }

    /// Resolve a keyword mapping (parameter to node name) into parameter to
    /// node value.
    pub fn keyword_values(
        &self,
        mapping: &IndexMap<String, String>,
    ) -> Result<IndexMap<String, Value>> {
        mapping
            .iter()
            .map(|(param, node)| Ok((param.clone(), self.get_value(node)?.clone())))
            .collect()
    }
}
