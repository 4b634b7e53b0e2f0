//! Shared Graph Handle
//!
//! A [`Graph`] assumes exclusive access: evaluation and reachability
//! analysis hold references into the node table for the whole traversal.
//! [`SharedGraph`] serializes callers from several threads with one lock per
//! graph, so each operation runs start to finish without interleaving.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::eval::EvalMode;
use crate::graph::{Graph, Reachability};
use crate::value::Value;

/// Cloneable, thread-safe handle to one graph.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<Graph>>,
}

impl SharedGraph {
    /// Wrap a graph for shared use.
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access to the graph.
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Evaluate `target` and return a copy of its value, if it got one.
    pub fn evaluate(&self, target: &str, mode: EvalMode) -> Result<Option<Value>> {
        let mut graph = self.inner.lock();
        graph.evaluate(target, mode)?;
        Ok(graph.node(target)?.value().cloned())
    }

    /// Reachability of `target`, computed under the lock.
    pub fn find_reachability(&self, target: &str) -> Result<Reachability> {
        self.inner.lock().find_reachability(target)
    }

    /// A copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        self.inner.lock().clone()
    }
}

impl From<Graph> for SharedGraph {
    fn from(graph: Graph) -> Self {
        Self::new(graph)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::value::{Arguments, Recipe};

    #[test]
    fn concurrent_callers_share_one_evaluation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut graph = Graph::new();
        graph.add_step("square", Some("sq"), &["n"], &[]).unwrap();
        graph
            .set_value(
                "sq",
                Recipe::named("sq", move |a: &Arguments| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let n = a.arg(0)?.try_i64()?;
                    Ok(Value::from(n * n))
                }),
            )
            .unwrap();
        graph.set_value("n", 12).unwrap();
        let shared = SharedGraph::from(graph);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.evaluate("square", EvalMode::Strict).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(Value::from(144)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn with_and_snapshot() {
        let shared = SharedGraph::default();
        shared
            .with(|graph| {
                graph.add_node_if_absent("a");
                graph.set_value("a", 1)
            })
            .unwrap();

        let copy = shared.snapshot();
        shared.lock().clear_values(&[]);

        assert!(copy.has_value("a").unwrap());
        assert!(!shared.lock().has_value("a").unwrap());
        assert_eq!(shared.find_reachability("a").unwrap(), Reachability::Unreachable);
    }
}
