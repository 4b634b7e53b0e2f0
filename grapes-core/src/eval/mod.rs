//! Evaluation
//!
//! Demand-driven evaluation of graph nodes and the reachability analysis
//! that predicts, without evaluating anything, whether a node can ever get a
//! value.
//!
//! # How Evaluation Works
//!
//! 1. A node that already has a value is done.
//!
//! 2. Otherwise its dependencies are evaluated first, recursively. The call
//!    stack is the scheduler: there is no explicit queue.
//!
//! 3. The node's recipe is called with the dependency values and the result
//!    is cached on the node.
//!
//! Conditionals evaluate their conditions in order and only the possibility
//! paired with the first true condition (or the default).
//!
//! # Failure Modes
//!
//! [`EvalMode::Strict`] reports the first failure, annotated with the name of
//! the node whose recipe failed. [`EvalMode::Tolerant`] leaves failing nodes
//! without a value and keeps going, so as much of the graph as possible gets
//! computed.
//!
//! # Limits
//!
//! Recursion depth equals the longest dependency chain. Cycles are not
//! detected here and recurse until the stack overflows; keeping the graph
//! acyclic is the caller's responsibility.

mod evaluator;
mod reachability;

/// What to do when a node cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalMode {
    /// Stop and report the failure.
    #[default]
    Strict,
    /// Leave the node valueless and carry on.
    Tolerant,
}

impl EvalMode {
    pub fn is_tolerant(self) -> bool {
        self == EvalMode::Tolerant
    }
}
