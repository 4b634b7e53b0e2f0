//! Grapes Core
//!
//! This crate provides a dependency-graph computation engine. A computation
//! is modelled as a directed graph of named nodes: plain values, recipes
//! (callables producing values) and the steps that apply recipes to other
//! nodes. It implements:
//!
//! - Lazy, memoized evaluation with strict and tolerant failure modes
//! - Conditional nodes that only evaluate the branch they select
//! - Three-valued reachability analysis that never runs a recipe
//! - Topological ordering and layering
//! - Dependency fusion and conditional collapsing
//! - Compatibility checks and merging of independently built graphs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: Node values, recipes and their call arguments
//! - `graph`: The graph store, its builders, caches, topology, simplification
//!   and merging
//! - `eval`: The evaluator and the reachability analyzer
//! - `shared`: A lock-guarded handle for use from several threads
//! - `error`: The error taxonomy shared by every operation
//!
//! # Example
//!
//! ```rust
//! use grapes_core::{Arguments, EvalMode, Graph, Recipe, Value};
//!
//! let mut graph = Graph::new();
//! graph.add_step("sum", Some("add"), &["a", "b"], &[])?;
//! graph.set_value(
//!     "add",
//!     Recipe::named("add", |args: &Arguments| {
//!         Ok(Value::from(args.arg(0)?.try_i64()? + args.arg(1)?.try_i64()?))
//!     }),
//! )?;
//! graph.set_value("a", 1)?;
//! graph.set_value("b", 2)?;
//!
//! graph.evaluate("sum", EvalMode::Strict)?;
//! assert_eq!(graph.get_value("sum")?, &Value::from(3));
//! # Ok::<(), grapes_core::GraphError>(())
//! ```

pub mod error;
pub mod eval;
pub mod graph;
pub mod shared;
pub mod value;

pub use error::{GraphError, Result};
pub use eval::EvalMode;
pub use graph::{Graph, Kind, NodeId, Reachability};
pub use shared::SharedGraph;
pub use value::{Arguments, Recipe, RecipeError, Value};
