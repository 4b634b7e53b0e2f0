//! Integration Tests for the Graph Engine
//!
//! These tests verify that builders, evaluation, reachability, fusion and
//! merging work together correctly through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grapes_core::{Arguments, EvalMode, Graph, GraphError, Reachability, Recipe, Value};

fn add() -> Recipe {
    Recipe::named("add", |args: &Arguments| {
        Ok(Value::from(args.arg(0)?.try_i64()? + args.arg(1)?.try_i64()?))
    })
}

fn counting(calls: &Arc<AtomicUsize>) -> Recipe {
    let calls = calls.clone();
    Recipe::named("count_then_add", move |args: &Arguments| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from(args.arg(0)?.try_i64()? + args.arg(1)?.try_i64()?))
    })
}

/// Test the basic sum scenario end to end.
#[test]
fn sum_of_two_inputs() {
    let mut graph = Graph::new();
    graph.add_step("sum", Some("add"), &["a", "b"], &[]).unwrap();
    graph.set_value("add", add()).unwrap();
    graph.set_value("a", 1).unwrap();
    graph.set_value("b", 2).unwrap();

    graph.execute_to_targets(&["sum"]).unwrap();

    assert_eq!(graph.get_value("sum").unwrap(), &Value::from(3));
}

/// Test that a recipe runs at most once between clears, and again after.
#[test]
fn memoization_until_cleared() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut graph = Graph::new();
    graph.add_step("sum", Some("count_then_add"), &["a", "b"], &[]).unwrap();
    graph.add_step("twice", Some("count_then_add"), &["sum", "sum"], &[]).unwrap();
    graph.set_value("count_then_add", counting(&calls)).unwrap();
    graph.set_value("a", 1).unwrap();
    graph.set_value("b", 2).unwrap();
    graph.finalize_definition().unwrap();

    graph.execute_to_targets(&["twice", "sum"]).unwrap();
    graph.execute_to_targets(&["twice"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(graph.get_value("twice").unwrap(), &Value::from(6));

    // Inputs and the recipe are frozen, computed values are not.
    graph.clear_values(&[]);
    assert!(graph.has_value("a").unwrap());
    assert!(graph.has_value("count_then_add").unwrap());
    assert!(!graph.has_value("sum").unwrap());

    graph.execute_to_targets(&["twice"]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

/// Test that frozen nodes survive every bulk clear.
#[test]
fn frozen_state_is_never_cleared() {
    let mut graph = Graph::new();
    graph.add_step("sum", Some("add"), &["a", "b"], &[]).unwrap();
    graph.set_value("add", add()).unwrap();
    graph.set_value("a", 1).unwrap();
    graph.set_value("b", 2).unwrap();
    graph.freeze(&["a", "add"]);
    graph.find_reachability("sum").unwrap();

    graph.clear_values(&[]);
    graph.clear_reachabilities(&[]);

    assert_eq!(graph.get_value("a").unwrap(), &Value::from(1));
    assert_eq!(graph.get_reachability("a").unwrap(), Reachability::Reachable);
    assert!(!graph.has_value("b").unwrap());
    assert!(!graph.has_reachability("b").unwrap());
}

/// Test that a conditional with a false condition takes its default
/// without evaluating the other branch.
#[test]
fn conditional_default_branch_is_lazy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut graph = Graph::new();
    graph.add_simple_conditional("c", "p", "x", "y").unwrap();
    graph.add_step("x", Some("count_then_add"), &["y", "y"], &[]).unwrap();
    graph.set_value("count_then_add", counting(&calls)).unwrap();
    graph.set_value("p", false).unwrap();
    graph.set_value("y", 5).unwrap();

    graph.execute_to_targets(&["c"]).unwrap();

    assert_eq!(graph.get_value("c").unwrap(), &Value::from(5));
    assert!(!graph.has_value("x").unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test that a true condition selects the paired possibility.
#[test]
fn conditional_true_branch() {
    let mut graph = Graph::new();
    graph
        .add_multiple_conditional("grade", &["excellent", "good"], &["a", "b", "c"])
        .unwrap();
    graph.set_value("excellent", false).unwrap();
    graph.set_value("good", true).unwrap();
    for (name, letter) in [("a", "A"), ("b", "B"), ("c", "C")] {
        graph.set_value(name, letter).unwrap();
    }

    graph.evaluate("grade", EvalMode::Strict).unwrap();
    assert_eq!(graph.get_value("grade").unwrap(), &Value::from("B"));
}

/// Test that strict failures carry the failing node's name while tolerant
/// evaluation keeps computing everything else.
#[test]
fn strict_and_tolerant_modes() {
    let build = || {
        let mut graph = Graph::new();
        graph.add_step("ratio", Some("divide"), &["num", "den"], &[]).unwrap();
        graph.add_step("total", Some("add"), &["num", "den"], &[]).unwrap();
        graph.add_step("report", Some("add"), &["ratio", "total"], &[]).unwrap();
        graph.set_value("add", add()).unwrap();
        graph
            .set_value(
                "divide",
                Recipe::named("divide", |args: &Arguments| {
                    let den = args.arg(1)?.try_i64()?;
                    if den == 0 {
                        return Err(grapes_core::RecipeError::new("division by zero"));
                    }
                    Ok(Value::from(args.arg(0)?.try_i64()? / den))
                }),
            )
            .unwrap();
        graph.set_value("num", 6).unwrap();
        graph.set_value("den", 0).unwrap();
        graph
    };

    let mut strict = build();
    let err = strict.execute_to_targets(&["report"]).unwrap_err();
    assert!(err.to_string().starts_with("While evaluating `ratio`"));
    assert!(matches!(err, GraphError::Evaluation { .. }));

    let mut tolerant = build();
    tolerant.progress_towards_targets(&["report"]).unwrap();
    assert!(!tolerant.has_value("ratio").unwrap());
    assert!(!tolerant.has_value("report").unwrap());
    assert_eq!(tolerant.get_value("total").unwrap(), &Value::from(6));
}

/// Test that reachability predicts evaluation for standard nodes and never
/// beats the worst dependency.
#[test]
fn reachability_predicts_evaluation() {
    let mut graph = Graph::new();
    graph.add_step("sum", Some("add"), &["a", "b"], &[]).unwrap();
    graph.add_step("double", Some("add"), &["sum", "sum"], &[]).unwrap();
    graph.set_value("add", add()).unwrap();
    graph.set_value("a", 1).unwrap();

    assert_eq!(graph.find_reachability("double").unwrap(), Reachability::Unreachable);
    let worst = graph.worst_reachability(&["add", "sum"]).unwrap();
    assert!(graph.get_reachability("double").unwrap() <= worst);

    graph.set_value("b", 2).unwrap();
    graph.clear_reachabilities(&[]);
    assert_eq!(graph.find_reachability("double").unwrap(), Reachability::Reachable);

    graph.evaluate("double", EvalMode::Strict).unwrap();
    assert_eq!(graph.get_value("double").unwrap(), &Value::from(6));
}

/// Test that fusing `f(g(u))` into one node evaluates to the same result as
/// the two-node chain.
#[test]
fn fusion_preserves_results() {
    let build = || {
        let mut graph = Graph::new();
        graph.add_step("g_of_u", Some("g"), &["u"], &[]).unwrap();
        graph.add_step("f_of_g", Some("f"), &["g_of_u"], &[]).unwrap();
        graph
            .set_value(
                "g",
                Recipe::named("g", |args: &Arguments| {
                    Ok(Value::from(args.arg(0)?.try_i64()? + 1))
                }),
            )
            .unwrap();
        graph
            .set_value(
                "f",
                Recipe::named("f", |args: &Arguments| {
                    Ok(Value::from(args.arg(0)?.try_i64()? * 10))
                }),
            )
            .unwrap();
        graph.set_value("u", 4).unwrap();
        graph
    };

    let mut chain = build();
    chain.evaluate("f_of_g", EvalMode::Strict).unwrap();

    let mut fused = build();
    fused.simplify_dependency("f_of_g", "g_of_u").unwrap();
    assert_eq!(fused.predecessors("f_of_g").unwrap(), vec!["f", "u"]);
    fused.evaluate("f_of_g", EvalMode::Strict).unwrap();

    assert_eq!(fused.get_value("f_of_g").unwrap(), &Value::from(50));
    assert_eq!(fused.get_value("f_of_g").unwrap(), chain.get_value("f_of_g").unwrap());
}

/// Test that merging a graph with itself gives back the same graph, and
/// that two halves of a computation merge into a working whole.
#[test]
fn merge_soundness() {
    let mut graph = Graph::new();
    graph.add_step("sum", Some("add"), &["a", "b"], &[]).unwrap();
    graph.add_simple_conditional("pick", "flag", "sum", "a").unwrap();
    graph.set_value("add", add()).unwrap();
    graph.set_value("a", 1).unwrap();
    graph.finalize_definition().unwrap();
    assert_eq!(graph.merge(&graph).unwrap(), graph);

    let mut inputs = Graph::new();
    inputs.add_node_if_absent("b");
    inputs.add_node_if_absent("flag");
    inputs.set_value("b", 2).unwrap();
    inputs.set_value("flag", true).unwrap();

    let mut merged = graph.merge(&inputs).unwrap();
    merged.evaluate("pick", EvalMode::Strict).unwrap();
    assert_eq!(merged.get_value("pick").unwrap(), &Value::from(3));
}

/// Test topological layering of a diamond.
#[test]
fn diamond_generations() {
    let mut graph = Graph::new();
    graph.add_step("left", Some("add"), &["root", "root"], &[]).unwrap();
    graph.add_step("right", Some("add"), &["root", "root"], &[]).unwrap();
    graph.add_step("bottom", Some("add"), &["left", "right"], &[]).unwrap();

    let generations = graph.topological_generations().unwrap();
    assert_eq!(
        generations,
        vec![vec!["add", "root"], vec!["left", "right"], vec!["bottom"]]
    );

    // Cached nodes end the path: `root` is no longer needed.
    graph.set_value("left", 1).unwrap();
    graph.set_value("right", 1).unwrap();
    let path = graph.path_to_target("bottom").unwrap();
    assert_eq!(path.len(), 4);
    assert!(path.contains("left") && path.contains("right"));
    assert!(!path.contains("root"));
}

/// Test that builders quick-derive dependencies from declared parameters.
#[test]
fn quick_steps_from_parameter_names() {
    let mut graph = Graph::new();
    graph
        .add_step_quick(
            "area",
            Recipe::with_parameters("rectangle", ["width", "height"], |args: &Arguments| {
                Ok(Value::from(
                    args.kwarg("width")?.try_f64()? * args.kwarg("height")?.try_f64()?,
                ))
            }),
        )
        .unwrap();
    graph.set_value("width", 2.5).unwrap();
    graph.set_value("height", 4.0).unwrap();

    graph.evaluate("area", EvalMode::Strict).unwrap();
    assert_eq!(graph.get_value("area").unwrap().as_f64(), Some(10.0));
}
