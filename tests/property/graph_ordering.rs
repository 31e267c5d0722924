//! Leveling and cycle detection over generated graphs

use proptest::prelude::*;
use proptest::sample::Index;
use specforge::error::GraphError;
use specforge::graph::DependencyGraph;

/// Node `i` may only depend on nodes `< i`, plus an optional id outside the graph.
fn acyclic_graph(picks: &[(Vec<Index>, bool)]) -> DependencyGraph<()> {
    let mut graph = DependencyGraph::new();
    for (i, (deps, dangling)) in picks.iter().enumerate() {
        let mut dependencies: Vec<String> = if i == 0 {
            Vec::new()
        } else {
            deps.iter().map(|d| format!("n{}", d.index(i))).collect()
        };
        if *dangling {
            dependencies.push("outside".to_string());
        }
        graph
            .add_node_with_dependencies(format!("n{}", i), (), dependencies)
            .unwrap();
    }
    graph
}

fn graph_strategy() -> impl Strategy<Value = Vec<(Vec<Index>, bool)>> {
    prop::collection::vec((prop::collection::vec(any::<Index>(), 0..4), any::<bool>()), 1..24)
}

/// Test that every level sits above all of its resolvable dependencies
#[test]
fn test_levels_respect_dependencies_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&graph_strategy(), |picks| {
        let mut graph = acyclic_graph(&picks);
        graph.compute_levels();

        for node in graph.nodes() {
            let level = node.level.unwrap();
            let deps = graph.resolvable_dependencies(&node.id);
            if deps.is_empty() {
                assert_eq!(level, 0, "{} has no resolvable dependencies", node.id);
            }
            for dep in deps {
                assert!(level > graph.level_of(dep).unwrap());
            }
        }

        let grouped = graph.clone().levels();
        assert_eq!(grouped.iter().map(Vec::len).sum::<usize>(), picks.len());
        Ok(())
    }).unwrap();
}

/// Test that topological order places dependencies first
#[test]
fn test_topological_order_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&graph_strategy(), |picks| {
        let graph = acyclic_graph(&picks);
        assert!(!graph.has_cycle());
        let order = graph.topological_sort().unwrap();
        assert_eq!(order.len(), picks.len());

        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        for node in graph.nodes() {
            for dep in graph.resolvable_dependencies(&node.id) {
                assert!(position(dep) < position(&node.id));
            }
        }
        Ok(())
    }).unwrap();
}

/// Test that a ring of any length, self-edges included, is always reported
#[test]
fn test_cycles_are_detected_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&(graph_strategy(), 1usize..6), |(picks, ring)| {
        let mut graph = acyclic_graph(&picks);
        for i in 0..ring {
            let next = format!("r{}", (i + 1) % ring);
            graph
                .add_node_with_dependencies(format!("r{}", i), (), vec![next, "n0".to_string()])
                .unwrap();
        }

        assert!(graph.has_cycle());
        assert!(graph.find_cycle().is_some());
        assert!(matches!(graph.validate(), Err(GraphError::CycleDetected { .. })));
        assert!(graph.topological_sort().is_err());
        Ok(())
    }).unwrap();
}
