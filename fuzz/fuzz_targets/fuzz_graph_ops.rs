#![no_main]

use cellhive_graph::{Flow, Graph};
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

const NODES: u8 = 16;

fuzz_target!(|data: &[u8]| {
    let mut graph: Graph<u8> = Graph::new();

    // Each op is 3 bytes: opcode, a, b.
    for op in data.chunks_exact(3) {
        let a = op[1] % NODES;
        let b = op[2] % NODES;
        match op[0] % 4 {
            0 => {
                let before = graph.iterate();
                let edges = graph.edge_count();
                if graph.declare_prerequisite(a, b).is_err() {
                    assert_eq!(graph.iterate(), before, "cycle rollback changed order");
                    assert_eq!(graph.edge_count(), edges, "cycle rollback changed edges");
                }
            }
            1 => {
                graph.revoke_prerequisite(&a, &b);
            }
            2 => {
                graph.remove_node(&a);
            }
            _ => {
                graph.add_node(a);
            }
        }
    }

    // Every node appears once, after all of its prerequisites.
    let order = graph.iterate();
    assert_eq!(order.len(), graph.node_count(), "iterate missed nodes");
    let mut seen = HashSet::new();
    for node in &order {
        for prerequisite in graph.prerequisites(node) {
            assert!(seen.contains(prerequisite), "prerequisite after dependent");
        }
        assert!(seen.insert(*node), "node visited twice");
    }

    // A lone start that stops visits only itself.
    if let Some(&first) = order.first() {
        let mut visited = Vec::new();
        graph.process_from([first], |node| {
            visited.push(*node);
            Flow::DepthStop
        });
        assert_eq!(visited, vec![first]);
    }
});
