//! Deterministic topological ordering.
//!
//! Kahn's algorithm over "depends on" edges. Among vertices whose
//! dependencies are all emitted, the tie-break prefers the vertex earliest in
//! the externally supplied lookup-order list, falling back to stable
//! insertion order. The resulting sequence is read forward for build phases
//! and reversed for teardown phases.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::builder::DependencyGraph;

/// Build-direction execution order for one bucket: dependencies first.
pub fn order(graph: &DependencyGraph, lookup_order: &[String]) -> Vec<String> {
    let len = graph.len();
    let fallback_base = lookup_order.len();
    let rank = |id: usize| -> (usize, usize) {
        let name = &graph.names()[id];
        match lookup_order.iter().position(|entry| entry == name) {
            Some(position) => (position, id),
            None => (fallback_base + id, id),
        }
    };

    let mut remaining: Vec<usize> = (0..len)
        .map(|id| graph.dependency_ids(id).len())
        .collect();

    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..len)
        .filter(|&id| remaining[id] == 0)
        .map(|id| Reverse(rank(id)))
        .collect();

    let mut sequence = Vec::with_capacity(len);
    while let Some(Reverse((_, id))) = ready.pop() {
        sequence.push(graph.names()[id].clone());
        for &dependent in graph.dependent_ids(id) {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(Reverse(rank(dependent)));
            }
        }
    }

    debug_assert_eq!(
        sequence.len(),
        len,
        "builder graphs are acyclic, sort must cover every vertex"
    );
    sequence
}
