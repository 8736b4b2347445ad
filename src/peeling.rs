//! Two-core finder by singleton peeling.
//!
//! A vertex of degree 1 pins its only edge: whatever the other two vertices
//! hold, the pinned vertex can be solved last. Removing that edge may create
//! new degree-1 vertices. Edges that are never removed form the two-core.

use std::collections::VecDeque;

use crate::hypergraph::H3Hypergraph;
use crate::params::SPARSE_HASH_NUM;

/// One removed edge and the vertex it was removed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeelEntry {
    pub edge: usize,
    pub vertices: [usize; SPARSE_HASH_NUM],
    pub pivot: usize,
}

impl PeelEntry {
    /// The two vertices other than the pivot.
    pub fn others(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices.iter().copied().filter(move |v| *v != self.pivot)
    }
}

/// Result of peeling: removal order and the edges left over.
#[derive(Clone, Debug, Default)]
pub struct TwoCore {
    /// Removal order. Assignment pops from the back.
    pub peel_stack: Vec<PeelEntry>,
    /// Unpeelable edges, ascending.
    pub core: Vec<usize>,
}

impl TwoCore {
    pub fn core_size(&self) -> usize {
        self.core.len()
    }
}

/// Peel `graph` down to its two-core.
///
/// The queue starts with the degree-1 vertices in ascending order and is
/// FIFO afterwards, so the result depends only on the edge order.
pub fn find_two_core(graph: &H3Hypergraph) -> TwoCore {
    let lm = graph.lm();
    let mut degree: Vec<usize> = (0..lm).map(|v| graph.incident(v).len()).collect();
    let mut removed = vec![false; graph.edge_count()];
    let mut queue: VecDeque<usize> = (0..lm).filter(|v| degree[*v] == 1).collect();
    let mut peel_stack = Vec::with_capacity(graph.edge_count());

    while let Some(vertex) = queue.pop_front() {
        // the edge may have gone through one of its other vertices
        if degree[vertex] != 1 {
            continue;
        }
        let edge = match graph.incident(vertex).iter().copied().find(|e| !removed[*e]) {
            Some(edge) => edge,
            None => continue,
        };
        removed[edge] = true;
        let vertices = graph.vertices(edge);
        for v in vertices {
            degree[v] -= 1;
            if v != vertex && degree[v] == 1 {
                queue.push_back(v);
            }
        }
        peel_stack.push(PeelEntry { edge, vertices, pivot: vertex });
    }

    let core = (0..graph.edge_count()).filter(|e| !removed[*e]).collect();
    TwoCore { peel_stack, core }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstring::BitString;
    use proptest::prelude::*;

    fn graph(lm: usize, edges: &[[usize; 3]]) -> H3Hypergraph {
        H3Hypergraph::from_positions(lm, edges.iter().map(|e| (*e, BitString::new_zeros(8))).collect())
    }

    #[test]
    fn path_peels_completely() {
        let g = graph(8, &[[0, 1, 2], [2, 3, 4], [4, 5, 6]]);
        let two_core = find_two_core(&g);
        assert!(two_core.core.is_empty());
        assert_eq!(two_core.peel_stack.len(), 3);
        // vertex 0 is seeded first
        assert_eq!(two_core.peel_stack[0], PeelEntry { edge: 0, vertices: [0, 1, 2], pivot: 0 });
    }

    #[test]
    fn closed_structure_stays_in_core() {
        // vertices 0..4 all have degree >= 2, the last edge dangles
        let g = graph(8, &[[0, 1, 2], [0, 1, 3], [1, 2, 3], [4, 5, 6]]);
        let two_core = find_two_core(&g);
        assert_eq!(two_core.core, vec![0, 1, 2]);
        assert_eq!(two_core.core_size(), 3);
        assert_eq!(two_core.peel_stack.len(), 1);
        assert_eq!(two_core.peel_stack[0].pivot, 4);
    }

    #[test]
    fn doubled_edges_form_core() {
        let g = graph(8, &[[0, 1, 2], [0, 1, 2], [5, 6, 7]]);
        let two_core = find_two_core(&g);
        assert_eq!(two_core.core, vec![0, 1]);
        assert_eq!(two_core.peel_stack.len(), 1);
        assert_eq!(two_core.peel_stack[0].edge, 2);
        assert_eq!(two_core.peel_stack[0].others().collect::<Vec<_>>(), vec![6, 7]);
    }

    #[test]
    fn empty_graph() {
        let two_core = find_two_core(&graph(8, &[]));
        assert!(two_core.core.is_empty());
        assert!(two_core.peel_stack.is_empty());
    }

    fn distinct_triple(lm: usize) -> impl Strategy<Value = [usize; 3]> {
        (0..lm, 1..lm, 1..lm)
            .prop_filter("distinct", |(_, b, c)| b != c)
            .prop_map(move |(a, b, c)| [a, (a + b) % lm, (a + c) % lm])
    }

    proptest! {
        #[test]
        fn peeling_partitions_edges(
            edges in (8usize..64).prop_flat_map(|lm| (Just(lm), prop::collection::vec(distinct_triple(lm), 0..80)))
        ) {
            let (lm, edges) = edges;
            let g = graph(lm, &edges);
            let two_core = find_two_core(&g);

            let mut seen = vec![false; edges.len()];
            for entry in &two_core.peel_stack {
                prop_assert!(!seen[entry.edge]);
                seen[entry.edge] = true;
                prop_assert!(entry.vertices.contains(&entry.pivot));
                prop_assert_eq!(entry.vertices, edges[entry.edge]);
            }
            for e in &two_core.core {
                prop_assert!(!seen[*e]);
                seen[*e] = true;
            }
            prop_assert!(seen.iter().all(|s| *s));

            // no core vertex is a singleton within the core
            let mut core_degree = vec![0usize; lm];
            for e in &two_core.core {
                for v in edges[*e] {
                    core_degree[v] += 1;
                }
            }
            prop_assert!(core_degree.iter().all(|d| *d != 1));

            // back-substitution order: a pivot is never touched by an edge peeled after it
            for (i, entry) in two_core.peel_stack.iter().enumerate() {
                for later in &two_core.peel_stack[i + 1..] {
                    prop_assert!(!later.vertices.contains(&entry.pivot));
                }
                for e in &two_core.core {
                    prop_assert!(!edges[*e].contains(&entry.pivot));
                }
            }
        }
    }
}
