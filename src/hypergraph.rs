//! 3-hash cuckoo hypergraph.
//!
//! Every key becomes a hyperedge over its three sparse positions in `[0, lm)`.
//! Edge `i` belongs to the `i`-th key of the batch. The per-key positions and
//! dense masks computed here are reused for the whole encode call.

use rayon::prelude::*;

use crate::bitstring::BitString;
use crate::hash::Hashable;
use crate::oracle::PositionOracle;
use crate::params::SPARSE_HASH_NUM;

/// Batches at least this large are hashed on the rayon thread pool.
const PARALLEL_THRESHOLD: usize = 1 << 12;

type KeyPositions = ([usize; SPARSE_HASH_NUM], BitString);

/// Hyperedges with vertex-to-edge incidence lists.
#[derive(Clone, Debug)]
pub struct H3Hypergraph {
    lm: usize,
    edges: Vec<[usize; SPARSE_HASH_NUM]>,
    masks: Vec<BitString>,
    incidence: Vec<Vec<usize>>,
}

impl H3Hypergraph {
    /// Hash every key once and build the hypergraph.
    pub fn build<K>(oracle: &PositionOracle, keys: &[K]) -> Self
    where
        K: Hashable + Sync,
    {
        Self::from_positions(oracle.lm(), hash_all(oracle, keys))
    }

    /// Build from precomputed positions and masks.
    pub fn from_positions(lm: usize, positions: Vec<KeyPositions>) -> Self {
        let mut edges = Vec::with_capacity(positions.len());
        let mut masks = Vec::with_capacity(positions.len());
        let mut incidence = vec![Vec::new(); lm];
        for (edge, (vertices, mask)) in positions.into_iter().enumerate() {
            for v in vertices {
                assert!(v < lm, "vertex {} out of range {}", v, lm);
                incidence[v].push(edge);
            }
            edges.push(vertices);
            masks.push(mask);
        }
        Self { lm, edges, masks, incidence }
    }

    /// Number of vertices.
    pub fn lm(&self) -> usize {
        self.lm
    }

    /// Number of hyperedges, i.e., keys.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self, edge: usize) -> [usize; SPARSE_HASH_NUM] {
        self.edges[edge]
    }

    pub fn mask(&self, edge: usize) -> &BitString {
        &self.masks[edge]
    }

    /// Edges touching `vertex`, removed or not.
    pub fn incident(&self, vertex: usize) -> &[usize] {
        &self.incidence[vertex]
    }
}

fn hash_all<K>(oracle: &PositionOracle, keys: &[K]) -> Vec<KeyPositions>
where
    K: Hashable + Sync,
{
    let hash_one = |key: &K| (oracle.sparse_positions(key), oracle.dense_positions(key));
    if keys.len() < PARALLEL_THRESHOLD {
        keys.iter().map(hash_one).collect()
    } else {
        keys.par_iter().map(hash_one).collect()
    }
}
