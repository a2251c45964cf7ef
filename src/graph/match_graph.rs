use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::foundation::core::display_name;
use crate::foundation::error::{StitchError, StitchResult};
use crate::graph::tree::SpanningTree;
use crate::matches::store::CorrespondenceStore;

/// Weighted undirected graph over image indices.
///
/// Edge weight is `max_count + 1 - count`, so stronger pairs are cheaper and every
/// weight is at least one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchGraph {
    // Neighbour lists sorted by neighbour index.
    adjacency: Vec<Vec<(usize, u64)>>,
}

impl MatchGraph {
    /// Build the graph for `node_count` images from the stored match records.
    pub fn from_store(store: &CorrespondenceStore, node_count: usize) -> StitchResult<Self> {
        if node_count == 0 {
            return Err(StitchError::EmptySession);
        }
        let base = store.max_count() as u64 + 1;
        let mut adjacency = vec![Vec::new(); node_count];
        for (key, record) in store.iter() {
            if key.hi >= node_count {
                return Err(StitchError::Other(anyhow::anyhow!(
                    "match record ({}, {}) references an image beyond {node_count}",
                    key.lo,
                    key.hi
                )));
            }
            let weight = base - record.count() as u64;
            adjacency[key.lo].push((key.hi, weight));
            adjacency[key.hi].push((key.lo, weight));
        }
        for list in &mut adjacency {
            list.sort_unstable();
        }
        tracing::debug!(nodes = node_count, edges = store.len(), "built match graph");
        Ok(Self { adjacency })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Weight of the edge `{a, b}`, if present.
    pub fn edge_weight(&self, a: usize, b: usize) -> Option<u64> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|(n, _)| *n == b)
            .map(|(_, w)| *w)
    }

    /// Neighbours of `node` with edge weights, ascending by index.
    pub fn neighbors(&self, node: usize) -> &[(usize, u64)] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Component label per node; labels are assigned in order of first discovery
    /// scanning nodes from index 0.
    pub fn connected_components(&self) -> Vec<usize> {
        let n = self.node_count();
        let mut labels = vec![usize::MAX; n];
        let mut next = 0;
        let mut stack = Vec::new();
        for start in 0..n {
            if labels[start] != usize::MAX {
                continue;
            }
            labels[start] = next;
            stack.push(start);
            while let Some(node) = stack.pop() {
                for &(nb, _) in self.neighbors(node) {
                    if labels[nb] == usize::MAX {
                        labels[nb] = next;
                        stack.push(nb);
                    }
                }
            }
            next += 1;
        }
        labels
    }

    /// Fail with every node outside the largest component (ties go to the component
    /// discovered first), named through `names`.
    pub fn validate_connected(&self, names: &[String]) -> StitchResult<()> {
        let labels = self.connected_components();
        let count = labels.iter().max().map_or(0, |m| m + 1);
        if count <= 1 {
            return Ok(());
        }
        let mut sizes = vec![0usize; count];
        for &l in &labels {
            sizes[l] += 1;
        }
        let mut majority = 0;
        for (label, &size) in sizes.iter().enumerate() {
            if size > sizes[majority] {
                majority = label;
            }
        }
        let unstitchable: Vec<String> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l != majority)
            .map(|(i, _)| display_name(names, i))
            .collect();
        tracing::debug!(components = count, ?sizes, "match graph is disconnected");
        Err(StitchError::connectivity(unstitchable))
    }

    /// Single-source Dijkstra: distance and predecessor per node (`None` if unreachable;
    /// the source has no predecessor).
    pub fn shortest_paths_from(&self, source: usize) -> (Vec<Option<u64>>, Vec<Option<usize>>) {
        let n = self.node_count();
        let mut dist: Vec<Option<u64>> = vec![None; n];
        let mut pred: Vec<Option<usize>> = vec![None; n];
        if source >= n {
            return (dist, pred);
        }
        let mut done = vec![false; n];
        let mut heap = BinaryHeap::new();
        dist[source] = Some(0);
        heap.push(Reverse((0u64, source)));
        while let Some(Reverse((d, node))) = heap.pop() {
            if done[node] {
                continue;
            }
            done[node] = true;
            for &(nb, w) in self.neighbors(node) {
                let cand = d.saturating_add(w);
                if dist[nb].is_none_or(|cur| cand < cur) {
                    dist[nb] = Some(cand);
                    pred[nb] = Some(node);
                    heap.push(Reverse((cand, nb)));
                }
            }
        }
        (dist, pred)
    }

    /// Distance matrix; `None` marks unreachable pairs.
    pub fn all_pairs_shortest_paths(&self) -> Vec<Vec<Option<u64>>> {
        (0..self.node_count())
            .map(|s| self.shortest_paths_from(s).0)
            .collect()
    }

    /// Shortest-path tree rooted at `root`.
    pub fn shortest_path_tree(&self, root: usize) -> StitchResult<SpanningTree> {
        if root >= self.node_count() {
            return Err(StitchError::configuration(format!(
                "tree root {root} is out of range for {} images",
                self.node_count()
            )));
        }
        let (_, parents) = self.shortest_paths_from(root);
        SpanningTree::new(root, parents)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/match_graph.rs"]
mod tests;
