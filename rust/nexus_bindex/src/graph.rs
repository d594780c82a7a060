//! Navigable proximity graph over Hamming space.
//!
//! Every inserted row becomes a node (identical codes still get separate
//! nodes). A new node is wired to the closest nodes a greedy beam search can
//! find, and each of those gets a backlink if it has room or if the new node
//! is closer than its current worst neighbor. Queries run the same beam
//! search with their own hop budget.
//!
//! Node 0 is the sole entry point. Links are `u32` indices into the arena,
//! so cycles in the graph never turn into ownership cycles.

use ahash::AHashSet;
use rayon::prelude::*;

use crate::codes::{CodeBatch, CodeStore};
use crate::config::IndexConfig;
use crate::error::{BindexError, Result};
use crate::hamming::hamming_distance;

/// Query rows above which `search_batch` fans out across threads.
const SEARCH_PARALLEL_THRESHOLD: usize = 32;

/// A node together with its distance to the search target.
///
/// Field order gives the ranking: ascending distance, ties to the lower node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
    pub distance: u32,
    pub node: u32,
}

/// One approximate hit for one query row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproxHit {
    pub doc_id: u32,
    pub distance: u32,
    pub query_index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    neighbor: Neighbor,
    expanded: bool,
}

/// Proximity graph over inserted codes.
#[derive(Debug, Clone)]
pub struct ProximityGraph {
    config: IndexConfig,
    store: CodeStore,
    neighbors: Vec<Vec<u32>>,
    entry_points: Vec<u32>,
}

impl ProximityGraph {
    pub fn new(config: IndexConfig) -> Self {
        ProximityGraph {
            config,
            store: CodeStore::new(config.num_bytes),
            neighbors: Vec::new(),
            entry_points: Vec::new(),
        }
    }

    /// Reassemble a graph read back from disk, checking every link.
    pub fn from_parts(
        config: IndexConfig,
        store: CodeStore,
        neighbors: Vec<Vec<u32>>,
        entry_points: Vec<u32>,
    ) -> Result<Self> {
        if store.num_bytes() != config.num_bytes {
            return Err(BindexError::ConfigMismatch {
                expected: config.num_bytes,
                found: store.num_bytes(),
            });
        }
        if store.len() != neighbors.len() {
            return Err(BindexError::corrupt(format!(
                "graph has {} codes but {} neighbor lists",
                store.len(),
                neighbors.len()
            )));
        }
        let node_count = store.len();
        if node_count > 0 && entry_points.is_empty() {
            return Err(BindexError::corrupt("non-empty graph has no entry point"));
        }
        if let Some(&bad) = entry_points.iter().find(|&&ep| ep as usize >= node_count) {
            return Err(BindexError::corrupt(format!(
                "entry point {bad} out of range ({node_count} nodes)"
            )));
        }
        for (node, links) in neighbors.iter().enumerate() {
            if let Some(&bad) = links.iter().find(|&&n| n as usize >= node_count) {
                return Err(BindexError::corrupt(format!(
                    "node {node} links to {bad}, out of range ({node_count} nodes)"
                )));
            }
        }

        Ok(ProximityGraph {
            config,
            store,
            neighbors,
            entry_points,
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total directed links.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }

    pub fn entry_points(&self) -> &[u32] {
        &self.entry_points
    }

    pub fn neighbors(&self, node: u32) -> &[u32] {
        &self.neighbors[node as usize]
    }

    pub fn store(&self) -> &CodeStore {
        &self.store
    }

    #[inline]
    fn measure(&self, target: &[u8], node: u32) -> Neighbor {
        Neighbor {
            distance: hamming_distance(target, self.store.code(node)),
            node,
        }
    }

    /// Greedy beam search for the `ef` nodes closest to `target`.
    ///
    /// Each hop expands the best unexpanded frontier node. The search ends
    /// after `hops` expansions or once every frontier node has been expanded.
    /// An expansion that adds no closer node does not end the search on its
    /// own; the remaining unexpanded frontier nodes are still visited.
    /// Returns the frontier in ascending (distance, node) order.
    pub fn search(&self, target: &[u8], hops: usize) -> Vec<Neighbor> {
        if self.store.is_empty() {
            return Vec::new();
        }
        let ef = self.config.ef;
        let mut visited: AHashSet<u32> = AHashSet::with_capacity(ef * 4);
        let mut frontier: Vec<Candidate> = Vec::with_capacity(ef + 1);

        for &ep in &self.entry_points {
            if visited.insert(ep) {
                merge_into_frontier(&mut frontier, self.measure(target, ep), ef);
            }
        }

        for _ in 0..hops {
            let Some(pos) = frontier.iter().position(|c| !c.expanded) else {
                break;
            };
            frontier[pos].expanded = true;
            let node = frontier[pos].neighbor.node;
            for &next in &self.neighbors[node as usize] {
                if visited.insert(next) {
                    merge_into_frontier(&mut frontier, self.measure(target, next), ef);
                }
            }
        }

        frontier.into_iter().map(|c| c.neighbor).collect()
    }

    /// Insert one code as a new node and return its index.
    pub fn insert(&mut self, code: &[u8], doc_ids: Vec<u32>) -> u32 {
        let candidates = self.search(code, self.config.insert_iterations);
        let node = self.store.push(code, doc_ids);

        let links: Vec<Neighbor> = candidates
            .into_iter()
            .take(self.config.max_degree)
            .collect();
        self.neighbors.push(links.iter().map(|n| n.node).collect());
        for link in &links {
            self.link_back(link.node, node, link.distance);
        }

        if self.entry_points.is_empty() {
            self.entry_points.push(node);
        }
        node
    }

    /// Insert rows in order, one node per (code, id) pair.
    pub fn insert_batch(&mut self, codes: &CodeBatch<'_>, ids: &[u32]) {
        debug_assert_eq!(codes.len(), ids.len());
        for (code, &id) in codes.iter().zip(ids) {
            self.insert(code, vec![id]);
        }
    }

    /// Approximate search for every row, hits grouped by row in query order.
    pub fn search_batch(&self, codes: &CodeBatch<'_>) -> Vec<ApproxHit> {
        let rows: Vec<Vec<ApproxHit>> = if codes.len() > SEARCH_PARALLEL_THRESHOLD {
            (0..codes.len())
                .into_par_iter()
                .map(|i| self.search_row(i, codes.get(i)))
                .collect()
        } else {
            codes
                .iter()
                .enumerate()
                .map(|(i, code)| self.search_row(i, code))
                .collect()
        };
        rows.into_iter().flatten().collect()
    }

    fn search_row(&self, query_index: usize, code: &[u8]) -> Vec<ApproxHit> {
        let mut hits = Vec::new();
        for found in self.search(code, self.config.query_iterations) {
            hits.extend(self.store.doc_ids(found.node).iter().map(|&doc_id| ApproxHit {
                doc_id,
                distance: found.distance,
                query_index,
            }));
        }
        hits
    }

    /// Add `node` to `target`'s neighbor list, evicting the farthest link
    /// when the list is full and `node` is strictly closer.
    fn link_back(&mut self, target: u32, node: u32, distance: u32) {
        let max_degree = self.config.max_degree;
        let store = &self.store;
        let target_code = store.code(target);
        let links = &mut self.neighbors[target as usize];

        if links.len() < max_degree {
            links.push(node);
            return;
        }

        let worst = links
            .iter()
            .enumerate()
            .map(|(slot, &n)| (hamming_distance(target_code, store.code(n)), n, slot))
            .max_by_key(|&(d, n, _)| (d, n));
        if let Some((worst_distance, _, slot)) = worst {
            if distance < worst_distance {
                links[slot] = node;
            }
        }
    }
}

/// Insert `candidate` into the sorted frontier, keeping at most `ef` entries.
fn merge_into_frontier(frontier: &mut Vec<Candidate>, candidate: Neighbor, ef: usize) {
    if frontier.len() >= ef && frontier.last().is_some_and(|w| candidate >= w.neighbor) {
        return;
    }
    let pos = frontier.partition_point(|c| c.neighbor < candidate);
    frontier.insert(
        pos,
        Candidate {
            neighbor: candidate,
            expanded: false,
        },
    );
    frontier.truncate(ef);
}
