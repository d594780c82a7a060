//! Binary index — the top-level coordinator.
//!
//! Owns one trie and one proximity graph over the same code width and turns
//! them into the public add/query/save/load contract. State sits behind a
//! `RwLock`: `add`, `load` and `dispose` are exclusive, queries and saves run
//! concurrently with each other.

use std::path::Path;

use parking_lot::RwLock;

use crate::codes::CodeBatch;
use crate::config::IndexConfig;
use crate::error::{BindexError, Result};
use crate::graph::ProximityGraph;
use crate::reader::read_index;
use crate::storage::{read_snapshot, write_snapshot};
use crate::trie::Trie;
use crate::writer::write_index;

/// One ranked result: a document and its Hamming distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub doc_id: u32,
    pub distance: u32,
}

impl Match {
    pub fn new(doc_id: u32, distance: u32) -> Self {
        Match { doc_id, distance }
    }
}

impl From<Match> for (u32, u32) {
    fn from(m: Match) -> Self {
        (m.doc_id, m.distance)
    }
}

/// Size counters for an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Indexed (document id, code) pairs.
    pub entries: usize,
    /// Distinct codes.
    pub distinct_codes: usize,
    pub trie_nodes: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

struct IndexState {
    trie: Trie,
    graph: ProximityGraph,
}

impl IndexState {
    fn empty(config: IndexConfig) -> Self {
        IndexState {
            trie: Trie::new(config.num_bytes),
            graph: ProximityGraph::new(config),
        }
    }
}

/// Exact + approximate index over fixed-width binary codes.
///
/// Thread-safe: all methods take `&self`.
pub struct BinaryIndex {
    config: IndexConfig,
    /// `None` once disposed or after a failed load.
    state: RwLock<Option<IndexState>>,
}

impl BinaryIndex {
    /// Create an empty index.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(BinaryIndex {
            config,
            state: RwLock::new(Some(IndexState::empty(config))),
        })
    }

    /// Create an index and restore the snapshot at `path` into it.
    pub fn open(config: IndexConfig, path: &Path) -> Result<Self> {
        let index = Self::new(config)?;
        index.load(path)?;
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Index one code per document id.
    ///
    /// `codes` holds `doc_ids.len()` rows of `num_bytes` each. Rows are
    /// inserted in order; shape errors leave the index untouched.
    pub fn add(&self, doc_ids: &[u32], codes: &[u8]) -> Result<()> {
        let batch = CodeBatch::for_ids(codes, doc_ids, self.config.num_bytes)?;

        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(BindexError::Closed)?;
        state.trie.insert_batch(&batch, doc_ids);
        state.graph.insert_batch(&batch, doc_ids);

        tracing::debug!(
            rows = batch.len(),
            graph_nodes = state.graph.len(),
            "bindex add"
        );
        Ok(())
    }

    /// Up to `top_k` matches per query row.
    ///
    /// Exact trie matches (distance 0) come first, followed by graph matches
    /// in search order with distance-0 graph hits dropped, since the trie
    /// already reported every identical code.
    pub fn query(&self, codes: &[u8], top_k: usize) -> Result<Vec<Vec<Match>>> {
        let batch = CodeBatch::new(codes, self.config.num_bytes)?;

        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BindexError::Closed)?;

        let mut results: Vec<Vec<Match>> = vec![Vec::new(); batch.len()];
        if batch.is_empty() || top_k == 0 {
            return Ok(results);
        }

        for hit in state.trie.lookup_batch(&batch) {
            results[hit.query_index].push(Match::new(hit.doc_id, 0));
        }
        for hit in state.graph.search_batch(&batch) {
            if hit.distance == 0 {
                continue;
            }
            let row = &mut results[hit.query_index];
            if row.len() < top_k {
                row.push(Match::new(hit.doc_id, hit.distance));
            }
        }
        for row in &mut results {
            row.truncate(top_k);
        }

        tracing::debug!(rows = batch.len(), top_k, "bindex query");
        Ok(results)
    }

    /// Write a snapshot of the whole index to `path`.
    ///
    /// In-memory state is unaffected whether or not the save succeeds.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = {
            let guard = self.state.read();
            let state = guard.as_ref().ok_or(BindexError::Closed)?;
            write_index(&state.trie, &state.graph)?
        };
        write_snapshot(path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "bindex saved");
        Ok(())
    }

    /// Replace the index contents with the snapshot at `path`.
    ///
    /// The snapshot must have been written with the same `num_bytes`; the
    /// other search parameters are this index's own. Any failure leaves the
    /// index closed.
    pub fn load(&self, path: &Path) -> Result<()> {
        let mut guard = self.state.write();
        // Old contents are gone whether or not the load succeeds.
        *guard = None;

        let loaded = read_snapshot(path).and_then(|bytes| read_index(&bytes, &self.config));
        match loaded {
            Ok((trie, graph)) => {
                tracing::info!(
                    path = %path.display(),
                    trie_nodes = trie.node_count(),
                    graph_nodes = graph.len(),
                    "bindex loaded"
                );
                *guard = Some(IndexState { trie, graph });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "bindex load failed; index closed");
                Err(e)
            }
        }
    }

    /// Release all in-memory state. Later calls fail with `Closed`.
    pub fn dispose(&self) {
        *self.state.write() = None;
    }

    /// True until `dispose` or a failed `load`.
    pub fn is_open(&self) -> bool {
        self.state.read().is_some()
    }

    /// Number of indexed (document id, code) pairs; 0 when closed.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |s| s.graph.store().entry_count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BindexError::Closed)?;
        Ok(IndexStats {
            entries: state.trie.entry_count(),
            distinct_codes: state.trie.code_count(),
            trie_nodes: state.trie.node_count(),
            graph_nodes: state.graph.len(),
            graph_edges: state.graph.edge_count(),
        })
    }
}
