//! Exact-match trie over fixed-width codes.
//!
//! Nodes live in an arena (`Vec<TrieNode>`, node 0 is the root) and refer to
//! their children by index. Each node keeps a sparse child list sorted by
//! byte value; a code is found by descending exactly `num_bytes` levels, and
//! the node reached holds every document id inserted with that code.

use crate::codes::CodeBatch;
use crate::error::{BindexError, Result};

/// One byte-prefix level of the trie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    /// (byte, child index), sorted by byte.
    children: Vec<(u8, u32)>,
    /// Document ids; only populated at terminal depth.
    doc_ids: Vec<u32>,
}

impl TrieNode {
    /// Build a node from persisted parts.
    pub fn from_parts(children: Vec<(u8, u32)>, doc_ids: Vec<u32>) -> Self {
        TrieNode { children, doc_ids }
    }

    pub fn children(&self) -> &[(u8, u32)] {
        &self.children
    }

    pub fn doc_ids(&self) -> &[u32] {
        &self.doc_ids
    }

    #[inline]
    fn child(&self, byte: u8) -> Option<u32> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| self.children[pos].1)
    }
}

/// A single exact-match hit: the query row and one matching document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactHit {
    pub query_index: usize,
    pub doc_id: u32,
}

/// Arena-backed prefix tree keyed by code bytes.
#[derive(Debug, Clone)]
pub struct Trie {
    num_bytes: usize,
    nodes: Vec<TrieNode>,
    /// Number of terminal nodes (distinct codes).
    code_count: usize,
}

impl Trie {
    /// Create an empty trie (root only) for `num_bytes`-wide codes.
    pub fn new(num_bytes: usize) -> Self {
        Trie {
            num_bytes,
            nodes: vec![TrieNode::default()],
            code_count: 0,
        }
    }

    /// Rebuild a trie from an arena read back from disk.
    ///
    /// Every child index must point past its parent, which rules out cycles
    /// and keeps lookups bounded.
    pub fn from_nodes(num_bytes: usize, nodes: Vec<TrieNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(BindexError::corrupt("trie has no root node"));
        }
        let node_count = nodes.len();
        for (parent, node) in nodes.iter().enumerate() {
            let mut prev: Option<u8> = None;
            for &(byte, child) in &node.children {
                if prev.is_some_and(|p| p >= byte) {
                    return Err(BindexError::corrupt(format!(
                        "trie node {parent} has unsorted children"
                    )));
                }
                prev = Some(byte);
                let child = child as usize;
                if child <= parent || child >= node_count {
                    return Err(BindexError::corrupt(format!(
                        "trie node {parent} has invalid child index {child}"
                    )));
                }
            }
        }

        let mut trie = Trie {
            num_bytes,
            nodes,
            code_count: 0,
        };
        trie.code_count = trie.count_terminals();
        Ok(trie)
    }

    /// Insert one code with its document id.
    pub fn insert(&mut self, code: &[u8], doc_id: u32) {
        debug_assert_eq!(code.len(), self.num_bytes);
        let mut current = 0usize;
        for &byte in code {
            current = match self.nodes[current]
                .children
                .binary_search_by_key(&byte, |&(b, _)| b)
            {
                Ok(pos) => self.nodes[current].children[pos].1 as usize,
                Err(pos) => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children.insert(pos, (byte, child as u32));
                    child
                }
            };
        }
        let terminal = &mut self.nodes[current];
        if terminal.doc_ids.is_empty() {
            self.code_count += 1;
        }
        terminal.doc_ids.push(doc_id);
    }

    /// Insert every row of `codes` paired with the id at the same position.
    pub fn insert_batch(&mut self, codes: &CodeBatch<'_>, ids: &[u32]) {
        debug_assert_eq!(codes.len(), ids.len());
        for (code, &id) in codes.iter().zip(ids) {
            self.insert(code, id);
        }
    }

    /// Document ids stored under exactly `code`, if any.
    pub fn get(&self, code: &[u8]) -> Option<&[u32]> {
        if code.len() != self.num_bytes {
            return None;
        }
        let mut current = 0u32;
        for &byte in code {
            current = self.nodes[current as usize].child(byte)?;
        }
        let ids = &self.nodes[current as usize].doc_ids;
        if ids.is_empty() {
            None
        } else {
            Some(ids)
        }
    }

    /// Exact lookup for every row; emits one hit per matching id.
    ///
    /// Hits for a row come out in insertion order, rows in query order.
    pub fn lookup_batch(&self, codes: &CodeBatch<'_>) -> Vec<ExactHit> {
        let mut hits = Vec::new();
        for (query_index, code) in codes.iter().enumerate() {
            if let Some(ids) = self.get(code) {
                hits.extend(ids.iter().map(|&doc_id| ExactHit {
                    query_index,
                    doc_id,
                }));
            }
        }
        hits
    }

    /// Arena nodes in index order (for serialization).
    pub fn nodes(&self) -> &[TrieNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct codes stored.
    pub fn code_count(&self) -> usize {
        self.code_count
    }

    /// Total document ids stored.
    pub fn entry_count(&self) -> usize {
        self.nodes.iter().map(|n| n.doc_ids.len()).sum()
    }

    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    fn count_terminals(&self) -> usize {
        self.nodes.iter().filter(|n| !n.doc_ids.is_empty()).count()
    }
}
