//! Code batches and the code store.
//!
//! Callers hand codes over as one concatenated buffer of `num_bytes`-wide
//! rows. `CodeBatch` validates that shape once and then hands out row slices;
//! `CodeStore` owns the canonical bytes of every graph node plus the document
//! ids that were inserted with it.

use std::slice::ChunksExact;

use crate::error::{BindexError, Result};

/// Borrowed, shape-checked view over concatenated fixed-width codes.
#[derive(Debug, Clone, Copy)]
pub struct CodeBatch<'a> {
    data: &'a [u8],
    num_bytes: usize,
}

impl<'a> CodeBatch<'a> {
    /// Wrap `data`, rejecting buffers that are not a whole number of rows.
    pub fn new(data: &'a [u8], num_bytes: usize) -> Result<Self> {
        if num_bytes == 0 || data.len() % num_bytes != 0 {
            return Err(BindexError::ShapeMismatch {
                len: data.len(),
                num_bytes,
            });
        }
        Ok(CodeBatch { data, num_bytes })
    }

    /// Wrap `data` as exactly one row per document id.
    pub fn for_ids(data: &'a [u8], ids: &[u32], num_bytes: usize) -> Result<Self> {
        if ids.len().checked_mul(num_bytes) != Some(data.len()) {
            return Err(BindexError::CountMismatch {
                ids: ids.len(),
                codes_len: data.len(),
                num_bytes,
            });
        }
        Self::new(data, num_bytes)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len() / self.num_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    /// Row `i`. Panics if out of range.
    pub fn get(&self, i: usize) -> &'a [u8] {
        &self.data[i * self.num_bytes..(i + 1) * self.num_bytes]
    }

    /// Iterate rows in order.
    pub fn iter(&self) -> ChunksExact<'a, u8> {
        self.data.chunks_exact(self.num_bytes)
    }
}

/// Arena of inserted codes and their document ids, addressed by node index.
#[derive(Debug, Clone)]
pub struct CodeStore {
    num_bytes: usize,
    /// All codes back to back, `num_bytes` apart.
    codes: Vec<u8>,
    /// Document ids per node.
    doc_ids: Vec<Vec<u32>>,
}

impl CodeStore {
    pub fn new(num_bytes: usize) -> Self {
        CodeStore {
            num_bytes,
            codes: Vec::new(),
            doc_ids: Vec::new(),
        }
    }

    /// Append a code with its ids and return the new node index.
    ///
    /// `code` must be exactly `num_bytes` long.
    pub fn push(&mut self, code: &[u8], ids: Vec<u32>) -> u32 {
        debug_assert_eq!(code.len(), self.num_bytes);
        let node = self.doc_ids.len() as u32;
        self.codes.extend_from_slice(code);
        self.doc_ids.push(ids);
        node
    }

    /// Canonical bytes of `node`.
    #[inline]
    pub fn code(&self, node: u32) -> &[u8] {
        let start = node as usize * self.num_bytes;
        &self.codes[start..start + self.num_bytes]
    }

    /// Document ids stored with `node`.
    #[inline]
    pub fn doc_ids(&self, node: u32) -> &[u32] {
        &self.doc_ids[node as usize]
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    /// Total document ids across all nodes.
    pub fn entry_count(&self) -> usize {
        self.doc_ids.iter().map(Vec::len).sum()
    }
}
