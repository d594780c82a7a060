//! `nexus_bindex` — binary code index for Nexus.
//!
//! Indexes fixed-width binary codes (hashed feature vectors) under caller
//! supplied document ids and answers two kinds of query at once: exact
//! duplicates through a byte trie, and approximate nearest neighbors under
//! Hamming distance through a navigable proximity graph.
//!
//! Modules:
//! - `codes`   — shape-checked code batches and the node code store
//! - `trie`    — exact-match prefix tree
//! - `hamming` — bit distance between codes
//! - `graph`   — proximity graph insertion and beam search
//! - `index`   — `BinaryIndex`, the public add/query/save/load surface
//! - `format`, `writer`, `reader` — snapshot byte format (no file I/O)
//! - `storage` — snapshot file I/O
//! - `config`, `error`

pub mod codes;
pub mod config;
pub mod error;
pub mod format;
pub mod graph;
pub mod hamming;
pub mod index;
#[cfg(feature = "python")]
pub mod pyo3_bindings;
pub mod reader;
pub mod storage;
pub mod trie;
pub mod writer;

pub use config::{parse_index_config, IndexConfig};
pub use error::{BindexError, Result};
pub use index::{BinaryIndex, IndexStats, Match};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module: _nexus_bindex
#[cfg(feature = "python")]
#[pymodule]
fn _nexus_bindex(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<pyo3_bindings::PyBinaryIndexer>()?;
    Ok(())
}
