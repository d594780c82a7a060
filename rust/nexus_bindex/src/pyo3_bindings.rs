//! PyO3 bindings for the binary index.
//!
//! Exposes `PyBinaryIndexer` as the Python-visible class. Every method
//! forwards to `BinaryIndex`; batch work runs with the GIL released.

use std::path::PathBuf;

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::IndexConfig;
use crate::error::BindexError;
use crate::index::BinaryIndex;

/// Map index errors onto the closest Python exception type.
fn to_py_err(e: BindexError) -> PyErr {
    match e {
        BindexError::ShapeMismatch { .. }
        | BindexError::CountMismatch { .. }
        | BindexError::InvalidConfig(_)
        | BindexError::ConfigMismatch { .. } => PyValueError::new_err(e.to_string()),
        BindexError::Io(_) | BindexError::IndexNotFound(_) => PyIOError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Rust-backed binary code indexer exposed to Python.
///
/// Thread-safe: all methods take `&self`.
#[pyclass(frozen, name = "PyBinaryIndexer")]
pub struct PyBinaryIndexer {
    index: BinaryIndex,
}

#[pymethods]
impl PyBinaryIndexer {
    /// Create an empty index for `num_bytes`-wide codes.
    ///
    /// Args:
    ///     num_bytes: Width of every code in bytes.
    ///     ef: Search breadth (candidate frontier size).
    ///     insert_iterations: Hop budget per inserted code.
    ///     query_iterations: Hop budget per query code.
    ///     max_degree: Neighbor-list bound per graph node.
    #[new]
    #[pyo3(signature = (num_bytes, ef = 20, insert_iterations = 1000, query_iterations = 1000, max_degree = 4))]
    fn new(
        num_bytes: usize,
        ef: usize,
        insert_iterations: usize,
        query_iterations: usize,
        max_degree: usize,
    ) -> PyResult<Self> {
        let config = IndexConfig::new(num_bytes)
            .with_ef(ef)
            .with_insert_iterations(insert_iterations)
            .with_query_iterations(query_iterations)
            .with_max_degree(max_degree);
        let index = BinaryIndex::new(config).map_err(to_py_err)?;
        Ok(Self { index })
    }

    /// Index `vectors` (len(doc_ids) * num_bytes bytes) under `doc_ids`.
    fn add(&self, py: Python<'_>, doc_ids: Vec<u32>, vectors: &[u8]) -> PyResult<()> {
        py.detach(|| self.index.add(&doc_ids, vectors))
            .map_err(to_py_err)
    }

    /// Query with concatenated `keys`.
    ///
    /// Returns: one list of (doc_id, distance) tuples per key, at most
    /// `top_k` long, exact matches first.
    #[pyo3(signature = (keys, top_k = 1))]
    fn query(&self, py: Python<'_>, keys: &[u8], top_k: usize) -> PyResult<Vec<Vec<(u32, u32)>>> {
        let results = py
            .detach(|| self.index.query(keys, top_k))
            .map_err(to_py_err)?;
        Ok(results
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect())
    }

    /// Write a snapshot to `path`.
    fn save(&self, py: Python<'_>, path: PathBuf) -> PyResult<()> {
        py.detach(|| self.index.save(&path)).map_err(to_py_err)
    }

    /// Replace the index contents with the snapshot at `path`.
    fn load(&self, py: Python<'_>, path: PathBuf) -> PyResult<()> {
        py.detach(|| self.index.load(&path)).map_err(to_py_err)
    }

    /// Release all index memory. The object is unusable afterwards.
    fn close(&self) {
        self.index.dispose();
    }

    /// Number of indexed (doc_id, code) pairs.
    #[getter]
    fn size(&self) -> usize {
        self.index.len()
    }

    #[getter]
    fn num_bytes(&self) -> usize {
        self.index.config().num_bytes
    }

    /// Structure counters as a dict.
    fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let stats = self.index.stats().map_err(to_py_err)?;
        let dict = PyDict::new(py);
        dict.set_item("entries", stats.entries)?;
        dict.set_item("distinct_codes", stats.distinct_codes)?;
        dict.set_item("trie_nodes", stats.trie_nodes)?;
        dict.set_item("graph_nodes", stats.graph_nodes)?;
        dict.set_item("graph_edges", stats.graph_edges)?;
        Ok(dict)
    }
}
