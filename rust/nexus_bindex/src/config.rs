//! Index construction parameters.
//!
//! Parameters are fixed for the lifetime of a `BinaryIndex`. A snapshot loaded
//! into an index is always searched with the loading index's parameters; only
//! `num_bytes` has to agree with what was saved.

use serde::{Deserialize, Serialize};

use crate::error::{BindexError, Result};

/// Default beam width for graph traversal.
pub const DEFAULT_EF: usize = 20;

/// Default hop budget while inserting.
pub const DEFAULT_INSERT_ITERATIONS: usize = 1000;

/// Default hop budget while querying.
pub const DEFAULT_QUERY_ITERATIONS: usize = 1000;

/// Default bound on each graph node's neighbor list.
pub const DEFAULT_MAX_DEGREE: usize = 4;

/// Construction parameters for a binary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Width of every code, in bytes.
    pub num_bytes: usize,
    /// Search breadth: maximum size of the candidate frontier.
    #[serde(default = "default_ef")]
    pub ef: usize,
    /// Maximum node expansions per inserted code.
    #[serde(default = "default_insert_iterations")]
    pub insert_iterations: usize,
    /// Maximum node expansions per query code.
    #[serde(default = "default_query_iterations")]
    pub query_iterations: usize,
    /// Maximum neighbors kept per graph node.
    #[serde(default = "default_max_degree")]
    pub max_degree: usize,
}

fn default_ef() -> usize {
    DEFAULT_EF
}

fn default_insert_iterations() -> usize {
    DEFAULT_INSERT_ITERATIONS
}

fn default_query_iterations() -> usize {
    DEFAULT_QUERY_ITERATIONS
}

fn default_max_degree() -> usize {
    DEFAULT_MAX_DEGREE
}

impl IndexConfig {
    /// Config for `num_bytes`-wide codes with default search parameters.
    pub fn new(num_bytes: usize) -> Self {
        IndexConfig {
            num_bytes,
            ef: DEFAULT_EF,
            insert_iterations: DEFAULT_INSERT_ITERATIONS,
            query_iterations: DEFAULT_QUERY_ITERATIONS,
            max_degree: DEFAULT_MAX_DEGREE,
        }
    }

    pub fn with_ef(mut self, ef: usize) -> Self {
        self.ef = ef;
        self
    }

    pub fn with_insert_iterations(mut self, iterations: usize) -> Self {
        self.insert_iterations = iterations;
        self
    }

    pub fn with_query_iterations(mut self, iterations: usize) -> Self {
        self.query_iterations = iterations;
        self
    }

    pub fn with_max_degree(mut self, max_degree: usize) -> Self {
        self.max_degree = max_degree;
        self
    }

    /// Reject parameters the index cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.num_bytes == 0 {
            return Err(BindexError::InvalidConfig("num_bytes must be > 0".into()));
        }
        if self.num_bytes > u32::MAX as usize {
            return Err(BindexError::InvalidConfig(format!(
                "num_bytes must be <= {}",
                u32::MAX
            )));
        }
        if self.ef == 0 {
            return Err(BindexError::InvalidConfig("ef must be > 0".into()));
        }
        if self.max_degree == 0 {
            return Err(BindexError::InvalidConfig("max_degree must be > 0".into()));
        }
        // Neighbor counts are stored as u16 on disk.
        if self.max_degree > u16::MAX as usize {
            return Err(BindexError::InvalidConfig(format!(
                "max_degree must be <= {}",
                u16::MAX
            )));
        }
        Ok(())
    }
}

/// Parse and validate an index config from a JSON string.
pub fn parse_index_config(json: &str) -> Result<IndexConfig> {
    let config: IndexConfig = serde_json::from_str(json)
        .map_err(|e| BindexError::InvalidConfig(format!("malformed config: {e}")))?;
    config.validate()?;
    Ok(config)
}
