//! Error types for the binary index.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during binary index operations.
#[derive(Debug, Error)]
pub enum BindexError {
    /// Code buffer length is not a multiple of the code width.
    #[error("code buffer of {len} bytes is not a multiple of num_bytes={num_bytes}")]
    ShapeMismatch { len: usize, num_bytes: usize },
    /// Number of document ids does not match the number of codes.
    #[error("{ids} document ids do not match {codes_len} code bytes (num_bytes={num_bytes})")]
    CountMismatch {
        ids: usize,
        codes_len: usize,
        num_bytes: usize,
    },
    /// Construction parameters are unusable.
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
    /// Persisted index was built for a different code width.
    #[error("num_bytes mismatch: index configured for {expected}, snapshot has {found}")]
    ConfigMismatch { expected: usize, found: usize },
    /// I/O error during save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot file not found at the given path.
    #[error("index not found: {}", .0.display())]
    IndexNotFound(PathBuf),
    /// Invalid magic bytes in snapshot header.
    #[error("invalid magic bytes in index header")]
    InvalidMagic,
    /// Snapshot version does not match the supported version.
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    /// Snapshot data is corrupted.
    #[error("corrupt index: {reason}")]
    CorruptIndex { reason: String },
    /// Index was disposed, or a failed load left it unusable.
    #[error("index is closed")]
    Closed,
}

impl BindexError {
    /// True for errors caused by malformed caller input (nothing was mutated).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BindexError::ShapeMismatch { .. } | BindexError::CountMismatch { .. }
        )
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        BindexError::CorruptIndex {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BindexError>;
