//! Binary snapshot format for the binary index.
//!
//! Layout (all integers little-endian):
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (48 bytes)                           │
//! │  magic: [u8; 4] = "BIDX"                    │
//! │  version: u32 = 1                           │
//! │  flags: u32                                 │
//! │  num_bytes: u32                             │
//! │  trie_node_count: u32                       │
//! │  graph_node_count: u32                      │
//! │  entry_point_count: u32                     │
//! │  trie_offset: u64                           │
//! │  graph_offset: u64                          │
//! │  header_crc32: u32                          │
//! ├─────────────────────────────────────────────┤
//! │ Trie Section (arena order, node 0 = root)   │
//! │  child_count: u16                           │
//! │  (byte: u8, child: u32) * child_count       │
//! │  id_count: u32, id: u32 * id_count          │
//! │  ... + section_crc32                        │
//! ├─────────────────────────────────────────────┤
//! │ Graph Section                               │
//! │  entry_point: u32 * entry_point_count       │
//! │  per node: code [u8; num_bytes]             │
//! │            id_count: u32, id: u32 *         │
//! │            neighbor_count: u16, nbr: u32 *  │
//! │  ... + section_crc32                        │
//! └─────────────────────────────────────────────┘
//! ```

use crate::error::{BindexError, Result};

/// Magic bytes identifying a binary index snapshot.
pub const MAGIC: [u8; 4] = *b"BIDX";

/// Current format version.
pub const VERSION: u32 = 1;

/// Header size in bytes (fixed).
pub const HEADER_SIZE: usize = 48;

/// Size of the CRC32 trailer on every section.
pub const SECTION_CRC_SIZE: usize = 4;

/// Snapshot header parsed from bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub flags: u32,
    pub num_bytes: u32,
    pub trie_node_count: u32,
    pub graph_node_count: u32,
    pub entry_point_count: u32,
    pub trie_offset: u64,
    pub graph_offset: u64,
}

impl IndexHeader {
    /// Serialize header to bytes (48 bytes, little-endian).
    /// CRC32 is computed over the first 44 bytes and appended as bytes 44-47.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.num_bytes.to_le_bytes());
        buf[16..20].copy_from_slice(&self.trie_node_count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.graph_node_count.to_le_bytes());
        buf[24..28].copy_from_slice(&self.entry_point_count.to_le_bytes());
        buf[28..36].copy_from_slice(&self.trie_offset.to_le_bytes());
        buf[36..44].copy_from_slice(&self.graph_offset.to_le_bytes());
        let crc = crc32fast::hash(&buf[..44]);
        buf[44..48].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parse and verify a header.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(BindexError::corrupt(format!(
                "file is {} bytes, shorter than the {HEADER_SIZE}-byte header",
                data.len()
            )));
        }
        if data[0..4] != MAGIC {
            return Err(BindexError::InvalidMagic);
        }

        let stored_crc = read_u32(data, 44);
        let computed_crc = crc32fast::hash(&data[..44]);
        if stored_crc != computed_crc {
            return Err(BindexError::corrupt(format!(
                "header CRC mismatch: expected {stored_crc:#010x}, got {computed_crc:#010x}"
            )));
        }

        let version = read_u32(data, 4);
        if version != VERSION {
            return Err(BindexError::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        Ok(IndexHeader {
            version,
            flags: read_u32(data, 8),
            num_bytes: read_u32(data, 12),
            trie_node_count: read_u32(data, 16),
            graph_node_count: read_u32(data, 20),
            entry_point_count: read_u32(data, 24),
            trie_offset: read_u64(data, 28),
            graph_offset: read_u64(data, 36),
        })
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        data[at],
        data[at + 1],
        data[at + 2],
        data[at + 3],
        data[at + 4],
        data[at + 5],
        data[at + 6],
        data[at + 7],
    ])
}
