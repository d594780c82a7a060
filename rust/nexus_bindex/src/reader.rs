//! Binary index reader — rebuilds trie and graph from snapshot bytes.
//!
//! Everything read from disk is untrusted: offsets, counts and link indices
//! are checked before use, and each section's CRC32 must match.

use crate::codes::CodeStore;
use crate::config::IndexConfig;
use crate::error::{BindexError, Result};
use crate::format::{IndexHeader, HEADER_SIZE, SECTION_CRC_SIZE};
use crate::graph::ProximityGraph;
use crate::trie::{Trie, TrieNode};

/// Parse a snapshot into a trie and graph configured by `config`.
///
/// The snapshot's `num_bytes` must equal `config.num_bytes`; all other
/// search parameters come from `config`.
pub fn read_index(data: &[u8], config: &IndexConfig) -> Result<(Trie, ProximityGraph)> {
    let header = IndexHeader::from_bytes(data)?;
    if header.num_bytes as usize != config.num_bytes {
        return Err(BindexError::ConfigMismatch {
            expected: config.num_bytes,
            found: header.num_bytes as usize,
        });
    }

    let trie_offset = to_offset(header.trie_offset)?;
    let graph_offset = to_offset(header.graph_offset)?;
    let trie_end = trie_offset.checked_add(SECTION_CRC_SIZE);
    let graph_end = graph_offset.checked_add(SECTION_CRC_SIZE);
    let in_order = matches!(
        (trie_end, graph_end),
        (Some(t), Some(g)) if trie_offset >= HEADER_SIZE && graph_offset >= t && data.len() >= g
    );
    if !in_order {
        return Err(BindexError::corrupt(format!(
            "bad section offsets (trie {trie_offset}, graph {graph_offset}, file {})",
            data.len()
        )));
    }

    let trie_bytes = verified_section(data, trie_offset, graph_offset, "trie")?;
    let graph_bytes = verified_section(data, graph_offset, data.len(), "graph")?;

    let trie = read_trie(trie_bytes, &header, config.num_bytes)?;
    let graph = read_graph(graph_bytes, &header, *config)?;
    Ok((trie, graph))
}

fn to_offset(offset: u64) -> Result<usize> {
    usize::try_from(offset)
        .map_err(|_| BindexError::corrupt(format!("section offset {offset} out of range")))
}

/// Slice `data[start..end]`, check its trailing CRC32 and return the payload.
fn verified_section<'a>(
    data: &'a [u8],
    start: usize,
    end: usize,
    name: &'static str,
) -> Result<&'a [u8]> {
    let crc_at = match end.checked_sub(SECTION_CRC_SIZE) {
        Some(at) if start <= at && end <= data.len() => at,
        _ => {
            return Err(BindexError::corrupt(format!(
                "{name} section bounds {start}..{end} out of range"
            )))
        }
    };
    let payload = &data[start..crc_at];
    let stored = u32::from_le_bytes([
        data[crc_at],
        data[crc_at + 1],
        data[crc_at + 2],
        data[crc_at + 3],
    ]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(BindexError::corrupt(format!(
            "{name} section CRC mismatch: expected {stored:#010x}, got {computed:#010x}"
        )));
    }
    Ok(payload)
}

fn read_trie(bytes: &[u8], header: &IndexHeader, num_bytes: usize) -> Result<Trie> {
    let mut cursor = Cursor::new(bytes, "trie");
    let count = header.trie_node_count as usize;
    // Smallest node: child_count + id_count.
    let mut nodes = Vec::with_capacity(count.min(bytes.len() / 6));
    for _ in 0..count {
        let child_count = cursor.u16()? as usize;
        let mut children = Vec::with_capacity(child_count.min(256));
        for _ in 0..child_count {
            let byte = cursor.u8()?;
            let child = cursor.u32()?;
            children.push((byte, child));
        }
        let doc_ids = cursor.ids()?;
        nodes.push(TrieNode::from_parts(children, doc_ids));
    }
    cursor.finish()?;
    Trie::from_nodes(num_bytes, nodes)
}

fn read_graph(bytes: &[u8], header: &IndexHeader, config: IndexConfig) -> Result<ProximityGraph> {
    let mut cursor = Cursor::new(bytes, "graph");

    let entry_count = header.entry_point_count as usize;
    let mut entry_points = Vec::with_capacity(entry_count.min(bytes.len() / 4));
    for _ in 0..entry_count {
        entry_points.push(cursor.u32()?);
    }

    let node_count = header.graph_node_count as usize;
    // Smallest node: code + id_count + neighbor_count.
    let min_node = config.num_bytes + 6;
    let mut store = CodeStore::new(config.num_bytes);
    let mut neighbors = Vec::with_capacity(node_count.min(bytes.len() / min_node));
    for _ in 0..node_count {
        let code = cursor.take(config.num_bytes)?;
        let doc_ids = cursor.ids()?;
        let link_count = cursor.u16()? as usize;
        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            links.push(cursor.u32()?);
        }
        store.push(code, doc_ids);
        neighbors.push(links);
    }
    cursor.finish()?;

    ProximityGraph::from_parts(config, store, neighbors, entry_points)
}

/// Bounds-checked little-endian reader over one section payload.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    section: &'static str,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], section: &'static str) -> Self {
        Cursor {
            data,
            pos: 0,
            section,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                BindexError::corrupt(format!(
                    "{} section truncated at offset {} (need {len} bytes)",
                    self.section, self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed document id list.
    fn ids(&mut self) -> Result<Vec<u32>> {
        let count = self.u32()? as usize;
        let remaining = self.data.len() - self.pos;
        let mut ids = Vec::with_capacity(count.min(remaining / 4));
        for _ in 0..count {
            ids.push(self.u32()?);
        }
        Ok(ids)
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.data.len() {
            return Err(BindexError::corrupt(format!(
                "{} section has {} trailing bytes",
                self.section,
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
