//! Binary index writer — serializes trie and graph to snapshot bytes.
//!
//! No file I/O here; `storage` owns the path handling.

use crate::error::{BindexError, Result};
use crate::format::{IndexHeader, HEADER_SIZE, VERSION};
use crate::graph::ProximityGraph;
use crate::trie::Trie;

/// Serialize a trie and graph that share one code width.
///
/// Returns the complete snapshot as a `Vec<u8>`.
pub fn write_index(trie: &Trie, graph: &ProximityGraph) -> Result<Vec<u8>> {
    let num_bytes = graph.store().num_bytes();
    if trie.num_bytes() != num_bytes {
        return Err(BindexError::ConfigMismatch {
            expected: trie.num_bytes(),
            found: num_bytes,
        });
    }

    let mut output = Vec::with_capacity(HEADER_SIZE + estimate_size(trie, graph));
    // Header is patched in once section offsets are known.
    output.resize(HEADER_SIZE, 0);

    // Trie section.
    let trie_offset = output.len() as u64;
    for node in trie.nodes() {
        put_u16(&mut output, count_u16(node.children().len(), "trie children")?);
        for &(byte, child) in node.children() {
            output.push(byte);
            put_u32(&mut output, child);
        }
        put_ids(&mut output, node.doc_ids())?;
    }
    seal_section(&mut output, trie_offset as usize);

    // Graph section.
    let graph_offset = output.len() as u64;
    for &ep in graph.entry_points() {
        put_u32(&mut output, ep);
    }
    let store = graph.store();
    for node in 0..graph.len() as u32 {
        output.extend_from_slice(store.code(node));
        put_ids(&mut output, store.doc_ids(node))?;
        let links = graph.neighbors(node);
        put_u16(&mut output, count_u16(links.len(), "neighbor list")?);
        for &link in links {
            put_u32(&mut output, link);
        }
    }
    seal_section(&mut output, graph_offset as usize);

    let header = IndexHeader {
        version: VERSION,
        flags: 0,
        num_bytes: count_u32(num_bytes, "num_bytes")?,
        trie_node_count: count_u32(trie.node_count(), "trie nodes")?,
        graph_node_count: count_u32(graph.len(), "graph nodes")?,
        entry_point_count: count_u32(graph.entry_points().len(), "entry points")?,
        trie_offset,
        graph_offset,
    };
    output[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

    Ok(output)
}

fn estimate_size(trie: &Trie, graph: &ProximityGraph) -> usize {
    let trie_bytes = trie.node_count() * 6 + trie.node_count() * 5 + trie.entry_count() * 4;
    let graph_bytes = graph.len() * (graph.store().num_bytes() + 10)
        + graph.store().entry_count() * 4
        + graph.edge_count() * 4;
    trie_bytes + graph_bytes + 8
}

/// Append a CRC32 over everything written since `start`.
fn seal_section(output: &mut Vec<u8>, start: usize) {
    let crc = crc32fast::hash(&output[start..]);
    output.extend_from_slice(&crc.to_le_bytes());
}

fn put_ids(output: &mut Vec<u8>, ids: &[u32]) -> Result<()> {
    put_u32(output, count_u32(ids.len(), "document ids")?);
    for &id in ids {
        put_u32(output, id);
    }
    Ok(())
}

fn put_u16(output: &mut Vec<u8>, value: u16) {
    output.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(output: &mut Vec<u8>, value: u32) {
    output.extend_from_slice(&value.to_le_bytes());
}

fn count_u16(len: usize, what: &str) -> Result<u16> {
    len.try_into().map_err(|_| {
        BindexError::corrupt(format!("{what} too long to serialize ({len}, max {})", u16::MAX))
    })
}

fn count_u32(len: usize, what: &str) -> Result<u32> {
    len.try_into().map_err(|_| {
        BindexError::corrupt(format!("{what} too large to serialize ({len}, max {})", u32::MAX))
    })
}
