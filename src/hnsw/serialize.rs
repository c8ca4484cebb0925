//! Snapshot byte layout for graph topology.
//!
//! Items and non-`m` parameters are never written; the caller re-supplies the
//! item sequence (ids are positions) and re-applies its tuning after restore.
//!
//! Layout, all integers little-endian except the checksum:
//!
//! ```text
//! [magic b"SWG1" 4B][version u16][m u32][node_count u64]
//! per node in id order:
//!   [max_layer u32]
//!   per layer 0..=max_layer: [degree u32][neighbor id u32 x degree]
//! [crc32 of everything above, u32 BE]
//! ```
//!
//! Decoding validates exhaustively before a graph is accepted: checksum,
//! magic, version, id ranges, degree caps, duplicate neighbors, self-loops,
//! layer participation, edge symmetry, and exact payload length.

use crate::error::{HnswError, Result};
use crate::hnsw::graph::{layer_capacity, HnswGraph, NodeId};

/// Magic bytes identifying a smallworld graph snapshot.
const SNAPSHOT_MAGIC: &[u8; 4] = b"SWG1";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u16 = 1;

/// Encode the topology together with the `m` it was built with.
pub(crate) fn encode(graph: &HnswGraph, m: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&(m as u32).to_le_bytes());
    out.extend_from_slice(&(graph.node_count() as u64).to_le_bytes());

    for id in 0..graph.node_count() as NodeId {
        let level = graph.level(id);
        out.extend_from_slice(&(level as u32).to_le_bytes());
        for layer in 0..=level {
            let list = graph.neighbors(id, layer);
            out.extend_from_slice(&(list.len() as u32).to_le_bytes());
            for &n in list {
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
    }

    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Little-endian cursor over the snapshot payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(HnswError::CorruptGraph(format!(
                "truncated snapshot at byte {}",
                self.pos
            )));
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take::<8>()?))
    }
}

/// Decode and validate a snapshot, returning the stored `m` and the graph.
pub(crate) fn decode(bytes: &[u8]) -> Result<(usize, HnswGraph)> {
    if bytes.len() < 4 {
        return Err(HnswError::CorruptGraph("snapshot shorter than checksum".into()));
    }
    let payload = &bytes[..bytes.len() - 4];
    let stored_crc = u32::from_be_bytes(
        bytes[bytes.len() - 4..]
            .try_into()
            .expect("slice is exactly 4 bytes"),
    );
    let crc = crc32fast::hash(payload);
    if crc != stored_crc {
        tracing::warn!(expected = stored_crc, actual = crc, "snapshot checksum mismatch");
        return Err(HnswError::CorruptGraph(format!(
            "checksum mismatch: stored {stored_crc:#010x}, computed {crc:#010x}"
        )));
    }

    let mut r = Reader::new(payload);
    let magic = r.take::<4>()?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(HnswError::CorruptGraph("bad magic bytes".into()));
    }
    let version = r.u16()?;
    if version != SNAPSHOT_VERSION {
        return Err(HnswError::CorruptGraph(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let m = r.u32()? as usize;
    if m < 2 {
        return Err(HnswError::CorruptGraph(format!("stored m {m} is below 2")));
    }
    let node_count = r.u64()?;
    if node_count > u32::MAX as u64 {
        return Err(HnswError::CorruptGraph(format!(
            "node count {node_count} exceeds id space"
        )));
    }
    let node_count = node_count as usize;

    let mut levels = Vec::with_capacity(node_count);
    let mut neighbors = Vec::with_capacity(node_count);
    for id in 0..node_count {
        let level = r.u32()? as usize;
        // Each layer costs at least a degree field; a level the remaining
        // bytes cannot hold is corruption, not a huge allocation.
        if level >= r.remaining() / 4 + 1 {
            return Err(HnswError::CorruptGraph(format!(
                "node {id} level {level} exceeds remaining payload"
            )));
        }
        let mut lists = Vec::with_capacity(level + 1);
        for layer in 0..=level {
            let degree = r.u32()? as usize;
            if degree > layer_capacity(m, layer) {
                return Err(HnswError::CorruptGraph(format!(
                    "node {id} layer {layer} degree {degree} exceeds cap {}",
                    layer_capacity(m, layer)
                )));
            }
            let mut list = Vec::with_capacity(degree);
            for _ in 0..degree {
                let n = r.u32()?;
                if n as usize >= node_count {
                    return Err(HnswError::CorruptGraph(format!(
                        "node {id} layer {layer} references out-of-range id {n}"
                    )));
                }
                if n as usize == id {
                    return Err(HnswError::CorruptGraph(format!(
                        "node {id} has a self-loop at layer {layer}"
                    )));
                }
                if list.contains(&n) {
                    return Err(HnswError::CorruptGraph(format!(
                        "node {id} layer {layer} lists neighbor {n} twice"
                    )));
                }
                list.push(n);
            }
            lists.push(list);
        }
        levels.push(level);
        neighbors.push(lists);
    }

    if r.remaining() != 0 {
        return Err(HnswError::CorruptGraph(format!(
            "{} trailing bytes after node records",
            r.remaining()
        )));
    }

    let graph = HnswGraph::from_parts(levels, neighbors);
    // Cross-node checks (symmetry, layer participation) need the whole graph.
    graph.validate(m).map_err(HnswError::CorruptGraph)?;
    tracing::debug!(
        nodes = node_count,
        m,
        top_layer = graph.max_layer(),
        "snapshot validated"
    );
    Ok((m, graph))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> HnswGraph {
        let mut g = HnswGraph::new();
        g.push_node(1);
        g.push_node(0);
        g.push_node(1);
        g.set_entry_point(0, 1);
        g.link(0, 1, 0);
        g.link(1, 2, 0);
        g.link(0, 2, 1);
        g
    }

    #[test]
    fn test_round_trip() {
        let g = sample_graph();
        let bytes = encode(&g, 2);
        let (m, restored) = decode(&bytes).unwrap();
        assert_eq!(m, 2);
        assert_eq!(restored, g);
        // Re-encoding is byte-identical.
        assert_eq!(encode(&restored, m), bytes);
    }

    #[test]
    fn test_empty_graph_round_trip() {
        let g = HnswGraph::new();
        let bytes = encode(&g, 4);
        let (m, restored) = decode(&bytes).unwrap();
        assert_eq!(m, 4);
        assert!(restored.is_empty());
        assert_eq!(restored.entry_point(), None);
    }

    #[test]
    fn test_rejects_flipped_bit() {
        let g = sample_graph();
        let mut bytes = encode(&g, 2);
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x40;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, HnswError::CorruptGraph(_)));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let g = sample_graph();
        let mut bytes = encode(&g, 2);
        bytes[0] = b'X';
        // Fix the checksum so the magic check itself is what fires.
        let crc = crc32fast::hash(&bytes[..bytes.len() - 4]);
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&crc.to_be_bytes());
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err, HnswError::CorruptGraph("bad magic bytes".into()));
    }

    #[test]
    fn test_rejects_truncation() {
        let g = sample_graph();
        let bytes = encode(&g, 2);
        for cut in [0, 3, 10, bytes.len() - 5] {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, HnswError::CorruptGraph(_)), "cut at {cut}");
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let g = sample_graph();
        let mut bytes = encode(&g, 2);
        bytes.truncate(bytes.len() - 4);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("trailing"), "{err}");
    }

    #[test]
    fn test_rejects_asymmetric_edges() {
        // Hand-build a payload where 0 -> 1 exists but 1 -> 0 does not.
        let mut payload = Vec::new();
        payload.extend_from_slice(SNAPSHOT_MAGIC);
        payload.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&2u64.to_le_bytes());
        // Node 0: level 0, one neighbor (1).
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());
        // Node 1: level 0, no neighbors.
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        let crc = crc32fast::hash(&payload);
        payload.extend_from_slice(&crc.to_be_bytes());

        let err = decode(&payload).unwrap_err();
        assert!(err.to_string().contains("asymmetric"), "{err}");
    }

    #[test]
    fn test_rejects_degree_overflow() {
        // m = 2 caps layer 0 at 4; claim a degree of 5.
        let mut payload = Vec::new();
        payload.extend_from_slice(SNAPSHOT_MAGIC);
        payload.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&6u64.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&5u32.to_le_bytes());
        for n in 1..=5u32 {
            payload.extend_from_slice(&n.to_le_bytes());
        }
        let crc = crc32fast::hash(&payload);
        payload.extend_from_slice(&crc.to_be_bytes());

        let err = decode(&payload).unwrap_err();
        assert!(err.to_string().contains("exceeds cap"), "{err}");
    }
}
