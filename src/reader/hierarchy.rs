use std::collections::{HashSet, VecDeque};

use crate::error::{ConfigError, Result};
use crate::model::bounds::Bounds;
use crate::model::hierarchy::{NodeKind, NodeRecord, BYTES_PER_NODE};
use crate::model::node::{NodeIndex, OctreeNode};
use crate::model::octant_id::OctantId;

pub const HIERARCHY_FILE: &str = "hierarchy.bin";

/// A byte range of the hierarchy buffer whose first record describes
/// `root`, followed by its descendants in breadth first order.
struct PendingChunk {
	root: NodeIndex,
	offset: u64,
	size: u64,
}

/// Parses the first chunk and every chunk reachable through proxy records.
/// Bounds are left in dataset coordinates.
pub fn parse_hierarchy(
	buffer: &[u8],
	first_chunk_size: u64,
	root_bounds: Bounds,
	root_spacing: f64,
) -> Result<Vec<OctreeNode>> {
	let mut nodes = vec![OctreeNode::new(OctantId::root(), root_bounds, root_spacing, None)];
	let mut pending = VecDeque::from([PendingChunk {
		root: 0,
		offset: 0,
		size: first_chunk_size,
	}]);
	let mut visited = HashSet::new();

	while let Some(chunk) = pending.pop_front() {
		if !visited.insert(chunk.offset) {
			return Err(corrupt(format!(
				"hierarchy chunk at byte {} is referenced twice",
				chunk.offset
			)));
		}
		let bytes = chunk_bytes(buffer, &chunk)?;
		parse_chunk(bytes, &chunk, &mut nodes, &mut pending)?;
	}

	Ok(nodes)
}

fn chunk_bytes<'a>(buffer: &'a [u8], chunk: &PendingChunk) -> Result<&'a [u8]> {
	let end = chunk.offset.checked_add(chunk.size);
	match end {
		Some(end) if end <= buffer.len() as u64 => {}
		_ => {
			return Err(corrupt(format!(
				"hierarchy chunk {}+{} exceeds the buffer of {} bytes",
				chunk.offset,
				chunk.size,
				buffer.len()
			)))
		}
	}
	if chunk.size == 0 || chunk.size % BYTES_PER_NODE as u64 != 0 {
		return Err(corrupt(format!(
			"hierarchy chunk at byte {} has size {}, not a positive multiple of {}",
			chunk.offset, chunk.size, BYTES_PER_NODE
		)));
	}
	Ok(&buffer[chunk.offset as usize..(chunk.offset + chunk.size) as usize])
}

fn parse_chunk(
	bytes: &[u8],
	chunk: &PendingChunk,
	nodes: &mut Vec<OctreeNode>,
	pending: &mut VecDeque<PendingChunk>,
) -> Result<()> {
	let num_records = bytes.len() / BYTES_PER_NODE;
	let mut chunk_nodes = vec![chunk.root];

	for (i, record_bytes) in bytes.chunks_exact(BYTES_PER_NODE).enumerate() {
		let index = *chunk_nodes.get(i).ok_or_else(|| {
			corrupt(format!(
				"hierarchy chunk at byte {} holds {} records but describes only {} nodes",
				chunk.offset,
				num_records,
				chunk_nodes.len()
			))
		})?;
		let record = NodeRecord::read(record_bytes);
		let kind = NodeKind::from_byte(record.kind).ok_or_else(|| {
			corrupt(format!("node {} has unknown type {}", nodes[index].id, record.kind))
		})?;

		let node = &mut nodes[index];
		node.num_points = record.num_points;

		if kind == NodeKind::Proxy {
			node.kind = NodeKind::Proxy;
			node.hierarchy_range = Some((record.byte_offset, record.byte_size));
			pending.push_back(PendingChunk {
				root: index,
				offset: record.byte_offset,
				size: record.byte_size,
			});
			continue;
		}

		if kind == NodeKind::Leaf && record.child_mask != 0 {
			return Err(corrupt(format!("leaf {} declares children", node.id)));
		}
		node.kind = kind;
		node.byte_offset = record.byte_offset;
		node.byte_size = record.byte_size;

		for child_index in 0..8 {
			if !record.has_child(child_index) {
				continue;
			}
			let parent = &nodes[index];
			let id = parent.id.child(child_index as u8).ok_or_else(|| {
				corrupt(format!(
					"node {} has children below the maximum depth {}",
					parent.id,
					OctantId::MAX_LEVEL
				))
			})?;
			let child = OctreeNode::new(
				id,
				parent.bounds.child(child_index),
				parent.spacing / 2.0,
				Some(index),
			);
			let child_node_index = nodes.len();
			nodes.push(child);
			nodes[index].children[child_index] = Some(child_node_index);
			chunk_nodes.push(child_node_index);
		}
	}

	if chunk_nodes.len() > num_records {
		return Err(corrupt(format!(
			"hierarchy chunk at byte {} describes {} nodes but holds only {} records",
			chunk.offset,
			chunk_nodes.len(),
			num_records
		)));
	}

	Ok(())
}

fn corrupt(reason: String) -> ConfigError {
	ConfigError::DataCorruption(reason)
}
