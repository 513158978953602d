//! Synthetic Potree datasets for tests: the hierarchy chunking mirrors the
//! writer side of the format, point records are random points inside each
//! node's box.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use rand::prelude::*;
use rand::rngs::StdRng;
use tempfile::TempDir;

use crate::model::bounds::{find_bounds, Bounds};
use crate::model::hierarchy::{NodeKind, NodeRecord, BYTES_PER_NODE};
use crate::model::metadata::{Attribute, BoundingBox, Hierarchy, Metadata};
use crate::model::octant_id::OctantId;
use crate::model::options::OpenOptions;
use crate::model::vector3::Vector3;
use crate::reader::PointCloud;

pub const OFFSET: [f64; 3] = [100.0, 200.0, 10.0];
pub const EDGE: f64 = 16.0;
pub const SCALE: f64 = 0.001;

#[derive(Clone, Debug)]
pub struct HierarchyNode {
	pub id: OctantId,
	pub num_points: u32,
	pub byte_offset: u64,
	pub byte_size: u64,
}

impl HierarchyNode {
	fn new(id: OctantId, num_points: u32) -> HierarchyNode {
		HierarchyNode {
			id,
			num_points,
			byte_offset: 0,
			byte_size: 0,
		}
	}
}

pub struct EncodedHierarchy {
	pub buffer: Vec<u8>,
	pub first_chunk_size: u64,
	pub depth: u8,
}

pub struct SyntheticDataset {
	pub dir: TempDir,
	pub tree: Vec<HierarchyNode>,
	pub metadata: Metadata,
}

pub fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

pub fn metadata(attributes: Vec<Attribute>) -> Metadata {
	let min = OFFSET;
	let max = [OFFSET[0] + EDGE, OFFSET[1] + EDGE, OFFSET[2] + EDGE];
	Metadata {
		version: "2.0".to_string(),
		name: "synthetic".to_string(),
		description: "".to_string(),
		points: 0,
		projection: "".to_string(),
		hierarchy: Hierarchy {
			first_chunk_size: 0,
			step_size: 0,
			depth: 0,
		},
		offset: OFFSET,
		scale: [SCALE; 3],
		spacing: 1.0,
		bounding_box: BoundingBox { min, max },
		encoding: "DEFAULT".to_string(),
		attributes,
	}
}

pub fn position_rgb_metadata() -> Metadata {
	metadata(vec![
		Attribute::new("position", 12, 3, "int32"),
		Attribute::new("rgb", 6, 3, "uint16"),
		Attribute::new("classification", 1, 1, "uint8"),
	])
}

/// Random tree, grown depth first so that a chain reaches `max_depth`
/// before `max_nodes` runs out. Deterministic for given arguments.
pub fn random_tree(max_depth: u32, max_nodes: usize) -> Vec<HierarchyNode> {
	let mut rng = StdRng::seed_from_u64(u64::from(max_depth) * 1_000 + max_nodes as u64);
	let mut tree = vec![HierarchyNode::new(OctantId::root(), rng.gen_range(1..300))];
	let mut stack = vec![OctantId::root()];

	while let Some(id) = stack.pop() {
		if id.level() >= max_depth {
			continue;
		}
		let mut children = Vec::new();
		for index in 0..8u8 {
			if tree.len() + children.len() >= max_nodes {
				break;
			}
			if index == 0 || rng.gen_bool(0.3) {
				if let Some(child) = id.child(index) {
					children.push(child);
				}
			}
		}
		for child in children.iter() {
			tree.push(HierarchyNode::new(*child, rng.gen_range(1..300)));
		}
		stack.extend(children.into_iter().rev());
	}

	tree
}

/// Every node down to `depth`, all eight children each.
pub fn full_tree(depth: u32, points_per_node: u32) -> Vec<HierarchyNode> {
	let mut tree = vec![HierarchyNode::new(OctantId::root(), points_per_node)];
	let mut level = vec![OctantId::root()];
	for _ in 0..depth {
		let mut next = Vec::new();
		for id in level {
			for index in 0..8u8 {
				if let Some(child) = id.child(index) {
					tree.push(HierarchyNode::new(child, points_per_node));
					next.push(child);
				}
			}
		}
		level = next;
	}
	tree
}

struct HierarchyChunk<'a> {
	root: OctantId,
	nodes: Vec<&'a HierarchyNode>,
}

fn sort_breadth_first(nodes: &mut [&HierarchyNode]) {
	nodes.sort_by(|a, b| {
		let (a, b) = (a.id.name(), b.id.name());
		if a.len() != b.len() {
			a.len().cmp(&b.len())
		} else {
			a.cmp(&b)
		}
	});
}

fn child_mask_of(node: &HierarchyNode, by_id: &HashMap<OctantId, &HierarchyNode>) -> u8 {
	let mut mask: u8 = 0;
	for i in 0..8u8 {
		if let Some(child) = node.id.child(i) {
			if by_id.contains_key(&child) {
				mask |= 1 << i;
			}
		}
	}
	mask
}

fn children_of<'a>(
	node: &HierarchyNode,
	by_id: &HashMap<OctantId, &'a HierarchyNode>,
) -> Vec<&'a HierarchyNode> {
	(0..8u8)
		.filter_map(|i| node.id.child(i))
		.filter_map(|id| by_id.get(&id).copied())
		.collect()
}

// The start node and all descendants up to and including `levels` deeper.
fn gather_chunk<'a>(
	start: &'a HierarchyNode,
	levels: u32,
	by_id: &HashMap<OctantId, &'a HierarchyNode>,
) -> HierarchyChunk<'a> {
	let start_level = start.id.level();
	let mut chunk = HierarchyChunk {
		root: start.id,
		nodes: Vec::new(),
	};
	let mut stack = vec![start];
	while let Some(node) = stack.pop() {
		chunk.nodes.push(node);
		if node.id.level() < start_level + levels {
			stack.extend(children_of(node, by_id));
		}
	}
	chunk
}

fn create_hierarchy_chunks<'a>(
	root: &'a HierarchyNode,
	step_size: u32,
	by_id: &HashMap<OctantId, &'a HierarchyNode>,
) -> Vec<HierarchyChunk<'a>> {
	let mut chunks = Vec::new();
	let mut stack = vec![root];
	while let Some(chunk_root) = stack.pop() {
		let chunk = gather_chunk(chunk_root, step_size, by_id);
		for node in &chunk.nodes {
			if node.id.level() == chunk_root.id.level() + step_size {
				stack.push(*node);
			}
		}
		chunks.push(chunk);
	}
	chunks
}

/// Encodes `tree` into chunks of `step_size` levels linked by proxy records.
pub fn encode_hierarchy(tree: &[HierarchyNode], step_size: u32) -> EncodedHierarchy {
	let by_id: HashMap<OctantId, &HierarchyNode> = tree.iter().map(|node| (node.id, node)).collect();
	let root = by_id[&OctantId::root()];
	let mut chunks = create_hierarchy_chunks(root, step_size, &by_id);

	let chunk_size = |chunk: &HierarchyChunk| (chunk.nodes.len() * BYTES_PER_NODE) as u64;
	let mut chunk_pointers = HashMap::new();
	let mut chunk_byte_offsets = vec![0u64; chunks.len()];
	for i in 0..chunks.len() {
		chunk_pointers.insert(chunks[i].root, i);
		sort_breadth_first(&mut chunks[i].nodes);
		if i >= 1 {
			chunk_byte_offsets[i] = chunk_byte_offsets[i - 1] + chunk_size(&chunks[i - 1]);
		}
	}

	let total: u64 = chunks.iter().map(chunk_size).sum();
	let mut buffer = vec![0u8; total as usize];
	let mut offset = 0;
	let mut depth = 0;
	for chunk in &chunks {
		let chunk_level = chunk.root.level();
		for node in &chunk.nodes {
			let is_proxy = node.id.level() == chunk_level + step_size;
			let child_mask = child_mask_of(node, &by_id);
			let record = if is_proxy {
				let target = chunk_pointers[&node.id];
				NodeRecord {
					kind: NodeKind::Proxy as u8,
					child_mask,
					num_points: node.num_points,
					byte_offset: chunk_byte_offsets[target],
					byte_size: chunk_size(&chunks[target]),
				}
			} else {
				NodeRecord {
					kind: if child_mask == 0 {
						NodeKind::Leaf as u8
					} else {
						NodeKind::Normal as u8
					},
					child_mask,
					num_points: node.num_points,
					byte_offset: node.byte_offset,
					byte_size: node.byte_size,
				}
			};
			record.write(&mut buffer[offset..offset + BYTES_PER_NODE]);
			offset += BYTES_PER_NODE;
			depth = depth.max(node.id.level());
		}
	}

	EncodedHierarchy {
		buffer,
		first_chunk_size: chunk_size(&chunks[0]),
		depth: depth as u8,
	}
}

/// Raw dataset frame box of `id`.
pub fn raw_bounds(id: OctantId) -> Bounds {
	let root = Bounds::new(
		Vector3::from_array(OFFSET),
		Vector3::from_array(OFFSET) + Vector3::new(EDGE, EDGE, EDGE),
	);
	let mut path = Vec::new();
	let mut current = id;
	while let Some(index) = current.child_index() {
		path.push(index as usize);
		current = current.parent().unwrap_or(OctantId::root());
	}
	path.iter().rev().fold(root, |bounds, index| bounds.child(*index))
}

/// Metadata, hierarchy and point records for `tree`. Assigns byte ranges.
pub fn build(tree: &mut [HierarchyNode], step_size: u32) -> (Metadata, EncodedHierarchy, Vec<u8>) {
	let mut metadata = position_rgb_metadata();
	let record_size = u64::from(metadata.point_record_size());
	let mut rng = StdRng::seed_from_u64(tree.len() as u64);
	let mut points = Vec::new();
	let mut all_positions = Vec::new();

	for node in tree.iter_mut() {
		node.byte_offset = points.len() as u64;
		node.byte_size = u64::from(node.num_points) * record_size;
		let bounds = raw_bounds(node.id);
		for _ in 0..node.num_points {
			let p = Vector3::new(
				rng.gen_range(bounds.min.x..bounds.max.x),
				rng.gen_range(bounds.min.y..bounds.max.y),
				rng.gen_range(bounds.min.z..bounds.max.z),
			);
			all_positions.push(p);
			let offset = Vector3::from_array(OFFSET);
			let local = &p - &offset;
			points.write_i32::<LittleEndian>((local.x / SCALE).round() as i32).unwrap();
			points.write_i32::<LittleEndian>((local.y / SCALE).round() as i32).unwrap();
			points.write_i32::<LittleEndian>((local.z / SCALE).round() as i32).unwrap();
			for _ in 0..3 {
				points.write_u16::<LittleEndian>(rng.gen()).unwrap();
			}
			points.push(rng.gen_range(0..20));
		}
	}

	let hierarchy = encode_hierarchy(tree, step_size);
	metadata.points = tree.iter().map(|node| u64::from(node.num_points)).sum();
	metadata.hierarchy = Hierarchy {
		first_chunk_size: hierarchy.first_chunk_size,
		step_size: step_size as u8,
		depth: hierarchy.depth,
	};
	if let Some(bounds) = find_bounds(&all_positions) {
		metadata.attributes[0].min = bounds.min.to_array().to_vec();
		metadata.attributes[0].max = bounds.max.to_array().to_vec();
	}
	(metadata, hierarchy, points)
}

/// A dataset held in memory, streamed from a byte vector.
pub fn in_memory_cloud(tree: &mut [HierarchyNode], step_size: u32) -> PointCloud {
	let (metadata, hierarchy, points) = build(tree, step_size);
	PointCloud::from_parts(metadata, &hierarchy.buffer, Arc::new(points), &OpenOptions::default())
		.expect("synthetic dataset opens")
}

/// A random dataset written to a temporary folder.
pub fn write_dataset(max_depth: u32, max_nodes: usize, step_size: u32) -> io::Result<SyntheticDataset> {
	let dir = tempfile::tempdir()?;
	let mut tree = random_tree(max_depth, max_nodes);
	let (metadata, hierarchy, points) = build(&mut tree, step_size);

	fs::write(dir.path().join("octree.bin"), &points)?;
	fs::write(dir.path().join("hierarchy.bin"), &hierarchy.buffer)?;
	let file = File::create(dir.path().join("metadata.json"))?;
	serde_json::to_writer_pretty(file, &metadata)?;

	Ok(SyntheticDataset { dir, tree, metadata })
}
