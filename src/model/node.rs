use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::bounds::Bounds;
use crate::model::hierarchy::NodeKind;
use crate::model::octant_id::OctantId;

/// Index into [`Octree::nodes`].
pub type NodeIndex = usize;

#[derive(Debug)]
pub struct OctreeNode {
	pub id: OctantId,
	pub bounds: Bounds,
	pub spacing: f64,
	pub kind: NodeKind,
	pub num_points: u32,
	/// Range of this node's records in the point file.
	pub byte_offset: u64,
	pub byte_size: u64,
	/// Set when the node's children came from a separate hierarchy chunk.
	pub hierarchy_range: Option<(u64, u64)>,
	pub children: [Option<NodeIndex>; 8],
	pub parent: Option<NodeIndex>,
	loaded: AtomicBool,
}

impl OctreeNode {
	pub fn new(id: OctantId, bounds: Bounds, spacing: f64, parent: Option<NodeIndex>) -> OctreeNode {
		OctreeNode {
			id,
			bounds,
			spacing,
			kind: NodeKind::Normal,
			num_points: 0,
			byte_offset: 0,
			byte_size: 0,
			hierarchy_range: None,
			children: [None; 8],
			parent,
			loaded: AtomicBool::new(false),
		}
	}

	pub fn level(&self) -> u32 {
		self.id.level()
	}

	pub fn is_leaf_node(&self) -> bool {
		self.children.iter().all(|child| child.is_none())
	}

	pub fn children(&self) -> impl Iterator<Item = NodeIndex> + '_ {
		self.children.iter().filter_map(|child| *child)
	}

	/// True once the node's points were decoded completely at least once.
	pub fn is_loaded(&self) -> bool {
		self.loaded.load(Ordering::Acquire)
	}

	/// Returns false if the node was already marked.
	pub(crate) fn mark_loaded(&self) -> bool {
		!self.loaded.swap(true, Ordering::AcqRel)
	}
}

/// The skeleton of a dataset. Nodes are stored flat in discovery order,
/// the root first; links are indices into the same list.
#[derive(Debug)]
pub struct Octree {
	nodes: Vec<OctreeNode>,
	by_id: HashMap<OctantId, NodeIndex>,
}

impl Octree {
	pub fn new(nodes: Vec<OctreeNode>) -> Octree {
		let by_id = nodes
			.iter()
			.enumerate()
			.map(|(index, node)| (node.id, index))
			.collect();
		Octree { nodes, by_id }
	}

	pub fn root(&self) -> &OctreeNode {
		&self.nodes[0]
	}

	pub fn get(&self, index: NodeIndex) -> Option<&OctreeNode> {
		self.nodes.get(index)
	}

	pub fn find(&self, id: OctantId) -> Option<NodeIndex> {
		self.by_id.get(&id).copied()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &OctreeNode> {
		self.nodes.iter()
	}

	pub fn depth(&self) -> u32 {
		self.nodes.iter().map(|node| node.level()).max().unwrap_or(0)
	}

	pub fn total_points(&self) -> u64 {
		self.nodes.iter().map(|node| u64::from(node.num_points)).sum()
	}

	/// Indices from `index` up to the root, `index` first.
	pub fn ancestry(&self, index: NodeIndex) -> Vec<NodeIndex> {
		let mut chain = vec![index];
		let mut current = index;
		while let Some(parent) = self.nodes[current].parent {
			chain.push(parent);
			current = parent;
		}
		chain
	}
}

impl std::ops::Index<NodeIndex> for Octree {
	type Output = OctreeNode;

	fn index(&self, index: NodeIndex) -> &OctreeNode {
		&self.nodes[index]
	}
}
