use crate::model::bounds::Bounds;
use crate::model::node::OctreeNode;
use crate::model::vector3::Vector3;

/// Moves every node box into the renderer frame: re-centered on `offset`
/// and with y and z swapped. Returns the normalized dataset box, which is
/// the root's.
pub fn normalize_nodes(nodes: &mut [OctreeNode], offset: &Vector3) -> Bounds {
	for node in nodes.iter_mut() {
		node.bounds = node.bounds.normalized(offset);
	}
	nodes.first().map(|root| root.bounds).unwrap_or_default()
}

/// Decoded positions already carry the scale and sit relative to the
/// offset, so only the axis swap is applied.
pub fn normalize_position(position: Vector3) -> Vector3 {
	position.swap_yz()
}
