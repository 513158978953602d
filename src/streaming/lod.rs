use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::model::node::{NodeIndex, Octree};
use crate::model::octant_id::OctantId;
use crate::model::options::StreamingConfig;
use crate::model::vector3::Vector3;
use crate::streaming::camera::CameraState;

/// One accepted octant of a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Octant {
	pub id: OctantId,
	pub index: NodeIndex,
	pub level: u32,
	/// No children in the hierarchy.
	pub is_leaf: bool,
	pub num_points: u32,
	pub center: Vector3,
	pub radius: f64,
	/// Pixels, infinite with the camera inside the bounding sphere.
	pub projected_size: f64,
}

/// Octants to render, in the order they were accepted: largest projected
/// size first, so every parent precedes its children.
#[derive(Clone, Debug, Default)]
pub struct VisibleSet {
	pub octants: Vec<Octant>,
	pub total_points: u64,
}

impl VisibleSet {
	pub fn len(&self) -> usize {
		self.octants.len()
	}

	pub fn is_empty(&self) -> bool {
		self.octants.is_empty()
	}

	pub fn contains(&self, id: OctantId) -> bool {
		self.octants.iter().any(|octant| octant.id == id)
	}

	pub fn ids(&self) -> impl Iterator<Item = OctantId> + '_ {
		self.octants.iter().map(|octant| octant.id)
	}
}

struct Candidate {
	index: NodeIndex,
	projected_size: f64,
}

impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Candidate {
	// Larger projections pop first; equal ones in discovery order.
	fn cmp(&self, other: &Self) -> Ordering {
		self.projected_size
			.total_cmp(&other.projected_size)
			.then_with(|| other.index.cmp(&self.index))
	}
}

/// Picks the octants to render for `camera`.
///
/// Every candidate must intersect the frustum. The root needs nothing else,
/// however small it projects; children of an accepted octant also have to
/// project at least `min_projected_size` pixels. Candidates are accepted largest first
/// while their points fit the remaining `point_budget`; a candidate that
/// does not fit is dropped together with its subtree.
pub fn select_visible(octree: &Octree, camera: &CameraState, config: &StreamingConfig) -> VisibleSet {
	let mut visible = VisibleSet::default();
	if octree.is_empty() || !camera.intersects(&octree[0].bounds) {
		return visible;
	}

	let mut heap = BinaryHeap::new();
	heap.push(Candidate {
		index: 0,
		projected_size: projected_size(octree, 0, camera),
	});

	while let Some(candidate) = heap.pop() {
		let node = &octree[candidate.index];
		let total = visible.total_points + u64::from(node.num_points);
		if total > config.point_budget {
			continue;
		}
		visible.total_points = total;
		visible.octants.push(Octant {
			id: node.id,
			index: candidate.index,
			level: node.level(),
			is_leaf: node.is_leaf_node(),
			num_points: node.num_points,
			center: node.bounds.center(),
			radius: node.bounds.radius(),
			projected_size: candidate.projected_size,
		});

		if node.level() >= config.max_depth {
			continue;
		}
		for child in node.children() {
			if !camera.intersects(&octree[child].bounds) {
				continue;
			}
			let size = projected_size(octree, child, camera);
			if size >= config.min_projected_size {
				heap.push(Candidate {
					index: child,
					projected_size: size,
				});
			}
		}
	}

	visible
}

fn projected_size(octree: &Octree, index: NodeIndex, camera: &CameraState) -> f64 {
	let bounds = &octree[index].bounds;
	camera.projected_size(&bounds.center(), bounds.radius())
}

#[cfg(test)]
mod tests {
	use super::select_visible;
	use crate::fixtures;
	use crate::model::node::Octree;
	use crate::model::octant_id::OctantId;
	use crate::model::options::StreamingConfig;
	use crate::model::vector3::Vector3;
	use crate::reader::PointCloud;
	use crate::streaming::camera::CameraState;
	use rand::prelude::*;
	use std::collections::HashSet;
	use std::f64::consts::FRAC_PI_3;

	fn camera(position: Vector3, target: Vector3) -> CameraState {
		CameraState::perspective(
			position,
			target,
			Vector3::new(0.0, 1.0, 0.0),
			FRAC_PI_3,
			16.0 / 9.0,
			0.001,
			10_000.0,
			1080.0,
		)
	}

	fn cloud() -> PointCloud {
		let mut tree = fixtures::random_tree(7, 400);
		fixtures::in_memory_cloud(&mut tree, 2)
	}

	fn assert_ancestor_closed(octree: &Octree, ids: &HashSet<OctantId>) {
		for id in ids {
			if let Some(parent) = id.parent() {
				assert!(ids.contains(&parent), "{} is visible without its parent", id);
			}
			assert!(octree.find(*id).is_some());
		}
	}

	#[test]
	fn far_camera_sees_only_the_root() {
		let cloud = cloud();
		let center = cloud.bounds().center();
		let far = camera(center + Vector3::new(0.0, 0.0, 5_000.0), center);
		let visible = select_visible(cloud.octree(), &far, &StreamingConfig::default());

		assert_eq!(visible.len(), 1);
		assert!(visible.octants[0].id.is_root());
		assert_eq!(visible.total_points, u64::from(cloud.octree().root().num_points));
	}

	#[test]
	fn root_outside_the_frustum_is_culled() {
		let cloud = cloud();
		let center = cloud.bounds().center();
		let position = center + Vector3::new(0.0, 0.0, 100.0);
		let away = camera(position, position + Vector3::new(0.0, 0.0, 1.0));
		assert!(!away.intersects(&cloud.bounds()));

		let visible = select_visible(cloud.octree(), &away, &StreamingConfig::default());
		assert!(visible.is_empty());
		assert_eq!(visible.total_points, 0);
	}

	#[test]
	fn camera_at_a_deep_leaf_sees_its_whole_ancestry() {
		let cloud = cloud();
		let octree = cloud.octree();
		let deepest = (0..octree.len())
			.max_by_key(|index| octree[*index].level())
			.unwrap();
		assert!(octree[deepest].level() >= 5);

		let center = octree[deepest].bounds.center();
		let camera = camera(center, center + Vector3::new(1.0, 0.0, 0.0));
		let config = StreamingConfig {
			point_budget: u64::MAX,
			..StreamingConfig::default()
		};
		let visible = select_visible(octree, &camera, &config);

		for index in octree.ancestry(deepest) {
			assert!(visible.contains(octree[index].id), "missing {}", octree[index].id);
		}
		assert_eq!(visible.octants[0].index, 0);
		let leaf = visible.octants.iter().find(|octant| octant.index == deepest).unwrap();
		assert!(leaf.is_leaf);
		assert!(!visible.octants[0].is_leaf);
	}

	#[test]
	fn point_budget_is_never_exceeded() {
		let cloud = cloud();
		let octree = cloud.octree();
		let bounds = cloud.bounds();
		let mut rng = StdRng::seed_from_u64(3);

		for _ in 0..100 {
			let position = Vector3::new(
				rng.gen_range(-8.0..24.0),
				rng.gen_range(-8.0..24.0),
				rng.gen_range(-8.0..24.0),
			);
			let target = bounds.center() + Vector3::new(rng.gen_range(-4.0..4.0), 0.0, rng.gen_range(-4.0..4.0));
			let config = StreamingConfig {
				point_budget: rng.gen_range(300..20_000),
				min_projected_size: rng.gen_range(10.0..200.0),
				..StreamingConfig::default()
			};
			let visible = select_visible(octree, &camera(position, target), &config);

			let sum: u64 = visible.octants.iter().map(|octant| u64::from(octant.num_points)).sum();
			assert_eq!(sum, visible.total_points);
			assert!(visible.total_points <= config.point_budget);
			assert_ancestor_closed(octree, &visible.ids().collect());
		}
	}

	#[test]
	fn octants_outside_the_frustum_are_pruned() {
		let cloud = cloud();
		let octree = cloud.octree();
		let bounds = cloud.bounds();
		let position = Vector3::new(bounds.min.x + 0.5, bounds.center().y, bounds.center().z);
		let camera = camera(position, position + Vector3::new(1.0, 0.0, 0.0));
		let config = StreamingConfig {
			point_budget: u64::MAX,
			min_projected_size: 1.0,
			..StreamingConfig::default()
		};
		let visible = select_visible(octree, &camera, &config);

		assert!(visible.len() > 1);
		for octant in visible.octants.iter().filter(|octant| !octant.id.is_root()) {
			assert!(camera.intersects(&octree[octant.index].bounds));
		}
		let behind = octree
			.iter()
			.filter(|node| node.bounds.max.x < position.x - 0.01)
			.count();
		assert!(behind > 0);
		assert!(octree
			.iter()
			.filter(|node| node.bounds.max.x < position.x - 0.01)
			.all(|node| !visible.contains(node.id)));
	}

	#[test]
	fn max_depth_limits_refinement() {
		let cloud = cloud();
		let center = cloud.bounds().center();
		let camera = camera(center - Vector3::new(0.0, 0.0, 40.0), center);
		let config = StreamingConfig {
			point_budget: u64::MAX,
			min_projected_size: 0.0,
			max_depth: 2,
			..StreamingConfig::default()
		};
		let visible = select_visible(cloud.octree(), &camera, &config);
		assert!(visible.octants.iter().all(|octant| octant.level <= 2));
		assert!(visible.octants.iter().any(|octant| octant.level == 2));
	}
}
