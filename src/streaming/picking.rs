use ord_subset::OrdSubsetIterExt;

use crate::model::bounds::Bounds;
use crate::model::octant_id::OctantId;
use crate::model::vector3::Vector3;
use crate::reader::points::DecodedPointBuffer;

#[derive(Clone, Debug, PartialEq)]
pub struct PickResult {
	pub id: OctantId,
	/// Index of the point within its octant's buffer.
	pub index: usize,
	pub position: Vector3,
	/// Along the ray, from its origin.
	pub distance: f64,
}

/// Closest point to `origin` among the points no further than
/// `max_distance_to_ray` from the ray. Octants whose box, grown by that
/// distance, the ray misses are not searched.
pub fn pick<'a, I>(octants: I, origin: &Vector3, direction: &Vector3, max_distance_to_ray: f64) -> Option<PickResult>
where
	I: IntoIterator<Item = (OctantId, &'a Bounds, &'a DecodedPointBuffer)>,
{
	let direction = direction.normalize();
	let margin = Vector3::new(max_distance_to_ray, max_distance_to_ray, max_distance_to_ray);

	octants
		.into_iter()
		.filter(|(_, bounds, _)| {
			Bounds::new(&bounds.min - &margin, bounds.max + margin)
				.intersect_ray(origin, &direction)
				.is_some()
		})
		.flat_map(|(id, _, points)| {
			points.positions.iter().enumerate().filter_map(move |(index, position)| {
				let along = (position - origin).dot(&direction);
				if along < 0.0 {
					return None;
				}
				let foot = *origin + direction * along;
				if position.distance(&foot) > max_distance_to_ray {
					return None;
				}
				Some(PickResult {
					id,
					index,
					position: *position,
					distance: along,
				})
			})
		})
		.ord_subset_min_by_key(|hit| hit.distance)
}
