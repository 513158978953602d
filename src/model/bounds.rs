use crate::model::vector3::Vector3;
use ord_subset::OrdSubsetIterExt;

/// Axis aligned box. Octree boxes are cubes, the dataset box in the
/// metadata need not be.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
	pub min: Vector3,
	pub max: Vector3,
}

impl Bounds {
	pub fn new(min: Vector3, max: Vector3) -> Bounds {
		Bounds { min, max }
	}

	pub fn from_arrays(min: [f64; 3], max: [f64; 3]) -> Bounds {
		Bounds::new(Vector3::from_array(min), Vector3::from_array(max))
	}

	pub fn size(&self) -> Vector3 {
		&self.max - &self.min
	}

	pub fn center(&self) -> Vector3 {
		(self.min + self.max) * 0.5
	}

	/// Radius of the bounding sphere.
	pub fn radius(&self) -> f64 {
		self.size().length() * 0.5
	}

	/// Octant `index` of this box. Bit 2 selects the upper half in x, bit 1
	/// in y and bit 0 in z.
	pub fn child(&self, index: usize) -> Bounds {
		let mid = self.center();
		let upper_x = index & 0b100 != 0;
		let upper_y = index & 0b010 != 0;
		let upper_z = index & 0b001 != 0;
		let min = Vector3 {
			x: if upper_x { mid.x } else { self.min.x },
			y: if upper_y { mid.y } else { self.min.y },
			z: if upper_z { mid.z } else { self.min.z },
		};
		let max = Vector3 {
			x: if upper_x { self.max.x } else { mid.x },
			y: if upper_y { self.max.y } else { mid.y },
			z: if upper_z { self.max.z } else { mid.z },
		};
		Bounds::new(min, max)
	}

	pub fn contains_point(&self, p: &Vector3) -> bool {
		p.x >= self.min.x
			&& p.x <= self.max.x
			&& p.y >= self.min.y
			&& p.y <= self.max.y
			&& p.z >= self.min.z
			&& p.z <= self.max.z
	}

	pub fn contains(&self, other: &Bounds) -> bool {
		self.contains_point(&other.min) && self.contains_point(&other.max)
	}

	/// Moves the box into the renderer frame: subtract `offset`, then swap
	/// y and z. Swapping keeps min below max on every axis.
	pub fn normalized(&self, offset: &Vector3) -> Bounds {
		Bounds::new(
			(&self.min - offset).swap_yz(),
			(&self.max - offset).swap_yz(),
		)
	}

	/// Slab test. Returns the entry distance along the ray, if it hits.
	pub fn intersect_ray(&self, origin: &Vector3, direction: &Vector3) -> Option<f64> {
		let mut t_min = f64::NEG_INFINITY;
		let mut t_max = f64::INFINITY;
		let slabs = [
			(origin.x, direction.x, self.min.x, self.max.x),
			(origin.y, direction.y, self.min.y, self.max.y),
			(origin.z, direction.z, self.min.z, self.max.z),
		];
		for (o, d, lo, hi) in slabs {
			if d.abs() < f64::EPSILON {
				if o < lo || o > hi {
					return None;
				}
				continue;
			}
			let t1 = (lo - o) / d;
			let t2 = (hi - o) / d;
			t_min = t_min.max(t1.min(t2));
			t_max = t_max.min(t1.max(t2));
		}
		if t_max < t_min.max(0.0) {
			None
		} else {
			Some(t_min.max(0.0))
		}
	}
}

pub fn find_bounds(points: &[Vector3]) -> Option<Bounds> {
	let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
	let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
	let zs: Vec<f64> = points.iter().map(|p| p.z).collect();

	Some(Bounds::new(
		Vector3::new(
			*xs.iter().ord_subset_min()?,
			*ys.iter().ord_subset_min()?,
			*zs.iter().ord_subset_min()?,
		),
		Vector3::new(
			*xs.iter().ord_subset_max()?,
			*ys.iter().ord_subset_max()?,
			*zs.iter().ord_subset_max()?,
		),
	))
}
