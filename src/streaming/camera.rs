use crate::model::bounds::Bounds;
use crate::model::vector3::Vector3;

/// `normal · p + d >= 0` on the inner side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
	pub normal: Vector3,
	pub d: f64,
}

impl Plane {
	pub fn new(normal: Vector3, point: &Vector3) -> Plane {
		let normal = normal.normalize();
		Plane {
			d: -normal.dot(point),
			normal,
		}
	}

	pub fn distance(&self, point: &Vector3) -> f64 {
		self.normal.dot(point) + self.d
	}

	/// The box corner furthest along the normal is behind the plane.
	pub fn excludes(&self, bounds: &Bounds) -> bool {
		let corner = Vector3 {
			x: if self.normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
			y: if self.normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
			z: if self.normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
		};
		self.distance(&corner) < 0.0
	}
}

/// What the loader needs to know about the camera for one tick, in the
/// normalized dataset frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
	pub position: Vector3,
	/// Near, far, left, right, bottom, top; all facing inward.
	pub planes: [Plane; 6],
	/// Vertical field of view in radians.
	pub fov_y: f64,
	pub viewport_height: f64,
}

impl CameraState {
	#[allow(clippy::too_many_arguments)]
	pub fn perspective(
		position: Vector3,
		target: Vector3,
		up: Vector3,
		fov_y: f64,
		aspect: f64,
		near: f64,
		far: f64,
		viewport_height: f64,
	) -> CameraState {
		let forward = (target - position).normalize();
		let right = forward.cross(&up).normalize();
		let up = right.cross(&forward);

		let half_v = fov_y * 0.5;
		let half_h = (half_v.tan() * aspect).atan();
		let side = |axis: Vector3, half: f64| axis * half.cos() + forward * half.sin();

		let planes = [
			Plane::new(forward, &(position + forward * near)),
			Plane::new(-forward, &(position + forward * far)),
			Plane::new(side(right, half_h), &position),
			Plane::new(side(-right, half_h), &position),
			Plane::new(side(up, half_v), &position),
			Plane::new(side(-up, half_v), &position),
		];

		CameraState {
			position,
			planes,
			fov_y,
			viewport_height,
		}
	}

	pub fn intersects(&self, bounds: &Bounds) -> bool {
		!self.planes.iter().any(|plane| plane.excludes(bounds))
	}

	/// Estimated pixel size of a sphere. Infinite with the camera inside it.
	pub fn projected_size(&self, center: &Vector3, radius: f64) -> f64 {
		let distance = self.position.distance(center);
		if distance <= radius {
			return f64::INFINITY;
		}
		(self.viewport_height / 2.0) * radius / ((self.fov_y / 2.0).tan() * distance)
	}
}
