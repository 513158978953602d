use std::ops;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
	pub x: f64,
	pub y: f64,
	pub z: f64,
}

impl Vector3 {
	pub const fn new(x: f64, y: f64, z: f64) -> Vector3 {
		Vector3 { x, y, z }
	}

	pub fn empty() -> Vector3 {
		Vector3 {
			x: 0.0,
			y: 0.0,
			z: 0.0,
		}
	}

	pub fn from_array(values: [f64; 3]) -> Vector3 {
		Vector3 {
			x: values[0],
			y: values[1],
			z: values[2],
		}
	}

	pub fn to_array(&self) -> [f64; 3] {
		[self.x, self.y, self.z]
	}

	pub fn to_f32_array(&self) -> [f32; 3] {
		[self.x as f32, self.y as f32, self.z as f32]
	}

	/// Dataset frames are Z-up, the renderer frame is Y-up.
	pub fn swap_yz(&self) -> Vector3 {
		Vector3 {
			x: self.x,
			y: self.z,
			z: self.y,
		}
	}

	pub fn dot(&self, rhs: &Vector3) -> f64 {
		self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
	}

	pub fn cross(&self, rhs: &Vector3) -> Vector3 {
		Vector3 {
			x: self.y * rhs.z - self.z * rhs.y,
			y: self.z * rhs.x - self.x * rhs.z,
			z: self.x * rhs.y - self.y * rhs.x,
		}
	}

	pub fn length(&self) -> f64 {
		self.dot(self).sqrt()
	}

	pub fn distance(&self, other: &Vector3) -> f64 {
		(self - other).length()
	}

	/// Returns the zero vector for degenerate input.
	pub fn normalize(&self) -> Vector3 {
		let length = self.length();
		if length > 0.0 {
			*self * (1.0 / length)
		} else {
			Vector3::empty()
		}
	}
}

impl ops::Mul<Vector3> for Vector3 {
	type Output = Vector3;

	fn mul(self, _rhs: Vector3) -> Vector3 {
		Vector3 {
			x: self.x * _rhs.x,
			y: self.y * _rhs.y,
			z: self.z * _rhs.z,
		}
	}
}

impl ops::Mul<f64> for Vector3 {
	type Output = Vector3;

	fn mul(self, scalar: f64) -> Vector3 {
		Vector3 {
			x: self.x * scalar,
			y: self.y * scalar,
			z: self.z * scalar,
		}
	}
}

impl ops::Sub<&Vector3> for &Vector3 {
	type Output = Vector3;

	fn sub(self, _rhs: &Vector3) -> Vector3 {
		Vector3 {
			x: self.x - _rhs.x,
			y: self.y - _rhs.y,
			z: self.z - _rhs.z,
		}
	}
}

impl ops::Sub<Vector3> for Vector3 {
	type Output = Vector3;

	fn sub(self, _rhs: Vector3) -> Vector3 {
		Vector3 {
			x: self.x - _rhs.x,
			y: self.y - _rhs.y,
			z: self.z - _rhs.z,
		}
	}
}

impl ops::Add<Vector3> for Vector3 {
	type Output = Vector3;

	fn add(self, _rhs: Vector3) -> Vector3 {
		Vector3 {
			x: self.x + _rhs.x,
			y: self.y + _rhs.y,
			z: self.z + _rhs.z,
		}
	}
}

impl ops::Neg for Vector3 {
	type Output = Vector3;

	fn neg(self) -> Vector3 {
		Vector3 {
			x: -self.x,
			y: -self.y,
			z: -self.z,
		}
	}
}
