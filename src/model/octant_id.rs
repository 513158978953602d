use std::fmt;

/// Path of a node from the root: a sentinel bit followed by three bits per
/// level, most significant level first. The root is `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OctantId(u64);

impl OctantId {
	pub const MAX_LEVEL: u32 = 21;

	pub const fn root() -> OctantId {
		OctantId(1)
	}

	/// `None` past [`OctantId::MAX_LEVEL`] or for an index above 7.
	pub fn child(&self, index: u8) -> Option<OctantId> {
		if index > 7 || self.level() >= Self::MAX_LEVEL {
			return None;
		}
		Some(OctantId((self.0 << 3) | u64::from(index)))
	}

	pub fn parent(&self) -> Option<OctantId> {
		if self.is_root() {
			None
		} else {
			Some(OctantId(self.0 >> 3))
		}
	}

	pub fn is_root(&self) -> bool {
		self.0 == 1
	}

	pub fn level(&self) -> u32 {
		(63 - self.0.leading_zeros()) / 3
	}

	/// Position of this node among its siblings.
	pub fn child_index(&self) -> Option<u8> {
		if self.is_root() {
			None
		} else {
			Some((self.0 & 0b111) as u8)
		}
	}

	/// Potree node name, `r` followed by one digit per level.
	pub fn name(&self) -> String {
		let level = self.level();
		let mut name = String::with_capacity(level as usize + 1);
		name.push('r');
		for depth in (0..level).rev() {
			let index = (self.0 >> (3 * depth)) & 0b111;
			name.push(char::from(b'0' + index as u8));
		}
		name
	}

	pub fn from_name(name: &str) -> Option<OctantId> {
		let digits = name.strip_prefix('r')?;
		let mut id = OctantId::root();
		for c in digits.chars() {
			let index = c.to_digit(8)?;
			id = id.child(index as u8)?;
		}
		Some(id)
	}
}

impl fmt::Display for OctantId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name())
	}
}
