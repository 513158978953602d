use byteorder::{ByteOrder, LittleEndian};

// type + childMask + numPoints + offset + size
pub const BYTES_PER_NODE: usize = 1 + 1 + 4 + 8 + 8;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Normal = 0,
	Leaf = 1,
	Proxy = 2,
}

impl NodeKind {
	pub fn from_byte(value: u8) -> Option<NodeKind> {
		match value {
			0 => Some(NodeKind::Normal),
			1 => Some(NodeKind::Leaf),
			2 => Some(NodeKind::Proxy),
			_ => None,
		}
	}
}

/// One fixed size record of `hierarchy.bin`. For a proxy the byte range
/// points into the hierarchy buffer, otherwise into the point file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRecord {
	pub kind: u8,
	pub child_mask: u8,
	pub num_points: u32,
	pub byte_offset: u64,
	pub byte_size: u64,
}

impl NodeRecord {
	/// `bytes` must hold at least [`BYTES_PER_NODE`] bytes.
	pub fn read(bytes: &[u8]) -> NodeRecord {
		NodeRecord {
			kind: bytes[0],
			child_mask: bytes[1],
			num_points: LittleEndian::read_u32(&bytes[2..6]),
			byte_offset: LittleEndian::read_u64(&bytes[6..14]),
			byte_size: LittleEndian::read_u64(&bytes[14..22]),
		}
	}

	pub fn write(&self, bytes: &mut [u8]) {
		bytes[0] = self.kind;
		bytes[1] = self.child_mask;
		LittleEndian::write_u32(&mut bytes[2..6], self.num_points);
		LittleEndian::write_u64(&mut bytes[6..14], self.byte_offset);
		LittleEndian::write_u64(&mut bytes[14..22], self.byte_size);
	}

	pub fn has_child(&self, index: usize) -> bool {
		self.child_mask & (1 << index) != 0
	}
}
