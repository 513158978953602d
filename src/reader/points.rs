use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use crate::error::{ConfigError, DecodeError};
use crate::model::attributes::AttributeLayout;
use crate::model::node::OctreeNode;
use crate::model::options::ColorDepth;
use crate::model::vector3::Vector3;
use crate::reader::normalize::normalize_position;

pub const OCTREE_FILE: &str = "octree.bin";

/// Random access to the point record file. Every read names its absolute
/// range, so concurrent decodes never share a cursor.
pub trait PointSource: Send + Sync {
	fn len(&self) -> u64;

	fn read_at(&self, offset: u64, size: usize) -> io::Result<Cow<'_, [u8]>>;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// `octree.bin` mapped read only.
pub struct MappedPoints {
	map: Mmap,
}

impl MappedPoints {
	pub fn open(path: &Path) -> Result<MappedPoints, ConfigError> {
		let io_error = |source: io::Error| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		};
		let file = File::open(path).map_err(io_error)?;
		// SAFETY: the dataset is opened read only and not expected to be
		// truncated while it is streamed.
		let map = unsafe { Mmap::map(&file) }.map_err(io_error)?;
		Ok(MappedPoints { map })
	}
}

impl PointSource for MappedPoints {
	fn len(&self) -> u64 {
		self.map.len() as u64
	}

	fn read_at(&self, offset: u64, size: usize) -> io::Result<Cow<'_, [u8]>> {
		slice_at(&self.map, offset, size).map(Cow::Borrowed)
	}
}

impl PointSource for Vec<u8> {
	fn len(&self) -> u64 {
		self.as_slice().len() as u64
	}

	fn read_at(&self, offset: u64, size: usize) -> io::Result<Cow<'_, [u8]>> {
		slice_at(self, offset, size).map(Cow::Borrowed)
	}
}

fn slice_at(bytes: &[u8], offset: u64, size: usize) -> io::Result<&[u8]> {
	let start = usize::try_from(offset).map_err(|_| out_of_range(offset, size))?;
	let end = start.checked_add(size).ok_or_else(|| out_of_range(offset, size))?;
	bytes.get(start..end).ok_or_else(|| out_of_range(offset, size))
}

fn out_of_range(offset: u64, size: usize) -> io::Error {
	io::Error::new(
		io::ErrorKind::UnexpectedEof,
		format!("range {}+{} is outside the point file", offset, size),
	)
}

/// Points of one node in the normalized frame. Optional attributes are
/// present exactly when the dataset declares them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedPointBuffer {
	pub positions: Vec<Vector3>,
	pub colors: Option<Vec<[u8; 3]>>,
	pub classifications: Option<Vec<u8>>,
}

impl DecodedPointBuffer {
	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

/// Decodes all points of `node`. Marks the node loaded only after the whole
/// buffer is populated.
pub fn decode_node(
	source: &dyn PointSource,
	node: &OctreeNode,
	layout: &AttributeLayout,
	scale: &Vector3,
	color_depth: ColorDepth,
) -> Result<DecodedPointBuffer, DecodeError> {
	let count = node.num_points as usize;
	let record_size = layout.record_size as usize;
	let expected = count as u64 * record_size as u64;
	if node.byte_size != expected {
		return Err(DecodeError::DataCorruption {
			node: node.id,
			reason: format!(
				"{} points of {} bytes need {} bytes, the hierarchy declares {}",
				count, record_size, expected, node.byte_size
			),
		});
	}
	let in_file = node
		.byte_offset
		.checked_add(node.byte_size)
		.map_or(false, |end| end <= source.len());
	if !in_file {
		return Err(DecodeError::DataCorruption {
			node: node.id,
			reason: format!(
				"range {}+{} exceeds the point file of {} bytes",
				node.byte_offset,
				node.byte_size,
				source.len()
			),
		});
	}

	let bytes = source.read_at(node.byte_offset, expected as usize)?;
	let buffer = decode_records(&bytes, count, layout, scale, color_depth);
	node.mark_loaded();
	Ok(buffer)
}

/// `bytes` must hold `count` records of `layout.record_size` bytes.
pub fn decode_records(
	bytes: &[u8],
	count: usize,
	layout: &AttributeLayout,
	scale: &Vector3,
	color_depth: ColorDepth,
) -> DecodedPointBuffer {
	let record_size = layout.record_size as usize;
	let mut positions = Vec::with_capacity(count);
	let mut colors = layout.color_offset.map(|_| Vec::with_capacity(count));
	let mut classifications = layout.classification_offset.map(|_| Vec::with_capacity(count));

	for record in bytes.chunks_exact(record_size).take(count) {
		let at = layout.position_offset as usize;
		let quantized = Vector3::new(
			f64::from(LittleEndian::read_i32(&record[at..at + 4])),
			f64::from(LittleEndian::read_i32(&record[at + 4..at + 8])),
			f64::from(LittleEndian::read_i32(&record[at + 8..at + 12])),
		);
		positions.push(normalize_position(quantized * *scale));

		if let (Some(colors), Some(at)) = (colors.as_mut(), layout.color_offset) {
			let at = at as usize;
			colors.push([
				color_depth.reduce(LittleEndian::read_u16(&record[at..at + 2])),
				color_depth.reduce(LittleEndian::read_u16(&record[at + 2..at + 4])),
				color_depth.reduce(LittleEndian::read_u16(&record[at + 4..at + 6])),
			]);
		}

		if let (Some(classifications), Some(at)) =
			(classifications.as_mut(), layout.classification_offset)
		{
			classifications.push(record[at as usize]);
		}
	}

	DecodedPointBuffer {
		positions,
		colors,
		classifications,
	}
}
