use std::ops::Range;

use crate::model::vector3::Vector3;
use crate::reader::points::DecodedPointBuffer;

/// A contiguous run of points from one decoded buffer, small enough for a
/// single mesh.
pub struct PointChunk<'a> {
	pub positions: &'a [Vector3],
	pub colors: Option<&'a [[u8; 3]]>,
	pub classifications: Option<&'a [u8]>,
	/// Octant center. Vertex positions are stored relative to it so they
	/// fit single precision.
	pub origin: Vector3,
}

impl<'a> PointChunk<'a> {
	pub fn new(points: &'a DecodedPointBuffer, range: Range<usize>, origin: Vector3) -> PointChunk<'a> {
		PointChunk {
			positions: &points.positions[range.clone()],
			colors: points.colors.as_ref().map(|colors| &colors[range.clone()]),
			classifications: points.classifications.as_ref().map(|classes| &classes[range]),
			origin,
		}
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

/// Creates and releases renderer meshes. Both calls happen on the thread
/// driving the update tick.
pub trait MeshFactory {
	type Handle: Clone;

	fn build(&mut self, chunk: &PointChunk) -> Self::Handle;

	fn dispose(&mut self, handle: Self::Handle);
}

/// Splits `len` points into ranges of at most `max_vertices`.
pub fn chunk_ranges(len: usize, max_vertices: usize) -> Vec<Range<usize>> {
	let max_vertices = max_vertices.max(1);
	(0..len)
		.step_by(max_vertices)
		.map(|start| start..(start + max_vertices).min(len))
		.collect()
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct PointVertex {
	pub position: [f32; 3],
	pub color: [u8; 4],
	pub classification: u32,
}

impl PointVertex {
	pub fn from_chunk(chunk: &PointChunk) -> Vec<PointVertex> {
		(0..chunk.len())
			.map(|i| {
				let local = &chunk.positions[i] - &chunk.origin;
				let [r, g, b] = chunk.colors.map_or([255, 255, 255], |colors| colors[i]);
				PointVertex {
					position: local.to_f32_array(),
					color: [r, g, b, 255],
					classification: chunk.classifications.map_or(0, |classes| u32::from(classes[i])),
				}
			})
			.collect()
	}
}

/// CPU side vertex buffer as handed to a graphics API.
#[derive(Clone, Debug)]
pub struct VertexMesh {
	pub id: u64,
	pub origin: Vector3,
	pub bytes: Vec<u8>,
	pub vertex_count: usize,
}

/// Builds interleaved [`PointVertex`] buffers and keeps count of live meshes.
#[derive(Default)]
pub struct VertexMeshFactory {
	next_id: u64,
	pub built: usize,
	pub disposed: usize,
	pub live_bytes: usize,
}

impl VertexMeshFactory {
	pub fn new() -> VertexMeshFactory {
		VertexMeshFactory::default()
	}

	pub fn live(&self) -> usize {
		self.built - self.disposed
	}
}

impl MeshFactory for VertexMeshFactory {
	type Handle = std::sync::Arc<VertexMesh>;

	fn build(&mut self, chunk: &PointChunk) -> Self::Handle {
		let vertices = PointVertex::from_chunk(chunk);
		let bytes: Vec<u8> = bytemuck::cast_slice(&vertices).to_vec();
		self.next_id += 1;
		self.built += 1;
		self.live_bytes += bytes.len();
		std::sync::Arc::new(VertexMesh {
			id: self.next_id,
			origin: chunk.origin,
			vertex_count: vertices.len(),
			bytes,
		})
	}

	fn dispose(&mut self, handle: Self::Handle) {
		self.disposed += 1;
		self.live_bytes -= handle.bytes.len();
	}
}
