use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::error::{ConfigError, DecodeError, Result};
use crate::model::attributes::AttributeLayout;
use crate::model::bounds::Bounds;
use crate::model::metadata::Metadata;
use crate::model::node::{NodeIndex, Octree};
use crate::model::options::{ColorDepth, OpenOptions};

pub mod hierarchy;
pub mod metadata;
pub mod normalize;
pub mod points;

use hierarchy::{parse_hierarchy, HIERARCHY_FILE};
use metadata::{read_metadata, validate};
use normalize::normalize_nodes;
use points::{decode_node, DecodedPointBuffer, MappedPoints, PointSource, OCTREE_FILE};

/// An opened dataset: validated metadata, the full octree skeleton in the
/// normalized frame and random access to the point records. Cloning is
/// cheap and clones share everything.
#[derive(Clone)]
pub struct PointCloud {
	metadata: Arc<Metadata>,
	octree: Arc<Octree>,
	layout: AttributeLayout,
	source: Arc<dyn PointSource>,
	color_depth: ColorDepth,
	bounds: Bounds,
}

impl PointCloud {
	pub fn open(dir: &Path, options: &OpenOptions) -> Result<PointCloud> {
		let metadata = read_metadata(dir, options)?;
		let hierarchy_path = dir.join(HIERARCHY_FILE);
		let hierarchy = fs::read(&hierarchy_path).map_err(|source| ConfigError::Io {
			path: hierarchy_path,
			source,
		})?;
		let source = MappedPoints::open(&dir.join(OCTREE_FILE))?;
		let cloud = PointCloud::from_parts(metadata, &hierarchy, Arc::new(source), options)?;
		info!(
			"opened {} with {} nodes, {} points, depth {}",
			dir.display(),
			cloud.octree.len(),
			cloud.octree.total_points(),
			cloud.octree.depth()
		);
		Ok(cloud)
	}

	/// Builds a dataset from already loaded pieces.
	pub fn from_parts(
		metadata: Metadata,
		hierarchy: &[u8],
		source: Arc<dyn PointSource>,
		options: &OpenOptions,
	) -> Result<PointCloud> {
		validate(&metadata, options)?;
		let layout = AttributeLayout::from_metadata(&metadata)?;
		let mut nodes = parse_hierarchy(
			hierarchy,
			metadata.hierarchy.first_chunk_size,
			metadata.bounding_box.to_bounds(),
			metadata.spacing,
		)?;
		let bounds = normalize_nodes(&mut nodes, &metadata.offset());
		let octree = Octree::new(nodes);

		if octree.depth() != u32::from(metadata.hierarchy.depth) {
			warn!(
				"hierarchy depth is {}, metadata declares {}",
				octree.depth(),
				metadata.hierarchy.depth
			);
		}

		Ok(PointCloud {
			metadata: Arc::new(metadata),
			octree: Arc::new(octree),
			layout,
			source,
			color_depth: options.color_depth,
			bounds,
		})
	}

	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	pub fn octree(&self) -> &Octree {
		&self.octree
	}

	pub fn layout(&self) -> &AttributeLayout {
		&self.layout
	}

	/// Dataset box in the normalized frame.
	pub fn bounds(&self) -> Bounds {
		self.bounds
	}

	/// Decodes one node. Safe to call from any thread, concurrently for
	/// different nodes.
	pub fn decode(&self, index: NodeIndex) -> std::result::Result<DecodedPointBuffer, DecodeError> {
		let node = self.octree.get(index).ok_or_else(|| {
			DecodeError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("no node at index {}", index),
			))
		})?;
		decode_node(
			self.source.as_ref(),
			node,
			&self.layout,
			&self.metadata.scale(),
			self.color_depth,
		)
	}
}
