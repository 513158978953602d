//! Streaming reader for Potree 2.0 point cloud folders: opens
//! `metadata.json`, `hierarchy.bin` and `octree.bin`, selects the octants
//! worth drawing for a camera and keeps their meshes in a bounded cache.

pub mod error;
pub mod model;
pub mod reader;
pub mod streaming;

#[cfg(test)]
mod fixtures;

pub use error::{ConfigError, DecodeError};
pub use model::octant_id::OctantId;
pub use model::options::{ColorDepth, IndexWidth, OpenOptions, StreamingConfig};
pub use reader::PointCloud;
pub use streaming::camera::CameraState;
pub use streaming::loader::{LoaderStats, OctantState, OctreeLoader};
pub use streaming::mesh::{MeshFactory, PointChunk, VertexMeshFactory};
