use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::octant_id::OctantId;

/// How 16 bit color channels are brought down to 8 bits.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ColorDepth {
	/// Per channel: values above 255 are divided by 256, others kept.
	#[default]
	Auto,
	Bits8,
	Bits16,
}

impl ColorDepth {
	pub fn reduce(&self, value: u16) -> u8 {
		match self {
			ColorDepth::Auto if value > 255 => (value / 256) as u8,
			ColorDepth::Auto => value as u8,
			ColorDepth::Bits8 => value.min(255) as u8,
			ColorDepth::Bits16 => (value / 256) as u8,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
	/// Accept metadata whose major version differs from the supported one.
	pub allow_version_mismatch: bool,
	pub color_depth: ColorDepth,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IndexWidth {
	#[default]
	U16,
	U32,
}

impl IndexWidth {
	/// Largest vertex count one mesh may hold. The all-ones index is kept
	/// free for primitive restart.
	pub fn max_vertices(&self) -> usize {
		match self {
			IndexWidth::U16 => u16::MAX as usize - 1,
			IndexWidth::U32 => u32::MAX as usize - 1,
		}
	}
}

/// Tunables of one streamed point cloud, handed to every update.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingConfig {
	pub point_budget: u64,
	/// Pixels. Octants projecting smaller than this are not refined.
	pub min_projected_size: f64,
	pub update_interval_ms: u64,
	pub decode_workers: usize,
	pub max_in_flight: usize,
	pub cache_point_capacity: u64,
	pub disposals_per_tick: usize,
	/// Evicted entries allowed to wait for release; the oldest beyond this
	/// are released immediately.
	pub max_pending_disposals: usize,
	pub index_width: IndexWidth,
	pub max_depth: u32,
}

impl Default for StreamingConfig {
	fn default() -> Self {
		StreamingConfig {
			point_budget: 1_000_000,
			min_projected_size: 100.0,
			update_interval_ms: 100,
			decode_workers: 4,
			max_in_flight: 16,
			cache_point_capacity: 4_000_000,
			disposals_per_tick: 4,
			max_pending_disposals: 256,
			index_width: IndexWidth::U16,
			max_depth: OctantId::MAX_LEVEL,
		}
	}
}

impl StreamingConfig {
	pub fn from_file(path: &Path) -> Result<StreamingConfig, ConfigError> {
		let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
			path: path.to_path_buf(),
			source,
		})
	}

	pub fn update_interval(&self) -> Duration {
		Duration::from_millis(self.update_interval_ms)
	}
}
