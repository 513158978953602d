//! Error types for opening and streaming a point cloud.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::octant_id::OctantId;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures while opening a dataset. None of them are recoverable: the
/// dataset cannot be used.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("could not read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("could not parse {path}: {source}")]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// Only the uncompressed fixed layout is readable.
	#[error("unsupported encoding {0:?}, expected \"DEFAULT\"")]
	UnsupportedEncoding(String),

	#[error("unsupported version {found:?}, expected major version {expected}")]
	UnsupportedVersion { found: String, expected: u32 },

	#[error("required attribute {0:?} is not declared")]
	MissingAttribute(&'static str),

	#[error("corrupt dataset: {0}")]
	DataCorruption(String),

	#[error("could not start decode workers: {0}")]
	WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure to decode one node. Isolated to that node, the session goes on.
#[derive(Error, Debug)]
pub enum DecodeError {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("node {node}: {reason}")]
	DataCorruption { node: OctantId, reason: String },
}
