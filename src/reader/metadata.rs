use std::fs;
use std::path::Path;

use log::warn;

use crate::error::{ConfigError, Result};
use crate::model::metadata::Metadata;
use crate::model::options::OpenOptions;

pub const METADATA_FILE: &str = "metadata.json";
pub const SUPPORTED_MAJOR_VERSION: u32 = 2;
pub const SUPPORTED_ENCODING: &str = "DEFAULT";

/// Reads and validates `metadata.json` from a dataset folder.
pub fn read_metadata(dir: &Path, options: &OpenOptions) -> Result<Metadata> {
	let path = dir.join(METADATA_FILE);
	let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
		path: path.clone(),
		source,
	})?;
	let metadata: Metadata =
		serde_json::from_str(&contents).map_err(|source| ConfigError::Json { path, source })?;
	validate(&metadata, options)?;
	Ok(metadata)
}

pub fn validate(metadata: &Metadata, options: &OpenOptions) -> Result<()> {
	if metadata.encoding != SUPPORTED_ENCODING {
		return Err(ConfigError::UnsupportedEncoding(metadata.encoding.clone()));
	}

	if major_version(&metadata.version) != Some(SUPPORTED_MAJOR_VERSION) {
		if !options.allow_version_mismatch {
			return Err(ConfigError::UnsupportedVersion {
				found: metadata.version.clone(),
				expected: SUPPORTED_MAJOR_VERSION,
			});
		}
		warn!(
			"opening dataset with version {:?}, supported major version is {}",
			metadata.version, SUPPORTED_MAJOR_VERSION
		);
	}

	if metadata.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
		return Err(ConfigError::DataCorruption(format!(
			"scale {:?} must be finite and non zero",
			metadata.scale
		)));
	}

	Ok(())
}

fn major_version(version: &str) -> Option<u32> {
	version.split('.').next()?.trim().parse().ok()
}
