use crate::error::ConfigError;
use crate::model::metadata::Metadata;

pub const POSITION: &str = "position";
pub const RGB: &str = "rgb";
pub const CLASSIFICATION: &str = "classification";

const POSITION_SIZE: u32 = 12;
const RGB_SIZE: u32 = 6;
const CLASSIFICATION_SIZE: u32 = 1;

/// Which of the decodable attributes a dataset carries and where they sit
/// inside a point record. One descriptor drives a single decoder for every
/// attribute combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeLayout {
	pub record_size: u32,
	pub position_offset: u32,
	pub color_offset: Option<u32>,
	pub classification_offset: Option<u32>,
}

impl AttributeLayout {
	pub fn from_metadata(metadata: &Metadata) -> Result<AttributeLayout, ConfigError> {
		let position_offset =
			located(metadata, POSITION, POSITION_SIZE)?.ok_or(ConfigError::MissingAttribute(POSITION))?;
		Ok(AttributeLayout {
			record_size: metadata.point_record_size(),
			position_offset,
			color_offset: located(metadata, RGB, RGB_SIZE)?,
			classification_offset: located(metadata, CLASSIFICATION, CLASSIFICATION_SIZE)?,
		})
	}

}

fn located(metadata: &Metadata, name: &str, expected_size: u32) -> Result<Option<u32>, ConfigError> {
	let attribute = match metadata.attribute(name) {
		Some(attribute) => attribute,
		None => return Ok(None),
	};
	if attribute.size != expected_size {
		return Err(ConfigError::DataCorruption(format!(
			"attribute {:?} has size {}, expected {}",
			name, attribute.size, expected_size
		)));
	}
	Ok(metadata.attribute_offset(name))
}
