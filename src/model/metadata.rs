use serde::{Deserialize, Serialize};

use crate::model::bounds::Bounds;
use crate::model::vector3::Vector3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
	pub first_chunk_size: u64,
	pub step_size: u8,
	pub depth: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub size: u32,
	#[serde(default = "one")]
	pub num_elements: u32,
	#[serde(default)]
	pub element_size: u32,
	#[serde(default)]
	pub r#type: String,
	#[serde(default)]
	pub min: Vec<f64>,
	#[serde(default)]
	pub max: Vec<f64>,
}

fn one() -> u32 {
	1
}

impl Attribute {
	pub fn new(name: &str, size: u32, num_elements: u32, r#type: &str) -> Attribute {
		Attribute {
			name: name.to_string(),
			description: "".to_string(),
			size,
			num_elements,
			element_size: size / num_elements.max(1),
			r#type: r#type.to_string(),
			min: Vec::new(),
			max: Vec::new(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
	pub min: [f64; 3],
	pub max: [f64; 3],
}

impl BoundingBox {
	pub fn to_bounds(&self) -> Bounds {
		Bounds::from_arrays(self.min, self.max)
	}
}

/// Contents of `metadata.json`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
	pub version: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub points: u64,
	#[serde(default)]
	pub projection: String,
	pub hierarchy: Hierarchy,
	pub offset: [f64; 3],
	pub scale: [f64; 3],
	#[serde(default)]
	pub spacing: f64,
	pub bounding_box: BoundingBox,
	pub encoding: String,
	pub attributes: Vec<Attribute>,
}

impl Metadata {
	pub fn offset(&self) -> Vector3 {
		Vector3::from_array(self.offset)
	}

	pub fn scale(&self) -> Vector3 {
		Vector3::from_array(self.scale)
	}

	/// Byte offset of every attribute inside a point record, in declared
	/// order.
	pub fn attribute_offsets(&self) -> Vec<u32> {
		self.attributes
			.iter()
			.scan(0, |offset, attribute| {
				let current = *offset;
				*offset += attribute.size;
				Some(current)
			})
			.collect()
	}

	pub fn point_record_size(&self) -> u32 {
		self.attributes.iter().map(|attribute| attribute.size).sum()
	}

	pub fn attribute_offset(&self, name: &str) -> Option<u32> {
		self.attributes
			.iter()
			.zip(self.attribute_offsets())
			.find(|(attribute, _)| attribute.name == name)
			.map(|(_, offset)| offset)
	}

	pub fn attribute(&self, name: &str) -> Option<&Attribute> {
		self.attributes.iter().find(|attribute| attribute.name == name)
	}
}
