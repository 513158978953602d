pub mod attributes;
pub mod bounds;
pub mod hierarchy;
pub mod metadata;
pub mod node;
pub mod octant_id;
pub mod options;
pub mod vector3;
