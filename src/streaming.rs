pub mod cache;
pub mod camera;
pub mod loader;
pub mod lod;
pub mod mesh;
pub mod picking;
