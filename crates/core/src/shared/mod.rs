pub mod constants;
pub mod frame;
pub mod geometry;
pub mod image_source;
