//! Scene-side math for the viewer: the camera and bounding boxes.

pub mod bounds;
pub mod camera;

pub use bounds::Aabb;
pub use camera::Camera;
