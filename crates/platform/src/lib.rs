//! Platform layer for trivis.
//!
//! - Window management via winit, with framebuffer size tracking
//! - RAII Vulkan surface creation from raw window handles

mod surface;
mod window;

pub use surface::Surface;
pub use window::{FramebufferSize, Window};
