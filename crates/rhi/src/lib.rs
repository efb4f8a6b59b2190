//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin RAII wrappers over `ash`:
//! - Instance, physical device and logical device setup
//! - Graphics/present queue selection
//! - Swapchain creation and recreation
//! - Render pass, framebuffers and graphics pipelines
//! - Device buffers and synchronous uploads
//! - Command recording and synchronization primitives

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod framebuffer;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod queues;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod upload;
pub mod vertex;

#[cfg(test)]
mod test_support;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
