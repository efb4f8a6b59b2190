//! Frame pacing and presentation.
//!
//! This crate drives the per-frame work on top of `trivis-rhi`:
//! - Frame slots cycling through the frames in flight
//! - Command recording for the loaded geometry batches
//! - The presentation loop with swapchain recreation
//! - The Vulkan [`Renderer`] implementing [`FrameDriver`]

pub mod depth_buffer;
pub mod frame;
pub mod frame_slots;
pub mod geometry;
pub mod presenter;
pub mod recorder;
pub mod renderer;
pub mod targets;
pub mod ubo;

pub use frame::FrameIndex;
pub use geometry::{GeometryBatch, GeometryKind};
pub use presenter::{FrameDriver, FrameOutcome, LoopState, PresentationLoop};
pub use renderer::Renderer;
pub use ubo::SceneUniforms;

/// Frames in flight when nothing else is configured.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;
