//! Window management using winit.
//!
//! The window reports its framebuffer extent to the presentation loop; a zero
//! extent means the window is minimized.

use std::ffi::c_char;

use ash::vk;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use trivis_core::{Error, Result};

use crate::surface::{self, Surface};

/// Last framebuffer size reported by winit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FramebufferSize {
    pub width: u32,
    pub height: u32,
}

impl FramebufferSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True while either side is zero, as reported for minimized windows.
    #[inline]
    pub fn is_minimized(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn extent(self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// A resizable winit window plus its tracked framebuffer size.
pub struct Window {
    window: WinitWindow,
    size: FramebufferSize,
}

impl Window {
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        // The compositor may not honour the requested size.
        let actual = window.inner_size();
        tracing::info!(
            "Window created: {}x{} (requested {}x{})",
            actual.width,
            actual.height,
            width,
            height
        );

        Ok(Self {
            window,
            size: FramebufferSize::new(actual.width, actual.height),
        })
    }

    /// Current framebuffer extent in pixels.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.size.extent()
    }

    #[inline]
    pub fn is_minimized(&self) -> bool {
        self.size.is_minimized()
    }

    /// Records the size from a `Resized` event.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = FramebufferSize::new(width, height);
        tracing::debug!("Window resized: {}x{}", width, height);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Instance extensions required to present to this window.
    pub fn surface_extensions(&self) -> Result<Vec<*const c_char>> {
        surface::surface_extensions(&self.window)
    }

    /// Creates a surface for this window. `instance` must outlive it.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        Surface::create(&self.window, entry, instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_side_means_minimized() {
        assert!(FramebufferSize::new(0, 0).is_minimized());
        assert!(FramebufferSize::new(640, 0).is_minimized());
        assert!(FramebufferSize::new(0, 480).is_minimized());
        assert!(!FramebufferSize::new(640, 480).is_minimized());
    }

    #[test]
    fn test_extent_matches_size() {
        let extent = FramebufferSize::new(1024, 768).extent();
        assert_eq!((extent.width, extent.height), (1024, 768));
        assert_eq!(FramebufferSize::default().extent().width, 0);
    }
}
