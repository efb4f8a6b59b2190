//! Vulkan surface for a winit window.

use std::ffi::{CStr, c_char};

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};

use trivis_core::{Error, Result};

/// Owns a `VkSurfaceKHR`. The instance it was created from must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Creates a surface for anything exposing raw display and window handles.
    pub(crate) fn create<W>(target: &W, entry: &ash::Entry, instance: &ash::Instance) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = target
            .display_handle()
            .map_err(|e| Error::Window(format!("no display handle: {}", e)))?;
        let window = target
            .window_handle()
            .map_err(|e| Error::Window(format!("no window handle: {}", e)))?;

        // SAFETY: both handles come from a live window; the surface is
        // destroyed in `Drop` with a loader for the same instance.
        let handle = unsafe {
            ash_window::create_surface(entry, instance, display.as_raw(), window.as_raw(), None)
        }
        .map_err(|e| Error::Vulkan(format!("surface creation failed: {}", e)))?;

        info!("Vulkan surface created");

        Ok(Self {
            handle,
            loader: ash::khr::surface::Instance::new(entry, instance),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader for surface capability, format and present-mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}

/// Instance extensions needed to create a surface on `target`'s display
/// server. The returned names are static strings owned by ash-window.
pub(crate) fn surface_extensions<W: HasDisplayHandle>(target: &W) -> Result<Vec<*const c_char>> {
    let display = target
        .display_handle()
        .map_err(|e| Error::Window(format!("no display handle: {}", e)))?;

    let extensions = ash_window::enumerate_required_extensions(display.as_raw())
        .map_err(|e| Error::Vulkan(format!("cannot enumerate surface extensions: {}", e)))?;

    debug!(
        "Surface extensions: {:?}",
        extensions
            .iter()
            // SAFETY: ash-window returns pointers to static NUL-terminated names.
            .map(|&name| unsafe { CStr::from_ptr(name) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}
