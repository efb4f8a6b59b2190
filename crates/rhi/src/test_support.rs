//! Headless device setup shared by tests that need a real GPU.

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Picks the first device with a graphics queue and the required
/// extensions, without a surface.
fn headless_device_info(instance: &Instance) -> Option<PhysicalDeviceInfo> {
    let handle = instance.handle();
    let devices = unsafe { handle.enumerate_physical_devices() }.ok()?;

    devices.into_iter().find_map(|device| {
        let families = unsafe { handle.get_physical_device_queue_family_properties(device) };
        let graphics = families
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
            as u32;

        let extensions = unsafe { handle.enumerate_device_extension_properties(device) }.ok()?;
        let has_required = REQUIRED_DEVICE_EXTENSIONS.iter().all(|required| {
            extensions
                .iter()
                .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == *required)
        });
        if !has_required {
            return None;
        }

        Some(PhysicalDeviceInfo {
            device,
            properties: unsafe { handle.get_physical_device_properties(device) },
            features: unsafe { handle.get_physical_device_features(device) },
            memory_properties: unsafe {
                handle.get_physical_device_memory_properties(device)
            },
            queue_families: QueueFamilyIndices {
                graphics_family: Some(graphics),
                present_family: Some(graphics),
            },
        })
    })
}

/// Runs `test` with a device, or skips when no Vulkan device is usable.
pub(crate) fn with_device(test: impl FnOnce(Arc<Device>)) {
    let instance = match Instance::new(false, &[]) {
        Ok(instance) => instance,
        Err(RhiError::LoadingError(_)) => {
            eprintln!("Skipping test: Vulkan not available");
            return;
        }
        Err(e) => {
            eprintln!("Skipping test: instance creation failed: {:?}", e);
            return;
        }
    };
    let Some(info) = headless_device_info(&instance) else {
        eprintln!("Skipping test: no usable physical device");
        return;
    };
    let device = match Device::new(&instance, &info) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Skipping test: device creation failed: {:?}", e);
            return;
        }
    };

    test(device.clone());
    device.wait_idle().unwrap();
}
