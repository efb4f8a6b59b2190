//! Graphics and present queue selection.
//!
//! Devices either expose one queue family that can both render and present, or
//! two distinct families. The choice is made once at device creation and every
//! consumer matches on [`GraphicsPresentQueues`].

use ash::vk;

/// A queue handle together with the family it was retrieved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueHandle {
    pub family: u32,
    pub queue: vk::Queue,
}

/// The graphics and present queues of a logical device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphicsPresentQueues {
    /// One queue serves both rendering and presentation.
    Combined(QueueHandle),
    /// Rendering and presentation use queues from different families.
    Separate {
        graphics: QueueHandle,
        present: QueueHandle,
    },
}

impl GraphicsPresentQueues {
    /// Retrieves queue 0 of each family from `device`.
    ///
    /// # Safety
    ///
    /// Both families must have been requested when `device` was created.
    pub unsafe fn retrieve(device: &ash::Device, graphics_family: u32, present_family: u32) -> Self {
        let graphics = QueueHandle {
            family: graphics_family,
            queue: unsafe { device.get_device_queue(graphics_family, 0) },
        };

        if graphics_family == present_family {
            return Self::Combined(graphics);
        }

        let present = QueueHandle {
            family: present_family,
            queue: unsafe { device.get_device_queue(present_family, 0) },
        };

        Self::Separate { graphics, present }
    }

    /// Queue used for rendering and transfer submissions.
    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        match self {
            Self::Combined(shared) => shared.queue,
            Self::Separate { graphics, .. } => graphics.queue,
        }
    }

    /// Queue used for `vkQueuePresentKHR`.
    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        match self {
            Self::Combined(shared) => shared.queue,
            Self::Separate { present, .. } => present.queue,
        }
    }

    #[inline]
    pub fn graphics_family(&self) -> u32 {
        match self {
            Self::Combined(shared) => shared.family,
            Self::Separate { graphics, .. } => graphics.family,
        }
    }

    #[inline]
    pub fn present_family(&self) -> u32 {
        match self {
            Self::Combined(shared) => shared.family,
            Self::Separate { present, .. } => present.family,
        }
    }

    /// Sharing mode and family list for swapchain images.
    ///
    /// Images are shared concurrently between both families when they differ,
    /// and owned exclusively otherwise.
    pub fn image_sharing(&self) -> (vk::SharingMode, Vec<u32>) {
        match self {
            Self::Combined(_) => (vk::SharingMode::EXCLUSIVE, Vec::new()),
            Self::Separate { graphics, present } => (
                vk::SharingMode::CONCURRENT,
                vec![graphics.family, present.family],
            ),
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, Self::Combined(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn handle(family: u32, raw: u64) -> QueueHandle {
        QueueHandle {
            family,
            queue: vk::Queue::from_raw(raw),
        }
    }

    #[test]
    fn test_combined_uses_one_queue_for_both_roles() {
        let queues = GraphicsPresentQueues::Combined(handle(1, 0x10));
        assert!(queues.is_combined());
        assert_eq!(queues.graphics_queue(), queues.present_queue());
        assert_eq!(queues.graphics_family(), 1);
        assert_eq!(queues.present_family(), 1);
    }

    #[test]
    fn test_separate_routes_each_role() {
        let queues = GraphicsPresentQueues::Separate {
            graphics: handle(0, 0x10),
            present: handle(3, 0x20),
        };
        assert!(!queues.is_combined());
        assert_eq!(queues.graphics_queue(), vk::Queue::from_raw(0x10));
        assert_eq!(queues.present_queue(), vk::Queue::from_raw(0x20));
        assert_eq!(queues.graphics_family(), 0);
        assert_eq!(queues.present_family(), 3);
    }

    #[test]
    fn test_image_sharing_exclusive_when_combined() {
        let queues = GraphicsPresentQueues::Combined(handle(0, 0x10));
        let (mode, families) = queues.image_sharing();
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(families.is_empty());
    }

    #[test]
    fn test_image_sharing_concurrent_when_separate() {
        let queues = GraphicsPresentQueues::Separate {
            graphics: handle(0, 0x10),
            present: handle(2, 0x20),
        };
        let (mode, families) = queues.image_sharing();
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(families, vec![0, 2]);
    }
}
