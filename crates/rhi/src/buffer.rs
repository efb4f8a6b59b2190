//! Device buffers backed by gpu-allocator.
//!
//! A [`DeviceBuffer`] pairs a `VkBuffer` with its allocation and is owned
//! exclusively by whatever built it (a geometry batch, a per-frame uniform
//! block, a temporary staging hop).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trivis_rhi::device::Device;
//! use trivis_rhi::buffer::{DeviceBuffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), trivis_rhi::RhiError> {
//! let colors: [[f32; 4]; 2] = [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
//! let uniforms = DeviceBuffer::with_data(device, BufferUsage::Uniform, &colors)?;
//! assert_eq!(uniforms.size(), 32);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// How a buffer is used, which decides its usage flags and memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Device-local vertex data, filled through a staging copy.
    Vertex,
    /// Host-visible uniform block, rewritten every frame.
    Uniform,
    /// Host-visible transfer source.
    Staging,
    /// Host-visible transfer destination for reading device data back.
    Readback,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::TRANSFER_SRC
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
            BufferUsage::Readback => vk::BufferUsageFlags::TRANSFER_DST,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex => MemoryLocation::GpuOnly,
            BufferUsage::Uniform | BufferUsage::Staging => MemoryLocation::CpuToGpu,
            BufferUsage::Readback => MemoryLocation::GpuToCpu,
        }
    }

    /// Whether the host can write the buffer through a persistent mapping.
    pub fn is_host_visible(self) -> bool {
        self.memory_location() != MemoryLocation::GpuOnly
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
            BufferUsage::Readback => "readback",
        }
    }
}

/// Checks that `len` bytes at `offset` fit inside a buffer of `size` bytes.
pub fn check_range(size: vk::DeviceSize, offset: vk::DeviceSize, len: usize) -> RhiResult<()> {
    let end = offset.checked_add(len as vk::DeviceSize);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(RhiError::InvalidHandle(format!(
            "Range exceeds buffer size: offset {} + length {} > buffer {}",
            offset, len, size
        ))),
    }
}

/// A `VkBuffer` bound to memory from the device allocator.
pub struct DeviceBuffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl DeviceBuffer {
    /// Creates an uninitialized buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or if creation, allocation or
    /// binding fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device.allocator().and_then(|mut allocator| {
            allocator
                .allocate(&AllocationCreateDesc {
                    name: usage.name(),
                    requirements,
                    location: usage.memory_location(),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(RhiError::from)
        });

        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let this = Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        };

        // Dropping `this` on bind failure frees the allocation and the buffer.
        if let Some(allocation) = this.allocation.as_ref() {
            unsafe {
                this.device.handle().bind_buffer_memory(
                    this.buffer,
                    allocation.memory(),
                    allocation.offset(),
                )?;
            }
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(this)
    }

    /// Creates a host-visible buffer pre-populated with `data`.
    pub fn with_data<T: Pod>(device: Arc<Device>, usage: BufferUsage, data: &[T]) -> RhiResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(device, usage, bytes.len() as vk::DeviceSize)?;
        buffer.write_bytes(0, bytes)?;
        Ok(buffer)
    }

    /// Copies `data` into the start of the buffer through its mapping.
    pub fn copy_to_device<T: Pod>(&self, data: &[T]) -> RhiResult<()> {
        self.write_bytes(0, bytemuck::cast_slice(data))
    }

    /// Copies raw bytes into the buffer at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range exceeds the buffer or the memory is not host-visible.
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        check_range(self.size, offset, data.len())?;

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation.mapped_ptr().ok_or_else(|| {
            RhiError::InvalidHandle(format!("{} buffer memory is not mapped", self.usage.name()))
        })?;

        // SAFETY: range checked above; the mapping stays valid while `allocation` lives.
        unsafe {
            let dst = mapped_ptr.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    /// Copies `len` bytes starting at `offset` out of the buffer's mapping.
    ///
    /// # Errors
    ///
    /// Fails if the range exceeds the buffer or the memory is not host-visible.
    pub fn read_bytes(&self, offset: vk::DeviceSize, len: usize) -> RhiResult<Vec<u8>> {
        check_range(self.size, offset, len)?;

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })?;
        let mapped = allocation.mapped_slice().ok_or_else(|| {
            RhiError::InvalidHandle(format!("{} buffer memory is not mapped", self.usage.name()))
        })?;

        let start = offset as usize;
        Ok(mapped[start..start + len].to_vec())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        tracing::error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(e) => tracing::error!("Leaking {} buffer allocation: {}", self.usage.name(), e),
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        let vertex = BufferUsage::Vertex.to_vk_usage();
        assert!(vertex.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(vertex.contains(vk::BufferUsageFlags::TRANSFER_DST));

        assert!(
            BufferUsage::Uniform
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::UNIFORM_BUFFER)
        );
        assert_eq!(
            BufferUsage::Staging.to_vk_usage(),
            vk::BufferUsageFlags::TRANSFER_SRC
        );
    }

    #[test]
    fn test_buffer_usage_memory_location() {
        assert_eq!(BufferUsage::Vertex.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(BufferUsage::Uniform.memory_location(), MemoryLocation::CpuToGpu);
        assert_eq!(BufferUsage::Staging.memory_location(), MemoryLocation::CpuToGpu);
        assert!(!BufferUsage::Vertex.is_host_visible());
        assert_eq!(BufferUsage::Readback.memory_location(), MemoryLocation::GpuToCpu);
        assert!(BufferUsage::Readback.is_host_visible());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range(16, 0, 16).is_ok());
        assert!(check_range(16, 8, 8).is_ok());
        assert!(check_range(16, 8, 9).is_err());
        assert!(check_range(16, u64::MAX, 1).is_err());
    }
}
