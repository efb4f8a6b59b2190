//! Synchronous one-shot transfers.
//!
//! [`UploadContext`] records a short command sequence, submits it to the
//! graphics queue and blocks until the GPU has executed it. It stalls the
//! calling thread, so it is only meant for load-time work such as moving
//! vertex data from a staging buffer into device-local memory.

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;
use tracing::{debug, info};

use crate::buffer::{BufferUsage, DeviceBuffer};
use crate::command::{CommandBuffer, CommandPool};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::sync::Fence;

/// Owns the command buffer and fence used for blocking transfers.
pub struct UploadContext {
    // Field order matters: the command buffer must not outlive its pool.
    cmd: CommandBuffer,
    pool: CommandPool,
    fence: Fence,
    device: Arc<Device>,
}

impl UploadContext {
    /// Creates an upload context on the device's graphics queue family.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let pool = CommandPool::new_transient(device.clone(), device.queues().graphics_family())?;
        let cmd = CommandBuffer::new(device.clone(), &pool)?;
        let fence = Fence::new(device.clone(), false)?;

        info!("Upload context created");

        Ok(Self {
            cmd,
            pool,
            fence,
            device,
        })
    }

    /// Records `record` into a single-use command buffer, submits it and waits
    /// for completion.
    ///
    /// # Errors
    ///
    /// Any failure is fatal for the resource being built: there is no retry.
    pub fn immediate_submit<F>(&self, record: F) -> RhiResult<()>
    where
        F: FnOnce(&CommandBuffer),
    {
        self.cmd.begin_one_time()?;
        record(&self.cmd);
        self.cmd.end()?;

        let command_buffers = [self.cmd.handle()];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        unsafe {
            self.device
                .submit_graphics(std::slice::from_ref(&submit_info), self.fence.handle())
                .map_err(|e| RhiError::UploadError(format!("submission failed: {e}")))?;
        }

        self.fence.wait(u64::MAX)?;
        self.fence.reset()?;
        self.cmd.reset()?;

        debug!(
            "Immediate submit on pool {:?} completed",
            self.pool.handle()
        );
        Ok(())
    }

    /// Uploads `data` into a new device-local buffer through a staging buffer.
    ///
    /// The copy is made visible to vertex input before this call returns, so
    /// any later draw reads the uploaded contents.
    pub fn upload_buffer<T: Pod>(&self, usage: BufferUsage, data: &[T]) -> RhiResult<DeviceBuffer> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let size = bytes.len() as vk::DeviceSize;

        let staging = DeviceBuffer::with_data(self.device.clone(), BufferUsage::Staging, bytes)?;
        let target = DeviceBuffer::new(self.device.clone(), usage, size)?;

        self.immediate_submit(|cmd| {
            let region = vk::BufferCopy::default().size(size);
            cmd.copy_buffer(staging.handle(), target.handle(), std::slice::from_ref(&region));
            cmd.memory_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::VERTEX_INPUT,
                vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            );
        })?;

        debug!("Uploaded {} bytes into {} buffer", size, usage.name());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_device;

    #[test]
    fn test_uploaded_contents_are_visible_to_later_submissions() {
        with_device(|device| {
            let upload = UploadContext::new(device.clone()).unwrap();
            let pattern: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

            let uploaded = upload.upload_buffer(BufferUsage::Vertex, &pattern).unwrap();
            assert_eq!(uploaded.size(), 1000);

            let readback =
                DeviceBuffer::new(device.clone(), BufferUsage::Readback, uploaded.size()).unwrap();
            upload
                .immediate_submit(|cmd| {
                    let region = vk::BufferCopy::default().size(uploaded.size());
                    cmd.copy_buffer(
                        uploaded.handle(),
                        readback.handle(),
                        std::slice::from_ref(&region),
                    );
                    cmd.memory_barrier(
                        vk::PipelineStageFlags::TRANSFER,
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::PipelineStageFlags::HOST,
                        vk::AccessFlags::HOST_READ,
                    );
                })
                .unwrap();

            assert_eq!(readback.read_bytes(0, pattern.len()).unwrap(), pattern);
        });
    }

    #[test]
    fn test_immediate_submit_can_be_reused() {
        with_device(|device| {
            let upload = UploadContext::new(device).unwrap();
            for _ in 0..3 {
                upload.immediate_submit(|_| {}).unwrap();
            }
        });
    }

    #[test]
    fn test_host_writes_are_range_checked() {
        with_device(|device| {
            let words: [u32; 4] = [1, 2, 3, 4];
            let staging = DeviceBuffer::with_data(device, BufferUsage::Staging, &words).unwrap();
            assert_eq!(staging.size(), 16);
            assert_eq!(
                staging.read_bytes(0, 16).unwrap(),
                bytemuck::cast_slice::<u32, u8>(&words)
            );

            staging.copy_to_device(&[9u32, 8]).unwrap();
            assert_eq!(staging.read_bytes(0, 4).unwrap(), 9u32.to_ne_bytes());

            staging.write_bytes(12, &[7; 4]).unwrap();
            assert!(staging.write_bytes(8, &[0; 9]).is_err());
            assert!(staging.write_bytes(16, &[0]).is_err());
            assert!(staging.read_bytes(12, 5).is_err());
            assert_eq!(staging.read_bytes(12, 4).unwrap(), [7; 4]);
        });
    }
}
