//! Per-frame-in-flight synchronization objects and command buffers.
//!
//! Every slot owns two semaphores, a fence and one command buffer. The fence
//! starts signaled so the first wait on a fresh slot returns immediately.
//! A slot's command buffer is only re-recorded after its fence has been
//! observed signaled, which keeps each buffer in at most one submission.

use std::sync::Arc;

use tracing::{debug, trace};

use trivis_rhi::RhiResult;
use trivis_rhi::command::{CommandBuffer, CommandPool};
use trivis_rhi::device::Device;
use trivis_rhi::sync::{Fence, Semaphore};

/// Synchronization and command state for one frame in flight.
pub struct FrameSlot {
    /// Signaled by the swapchain when the acquired image can be rendered to.
    pub image_available: Semaphore,
    /// Signaled by the graphics queue when the slot's commands finish.
    pub render_finished: Semaphore,
    /// Signaled when all GPU work from the slot's previous use completed.
    pub in_flight: Fence,
    /// Command buffer owned exclusively by this slot.
    pub command_buffer: CommandBuffer,
}

impl FrameSlot {
    fn new(device: &Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device.clone(), true)?,
            command_buffer: CommandBuffer::new(device.clone(), pool)?,
        })
    }
}

/// Fixed ring of [`FrameSlot`]s.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    // Frees the slots' command buffers when destroyed.
    pool: CommandPool,
}

impl FrameSlots {
    /// Create `count` slots with command buffers from a resettable pool on
    /// the graphics queue family.
    pub fn new(device: Arc<Device>, count: usize) -> RhiResult<Self> {
        let pool = CommandPool::new(device.clone(), device.queues().graphics_family())?;

        let slots = (0..count.max(1))
            .map(|_| FrameSlot::new(&device, &pool))
            .collect::<RhiResult<Vec<_>>>()?;

        debug!("Created {} frame slot(s)", slots.len());

        Ok(Self { slots, pool })
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot for `frame_index`. Pure indexing, wrapping into range.
    #[inline]
    pub fn acquire_slot(&self, frame_index: usize) -> &FrameSlot {
        &self.slots[frame_index % self.slots.len()]
    }

    /// Blocks until the slot's previous submission completed.
    pub fn wait(&self, frame_index: usize) -> RhiResult<()> {
        let slot = self.acquire_slot(frame_index);
        slot.in_flight.wait(u64::MAX)?;
        trace!("Frame slot {} is free", frame_index);
        Ok(())
    }

    /// Blocks until the slot's fence is signaled, then resets it for the
    /// next submission.
    pub fn wait_and_reset(&self, frame_index: usize) -> RhiResult<()> {
        let slot = self.acquire_slot(frame_index);
        slot.in_flight.wait(u64::MAX)?;
        slot.in_flight.reset()?;
        Ok(())
    }

    /// Command pool backing the slots' command buffers.
    #[inline]
    pub fn pool(&self) -> &CommandPool {
        &self.pool
    }
}
