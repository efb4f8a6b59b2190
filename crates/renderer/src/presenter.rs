//! The presentation loop state machine.
//!
//! ```text
//! Idle -> Acquiring -> Recording -> Submitting -> Presenting -> Idle
//!            |                                        |
//!            +------------> Recreating <--------------+
//! ```
//!
//! [`PresentationLoop`] drives one iteration at a time against a
//! [`FrameDriver`], which does the actual GPU work. Swapchain invalidation
//! is absorbed here: out-of-date and suboptimal statuses lead to
//! recreation, never to an error. Only fatal driver errors escape.

use ash::vk;
use tracing::{debug, info, trace};

use trivis_rhi::RhiResult;
use trivis_rhi::swapchain::{AcquireStatus, PresentStatus, RecreateStatus};

use crate::frame::FrameIndex;

/// GPU side of the presentation loop.
///
/// `slot` is always the current frame index in `[0, frame_count())`.
pub trait FrameDriver {
    /// Number of frames in flight.
    fn frame_count(&self) -> usize;

    /// Current framebuffer extent of the window. Zero while minimized.
    fn framebuffer_extent(&self) -> vk::Extent2D;

    /// Blocks until the slot's previous submission finished.
    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()>;

    /// Acquires the next swapchain image, signaling the slot's
    /// image-available semaphore.
    fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireStatus>;

    /// Writes the slot's uniform buffer.
    fn update_uniforms(&mut self, slot: usize) -> RhiResult<()>;

    /// Records the slot's command buffer for `image_index`.
    fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()>;

    /// Returns the slot's fence to unsignaled. Called right before `submit`.
    fn reset_slot_fence(&mut self, slot: usize) -> RhiResult<()>;

    /// Submits the slot's command buffer to the graphics queue.
    fn submit(&mut self, slot: usize) -> RhiResult<()>;

    /// Presents `image_index` once the slot's rendering finished.
    fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentStatus>;

    /// Drains the device and rebuilds the swapchain and its dependents.
    /// Returns [`RecreateStatus::Deferred`] when the surface itself still
    /// reports a zero extent.
    fn recreate(&mut self, extent: vk::Extent2D) -> RhiResult<RecreateStatus>;

    /// Blocks until the device is idle.
    fn wait_idle(&mut self) -> RhiResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Acquiring,
    Recording,
    Submitting,
    Presenting,
    Recreating,
}

/// What a single loop iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame reached the display. `recreated` is set when the swapchain
    /// was rebuilt afterwards because it no longer matched the surface.
    Presented { recreated: bool },
    /// No frame was presented; the swapchain was rebuilt instead.
    Recreated,
    /// The window or surface is minimized; no frame was presented and
    /// recreation stays pending.
    Skipped,
}

pub struct PresentationLoop<D: FrameDriver> {
    driver: D,
    frame_index: FrameIndex,
    state: LoopState,
    generation: u64,
    recreate_pending: bool,
    frames_presented: u64,
}

impl<D: FrameDriver> PresentationLoop<D> {
    pub fn new(driver: D) -> Self {
        let frame_index = FrameIndex::new(driver.frame_count());
        Self {
            driver,
            frame_index,
            state: LoopState::Idle,
            generation: 0,
            recreate_pending: false,
            frames_presented: 0,
        }
    }

    /// Runs one iteration of the loop.
    ///
    /// # Errors
    ///
    /// Only fatal driver errors are returned; out-of-date and suboptimal
    /// swapchains are handled by recreation.
    pub fn run_iteration(&mut self) -> RhiResult<FrameOutcome> {
        let extent = self.driver.framebuffer_extent();

        if extent.width == 0 || extent.height == 0 {
            if !self.recreate_pending {
                debug!("Framebuffer has zero extent, pausing presentation");
            }
            self.recreate_pending = true;
            self.state = LoopState::Idle;
            return Ok(FrameOutcome::Skipped);
        }

        if self.recreate_pending {
            return self.recreate(extent);
        }

        let slot = self.frame_index.current();

        self.state = LoopState::Acquiring;
        self.driver.wait_for_slot(slot)?;

        let (image_index, suboptimal) = match self.driver.acquire_image(slot)? {
            AcquireStatus::Ok(index) => (index, false),
            AcquireStatus::Suboptimal(index) => (index, true),
            AcquireStatus::OutOfDate => {
                debug!("Swapchain out of date on acquire");
                return self.recreate(extent);
            }
        };

        self.state = LoopState::Recording;
        self.driver.update_uniforms(slot)?;
        self.driver.record(slot, image_index)?;

        self.state = LoopState::Submitting;
        self.driver.reset_slot_fence(slot)?;
        self.driver.submit(slot)?;

        self.state = LoopState::Presenting;
        let present = self.driver.present(slot, image_index)?;

        // The frame is submitted either way; only the swapchain is stale.
        self.frame_index.advance();
        self.frames_presented += 1;

        trace!(
            "Presented image {} from slot {} ({:?})",
            image_index, slot, present
        );

        if suboptimal || present.needs_recreation() {
            debug!(
                "Swapchain needs recreation after present (acquire suboptimal: {}, present: {:?})",
                suboptimal, present
            );
            let recreated = self.recreate(extent)? == FrameOutcome::Recreated;
            return Ok(FrameOutcome::Presented { recreated });
        }

        self.state = LoopState::Idle;
        Ok(FrameOutcome::Presented { recreated: false })
    }

    /// Returns `Recreated`, or `Skipped` with recreation left pending when
    /// the driver deferred it.
    fn recreate(&mut self, extent: vk::Extent2D) -> RhiResult<FrameOutcome> {
        self.state = LoopState::Recreating;
        let status = self.driver.recreate(extent)?;
        self.state = LoopState::Idle;

        if status == RecreateStatus::Deferred {
            debug!("Swapchain recreation deferred until the surface has a non-zero extent");
            self.recreate_pending = true;
            return Ok(FrameOutcome::Skipped);
        }

        self.generation += 1;
        self.recreate_pending = false;

        info!(
            "Swapchain recreated at {}x{} (generation {})",
            extent.width, extent.height, self.generation
        );
        Ok(FrameOutcome::Recreated)
    }

    /// Runs iterations until `should_close` returns true, checked between
    /// iterations. Returns the number of frames presented.
    pub fn run_until<F>(&mut self, mut should_close: F) -> RhiResult<u64>
    where
        F: FnMut() -> bool,
    {
        let start = self.frames_presented;
        while !should_close() {
            self.run_iteration()?;
        }
        Ok(self.frames_presented - start)
    }

    /// Schedules a swapchain recreation for the next iteration with a
    /// non-zero extent, e.g. after a window resize.
    pub fn request_recreate(&mut self) {
        self.recreate_pending = true;
    }

    /// Drains all in-flight GPU work.
    pub fn shutdown(&mut self) -> RhiResult<()> {
        self.driver.wait_idle()?;
        self.state = LoopState::Idle;
        info!(
            "Presentation loop stopped after {} frame(s)",
            self.frames_presented
        );
        Ok(())
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index.current()
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of swapchain recreations performed so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[inline]
    pub fn is_recreate_pending(&self) -> bool {
        self.recreate_pending
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
