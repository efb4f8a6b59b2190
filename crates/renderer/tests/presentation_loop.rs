//! Presentation loop behaviour against a scripted driver (no GPU needed).

use std::collections::{HashMap, HashSet};

use ash::vk;
use ash::vk::Handle;

use trivis_renderer::recorder::{DrawCall, plan_draws};
use trivis_renderer::{FrameDriver, FrameOutcome, LoopState, PresentationLoop};
use trivis_rhi::swapchain::{AcquireStatus, PresentStatus, RecreateStatus};
use trivis_rhi::{RhiError, RhiResult};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Event {
    Wait(usize),
    Acquire(usize),
    Uniforms(usize),
    Record(usize, u32),
    ResetFence(usize),
    Submit(usize),
    Present(usize, u32),
    Recreate(u32, u32),
    Deferred,
    WaitIdle,
}

/// Mimics fences and swapchain images and checks the slot protocol on
/// every call.
struct MockDriver {
    frames: usize,
    extent: vk::Extent2D,
    image_count: u32,
    next_image: u32,
    acquire_calls: usize,
    present_calls: usize,
    out_of_date_acquires: HashSet<usize>,
    suboptimal_acquires: HashSet<usize>,
    present_statuses: HashMap<usize, PresentStatus>,
    lost_on_acquire: Option<usize>,
    /// Recreations the surface refuses because it still reports 0x0.
    deferred_recreates: usize,
    fence_signaled: Vec<bool>,
    fence_observed: Vec<bool>,
    vertex_count: u32,
    draws: Vec<Vec<DrawCall>>,
    events: Vec<Event>,
}

impl MockDriver {
    fn new(frames: usize) -> Self {
        Self {
            frames,
            extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            image_count: 3,
            next_image: 0,
            acquire_calls: 0,
            present_calls: 0,
            out_of_date_acquires: HashSet::new(),
            suboptimal_acquires: HashSet::new(),
            present_statuses: HashMap::new(),
            lost_on_acquire: None,
            deferred_recreates: 0,
            fence_signaled: vec![true; frames],
            fence_observed: vec![false; frames],
            vertex_count: 0,
            draws: Vec::new(),
            events: Vec::new(),
        }
    }

    fn recreations(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Recreate(..)))
            .count()
    }

    fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| wanted(event)).count()
    }
}

impl FrameDriver for MockDriver {
    fn frame_count(&self) -> usize {
        self.frames
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        // The GPU always finishes eventually; waiting observes that.
        self.fence_signaled[slot] = true;
        self.fence_observed[slot] = true;
        self.events.push(Event::Wait(slot));
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireStatus> {
        let call = self.acquire_calls;
        self.acquire_calls += 1;
        self.events.push(Event::Acquire(slot));

        if self.lost_on_acquire == Some(call) {
            return Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST));
        }
        if self.out_of_date_acquires.contains(&call) {
            return Ok(AcquireStatus::OutOfDate);
        }

        let image = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;

        if self.suboptimal_acquires.contains(&call) {
            Ok(AcquireStatus::Suboptimal(image))
        } else {
            Ok(AcquireStatus::Ok(image))
        }
    }

    fn update_uniforms(&mut self, slot: usize) -> RhiResult<()> {
        assert!(
            self.fence_observed[slot],
            "uniforms of slot {} written while its fence was unobserved",
            slot
        );
        self.events.push(Event::Uniforms(slot));
        Ok(())
    }

    fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()> {
        assert!(
            self.fence_observed[slot],
            "slot {} recorded without observing its fence",
            slot
        );
        assert!(image_index < self.image_count);
        self.fence_observed[slot] = false;

        let candidate = DrawCall {
            pipeline: vk::Pipeline::from_raw(1),
            vertex_buffer: if self.vertex_count > 0 {
                vk::Buffer::from_raw(2)
            } else {
                vk::Buffer::null()
            },
            vertex_count: self.vertex_count,
        };
        self.draws.push(plan_draws([candidate]));
        self.events.push(Event::Record(slot, image_index));
        Ok(())
    }

    fn reset_slot_fence(&mut self, slot: usize) -> RhiResult<()> {
        assert!(self.fence_signaled[slot], "reset of an unsignaled fence");
        self.fence_signaled[slot] = false;
        self.events.push(Event::ResetFence(slot));
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> RhiResult<()> {
        assert!(
            !self.fence_signaled[slot],
            "slot {} submitted with a signaled fence",
            slot
        );
        self.events.push(Event::Submit(slot));
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentStatus> {
        let call = self.present_calls;
        self.present_calls += 1;
        self.events.push(Event::Present(slot, image_index));
        Ok(self
            .present_statuses
            .get(&call)
            .copied()
            .unwrap_or(PresentStatus::Ok))
    }

    fn recreate(&mut self, extent: vk::Extent2D) -> RhiResult<RecreateStatus> {
        assert!(extent.width > 0 && extent.height > 0);
        if self.deferred_recreates > 0 {
            self.deferred_recreates -= 1;
            self.events.push(Event::Deferred);
            return Ok(RecreateStatus::Deferred);
        }
        self.events.push(Event::Recreate(extent.width, extent.height));
        Ok(RecreateStatus::Recreated)
    }

    fn wait_idle(&mut self) -> RhiResult<()> {
        self.events.push(Event::WaitIdle);
        Ok(())
    }
}

#[test]
fn test_frame_index_is_cyclic() {
    let mut presenter = PresentationLoop::new(MockDriver::new(3));

    let mut starts = Vec::new();
    for _ in 0..8 {
        starts.push(presenter.frame_index());
        let outcome = presenter.run_iteration().expect("iteration failed");
        assert_eq!(outcome, FrameOutcome::Presented { recreated: false });
        assert_eq!(presenter.state(), LoopState::Idle);
    }

    assert_eq!(starts, vec![0, 1, 2, 0, 1, 2, 0, 1]);
    assert_eq!(presenter.frames_presented(), 8);
    assert_eq!(presenter.generation(), 0);
}

#[test]
fn test_slots_follow_frame_index() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));
    for _ in 0..6 {
        presenter.run_iteration().expect("iteration failed");
    }

    let recorded: Vec<usize> = presenter
        .driver()
        .events
        .iter()
        .filter_map(|event| match event {
            Event::Record(slot, _) => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(recorded, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_fence_reset_immediately_before_submit() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));
    for _ in 0..10 {
        presenter.run_iteration().expect("iteration failed");
    }

    let events = &presenter.driver().events;
    let mut submits = 0;
    for (i, event) in events.iter().enumerate() {
        if let Event::Submit(slot) = event {
            submits += 1;
            assert!(i > 0);
            assert_eq!(
                events[i - 1],
                Event::ResetFence(*slot),
                "submit of slot {} not directly preceded by its fence reset",
                slot
            );
        }
    }
    assert_eq!(submits, 10);
}

#[test]
fn test_iteration_order() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));
    presenter.run_iteration().expect("iteration failed");

    assert_eq!(
        presenter.driver().events,
        vec![
            Event::Wait(0),
            Event::Acquire(0),
            Event::Uniforms(0),
            Event::Record(0, 0),
            Event::ResetFence(0),
            Event::Submit(0),
            Event::Present(0, 0),
        ]
    );
}

#[test]
fn test_out_of_date_acquire_recreates_without_advancing() {
    let mut driver = MockDriver::new(2);
    // Iteration 5 of 10 is the fifth acquire call.
    driver.out_of_date_acquires.insert(4);
    let mut presenter = PresentationLoop::new(driver);

    let mut starts = Vec::new();
    let mut outcomes = Vec::new();
    for _ in 0..10 {
        starts.push(presenter.frame_index());
        outcomes.push(presenter.run_iteration().expect("iteration failed"));
    }

    assert_eq!(outcomes[4], FrameOutcome::Recreated);
    assert_eq!(
        starts[4], starts[5],
        "frame index changed across an out-of-date acquire"
    );
    assert_eq!(presenter.generation(), 1);
    assert_eq!(presenter.driver().recreations(), 1);
    assert_eq!(presenter.frames_presented(), 9);
    assert!(
        outcomes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 4)
            .all(|(_, outcome)| *outcome == FrameOutcome::Presented { recreated: false })
    );
}

#[test]
fn test_out_of_date_present_advances_then_recreates() {
    let mut driver = MockDriver::new(2);
    driver.present_statuses.insert(0, PresentStatus::OutOfDate);
    let mut presenter = PresentationLoop::new(driver);

    let outcome = presenter.run_iteration().expect("iteration failed");
    assert_eq!(outcome, FrameOutcome::Presented { recreated: true });
    assert_eq!(presenter.frame_index(), 1);
    assert_eq!(presenter.generation(), 1);
    assert_eq!(presenter.state(), LoopState::Idle);

    let events = &presenter.driver().events;
    assert_eq!(events.last(), Some(&Event::Recreate(800, 600)));
    assert!(events.contains(&Event::Submit(0)));
}

#[test]
fn test_suboptimal_present_recreates() {
    let mut driver = MockDriver::new(2);
    driver.present_statuses.insert(2, PresentStatus::Suboptimal);
    let mut presenter = PresentationLoop::new(driver);

    for _ in 0..5 {
        presenter.run_iteration().expect("iteration failed");
    }
    assert_eq!(presenter.generation(), 1);
    assert_eq!(presenter.frames_presented(), 5);
}

#[test]
fn test_suboptimal_acquire_still_presents() {
    let mut driver = MockDriver::new(2);
    driver.suboptimal_acquires.insert(0);
    let mut presenter = PresentationLoop::new(driver);

    let outcome = presenter.run_iteration().expect("iteration failed");
    assert_eq!(outcome, FrameOutcome::Presented { recreated: true });
    assert_eq!(presenter.driver().count(|e| matches!(e, Event::Present(..))), 1);
    assert_eq!(presenter.driver().recreations(), 1);
}

#[test]
fn test_minimized_window_recreates_once_after_restore() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));
    presenter.run_iteration().expect("iteration failed");

    presenter.driver_mut().extent = vk::Extent2D {
        width: 0,
        height: 0,
    };
    let index_while_minimized = presenter.frame_index();
    for _ in 0..3 {
        let outcome = presenter.run_iteration().expect("iteration failed");
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(presenter.frame_index(), index_while_minimized);
    }
    assert_eq!(
        presenter.driver().recreations(),
        0,
        "recreation attempted while minimized"
    );

    presenter.driver_mut().extent = vk::Extent2D {
        width: 1024,
        height: 768,
    };
    let outcome = presenter.run_iteration().expect("iteration failed");
    assert_eq!(outcome, FrameOutcome::Recreated);
    assert_eq!(presenter.driver().recreations(), 1);
    assert_eq!(
        presenter.driver().events.last(),
        Some(&Event::Recreate(1024, 768))
    );

    for _ in 0..3 {
        let outcome = presenter.run_iteration().expect("iteration failed");
        assert_eq!(outcome, FrameOutcome::Presented { recreated: false });
    }
    assert_eq!(presenter.driver().recreations(), 1);
}

#[test]
fn test_minimized_does_not_touch_slots() {
    let mut driver = MockDriver::new(2);
    driver.extent = vk::Extent2D {
        width: 640,
        height: 0,
    };
    let mut presenter = PresentationLoop::new(driver);

    for _ in 0..4 {
        assert_eq!(
            presenter.run_iteration().expect("iteration failed"),
            FrameOutcome::Skipped
        );
    }
    assert!(presenter.driver().events.is_empty());
    assert!(presenter.is_recreate_pending());
}

#[test]
fn test_zero_surface_extent_defers_recreation() {
    let mut driver = MockDriver::new(2);
    // The window still reports its old size but the surface is already 0x0.
    driver.out_of_date_acquires.insert(1);
    driver.deferred_recreates = 2;
    let mut presenter = PresentationLoop::new(driver);

    presenter.run_iteration().expect("iteration failed");
    let index = presenter.frame_index();

    for _ in 0..2 {
        assert_eq!(
            presenter.run_iteration().expect("deferral must not be fatal"),
            FrameOutcome::Skipped
        );
        assert!(presenter.is_recreate_pending());
        assert_eq!(presenter.generation(), 0);
        assert_eq!(presenter.state(), LoopState::Idle);
    }

    assert_eq!(
        presenter.run_iteration().expect("iteration failed"),
        FrameOutcome::Recreated
    );
    assert!(!presenter.is_recreate_pending());
    assert_eq!(presenter.generation(), 1);
    assert_eq!(presenter.frame_index(), index);
    assert_eq!(presenter.driver().count(|e| matches!(e, Event::Deferred)), 2);
    assert_eq!(presenter.driver().recreations(), 1);

    assert_eq!(
        presenter.run_iteration().expect("iteration failed"),
        FrameOutcome::Presented { recreated: false }
    );
}

#[test]
fn test_deferred_recreation_after_present_stays_pending() {
    let mut driver = MockDriver::new(2);
    driver.present_statuses.insert(0, PresentStatus::OutOfDate);
    driver.deferred_recreates = 1;
    let mut presenter = PresentationLoop::new(driver);

    assert_eq!(
        presenter.run_iteration().expect("iteration failed"),
        FrameOutcome::Presented { recreated: false }
    );
    assert_eq!(presenter.frame_index(), 1);
    assert!(presenter.is_recreate_pending());

    assert_eq!(
        presenter.run_iteration().expect("iteration failed"),
        FrameOutcome::Recreated
    );
    assert_eq!(presenter.generation(), 1);
}

#[test]
fn test_request_recreate() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));
    presenter.run_iteration().expect("iteration failed");

    presenter.request_recreate();
    assert_eq!(
        presenter.run_iteration().expect("iteration failed"),
        FrameOutcome::Recreated
    );
    assert!(!presenter.is_recreate_pending());
    assert_eq!(presenter.generation(), 1);
    assert_eq!(presenter.frame_index(), 1);
}

#[test]
fn test_draws_follow_loaded_vertices() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));

    for _ in 0..3 {
        presenter.run_iteration().expect("iteration failed");
    }
    assert!(
        presenter.driver().draws.iter().all(Vec::is_empty),
        "draw calls issued with no vertices loaded"
    );

    presenter.driver_mut().vertex_count = 3;
    presenter.run_iteration().expect("iteration failed");

    let last = presenter.driver().draws.last().expect("no frame recorded");
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].vertex_count, 3);
}

#[test]
fn test_fatal_acquire_error_escapes() {
    let mut driver = MockDriver::new(2);
    driver.lost_on_acquire = Some(1);
    let mut presenter = PresentationLoop::new(driver);

    presenter.run_iteration().expect("first iteration failed");
    let result = presenter.run_iteration();
    assert!(matches!(
        result,
        Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
    ));
    assert_eq!(presenter.driver().recreations(), 0);
}

#[test]
fn test_run_until_and_shutdown() {
    let mut presenter = PresentationLoop::new(MockDriver::new(2));

    let mut remaining = 5;
    let presented = presenter
        .run_until(|| {
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            false
        })
        .expect("loop failed");
    assert_eq!(presented, 5);

    presenter.shutdown().expect("shutdown failed");
    assert_eq!(presenter.driver().events.last(), Some(&Event::WaitIdle));
}
