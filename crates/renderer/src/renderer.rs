//! Vulkan frame driver.
//!
//! [`Renderer`] is the explicitly owned context object behind the
//! presentation loop: it creates every Vulkan resource at startup and
//! implements [`FrameDriver`] on top of them.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use trivis_core::Config;
use trivis_platform::{Surface, Window};
use trivis_rhi::buffer::{BufferUsage, DeviceBuffer};
use trivis_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, write_uniform_buffer};
use trivis_rhi::device::Device;
use trivis_rhi::instance::Instance;
use trivis_rhi::physical_device::select_physical_device;
use trivis_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use trivis_rhi::render_pass::RenderPass;
use trivis_rhi::shader::{Shader, ShaderStage};
use trivis_rhi::swapchain::{AcquireStatus, PresentStatus, RecreateStatus, Swapchain};
use trivis_rhi::upload::UploadContext;
use trivis_rhi::vertex::{TriangleVertex, VertexLayout, WireframeVertex};
use trivis_rhi::{RhiError, RhiResult};
use trivis_scene::Camera;

use crate::depth_buffer::find_depth_format;
use crate::frame_slots::FrameSlots;
use crate::geometry::{GeometryBatch, GeometryKind};
use crate::presenter::FrameDriver;
use crate::recorder::{DrawCall, FrameRecording, clear_values, plan_draws, record_frame};
use crate::targets::RenderTargets;
use crate::ubo::SceneUniforms;

/// Owns every Vulkan object needed to present the loaded geometry.
///
/// # Resource Destruction Order
///
/// Fields drop in declaration order after `Drop` drained the device:
/// per-frame resources, geometry, pipelines, swapchain targets, render pass,
/// then the device, the surface and finally the instance.
pub struct Renderer {
    frame_slots: FrameSlots,
    uniform_buffers: Vec<DeviceBuffer>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    // Kept alive for the descriptor sets above.
    _descriptor_pool: DescriptorPool,
    batches: Vec<GeometryBatch>,
    upload: UploadContext,
    triangle_pipeline: Pipeline,
    wireframe_pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
    _descriptor_set_layout: DescriptorSetLayout,
    targets: RenderTargets,
    render_pass: RenderPass,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,

    camera: Camera,
    clear_color: [f32; 4],
    colors: [[f32; 4]; 2],
    window_extent: vk::Extent2D,
}

impl Renderer {
    /// Creates the renderer for `window` with the settings in `config`.
    ///
    /// # Errors
    ///
    /// Any failure while creating Vulkan resources is returned; there is no
    /// partial renderer.
    pub fn new(window: &Window, config: &Config) -> RhiResult<Self> {
        let window_extent = window.extent();
        info!(
            "Initializing Vulkan renderer ({}x{})",
            window_extent.width, window_extent.height
        );

        let surface_extensions = window
            .surface_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let instance = Instance::new(config.graphics.validation, &surface_extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            window_extent,
            None,
        )?;

        let depth_format = find_depth_format(&instance, device.physical_device())?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format(), Some(depth_format))?;
        let targets = RenderTargets::new(device.clone(), swapchain, &render_pass)?;

        let descriptor_set_layout = DescriptorSetLayout::scene_uniforms(device.clone())?;
        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()])?;

        let triangle_pipeline = Self::create_pipeline::<TriangleVertex>(
            &device,
            GeometryKind::Triangles,
            &config.shaders.triangle_vertex,
            &config.shaders.triangle_fragment,
            &render_pass,
            &pipeline_layout,
        )?;
        let wireframe_pipeline = Self::create_pipeline::<WireframeVertex>(
            &device,
            GeometryKind::Wireframe,
            &config.shaders.wireframe_vertex,
            &config.shaders.wireframe_fragment,
            &render_pass,
            &pipeline_layout,
        )?;

        let frame_slots = FrameSlots::new(device.clone(), config.graphics.frames_in_flight)?;
        let frame_count = frame_slots.len();

        let uniform_buffers = (0..frame_count)
            .map(|_| {
                DeviceBuffer::new(
                    device.clone(),
                    BufferUsage::Uniform,
                    SceneUniforms::SIZE as vk::DeviceSize,
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let descriptor_pool = DescriptorPool::for_uniform_sets(device.clone(), frame_count as u32)?;
        let descriptor_sets = descriptor_pool.allocate(&descriptor_set_layout, frame_count)?;
        for (&set, buffer) in descriptor_sets.iter().zip(&uniform_buffers) {
            write_uniform_buffer(&device, set, buffer);
        }

        let upload = UploadContext::new(device.clone())?;
        let batches = GeometryKind::ALL
            .into_iter()
            .map(GeometryBatch::empty)
            .collect();

        let scene = &config.scene;
        let camera = Camera::new(scene.camera_distance, scene.fov_degrees, scene.near, scene.far);

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, depth {:?}",
            targets.swapchain().image_count(),
            frame_count,
            depth_format
        );

        Ok(Self {
            frame_slots,
            uniform_buffers,
            descriptor_sets,
            _descriptor_pool: descriptor_pool,
            batches,
            upload,
            triangle_pipeline,
            wireframe_pipeline,
            pipeline_layout,
            _descriptor_set_layout: descriptor_set_layout,
            targets,
            render_pass,
            device,
            surface,
            instance,
            camera,
            clear_color: config.graphics.clear_color,
            colors: scene.colors,
            window_extent,
        })
    }

    fn create_pipeline<V: VertexLayout>(
        device: &Arc<Device>,
        kind: GeometryKind,
        vertex_path: &Path,
        fragment_path: &Path,
        render_pass: &RenderPass,
        layout: &PipelineLayout,
    ) -> RhiResult<Pipeline> {
        let vertex = Shader::from_spirv_file(device.clone(), vertex_path, ShaderStage::Vertex)?;
        let fragment =
            Shader::from_spirv_file(device.clone(), fragment_path, ShaderStage::Fragment)?;

        // Shader modules may be destroyed as soon as the pipeline exists.
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex)
            .fragment_shader(&fragment)
            .vertex_layout::<V>()
            .topology(kind.topology())
            .cull_mode(kind.cull_mode())
            .depth_test_enable(true)
            .render_pass(render_pass)
            .build(device.clone(), layout)?;

        debug!("Created {} pipeline", kind.name());
        Ok(pipeline)
    }

    /// Uploads new geometry, replacing whatever was loaded before.
    ///
    /// Waits for the device to go idle so no in-flight frame still reads the
    /// old vertex buffers.
    pub fn load_geometry(
        &mut self,
        triangles: &[TriangleVertex],
        wireframe: &[WireframeVertex],
    ) -> RhiResult<()> {
        self.device.wait_idle()?;

        let triangles = GeometryBatch::upload(&self.upload, GeometryKind::Triangles, triangles)?;
        let wireframe = GeometryBatch::upload(&self.upload, GeometryKind::Wireframe, wireframe)?;
        self.batches = vec![triangles, wireframe];

        Ok(())
    }

    /// Records the framebuffer extent reported by the window.
    pub fn set_window_extent(&mut self, extent: vk::Extent2D) {
        self.window_extent = extent;
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[inline]
    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.targets.extent()
    }

    #[inline]
    pub fn swapchain_format(&self) -> vk::Format {
        self.targets.swapchain().format()
    }

    /// Vertex count per loaded geometry kind.
    pub fn vertex_counts(&self) -> Vec<(GeometryKind, u32)> {
        self.batches
            .iter()
            .map(|batch| (batch.kind(), batch.vertex_count()))
            .collect()
    }

    fn pipeline(&self, kind: GeometryKind) -> &Pipeline {
        match kind {
            GeometryKind::Triangles => &self.triangle_pipeline,
            GeometryKind::Wireframe => &self.wireframe_pipeline,
        }
    }

    fn draw_calls(&self) -> Vec<DrawCall> {
        plan_draws(self.batches.iter().filter_map(|batch| {
            batch.buffer().map(|buffer| DrawCall {
                pipeline: self.pipeline(batch.kind()).handle(),
                vertex_buffer: buffer.handle(),
                vertex_count: batch.vertex_count(),
            })
        }))
    }

    fn uniform_buffer(&self, slot: usize) -> RhiResult<&DeviceBuffer> {
        self.uniform_buffers
            .get(slot)
            .ok_or_else(|| RhiError::InvalidHandle(format!("No uniform buffer for slot {}", slot)))
    }

    fn descriptor_set(&self, slot: usize) -> RhiResult<vk::DescriptorSet> {
        self.descriptor_sets
            .get(slot)
            .copied()
            .ok_or_else(|| RhiError::InvalidHandle(format!("No descriptor set for slot {}", slot)))
    }
}

impl FrameDriver for Renderer {
    fn frame_count(&self) -> usize {
        self.frame_slots.len()
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.window_extent
    }

    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        self.frame_slots.wait(slot)
    }

    fn acquire_image(&mut self, slot: usize) -> RhiResult<AcquireStatus> {
        let frame = self.frame_slots.acquire_slot(slot);
        self.targets
            .swapchain()
            .acquire_next_image(frame.image_available.handle())
    }

    fn update_uniforms(&mut self, slot: usize) -> RhiResult<()> {
        let extent = self.targets.extent();
        let uniforms = SceneUniforms::new(
            self.camera.view_projection(extent.width, extent.height),
            self.colors,
        );
        self.uniform_buffer(slot)?
            .copy_to_device(std::slice::from_ref(&uniforms))
    }

    fn record(&mut self, slot: usize, image_index: u32) -> RhiResult<()> {
        let draws = self.draw_calls();
        let clear_values = clear_values(self.clear_color, self.targets.has_depth());

        record_frame(&FrameRecording {
            command_buffer: &self.frame_slots.acquire_slot(slot).command_buffer,
            render_pass: self.render_pass.handle(),
            framebuffer: self.targets.framebuffer(image_index)?,
            extent: self.targets.extent(),
            clear_values: &clear_values,
            pipeline_layout: self.pipeline_layout.handle(),
            descriptor_set: self.descriptor_set(slot)?,
            draws: &draws,
        })
    }

    fn reset_slot_fence(&mut self, slot: usize) -> RhiResult<()> {
        // Already signaled after `wait_for_slot`, so this only resets.
        self.frame_slots.wait_and_reset(slot)
    }

    fn submit(&mut self, slot: usize) -> RhiResult<()> {
        let frame = self.frame_slots.acquire_slot(slot);

        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished.handle()];
        let command_buffers = [frame.command_buffer.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.in_flight.handle())
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> RhiResult<PresentStatus> {
        let frame = self.frame_slots.acquire_slot(slot);
        self.targets.swapchain().present(
            self.device.queues().present_queue(),
            image_index,
            frame.render_finished.handle(),
        )
    }

    fn recreate(&mut self, extent: vk::Extent2D) -> RhiResult<RecreateStatus> {
        self.targets.recreate(
            &self.instance,
            self.surface.handle(),
            extent,
            &self.render_pass,
        )
    }

    fn wait_idle(&mut self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }
        info!("Renderer destroyed");
    }
}
