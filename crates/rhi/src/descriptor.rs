//! Descriptor sets for the per-frame uniform block.
//!
//! Every pipeline reads a single uniform buffer at set 0, binding 0. One
//! descriptor set is allocated per frame slot, each pointing at that slot's
//! uniform buffer.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::buffer::DeviceBuffer;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Binding slot of the scene uniform block.
pub const UNIFORM_BINDING: u32 = 0;

/// Layout binding for a uniform buffer visible to the vertex and fragment stages.
#[inline]
pub fn uniform_buffer_binding(binding: u32) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
}

/// Descriptor set layout wrapper.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self { device, layout })
    }

    /// The layout shared by every pipeline: one uniform block at binding 0.
    pub fn scene_uniforms(device: Arc<Device>) -> RhiResult<Self> {
        Self::new(device, &[uniform_buffer_binding(UNIFORM_BINDING)])
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Descriptor pool wrapper. Sets are released with the pool.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    /// Creates a pool able to hold `set_count` single-uniform-buffer sets.
    pub fn for_uniform_sets(device: Arc<Device>, set_count: u32) -> RhiResult<Self> {
        let pool_size = vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(set_count);

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(set_count)
            .pool_sizes(std::slice::from_ref(&pool_size));

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!("Created descriptor pool: max_sets={}", set_count);

        Ok(Self {
            device,
            pool,
            max_sets: set_count,
        })
    }

    /// Allocates `count` sets with `layout`.
    ///
    /// # Errors
    ///
    /// Fails if `count` exceeds the pool's capacity.
    pub fn allocate(
        &self,
        layout: &DescriptorSetLayout,
        count: usize,
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        if count > self.max_sets as usize {
            return Err(RhiError::InvalidHandle(format!(
                "Cannot allocate {} descriptor sets from a pool of {}",
                count, self.max_sets
            )));
        }

        let layouts = vec![layout.handle(); count];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };

        debug!("Allocated {} descriptor set(s)", sets.len());

        Ok(sets)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// Points `set`'s uniform binding at the whole of `buffer`.
pub fn write_uniform_buffer(device: &Device, set: vk::DescriptorSet, buffer: &DeviceBuffer) {
    let buffer_info = vk::DescriptorBufferInfo::default()
        .buffer(buffer.handle())
        .offset(0)
        .range(buffer.size());

    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(UNIFORM_BINDING)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(std::slice::from_ref(&buffer_info));

    unsafe {
        device
            .handle()
            .update_descriptor_sets(std::slice::from_ref(&write), &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffer_binding() {
        let binding = uniform_buffer_binding(UNIFORM_BINDING);
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.descriptor_count, 1);
        assert!(binding.stage_flags.contains(vk::ShaderStageFlags::VERTEX));
        assert!(binding.stage_flags.contains(vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn test_pool_rejects_allocation_beyond_capacity() {
        crate::test_support::with_device(|device| {
            let layout = DescriptorSetLayout::scene_uniforms(device.clone()).unwrap();
            let pool = DescriptorPool::for_uniform_sets(device, 2).unwrap();

            assert!(pool.allocate(&layout, 3).is_err());
            assert_eq!(pool.allocate(&layout, 2).unwrap().len(), 2);
        });
    }
}
