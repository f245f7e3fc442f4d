//! Memory pool for descriptor sets.

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::descriptor::DescriptorSet;
use crate::descriptor::set_layout::DescriptorSetLayout;
use crate::Device;

/// Number of descriptors reserved per descriptor type in a default-sized pool.
const DEFAULT_POOL_CAPACITY: u32 = 100;

const DEFAULT_POOL_TYPES: [vk::DescriptorType; 11] = [
    vk::DescriptorType::SAMPLER,
    vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    vk::DescriptorType::SAMPLED_IMAGE,
    vk::DescriptorType::STORAGE_IMAGE,
    vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
    vk::DescriptorType::STORAGE_TEXEL_BUFFER,
    vk::DescriptorType::UNIFORM_BUFFER,
    vk::DescriptorType::STORAGE_BUFFER,
    vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
    vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
    vk::DescriptorType::INPUT_ATTACHMENT,
];

/// Wrapper around a [`VkDescriptorPool`](vk::DescriptorPool). The pool owns every set
/// allocated from it; sets hold an `Arc` of their pool and free themselves back into
/// it on drop (pools are created with `FREE_DESCRIPTOR_SET`).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorPool {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a new descriptor pool with explicit per-type sizes and set limit.
    pub fn new(
        device: Device,
        pool_sizes: &[vk::DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<Self> {
        let info = vk::DescriptorPoolCreateInfo::builder()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .build();
        let handle = unsafe { device.create_descriptor_pool(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorPool {handle:p}");
        Ok(Self {
            device,
            handle,
        })
    }

    /// Create a pool with a generous default size for every common descriptor type.
    /// Used for the per-thread pools in [`LocalPools`](crate::LocalPools).
    pub fn with_default_sizes(device: Device) -> Result<Self> {
        let pool_sizes = DEFAULT_POOL_TYPES
            .iter()
            .map(|ty| vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: DEFAULT_POOL_CAPACITY,
            })
            .collect::<Vec<_>>();
        let max_sets = DEFAULT_POOL_CAPACITY * pool_sizes.len() as u32;
        Self::new(device, pool_sizes.as_slice(), max_sets)
    }

    /// Allocate a descriptor set with the given layout from this pool.
    pub fn allocate(self: &Arc<Self>, layout: &DescriptorSetLayout) -> Result<DescriptorSet> {
        let layouts = [unsafe { layout.handle() }];
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.handle)
            .set_layouts(&layouts)
            .build();
        let handles = unsafe { self.device.allocate_descriptor_sets(&info)? };
        Ok(DescriptorSet::new(self.clone(), handles[0]))
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    /// Get unsafe access to the underlying `VkDescriptorPool` object.
    /// # Safety
    /// The caller must not destroy this handle or allocate from it directly.
    pub unsafe fn handle(&self) -> vk::DescriptorPool {
        self.handle
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorPool {:p}", self.handle);
        unsafe {
            self.device.destroy_descriptor_pool(self.handle, None);
        }
    }
}
