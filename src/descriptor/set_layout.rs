use anyhow::Result;
use ash::vk;

use crate::Device;

/// Describes a descriptor set layout: one entry per binding slot.
/// Generally you don't need to construct this manually, as shader reflection can infer
/// all information necessary; see
/// [`deduce_layout`](crate::pipeline::shader_reflection::deduce_layout).
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutCreateInfo {
    pub bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

/// A fully built Vulkan descriptor set layout.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSetLayout {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Create a new descriptor set layout. An empty binding list is valid and produces
    /// an empty layout, used to bridge gaps in the set indices of a pipeline layout.
    pub fn new(device: Device, info: &DescriptorSetLayoutCreateInfo) -> Result<Self> {
        let vk_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(info.bindings.as_slice())
            .build();
        let handle = unsafe { device.create_descriptor_set_layout(&vk_info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorSetLayout {handle:p}");
        Ok(Self {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkDescriptorSetLayout` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDescriptorSetLayout {:p}", self.handle);
        unsafe {
            self.device.destroy_descriptor_set_layout(self.handle, None);
        }
    }
}
