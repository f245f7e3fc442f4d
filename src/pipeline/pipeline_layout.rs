//! Wrapper structs around `VkPipelineLayout` objects.

use anyhow::Result;
use ash::vk;

use crate::descriptor::set_layout::{DescriptorSetLayout, DescriptorSetLayoutCreateInfo};
use crate::Device;

/// Defines a range of Vulkan push constants, for manually defining a pipeline layout if
/// you cannot use shader reflection for whatever reason.
#[derive(Debug, Clone, Default, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Shader stages where this push constant range is used
    pub stage_flags: vk::ShaderStageFlags,
    /// Offset into the global push constant block of this range
    pub offset: u32,
    /// Size of this push constant range
    pub size: u32,
}

impl PushConstantRange {
    pub fn to_vk(&self) -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: self.stage_flags,
            offset: self.offset,
            size: self.size,
        }
    }
}

/// Define a pipeline layout, this includes all descriptor set layouts and push constant
/// ranges used by the pipeline.
/// # Shader reflection
/// With the `shader-reflection` feature this is deduced from the shader binaries; see
/// [`deduce_layout`](crate::pipeline::shader_reflection::deduce_layout).
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutCreateInfo {
    /// Descriptor set layouts for this pipeline layout, indexed by set number.
    /// Unused set numbers hold an empty entry.
    pub set_layouts: Vec<DescriptorSetLayoutCreateInfo>,
    /// Push constant ranges used in this pipeline.
    pub push_constants: Vec<PushConstantRange>,
}

/// A fully built Vulkan pipeline layout, owning the descriptor set layout objects it
/// was built from.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PipelineLayout {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::PipelineLayout,
    set_layouts: Vec<DescriptorSetLayout>,
}

impl PipelineLayout {
    /// Create a pipeline layout and its descriptor set layouts.
    ///
    /// The deduction producing the create info does not create native objects, so this
    /// is the single commit point: set layouts are built into RAII wrappers first, and
    /// a failure on any later step rolls the earlier ones back.
    pub fn new(device: Device, info: &PipelineLayoutCreateInfo) -> Result<Self> {
        let set_layouts = info
            .set_layouts
            .iter()
            .map(|layout_info| DescriptorSetLayout::new(device.clone(), layout_info))
            .collect::<Result<Vec<_>>>()?;
        let raw_layouts = set_layouts
            .iter()
            .map(|layout| unsafe { layout.handle() })
            .collect::<Vec<_>>();
        let push_constants = info
            .push_constants
            .iter()
            .map(|range| range.to_vk())
            .collect::<Vec<_>>();

        let vk_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(raw_layouts.as_slice())
            .push_constant_ranges(push_constants.as_slice())
            .build();
        let handle = unsafe { device.create_pipeline_layout(&vk_info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkPipelineLayout {handle:p}");

        Ok(Self {
            device,
            handle,
            set_layouts,
        })
    }

    /// The descriptor set layouts of this pipeline layout, indexed by set number.
    /// Use these to allocate descriptor sets compatible with the pipeline.
    pub fn set_layouts(&self) -> &[DescriptorSetLayout] {
        self.set_layouts.as_slice()
    }

    /// Get unsafe access to the internal `VkPipelineLayout`.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkPipelineLayout {:p}", self.handle);
        unsafe {
            self.device.destroy_pipeline_layout(self.handle, None);
        }
    }
}
