//! Re-exports the most commonly used obsidian types.

pub use ash::vk;

pub use crate::core::app_info::*;
pub use crate::core::debug::DebugMessenger;
pub use crate::core::device::Device;
pub use crate::core::error::{Error, SwapchainConfigError};
pub use crate::core::init::initialize;
pub use crate::core::instance::Instance;
pub use crate::core::physical_device::PhysicalDevice;
pub use crate::core::queue::{QueueFamilyAssignment, QueueRole};

pub use crate::wsi::surface::Surface;
pub use crate::wsi::swapchain::Swapchain;
pub use crate::wsi::window::{HeadlessWindow, WindowInterface, WindowSize};

pub use crate::allocator::default_allocator::DefaultAllocator;
pub use crate::allocator::memory_type::MemoryType;
pub use crate::allocator::traits::*;

pub use crate::buffer::Buffer;
pub use crate::image::{Image, ImageView};
pub use crate::render_pass::{Framebuffer, RenderPass};
pub use crate::sampler::Sampler;

pub use crate::command_buffer::command_pool::CommandPool;
pub use crate::command_buffer::{CommandBuffer, CommandBufferKind};
pub use crate::descriptor::descriptor_pool::DescriptorPool;
pub use crate::descriptor::set_layout::{DescriptorSetLayout, DescriptorSetLayoutCreateInfo};
pub use crate::descriptor::DescriptorSet;
pub use crate::pool::LocalPools;

pub use crate::pipeline::pipeline_layout::{
    PipelineLayout, PipelineLayoutCreateInfo, PushConstantRange,
};
pub use crate::pipeline::shader::ShaderCreateInfo;
pub use crate::pipeline::{GraphicsPipeline, GraphicsPipelineBuilder};

pub use crate::sync::fence::Fence;
pub use crate::sync::semaphore::Semaphore;
