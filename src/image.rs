//! Wrappers for `VkImage` and `VkImageView` objects.
//!
//! An [`Image`] owns its vulkan handle, the memory allocated for it and a default
//! [`ImageView`] over its full subresource range. The image layout is tracked on the CPU
//! side; [`Image::transition_layout`] records a pipeline barrier for one of the supported
//! transition pairs and fails with
//! [`Error::UnsupportedLayoutTransition`](crate::Error::UnsupportedLayoutTransition)
//! for anything else.

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::allocator::default_allocator::Allocation;
use crate::allocator::traits::Allocation as _;
use crate::allocator::traits::Allocator;
use crate::command_buffer::CommandBuffer;
use crate::core::error::Error;
use crate::{Buffer, DefaultAllocator, Device, MemoryType, Sampler};

/// Wrapper around a [`VkImageView`](vk::ImageView). Owns the view, not the image it
/// was created from.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ImageView {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::ImageView,
}

impl ImageView {
    /// Create a 2D view over the full subresource range of an image.
    pub fn new(
        device: Device,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        let handle = unsafe {
            device
                .create_image_view(&info, None)
                .map_err(Error::ImageViewCreationFailed)?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImageView {handle:p}");
        Ok(ImageView {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkImageView` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::ImageView {
        self.handle
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImageView {:p}", self.handle);
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}

/// Wrapper around a [`VkImage`](vk::Image) with its backing memory and default view.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Image {
    #[derivative(Debug = "ignore")]
    device: Device,
    #[derivative(Debug = "ignore")]
    #[allow(dead_code)]
    memory: Allocation,
    handle: vk::Image,
    // Wrapped in an Option so Drop can destroy the view before the image.
    // Always Some(_) outside of Drop.
    view: Option<ImageView>,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    extent: vk::Extent2D,
    layout: vk::ImageLayout,
    sampler: Option<Arc<Sampler>>,
}

impl Image {
    /// Allocate a new 2D image in device-local memory, with a view over its full
    /// subresource range. The image starts in `VK_IMAGE_LAYOUT_UNDEFINED`.
    pub fn new(
        device: Device,
        allocator: &mut DefaultAllocator,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .build();
        let handle = unsafe { device.create_image(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImage {handle:p} ({width}x{height})");

        let requirements = unsafe { device.get_image_memory_requirements(handle) };
        let memory = allocator.allocate("image", &requirements, MemoryType::GpuOnly)?;
        unsafe { device.bind_image_memory(handle, memory.memory(), memory.offset())? };

        let view = ImageView::new(device.clone(), handle, format, aspect)?;

        Ok(Image {
            device,
            memory,
            handle,
            view: Some(view),
            format,
            aspect,
            extent: vk::Extent2D {
                width,
                height,
            },
            layout: vk::ImageLayout::UNDEFINED,
            sampler: None,
        })
    }

    /// Record a layout transition barrier into `cmd` and update the tracked layout.
    ///
    /// Supported pairs:
    /// * undefined → transfer destination
    /// * transfer destination → shader read only
    /// * undefined → depth-stencil attachment
    /// # Errors
    /// * [`Error::UnsupportedLayoutTransition`] for any other pair.
    /// * [`Error::CommandBufferStateViolation`] if `cmd` is not recording.
    pub fn transition_layout(
        &mut self,
        cmd: &CommandBuffer,
        target: vk::ImageLayout,
    ) -> Result<()> {
        if !cmd.is_recording() {
            return Err(
                Error::CommandBufferStateViolation("layout transition outside begin/end").into(),
            );
        }
        let (src_access, dst_access, src_stage, dst_stage) = match (self.layout, target) {
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            ),
            (from, to) => {
                return Err(Error::UnsupportedLayoutTransition {
                    from,
                    to,
                }
                .into())
            }
        };

        let barrier = vk::ImageMemoryBarrier::builder()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .old_layout(self.layout)
            .new_layout(target)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.handle)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd.handle(),
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&barrier),
            );
        }
        self.layout = target;
        Ok(())
    }

    /// Record a full-extent copy from a (staging) buffer into this image.
    /// The image must be in the transfer destination layout.
    /// # Errors
    /// * [`Error::UnsupportedLayoutTransition`] if the image is not in transfer destination layout.
    /// * [`Error::CommandBufferStateViolation`] if `cmd` is not recording.
    pub fn copy_from_buffer(&self, cmd: &CommandBuffer, buffer: &Buffer) -> Result<()> {
        if !cmd.is_recording() {
            return Err(
                Error::CommandBufferStateViolation("buffer to image copy outside begin/end").into(),
            );
        }
        if self.layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL {
            return Err(Error::UnsupportedLayoutTransition {
                from: self.layout,
                to: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            }
            .into());
        }
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: self.aspect,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width: self.extent.width,
                height: self.extent.height,
                depth: 1,
            })
            .build();
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                cmd.handle(),
                buffer.handle(),
                self.handle,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&region),
            );
        }
        Ok(())
    }

    /// Bind a sampler to this image, to be used when writing combined image-sampler
    /// descriptors.
    pub fn bind_sampler(&mut self, sampler: Arc<Sampler>) {
        self.sampler = Some(sampler);
    }

    /// The sampler bound to this image, if any.
    pub fn sampler(&self) -> Option<&Arc<Sampler>> {
        self.sampler.as_ref()
    }

    /// The default view over this image's full subresource range.
    pub fn view(&self) -> &ImageView {
        // Always Some(_) outside of Drop.
        self.view.as_ref().unwrap()
    }

    /// The currently tracked image layout.
    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get unsafe access to the underlying `VkImage` object.
    /// # Safety
    /// * The caller must make sure to not use this handle after `self` is dropped.
    /// * The caller must not call `vkDestroyImage` on this handle.
    pub unsafe fn handle(&self) -> vk::Image {
        self.handle
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImage {:p}", self.handle);
        // The view references the image, destroy it first.
        self.view.take();
        unsafe {
            self.device.destroy_image(self.handle, None);
        }
    }
}
