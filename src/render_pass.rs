//! Thin RAII wrappers around `VkRenderPass` and `VkFramebuffer` objects.

use anyhow::Result;
use ash::vk;

use crate::image::ImageView;
use crate::Device;

/// Wrapper around a [`VkRenderPass`](vk::RenderPass).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RenderPass {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::RenderPass,
}

impl RenderPass {
    /// Create a render pass from explicit attachment, subpass and dependency descriptions.
    pub fn new(device: Device, info: &vk::RenderPassCreateInfo) -> Result<Self> {
        let handle = unsafe { device.create_render_pass(info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkRenderPass {handle:p}");
        Ok(RenderPass {
            device,
            handle,
        })
    }

    /// Create a single-subpass forward pass rendering into one color attachment that is
    /// presented afterwards, with a cleared depth-stencil attachment. This matches the
    /// attachments a [`Swapchain`](crate::Swapchain) provides.
    pub fn new_simple(
        device: Device,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<Self> {
        let attachments = [
            vk::AttachmentDescription {
                format: color_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                ..Default::default()
            },
            vk::AttachmentDescription {
                format: depth_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                ..Default::default()
            },
        ];
        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref))
            .depth_stencil_attachment(&depth_ref)
            .build();
        let dependency = vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ..Default::default()
        };
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency))
            .build();
        Self::new(device, &info)
    }

    /// Get unsafe access to the underlying `VkRenderPass` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::RenderPass {
        self.handle
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkRenderPass {:p}", self.handle);
        unsafe {
            self.device.destroy_render_pass(self.handle, None);
        }
    }
}

/// Wrapper around a [`VkFramebuffer`](vk::Framebuffer). Does not own the attachment
/// views; the caller keeps them alive (swapchain views are rebuilt on recreation, so
/// framebuffers must be rebuilt along with them).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Framebuffer {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a framebuffer binding the given attachment views to a render pass.
    pub fn new(
        device: Device,
        render_pass: &RenderPass,
        attachments: &[&ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let views = attachments
            .iter()
            .map(|view| unsafe { view.handle() })
            .collect::<Vec<_>>();
        let info = vk::FramebufferCreateInfo::builder()
            .render_pass(unsafe { render_pass.handle() })
            .attachments(views.as_slice())
            .width(extent.width)
            .height(extent.height)
            .layers(1)
            .build();
        let handle = unsafe { device.create_framebuffer(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkFramebuffer {handle:p}");
        Ok(Framebuffer {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkFramebuffer` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::Framebuffer {
        self.handle
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkFramebuffer {:p}", self.handle);
        unsafe {
            self.device.destroy_framebuffer(self.handle, None);
        }
    }
}
