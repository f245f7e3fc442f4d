use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::command_buffer::{CommandBuffer, CommandBufferKind};
use crate::core::error::Error;
use crate::Device;

/// Wrapper around a [`VkCommandPool`](vk::CommandPool). A pool owns every command buffer
/// allocated from it: buffers hold an `Arc` of their pool, and the pool's destruction
/// releases any remaining buffer memory.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CommandPool {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::CommandPool,
    flags: vk::CommandPoolCreateFlags,
    queue_family: u32,
    queue: vk::Queue,
}

impl CommandPool {
    /// Create a new command pool for a queue family. The pool flags decide which
    /// [`CommandBufferKind`] its buffers get: `TRANSIENT` pools hand out one-time
    /// buffers, `RESET_COMMAND_BUFFER` pools hand out resettable ones.
    pub fn new(device: Device, family: u32, flags: vk::CommandPoolCreateFlags) -> Result<Self> {
        let info = vk::CommandPoolCreateInfo::builder()
            .flags(flags)
            .queue_family_index(family)
            .build();
        let handle = unsafe { device.create_command_pool(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkCommandPool {handle:p}");
        let queue = unsafe { device.get_device_queue(family, 0) };

        Ok(CommandPool {
            device,
            handle,
            flags,
            queue_family: family,
            queue,
        })
    }

    /// Allocate a command buffer from this pool. The buffer kind is fixed here, from
    /// the pool flags, and matched on every later use.
    pub fn allocate(self: &Arc<Self>, level: vk::CommandBufferLevel) -> Result<CommandBuffer> {
        let kind = if self
            .flags
            .contains(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        {
            CommandBufferKind::Resettable
        } else if self.flags.contains(vk::CommandPoolCreateFlags::TRANSIENT) {
            CommandBufferKind::OneTime
        } else {
            return Err(Error::CommandBufferStateViolation(
                "command pool created without TRANSIENT or RESET_COMMAND_BUFFER flags",
            )
            .into());
        };

        let info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.handle)
            .level(level)
            .command_buffer_count(1)
            .build();
        let handles = unsafe { self.device.allocate_command_buffers(&info)? };

        Ok(CommandBuffer::new(self.clone(), handles[0], level, kind))
    }

    /// The queue family this pool submits to.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// The queue command buffers from this pool are submitted to.
    pub(crate) fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    /// Get unsafe access to the underlying `VkCommandPool` object.
    /// # Safety
    /// The caller must not destroy this handle or allocate from it directly.
    pub unsafe fn handle(&self) -> vk::CommandPool {
        self.handle
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkCommandPool {:p}", self.handle);
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}
