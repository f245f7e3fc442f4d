use std::slice;

use anyhow::Result;
use ash::vk;

use crate::Device;

/// Wrapper around a [`VkFence`](vk::Fence) object. Fences are used for CPU-GPU sync.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Fence {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Fence,
}

impl Fence {
    /// Create a new fence, possibly in the signaled status.
    pub fn new(device: Device, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::builder().flags(flags).build();
        let handle = unsafe { device.create_fence(&info, None)? };
        Ok(Fence {
            device,
            handle,
        })
    }

    /// Waits for the fence to be signaled with no timeout. Note that this is a blocking call.
    pub fn wait(&self) -> Result<()> {
        self.wait_timeout(u64::MAX)
    }

    /// Waits for the fence to be signaled for at most `timeout` nanoseconds. An expired
    /// timeout surfaces as the `VK_TIMEOUT` error code.
    pub fn wait_timeout(&self, timeout: u64) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(slice::from_ref(&self.handle), true, timeout)?
        };
        Ok(())
    }

    /// Resets the fence to the unsignaled status.
    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.reset_fences(slice::from_ref(&self.handle))? };
        Ok(())
    }

    /// Get unsafe access to the underlying `VkFence` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::Fence {
        self.handle
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.handle, None);
        }
    }
}
