//! Wrapper for a `VkSampler` object.

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::Device;

/// Wrapper around a [`VkSampler`](vk::Sampler). Samplers are bound to images before
/// writing combined image-sampler descriptors.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Sampler {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Sampler,
}

impl Sampler {
    /// Create a new sampler with linear filtering and the given addressing and compare
    /// behavior. Anisotropy, when enabled, is clamped to the device limit.
    pub fn new(
        device: Device,
        address_mode: vk::SamplerAddressMode,
        border_color: vk::BorderColor,
        compare_op: vk::CompareOp,
        anisotropy: bool,
    ) -> Result<Arc<Self>> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .mip_lod_bias(0.0)
            .anisotropy_enable(anisotropy)
            .max_anisotropy(device.properties().limits.max_sampler_anisotropy)
            .compare_enable(compare_op != vk::CompareOp::NEVER)
            .compare_op(compare_op)
            .min_lod(0.0)
            .max_lod(0.0)
            .border_color(border_color)
            .unnormalized_coordinates(false)
            .build();
        let handle = unsafe { device.create_sampler(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkSampler {handle:p}");
        Ok(Arc::new(Sampler {
            device,
            handle,
        }))
    }

    /// Create a sampler with default settings: repeat addressing, opaque black border,
    /// no compare, anisotropy on.
    pub fn default(device: Device) -> Result<Arc<Self>> {
        Self::new(
            device,
            vk::SamplerAddressMode::REPEAT,
            vk::BorderColor::INT_OPAQUE_BLACK,
            vk::CompareOp::NEVER,
            true,
        )
    }

    /// Get unsafe access to the underlying `VkSampler` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::Sampler {
        self.handle
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSampler {:p}", self.handle);
        unsafe {
            self.device.destroy_sampler(self.handle, None);
        }
    }
}
