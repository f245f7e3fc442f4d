//! Descriptor set layouts, pools and sets.
//!
//! Descriptor sets are allocated from a [`DescriptorPool`](descriptor_pool::DescriptorPool)
//! and hold their pool alive. Writes are checked: an image descriptor write requires a
//! sampler to be bound to the image first.

pub mod descriptor_pool;
pub mod set_layout;

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::descriptor::descriptor_pool::DescriptorPool;
use crate::{Buffer, Image};

/// Wrapper around a [`VkDescriptorSet`](vk::DescriptorSet), allocated from a
/// [`DescriptorPool`]. Freed back into the pool on drop.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSet {
    #[derivative(Debug = "ignore")]
    pool: Arc<DescriptorPool>,
    handle: vk::DescriptorSet,
}

impl DescriptorSet {
    pub(crate) fn new(pool: Arc<DescriptorPool>, handle: vk::DescriptorSet) -> Self {
        DescriptorSet {
            pool,
            handle,
        }
    }

    /// Write a whole-buffer descriptor into a binding slot of this set.
    pub fn write_buffer(
        &self,
        binding: u32,
        ty: vk::DescriptorType,
        buffer: &Buffer,
    ) -> Result<()> {
        let buffer_info = vk::DescriptorBufferInfo {
            buffer: unsafe { buffer.handle() },
            offset: 0,
            range: vk::WHOLE_SIZE,
        };
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.handle)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(ty)
            .buffer_info(std::slice::from_ref(&buffer_info))
            .build();
        unsafe {
            self.pool
                .device()
                .update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
        Ok(())
    }

    /// Write an image descriptor into a binding slot of this set, using the image's
    /// bound sampler and tracked layout.
    /// # Errors
    /// Fails with [`Error::NoSamplerBound`] if the image has no sampler bound.
    pub fn write_image(&self, binding: u32, ty: vk::DescriptorType, image: &Image) -> Result<()> {
        let Some(sampler) = image.sampler() else {
            return Err(Error::NoSamplerBound.into());
        };
        let image_info = vk::DescriptorImageInfo {
            sampler: unsafe { sampler.handle() },
            image_view: unsafe { image.view().handle() },
            image_layout: image.layout(),
        };
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.handle)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(ty)
            .image_info(std::slice::from_ref(&image_info))
            .build();
        unsafe {
            self.pool
                .device()
                .update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
        Ok(())
    }

    /// Write several image descriptors to consecutive binding slots starting at `offset`.
    /// # Errors
    /// Fails with [`Error::NoSamplerBound`] if any image has no sampler bound; no writes
    /// are issued in that case.
    pub fn write_images(
        &self,
        offset: u32,
        ty: vk::DescriptorType,
        images: &[&Image],
    ) -> Result<()> {
        let image_infos = images
            .iter()
            .map(|image| {
                let Some(sampler) = image.sampler() else {
                    return Err(Error::NoSamplerBound.into());
                };
                Ok(vk::DescriptorImageInfo {
                    sampler: unsafe { sampler.handle() },
                    image_view: unsafe { image.view().handle() },
                    image_layout: image.layout(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let writes = image_infos
            .iter()
            .enumerate()
            .map(|(i, info)| {
                vk::WriteDescriptorSet::builder()
                    .dst_set(self.handle)
                    .dst_binding(offset + i as u32)
                    .dst_array_element(0)
                    .descriptor_type(ty)
                    .image_info(std::slice::from_ref(info))
                    .build()
            })
            .collect::<Vec<_>>();
        unsafe {
            self.pool
                .device()
                .update_descriptor_sets(writes.as_slice(), &[]);
        }
        Ok(())
    }

    /// The raw vulkan handle, for binding through the device.
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .pool
                .device()
                .free_descriptor_sets(self.pool.handle(), std::slice::from_ref(&self.handle));
        }
    }
}
