//! Wrappers for `VkBuffer` objects.
//!
//! A [`Buffer`] owns its vulkan handle and the device memory backing it. Buffers allocated
//! in host-visible memory ([`MemoryType::CpuToGpu`] or [`MemoryType::GpuToCpu`]) are
//! persistently mapped for as long as they live; use [`Buffer::mapped_slice`] or
//! [`Buffer::write`] to access that mapping. Both fail with
//! [`Error::UnmappableBuffer`](crate::Error::UnmappableBuffer) for device-local buffers.
//!
//! # Example
//!
//! ```no_run
//! # use obsidian::prelude::*;
//! # fn f(device: Device, mut alloc: DefaultAllocator) -> anyhow::Result<()> {
//! // Allocate a 16 byte uniform buffer in mappable memory.
//! let mut buf = Buffer::new(
//!     device.clone(),
//!     &mut alloc,
//!     16 as vk::DeviceSize,
//!     vk::BufferUsageFlags::UNIFORM_BUFFER,
//!     MemoryType::CpuToGpu,
//! )?;
//! // Write some arbitrary data through the persistent mapping.
//! let slice = buf.mapped_slice::<f32>()?;
//! slice.copy_from_slice(&[1.0, 0.0, 1.0, 1.0]);
//! # Ok(())
//! # }
//! ```

use std::ffi::c_void;
use std::ptr::NonNull;

use anyhow::Result;
use ash::vk;

use crate::allocator::default_allocator::Allocation;
use crate::allocator::traits::Allocation as _;
use crate::allocator::traits::Allocator;
use crate::core::error::Error;
use crate::{DefaultAllocator, Device, MemoryType};

/// Wrapper around a [`VkBuffer`](vk::Buffer) and the memory allocated for it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Buffer {
    #[derivative(Debug = "ignore")]
    device: Device,
    #[derivative(Debug = "ignore")]
    #[allow(dead_code)]
    memory: Allocation,
    pointer: Option<NonNull<c_void>>,
    handle: vk::Buffer,
    size: vk::DeviceSize,
}

// SAFETY: The unsafe part of this is the mapped pointer, but this is a pointer to GPU memory
// so its value is not dropped when sending this to a different thread.
unsafe impl Send for Buffer {}

impl Buffer {
    /// Allocate a new buffer with a specific size, at a specific memory location.
    /// All usage flags must be given.
    pub fn new(
        device: Device,
        allocator: &mut DefaultAllocator,
        size: impl Into<vk::DeviceSize>,
        usage: vk::BufferUsageFlags,
        location: MemoryType,
    ) -> Result<Self> {
        let size = size.into();
        let handle = unsafe {
            device.create_buffer(
                &vk::BufferCreateInfo::builder()
                    .size(size)
                    .usage(usage)
                    .sharing_mode(vk::SharingMode::EXCLUSIVE)
                    .build(),
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkBuffer {handle:p} (size = {size} bytes)");

        let requirements = unsafe { device.get_buffer_memory_requirements(handle) };
        let memory = allocator.allocate("buffer", &requirements, location)?;

        unsafe { device.bind_buffer_memory(handle, memory.memory(), memory.offset())? };

        Ok(Self {
            device,
            pointer: memory.mapped_ptr(),
            memory,
            handle,
            size,
        })
    }

    /// Allocate a new buffer with device local memory (VRAM). This is usually the correct
    /// memory location for most buffers.
    pub fn new_device_local(
        device: Device,
        allocator: &mut DefaultAllocator,
        size: impl Into<vk::DeviceSize>,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        Self::new(device, allocator, size, usage, MemoryType::GpuOnly)
    }

    /// Allocate a staging buffer for uploads: transfer source usage, mappable memory.
    pub fn staging(
        device: Device,
        allocator: &mut DefaultAllocator,
        size: impl Into<vk::DeviceSize>,
    ) -> Result<Self> {
        Self::new(
            device,
            allocator,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryType::CpuToGpu,
        )
    }

    /// Copy `data` into the buffer through its memory map.
    /// # Errors
    /// * Fails with [`Error::UnmappableBuffer`] if the buffer has no memory map.
    /// * Fails with [`Error::BufferWriteOutOfRange`] if `data` is larger than the buffer.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() as vk::DeviceSize > self.size {
            return Err(Error::BufferWriteOutOfRange {
                requested: data.len() as u64,
                size: self.size,
            }
            .into());
        }
        let slice = self.mapped_slice::<u8>()?;
        slice[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Obtain a slice to the mapped memory of this buffer.
    /// # Errors
    /// Fails with [`Error::UnmappableBuffer`] if this buffer is not mappable
    /// (not `HOST_VISIBLE`).
    pub fn mapped_slice<T>(&mut self) -> Result<&mut [T]> {
        if let Some(pointer) = self.pointer {
            Ok(unsafe {
                std::slice::from_raw_parts_mut(
                    pointer.cast::<T>().as_ptr(),
                    self.size as usize / std::mem::size_of::<T>(),
                )
            })
        } else {
            Err(Error::UnmappableBuffer.into())
        }
    }

    /// True if this buffer has a mapped pointer and thus can directly be written to.
    pub fn is_mapped(&self) -> bool {
        self.pointer.is_some()
    }

    /// Obtain a handle to the raw vulkan buffer object.
    /// # Safety
    /// * The caller must make sure to not use this handle after `self` is dropped.
    /// * The caller must not call `vkDestroyBuffer` on this handle.
    pub unsafe fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Get the size of this buffer.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkBuffer {:p}", self.handle);
        unsafe {
            self.device.destroy_buffer(self.handle, None);
        }
    }
}
