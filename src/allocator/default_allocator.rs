//! Contains a default allocator type based on the [`gpu_allocator`] crate that is good for most needs.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ash::vk;
use gpu_allocator::vulkan as vk_alloc;
use gpu_allocator::vulkan::AllocationScheme;

use crate::allocator::memory_type::MemoryType;
use crate::allocator::traits;
use crate::core::error::Error;
use crate::{Allocator, Device, Instance, PhysicalDevice};

/// The default allocator. This calls into the `gpu_allocator` crate.
/// It's important to note that this allocator is `Clone`, `Send` and `Sync`. All its internal
/// state is safely wrapped inside an `Arc<Mutex<T>>`. This is to facilitate passing it around
/// everywhere.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct DefaultAllocator {
    #[derivative(Debug = "ignore")]
    alloc: Arc<Mutex<vk_alloc::Allocator>>,
}

/// Allocation returned from the default allocator.
/// This allocation is automatically freed when it is dropped, so it's not strictly necessary
/// to call [`DefaultAllocator::free()`].
#[derive(Derivative)]
#[derivative(Default, Debug)]
pub struct Allocation {
    // These are wrapped in `Option`s so we can "move" out of them in `Drop`.
    // They are always Some(_)
    allocator: Option<DefaultAllocator>,
    allocation: Option<vk_alloc::Allocation>,
}

impl DefaultAllocator {
    /// Create a new default allocator for the given device.
    /// # Errors
    /// Fails with [`Error::AllocatorCreationFailed`] if creating the internal
    /// `gpu_allocator` fails.
    pub fn new(
        instance: &Instance,
        device: &Device,
        physical_device: &PhysicalDevice,
    ) -> Result<Self> {
        let alloc = vk_alloc::Allocator::new(&vk_alloc::AllocatorCreateDesc {
            instance: (**instance).clone(),
            // SAFETY: The caller passed in a valid Device reference.
            device: unsafe { device.handle().clone() },
            // SAFETY: The caller passed in a valid PhysicalDevice reference.
            physical_device: unsafe { physical_device.handle() },
            debug_settings: Default::default(),
            buffer_device_address: false,
        })
        .map_err(Error::AllocatorCreationFailed)?;
        Ok(Self {
            alloc: Arc::new(Mutex::new(alloc)),
        })
    }

    fn free_impl(&mut self, allocation: &mut <Self as Allocator>::Allocation) -> Result<()> {
        let mut alloc = self.alloc.lock().map_err(|_| Error::PoisonError)?;
        match allocation.allocation.take() {
            None => {}
            Some(allocation) => {
                alloc.free(allocation)?;
            }
        }
        Ok(())
    }
}

impl Allocator for DefaultAllocator {
    /// The allocation type that is returned from calling [`DefaultAllocator::allocate()`]
    type Allocation = Allocation;

    /// Allocates raw memory of a specific memory type. To get proper
    /// [`MemoryRequirements`](vk::MemoryRequirements), call `vkGetBufferMemoryRequirements`
    /// or `vkGetImageMemoryRequirements` with your buffer or image.
    /// # Errors
    /// * May fail if the device is out of memory.
    /// * May fail if invalid [`MemoryRequirements`](vk::MemoryRequirements) were passed in.
    fn allocate(
        &mut self,
        name: &'static str,
        requirements: &vk::MemoryRequirements,
        ty: MemoryType,
    ) -> Result<Self::Allocation> {
        let mut alloc = self.alloc.lock().map_err(|_| Error::PoisonError)?;
        let allocation = alloc.allocate(&vk_alloc::AllocationCreateDesc {
            name,
            requirements: *requirements,
            location: gpu_allocator::MemoryLocation::from(ty),
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        Ok(Allocation {
            allocator: Some(self.clone()),
            allocation: Some(allocation),
        })
    }

    /// Explicitly free memory owned by this allocator. This is generally not needed,
    /// since the implementation of [`Drop`] for [`Allocation`] already handles this.
    fn free(&mut self, mut allocation: Self::Allocation) -> Result<()> {
        self.free_impl(&mut allocation)
    }
}

impl traits::Allocation for Allocation {
    /// Get unsafe access to the underlying [`VkDeviceMemory`](vk::DeviceMemory).
    /// Should always be used together with [`Allocation::offset()`](traits::Allocation::offset).
    /// # Safety
    /// The caller must not free this memory.
    unsafe fn memory(&self) -> vk::DeviceMemory {
        // Safe to unwrap, the allocation is always Some(_)
        self.allocation.as_ref().unwrap().memory()
    }

    /// The offset of this allocation in the device memory block, to be used when
    /// binding buffer or image memory.
    fn offset(&self) -> vk::DeviceSize {
        self.allocation.as_ref().unwrap().offset()
    }

    /// A mapped pointer to the allocation, if it lives in host-visible memory.
    fn mapped_ptr(&self) -> Option<NonNull<c_void>> {
        self.allocation.as_ref().unwrap().mapped_ptr()
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if self.allocation.is_none() {
            return;
        }
        // Safe to unwrap, the allocator is always Some(_)
        let mut allocator = self.allocator.take().unwrap();
        let _ = allocator.free_impl(self);
    }
}
