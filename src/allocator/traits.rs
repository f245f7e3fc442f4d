use std::ffi::c_void;
use std::ptr::NonNull;

use anyhow::Result;
use ash::vk;

use crate::allocator::memory_type::MemoryType;

/// To supply custom allocators to obsidian objects, this trait must be implemented.
/// Note that all allocators must be `Clone`, `Send` and `Sync`. To do this, an implementation
/// could wrap its internal state in an `Arc<Mutex<T>>`.
pub trait Allocator: Clone + Send + Sync {
    /// The allocation type of this allocator.
    type Allocation: Allocation;

    /// Allocates raw memory of a specific memory type. The given name is used for
    /// internal tracking and debug logging.
    fn allocate(
        &mut self,
        name: &'static str,
        requirements: &vk::MemoryRequirements,
        ty: MemoryType,
    ) -> Result<Self::Allocation>;
    /// Free some memory allocated from this allocator.
    fn free(&mut self, allocation: Self::Allocation) -> Result<()>;
}

/// Represents an allocation. This trait exposes methods for accessing the underlying
/// device memory, mapped pointers, etc.
pub trait Allocation: Default {
    /// Access the underlying [`VkDeviceMemory`](vk::DeviceMemory). Should always be used
    /// together with [`Allocation::offset()`].
    /// # Safety
    /// The caller must not free this memory, it is owned by the allocator.
    unsafe fn memory(&self) -> vk::DeviceMemory;
    /// The offset of this allocation in the device memory block.
    fn offset(&self) -> vk::DeviceSize;
    /// A mapped pointer to the allocation, if it lives in host-visible memory.
    fn mapped_ptr(&self) -> Option<NonNull<c_void>>;
}
