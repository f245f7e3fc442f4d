//! Per-thread caches of "global" command and descriptor pools.
//!
//! Command pools and descriptor pools are not internally synchronized by Vulkan, so
//! sharing one across threads would require locking around every allocation. Instead,
//! [`LocalPools`] lazily creates one pool per thread (per queue family for command
//! pools) on first use, and hands the same pool back to that thread afterwards.
//!
//! The caches are mutex-guarded maps: first use of a key by two threads at once is
//! serialized, and exactly one pool is created per key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use anyhow::Result;
use ash::vk;

use crate::command_buffer::command_pool::CommandPool;
use crate::command_buffer::CommandBuffer;
use crate::core::error::Error;
use crate::descriptor::descriptor_pool::DescriptorPool;
use crate::descriptor::set_layout::DescriptorSetLayout;
use crate::descriptor::DescriptorSet;
use crate::Device;

type CommandPoolKey = (ThreadId, u32);

/// Owner of the per-thread pool caches. Create one next to the device and share it
/// across worker threads; see [`initialize`](crate::initialize).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct LocalPools {
    #[derivative(Debug = "ignore")]
    device: Device,
    #[derivative(Debug = "ignore")]
    transient: Mutex<HashMap<CommandPoolKey, Arc<CommandPool>>>,
    #[derivative(Debug = "ignore")]
    resettable: Mutex<HashMap<CommandPoolKey, Arc<CommandPool>>>,
    #[derivative(Debug = "ignore")]
    descriptors: Mutex<HashMap<ThreadId, Arc<DescriptorPool>>>,
}

impl LocalPools {
    /// Create an empty cache. Pools are created lazily on first use per thread.
    pub fn new(device: Device) -> Self {
        LocalPools {
            device,
            transient: Mutex::new(HashMap::new()),
            resettable: Mutex::new(HashMap::new()),
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    /// The calling thread's transient command pool for a queue family, created on
    /// first use. Buffers allocated from it are one-time buffers.
    pub fn transient_pool(&self, family: u32) -> Result<Arc<CommandPool>> {
        Self::command_pool(
            &self.device,
            &self.transient,
            family,
            vk::CommandPoolCreateFlags::TRANSIENT,
        )
    }

    /// The calling thread's resettable command pool for a queue family, created on
    /// first use. Buffers allocated from it may be re-recorded.
    pub fn resettable_pool(&self, family: u32) -> Result<Arc<CommandPool>> {
        Self::command_pool(
            &self.device,
            &self.resettable,
            family,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )
    }

    /// The calling thread's descriptor pool, created on first use with generous
    /// default sizes.
    pub fn descriptor_pool(&self) -> Result<Arc<DescriptorPool>> {
        let mut pools = self.descriptors.lock().map_err(|_| Error::PoisonError)?;
        match pools.entry(thread::current().id()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                info!("Creating descriptor pool for thread {:?}", thread::current().id());
                let pool = Arc::new(DescriptorPool::with_default_sizes(self.device.clone())?);
                entry.insert(pool.clone());
                Ok(pool)
            }
        }
    }

    /// Allocate a primary one-time command buffer from the calling thread's transient
    /// pool for a queue family.
    pub fn one_time_command_buffer(&self, family: u32) -> Result<CommandBuffer> {
        self.transient_pool(family)?
            .allocate(vk::CommandBufferLevel::PRIMARY)
    }

    /// Allocate a primary resettable command buffer from the calling thread's
    /// resettable pool for a queue family.
    pub fn resettable_command_buffer(&self, family: u32) -> Result<CommandBuffer> {
        self.resettable_pool(family)?
            .allocate(vk::CommandBufferLevel::PRIMARY)
    }

    /// Allocate a descriptor set from the calling thread's descriptor pool.
    pub fn descriptor_set(&self, layout: &DescriptorSetLayout) -> Result<DescriptorSet> {
        self.descriptor_pool()?.allocate(layout)
    }

    fn command_pool(
        device: &Device,
        cache: &Mutex<HashMap<CommandPoolKey, Arc<CommandPool>>>,
        family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Arc<CommandPool>> {
        let key = (thread::current().id(), family);
        let mut pools = cache.lock().map_err(|_| Error::PoisonError)?;
        match pools.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                info!(
                    "Creating {flags:?} command pool for thread {:?}, queue family {family}",
                    key.0
                );
                let pool = Arc::new(CommandPool::new(device.clone(), family, flags)?);
                entry.insert(pool.clone());
                Ok(pool)
            }
        }
    }
}
