//! Exposes the logical device, the main interface to the Vulkan API.

use std::ffi::CString;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use ash::vk;
use static_assertions::assert_impl_all;

use crate::core::error::Error;
use crate::core::queue::{QueueFamilyAssignment, QueueRole};
use crate::util::string::unwrap_to_raw_strings;
use crate::{AppSettings, Instance, PhysicalDevice, WindowInterface};

#[derive(Derivative)]
#[derivative(Debug)]
struct DeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queue_assignment: QueueFamilyAssignment,
}

/// Wrapper around a `VkDevice`. The device provides access to almost the entire
/// Vulkan API. Internal state is wrapped in an `Arc<DeviceInner>`, so this is cheap
/// to clone; every dependent object holds a clone, which guarantees the device
/// outlives everything built from it.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

assert_impl_all!(Device: Send, Sync);

impl Device {
    /// Create a new logical device from a selected physical device.
    ///
    /// One queue of priority 1.0 is created per *distinct* assigned queue family;
    /// roles that resolved to the same family share a single queue create info.
    pub fn new<Window: WindowInterface>(
        instance: &Instance,
        physical_device: &PhysicalDevice,
        settings: &AppSettings<Window>,
    ) -> Result<Self> {
        let assignment = *physical_device.queue_assignment();
        let priorities = [1.0f32];
        let queue_create_infos = assignment
            .distinct_families()
            .iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(*family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect::<Vec<_>>();

        let extension_names = settings
            .gpu_requirements
            .device_extensions
            .iter()
            .map(|ext| CString::new(ext.clone()).map_err(Error::InvalidString))
            .collect::<Result<Vec<CString>, Error>>()?;
        let extensions_raw = unwrap_to_raw_strings(extension_names.as_slice());

        let features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: settings.gpu_requirements.anisotropic_sampling as vk::Bool32,
            ..Default::default()
        };

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(queue_create_infos.as_slice())
            .enabled_extension_names(extensions_raw.as_slice())
            .enabled_features(&features)
            .build();

        let handle = unsafe {
            instance
                .create_device(physical_device.handle(), &info, None)
                .map_err(Error::LogicalDeviceCreationFailed)?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDevice {:p}", handle.handle());

        Ok(Device {
            inner: Arc::new(DeviceInner {
                handle,
                physical_device: unsafe { physical_device.handle() },
                properties: *physical_device.properties(),
                queue_assignment: assignment,
            }),
        })
    }

    /// Get the queue family index assigned to a role.
    /// # Errors
    /// Fails with [`Error::QueueFamilyUnassigned`] if the role was never resolved on this device.
    pub fn queue_family(&self, role: QueueRole) -> Result<u32> {
        self.inner
            .queue_assignment
            .index(role)
            .ok_or_else(|| Error::QueueFamilyUnassigned(role).into())
    }

    /// Retrieve a queue handle for a role. Queue handles are owned by the device; they
    /// may be retrieved any number of times.
    pub fn queue(&self, role: QueueRole) -> Result<vk::Queue> {
        let family = self.queue_family(role)?;
        Ok(unsafe { self.inner.handle.get_device_queue(family, 0) })
    }

    /// Get the queue family assignment computed during device selection.
    pub fn queue_assignment(&self) -> &QueueFamilyAssignment {
        &self.inner.queue_assignment
    }

    /// Get the properties of the physical device this device was created from.
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.inner.properties
    }

    /// Get the physical device this device was created from.
    /// # Safety
    /// The caller must not destroy this handle; it is owned by the instance.
    pub unsafe fn physical_device(&self) -> vk::PhysicalDevice {
        self.inner.physical_device
    }

    /// Get unsafe access to the underlying `VkDevice` handle.
    /// # Safety
    /// Any vulkan calls that modify the device state may put the system in an undefined state.
    pub unsafe fn handle(&self) -> &ash::Device {
        &self.inner.handle
    }

    /// Block until all work submitted to every queue on this device completed.
    /// This is a full GPU drain; it is called before swapchain recreation and
    /// before device destruction.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.inner.handle.device_wait_idle()? };
        Ok(())
    }
}

impl Deref for Device {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.inner.handle
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDevice {:p}", self.handle.handle());
        unsafe {
            // Nothing may be in flight while the device is torn down.
            let _ = self.handle.device_wait_idle();
            self.handle.destroy_device(None);
        }
    }
}
