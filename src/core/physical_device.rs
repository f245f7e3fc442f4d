//! Physical device probing and selection.
//!
//! Candidates are probed for their enumerable capabilities (extensions, queue
//! families, features, surface support) and tried in enumeration order; the
//! first candidate satisfying every requirement at once is selected. There is
//! no scoring beyond pass/fail.

use std::ffi::CStr;

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::core::queue::QueueFamilyAssignment;
use crate::util::string::wrap_c_str;
use crate::{AppSettings, Instance, Surface, WindowInterface};

/// Stores queried properties of a Vulkan extension.
#[derive(Debug, Default)]
pub struct ExtensionProperties {
    /// Name of the extension.
    pub name: String,
    /// Specification version of the extension.
    pub spec_version: u32,
}

/// A physical device abstracts away an actual device, like a graphics card or integrated
/// graphics card, along with everything probed about it during selection.
#[derive(Default, Debug)]
pub struct PhysicalDevice {
    /// Handle to the [`VkPhysicalDevice`](vk::PhysicalDevice).
    handle: vk::PhysicalDevice,
    /// [`VkPhysicalDeviceProperties`](vk::PhysicalDeviceProperties) structure with properties
    /// of this physical device.
    properties: vk::PhysicalDeviceProperties,
    /// [`VkPhysicalDeviceFeatures`](vk::PhysicalDeviceFeatures) supported by this device.
    features: vk::PhysicalDeviceFeatures,
    /// [`VkPhysicalDeviceMemoryProperties`](vk::PhysicalDeviceMemoryProperties) structure with
    /// memory properties of the physical device, such as available memory types and heaps.
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Available Vulkan extensions.
    extension_properties: Vec<ExtensionProperties>,
    /// List of [`VkQueueFamilyProperties`](vk::QueueFamilyProperties) with properties of each
    /// queue family on the device.
    queue_families: Vec<vk::QueueFamilyProperties>,
    /// Queue family index resolved for each requested role.
    queue_assignment: QueueFamilyAssignment,
}

impl PhysicalDevice {
    /// Selects the first physical device that satisfies all given requirements.
    ///
    /// A candidate is accepted when its features, queue family assignment, device
    /// extensions and (for windowed contexts) surface format/present mode support
    /// all check out. A candidate that fails any gate is skipped, never partially
    /// selected.
    /// # Errors
    /// Fails with [`Error::NoSuitableDevice`] if no candidate passes.
    pub fn select<Window: WindowInterface>(
        instance: &Instance,
        surface: Option<&Surface>,
        settings: &AppSettings<Window>,
    ) -> Result<Self> {
        let devices = unsafe { instance.enumerate_physical_devices()? };
        if devices.is_empty() {
            return Err(Error::NoSuitableDevice.into());
        }

        for handle in devices {
            let mut candidate = Self::probe(instance, handle)?;
            if !candidate.check_features(settings) {
                continue;
            }
            if !candidate.check_queue_families(surface, settings)? {
                continue;
            }
            if !candidate.check_extensions(settings) {
                continue;
            }
            if !candidate.check_surface_support(surface)? {
                continue;
            }

            let name = unsafe { CStr::from_ptr(candidate.properties.device_name.as_ptr()) };
            info!(
                "Picked physical device {:?}, driver version {:?}.",
                name, candidate.properties.driver_version
            );
            info!(
                "Device has {} bytes of available video memory, of which {} are device local.",
                total_video_memory(&candidate),
                total_device_memory(&candidate)
            );
            info!("Queue family assignment: {:?}", candidate.queue_assignment);
            return Ok(candidate);
        }
        Err(Error::NoSuitableDevice.into())
    }

    /// Query all enumerable capabilities of a candidate. Pure query, does not
    /// mutate or claim the candidate.
    fn probe(instance: &Instance, handle: vk::PhysicalDevice) -> Result<Self> {
        Ok(PhysicalDevice {
            handle,
            properties: unsafe { instance.get_physical_device_properties(handle) },
            features: unsafe { instance.get_physical_device_features(handle) },
            memory_properties: unsafe { instance.get_physical_device_memory_properties(handle) },
            extension_properties: unsafe {
                instance
                    .enumerate_device_extension_properties(handle)?
                    .iter()
                    .map(|vk_properties| ExtensionProperties {
                        name: wrap_c_str(vk_properties.extension_name.as_ptr()),
                        spec_version: vk_properties.spec_version,
                    })
                    .collect()
            },
            queue_families: unsafe {
                instance.get_physical_device_queue_family_properties(handle)
            },
            queue_assignment: QueueFamilyAssignment::default(),
        })
    }

    fn check_features<Window: WindowInterface>(&self, settings: &AppSettings<Window>) -> bool {
        if settings.gpu_requirements.dedicated
            && self.properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU
        {
            return false;
        }
        if settings.gpu_requirements.anisotropic_sampling
            && self.features.sampler_anisotropy != vk::TRUE
        {
            return false;
        }
        true
    }

    fn check_queue_families<Window: WindowInterface>(
        &mut self,
        surface: Option<&Surface>,
        settings: &AppSettings<Window>,
    ) -> Result<bool> {
        self.queue_assignment =
            QueueFamilyAssignment::resolve(self.queue_families.as_slice(), |family| match surface {
                Some(surface) => Ok(unsafe {
                    surface.get_physical_device_surface_support(
                        self.handle,
                        family,
                        surface.handle(),
                    )?
                }),
                None => Ok(false),
            })?;
        Ok(self
            .queue_assignment
            .satisfies(settings.gpu_requirements.queues.as_slice()))
    }

    fn check_extensions<Window: WindowInterface>(&self, settings: &AppSettings<Window>) -> bool {
        settings
            .gpu_requirements
            .device_extensions
            .iter()
            .all(|requested| {
                self.extension_properties
                    .iter()
                    .any(|ext| ext.name == *requested)
            })
    }

    /// At least one supported surface format and present mode must exist for a windowed
    /// context. Empty enumerations are not an error during probing; the absence is
    /// interpreted here.
    fn check_surface_support(&self, surface: Option<&Surface>) -> Result<bool> {
        let Some(surface) = surface else {
            return Ok(true);
        };
        let formats = unsafe {
            surface.get_physical_device_surface_formats(self.handle, surface.handle())?
        };
        let present_modes = unsafe {
            surface.get_physical_device_surface_present_modes(self.handle, surface.handle())?
        };
        Ok(!formats.is_empty() && !present_modes.is_empty())
    }

    /// Get all queue families available on this device.
    pub fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        self.queue_families.as_slice()
    }

    /// Get the queue family index resolved for each role.
    pub fn queue_assignment(&self) -> &QueueFamilyAssignment {
        &self.queue_assignment
    }

    /// Get unsafe access to the physical device handle.
    /// # Safety
    /// The caller must not destroy this handle; it is owned by the instance.
    pub unsafe fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.features
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Query format properties for this device. Used to validate depth-stencil
    /// attachment support during swapchain negotiation.
    pub fn format_properties(
        &self,
        instance: &Instance,
        format: vk::Format,
    ) -> vk::FormatProperties {
        unsafe { instance.get_physical_device_format_properties(self.handle, format) }
    }
}

fn total_video_memory(device: &PhysicalDevice) -> usize {
    device
        .memory_properties
        .memory_heaps
        .iter()
        .map(|heap| heap.size as usize)
        .sum()
}

fn total_device_memory(device: &PhysicalDevice) -> usize {
    device
        .memory_properties
        .memory_heaps
        .iter()
        .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
        .map(|heap| heap.size as usize)
        .sum()
}
