//! Exposes methods to make initialization of the library easier without losing flexibility.

use anyhow::Result;

use crate::{
    AppSettings, DebugMessenger, DefaultAllocator, Device, Instance, LocalPools, PhysicalDevice,
    Surface, Swapchain, WindowInterface,
};

/// Struct that contains all common obsidian resources to be used at initialization.
/// The surface and swapchain are `None` for a headless context, the debug messenger is
/// `None` when validation is disabled.
///
/// Destructure this into individual bindings (as in the crate-level example) rather
/// than holding the tuple itself: destructured locals drop in reverse creation order,
/// which is the correct destruction order for these objects.
pub type Obsidian = (
    Instance,
    PhysicalDevice,
    Option<Surface>,
    Device,
    DefaultAllocator,
    LocalPools,
    Option<Swapchain>,
    Option<DebugMessenger>,
);

/// Initialize the context: instance, (surface), device selection, logical device,
/// allocator, per-thread pools and (swapchain), in dependency order.
pub fn initialize<Window: WindowInterface>(settings: &AppSettings<Window>) -> Result<Obsidian> {
    let instance = Instance::new(settings)?;

    let debug_messenger = if settings.enable_validation {
        Some(DebugMessenger::new(&instance)?)
    } else {
        None
    };

    let mut surface = match settings.window {
        Some(window) => Some(Surface::new(&instance, window)?),
        None => None,
    };

    let physical_device = PhysicalDevice::select(&instance, surface.as_ref(), settings)?;
    if let Some(surface) = surface.as_mut() {
        surface.query_details(&physical_device)?;
    }

    let device = Device::new(&instance, &physical_device, settings)?;
    let allocator = DefaultAllocator::new(&instance, &device, &physical_device)?;
    let pools = LocalPools::new(device.clone());

    let swapchain = match (settings.window, surface.as_ref()) {
        (Some(window), Some(surface)) => Some(Swapchain::new(
            &instance,
            device.clone(),
            allocator.clone(),
            &physical_device,
            surface,
            window,
            settings,
        )?),
        _ => None,
    };

    Ok((
        instance,
        physical_device,
        surface,
        device,
        allocator,
        pools,
        swapchain,
        debug_messenger,
    ))
}
