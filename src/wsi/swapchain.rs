//! Swapchain negotiation, recreation and presentation.
//!
//! A [`Swapchain`] is an abstraction of a presentation system. It negotiates concrete
//! swapchain parameters (extent, image count, sharing mode) from the surface
//! capabilities and the desired configuration in [`AppSettings`], owns the resulting
//! image views and a depth-stencil image, and handles the acquire/present cycle.
//!
//! The desired format, color space, present mode and depth format must appear in the
//! enumerated support sets; any mismatch fails with
//! [`Error::SwapchainConfigUnsupported`](crate::Error::SwapchainConfigUnsupported)
//! before a single native resource is created.
//!
//! When acquire or present report the surface went stale (out of date or suboptimal),
//! the distinguished [`Error::SwapchainStale`](crate::Error::SwapchainStale) is
//! returned; the render loop is expected to catch it, call [`Swapchain::recreate`] and
//! retry the frame. Recreation waits for the device to go idle, then destroys and
//! rebuilds the swapchain resources wholesale; the logical device and instance are
//! untouched. At most one recreation may be in flight at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use ash::vk;

use crate::core::error::{Error, SwapchainConfigError};
use crate::core::queue::QueueRole;
use crate::image::{Image, ImageView};
use crate::wsi::window::WindowSize;
use crate::{AppSettings, DefaultAllocator, Device, Instance, PhysicalDevice, Surface, WindowInterface};

/// Sentinel in `VkSurfaceCapabilitiesKHR::currentExtent` meaning the window manager
/// lets the swapchain pick the extent itself.
const UNDEFINED_EXTENT: u32 = u32::MAX;

/// Reentrancy guard for swapchain recreation. At most one holder may acquire it at a
/// time; a second attempt observes a typed busy error instead of proceeding.
#[derive(Debug, Default)]
pub struct RecreationGuard {
    in_flight: AtomicBool,
}

impl RecreationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard.
    /// # Errors
    /// Fails with [`Error::RecreationInFlight`] if another recreation currently holds it.
    pub fn try_acquire(&self) -> Result<()> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::RecreationInFlight)?;
        Ok(())
    }

    /// Release the guard. Only the holder may call this.
    pub fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct SwapchainImage {
    // Owned by the native swapchain object, only the view is ours to destroy.
    #[allow(dead_code)]
    image: vk::Image,
    view: ImageView,
}

/// A swapchain is an abstraction of a presentation system. It handles buffering, VSync,
/// and acquiring images to render and present frames to.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Swapchain {
    #[derivative(Debug = "ignore")]
    device: Device,
    #[derivative(Debug = "ignore")]
    allocator: DefaultAllocator,
    /// Vulkan extension functions operating on the swapchain.
    #[derivative(Debug = "ignore")]
    functions: ash::extensions::khr::Swapchain,
    /// Handle to the [`VkSwapchainKHR`](vk::SwapchainKHR) object.
    handle: vk::SwapchainKHR,
    /// Swapchain image format and color space, validated against the surface formats.
    format: vk::SurfaceFormatKHR,
    /// Present mode, validated against the surface present modes.
    present_mode: vk::PresentModeKHR,
    /// Depth-stencil attachment format, validated against the device format properties.
    depth_format: vk::Format,
    /// Byte width of the depth channel, derived from the depth format.
    depth_channels: u32,
    /// Byte width of the stencil channel; nonzero means the format has a stencil component.
    stencil_channels: u32,
    /// Size of the swapchain images. This is effectively the window render area.
    extent: vk::Extent2D,
    /// Negotiated image count: `min_image_count + 1` clamped to the bounded maximum.
    image_count: u32,
    images: Vec<SwapchainImage>,
    // Rebuilt on every recreation. Always Some(_) while the swapchain is live.
    depth_image: Option<Image>,
    /// Index of the last acquired image.
    current_image: u32,
    guard: RecreationGuard,
}

impl Swapchain {
    /// Create a new swapchain. The surface must have its support details queried
    /// (see [`Surface::query_details`]); negotiation validates the desired
    /// configuration against them before creating anything.
    pub fn new<Window: WindowInterface>(
        instance: &Instance,
        device: Device,
        allocator: DefaultAllocator,
        physical_device: &PhysicalDevice,
        surface: &Surface,
        window: &Window,
        settings: &AppSettings<Window>,
    ) -> Result<Self> {
        let format = settings.surface_format;
        if !surface.formats().contains(&format) {
            return Err(Error::SwapchainConfigUnsupported(SwapchainConfigError::ImageFormat).into());
        }
        if !surface.present_modes().contains(&settings.present_mode) {
            return Err(
                Error::SwapchainConfigUnsupported(SwapchainConfigError::PresentMode).into(),
            );
        }
        let (depth_channels, stencil_channels) = depth_stencil_channels(settings.depth_format)?;
        let depth_properties = physical_device.format_properties(instance, settings.depth_format);
        if !depth_properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            return Err(Error::SwapchainConfigUnsupported(SwapchainConfigError::DepthFormat).into());
        }

        let functions = ash::extensions::khr::Swapchain::new(instance, &device);

        let mut swapchain = Swapchain {
            device,
            allocator,
            functions,
            handle: vk::SwapchainKHR::null(),
            format,
            present_mode: settings.present_mode,
            depth_format: settings.depth_format,
            depth_channels,
            stencil_channels,
            extent: vk::Extent2D::default(),
            image_count: 0,
            images: vec![],
            depth_image: None,
            current_image: 0,
            guard: RecreationGuard::new(),
        };
        swapchain.create_resources(surface, window)?;
        info!(
            "Created swapchain: {}x{}, {} images, format {:?}, present mode {:?}",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.image_count,
            swapchain.format.format,
            swapchain.present_mode
        );
        Ok(swapchain)
    }

    /// Destroy and rebuild the swapchain resources from fresh surface capabilities,
    /// e.g. after a window resize or a [`Error::SwapchainStale`] signal. Waits for all
    /// in-flight device work first, since swapchain images may still be referenced by
    /// submitted command buffers. The logical device and instance are not touched.
    ///
    /// Re-negotiating from identical capability inputs yields an identical
    /// extent/image count, so recreation cycles are idempotent.
    /// # Errors
    /// Fails with [`Error::RecreationInFlight`] if called concurrently; exactly one of
    /// the callers proceeds.
    pub fn recreate<Window: WindowInterface>(
        &mut self,
        surface: &Surface,
        window: &Window,
    ) -> Result<()> {
        self.guard.try_acquire()?;
        let result = self.recreate_inner(surface, window);
        self.guard.release();
        result
    }

    fn recreate_inner<Window: WindowInterface>(
        &mut self,
        surface: &Surface,
        window: &Window,
    ) -> Result<()> {
        self.device.wait_idle()?;
        self.destroy_resources();
        self.create_resources(surface, window)?;
        info!(
            "Recreated swapchain: {}x{}, {} images",
            self.extent.width, self.extent.height, self.image_count
        );
        Ok(())
    }

    fn create_resources<Window: WindowInterface>(
        &mut self,
        surface: &Surface,
        window: &Window,
    ) -> Result<()> {
        let capabilities =
            surface.query_capabilities(unsafe { self.device.physical_device() })?;
        let extent = negotiate_extent(&capabilities, window);
        let image_count = negotiate_image_count(&capabilities);

        let graphics_family = self.device.queue_family(QueueRole::Graphics)?;
        let present_family = self.device.queue_family(QueueRole::Present)?;
        let exclusive = graphics_family == present_family;
        let family_indices = [graphics_family, present_family];
        let sharing_indices: &[u32] = if exclusive {
            &[]
        } else {
            &family_indices
        };

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(unsafe { surface.handle() })
            .min_image_count(image_count)
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(if exclusive {
                vk::SharingMode::EXCLUSIVE
            } else {
                vk::SharingMode::CONCURRENT
            })
            .queue_family_indices(sharing_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .build();

        let handle = unsafe {
            self.functions
                .create_swapchain(&info, None)
                .map_err(Error::SwapchainCreationFailed)?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkSwapchainKHR {handle:p}");

        let images = unsafe { self.functions.get_swapchain_images(handle)? }
            .iter()
            .map(|image| -> Result<SwapchainImage> {
                let view = ImageView::new(
                    self.device.clone(),
                    *image,
                    self.format.format,
                    vk::ImageAspectFlags::COLOR,
                )?;
                Ok(SwapchainImage {
                    image: *image,
                    view,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let depth_aspect = if self.stencil_channels > 0 {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        };
        let depth_image = Image::new(
            self.device.clone(),
            &mut self.allocator,
            extent.width,
            extent.height,
            self.depth_format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            depth_aspect,
        )?;

        self.handle = handle;
        self.extent = extent;
        self.image_count = image_count;
        self.images = images;
        self.depth_image = Some(depth_image);
        self.current_image = 0;
        Ok(())
    }

    fn destroy_resources(&mut self) {
        // The views reference the swapchain images, clear them before the swapchain.
        self.images.clear();
        self.depth_image = None;
        if self.handle != vk::SwapchainKHR::null() {
            #[cfg(feature = "log-objects")]
            trace!("Destroying VkSwapchainKHR {:p}", self.handle);
            unsafe {
                self.functions.destroy_swapchain(self.handle, None);
            }
            self.handle = vk::SwapchainKHR::null();
        }
    }

    /// Acquire the next presentable image, signaling `semaphore` and/or `fence` when it
    /// is ready. `timeout` is in nanoseconds; pass `u64::MAX` to wait indefinitely. An
    /// expired timeout surfaces as the `VK_TIMEOUT` error code.
    /// # Errors
    /// Fails with [`Error::SwapchainStale`] when the surface is out of date or
    /// suboptimal; recreate and retry the frame.
    pub fn acquire_next_image(
        &mut self,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
        timeout: u64,
    ) -> Result<u32> {
        let result =
            unsafe { self.functions.acquire_next_image(self.handle, timeout, semaphore, fence) };
        match result {
            Ok((index, false)) => {
                self.current_image = index;
                Ok(index)
            }
            Ok((_, true)) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                Err(Error::SwapchainStale.into())
            }
            Err(e) => Err(Error::VkError(e).into()),
        }
    }

    /// Present the last acquired image on the present queue, after waiting on
    /// `wait_semaphores`.
    ///
    /// The present queue is externally synchronized; the caller must not present from
    /// two threads at once.
    /// # Errors
    /// Fails with [`Error::SwapchainStale`] when the surface is out of date or
    /// suboptimal; recreate and retry the frame.
    pub fn present(&self, wait_semaphores: &[vk::Semaphore]) -> Result<()> {
        let queue = self.device.queue(QueueRole::Present)?;
        let info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(std::slice::from_ref(&self.handle))
            .image_indices(std::slice::from_ref(&self.current_image))
            .build();
        let result = unsafe { self.functions.queue_present(queue, &info) };
        match result {
            Ok(false) => Ok(()),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainStale.into()),
            Err(e) => Err(Error::VkError(e).into()),
        }
    }

    /// The negotiated swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// The swapchain image format and color space.
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// The negotiated present mode.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// The image count requested at creation. The driver may have created more.
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// The number of images actually retrieved from the driver.
    pub fn images_len(&self) -> usize {
        self.images.len()
    }

    /// The color view of the swapchain image at `index`.
    pub fn image_view(&self, index: usize) -> &ImageView {
        &self.images[index].view
    }

    /// The index of the last acquired image.
    pub fn current_image(&self) -> u32 {
        self.current_image
    }

    /// The depth-stencil image shared by all frames.
    pub fn depth_image(&self) -> &Image {
        // Always Some(_) while the swapchain is live.
        self.depth_image.as_ref().unwrap()
    }

    /// The depth-stencil attachment format.
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    /// Byte widths of the (depth, stencil) channels of the depth format. A nonzero
    /// stencil width means the format carries a stencil component.
    pub fn depth_stencil_channels(&self) -> (u32, u32) {
        (self.depth_channels, self.stencil_channels)
    }

    /// Get unsafe access to the underlying `VkSwapchainKHR` object.
    /// # Safety
    /// Any vulkan calls that mutate the swapchain may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_resources();
    }
}

/// Decide how many images to request: one more than the minimum for headroom, clamped
/// to the maximum when the capabilities report a bounded one (`0` means unbounded).
pub fn negotiate_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Negotiate the swapchain extent against the surface capabilities.
///
/// If the capabilities report a concrete current extent it is taken verbatim. With the
/// undefined-extent sentinel the extent is derived from the live framebuffer size
/// instead, clamped component-wise into the supported range. While the framebuffer is
/// degenerate (a minimized window reports zero width or height) this blocks, polling
/// platform events between reads; the result never has zero area.
pub fn negotiate_extent<Window: WindowSize>(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window: &Window,
) -> vk::Extent2D {
    if capabilities.current_extent.width != UNDEFINED_EXTENT {
        return capabilities.current_extent;
    }

    let (mut width, mut height) = (window.width(), window.height());
    while width == 0 || height == 0 {
        window.wait_events();
        width = window.width();
        height = window.height();
    }
    clamp_extent(capabilities, width, height)
}

/// Clamp a framebuffer size component-wise into the extent range the surface supports.
pub fn clamp_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Derive the byte widths of the (depth, stencil) channels for a depth-stencil format.
/// # Errors
/// Fails with [`SwapchainConfigError::DepthFormat`] for formats the swapchain does not
/// support as depth attachment.
pub fn depth_stencil_channels(format: vk::Format) -> Result<(u32, u32)> {
    match format {
        vk::Format::D32_SFLOAT => Ok((4, 0)),
        vk::Format::D32_SFLOAT_S8_UINT => Ok((4, 1)),
        vk::Format::D24_UNORM_S8_UINT => Ok((3, 1)),
        _ => Err(Error::SwapchainConfigUnsupported(SwapchainConfigError::DepthFormat).into()),
    }
}
