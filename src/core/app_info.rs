//! Exposes all structs needed to store initialization parameters.

use ash::vk;

use crate::core::queue::QueueRole;
use crate::wsi::window::WindowInterface;

/// Minimum requirements for the GPU. This will be used to determine what physical device is
/// selected. A candidate is accepted only if it satisfies all of these at once; candidates
/// are tried in enumeration order and the first satisfying one wins.
#[derive(Debug)]
pub struct DeviceRequirements {
    /// Whether a dedicated GPU is required. Setting this to true will discard integrated GPUs.
    pub dedicated: bool,
    /// Require support for anisotropic sampling.
    pub anisotropic_sampling: bool,
    /// Queue roles that must resolve to a concrete family index on the device.
    /// See [`QueueFamilyAssignment`](crate::QueueFamilyAssignment) for the assignment policy.
    pub queues: Vec<QueueRole>,
    /// Vulkan device extensions that should be present and enabled.
    pub device_extensions: Vec<String>,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            dedicated: false,
            anisotropic_sampling: false,
            queues: vec![QueueRole::Graphics, QueueRole::Transfer],
            device_extensions: vec![],
        }
    }
}

/// Application settings used to initialize the obsidian context.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct AppSettings<'a, Window: WindowInterface> {
    /// Application name. Possibly displayed in debugging tools, task manager, etc.
    pub name: String,
    /// Application version.
    pub version: (u32, u32, u32),
    /// Enable Vulkan validation layers for additional debug output. For developing this should
    /// almost always be on.
    pub enable_validation: bool,
    /// Optionally a window to create a presentable surface for. `None` creates a headless
    /// context without a swapchain.
    #[derivative(Debug = "ignore")]
    pub window: Option<&'a Window>,
    /// Desired swapchain image format and color space. Negotiation fails with
    /// [`SwapchainConfigError::ImageFormat`](crate::SwapchainConfigError::ImageFormat)
    /// if the surface does not enumerate this exact pair.
    pub surface_format: vk::SurfaceFormatKHR,
    /// Desired present mode. FIFO by default since that is the only mode the Vulkan spec
    /// guarantees; negotiation fails if the requested mode is not enumerated.
    pub present_mode: vk::PresentModeKHR,
    /// Desired depth-stencil attachment format for the swapchain depth image.
    pub depth_format: vk::Format,
    /// Minimum requirements the selected physical device should have.
    pub gpu_requirements: DeviceRequirements,
}

/// The app builder is a convenience struct to easily create [`AppSettings`].
///
/// For information about each of the fields, see [`AppSettings`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct AppBuilder<'a, Window: WindowInterface> {
    settings: AppSettings<'a, Window>,
}

impl<'a, Window: WindowInterface> Default for AppSettings<'a, Window> {
    fn default() -> Self {
        AppSettings {
            name: String::new(),
            version: (0, 0, 0),
            enable_validation: false,
            window: None,
            surface_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            present_mode: vk::PresentModeKHR::FIFO,
            depth_format: vk::Format::D32_SFLOAT,
            gpu_requirements: DeviceRequirements::default(),
        }
    }
}

impl<'a, Window: WindowInterface> AppBuilder<'a, Window> {
    pub fn new() -> Self {
        AppBuilder {
            settings: AppSettings::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    pub fn version(mut self, version: (u32, u32, u32)) -> Self {
        self.settings.version = version;
        self
    }

    pub fn validation(mut self, enabled: bool) -> Self {
        self.settings.enable_validation = enabled;
        self
    }

    pub fn window(mut self, window: &'a Window) -> Self {
        self.settings.window = Some(window);
        self
    }

    pub fn surface_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        self.settings.surface_format = format;
        self
    }

    pub fn present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        self.settings.present_mode = mode;
        self
    }

    pub fn depth_format(mut self, format: vk::Format) -> Self {
        self.settings.depth_format = format;
        self
    }

    pub fn gpu(mut self, requirements: DeviceRequirements) -> Self {
        self.settings.gpu_requirements = requirements;
        self
    }

    /// Build the final settings. For a windowed context, the present queue role and the
    /// swapchain device extension are added to the requirements if they are missing,
    /// since a swapchain cannot be negotiated without them.
    pub fn build(mut self) -> AppSettings<'a, Window> {
        if self.settings.window.is_some() {
            let queues = &mut self.settings.gpu_requirements.queues;
            if !queues.contains(&QueueRole::Present) {
                queues.push(QueueRole::Present);
            }
            let extensions = &mut self.settings.gpu_requirements.device_extensions;
            let swapchain = "VK_KHR_swapchain".to_owned();
            if !extensions.contains(&swapchain) {
                extensions.push(swapchain);
            }
        }
        self.settings
    }
}

impl<'a, Window: WindowInterface> Default for AppBuilder<'a, Window> {
    fn default() -> Self {
        Self::new()
    }
}
