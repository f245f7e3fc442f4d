//! Exposes the obsidian error type

use std::ffi::NulError;
use std::path::PathBuf;
use std::sync::PoisonError;

use ash;
use ash::vk;
use gpu_allocator::AllocationError;
use thiserror::Error;

use crate::core::queue::QueueRole;

/// Identifies which part of the desired swapchain configuration was rejected
/// during negotiation against the enumerated surface support.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SwapchainConfigError {
    /// The desired image format + color space pair is not in the supported surface formats.
    ImageFormat,
    /// The desired present mode is not in the supported present modes.
    PresentMode,
    /// The desired depth-stencil format is not usable as a depth-stencil attachment.
    DepthFormat,
}

/// Error type that obsidian can return.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the Vulkan library.
    #[error("Failed to load Vulkan.")]
    LoadFailed(ash::LoadingError),
    /// Could not convert rust string to C-String because it has null bytes
    #[error("Invalid C string")]
    InvalidString(NulError),
    /// Generic Vulkan error type for calls without a more specific translation.
    #[error("Vulkan error: `{0}`")]
    VkError(vk::Result),
    /// A requested validation layer is not installed.
    #[error("Validation layer `{0}` is not available.")]
    ValidationLayerUnavailable(String),
    /// Creating the Vulkan instance failed.
    #[error("Failed to create VkInstance: `{0}`")]
    InstanceCreationFailed(vk::Result),
    /// Creating the debug messenger failed.
    #[error("Failed to create debug messenger: `{0}`")]
    DebugMessengerCreationFailed(vk::Result),
    /// Creating the window surface failed.
    #[error("Failed to create window surface: `{0}`")]
    SurfaceCreationFailed(vk::Result),
    /// No physical device satisfied the requested features, queues, extensions and surface support.
    #[error("No physical device found matching requirements.")]
    NoSuitableDevice,
    /// Creating the logical device failed.
    #[error("Failed to create logical device: `{0}`")]
    LogicalDeviceCreationFailed(vk::Result),
    /// Creating the memory allocator failed.
    #[error("Failed to create memory allocator: `{0}`")]
    AllocatorCreationFailed(AllocationError),
    /// Vulkan allocation error.
    #[error("Allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// The desired swapchain configuration is not supported by the surface.
    /// Checked before any native resource is created.
    #[error("Unsupported swapchain configuration: `{0:?}`")]
    SwapchainConfigUnsupported(SwapchainConfigError),
    /// Creating the swapchain failed.
    #[error("Failed to create swapchain: `{0}`")]
    SwapchainCreationFailed(vk::Result),
    /// The swapchain is out of date or suboptimal for the surface. Recoverable:
    /// the caller is expected to call [`Swapchain::recreate`](crate::Swapchain::recreate)
    /// and retry the frame.
    #[error("Swapchain is stale and must be recreated.")]
    SwapchainStale,
    /// Another swapchain recreation is already in flight. At most one may run at a time.
    #[error("Swapchain recreation already in flight.")]
    RecreationInFlight,
    /// Creating an image view failed.
    #[error("Failed to create image view: `{0}`")]
    ImageViewCreationFailed(vk::Result),
    /// The requested image layout transition is not one of the supported pairs.
    #[error("Unsupported image layout transition `{from:?}` -> `{to:?}`")]
    UnsupportedLayoutTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },
    /// Could not open a shader binary file.
    #[error("Failed to open shader file `{path}`: `{source}`")]
    ShaderFileOpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Creating a shader module failed.
    #[error("Failed to create shader module: `{0}`")]
    ShaderModuleCreationFailed(vk::Result),
    /// The shader reflection library rejected a shader binary.
    #[error("Shader reflection failed: `{0}`")]
    ShaderReflectionFailed(String),
    /// Two shader stages declare the same (set, binding) with a different type or count.
    #[error("Shader stages declare aliased descriptor at set {set}, binding {binding}.")]
    AliasedDescriptor {
        set: u32,
        binding: u32,
    },
    /// Illegal command buffer state transition, e.g. `end()` without `begin()`.
    #[error("Command buffer state violation: {0}")]
    CommandBufferStateViolation(&'static str),
    /// Requested mappable buffer access, but the buffer has no memory map.
    #[error("Buffer does not have a memory map.")]
    UnmappableBuffer,
    /// Tried to write more bytes into a buffer than it holds.
    #[error("Buffer write of {requested} bytes exceeds buffer size {size}.")]
    BufferWriteOutOfRange {
        requested: u64,
        size: u64,
    },
    /// Tried to write an image descriptor for an image without a bound sampler.
    #[error("Image has no sampler bound.")]
    NoSamplerBound,
    /// A queue family index was needed for a role that was never assigned on this device.
    #[error("No queue family assigned for role `{0:?}`.")]
    QueueFamilyUnassigned(QueueRole),
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
}

impl From<ash::LoadingError> for Error {
    fn from(value: ash::LoadingError) -> Self {
        Error::LoadFailed(value)
    }
}

impl From<NulError> for Error {
    fn from(value: NulError) -> Self {
        Error::InvalidString(value)
    }
}

impl From<vk::Result> for Error {
    fn from(value: vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
