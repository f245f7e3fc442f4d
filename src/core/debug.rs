//! Debug messenger routing validation output into the `log` macros.

use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::util::string::wrap_c_str;
use crate::Instance;

// Per-severity message counters, reported when the messenger is destroyed.
static VERBOSE_MESSAGES: AtomicU32 = AtomicU32::new(0);
static INFO_MESSAGES: AtomicU32 = AtomicU32::new(0);
static WARN_MESSAGES: AtomicU32 = AtomicU32::new(0);
static ERROR_MESSAGES: AtomicU32 = AtomicU32::new(0);

/// Vulkan debug messenger. Forwards validation layer messages to the `log` macros
/// and keeps per-severity statistics. Requires the validation layers to be enabled
/// to do anything useful.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DebugMessenger {
    handle: vk::DebugUtilsMessengerEXT,
    #[derivative(Debug = "ignore")]
    functions: ash::extensions::ext::DebugUtils,
}

impl DebugMessenger {
    /// Creates a new debug messenger.
    pub fn new(instance: &Instance) -> Result<Self> {
        let functions =
            ash::extensions::ext::DebugUtils::new(unsafe { instance.loader() }, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
            p_next: std::ptr::null(),
            flags: Default::default(),
            message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            pfn_user_callback: Some(vk_debug_callback),
            p_user_data: std::ptr::null_mut(),
        };
        let handle = unsafe {
            functions
                .create_debug_utils_messenger(&info, None)
                .map_err(Error::DebugMessengerCreationFailed)?
        };
        Ok(DebugMessenger {
            handle,
            functions,
        })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        info!(
            "Validation messages: {} verbose, {} info, {} warnings, {} errors.",
            VERBOSE_MESSAGES.load(Ordering::Relaxed),
            INFO_MESSAGES.load(Ordering::Relaxed),
            WARN_MESSAGES.load(Ordering::Relaxed),
            ERROR_MESSAGES.load(Ordering::Relaxed)
        );
        unsafe {
            self.functions.destroy_debug_utils_messenger(self.handle, None);
        }
    }
}

impl Deref for DebugMessenger {
    type Target = ash::extensions::ext::DebugUtils;

    fn deref(&self) -> &Self::Target {
        &self.functions
    }
}

extern "system" fn vk_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    msg_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };
    let message = unsafe { wrap_c_str(callback_data.p_message) };

    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => {
            VERBOSE_MESSAGES.fetch_add(1, Ordering::Relaxed);
            trace!("[{msg_type:?}]: {message}");
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            INFO_MESSAGES.fetch_add(1, Ordering::Relaxed);
            info!("[{msg_type:?}]: {message}");
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            WARN_MESSAGES.fetch_add(1, Ordering::Relaxed);
            warn!("[{msg_type:?}]: {message}");
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            ERROR_MESSAGES.fetch_add(1, Ordering::Relaxed);
            error!("[{msg_type:?}]: {message}");
        }
        _ => {
            warn!("[unknown severity {severity:?}]: {message}");
        }
    };

    // Vulkan requires the callback to always return VK_FALSE.
    false as vk::Bool32
}
