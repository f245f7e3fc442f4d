//! SPIR-V shader loading and shader module objects.

use std::fs::File;
use std::path::Path;

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::Device;

/// Info required to create a shader: the pipeline stage it belongs to and its SPIR-V code.
/// Use [`ShaderCreateInfo::from_spirv`] or [`ShaderCreateInfo::from_file`] to construct this.
#[derive(Debug, Clone)]
pub struct ShaderCreateInfo {
    stage: vk::ShaderStageFlags,
    code: Vec<u32>,
}

impl ShaderCreateInfo {
    /// Wrap an already loaded SPIR-V binary.
    pub fn from_spirv(stage: vk::ShaderStageFlags, code: Vec<u32>) -> Self {
        Self {
            stage,
            code,
        }
    }

    /// Load a SPIR-V binary from a file. Shaders are pre-compiled; this does not invoke
    /// any shader compiler.
    /// # Errors
    /// Fails with [`Error::ShaderFileOpenFailed`] if the file cannot be opened or is not
    /// a valid SPIR-V binary stream.
    pub fn from_file(stage: vk::ShaderStageFlags, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| Error::ShaderFileOpenFailed {
            path: path.to_owned(),
            source,
        })?;
        let code = ash::util::read_spv(&mut file).map_err(|source| Error::ShaderFileOpenFailed {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::from_spirv(stage, code))
    }

    /// The pipeline stage this shader belongs to.
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.stage
    }

    /// The SPIR-V code words.
    pub fn code(&self) -> &[u32] {
        self.code.as_slice()
    }
}

/// Wrapper around a [`VkShaderModule`](vk::ShaderModule). Only needed while the pipeline
/// using it is being created.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Shader {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::ShaderModule,
}

impl Shader {
    /// Create a shader module from loaded SPIR-V code.
    pub fn new(device: Device, info: &ShaderCreateInfo) -> Result<Self> {
        let vk_info = vk::ShaderModuleCreateInfo::builder().code(info.code()).build();
        let handle = unsafe {
            device
                .create_shader_module(&vk_info, None)
                .map_err(Error::ShaderModuleCreationFailed)?
        };
        Ok(Self {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkShaderModule` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
    }
}
