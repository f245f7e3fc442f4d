//! Graphics pipeline construction.
//!
//! The builder collects shader stages and fixed-function state, then derives the
//! pipeline layout from shader reflection (default) or from an explicitly provided
//! [`PipelineLayoutCreateInfo`]. Viewport and scissor are dynamic states by default,
//! so pipelines survive swapchain recreation without being rebuilt.

pub mod pipeline_layout;
pub mod shader;
pub mod shader_reflection;

use std::ffi::CStr;

use anyhow::Result;
use ash::vk;

use crate::core::error::Error;
use crate::pipeline::pipeline_layout::{PipelineLayout, PipelineLayoutCreateInfo};
use crate::pipeline::shader::{Shader, ShaderCreateInfo};
use crate::render_pass::RenderPass;
use crate::Device;

const SHADER_ENTRY: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// A fully built graphics pipeline, owning its layout (and through it, the deduced
/// descriptor set layouts).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GraphicsPipeline {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Pipeline,
    layout: PipelineLayout,
}

impl GraphicsPipeline {
    /// The pipeline layout, including the descriptor set layouts deduced from the shaders.
    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    /// Get unsafe access to the underlying `VkPipeline` object.
    /// # Safety
    /// The caller must not destroy this handle.
    pub unsafe fn handle(&self) -> vk::Pipeline {
        self.handle
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkPipeline {:p}", self.handle);
        unsafe {
            self.device.destroy_pipeline(self.handle, None);
        }
    }
}

/// Builder for a [`GraphicsPipeline`]. Starts from the usual defaults: triangle lists,
/// filled polygons with back-face culling, no blending, depth test and write enabled,
/// dynamic viewport and scissor.
#[derive(Debug)]
pub struct GraphicsPipelineBuilder {
    shaders: Vec<ShaderCreateInfo>,
    layout: Option<PipelineLayoutCreateInfo>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    topology: vk::PrimitiveTopology,
    polygon_mode: vk::PolygonMode,
    cull_mode: vk::CullModeFlags,
    front_face: vk::FrontFace,
    samples: vk::SampleCountFlags,
    depth_test: bool,
    depth_write: bool,
    depth_op: vk::CompareOp,
    blend_enable: bool,
    dynamic_states: Vec<vk::DynamicState>,
    subpass: u32,
}

impl Default for GraphicsPipelineBuilder {
    fn default() -> Self {
        Self {
            shaders: vec![],
            layout: None,
            vertex_bindings: vec![],
            vertex_attributes: vec![],
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            samples: vk::SampleCountFlags::TYPE_1,
            depth_test: true,
            depth_write: true,
            depth_op: vk::CompareOp::LESS,
            blend_enable: false,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            subpass: 0,
        }
    }
}

impl GraphicsPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shader stage.
    pub fn shader(mut self, shader: ShaderCreateInfo) -> Self {
        self.shaders.push(shader);
        self
    }

    /// Provide an explicit pipeline layout instead of deducing one through reflection.
    pub fn layout(mut self, layout: PipelineLayoutCreateInfo) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Add a vertex input binding.
    pub fn vertex_binding(mut self, binding: vk::VertexInputBindingDescription) -> Self {
        self.vertex_bindings.push(binding);
        self
    }

    /// Add a vertex attribute.
    pub fn vertex_attribute(mut self, attribute: vk::VertexInputAttributeDescription) -> Self {
        self.vertex_attributes.push(attribute);
        self
    }

    pub fn topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn polygon_mode(mut self, mode: vk::PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn cull_mode(mut self, mode: vk::CullModeFlags, front_face: vk::FrontFace) -> Self {
        self.cull_mode = mode;
        self.front_face = front_face;
        self
    }

    pub fn samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the depth test. Compare op is only relevant while testing is enabled.
    pub fn depth(mut self, test: bool, write: bool, op: vk::CompareOp) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self.depth_op = op;
        self
    }

    /// Enable standard alpha blending on the color attachment.
    pub fn alpha_blending(mut self, enable: bool) -> Self {
        self.blend_enable = enable;
        self
    }

    /// Override the default dynamic states (viewport and scissor).
    pub fn dynamic_states(mut self, states: Vec<vk::DynamicState>) -> Self {
        self.dynamic_states = states;
        self
    }

    /// Select the subpass this pipeline is used in.
    pub fn subpass(mut self, subpass: u32) -> Self {
        self.subpass = subpass;
        self
    }

    /// Build the pipeline for a render pass.
    ///
    /// Without an explicit layout, the layout is deduced by reflecting all shader
    /// stages (requires the `shader-reflection` feature). All deduction happens before
    /// any native object is created; shader modules only live for the duration of this
    /// call.
    pub fn build(self, device: Device, render_pass: &RenderPass) -> Result<GraphicsPipeline> {
        let layout_info = match self.layout.as_ref() {
            Some(layout) => layout.clone(),
            None => self.deduce_layout()?,
        };
        let layout = PipelineLayout::new(device.clone(), &layout_info)?;

        let modules = self
            .shaders
            .iter()
            .map(|info| Shader::new(device.clone(), info))
            .collect::<Result<Vec<_>>>()?;
        let stages = self
            .shaders
            .iter()
            .zip(modules.iter())
            .map(|(info, module)| {
                vk::PipelineShaderStageCreateInfo::builder()
                    .stage(info.stage())
                    .module(unsafe { module.handle() })
                    .name(SHADER_ENTRY)
                    .build()
            })
            .collect::<Vec<_>>();

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(self.vertex_bindings.as_slice())
            .vertex_attribute_descriptions(self.vertex_attributes.as_slice())
            .build();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(false)
            .build();
        // Viewport and scissor counts must match even when both are dynamic.
        let viewport = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1)
            .build();
        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false)
            .line_width(1.0)
            .build();
        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(self.samples)
            .sample_shading_enable(false)
            .min_sample_shading(1.0)
            .build();
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(self.depth_test)
            .depth_write_enable(self.depth_write)
            .depth_compare_op(self.depth_op)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .build();
        let blend_attachment = vk::PipelineColorBlendAttachmentState {
            blend_enable: self.blend_enable as vk::Bool32,
            src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
            dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        };
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&blend_attachment))
            .build();
        let dynamic = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(self.dynamic_states.as_slice())
            .build();

        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages.as_slice())
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic)
            .layout(unsafe { layout.handle() })
            .render_pass(unsafe { render_pass.handle() })
            .subpass(self.subpass)
            .build();

        let handle = unsafe {
            device
                .create_graphics_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&info),
                    None,
                )
                .map_err(|(_, e)| Error::VkError(e))?[0]
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkPipeline {handle:p}");

        // Shader modules are no longer needed once the pipeline exists; `modules`
        // dropping at the end of this scope destroys them.
        Ok(GraphicsPipeline {
            device,
            handle,
            layout,
        })
    }

    #[cfg(feature = "shader-reflection")]
    fn deduce_layout(&self) -> Result<PipelineLayoutCreateInfo> {
        shader_reflection::reflect_shaders(self.shaders.as_slice())
    }

    #[cfg(not(feature = "shader-reflection"))]
    fn deduce_layout(&self) -> Result<PipelineLayoutCreateInfo> {
        Err(Error::ShaderReflectionFailed(
            "no explicit layout given and the shader-reflection feature is disabled".to_owned(),
        )
        .into())
    }
}
