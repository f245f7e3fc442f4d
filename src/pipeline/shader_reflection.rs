//! Implements shader reflection to generate pipeline layouts automatically.
//!
//! Reflection itself (parsing a SPIR-V binary into binding and push constant records)
//! lives behind the `shader-reflection` feature and delegates to SPIRV-Cross. The
//! cross-stage deduction that merges those records into a pipeline layout is plain
//! data-flow over the records and is always available; see [`deduce_layout`].

use anyhow::Result;
use ash::vk;
#[cfg(feature = "shader-reflection")]
use spv_cross::spirv::{Decoration, ShaderResources, Type};

use crate::core::error::Error;
use crate::descriptor::set_layout::DescriptorSetLayoutCreateInfo;
use crate::pipeline::pipeline_layout::{PipelineLayoutCreateInfo, PushConstantRange};
#[cfg(feature = "shader-reflection")]
use crate::pipeline::shader::ShaderCreateInfo;

#[cfg(feature = "shader-reflection")]
type Ast = spv_cross::spirv::Ast<spv_cross::glsl::Target>;

/// Maximum descriptor count substituted for unbounded descriptor arrays.
#[cfg(feature = "shader-reflection")]
const UNBOUNDED_ARRAY_SIZE: u32 = 4096;

/// A descriptor binding referenced by one or more shader stages. Transient: produced
/// per shader during pipeline construction, merged across stages, consumed to build
/// the set layouts, then discarded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DescriptorBinding {
    /// Descriptor set index.
    pub set: u32,
    /// Binding index within the set.
    pub binding: u32,
    /// Descriptor type at this slot.
    pub ty: vk::DescriptorType,
    /// Array size of the binding.
    pub count: u32,
    /// Every shader stage referencing this slot.
    pub stages: vk::ShaderStageFlags,
}

/// Reflection output for a single shader stage.
#[derive(Debug, Clone, Default)]
pub struct ReflectionInfo {
    pub bindings: Vec<DescriptorBinding>,
    pub push_constants: Vec<PushConstantRange>,
}

/// Merge reflection output from the stages of one pipeline into a pipeline layout
/// description.
///
/// Bindings are sorted by (set, binding); consecutive entries for the same slot merge
/// their stage masks into one binding. The set layout list has one entry per set index
/// up to the highest observed; set indices no stage references become empty layouts.
/// Push constant ranges merge the same way, keyed by (offset, size).
///
/// This is pure deduction over the records: no native object is created here, so a
/// failure leaves nothing to roll back.
/// # Errors
/// Fails with [`Error::AliasedDescriptor`] when two stages declare the same slot with
/// a different type or count.
pub fn deduce_layout(stages: &[ReflectionInfo]) -> Result<PipelineLayoutCreateInfo> {
    let mut bindings: Vec<DescriptorBinding> = stages
        .iter()
        .flat_map(|stage| stage.bindings.iter().copied())
        .collect();
    bindings.sort_by_key(|binding| (binding.set, binding.binding));

    let mut merged: Vec<DescriptorBinding> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match merged.last_mut() {
            Some(previous)
                if previous.set == binding.set && previous.binding == binding.binding =>
            {
                if previous.ty != binding.ty || previous.count != binding.count {
                    return Err(Error::AliasedDescriptor {
                        set: binding.set,
                        binding: binding.binding,
                    }
                    .into());
                }
                previous.stages |= binding.stages;
            }
            _ => merged.push(binding),
        }
    }

    // One layout per set index up to the highest observed; gaps stay empty.
    let set_count = merged
        .iter()
        .map(|binding| binding.set + 1)
        .max()
        .unwrap_or(0);
    let mut set_layouts = vec![DescriptorSetLayoutCreateInfo::default(); set_count as usize];
    for binding in &merged {
        set_layouts[binding.set as usize]
            .bindings
            .push(vk::DescriptorSetLayoutBinding {
                binding: binding.binding,
                descriptor_type: binding.ty,
                descriptor_count: binding.count,
                stage_flags: binding.stages,
                p_immutable_samplers: std::ptr::null(),
            });
    }

    Ok(PipelineLayoutCreateInfo {
        set_layouts,
        push_constants: merge_push_constants(stages),
    })
}

/// Merge push constant ranges across stages: ranges with identical (offset, size)
/// OR their stage masks together instead of duplicating.
pub fn merge_push_constants(stages: &[ReflectionInfo]) -> Vec<PushConstantRange> {
    let mut ranges: Vec<PushConstantRange> = stages
        .iter()
        .flat_map(|stage| stage.push_constants.iter().copied())
        .collect();
    ranges.sort_by_key(|range| (range.offset, range.size));

    let mut merged: Vec<PushConstantRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(previous)
                if previous.offset == range.offset && previous.size == range.size =>
            {
                previous.stage_flags |= range.stage_flags;
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Parse a compiled shader binary and extract the descriptor bindings and push constant
/// ranges referenced by its stage. Pure parse: no native graphics object is created.
/// # Errors
/// Fails with [`Error::ShaderReflectionFailed`] on a malformed binary; this is fatal,
/// not recoverable.
#[cfg(feature = "shader-reflection")]
pub fn reflect_stage(code: &[u32], stage: vk::ShaderStageFlags) -> Result<ReflectionInfo> {
    let module = spv_cross::spirv::Module::from_words(code);
    let mut ast: Ast = Ast::parse(&module).map_err(reflection_error)?;
    let resources = ast.get_shader_resources().map_err(reflection_error)?;

    let mut info = ReflectionInfo::default();
    find_sampled_images(&mut ast, stage, &resources, &mut info)?;
    find_uniform_buffers(&mut ast, stage, &resources, &mut info)?;
    find_storage_buffers(&mut ast, stage, &resources, &mut info)?;
    find_storage_images(&mut ast, stage, &resources, &mut info)?;
    find_push_constants(&mut ast, stage, &resources, &mut info)?;
    Ok(info)
}

/// Reflect all shaders of one pipeline and deduce its layout.
#[cfg(feature = "shader-reflection")]
pub(crate) fn reflect_shaders(shaders: &[ShaderCreateInfo]) -> Result<PipelineLayoutCreateInfo> {
    let stages = shaders
        .iter()
        .map(|shader| reflect_stage(shader.code(), shader.stage()))
        .collect::<Result<Vec<_>>>()?;
    deduce_layout(stages.as_slice())
}

#[cfg(feature = "shader-reflection")]
fn reflection_error(err: spv_cross::ErrorCode) -> Error {
    Error::ShaderReflectionFailed(format!("{err:?}"))
}

#[cfg(feature = "shader-reflection")]
fn binding_location(ast: &mut Ast, id: u32) -> Result<(u32, u32)> {
    let set = ast
        .get_decoration(id, Decoration::DescriptorSet)
        .map_err(reflection_error)?;
    let binding = ast
        .get_decoration(id, Decoration::Binding)
        .map_err(reflection_error)?;
    Ok((set, binding))
}

// Note that aliasing within a single stage is not supported.

#[cfg(feature = "shader-reflection")]
fn find_sampled_images(
    ast: &mut Ast,
    stage: vk::ShaderStageFlags,
    resources: &ShaderResources,
    info: &mut ReflectionInfo,
) -> Result<()> {
    for image in &resources.sampled_images {
        let (set, binding) = binding_location(ast, image.id)?;
        let ty = ast.get_type(image.type_id).map_err(reflection_error)?;
        let Type::SampledImage { array, .. } = ty else {
            return Err(Error::ShaderReflectionFailed(
                "sampled image resource with a non-image type".to_owned(),
            )
            .into());
        };
        let count = match array.first() {
            Some(0) => UNBOUNDED_ARRAY_SIZE,
            Some(size) => *size,
            None => 1,
        };
        info.bindings.push(DescriptorBinding {
            set,
            binding,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            count,
            stages: stage,
        });
    }
    Ok(())
}

#[cfg(feature = "shader-reflection")]
fn find_uniform_buffers(
    ast: &mut Ast,
    stage: vk::ShaderStageFlags,
    resources: &ShaderResources,
    info: &mut ReflectionInfo,
) -> Result<()> {
    for buffer in &resources.uniform_buffers {
        let (set, binding) = binding_location(ast, buffer.id)?;
        info.bindings.push(DescriptorBinding {
            set,
            binding,
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            count: 1,
            stages: stage,
        });
    }
    Ok(())
}

#[cfg(feature = "shader-reflection")]
fn find_storage_buffers(
    ast: &mut Ast,
    stage: vk::ShaderStageFlags,
    resources: &ShaderResources,
    info: &mut ReflectionInfo,
) -> Result<()> {
    for buffer in &resources.storage_buffers {
        let (set, binding) = binding_location(ast, buffer.id)?;
        info.bindings.push(DescriptorBinding {
            set,
            binding,
            ty: vk::DescriptorType::STORAGE_BUFFER,
            count: 1,
            stages: stage,
        });
    }
    Ok(())
}

#[cfg(feature = "shader-reflection")]
fn find_storage_images(
    ast: &mut Ast,
    stage: vk::ShaderStageFlags,
    resources: &ShaderResources,
    info: &mut ReflectionInfo,
) -> Result<()> {
    for image in &resources.storage_images {
        let (set, binding) = binding_location(ast, image.id)?;
        info.bindings.push(DescriptorBinding {
            set,
            binding,
            ty: vk::DescriptorType::STORAGE_IMAGE,
            count: 1,
            stages: stage,
        });
    }
    Ok(())
}

#[cfg(feature = "shader-reflection")]
fn find_push_constants(
    ast: &mut Ast,
    stage: vk::ShaderStageFlags,
    resources: &ShaderResources,
    info: &mut ReflectionInfo,
) -> Result<()> {
    for pc in &resources.push_constant_buffers {
        let ranges = ast
            .get_active_buffer_ranges(pc.id)
            .map_err(reflection_error)?;
        for range in ranges {
            info.push_constants.push(PushConstantRange {
                stage_flags: stage,
                offset: range.offset as u32,
                size: range.range as u32,
            });
        }
    }
    Ok(())
}
