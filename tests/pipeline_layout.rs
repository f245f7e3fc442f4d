//! Properties of reflection-driven pipeline layout deduction.

use anyhow::Result;

use obsidian::prelude::*;
use obsidian::pipeline::shader_reflection::{
    deduce_layout, merge_push_constants, DescriptorBinding, ReflectionInfo,
};

fn binding(
    set: u32,
    slot: u32,
    ty: vk::DescriptorType,
    stages: vk::ShaderStageFlags,
) -> DescriptorBinding {
    DescriptorBinding {
        set,
        binding: slot,
        ty,
        count: 1,
        stages,
    }
}

fn stage_info(bindings: Vec<DescriptorBinding>) -> ReflectionInfo {
    ReflectionInfo {
        bindings,
        push_constants: vec![],
    }
}

#[test]
pub fn same_slot_across_stages_merges_stage_masks() -> Result<()> {
    // Set 0 binding 2 referenced by both the vertex and the fragment stage must come
    // out as a single binding with both stage bits, never as two entries.
    let vertex = stage_info(vec![binding(
        0,
        2,
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::ShaderStageFlags::VERTEX,
    )]);
    let fragment = stage_info(vec![binding(
        0,
        2,
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::ShaderStageFlags::FRAGMENT,
    )]);

    let layout = deduce_layout(&[vertex, fragment])?;
    assert_eq!(layout.set_layouts.len(), 1);
    let bindings = &layout.set_layouts[0].bindings;
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].binding, 2);
    assert_eq!(
        bindings[0].stage_flags,
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    Ok(())
}

#[test]
pub fn set_layout_count_is_highest_set_plus_one() -> Result<()> {
    // Bindings in sets {0, 2} produce three layouts; the unused set 1 becomes an
    // empty layout so set numbers stay stable.
    let vertex = stage_info(vec![binding(
        0,
        0,
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::ShaderStageFlags::VERTEX,
    )]);
    let fragment = stage_info(vec![binding(
        2,
        1,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        vk::ShaderStageFlags::FRAGMENT,
    )]);

    let layout = deduce_layout(&[vertex, fragment])?;
    assert_eq!(layout.set_layouts.len(), 3);
    assert_eq!(layout.set_layouts[0].bindings.len(), 1);
    assert!(layout.set_layouts[1].bindings.is_empty());
    assert_eq!(layout.set_layouts[2].bindings.len(), 1);
    Ok(())
}

#[test]
pub fn bindings_sorted_within_sets() -> Result<()> {
    let stage = stage_info(vec![
        binding(0, 3, vk::DescriptorType::STORAGE_BUFFER, vk::ShaderStageFlags::COMPUTE),
        binding(0, 1, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::COMPUTE),
        binding(0, 2, vk::DescriptorType::STORAGE_IMAGE, vk::ShaderStageFlags::COMPUTE),
    ]);

    let layout = deduce_layout(&[stage])?;
    let slots: Vec<u32> = layout.set_layouts[0]
        .bindings
        .iter()
        .map(|b| b.binding)
        .collect();
    assert_eq!(slots, vec![1, 2, 3]);
    Ok(())
}

#[test]
pub fn no_bindings_produce_no_layouts() -> Result<()> {
    let layout = deduce_layout(&[stage_info(vec![]), stage_info(vec![])])?;
    assert!(layout.set_layouts.is_empty());
    assert!(layout.push_constants.is_empty());
    Ok(())
}

#[test]
pub fn aliased_slot_with_conflicting_type_rejected() {
    let vertex = stage_info(vec![binding(
        1,
        0,
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::ShaderStageFlags::VERTEX,
    )]);
    let fragment = stage_info(vec![binding(
        1,
        0,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        vk::ShaderStageFlags::FRAGMENT,
    )]);

    let err = deduce_layout(&[vertex, fragment]).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::AliasedDescriptor {
            set: 1,
            binding: 0,
        }) => {}
        other => panic!("expected aliased descriptor error, got {other:?}"),
    }
}

#[test]
pub fn push_constant_ranges_merge_by_offset_and_size() {
    let vertex = ReflectionInfo {
        bindings: vec![],
        push_constants: vec![PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 64,
        }],
    };
    let fragment = ReflectionInfo {
        bindings: vec![],
        push_constants: vec![PushConstantRange {
            stage_flags: vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: 64,
        }],
    };

    let merged = merge_push_constants(&[vertex, fragment]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].offset, 0);
    assert_eq!(merged[0].size, 64);
    assert_eq!(
        merged[0].stage_flags,
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
}

#[test]
pub fn distinct_push_constant_ranges_stay_separate() {
    let vertex = ReflectionInfo {
        bindings: vec![],
        push_constants: vec![PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 64,
        }],
    };
    let fragment = ReflectionInfo {
        bindings: vec![],
        push_constants: vec![PushConstantRange {
            stage_flags: vk::ShaderStageFlags::FRAGMENT,
            offset: 64,
            size: 16,
        }],
    };

    let merged = merge_push_constants(&[vertex, fragment]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].offset, 0);
    assert_eq!(merged[1].offset, 64);
}

#[test]
pub fn merged_ranges_flow_into_layout_info() -> Result<()> {
    let vertex = ReflectionInfo {
        bindings: vec![binding(
            0,
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            vk::ShaderStageFlags::VERTEX,
        )],
        push_constants: vec![PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 16,
        }],
    };

    let layout = deduce_layout(&[vertex])?;
    assert_eq!(layout.push_constants.len(), 1);
    assert_eq!(layout.push_constants[0].to_vk().size, 16);
    Ok(())
}
