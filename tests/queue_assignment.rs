//! Properties of the queue family assignment computed during device selection.

use anyhow::Result;

use obsidian::prelude::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

#[test]
pub fn all_required_roles_resolve_or_none() -> Result<()> {
    // A device exposing graphics+transfer but no present support must not satisfy a
    // requirement set that includes present; the partial assignment is rejected as a
    // whole, never returned.
    let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER)];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(false))?;

    assert!(assignment.satisfies(&[QueueRole::Graphics, QueueRole::Transfer]));
    assert!(!assignment.satisfies(&[
        QueueRole::Graphics,
        QueueRole::Transfer,
        QueueRole::Present
    ]));
    assert_eq!(assignment.present, None);
    Ok(())
}

#[test]
pub fn graphics_and_present_unify() -> Result<()> {
    // Family 0 has graphics only, family 1 can present only, family 2 supports both.
    // Unification is preferred over the first-found split assignment.
    let families = [
        family(vk::QueueFlags::GRAPHICS),
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
    ];
    let assignment = QueueFamilyAssignment::resolve(&families, |index| Ok(index >= 1))?;

    assert_eq!(assignment.graphics, Some(2));
    assert_eq!(assignment.present, Some(2));
    Ok(())
}

#[test]
pub fn unified_family_stays_unified() -> Result<()> {
    // When the very first family supports both roles there is nothing to override.
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS),
    ];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(true))?;

    assert_eq!(assignment.graphics, Some(0));
    assert_eq!(assignment.present, Some(0));
    Ok(())
}

#[test]
pub fn transfer_prefers_dedicated_family() -> Result<()> {
    // Family 0 is the do-everything family; family 1 only has transfer. Transfer must
    // move off the graphics family so copies can overlap with rendering.
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::TRANSFER),
    ];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(true))?;

    assert_eq!(assignment.graphics, Some(0));
    assert_eq!(assignment.transfer, Some(1));
    Ok(())
}

#[test]
pub fn transfer_stays_dedicated_once_split() -> Result<()> {
    // A later transfer-capable family must not steal the assignment back once transfer
    // already differs from graphics.
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::TRANSFER | vk::QueueFlags::COMPUTE),
    ];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(false))?;

    assert_eq!(assignment.transfer, Some(1));
    Ok(())
}

#[test]
pub fn optional_roles_stay_unassigned() -> Result<()> {
    let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER)];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(true))?;

    assert_eq!(assignment.compute, None);
    assert_eq!(assignment.sparse_binding, None);
    assert_eq!(assignment.index(QueueRole::Compute), None);
    Ok(())
}

#[test]
pub fn first_satisfying_family_claims_role() -> Result<()> {
    let families = [
        family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::COMPUTE),
    ];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(false))?;

    assert_eq!(assignment.compute, Some(0));
    Ok(())
}

#[test]
pub fn distinct_families_deduplicate() -> Result<()> {
    let families = [family(
        vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
    )];
    let assignment = QueueFamilyAssignment::resolve(&families, |_| Ok(true))?;

    assert_eq!(assignment.distinct_families(), vec![0]);
    Ok(())
}
