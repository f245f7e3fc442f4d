//! Queue roles and the queue family assignment computed during device selection.

use anyhow::Result;
use ash::vk;

/// A role a hardware queue family can fulfill for the application.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum QueueRole {
    /// Graphics (draw) submission.
    Graphics,
    /// Presentation to a surface.
    Present,
    /// Compute dispatch.
    Compute,
    /// Transfer (copy) operations. Any graphics or compute family implicitly
    /// supports transfer, but only families with the explicit transfer bit
    /// are assigned here.
    Transfer,
    /// Sparse binding operations.
    SparseBinding,
}

/// The queue family index chosen for each role on a physical device candidate.
///
/// Computed once per candidate during [`PhysicalDevice::select`](crate::PhysicalDevice::select)
/// and discarded if the candidate is rejected. A selected device always has every
/// *required* role resolved to a concrete index.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct QueueFamilyAssignment {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub compute: Option<u32>,
    pub transfer: Option<u32>,
    pub sparse_binding: Option<u32>,
}

impl QueueFamilyAssignment {
    /// Walk the queue families of a candidate in enumeration order and assign roles.
    ///
    /// Assignment policy:
    /// - The first family exposing a capability claims the role, if the role is
    ///   still unassigned.
    /// - A family exposing both graphics and present overrides both indices so
    ///   they end up unified, even if earlier families already claimed them
    ///   separately.
    /// - A family exposing transfer while the current transfer assignment equals
    ///   the graphics assignment takes over transfer, so transfer work can
    ///   overlap with graphics.
    ///
    /// `supports_present` is queried per family; pass `|_| Ok(false)` for a
    /// headless context.
    pub fn resolve(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> Result<bool>,
    ) -> Result<Self> {
        let mut assignment = QueueFamilyAssignment::default();
        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let compute = family.queue_flags.contains(vk::QueueFlags::COMPUTE);
            let transfer = family.queue_flags.contains(vk::QueueFlags::TRANSFER);
            let sparse = family.queue_flags.contains(vk::QueueFlags::SPARSE_BINDING);
            let present = supports_present(index)?;

            if graphics && assignment.graphics.is_none() {
                assignment.graphics = Some(index);
            }
            if compute && assignment.compute.is_none() {
                assignment.compute = Some(index);
            }
            if transfer && assignment.transfer.is_none() {
                assignment.transfer = Some(index);
            }
            if sparse && assignment.sparse_binding.is_none() {
                assignment.sparse_binding = Some(index);
            }
            if present && assignment.present.is_none() {
                assignment.present = Some(index);
            }

            // Prefer a single family for graphics and present over whatever was
            // found first.
            if graphics && present && assignment.graphics != assignment.present {
                assignment.graphics = Some(index);
                assignment.present = Some(index);
            }

            // Prefer a transfer family distinct from the graphics family.
            if transfer && assignment.transfer == assignment.graphics {
                assignment.transfer = Some(index);
            }
        }
        Ok(assignment)
    }

    /// Get the assigned family index for a role.
    pub fn index(&self, role: QueueRole) -> Option<u32> {
        match role {
            QueueRole::Graphics => self.graphics,
            QueueRole::Present => self.present,
            QueueRole::Compute => self.compute,
            QueueRole::Transfer => self.transfer,
            QueueRole::SparseBinding => self.sparse_binding,
        }
    }

    /// True if every role in `required` resolved to a concrete index.
    pub fn satisfies(&self, required: &[QueueRole]) -> bool {
        required.iter().all(|role| self.index(*role).is_some())
    }

    /// The distinct assigned family indices, in ascending order. Used to build
    /// one queue create info per physical family.
    pub fn distinct_families(&self) -> Vec<u32> {
        let mut families: Vec<u32> = [
            self.graphics,
            self.present,
            self.compute,
            self.transfer,
            self.sparse_binding,
        ]
        .iter()
        .flatten()
        .copied()
        .collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}
