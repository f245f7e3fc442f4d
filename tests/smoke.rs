//! Device-touching smoke tests. These need a working Vulkan driver, so they are
//! ignored by default; run them with `cargo test -- --ignored` on a machine with one.

use anyhow::Result;

use obsidian::prelude::*;

fn make_headless_context() -> Result<(
    Instance,
    PhysicalDevice,
    Device,
    DefaultAllocator,
    LocalPools,
)> {
    let settings = AppBuilder::<HeadlessWindow>::new()
        .name("obsidian test framework")
        .version((0, 0, 1))
        .validation(false)
        .gpu(DeviceRequirements {
            dedicated: false,
            anisotropic_sampling: false,
            queues: vec![QueueRole::Graphics, QueueRole::Transfer],
            device_extensions: vec![],
        })
        .build();
    let (instance, physical_device, surface, device, allocator, pools, swapchain, _debug) =
        initialize(&settings)?;
    assert!(surface.is_none(), "headless context should have no surface");
    assert!(swapchain.is_none(), "headless context should have no swapchain");
    Ok((instance, physical_device, device, allocator, pools))
}

/// Deterministic byte stream for round-trip checks.
fn pseudo_random_bytes(count: usize, mut seed: u64) -> Vec<u8> {
    (0..count)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (seed >> 56) as u8
        })
        .collect()
}

#[test]
#[ignore]
pub fn can_initialize() -> Result<()> {
    // Destructured so the locals drop in reverse creation order.
    let (_instance, _physical_device, _device, _allocator, _pools) = make_headless_context()?;
    Ok(())
}

#[test]
#[ignore]
pub fn every_required_role_has_a_queue() -> Result<()> {
    let (_instance, _physical_device, device, _allocator, _pools) = make_headless_context()?;
    device.queue(QueueRole::Graphics)?;
    device.queue(QueueRole::Transfer)?;
    Ok(())
}

#[test]
#[ignore]
pub fn buffer_round_trip_through_persistent_mapping() -> Result<()> {
    let (_instance, _physical_device, device, mut allocator, _pools) = make_headless_context()?;

    let payload = pseudo_random_bytes(4096, 0xB5EF_D00D);
    let mut buffer = Buffer::new(
        device,
        &mut allocator,
        payload.len() as u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    assert!(buffer.is_mapped());

    buffer.write(payload.as_slice())?;
    let read_back = buffer.mapped_slice::<u8>()?.to_vec();
    assert_eq!(read_back, payload);
    Ok(())
}

#[test]
#[ignore]
pub fn device_local_buffer_has_no_mapping() -> Result<()> {
    let (_instance, _physical_device, device, mut allocator, _pools) = make_headless_context()?;

    let mut buffer = Buffer::new_device_local(
        device,
        &mut allocator,
        64u64,
        vk::BufferUsageFlags::STORAGE_BUFFER,
    )?;
    assert!(!buffer.is_mapped());
    let err = buffer.write(&[0u8; 16]).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::UnmappableBuffer) => {}
        other => panic!("expected UnmappableBuffer, got {other:?}"),
    }
    Ok(())
}

#[test]
#[ignore]
pub fn command_buffer_state_machine_is_checked() -> Result<()> {
    let (_instance, _physical_device, device, _allocator, pools) = make_headless_context()?;
    let family = device.queue_family(QueueRole::Graphics)?;

    let mut cmd = pools.one_time_command_buffer(family)?;
    // end() before begin() must be rejected.
    assert!(cmd.end().is_err());
    cmd.begin()?;
    // Double begin must be rejected.
    assert!(cmd.begin().is_err());
    // Submitting while still recording must be rejected.
    assert!(cmd
        .submit(&[], vk::PipelineStageFlags::empty(), &[], vk::Fence::null(), false)
        .is_err());
    cmd.end()?;
    cmd.submit_and_wait()?;
    // A one-time buffer is exhausted after its single submission.
    assert!(cmd.begin().is_err());
    Ok(())
}

#[test]
#[ignore]
pub fn per_thread_pools_are_distinct() -> Result<()> {
    let (_instance, _physical_device, device, _allocator, pools) = make_headless_context()?;
    let family = device.queue_family(QueueRole::Graphics)?;

    let local = pools.transient_pool(family)?;
    let same_thread = pools.transient_pool(family)?;
    assert!(std::sync::Arc::ptr_eq(&local, &same_thread));

    std::thread::scope(|scope| -> Result<()> {
        let other_thread = scope
            .spawn(|| pools.transient_pool(family))
            .join()
            .unwrap()?;
        assert!(!std::sync::Arc::ptr_eq(&local, &other_thread));
        Ok(())
    })?;
    Ok(())
}
