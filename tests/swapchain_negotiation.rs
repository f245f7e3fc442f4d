//! Properties of swapchain parameter negotiation.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use anyhow::Result;

use obsidian::prelude::*;
use obsidian::wsi::swapchain::{
    clamp_extent, depth_stencil_channels, negotiate_extent, negotiate_image_count, RecreationGuard,
};

fn capabilities(
    min_images: u32,
    max_images: u32,
    current: (u32, u32),
    min_extent: (u32, u32),
    max_extent: (u32, u32),
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_images,
        max_image_count: max_images,
        current_extent: vk::Extent2D {
            width: current.0,
            height: current.1,
        },
        min_image_extent: vk::Extent2D {
            width: min_extent.0,
            height: min_extent.1,
        },
        max_image_extent: vk::Extent2D {
            width: max_extent.0,
            height: max_extent.1,
        },
        ..Default::default()
    }
}

/// Reports a scripted sequence of framebuffer sizes, advancing one entry per event poll.
struct ScriptedWindow {
    sizes: Vec<(u32, u32)>,
    cursor: Cell<usize>,
}

impl ScriptedWindow {
    fn new(sizes: Vec<(u32, u32)>) -> Self {
        Self {
            sizes,
            cursor: Cell::new(0),
        }
    }

    fn current(&self) -> (u32, u32) {
        self.sizes[self.cursor.get().min(self.sizes.len() - 1)]
    }
}

impl WindowSize for ScriptedWindow {
    fn width(&self) -> u32 {
        self.current().0
    }

    fn height(&self) -> u32 {
        self.current().1
    }

    fn wait_events(&self) {
        self.cursor.set(self.cursor.get() + 1);
    }
}

#[test]
pub fn image_count_exceeds_minimum() {
    let caps = capabilities(2, 8, (800, 600), (1, 1), (4096, 4096));
    let count = negotiate_image_count(&caps);
    assert!(count > caps.min_image_count);
    assert!(count <= caps.max_image_count);
    assert_eq!(count, 3);
}

#[test]
pub fn image_count_clamps_to_bounded_maximum() {
    let caps = capabilities(3, 3, (800, 600), (1, 1), (4096, 4096));
    assert_eq!(negotiate_image_count(&caps), 3);
}

#[test]
pub fn image_count_unbounded_when_max_is_zero() {
    // max_image_count == 0 means the driver imposes no upper bound.
    let caps = capabilities(5, 0, (800, 600), (1, 1), (4096, 4096));
    assert_eq!(negotiate_image_count(&caps), 6);
}

#[test]
pub fn defined_current_extent_taken_verbatim() {
    let caps = capabilities(2, 8, (1280, 720), (1, 1), (4096, 4096));
    let window = ScriptedWindow::new(vec![(9999, 9999)]);
    let extent = negotiate_extent(&caps, &window);
    assert_eq!(extent.width, 1280);
    assert_eq!(extent.height, 720);
}

#[test]
pub fn undefined_extent_derived_from_framebuffer() {
    let caps = capabilities(2, 8, (u32::MAX, u32::MAX), (1, 1), (4096, 4096));
    let window = ScriptedWindow::new(vec![(800, 600)]);
    let extent = negotiate_extent(&caps, &window);
    assert_eq!(extent.width, 800);
    assert_eq!(extent.height, 600);
}

#[test]
pub fn degenerate_framebuffer_blocks_until_valid() {
    // A minimized window reports (0, 0); negotiation polls until the platform reports
    // a usable size and never returns a zero-area extent.
    let caps = capabilities(2, 8, (u32::MAX, u32::MAX), (1, 1), (4096, 4096));
    let window = ScriptedWindow::new(vec![(0, 0), (800, 600)]);
    let extent = negotiate_extent(&caps, &window);
    assert_eq!(extent.width, 800);
    assert_eq!(extent.height, 600);
    assert!(extent.width > 0 && extent.height > 0);
}

#[test]
pub fn framebuffer_extent_clamped_into_bounds() {
    let caps = capabilities(2, 8, (u32::MAX, u32::MAX), (200, 200), (1024, 768));
    let window = ScriptedWindow::new(vec![(4000, 100)]);
    let extent = negotiate_extent(&caps, &window);
    assert_eq!(extent.width, 1024);
    assert_eq!(extent.height, 200);

    let clamped = clamp_extent(&caps, 4000, 100);
    assert_eq!(clamped, extent);
}

#[test]
pub fn negotiation_is_deterministic() {
    // Recreate-then-recreate from identical capability inputs must land on identical
    // parameters.
    let caps = capabilities(2, 8, (u32::MAX, u32::MAX), (1, 1), (4096, 4096));
    let first = {
        let window = ScriptedWindow::new(vec![(800, 600)]);
        (negotiate_extent(&caps, &window), negotiate_image_count(&caps))
    };
    let second = {
        let window = ScriptedWindow::new(vec![(800, 600)]);
        (negotiate_extent(&caps, &window), negotiate_image_count(&caps))
    };
    assert_eq!(first, second);
}

#[test]
pub fn depth_formats_deduce_channels() -> Result<()> {
    assert_eq!(depth_stencil_channels(vk::Format::D32_SFLOAT)?, (4, 0));
    assert_eq!(depth_stencil_channels(vk::Format::D32_SFLOAT_S8_UINT)?, (4, 1));
    assert_eq!(depth_stencil_channels(vk::Format::D24_UNORM_S8_UINT)?, (3, 1));
    Ok(())
}

#[test]
pub fn unsupported_depth_format_is_config_error() {
    let err = depth_stencil_channels(vk::Format::R8G8B8A8_SRGB).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::SwapchainConfigUnsupported(SwapchainConfigError::DepthFormat)) => {}
        other => panic!("expected depth format config error, got {other:?}"),
    }
}

#[test]
pub fn concurrent_recreation_admits_exactly_one() {
    // Two threads racing the recreation guard: exactly one acquires it, the other
    // observes the typed busy error.
    for _ in 0..64 {
        let guard = Arc::new(RecreationGuard::new());
        let contender = {
            let guard = guard.clone();
            thread::spawn(move || guard.try_acquire().is_ok())
        };
        let local = guard.try_acquire().is_ok();
        let remote = contender.join().unwrap();
        assert!(
            local ^ remote,
            "exactly one of two concurrent recreations may proceed (local: {local}, remote: {remote})"
        );
    }
}

#[test]
pub fn recreation_guard_reusable_after_release() {
    let guard = RecreationGuard::new();
    guard.try_acquire().unwrap();
    let busy = guard.try_acquire().unwrap_err();
    match busy.downcast_ref::<Error>() {
        Some(Error::RecreationInFlight) => {}
        other => panic!("expected RecreationInFlight, got {other:?}"),
    }
    guard.release();
    guard.try_acquire().unwrap();
}
