//! Utilities for generic window handling

use raw_window_handle::{
    HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle,
};
#[cfg(feature = "winit")]
use winit;

/// Trait for windows that exposes the live framebuffer size and a way to wait
/// for the platform to report new events.
///
/// The framebuffer size is polled during swapchain extent negotiation whenever
/// the surface reports an undefined extent; while the size is degenerate (a
/// minimized window reports zero width or height) negotiation blocks by
/// polling [`WindowSize::wait_events`] between reads.
pub trait WindowSize {
    /// Get the width of the window framebuffer, in pixels.
    fn width(&self) -> u32;
    /// Get the height of the window framebuffer, in pixels.
    fn height(&self) -> u32;
    /// Block until the platform may have new events for this window. The default
    /// implementation yields the thread; windowing libraries that can pump
    /// events from any thread should override this.
    fn wait_events(&self) {
        std::thread::yield_now();
    }
}

/// Used as a dummy window interface in case of a headless context. Calling any of the
/// `raw_xxx_handle()` functions on this will result in a panic.
#[derive(Debug)]
pub struct HeadlessWindow;

unsafe impl HasRawWindowHandle for HeadlessWindow {
    fn raw_window_handle(&self) -> RawWindowHandle {
        panic!("Called raw_window_handle() on headless window context.");
    }
}

unsafe impl HasRawDisplayHandle for HeadlessWindow {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        panic!("Called raw_display_handle() on headless window context.");
    }
}

impl WindowSize for HeadlessWindow {
    fn width(&self) -> u32 {
        panic!("Called width() on headless window context.");
    }

    fn height(&self) -> u32 {
        panic!("Called height() on headless window context.");
    }
}

#[cfg(feature = "winit")]
impl WindowSize for winit::window::Window {
    fn width(&self) -> u32 {
        self.inner_size().width
    }

    fn height(&self) -> u32 {
        self.inner_size().height
    }
}

/// Parent trait combining all requirements for a window interface. To be a window interface,
/// a type T must implement the following traits:
/// - [`HasRawWindowHandle`](raw_window_handle::HasRawWindowHandle)
/// - [`HasRawDisplayHandle`](raw_window_handle::HasRawDisplayHandle)
/// - [`WindowSize`]
pub trait WindowInterface: HasRawWindowHandle + HasRawDisplayHandle + WindowSize {}
impl<T: HasRawWindowHandle + HasRawDisplayHandle + WindowSize> WindowInterface for T {}
