//! Lean Vulkan RHI abstraction layer
//!
//! Obsidian wraps the lifetime-heavy parts of Vulkan (instance, device,
//! swapchain, pools, pipelines) in small RAII types and automates the two
//! genuinely annoying bits of bringing up a context: negotiating device and
//! swapchain capabilities, and deducing pipeline layouts from shader
//! binaries through reflection. Everything else stays a thin, checked
//! pass-through into the driver.
//!
//! To get started, import the types through the prelude:
//! ```
//! use obsidian::prelude::*;
//! ```
//!
//! # Example
//!
//! Initialization is driven by an [`AppSettings`] structure describing what
//! the application needs. Obsidian uses it to pick a physical device and
//! negotiate a swapchain for it.
//! ```no_run
//! use obsidian::prelude::*;
//! # use winit::window::WindowBuilder;
//! # use winit::event_loop::EventLoopBuilder;
//! # fn main() -> anyhow::Result<()> {
//! let event_loop = EventLoopBuilder::new().build();
//! let window = WindowBuilder::new()
//!     .with_title("obsidian demo")
//!     .build(&event_loop)?;
//!
//! let settings = AppBuilder::new()
//!     .name("demo")
//!     .version((1, 0, 0))
//!     .validation(true)
//!     .window(&window)
//!     .present_mode(vk::PresentModeKHR::MAILBOX)
//!     .build();
//!
//! let (instance, physical_device, surface, device, allocator, pools, swapchain, debug) =
//!     obsidian::initialize(&settings)?;
//! # Ok(())
//! # }
//! ```
//!
//! Per-frame, [`Swapchain::acquire_next_image`] and [`Swapchain::present`]
//! return the distinguished [`Error::SwapchainStale`] when the surface went
//! out of date; catch it and call [`Swapchain::recreate`] to rebuild the
//! swapchain without tearing down the device.
//!
//! For further reading, check out the following modules:
//! - [`pipeline`] for pipeline creation and reflection-driven layouts.
//! - [`wsi`] for surfaces and swapchain negotiation.
//! - [`descriptor`] and [`command_buffer`] for pool-owned objects.
//! - [`pool`] for the per-thread pool caches.
//! - [`allocator`] for device memory allocation.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod allocator;
pub mod buffer;
pub mod command_buffer;
pub mod core;
pub mod descriptor;
pub mod image;
pub mod pipeline;
pub mod pool;
pub mod render_pass;
pub mod sampler;
pub mod sync;
pub mod util;
pub mod wsi;
