//! The wsi module provides utilities for interacting with the window surface and
//! negotiating, recreating and presenting the swapchain.
//! If you are using a headless context, you can largely ignore this module.

pub mod surface;
pub mod swapchain;
pub mod window;
