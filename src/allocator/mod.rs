//! The allocator module exposes a couple interesting parts of the API
//! <br>
//! <br>
//! # Allocator traits
//! These are defined in [`traits`], and can be implemented to supply a custom allocator type.
//! # Default allocator
//! A default allocator based on the `gpu_allocator` crate is implemented here. This is the
//! allocator used by [`initialize`](crate::initialize) and is good for most needs.

pub mod default_allocator;
pub mod memory_type;
pub mod traits;
