//! Synchronization primitives: fences for CPU-GPU sync, semaphores for GPU-GPU sync.
//! No ordering is imposed beyond what these native primitives provide.

pub mod fence;
pub mod semaphore;
