//! Command pools and command buffers.
//!
//! Command buffers come in two kinds, decided once at allocation time by the flags of
//! the pool they come from and matched on every use:
//! * [`CommandBufferKind::OneTime`]: begun with `ONE_TIME_SUBMIT`, unusable after its
//!   single submission.
//! * [`CommandBufferKind::Resettable`]: implicitly reset on every [`CommandBuffer::begin`].
//!
//! The recording state machine (`begin` → record → `end` → `submit`) is checked in all
//! build configurations; illegal transitions fail with
//! [`Error::CommandBufferStateViolation`](crate::Error::CommandBufferStateViolation).

pub mod command_pool;

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::command_buffer::command_pool::CommandPool;
use crate::core::error::Error;

/// The behavior variant of a command buffer, fixed at allocation time from the flags
/// of its parent pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CommandBufferKind {
    /// Recorded once, submitted once, then exhausted.
    OneTime,
    /// May be re-begun any number of times; begin resets the previous recording.
    Resettable,
}

/// Wrapper around a [`VkCommandBuffer`](vk::CommandBuffer), allocated from a
/// [`CommandPool`]. Holds its pool alive; the underlying memory is released back to
/// the pool on drop.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CommandBuffer {
    #[derivative(Debug = "ignore")]
    pool: Arc<CommandPool>,
    handle: vk::CommandBuffer,
    level: vk::CommandBufferLevel,
    kind: CommandBufferKind,
    recording: bool,
    exhausted: bool,
}

impl CommandBuffer {
    pub(crate) fn new(
        pool: Arc<CommandPool>,
        handle: vk::CommandBuffer,
        level: vk::CommandBufferLevel,
        kind: CommandBufferKind,
    ) -> Self {
        CommandBuffer {
            pool,
            handle,
            level,
            kind,
            recording: false,
            exhausted: false,
        }
    }

    /// Start recording. A resettable buffer is implicitly reset first; a one-time buffer
    /// is begun with `ONE_TIME_SUBMIT`.
    /// # Errors
    /// * Already recording.
    /// * One-time buffer that was already submitted.
    pub fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(
                Error::CommandBufferStateViolation("begin() of a recording command buffer").into(),
            );
        }
        if self.exhausted {
            return Err(Error::CommandBufferStateViolation(
                "begin() of an already submitted one-time command buffer",
            )
            .into());
        }

        let flags = match self.kind {
            CommandBufferKind::OneTime => vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            CommandBufferKind::Resettable => {
                unsafe {
                    self.pool.device().reset_command_buffer(
                        self.handle,
                        vk::CommandBufferResetFlags::empty(),
                    )?
                };
                vk::CommandBufferUsageFlags::empty()
            }
        };

        let info = vk::CommandBufferBeginInfo::builder().flags(flags).build();
        unsafe { self.pool.device().begin_command_buffer(self.handle, &info)? };
        self.recording = true;
        Ok(())
    }

    /// Finish recording.
    /// # Errors
    /// Fails if the buffer is not recording.
    pub fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(
                Error::CommandBufferStateViolation("end() of an idle command buffer").into(),
            );
        }
        unsafe { self.pool.device().end_command_buffer(self.handle)? };
        self.recording = false;
        Ok(())
    }

    /// Submit this command buffer to its pool's queue.
    ///
    /// `wait_semaphores` are waited on at `wait_stage` before execution, `signal_semaphores`
    /// and `fence` are signaled on completion. With `wait_queue_idle` set this blocks until
    /// the queue drained, which is how one-time upload buffers are typically used.
    ///
    /// Queues are externally synchronized; the caller must not submit to the same queue
    /// from two threads at once.
    /// # Errors
    /// * Still recording (missing `end()`).
    /// * One-time buffer that was already submitted.
    pub fn submit(
        &mut self,
        wait_semaphores: &[vk::Semaphore],
        wait_stage: vk::PipelineStageFlags,
        signal_semaphores: &[vk::Semaphore],
        fence: vk::Fence,
        wait_queue_idle: bool,
    ) -> Result<()> {
        if self.recording {
            return Err(Error::CommandBufferStateViolation(
                "submit() of a recording command buffer, call end() first",
            )
            .into());
        }
        if self.exhausted {
            return Err(Error::CommandBufferStateViolation(
                "submit() of an already submitted one-time command buffer",
            )
            .into());
        }

        // One stage mask entry per wait semaphore.
        let wait_stages = vec![wait_stage; wait_semaphores.len()];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages.as_slice())
            .command_buffers(std::slice::from_ref(&self.handle))
            .signal_semaphores(signal_semaphores)
            .build();
        unsafe {
            self.pool.device().queue_submit(
                self.pool.queue(),
                std::slice::from_ref(&submit),
                fence,
            )?;
            if wait_queue_idle {
                self.pool.device().queue_wait_idle(self.pool.queue())?;
            }
        }
        if self.kind == CommandBufferKind::OneTime {
            self.exhausted = true;
        }
        Ok(())
    }

    /// Convenience for fire-and-forget uploads: submit with no sync objects and block
    /// until the queue drained.
    pub fn submit_and_wait(&mut self) -> Result<()> {
        self.submit(
            &[],
            vk::PipelineStageFlags::empty(),
            &[],
            vk::Fence::null(),
            true,
        )
    }

    /// True while between [`CommandBuffer::begin`] and [`CommandBuffer::end`].
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The behavior variant fixed at allocation time.
    pub fn kind(&self) -> CommandBufferKind {
        self.kind
    }

    /// The command buffer level (primary or secondary).
    pub fn level(&self) -> vk::CommandBufferLevel {
        self.level
    }

    /// The raw vulkan handle, for recording commands through the device.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.pool
                .device()
                .free_command_buffers(self.pool.handle(), std::slice::from_ref(&self.handle));
        }
    }
}
