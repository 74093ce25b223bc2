#![forbid(unsafe_code)]

//! Hooks for a host that mirrors engine objects into its own tables.
//!
//! A VM bridge that hands out its own handles for windows and streams, or
//! that pins caller arrays while the engine holds them, implements
//! [`DispatchObserver`]. Every method defaults to a no-op.

use fglk_layout::WindowId;

use crate::stream::StreamId;
use crate::vm::GlkEvent;

/// Who is holding a caller array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferOwner {
    LineInput(WindowId),
    MemoryStream(StreamId),
}

pub trait DispatchObserver {
    fn window_created(&mut self, _win: WindowId, _rock: u32) {}
    fn window_destroyed(&mut self, _win: WindowId) {}
    fn stream_created(&mut self, _stream: StreamId, _rock: u32) {}
    fn stream_destroyed(&mut self, _stream: StreamId) {}
    /// The engine took ownership of an array of `len` elements.
    fn retain_buffer(&mut self, _owner: BufferOwner, _len: usize) {}
    /// The array is about to be handed back.
    fn release_buffer(&mut self, _owner: BufferOwner, _len: usize) {}
    /// Called just before the VM is resumed with `event`.
    fn prepare_resume(&mut self, _event: &GlkEvent) {}
}

/// The default observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}
