#![forbid(unsafe_code)]

//! Runtime: the Glk engine behind a virtual machine.
//!
//! # Role in fglk
//! `fglk-runtime` holds all engine state between two renderer exchanges.
//! The VM calls the Glk API on [`Glk`]; the engine records window content,
//! stream traffic and input requests; [`Glk::compile`] turns the changes
//! into one [`Update`]; [`Glk::dispatch`] checks and routes the renderer's
//! next [`InputEvent`] back to the VM.
//!
//! # Key components
//! - [`stream::StreamRegistry`]: memory and window streams, current stream.
//! - [`content`]: buffer paragraph accumulation and grid line arrays.
//! - [`input::InputArbiter`]: per-window requests and the generation counter.
//! - [`protocol`]: the outbound and inbound wire records.
//! - [`Session`]: drives a [`Vm`] one event at a time.

pub mod buffer;
pub mod clock;
pub mod content;
pub mod glk;
pub mod input;
pub mod observer;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod vm;

pub use buffer::CharBuffer;
pub use glk::{Dispatch, Glk, Rejection};
pub use observer::{BufferOwner, DispatchObserver, NoopObserver};
pub use protocol::{InputEvent, Update};
pub use session::{AcceptResult, Session, SessionConfig};
pub use stream::{ClosedStream, StreamCounts, StreamId};
pub use vm::{GlkEvent, Vm};

pub use fglk_core::error::GlkError;
pub use fglk_core::metrics::ContentMetrics;
pub use fglk_layout::WindowId;
