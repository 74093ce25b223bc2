#![forbid(unsafe_code)]

//! The virtual machine seam.
//!
//! The engine drives the VM, never the other way round: [`Vm::init`] runs
//! once on the renderer's `init` event and [`Vm::resume`] runs with each
//! event that satisfies the VM's pending `select`. Both run to the VM's
//! next `select` (or `exit`) and return.

use fglk_core::codes::EventType;
use fglk_core::error::GlkError;
use fglk_layout::WindowId;

use crate::buffer::CharBuffer;
use crate::glk::Glk;

/// An event delivered to the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlkEvent {
    None,
    Timer,
    CharInput {
        window: WindowId,
        key: u32,
    },
    /// `buffer` is the array passed to the line request, returned with the
    /// first `len` elements filled in.
    LineInput {
        window: WindowId,
        len: usize,
        buffer: CharBuffer,
    },
    Arrange,
    Hyperlink {
        window: WindowId,
        link: u32,
    },
}

impl GlkEvent {
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::None => EventType::None,
            Self::Timer => EventType::Timer,
            Self::CharInput { .. } => EventType::CharInput,
            Self::LineInput { .. } => EventType::LineInput,
            Self::Arrange => EventType::Arrange,
            Self::Hyperlink { .. } => EventType::Hyperlink,
        }
    }

    #[must_use]
    pub const fn window(&self) -> Option<WindowId> {
        match self {
            Self::CharInput { window, .. }
            | Self::LineInput { window, .. }
            | Self::Hyperlink { window, .. } => Some(*window),
            Self::None | Self::Timer | Self::Arrange => None,
        }
    }

    /// First event value: key code, line length or link value.
    #[must_use]
    pub fn val1(&self) -> u32 {
        match self {
            Self::CharInput { key, .. } => *key,
            Self::LineInput { len, .. } => u32::try_from(*len).unwrap_or(u32::MAX),
            Self::Hyperlink { link, .. } => *link,
            Self::None | Self::Timer | Self::Arrange => 0,
        }
    }

    /// Typed text of a line event.
    #[must_use]
    pub fn line_chars(&self) -> Option<Vec<u32>> {
        match self {
            Self::LineInput { len, buffer, .. } => Some(buffer.to_chars(*len)),
            _ => None,
        }
    }
}

/// A program driven by the engine.
pub trait Vm {
    /// Start the program. No window exists yet.
    fn init(&mut self, glk: &mut Glk) -> Result<(), GlkError>;

    /// Continue after `event` satisfied the pending `select`.
    fn resume(&mut self, glk: &mut Glk, event: GlkEvent) -> Result<(), GlkError>;
}
