#![forbid(unsafe_code)]

//! Fatal contract violations.
//!
//! Every variant is a caller bug: the VM used a stale handle, asked for
//! input twice, or passed a code the API does not define. Recoverable data
//! conditions (short buffers, reads past EOF, stale events) never produce a
//! [`GlkError`]; they are clipped or ignored where they happen.

use std::fmt;

/// A fatal error raised by a Glk API call.
///
/// `op` is the API entry point that detected the violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlkError {
    InvalidWindow { op: &'static str },
    InvalidStream { op: &'static str },
    NoCurrentStream { op: &'static str },
    /// First window opened with a split target, or a later one without.
    SplitTarget { op: &'static str, expected: bool },
    InvalidDirection { op: &'static str, method: u32 },
    InvalidDivision { op: &'static str, method: u32 },
    CannotOpenPair,
    NotPairWindow { op: &'static str },
    NotGridWindow { op: &'static str },
    KeyWindowIsPair,
    KeyWindowNotDescendant,
    SplitOrientationChange,
    BlankFixedSize,
    /// Char or line input already pending on the window.
    InputAlreadyRequested { op: &'static str },
    /// Output or clear attempted while a line request owns the window.
    LineInputPending { op: &'static str },
    InputUnsupported { op: &'static str },
    CannotCloseWindowStream,
    IllegalFileMode { op: &'static str, mode: u32 },
    InvalidSeekMode { mode: u32 },
    StreamNotWritable { op: &'static str },
    NumCharsExceedsBuffer { op: &'static str, numchars: usize, len: usize },
    EchoDepthExceeded { depth: usize },
    /// Internal table inconsistency; should be unreachable.
    TreeCorrupted { detail: String },
}

impl fmt::Display for GlkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindow { op } => write!(f, "{op}: invalid window"),
            Self::InvalidStream { op } => write!(f, "{op}: invalid stream"),
            Self::NoCurrentStream { op } => write!(f, "{op}: no current stream"),
            Self::SplitTarget { op, expected: true } => {
                write!(f, "{op}: splitwin must be non-null")
            }
            Self::SplitTarget { op, expected: false } => {
                write!(f, "{op}: splitwin must be null for first window")
            }
            Self::InvalidDirection { op, method } => {
                write!(f, "{op}: invalid method (bad direction) {method:#x}")
            }
            Self::InvalidDivision { op, method } => {
                write!(f, "{op}: invalid method (not fixed or proportional) {method:#x}")
            }
            Self::CannotOpenPair => write!(f, "window_open: cannot open pair window directly"),
            Self::NotPairWindow { op } => write!(f, "{op}: not a pair window"),
            Self::NotGridWindow { op } => write!(f, "{op}: not a grid window"),
            Self::KeyWindowIsPair => write!(f, "window_set_arrangement: keywin cannot be a pair"),
            Self::KeyWindowNotDescendant => {
                write!(f, "window_set_arrangement: keywin must be a descendant")
            }
            Self::SplitOrientationChange => {
                write!(f, "window_set_arrangement: split must stay in same orientation")
            }
            Self::BlankFixedSize => {
                write!(f, "window_set_arrangement: a blank window cannot have a fixed size")
            }
            Self::InputAlreadyRequested { op } => {
                write!(f, "{op}: window already has keyboard request")
            }
            Self::LineInputPending { op } => {
                write!(f, "{op}: window has pending line request")
            }
            Self::InputUnsupported { op } => {
                write!(f, "{op}: window does not support keyboard input")
            }
            Self::CannotCloseWindowStream => {
                write!(f, "stream_close: cannot close window stream")
            }
            Self::IllegalFileMode { op, mode } => write!(f, "{op}: illegal filemode {mode}"),
            Self::InvalidSeekMode { mode } => {
                write!(f, "stream_set_position: invalid seekmode {mode}")
            }
            Self::StreamNotWritable { op } => write!(f, "{op}: stream not open for writing"),
            Self::NumCharsExceedsBuffer { op, numchars, len } => {
                write!(f, "{op}: numchars {numchars} exceeds array length {len}")
            }
            Self::EchoDepthExceeded { depth } => {
                write!(f, "echo stream chain deeper than {depth} (cycle?)")
            }
            Self::TreeCorrupted { detail } => write!(f, "window tree corrupted: {detail}"),
        }
    }
}

impl std::error::Error for GlkError {}
