#![forbid(unsafe_code)]

//! Numeric codes exchanged with the virtual machine.
//!
//! The VM speaks in plain integers. Each group of codes gets a closed enum
//! here so the engine can match exhaustively, plus a `from_code` decoder that
//! reports codes the engine does not know.

use serde::{Deserialize, Serialize};

/// Window kind as numbered by the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Pair,
    Blank,
    TextBuffer,
    TextGrid,
    Graphics,
}

impl WindowType {
    /// Decode a VM window type; `None` for codes outside the Glk table.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Pair),
            2 => Some(Self::Blank),
            3 => Some(Self::TextBuffer),
            4 => Some(Self::TextGrid),
            5 => Some(Self::Graphics),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Pair => 1,
            Self::Blank => 2,
            Self::TextBuffer => 3,
            Self::TextGrid => 4,
            Self::Graphics => 5,
        }
    }
}

/// Side of the split target on which a new window appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Above,
    Below,
}

impl Direction {
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Above),
            3 => Some(Self::Below),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Above => 2,
            Self::Below => 3,
        }
    }

    /// Left/Right splits divide the horizontal axis.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Left/Above put the new (key) window before its sibling.
    #[must_use]
    pub const fn is_backward(self) -> bool {
        matches!(self, Self::Left | Self::Above)
    }
}

/// How a pair window computes its split offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    /// `size` is a count of the key window's character cells.
    Fixed,
    /// `size` is a percentage of the available span.
    Proportional,
    /// Any other division bits; laid out by bisection.
    Other(u32),
}

impl Division {
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            WinMethod::FIXED => Self::Fixed,
            WinMethod::PROPORTIONAL => Self::Proportional,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Fixed => WinMethod::FIXED,
            Self::Proportional => WinMethod::PROPORTIONAL,
            Self::Other(bits) => bits,
        }
    }
}

/// Split method bitfield: direction in the low nibble, division above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WinMethod(pub u32);

impl WinMethod {
    pub const DIR_MASK: u32 = 0x0f;
    pub const DIVISION_MASK: u32 = 0xf0;
    pub const FIXED: u32 = 0x10;
    pub const PROPORTIONAL: u32 = 0x20;

    #[must_use]
    pub const fn new(direction: Direction, division: Division) -> Self {
        Self(direction.code() | division.code())
    }

    /// Direction bits, `None` if they name no direction.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        Direction::from_code(self.0 & Self::DIR_MASK)
    }

    #[must_use]
    pub const fn division(self) -> Division {
        Division::from_code(self.0 & Self::DIVISION_MASK)
    }
}

/// Access mode of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    Write,
    Read,
    ReadWrite,
    WriteAppend,
}

impl FileMode {
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Write),
            2 => Some(Self::Read),
            3 => Some(Self::ReadWrite),
            5 => Some(Self::WriteAppend),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Write => 1,
            Self::Read => 2,
            Self::ReadWrite => 3,
            Self::WriteAppend => 5,
        }
    }
}

/// Origin of a stream seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    Start,
    Current,
    End,
}

impl SeekMode {
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Event type delivered to the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    None,
    Timer,
    CharInput,
    LineInput,
    MouseInput,
    Arrange,
    Redraw,
    SoundNotify,
    Hyperlink,
}

impl EventType {
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Timer => 1,
            Self::CharInput => 2,
            Self::LineInput => 3,
            Self::MouseInput => 4,
            Self::Arrange => 5,
            Self::Redraw => 6,
            Self::SoundNotify => 7,
            Self::Hyperlink => 8,
        }
    }
}

/// Capability selector for `gestalt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gestalt {
    Version,
    CharInput,
    LineInput,
    CharOutput,
    MouseInput,
    Timer,
    Graphics,
    DrawImage,
    Sound,
    SoundVolume,
    SoundNotify,
    Hyperlinks,
    HyperlinkInput,
    SoundMusic,
    GraphicsTransparency,
    Unicode,
}

impl Gestalt {
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Version,
            1 => Self::CharInput,
            2 => Self::LineInput,
            3 => Self::CharOutput,
            4 => Self::MouseInput,
            5 => Self::Timer,
            6 => Self::Graphics,
            7 => Self::DrawImage,
            8 => Self::Sound,
            9 => Self::SoundVolume,
            10 => Self::SoundNotify,
            11 => Self::Hyperlinks,
            12 => Self::HyperlinkInput,
            13 => Self::SoundMusic,
            14 => Self::GraphicsTransparency,
            15 => Self::Unicode,
            _ => return None,
        })
    }
}

/// `CharOutput` gestalt answers.
pub mod char_output {
    pub const CANNOT_PRINT: u32 = 0;
    pub const APPROX_PRINT: u32 = 1;
    pub const EXACT_PRINT: u32 = 2;
}

/// Special keycodes delivered as char input.
pub mod keycode {
    pub const UNKNOWN: u32 = 0xffff_ffff;
    pub const LEFT: u32 = 0xffff_fffe;
    pub const RIGHT: u32 = 0xffff_fffd;
    pub const UP: u32 = 0xffff_fffc;
    pub const DOWN: u32 = 0xffff_fffb;
    pub const RETURN: u32 = 0xffff_fffa;
    pub const DELETE: u32 = 0xffff_fff9;
    pub const ESCAPE: u32 = 0xffff_fff8;
    pub const TAB: u32 = 0xffff_fff7;
    pub const PAGE_UP: u32 = 0xffff_fff6;
    pub const PAGE_DOWN: u32 = 0xffff_fff5;
    pub const HOME: u32 = 0xffff_fff4;
    pub const END: u32 = 0xffff_fff3;
    pub const FUNC1: u32 = 0xffff_ffef;
    pub const FUNC12: u32 = 0xffff_ffe4;
    /// Number of special keycodes, counting `UNKNOWN`.
    pub const MAXVAL: u32 = 28;

    /// Keycode for a key name as sent by the renderer.
    #[must_use]
    pub fn from_name(name: &str) -> Option<u32> {
        let code = match name {
            "left" => LEFT,
            "right" => RIGHT,
            "up" => UP,
            "down" => DOWN,
            "return" => RETURN,
            "delete" => DELETE,
            "escape" => ESCAPE,
            "tab" => TAB,
            "pageup" => PAGE_UP,
            "pagedown" => PAGE_DOWN,
            "home" => HOME,
            "end" => END,
            _ => {
                let n: u32 = name.strip_prefix("func")?.parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                FUNC1 - (n - 1)
            }
        };
        Some(code)
    }

    /// Whether `code` is one of the special keycodes.
    #[must_use]
    pub const fn is_special(code: u32) -> bool {
        code > u32::MAX - MAXVAL
    }
}
