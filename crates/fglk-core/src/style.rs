#![forbid(unsafe_code)]

//! Text styles.

use serde::{Deserialize, Serialize};

/// One of the eleven fixed Glk text styles.
///
/// The renderer sees styles by name; the VM sees them by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Style {
    #[default]
    Normal = 0,
    Emphasized = 1,
    Preformatted = 2,
    Header = 3,
    Subheader = 4,
    Alert = 5,
    Note = 6,
    BlockQuote = 7,
    Input = 8,
    User1 = 9,
    User2 = 10,
}

impl Style {
    /// Number of defined styles.
    pub const COUNT: u32 = 11;

    /// All styles in code order.
    pub const ALL: [Style; 11] = [
        Style::Normal,
        Style::Emphasized,
        Style::Preformatted,
        Style::Header,
        Style::Subheader,
        Style::Alert,
        Style::Note,
        Style::BlockQuote,
        Style::Input,
        Style::User1,
        Style::User2,
    ];

    /// Decode a VM style number; unknown numbers fall back to `Normal`.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(Self::Normal)
    }

    /// VM style number.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Name used in outbound update records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Emphasized => "emphasized",
            Self::Preformatted => "preformatted",
            Self::Header => "header",
            Self::Subheader => "subheader",
            Self::Alert => "alert",
            Self::Note => "note",
            Self::BlockQuote => "blockquote",
            Self::Input => "input",
            Self::User1 => "user1",
            Self::User2 => "user2",
        }
    }
}
