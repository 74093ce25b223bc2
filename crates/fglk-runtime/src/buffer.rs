#![forbid(unsafe_code)]

//! Caller-owned character arrays.
//!
//! Memory streams and line requests take ownership of the array they were
//! given and hand it back when they end, so a buffer is never shared
//! between the VM and the engine at the same time.

/// A byte or code-point array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharBuffer {
    Bytes(Vec<u8>),
    Unicode(Vec<u32>),
}

impl CharBuffer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(buf) => buf.len(),
            Self::Unicode(buf) => buf.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::Unicode(_))
    }

    /// Read the element at `ix` as a code point.
    #[must_use]
    pub fn get(&self, ix: usize) -> Option<u32> {
        match self {
            Self::Bytes(buf) => buf.get(ix).map(|&b| u32::from(b)),
            Self::Unicode(buf) => buf.get(ix).copied(),
        }
    }

    /// Store `ch` at `ix`; byte arrays keep the low eight bits.
    ///
    /// Out-of-range writes are dropped.
    pub fn set(&mut self, ix: usize, ch: u32) {
        match self {
            Self::Bytes(buf) => {
                if let Some(slot) = buf.get_mut(ix) {
                    *slot = (ch & 0xff) as u8;
                }
            }
            Self::Unicode(buf) => {
                if let Some(slot) = buf.get_mut(ix) {
                    *slot = ch;
                }
            }
        }
    }

    /// Store `chars` starting at 0, clipped to the array; returns the count
    /// stored. Byte arrays get `?` for code points past Latin-1.
    pub fn fill_from(&mut self, chars: &[u32]) -> usize {
        let count = chars.len().min(self.len());
        for (ix, &ch) in chars[..count].iter().enumerate() {
            let ch = if !self.is_unicode() && ch > 0xff {
                u32::from(b'?')
            } else {
                ch
            };
            self.set(ix, ch);
        }
        count
    }

    /// The first `len` elements as code points.
    #[must_use]
    pub fn to_chars(&self, len: usize) -> Vec<u32> {
        match self {
            Self::Bytes(buf) => buf.iter().take(len).map(|&b| u32::from(b)).collect(),
            Self::Unicode(buf) => buf.iter().take(len).copied().collect(),
        }
    }
}

/// Decode code points for display; non-scalar values become U+FFFD.
#[must_use]
pub fn chars_to_string(chars: &[u32]) -> String {
    chars
        .iter()
        .map(|&ch| char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[must_use]
pub fn string_to_chars(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).collect()
}
