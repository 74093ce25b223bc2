#![forbid(unsafe_code)]

//! Input request state and the event generation counter.
//!
//! Per window: at most one keyboard request (char or line), plus an
//! independent hyperlink flag. The generation counter advances by one for
//! every accepted event and stamps each keyboard request when it is made.

use std::collections::BTreeMap;

use fglk_core::error::GlkError;
use fglk_layout::WindowId;
use tracing::trace;

use crate::buffer::CharBuffer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRequestKind {
    Char { unicode: bool },
    /// Typed text lands in `buffer`; its length is the maximum input length.
    Line { buffer: CharBuffer },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    pub kind: KeyRequestKind,
    /// Event generation current when the request was made.
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRequests {
    pub key: Option<KeyRequest>,
    pub hyperlink: bool,
}

impl WindowRequests {
    fn is_idle(&self) -> bool {
        self.key.is_none() && !self.hyperlink
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputArbiter {
    generation: u64,
    windows: BTreeMap<WindowId, WindowRequests>,
}

impl InputArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Count one accepted event.
    pub fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    #[must_use]
    pub fn requests(&self, win: WindowId) -> Option<&WindowRequests> {
        self.windows.get(&win)
    }

    /// Windows with any outstanding request, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &WindowRequests)> {
        self.windows.iter().map(|(id, req)| (*id, req))
    }

    #[must_use]
    pub fn has_line(&self, win: WindowId) -> bool {
        matches!(
            self.windows.get(&win).and_then(|r| r.key.as_ref()),
            Some(KeyRequest {
                kind: KeyRequestKind::Line { .. },
                ..
            })
        )
    }

    #[must_use]
    pub fn has_hyperlink(&self, win: WindowId) -> bool {
        self.windows.get(&win).is_some_and(|r| r.hyperlink)
    }

    /// Unicode flag of a pending char request.
    #[must_use]
    pub fn char_request(&self, win: WindowId) -> Option<bool> {
        match self.windows.get(&win)?.key.as_ref()?.kind {
            KeyRequestKind::Char { unicode } => Some(unicode),
            KeyRequestKind::Line { .. } => None,
        }
    }

    fn set_key(
        &mut self,
        win: WindowId,
        kind: KeyRequestKind,
        op: &'static str,
    ) -> Result<(), GlkError> {
        let generation = self.generation;
        let entry = self.windows.entry(win).or_default();
        if entry.key.is_some() {
            return Err(GlkError::InputAlreadyRequested { op });
        }
        entry.key = Some(KeyRequest { kind, generation });
        trace!(window = win.get(), generation, op, "key request");
        Ok(())
    }

    pub fn request_char(
        &mut self,
        win: WindowId,
        unicode: bool,
        op: &'static str,
    ) -> Result<(), GlkError> {
        self.set_key(win, KeyRequestKind::Char { unicode }, op)
    }

    pub fn request_line(
        &mut self,
        win: WindowId,
        buffer: CharBuffer,
        op: &'static str,
    ) -> Result<(), GlkError> {
        self.set_key(win, KeyRequestKind::Line { buffer }, op)
    }

    /// End a char request; returns its unicode flag.
    pub fn take_char(&mut self, win: WindowId) -> Option<bool> {
        let unicode = self.char_request(win)?;
        self.clear_key(win);
        Some(unicode)
    }

    /// End a line request; returns its buffer.
    pub fn take_line(&mut self, win: WindowId) -> Option<CharBuffer> {
        if !self.has_line(win) {
            return None;
        }
        match self.clear_key(win)?.kind {
            KeyRequestKind::Line { buffer } => Some(buffer),
            KeyRequestKind::Char { .. } => None,
        }
    }

    fn clear_key(&mut self, win: WindowId) -> Option<KeyRequest> {
        let entry = self.windows.get_mut(&win)?;
        let key = entry.key.take();
        if entry.is_idle() {
            self.windows.remove(&win);
        }
        key
    }

    pub fn set_hyperlink(&mut self, win: WindowId, on: bool) {
        if on {
            self.windows.entry(win).or_default().hyperlink = true;
        } else if let Some(entry) = self.windows.get_mut(&win) {
            entry.hyperlink = false;
            if entry.is_idle() {
                self.windows.remove(&win);
            }
        }
    }

    /// Forget a closed window; returns a line buffer it still held.
    pub fn remove_window(&mut self, win: WindowId) -> Option<CharBuffer> {
        match self.windows.remove(&win)?.key?.kind {
            KeyRequestKind::Line { buffer } => Some(buffer),
            KeyRequestKind::Char { .. } => None,
        }
    }
}

/// Decode a key value from the renderer.
///
/// A single character is its code point, masked to Latin-1 for byte
/// requests. Anything else is a key name; unknown names are
/// `keycode::UNKNOWN`.
#[must_use]
pub fn decode_key(value: &str, unicode: bool) -> u32 {
    use fglk_core::codes::keycode;

    let mut chars = value.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        let code = u32::from(ch);
        return if unicode { code } else { code & 0xff };
    }
    keycode::from_name(value).unwrap_or(keycode::UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fglk_core::codes::keycode;

    fn win(raw: u32) -> WindowId {
        WindowId::new(raw).expect("non-zero window id")
    }

    #[test]
    fn second_key_request_is_fatal() {
        let mut arb = InputArbiter::new();
        arb.request_char(win(1), false, "request_char_event").expect("first");
        assert_eq!(
            arb.request_line(win(1), CharBuffer::Bytes(vec![0; 4]), "request_line_event"),
            Err(GlkError::InputAlreadyRequested {
                op: "request_line_event"
            })
        );
    }

    #[test]
    fn requests_are_stamped_with_current_generation() {
        let mut arb = InputArbiter::new();
        arb.advance();
        arb.advance();
        arb.request_line(win(2), CharBuffer::Unicode(vec![0; 8]), "t")
            .expect("request");
        let req = arb.requests(win(2)).and_then(|r| r.key.as_ref()).expect("pending");
        assert_eq!(req.generation, 2);
        assert!(arb.has_line(win(2)));
        assert_eq!(arb.take_line(win(2)), Some(CharBuffer::Unicode(vec![0; 8])));
        assert!(arb.requests(win(2)).is_none());
    }

    #[test]
    fn hyperlink_flag_is_independent_of_key_requests() {
        let mut arb = InputArbiter::new();
        arb.set_hyperlink(win(1), true);
        arb.request_char(win(1), true, "t").expect("char");
        assert_eq!(arb.take_char(win(1)), Some(true));
        assert!(arb.has_hyperlink(win(1)));
        arb.set_hyperlink(win(1), false);
        assert_eq!(arb.iter().count(), 0);
    }

    #[test]
    fn take_does_not_cross_request_kinds() {
        let mut arb = InputArbiter::new();
        arb.request_char(win(1), false, "t").expect("char");
        assert_eq!(arb.take_line(win(1)), None);
        assert_eq!(arb.char_request(win(1)), Some(false));
    }

    #[test]
    fn removing_a_window_returns_its_line_buffer() {
        let mut arb = InputArbiter::new();
        arb.request_line(win(3), CharBuffer::Bytes(vec![1]), "t").expect("line");
        assert_eq!(arb.remove_window(win(3)), Some(CharBuffer::Bytes(vec![1])));
        assert_eq!(arb.remove_window(win(3)), None);
    }

    #[test]
    fn keys_decode_by_char_or_name() {
        assert_eq!(decode_key("a", false), 0x61);
        assert_eq!(decode_key("\u{3b1}", false), 0xb1);
        assert_eq!(decode_key("\u{3b1}", true), 0x3b1);
        assert_eq!(decode_key("\u{1f600}", true), 0x1f600);
        assert_eq!(decode_key("left", true), keycode::LEFT);
        assert_eq!(decode_key("func3", false), keycode::FUNC1 - 2);
        assert_eq!(decode_key("bogus", true), keycode::UNKNOWN);
        assert_eq!(decode_key("", true), keycode::UNKNOWN);
    }
}
