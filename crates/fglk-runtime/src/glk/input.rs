#![forbid(unsafe_code)]

use fglk_core::error::GlkError;
use fglk_core::style::Style;
use fglk_layout::{LeafKind, WindowId};
use tracing::{debug, info};

use super::Glk;
use crate::buffer::{CharBuffer, chars_to_string, string_to_chars};
use crate::observer::BufferOwner;
use crate::vm::GlkEvent;

impl Glk {
    fn require_text_window(&self, win: WindowId, op: &'static str) -> Result<(), GlkError> {
        let node = self.tree.get(win).ok_or(GlkError::InvalidWindow { op })?;
        match node.leaf_kind() {
            Some(LeafKind::TextBuffer | LeafKind::TextGrid) => Ok(()),
            Some(LeafKind::Blank) | None => Err(GlkError::InputUnsupported { op }),
        }
    }

    pub fn request_char_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        const OP: &str = "request_char_event";
        self.require_text_window(win, OP)?;
        self.input.request_char(win, false, OP)
    }

    pub fn request_char_event_uni(&mut self, win: WindowId) -> Result<(), GlkError> {
        const OP: &str = "request_char_event_uni";
        self.require_text_window(win, OP)?;
        self.input.request_char(win, true, OP)
    }

    /// Ask for a line of input into `buf`.
    ///
    /// The first `initlen` elements of `buf` are offered to the user as
    /// already-typed text.
    pub fn request_line_event(
        &mut self,
        win: WindowId,
        buf: Vec<u8>,
        initlen: usize,
    ) -> Result<(), GlkError> {
        self.request_line(win, CharBuffer::Bytes(buf), initlen, "request_line_event")
    }

    pub fn request_line_event_uni(
        &mut self,
        win: WindowId,
        buf: Vec<u32>,
        initlen: usize,
    ) -> Result<(), GlkError> {
        self.request_line(
            win,
            CharBuffer::Unicode(buf),
            initlen,
            "request_line_event_uni",
        )
    }

    fn request_line(
        &mut self,
        win: WindowId,
        buffer: CharBuffer,
        initlen: usize,
        op: &'static str,
    ) -> Result<(), GlkError> {
        self.require_text_window(win, op)?;
        let initial = (initlen > 0).then(|| chars_to_string(&buffer.to_chars(initlen)));
        let len = buffer.len();
        self.input.request_line(win, buffer, op)?;
        if let Some(initial) = initial {
            self.partial_outputs.insert(win, initial);
        }
        self.observer
            .retain_buffer(BufferOwner::LineInput(win), len);
        Ok(())
    }

    pub fn cancel_char_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        self.check_window(win, "cancel_char_event")?;
        self.input.take_char(win);
        Ok(())
    }

    /// End a pending line request as if the user had pressed enter.
    ///
    /// The text is whatever the renderer last reported as typed. Returns
    /// [`GlkEvent::None`] when no line request was pending.
    pub fn cancel_line_event(&mut self, win: WindowId) -> Result<GlkEvent, GlkError> {
        self.check_window(win, "cancel_line_event")?;
        let typed = self.partial_inputs.get(&win).cloned().unwrap_or_default();
        self.complete_line(win, &typed)
    }

    /// Finish a line request with `text`: echo it into the window in the
    /// input style, fill the request buffer and hand it back.
    pub(crate) fn complete_line(&mut self, win: WindowId, text: &str) -> Result<GlkEvent, GlkError> {
        const OP: &str = "line_input";
        let Some(mut buffer) = self.input.take_line(win) else {
            return Ok(GlkEvent::None);
        };
        let chars: Vec<u32> = string_to_chars(text)
            .into_iter()
            .take(buffer.len())
            .collect();
        if let Some(state) = self.windows.get(&win) {
            let (stream, previous) = (state.stream, state.style);
            let echoed = format!("{}\n", chars_to_string(&chars));
            self.set_window_attr(stream, OP, |state| state.style = Style::Input)?;
            if let Some(echo) = self.put_window_text(win, &echoed) {
                self.write_stream(echo, &string_to_chars(&echoed), OP)?;
            }
            self.set_window_attr(stream, OP, |state| state.style = previous)?;
        }
        let len = buffer.fill_from(&chars);
        self.observer
            .release_buffer(BufferOwner::LineInput(win), buffer.len());
        debug!(window = win.get(), len, "line input complete");
        Ok(GlkEvent::LineInput {
            window: win,
            len,
            buffer,
        })
    }

    pub fn request_hyperlink_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        const OP: &str = "request_hyperlink_event";
        self.check_window(win, OP)?;
        if self.require_text_window(win, OP).is_ok() {
            self.input.set_hyperlink(win, true);
        }
        Ok(())
    }

    pub fn cancel_hyperlink_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        self.check_window(win, "cancel_hyperlink_event")?;
        self.input.set_hyperlink(win, false);
        Ok(())
    }

    pub fn request_mouse_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        self.check_window(win, "request_mouse_event")
    }

    pub fn cancel_mouse_event(&mut self, win: WindowId) -> Result<(), GlkError> {
        self.check_window(win, "cancel_mouse_event")
    }

    /// Fire a timer event every `msec` milliseconds; 0 stops the timer.
    pub fn request_timer_events(&mut self, msec: u32) {
        self.timer.request(msec, self.clock.now());
        debug!(msec, "timer interval set");
    }

    /// Block until the next event. The VM should return to the engine
    /// right after calling this.
    pub fn select(&mut self) {
        self.select_pending = true;
    }

    /// A timer event if the interval has elapsed, otherwise
    /// [`GlkEvent::None`]. Never blocks.
    pub fn select_poll(&mut self) -> GlkEvent {
        let now = self.clock.now();
        if self.timer.is_due(now) {
            self.timer.fire(now);
            return GlkEvent::Timer;
        }
        GlkEvent::None
    }

    /// Stop the program. Later events are discarded.
    pub fn exit(&mut self) {
        if !self.exited {
            info!(generation = self.input.generation(), "vm exited");
        }
        self.exited = true;
        self.select_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{glk_with_size, open_buffer};
    use super::*;
    use crate::observer::testing::{ObserverEvent, RecordingObserver};
    use core::time::Duration;
    use fglk_core::codes::{Direction, Division, FileMode, WinMethod, WindowType};
    use fglk_core::metrics::ContentMetrics;

    #[test]
    fn blank_windows_refuse_keyboard_input() {
        let mut glk = glk_with_size(10.0, 10.0);
        let win = glk
            .window_open(None, 0, 0, WindowType::Blank.code(), 0)
            .expect("open")
            .expect("blank");
        assert_eq!(
            glk.request_char_event(win),
            Err(GlkError::InputUnsupported {
                op: "request_char_event"
            })
        );
        glk.request_hyperlink_event(win).expect("ignored");
        assert!(!glk.input().has_hyperlink(win));
    }

    #[test]
    fn output_during_line_input_is_fatal() {
        let mut glk = glk_with_size(10.0, 10.0);
        let win = open_buffer(&mut glk);
        glk.set_window(Some(win)).expect("current");
        glk.request_line_event(win, vec![0; 8], 0).expect("request");
        assert_eq!(
            glk.put_str("x"),
            Err(GlkError::LineInputPending { op: "put_str_stream" })
        );
        assert_eq!(
            glk.window_clear(win),
            Err(GlkError::LineInputPending { op: "window_clear" })
        );
    }

    #[test]
    fn cancel_line_uses_partial_text_and_echoes_it() {
        let log = RecordingObserver::new();
        let mut glk = Glk::with_observer(Box::new(log.clone()));
        glk.metrics = ContentMetrics::with_size(40.0, 10.0);
        let win = open_buffer(&mut glk);
        let echo = glk
            .stream_open_memory(vec![0; 16], FileMode::Write.code(), 0)
            .expect("open");
        glk.window_set_echo_stream(win, Some(echo)).expect("echo");
        glk.request_line_event(win, vec![0; 4], 0).expect("request");
        glk.partial_inputs.insert(win, "north".to_owned());

        let event = glk.cancel_line_event(win).expect("cancel");
        assert_eq!(
            event,
            GlkEvent::LineInput {
                window: win,
                len: 4,
                buffer: CharBuffer::Bytes(b"nort".to_vec()),
            }
        );
        assert_eq!(glk.window_style(win), Some(Style::Normal));
        assert!(log
            .events()
            .contains(&ObserverEvent::ReleaseBuffer(BufferOwner::LineInput(win), 4)));
        let closed = glk.stream_close(echo).expect("close");
        assert_eq!(closed.buffer.to_chars(5), string_to_chars("nort\n"));
        assert_eq!(glk.cancel_line_event(win), Ok(GlkEvent::None));
    }

    #[test]
    fn byte_line_input_substitutes_wide_characters() {
        let mut glk = glk_with_size(40.0, 10.0);
        let win = open_buffer(&mut glk);
        glk.request_line_event(win, vec![0; 8], 0).expect("request");
        let event = glk.complete_line(win, "caf\u{e9} \u{3b1}").expect("complete");
        assert_eq!(event.line_chars(), Some(vec![0x63, 0x61, 0x66, 0xe9, 0x20, 0x3f]));
    }

    #[test]
    fn initial_text_is_offered_once() {
        let mut glk = glk_with_size(40.0, 10.0);
        let win = open_buffer(&mut glk);
        glk.request_line_event_uni(win, string_to_chars("take lamp"), 4)
            .expect("request");
        assert_eq!(glk.partial_outputs.get(&win).map(String::as_str), Some("take"));
    }

    #[test]
    fn cancel_char_and_hyperlink_clear_their_requests() {
        let mut glk = glk_with_size(40.0, 10.0);
        let win = open_buffer(&mut glk);
        glk.request_char_event(win).expect("char");
        glk.request_hyperlink_event(win).expect("link");
        glk.cancel_char_event(win).expect("cancel");
        glk.cancel_hyperlink_event(win).expect("cancel");
        assert!(glk.input().requests(win).is_none());
        glk.request_line_event(win, vec![0; 2], 0).expect("free again");
    }

    #[test]
    fn select_poll_reports_elapsed_timer() {
        let mut glk = Glk::new();
        assert_eq!(glk.select_poll(), GlkEvent::None);
        glk.request_timer_events(100);
        glk.advance_clock(Duration::from_millis(99));
        assert_eq!(glk.select_poll(), GlkEvent::None);
        glk.advance_clock(Duration::from_millis(1));
        assert_eq!(glk.select_poll(), GlkEvent::Timer);
        assert_eq!(glk.select_poll(), GlkEvent::None);
    }

    #[test]
    fn exit_is_idempotent() {
        let mut glk = Glk::new();
        glk.select();
        glk.exit();
        glk.exit();
        assert!(glk.is_exited());
        assert!(!glk.is_select_pending());
    }

    #[test]
    fn grid_line_input_keeps_grid_geometry() {
        let mut glk = glk_with_size(20.0, 5.0);
        let root = open_buffer(&mut glk);
        let grid = glk
            .window_open(
                Some(root),
                WinMethod::new(Direction::Above, Division::Fixed).0,
                2,
                WindowType::TextGrid.code(),
                0,
            )
            .expect("split")
            .expect("grid");
        glk.request_line_event(grid, vec![0; 10], 0).expect("request");
        glk.complete_line(grid, "hi").expect("complete");
        assert_eq!(
            glk.grid_content(grid).and_then(|g| g.line_text(0)).as_deref(),
            Some("hi                  ")
        );
        assert_eq!(glk.grid_content(grid).map(|g| g.cursor()), Some((0, 1)));
    }
}
