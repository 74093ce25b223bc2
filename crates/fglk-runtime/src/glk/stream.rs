#![forbid(unsafe_code)]

use fglk_core::codes::SeekMode;
use fglk_core::error::GlkError;
use fglk_core::style::Style;
use fglk_layout::WindowId;
use tracing::debug;

use super::{Glk, MAX_ECHO_DEPTH, WindowContent, WindowState};
use crate::buffer::{CharBuffer, chars_to_string, string_to_chars};
use crate::observer::BufferOwner;
use crate::stream::{ClosedStream, StreamId, WriteRoute};

impl Glk {
    fn current_stream(&self, op: &'static str) -> Result<StreamId, GlkError> {
        self.streams
            .current()
            .ok_or(GlkError::NoCurrentStream { op })
    }

    /// Write `chars` to `stream`, following window echo links.
    pub(crate) fn write_stream(
        &mut self,
        stream: StreamId,
        chars: &[u32],
        op: &'static str,
    ) -> Result<(), GlkError> {
        let mut target = stream;
        for _ in 0..=MAX_ECHO_DEPTH {
            let route = self.streams.stream_mut(target, op)?.write(chars, op)?;
            let WriteRoute::Window(win) = route else {
                return Ok(());
            };
            if self.input.has_line(win) {
                return Err(GlkError::LineInputPending { op });
            }
            match self.put_window_text(win, &chars_to_string(chars)) {
                Some(echo) => target = echo,
                None => return Ok(()),
            }
        }
        Err(GlkError::EchoDepthExceeded {
            depth: MAX_ECHO_DEPTH,
        })
    }

    /// Render text into a window's content; returns its echo stream.
    pub(crate) fn put_window_text(&mut self, win: WindowId, text: &str) -> Option<StreamId> {
        let state = self.windows.get_mut(&win)?;
        match &mut state.content {
            WindowContent::Buffer(buf) => buf.put(text, state.style, state.hyperlink),
            WindowContent::Grid(grid) => grid.put(text, state.style, state.hyperlink),
            WindowContent::Blank => {}
        }
        state.echo
    }

    /// Apply `set` to the window behind `stream` and every window down its
    /// echo chain. Memory streams accept and ignore attributes.
    pub(crate) fn set_window_attr(
        &mut self,
        stream: StreamId,
        op: &'static str,
        set: impl Fn(&mut WindowState),
    ) -> Result<(), GlkError> {
        let mut target = stream;
        for _ in 0..=MAX_ECHO_DEPTH {
            let stream = self.streams.stream(target, op)?;
            if !stream.writable {
                return Err(GlkError::StreamNotWritable { op });
            }
            let Some(state) = stream.window().and_then(|win| self.windows.get_mut(&win)) else {
                return Ok(());
            };
            set(state);
            match state.echo {
                Some(echo) => target = echo,
                None => return Ok(()),
            }
        }
        Err(GlkError::EchoDepthExceeded {
            depth: MAX_ECHO_DEPTH,
        })
    }

    // ── memory streams ──────────────────────────────────────────────────

    pub fn stream_open_memory(
        &mut self,
        buf: Vec<u8>,
        fmode: u32,
        rock: u32,
    ) -> Result<StreamId, GlkError> {
        self.open_memory(CharBuffer::Bytes(buf), fmode, rock, "stream_open_memory")
    }

    pub fn stream_open_memory_uni(
        &mut self,
        buf: Vec<u32>,
        fmode: u32,
        rock: u32,
    ) -> Result<StreamId, GlkError> {
        self.open_memory(
            CharBuffer::Unicode(buf),
            fmode,
            rock,
            "stream_open_memory_uni",
        )
    }

    fn open_memory(
        &mut self,
        buf: CharBuffer,
        fmode: u32,
        rock: u32,
        op: &'static str,
    ) -> Result<StreamId, GlkError> {
        let len = buf.len();
        let id = self.streams.open_memory(buf, fmode, rock, op)?;
        self.observer.stream_created(id, rock);
        if len > 0 {
            self.observer
                .retain_buffer(BufferOwner::MemoryStream(id), len);
        }
        Ok(id)
    }

    /// Close a memory stream, returning its counts and its buffer.
    pub fn stream_close(&mut self, stream: StreamId) -> Result<ClosedStream, GlkError> {
        let closed = self.streams.close(stream)?;
        if !closed.buffer.is_empty() {
            self.observer
                .release_buffer(BufferOwner::MemoryStream(stream), closed.buffer.len());
        }
        self.forget_stream(stream);
        debug!(
            stream = stream.get(),
            read = closed.counts.read_count,
            written = closed.counts.write_count,
            "closed stream"
        );
        Ok(closed)
    }

    /// Stream after `prev` in creation order, with its rock.
    #[must_use]
    pub fn stream_iterate(&self, prev: Option<StreamId>) -> Option<(StreamId, u32)> {
        self.streams
            .next_after(prev)
            .map(|stream| (stream.id, stream.rock))
    }

    pub fn stream_get_rock(&self, stream: StreamId) -> Result<u32, GlkError> {
        Ok(self.streams.stream(stream, "stream_get_rock")?.rock)
    }

    pub fn stream_set_current(&mut self, stream: Option<StreamId>) -> Result<(), GlkError> {
        self.streams.set_current(stream)
    }

    #[must_use]
    pub const fn stream_get_current(&self) -> Option<StreamId> {
        self.streams.current()
    }

    pub fn stream_set_position(
        &mut self,
        stream: StreamId,
        pos: i32,
        seekmode: u32,
    ) -> Result<(), GlkError> {
        let stream = self.streams.stream_mut(stream, "stream_set_position")?;
        let mode =
            SeekMode::from_code(seekmode).ok_or(GlkError::InvalidSeekMode { mode: seekmode })?;
        stream.set_position(i64::from(pos), mode);
        Ok(())
    }

    pub fn stream_get_position(&self, stream: StreamId) -> Result<u32, GlkError> {
        let pos = self.streams.stream(stream, "stream_get_position")?.position();
        Ok(u32::try_from(pos).unwrap_or(u32::MAX))
    }

    // ── output ──────────────────────────────────────────────────────────

    pub fn put_char(&mut self, ch: u8) -> Result<(), GlkError> {
        let stream = self.current_stream("put_char")?;
        self.write_stream(stream, &[u32::from(ch)], "put_char")
    }

    pub fn put_char_stream(&mut self, stream: StreamId, ch: u8) -> Result<(), GlkError> {
        self.write_stream(stream, &[u32::from(ch)], "put_char_stream")
    }

    pub fn put_char_uni(&mut self, ch: u32) -> Result<(), GlkError> {
        let stream = self.current_stream("put_char_uni")?;
        self.write_stream(stream, &[ch], "put_char_uni")
    }

    pub fn put_char_stream_uni(&mut self, stream: StreamId, ch: u32) -> Result<(), GlkError> {
        self.write_stream(stream, &[ch], "put_char_stream_uni")
    }

    pub fn put_buffer(&mut self, buf: &[u8]) -> Result<(), GlkError> {
        let stream = self.current_stream("put_buffer")?;
        self.put_buffer_stream(stream, buf)
    }

    pub fn put_buffer_stream(&mut self, stream: StreamId, buf: &[u8]) -> Result<(), GlkError> {
        let chars: Vec<u32> = buf.iter().map(|&b| u32::from(b)).collect();
        self.write_stream(stream, &chars, "put_buffer_stream")
    }

    pub fn put_buffer_uni(&mut self, buf: &[u32]) -> Result<(), GlkError> {
        let stream = self.current_stream("put_buffer_uni")?;
        self.write_stream(stream, buf, "put_buffer_uni")
    }

    pub fn put_buffer_stream_uni(&mut self, stream: StreamId, buf: &[u32]) -> Result<(), GlkError> {
        self.write_stream(stream, buf, "put_buffer_stream_uni")
    }

    /// Print a native string to the current stream.
    pub fn put_str(&mut self, text: &str) -> Result<(), GlkError> {
        let stream = self.current_stream("put_str")?;
        self.put_str_stream(stream, text)
    }

    pub fn put_str_stream(&mut self, stream: StreamId, text: &str) -> Result<(), GlkError> {
        self.write_stream(stream, &string_to_chars(text), "put_str_stream")
    }

    // ── attributes ──────────────────────────────────────────────────────

    pub fn set_style(&mut self, style: u32) -> Result<(), GlkError> {
        let stream = self.current_stream("set_style")?;
        self.set_style_stream(stream, style)
    }

    /// Set the output style; unknown style numbers mean `Normal`.
    pub fn set_style_stream(&mut self, stream: StreamId, style: u32) -> Result<(), GlkError> {
        let style = Style::from_code(style);
        self.set_window_attr(stream, "set_style_stream", |state| state.style = style)
    }

    pub fn set_hyperlink(&mut self, link: u32) -> Result<(), GlkError> {
        let stream = self.current_stream("set_hyperlink")?;
        self.set_hyperlink_stream(stream, link)
    }

    /// Tag following output with `link`; 0 ends the link.
    pub fn set_hyperlink_stream(&mut self, stream: StreamId, link: u32) -> Result<(), GlkError> {
        self.set_window_attr(stream, "set_hyperlink_stream", |state| state.hyperlink = link)
    }

    // ── input ───────────────────────────────────────────────────────────

    /// Next character, or `None` at end of data. Code points past Latin-1
    /// read as `?`.
    pub fn get_char_stream(&mut self, stream: StreamId) -> Result<Option<u32>, GlkError> {
        Ok(self.streams.stream_mut(stream, "get_char_stream")?.get_char(false))
    }

    pub fn get_char_stream_uni(&mut self, stream: StreamId) -> Result<Option<u32>, GlkError> {
        Ok(self
            .streams
            .stream_mut(stream, "get_char_stream_uni")?
            .get_char(true))
    }

    /// Read up to and including a newline, leaving room for a terminating
    /// zero. Returns the number of characters read.
    pub fn get_line_stream(&mut self, stream: StreamId, buf: &mut [u8]) -> Result<usize, GlkError> {
        let stream = self.streams.stream_mut(stream, "get_line_stream")?;
        let Some(room) = buf.len().checked_sub(1) else {
            return Ok(0);
        };
        let chars = stream.read(room, true, false);
        let count = copy_bytes(&chars, buf);
        buf[count] = 0;
        Ok(count)
    }

    pub fn get_line_stream_uni(
        &mut self,
        stream: StreamId,
        buf: &mut [u32],
    ) -> Result<usize, GlkError> {
        let stream = self.streams.stream_mut(stream, "get_line_stream_uni")?;
        let Some(room) = buf.len().checked_sub(1) else {
            return Ok(0);
        };
        let chars = stream.read(room, true, true);
        buf[..chars.len()].copy_from_slice(&chars);
        buf[chars.len()] = 0;
        Ok(chars.len())
    }

    /// Read up to `buf.len()` characters.
    pub fn get_buffer_stream(&mut self, stream: StreamId, buf: &mut [u8]) -> Result<usize, GlkError> {
        let stream = self.streams.stream_mut(stream, "get_buffer_stream")?;
        let chars = stream.read(buf.len(), false, false);
        Ok(copy_bytes(&chars, buf))
    }

    pub fn get_buffer_stream_uni(
        &mut self,
        stream: StreamId,
        buf: &mut [u32],
    ) -> Result<usize, GlkError> {
        let stream = self.streams.stream_mut(stream, "get_buffer_stream_uni")?;
        let chars = stream.read(buf.len(), false, true);
        buf[..chars.len()].copy_from_slice(&chars);
        Ok(chars.len())
    }
}

fn copy_bytes(chars: &[u32], buf: &mut [u8]) -> usize {
    for (slot, &ch) in buf.iter_mut().zip(chars) {
        *slot = u8::try_from(ch).unwrap_or(b'?');
    }
    chars.len().min(buf.len())
}
