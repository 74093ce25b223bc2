#![forbid(unsafe_code)]

//! Stream table: memory streams over caller buffers and window-bound
//! output streams.
//!
//! A stream only knows its own data. Window streams do not touch window
//! content here; [`Stream::write`] reports the window so the engine can
//! route the text to the content accumulator and the echo chain.

use std::collections::BTreeMap;

use fglk_core::codes::{FileMode, SeekMode};
use fglk_core::error::GlkError;
use fglk_layout::WindowId;
use serde::Serialize;
use tracing::debug;

use crate::buffer::CharBuffer;

/// Stable identifier for streams.
///
/// `0` is reserved so ids are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamId(u32);

impl StreamId {
    /// Lowest valid stream id.
    pub const MIN: Self = Self(1);

    /// Create a stream id, rejecting 0.
    pub fn new(raw: u32) -> Result<Self, GlkError> {
        if raw == 0 {
            return Err(GlkError::InvalidStream { op: "stream_id" });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn checked_next(self) -> Result<Self, GlkError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(GlkError::TreeCorrupted {
                detail: format!("stream id overflow after {}", self.0),
            });
        };
        Self::new(next)
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::MIN
    }
}

/// Cumulative character counts; never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamCounts {
    pub read_count: u32,
    pub write_count: u32,
}

impl StreamCounts {
    fn add_read(&mut self, n: usize) {
        self.read_count = self.read_count.saturating_add(saturate(n));
    }

    fn add_write(&mut self, n: usize) {
        self.write_count = self.write_count.saturating_add(saturate(n));
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A fixed-size memory buffer with a cursor and a high-water mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStream {
    buf: CharBuffer,
    pos: usize,
    /// Logical end of data: everything below is readable.
    eof: usize,
}

impl MemoryStream {
    fn put(&mut self, chars: &[u32]) {
        let room = self.buf.len().saturating_sub(self.pos);
        for &ch in chars.iter().take(room) {
            self.buf.set(self.pos, ch);
            self.pos += 1;
        }
        self.eof = self.eof.max(self.pos);
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.eof
    }

    #[must_use]
    pub const fn buffer(&self) -> &CharBuffer {
        &self.buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Memory(MemoryStream),
    Window(WindowId),
}

/// Where a write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRoute {
    /// Stored in the stream's own buffer (or dropped past its end).
    Absorbed,
    /// Must be rendered into this window and mirrored to its echo stream.
    Window(WindowId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    pub rock: u32,
    pub kind: StreamKind,
    pub readable: bool,
    pub writable: bool,
    /// Whether reads may return code points above 0xFF.
    pub unicode: bool,
    pub counts: StreamCounts,
}

impl Stream {
    #[must_use]
    pub const fn window(&self) -> Option<WindowId> {
        match self.kind {
            StreamKind::Window(win) => Some(win),
            StreamKind::Memory(_) => None,
        }
    }

    /// Count and store `chars`; memory writes past the end are dropped.
    pub fn write(&mut self, chars: &[u32], op: &'static str) -> Result<WriteRoute, GlkError> {
        if !self.writable {
            return Err(GlkError::StreamNotWritable { op });
        }
        self.counts.add_write(chars.len());
        match &mut self.kind {
            StreamKind::Memory(mem) => {
                mem.put(chars);
                Ok(WriteRoute::Absorbed)
            }
            StreamKind::Window(win) => Ok(WriteRoute::Window(*win)),
        }
    }

    /// Read one character; `None` at end of data or on a write-only stream.
    ///
    /// Without `want_unicode`, code points above 0xFF read as `?`.
    pub fn get_char(&mut self, want_unicode: bool) -> Option<u32> {
        if !self.readable {
            return None;
        }
        let StreamKind::Memory(mem) = &mut self.kind else {
            return None;
        };
        if mem.pos >= mem.eof {
            return None;
        }
        let ch = mem.buf.get(mem.pos)?;
        mem.pos += 1;
        self.counts.add_read(1);
        Some(narrow(ch, want_unicode))
    }

    /// Read up to `max` characters, stopping after a newline when
    /// `stop_at_newline` is set.
    pub fn read(&mut self, max: usize, stop_at_newline: bool, want_unicode: bool) -> Vec<u32> {
        let mut out = Vec::new();
        if !self.readable {
            return out;
        }
        let StreamKind::Memory(mem) = &mut self.kind else {
            return out;
        };
        let available = mem.eof.saturating_sub(mem.pos).min(max);
        for _ in 0..available {
            let Some(ch) = mem.buf.get(mem.pos) else {
                break;
            };
            mem.pos += 1;
            out.push(narrow(ch, want_unicode));
            if stop_at_newline && ch == u32::from('\n') {
                break;
            }
        }
        self.counts.add_read(out.len());
        out
    }

    /// Move the cursor, clamped to `[0, high_water_mark]`.
    ///
    /// Window streams have no cursor and ignore seeks.
    pub fn set_position(&mut self, pos: i64, mode: SeekMode) {
        let StreamKind::Memory(mem) = &mut self.kind else {
            return;
        };
        let base = match mode {
            SeekMode::Start => 0,
            SeekMode::Current => mem.pos,
            SeekMode::End => mem.eof,
        };
        let target = i64::try_from(base).unwrap_or(i64::MAX).saturating_add(pos);
        mem.pos = usize::try_from(target.max(0)).unwrap_or(usize::MAX).min(mem.eof);
    }

    #[must_use]
    pub fn position(&self) -> usize {
        match &self.kind {
            StreamKind::Memory(mem) => mem.pos,
            StreamKind::Window(_) => 0,
        }
    }
}

fn narrow(ch: u32, want_unicode: bool) -> u32 {
    if !want_unicode && ch > 0xff {
        u32::from(b'?')
    } else {
        ch
    }
}

/// What an explicit close hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedStream {
    pub counts: StreamCounts,
    pub buffer: CharBuffer,
}

/// Every live stream plus the current output stream.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    next_id: StreamId,
    streams: BTreeMap<StreamId, Stream>,
    current: Option<StreamId>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    pub(crate) fn stream_mut(
        &mut self,
        id: StreamId,
        op: &'static str,
    ) -> Result<&mut Stream, GlkError> {
        self.streams.get_mut(&id).ok_or(GlkError::InvalidStream { op })
    }

    pub(crate) fn stream(&self, id: StreamId, op: &'static str) -> Result<&Stream, GlkError> {
        self.streams.get(&id).ok_or(GlkError::InvalidStream { op })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Streams in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    /// The stream created after `prev`, or the first one for `None`.
    #[must_use]
    pub fn next_after(&self, prev: Option<StreamId>) -> Option<&Stream> {
        match prev {
            None => self.streams.values().next(),
            Some(prev) => self
                .streams
                .range(prev..)
                .find(|(id, _)| **id != prev)
                .map(|(_, stream)| stream),
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<StreamId> {
        self.current
    }

    pub fn set_current(&mut self, id: Option<StreamId>) -> Result<(), GlkError> {
        if let Some(id) = id
            && !self.streams.contains_key(&id)
        {
            return Err(GlkError::InvalidStream {
                op: "stream_set_current",
            });
        }
        self.current = id;
        Ok(())
    }

    fn allocate_id(&mut self) -> Result<StreamId, GlkError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    /// Open a memory stream over `buf`.
    ///
    /// Write mode starts empty; read modes start with the whole buffer as
    /// data.
    pub fn open_memory(
        &mut self,
        buf: CharBuffer,
        fmode: u32,
        rock: u32,
        op: &'static str,
    ) -> Result<StreamId, GlkError> {
        let mode = match FileMode::from_code(fmode) {
            Some(mode @ (FileMode::Write | FileMode::Read | FileMode::ReadWrite)) => mode,
            Some(FileMode::WriteAppend) | None => {
                return Err(GlkError::IllegalFileMode { op, mode: fmode });
            }
        };
        let id = self.allocate_id()?;
        let eof = if mode == FileMode::Write { 0 } else { buf.len() };
        let unicode = buf.is_unicode();
        self.streams.insert(
            id,
            Stream {
                id,
                rock,
                kind: StreamKind::Memory(MemoryStream { buf, pos: 0, eof }),
                readable: mode != FileMode::Write,
                writable: mode != FileMode::Read,
                unicode,
                counts: StreamCounts::default(),
            },
        );
        debug!(stream = id.get(), ?mode, eof, unicode, "opened memory stream");
        Ok(id)
    }

    /// Open the output stream owned by a leaf window.
    pub fn open_window(&mut self, win: WindowId) -> Result<StreamId, GlkError> {
        let id = self.allocate_id()?;
        self.streams.insert(
            id,
            Stream {
                id,
                rock: 0,
                kind: StreamKind::Window(win),
                readable: false,
                writable: true,
                unicode: true,
                counts: StreamCounts::default(),
            },
        );
        Ok(id)
    }

    /// Close a memory stream and return its buffer.
    ///
    /// Window streams close with their window only.
    pub fn close(&mut self, id: StreamId) -> Result<ClosedStream, GlkError> {
        let stream = self.stream(id, "stream_close")?;
        if stream.window().is_some() {
            return Err(GlkError::CannotCloseWindowStream);
        }
        let Some(stream) = self.remove(id) else {
            return Err(GlkError::InvalidStream { op: "stream_close" });
        };
        let StreamKind::Memory(mem) = stream.kind else {
            return Err(GlkError::CannotCloseWindowStream);
        };
        Ok(ClosedStream {
            counts: stream.counts,
            buffer: mem.buf,
        })
    }

    /// Drop a stream regardless of kind, clearing it as current.
    pub(crate) fn remove(&mut self, id: StreamId) -> Option<Stream> {
        if self.current == Some(id) {
            self.current = None;
        }
        self.streams.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win(raw: u32) -> WindowId {
        WindowId::new(raw).expect("non-zero window id")
    }

    fn chars(s: &str) -> Vec<u32> {
        s.chars().map(u32::from).collect()
    }

    #[test]
    fn write_mode_starts_empty_and_truncates() {
        let mut reg = StreamRegistry::new();
        let id = reg
            .open_memory(CharBuffer::Bytes(vec![0; 4]), FileMode::Write.code(), 7, "t")
            .expect("open");
        let stream = reg.get_mut(id).expect("live");
        assert_eq!(stream.write(&chars("hello"), "t"), Ok(WriteRoute::Absorbed));
        assert_eq!(stream.counts.write_count, 5);
        let StreamKind::Memory(mem) = &stream.kind else {
            panic!("memory stream");
        };
        assert_eq!(mem.high_water_mark(), 4);
        assert_eq!(mem.buffer(), &CharBuffer::Bytes(b"hell".to_vec()));
        assert!(!stream.readable);
        assert_eq!(stream.get_char(false), None);
    }

    #[test]
    fn read_mode_exposes_whole_buffer() {
        let mut reg = StreamRegistry::new();
        let id = reg
            .open_memory(CharBuffer::Bytes(b"ab\ncd".to_vec()), FileMode::Read.code(), 0, "t")
            .expect("open");
        let stream = reg.get_mut(id).expect("live");
        assert_eq!(stream.read(10, true, false), chars("ab\n"));
        assert_eq!(stream.read(10, true, false), chars("cd"));
        assert_eq!(stream.get_char(false), None);
        assert_eq!(stream.counts.read_count, 5);
        assert_eq!(
            stream.write(&chars("x"), "put_char_stream"),
            Err(GlkError::StreamNotWritable {
                op: "put_char_stream"
            })
        );
    }

    #[test]
    fn byte_reads_narrow_wide_code_points() {
        let mut reg = StreamRegistry::new();
        let id = reg
            .open_memory(
                CharBuffer::Unicode(vec![0x3b1, 0x61]),
                FileMode::Read.code(),
                0,
                "t",
            )
            .expect("open");
        let stream = reg.get_mut(id).expect("live");
        assert_eq!(stream.get_char(false), Some(u32::from(b'?')));
        stream.set_position(0, SeekMode::Start);
        assert_eq!(stream.get_char(true), Some(0x3b1));
    }

    #[test]
    fn seek_clamps_to_high_water_mark() {
        let mut reg = StreamRegistry::new();
        let id = reg
            .open_memory(CharBuffer::Unicode(vec![0; 8]), FileMode::ReadWrite.code(), 0, "t")
            .expect("open");
        let stream = reg.get_mut(id).expect("live");
        stream.set_position(100, SeekMode::Start);
        assert_eq!(stream.position(), 8);
        stream.set_position(-3, SeekMode::End);
        assert_eq!(stream.position(), 5);
        stream.set_position(-10, SeekMode::Current);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn illegal_file_modes_are_fatal() {
        let mut reg = StreamRegistry::new();
        for mode in [0, FileMode::WriteAppend.code(), 9] {
            assert_eq!(
                reg.open_memory(CharBuffer::Bytes(vec![]), mode, 0, "stream_open_memory"),
                Err(GlkError::IllegalFileMode {
                    op: "stream_open_memory",
                    mode
                })
            );
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn window_streams_route_and_refuse_close() {
        let mut reg = StreamRegistry::new();
        let id = reg.open_window(win(3)).expect("open");
        let stream = reg.get_mut(id).expect("live");
        assert_eq!(stream.write(&chars("hi"), "t"), Ok(WriteRoute::Window(win(3))));
        assert_eq!(stream.position(), 0);
        assert_eq!(reg.close(id), Err(GlkError::CannotCloseWindowStream));
    }

    #[test]
    fn close_returns_buffer_and_clears_current() {
        let mut reg = StreamRegistry::new();
        let id = reg
            .open_memory(CharBuffer::Bytes(vec![0; 2]), FileMode::Write.code(), 0, "t")
            .expect("open");
        reg.set_current(Some(id)).expect("valid");
        reg.stream_mut(id, "t").expect("live").write(&chars("ok"), "t").expect("write");
        let closed = reg.close(id).expect("close");
        assert_eq!(closed.counts.write_count, 2);
        assert_eq!(closed.buffer, CharBuffer::Bytes(b"ok".to_vec()));
        assert_eq!(reg.current(), None);
        assert_eq!(reg.close(id), Err(GlkError::InvalidStream { op: "stream_close" }));
    }

    #[test]
    fn iteration_follows_creation_order() {
        let mut reg = StreamRegistry::new();
        let a = reg.open_window(win(1)).expect("open");
        let b = reg.open_window(win(2)).expect("open");
        assert_eq!(reg.next_after(None).map(|s| s.id), Some(a));
        assert_eq!(reg.next_after(Some(a)).map(|s| s.id), Some(b));
        assert_eq!(reg.next_after(Some(b)).map(|s| s.id), None);
    }
}
