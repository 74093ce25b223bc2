#![forbid(unsafe_code)]

use fglk_core::codes::WindowType;
use fglk_core::error::GlkError;
use fglk_core::style::Style;
use fglk_layout::{LeafKind, LeafPlacement, WindowId};
use tracing::{debug, info};

use super::{Glk, WindowContent, WindowState};
use crate::content::{BufferContent, GridContent};
use crate::observer::BufferOwner;
use crate::stream::{StreamCounts, StreamId};

impl Glk {
    /// Engine state of `win`: an error for unknown ids, `None` for pairs.
    pub(crate) fn window_state_mut(
        &mut self,
        win: WindowId,
        op: &'static str,
    ) -> Result<Option<&mut WindowState>, GlkError> {
        if !self.tree.contains(win) {
            return Err(GlkError::InvalidWindow { op });
        }
        Ok(self.windows.get_mut(&win))
    }

    pub(crate) fn window_state(
        &self,
        win: WindowId,
        op: &'static str,
    ) -> Result<Option<&WindowState>, GlkError> {
        if !self.tree.contains(win) {
            return Err(GlkError::InvalidWindow { op });
        }
        Ok(self.windows.get(&win))
    }

    pub(crate) fn check_window(&self, win: WindowId, op: &'static str) -> Result<(), GlkError> {
        self.window_state(win, op).map(|_| ())
    }

    /// Resize grid buffers to the boxes a layout pass produced.
    pub(crate) fn apply_placements(&mut self, placements: &[LeafPlacement]) {
        for placement in placements {
            if let Some(WindowState {
                content: WindowContent::Grid(grid),
                ..
            }) = self.windows.get_mut(&placement.id)
            {
                let (width, height) = self.metrics.grid_size(&placement.bbox);
                grid.resize(width, height);
            }
        }
    }

    /// Open a window, splitting `split` unless this is the first one.
    ///
    /// Returns `None` for window types this engine does not display.
    pub fn window_open(
        &mut self,
        split: Option<WindowId>,
        method: u32,
        size: u32,
        wintype: u32,
        rock: u32,
    ) -> Result<Option<WindowId>, GlkError> {
        let kind = match WindowType::from_code(wintype) {
            Some(WindowType::Blank) => LeafKind::Blank,
            Some(WindowType::TextBuffer) => LeafKind::TextBuffer,
            Some(WindowType::TextGrid) => LeafKind::TextGrid,
            Some(WindowType::Pair) => return Err(GlkError::CannotOpenPair),
            Some(WindowType::Graphics) | None => {
                debug!(wintype, "window type not supported");
                return Ok(None);
            }
        };
        let opened = self.tree.open(split, method, size, kind, rock, &self.metrics)?;
        let stream = self.streams.open_window(opened.window)?;
        let content = match kind {
            LeafKind::Blank => WindowContent::Blank,
            LeafKind::TextBuffer => WindowContent::Buffer(BufferContent::new()),
            LeafKind::TextGrid => WindowContent::Grid(GridContent::new()),
        };
        self.windows.insert(
            opened.window,
            WindowState {
                stream,
                echo: None,
                style: Style::Normal,
                hyperlink: 0,
                content,
            },
        );
        if let Some(pair) = opened.pair {
            self.observer.window_created(pair, 0);
        }
        self.observer.window_created(opened.window, rock);
        self.observer.stream_created(stream, 0);
        self.apply_placements(&opened.placements);
        info!(
            window = opened.window.get(),
            ?kind,
            rock,
            split = split.map(WindowId::get),
            "opened window"
        );
        Ok(Some(opened.window))
    }

    /// Close a window and everything below it.
    ///
    /// Returns the counts of the window's own stream; pairs report zero.
    pub fn window_close(&mut self, win: WindowId) -> Result<StreamCounts, GlkError> {
        const OP: &str = "window_close";
        let counts = self
            .window_state(win, OP)?
            .and_then(|state| self.streams.get(state.stream))
            .map(|stream| stream.counts)
            .unwrap_or_default();
        let closed = self.tree.close(win, &self.metrics)?;
        for id in &closed.removed {
            self.forget_window(*id);
        }
        self.apply_placements(&closed.placements);
        info!(window = win.get(), removed = closed.removed.len(), "closed window");
        Ok(counts)
    }

    fn forget_window(&mut self, win: WindowId) {
        if let Some(buffer) = self.input.remove_window(win) {
            self.observer
                .release_buffer(BufferOwner::LineInput(win), buffer.len());
        }
        self.partial_inputs.remove(&win);
        self.partial_outputs.remove(&win);
        if let Some(state) = self.windows.remove(&win) {
            self.streams.remove(state.stream);
            self.forget_stream(state.stream);
        }
        self.observer.window_destroyed(win);
    }

    /// Drop every echo reference to a stream that just went away.
    pub(crate) fn forget_stream(&mut self, stream: StreamId) {
        for state in self.windows.values_mut() {
            if state.echo == Some(stream) {
                state.echo = None;
            }
        }
        self.observer.stream_destroyed(stream);
    }

    /// `(columns, rows)` of a text window; `(0, 0)` for others.
    pub fn window_get_size(&self, win: WindowId) -> Result<(u32, u32), GlkError> {
        if let Some(WindowState {
            content: WindowContent::Grid(grid),
            ..
        }) = self.window_state(win, "window_get_size")?
        {
            return Ok(grid.size());
        }
        self.tree.size_in_chars(win, &self.metrics)
    }

    pub fn window_set_arrangement(
        &mut self,
        win: WindowId,
        method: u32,
        size: u32,
        keywin: Option<WindowId>,
    ) -> Result<(), GlkError> {
        let placements = self
            .tree
            .set_arrangement(win, method, size, keywin, &self.metrics)?;
        self.apply_placements(&placements);
        Ok(())
    }

    /// `(method, size, keywin)` of a pair window.
    pub fn window_get_arrangement(
        &self,
        win: WindowId,
    ) -> Result<(u32, u32, Option<WindowId>), GlkError> {
        self.tree.arrangement(win)
    }

    /// Window after `prev` in creation order, with its rock.
    #[must_use]
    pub fn window_iterate(&self, prev: Option<WindowId>) -> Option<(WindowId, u32)> {
        self.tree.next_after(prev).map(|node| (node.id, node.rock))
    }

    pub fn window_get_rock(&self, win: WindowId) -> Result<u32, GlkError> {
        self.tree
            .get(win)
            .map(|node| node.rock)
            .ok_or(GlkError::InvalidWindow {
                op: "window_get_rock",
            })
    }

    #[must_use]
    pub const fn window_get_root(&self) -> Option<WindowId> {
        self.tree.root()
    }

    pub fn window_get_type(&self, win: WindowId) -> Result<WindowType, GlkError> {
        self.tree
            .get(win)
            .map(|node| node.window_type())
            .ok_or(GlkError::InvalidWindow {
                op: "window_get_type",
            })
    }

    pub fn window_get_parent(&self, win: WindowId) -> Result<Option<WindowId>, GlkError> {
        self.tree.parent(win)
    }

    pub fn window_get_sibling(&self, win: WindowId) -> Result<Option<WindowId>, GlkError> {
        self.tree.sibling(win)
    }

    /// The window's own output stream; pairs have none.
    pub fn window_get_stream(&self, win: WindowId) -> Result<Option<StreamId>, GlkError> {
        Ok(self
            .window_state(win, "window_get_stream")?
            .map(|state| state.stream))
    }

    /// Mirror everything written to `win` into `echo` (or stop with `None`).
    pub fn window_set_echo_stream(
        &mut self,
        win: WindowId,
        echo: Option<StreamId>,
    ) -> Result<(), GlkError> {
        const OP: &str = "window_set_echo_stream";
        if let Some(echo) = echo {
            self.streams.stream(echo, OP)?;
        }
        if let Some(state) = self.window_state_mut(win, OP)? {
            state.echo = echo;
        }
        Ok(())
    }

    pub fn window_get_echo_stream(&self, win: WindowId) -> Result<Option<StreamId>, GlkError> {
        Ok(self
            .window_state(win, "window_get_echo_stream")?
            .and_then(|state| state.echo))
    }

    /// Make `win`'s stream the current stream; `None` clears it.
    pub fn set_window(&mut self, win: Option<WindowId>) -> Result<(), GlkError> {
        let stream = match win {
            Some(win) => self
                .window_state(win, "set_window")?
                .map(|state| state.stream),
            None => None,
        };
        self.streams.set_current(stream)
    }

    /// Erase a window's content. Not allowed while it owns a line input.
    pub fn window_clear(&mut self, win: WindowId) -> Result<(), GlkError> {
        const OP: &str = "window_clear";
        self.check_window(win, OP)?;
        if self.input.has_line(win) {
            return Err(GlkError::LineInputPending { op: OP });
        }
        if let Some(state) = self.windows.get_mut(&win) {
            match &mut state.content {
                WindowContent::Buffer(buf) => buf.clear(),
                WindowContent::Grid(grid) => grid.clear(),
                WindowContent::Blank => {}
            }
        }
        Ok(())
    }

    /// Place a grid window's cursor; bounds apply on the next write.
    pub fn window_move_cursor(&mut self, win: WindowId, x: u32, y: u32) -> Result<(), GlkError> {
        const OP: &str = "window_move_cursor";
        match self.window_state_mut(win, OP)? {
            Some(WindowState {
                content: WindowContent::Grid(grid),
                ..
            }) => {
                grid.move_cursor(x, y);
                Ok(())
            }
            _ => Err(GlkError::NotGridWindow { op: OP }),
        }
    }

    pub fn window_flow_break(&mut self, win: WindowId) -> Result<(), GlkError> {
        self.check_window(win, "window_flow_break")
    }

    pub fn window_erase_rect(
        &mut self,
        win: WindowId,
        _left: i32,
        _top: i32,
        _width: u32,
        _height: u32,
    ) -> Result<(), GlkError> {
        self.check_window(win, "window_erase_rect")
    }

    pub fn window_fill_rect(
        &mut self,
        win: WindowId,
        _color: u32,
        _left: i32,
        _top: i32,
        _width: u32,
        _height: u32,
    ) -> Result<(), GlkError> {
        self.check_window(win, "window_fill_rect")
    }

    pub fn window_set_background_color(
        &mut self,
        win: WindowId,
        _color: u32,
    ) -> Result<(), GlkError> {
        self.check_window(win, "window_set_background_color")
    }
}
