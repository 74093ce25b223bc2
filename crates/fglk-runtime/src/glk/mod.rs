#![forbid(unsafe_code)]

//! The Glk API as seen by a VM.
//!
//! [`Glk`] owns every engine table: the window tree, per-window content and
//! style, the stream registry, input requests and the timer. API calls
//! mutate these synchronously. [`Glk::compile`] turns the accumulated
//! changes into one [`Update`](crate::protocol::Update), and
//! [`Glk::dispatch`] routes the renderer's answer back in.
//!
//! The API surface is split by concern:
//! - `window`: open/close, tree queries, arrangement, clear and cursor
//! - `stream`: memory streams, output, styles, reads and seeks
//! - `input`: requests, cancellation, `select`, timers, `exit`
//! - `misc`: gestalt, case folding and the inert graphics/style calls
//! - `update`: the outbound compiler
//! - `dispatch`: the inbound router

mod dispatch;
mod input;
mod misc;
mod stream;
mod update;
mod window;

use std::collections::BTreeMap;
use std::fmt;

use core::time::Duration;

use fglk_core::metrics::ContentMetrics;
use fglk_core::style::Style;
use fglk_layout::{WindowId, WindowTree};

use crate::clock::{HostClock, TimerState};
use crate::content::{BufferContent, GridContent};
use crate::input::InputArbiter;
use crate::observer::{DispatchObserver, NoopObserver};
use crate::stream::{StreamId, StreamRegistry};

pub use dispatch::{Dispatch, Rejection};

/// Longest echo chain followed before a write is treated as a loop.
pub const MAX_ECHO_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WindowContent {
    Blank,
    Buffer(BufferContent),
    Grid(GridContent),
}

/// Engine state of one leaf window. Pair windows have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowState {
    pub(crate) stream: StreamId,
    pub(crate) echo: Option<StreamId>,
    pub(crate) style: Style,
    pub(crate) hyperlink: u32,
    pub(crate) content: WindowContent,
}

/// The engine context handed to the VM.
pub struct Glk {
    tree: WindowTree,
    windows: BTreeMap<WindowId, WindowState>,
    streams: StreamRegistry,
    input: InputArbiter,
    metrics: ContentMetrics,
    /// Text typed into open line inputs, as last reported by the renderer.
    partial_inputs: BTreeMap<WindowId, String>,
    /// Initial text of line requests made since the last update.
    partial_outputs: BTreeMap<WindowId, String>,
    select_pending: bool,
    initialized: bool,
    exited: bool,
    clock: HostClock,
    timer: TimerState,
    observer: Box<dyn DispatchObserver>,
}

impl fmt::Debug for Glk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glk")
            .field("generation", &self.input.generation())
            .field("windows", &self.tree.len())
            .field("streams", &self.streams.len())
            .field("select_pending", &self.select_pending)
            .field("exited", &self.exited)
            .finish_non_exhaustive()
    }
}

impl Default for Glk {
    fn default() -> Self {
        Self::new()
    }
}

impl Glk {
    #[must_use]
    pub fn new() -> Self {
        Self::with_observer(Box::new(NoopObserver))
    }

    #[must_use]
    pub fn with_observer(observer: Box<dyn DispatchObserver>) -> Self {
        Self {
            tree: WindowTree::new(),
            windows: BTreeMap::new(),
            streams: StreamRegistry::new(),
            input: InputArbiter::new(),
            metrics: ContentMetrics::default(),
            partial_inputs: BTreeMap::new(),
            partial_outputs: BTreeMap::new(),
            select_pending: false,
            initialized: false,
            exited: false,
            clock: HostClock::new(),
            timer: TimerState::default(),
            observer,
        }
    }

    #[must_use]
    pub const fn tree(&self) -> &WindowTree {
        &self.tree
    }

    #[must_use]
    pub const fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    #[must_use]
    pub const fn input(&self) -> &InputArbiter {
        &self.input
    }

    #[must_use]
    pub const fn metrics(&self) -> &ContentMetrics {
        &self.metrics
    }

    /// Generation the next inbound event must carry.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.input.generation()
    }

    #[must_use]
    pub const fn is_exited(&self) -> bool {
        self.exited
    }

    /// Whether the VM is blocked in `select`.
    #[must_use]
    pub const fn is_select_pending(&self) -> bool {
        self.select_pending
    }

    #[must_use]
    pub const fn clock(&self) -> &HostClock {
        &self.clock
    }

    pub fn set_clock(&mut self, now: Duration) {
        self.clock.set(now);
    }

    pub fn advance_clock(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Whether the VM's timer interval has elapsed.
    #[must_use]
    pub fn timer_due(&self) -> bool {
        self.timer.is_due(self.clock.now())
    }

    /// Grid state of a text-grid window.
    #[must_use]
    pub fn grid_content(&self, win: WindowId) -> Option<&GridContent> {
        match &self.windows.get(&win)?.content {
            WindowContent::Grid(grid) => Some(grid),
            WindowContent::Blank | WindowContent::Buffer(_) => None,
        }
    }

    /// Current output style of a leaf window.
    #[must_use]
    pub fn window_style(&self, win: WindowId) -> Option<Style> {
        self.windows.get(&win).map(|state| state.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fglk_core::codes::{Direction, Division, WinMethod, WindowType};

    pub(super) fn glk_with_size(width: f64, height: f64) -> Glk {
        let mut glk = Glk::new();
        glk.metrics = ContentMetrics::with_size(width, height);
        glk
    }

    pub(super) fn open_buffer(glk: &mut Glk) -> WindowId {
        glk.window_open(None, 0, 0, WindowType::TextBuffer.code(), 1)
            .expect("open")
            .expect("supported type")
    }

    #[test]
    fn debug_output_summarizes_tables() {
        let mut glk = glk_with_size(80.0, 24.0);
        let root = open_buffer(&mut glk);
        glk.window_open(
            Some(root),
            WinMethod::new(Direction::Above, Division::Fixed).0,
            1,
            WindowType::TextGrid.code(),
            2,
        )
        .expect("split");
        let text = format!("{glk:?}");
        assert!(text.contains("windows: 3"), "{text}");
        assert!(text.contains("streams: 2"), "{text}");
    }
}
