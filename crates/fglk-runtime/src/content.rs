#![forbid(unsafe_code)]

//! Per-window output state between updates.
//!
//! Buffer windows accumulate printed text and fold it into paragraphs of
//! styled runs when the style or hyperlink changes, or when an update is
//! compiled. Grid windows write straight into a character matrix and only
//! report the lines touched since the last update.

use fglk_core::style::Style;
use tracing::trace;

use crate::protocol::{GridLineDesc, Paragraph, Run, Runs};

/// Text printed to a buffer window since the last update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferContent {
    accum: String,
    accum_style: Style,
    accum_link: u32,
    paragraphs: Vec<Paragraph>,
    clear: bool,
}

/// What a buffer window contributes to one update.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferUpdate {
    pub text: Vec<Paragraph>,
    pub clear: bool,
}

impl BufferContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text in `style` with `link` (0 for none).
    pub fn put(&mut self, text: &str, style: Style, link: u32) {
        if (style, link) != (self.accum_style, self.accum_link) {
            self.flush();
            self.accum_style = style;
            self.accum_link = link;
        }
        self.accum.push_str(text);
    }

    /// Fold the accumulated text into paragraphs.
    ///
    /// The first line continues the previous paragraph; every newline
    /// starts a new one. An empty line between two newlines becomes a
    /// contentless paragraph.
    pub fn flush(&mut self) {
        if self.accum.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.accum);
        for (ix, line) in text.split('\n').enumerate() {
            let target = if ix == 0 {
                if self.paragraphs.is_empty() {
                    self.paragraphs.push(Paragraph {
                        append: true,
                        content: None,
                    });
                }
                if line.is_empty() {
                    continue;
                }
                self.paragraphs.last_mut()
            } else {
                self.paragraphs.push(Paragraph::default());
                if line.is_empty() {
                    continue;
                }
                self.paragraphs.last_mut()
            };
            if let Some(paragraph) = target {
                paragraph
                    .content
                    .get_or_insert_with(Runs::default)
                    .0
                    .push(Run::new(self.accum_style, line, self.accum_link));
            }
        }
    }

    /// Drop everything printed so far, on screen and pending.
    pub fn clear(&mut self) {
        self.accum.clear();
        self.paragraphs.clear();
        self.clear = true;
    }

    /// Flush and hand over the pending paragraphs, if there is anything to
    /// report.
    pub fn take_update(&mut self) -> Option<BufferUpdate> {
        self.flush();
        let clear = std::mem::take(&mut self.clear);
        if self.paragraphs.is_empty() && !clear {
            return None;
        }
        Some(BufferUpdate {
            text: std::mem::take(&mut self.paragraphs),
            clear,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GridLine {
    chars: Vec<char>,
    styles: Vec<Style>,
    links: Vec<u32>,
    dirty: bool,
}

impl GridLine {
    fn blank(width: usize) -> Self {
        Self {
            chars: vec![' '; width],
            styles: vec![Style::Normal; width],
            links: vec![0; width],
            dirty: true,
        }
    }

    fn resize(&mut self, width: usize) {
        if width != self.chars.len() {
            self.chars.resize(width, ' ');
            self.styles.resize(width, Style::Normal);
            self.links.resize(width, 0);
            self.dirty = true;
        }
    }

    fn runs(&self) -> Runs {
        let mut runs = Vec::new();
        let mut start = 0;
        while start < self.chars.len() {
            let key = (self.styles[start], self.links[start]);
            let mut end = start + 1;
            while end < self.chars.len() && (self.styles[end], self.links[end]) == key {
                end += 1;
            }
            let text: String = self.chars[start..end].iter().collect();
            runs.push(Run::new(key.0, text, key.1));
            start = end;
        }
        Runs(runs)
    }
}

/// A fixed matrix of character cells with a write cursor.
///
/// Each Rust `char` occupies exactly one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridContent {
    width: u32,
    height: u32,
    lines: Vec<GridLine>,
    cursor_x: u32,
    cursor_y: u32,
}

impl GridContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn cursor(&self) -> (u32, u32) {
        (self.cursor_x, self.cursor_y)
    }

    /// Contents of row `y` as a string.
    #[must_use]
    pub fn line_text(&self, y: u32) -> Option<String> {
        self.lines
            .get(y as usize)
            .map(|line| line.chars.iter().collect())
    }

    /// Change the grid size; new or widened cells are blank and dirty.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        trace!(width, height, "resize grid");
        self.width = width;
        self.height = height;
        let (w, h) = (width as usize, height as usize);
        self.lines.truncate(h);
        for line in &mut self.lines {
            line.resize(w);
        }
        while self.lines.len() < h {
            self.lines.push(GridLine::blank(w));
        }
    }

    /// Place the cursor; bounds are applied on the next write.
    pub fn move_cursor(&mut self, x: u32, y: u32) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    /// Wrap a cursor that ran off the right edge onto the next row.
    pub fn canonical_cursor(&mut self) -> (u32, u32) {
        if self.cursor_x >= self.width {
            self.cursor_x = 0;
            self.cursor_y = self.cursor_y.saturating_add(1);
        }
        (self.cursor_x, self.cursor_y)
    }

    /// Write text at the cursor. Writes below the last row are dropped.
    pub fn put(&mut self, text: &str, style: Style, link: u32) {
        if self.width == 0 {
            return;
        }
        for ch in text.chars() {
            let (x, y) = self.canonical_cursor();
            let Some(line) = self.lines.get_mut(y as usize) else {
                return;
            };
            if ch == '\n' {
                self.cursor_x = 0;
                self.cursor_y = y.saturating_add(1);
                continue;
            }
            let x = x as usize;
            line.chars[x] = ch;
            line.styles[x] = style;
            line.links[x] = link;
            line.dirty = true;
            self.cursor_x += 1;
        }
    }

    /// Blank every cell and home the cursor.
    pub fn clear(&mut self) {
        let width = self.width as usize;
        for line in &mut self.lines {
            *line = GridLine::blank(width);
        }
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    /// Encode and clean every dirty line.
    pub fn take_dirty_lines(&mut self) -> Vec<GridLineDesc> {
        if self.width == 0 || self.height == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (y, line) in (0u32..).zip(self.lines.iter_mut()) {
            if !line.dirty {
                continue;
            }
            line.dirty = false;
            out.push(GridLineDesc {
                line: y,
                content: line.runs(),
            });
        }
        out
    }
}
