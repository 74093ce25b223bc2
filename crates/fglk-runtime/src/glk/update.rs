#![forbid(unsafe_code)]

//! The outbound compiler.

use fglk_layout::{LeafKind, WindowId};
use tracing::{debug, debug_span};

use super::{Glk, WindowContent};
use crate::input::{KeyRequest, KeyRequestKind};
use crate::protocol::{ContentDesc, InputDesc, InputKind, Update, WindowDesc, WindowKindName};

const fn kind_name(kind: LeafKind) -> WindowKindName {
    match kind {
        LeafKind::TextBuffer => WindowKindName::Buffer,
        LeafKind::TextGrid => WindowKindName::Grid,
        LeafKind::Blank => WindowKindName::Blank,
    }
}

impl Glk {
    /// Collect everything that changed since the last call into one update.
    ///
    /// Geometry is sent only after a layout pass, content only for windows
    /// that received output, and the timer only when its interval changed.
    /// The input list is always complete, and empty once the VM has exited.
    pub fn compile(&mut self) -> Update {
        let _span = debug_span!("compile", generation = self.generation()).entered();
        let windows = self
            .tree
            .take_geometry_changed()
            .then(|| self.window_descs());
        let content = self.content_descs();
        let input = if self.exited {
            Vec::new()
        } else {
            self.input_descs()
        };
        self.partial_outputs.clear();
        let update = Update {
            generation: self.generation(),
            windows,
            content: (!content.is_empty()).then_some(content),
            input: Some(input),
            timer: self.timer.take_announcement(),
        };
        debug!(
            windows = update.windows.as_ref().map_or(0, Vec::len),
            content = update.content.as_ref().map_or(0, Vec::len),
            "update compiled"
        );
        update
    }

    /// The update sent after a fatal error: no further input is accepted.
    pub(crate) fn fatal_update(&mut self) -> Update {
        self.exited = true;
        self.select_pending = false;
        Update {
            generation: self.generation(),
            windows: None,
            content: None,
            input: Some(Vec::new()),
            timer: None,
        }
    }

    fn window_descs(&self) -> Vec<WindowDesc> {
        self.tree
            .iter()
            .filter_map(|node| {
                let kind = node.leaf_kind()?;
                let grid = self.grid_content(node.id).map(|grid| grid.size());
                Some(WindowDesc {
                    id: node.id,
                    rock: node.rock,
                    kind: kind_name(kind),
                    left: node.bbox.left,
                    top: node.bbox.top,
                    width: node.bbox.width(),
                    height: node.bbox.height(),
                    grid_width: grid.map(|(w, _)| w),
                    grid_height: grid.map(|(_, h)| h),
                })
            })
            .collect()
    }

    fn content_descs(&mut self) -> Vec<ContentDesc> {
        let mut out = Vec::new();
        for (&id, state) in &mut self.windows {
            match &mut state.content {
                WindowContent::Buffer(buf) => {
                    if let Some(update) = buf.take_update() {
                        out.push(ContentDesc {
                            id,
                            text: Some(update.text),
                            clear: update.clear,
                            lines: None,
                        });
                    }
                }
                WindowContent::Grid(grid) => {
                    let lines = grid.take_dirty_lines();
                    if !lines.is_empty() {
                        out.push(ContentDesc {
                            id,
                            text: None,
                            clear: false,
                            lines: Some(lines),
                        });
                    }
                }
                WindowContent::Blank => {}
            }
        }
        out
    }

    fn input_descs(&mut self) -> Vec<InputDesc> {
        let mut out = Vec::new();
        for (win, requests) in self.input.iter() {
            let mut desc = InputDesc {
                id: win,
                ..InputDesc::default()
            };
            if let Some(KeyRequest { kind, generation }) = &requests.key {
                desc.generation = Some(*generation);
                match kind {
                    KeyRequestKind::Char { .. } => desc.kind = Some(InputKind::Char),
                    KeyRequestKind::Line { buffer } => {
                        desc.kind = Some(InputKind::Line);
                        desc.maxlen = Some(u32::try_from(buffer.len()).unwrap_or(u32::MAX));
                        desc.initial = self.partial_outputs.get(&win).cloned();
                    }
                }
                if let Some((x, y)) = grid_cursor(&mut self.windows, win) {
                    desc.xpos = Some(x);
                    desc.ypos = Some(y);
                }
            }
            if requests.hyperlink {
                desc.hyperlink = Some(true);
            }
            out.push(desc);
        }
        out
    }
}

fn grid_cursor(
    windows: &mut std::collections::BTreeMap<WindowId, super::WindowState>,
    win: WindowId,
) -> Option<(u32, u32)> {
    match &mut windows.get_mut(&win)?.content {
        WindowContent::Grid(grid) => Some(grid.canonical_cursor()),
        WindowContent::Blank | WindowContent::Buffer(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{glk_with_size, open_buffer};
    use super::*;
    use crate::protocol::{GridLineDesc, Paragraph, Run, Runs};
    use fglk_core::codes::{Direction, Division, WinMethod, WindowType};
    use fglk_core::style::Style;
    use pretty_assertions::assert_eq;

    fn open_status(glk: &mut Glk, root: WindowId, rows: u32) -> WindowId {
        glk.window_open(
            Some(root),
            WinMethod::new(Direction::Above, Division::Fixed).0,
            rows,
            WindowType::TextGrid.code(),
            7,
        )
        .expect("split")
        .expect("grid")
    }

    #[test]
    fn first_update_carries_geometry_and_then_stops() {
        let mut glk = glk_with_size(80.0, 24.0);
        let root = open_buffer(&mut glk);
        let grid = open_status(&mut glk, root, 1);

        let update = glk.compile();
        assert_eq!(
            update.windows,
            Some(vec![
                WindowDesc {
                    id: root,
                    rock: 1,
                    kind: WindowKindName::Buffer,
                    left: 0.0,
                    top: 1.0,
                    width: 80.0,
                    height: 23.0,
                    grid_width: None,
                    grid_height: None,
                },
                WindowDesc {
                    id: grid,
                    rock: 7,
                    kind: WindowKindName::Grid,
                    left: 0.0,
                    top: 0.0,
                    width: 80.0,
                    height: 1.0,
                    grid_width: Some(80),
                    grid_height: Some(1),
                },
            ])
        );
        assert_eq!(update.input, Some(vec![]));
        let again = glk.compile();
        assert_eq!(again.windows, None);
        assert_eq!(again.content, None);
    }

    #[test]
    fn buffer_and_grid_content_are_reported_once() {
        let mut glk = glk_with_size(6.0, 10.0);
        let root = open_buffer(&mut glk);
        let grid = open_status(&mut glk, root, 2);
        glk.compile();

        let rs = glk.window_get_stream(root).expect("live").expect("leaf");
        let gs = glk.window_get_stream(grid).expect("live").expect("leaf");
        glk.put_str_stream(rs, "Hello\nworld").expect("print");
        glk.window_move_cursor(grid, 2, 1).expect("cursor");
        glk.put_str_stream(gs, "ok").expect("print");

        let content = glk.compile().content.expect("content");
        assert_eq!(
            content,
            vec![
                ContentDesc {
                    id: root,
                    text: Some(vec![
                        Paragraph {
                            append: true,
                            content: Some(Runs(vec![Run::new(Style::Normal, "Hello", 0)])),
                        },
                        Paragraph {
                            append: false,
                            content: Some(Runs(vec![Run::new(Style::Normal, "world", 0)])),
                        },
                    ]),
                    clear: false,
                    lines: None,
                },
                ContentDesc {
                    id: grid,
                    text: None,
                    clear: false,
                    lines: Some(vec![GridLineDesc {
                        line: 1,
                        content: Runs(vec![Run::new(Style::Normal, "  ok  ", 0)]),
                    }]),
                },
            ]
        );
        assert_eq!(glk.compile().content, None);
    }

    #[test]
    fn input_descriptors_reflect_requests() {
        let mut glk = glk_with_size(20.0, 10.0);
        let root = open_buffer(&mut glk);
        let grid = open_status(&mut glk, root, 2);
        glk.compile();

        glk.request_line_event_uni(root, vec![u32::from(b'n'), 0, 0, 0], 1)
            .expect("line");
        glk.request_hyperlink_event(root).expect("link");
        glk.window_move_cursor(grid, 20, 0).expect("cursor");
        glk.request_char_event(grid).expect("char");

        let update = glk.compile();
        assert_eq!(
            update.input,
            Some(vec![
                InputDesc {
                    id: root,
                    kind: Some(InputKind::Line),
                    generation: Some(0),
                    maxlen: Some(4),
                    initial: Some("n".to_owned()),
                    hyperlink: Some(true),
                    ..InputDesc::default()
                },
                InputDesc {
                    id: grid,
                    kind: Some(InputKind::Char),
                    generation: Some(0),
                    xpos: Some(0),
                    ypos: Some(1),
                    ..InputDesc::default()
                },
            ])
        );
        let again = glk.compile().input.expect("input");
        assert_eq!(again[0].initial, None);
        assert_eq!(again[0].maxlen, Some(4));
    }

    #[test]
    fn timer_changes_are_announced() {
        let mut glk = Glk::new();
        glk.request_timer_events(500);
        assert_eq!(glk.compile().timer, Some(Some(500)));
        assert_eq!(glk.compile().timer, None);
        glk.request_timer_events(0);
        assert_eq!(glk.compile().timer, Some(None));
    }

    #[test]
    fn exited_engine_withdraws_input() {
        let mut glk = glk_with_size(20.0, 10.0);
        let root = open_buffer(&mut glk);
        glk.request_char_event(root).expect("char");
        glk.exit();
        assert_eq!(glk.compile().input, Some(vec![]));
    }

    #[test]
    fn fatal_update_is_bare() {
        let mut glk = glk_with_size(20.0, 10.0);
        open_buffer(&mut glk);
        let update = glk.fatal_update();
        assert_eq!(update.windows, None);
        assert_eq!(update.input, Some(vec![]));
        assert!(glk.is_exited());
    }
}
