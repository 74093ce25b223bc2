#![forbid(unsafe_code)]

//! A tiny built-in story used when no other VM is plugged in.
//!
//! The screen is a one-row status grid above a story buffer. Every command
//! counts as a move and is echoed back; a handful of words exercise the
//! rest of the input machinery:
//!
//! | command | effect |
//! |---------|--------|
//! | `link`  | prints a hyperlink and waits for a click alongside the prompt |
//! | `wait`  | starts a one-second timer |
//! | `clear` | clears the story window |
//! | `quit`  | says goodbye and exits |

use fglk_core::codes::{Direction, Division, WinMethod, WindowType};
use fglk_core::style::Style;
use fglk_runtime::{Glk, GlkError, GlkEvent, Vm, WindowId};
use tracing::debug;

const STORY_ROCK: u32 = 1;
const STATUS_ROCK: u32 = 2;
const LINE_CAPACITY: usize = 256;
const LINK_VALUE: u32 = 7;
const WAIT_MS: u32 = 1000;
const TITLE: &str = "Glk Harness";

/// Demonstration program.
#[derive(Debug, Default)]
pub struct DemoVm {
    story: Option<WindowId>,
    status: Option<WindowId>,
    moves: u32,
}

impl DemoVm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands entered so far.
    #[must_use]
    pub const fn moves(&self) -> u32 {
        self.moves
    }

    #[must_use]
    pub const fn story_window(&self) -> Option<WindowId> {
        self.story
    }

    #[must_use]
    pub const fn status_window(&self) -> Option<WindowId> {
        self.status
    }

    fn draw_status(&self, glk: &mut Glk) -> Result<(), GlkError> {
        let Some(status) = self.status else {
            return Ok(());
        };
        let (width, _) = glk.window_get_size(status)?;
        let moves = format!("Moves: {}", self.moves);
        let width = width as usize;
        let gap = width.saturating_sub(TITLE.len() + moves.len() + 2);
        let line = format!(" {TITLE}{:gap$}{moves} ", "");

        glk.window_clear(status)?;
        glk.set_window(Some(status))?;
        glk.set_style(Style::Subheader.code())?;
        glk.put_str(&line)?;
        glk.set_style(Style::Normal.code())?;
        glk.set_window(self.story)
    }

    fn prompt(&self, glk: &mut Glk) -> Result<(), GlkError> {
        if let Some(story) = self.story {
            glk.put_str("\n>")?;
            glk.request_line_event_uni(story, vec![0; LINE_CAPACITY], 0)?;
        }
        glk.select();
        Ok(())
    }

    /// Stop the pending line so the story window can be written to.
    fn interrupt_line(&self, glk: &mut Glk) -> Result<(), GlkError> {
        if let Some(story) = self.story
            && glk.input().has_line(story)
        {
            glk.cancel_line_event(story)?;
        }
        Ok(())
    }

    fn command(&mut self, glk: &mut Glk, mut chars: Vec<u32>) -> Result<(), GlkError> {
        let len = chars.len();
        chars.resize(len * 2, 0);
        let len = glk.buffer_to_lower_case_uni(&mut chars, len)?;
        let text: String = chars[..len.min(chars.len())]
            .iter()
            .filter_map(|&ch| char::from_u32(ch))
            .collect();
        let text = text.trim();
        debug!(command = text, "demo command");
        if text.is_empty() {
            glk.put_str("Say something.")?;
            return self.prompt(glk);
        }

        self.moves += 1;
        match text {
            "quit" => {
                glk.put_str("Goodbye.\n")?;
                self.draw_status(glk)?;
                glk.exit();
                return Ok(());
            }
            "clear" => {
                if let Some(story) = self.story {
                    glk.window_clear(story)?;
                }
                glk.put_str("Cleared.")?;
            }
            "link" => {
                glk.put_str("Follow ")?;
                glk.set_hyperlink(LINK_VALUE)?;
                glk.put_str("this link")?;
                glk.set_hyperlink(0)?;
                glk.put_str(" or type something.")?;
                if let Some(story) = self.story {
                    glk.request_hyperlink_event(story)?;
                }
            }
            "wait" => {
                glk.put_str("You wait.")?;
                glk.request_timer_events(WAIT_MS);
            }
            _ => {
                glk.put_str(&format!("You said \"{text}\"."))?;
            }
        }
        self.draw_status(glk)?;
        self.prompt(glk)
    }
}

impl Vm for DemoVm {
    fn init(&mut self, glk: &mut Glk) -> Result<(), GlkError> {
        self.story = glk.window_open(None, 0, 0, WindowType::TextBuffer.code(), STORY_ROCK)?;
        if let Some(story) = self.story {
            self.status = glk.window_open(
                Some(story),
                WinMethod::new(Direction::Above, Division::Fixed).0,
                1,
                WindowType::TextGrid.code(),
                STATUS_ROCK,
            )?;
        }
        glk.set_window(self.story)?;
        glk.set_style(Style::Header.code())?;
        glk.put_str(TITLE)?;
        glk.set_style(Style::Normal.code())?;
        glk.put_str("\nType anything. Try link, wait, clear or quit.\n")?;
        self.draw_status(glk)?;
        self.prompt(glk)
    }

    fn resume(&mut self, glk: &mut Glk, event: GlkEvent) -> Result<(), GlkError> {
        match event {
            GlkEvent::LineInput { .. } => {
                let chars = event.line_chars().unwrap_or_default();
                self.command(glk, chars)
            }
            GlkEvent::Hyperlink { link, .. } => {
                self.interrupt_line(glk)?;
                glk.put_str(&format!("You followed link {link}."))?;
                self.prompt(glk)
            }
            GlkEvent::Timer => {
                glk.request_timer_events(0);
                self.interrupt_line(glk)?;
                glk.put_str("Time passes.")?;
                self.prompt(glk)
            }
            GlkEvent::Arrange => {
                self.draw_status(glk)?;
                glk.select();
                Ok(())
            }
            GlkEvent::None | GlkEvent::CharInput { .. } => {
                glk.select();
                Ok(())
            }
        }
    }
}
