#![forbid(unsafe_code)]

use fglk_core::casemap;
use fglk_core::codes::{Gestalt, char_output, keycode};
use fglk_core::error::GlkError;
use fglk_layout::WindowId;

use super::Glk;

/// Glk API version reported by `gestalt`.
pub const GLK_VERSION: u32 = 0x0007_0500;

const fn is_printable(ch: u32) -> bool {
    !(ch < 0x20 || (ch >= 0x7f && ch < 0xa0))
}

impl Glk {
    /// Capability query.
    #[must_use]
    pub fn gestalt(&self, sel: u32, val: u32) -> u32 {
        self.gestalt_ext(sel, val, None)
    }

    /// Capability query with an output array; only `CharOutput` fills it,
    /// with the number of glyphs the character prints as.
    #[must_use]
    pub fn gestalt_ext(&self, sel: u32, val: u32, arr: Option<&mut [u32]>) -> u32 {
        let Some(sel) = Gestalt::from_code(sel) else {
            return 0;
        };
        match sel {
            Gestalt::Version => GLK_VERSION,
            Gestalt::CharInput => u32::from(is_printable(val) || keycode::is_special(val)),
            Gestalt::LineInput => u32::from(is_printable(val)),
            Gestalt::CharOutput => {
                let (answer, glyphs) = if is_printable(val) {
                    (char_output::EXACT_PRINT, 1)
                } else {
                    (char_output::CANNOT_PRINT, 0)
                };
                if let Some(slot) = arr.and_then(|arr| arr.first_mut()) {
                    *slot = glyphs;
                }
                answer
            }
            Gestalt::Timer | Gestalt::Hyperlinks | Gestalt::Unicode => 1,
            Gestalt::HyperlinkInput => u32::from(val == 3 || val == 4),
            Gestalt::MouseInput
            | Gestalt::Graphics
            | Gestalt::DrawImage
            | Gestalt::Sound
            | Gestalt::SoundVolume
            | Gestalt::SoundNotify
            | Gestalt::SoundMusic
            | Gestalt::GraphicsTransparency => 0,
        }
    }

    // ── case folding ────────────────────────────────────────────────────

    #[must_use]
    pub const fn char_to_lower(&self, ch: u32) -> u32 {
        casemap::char_to_lower(ch)
    }

    #[must_use]
    pub const fn char_to_upper(&self, ch: u32) -> u32 {
        casemap::char_to_upper(ch)
    }

    pub fn buffer_to_lower_case_uni(
        &self,
        buf: &mut [u32],
        numchars: usize,
    ) -> Result<usize, GlkError> {
        casemap::buffer_to_lower_case_uni(buf, numchars)
    }

    pub fn buffer_to_upper_case_uni(
        &self,
        buf: &mut [u32],
        numchars: usize,
    ) -> Result<usize, GlkError> {
        casemap::buffer_to_upper_case_uni(buf, numchars)
    }

    pub fn buffer_to_title_case_uni(
        &self,
        buf: &mut [u32],
        numchars: usize,
        lower_rest: bool,
    ) -> Result<usize, GlkError> {
        casemap::buffer_to_title_case_uni(buf, numchars, lower_rest)
    }

    // ── unsupported graphics and style hints ────────────────────────────

    /// No images are available.
    #[must_use]
    pub const fn image_get_info(&self, _image: u32) -> Option<(u32, u32)> {
        None
    }

    pub fn image_draw(
        &self,
        win: WindowId,
        _image: u32,
        _val1: i32,
        _val2: i32,
    ) -> Result<bool, GlkError> {
        self.check_window(win, "image_draw")?;
        Ok(false)
    }

    pub fn image_draw_scaled(
        &self,
        win: WindowId,
        _image: u32,
        _val1: i32,
        _val2: i32,
        _width: u32,
        _height: u32,
    ) -> Result<bool, GlkError> {
        self.check_window(win, "image_draw_scaled")?;
        Ok(false)
    }

    pub fn stylehint_set(&mut self, _wintype: u32, _style: u32, _hint: u32, _value: i32) {}

    pub fn stylehint_clear(&mut self, _wintype: u32, _style: u32, _hint: u32) {}

    /// Styles are never guaranteed to look different.
    pub fn style_distinguish(
        &self,
        win: WindowId,
        _style1: u32,
        _style2: u32,
    ) -> Result<bool, GlkError> {
        self.check_window(win, "style_distinguish")?;
        Ok(false)
    }

    pub fn style_measure(
        &self,
        win: WindowId,
        _style: u32,
        _hint: u32,
    ) -> Result<Option<u32>, GlkError> {
        self.check_window(win, "style_measure")?;
        Ok(None)
    }
}
