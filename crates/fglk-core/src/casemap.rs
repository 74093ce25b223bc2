#![forbid(unsafe_code)]

//! Unicode case folding for the `buffer_to_*_case_uni` calls.
//!
//! Upper and lower case come from the standard library's full mappings, so a
//! single character may expand (`ß` upper-cases to `SS`). Title case equals
//! upper case except for the characters in [`TITLE_EXCEPTIONS`]: the
//! digraphs with a dedicated title form, the Latin and Armenian ligatures,
//! and the Greek letters carrying an iota subscript.
//!
//! Code points that are not Unicode scalar values pass through unchanged.

use crate::error::GlkError;

/// Characters whose title case differs from their upper case.
///
/// Sorted by source code point so lookups can binary search.
const TITLE_EXCEPTIONS: &[(u32, &[u32])] = &[
    (0x00df, &[0x0053, 0x0073]),
    (0x01c4, &[0x01c5]),
    (0x01c5, &[0x01c5]),
    (0x01c6, &[0x01c5]),
    (0x01c7, &[0x01c8]),
    (0x01c8, &[0x01c8]),
    (0x01c9, &[0x01c8]),
    (0x01ca, &[0x01cb]),
    (0x01cb, &[0x01cb]),
    (0x01cc, &[0x01cb]),
    (0x01f1, &[0x01f2]),
    (0x01f2, &[0x01f2]),
    (0x01f3, &[0x01f2]),
    (0x0587, &[0x0535, 0x0582]),
    (0x1fb2, &[0x1fba, 0x0345]),
    (0x1fb3, &[0x1fbc]),
    (0x1fb4, &[0x0386, 0x0345]),
    (0x1fb7, &[0x0391, 0x0342, 0x0345]),
    (0x1fbc, &[0x1fbc]),
    (0x1fc2, &[0x1fca, 0x0345]),
    (0x1fc3, &[0x1fcc]),
    (0x1fc4, &[0x0389, 0x0345]),
    (0x1fc7, &[0x0397, 0x0342, 0x0345]),
    (0x1fcc, &[0x1fcc]),
    (0x1ff2, &[0x1ffa, 0x0345]),
    (0x1ff3, &[0x1ffc]),
    (0x1ff4, &[0x038f, 0x0345]),
    (0x1ff7, &[0x03a9, 0x0342, 0x0345]),
    (0x1ffc, &[0x1ffc]),
    (0xfb00, &[0x0046, 0x0066]),
    (0xfb01, &[0x0046, 0x0069]),
    (0xfb02, &[0x0046, 0x006c]),
    (0xfb03, &[0x0046, 0x0066, 0x0069]),
    (0xfb04, &[0x0046, 0x0066, 0x006c]),
    (0xfb05, &[0x0053, 0x0074]),
    (0xfb06, &[0x0053, 0x0074]),
    (0xfb13, &[0x0544, 0x0576]),
    (0xfb14, &[0x0544, 0x0565]),
    (0xfb15, &[0x0544, 0x056b]),
    (0xfb16, &[0x054e, 0x0576]),
    (0xfb17, &[0x0544, 0x056d]),
];

/// Push the lower-case form of `ch` onto `out`.
pub fn push_lower(ch: u32, out: &mut Vec<u32>) {
    match char::from_u32(ch) {
        Some(c) => out.extend(c.to_lowercase().map(u32::from)),
        None => out.push(ch),
    }
}

/// Push the upper-case form of `ch` onto `out`.
pub fn push_upper(ch: u32, out: &mut Vec<u32>) {
    match char::from_u32(ch) {
        Some(c) => out.extend(c.to_uppercase().map(u32::from)),
        None => out.push(ch),
    }
}

/// Push the title-case form of `ch` onto `out`.
pub fn push_title(ch: u32, out: &mut Vec<u32>) {
    if let Some(mapped) = title_exception(ch) {
        out.extend_from_slice(mapped);
        return;
    }
    // Greek extended: the iota-subscript blocks title-case to the
    // capital-with-prosgegrammeni forms in 0x1f88..=0x1faf.
    if (0x1f80..=0x1faf).contains(&ch) {
        out.push(ch | 0x08);
        return;
    }
    push_upper(ch, out);
}

fn title_exception(ch: u32) -> Option<&'static [u32]> {
    TITLE_EXCEPTIONS
        .binary_search_by_key(&ch, |&(from, _)| from)
        .ok()
        .map(|ix| TITLE_EXCEPTIONS[ix].1)
}

/// Case mapping of one character: at most three code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseMapping {
    chars: [u32; 3],
    len: usize,
}

impl CaseMapping {
    fn collect(ch: u32, push: fn(u32, &mut Vec<u32>)) -> Self {
        let mut out = Vec::with_capacity(3);
        push(ch, &mut out);
        let mut chars = [0; 3];
        let len = out.len().min(3);
        chars[..len].copy_from_slice(&out[..len]);
        Self { chars, len }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.chars[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[must_use]
pub fn to_lower(ch: u32) -> CaseMapping {
    CaseMapping::collect(ch, push_lower)
}

#[must_use]
pub fn to_upper(ch: u32) -> CaseMapping {
    CaseMapping::collect(ch, push_upper)
}

#[must_use]
pub fn to_title(ch: u32) -> CaseMapping {
    CaseMapping::collect(ch, push_title)
}

/// Lower-case the first `numchars` entries of `buf` in place.
///
/// Returns the length of the full result, which may exceed `buf.len()`; the
/// stored result is truncated to fit.
pub fn buffer_to_lower_case_uni(buf: &mut [u32], numchars: usize) -> Result<usize, GlkError> {
    transform(buf, numchars, "buffer_to_lower_case_uni", |_, ch, out| {
        push_lower(ch, out);
    })
}

/// Upper-case the first `numchars` entries of `buf` in place.
pub fn buffer_to_upper_case_uni(buf: &mut [u32], numchars: usize) -> Result<usize, GlkError> {
    transform(buf, numchars, "buffer_to_upper_case_uni", |_, ch, out| {
        push_upper(ch, out);
    })
}

/// Title-case the first character; lower-case the rest if `lower_rest`.
pub fn buffer_to_title_case_uni(
    buf: &mut [u32],
    numchars: usize,
    lower_rest: bool,
) -> Result<usize, GlkError> {
    transform(buf, numchars, "buffer_to_title_case_uni", |ix, ch, out| {
        if ix == 0 {
            push_title(ch, out);
        } else if lower_rest {
            push_lower(ch, out);
        } else {
            out.push(ch);
        }
    })
}

fn transform(
    buf: &mut [u32],
    numchars: usize,
    op: &'static str,
    mut map: impl FnMut(usize, u32, &mut Vec<u32>),
) -> Result<usize, GlkError> {
    if numchars > buf.len() {
        return Err(GlkError::NumCharsExceedsBuffer {
            op,
            numchars,
            len: buf.len(),
        });
    }
    let mut out = Vec::with_capacity(numchars);
    for (ix, &ch) in buf[..numchars].iter().enumerate() {
        map(ix, ch, &mut out);
    }
    let stored = out.len().min(buf.len());
    buf[..stored].copy_from_slice(&out[..stored]);
    Ok(out.len())
}

/// Latin-1 lower case; everything outside Latin-1 letters is unchanged.
#[must_use]
pub const fn char_to_lower(ch: u32) -> u32 {
    match ch {
        0x41..=0x5a => ch + 0x20,
        0xc0..=0xde if ch != 0xd7 => ch + 0x20,
        _ => ch,
    }
}

/// Latin-1 upper case; everything outside Latin-1 letters is unchanged.
#[must_use]
pub const fn char_to_upper(ch: u32) -> u32 {
    match ch {
        0x61..=0x7a => ch - 0x20,
        0xe0..=0xfe if ch != 0xf7 => ch - 0x20,
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(s: &str) -> Vec<u32> {
        s.chars().map(u32::from).collect()
    }

    #[test]
    fn exception_table_is_sorted() {
        assert!(TITLE_EXCEPTIONS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn upper_expands_sharp_s() {
        let mut buf = codes("straße\0\0");
        let n = buffer_to_upper_case_uni(&mut buf, 6).expect("fits");
        assert_eq!(n, 7);
        assert_eq!(&buf[..7], codes("STRASSE").as_slice());
    }

    #[test]
    fn expansion_is_truncated_but_reported() {
        let mut buf = codes("ß");
        let n = buffer_to_upper_case_uni(&mut buf, 1).expect("fits");
        assert_eq!(n, 2);
        assert_eq!(buf, codes("S"));
    }

    #[test]
    fn lower_case_cyrillic() {
        let mut buf = codes("ПРИВЕТ");
        let n = buffer_to_lower_case_uni(&mut buf, 6).expect("fits");
        assert_eq!(n, 6);
        assert_eq!(buf, codes("привет"));
    }

    #[test]
    fn title_case_first_only() {
        let mut buf = codes("hELLO");
        buffer_to_title_case_uni(&mut buf, 5, false).expect("fits");
        assert_eq!(buf, codes("HELLO"));

        let mut buf = codes("hELLO");
        buffer_to_title_case_uni(&mut buf, 5, true).expect("fits");
        assert_eq!(buf, codes("Hello"));
    }

    #[test]
    fn title_case_uses_digraph_forms() {
        let mut out = Vec::new();
        push_title(0x01c6, &mut out);
        assert_eq!(out, vec![0x01c5]);

        out.clear();
        push_title(0xdf, &mut out);
        assert_eq!(out, codes("Ss"));

        out.clear();
        push_title(0xfb03, &mut out);
        assert_eq!(out, codes("Ffi"));
    }

    #[test]
    fn title_case_iota_subscript_block() {
        let mut out = Vec::new();
        push_title(0x1f80, &mut out);
        assert_eq!(out, vec![0x1f88]);
        out.clear();
        push_title(0x1f8f, &mut out);
        assert_eq!(out, vec![0x1f8f]);
    }

    #[test]
    fn empty_title_case_returns_zero() {
        let mut buf: Vec<u32> = vec![];
        assert_eq!(buffer_to_title_case_uni(&mut buf, 0, true), Ok(0));
    }

    #[test]
    fn numchars_past_end_is_fatal() {
        let mut buf = codes("ab");
        assert!(matches!(
            buffer_to_lower_case_uni(&mut buf, 3),
            Err(GlkError::NumCharsExceedsBuffer { numchars: 3, len: 2, .. })
        ));
    }

    #[test]
    fn non_scalar_values_pass_through() {
        let mut buf = vec![0xd800, 0x11_0000];
        let n = buffer_to_upper_case_uni(&mut buf, 2).expect("fits");
        assert_eq!(n, 2);
        assert_eq!(buf, vec![0xd800, 0x11_0000]);
    }

    #[test]
    fn single_char_mappings_expand() {
        assert_eq!(to_upper(0xdf).as_slice(), codes("SS").as_slice());
        assert_eq!(to_title(0xdf).as_slice(), codes("Ss").as_slice());
        assert_eq!(to_lower(u32::from('Q')).as_slice(), codes("q").as_slice());
        assert_eq!(to_upper(0x0390).len(), 3);
        assert!(!to_title(0x01c4).is_empty());
    }

    #[test]
    fn latin1_char_case() {
        assert_eq!(char_to_upper(u32::from('a')), u32::from('A'));
        assert_eq!(char_to_upper(0xe9), 0xc9);
        assert_eq!(char_to_upper(0xf7), 0xf7);
        assert_eq!(char_to_upper(0xff), 0xff);
        assert_eq!(char_to_lower(0xd7), 0xd7);
        assert_eq!(char_to_lower(0xc0), 0xe0);
        assert_eq!(char_to_lower(0x100), 0x100);
    }
}
