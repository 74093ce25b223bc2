#![forbid(unsafe_code)]

//! Wire records exchanged with the renderer.
//!
//! Outbound: one [`Update`] per suspension. Inbound: one [`InputEvent`] per
//! user action. Both are plain serde types; the JSON transport lives in the
//! web crate.

use std::collections::BTreeMap;

use fglk_core::metrics::ContentMetrics;
use fglk_core::style::Style;
use fglk_layout::WindowId;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

fn is_false(v: &bool) -> bool {
    !*v
}

/// Pixel values go out as integers when they are whole.
fn px<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT {
        s.serialize_i64(*value as i64)
    } else {
        s.serialize_f64(*value)
    }
}

/// Everything that changed since the previous update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "update")]
pub struct Update {
    pub generation: u64,
    /// Full geometry of every leaf; present only after a layout pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<WindowDesc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentDesc>>,
    /// Every outstanding request. An empty list withdraws all input fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<InputDesc>>,
    /// New timer interval in milliseconds, `null` to stop; absent when
    /// unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<Option<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKindName {
    Buffer,
    Grid,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDesc {
    pub id: WindowId,
    pub rock: u32,
    pub kind: WindowKindName,
    #[serde(serialize_with = "px")]
    pub left: f64,
    #[serde(serialize_with = "px")]
    pub top: f64,
    #[serde(serialize_with = "px")]
    pub width: f64,
    #[serde(serialize_with = "px")]
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_height: Option<u32>,
}

/// New content for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDesc {
    pub id: WindowId,
    /// Buffer windows: paragraphs in output order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<Paragraph>>,
    /// Buffer windows: drop everything shown before `text`.
    #[serde(skip_serializing_if = "is_false")]
    pub clear: bool,
    /// Grid windows: full replacement of each changed line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<GridLineDesc>>,
}

/// One buffer-window line.
///
/// `append` continues the last line already on screen. A paragraph with no
/// content is an empty line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "is_false")]
    pub append: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Runs>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLineDesc {
    pub line: u32,
    pub content: Runs,
}

/// A styled piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    /// Serialized as the two flat entries `styleName, text`.
    Plain { style: Style, text: String },
    /// Serialized as `{style, text, hyperlink}`.
    Linked {
        style: Style,
        text: String,
        hyperlink: u32,
    },
}

impl Run {
    #[must_use]
    pub fn new(style: Style, text: impl Into<String>, hyperlink: u32) -> Self {
        let text = text.into();
        if hyperlink == 0 {
            Self::Plain { style, text }
        } else {
            Self::Linked {
                style,
                text,
                hyperlink,
            }
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Linked { text, .. } => text,
        }
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        match self {
            Self::Plain { style, .. } | Self::Linked { style, .. } => *style,
        }
    }
}

/// A run list in its mixed wire form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Runs(pub Vec<Run>);

impl Runs {
    #[must_use]
    pub fn text(&self) -> String {
        self.0.iter().map(Run::text).collect()
    }
}

impl Serialize for Runs {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct LinkedRun<'a> {
            style: Style,
            text: &'a str,
            hyperlink: u32,
        }

        let len = self
            .0
            .iter()
            .map(|run| match run {
                Run::Plain { .. } => 2,
                Run::Linked { .. } => 1,
            })
            .sum();
        let mut seq = s.serialize_seq(Some(len))?;
        for run in &self.0 {
            match run {
                Run::Plain { style, text } => {
                    seq.serialize_element(style)?;
                    seq.serialize_element(text)?;
                }
                Run::Linked {
                    style,
                    text,
                    hyperlink,
                } => seq.serialize_element(&LinkedRun {
                    style: *style,
                    text,
                    hyperlink: *hyperlink,
                })?,
            }
        }
        seq.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Char,
    Line,
}

/// One outstanding input request.
///
/// A window with only a hyperlink request carries no `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDesc {
    pub id: WindowId,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<InputKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxlen: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpos: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypos: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Init,
    Char,
    Line,
    Hyperlink,
    Arrange,
    /// Host-side events; `value: "timer"` is a timer tick.
    External,
    /// Anything else the renderer sends; accepted and ignored.
    #[serde(other)]
    Other,
}

/// One user action, tagged with the generation it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(alias = "gen")]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ContentMetrics>,
    /// Text typed so far into each open line input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<BTreeMap<WindowId, String>>,
}

impl InputEvent {
    fn new(kind: EventKind, generation: u64) -> Self {
        Self {
            kind,
            generation,
            window: None,
            value: None,
            metrics: None,
            partial: None,
        }
    }

    #[must_use]
    pub fn init(generation: u64, metrics: ContentMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(EventKind::Init, generation)
        }
    }

    #[must_use]
    pub fn arrange(generation: u64, metrics: ContentMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(EventKind::Arrange, generation)
        }
    }

    /// A key press: a single character or a key name such as `"left"`.
    #[must_use]
    pub fn char(generation: u64, window: WindowId, key: &str) -> Self {
        Self {
            window: Some(window),
            value: Some(serde_json::Value::from(key)),
            ..Self::new(EventKind::Char, generation)
        }
    }

    #[must_use]
    pub fn line(generation: u64, window: WindowId, text: &str) -> Self {
        Self {
            window: Some(window),
            value: Some(serde_json::Value::from(text)),
            ..Self::new(EventKind::Line, generation)
        }
    }

    #[must_use]
    pub fn hyperlink(generation: u64, window: WindowId, link: u32) -> Self {
        Self {
            window: Some(window),
            value: Some(serde_json::Value::from(link)),
            ..Self::new(EventKind::Hyperlink, generation)
        }
    }

    #[must_use]
    pub fn timer(generation: u64) -> Self {
        Self {
            value: Some(serde_json::Value::from("timer")),
            ..Self::new(EventKind::External, generation)
        }
    }

    #[must_use]
    pub fn with_partial(mut self, window: WindowId, text: &str) -> Self {
        self.partial
            .get_or_insert_with(BTreeMap::new)
            .insert(window, text.to_owned());
        self
    }

    pub(crate) fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }

    pub(crate) fn value_u32(&self) -> Option<u32> {
        self.value
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}
