#![forbid(unsafe_code)]

//! glktra transcripts.
//!
//! A transcript is a sequence of JSON stanzas separated by newlines. Each
//! stanza records one exchange: the renderer event that came in and the
//! update that went out, stamped with the session clock.
//!
//! - [`TranscriptRecorder`] appends stanzas to any [`Write`].
//! - [`StanzaReader`] reads them back, tolerating stanzas that span lines.
//! - [`render_text`] flattens buffer-window output into a plain-text log.

use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::WebError;

/// Value of every stanza's `format` field.
pub const FORMAT: &str = "glktra";

const METADATA_KEYS: [&str; 7] = [
    "title",
    "author",
    "headline",
    "firstpublished",
    "ifid",
    "format",
    "tuid",
];

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stanza {
    pub format: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Session clock in milliseconds.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Story metadata shown at the top of a rendered transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Writes stanzas for one session.
#[derive(Debug)]
pub struct TranscriptRecorder<W: Write> {
    out: W,
    session_id: String,
    label: Option<String>,
    stanzas: u64,
}

impl<W: Write> TranscriptRecorder<W> {
    pub fn new(out: W, session_id: impl Into<String>) -> Self {
        Self {
            out,
            session_id: session_id.into(),
            label: None,
            stanzas: 0,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of stanzas written so far.
    #[must_use]
    pub const fn stanzas(&self) -> u64 {
        self.stanzas
    }

    fn stanza(&self, timestamp: u64) -> Stanza {
        Stanza {
            format: FORMAT.to_owned(),
            session_id: self.session_id.clone(),
            label: self.label.clone(),
            timestamp,
            input: None,
            output: None,
            metadata: None,
        }
    }

    /// Append one exchange.
    pub fn record(&mut self, timestamp: u64, input: &Value, output: &Value) -> Result<(), WebError> {
        let stanza = Stanza {
            input: Some(input.clone()),
            output: Some(output.clone()),
            ..self.stanza(timestamp)
        };
        self.write(&stanza)
    }

    /// Append a metadata-only stanza.
    pub fn record_metadata(
        &mut self,
        timestamp: u64,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), WebError> {
        let stanza = Stanza {
            metadata: Some(metadata),
            ..self.stanza(timestamp)
        };
        self.write(&stanza)
    }

    fn write(&mut self, stanza: &Stanza) -> Result<(), WebError> {
        serde_json::to_writer(&mut self.out, stanza)?;
        self.out.write_all(b"\n")?;
        self.stanzas += 1;
        trace!(stanzas = self.stanzas, "transcript stanza written");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WebError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Iterator over the stanzas of a transcript.
///
/// Stanzas may span several lines or share one. A trailing incomplete
/// stanza is ignored; anything other than a JSON object at a stanza
/// boundary, or malformed JSON inside one, is an error and ends the
/// iteration. Each stanza is parsed exactly once.
#[derive(Debug)]
pub struct StanzaReader<R: BufRead> {
    input: Option<R>,
    text: String,
    offset: usize,
    done: bool,
}

impl<R: BufRead> StanzaReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Some(input),
            text: String::new(),
            offset: 0,
            done: false,
        }
    }

    fn fail(&mut self, err: impl Into<WebError>) -> Option<Result<Value, WebError>> {
        self.done = true;
        Some(Err(err.into()))
    }
}

impl<R: BufRead> Iterator for StanzaReader<R> {
    type Item = Result<Value, WebError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(mut input) = self.input.take()
            && let Err(err) = input.read_to_string(&mut self.text)
        {
            return self.fail(err);
        }
        let rest = &self.text[self.offset..];
        let start = rest.trim_start();
        self.offset += rest.len() - start.len();
        if start.is_empty() {
            self.done = true;
            return None;
        }
        if !start.starts_with('{') {
            let err = serde_json::from_str::<serde_json::Map<String, Value>>(start).err()?;
            return self.fail(err);
        }
        let mut stream = serde_json::Deserializer::from_str(start).into_iter::<Value>();
        let parsed = stream.next();
        let consumed = stream.byte_offset();
        match parsed {
            Some(Ok(value)) => {
                self.offset += consumed;
                trace!(offset = self.offset, "stanza read");
                Some(Ok(value))
            }
            Some(Err(err)) if err.is_eof() => {
                self.done = true;
                None
            }
            Some(Err(err)) => self.fail(err),
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Plain-text rendering of the buffer-window output in `stanzas`.
///
/// Styles and hyperlinks are dropped; a window clear becomes a dashed rule
/// and each new (non-append) paragraph starts a new line.
pub fn render_text<'a>(stanzas: impl IntoIterator<Item = &'a Value>) -> String {
    let mut out = String::new();
    for stanza in stanzas {
        if let Some(metadata) = stanza.get("metadata") {
            render_metadata(metadata, &mut out);
        }
        let Some(content) = stanza
            .get("output")
            .and_then(|output| output.get("content"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for window in content {
            let Some(text) = window.get("text").and_then(Value::as_array) else {
                continue;
            };
            if window.get("clear").is_some_and(|clear| clear != &Value::Bool(false)) {
                out.push('\n');
                out.push_str(&"- ".repeat(36));
                out.push_str("-\n");
            }
            render_paragraphs(text, &mut out);
        }
    }
    out.push('\n');
    out
}

fn render_metadata(metadata: &Value, out: &mut String) {
    let rule = format!("{}-\n", "--".repeat(36));
    let mut any = false;
    for key in METADATA_KEYS {
        let Some(value) = metadata.get(key).and_then(Value::as_str) else {
            continue;
        };
        if !any {
            any = true;
            out.push_str(&rule);
        }
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    if any {
        out.push_str(&rule);
    }
}

fn render_paragraphs(text: &[Value], out: &mut String) {
    for paragraph in text {
        let content = paragraph
            .get("content")
            .and_then(Value::as_array)
            .filter(|runs| !runs.is_empty());
        if paragraph.get("append").is_none() {
            out.push('\n');
        }
        let Some(content) = content else {
            continue;
        };
        let mut runs = content.iter();
        while let Some(run) = runs.next() {
            match run {
                Value::String(_style) => {
                    if let Some(text) = runs.next().and_then(Value::as_str) {
                        out.push_str(text);
                    }
                }
                Value::Object(obj) => {
                    if obj.get("special").and_then(Value::as_str) == Some("image") {
                        let alt = obj.get("alttext").and_then(Value::as_str);
                        match alt {
                            Some(alt) => out.push_str(&format!("[image: {alt}]")),
                            None => out.push_str(&format!(
                                "[image {}]",
                                obj.get("image").unwrap_or(&Value::Null)
                            )),
                        }
                    } else if obj.get("special").is_none()
                        && let Some(text) = obj.get("text").and_then(Value::as_str)
                    {
                        out.push_str(text);
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn read_all(text: &str) -> Vec<Result<Value, WebError>> {
        StanzaReader::new(text.as_bytes()).collect()
    }

    #[test]
    fn recorder_writes_one_line_per_stanza() {
        let mut recorder = TranscriptRecorder::new(Vec::new(), "s-1").with_label("demo");
        recorder
            .record(1500, &json!({"type": "init", "gen": 0}), &json!({"type": "update"}))
            .expect("record");
        recorder
            .record(1600, &json!({"type": "line"}), &json!({"type": "update"}))
            .expect("record");
        assert_eq!(recorder.stanzas(), 2);

        let bytes = recorder.into_inner();
        let text = String::from_utf8(bytes).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Stanza = serde_json::from_str(lines[0]).expect("stanza");
        assert_eq!(first.format, FORMAT);
        assert_eq!(first.session_id, "s-1");
        assert_eq!(first.label.as_deref(), Some("demo"));
        assert_eq!(first.timestamp, 1500);
        assert!(lines[0].contains("\"sessionId\":\"s-1\""));
    }

    #[test]
    fn reader_joins_multi_line_stanzas_and_drops_partial_tail() {
        let text = "{\"a\": 1}\n\n{\"b\":\n  2}\n{\"c\": [1,";
        let stanzas: Vec<Value> = read_all(text)
            .into_iter()
            .map(|s| s.expect("stanza"))
            .collect();
        assert_eq!(stanzas, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn reader_rejects_non_json_between_stanzas() {
        let results = read_all("{\"a\": 1}\nhello\n{\"b\": 2}\n");
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(WebError::Json(_))));
    }

    #[test]
    fn reader_splits_stanzas_sharing_a_line() {
        let stanzas: Vec<Value> = read_all("{\"a\": 1}{\"b\": 2} {\"c\": 3}\n")
            .into_iter()
            .map(|s| s.expect("stanza"))
            .collect();
        assert_eq!(stanzas, vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]);
    }

    #[test]
    fn reader_reports_malformed_stanza_and_stops() {
        let results = read_all("{\"a\": 1}\n{\"b\": oops}\n{\"c\": 3}\n");
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(WebError::Json(_))));
    }

    #[test]
    fn reader_reads_long_transcript_in_order() {
        let mut recorder = TranscriptRecorder::new(Vec::new(), "long");
        for ts in 0..5000u64 {
            recorder
                .record(ts, &json!({"type": "line", "gen": ts}), &json!({"type": "update"}))
                .expect("record");
        }
        let bytes = recorder.into_inner();
        let stamps: Vec<u64> = StanzaReader::new(bytes.as_slice())
            .map(|s| s.expect("stanza")["timestamp"].as_u64().expect("timestamp"))
            .collect();
        assert_eq!(stamps, (0..5000).collect::<Vec<_>>());
    }

    #[test]
    fn reader_rejects_json_that_is_not_an_object() {
        let results = read_all("[1, 2]\n");
        assert!(matches!(results.as_slice(), [Err(WebError::Json(_))]));
    }

    #[test]
    fn render_text_follows_paragraph_structure() {
        let stanzas = vec![
            json!({"metadata": {"title": "Cloak", "author": "Anon", "extra": "x"}}),
            json!({"output": {"content": [
                {"id": 1, "text": [
                    {"append": true, "content": ["normal", "Hello", "emphasized", " there"]},
                    {"content": ["normal", "World"]},
                    {},
                ]},
                {"id": 2, "lines": [{"line": 0, "content": ["normal", "status"]}]},
            ]}}),
            json!({"output": {"content": [
                {"id": 1, "clear": true, "text": [
                    {"content": [{"style": "normal", "text": "Link", "hyperlink": 3}]},
                    {"append": true},
                ]},
            ]}}),
        ];
        let rule = format!("{}-\n", "--".repeat(36));
        let clear = format!("\n{}-\n", "- ".repeat(36));
        let expected = format!(
            "{rule}title: Cloak\nauthor: Anon\n{rule}Hello there\nWorld\n{clear}\nLink\n"
        );
        assert_eq!(render_text(&stanzas), expected);
    }

    #[test]
    fn render_text_shows_image_alt_text() {
        let stanzas = vec![json!({"output": {"content": [
            {"id": 1, "text": [{"content": [{"special": "image", "image": 4, "alttext": "a map"}]}]},
        ]}})];
        assert_eq!(render_text(&stanzas), "\n[image: a map]\n");
    }
}
