#![forbid(unsafe_code)]

//! `fglk-web` connects a [`Session`] to a renderer that speaks JSON.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedder hands in one event string at a time
//!   and forwards the strings it gets back.
//! - **Deterministic time**: the host advances the session clock explicitly.
//! - **Replayable**: every accepted exchange can be appended to a glktra
//!   transcript (see [`transcript`]).

pub mod transcript;

use core::fmt;
use core::time::Duration;
use std::io::Write;

use fglk_runtime::{AcceptResult, InputEvent, Session, Vm};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::transcript::TranscriptRecorder;

/// Transport error.
#[derive(Debug)]
pub enum WebError {
    /// Malformed inbound JSON, or an outbound record that failed to encode.
    Json(serde_json::Error),
    /// Transcript output failed.
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Io(err) => write!(f, "io: {err}"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for WebError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for WebError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Outbound record announcing a fatal VM error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "error")]
pub struct ErrorRecord {
    pub message: String,
}

/// A session behind a JSON string interface.
pub struct WebSession<V: Vm> {
    session: Session<V>,
    recorder: Option<TranscriptRecorder<Box<dyn Write>>>,
}

impl<V: Vm> fmt::Debug for WebSession<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSession")
            .field("generation", &self.session.generation())
            .field("exited", &self.session.is_exited())
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}

impl<V: Vm> WebSession<V> {
    #[must_use]
    pub fn new(session: Session<V>) -> Self {
        Self {
            session,
            recorder: None,
        }
    }

    /// Append every accepted exchange to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: TranscriptRecorder<Box<dyn Write>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &Session<V> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<V> {
        &mut self.session
    }

    /// Handle one inbound event string.
    ///
    /// Returns the outbound records to send, in order: an error record if
    /// the VM failed, then the update. A rejected event yields nothing.
    pub fn accept_json(&mut self, line: &str) -> Result<Vec<String>, WebError> {
        let raw: Value = serde_json::from_str(line)?;
        let event: InputEvent = serde_json::from_value(raw.clone())?;
        let result = self.session.accept(&event);
        self.finish(&raw, result)
    }

    /// Advance the session clock, delivering a timer event if one is due.
    pub fn advance_time(&mut self, dt: Duration) -> Result<Vec<String>, WebError> {
        let generation = self.session.generation();
        let Some(result) = self.session.advance_time(dt) else {
            return Ok(Vec::new());
        };
        let raw = serde_json::to_value(InputEvent::timer(generation))?;
        self.finish(&raw, result)
    }

    fn finish(&mut self, input: &Value, result: AcceptResult) -> Result<Vec<String>, WebError> {
        let mut out = Vec::new();
        if let Some(rejection) = result.rejection {
            warn!(?rejection, "event rejected");
        }
        if let Some(err) = &result.fatal {
            out.push(serde_json::to_string(&ErrorRecord {
                message: err.to_string(),
            })?);
        }
        let Some(update) = result.update else {
            return Ok(out);
        };
        let output = serde_json::to_value(&update)?;
        if let Some(recorder) = &mut self.recorder {
            let timestamp = self.session.glk().clock().millis();
            recorder.record(timestamp, input, &output)?;
            recorder.flush()?;
        }
        out.push(serde_json::to_string(&output)?);
        Ok(out)
    }
}
