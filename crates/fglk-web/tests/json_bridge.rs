//! JSON exchanges through [`WebSession`], recorded and rendered back.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use core::time::Duration;

use fglk_core::codes::WindowType;
use fglk_runtime::{Glk, GlkError, GlkEvent, Session, Vm, WindowId};
use fglk_web::transcript::{StanzaReader, TranscriptRecorder, render_text};
use fglk_web::{WebError, WebSession};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Shared sink so the test can read what the recorder wrote.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Greets, then echoes each line; `tick` starts a 100 ms timer.
#[derive(Debug, Default)]
struct EchoVm {
    win: Option<WindowId>,
    ticks: u32,
}

impl EchoVm {
    fn prompt(&self, glk: &mut Glk) -> Result<(), GlkError> {
        if let Some(win) = self.win {
            glk.put_str("\n>")?;
            glk.request_line_event_uni(win, vec![0; 40], 0)?;
        }
        glk.select();
        Ok(())
    }
}

impl Vm for EchoVm {
    fn init(&mut self, glk: &mut Glk) -> Result<(), GlkError> {
        self.win = glk.window_open(None, 0, 0, WindowType::TextBuffer.code(), 0)?;
        glk.set_window(self.win)?;
        glk.put_str("Echo chamber.")?;
        self.prompt(glk)
    }

    fn resume(&mut self, glk: &mut Glk, event: GlkEvent) -> Result<(), GlkError> {
        match event {
            GlkEvent::LineInput { .. } => {
                let text: String = event
                    .line_chars()
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(char::from_u32)
                    .collect();
                if text == "tick" {
                    glk.request_timer_events(100);
                }
                if text == "crash"
                    && let Some(win) = self.win
                {
                    glk.request_char_event(win)?;
                    glk.request_char_event(win)?;
                }
                glk.put_str(&format!("You said: {text}"))?;
                self.prompt(glk)
            }
            GlkEvent::Timer => {
                self.ticks += 1;
                glk.request_timer_events(0);
                glk.select();
                Ok(())
            }
            _ => {
                glk.select();
                Ok(())
            }
        }
    }
}

fn session() -> (WebSession<EchoVm>, SharedBuf) {
    let sink = SharedBuf::default();
    let recorder = TranscriptRecorder::new(Box::new(sink.clone()) as Box<dyn Write>, "t-1");
    let web = WebSession::new(Session::new(EchoVm::default())).with_recorder(recorder);
    (web, sink)
}

fn parse(records: &[String]) -> Vec<Value> {
    records
        .iter()
        .map(|r| serde_json::from_str(r).expect("outbound json"))
        .collect()
}

#[test]
fn init_and_line_produce_updates() {
    let (mut web, _) = session();
    let out = parse(
        &web.accept_json(r#"{"type":"init","gen":0,"metrics":{"width":80,"height":24}}"#)
            .expect("init"),
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["type"], "update");
    assert_eq!(out[0]["generation"], 1);
    assert_eq!(out[0]["windows"][0]["width"], 80);
    assert_eq!(
        out[0]["input"],
        json!([{"id": 1, "type": "line", "generation": 1, "maxlen": 40}])
    );

    let out = parse(
        &web.accept_json(r#"{"type":"line","gen":1,"window":1,"value":"hello"}"#)
            .expect("line"),
    );
    assert_eq!(out[0]["generation"], 2);
    assert_eq!(
        out[0]["content"][0]["text"],
        json!([
            {"append": true, "content": ["input", "hello"]},
            {"content": ["normal", "You said: hello"]},
            {"content": ["normal", ">"]},
        ])
    );
}

#[test]
fn stale_event_yields_nothing() {
    let (mut web, sink) = session();
    web.accept_json(r#"{"type":"init","gen":0,"metrics":{"width":80,"height":24}}"#)
        .expect("init");
    let out = web
        .accept_json(r#"{"type":"line","gen":0,"window":1,"value":"hello"}"#)
        .expect("stale");
    assert!(out.is_empty());
    let stanzas = StanzaReader::new(sink.0.borrow().as_slice()).count();
    assert_eq!(stanzas, 1);
}

#[test]
fn malformed_json_is_an_error() {
    let (mut web, _) = session();
    assert!(matches!(web.accept_json("{not json"), Err(WebError::Json(_))));
    assert!(matches!(
        web.accept_json(r#"{"type":"line"}"#),
        Err(WebError::Json(_))
    ));
    assert_eq!(web.session().generation(), 0);
}

#[test]
fn timer_fires_through_advance_time() {
    let (mut web, _) = session();
    web.accept_json(r#"{"type":"init","gen":0,"metrics":{"width":80,"height":24}}"#)
        .expect("init");
    let out = parse(
        &web.accept_json(r#"{"type":"line","gen":1,"window":1,"value":"tick"}"#)
            .expect("line"),
    );
    assert_eq!(out[0]["timer"], 100);

    assert!(web.advance_time(Duration::from_millis(60)).expect("early").is_empty());
    let out = parse(&web.advance_time(Duration::from_millis(40)).expect("due"));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["generation"], 3);
    assert_eq!(out[0]["timer"], Value::Null);
    assert_eq!(web.session().vm().ticks, 1);
}

#[test]
fn fatal_error_sends_error_record_then_final_update() {
    let (mut web, _) = session();
    web.accept_json(r#"{"type":"init","gen":0,"metrics":{"width":80,"height":24}}"#)
        .expect("init");
    let out = parse(
        &web.accept_json(r#"{"type":"line","gen":1,"window":1,"value":"crash"}"#)
            .expect("line"),
    );
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["type"], "error");
    assert_eq!(out[1], json!({"type": "update", "generation": 2, "input": []}));
    assert!(web.session().is_exited());
}

#[test]
fn recorded_transcript_renders_as_text() {
    let (mut web, sink) = session();
    web.accept_json(r#"{"type":"init","gen":0,"metrics":{"width":80,"height":24}}"#)
        .expect("init");
    web.accept_json(r#"{"type":"line","gen":1,"window":1,"value":"look"}"#)
        .expect("line");

    let bytes = sink.0.borrow().clone();
    let stanzas: Vec<Value> = StanzaReader::new(bytes.as_slice())
        .collect::<Result<_, _>>()
        .expect("stanzas");
    assert_eq!(stanzas.len(), 2);
    assert_eq!(stanzas[0]["format"], "glktra");
    assert_eq!(stanzas[0]["sessionId"], "t-1");
    assert_eq!(stanzas[1]["input"]["value"], "look");
    assert_eq!(
        render_text(&stanzas),
        "Echo chamber.\n>look\nYou said: look\n>\n"
    );
}
