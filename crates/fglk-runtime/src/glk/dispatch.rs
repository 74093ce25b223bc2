#![forbid(unsafe_code)]

//! The inbound router.
//!
//! Every renderer event is checked against the exit flag and the current
//! generation before it touches any state. An accepted event advances the
//! generation, replaces the partial-input snapshot and is then routed by
//! kind. Keyboard and hyperlink events only count while the VM is blocked
//! in `select` and the target window still holds a matching request;
//! otherwise they are absorbed.

use fglk_core::error::GlkError;
use fglk_layout::WindowId;
use tracing::{debug, trace, warn};

use super::Glk;
use crate::input::decode_key;
use crate::protocol::{EventKind, InputEvent};
use crate::vm::GlkEvent;

/// Why an event was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The VM has exited.
    Exited,
    /// The event answers an older (or future) update.
    StaleGeneration { got: u64, expected: u64 },
}

/// What the caller must do with the VM after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Rejected(Rejection),
    /// Accepted; the VM stays where it is.
    Idle,
    /// First `init`: start the VM.
    Init,
    /// The pending `select` is satisfied by this event.
    Resume(GlkEvent),
}

impl Dispatch {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

impl Glk {
    /// Route one renderer event.
    ///
    /// Errors are VM-contract violations raised while completing the
    /// event (for example a line echo running into an echo loop); the
    /// session treats them as fatal.
    pub fn dispatch(&mut self, event: &InputEvent) -> Result<Dispatch, GlkError> {
        if self.exited {
            warn!(kind = ?event.kind, "event after exit ignored");
            return Ok(Dispatch::Rejected(Rejection::Exited));
        }
        let expected = self.generation();
        if event.generation != expected {
            warn!(
                got = event.generation,
                expected, "stale event generation ignored"
            );
            return Ok(Dispatch::Rejected(Rejection::StaleGeneration {
                got: event.generation,
                expected,
            }));
        }
        let generation = self.input.advance();
        self.partial_inputs = event.partial.clone().unwrap_or_default();
        trace!(generation, kind = ?event.kind, "dispatch");

        match event.kind {
            EventKind::Init => Ok(self.on_init(event)),
            EventKind::Arrange => self.on_arrange(event),
            EventKind::External => Ok(self.on_external(event)),
            EventKind::Hyperlink => Ok(self.on_hyperlink(event)),
            EventKind::Char => Ok(self.on_char(event)),
            EventKind::Line => self.on_line(event),
            EventKind::Other => Ok(Dispatch::Idle),
        }
    }

    fn wake(&mut self, event: GlkEvent) -> Dispatch {
        self.select_pending = false;
        self.observer.prepare_resume(&event);
        debug!(event = ?event.event_type(), "resuming vm");
        Dispatch::Resume(event)
    }

    /// Target window of a keyboard or link event, if the VM is waiting.
    fn waiting_window(&self, event: &InputEvent) -> Option<WindowId> {
        if !self.select_pending {
            return None;
        }
        event.window.filter(|win| self.tree.contains(*win))
    }

    fn on_init(&mut self, event: &InputEvent) -> Dispatch {
        if let Some(metrics) = event.metrics {
            self.metrics = metrics;
        }
        if self.initialized {
            debug!("duplicate init ignored");
            return Dispatch::Idle;
        }
        self.initialized = true;
        Dispatch::Init
    }

    fn on_arrange(&mut self, event: &InputEvent) -> Result<Dispatch, GlkError> {
        if let Some(metrics) = event.metrics {
            self.metrics = metrics;
        }
        if let Some(root) = self.tree.root() {
            let placements =
                self.tree
                    .rearrange(root, self.metrics.content_box(), &self.metrics)?;
            self.apply_placements(&placements);
        }
        if self.select_pending {
            return Ok(self.wake(GlkEvent::Arrange));
        }
        Ok(Dispatch::Idle)
    }

    fn on_external(&mut self, event: &InputEvent) -> Dispatch {
        if event.value_str() != Some("timer") || self.timer.interval_ms().is_none() {
            return Dispatch::Idle;
        }
        self.timer.fire(self.clock.now());
        if self.select_pending {
            return self.wake(GlkEvent::Timer);
        }
        Dispatch::Idle
    }

    fn on_hyperlink(&mut self, event: &InputEvent) -> Dispatch {
        let Some(win) = self.waiting_window(event) else {
            return Dispatch::Idle;
        };
        if !self.input.has_hyperlink(win) {
            return Dispatch::Idle;
        }
        self.input.set_hyperlink(win, false);
        let link = event.value_u32().unwrap_or(0);
        self.wake(GlkEvent::Hyperlink { window: win, link })
    }

    fn on_char(&mut self, event: &InputEvent) -> Dispatch {
        let Some(win) = self.waiting_window(event) else {
            return Dispatch::Idle;
        };
        let Some(unicode) = self.input.take_char(win) else {
            return Dispatch::Idle;
        };
        let key = decode_key(event.value_str().unwrap_or_default(), unicode);
        self.wake(GlkEvent::CharInput { window: win, key })
    }

    fn on_line(&mut self, event: &InputEvent) -> Result<Dispatch, GlkError> {
        let Some(win) = self.waiting_window(event) else {
            return Ok(Dispatch::Idle);
        };
        if !self.input.has_line(win) {
            return Ok(Dispatch::Idle);
        }
        let line = self.complete_line(win, event.value_str().unwrap_or_default())?;
        Ok(self.wake(line))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::open_buffer;
    use super::*;
    use crate::buffer::CharBuffer;
    use crate::observer::testing::{ObserverEvent, RecordingObserver};
    use core::time::Duration;
    use fglk_core::codes::keycode;
    use fglk_core::metrics::ContentMetrics;
    use pretty_assertions::assert_eq;

    fn started() -> Glk {
        let mut glk = Glk::new();
        let first = glk
            .dispatch(&InputEvent::init(0, ContentMetrics::with_size(40.0, 10.0)))
            .expect("init");
        assert_eq!(first, Dispatch::Init);
        glk
    }

    #[test]
    fn stale_and_future_generations_are_rejected() {
        let mut glk = started();
        assert_eq!(
            glk.dispatch(&InputEvent::arrange(0, ContentMetrics::default())),
            Ok(Dispatch::Rejected(Rejection::StaleGeneration {
                got: 0,
                expected: 1
            }))
        );
        assert!(!glk.dispatch(&InputEvent::timer(5)).expect("no error").is_accepted());
        assert_eq!(glk.generation(), 1);
        assert_eq!(glk.metrics().width, 40.0);
    }

    #[test]
    fn events_after_exit_are_rejected() {
        let mut glk = started();
        glk.exit();
        assert_eq!(
            glk.dispatch(&InputEvent::timer(1)),
            Ok(Dispatch::Rejected(Rejection::Exited))
        );
        assert_eq!(glk.generation(), 1);
    }

    #[test]
    fn duplicate_init_advances_but_does_not_restart() {
        let mut glk = started();
        let again = glk
            .dispatch(&InputEvent::init(1, ContentMetrics::with_size(50.0, 10.0)))
            .expect("init");
        assert_eq!(again, Dispatch::Idle);
        assert_eq!(glk.generation(), 2);
        assert_eq!(glk.metrics().width, 50.0);
    }

    #[test]
    fn char_input_needs_select_and_request() {
        let mut glk = started();
        let win = open_buffer(&mut glk);
        glk.request_char_event_uni(win).expect("request");

        let early = glk.dispatch(&InputEvent::char(1, win, "a")).expect("char");
        assert_eq!(early, Dispatch::Idle);
        assert!(glk.input().char_request(win).is_some());

        glk.select();
        let event = glk.dispatch(&InputEvent::char(2, win, "left")).expect("char");
        assert_eq!(
            event,
            Dispatch::Resume(GlkEvent::CharInput {
                window: win,
                key: keycode::LEFT
            })
        );
        assert!(!glk.is_select_pending());
        assert!(glk.input().char_request(win).is_none());
    }

    #[test]
    fn line_input_echoes_and_fills_buffer() {
        let log = RecordingObserver::new();
        let mut glk = Glk::with_observer(Box::new(log.clone()));
        glk.dispatch(&InputEvent::init(0, ContentMetrics::with_size(40.0, 10.0)))
            .expect("init");
        let win = open_buffer(&mut glk);
        glk.request_line_event(win, vec![0; 10], 0).expect("request");
        glk.select();

        let event = InputEvent::line(1, win, "look").with_partial(win, "loo");
        let line = GlkEvent::LineInput {
            window: win,
            len: 4,
            buffer: CharBuffer::Bytes(b"look\0\0\0\0\0\0".to_vec()),
        };
        assert_eq!(glk.dispatch(&event), Ok(Dispatch::Resume(line.clone())));
        assert_eq!(glk.partial_inputs.get(&win).map(String::as_str), Some("loo"));
        assert_eq!(log.events().last(), Some(&ObserverEvent::PrepareResume(line)));
        assert!(!glk.input().has_line(win));
    }

    #[test]
    fn hyperlink_event_consumes_request() {
        let mut glk = started();
        let win = open_buffer(&mut glk);
        glk.request_hyperlink_event(win).expect("request");
        glk.select();
        assert_eq!(
            glk.dispatch(&InputEvent::hyperlink(1, win, 12)),
            Ok(Dispatch::Resume(GlkEvent::Hyperlink {
                window: win,
                link: 12
            }))
        );
        glk.select();
        assert_eq!(
            glk.dispatch(&InputEvent::hyperlink(2, win, 12)),
            Ok(Dispatch::Idle)
        );
    }

    #[test]
    fn arrange_relayouts_and_resumes_only_when_waiting() {
        let mut glk = started();
        let win = open_buffer(&mut glk);
        glk.compile();

        let wide = ContentMetrics::with_size(60.0, 10.0);
        assert_eq!(glk.dispatch(&InputEvent::arrange(1, wide)), Ok(Dispatch::Idle));
        assert_eq!(glk.tree().get(win).map(|n| n.bbox.width()), Some(60.0));
        assert!(glk.compile().windows.is_some());

        glk.select();
        assert_eq!(
            glk.dispatch(&InputEvent::arrange(2, wide)),
            Ok(Dispatch::Resume(GlkEvent::Arrange))
        );
    }

    #[test]
    fn timer_events_fire_only_with_an_interval() {
        let mut glk = started();
        glk.select();
        assert_eq!(glk.dispatch(&InputEvent::timer(1)), Ok(Dispatch::Idle));
        assert!(glk.is_select_pending());

        glk.request_timer_events(50);
        glk.advance_clock(Duration::from_millis(50));
        assert!(glk.timer_due());
        assert_eq!(
            glk.dispatch(&InputEvent::timer(2)),
            Ok(Dispatch::Resume(GlkEvent::Timer))
        );
        assert!(!glk.timer_due());
    }
}
