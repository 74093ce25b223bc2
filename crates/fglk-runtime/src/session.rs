#![forbid(unsafe_code)]

//! Host-driven VM session.
//!
//! [`Session`] pairs a [`Glk`] engine with a [`Vm`] and runs the exchange
//! loop one step at a time. The host owns the transport:
//!
//! 1. Deliver the renderer's `init` event via [`Session::accept`].
//! 2. Send the returned [`Update`] to the renderer.
//! 3. Feed every later event to [`Session::accept`] and forward its update.
//! 4. Advance time via [`Session::advance_time`] so VM timers can fire.
//!
//! ```ignore
//! let mut session = Session::new(MyVm::default());
//! let result = session.accept(&InputEvent::init(0, metrics));
//! if let Some(update) = result.update {
//!     send(&update);
//! }
//! ```
//!
//! A VM error is fatal: the session logs it, marks the engine exited and
//! answers with a final update that withdraws every input field.

use core::fmt;
use core::time::Duration;

use fglk_core::error::GlkError;
use tracing::{debug, debug_span, error};

use crate::glk::{Dispatch, Glk, Rejection};
use crate::observer::DispatchObserver;
use crate::protocol::{InputEvent, Update};
use crate::vm::Vm;

/// Host knobs for a [`Session`].
#[derive(Default)]
pub struct SessionConfig {
    observer: Option<Box<dyn DispatchObserver>>,
    start_time: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("observer", &self.observer.is_some())
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report engine lifecycle changes to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start the engine clock at `now` instead of zero.
    #[must_use]
    pub const fn with_start_time(mut self, now: Duration) -> Self {
        self.start_time = now;
        self
    }
}

/// Outcome of one [`Session::accept`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptResult {
    /// Whether the event passed the exit and generation checks.
    pub accepted: bool,
    pub rejection: Option<Rejection>,
    /// Update to forward to the renderer; `None` for rejected events.
    pub update: Option<Update>,
    /// The error that ended the session during this call.
    pub fatal: Option<GlkError>,
    /// Whether the VM ran (init or resume).
    pub vm_resumed: bool,
}

impl AcceptResult {
    fn rejected(rejection: Rejection) -> Self {
        Self {
            accepted: false,
            rejection: Some(rejection),
            update: None,
            fatal: None,
            vm_resumed: false,
        }
    }
}

/// A [`Vm`] bound to its engine.
pub struct Session<V: Vm> {
    glk: Glk,
    vm: V,
    last_error: Option<GlkError>,
}

impl<V: Vm + fmt::Debug> fmt::Debug for Session<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("glk", &self.glk)
            .field("vm", &self.vm)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl<V: Vm> Session<V> {
    #[must_use]
    pub fn new(vm: V) -> Self {
        Self::with_config(vm, SessionConfig::default())
    }

    #[must_use]
    pub fn with_config(vm: V, config: SessionConfig) -> Self {
        let mut glk = match config.observer {
            Some(observer) => Glk::with_observer(observer),
            None => Glk::new(),
        };
        glk.set_clock(config.start_time);
        Self {
            glk,
            vm,
            last_error: None,
        }
    }

    /// Process one renderer event.
    pub fn accept(&mut self, event: &InputEvent) -> AcceptResult {
        let _span = debug_span!("accept", generation = event.generation).entered();
        let outcome = match self.glk.dispatch(event) {
            Ok(Dispatch::Rejected(rejection)) => return AcceptResult::rejected(rejection),
            Ok(Dispatch::Idle) => Ok(false),
            Ok(Dispatch::Init) => self.vm.init(&mut self.glk).map(|()| true),
            Ok(Dispatch::Resume(resumed)) => {
                self.vm.resume(&mut self.glk, resumed).map(|()| true)
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(vm_resumed) => {
                if vm_resumed && !self.glk.is_select_pending() && !self.glk.is_exited() {
                    debug!("vm returned without select; treating as exit");
                    self.glk.exit();
                }
                AcceptResult {
                    accepted: true,
                    rejection: None,
                    update: Some(self.glk.compile()),
                    fatal: None,
                    vm_resumed,
                }
            }
            Err(err) => {
                error!(error = %err, "fatal vm error");
                self.last_error = Some(err.clone());
                AcceptResult {
                    accepted: true,
                    rejection: None,
                    update: Some(self.glk.fatal_update()),
                    fatal: Some(err),
                    vm_resumed: false,
                }
            }
        }
    }

    /// Advance the engine clock; if the VM timer is due, deliver a timer
    /// event through the normal generation-checked path.
    pub fn advance_time(&mut self, dt: Duration) -> Option<AcceptResult> {
        self.glk.advance_clock(dt);
        if self.glk.is_exited() || !self.glk.timer_due() {
            return None;
        }
        let tick = InputEvent::timer(self.glk.generation());
        Some(self.accept(&tick))
    }

    #[must_use]
    pub const fn glk(&self) -> &Glk {
        &self.glk
    }

    pub fn glk_mut(&mut self) -> &mut Glk {
        &mut self.glk
    }

    #[must_use]
    pub const fn vm(&self) -> &V {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut V {
        &mut self.vm
    }

    /// Generation the next event must carry.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.glk.generation()
    }

    #[must_use]
    pub const fn is_exited(&self) -> bool {
        self.glk.is_exited()
    }

    /// The error that ended the session, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&GlkError> {
        self.last_error.as_ref()
    }
}
