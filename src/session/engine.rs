//! Session owner: the axis, the shared state and the two loops.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::axis::{AxisController, Clock, HomeSwitch};
use crate::config::{validate_config, MachineConfig};
use crate::error::{AxisError, Result};

use super::event::EngineEvent;
use super::handle::EngineHandle;
use super::parameters::ParameterState;
use super::pattern_loop::{refresh, PATTERN_TICK_MS};
use super::shared::Shared;
use super::state::SessionState;
use super::step_loop::StepLoop;

/// How long the pattern thread parks while no pattern runs.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// A stroke session bound to one axis.
///
/// Drive it either by calling [`poll`](Self::poll) from your own loop or by
/// handing it to [`spawn`](Self::spawn), which runs the step loop and the
/// pattern loop on dedicated threads. Either way callers talk to it through
/// [`EngineHandle`]s.
///
/// ```rust,ignore
/// let config = stroke_motion::load_config("machine.toml")?;
/// let axis = AxisControllerBuilder::new()
///     .from_config(&config)
///     .step_pin(step)
///     .dir_pin(dir)
///     .clock(MonotonicClock::new())
///     .build()?;
///
/// let runtime = StrokeEngine::new(axis, Endstop::new(switch, true), &config)?.spawn()?;
/// let handle = runtime.handle();
/// handle.enable_and_home(&config.endstop.unwrap_or_default(), 0.0);
/// ```
pub struct StrokeEngine<STEP, DIR, EN, BRK, CLK, SW>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
    SW: HomeSwitch,
{
    step_loop: StepLoop<STEP, DIR, EN, BRK, CLK, SW>,
    shared: Arc<Shared>,
    events: Receiver<EngineEvent>,
    last_refresh_ms: Option<u64>,
}

impl<STEP, DIR, EN, BRK, CLK, SW> StrokeEngine<STEP, DIR, EN, BRK, CLK, SW>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
    SW: HomeSwitch,
{
    /// Create a session in [`SessionState::Undefined`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or names an unknown
    /// startup pattern.
    pub fn new(
        axis: AxisController<STEP, DIR, EN, BRK, CLK>,
        switch: SW,
        config: &MachineConfig,
    ) -> Result<Self> {
        validate_config(config)?;
        let params = ParameterState::new(config.limits(), &config.startup)?;
        info!(
            "stroke engine: {} mm usable travel, pattern {}",
            config.limits().travel_mm(),
            config.startup.pattern.as_str()
        );

        let (tx, events) = mpsc::channel();
        Ok(Self {
            step_loop: StepLoop::new(axis, switch),
            shared: Arc::new(Shared::new(params, tx)),
            events,
            last_refresh_ms: None,
        })
    }

    /// A handle for issuing requests.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.shared.clone())
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The axis being driven.
    pub fn axis(&self) -> &AxisController<STEP, DIR, EN, BRK, CLK> {
        self.step_loop.axis()
    }

    /// A homing procedure is in progress.
    pub fn is_homing(&self) -> bool {
        self.step_loop.is_homing()
    }

    /// Drain the events raised so far.
    pub fn take_events(&self) -> Vec<EngineEvent> {
        self.events.try_iter().collect()
    }

    /// Run one step-loop iteration, and a pattern tick once every
    /// [`PATTERN_TICK_MS`] of axis time.
    ///
    /// # Errors
    ///
    /// Returns an error if an output pin or the home switch fails.
    pub fn poll(&mut self) -> core::result::Result<(), AxisError> {
        self.step_loop.iterate(&self.shared)?;

        let now = self.shared.status.now_ms();
        let due = self
            .last_refresh_ms
            .map_or(true, |last| now.saturating_sub(last) >= PATTERN_TICK_MS);
        if due {
            self.last_refresh_ms = Some(now);
            refresh(&self.shared, now);
        }
        Ok(())
    }

    /// Move the session onto two threads: a step thread that spins on the
    /// axis and a pattern thread that ticks every [`PATTERN_TICK_MS`].
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be created.
    pub fn spawn(self) -> io::Result<EngineRuntime>
    where
        STEP: Send + 'static,
        DIR: Send + 'static,
        EN: Send + 'static,
        BRK: Send + 'static,
        CLK: Send + 'static,
        SW: Send + 'static,
    {
        let Self {
            mut step_loop,
            shared,
            events,
            ..
        } = self;

        let step_shared = shared.clone();
        let step = thread::Builder::new()
            .name("stroke-step".into())
            .spawn(move || run_step_loop(&mut step_loop, &step_shared))?;

        let pattern_shared = shared.clone();
        let pattern = thread::Builder::new()
            .name("stroke-pattern".into())
            .spawn(move || run_pattern_loop(&pattern_shared));
        let pattern = match pattern {
            Ok(pattern) => pattern,
            Err(e) => {
                shared.request_shutdown();
                let _ = step.join();
                return Err(e);
            }
        };

        Ok(EngineRuntime {
            handle: EngineHandle::new(shared),
            events,
            step: Some(step),
            pattern: Some(pattern),
        })
    }
}

fn run_step_loop<STEP, DIR, EN, BRK, CLK, SW>(
    step_loop: &mut StepLoop<STEP, DIR, EN, BRK, CLK, SW>,
    shared: &Shared,
) -> core::result::Result<(), AxisError>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
    SW: HomeSwitch,
{
    debug!("step loop running");
    while !shared.is_shutdown() {
        if let Err(e) = step_loop.iterate(shared) {
            error!("step loop stopped: {}", e);
            shared.set_homed(false);
            shared.set_state(SessionState::Undefined);
            shared.request_shutdown();
            let _ = step_loop.power_down();
            return Err(e);
        }
        thread::yield_now();
    }
    debug!("step loop shutting down");
    step_loop.power_down()
}

fn run_pattern_loop(shared: &Shared) {
    debug!("pattern loop running");
    while !shared.is_shutdown() {
        shared.wait_for_pattern(IDLE_WAIT);
        if shared.is_shutdown() {
            break;
        }
        refresh(shared, shared.status.now_ms());
        thread::sleep(Duration::from_millis(PATTERN_TICK_MS));
    }
    debug!("pattern loop shutting down");
}

/// A session running on its own threads.
///
/// Dropping the runtime stops both threads and disables the axis.
pub struct EngineRuntime {
    handle: EngineHandle,
    events: Receiver<EngineEvent>,
    step: Option<JoinHandle<core::result::Result<(), AxisError>>>,
    pattern: Option<JoinHandle<()>>,
}

impl EngineRuntime {
    /// A handle for issuing requests.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Events raised by the session.
    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.events
    }

    /// The step thread has stopped, on request or after a hardware error.
    pub fn is_finished(&self) -> bool {
        self.step.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop both threads, disable the axis and report how the step loop
    /// ended.
    ///
    /// # Errors
    ///
    /// Returns the hardware error that stopped the step loop, if any.
    pub fn shutdown(mut self) -> core::result::Result<(), AxisError> {
        self.stop_threads()
    }

    fn stop_threads(&mut self) -> core::result::Result<(), AxisError> {
        self.handle.shutdown();
        if let Some(pattern) = self.pattern.take() {
            if pattern.join().is_err() {
                error!("pattern thread panicked");
            }
        }
        match self.step.take().map(JoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => {
                error!("step thread panicked");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        let _ = self.stop_threads();
    }
}
