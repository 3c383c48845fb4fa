//! State shared between the step loop, the pattern loop and callers.
//!
//! Callers and the pattern loop never touch the axis. They queue
//! [`AxisCommand`]s in a FIFO mailbox that the step loop drains, and read
//! back what the step loop publishes in [`AxisStatus`]. Each command carries
//! the stop epoch it was issued under; stopping bumps the epoch so that
//! commands computed before the stop are dropped unapplied. Emergency stops
//! bypass the mailbox entirely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};

use embedded_hal::digital::OutputPin;

use crate::axis::{AxisController, Clock};
use crate::config::MotionLimits;
use crate::motion::Direction;

use super::event::EngineEvent;
use super::parameters::ParameterState;
use super::state::SessionState;

const ESTOP_NONE: u8 = 0;
const ESTOP_TRANSIENT: u8 = 1;
const ESTOP_HOLD: u8 = 2;

/// An `f32` stored as its bit pattern.
#[derive(Debug, Default)]
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub(crate) fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub(crate) fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }
}

/// Work for the step loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AxisCommand {
    /// Move to `target` with the given rates (steps, steps/s, steps/s²).
    Move {
        target: i64,
        speed: f32,
        acceleration: f32,
        deceleration: f32,
    },
    /// Brake to rest at `deceleration`.
    Stop { deceleration: f32 },
    /// Mark the axis homed and redefine the current position.
    DeclareHome { position: i64 },
    /// Run the homing procedure, then park.
    Home {
        direction: Direction,
        speed: f32,
        max_distance: i64,
        switch_position: i64,
        park: i64,
        park_acceleration: f32,
    },
    Enable,
    Disable,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Queued {
    pub(crate) command: AxisCommand,
    pub(crate) epoch: u32,
    pub(crate) seq: u64,
}

/// What the step loop last saw of the axis.
#[derive(Debug)]
pub(crate) struct AxisStatus {
    position: AtomicI64,
    target: AtomicI64,
    period_us: AtomicF32,
    acceleration: AtomicF32,
    deceleration: AtomicF32,
    motion_complete: AtomicBool,
    applied_seq: AtomicU64,
    now_ms: AtomicU64,
}

impl AxisStatus {
    fn new() -> Self {
        Self {
            position: AtomicI64::new(0),
            target: AtomicI64::new(0),
            period_us: AtomicF32::new(0.0),
            acceleration: AtomicF32::new(0.0),
            deceleration: AtomicF32::new(0.0),
            motion_complete: AtomicBool::new(true),
            applied_seq: AtomicU64::new(0),
            now_ms: AtomicU64::new(0),
        }
    }

    /// Publish the axis. `motion_complete` lands before `applied_seq`, so a
    /// reader that sees a command as applied also sees its effect on motion.
    pub(crate) fn publish<STEP, DIR, EN, BRK, CLK>(
        &self,
        axis: &AxisController<STEP, DIR, EN, BRK, CLK>,
        applied_seq: u64,
    ) where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        BRK: OutputPin,
        CLK: Clock,
    {
        let state = axis.state();
        self.position.store(state.position, Ordering::SeqCst);
        self.target.store(state.target, Ordering::SeqCst);
        self.period_us.store(state.current_period_us);
        self.acceleration.store(axis.timing().acceleration());
        self.deceleration.store(axis.timing().deceleration());
        self.motion_complete.store(axis.motion_complete(), Ordering::SeqCst);
        self.applied_seq.store(applied_seq, Ordering::SeqCst);
    }

    pub(crate) fn set_now_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn position(&self) -> i64 {
        self.position.load(Ordering::SeqCst)
    }

    pub(crate) fn target(&self) -> i64 {
        self.target.load(Ordering::SeqCst)
    }

    /// Speed in steps/s, unsigned; 0 at rest.
    pub(crate) fn speed(&self) -> f32 {
        let period = self.period_us.load();
        if period > 0.0 {
            1_000_000.0 / period
        } else {
            0.0
        }
    }

    pub(crate) fn acceleration(&self) -> f32 {
        self.acceleration.load()
    }

    pub(crate) fn deceleration(&self) -> f32 {
        self.deceleration.load()
    }

    pub(crate) fn motion_complete(&self) -> bool {
        self.motion_complete.load(Ordering::SeqCst)
    }

    pub(crate) fn applied_seq(&self) -> u64 {
        self.applied_seq.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn mark_applied_for_test(&self, seq: u64, motion_complete: bool) {
        self.motion_complete.store(motion_complete, Ordering::SeqCst);
        self.applied_seq.store(seq, Ordering::SeqCst);
    }
}

pub(crate) struct Shared {
    params: Mutex<ParameterState>,
    /// Configured limits. Conversions and stop rates that must not wait for
    /// the parameter lock read these.
    machine: MotionLimits,
    wake: Condvar,
    state: AtomicU8,
    homed: AtomicBool,
    mailbox: Mutex<VecDeque<Queued>>,
    last_seq: AtomicU64,
    epoch: AtomicU32,
    estop: AtomicU8,
    estop_release: AtomicBool,
    estop_held: AtomicBool,
    shutdown: AtomicBool,
    pub(crate) status: AxisStatus,
    events: Sender<EngineEvent>,
}

impl Shared {
    pub(crate) fn new(params: ParameterState, events: Sender<EngineEvent>) -> Self {
        let machine = *params.limits();
        Self {
            params: Mutex::new(params),
            machine,
            wake: Condvar::new(),
            state: AtomicU8::new(SessionState::Undefined as u8),
            homed: AtomicBool::new(false),
            mailbox: Mutex::new(VecDeque::new()),
            last_seq: AtomicU64::new(0),
            epoch: AtomicU32::new(0),
            estop: AtomicU8::new(ESTOP_NONE),
            estop_release: AtomicBool::new(false),
            estop_held: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            status: AxisStatus::new(),
            events,
        }
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Blocking lock for callers. A poisoned lock is recovered: the
    /// parameters are plain values and stay consistent.
    pub(crate) fn lock_params(&self) -> MutexGuard<'_, ParameterState> {
        self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking lock for the pattern loop.
    pub(crate) fn try_lock_params(&self) -> Option<MutexGuard<'_, ParameterState>> {
        match self.params.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub(crate) fn machine(&self) -> &MotionLimits {
        &self.machine
    }

    /// Park the pattern thread until the session runs a pattern, shutdown is
    /// requested, or `timeout` passes.
    pub(crate) fn wait_for_pattern(&self, timeout: std::time::Duration) {
        let guard = self.lock_params();
        let _ = self.wake.wait_timeout_while(guard, timeout, |_| {
            self.state() != SessionState::Pattern && !self.is_shutdown()
        });
    }

    pub(crate) fn wake_pattern_loop(&self) {
        self.wake.notify_all();
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let previous = SessionState::from_u8(self.state.swap(next as u8, Ordering::SeqCst));
        if previous != next {
            info!("session {} -> {}", previous, next);
        }
        self.wake_pattern_loop();
    }

    /// Move to `next` if the current state passes `allowed`. Returns the
    /// state left, or `None` if the transition was refused.
    pub(crate) fn transition(
        &self,
        allowed: impl Fn(SessionState) -> bool,
        next: SessionState,
    ) -> Option<SessionState> {
        let previous = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                allowed(SessionState::from_u8(raw)).then_some(next as u8)
            })
            .ok()
            .map(SessionState::from_u8)?;
        if previous != next {
            info!("session {} -> {}", previous, next);
        }
        self.wake_pattern_loop();
        Some(previous)
    }

    pub(crate) fn is_homed(&self) -> bool {
        self.homed.load(Ordering::SeqCst)
    }

    pub(crate) fn set_homed(&self, homed: bool) {
        self.homed.store(homed, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Mailbox
    // ------------------------------------------------------------------

    pub(crate) fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate every command issued so far and not yet applied.
    pub(crate) fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn last_seq(&self) -> u64 {
        self.last_seq.load(Ordering::SeqCst)
    }

    /// Queue a command issued under `epoch`. Returns its sequence number.
    pub(crate) fn push(&self, command: AxisCommand, epoch: u32) -> u64 {
        let mut mailbox = self.mailbox.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = self.last_seq.fetch_add(1, Ordering::SeqCst) + 1;
        mailbox.push_back(Queued {
            command,
            epoch,
            seq,
        });
        seq
    }

    /// Queue a command under the current epoch.
    pub(crate) fn push_now(&self, command: AxisCommand) -> u64 {
        self.push(command, self.epoch())
    }

    /// Take everything queued. Returns nothing if a writer holds the
    /// mailbox; the step loop picks it up next iteration.
    pub(crate) fn take_commands(&self) -> Option<VecDeque<Queued>> {
        let mut mailbox = match self.mailbox.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        if mailbox.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *mailbox))
        }
    }

    #[cfg(test)]
    pub(crate) fn queued_commands(&self) -> Vec<AxisCommand> {
        let mailbox = self.mailbox.lock().unwrap_or_else(PoisonError::into_inner);
        mailbox.iter().map(|q| q.command).collect()
    }

    // ------------------------------------------------------------------
    // Emergency stop
    // ------------------------------------------------------------------

    /// Ask the step loop to stop dead. A holding request latches
    /// [`is_emergency_stop_held`](Self::is_emergency_stop_held) right away.
    pub(crate) fn request_emergency_stop(&self, hold: bool) {
        let request = if hold {
            self.estop_held.store(true, Ordering::SeqCst);
            ESTOP_HOLD
        } else {
            ESTOP_TRANSIENT
        };
        self.estop.fetch_max(request, Ordering::SeqCst);
    }

    /// A holding emergency stop was requested and not yet released.
    pub(crate) fn is_emergency_stop_held(&self) -> bool {
        self.estop_held.load(Ordering::SeqCst)
    }

    /// Take a pending emergency stop. `Some(true)` means hold until released.
    pub(crate) fn take_emergency_stop(&self) -> Option<bool> {
        match self.estop.swap(ESTOP_NONE, Ordering::SeqCst) {
            ESTOP_HOLD => Some(true),
            ESTOP_TRANSIENT => Some(false),
            _ => None,
        }
    }

    /// The release reaches the step loop before the latch clears, so nothing
    /// queued after the latch clears lands on a held axis.
    pub(crate) fn request_release(&self) {
        self.estop_release.store(true, Ordering::SeqCst);
        self.estop_held.store(false, Ordering::SeqCst);
    }

    pub(crate) fn take_release(&self) -> bool {
        self.estop_release.swap(false, Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Events and lifecycle
    // ------------------------------------------------------------------

    /// Deliver an event. Nobody listening is not an error.
    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake_pattern_loop();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
