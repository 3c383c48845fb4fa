//! Axis controller.
//!
//! Generic over embedded-hal 1.0 pin types and a monotonic [`Clock`]. All
//! motion happens inside [`AxisController::process_tick`], which must be
//! called at least as often as the shortest step period.

use embedded_hal::digital::OutputPin;
use heapless::Deque;

use crate::error::AxisError;
use crate::motion::{Direction, MotionPhase, MotionProfileGenerator, StepTiming};

use super::brake::Brake;
use super::hal::{write_level, Clock};
use super::state::{AxisEvent, AxisState, LimitSwitch};

/// Capacity of the axis event queue. The oldest event is dropped on overflow.
pub const MAX_AXIS_EVENTS: usize = 16;

/// Target distance used by open-ended seeks (limit seek, jogging).
pub const SEEK_DISTANCE: i64 = 2_000_000_000;

/// Single linear axis on a step/direction interface.
///
/// Generic over:
/// - `STEP`: STEP pin (pulse per step)
/// - `DIR`: DIR pin (level selects direction, optionally inverted)
/// - `EN`: driver enable pin ([`NoPin`](super::NoPin) if absent)
/// - `BRK`: brake pin ([`NoPin`](super::NoPin) if absent)
/// - `CLK`: monotonic clock
pub struct AxisController<STEP, DIR, EN, BRK, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
{
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    brake: Option<Brake<BRK>>,
    clock: CLK,

    profile: MotionProfileGenerator,
    state: AxisState,

    steps_per_mm: f32,
    invert_direction: bool,
    enable_active_low: bool,
    enabled: bool,

    last_step_us: u64,
    direction_toward_home: Direction,
    limit_check_done: bool,
    on_way_to_home: bool,
    on_way_to_limit: bool,
    announce_arrival: bool,

    estop_active: bool,
    estop_hold: bool,

    events: Deque<AxisEvent, MAX_AXIS_EVENTS>,
}

impl<STEP, DIR, EN, BRK, CLK> AxisController<STEP, DIR, EN, BRK, CLK>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        step_pin: STEP,
        dir_pin: DIR,
        enable_pin: EN,
        brake: Option<Brake<BRK>>,
        clock: CLK,
        timing: StepTiming,
        steps_per_mm: f32,
        invert_direction: bool,
        enable_active_low: bool,
        direction_toward_home: Direction,
    ) -> Self {
        Self {
            step_pin,
            dir_pin,
            enable_pin,
            brake,
            clock,
            profile: MotionProfileGenerator::new(timing),
            state: AxisState::default(),
            steps_per_mm,
            invert_direction,
            enable_active_low,
            enabled: false,
            last_step_us: 0,
            direction_toward_home,
            limit_check_done: false,
            on_way_to_home: false,
            on_way_to_limit: false,
            announce_arrival: false,
            estop_active: false,
            estop_hold: false,
            events: Deque::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Get the full axis state.
    #[inline]
    pub fn state(&self) -> &AxisState {
        &self.state
    }

    /// Current position in steps.
    #[inline]
    pub fn position(&self) -> i64 {
        self.state.position
    }

    /// Target position in steps.
    #[inline]
    pub fn target(&self) -> i64 {
        self.state.target
    }

    /// Current direction of motion.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    /// Current motion phase.
    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.state.phase
    }

    /// At rest on the target.
    #[inline]
    pub fn motion_complete(&self) -> bool {
        self.state.motion_complete()
    }

    /// Signed steps still to travel.
    #[inline]
    pub fn distance_to_target(&self) -> i64 {
        self.state.distance_to_target()
    }

    /// Signed velocity in steps/s.
    #[inline]
    pub fn current_velocity(&self) -> f32 {
        self.state.velocity()
    }

    /// Current position in millimeters.
    #[inline]
    pub fn position_mm(&self) -> f32 {
        self.state.position as f32 / self.steps_per_mm
    }

    /// Signed velocity in millimeters per second.
    #[inline]
    pub fn velocity_mm_per_sec(&self) -> f32 {
        self.state.velocity() / self.steps_per_mm
    }

    /// Steps per millimeter.
    #[inline]
    pub fn steps_per_mm(&self) -> f32 {
        self.steps_per_mm
    }

    /// Speed, acceleration and deceleration in force.
    #[inline]
    pub fn timing(&self) -> &StepTiming {
        self.profile.timing()
    }

    /// A homing procedure has succeeded.
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.state.homed
    }

    /// Driver outputs are enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// An emergency stop is latched or about to be processed.
    #[inline]
    pub fn emergency_stop_active(&self) -> bool {
        self.estop_active
    }

    /// The brake is engaged. Always false without a brake.
    #[inline]
    pub fn brake_active(&self) -> bool {
        self.brake.as_ref().map(|b| b.is_active()).unwrap_or(false)
    }

    /// Take the oldest pending event.
    pub fn poll_event(&mut self) -> Option<AxisEvent> {
        self.events.pop_front()
    }

    pub(crate) fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    // ------------------------------------------------------------------
    // Speed and rates
    // ------------------------------------------------------------------

    /// Set the cruise speed in steps/s.
    ///
    /// # Errors
    ///
    /// Rejects zero, negative and non-finite speeds.
    pub fn set_speed(&mut self, steps_per_sec: f32) -> Result<(), AxisError> {
        self.profile.timing_mut().set_speed(steps_per_sec)
    }

    /// Set the acceleration in steps/s².
    pub fn set_acceleration(&mut self, steps_per_sec2: f32) -> Result<(), AxisError> {
        self.profile.timing_mut().set_acceleration(steps_per_sec2)
    }

    /// Set the deceleration in steps/s².
    pub fn set_deceleration(&mut self, steps_per_sec2: f32) -> Result<(), AxisError> {
        self.profile.timing_mut().set_deceleration(steps_per_sec2)
    }

    /// Set the cruise speed in mm/s.
    pub fn set_speed_mm_per_sec(&mut self, mm_per_sec: f32) -> Result<(), AxisError> {
        self.set_speed(mm_per_sec * self.steps_per_mm)
    }

    /// Set the acceleration in mm/s².
    pub fn set_acceleration_mm_per_sec2(&mut self, mm_per_sec2: f32) -> Result<(), AxisError> {
        self.set_acceleration(mm_per_sec2 * self.steps_per_mm)
    }

    /// Set the deceleration in mm/s².
    pub fn set_deceleration_mm_per_sec2(&mut self, mm_per_sec2: f32) -> Result<(), AxisError> {
        self.set_deceleration(mm_per_sec2 * self.steps_per_mm)
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// Set an absolute target in steps.
    ///
    /// Cancels any seek toward home or a limit. Ignored while a holding
    /// emergency stop is latched.
    pub fn set_target_position(&mut self, steps: i64) {
        if self.estop_active && self.estop_hold {
            warn!("target {} ignored: emergency stop latched", steps);
            return;
        }
        self.on_way_to_home = false;
        self.on_way_to_limit = false;
        self.state.target = steps;
        self.announce_arrival = true;
    }

    /// Set a target relative to the current position.
    pub fn set_target_relative(&mut self, delta: i64) {
        self.set_target_position(self.state.position.saturating_add(delta));
    }

    /// Set an absolute target in millimeters.
    pub fn set_target_position_mm(&mut self, mm: f32) {
        self.set_target_position(libm::roundf(mm * self.steps_per_mm) as i64);
    }

    /// Move the target so the axis brakes to rest at the configured
    /// deceleration, starting now.
    pub fn set_target_to_stop(&mut self) {
        self.on_way_to_home = false;
        self.on_way_to_limit = false;
        let direction = self.state.direction;
        if !direction.is_moving() {
            return;
        }
        let braking = self.profile.deceleration_distance(self.state.current_period_us);
        if braking == 0 {
            // No step taken yet, or already crawling: cancel the pending step.
            self.state.halt();
            self.announce_arrival = false;
            return;
        }
        self.set_target_position(self.state.position + direction.sign() * braking);
    }

    /// Redefine the current position without moving. The target follows.
    pub fn set_current_position(&mut self, steps: i64) {
        self.state.position = steps;
        self.state.halt();
    }

    // ------------------------------------------------------------------
    // Step processing
    // ------------------------------------------------------------------

    /// Advance the axis by at most one step.
    ///
    /// Returns `true` when the axis is at rest: on its target, stopped by a
    /// limit switch, or stopped by an emergency stop.
    ///
    /// # Errors
    ///
    /// Returns an error if an output pin cannot be written.
    pub fn process_tick(&mut self) -> Result<bool, AxisError> {
        if self.estop_active {
            self.on_way_to_home = false;
            self.on_way_to_limit = false;
            self.state.halt();
            if let Some(brake) = self.brake.as_mut() {
                if !brake.is_active() {
                    brake.activate()?;
                }
            }
            if !self.estop_hold {
                self.estop_active = false;
            }
            return Ok(true);
        }

        let now_us = self.clock.now_micros();
        let now_ms = now_us / 1000;
        if let Some(brake) = self.brake.as_mut() {
            brake.poll(now_ms)?;
        }

        if let Some(limit) = self.state.active_limit {
            if self.check_limit(limit, now_ms)? {
                return Ok(true);
            }
        }

        if self.state.direction == Direction::Stopped {
            let distance = self.state.distance_to_target();
            if distance != 0 {
                let direction = Direction::from_sign(distance);
                self.write_direction(direction)?;
                self.state.direction = direction;
                self.state.next_period_us = self.profile.timing().slowest_period_us();
                self.state.phase = MotionPhase::Accelerating;
                self.last_step_us = now_us;
                return Ok(false);
            }
            if let Some(brake) = self.brake.as_mut() {
                if brake.moved_since_release() {
                    brake.engage_after_stop(now_ms)?;
                }
            }
            return Ok(true);
        }

        if now_us.wrapping_sub(self.last_step_us) < self.state.next_period_us as u64 {
            return Ok(false);
        }

        if let Some(brake) = self.brake.as_mut() {
            if brake.is_active() {
                brake.deactivate()?;
            }
        }

        self.step_pin.set_high().map_err(|_| AxisError::PinError)?;

        self.state.position += self.state.direction.sign();
        self.state.current_period_us = self.state.next_period_us;
        self.last_step_us = now_us;

        let decision = self.profile.next_step_period(
            self.state.current_period_us,
            self.state.distance_to_target(),
            self.state.direction,
        );
        if decision.direction != self.state.direction {
            self.write_direction(decision.direction)?;
            self.state.direction = decision.direction;
        }
        self.state.next_period_us = decision.period_us;
        self.state.phase = decision.phase;

        self.step_pin.set_low().map_err(|_| AxisError::PinError)?;

        if let Some(brake) = self.brake.as_mut() {
            brake.note_movement();
        }

        if self.state.position == self.state.target
            && self.state.next_period_us >= self.profile.timing().min_stopped_period_us()
        {
            self.state.halt();
            if self.announce_arrival {
                self.announce_arrival = false;
                self.push_event(AxisEvent::TargetReached(self.state.position));
                if let Some(brake) = self.brake.as_mut() {
                    brake.engage_after_stop(now_ms)?;
                }
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// Apply the active limit switch. Returns `true` if motion was stopped.
    fn check_limit(&mut self, limit: LimitSwitch, now_ms: u64) -> Result<bool, AxisError> {
        let distance = self.state.distance_to_target();

        if !self.limit_check_done {
            self.limit_check_done = true;
            match limit {
                LimitSwitch::Begin => self.state.disallowed_direction = self.direction_toward_home,
                LimitSwitch::End => {
                    self.state.disallowed_direction = self.direction_toward_home.reversed()
                }
                LimitSwitch::CombinedBeginAndEnd => {
                    if distance != 0 {
                        self.state.disallowed_direction = Direction::from_sign(distance);
                    }
                }
            }

            if self.on_way_to_home {
                self.set_current_position_as_home_and_stop();
                self.push_event(AxisEvent::HomeReached);
                info!("home reached on limit switch");
                self.engage_brake_after_stop(now_ms)?;
                return Ok(true);
            }
            self.on_way_to_limit = false;
        }

        let disallowed = self.state.disallowed_direction;
        if disallowed.is_moving() && Direction::from_sign(distance) == disallowed {
            debug!("limit switch blocks travel toward {}", distance);
            self.state.halt();
            self.engage_brake_after_stop(now_ms)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn engage_brake_after_stop(&mut self, now_ms: u64) -> Result<(), AxisError> {
        match self.brake.as_mut() {
            Some(brake) => brake.engage_after_stop(now_ms),
            None => Ok(()),
        }
    }

    fn write_direction(&mut self, direction: Direction) -> Result<(), AxisError> {
        let high = (direction == Direction::Positive) != self.invert_direction;
        write_level(&mut self.dir_pin, high)
    }

    fn push_event(&mut self, event: AxisEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        // Cannot fail after making room.
        let _ = self.events.push_back(event);
    }

    /// Stop dead where the axis is, without braking distance.
    pub(crate) fn halt(&mut self) {
        self.state.halt();
    }

    pub(crate) fn set_current_position_as_home_and_stop(&mut self) {
        self.on_way_to_home = false;
        self.state.position = 0;
        self.state.halt();
        self.state.homed = true;
    }

    pub(crate) fn note_limit_triggered(&mut self) {
        self.push_event(AxisEvent::LimitTriggered);
    }

    // ------------------------------------------------------------------
    // Safety
    // ------------------------------------------------------------------

    /// Stop immediately on the next tick.
    ///
    /// With `hold_until_released` the stop stays latched (and targets are
    /// ignored) until [`release_emergency_stop`](Self::release_emergency_stop).
    /// Without it the stop clears itself once the axis is at rest.
    pub fn emergency_stop(&mut self, hold_until_released: bool) {
        self.estop_hold = hold_until_released;
        self.estop_active = !self.state.motion_complete() || hold_until_released;
        warn!("emergency stop (hold: {})", hold_until_released);
        self.push_event(AxisEvent::EmergencyStopTriggered);
    }

    /// Release a latched emergency stop.
    pub fn release_emergency_stop(&mut self) {
        self.estop_active = false;
        self.estop_hold = false;
        info!("emergency stop released");
        self.push_event(AxisEvent::EmergencyStopReleased);
    }

    /// Report a triggered limit switch.
    ///
    /// Travel toward the switch is refused until
    /// [`clear_limit_switch_active`](Self::clear_limit_switch_active).
    pub fn set_limit_switch_active(&mut self, which: LimitSwitch) {
        self.state.active_limit = Some(which);
        self.limit_check_done = false;
        debug!("limit switch active: {:?}", which);
        self.push_event(AxisEvent::LimitTriggered);
    }

    /// Allow travel in both directions again.
    pub fn clear_limit_switch_active(&mut self) {
        self.state.active_limit = None;
        self.state.disallowed_direction = Direction::Stopped;
    }

    /// Set the direction in which home lies. `Stopped` is ignored.
    pub fn set_direction_toward_home(&mut self, direction: Direction) {
        if direction.is_moving() {
            self.direction_toward_home = direction;
        }
    }

    /// Direction in which home lies.
    #[inline]
    pub fn direction_toward_home(&self) -> Direction {
        self.direction_toward_home
    }

    // ------------------------------------------------------------------
    // Seeks
    // ------------------------------------------------------------------

    /// Travel toward home until the home limit switch is reported, then make
    /// that position 0.
    pub fn go_to_limit_and_set_as_home(&mut self) {
        let on_home_switch = matches!(
            self.state.active_limit,
            Some(LimitSwitch::Begin) | Some(LimitSwitch::CombinedBeginAndEnd)
        );
        if on_home_switch {
            self.set_current_position_as_home_and_stop();
            self.push_event(AxisEvent::HomeReached);
            return;
        }
        self.set_target_position(self.direction_toward_home.sign() * SEEK_DISTANCE);
        self.on_way_to_home = true;
    }

    /// Travel in `direction` until a limit switch is reported.
    pub fn go_to_limit(&mut self, direction: Direction) {
        if self.state.active_limit.is_none() && direction.is_moving() {
            self.set_target_position(direction.sign() * SEEK_DISTANCE);
            self.on_way_to_limit = true;
        }
    }

    /// Check if a limit seek is still in progress.
    #[inline]
    pub fn is_seeking_limit(&self) -> bool {
        self.on_way_to_limit || self.on_way_to_home
    }

    /// Move continuously in `direction`.
    pub fn start_jogging(&mut self, direction: Direction) {
        self.set_target_position(direction.sign() * SEEK_DISTANCE);
    }

    /// Brake a jog to rest.
    pub fn stop_jogging(&mut self) {
        self.set_target_to_stop();
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    /// Enable the driver outputs.
    pub fn enable(&mut self) -> Result<(), AxisError> {
        write_level(&mut self.enable_pin, !self.enable_active_low)?;
        self.enabled = true;
        Ok(())
    }

    /// Disable the driver outputs. The axis can be pushed freely.
    pub fn disable(&mut self) -> Result<(), AxisError> {
        write_level(&mut self.enable_pin, self.enable_active_low)?;
        self.enabled = false;
        Ok(())
    }

    /// Engage the brake now. No effect without a brake.
    pub fn activate_brake(&mut self) -> Result<(), AxisError> {
        match self.brake.as_mut() {
            Some(brake) => brake.activate(),
            None => Ok(()),
        }
    }

    /// Release the brake now. No effect without a brake.
    pub fn deactivate_brake(&mut self) -> Result<(), AxisError> {
        match self.brake.as_mut() {
            Some(brake) => brake.deactivate(),
            None => Ok(()),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::axis::sim::{SimClock, SimPin};
    use crate::axis::{AxisControllerBuilder, NoPin};
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    type SimAxis = AxisController<SimPin, SimPin, NoPin, NoPin, SimClock>;

    fn sim_axis(speed: f32, acceleration: f32) -> (SimAxis, SimPin) {
        let step = SimPin::new();
        let axis = AxisControllerBuilder::new()
            .step_pin(step.clone())
            .dir_pin(SimPin::new())
            .clock(SimClock::new(20))
            .speed(speed)
            .acceleration(acceleration)
            .build()
            .unwrap();
        (axis, step)
    }

    fn run_to_rest(axis: &mut SimAxis, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if axis.process_tick().unwrap() {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_move_in_millimeters() {
        let step = SimPin::new();
        let mut axis = AxisControllerBuilder::new()
            .step_pin(step.clone())
            .dir_pin(SimPin::new())
            .clock(SimClock::new(20))
            .steps_per_mm(10.0)
            .speed(1000.0)
            .acceleration(2000.0)
            .deceleration(2000.0)
            .build()
            .unwrap();
        axis.set_speed_mm_per_sec(100.0).unwrap();
        axis.set_acceleration_mm_per_sec2(200.0).unwrap();
        axis.set_deceleration_mm_per_sec2(200.0).unwrap();
        axis.set_target_position_mm(100.0);
        assert!(run_to_rest(&mut axis, 500_000));

        assert_eq!(axis.position(), 1000);
        assert!(axis.motion_complete());
        assert_eq!(step.rising_edges(), 1000);
        assert_eq!(axis.poll_event(), Some(AxisEvent::TargetReached(1000)));
        assert_eq!(axis.poll_event(), None);
    }

    #[test]
    fn test_target_reached_raised_once() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(50);
        assert!(run_to_rest(&mut axis, 100_000));
        assert!(run_to_rest(&mut axis, 10));
        assert!(run_to_rest(&mut axis, 10));

        assert_eq!(axis.poll_event(), Some(AxisEvent::TargetReached(50)));
        assert_eq!(axis.poll_event(), None);
    }

    #[test]
    fn test_reversal_mid_move() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(1000);
        while axis.position() < 300 {
            axis.process_tick().unwrap();
        }
        axis.set_target_position(-100);
        assert!(run_to_rest(&mut axis, 1_000_000));

        assert_eq!(axis.position(), -100);
        assert_eq!(axis.direction(), Direction::Stopped);
    }

    #[test]
    fn test_set_target_to_stop_brakes_forward() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(100_000);
        while axis.phase() != MotionPhase::Cruising {
            axis.process_tick().unwrap();
        }
        let stopped_from = axis.position();
        axis.set_target_to_stop();
        let stop_target = axis.target();

        assert!(stop_target > stopped_from);
        assert!(stop_target < 100_000);
        for _ in 0..1_000_000 {
            let done = axis.process_tick().unwrap();
            assert_ne!(axis.direction(), Direction::Negative);
            if done {
                break;
            }
        }
        assert_eq!(axis.position(), stop_target);
    }

    #[test]
    fn test_set_target_to_stop_before_first_step_cancels_it() {
        let (mut axis, step) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(500);
        // Picks a direction and schedules the first step.
        assert!(!axis.process_tick().unwrap());
        assert_eq!(axis.direction(), Direction::Positive);

        axis.set_target_to_stop();
        assert_eq!(axis.target(), 0);
        assert_eq!(axis.direction(), Direction::Stopped);
        assert!(run_to_rest(&mut axis, 10));

        assert_eq!(axis.position(), 0);
        assert_eq!(step.rising_edges(), 0);
        assert_eq!(axis.poll_event(), None);
    }

    #[test]
    fn test_set_target_to_stop_at_rest_is_noop() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_to_stop();
        assert_eq!(axis.target(), 0);
        assert!(axis.motion_complete());
    }

    #[test]
    fn test_emergency_stop_auto_releases() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(1000);
        while axis.position() < 100 {
            axis.process_tick().unwrap();
        }
        axis.emergency_stop(false);
        assert!(axis.emergency_stop_active());

        assert!(axis.process_tick().unwrap());
        assert!(axis.motion_complete());
        assert!(!axis.emergency_stop_active());
        let halted_at = axis.position();
        assert!(halted_at < 1000);

        axis.set_target_position(halted_at + 10);
        assert!(run_to_rest(&mut axis, 100_000));
        assert_eq!(axis.position(), halted_at + 10);
    }

    #[test]
    fn test_emergency_stop_hold_ignores_targets() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.emergency_stop(true);
        assert_eq!(axis.poll_event(), Some(AxisEvent::EmergencyStopTriggered));

        axis.set_target_position(500);
        assert_eq!(axis.target(), 0);
        assert!(axis.process_tick().unwrap());
        assert!(axis.emergency_stop_active());

        axis.release_emergency_stop();
        assert_eq!(axis.poll_event(), Some(AxisEvent::EmergencyStopReleased));
        axis.set_target_position(20);
        assert!(run_to_rest(&mut axis, 100_000));
        assert_eq!(axis.position(), 20);
    }

    #[test]
    fn test_emergency_stop_at_rest_without_hold_is_transient() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.emergency_stop(false);
        assert!(!axis.emergency_stop_active());
    }

    #[test]
    fn test_begin_limit_blocks_travel_toward_home() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_limit_switch_active(LimitSwitch::Begin);
        axis.set_target_position(-100);

        assert!(axis.process_tick().unwrap());
        assert_eq!(axis.position(), 0);
        assert_eq!(axis.target(), 0);
        assert_eq!(axis.state().disallowed_direction, Direction::Negative);

        axis.set_target_position(30);
        assert!(run_to_rest(&mut axis, 100_000));
        assert_eq!(axis.position(), 30);
    }

    #[test]
    fn test_combined_limit_blocks_commanded_direction() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_target_position(400);
        while axis.position() < 50 {
            axis.process_tick().unwrap();
        }
        axis.set_limit_switch_active(LimitSwitch::CombinedBeginAndEnd);
        assert!(axis.process_tick().unwrap());
        assert_eq!(axis.state().disallowed_direction, Direction::Positive);

        axis.clear_limit_switch_active();
        assert_eq!(axis.state().active_limit, None);
    }

    #[test]
    fn test_go_to_limit_and_set_as_home() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.set_current_position(700);
        axis.go_to_limit_and_set_as_home();
        assert!(axis.is_seeking_limit());
        assert_eq!(axis.target(), -SEEK_DISTANCE);

        while axis.position() > 650 {
            axis.process_tick().unwrap();
        }
        axis.set_limit_switch_active(LimitSwitch::Begin);
        assert!(axis.process_tick().unwrap());

        assert_eq!(axis.position(), 0);
        assert_eq!(axis.target(), 0);
        assert!(axis.is_homed());
        assert!(!axis.is_seeking_limit());
        assert_eq!(axis.poll_event(), Some(AxisEvent::LimitTriggered));
        assert_eq!(axis.poll_event(), Some(AxisEvent::HomeReached));
    }

    #[test]
    fn test_jogging() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        axis.start_jogging(Direction::Positive);
        while axis.position() < 200 {
            axis.process_tick().unwrap();
        }
        axis.stop_jogging();
        assert!(run_to_rest(&mut axis, 1_000_000));
        assert!(axis.position() >= 200);
        assert!(axis.position() < 2000);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let (mut axis, _) = sim_axis(1000.0, 2000.0);
        assert_eq!(axis.set_speed(0.0), Err(AxisError::InvalidSpeed(0.0)));
        assert_eq!(axis.timing().speed(), 1000.0);
    }

    #[test]
    fn test_inverted_direction_pin() {
        let expectations = [Transaction::set(State::Low)];
        let mut dir = PinMock::new(&expectations);
        let step = SimPin::new();

        let mut axis = AxisControllerBuilder::new()
            .step_pin(step.clone())
            .dir_pin(dir.clone())
            .clock(SimClock::new(20))
            .speed(1000.0)
            .acceleration(2000.0)
            .invert_direction(true)
            .build()
            .unwrap();

        axis.set_target_position(3);
        for _ in 0..100_000 {
            if axis.process_tick().unwrap() {
                break;
            }
        }
        assert_eq!(axis.position(), 3);
        assert_eq!(step.rising_edges(), 3);

        dir.done();
    }

    #[test]
    fn test_enable_active_low() {
        let expectations = [Transaction::set(State::Low), Transaction::set(State::High)];
        let mut enable = PinMock::new(&expectations);

        let mut axis = AxisControllerBuilder::new()
            .step_pin(SimPin::new())
            .dir_pin(SimPin::new())
            .clock(SimClock::new(20))
            .enable_pin(enable.clone(), true)
            .speed(1000.0)
            .acceleration(2000.0)
            .build()
            .unwrap();

        axis.enable().unwrap();
        assert!(axis.is_enabled());
        axis.disable().unwrap();
        assert!(!axis.is_enabled());

        enable.done();
    }

    #[test]
    fn test_builder_requires_pins() {
        let result = AxisControllerBuilder::<SimPin, SimPin, SimClock>::new()
            .step_pin(SimPin::new())
            .clock(SimClock::new(20))
            .speed(1000.0)
            .acceleration(2000.0)
            .build();

        assert!(matches!(
            result,
            Err(crate::error::Error::Config(crate::error::ConfigError::MissingField("dir_pin")))
        ));
    }
}
