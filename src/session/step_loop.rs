//! The fast loop: the only code that touches the axis.
//!
//! One iteration handles a pending emergency stop, applies queued commands
//! that are still current, advances homing or takes one step, and publishes
//! the result. It never blocks: the mailbox is only try-locked and the
//! parameter lock is never taken.

use embedded_hal::digital::OutputPin;

use crate::axis::{AxisController, AxisEvent, Clock, HomeSwitch, HomingProcedure, HomingStatus};
use crate::error::AxisError;

use super::event::EngineEvent;
use super::shared::{AxisCommand, Shared};
use super::state::SessionState;

/// Where the axis goes once homing has found the switch.
#[derive(Debug, Clone, Copy)]
struct Parking {
    switch_position: i64,
    park: i64,
    speed: f32,
    acceleration: f32,
}

pub(crate) struct StepLoop<STEP, DIR, EN, BRK, CLK, SW>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
    SW: HomeSwitch,
{
    axis: AxisController<STEP, DIR, EN, BRK, CLK>,
    switch: SW,
    homing: Option<(HomingProcedure, Parking)>,
    applied_seq: u64,
}

impl<STEP, DIR, EN, BRK, CLK, SW> StepLoop<STEP, DIR, EN, BRK, CLK, SW>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    BRK: OutputPin,
    CLK: Clock,
    SW: HomeSwitch,
{
    pub(crate) fn new(axis: AxisController<STEP, DIR, EN, BRK, CLK>, switch: SW) -> Self {
        Self {
            axis,
            switch,
            homing: None,
            applied_seq: 0,
        }
    }

    pub(crate) fn axis(&self) -> &AxisController<STEP, DIR, EN, BRK, CLK> {
        &self.axis
    }

    pub(crate) fn is_homing(&self) -> bool {
        self.homing.is_some()
    }

    /// Run one iteration.
    ///
    /// # Errors
    ///
    /// Returns an error if an output pin or the home switch fails.
    pub(crate) fn iterate(&mut self, shared: &Shared) -> Result<(), AxisError> {
        if let Some(hold) = shared.take_emergency_stop() {
            self.axis.emergency_stop(hold);
        }
        if shared.take_release() {
            self.axis.release_emergency_stop();
        }

        if let Some(queued) = shared.take_commands() {
            let epoch = shared.epoch();
            for q in queued {
                if q.epoch == epoch {
                    self.apply(q.command, shared)?;
                } else {
                    trace!("dropped stale command #{}", q.seq);
                }
                self.applied_seq = q.seq;
            }
            shared.status.publish(&self.axis, self.applied_seq);
        }

        if self.homing.is_some() {
            self.advance_homing(shared)?;
        } else {
            self.axis.process_tick()?;
        }

        shared.status.publish(&self.axis, self.applied_seq);
        shared.status.set_now_ms(self.axis.now_millis());
        self.forward_events(shared);
        Ok(())
    }

    /// Stop dead and cut the driver. Used when the runtime shuts down.
    pub(crate) fn power_down(&mut self) -> Result<(), AxisError> {
        self.homing = None;
        self.axis.halt();
        self.axis.disable()
    }

    fn apply(&mut self, command: AxisCommand, shared: &Shared) -> Result<(), AxisError> {
        match command {
            AxisCommand::Move {
                target,
                speed,
                acceleration,
                deceleration,
            } => {
                self.axis.set_speed(speed)?;
                self.axis.set_acceleration(acceleration)?;
                self.axis.set_deceleration(deceleration)?;
                self.axis.set_target_position(target);
            }
            AxisCommand::Stop { deceleration } => {
                self.axis.set_deceleration(deceleration)?;
                self.axis.set_target_to_stop();
            }
            AxisCommand::DeclareHome { position } => {
                self.homing = None;
                self.axis.set_current_position_as_home_and_stop();
                self.axis.set_current_position(position);
            }
            AxisCommand::Home {
                direction,
                speed,
                max_distance,
                switch_position,
                park,
                park_acceleration,
            } => match HomingProcedure::new(direction, speed, max_distance) {
                Ok(procedure) => {
                    let parking = Parking {
                        switch_position,
                        park,
                        speed,
                        acceleration: park_acceleration,
                    };
                    self.homing = Some((procedure, parking));
                }
                Err(_) => {
                    error!("cannot home at {} steps/s", speed);
                    self.fail_homing(shared)?;
                }
            },
            AxisCommand::Enable => self.axis.enable()?,
            AxisCommand::Disable => {
                if self.homing.take().is_some() {
                    info!("homing abandoned: axis disabled");
                }
                self.axis.halt();
                self.axis.disable()?;
            }
        }
        Ok(())
    }

    fn advance_homing(&mut self, shared: &Shared) -> Result<(), AxisError> {
        let Some((procedure, parking)) = self.homing.as_mut() else {
            return Ok(());
        };
        let parking = *parking;
        match procedure.poll(&mut self.axis, &mut self.switch)? {
            HomingStatus::InProgress => {}
            HomingStatus::Succeeded => {
                self.homing = None;
                self.axis.set_current_position(parking.switch_position);
                self.axis.set_speed(parking.speed)?;
                self.axis.set_acceleration(parking.acceleration)?;
                self.axis.set_deceleration(parking.acceleration)?;
                self.axis.set_target_position(parking.park);
                shared.set_homed(true);
                shared.set_state(SessionState::Ready);
                shared.emit(EngineEvent::HomingComplete(true));
                shared.emit(EngineEvent::Telemetry {
                    position_mm: 0.0,
                    speed_mm_per_sec: 0.0,
                    clipped: false,
                });
            }
            HomingStatus::Failed => {
                self.homing = None;
                self.fail_homing(shared)?;
            }
        }
        Ok(())
    }

    fn fail_homing(&mut self, shared: &Shared) -> Result<(), AxisError> {
        warn!("homing failed; disabling the axis");
        self.axis.disable()?;
        shared.set_homed(false);
        shared.set_state(SessionState::Undefined);
        shared.emit(EngineEvent::HomingComplete(false));
        shared.emit(EngineEvent::Telemetry {
            position_mm: 0.0,
            speed_mm_per_sec: 0.0,
            clipped: false,
        });
        Ok(())
    }

    fn forward_events(&mut self, shared: &Shared) {
        while let Some(event) = self.axis.poll_event() {
            let forwarded = match event {
                AxisEvent::TargetReached(position) => EngineEvent::TargetReached(position),
                AxisEvent::LimitTriggered => EngineEvent::LimitTriggered,
                AxisEvent::EmergencyStopTriggered => EngineEvent::EmergencyStopTriggered,
                AxisEvent::EmergencyStopReleased => EngineEvent::EmergencyStopReleased,
                AxisEvent::HomeReached => continue,
            };
            shared.emit(forwarded);
        }
    }
}
