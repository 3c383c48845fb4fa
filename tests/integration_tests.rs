//! Integration tests for stroke-motion.
//!
//! These tests drive the public API end to end: TOML configuration, the axis
//! controller on simulated hardware, the pattern catalogue and the stroke
//! session in both polled and threaded form.

use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use stroke_motion::axis::sim::{SimClock, SimPin};
use stroke_motion::motion::MotionProfileGenerator;
use stroke_motion::{
    parse_config, AxisController, AxisControllerBuilder, AxisEvent, AxisState, Direction,
    EngineEvent, MachineConfig, NoPin, Pattern, PatternKind, SessionState, StepTiming,
    StrokeEngine, SwitchFn,
};

type SimAxis = AxisController<SimPin, SimPin, NoPin, NoPin, SimClock>;
type Switch = SwitchFn<fn(&AxisState) -> bool>;

// =============================================================================
// Test configuration data
// =============================================================================

const MACHINE: &str = r#"
[motor]
steps_per_mm = 10.0
max_speed_mm_per_sec = 100.0
max_acceleration_mm_per_sec2 = 1000.0

[travel]
physical_travel_mm = 110.0
keepout_mm = 5.0

[endstop]
home_to_back = true
homing_speed_mm_per_sec = 50.0

[startup]
pattern = "Simple Stroke"
speed_strokes_per_minute = 60.0
depth_mm = 80.0
stroke_mm = 40.0
"#;

fn machine() -> MachineConfig {
    parse_config(MACHINE).expect("machine config should parse")
}

fn sim_axis(steps_per_mm: f32, speed: f32, acceleration: f32, deceleration: f32) -> SimAxis {
    AxisControllerBuilder::new()
        .step_pin(SimPin::new())
        .dir_pin(SimPin::new())
        .clock(SimClock::new(20))
        .steps_per_mm(steps_per_mm)
        .speed(speed)
        .acceleration(acceleration)
        .deceleration(deceleration)
        .build()
        .expect("axis should build")
}

fn run_to_rest(axis: &mut SimAxis, max_ticks: usize) -> bool {
    for _ in 0..max_ticks {
        if axis.process_tick().unwrap() && axis.motion_complete() {
            return true;
        }
    }
    false
}

// Back switch 30 mm behind the power-on position.
fn switch_at_back(axis: &AxisState) -> bool {
    axis.position <= -300
}

fn engine() -> StrokeEngine<SimPin, SimPin, NoPin, NoPin, SimClock, Switch> {
    let config = machine();
    let axis = AxisControllerBuilder::new()
        .from_config(&config)
        .step_pin(SimPin::new())
        .dir_pin(SimPin::new())
        .clock(SimClock::new(20))
        .build()
        .expect("axis should build");
    StrokeEngine::new(axis, SwitchFn(switch_at_back as fn(&AxisState) -> bool), &config)
        .expect("engine should build")
}

// =============================================================================
// Scenario 1: point-to-point move runs to completion
// =============================================================================

#[test]
fn scenario_move_runs_to_completion() {
    // 10 steps/mm, 100 mm/s, 200 mm/s² both ways.
    let mut axis = sim_axis(10.0, 1000.0, 2000.0, 2000.0);
    axis.set_target_position(1000);

    assert!(run_to_rest(&mut axis, 5_000_000));
    assert_eq!(axis.position(), 1000);
    assert_eq!(axis.direction(), Direction::Stopped);
    assert_eq!(axis.poll_event(), Some(AxisEvent::TargetReached(1000)));
}

// =============================================================================
// Scenario 2: homing against a switch
// =============================================================================

#[test]
fn scenario_homing_sets_zero() {
    let mut axis = sim_axis(10.0, 1000.0, 2000.0, 2000.0);
    let switch = SwitchFn(|state: &AxisState| {
        state.position <= -500 && state.direction == Direction::Negative
    });

    let homed = axis
        .home_to_switch(Direction::Negative, 25.0, 2000, switch)
        .unwrap();

    assert!(homed);
    assert_eq!(axis.position(), 0);
    assert!(axis.is_homed());
}

#[test]
fn scenario_homing_timeout_is_not_an_error() {
    let mut axis = sim_axis(10.0, 1000.0, 2000.0, 2000.0);
    let never = SwitchFn(|_: &AxisState| false);

    assert_eq!(axis.home_to_switch(Direction::Negative, 200.0, 100, never), Ok(false));
    assert!(!axis.is_homed());
}

// =============================================================================
// Scenario 3: simple stroke targets
// =============================================================================

#[test]
fn scenario_simple_stroke_targets() {
    let mut pattern = PatternKind::from_name("Simple Stroke", 0).unwrap();
    pattern.set_speed_limit(5000.0, 50_000.0, 10.0);
    pattern.set_stroke(200);
    pattern.set_depth(500);
    pattern.set_sensation(0.0);

    assert_eq!(pattern.next_target(0, 0).target, 500);
    assert_eq!(pattern.next_target(1, 0).target, 300);
    assert_eq!(pattern.next_target(2, 0).target, 500);
}

// =============================================================================
// Scenario 4: non-holding emergency stop
// =============================================================================

#[test]
fn scenario_emergency_stop_releases_itself() {
    let mut axis = sim_axis(10.0, 1000.0, 2000.0, 2000.0);
    axis.set_target_position(5000);
    for _ in 0..20_000 {
        axis.process_tick().unwrap();
    }
    assert!(axis.position() > 0);

    axis.emergency_stop(false);
    assert!(axis.emergency_stop_active());
    assert!(axis.process_tick().unwrap());
    let stopped_at = axis.position();
    assert!(axis.motion_complete());
    assert!(!axis.emergency_stop_active());

    // Not latched: a fresh target is accepted.
    axis.set_target_position(stopped_at + 100);
    assert!(run_to_rest(&mut axis, 2_000_000));
    assert_eq!(axis.position(), stopped_at + 100);
}

// =============================================================================
// Session: polled
// =============================================================================

#[test]
fn session_rejects_motion_before_homing() {
    let engine = engine();
    let handle = engine.handle();

    assert_eq!(handle.state(), SessionState::Undefined);
    assert!(!handle.start_pattern());
    assert!(!handle.move_to_max(10.0));
    assert!(!handle.setup_depth(10.0, false));
    assert!(!handle.start_streaming());
    assert_eq!(handle.state(), SessionState::Undefined);
}

#[test]
fn session_home_and_stroke() {
    let config = machine();
    let mut engine = engine();
    let handle = engine.handle();

    handle.enable_and_home(config.endstop.as_ref().unwrap(), 0.0);
    let mut homed = false;
    for _ in 0..3_000_000 {
        engine.poll().unwrap();
        if engine.take_events().contains(&EngineEvent::HomingComplete(true)) {
            homed = true;
            break;
        }
    }
    assert!(homed);
    assert_eq!(handle.state(), SessionState::Ready);

    // Parks at the back end of the usable travel.
    let mut parked = false;
    for _ in 0..3_000_000 {
        engine.poll().unwrap();
        if engine.take_events().contains(&EngineEvent::TargetReached(0)) {
            parked = true;
            break;
        }
    }
    assert!(parked);

    assert!(handle.start_pattern());
    let mut reached = Vec::new();
    for _ in 0..10_000_000 {
        engine.poll().unwrap();
        for event in engine.take_events() {
            if let EngineEvent::TargetReached(position) = event {
                reached.push(position);
            }
        }
        if reached.len() >= 4 {
            break;
        }
    }
    assert_eq!(reached, vec![800, 400, 800, 400]);
}

#[test]
fn session_setup_depth_follows_depth() {
    let mut engine = engine();
    let handle = engine.handle();
    assert!(handle.this_is_home(50.0));

    assert!(handle.setup_depth(50.0, false));
    assert_eq!(handle.state(), SessionState::SetupDepth);
    handle.set_depth(60.0, false);

    let mut reached = None;
    for _ in 0..5_000_000 {
        engine.poll().unwrap();
        if engine.take_events().contains(&EngineEvent::TargetReached(600)) {
            reached = Some(engine.axis().position());
            break;
        }
    }
    assert_eq!(reached, Some(600));
    assert_eq!(handle.depth(), 60.0);
    assert_eq!(handle.target(), 60.0);
}

#[test]
fn session_streaming_clamps_to_window() {
    let mut engine = engine();
    let handle = engine.handle();
    assert!(handle.this_is_home(50.0));
    assert!(!handle.stream_position(50.0, 500));

    assert!(handle.start_streaming());
    assert_eq!(handle.state(), SessionState::Streaming);
    // 100 % is the depth, 80 mm.
    assert!(handle.stream_position(150.0, 2000));

    let mut done = false;
    for _ in 0..10_000_000 {
        engine.poll().unwrap();
        if engine.take_events().contains(&EngineEvent::TargetReached(800)) {
            done = true;
            break;
        }
    }
    assert!(done);

    handle.stop_motion();
    assert_eq!(handle.state(), SessionState::Ready);
    assert!(!handle.stream_position(0.0, 500));
}

#[test]
fn session_emergency_stop_holds_until_released() {
    let mut engine = engine();
    let handle = engine.handle();
    assert!(handle.this_is_home(50.0));
    for _ in 0..1_000_000 {
        engine.poll().unwrap();
        if engine.axis().motion_complete() && engine.axis().position() == 0 {
            break;
        }
    }

    assert!(handle.start_pattern());
    for _ in 0..50_000 {
        engine.poll().unwrap();
    }
    handle.emergency_stop(true);
    assert_eq!(handle.state(), SessionState::Ready);
    engine.poll().unwrap();
    let held = engine.axis().position();
    let _ = engine.take_events();

    // Motion requests are refused while latched.
    assert!(!handle.move_to_max(50.0));
    assert!(!handle.start_pattern());
    assert!(!handle.setup_depth(50.0, false));
    assert!(!handle.start_streaming());
    assert_eq!(handle.state(), SessionState::Ready);
    for _ in 0..200_000 {
        engine.poll().unwrap();
    }
    assert_eq!(engine.axis().position(), held);
    assert!(!engine
        .take_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::Telemetry { .. })));

    handle.release_emergency_stop();
    engine.poll().unwrap();
    assert!(!engine.axis().emergency_stop_active());
    assert!(!handle.is_emergency_stop_held());
    assert!(engine
        .take_events()
        .contains(&EngineEvent::EmergencyStopReleased));

    // Released, not resumed.
    for _ in 0..200_000 {
        engine.poll().unwrap();
    }
    assert_eq!(handle.state(), SessionState::Ready);
    assert_eq!(engine.axis().position(), held);
    assert!(engine.take_events().is_empty());

    assert!(handle.start_pattern());
}

#[test]
fn session_pattern_plans_nothing_while_latched() {
    let mut engine = engine();
    let handle = engine.handle();
    assert!(handle.this_is_home(50.0));
    assert!(handle.start_pattern());

    // Mid-stroke toward the depth.
    for _ in 0..1_000_000 {
        engine.poll().unwrap();
        if engine.axis().position() > 200 {
            break;
        }
    }
    assert_eq!(handle.state(), SessionState::Pattern);

    handle.emergency_stop(true);
    engine.poll().unwrap();
    let held = engine.axis().position();
    assert!(engine
        .take_events()
        .contains(&EngineEvent::EmergencyStopTriggered));

    // The axis reads as at rest, yet no further stroke is planned.
    for _ in 0..300_000 {
        engine.poll().unwrap();
    }
    assert!(engine.axis().motion_complete());
    assert_eq!(engine.axis().position(), held);
    assert!(engine.take_events().is_empty());

    handle.release_emergency_stop();
    for _ in 0..300_000 {
        engine.poll().unwrap();
    }
    assert_eq!(handle.state(), SessionState::Ready);
    assert_eq!(engine.axis().position(), held);
    let events = engine.take_events();
    assert_eq!(events, vec![EngineEvent::EmergencyStopReleased]);
}

// =============================================================================
// Session: threaded runtime
// =============================================================================

#[test]
fn runtime_runs_pattern_on_threads() {
    let runtime = engine().spawn().expect("threads should start");
    let handle = runtime.handle();
    assert!(handle.this_is_home(50.0));
    assert!(handle.start_pattern());

    let deadline = Instant::now() + Duration::from_secs(30);
    let mut strokes = 0;
    while strokes < 2 {
        let left = deadline.saturating_duration_since(Instant::now());
        match runtime.events().recv_timeout(left) {
            Ok(EngineEvent::TargetReached(800 | 400)) => strokes += 1,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => panic!("no strokes within 30 s"),
            Err(RecvTimeoutError::Disconnected) => panic!("session stopped"),
        }
    }

    handle.stop_motion();
    assert_eq!(handle.state(), SessionState::Ready);
    assert!(runtime.shutdown().is_ok());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_deceleration_completes_on_target(
        target in -3000i64..3000,
        speed in 500.0f32..4000.0,
        acceleration in 1000.0f32..20_000.0,
        decel_ratio in 0.25f32..4.0,
    ) {
        let mut axis = sim_axis(10.0, speed, acceleration, acceleration * decel_ratio);
        axis.set_target_position(target);

        prop_assert!(run_to_rest(&mut axis, 3_000_000));
        prop_assert_eq!(axis.position(), target);
        prop_assert_eq!(axis.direction(), Direction::Stopped);
    }

    #[test]
    fn prop_reversal_only_at_crawl(
        speed in 100.0f32..10_000.0,
        acceleration in 100.0f32..50_000.0,
        fraction in 0.0f32..1.0,
        distance in 1i64..100_000,
    ) {
        let timing = StepTiming::new(speed, acceleration, acceleration).unwrap();
        let generator = MotionProfileGenerator::new(timing);
        let slowest = timing.slowest_period_us();
        let period = timing.desired_period_us().min(slowest) * (1.0 - fraction) + slowest * fraction;

        // Target behind the direction of travel.
        let decision = generator.next_step_period(period, -distance, Direction::Positive);
        if decision.direction != Direction::Positive {
            prop_assert!(period >= slowest);
        }
    }

    #[test]
    fn prop_depth_clamping_is_idempotent(depth in -500.0f32..500.0) {
        let engine = engine();
        let handle = engine.handle();

        handle.set_depth(depth, false);
        let first = handle.depth();
        handle.set_depth(depth, false);

        prop_assert_eq!(handle.depth(), first);
        prop_assert!((0.0..=100.0).contains(&first));
        prop_assert!((first - depth.clamp(0.0, 100.0)).abs() <= 0.1 + 1e-4);
    }

    #[test]
    fn prop_pattern_parity(
        index in 0usize..9,
        stroke in 10i64..2000,
        extra in 0i64..3000,
        sensation in -100.0f32..100.0,
        seconds in 0.2f32..10.0,
    ) {
        let depth = stroke + extra;
        let mut pattern = PatternKind::from_index(index, 42).unwrap();
        pattern.set_speed_limit(10_000.0, 100_000.0, 10.0);
        pattern.set_time_of_stroke(seconds);
        pattern.set_stroke(stroke);
        pattern.set_depth(depth);
        pattern.set_sensation(sensation);

        let mut targets = Vec::new();
        let mut now_ms = 0;
        let mut half_stroke = 0;
        for _ in 0..200 {
            if targets.len() == 16 {
                break;
            }
            now_ms += 60_000;
            let command = pattern.next_target(half_stroke, now_ms);
            if !command.skip {
                targets.push(command.target);
                half_stroke += 1;
            }
        }
        prop_assert_eq!(targets.len(), 16);

        // In then out: every inward target is at least the outward one after it.
        for pair in targets.chunks(2) {
            prop_assert!(pair[0] >= pair[1], "{:?}", targets);
        }
    }
}
