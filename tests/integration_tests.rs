//! Integration tests for focuser-core.
//!
//! These drive the engine end to end through the simulated transport and I/O
//! port, checking motion, interruption, power management and status replies.

use focuser_core::command::{parse_line, process_int, Command};
use focuser_core::engine::{Clock, Fault, StateArg, StateStackEntry};
use focuser_core::sim::{ScriptedTransport, SimulatedHardware};
use focuser_core::{Build, Direction, Focuser, MotorState, Pin, PinState, State};
use proptest::prelude::*;

type SimFocuser = Focuser<ScriptedTransport, SimulatedHardware, String>;

// =============================================================================
// Helpers
// =============================================================================

const TICK_LIMIT: usize = 1_000_000;

fn focuser_with(build: Build, hardware: SimulatedHardware) -> SimFocuser {
    Focuser::new(ScriptedTransport::new(), hardware, String::new(), build.params())
        .expect("focuser should come up")
}

fn hyperstar() -> SimFocuser {
    focuser_with(Build::UnitTestHyperstar, SimulatedHardware::with_home_switch(0))
}

/// Queue a line and run the tick that reads it.
fn send(focuser: &mut SimFocuser, line: &str) -> u32 {
    focuser.transport_mut().send(line);
    focuser.tick()
}

/// Whether nothing but idle polling or sleep is left on the stack.
fn is_at_rest(focuser: &SimFocuser) -> bool {
    focuser
        .stack()
        .iter()
        .all(|e| matches!(e.state, State::AcceptCommands | State::Sleep))
}

/// Tick until no motion states are left, returning the position after every
/// tick.
fn settle(focuser: &mut SimFocuser) -> Vec<i32> {
    let mut positions = Vec::new();
    for _ in 0..TICK_LIMIT {
        if is_at_rest(focuser) {
            return positions;
        }
        focuser.tick();
        positions.push(focuser.position());
    }
    panic!("focuser did not settle, state {}", focuser.state());
}

fn move_to(focuser: &mut SimFocuser, position: i32) {
    send(focuser, &format!("abs_pos={}", position));
    settle(focuser);
    assert_eq!(focuser.position(), position);
}

fn stack_entries(focuser: &SimFocuser) -> Vec<StateStackEntry> {
    focuser.stack().iter().copied().collect()
}

fn entry(state: State, arg: StateArg) -> StateStackEntry {
    StateStackEntry { state, arg }
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn construction_sets_pins_and_powers_motor() {
    let focuser = hyperstar();
    let hw = focuser.hardware();

    assert_eq!(hw.mode(Pin::Home), Some(focuser_core::PinIoMode::Input));
    assert_eq!(hw.mode(Pin::Step), Some(focuser_core::PinIoMode::Output));
    assert_eq!(hw.level(Pin::MotorEnable), Some(PinState::MotorOn));
    assert_eq!(hw.level(Pin::Direction), Some(PinState::DirForward));
    assert_eq!(hw.level(Pin::Step), Some(PinState::StepInactive));

    assert_eq!(focuser.state(), State::AcceptCommands);
    assert_eq!(focuser.motor_state(), MotorState::On);
    assert_eq!(focuser.direction(), Direction::Forward);
    assert_eq!(focuser.position(), 0);
    assert!(!focuser.is_synchronized());
    assert!(focuser.debug_sink().contains("Focuser is up"));
}

#[test]
fn construction_rejects_invalid_build() {
    let mut params = Build::UnitTestHyperstar.params();
    params.timing.command_poll_interval_ms = 0;

    let result = Focuser::new(
        ScriptedTransport::new(),
        SimulatedHardware::new(),
        String::new(),
        params,
    );
    assert!(result.is_err());
}

#[test]
fn construction_reports_pin_failure() {
    let mut hw = SimulatedHardware::new();
    hw.fail_writes_to(Pin::MotorEnable);

    let result = Focuser::new(
        ScriptedTransport::new(),
        hw,
        String::new(),
        Build::UnitTestHyperstar.params(),
    );
    assert!(matches!(result, Err(focuser_core::Error::Hardware(_))));
}

// =============================================================================
// Idle polling
// =============================================================================

#[test]
fn idle_polls_on_fixed_cadence() {
    let mut focuser = hyperstar();

    assert_eq!(focuser.tick(), 10_000);
    assert_eq!(focuser.elapsed_ms(), 10);
    assert_eq!(focuser.tick(), 10_000);
    assert_eq!(focuser.elapsed_ms(), 20);
}

#[test]
fn idle_realigns_after_odd_delay() {
    let mut focuser = hyperstar();

    // Steps and direction changes advance the clock off the 10 ms grid
    send(&mut focuser, "sync=100");
    settle(&mut focuser);
    send(&mut focuser, "abs_pos=99");
    settle(&mut focuser);

    let wait = focuser.tick();
    assert_eq!((focuser.elapsed_ms() % 10), 0, "wait was {}", wait);
}

// =============================================================================
// Absolute and relative moves
// =============================================================================

#[test]
fn outward_move_is_monotonic() {
    let mut focuser = hyperstar();

    send(&mut focuser, "abs_pos=1000");
    assert_eq!(
        stack_entries(&focuser),
        vec![
            entry(State::AcceptCommands, StateArg::None),
            entry(State::Moving, StateArg::Count(1000)),
        ]
    );

    let positions = settle(&mut focuser);
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    assert!(positions.iter().all(|&p| (0..=1000).contains(&p)));
    assert_eq!(focuser.position(), 1000);
    assert_eq!(focuser.state(), State::AcceptCommands);
    assert_eq!(focuser.hardware().carriage(), 1000);
}

#[test]
fn inward_move_overshoots_then_approaches_outward() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 1000);

    send(&mut focuser, "abs_pos=100");
    assert_eq!(
        stack_entries(&focuser),
        vec![
            entry(State::AcceptCommands, StateArg::None),
            entry(State::Moving, StateArg::Count(100)),
            entry(State::Moving, StateArg::Count(0)),
        ]
    );

    let positions = settle(&mut focuser);
    let lowest = positions.iter().position(|&p| p == 0).expect("reaches 0");
    assert!(positions[..=lowest].windows(2).all(|w| w[0] >= w[1]));
    assert!(positions[lowest..].windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(focuser.position(), 100);
    assert_eq!(focuser.state(), State::AcceptCommands);
    assert_eq!(focuser.hardware().carriage(), 100);
}

#[test]
fn short_inward_move_backtracks_500() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 1000);

    send(&mut focuser, "abs_pos=900");
    assert_eq!(focuser.stack().top_arg(), StateArg::Count(400));

    let positions = settle(&mut focuser);
    assert_eq!(positions.iter().min(), Some(&400));
    assert_eq!(focuser.position(), 900);
}

#[test]
fn targets_are_clamped() {
    let mut focuser = hyperstar();

    send(&mut focuser, "abs_pos=99999");
    assert_eq!(focuser.stack().top_arg(), StateArg::Count(35_000));

    send_abort_when_moving(&mut focuser);

    send(&mut focuser, "abs_pos=-25");
    assert_eq!(
        stack_entries(&focuser),
        vec![
            entry(State::AcceptCommands, StateArg::None),
            entry(State::Moving, StateArg::Count(0)),
        ]
    );
}

#[test]
fn relative_move_is_absolute_from_current() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 1000);

    send(&mut focuser, "rel_pos=-200");
    assert_eq!(
        stack_entries(&focuser),
        vec![
            entry(State::AcceptCommands, StateArg::None),
            entry(State::Moving, StateArg::Count(800)),
            entry(State::Moving, StateArg::Count(300)),
        ]
    );
    settle(&mut focuser);
    assert_eq!(focuser.position(), 800);

    send(&mut focuser, "rel_pos=50");
    settle(&mut focuser);
    assert_eq!(focuser.position(), 850);
}

#[test]
fn moves_are_batched_between_command_checks() {
    let mut focuser = hyperstar();
    send(&mut focuser, "abs_pos=10");

    // Moving pushes DoSteps(batch) then SetDirection on top
    focuser.tick();
    let entries = stack_entries(&focuser);
    assert_eq!(entries[2], entry(State::DoSteps, StateArg::Count(2)));
    assert_eq!(
        entries[3],
        entry(State::SetDirection, StateArg::Direction(Direction::Forward))
    );

    // Same direction: no settle delay
    assert_eq!(focuser.tick(), 0);
}

#[test]
fn direction_change_waits_for_driver() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 10);

    send(&mut focuser, "abs_pos=5");
    focuser.tick(); // Moving(0) plans the reverse batch
    assert_eq!(focuser.state(), State::SetDirection);
    assert_eq!(focuser.tick(), 1000);
    assert_eq!(focuser.direction(), Direction::Reverse);
    assert_eq!(focuser.hardware().level(Pin::Direction), Some(PinState::DirBackward));
}

#[test]
fn each_step_is_a_timed_pulse() {
    let mut focuser = hyperstar();
    send(&mut focuser, "abs_pos=1");

    focuser.tick(); // Moving
    focuser.tick(); // SetDirection
    assert_eq!(focuser.tick(), 0); // DoSteps
    assert_eq!(focuser.state(), State::StepperActiveAndWait);
    assert_eq!(focuser.tick(), 1000);
    assert_eq!(focuser.hardware().level(Pin::Step), Some(PinState::StepActive));
    assert_eq!(focuser.tick(), 1000);
    assert_eq!(focuser.hardware().level(Pin::Step), Some(PinState::StepInactive));
    assert_eq!(focuser.hardware().step_pulses(), 1);
}

// =============================================================================
// Interruption
// =============================================================================

fn send_abort_when_moving(focuser: &mut SimFocuser) {
    for _ in 0..TICK_LIMIT {
        if focuser.state() == State::Moving {
            break;
        }
        focuser.tick();
    }
    assert_eq!(focuser.state(), State::Moving);
    send(focuser, "abort");
}

#[test]
fn abort_stops_motion_immediately() {
    let mut focuser = hyperstar();
    send(&mut focuser, "abs_pos=1000");
    for _ in 0..50 {
        focuser.tick();
    }

    send_abort_when_moving(&mut focuser);
    let stopped_at = focuser.position();
    assert!(stopped_at > 0 && stopped_at < 1000);
    assert_eq!(focuser.state(), State::AcceptCommands);
    assert_eq!(focuser.stack().len(), 1);

    for _ in 0..20 {
        focuser.tick();
    }
    assert_eq!(focuser.position(), stopped_at);
}

#[test]
fn new_target_replaces_old_one_mid_move() {
    let mut focuser = hyperstar();
    send(&mut focuser, "abs_pos=1000");
    for _ in 0..30 {
        focuser.tick();
    }
    while focuser.state() != State::Moving {
        focuser.tick();
    }

    let here = focuser.position();
    focuser.transport_mut().send("abs_pos=2000");
    focuser.tick();
    assert_eq!(
        stack_entries(&focuser),
        vec![
            entry(State::AcceptCommands, StateArg::None),
            entry(State::Moving, StateArg::Count(2000)),
        ]
    );
    assert_eq!(focuser.position(), here);

    settle(&mut focuser);
    assert_eq!(focuser.position(), 2000);
}

#[test]
fn status_request_does_not_interrupt_motion() {
    let mut focuser = hyperstar();
    send(&mut focuser, "abs_pos=100");
    for _ in 0..10 {
        focuser.tick();
    }
    while focuser.state() != State::Moving {
        focuser.tick();
    }

    focuser.transport_mut().send("mstatus");
    focuser.tick();
    assert_eq!(focuser.transport().output(), ["State: MOVING 100"]);
    assert_eq!(focuser.state(), State::SetDirection);

    settle(&mut focuser);
    assert_eq!(focuser.position(), 100);
}

// =============================================================================
// Status commands
// =============================================================================

#[test]
fn status_replies() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 42);
    focuser.transport_mut().take_output();

    for line in ["pstatus", "sstatus", "mstatus", "firmware", "caps"] {
        send(&mut focuser, line);
    }

    assert_eq!(
        focuser.transport().output(),
        [
            "Position: 42",
            "Synched: NO",
            "State: ACCEPTING_COMMANDS 0",
            "Firmware: 1.0",
            "MaxPos: 35000",
            "CanHome: YES",
        ]
    );
}

#[test]
fn status_commands_are_idempotent() {
    let mut focuser = hyperstar();
    move_to(&mut focuser, 42);

    for _ in 0..3 {
        for line in ["pstatus", "mstatus", "sstatus", "firmware", "caps"] {
            send(&mut focuser, line);
            assert_eq!(focuser.position(), 42);
            assert_eq!(focuser.direction(), Direction::Forward);
            assert_eq!(focuser.motor_state(), MotorState::On);
            assert_eq!(focuser.stack().len(), 1);
        }
    }
}

#[test]
fn commands_are_case_insensitive() {
    let mut focuser = hyperstar();
    send(&mut focuser, "ABS_POS=12");
    settle(&mut focuser);
    assert_eq!(focuser.position(), 12);

    send(&mut focuser, "PStatus");
    assert_eq!(focuser.transport().output().last().map(String::as_str), Some("Position: 12"));
}

#[test]
fn unknown_lines_are_ignored() {
    let mut focuser = hyperstar();
    let wait = send(&mut focuser, "make coffee");

    assert_eq!(wait, 10_000);
    assert_eq!(focuser.stack().len(), 1);
    assert!(focuser.transport().output().is_empty());
}

#[test]
fn traditional_build_reports_no_home() {
    let mut focuser = focuser_with(Build::UnitTestTraditional, SimulatedHardware::new());
    send(&mut focuser, "caps");
    assert_eq!(focuser.transport().output(), ["MaxPos: 5000", "CanHome: NO"]);
}

// =============================================================================
// Sync and homing
// =============================================================================

#[test]
fn sync_sets_position_and_passes_through_moving() {
    let mut focuser = hyperstar();

    send(&mut focuser, "sync=1234");
    assert_eq!(focuser.position(), 1234);
    assert!(focuser.is_synchronized());
    assert_eq!(focuser.stack().top(), entry(State::Moving, StateArg::Count(1234)));

    assert_eq!(focuser.tick(), 0);
    assert_eq!(focuser.state(), State::AcceptCommands);
    assert_eq!(focuser.hardware().step_pulses(), 0);
}

#[test]
fn home_backs_up_until_switch() {
    let mut hw = SimulatedHardware::with_home_switch(0);
    hw.set_carriage(37);
    let mut focuser = focuser_with(Build::UnitTestHyperstar, hw);

    send(&mut focuser, "home");
    assert_eq!(focuser.state(), State::StopAtHome);

    let positions = settle(&mut focuser);
    assert_eq!(positions.iter().min(), Some(&-37));
    assert_eq!(focuser.position(), 0);
    assert!(focuser.is_synchronized());
    assert_eq!(focuser.hardware().carriage(), 0);
    assert!(focuser.debug_sink().contains("Hit home at position -37"));

    send(&mut focuser, "sstatus");
    assert_eq!(focuser.transport().output(), ["Synched: YES"]);
}

#[test]
fn abort_stops_homing_on_check_boundary() {
    let mut hw = SimulatedHardware::with_home_switch(0);
    hw.set_carriage(500);
    let mut focuser = focuser_with(Build::UnitTestHyperstar, hw);
    send(&mut focuser, "home");

    for _ in 0..40 {
        focuser.tick();
    }
    focuser.transport_mut().send("abort");
    for _ in 0..TICK_LIMIT {
        if focuser.stack().len() == 1 {
            break;
        }
        focuser.tick();
    }

    // Commands are only read on even positions during homing
    assert_eq!(focuser.position() % 2, 0);
    assert!(!focuser.is_synchronized());
    assert_eq!(focuser.transport().pending(), 0);
}

#[test]
fn lazy_home_skips_when_synchronized() {
    let mut focuser = hyperstar();
    send(&mut focuser, "sync=100");
    settle(&mut focuser);

    send(&mut focuser, "lazyhome");
    assert_eq!(focuser.stack().len(), 1);

    let mut unsynced = hyperstar();
    send(&mut unsynced, "lazyhome");
    assert_eq!(unsynced.state(), State::StopAtHome);
}

#[test]
fn home_without_switch_is_a_no_op() {
    let mut focuser = focuser_with(Build::UnitTestTraditional, SimulatedHardware::new());

    send(&mut focuser, "home");
    assert_eq!(focuser.stack().len(), 1);
    send(&mut focuser, "lazyhome");
    assert_eq!(focuser.stack().len(), 1);
}

// =============================================================================
// Power management
// =============================================================================

fn tick_until_asleep(focuser: &mut SimFocuser) {
    for _ in 0..TICK_LIMIT {
        if focuser.state() == State::Sleep {
            return;
        }
        focuser.tick();
    }
    panic!("focuser never slept");
}

#[test]
fn inactivity_puts_motor_to_sleep() {
    let mut focuser = hyperstar();

    tick_until_asleep(&mut focuser);
    assert!(focuser.elapsed_ms() > 1000);
    assert_eq!(focuser.motor_state(), MotorState::On);

    let wait = focuser.tick();
    assert_eq!(focuser.motor_state(), MotorState::Off);
    assert_eq!(focuser.hardware().level(Pin::MotorEnable), Some(PinState::MotorOff));
    assert!(wait > 0 && wait <= 500_000);
    assert_eq!(focuser.elapsed_ms() % 500, 0);

    // Staying asleep does not rewrite the enable pin
    let writes = focuser.hardware().history().len();
    focuser.tick();
    assert_eq!(focuser.hardware().history().len(), writes);
}

#[test]
fn interrupting_command_wakes_motor_before_moving() {
    let mut focuser = hyperstar();
    tick_until_asleep(&mut focuser);
    focuser.tick();
    assert_eq!(focuser.motor_state(), MotorState::Off);

    let wait = send(&mut focuser, "abs_pos=20");
    assert_eq!(wait, 200_000);
    assert_eq!(focuser.motor_state(), MotorState::On);
    assert_eq!(focuser.state(), State::Moving);
    assert_eq!(focuser.position(), 0);

    settle(&mut focuser);
    assert_eq!(focuser.position(), 20);
}

#[test]
fn status_request_while_asleep_keeps_sleeping() {
    let mut focuser = hyperstar();
    tick_until_asleep(&mut focuser);
    focuser.tick();

    let wait = send(&mut focuser, "pstatus");
    assert_eq!(wait, 0);
    assert_eq!(focuser.state(), State::Sleep);
    assert_eq!(focuser.motor_state(), MotorState::Off);
    assert_eq!(focuser.transport().output(), ["Position: 0"]);
}

#[test]
fn motion_resets_inactivity_timer() {
    let mut focuser = hyperstar();
    for _ in 0..95 {
        focuser.tick();
    }
    send(&mut focuser, "abs_pos=30");
    settle(&mut focuser);
    assert!(focuser.elapsed_ms() > 1000);

    // Idle time counts from the move command, not from power-up
    focuser.tick();
    assert_eq!(focuser.state(), State::AcceptCommands);
}

// =============================================================================
// Faults
// =============================================================================

#[test]
fn pin_failure_mid_move_parks_in_error_state() {
    let mut focuser = hyperstar();
    focuser.hardware_mut().fail_writes_to(Pin::Step);

    send(&mut focuser, "abs_pos=10");
    for _ in 0..10 {
        if focuser.state() == State::ErrorState {
            break;
        }
        focuser.tick();
    }

    assert_eq!(focuser.state(), State::ErrorState);
    assert_eq!(focuser.stack().top_arg(), StateArg::Fault(Fault::Hardware));
    assert_eq!(focuser.stack().len(), 2);

    // No way out: commands are no longer read
    focuser.transport_mut().send("abort");
    assert_eq!(focuser.tick(), 10_000_000);
    assert_eq!(focuser.state(), State::ErrorState);
    assert_eq!(focuser.transport().pending(), 1);
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone)]
enum Step {
    Line(String),
    Ticks(usize),
}

fn script_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (-1000i32..7000).prop_map(|n| Step::Line(format!("abs_pos={}", n))),
        (-3000i32..3000).prop_map(|n| Step::Line(format!("rel_pos={}", n))),
        Just(Step::Line("abort".to_string())),
        Just(Step::Line("mstatus".to_string())),
        (1usize..400).prop_map(Step::Ticks),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn formatted_integers_parse_back(n in any::<i32>()) {
        prop_assert_eq!(process_int(&n.to_string(), 0), n);

        let packet = parse_line(&format!("rel_pos {}", n));
        prop_assert_eq!(packet.command, Command::RelativePosition);
        prop_assert_eq!(packet.argument, Some(n));
    }

    #[test]
    fn clock_keeps_every_microsecond(waits in prop::collection::vec(any::<u32>(), 1..50)) {
        let mut clock = Clock::new();
        let mut total: u64 = 0;
        for us in waits {
            clock.advance_us(us);
            total += u64::from(us);
            prop_assert!(clock.remainder_us() < 1000);
        }
        prop_assert_eq!(clock.elapsed_ms() * 1000 + u64::from(clock.remainder_us()), total);
    }

    #[test]
    fn absolute_targets_always_clamped(n in any::<i32>()) {
        let mut focuser = hyperstar();
        send(&mut focuser, &format!("abs_pos={}", n));

        for e in focuser.stack().iter().skip(1) {
            let target = e.arg.as_count().expect("moving carries a target");
            prop_assert!((0..=35_000).contains(&target));
        }
    }

    #[test]
    fn random_scripts_keep_invariants(script in prop::collection::vec(script_step(), 1..20)) {
        run_script(script)?;
    }
}

fn run_script(script: Vec<Step>) -> Result<(), TestCaseError> {
    let mut focuser = focuser_with(Build::UnitTestTraditional, SimulatedHardware::new());

    for step in script {
        let ticks = match step {
            Step::Line(line) => {
                focuser.transport_mut().send(line);
                1
            }
            Step::Ticks(n) => n,
        };
        for _ in 0..ticks {
            focuser.tick();
            prop_assert!(focuser.elapsed_remainder_us() < 1000);
            prop_assert!((0..=5000).contains(&focuser.position()));
            prop_assert!(focuser.stack().len() >= 1);
            prop_assert_ne!(focuser.state(), State::ErrorState);
        }
    }

    // Drain and finish whatever motion is left
    while focuser.transport().pending() > 0 {
        focuser.tick();
    }
    settle(&mut focuser);
    prop_assert_eq!(i64::from(focuser.position()), focuser.hardware().carriage());
    Ok(())
}

#[test]
fn idle_script_past_sleep_timeout_settles() {
    // 102 idle polls of 10 ms cross the 1000 ms inactivity limit
    run_script(vec![Step::Ticks(102)]).unwrap();
}

#[test]
fn settle_stops_at_sleep() {
    let mut focuser = hyperstar();
    tick_until_asleep(&mut focuser);

    assert!(settle(&mut focuser).is_empty());
    assert_eq!(focuser.state(), State::Sleep);
}
