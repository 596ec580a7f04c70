//! Simulated focuser example.
//!
//! Runs the focuser engine against the simulated I/O port and a scripted
//! command link: homes, moves out, moves back in with the anti-backlash
//! overshoot, reports status, then idles until the motor is put to sleep.
//!
//! The pump loop sleeps for the delay each tick asks for, scaled down so the
//! whole session takes a couple of seconds.

use std::collections::VecDeque;
use std::time::Duration;

use focuser_core::sim::{ScriptedTransport, SimulatedHardware};
use focuser_core::{Build, Focuser, MotorState, State};

/// Real time per simulated microsecond.
const TIME_SCALE: u32 = 100;

fn main() {
    println!("=== Simulated Focuser Example ===\n");

    let mut hardware = SimulatedHardware::with_home_switch(0);
    hardware.set_carriage(120);

    let mut focuser = Focuser::new(
        ScriptedTransport::new(),
        hardware,
        String::new(),
        Build::UnitTestHyperstar.params(),
    )
    .expect("Failed to bring up focuser");

    // Fed one line at a time, only when idle, so each command runs to completion
    let mut script: VecDeque<&str> = VecDeque::from([
        "caps",
        "home",
        "abs_pos=1500",
        "abs_pos=1200",
        "pstatus",
        "sstatus",
    ]);

    let mut ticks: u64 = 0;
    loop {
        let idle = match focuser.state() {
            State::AcceptCommands => focuser.stack().len() == 1,
            State::Sleep => true,
            _ => false,
        };
        if idle {
            if let Some(line) = script.pop_front() {
                println!("\n> {}", line);
                focuser.transport_mut().send(line);
            }
        }

        let wait_us = focuser.tick();
        ticks += 1;

        for reply in focuser.transport_mut().take_output() {
            println!("< {}", reply);
        }

        if script.is_empty() && focuser.motor_state() == MotorState::Off {
            break;
        }

        std::thread::sleep(Duration::from_micros(u64::from(wait_us / TIME_SCALE)));
    }

    println!("\n=== Summary ===");
    println!("Ticks:            {}", ticks);
    println!("Simulated time:   {} ms", focuser.elapsed_ms());
    println!("Position:         {}", focuser.position());
    println!("Synchronized:     {}", focuser.is_synchronized());

    let (_, hardware, debug) = focuser.into_parts();
    println!("Carriage:         {}", hardware.carriage());
    println!("Step pulses:      {}", hardware.step_pulses());
    println!("Debug lines:      {}", debug.lines().count());

    println!("\nLast debug lines:");
    let lines: Vec<&str> = debug.lines().collect();
    for line in &lines[lines.len().saturating_sub(5)..] {
        println!("  {}", line);
    }
}
