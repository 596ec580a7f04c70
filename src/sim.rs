//! Simulated collaborators (std only).
//!
//! [`SimulatedHardware`] turns STEP pulses into a physical carriage position
//! and closes the home switch when the carriage reaches it.
//! [`ScriptedTransport`] feeds queued command lines and captures replies.
//! Together they let the engine run on a desktop, in tests and in demos.

use std::collections::VecDeque;
use std::fmt;
use std::string::String;
use std::vec::Vec;

use crate::command::{Line, Transport};
use crate::error::HardwareError;
use crate::hardware::{Hardware, Pin, PinIoMode, PinState};

/// Simulated focuser I/O port.
#[derive(Debug, Clone)]
pub struct SimulatedHardware {
    levels: [Option<PinState>; 4],
    modes: [Option<PinIoMode>; 4],
    history: Vec<(Pin, PinState)>,
    carriage: i64,
    home_at: Option<i64>,
    step_pulses: u64,
    failing_pin: Option<Pin>,
}

fn index(pin: Pin) -> usize {
    match pin {
        Pin::Step => 0,
        Pin::Direction => 1,
        Pin::MotorEnable => 2,
        Pin::Home => 3,
    }
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHardware {
    /// A port without a home switch, carriage at 0.
    pub fn new() -> Self {
        Self {
            levels: [None; 4],
            modes: [None; 4],
            history: Vec::new(),
            carriage: 0,
            home_at: None,
            step_pulses: 0,
            failing_pin: None,
        }
    }

    /// A port whose home switch closes at carriage position `home_at` and
    /// below.
    pub fn with_home_switch(home_at: i64) -> Self {
        Self {
            home_at: Some(home_at),
            ..Self::new()
        }
    }

    /// Place the carriage, e.g. to model a focuser left mid-travel.
    pub fn set_carriage(&mut self, position: i64) {
        self.carriage = position;
    }

    /// Physical carriage position in steps.
    pub fn carriage(&self) -> i64 {
        self.carriage
    }

    /// Number of rising STEP edges seen.
    pub fn step_pulses(&self) -> u64 {
        self.step_pulses
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: Pin) -> Option<PinState> {
        self.levels[index(pin)]
    }

    /// Mode configured for `pin`.
    pub fn mode(&self, pin: Pin) -> Option<PinIoMode> {
        self.modes[index(pin)]
    }

    /// Every write, oldest first.
    pub fn history(&self) -> &[(Pin, PinState)] {
        &self.history
    }

    /// Make every later write to `pin` fail.
    pub fn fail_writes_to(&mut self, pin: Pin) {
        self.failing_pin = Some(pin);
    }

    fn home_closed(&self) -> bool {
        self.home_at.is_some_and(|home| self.carriage <= home)
    }
}

impl Hardware for SimulatedHardware {
    fn pin_mode(&mut self, pin: Pin, mode: PinIoMode) -> Result<(), HardwareError> {
        self.modes[index(pin)] = Some(mode);
        Ok(())
    }

    fn digital_write(&mut self, pin: Pin, state: PinState) -> Result<(), HardwareError> {
        if self.failing_pin == Some(pin) {
            return Err(HardwareError::PinError(pin));
        }
        if state.pin() != pin {
            return Err(HardwareError::InvalidPinState(pin));
        }

        let previous = self.levels[index(pin)].replace(state);
        self.history.push((pin, state));

        let rising = state == PinState::StepActive && previous != Some(PinState::StepActive);
        if rising {
            self.step_pulses += 1;
            self.carriage += match self.level(Pin::Direction) {
                Some(PinState::DirBackward) => -1,
                _ => 1,
            };
        }

        Ok(())
    }

    fn digital_read(&mut self, pin: Pin) -> Result<PinState, HardwareError> {
        match pin {
            Pin::Home => Ok(PinState::for_pin(Pin::Home, self.home_closed())),
            other => self.levels[index(other)].ok_or(HardwareError::NotReadable(other)),
        }
    }
}

/// Transport fed from a queue of lines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    input: VecDeque<String>,
    output: Vec<String>,
    partial: String,
}

impl ScriptedTransport {
    /// An empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport with `lines` already queued.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transport = Self::new();
        for line in lines {
            transport.send(line);
        }
        transport
    }

    /// Queue a line as if the host had sent it.
    pub fn send(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    /// Lines not yet read by the engine.
    pub fn pending(&self) -> usize {
        self.input.len()
    }

    /// Complete reply lines written so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Take the reply lines written so far.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

impl fmt::Write for ScriptedTransport {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.partial.push_str(s);
        while let Some(end) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=end).collect();
            self.output.push(line.trim_end_matches('\n').to_owned());
        }
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn setup(&mut self, debug: &mut dyn fmt::Write) {
        let _ = writeln!(debug, "Scripted transport ready");
    }

    fn read_line(&mut self) -> Option<Line> {
        let raw = self.input.pop_front()?;
        // Overlong lines are consumed and dropped
        Line::try_from(raw.trim_end_matches(['\r', '\n'])).ok()
    }
}
