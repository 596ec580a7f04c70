//! The focuser engine.
//!
//! Owns the state stack, the position, the clock and every collaborator.
//! Each call to [`Focuser::tick`] runs exactly one state handler and returns
//! how long the caller should wait before calling again.

use core::fmt;

use crate::command::{check_for_commands, Command, CommandPacket, Transport};
use crate::config::{ms_to_next_epoch, validate_build, BuildParameters};
use crate::error::{HardwareError, Result};
use crate::hardware::{Hardware, Pin, PinState};
use crate::log::{debug, error, info, trace};

use super::clock::Clock;
use super::stack::StateStack;
use super::state::{Direction, Fault, MotorState, State, StateArg};

/// Version reported by the `firmware` command.
pub const FIRMWARE_VERSION: &str = "1.0";

/// Wait after a STEP edge or a DIR change, so the driver chip sees it.
const SETTLE_US: u32 = 1000;

/// Pause between fault reports.
const FAULT_REPORT_US: u32 = 10 * 1000 * 1000;

/// Overshoot used when approaching a target from above.
const ANTI_BACKLASH_STEPS: i32 = 500;

type StateResult = core::result::Result<u32, Fault>;

/// Outcome of a command check made while busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Poll {
    /// Nothing arrived.
    Idle,
    /// A non-interrupting command was handled; keep going.
    Handled,
    /// An interrupting command reset the stack and was handled.
    Interrupted,
}

/// Stack-based focuser controller.
///
/// Generic over:
/// - `NET`: command transport (must implement [`Transport`])
/// - `HW`: I/O port (must implement [`Hardware`])
/// - `DBG`: debug text sink (must implement [`fmt::Write`])
pub struct Focuser<NET, HW, DBG>
where
    NET: Transport,
    HW: Hardware,
    DBG: fmt::Write,
{
    net: NET,
    hardware: HW,
    debug: DBG,

    build: BuildParameters,
    stack: StateStack,

    /// Steps from home.
    position: i32,
    synchronized: bool,
    direction: Direction,
    motor: MotorState,

    clock: Clock,
    last_interrupt_ms: u64,
}

impl<NET, HW, DBG> Focuser<NET, HW, DBG>
where
    NET: Transport,
    HW: Hardware,
    DBG: fmt::Write,
{
    /// Bring up the focuser.
    ///
    /// Sets up the transport, configures the pin modes, powers the motor and
    /// sets the direction to forward.
    ///
    /// # Errors
    ///
    /// Returns an error if the build parameters are invalid or a pin cannot
    /// be configured or driven.
    pub fn new(net: NET, hardware: HW, debug: DBG, build: BuildParameters) -> Result<Self> {
        validate_build(&build)?;

        let mut focuser = Self {
            net,
            hardware,
            debug,
            build,
            stack: StateStack::new(),
            position: 0,
            synchronized: false,
            direction: Direction::Forward,
            motor: MotorState::Off,
            clock: Clock::new(),
            last_interrupt_ms: 0,
        };

        let _ = writeln!(focuser.debug, "Bringing up net interface");
        focuser.net.setup(&mut focuser.debug);

        for pin in Pin::ALL {
            focuser.hardware.pin_mode(pin, pin.io_mode())?;
        }

        focuser.set_motor(MotorState::On)?;
        focuser.hardware.digital_write(Pin::Direction, PinState::DirForward)?;
        focuser.hardware.digital_write(Pin::Step, PinState::StepInactive)?;

        info!("focuser up, max position {}", focuser.build.max_absolute_position);
        let _ = writeln!(focuser.debug, "Focuser is up");

        Ok(focuser)
    }

    /// Run one state handler.
    ///
    /// Returns the number of microseconds the caller should wait before the
    /// next call. The engine assumes that wait happens and advances its clock
    /// by the same amount.
    pub fn tick(&mut self) -> u32 {
        let state = self.stack.top_state();

        let delay_us = match self.run_state(state) {
            Ok(us) => us,
            Err(fault) => self.enter_fault(fault),
        };

        self.clock.advance_us(delay_us);
        delay_us
    }

    /// Current position in steps from home.
    #[inline]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Whether the position is known to match the mechanism.
    #[inline]
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Direction last written to the DIR pin.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Motor driver power state.
    #[inline]
    pub fn motor_state(&self) -> MotorState {
        self.motor
    }

    /// Whole milliseconds elapsed since construction.
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Sub-millisecond remainder of the clock, in `[0, 1000)`.
    #[inline]
    pub fn elapsed_remainder_us(&self) -> u32 {
        self.clock.remainder_us()
    }

    /// The state that runs on the next tick.
    #[inline]
    pub fn state(&self) -> State {
        self.stack.top_state()
    }

    /// The pending state stack.
    #[inline]
    pub fn stack(&self) -> &StateStack {
        &self.stack
    }

    /// The build this focuser was constructed with.
    #[inline]
    pub fn build(&self) -> &BuildParameters {
        &self.build
    }

    /// The I/O port.
    pub fn hardware(&self) -> &HW {
        &self.hardware
    }

    /// The I/O port, mutably (e.g. to close a simulated home switch).
    pub fn hardware_mut(&mut self) -> &mut HW {
        &mut self.hardware
    }

    /// The command transport.
    pub fn transport(&self) -> &NET {
        &self.net
    }

    /// The command transport, mutably.
    pub fn transport_mut(&mut self) -> &mut NET {
        &mut self.net
    }

    /// The debug sink.
    pub fn debug_sink(&self) -> &DBG {
        &self.debug
    }

    /// Tear down and return the collaborators.
    pub fn into_parts(self) -> (NET, HW, DBG) {
        (self.net, self.hardware, self.debug)
    }

    // ---------------------------------------------------------------------
    // States
    // ---------------------------------------------------------------------

    fn run_state(&mut self, state: State) -> StateResult {
        match state {
            State::AcceptCommands => self.state_accept_commands(),
            State::DoSteps => self.state_do_steps(),
            State::StepperInactiveAndWait => self.state_step_inactive_and_wait(),
            State::StepperActiveAndWait => self.state_step_active_and_wait(),
            State::SetDirection => self.state_set_direction(),
            State::Moving => self.state_moving(),
            State::StopAtHome => self.state_stop_at_home(),
            State::Sleep => self.state_sleep(),
            State::ErrorState => Ok(self.state_error()),
        }
    }

    fn state_accept_commands(&mut self) -> StateResult {
        let packet = self.poll();

        if packet.command != Command::NoCommand {
            self.process_command(packet)?;
            return Ok(0);
        }

        let idle_ms = self.clock.since(self.last_interrupt_ms);
        if idle_ms > u64::from(self.build.timing.inactivity_to_sleep_ms) {
            debug!("idle for {} ms, sleeping", idle_ms);
            self.push(State::Sleep, StateArg::None)?;
            return Ok(0);
        }

        let wait_ms = ms_to_next_epoch(
            self.clock.elapsed_ms(),
            self.build.timing.command_poll_interval_ms,
        );
        Ok(wait_ms.saturating_mul(1000))
    }

    fn state_set_direction(&mut self) -> StateResult {
        let desired = self
            .stack
            .top_arg()
            .as_direction()
            .ok_or(Fault::ArgumentMismatch)?;

        self.stack.pop();

        if desired == self.direction {
            return Ok(0);
        }

        self.direction = desired;
        let level = match desired {
            Direction::Forward => PinState::DirForward,
            Direction::Reverse => PinState::DirBackward,
        };
        self.hardware.digital_write(Pin::Direction, level)?;

        Ok(SETTLE_US)
    }

    fn state_step_active_and_wait(&mut self) -> StateResult {
        self.hardware.digital_write(Pin::Step, PinState::StepActive)?;
        self.stack.pop();
        Ok(SETTLE_US)
    }

    fn state_step_inactive_and_wait(&mut self) -> StateResult {
        self.hardware.digital_write(Pin::Step, PinState::StepInactive)?;
        self.stack.pop();
        Ok(SETTLE_US)
    }

    fn state_do_steps(&mut self) -> StateResult {
        let remaining = self
            .stack
            .top_arg()
            .as_count()
            .ok_or(Fault::ArgumentMismatch)?;

        if remaining <= 0 {
            self.stack.pop();
            return Ok(0);
        }

        self.stack.set_top_arg(remaining - 1);

        // Active runs first, then Inactive, then this state again
        self.push(State::StepperInactiveAndWait, StateArg::None)?;
        self.push(State::StepperActiveAndWait, StateArg::None)?;

        self.position = self.position.saturating_add(self.direction.sign());

        Ok(0)
    }

    fn state_moving(&mut self) -> StateResult {
        let target = self
            .stack
            .top_arg()
            .as_count()
            .ok_or(Fault::ArgumentMismatch)?;

        let _ = writeln!(self.debug, "Moving {}", self.position);

        if target == self.position {
            self.stack.pop();
            return Ok(0);
        }

        if self.check_while_busy()? == Poll::Interrupted {
            return Ok(0);
        }

        let steps = target.saturating_sub(self.position);
        let batch = steps.unsigned_abs().min(self.build.timing.max_steps_between_command_checks);

        // batch <= |steps| <= i32::MAX
        self.push(State::DoSteps, batch as i32)?;
        self.push(State::SetDirection, Direction::from_steps(steps))?;

        Ok(0)
    }

    fn state_stop_at_home(&mut self) -> StateResult {
        if self.hardware.digital_read(Pin::Home)? == PinState::HomeActive {
            info!("home found at {}", self.position);
            let _ = writeln!(self.debug, "Hit home at position {}", self.position);
            let _ = writeln!(self.debug, "Resetting position to 0");
            self.position = 0;
            self.synchronized = true;
            self.stack.pop();
            return Ok(0);
        }

        let batch = i32::try_from(self.build.timing.max_steps_between_command_checks).unwrap_or(i32::MAX);

        if self.position % batch == 0 {
            let _ = writeln!(self.debug, "Homing {}", self.position);

            if self.check_while_busy()? == Poll::Interrupted {
                return Ok(0);
            }
        }

        self.push(State::DoSteps, 1)?;
        self.push(State::SetDirection, Direction::Reverse)?;

        Ok(0)
    }

    fn state_sleep(&mut self) -> StateResult {
        match self.check_while_busy()? {
            Poll::Interrupted => {
                if self.motor != MotorState::On {
                    self.set_motor(MotorState::On)?;
                    return Ok(self.build.timing.motor_power_up_us());
                }
                Ok(0)
            }
            // Keep draining queued commands before sleeping again
            Poll::Handled => Ok(0),
            Poll::Idle => {
                if self.motor != MotorState::Off {
                    self.set_motor(MotorState::Off)?;
                }

                let wait_ms = ms_to_next_epoch(
                    self.clock.elapsed_ms(),
                    self.build.timing.sleep_poll_interval_ms,
                );
                Ok(wait_ms.saturating_mul(1000))
            }
        }
    }

    fn state_error(&mut self) -> u32 {
        let _ = writeln!(
            self.debug,
            "Focuser fault ({}), reset required",
            self.stack.top_arg()
        );
        FAULT_REPORT_US
    }

    fn enter_fault(&mut self, fault: Fault) -> u32 {
        error!("fault: {}", fault);
        let _ = writeln!(self.debug, "Fault: {}", fault.name());

        self.stack.reset();
        // floor plus one entry always fits
        let _ = self.stack.push_with(State::ErrorState, fault);
        0
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    fn poll(&mut self) -> CommandPacket {
        check_for_commands(&mut self.debug, &mut self.net)
    }

    /// Check for a command from a busy state.
    ///
    /// An interrupting command discards the whole stack before it is handled.
    fn check_while_busy(&mut self) -> core::result::Result<Poll, Fault> {
        let packet = self.poll();

        if packet.command == Command::NoCommand {
            return Ok(Poll::Idle);
        }

        let interrupting = packet.command.is_interrupting();
        if interrupting {
            trace!("{} interrupts {}", packet.command, self.stack.top_state());
            self.stack.reset();
        }

        self.process_command(packet)?;

        Ok(if interrupting {
            Poll::Interrupted
        } else {
            Poll::Handled
        })
    }

    fn process_command(&mut self, packet: CommandPacket) -> core::result::Result<(), Fault> {
        if packet.command.is_interrupting() {
            self.last_interrupt_ms = self.clock.elapsed_ms();
        }

        match packet.command {
            // Receipt alone stops motion through the interrupt reset
            Command::Abort => Ok(()),
            Command::Home => self.do_home(),
            Command::LazyHome => self.do_lazy_home(),
            Command::PositionStatus => {
                self.do_position_status();
                Ok(())
            }
            Command::ModeStatus => {
                self.do_mode_status();
                Ok(())
            }
            Command::SyncStatus => {
                self.do_sync_status();
                Ok(())
            }
            Command::AbsolutePosition => self.do_absolute_position(packet.argument_or_zero()),
            Command::RelativePosition => self.do_relative_position(packet.argument_or_zero()),
            Command::Sync => self.do_sync(packet.argument_or_zero()),
            Command::Firmware => {
                self.do_firmware();
                Ok(())
            }
            Command::Capabilities => {
                self.do_capabilities();
                Ok(())
            }
            Command::NoCommand => Err(Fault::UnroutableCommand),
        }
    }

    fn do_home(&mut self) -> core::result::Result<(), Fault> {
        if self.build.focuser_has_home {
            self.push(State::StopAtHome, StateArg::None)?;
        }
        Ok(())
    }

    fn do_lazy_home(&mut self) -> core::result::Result<(), Fault> {
        if self.build.focuser_has_home && !self.synchronized {
            self.push(State::StopAtHome, StateArg::None)?;
        }
        Ok(())
    }

    fn do_position_status(&mut self) {
        let _ = writeln!(self.debug, "Processing pstatus request");
        let _ = writeln!(self.net, "Position: {}", self.position);
    }

    fn do_mode_status(&mut self) {
        let _ = writeln!(self.debug, "Processing mstatus request");
        let top = self.stack.top();
        let _ = writeln!(self.net, "State: {} {}", top.state, top.arg);
    }

    fn do_sync_status(&mut self) {
        let _ = writeln!(self.debug, "Processing sstatus request");
        let _ = writeln!(self.net, "Synched: {}", yes_no(self.synchronized));
    }

    fn do_firmware(&mut self) {
        let _ = writeln!(self.debug, "Processing firmware request");
        let _ = writeln!(self.net, "Firmware: {}", FIRMWARE_VERSION);
    }

    fn do_capabilities(&mut self) {
        let _ = writeln!(self.debug, "Processing capabilities request");
        let _ = writeln!(self.net, "MaxPos: {}", self.build.max_absolute_position);
        let _ = writeln!(self.net, "CanHome: {}", yes_no(self.build.focuser_has_home));
    }

    fn do_absolute_position(&mut self, requested: i32) -> core::result::Result<(), Fault> {
        let target = self.build.clamp_position(requested);
        self.push(State::Moving, target)?;

        // Inward moves overshoot first so the final approach is always outward
        if target < self.position {
            let backtrack = target.saturating_sub(ANTI_BACKLASH_STEPS).max(0);
            self.push(State::Moving, backtrack)?;
        }

        Ok(())
    }

    fn do_relative_position(&mut self, offset: i32) -> core::result::Result<(), Fault> {
        self.do_absolute_position(self.position.saturating_add(offset))
    }

    fn do_sync(&mut self, position: i32) -> core::result::Result<(), Fault> {
        // Satisfied on its first tick; gives the stack one pass through Moving
        self.push(State::Moving, position)?;
        self.position = position;
        self.synchronized = true;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn push(&mut self, state: State, arg: impl Into<StateArg>) -> core::result::Result<(), Fault> {
        self.stack.push_with(state, arg)?;
        Ok(())
    }

    fn set_motor(&mut self, motor: MotorState) -> core::result::Result<(), HardwareError> {
        self.motor = motor;

        let (level, label) = match motor {
            MotorState::On => (PinState::MotorOn, "on"),
            MotorState::Off => (PinState::MotorOff, "off"),
        };
        self.hardware.digital_write(Pin::MotorEnable, level)?;

        let _ = writeln!(self.debug, "Motor set {}", label);
        Ok(())
    }
}

#[inline]
fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}
