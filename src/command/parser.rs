//! Command line parsing.
//!
//! Lines are lowercased and matched against an ordered table of literal
//! prefixes. The first template whose literal starts the line wins; there is
//! no longest-match search.

use core::fmt::{self, Write};

use crate::log::trace;

use super::transport::Transport;

/// Commands understood by the focuser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Stop whatever is in progress.
    Abort,
    /// Seek the home switch.
    Home,
    /// Seek the home switch unless already synchronized.
    LazyHome,
    /// Report the current position.
    PositionStatus,
    /// Report the active state and its argument.
    ModeStatus,
    /// Report whether the position is synchronized.
    SyncStatus,
    /// Move to an absolute position.
    AbsolutePosition,
    /// Move by a relative offset.
    RelativePosition,
    /// Declare the current position.
    Sync,
    /// Report the firmware version.
    Firmware,
    /// Report build capabilities.
    Capabilities,
    /// Nothing was received or the line was not understood.
    NoCommand,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Command; 12] = [
        Command::Abort,
        Command::Home,
        Command::LazyHome,
        Command::PositionStatus,
        Command::ModeStatus,
        Command::SyncStatus,
        Command::AbsolutePosition,
        Command::RelativePosition,
        Command::Sync,
        Command::Firmware,
        Command::Capabilities,
        Command::NoCommand,
    ];

    /// Whether receiving this command discards all pending motion.
    pub const fn is_interrupting(self) -> bool {
        match self {
            Command::Abort
            | Command::Home
            | Command::LazyHome
            | Command::AbsolutePosition
            | Command::RelativePosition
            | Command::Sync => true,
            Command::PositionStatus
            | Command::ModeStatus
            | Command::SyncStatus
            | Command::Firmware
            | Command::Capabilities
            | Command::NoCommand => false,
        }
    }

    /// Short name used in debug output.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Abort => "abort",
            Command::Home => "home",
            Command::LazyHome => "lazyhome",
            Command::PositionStatus => "pstatus",
            Command::ModeStatus => "mstatus",
            Command::SyncStatus => "sstatus",
            Command::AbsolutePosition => "abs_pos",
            Command::RelativePosition => "rel_pos",
            Command::Sync => "sync",
            Command::Firmware => "firmware",
            Command::Capabilities => "caps",
            Command::NoCommand => "none",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed command and its argument, if the command takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandPacket {
    /// The command.
    pub command: Command,
    /// Integer argument for commands that carry one.
    pub argument: Option<i32>,
}

impl CommandPacket {
    /// The packet produced when nothing usable was received.
    pub const NONE: CommandPacket = CommandPacket::new(Command::NoCommand, None);

    /// Create a packet.
    pub const fn new(command: Command, argument: Option<i32>) -> Self {
        Self { command, argument }
    }

    /// Argument value, 0 when absent.
    #[inline]
    pub fn argument_or_zero(&self) -> i32 {
        self.argument.unwrap_or(0)
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate {
    /// Literal the line must start with (lowercase).
    pub literal: &'static str,
    /// Command produced on a match.
    pub command: Command,
    /// Whether an integer follows the literal and one separator character.
    pub has_argument: bool,
}

const fn template(literal: &'static str, command: Command, has_argument: bool) -> CommandTemplate {
    CommandTemplate {
        literal,
        command,
        has_argument,
    }
}

/// The command table, in match order.
pub const COMMAND_TABLE: [CommandTemplate; 11] = [
    template("abort", Command::Abort, false),
    template("home", Command::Home, false),
    template("lazyhome", Command::LazyHome, false),
    template("pstatus", Command::PositionStatus, false),
    template("mstatus", Command::ModeStatus, false),
    template("sstatus", Command::SyncStatus, false),
    template("abs_pos", Command::AbsolutePosition, true),
    template("rel_pos", Command::RelativePosition, true),
    template("sync", Command::Sync, true),
    template("firmware", Command::Firmware, false),
    template("caps", Command::Capabilities, false),
];

/// Parse a decimal integer starting at byte `start`.
///
/// Accepts an optional leading `-` followed by ASCII digits and stops at the
/// first non-digit. Returns 0 when `start` is past the end or no digits are
/// present. Overflow wraps.
pub fn process_int(text: &str, start: usize) -> i32 {
    let Some(bytes) = text.as_bytes().get(start..) else {
        return 0;
    };

    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };

    let magnitude = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i32, |acc, b| acc.wrapping_mul(10).wrapping_add(i32::from(b - b'0')));

    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// Match an already lowercased line against [`COMMAND_TABLE`].
pub fn parse_line(line: &str) -> CommandPacket {
    COMMAND_TABLE
        .iter()
        .find(|t| line.starts_with(t.literal))
        .map(|t| {
            let argument = t.has_argument.then(|| process_int(line, t.literal.len() + 1));
            CommandPacket::new(t.command, argument)
        })
        .unwrap_or(CommandPacket::NONE)
}

/// Poll the transport for one command.
///
/// Never blocks: returns [`CommandPacket::NONE`] when no complete line is
/// available or the line matches no template.
pub fn check_for_commands<T>(debug: &mut dyn Write, transport: &mut T) -> CommandPacket
where
    T: Transport + ?Sized,
{
    let Some(mut line) = transport.read_line() else {
        return CommandPacket::NONE;
    };

    line.make_ascii_lowercase();
    let packet = parse_line(&line);

    if packet.command == Command::NoCommand {
        let _ = writeln!(debug, "Ignoring '{}'", line.as_str());
    } else {
        let _ = writeln!(debug, "Got command: {}", line.as_str());
        trace!("parsed {} {}", packet.command, packet.argument);
    }

    packet
}
