//! Command module for focuser-core.
//!
//! Turns text lines from the controlling computer into [`CommandPacket`]s.

mod parser;
mod transport;

pub use parser::{
    check_for_commands, parse_line, process_int, Command, CommandPacket, CommandTemplate,
    COMMAND_TABLE,
};
pub use transport::{Line, Transport, MAX_LINE_LEN};
