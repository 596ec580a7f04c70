//! Command transport collaborator.

use core::fmt;

/// Longest command line the transport hands to the parser.
pub const MAX_LINE_LEN: usize = 64;

/// One received command line, without its terminator.
pub type Line = heapless::String<MAX_LINE_LEN>;

/// Line-oriented link to the controlling computer.
///
/// Status replies are written through the [`fmt::Write`] supertrait.
pub trait Transport: fmt::Write {
    /// Bring the link up. Called once while the engine is constructed.
    fn setup(&mut self, debug: &mut dyn fmt::Write) {
        let _ = debug;
    }

    /// Return a complete line if one has arrived.
    ///
    /// Must not block: when no full line is buffered, return `None`.
    fn read_line(&mut self) -> Option<Line>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn setup(&mut self, debug: &mut dyn fmt::Write) {
        (**self).setup(debug)
    }

    fn read_line(&mut self) -> Option<Line> {
        (**self).read_line()
    }
}
