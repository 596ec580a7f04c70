//! Elapsed-time bookkeeping for the cooperative scheduler.
//!
//! The engine never reads a hardware timer. It assumes the caller waits the
//! delay each tick asks for, and adds that delay here.

/// Millisecond clock with a sub-millisecond remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    elapsed_ms: u64,
    remainder_us: u32,
}

impl Clock {
    /// A clock at zero.
    #[inline]
    pub const fn new() -> Self {
        Self {
            elapsed_ms: 0,
            remainder_us: 0,
        }
    }

    /// Whole milliseconds elapsed.
    #[inline]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Microseconds not yet folded into [`elapsed_ms`](Self::elapsed_ms), in `[0, 1000)`.
    #[inline]
    pub const fn remainder_us(&self) -> u32 {
        self.remainder_us
    }

    /// Account for `us` microseconds of waiting.
    pub fn advance_us(&mut self, us: u32) {
        let total = u64::from(self.remainder_us) + u64::from(us);
        self.elapsed_ms += total / 1000;
        // < 1000
        self.remainder_us = (total % 1000) as u32;
    }

    /// Milliseconds since `earlier_ms`, zero if that is in the future.
    #[inline]
    pub fn since(&self, earlier_ms: u64) -> u64 {
        self.elapsed_ms.saturating_sub(earlier_ms)
    }
}
