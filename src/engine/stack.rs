//! Push-down stack of pending control states.
//!
//! The top entry is the state that runs on the next tick. Popping it resumes
//! whatever was pushed beneath, so a state can hand work to sub-states without
//! knowing who called it. [`State::AcceptCommands`] is always present as the
//! floor and is never popped.

use super::state::{State, StateArg};

/// Maximum number of entries, floor included.
pub const STACK_CAPACITY: usize = 16;

/// One pending state and its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateStackEntry {
    /// State to run.
    pub state: State,
    /// Argument owned by that state.
    pub arg: StateArg,
}

impl StateStackEntry {
    const FLOOR: StateStackEntry = StateStackEntry {
        state: State::AcceptCommands,
        arg: StateArg::None,
    };
}

/// Returned when a push would exceed [`STACK_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFull;

/// Fixed-capacity state stack.
#[derive(Debug, Clone)]
pub struct StateStack {
    entries: heapless::Vec<StateStackEntry, STACK_CAPACITY>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStack {
    /// Create a stack holding only the floor state.
    pub fn new() -> Self {
        let mut stack = Self {
            entries: heapless::Vec::new(),
        };
        stack.reset();
        stack
    }

    /// Push a state with no argument.
    pub fn push(&mut self, state: State) -> Result<(), StackFull> {
        self.push_with(state, StateArg::None)
    }

    /// Push a state with an argument.
    pub fn push_with(&mut self, state: State, arg: impl Into<StateArg>) -> Result<(), StackFull> {
        self.entries
            .push(StateStackEntry {
                state,
                arg: arg.into(),
            })
            .map_err(|_| StackFull)
    }

    /// Drop the top state. The floor is never removed.
    pub fn pop(&mut self) {
        if self.entries.len() > 1 {
            self.entries.pop();
        }
    }

    /// Discard everything down to the floor.
    pub fn reset(&mut self) {
        self.entries.clear();
        // capacity is at least one
        let _ = self.entries.push(StateStackEntry::FLOOR);
    }

    /// The entry on top.
    #[inline]
    pub fn top(&self) -> StateStackEntry {
        self.entries.last().copied().unwrap_or(StateStackEntry::FLOOR)
    }

    /// The state on top.
    #[inline]
    pub fn top_state(&self) -> State {
        self.top().state
    }

    /// The argument of the state on top.
    #[inline]
    pub fn top_arg(&self) -> StateArg {
        self.top().arg
    }

    /// Replace the argument of the state on top.
    pub fn set_top_arg(&mut self, arg: impl Into<StateArg>) {
        if let Some(top) = self.entries.last_mut() {
            top.arg = arg.into();
        }
    }

    /// Number of entries, floor included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the floor cannot be removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from the floor up to the top.
    pub fn iter(&self) -> impl Iterator<Item = &StateStackEntry> {
        self.entries.iter()
    }
}
