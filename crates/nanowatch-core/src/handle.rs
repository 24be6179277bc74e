//! Timer handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one started timer.
///
/// The slot index is what the caller maps to whatever is being timed. The
/// generation distinguishes successive timers that reuse the same slot, so a
/// handle kept past its timer's stop or expiry cannot touch the slot's next
/// occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimerHandle {
    index: usize,
    generation: u32,
}

impl TimerHandle {
    /// Build a handle from its parts.
    #[must_use]
    pub const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in `[0, capacity)`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Slot generation at the time the timer was started.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}
