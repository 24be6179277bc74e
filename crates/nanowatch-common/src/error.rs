use thiserror::Error;

/// Errors raised by the timer table.
///
/// `Overflow` and `Inactive` are the recoverable kinds a caller is expected
/// to handle; the rest signal misuse of the API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopwatchError {
    /// A timer was started while every slot was already active.
    #[error("stopwatch overflow: all {capacity} timer slots are active")]
    Overflow {
        /// Fixed capacity of the table.
        capacity: usize,
    },

    /// A stop was attempted on a timer that is not live.
    #[error("timer {index} is not active")]
    Inactive {
        /// Slot index carried by the handle.
        index: usize,
    },

    /// The handle addresses a slot outside the table.
    #[error("timer index {index} out of range (capacity: {capacity})")]
    OutOfRange {
        /// Slot index carried by the handle.
        index: usize,
        /// Fixed capacity of the table.
        capacity: usize,
    },

    /// Resolution must be a positive number of nanoseconds.
    #[error("invalid resolution: {0}ns (must be > 0)")]
    InvalidResolution(i64),

    /// Capacity must be at least one slot.
    #[error("invalid capacity: must be > 0")]
    InvalidCapacity,
}

/// Convenience type alias for timer table operations.
pub type StopwatchResult<T> = Result<T, StopwatchError>;
