//! Approximate interval timers in constant space.
//!
//! This crate provides a fixed-capacity timer table loosely based on
//! Varghese & Lauck, "Hashed and Hierarchical Timing Wheels":
//!
//! - **Table** ([`stopwatch`]): start / stop / tick over a flat slot array
//! - **Handles** ([`handle`]): index plus generation, so stale handles are rejected
//! - **Pacing** ([`pacer`]): absolute-deadline helper for the caller's tick loop
//!
//! # Example
//!
//! ```
//! use nanowatch_common::ManualClock;
//! use nanowatch_core::Stopwatch;
//!
//! let clock = ManualClock::new(0);
//! let mut sw = Stopwatch::with_clock(100, 4, clock.clone()).unwrap();
//!
//! let handle = sw.start(250).unwrap();
//! let mut expired = sw.expiry_buffer();
//!
//! clock.set(50);
//! assert_eq!(sw.tick(&mut expired), 0);
//!
//! clock.set(260);
//! assert_eq!(sw.tick(&mut expired), 1);
//! assert_eq!(expired[0], handle);
//! assert_eq!(sw.active_count(), 0);
//! ```

pub mod handle;
pub mod pacer;
pub mod stopwatch;

// Re-export main types for convenience
pub use handle::TimerHandle;
pub use pacer::{PacerTick, TickPacer};
pub use stopwatch::{Stopwatch, SweepStats};
