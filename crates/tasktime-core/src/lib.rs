//! Core domain logic for task time tracking.
//!
//! This crate contains the fundamental types and logic for:
//! - Tasks and timelogs, including the start/stop state transition
//! - Day windows in the fixed reference offset
//! - Daily summary aggregation
//!
//! It performs no I/O; persistence lives in `tasktime-db`.

pub mod clock;
pub mod summary;
pub mod task;
pub mod timelog;
pub mod types;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use summary::{DailySummary, TaskTime, WindowLog};
pub use task::{Task, TaskUpdate, validate_title};
pub use timelog::{
    ActiveTimer, ActivityEntry, TaskTotal, Timelog, TimerStateError, elapsed_millis,
    elapsed_seconds, reported_seconds,
};
pub use types::{TaskId, TaskStatus, TimelogId, UserId, ValidationError};
pub use window::{DayWindow, HOURS_PER_DAY, REFERENCE_OFFSET_SECS};
