//! Shared types for the cooperative event loop.
//!
//! This crate provides the vocabulary used by the scheduler and by the code
//! that schedules work on it: task classes, cancellation handles, logical
//! time, and the error taxonomy.
//!
//! # Overview
//!
//! - [`TaskKind`] - Which queue a task lives in
//! - [`TimerHandle`] / [`AnimationHandle`] - Cancellation handles
//! - [`TaskError`] - Failure raised by a task body
//! - [`SchedulerError`] - Errors rejected at scheduling time
//! - [`TaskExecutionError`] - Failure report handed to the error sink
//!
//! # Examples
//!
//! ```
//! use core_types::{SchedulerError, TaskError, TaskKind};
//!
//! let error = TaskError::thrown("Visa request rejected");
//! assert_eq!(error.message, "Visa request rejected");
//!
//! let rejected = SchedulerError::InvalidDelay { delay_ms: -1 };
//! assert!(matches!(rejected, SchedulerError::InvalidDelay { .. }));
//! assert_eq!(TaskKind::Micro.to_string(), "micro");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod task;

pub use error::{ErrorKind, SchedulerError, TaskError, TaskExecutionError, TaskResult};
pub use task::{AnimationHandle, Millis, TaskKind, TimerHandle};
