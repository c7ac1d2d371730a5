//! Scheduler error types and task failure reporting.
//!
//! This module provides the error taxonomy shared by the event loop and the
//! code that schedules work on it: errors rejected at scheduling time, errors
//! returned by task bodies, and the report handed to the error sink.

use crate::{Millis, TaskKind, TimerHandle};
use thiserror::Error;

/// The kind of failure raised by a task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The task body returned an error
    Thrown,
    /// The task body panicked and the panic was caught at the dispatch site
    Panicked,
    /// A promise was rejected
    Rejected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Thrown => "thrown",
            ErrorKind::Panicked => "panicked",
            ErrorKind::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// An error raised by a task body.
///
/// Task bodies return `Result<(), TaskError>`; an `Err` is caught by the
/// event loop and forwarded to its error sink instead of propagating.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, TaskError};
///
/// let error = TaskError::thrown("Page not found");
///
/// assert_eq!(error.kind, ErrorKind::Thrown);
/// assert_eq!(error.to_string(), "thrown: Page not found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TaskError {
    /// The type of failure
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl TaskError {
    /// Creates a new TaskError of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An error returned by a task body.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Thrown, message)
    }

    /// A promise rejection reason.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, message)
    }

    /// Builds a TaskError from a caught panic payload.
    ///
    /// String payloads (from `panic!("...")`) keep their message; anything
    /// else is reported as an opaque panic.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };
        Self::new(ErrorKind::Panicked, message)
    }
}

/// Result type returned by every task body.
pub type TaskResult = Result<(), TaskError>;

/// Errors rejected synchronously by the scheduling API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A negative delay or period was supplied
    #[error("invalid delay {delay_ms}ms: delays and periods must not be negative")]
    InvalidDelay {
        /// The rejected delay
        delay_ms: i64,
    },
}

impl From<SchedulerError> for TaskError {
    fn from(error: SchedulerError) -> Self {
        Self::thrown(error.to_string())
    }
}

/// A task failure as reported to the event loop's error sink.
///
/// Produced at the dispatch site when a task body returns an error or
/// panics. The loop keeps running after reporting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{task} task failed at {at}ms: {source}")]
pub struct TaskExecutionError {
    /// Which queue the failing task came from
    pub task: TaskKind,
    /// Timer handle of the failing macrotask, if it had one
    pub handle: Option<TimerHandle>,
    /// Logical time at which the task started running
    pub at: Millis,
    /// The error raised by the task body
    pub source: TaskError,
}
