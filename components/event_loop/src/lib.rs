//! Cooperative event loop simulator.
//!
//! This crate provides a deterministic model of the browser event loop:
//! - Macrotasks (one-shot and repeating timers) ordered by due time
//! - Microtasks drained to empty after every macrotask
//! - Animation callbacks batched into fixed-cadence render passes
//! - Promises whose reactions run as microtasks
//!
//! # Overview
//!
//! - [`EventLoop`] - The scheduler and its dispatch loop
//! - [`Clock`] - Injectable time source ([`ManualClock`], [`MonotonicClock`])
//! - [`EventLoopConfig`] - Render cadence and drain limits
//! - [`Promise`] - Result-returning continuations composed on the loop
//!
//! # Examples
//!
//! ## Timers and microtasks
//!
//! ```
//! use event_loop::EventLoop;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let mut event_loop = EventLoop::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = log.clone();
//! let timer = event_loop
//!     .schedule_macro(1000, move |_| {
//!         l.borrow_mut().push("Hello");
//!         Ok(())
//!     })
//!     .unwrap();
//! event_loop.cancel(timer);
//!
//! let l = log.clone();
//! event_loop.queue_micro(move |_| {
//!     l.borrow_mut().push("I am executed first");
//!     Ok(())
//! });
//!
//! event_loop.run();
//! assert_eq!(*log.borrow(), vec!["I am executed first"]);
//! ```
//!
//! ## Intervals
//!
//! ```
//! use event_loop::EventLoop;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut event_loop = EventLoop::new();
//! let ticks = Rc::new(Cell::new(0));
//!
//! let t = ticks.clone();
//! let interval = event_loop
//!     .schedule_interval(2000, move |_| {
//!         t.set(t.get() + 1);
//!         Ok(())
//!     })
//!     .unwrap();
//! event_loop
//!     .schedule_macro(5000, move |event_loop| {
//!         event_loop.cancel(interval);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! event_loop.run();
//! assert_eq!(ticks.get(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod event_loop;
pub mod promise;
pub mod task_queue;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, EventLoopConfig, DEFAULT_FRAME_INTERVAL_MS};
pub use event_loop::{ErrorSink, EventLoop, RenderFrame, RenderHook, RunSummary, Tick};
pub use promise::{Promise, PromiseState, Settlement};
pub use task_queue::{
    AnimationCallback, AnimationQueue, MicroTask, MicrotaskQueue, RepeatingFn, TaskFn, Timer,
    TimerCallback, TimerQueue,
};

pub use core_types::{
    AnimationHandle, ErrorKind, Millis, SchedulerError, TaskError, TaskExecutionError, TaskKind,
    TaskResult, TimerHandle,
};
