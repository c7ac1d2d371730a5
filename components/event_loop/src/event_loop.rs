//! Event loop implementation.
//!
//! This module provides the scheduler that coordinates macrotask, microtask
//! and animation callback execution following the browser event loop model.

use crate::clock::{Clock, ManualClock};
use crate::config::{ConfigError, EventLoopConfig};
use crate::task_queue::{
    AnimationCallback, AnimationQueue, MicroTask, MicrotaskQueue, Timer, TimerCallback,
    TimerQueue,
};
use core_types::{
    AnimationHandle, Millis, SchedulerError, TaskError, TaskExecutionError, TaskKind, TaskResult,
    TimerHandle,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, trace, warn};

/// Receives every task failure caught at a dispatch site.
pub type ErrorSink = Box<dyn FnMut(TaskExecutionError)>;

/// Invoked once per render pass, after the pass's animation callbacks.
pub type RenderHook = Box<dyn FnMut(&RenderFrame)>;

/// Describes a completed render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFrame {
    /// Zero-based index of the pass
    pub index: u64,
    /// Logical time at which the pass started
    pub at: Millis,
    /// Number of animation callbacks the pass executed
    pub callbacks: usize,
}

/// What a single [`EventLoop::run_once`] iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    /// The macrotask dispatched, if any
    pub macrotask: Option<TimerHandle>,
    /// Microtasks executed across all drains of the iteration
    pub microtasks: usize,
    /// Animation callbacks executed by the render pass
    pub animations: usize,
    /// Whether a render pass ran
    pub rendered: bool,
    /// Task bodies that failed and were reported to the error sink
    pub failures: usize,
}

impl Tick {
    /// Returns true if the iteration found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.macrotask.is_none() && self.microtasks == 0 && !self.rendered
    }
}

/// Totals accumulated by [`EventLoop::run`] and [`EventLoop::run_until`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations executed
    pub iterations: u64,
    /// Macrotasks dispatched
    pub macrotasks: u64,
    /// Microtasks executed
    pub microtasks: u64,
    /// Animation callbacks executed
    pub animations: u64,
    /// Render passes performed
    pub frames: u64,
    /// Task failures reported to the error sink
    pub failures: u64,
}

impl RunSummary {
    fn record(&mut self, tick: &Tick) {
        self.iterations += 1;
        self.macrotasks += u64::from(tick.macrotask.is_some());
        self.microtasks += tick.microtasks as u64;
        self.animations += tick.animations as u64;
        self.frames += u64::from(tick.rendered);
        self.failures += tick.failures as u64;
    }
}

/// A single-threaded cooperative scheduler.
///
/// Each iteration (turn) of the loop:
/// 1. Drains microtasks left over from synchronous code
/// 2. Waits until a macrotask is due, or a render pass is due with
///    animation callbacks pending
/// 3. Takes the earliest due macrotask and executes it
/// 4. Drains all microtasks, including ones queued while draining
/// 5. Runs a render pass if the render cadence is due
///
/// Task bodies receive the loop itself, so continuations are scheduled
/// explicitly from inside the body. Errors and panics raised by bodies are
/// caught and handed to the error sink; they never stop the loop.
///
/// # Examples
///
/// ```
/// use event_loop::EventLoop;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let mut event_loop = EventLoop::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let l = log.clone();
/// event_loop
///     .schedule_macro(0, move |_| {
///         l.borrow_mut().push("timeout");
///         Ok(())
///     })
///     .unwrap();
///
/// let l = log.clone();
/// event_loop.queue_micro(move |_| {
///     l.borrow_mut().push("microtask");
///     Ok(())
/// });
///
/// event_loop.run();
/// assert_eq!(*log.borrow(), vec!["microtask", "timeout"]);
/// ```
pub struct EventLoop {
    config: EventLoopConfig,
    clock: Box<dyn Clock>,
    timers: TimerQueue,
    microtask_queue: MicrotaskQueue,
    animation_queue: AnimationQueue,
    next_timer_id: u64,
    next_animation_id: u64,
    next_frame_at: Millis,
    frame_count: u64,
    running_timer: Option<TimerHandle>,
    running_timer_cancelled: bool,
    dispatching: bool,
    stopped: bool,
    tick: Tick,
    error_sink: Option<ErrorSink>,
    render_hook: Option<RenderHook>,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues, the default config and a
    /// [`ManualClock`] at time zero.
    pub fn new() -> Self {
        Self::build(EventLoopConfig::default(), Box::new(ManualClock::new()))
    }

    /// Creates a new EventLoop from a validated config.
    pub fn with_config(config: EventLoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, Box::new(ManualClock::new())))
    }

    /// Replaces the time source. The render schedule restarts from the new
    /// clock's current time.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.next_frame_at = clock.now().saturating_add(self.config.first_frame_at());
        self.clock = Box::new(clock);
        self
    }

    fn build(config: EventLoopConfig, clock: Box<dyn Clock>) -> Self {
        let next_frame_at = clock.now().saturating_add(config.first_frame_at());
        Self {
            config,
            clock,
            timers: TimerQueue::new(),
            microtask_queue: MicrotaskQueue::new(),
            animation_queue: AnimationQueue::new(),
            next_timer_id: 1,
            next_animation_id: 1,
            next_frame_at,
            frame_count: 0,
            running_timer: None,
            running_timer_cancelled: false,
            dispatching: false,
            stopped: false,
            tick: Tick::default(),
            error_sink: None,
            render_hook: None,
        }
    }

    /// Installs the error sink. Without one, failures are logged with
    /// `tracing::error!`.
    pub fn set_error_sink(&mut self, sink: impl FnMut(TaskExecutionError) + 'static) {
        self.error_sink = Some(Box::new(sink));
    }

    /// Installs the render step invoked at the end of every render pass.
    pub fn set_render_hook(&mut self, hook: impl FnMut(&RenderFrame) + 'static) {
        self.render_hook = Some(Box::new(hook));
    }

    /// Returns the loop's config.
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Returns the current time according to the loop's clock.
    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    /// Schedules a one-shot macrotask to fire no earlier than `now + delay_ms`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidDelay`] if `delay_ms` is negative. Nothing is
    /// enqueued in that case.
    pub fn schedule_macro<F>(&mut self, delay_ms: i64, f: F) -> Result<TimerHandle, SchedulerError>
    where
        F: FnOnce(&mut EventLoop) -> TaskResult + 'static,
    {
        let delay = to_millis(delay_ms)?;
        Ok(self.enqueue_timer(delay, TimerCallback::Once(Box::new(f))))
    }

    /// Schedules a repeating macrotask.
    ///
    /// The first firing is due at `now + period_ms`. Each later firing is due
    /// `period_ms` after the *start* of the previous one, or immediately if
    /// that time has already passed; missed firings are not replayed.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidDelay`] if `period_ms` is negative.
    pub fn schedule_interval<F>(
        &mut self,
        period_ms: i64,
        f: F,
    ) -> Result<TimerHandle, SchedulerError>
    where
        F: FnMut(&mut EventLoop) -> TaskResult + 'static,
    {
        let period = to_millis(period_ms)?;
        Ok(self.enqueue_timer(
            period,
            TimerCallback::Repeating {
                period,
                callback: Box::new(f),
            },
        ))
    }

    fn enqueue_timer(&mut self, delay: Millis, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::new(self.next_timer_id);
        self.next_timer_id += 1;
        let timer = Timer::new(handle, self.now(), delay, callback);
        trace!(%handle, due_at = timer.due_at, repeating = timer.is_repeating(), "timer scheduled");
        self.timers.insert(timer);
        handle
    }

    /// Cancels a pending timer.
    ///
    /// Cancelling an unknown, already fired or already cancelled handle is a
    /// no-op. Cancelling an interval from inside its own body stops every
    /// later firing.
    pub fn cancel(&mut self, handle: TimerHandle) {
        if self.timers.remove(handle).is_some() {
            trace!(%handle, "timer cancelled");
        } else if self.running_timer == Some(handle) {
            trace!(%handle, "running interval cancelled");
            self.running_timer_cancelled = true;
        } else {
            trace!(%handle, "cancel ignored for inactive timer");
        }
    }

    /// Adds a microtask. It runs after the current task returns and before
    /// the next macrotask or render pass.
    pub fn queue_micro<F>(&mut self, f: F)
    where
        F: FnOnce(&mut EventLoop) -> TaskResult + 'static,
    {
        self.microtask_queue.enqueue(MicroTask::new(f));
    }

    /// Adds a callback to the next render pass.
    ///
    /// Callbacks queued while a render pass is running go to the pass after it.
    pub fn queue_animation<F>(&mut self, f: F) -> AnimationHandle
    where
        F: FnOnce(&mut EventLoop) -> TaskResult + 'static,
    {
        let handle = AnimationHandle::new(self.next_animation_id);
        self.next_animation_id += 1;
        self.animation_queue.enqueue(AnimationCallback::new(handle, f));
        trace!(%handle, "animation callback queued");
        handle
    }

    /// Cancels a queued animation callback. Idempotent, like [`cancel`](Self::cancel).
    pub fn cancel_animation(&mut self, handle: AnimationHandle) {
        if !self.animation_queue.cancel(handle) {
            trace!(%handle, "cancel ignored for inactive animation callback");
        }
    }

    /// Asks [`run`](Self::run) or [`run_until`](Self::run_until) to return
    /// after the current iteration.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Returns true if [`stop`](Self::stop) was called during the current run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Returns the number of live timers.
    pub fn pending_macrotasks(&self) -> usize {
        self.timers.len()
    }

    /// Returns the number of queued microtasks.
    pub fn pending_microtasks(&self) -> usize {
        self.microtask_queue.len()
    }

    /// Returns the number of callbacks waiting for the next render pass.
    pub fn pending_animations(&self) -> usize {
        self.animation_queue.len()
    }

    /// Returns the number of render passes performed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns true if nothing is queued in any of the three queues.
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.microtask_queue.is_empty() && self.animation_queue.is_empty()
    }

    /// Executes exactly one iteration of the dispatch loop.
    ///
    /// Calling it from inside a task body is rejected with a warning and
    /// returns an idle tick.
    pub fn run_once(&mut self) -> Tick {
        self.step(None)
    }

    fn step(&mut self, wait_limit: Option<Millis>) -> Tick {
        if self.dispatching {
            warn!("run_once called from inside a task body; ignored");
            return Tick::default();
        }
        self.dispatching = true;
        self.tick = Tick::default();

        // User callbacks are isolated one by one; this resets the guard if
        // the clock itself panics.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.iterate(wait_limit)));
        self.dispatching = false;
        match outcome {
            Ok(()) => std::mem::take(&mut self.tick),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn iterate(&mut self, wait_limit: Option<Millis>) {
        self.drain_microtasks();

        let now = self.now();
        let next_timer = self.timers.next_due();
        if !next_timer.is_some_and(|due| due <= now) {
            let next_frame = (!self.animation_queue.is_empty()).then_some(self.next_frame_at);
            match earliest(next_timer, next_frame) {
                Some(wake_at) if wait_limit.map_or(true, |limit| wake_at <= limit) => {
                    self.clock.wait_until(wake_at)
                }
                _ => return,
            }
        }

        if let Some(timer) = self.timers.pop_due(self.now()) {
            self.dispatch_timer(timer);
            self.drain_microtasks();
        }

        if self.now() >= self.next_frame_at {
            self.render_pass();
        }
    }

    /// Runs iterations until [`stop`](Self::stop) is called or no work is
    /// left in any queue.
    pub fn run(&mut self) -> RunSummary {
        if self.dispatching {
            warn!("run called from inside a task body; ignored");
            return RunSummary::default();
        }
        self.stopped = false;
        let mut summary = RunSummary::default();
        while !self.stopped {
            let tick = self.run_once();
            summary.record(&tick);
            if self.is_idle() {
                break;
            }
        }
        debug!(?summary, "event loop finished");
        summary
    }

    /// Runs every iteration whose wake-up time is at or before `deadline`,
    /// then waits until `deadline`.
    ///
    /// This is how a never-ending interval is observed deterministically.
    /// A zero-period interval is always due, so it keeps this call busy
    /// until something calls [`stop`](Self::stop).
    pub fn run_until(&mut self, deadline: Millis) -> RunSummary {
        if self.dispatching {
            warn!("run_until called from inside a task body; ignored");
            return RunSummary::default();
        }
        self.stopped = false;
        let mut summary = RunSummary::default();
        while !self.stopped {
            match self.next_wake() {
                Some(wake_at) if wake_at <= deadline => {
                    let tick = self.step(Some(deadline));
                    summary.record(&tick);
                }
                _ => break,
            }
        }
        if !self.stopped {
            self.clock.wait_until(deadline);
        }
        summary
    }

    /// Earliest time at which [`run_once`](Self::run_once) has work to do.
    pub fn next_wake(&mut self) -> Option<Millis> {
        if !self.microtask_queue.is_empty() {
            return Some(self.now());
        }
        let next_frame = (!self.animation_queue.is_empty()).then_some(self.next_frame_at);
        earliest(self.timers.next_due(), next_frame)
    }

    fn dispatch_timer(&mut self, timer: Timer) {
        let Timer {
            handle,
            scheduled_at,
            callback,
            ..
        } = timer;
        let started_at = self.now();
        debug!(%handle, scheduled_at, started_at, "dispatching macrotask");
        self.tick.macrotask = Some(handle);

        match callback {
            TimerCallback::Once(f) => self.invoke(TaskKind::Macro, Some(handle), f),
            TimerCallback::Repeating {
                period,
                mut callback,
            } => {
                self.running_timer = Some(handle);
                self.running_timer_cancelled = false;
                self.invoke(TaskKind::Macro, Some(handle), |event_loop| {
                    callback(event_loop)
                });
                self.running_timer = None;

                if self.running_timer_cancelled {
                    self.running_timer_cancelled = false;
                    return;
                }
                let next =
                    Timer::next_firing(handle, started_at, self.now(), period, callback);
                self.timers.insert(next);
            }
        }
    }

    fn drain_microtasks(&mut self) {
        let limit = self.config.max_microtasks_per_drain;
        let mut ran = 0;
        while let Some(microtask) = self.microtask_queue.dequeue() {
            self.invoke(TaskKind::Micro, None, |event_loop| microtask.run(event_loop));
            ran += 1;
            if limit.is_some_and(|limit| ran >= limit) && !self.microtask_queue.is_empty() {
                warn!(
                    ran,
                    remaining = self.microtask_queue.len(),
                    "microtask drain limit reached; deferring the rest"
                );
                break;
            }
        }
        self.tick.microtasks += ran;
    }

    fn render_pass(&mut self) {
        let at = self.now();
        let snapshot = self.animation_queue.take_snapshot();
        let mut callbacks = 0;
        for callback in snapshot {
            if !self.animation_queue.claim(callback.handle) {
                continue;
            }
            self.invoke(TaskKind::Animation, None, |event_loop| callback.run(event_loop));
            callbacks += 1;
            self.drain_microtasks();
        }

        let frame = RenderFrame {
            index: self.frame_count,
            at,
            callbacks,
        };
        debug!(frame = frame.index, at, callbacks, "render pass");
        if let Some(hook) = self.render_hook.as_mut() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&frame))) {
                self.tick.failures += 1;
                self.report(TaskExecutionError {
                    task: TaskKind::Render,
                    handle: None,
                    at,
                    source: TaskError::from_panic(payload.as_ref()),
                });
            }
        }

        self.frame_count += 1;
        self.tick.animations += callbacks;
        self.tick.rendered = true;

        let interval = self.config.frame_interval_ms;
        let now = self.now();
        if now >= self.next_frame_at {
            let skipped = (now - self.next_frame_at) / interval + 1;
            self.next_frame_at = self.next_frame_at.saturating_add(skipped * interval);
        }
    }

    fn invoke<F>(&mut self, task: TaskKind, handle: Option<TimerHandle>, f: F)
    where
        F: FnOnce(&mut EventLoop) -> TaskResult,
    {
        let at = self.now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        let source = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => TaskError::from_panic(payload.as_ref()),
        };
        self.tick.failures += 1;
        self.report(TaskExecutionError {
            task,
            handle,
            at,
            source,
        });
    }

    fn report(&mut self, failure: TaskExecutionError) {
        let Some(sink) = self.error_sink.as_mut() else {
            error!(%failure, "task failed");
            return;
        };
        let summary = failure.to_string();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink(failure))) {
            let panic = TaskError::from_panic(payload.as_ref());
            error!(failure = %summary, %panic, "error sink panicked");
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("timers", &self.timers.len())
            .field("microtasks", &self.microtask_queue.len())
            .field("animations", &self.animation_queue.len())
            .field("next_frame_at", &self.next_frame_at)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

fn to_millis(delay_ms: i64) -> Result<Millis, SchedulerError> {
    Millis::try_from(delay_ms).map_err(|_| SchedulerError::InvalidDelay { delay_ms })
}

fn earliest(a: Option<Millis>, b: Option<Millis>) -> Option<Millis> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
