//! Task, microtask and animation queues.
//!
//! This module provides the three queues the event loop dispatches from.
//! Timers are ordered by due time with enqueue order as the tie-break;
//! microtasks and animation callbacks are plain FIFOs.

use crate::EventLoop;
use core_types::{AnimationHandle, Millis, TaskResult, TimerHandle};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// A one-shot task body. It receives the loop so it can schedule continuations.
pub type TaskFn = Box<dyn FnOnce(&mut EventLoop) -> TaskResult>;

/// A repeating task body, invoked once per interval firing.
pub type RepeatingFn = Box<dyn FnMut(&mut EventLoop) -> TaskResult>;

/// The body of a timer.
pub enum TimerCallback {
    /// Runs once and is discarded
    Once(TaskFn),
    /// Runs every `period` milliseconds until cancelled
    Repeating {
        /// Distance between the start of two consecutive firings
        period: Millis,
        /// The body
        callback: RepeatingFn,
    },
}

impl std::fmt::Debug for TimerCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerCallback::Once(_) => write!(f, "Once {{ ... }}"),
            TimerCallback::Repeating { period, .. } => {
                write!(f, "Repeating {{ period: {}, ... }}", period)
            }
        }
    }
}

/// A macrotask waiting in the timer queue.
#[derive(Debug)]
pub struct Timer {
    /// Handle returned to the scheduling caller
    pub handle: TimerHandle,
    /// Logical time the delay is counted from: the enqueue time, or the
    /// start of the previous firing for an interval
    pub scheduled_at: Millis,
    /// Requested delay (or period) in milliseconds
    pub delay: Millis,
    /// Earliest time the timer may fire
    pub due_at: Millis,
    /// The body to run
    pub callback: TimerCallback,
    seq: u64,
}

impl Timer {
    /// Creates a timer due at `scheduled_at + delay`.
    pub fn new(
        handle: TimerHandle,
        scheduled_at: Millis,
        delay: Millis,
        callback: TimerCallback,
    ) -> Self {
        Self {
            handle,
            scheduled_at,
            delay,
            due_at: scheduled_at.saturating_add(delay),
            callback,
            seq: 0,
        }
    }

    /// Creates the next firing of an interval whose previous firing started
    /// at `started_at`.
    ///
    /// The firing is due one period after that start, or at `now` if that
    /// time has already passed.
    pub fn next_firing(
        handle: TimerHandle,
        started_at: Millis,
        now: Millis,
        period: Millis,
        callback: RepeatingFn,
    ) -> Self {
        let mut timer = Self::new(
            handle,
            started_at,
            period,
            TimerCallback::Repeating { period, callback },
        );
        timer.due_at = timer.due_at.max(now);
        timer
    }

    /// Returns true for interval timers.
    pub fn is_repeating(&self) -> bool {
        matches!(self.callback, TimerCallback::Repeating { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerEntry {
    due_at: Millis,
    seq: u64,
    handle: TimerHandle,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending macrotasks ordered by `(due_at, enqueue order)`.
///
/// Cancellation removes the timer body immediately; its heap entry goes
/// stale and is discarded the next time it reaches the top.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    timers: HashMap<TimerHandle, Timer>,
    next_seq: u64,
}

impl TimerQueue {
    /// Creates a new empty TimerQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a timer. Each insertion takes a fresh position in enqueue order.
    pub fn insert(&mut self, mut timer: Timer) {
        timer.seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(TimerEntry {
            due_at: timer.due_at,
            seq: timer.seq,
            handle: timer.handle,
        }));
        self.timers.insert(timer.handle, timer);
    }

    /// Removes a pending timer, returning it if it was still queued.
    pub fn remove(&mut self, handle: TimerHandle) -> Option<Timer> {
        self.timers.remove(&handle)
    }

    /// Due time of the earliest live timer.
    pub fn next_due(&mut self) -> Option<Millis> {
        self.discard_stale();
        self.heap.peek().map(|Reverse(entry)| entry.due_at)
    }

    /// Removes and returns the earliest live timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<Timer> {
        self.discard_stale();
        let Reverse(entry) = *self.heap.peek()?;
        if entry.due_at > now {
            return None;
        }
        self.heap.pop();
        self.timers.remove(&entry.handle)
    }

    /// Returns true if no live timers remain.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of live timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    fn discard_stale(&mut self) {
        while let Some(&Reverse(entry)) = self.heap.peek() {
            let live = self
                .timers
                .get(&entry.handle)
                .is_some_and(|timer| timer.seq == entry.seq);
            if live {
                break;
            }
            self.heap.pop();
        }
    }
}

/// A microtask to be executed by the event loop.
///
/// Microtasks run after the current task completes and before the next
/// macrotask or render pass. Promise reactions are microtasks.
pub struct MicroTask {
    callback: TaskFn,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut EventLoop) -> TaskResult + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self, event_loop: &mut EventLoop) -> TaskResult {
        (self.callback)(event_loop)
    }
}

impl std::fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A queue for microtasks.
///
/// Microtasks are drained completely after each task, including the ones
/// enqueued while draining.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<MicroTask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A callback waiting for the next render pass.
pub struct AnimationCallback {
    /// Handle returned to the caller
    pub handle: AnimationHandle,
    callback: TaskFn,
}

impl AnimationCallback {
    /// Creates a new AnimationCallback from a closure.
    pub fn new<F>(handle: AnimationHandle, f: F) -> Self
    where
        F: FnOnce(&mut EventLoop) -> TaskResult + 'static,
    {
        Self {
            handle,
            callback: Box::new(f),
        }
    }

    /// Executes the callback.
    pub fn run(self, event_loop: &mut EventLoop) -> TaskResult {
        (self.callback)(event_loop)
    }
}

impl std::fmt::Debug for AnimationCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnimationCallback {{ handle: {}, ... }}", self.handle)
    }
}

/// Callbacks for the next render pass.
///
/// A render pass takes a [`snapshot`](Self::take_snapshot) of the queue;
/// callbacks queued while the snapshot runs wait for the following pass.
/// A handle stays live from enqueue until it is claimed for execution or
/// cancelled, so cancelling works for entries already in a snapshot.
#[derive(Debug, Default)]
pub struct AnimationQueue {
    pending: VecDeque<AnimationCallback>,
    live: HashSet<AnimationHandle>,
}

impl AnimationQueue {
    /// Creates a new empty AnimationQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback to the next snapshot.
    pub fn enqueue(&mut self, callback: AnimationCallback) {
        self.live.insert(callback.handle);
        self.pending.push_back(callback);
    }

    /// Marks a callback as cancelled. Returns false if it was not live.
    pub fn cancel(&mut self, handle: AnimationHandle) -> bool {
        let was_live = self.live.remove(&handle);
        if was_live {
            self.pending.retain(|callback| callback.handle != handle);
        }
        was_live
    }

    /// Takes every queued callback, leaving the queue empty.
    pub fn take_snapshot(&mut self) -> Vec<AnimationCallback> {
        self.pending.drain(..).collect()
    }

    /// Claims a snapshot entry for execution.
    ///
    /// Returns false if the callback was cancelled after the snapshot was taken.
    pub fn claim(&mut self, handle: AnimationHandle) -> bool {
        self.live.remove(&handle)
    }

    /// Returns true if no callbacks wait for the next pass.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of callbacks waiting for the next pass.
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
