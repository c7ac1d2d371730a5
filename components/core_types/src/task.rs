//! Task classes and the handles used to cancel queued work.

use std::fmt;

/// Logical time in milliseconds.
pub type Millis = u64;

/// The queue a task belongs to.
///
/// Microtasks always drain before anything else runs. Animation callbacks
/// run in render passes, after the iteration's macrotask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Timer callbacks and other coarse-grained work, one per loop iteration
    Macro,
    /// Promise reactions and other continuations, drained after every macrotask
    Micro,
    /// Callbacks run once per render pass
    Animation,
    /// The render step that closes a render pass
    Render,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Macro => "macro",
            TaskKind::Micro => "micro",
            TaskKind::Animation => "animation",
            TaskKind::Render => "render",
        };
        f.write_str(name)
    }
}

/// Identifies a pending one-shot or repeating macrotask.
///
/// Handles are issued in increasing order by a single event loop and are
/// never reused, so a stale handle can never cancel somebody else's timer.
///
/// # Examples
///
/// ```
/// use core_types::TimerHandle;
///
/// let first = TimerHandle::new(1);
/// let second = TimerHandle::new(2);
/// assert!(first < second);
/// assert_eq!(first.id(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wraps a raw timer id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw timer id.
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Identifies a queued animation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationHandle(u64);

impl AnimationHandle {
    /// Wraps a raw callback id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw callback id.
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-callback#{}", self.0)
    }
}
