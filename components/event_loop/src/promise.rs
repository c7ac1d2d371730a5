//! Promises layered on the event loop.
//!
//! This module provides a single-threaded Promise whose reactions always
//! run as microtasks. The loop itself knows nothing about promises: a
//! promise is just a shared cell plus the microtasks it queues once it
//! settles.

use crate::EventLoop;
use core_types::{SchedulerError, TaskError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been resolved with a value.
    Fulfilled,
    /// The promise has been rejected with an error.
    Rejected,
}

/// The outcome a settled promise hands to its reactions.
pub type Settlement<T> = Result<T, TaskError>;

type Reaction<T> = Box<dyn FnOnce(&mut EventLoop, Settlement<T>)>;

enum Slot<T> {
    Pending(Vec<Reaction<T>>),
    Fulfilled(T),
    Rejected(TaskError),
}

/// A value that becomes available later.
///
/// Cloning a Promise yields another handle to the same underlying state.
/// Reactions registered with [`then`](Self::then) and friends run as
/// microtasks, so they always run after the code that registered them and
/// before the next macrotask.
///
/// # Examples
///
/// ```
/// use event_loop::{EventLoop, Promise, PromiseState};
///
/// let mut event_loop = EventLoop::new();
///
/// let visa = Promise::after(&mut event_loop, 3000, "visa").unwrap();
/// let money = visa.then(&mut event_loop, |_visa| Ok(2000));
///
/// event_loop.run();
/// assert_eq!(money.state(), PromiseState::Fulfilled);
/// assert_eq!(money.value(), Some(2000));
/// ```
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Promise<T> {
    /// Returns the current state.
    pub fn state(&self) -> PromiseState {
        match &*self.slot.borrow() {
            Slot::Pending(_) => PromiseState::Pending,
            Slot::Fulfilled(_) => PromiseState::Fulfilled,
            Slot::Rejected(_) => PromiseState::Rejected,
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Promise {{ state: {:?} }}", self.state())
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Creates a new pending Promise.
    pub fn pending() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Pending(Vec::new()))),
        }
    }

    /// Creates a Promise already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Fulfilled(value))),
        }
    }

    /// Creates a Promise already rejected with `error`.
    pub fn rejected(error: TaskError) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Rejected(error))),
        }
    }

    /// Returns a Promise fulfilled with `value` by a one-shot timer
    /// `delay_ms` from now.
    pub fn after(
        event_loop: &mut EventLoop,
        delay_ms: i64,
        value: T,
    ) -> Result<Self, SchedulerError> {
        let promise = Self::pending();
        let target = promise.clone();
        event_loop.schedule_macro(delay_ms, move |event_loop| {
            target.resolve(event_loop, value);
            Ok(())
        })?;
        Ok(promise)
    }

    /// Returns the fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &*self.slot.borrow() {
            Slot::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the rejection reason, if rejected.
    pub fn error(&self) -> Option<TaskError> {
        match &*self.slot.borrow() {
            Slot::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Fulfills the Promise. No-op if it is already settled.
    pub fn resolve(&self, event_loop: &mut EventLoop, value: T) {
        self.settle(event_loop, Ok(value));
    }

    /// Rejects the Promise. No-op if it is already settled.
    pub fn reject(&self, event_loop: &mut EventLoop, error: TaskError) {
        self.settle(event_loop, Err(error));
    }

    /// Settles the Promise with `outcome` and queues one microtask per
    /// registered reaction. No-op if it is already settled.
    pub fn settle(&self, event_loop: &mut EventLoop, outcome: Settlement<T>) {
        let reactions = {
            let mut slot = self.slot.borrow_mut();
            let Slot::Pending(reactions) = &mut *slot else {
                return;
            };
            let reactions = std::mem::take(reactions);
            *slot = match &outcome {
                Ok(value) => Slot::Fulfilled(value.clone()),
                Err(error) => Slot::Rejected(error.clone()),
            };
            reactions
        };

        for reaction in reactions {
            let outcome = outcome.clone();
            event_loop.queue_micro(move |event_loop| {
                reaction(event_loop, outcome);
                Ok(())
            });
        }
    }

    fn subscribe<F>(&self, event_loop: &mut EventLoop, reaction: F)
    where
        F: FnOnce(&mut EventLoop, Settlement<T>) + 'static,
    {
        let outcome = match &mut *self.slot.borrow_mut() {
            Slot::Pending(reactions) => {
                reactions.push(Box::new(reaction));
                return;
            }
            Slot::Fulfilled(value) => Ok(value.clone()),
            Slot::Rejected(error) => Err(error.clone()),
        };
        event_loop.queue_micro(move |event_loop| {
            reaction(event_loop, outcome);
            Ok(())
        });
    }

    /// Registers a fulfillment handler.
    ///
    /// Returns a new Promise settled with the handler's result. A rejection
    /// skips the handler and passes through unchanged.
    pub fn then<U, F>(&self, event_loop: &mut EventLoop, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, TaskError> + 'static,
    {
        let derived = Promise::pending();
        let target = derived.clone();
        self.subscribe(event_loop, move |event_loop, outcome| {
            target.settle(event_loop, outcome.and_then(on_fulfilled));
        });
        derived
    }

    /// Registers a fulfillment handler that continues with another promise,
    /// such as one returned by [`Promise::after`].
    pub fn then_promise<U, F>(&self, event_loop: &mut EventLoop, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(&mut EventLoop, T) -> Promise<U> + 'static,
    {
        let derived = Promise::pending();
        let target = derived.clone();
        self.subscribe(event_loop, move |event_loop, outcome| match outcome {
            Ok(value) => {
                let next = on_fulfilled(event_loop, value);
                next.subscribe(event_loop, move |event_loop, outcome| {
                    target.settle(event_loop, outcome);
                });
            }
            Err(error) => target.settle(event_loop, Err(error)),
        });
        derived
    }

    /// Registers a rejection handler. A fulfillment passes through unchanged.
    pub fn catch<F>(&self, event_loop: &mut EventLoop, on_rejected: F) -> Promise<T>
    where
        F: FnOnce(TaskError) -> Result<T, TaskError> + 'static,
    {
        let derived = Promise::pending();
        let target = derived.clone();
        self.subscribe(event_loop, move |event_loop, outcome| {
            target.settle(event_loop, outcome.or_else(on_rejected));
        });
        derived
    }

    /// Registers a handler that runs on either outcome; the outcome itself
    /// passes through unchanged.
    pub fn finally<F>(&self, event_loop: &mut EventLoop, on_settled: F) -> Promise<T>
    where
        F: FnOnce() + 'static,
    {
        let derived = Promise::pending();
        let target = derived.clone();
        self.subscribe(event_loop, move |event_loop, outcome| {
            on_settled();
            target.settle(event_loop, outcome);
        });
        derived
    }

    /// Fulfills with every value in input order once all inputs fulfill, or
    /// rejects with the first rejection.
    pub fn all(event_loop: &mut EventLoop, promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
        if promises.is_empty() {
            return Promise::resolved(Vec::new());
        }

        let combined = Promise::pending();
        let values = Rc::new(RefCell::new(vec![None; promises.len()]));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.into_iter().enumerate() {
            let target = combined.clone();
            let values = Rc::clone(&values);
            let remaining = Rc::clone(&remaining);
            promise.subscribe(event_loop, move |event_loop, outcome| match outcome {
                Ok(value) => {
                    values.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values = values.borrow_mut().drain(..).flatten().collect();
                        target.resolve(event_loop, values);
                    }
                }
                Err(error) => target.reject(event_loop, error),
            });
        }
        combined
    }

    /// Fulfills with every input's outcome, in input order, once all inputs
    /// have settled. Never rejects.
    pub fn all_settled(
        event_loop: &mut EventLoop,
        promises: Vec<Promise<T>>,
    ) -> Promise<Vec<Settlement<T>>> {
        if promises.is_empty() {
            return Promise::resolved(Vec::new());
        }

        let combined = Promise::pending();
        let outcomes = Rc::new(RefCell::new(vec![None; promises.len()]));
        let remaining = Rc::new(Cell::new(promises.len()));

        for (index, promise) in promises.into_iter().enumerate() {
            let target = combined.clone();
            let outcomes = Rc::clone(&outcomes);
            let remaining = Rc::clone(&remaining);
            promise.subscribe(event_loop, move |event_loop, outcome| {
                outcomes.borrow_mut()[index] = Some(outcome);
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let outcomes = outcomes.borrow_mut().drain(..).flatten().collect();
                    target.resolve(event_loop, outcomes);
                }
            });
        }
        combined
    }

    /// Settles like whichever input settles first.
    ///
    /// An empty input never settles.
    pub fn race(event_loop: &mut EventLoop, promises: Vec<Promise<T>>) -> Promise<T> {
        let winner = Promise::pending();
        for promise in promises {
            let target = winner.clone();
            promise.subscribe(event_loop, move |event_loop, outcome| {
                target.settle(event_loop, outcome);
            });
        }
        winner
    }
}
