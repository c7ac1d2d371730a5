//! Unit tests for Promise

use event_loop::{EventLoop, Promise, PromiseState, TaskError};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn resolve_fulfills_pending_promise() {
    let mut event_loop = EventLoop::new();
    let promise = Promise::pending();
    promise.resolve(&mut event_loop, "done!");
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.value(), Some("done!"));
}

#[test]
fn reject_sets_error() {
    let mut event_loop = EventLoop::new();
    let promise: Promise<()> = Promise::pending();
    promise.reject(&mut event_loop, TaskError::rejected("expired"));
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert_eq!(promise.error().unwrap().message, "expired");
}

#[test]
fn then_chain_transforms_value() {
    let mut event_loop = EventLoop::new();
    let promise = Promise::after(&mut event_loop, 1000, "done!".to_string()).unwrap();

    let result = promise
        .then(&mut event_loop, |r| Ok(r + "-> then"))
        .then(&mut event_loop, |r| Ok(r + "-> then 2"));

    event_loop.run();
    assert_eq!(result.value().as_deref(), Some("done!-> then-> then 2"));
}

#[test]
fn reactions_run_before_next_macrotask() {
    let mut event_loop = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = log.clone();
    event_loop
        .schedule_macro(0, move |el| {
            l.borrow_mut().push("timeout 1");
            let l = l.clone();
            Promise::resolved(()).then(el, move |()| {
                l.borrow_mut().push("then");
                Ok(())
            });
            Ok(())
        })
        .unwrap();
    let l = log.clone();
    event_loop
        .schedule_macro(0, move |_| {
            l.borrow_mut().push("timeout 2");
            Ok(())
        })
        .unwrap();

    event_loop.run();
    assert_eq!(*log.borrow(), vec!["timeout 1", "then", "timeout 2"]);
}

#[test]
fn handlers_registered_on_same_promise_run_in_order() {
    let mut event_loop = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let promise = Promise::pending();

    for n in 1..=3 {
        let l = log.clone();
        promise.then(&mut event_loop, move |v: i32| {
            l.borrow_mut().push(v * n);
            Ok(())
        });
    }
    promise.resolve(&mut event_loop, 10);
    event_loop.run();

    assert_eq!(*log.borrow(), vec![10, 20, 30]);
}

#[test]
fn error_in_handler_rejects_derived_promise() {
    let mut event_loop = EventLoop::new();
    let visa = Promise::resolved(None::<&str>);

    let money = visa.then(&mut event_loop, |visa| match visa {
        Some(_) => Ok(2000),
        None => Err(TaskError::thrown(
            "You vacation request was rejected by your manager!",
        )),
    });
    let ticket = money.then(&mut event_loop, |_money| Ok("ticket"));

    event_loop.run();
    assert_eq!(ticket.state(), PromiseState::Rejected);
    assert!(ticket.error().unwrap().message.contains("rejected by your manager"));
}

#[test]
fn finally_runs_on_both_outcomes() {
    let mut event_loop = EventLoop::new();
    let calls = Rc::new(RefCell::new(0));

    let ok: Promise<u8> = Promise::resolved(1);
    let failed: Promise<u8> = Promise::rejected(TaskError::rejected("no"));

    let c = calls.clone();
    let after_ok = ok.finally(&mut event_loop, move || *c.borrow_mut() += 1);
    let c = calls.clone();
    let after_failed = failed.finally(&mut event_loop, move || *c.borrow_mut() += 1);

    event_loop.run();
    assert_eq!(*calls.borrow(), 2);
    assert_eq!(after_ok.value(), Some(1));
    assert_eq!(after_failed.state(), PromiseState::Rejected);
}

#[test]
fn then_promise_waits_for_inner_timer() {
    let mut event_loop = EventLoop::new();
    let ticket = Promise::resolved(2000_i64);

    let boarded = ticket.then_promise(&mut event_loop, |el, time_to_flight| {
        Promise::after(el, time_to_flight, "on board").unwrap()
    });

    event_loop.run_until(1999);
    assert_eq!(boarded.state(), PromiseState::Pending);

    event_loop.run();
    assert_eq!(boarded.value(), Some("on board"));
    assert_eq!(event_loop.now(), 2000);
}

#[test]
fn all_keeps_input_order() {
    let mut event_loop = EventLoop::new();
    let jobs: Vec<_> = [("a", 2000), ("b", 1000), ("c", 3000)]
        .into_iter()
        .map(|(name, time)| Promise::after(&mut event_loop, time, name).unwrap())
        .collect();

    let all = Promise::all(&mut event_loop, jobs);
    event_loop.run();

    assert_eq!(all.value(), Some(vec!["a", "b", "c"]));
    assert_eq!(event_loop.now(), 3000);
}

#[test]
fn all_rejects_on_first_rejection() {
    let mut event_loop = EventLoop::new();
    let slow = Promise::after(&mut event_loop, 100, 1).unwrap();
    let failed = Promise::pending();
    let f = failed.clone();
    event_loop
        .schedule_macro(10, move |el| {
            f.reject(el, TaskError::rejected("b failed"));
            Ok(())
        })
        .unwrap();

    let all = Promise::all(&mut event_loop, vec![slow, failed]);
    event_loop.run_until(50);
    assert_eq!(all.error().unwrap().message, "b failed");
}

#[test]
fn race_settles_with_fastest() {
    let mut event_loop = EventLoop::new();
    let jobs: Vec<_> = [("a", 2000), ("b", 1000), ("c", 3000)]
        .into_iter()
        .map(|(name, time)| Promise::after(&mut event_loop, time, name).unwrap())
        .collect();

    let first = Promise::race(&mut event_loop, jobs);
    event_loop.run();
    assert_eq!(first.value(), Some("b"));
}

#[test]
fn after_rejects_negative_delay() {
    let mut event_loop = EventLoop::new();
    assert!(Promise::after(&mut event_loop, -1, ()).is_err());
}

#[test]
fn all_settled_reports_every_outcome_in_input_order() {
    let mut event_loop = EventLoop::new();
    let slow = Promise::after(&mut event_loop, 3000, "c").unwrap();
    let failed = Promise::pending();
    let f = failed.clone();
    event_loop
        .schedule_macro(1000, move |el| {
            f.reject(el, TaskError::rejected("b failed"));
            Ok(())
        })
        .unwrap();
    let fast = Promise::after(&mut event_loop, 2000, "a").unwrap();

    let settled = Promise::all_settled(&mut event_loop, vec![fast, failed, slow]);
    event_loop.run_until(2500);
    assert_eq!(settled.state(), PromiseState::Pending);

    event_loop.run();
    assert_eq!(
        settled.value(),
        Some(vec![
            Ok("a"),
            Err(TaskError::rejected("b failed")),
            Ok("c"),
        ])
    );
}
