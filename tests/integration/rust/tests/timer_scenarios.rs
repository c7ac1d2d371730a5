//! Timer scenarios: one-shot timeouts, clearing, intervals and nested chains

use event_loop::{EventLoop, TimerHandle};
use integration_tests::transcript::Transcript;
use std::cell::Cell;
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn timeout_runs_after_synchronous_code() {
    init_tracing();
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    event_loop
        .schedule_macro(2000, move |_| {
            o.log("Hello");
            Ok(())
        })
        .unwrap();
    out.log("I am executed first");

    event_loop.run();
    assert_eq!(out.lines(), vec!["I am executed first", "Hello"]);
    assert_eq!(event_loop.now(), 2000);
}

#[test]
fn zero_delay_timeouts_keep_scheduling_order() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    for n in 1..=3 {
        let o = out.clone();
        event_loop
            .schedule_macro(0, move |_| {
                o.log(format!("My name is John ({n})"));
                Ok(())
            })
            .unwrap();
    }
    out.log("script end");

    event_loop.run();
    assert_eq!(
        out.lines(),
        vec![
            "script end",
            "My name is John (1)",
            "My name is John (2)",
            "My name is John (3)",
        ]
    );
    assert_eq!(event_loop.now(), 0);
}

#[test]
fn cleared_timeout_is_silent() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    let timer = event_loop
        .schedule_macro(1000, move |_| {
            o.log("Hello");
            Ok(())
        })
        .unwrap();
    event_loop.cancel(timer);

    event_loop.run();
    assert!(out.lines().is_empty());
    assert!(event_loop.is_idle());
}

#[test]
fn interval_stopped_by_later_timeout() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    let interval = event_loop
        .schedule_interval(2000, move |el| {
            o.log(format!("Hello at {}", el.now()));
            Ok(())
        })
        .unwrap();
    let o = out.clone();
    event_loop
        .schedule_macro(5000, move |el| {
            el.cancel(interval);
            o.log(format!("cleared at {}", el.now()));
            Ok(())
        })
        .unwrap();

    let summary = event_loop.run();
    assert_eq!(
        out.lines(),
        vec!["Hello at 2000", "Hello at 4000", "cleared at 5000"]
    );
    assert_eq!(summary.macrotasks, 3);
    assert!(event_loop.is_idle());
}

fn tick(event_loop: &mut EventLoop, out: Transcript, current: Rc<Cell<Option<TimerHandle>>>) {
    let next = current.clone();
    let handle = event_loop
        .schedule_macro(2000, move |el| {
            out.log(format!("tick {}", el.now()));
            tick(el, out, next);
            Ok(())
        })
        .unwrap();
    current.set(Some(handle));
}

#[test]
fn nested_timeout_reschedules_itself_until_cleared() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();
    let current = Rc::new(Cell::new(None));

    tick(&mut event_loop, out.clone(), current.clone());
    event_loop.run_until(7000);
    assert_eq!(out.lines(), vec!["tick 2000", "tick 4000", "tick 6000"]);

    // Only the most recently issued handle is live.
    let live = current.get().unwrap();
    event_loop.cancel(live);
    event_loop.run();
    assert_eq!(out.lines().len(), 3);
    assert_eq!(event_loop.pending_macrotasks(), 0);
}

#[test]
fn callback_pyramid_carries_result_through_nested_timeouts() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    out.log("1");
    let o = out.clone();
    event_loop
        .schedule_macro(3000, move |el| {
            let result = Rc::new(Cell::new(5 * 5));
            o.log(result.get().to_string());

            let (o, r) = (o.clone(), result.clone());
            el.schedule_macro(0, move |el| {
                r.set(r.get() + 5);
                o.log(r.get().to_string());

                let (o, r) = (o.clone(), r.clone());
                el.schedule_macro(0, move |_| {
                    r.set(r.get() + 10);
                    o.log(r.get().to_string());
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    out.log("2");

    event_loop.run();
    assert_eq!(out.lines(), vec!["1", "2", "25", "30", "40"]);
    assert_eq!(event_loop.now(), 3000);
}
