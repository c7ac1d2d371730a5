//! Queue priority scenarios: microtasks before rendering before the next macrotask

use event_loop::{EventLoop, EventLoopConfig, ManualClock, Promise, RenderFrame, TaskResult};
use integration_tests::transcript::Transcript;
use std::cell::RefCell;
use std::rc::Rc;

fn log(out: &Transcript, line: &str) -> TaskResult {
    out.log(line);
    Ok(())
}

#[test]
fn sync_then_micro_then_timeout_then_animation() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    event_loop.schedule_macro(0, move |_| log(&o, "timeout")).unwrap();
    let o = out.clone();
    event_loop.queue_animation(move |_| log(&o, "animation"));
    let o = out.clone();
    event_loop.queue_micro(move |_| log(&o, "micro"));
    out.log("sync");

    event_loop.run();
    assert_eq!(out.lines(), vec!["sync", "micro", "timeout", "animation"]);
}

#[test]
fn work_queued_by_a_macrotask_follows_queue_priority() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    event_loop
        .schedule_macro(0, move |el| {
            log(&o, "t1")?;
            let a = o.clone();
            el.queue_animation(move |_| log(&a, "a1"));
            let t = o.clone();
            el.schedule_macro(0, move |_| log(&t, "t2"))?;
            let m = o.clone();
            el.queue_micro(move |_| log(&m, "m1"));
            Ok(())
        })
        .unwrap();

    event_loop.run();
    assert_eq!(out.lines(), vec!["t1", "m1", "t2", "a1"]);
}

#[test]
fn microtasks_queued_by_microtasks_drain_in_the_same_checkpoint() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    event_loop
        .schedule_macro(0, move |_| log(&o, "timeout"))
        .unwrap();
    let o = out.clone();
    event_loop.queue_micro(move |el| {
        log(&o, "m1")?;
        let o = o.clone();
        el.queue_micro(move |el| {
            log(&o, "m2")?;
            let o = o.clone();
            el.queue_micro(move |_| log(&o, "m3"));
            Ok(())
        });
        Ok(())
    });

    let tick = event_loop.run_once();
    assert_eq!(tick.microtasks, 3);
    assert_eq!(out.lines(), vec!["m1", "m2", "m3", "timeout"]);
}

#[test]
fn promise_reactions_interleave_with_timers_and_frames() {
    let mut event_loop = EventLoop::new();
    let out = Transcript::new();

    let o = out.clone();
    event_loop.queue_animation(move |_| log(&o, "frame 16"));
    let o = out.clone();
    event_loop
        .schedule_macro(10, move |el| {
            log(&o, "timeout 10")?;
            let o = o.clone();
            Promise::resolved(()).then(el, move |()| log(&o, "then after timeout 10"));
            Ok(())
        })
        .unwrap();
    let o = out.clone();
    event_loop
        .schedule_macro(20, move |_| log(&o, "timeout 20"))
        .unwrap();

    event_loop.run();
    assert_eq!(
        out.lines(),
        vec![
            "timeout 10",
            "then after timeout 10",
            "frame 16",
            "timeout 20",
        ]
    );
}

#[test]
fn busy_macrotask_delays_render_without_replaying_frames() {
    let clock = ManualClock::new();
    let config = EventLoopConfig::from_json(r#"{ "frame_interval_ms": 16 }"#).unwrap();
    let mut event_loop = EventLoop::with_config(config)
        .unwrap()
        .with_clock(clock.clone());
    let frames: Rc<RefCell<Vec<RenderFrame>>> = Rc::default();

    let f = frames.clone();
    event_loop.set_render_hook(move |frame| f.borrow_mut().push(frame.clone()));
    event_loop.queue_animation(|_| Ok(()));
    event_loop
        .schedule_macro(0, move |_| {
            // Blocks the loop for 50ms.
            clock.advance(50);
            Ok(())
        })
        .unwrap();

    event_loop.run();
    let frames = frames.borrow();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].at, 50);
    assert_eq!(frames[0].callbacks, 1);
}
