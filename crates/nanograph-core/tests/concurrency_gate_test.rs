//! Concurrency gate integration tests.
//!
//! Run with: `cargo test -p nanograph-core --test concurrency_gate_test`
//! Timing tests run on tokio's paused clock, so sleeps resolve instantly and
//! elapsed times are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use nanograph_core::{make_gate, ConcurrencyGate};
use tokio::time::{sleep, sleep_until, timeout, Instant};

/// Counts invocations currently inside the wrapped callable and the peak seen.
#[derive(Clone, Default)]
struct InFlightTracker {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl InFlightTracker {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_never_exceeds_capacity() {
    for capacity in 1..=4 {
        for callers in [1, capacity, capacity + 3, capacity * 3] {
            let gate = make_gate(capacity).unwrap();
            let tracker = InFlightTracker::default();
            let work = gate.wrap({
                let tracker = tracker.clone();
                move |ms: u64| {
                    let tracker = tracker.clone();
                    async move {
                        tracker.enter();
                        sleep(Duration::from_millis(ms)).await;
                        tracker.exit();
                    }
                }
            });

            join_all((0..callers).map(|i| work.call(10 + (i as u64 % 3) * 5))).await;

            assert!(
                tracker.peak() <= capacity,
                "peak {} exceeded capacity {} with {} callers",
                tracker.peak(),
                capacity,
                callers
            );
            assert_eq!(tracker.peak(), capacity.min(callers));
            assert_eq!(tracker.completed(), callers);
            assert_eq!(gate.available(), capacity);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_callers_within_capacity_are_admitted_immediately() {
    let gate = make_gate(4).unwrap();
    let origin = Instant::now();
    let work = gate.wrap(move |_: usize| async move {
        let started = origin.elapsed();
        sleep(Duration::from_millis(50)).await;
        started
    });

    let starts = join_all((0..4).map(|i| work.call(i))).await;

    assert!(starts.iter().all(|s| *s == Duration::ZERO));
    assert_eq!(origin.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_excess_callers_wait_for_completions() {
    let capacity = 3;
    let callers = 7;
    let gate = make_gate(capacity).unwrap();
    let origin = Instant::now();
    let work = gate.wrap(move |_: usize| async move {
        let started = origin.elapsed();
        sleep(Duration::from_millis(100)).await;
        started
    });

    let starts = join_all((0..callers).map(|i| work.call(i))).await;

    let immediate = starts.iter().filter(|s| **s == Duration::ZERO).count();
    assert_eq!(immediate, capacity);
    assert!(starts
        .iter()
        .filter(|s| **s > Duration::ZERO)
        .all(|s| *s >= Duration::from_millis(100)));
    assert_eq!(starts.len(), callers);
    // ceil(7 / 3) waves of 100ms
    assert_eq!(origin.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_two_slots_three_sleepers() {
    let gate = make_gate(2).unwrap();
    let origin = Instant::now();
    let sleeper = gate.wrap(move |id: &'static str| async move {
        let started = origin.elapsed();
        sleep(Duration::from_millis(100)).await;
        (id, started, origin.elapsed())
    });

    let results = join_all(["A", "B", "C"].map(|id| sleeper.call(id))).await;

    let (a, b, c) = (results[0], results[1], results[2]);
    assert_eq!(a.0, "A");
    assert_eq!(a.1, Duration::ZERO);
    assert_eq!(b.1, Duration::ZERO);
    assert_eq!(a.2, Duration::from_millis(100));
    assert_eq!(b.2, Duration::from_millis(100));

    assert_eq!(c.0, "C");
    assert!(c.1 >= Duration::from_millis(100));
    assert_eq!(c.2, Duration::from_millis(200));

    let total = origin.elapsed();
    assert!(total >= Duration::from_millis(200));
    assert!(total < Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_queued_callers_admitted_in_arrival_order() {
    let gate = make_gate(1).unwrap();
    let origin = Instant::now();
    let admitted = Arc::new(Mutex::new(Vec::new()));
    let work = gate.wrap({
        let admitted = admitted.clone();
        move |id: u32| {
            let admitted = admitted.clone();
            async move {
                admitted.lock().unwrap().push(id);
                sleep(Duration::from_millis(50)).await;
            }
        }
    });

    let mut handles = Vec::new();
    for id in 0..5 {
        let work = work.clone();
        handles.push(tokio::spawn(async move { work.call(id).await }));
        sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(*admitted.lock().unwrap(), vec![0]);
    assert_eq!(gate.in_flight(), 1);

    // Arrives as caller 0 frees the only slot, behind four queued callers.
    sleep_until(origin + Duration::from_millis(50)).await;
    work.call(99).await;

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*admitted.lock().unwrap(), vec![0, 1, 2, 3, 4, 99]);
    assert_eq!(origin.elapsed(), Duration::from_millis(300));
    assert_eq!(gate.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_releases_slot_for_next_caller() {
    let gate = make_gate(1).unwrap();
    let origin = Instant::now();
    let task = gate.wrap(move |fail: bool| async move {
        if fail {
            sleep(Duration::from_millis(50)).await;
            return Err(format!("failed at {:?}", origin.elapsed()));
        }
        let started = origin.elapsed();
        sleep(Duration::from_millis(10)).await;
        Ok(started)
    });

    let (first, second) = tokio::join!(task.call(true), task.call(false));

    assert_eq!(first, Err("failed at 50ms".to_string()));
    assert_eq!(second, Ok(Duration::from_millis(50)));
    assert_eq!(gate.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_capacity_failures_do_not_deadlock_next_call() {
    let capacity = 3;
    let gate = make_gate(capacity).unwrap();
    let task = gate.wrap(|fail: bool| async move {
        sleep(Duration::from_millis(20)).await;
        if fail {
            Err("provider unavailable")
        } else {
            Ok("done")
        }
    });

    let mut calls: Vec<_> = (0..capacity).map(|_| task.call(true)).collect();
    calls.push(task.call(false));

    let results = timeout(Duration::from_secs(1), join_all(calls))
        .await
        .expect("gate deadlocked after failing calls");

    assert_eq!(results.iter().filter(|r| r.is_err()).count(), capacity);
    assert_eq!(results[capacity], Ok("done"));
    assert_eq!(gate.available(), capacity);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_waiter_does_not_take_slot() {
    let gate = make_gate(1).unwrap();
    let work = gate.wrap(|ms: u64| async move {
        sleep(Duration::from_millis(ms)).await;
        ms
    });

    let holder = tokio::spawn({
        let work = work.clone();
        async move { work.call(1_000).await }
    });
    sleep(Duration::from_millis(10)).await;
    assert_eq!(gate.in_flight(), 1);

    let abandoned = timeout(Duration::from_millis(50), work.call(5)).await;
    assert!(abandoned.is_err());
    assert_eq!(gate.in_flight(), 1);

    assert_eq!(holder.await.unwrap(), 1_000);
    assert_eq!(gate.available(), 1);
    assert_eq!(work.call(5).await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_running_call_releases_slot() {
    let gate = make_gate(2).unwrap();
    let work = gate.wrap(|ms: u64| async move {
        sleep(Duration::from_millis(ms)).await;
    });

    let running = tokio::spawn({
        let work = work.clone();
        async move { work.call(60_000).await }
    });
    sleep(Duration::from_millis(10)).await;
    assert_eq!(gate.in_flight(), 1);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());
    assert_eq!(gate.in_flight(), 0);
    assert_eq!(gate.available(), 2);
}

#[tokio::test]
async fn test_panicking_call_releases_slot() {
    let gate = make_gate(1).unwrap();
    let work = gate.wrap(|explode: bool| async move {
        if explode {
            panic!("callable panicked");
        }
        "survived"
    });

    let exploded = tokio::spawn({
        let work = work.clone();
        async move { work.call(true).await }
    })
    .await;
    assert!(exploded.unwrap_err().is_panic());

    assert_eq!(gate.available(), 1);
    assert_eq!(work.call(false).await, "survived");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cap_holds_across_worker_threads() {
    let capacity = 3;
    let gate = make_gate(capacity).unwrap();
    let tracker = InFlightTracker::default();
    let work = gate.wrap({
        let tracker = tracker.clone();
        move |_: usize| {
            let tracker = tracker.clone();
            async move {
                tracker.enter();
                tokio::time::sleep(Duration::from_millis(5)).await;
                tracker.exit();
            }
        }
    });

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let work = work.clone();
            tokio::spawn(async move { work.call(i).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(tracker.peak() <= capacity);
    assert_eq!(tracker.completed(), 32);
    assert_eq!(gate.available(), capacity);
}

#[tokio::test]
async fn test_run_gates_one_off_futures() {
    let gate = ConcurrencyGate::default();
    let value = gate.run(async { 40 + 2 }).await;
    assert_eq!(value, 42);
    assert_eq!(gate.in_flight(), 0);
}
