use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use slotnet_lanes::{LaneScheduler, WorkQueue, INBOUND_LANE};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 2_000;

#[test]
fn concurrent_enqueue_and_drain_loses_and_duplicates_nothing() {
    let queue = Arc::new(WorkQueue::new());
    let done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut seen = Vec::with_capacity(PRODUCERS * PER_PRODUCER);
            loop {
                let finished = done.load(Ordering::Acquire);
                queue.drain_to_staging();
                while let Some(item) = queue.dequeue_staged() {
                    seen.push(item);
                }
                if finished && queue.incoming_len() == 0 && queue.staged_len() == 0 {
                    return seen;
                }
                thread::yield_now();
            }
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.enqueue((p, i)).expect("enqueue should succeed");
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer should finish");
    }
    done.store(true, Ordering::Release);
    let seen = consumer.join().expect("consumer should finish");

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "no item may be delivered twice");

    // Per-producer order survives both stages.
    for p in 0..PRODUCERS {
        let order: Vec<usize> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "producer {p} reordered");
    }
}

#[test]
fn scheduler_runs_every_request_exactly_once() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime should build");
    let scheduler = Arc::new(
        LaneScheduler::new(2, runtime.handle().clone()).expect("scheduler should build"),
    );
    let ran = Arc::new(Mutex::new(Vec::new()));
    const TOTAL: usize = 200;

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let scheduler = Arc::clone(&scheduler);
            let ran = Arc::clone(&ran);
            thread::spawn(move || {
                for i in 0..TOTAL / 4 {
                    let ran = Arc::clone(&ran);
                    scheduler
                        .request_work(INBOUND_LANE, move || ran.lock().unwrap().push((p, i)))
                        .expect("request should succeed");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer should finish");
    }

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while ran.lock().unwrap().len() < TOTAL {
        assert!(std::time::Instant::now() < deadline, "work did not finish");
        scheduler.tick();
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));

    let ran = ran.lock().unwrap();
    assert_eq!(ran.len(), TOTAL);
    let unique: HashSet<_> = ran.iter().copied().collect();
    assert_eq!(unique.len(), TOTAL);
    assert_eq!(scheduler.stats(INBOUND_LANE).unwrap().executed, TOTAL as u64);
}
