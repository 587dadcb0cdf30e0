//! End-to-end concurrency scenarios: a rendezvous handoff across two threads
//! and a task pool draining under concurrent submission.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use kestrel_core::{Channel, Error, TaskPool};

#[test]
fn rendezvous_channel_hands_off_two_values_in_order() {
    let channel = Arc::new(Channel::new(0));
    let sender = Arc::clone(&channel);

    let handle = thread::spawn(move || {
        sender.send(10).unwrap();
        sender.send(20).unwrap();
    });

    assert_eq!(channel.receive(), (Some(10), true));
    assert_eq!(channel.receive(), (Some(20), true));
    handle.join().unwrap();

    channel.close();
    assert_eq!(channel.receive(), (None, false));
}

#[test]
fn bounded_channel_never_exceeds_capacity_under_concurrent_senders() {
    const CAPACITY: usize = 4;
    let channel = Arc::new(Channel::new(CAPACITY));

    let senders: Vec<_> = (0..8)
        .map(|i| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.send(i).unwrap())
        })
        .collect();

    let mut received = Vec::new();
    while received.len() < 8 {
        let (value, ok) = channel.receive();
        assert!(ok);
        received.push(value.unwrap());
    }
    for handle in senders {
        handle.join().unwrap();
    }
    received.sort_unstable();
    assert_eq!(received, (0..8).collect::<Vec<_>>());
}

#[test]
fn task_pool_drains_all_work_submitted_from_multiple_threads() {
    let pool = Arc::new(TaskPool::new(4));
    let completed = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                for _ in 0..25 {
                    let completed = Arc::clone(&completed);
                    pool.submit(move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in submitters {
        handle.join().unwrap();
    }
    pool.wait_idle();
    assert_eq!(completed.load(Ordering::SeqCst), 100);
}

#[test]
fn closing_a_channel_is_idempotent_and_fails_subsequent_sends() {
    let channel: Channel<i32> = Channel::new(1);
    channel.close();
    channel.close();
    assert_eq!(channel.send(1), Err(Error::ClosedChannel));
}
