//! Multi-thread integration tests for the bounded buffer.
//!
//! These exercise the buffer the way the original producer/consumer workload
//! does: several producer and consumer threads hammering one small buffer,
//! then checking that nothing was lost, duplicated, or reordered.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=weir=trace cargo test --features tracing -- --nocapture
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use weir::BoundedBuffer;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once).
fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        weir::init_tracing();
    });
}

#[test]
fn fifo_across_threads() {
    init_test_tracing();

    const ITEMS: i32 = 1000;

    let buffer = Arc::new(BoundedBuffer::new(4).unwrap());

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..ITEMS {
                buffer.put((i, i * 2));
            }
        })
    };

    for i in 0..ITEMS {
        assert_eq!(buffer.get(), (i, i * 2));
    }

    producer.join().unwrap();
    assert!(buffer.is_empty());
}

#[test]
fn multi_producer_multi_consumer_conservation() {
    init_test_tracing();

    const PRODUCERS: i32 = 4;
    const CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: i32 = 1000;
    const ITEMS_PER_CONSUMER: usize = 1000;

    let buffer = Arc::new(BoundedBuffer::new(8).unwrap());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer_id| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for seq in 0..ITEMS_PER_PRODUCER {
                    buffer.put((producer_id, seq));
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut taken = Vec::with_capacity(ITEMS_PER_CONSUMER);
                for _ in 0..ITEMS_PER_CONSUMER {
                    taken.push(buffer.get());
                }
                taken
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all_taken = Vec::with_capacity(PRODUCERS as usize * ITEMS_PER_PRODUCER as usize);
    for consumer in consumers {
        all_taken.extend(consumer.join().unwrap());
    }

    // The multiset of retrieved items must equal the multiset of inserted
    // items: every (producer, seq) pair exactly once.
    all_taken.sort_unstable();
    let mut expected = Vec::with_capacity(all_taken.len());
    for producer_id in 0..PRODUCERS {
        for seq in 0..ITEMS_PER_PRODUCER {
            expected.push((producer_id, seq));
        }
    }
    assert_eq!(all_taken, expected);

    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 8);
}

#[test]
fn put_on_full_buffer_blocks_until_get() {
    init_test_tracing();

    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    let pending_put_done = Arc::new(AtomicBool::new(false));

    buffer.put((1, 1));
    buffer.put((2, 2));

    let producer = {
        let buffer = Arc::clone(&buffer);
        let done = Arc::clone(&pending_put_done);
        thread::spawn(move || {
            buffer.put((3, 3));
            done.store(true, Ordering::SeqCst);
        })
    };

    // The third put must still be blocked after a grace period.
    thread::sleep(Duration::from_millis(100));
    assert!(!pending_put_done.load(Ordering::SeqCst));

    // One get frees one slot and releases the pending put.
    assert_eq!(buffer.get(), (1, 1));
    producer.join().unwrap();
    assert!(pending_put_done.load(Ordering::SeqCst));

    assert_eq!(buffer.get(), (2, 2));
    assert_eq!(buffer.get(), (3, 3));
}

#[test]
fn get_on_empty_buffer_blocks_until_put() {
    init_test_tracing();

    let buffer = Arc::new(BoundedBuffer::new(2).unwrap());
    let pending_get_done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let buffer = Arc::clone(&buffer);
        let done = Arc::clone(&pending_get_done);
        thread::spawn(move || {
            let item = buffer.get();
            done.store(true, Ordering::SeqCst);
            item
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!pending_get_done.load(Ordering::SeqCst));

    buffer.put((5, 9));
    assert_eq!(consumer.join().unwrap(), (5, 9));
    assert!(pending_get_done.load(Ordering::SeqCst));
}

#[test]
fn capacity_one_alternation() {
    init_test_tracing();

    const ROUNDS: i32 = 200;

    let buffer = Arc::new(BoundedBuffer::new(1).unwrap());

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..ROUNDS {
                buffer.put((i, -i));
            }
        })
    };

    // With a single slot every item passes through a full->empty cycle.
    for i in 0..ROUNDS {
        assert_eq!(buffer.get(), (i, -i));
    }

    producer.join().unwrap();
}
