//! Shared-counter synchronization microbenchmark.
//!
//! Several threads increment and decrement one shared counter, protected by
//! three different mechanisms in turn: a std mutex, a test-and-set spinlock,
//! and atomic add/sub. The increments and decrements are balanced, so every
//! strategy must finish with the counter at zero.
//!
//! Usage:
//!     cargo run --release --bin lock_bench
//!
//! Environment variables:
//!     BENCH_PIN=1   Pin worker threads round-robin across available CPUs

use std::cell::UnsafeCell;
use std::env;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use minstant::Instant;

/// Threads incrementing the shared counter.
const INC_THREADS: usize = 5;
/// Value added per increment.
const INCREMENT: i64 = 2;
/// Iterations per incrementing thread.
const INC_ITERATIONS: usize = 20_000;
/// Threads decrementing the shared counter.
const DEC_THREADS: usize = 4;
/// Value removed per decrement.
const DECREMENT: i64 = 2;
/// Iterations per decrementing thread, chosen so the total balances out.
const DEC_ITERATIONS: usize =
    INC_ITERATIONS * INC_THREADS * INCREMENT as usize / DEC_THREADS / DECREMENT as usize;

/// Test-and-set spinlock guarding a value.
///
/// Lock acquisition spins on an `AtomicBool` swap; no parking, no fairness.
/// Only suitable for the short critical sections in this benchmark.
struct SpinLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: SpinLock provides mutual exclusion: the value is only reachable
// through SpinGuard, and at most one guard exists at a time.
unsafe impl<T: Send> Sync for SpinLock<T> {}

struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> SpinLock<T> {
    const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    fn lock(&self) -> SpinGuard<'_, T> {
        // Swap returns the previous value; spin while it was already held.
        while self.locked.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }
        SpinGuard { lock: self }
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock, so no other thread can touch
        // the value until drop releases it.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, plus &mut self gives unique access to the guard.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

fn pin_workers() -> bool {
    env::var("BENCH_PIN").map(|v| v == "1").unwrap_or(false)
}

fn pin_to_cpu(worker: usize) {
    if let Some(ids) = core_affinity::get_core_ids() {
        let id = ids[worker % ids.len()];
        core_affinity::set_for_current(id);
    }
}

/// Runs one strategy: `INC_THREADS` workers calling `inc` and `DEC_THREADS`
/// workers calling `dec`, then returns the elapsed wall time and the final
/// counter value from `finish`.
fn run_case<S, I, D, F>(shared: S, inc: I, dec: D, finish: F) -> (f64, i64)
where
    S: Send + Sync + 'static,
    I: Fn(&S) + Send + Sync + 'static,
    D: Fn(&S) + Send + Sync + 'static,
    F: FnOnce(&S) -> i64,
{
    let shared = Arc::new(shared);
    let inc = Arc::new(inc);
    let dec = Arc::new(dec);
    let pin = pin_workers();

    let start = Instant::now();
    let mut workers = Vec::with_capacity(INC_THREADS + DEC_THREADS);

    for worker in 0..INC_THREADS {
        let shared = Arc::clone(&shared);
        let inc = Arc::clone(&inc);
        workers.push(thread::spawn(move || {
            if pin {
                pin_to_cpu(worker);
            }
            for _ in 0..INC_ITERATIONS {
                inc(&shared);
            }
        }));
    }

    for worker in 0..DEC_THREADS {
        let shared = Arc::clone(&shared);
        let dec = Arc::clone(&dec);
        workers.push(thread::spawn(move || {
            if pin {
                pin_to_cpu(INC_THREADS + worker);
            }
            for _ in 0..DEC_ITERATIONS {
                dec(&shared);
            }
        }));
    }

    for worker in workers {
        worker.join().expect("benchmark worker panicked");
    }

    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    (elapsed, finish(&shared))
}

fn main() {
    println!(
        "lock_bench: {INC_THREADS} threads x {INC_ITERATIONS} increments (+{INCREMENT}), \
         {DEC_THREADS} threads x {DEC_ITERATIONS} decrements (-{DECREMENT})"
    );
    println!("(the unsynchronized variant is a data race and has no safe Rust rendition)");
    println!();

    let mut results = Vec::new();

    let (ms, counter) = run_case(
        Mutex::new(0i64),
        |counter: &Mutex<i64>| *counter.lock().unwrap() += INCREMENT,
        |counter: &Mutex<i64>| *counter.lock().unwrap() -= DECREMENT,
        |counter| *counter.lock().unwrap(),
    );
    results.push(("std mutex", ms, counter));

    let (ms, counter) = run_case(
        SpinLock::new(0i64),
        |counter: &SpinLock<i64>| *counter.lock() += INCREMENT,
        |counter: &SpinLock<i64>| *counter.lock() -= DECREMENT,
        |counter| *counter.lock(),
    );
    results.push(("TAS spinlock", ms, counter));

    let (ms, counter) = run_case(
        AtomicI64::new(0),
        |counter: &AtomicI64| {
            counter.fetch_add(INCREMENT, Ordering::Relaxed);
        },
        |counter: &AtomicI64| {
            counter.fetch_sub(DECREMENT, Ordering::Relaxed);
        },
        |counter| counter.load(Ordering::Relaxed),
    );
    results.push(("atomic add/sub", ms, counter));

    println!("{:<16} {:>12} {:>10}", "strategy", "time (ms)", "counter");
    for (name, ms, counter) in results {
        let verdict = if counter == 0 { "" } else { "  <- WRONG" };
        println!("{name:<16} {ms:>12.2} {counter:>10}{verdict}");
    }
}
