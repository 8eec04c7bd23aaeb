//! Two threads executing chunks of work in lock step.
//!
//! Each thread waits on the semaphore the other thread signals, so neither
//! can run its step `i + 1` before the other has finished step `i`.
//!
//! Usage:
//!     cargo run --bin rendezvous

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use weir::Semaphore;

const LOOPS: usize = 10;
/// Small pause per step so the interleaving is visible in the output.
const STEP_PAUSE: Duration = Duration::from_millis(20);

fn main() {
    weir::init_tracing();

    let sem_a = Arc::new(Semaphore::new(1));
    let sem_b = Arc::new(Semaphore::new(1));

    let thread_a = {
        let sem_a = Arc::clone(&sem_a);
        let sem_b = Arc::clone(&sem_b);
        thread::spawn(move || {
            for i in 0..LOOPS {
                sem_b.wait();
                println!("A{i}");
                thread::sleep(STEP_PAUSE);
                sem_a.signal();
            }
        })
    };

    let thread_b = {
        let sem_a = Arc::clone(&sem_a);
        let sem_b = Arc::clone(&sem_b);
        thread::spawn(move || {
            for i in 0..LOOPS {
                sem_a.wait();
                println!("B{i}");
                thread::sleep(STEP_PAUSE);
                sem_b.signal();
            }
        })
    };

    thread_a.join().expect("thread A panicked");
    thread_b.join().expect("thread B panicked");
}
