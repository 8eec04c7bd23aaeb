pub mod sync;
pub mod trace;

pub use sync::buffer::{BoundedBuffer, BufferError};
pub use sync::sem::Semaphore;
pub use trace::init_tracing;
