//! Classic thread-synchronization building blocks.
//!
//! [`Semaphore`] is the only primitive that blocks. [`CriticalSection`] is a
//! one-permit semaphore used as a lock, and [`BoundedBuffer`] is a fixed
//! capacity FIFO queue coordinated by two semaphores plus a storage lock.
//!
//! None of the blocking calls support timeouts or cancellation: a thread
//! waiting for a permit waits until one is released. The only escape hatch is
//! [`BoundedBuffer::close`], observed by [`BoundedBuffer::produce_or_closed`]
//! and [`BoundedBuffer::consume_or_closed`].
//!
//! Every primitive reports its state transitions to a [`SyncObserver`]. The
//! default [`NoopObserver`] discards them, [`LoggingObserver`] narrates them.

pub mod bounded_buffer;
pub mod critical_section;
pub mod observer;
pub mod semaphore;

pub use bounded_buffer::BoundedBuffer;
pub use critical_section::{CriticalSection, CriticalSectionGuard};
pub use observer::{BufferView, LoggingObserver, NoopObserver, SyncEvent, SyncObserver};
pub use semaphore::{Closed, Semaphore, SemaphorePermit};
