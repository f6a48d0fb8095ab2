use semabuf_logging::{info, stats, warn};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;

/// Read-only view of a bounded buffer, taken under its storage lock
#[derive(Clone, Copy)]
pub struct BufferView<'a> {
    pub contents: &'a dyn Debug,
    pub len: usize,
    pub capacity: usize,
}

impl<'a> BufferView<'a> {
    pub fn of<T: Debug>(items: &'a VecDeque<T>, capacity: usize) -> Self {
        Self {
            contents: items,
            len: items.len(),
            capacity,
        }
    }
}

impl Debug for BufferView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} [{}/{}]", self.contents, self.len, self.capacity)
    }
}

/// State transitions reported by the synchronization primitives.
///
/// `value` is always the permit count of the named semaphore at the moment of
/// the event. `BufferFull` and `BufferEmpty` come from a racy pre-check done
/// only for narration, the actual wait happens in the semaphore afterwards.
#[derive(Clone, Copy, Debug)]
pub enum SyncEvent<'a> {
    SemaphoreCreated { name: &'a str, value: usize },
    /// About to wait, no permit available
    Blocked { name: &'a str, value: usize },
    /// Woken up, the permit count is going to be re-checked
    WokeUp { name: &'a str, value: usize },
    Acquired { name: &'a str, value: usize },
    Releasing { name: &'a str },
    Released { name: &'a str, value: usize },
    SemaphoreClosed { name: &'a str, value: usize },

    CriticalSectionCreated,
    CriticalSectionAttempting,
    CriticalSectionEntered,
    CriticalSectionExiting,
    CriticalSectionLeft,

    BufferCreated { capacity: usize },
    ProduceAttempt { item: &'a dyn Debug, buffer: BufferView<'a> },
    BufferFull { buffer: BufferView<'a> },
    Produced { item: &'a dyn Debug, buffer: BufferView<'a> },
    ConsumeAttempt { buffer: BufferView<'a> },
    BufferEmpty { buffer: BufferView<'a> },
    Consumed { item: &'a dyn Debug, buffer: BufferView<'a> },
    BufferClosed { buffer: BufferView<'a> },
}

/// Receives the state transitions of semaphores, critical sections and buffers.
///
/// Events can be delivered while the emitting primitive holds its internal
/// lock: an observer must never call back into the primitive it observes.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent<'_>);

    /// When false the primitives skip the work needed to build the events
    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct NoopObserver;

impl NoopObserver {
    pub fn shared() -> Arc<dyn SyncObserver> {
        Arc::new(NoopObserver)
    }
}

impl SyncObserver for NoopObserver {
    fn on_event(&self, _event: &SyncEvent<'_>) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Narrates every event through the global logger and keeps the global stats up to date
#[derive(Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn shared() -> Arc<dyn SyncObserver> {
        Arc::new(LoggingObserver)
    }

    fn update_stats(event: &SyncEvent<'_>) {
        match event {
            SyncEvent::SemaphoreCreated { .. } => stats!(stats.semaphores_created += 1),
            SyncEvent::Blocked { .. } => stats!(stats.blocks += 1),
            SyncEvent::WokeUp { .. } => stats!(stats.wakeups += 1),
            SyncEvent::Acquired { .. } => stats!(stats.acquires += 1),
            SyncEvent::Released { .. } => stats!(stats.releases += 1),
            SyncEvent::CriticalSectionEntered => stats!(stats.critical_section_entries += 1),
            SyncEvent::Produced { buffer, .. } => {
                stats!(stats.produced += 1);
                stats!(stats.observe_occupancy(buffer.len));
            }
            SyncEvent::Consumed { .. } => stats!(stats.consumed += 1),
            _ => (),
        }
    }
}

impl SyncObserver for LoggingObserver {
    fn on_event(&self, event: &SyncEvent<'_>) {
        Self::update_stats(event);

        let current = std::thread::current();
        let thread = current.name().unwrap_or("<unnamed>");

        match *event {
            SyncEvent::SemaphoreCreated { name, value } => {
                info!("{} initialized with value {}", name, value);
            }
            SyncEvent::Blocked { name, value } => {
                info!("{} value is {}, Thread {} BLOCKED", name, value, thread);
            }
            SyncEvent::WokeUp { name, value } => {
                info!("Thread {} WOKE UP on {}, value is now {}", thread, name, value);
            }
            SyncEvent::Acquired { name, value } => {
                info!(
                    "Thread {} acquired {}, value is decreased to {}",
                    thread, name, value
                );
            }
            SyncEvent::Releasing { name } => {
                info!("Thread {} releasing {}", thread, name);
            }
            SyncEvent::Released { name, value } => {
                info!(
                    "{} value increased to {}, Thread {} notified waiting threads",
                    name, value, thread
                );
            }
            SyncEvent::SemaphoreClosed { name, value } => {
                info!("{} closed with value {}", name, value);
            }

            SyncEvent::CriticalSectionCreated => {
                info!("Critical section initialized");
            }
            SyncEvent::CriticalSectionAttempting => {
                info!("Thread {} ATTEMPTING CS", thread);
            }
            SyncEvent::CriticalSectionEntered => {
                info!("Thread {} ENTERED CS", thread);
            }
            SyncEvent::CriticalSectionExiting => {
                info!("Thread {} EXITING CS", thread);
            }
            SyncEvent::CriticalSectionLeft => {
                info!("Thread {} LEFT the CS", thread);
            }

            SyncEvent::BufferCreated { capacity } => {
                info!(
                    "Bounded Buffer initialized with size {}: Empty={}, Full=0",
                    capacity, capacity
                );
            }
            SyncEvent::ProduceAttempt { item, buffer } => {
                info!("Producer {} attempting to produce item {:?}", thread, item);
                info!("Current buffer: {:?}", buffer);
            }
            SyncEvent::BufferFull { .. } => {
                warn!("Buffer FULL! Producer {} must wait...", thread);
            }
            SyncEvent::Produced { item, buffer } => {
                info!("Producer {} PRODUCED item {:?}", thread, item);
                info!("Buffer after production: {:?}", buffer);
            }
            SyncEvent::ConsumeAttempt { buffer } => {
                info!("Consumer {} attempting to consume an item", thread);
                info!("Current buffer: {:?}", buffer);
            }
            SyncEvent::BufferEmpty { .. } => {
                warn!("Buffer EMPTY! Consumer {} must wait...", thread);
            }
            SyncEvent::Consumed { item, buffer } => {
                info!("Consumer {} CONSUMED item {:?}", thread, item);
                info!("Buffer after consumption: {:?}", buffer);
            }
            SyncEvent::BufferClosed { buffer } => {
                info!("Bounded Buffer closed, remaining items: {:?}", buffer);
            }
        }
    }
}
