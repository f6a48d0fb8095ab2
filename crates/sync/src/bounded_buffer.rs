//! # Bounded buffer.
//!
//! Fixed capacity FIFO queue shared by any number of producers and consumers.
//!
//! Two semaphores track slot availability: `empty_slots` starts at `capacity`
//! and `filled_slots` at zero. A producer takes an empty slot, appends under
//! the storage lock, then hands a filled slot to the consumers; a consumer
//! does the mirror image. The storage lock is still needed because the
//! semaphores only bound how many threads touch the queue, not how many of
//! them push (or pop) at the same time.
//!
//! Items come out in the order their append completed under the storage lock,
//! which is not necessarily the order in which producers called `produce`.
//!
//! Closing the buffer lets consumers stop once it is drained. A producer
//! promises its filled slot before waiting for a free one, so an item still
//! on its way in keeps `consume_or_closed` waiting for it.

use crate::observer::{BufferView, NoopObserver, SyncEvent, SyncObserver};
use crate::semaphore::Semaphore;
use config::{EMPTY_SLOTS_SEMAPHORE_NAME, FULL_SLOTS_SEMAPHORE_NAME};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;

pub struct BoundedBuffer<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    /// Permits are free slots
    empty_slots: Semaphore,
    /// Permits are items ready to be consumed
    filled_slots: Semaphore,
    observer: Arc<dyn SyncObserver>,
}

impl<T: Debug> BoundedBuffer<T> {
    /// Fails if `capacity` is zero
    pub fn new(capacity: usize) -> anyhow::Result<Self> {
        Self::with_observer(capacity, NoopObserver::shared())
    }

    pub fn with_observer(capacity: usize, observer: Arc<dyn SyncObserver>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            capacity > 0,
            "Bounded buffer capacity must be positive, got {}",
            capacity
        );

        let buffer = Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            empty_slots: Semaphore::with_permits(
                capacity,
                EMPTY_SLOTS_SEMAPHORE_NAME,
                observer.clone(),
            ),
            filled_slots: Semaphore::with_permits(0, FULL_SLOTS_SEMAPHORE_NAME, observer.clone()),
            observer,
        };
        buffer
            .observer
            .on_event(&SyncEvent::BufferCreated { capacity });
        Ok(buffer)
    }

    /// Appends `item` at the tail, blocking while the buffer is full.
    ///
    /// Ignores [`close`](Self::close). Call it only before closing, or from
    /// producers the closing thread has already waited for.
    pub fn produce(&self, item: T) {
        self.filled_slots.promise_release();
        self.announce_produce(&item);
        self.empty_slots.acquire();
        self.append(item);
    }

    /// Like [`produce`](Self::produce), but gives `item` back once the buffer
    /// is closed, including to a producer blocked on a full buffer
    pub fn produce_or_closed(&self, item: T) -> Result<(), T> {
        if self.filled_slots.promise_release_unless_closed().is_err() {
            return Err(item);
        }
        self.announce_produce(&item);
        if self.empty_slots.acquire_or_closed().is_err() {
            self.filled_slots.withdraw_promise();
            return Err(item);
        }
        self.append(item);
        Ok(())
    }

    fn announce_produce(&self, item: &T) {
        if self.observer.is_enabled() {
            let items = self.items.lock();
            let buffer = BufferView::of(&items, self.capacity);
            self.observer
                .on_event(&SyncEvent::ProduceAttempt { item, buffer });
            // Narration only, the blocking decision is taken by the semaphore
            if self.empty_slots.value() == 0 {
                self.observer.on_event(&SyncEvent::BufferFull { buffer });
            }
        }
    }

    /// Must be called while holding a permit of `empty_slots` and a promise of `filled_slots`
    fn append(&self, item: T) {
        {
            let mut items = self.items.lock();
            items.push_back(item);
            if self.observer.is_enabled() {
                if let Some(item) = items.back() {
                    self.observer.on_event(&SyncEvent::Produced {
                        item,
                        buffer: BufferView::of(&items, self.capacity),
                    });
                }
            }
        }
        self.filled_slots.fulfil_promise();
    }

    /// Removes and returns the oldest item, blocking while the buffer is empty.
    ///
    /// Never returns a sentinel: on an empty buffer this waits for a matching
    /// `produce` with no timeout, even if the buffer gets closed.
    pub fn consume(&self) -> T {
        self.announce_consume();
        self.filled_slots.acquire();
        self.take_oldest()
    }

    /// Like [`consume`](Self::consume), but returns `None` once the buffer is
    /// closed, empty, and no producer is still on its way in
    pub fn consume_or_closed(&self) -> Option<T> {
        self.announce_consume();
        self.filled_slots.acquire_or_closed().ok()?;
        Some(self.take_oldest())
    }

    /// Stops [`produce_or_closed`](Self::produce_or_closed) and lets
    /// [`consume_or_closed`](Self::consume_or_closed) return `None` once drained.
    ///
    /// Items still in the buffer, or being appended by a `produce` call that
    /// started before the close, are still handed out to consumers.
    pub fn close(&self) {
        self.empty_slots.close();
        self.filled_slots.close();
        if self.observer.is_enabled() {
            let items = self.items.lock();
            self.observer.on_event(&SyncEvent::BufferClosed {
                buffer: BufferView::of(&items, self.capacity),
            });
        }
    }

    fn announce_consume(&self) {
        if self.observer.is_enabled() {
            let items = self.items.lock();
            let buffer = BufferView::of(&items, self.capacity);
            self.observer
                .on_event(&SyncEvent::ConsumeAttempt { buffer });
            if self.filled_slots.value() == 0 {
                self.observer.on_event(&SyncEvent::BufferEmpty { buffer });
            }
        }
    }

    /// Must be called while holding a permit of `filled_slots`
    fn take_oldest(&self) -> T {
        let item = {
            let mut items = self.items.lock();
            let item = items
                .pop_front()
                .expect("A filled slot permit always matches a resident item");
            if self.observer.is_enabled() {
                self.observer.on_event(&SyncEvent::Consumed {
                    item: &item,
                    buffer: BufferView::of(&items, self.capacity),
                });
            }
            item
        };
        self.empty_slots.release();
        item
    }
}

impl<T> BoundedBuffer<T> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.filled_slots.is_closed()
    }

    /// Permits of the (free, filled) slot semaphores
    pub fn slot_counts(&self) -> (usize, usize) {
        (self.empty_slots.value(), self.filled_slots.value())
    }
}

impl<T: Clone> BoundedBuffer<T> {
    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

impl<T: Debug> Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.items.lock();
        f.debug_struct("BoundedBuffer")
            .field("capacity", &self.capacity)
            .field("items", &*items)
            .field("empty_slots", &self.empty_slots)
            .field("filled_slots", &self.filled_slots)
            .finish()
    }
}
