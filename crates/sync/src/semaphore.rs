//! # Semaphore.
//!
//! A counting semaphore: a number of permits guarded by a mutex, plus a
//! condition variable on which threads wait while no permit is available.
//!
//! - [`Semaphore::acquire`] (P) blocks until the count is positive, then takes
//!   one permit. The predicate is re-checked after every wakeup, so spurious
//!   wakeups and permits stolen by a non-blocked caller are both harmless.
//! - [`Semaphore::release`] (V) returns one permit and wakes one waiter. It
//!   never blocks for longer than the internal lock is held.
//!
//! There is no upper bound on the count and no FIFO ordering among waiters.
//! Balancing every acquire with a release is the caller's job,
//! [`Semaphore::permit`] returns an RAII guard that does it on drop.
//!
//! A semaphore can be closed. [`Semaphore::acquire_or_closed`] then gives up
//! instead of waiting, but only when no permit is left *and* no release is
//! still promised with [`Semaphore::promise_release`].

use crate::observer::{NoopObserver, SyncEvent, SyncObserver};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Returned by [`Semaphore::acquire_or_closed`] once the semaphore is closed and out of permits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Closed;

impl Display for Closed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "semaphore closed")
    }
}

impl std::error::Error for Closed {}

struct SemaphoreState {
    count: usize,
    /// Releases announced but not yet performed
    promised: usize,
    closed: bool,
}

impl SemaphoreState {
    fn is_exhausted(&self) -> bool {
        self.closed && self.count == 0 && self.promised == 0
    }
}

pub struct Semaphore {
    name: String,
    state: Mutex<SemaphoreState>,
    condvar: Condvar,
    observer: Arc<dyn SyncObserver>,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` permits.
    ///
    /// `name` is only used to label the diagnostic events. Fails if `initial` is negative.
    pub fn new(initial: i64, name: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_observer(initial, name, NoopObserver::shared())
    }

    pub fn with_observer(
        initial: i64,
        name: impl Into<String>,
        observer: Arc<dyn SyncObserver>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let Ok(permits) = usize::try_from(initial) else {
            anyhow::bail!(
                "Semaphore {} must start with a non-negative value, got {}",
                name,
                initial
            );
        };
        Ok(Self::with_permits(permits, name, observer))
    }

    /// Infallible constructor, a `usize` count cannot be negative
    pub fn with_permits(
        permits: usize,
        name: impl Into<String>,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let semaphore = Self {
            name: name.into(),
            state: Mutex::new(SemaphoreState {
                count: permits,
                promised: 0,
                closed: false,
            }),
            condvar: Condvar::new(),
            observer,
        };
        semaphore.observer.on_event(&SyncEvent::SemaphoreCreated {
            name: &semaphore.name,
            value: permits,
        });
        semaphore
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the available permits, stale as soon as it is returned
    pub fn value(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Releases promised and not yet fulfilled or withdrawn
    pub fn promised_releases(&self) -> usize {
        self.state.lock().promised
    }

    /// Waits until a permit is available, then takes it.
    ///
    /// Blocks with no timeout and no cancellation, closing the semaphore does
    /// not wake this call up.
    pub fn acquire(&self) {
        let mut state = self.state.lock();
        self.wait_for_permit(&mut state, false);
        self.take_permit(&mut state);
    }

    /// Like [`acquire`](Self::acquire), but gives up with [`Closed`] once the
    /// semaphore is closed, no permit is left and no release is promised.
    /// Permits released before or after the close are still handed out.
    pub fn acquire_or_closed(&self) -> Result<(), Closed> {
        let mut state = self.state.lock();
        self.wait_for_permit(&mut state, true);
        if state.count == 0 {
            debug_assert!(state.is_exhausted());
            return Err(Closed);
        }
        self.take_permit(&mut state);
        Ok(())
    }

    /// Acquires a permit that is released when the returned guard is dropped
    pub fn permit(&self) -> SemaphorePermit<'_> {
        self.acquire();
        SemaphorePermit { semaphore: self }
    }

    /// Returns one permit and wakes up one waiting thread, if any
    pub fn release(&self) {
        self.observer
            .on_event(&SyncEvent::Releasing { name: &self.name });

        let mut state = self.state.lock();
        self.return_permit(&mut state);
    }

    /// Announces a [`release`](Self::release) that will happen later.
    ///
    /// While a promise is pending, [`acquire_or_closed`](Self::acquire_or_closed)
    /// keeps waiting on a closed semaphore instead of returning [`Closed`].
    /// Every promise must end in [`fulfil_promise`](Self::fulfil_promise) or
    /// [`withdraw_promise`](Self::withdraw_promise).
    pub fn promise_release(&self) {
        self.state.lock().promised += 1;
    }

    /// Same as [`promise_release`](Self::promise_release), refused once the semaphore is closed
    pub fn promise_release_unless_closed(&self) -> Result<(), Closed> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Closed);
        }
        state.promised += 1;
        Ok(())
    }

    /// Performs a promised release
    pub fn fulfil_promise(&self) {
        self.observer
            .on_event(&SyncEvent::Releasing { name: &self.name });

        let mut state = self.state.lock();
        debug_assert!(state.promised > 0, "no release promised on {}", self.name);
        // Under one lock with the increment, closed waiters never see both at zero
        state.promised -= 1;
        self.return_permit(&mut state);
    }

    /// Drops a promised release without returning a permit
    pub fn withdraw_promise(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.promised > 0, "no release promised on {}", self.name);
        state.promised -= 1;
        // The last pending promise may be all that kept closed waiters asleep
        if state.is_exhausted() {
            self.condvar.notify_all();
        }
    }

    /// Wakes up every thread blocked in [`acquire_or_closed`](Self::acquire_or_closed)
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.condvar.notify_all();
        self.observer.on_event(&SyncEvent::SemaphoreClosed {
            name: &self.name,
            value: state.count,
        });
    }

    fn wait_for_permit(&self, state: &mut MutexGuard<SemaphoreState>, stop_on_close: bool) {
        let must_wait =
            |state: &SemaphoreState| state.count == 0 && !(stop_on_close && state.is_exhausted());

        if must_wait(state) {
            self.observer.on_event(&SyncEvent::Blocked {
                name: &self.name,
                value: state.count,
            });
        }

        while must_wait(state) {
            self.condvar.wait(state);
            self.observer.on_event(&SyncEvent::WokeUp {
                name: &self.name,
                value: state.count,
            });
        }
    }

    fn return_permit(&self, state: &mut MutexGuard<SemaphoreState>) {
        state.count += 1;
        self.condvar.notify_one();
        self.observer.on_event(&SyncEvent::Released {
            name: &self.name,
            value: state.count,
        });
    }

    fn take_permit(&self, state: &mut MutexGuard<SemaphoreState>) {
        state.count -= 1;
        if state.is_exhausted() {
            self.condvar.notify_all();
        }
        self.observer.on_event(&SyncEvent::Acquired {
            name: &self.name,
            value: state.count,
        });
    }
}

impl Debug for Semaphore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Semaphore")
            .field("name", &self.name)
            .field("count", &state.count)
            .field("promised", &state.promised)
            .field("closed", &state.closed)
            .finish()
    }
}

/// An RAII permit, the semaphore is released when this guard is dropped.
///
/// Created by [`Semaphore::permit`].
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
