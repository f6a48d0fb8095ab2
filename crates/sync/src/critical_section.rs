use crate::observer::{NoopObserver, SyncEvent, SyncObserver};
use crate::semaphore::Semaphore;
use config::CRITICAL_SECTION_SEMAPHORE_NAME;
use std::sync::Arc;

/// Mutual exclusion built on a one-permit [`Semaphore`].
///
/// `enter` is the entry section (acquire), dropping the returned guard is the
/// exit section (release), so the permit is given back on early returns and
/// unwinding too.
pub struct CriticalSection {
    semaphore: Semaphore,
    observer: Arc<dyn SyncObserver>,
}

impl CriticalSection {
    pub fn new() -> Self {
        Self::with_observer(NoopObserver::shared())
    }

    pub fn with_observer(observer: Arc<dyn SyncObserver>) -> Self {
        let semaphore =
            Semaphore::with_permits(1, CRITICAL_SECTION_SEMAPHORE_NAME, observer.clone());
        observer.on_event(&SyncEvent::CriticalSectionCreated);
        Self {
            semaphore,
            observer,
        }
    }

    /// Blocks until no other thread is inside the section
    pub fn enter(&self) -> CriticalSectionGuard<'_> {
        self.observer.on_event(&SyncEvent::CriticalSectionAttempting);
        self.semaphore.acquire();
        self.observer.on_event(&SyncEvent::CriticalSectionEntered);
        CriticalSectionGuard { section: self }
    }

    pub fn exit(&self, guard: CriticalSectionGuard<'_>) {
        debug_assert!(std::ptr::eq(guard.section, self));
        drop(guard);
    }

    /// Runs `work` under mutual exclusion and returns its result
    pub fn run<R>(&self, work: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        work()
    }

    pub fn is_occupied(&self) -> bool {
        self.semaphore.value() == 0
    }
}

impl Default for CriticalSection {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CriticalSectionGuard<'a> {
    section: &'a CriticalSection,
}

impl Drop for CriticalSectionGuard<'_> {
    fn drop(&mut self) {
        self.section
            .observer
            .on_event(&SyncEvent::CriticalSectionExiting);
        self.section.semaphore.release();
        self.section.observer.on_event(&SyncEvent::CriticalSectionLeft);
    }
}
