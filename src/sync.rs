//! Instance-wide reentrant lock.
//!
//! `parking_lot::ReentrantMutex` tracks the owning thread; on top of it we
//! keep an explicit hold depth so callers (and tests) can see how deep the
//! current thread has reentered. The guarded value lives in a `RefCell`
//! because a reentrant guard only hands out shared references; mutable
//! access is taken for the span of one transport operation and never held
//! across a reentry point.

use std::cell::{Cell, RefCell, RefMut};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::{Result, SsdbError};

struct Slot<T> {
    depth: Cell<usize>,
    value: RefCell<T>,
}

/// A reentrant lock with an observable hold depth.
pub struct ReentrantLock<T> {
    inner: ReentrantMutex<Slot<T>>,
}

impl<T> ReentrantLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(Slot {
                depth: Cell::new(0),
                value: RefCell::new(value),
            }),
        }
    }

    /// Acquire the lock, blocking unless this thread already holds it.
    pub fn lock(&self) -> Held<'_, T> {
        let guard = self.inner.lock();
        guard.depth.set(guard.depth.get() + 1);
        Held { guard }
    }

    /// How many times the calling thread currently holds the lock.
    ///
    /// Zero when the lock is free or held by another thread.
    pub fn depth(&self) -> usize {
        match self.inner.try_lock() {
            Some(guard) => guard.depth.get(),
            None => 0,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().value.into_inner()
    }
}

/// Proof that the current thread holds the lock.
pub struct Held<'a, T> {
    guard: ReentrantMutexGuard<'a, Slot<T>>,
}

impl<T> Held<'_, T> {
    /// Borrow the guarded value mutably.
    ///
    /// Fails instead of panicking if an outer frame on this thread is
    /// already inside a mutable borrow.
    pub fn borrow_mut(&self) -> Result<RefMut<'_, T>> {
        self.guard.value.try_borrow_mut().map_err(|_| {
            SsdbError::BatchUsage("connection is already in use further up this call stack".into())
        })
    }

    pub fn depth(&self) -> usize {
        self.guard.depth.get()
    }
}

impl<T> Drop for Held<'_, T> {
    fn drop(&mut self) {
        self.guard.depth.set(self.guard.depth.get() - 1);
    }
}

// ── Tests ──────────────────────────────────────────────────────────
