// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Per-device locks.
//!
//! Every device serializes its PM operations behind one lock. Devices whose
//! PM paths are short and may be entered from interrupt context use a plain
//! spinlock. Devices whose paths run long (slow buses, settle polls) use a
//! ticket lock so that waiters are served in arrival order.

use core::ops::{Deref, DerefMut};

use spin::mutex::{SpinMutex, SpinMutexGuard, TicketMutex, TicketMutexGuard};

/// The kind of lock protecting a device's runtime state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LockKind {
    /// [`SpinMutex`], for short paths that may run in interrupt context.
    Spin,
    /// [`TicketMutex`], served in arrival order.
    Mutex,
}

/// A lock whose flavor is picked per device at construction time.
pub enum DeviceLock<T> {
    /// [`LockKind::Spin`]
    Spin(SpinMutex<T>),
    /// [`LockKind::Mutex`]
    Mutex(TicketMutex<T>),
}

/// Exclusive access to the value behind a [`DeviceLock`].
///
/// The lock is released when the guard is dropped.
pub enum DeviceGuard<'a, T> {
    /// Guard of a spin lock.
    Spin(SpinMutexGuard<'a, T>),
    /// Guard of a ticket lock.
    Mutex(TicketMutexGuard<'a, T>),
}

impl<T> DeviceLock<T> {
    /// Wrap `value` in a lock of the given kind.
    pub fn new(kind: LockKind, value: T) -> DeviceLock<T> {
        match kind {
            LockKind::Spin => DeviceLock::Spin(SpinMutex::new(value)),
            LockKind::Mutex => DeviceLock::Mutex(TicketMutex::new(value)),
        }
    }

    /// The kind chosen at construction.
    pub fn kind(&self) -> LockKind {
        match self {
            DeviceLock::Spin(_) => LockKind::Spin,
            DeviceLock::Mutex(_) => LockKind::Mutex,
        }
    }

    /// Spin until the lock is acquired.
    pub fn lock(&self) -> DeviceGuard<'_, T> {
        match self {
            DeviceLock::Spin(m) => DeviceGuard::Spin(m.lock()),
            DeviceLock::Mutex(m) => DeviceGuard::Mutex(m.lock()),
        }
    }

    /// Acquire the lock only if it is free.
    pub fn try_lock(&self) -> Option<DeviceGuard<'_, T>> {
        match self {
            DeviceLock::Spin(m) => m.try_lock().map(DeviceGuard::Spin),
            DeviceLock::Mutex(m) => m.try_lock().map(DeviceGuard::Mutex),
        }
    }

    /// Whether someone holds the lock right now.
    pub fn is_locked(&self) -> bool {
        match self {
            DeviceLock::Spin(m) => m.is_locked(),
            DeviceLock::Mutex(m) => m.is_locked(),
        }
    }
}

impl<T> Deref for DeviceGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            DeviceGuard::Spin(g) => &**g,
            DeviceGuard::Mutex(g) => &**g,
        }
    }
}

impl<T> DerefMut for DeviceGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            DeviceGuard::Spin(g) => &mut **g,
            DeviceGuard::Mutex(g) => &mut **g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_kinds_exclude() {
        for kind in [LockKind::Spin, LockKind::Mutex] {
            let lock = DeviceLock::new(kind, 0u32);
            assert_eq!(lock.kind(), kind);
            {
                let mut guard = lock.lock();
                *guard += 1;
                assert!(lock.is_locked());
                assert!(lock.try_lock().is_none());
            }
            assert!(!lock.is_locked());
            assert_eq!(*lock.try_lock().unwrap(), 1);
        }
    }
}
