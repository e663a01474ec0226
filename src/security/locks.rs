// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resilient Lock Helpers
//!
//! Lock helper functions that recover from lock poisoning instead of
//! panicking. Poisoning occurs when a thread panics while holding a lock;
//! the session registry must stay available in that case, so these helpers
//! log the event and hand back the guard anyway.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::RwLock;
//! use fetchtube::security::locks::{resilient_read, resilient_write};
//!
//! let lock = RwLock::new(42);
//!
//! // Read with recovery
//! let guard = resilient_read(&lock);
//! println!("Value: {}", *guard);
//!
//! // Write with recovery
//! let mut guard = resilient_write(&lock);
//! *guard = 100;
//! ```

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning if necessary.
///
/// If the lock is poisoned (a thread panicked while holding the write lock),
/// this function logs the event and recovers the guard anyway.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "security::locks",
                event = "LOCK_POISONED_READ",
                "RwLock was poisoned during read acquisition. Recovering data. \
                 A thread previously panicked while holding this lock. \
                 Data may be inconsistent. Investigate panic cause in logs."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning if necessary.
///
/// If the lock is poisoned (a thread panicked while holding the lock),
/// this function logs the event and recovers the guard anyway.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "security::locks",
                event = "LOCK_POISONED_WRITE",
                "RwLock was poisoned during write acquisition. Recovering data. \
                 A thread previously panicked while holding this lock. \
                 Data may be inconsistent. Investigate panic cause in logs."
            );
            poisoned.into_inner()
        }
    }
}

/// Try to acquire a read lock without blocking.
///
/// Returns `Some(guard)` if the lock can be acquired immediately,
/// `None` if it would block. Recovers from poisoning.
#[inline]
pub fn try_resilient_read<T>(lock: &RwLock<T>) -> Option<RwLockReadGuard<'_, T>> {
    match lock.try_read() {
        Ok(guard) => Some(guard),
        Err(std::sync::TryLockError::Poisoned(poisoned)) => {
            tracing::error!(
                target: "security::locks",
                event = "LOCK_POISONED_TRY_READ",
                "RwLock was poisoned during try_read. Recovering data."
            );
            Some(poisoned.into_inner())
        }
        Err(std::sync::TryLockError::WouldBlock) => None,
    }
}

/// Try to acquire a write lock without blocking.
///
/// Returns `Some(guard)` if the lock can be acquired immediately,
/// `None` if it would block. Recovers from poisoning.
#[inline]
pub fn try_resilient_write<T>(lock: &RwLock<T>) -> Option<RwLockWriteGuard<'_, T>> {
    match lock.try_write() {
        Ok(guard) => Some(guard),
        Err(std::sync::TryLockError::Poisoned(poisoned)) => {
            tracing::error!(
                target: "security::locks",
                event = "LOCK_POISONED_TRY_WRITE",
                "RwLock was poisoned during try_write. Recovering data."
            );
            Some(poisoned.into_inner())
        }
        Err(std::sync::TryLockError::WouldBlock) => None,
    }
}
