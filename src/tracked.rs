// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The tracked wrappers.
//!
//! This module holds the engine behind the public facades: every wrapped
//! record is a [`record::Node`], a shared, reference-counted cell carrying
//! the record itself, the original-value bookkeeping, and the lazily built
//! child wrappers, and every wrapped sequence is a [`list::ListHandle`]
//! over shared collection state. Handle identity (`Arc` pointer identity)
//! *is* tracking identity: the same record wrapped once and reached through
//! two paths compares equal, and membership bookkeeping in collections is
//! done purely by identity.
//!
//! The typed facades [`Tracked`] and [`TrackedList`] are thin `PhantomData`
//! veneers over the engine that check record types at the boundaries and
//! expose the ergonomic surface. [`AnyTracked`] is the untyped handle
//! returned where heterogeneous children are enumerated.
//!
//! Locking is deliberately fine-grained: a record node has one mutex over
//! the record and its scalar originals and a second over the lazy child
//! maps, so that concurrent first-reads of the same complex property cannot
//! produce two wrappers while read-heavy workloads do not serialize on a
//! single node-wide lock. Lock acquisition is always parent before child
//! and record-state before child-maps; the tracked graph is acyclic (the
//! schema's cycle analysis refuses to track cyclic type graphs), so this
//! order is deadlock-free.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) mod list;
pub(crate) mod record;

pub use list::TrackedList;
pub use record::{AnyTracked, Tracked};

/// Locks a mutex, continuing through poison.
///
/// The tracking invariants hold between operations, so observing state from
/// a thread that panicked mid-operation is no worse for a reader than the
/// panic itself.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
