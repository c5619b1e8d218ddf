// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Accepting and rejecting accumulated changes.
//!
//! [`Transact`] is the transactional surface of the crate: every tracked
//! handle (record, collection, or untyped child) can commit or revert
//! everything that has accumulated beneath it since it was wrapped or last
//! accepted.
//!
//! # Semantics
//!
//! **Accept** walks the subtree depth-first. Each collection purges its
//! deleted set and re-snapshots its current membership by identity; each
//! record clears its scalar and complex originals. Children are accepted
//! before their parent's status is observable as Unchanged, so a status
//! read during your own accept never sees a parent roll up stale child
//! state.
//!
//! **Reject** restores the state captured at wrap time or the last accept.
//! Within a record, scalars are restored first, then displaced complex
//! slots, then the (restored) children are rejected recursively. Within a
//! collection, membership and order are restored from the snapshot, which
//! re-inserts deleted items at their original positions and discards added
//! ones, before each restored item is rejected. Restoring membership
//! structurally, rather than replaying per-item marks, keeps the result
//! independent of the order in which sibling collections are visited when
//! a record was moved between them.
//!
//! Both operations are idempotent: accepting or rejecting twice in a row
//! leaves the graph exactly as the first call did.
//!
//! # Atomicity
//!
//! Neither operation is atomic with respect to concurrent mutation of the
//! same root. Callers serialize writers per root; see the crate-level
//! concurrency notes.
//!
//! # Example
//!
//! ```
//! use retrace::{Track, Transact, trackable};
//!
//! trackable! {
//!     pub struct Counter {
//!         scalar label: String,
//!         scalar value: i64,
//!     }
//! }
//!
//! let counter = Counter { label: "hits".into(), value: 0 }.into_tracked()?;
//! counter.set("value", 41i64)?;
//! counter.accept_changes();
//! counter.set("value", 1000i64)?;
//! counter.reject_changes();
//! // reject restores the state at the last accept, not the initial one
//! assert_eq!(counter.get("value")?, 41i64);
//! # Ok::<(), retrace::TrackError>(())
//! ```

use crate::{
    Trackable,
    tracked::{AnyTracked, Tracked, TrackedList},
};

/// Commit or revert all changes accumulated beneath a tracked handle.
pub trait Transact {
    /// Commits: current values become the new originals across the whole
    /// subtree, and every status returns to
    /// [`Unchanged`](crate::ChangeStatus::Unchanged).
    fn accept_changes(&self);

    /// Reverts the whole subtree to the state at wrap time or the last
    /// accept.
    fn reject_changes(&self);
}

impl<R: Trackable> Transact for Tracked<R> {
    fn accept_changes(&self) {
        tracing::debug!(record = self.node().schema().type_name(), "accept changes");
        self.node().accept();
    }

    fn reject_changes(&self) {
        tracing::debug!(record = self.node().schema().type_name(), "reject changes");
        self.node().reject();
    }
}

impl<E: Trackable> Transact for TrackedList<E> {
    fn accept_changes(&self) {
        tracing::debug!(
            element = self.handle().elem_schema().type_name(),
            "accept changes"
        );
        self.handle().accept();
    }

    fn reject_changes(&self) {
        tracing::debug!(
            element = self.handle().elem_schema().type_name(),
            "reject changes"
        );
        self.handle().reject();
    }
}

impl Transact for AnyTracked {
    fn accept_changes(&self) {
        self.node.accept();
    }

    fn reject_changes(&self) {
        self.node.reject();
    }
}
