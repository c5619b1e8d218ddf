// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The per-record change status and the lattice used for rollups.

use std::fmt;

/// The tracking status of a record or of its membership in a tracked
/// collection.
///
/// A freshly wrapped record is [`Unchanged`](ChangeStatus::Unchanged). Scalar
/// writes, complex-child changes, and collection changes move it to
/// [`Changed`](ChangeStatus::Changed); reverting every property to its
/// original value moves it back. [`Added`](ChangeStatus::Added) and
/// [`Deleted`](ChangeStatus::Deleted) describe membership in a tracked
/// collection and are only ever assigned by collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum ChangeStatus {
    /// No observed difference from the state at wrap time or the last accept.
    Unchanged,
    /// Entered a tracked collection after it was wrapped.
    Added,
    /// At least one scalar, complex child, or collection differs from its
    /// original.
    Changed,
    /// Removed from a tracked collection since the last accept.
    Deleted,
}

impl ChangeStatus {
    /// Returns `true` for [`ChangeStatus::Unchanged`].
    pub fn is_unchanged(self) -> bool {
        matches!(self, ChangeStatus::Unchanged)
    }

    /// The rollup lattice operation.
    ///
    /// A parent derives its status from its children by folding with `join`:
    /// two `Unchanged` inputs stay `Unchanged`, anything else produces
    /// `Changed`. `Added` and `Deleted` are leaf states that describe
    /// collection membership; they contribute `Changed` to a parent rather
    /// than propagating themselves.
    pub fn join(self, other: ChangeStatus) -> ChangeStatus {
        if self.is_unchanged() && other.is_unchanged() {
            ChangeStatus::Unchanged
        } else {
            ChangeStatus::Changed
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeStatus::Unchanged => "unchanged",
            ChangeStatus::Added => "added",
            ChangeStatus::Changed => "changed",
            ChangeStatus::Deleted => "deleted",
        };
        f.write_str(name)
    }
}
