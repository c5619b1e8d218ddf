// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # Retrace: Change Tracking for Record Graphs
//!
//! This crate wraps user-defined record types and their collections so that
//! every mutation is observed, attributed, and reversible. Wrapping a record
//! (or a `Vec` of records) produces a *tracked view* that behaves like the
//! underlying data for reads and writes while simultaneously maintaining:
//!
//! - the original pre-mutation value of every scalar property,
//! - the per-item membership status within every tracked collection
//!   ([`Unchanged`](ChangeStatus::Unchanged) / [`Added`](ChangeStatus::Added)
//!   / [`Changed`](ChangeStatus::Changed) /
//!   [`Deleted`](ChangeStatus::Deleted)),
//! - an aggregate status propagated up through nested complex properties and
//!   collections, and
//! - the ability to accept (commit) or reject (revert) all accumulated
//!   changes across the whole graph, via [`Transact`].
//!
//! ## Core Concepts
//!
//! A **record** is any type implementing [`Trackable`], normally produced by
//! the [`trackable!`] macro. The macro classifies each field as *scalar*
//! (primitive or value-like), *complex* (a nested record, stored as
//! `Option<T>`), or *collection* (an ordered sequence of records, stored as
//! `Vec<T>`), and generates the type's [`Schema`], this crate's replacement
//! for the runtime proxy interception that reflective change-tracking
//! libraries use.
//!
//! Wrapping produces handles:
//!
//! - [`Tracked<R>`](Tracked): a tracked record. Scalars are read and written
//!   by name; the first write records the pre-mutation value, and writing
//!   the original back lets the status decay to `Unchanged` without an
//!   explicit revert.
//! - [`TrackedList<E>`](TrackedList): a tracked collection. Membership is
//!   tracked by handle identity, with an original snapshot for cancellation
//!   and revert: removing an item and re-inserting it at its original index
//!   cancels to `Unchanged`, while removing a freshly added item leaves no
//!   trace at all.
//!
//! Handles are cheap to clone and share; nested records and collections are
//! wrapped lazily on first access, and a wrapper's identity is stable for
//! the lifetime of its root.
//!
//! ## Getting Started
//!
//! ```rust
//! use retrace::{ChangeStatus, Track, Transact, trackable};
//!
//! trackable! {
//!     pub struct Order {
//!         scalar id: u64,
//!         scalar customer: String,
//!     }
//! }
//!
//! let orders = vec![
//!     Order { id: 1, customer: "A".into() },
//!     Order { id: 2, customer: "B".into() },
//! ]
//! .into_tracked()?;
//!
//! // Mutate through the tracked view.
//! let first = orders.get(0).unwrap();
//! first.set("customer", "X")?;
//! assert_eq!(first.status(), ChangeStatus::Changed);
//! assert_eq!(first.original_value("customer")?, "A");
//!
//! // Writing the original value back decays the status.
//! first.set("customer", "A")?;
//! assert_eq!(first.status(), ChangeStatus::Unchanged);
//! assert!(!orders.is_changed());
//!
//! // Structural edits are attributed per item.
//! let removed = orders.remove_at(1).unwrap();
//! assert_eq!(removed.status(), ChangeStatus::Deleted);
//! assert_eq!(orders.deleted_items().len(), 1);
//!
//! // ...and reverted transactionally.
//! orders.reject_changes();
//! assert_eq!(orders.len(), 2);
//! assert!(!orders.is_changed());
//! # Ok::<(), retrace::TrackError>(())
//! ```
//!
//! ## Ownership
//!
//! The wrapper exclusively owns the record once tracking begins: mutating a
//! record outside its wrapper would bypass the bookkeeping, so the tracked
//! graph *moves* nested children out of their parents when wrapping them
//! (complex property types are therefore required to be
//! default-constructible). Deep reads ([`Tracked::to_record`],
//! [`Tracked::original`], [`TrackedList::to_records`]) fold the children
//! back in by clone.
//!
//! ## Concurrency
//!
//! Handles are `Send + Sync` and safe to read from several threads. The
//! crate guarantees that concurrent first-reads of the same nested property
//! produce a single wrapper (lazy wrapping is idempotent), but it does not
//! serialize writers: callers are expected to serialize mutations and
//! accept/reject per tracked root, and mutating one record through two
//! tracked parent collections concurrently is unsupported.
//!
//! ## Cyclic Types
//!
//! Cyclic record graphs are not supported. The schema's reachability
//! analysis marks any property whose type graph re-enters an ancestor type
//! as non-trackable (with a `tracing` diagnostic); tracking such a property
//! fails with [`TrackError::SchemaIneligible`] while the rest of the record
//! remains usable.
//!
//! ## Features
//!
//! - `chrono`: adds a timestamp scalar variant backed by
//!   [`chrono`](https://docs.rs/chrono). Enabled by default.
//! - `serde`: provides `serde` support for [`ScalarValue`] and
//!   [`ChangeStatus`].
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod error;
pub use error::TrackError;
pub mod schema;
pub use schema::{PropertyKind, PropertySpec, Schema};
pub mod status;
pub use status::ChangeStatus;
pub mod value;
pub use value::{ScalarTypeError, ScalarValue};
mod trackable;
pub use trackable::{Track, Trackable};
mod tracked;
pub use tracked::{AnyTracked, Tracked, TrackedList};
/// Transactional accept/reject over tracked graphs.
///
/// See [`transaction`] module documentation for semantics.
pub mod transaction;
pub use transaction::Transact;
/// Macros for defining trackable record types.
pub mod macros;
