// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Tracked collections: membership bookkeeping with add/remove cancellation.
//!
//! A tracked collection keeps three identity-based structures: the visible
//! `items`, the `deleted` items with their original indices, and the
//! `original_snapshot` holding the membership at wrap time or the last
//! accept.
//! Identity means handle identity; integer indices are only positions, never
//! names. This is what makes the subtle cases fall out: removing an original
//! item and re-inserting it at its original index cancels to Unchanged,
//! removing a freshly added item leaves no trace, and a record moved between
//! two sibling collections is Deleted in one and Added in the other without
//! either collection consulting the other.

use super::{lock, record::Node};
use crate::{ChangeStatus, Schema, TrackError, Trackable, tracked::Tracked};
use std::{
    any::TypeId,
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex},
};

/// The engine-side wrapper around one tracked sequence. Cloning clones the
/// handle; pointer identity is tracking identity.
pub(crate) struct ListHandle {
    inner: Arc<ListInner>,
}

impl Clone for ListHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ListInner {
    /// The element type's schema; inserts are checked against it.
    elem: &'static Schema,
    state: Mutex<ListState>,
}

struct ListState {
    /// The visible contents.
    items: Vec<Node>,
    /// Items removed since the last accept, with their index in the
    /// snapshot. Disjoint from `items`.
    deleted: Vec<(Node, usize)>,
    /// The membership at wrap time or the last accept.
    snapshot: Vec<Node>,
}

impl ListState {
    fn position(&self, node: &Node) -> Option<usize> {
        self.items.iter().position(|m| Node::ptr_eq(m, node))
    }

    fn snapshot_position(&self, node: &Node) -> Option<usize> {
        self.snapshot.iter().position(|s| Node::ptr_eq(s, node))
    }
}

impl ListHandle {
    pub(crate) fn new(items: Vec<Node>, elem: &'static Schema) -> Self {
        tracing::debug!(element = elem.type_name(), len = items.len(), "wrapping sequence");
        Self {
            inner: Arc::new(ListInner {
                elem,
                state: Mutex::new(ListState {
                    snapshot: items.clone(),
                    items,
                    deleted: Vec::new(),
                }),
            }),
        }
    }

    pub(crate) fn ptr_eq(a: &ListHandle, b: &ListHandle) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn elem_schema(&self) -> &'static Schema {
        self.inner.elem
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner.state).items.len()
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<Node> {
        lock(&self.inner.state).items.get(index).cloned()
    }

    pub(crate) fn nodes(&self) -> Vec<Node> {
        lock(&self.inner.state).items.clone()
    }

    fn check_type(&self, node: &Node) -> Result<(), TrackError> {
        if node.schema().type_id() != self.inner.elem.type_id() {
            return Err(TrackError::InvalidCast {
                expected: self.inner.elem.type_name(),
                actual: node.schema().type_name(),
            });
        }
        Ok(())
    }

    /// Inserts `node` at `index`.
    ///
    /// A node in this collection's deleted set is restored: at its original
    /// index with clean internals the removal cancels to Unchanged,
    /// anywhere else (or with dirty internals) it comes back Changed. A
    /// node already a member is a no-op at its own position, a Changed move
    /// to another, and an error if it was added twice. Everything else
    /// (fresh wraps and members of other collections alike) is Added.
    pub(crate) fn insert_node(&self, index: usize, node: Node) -> Result<(), TrackError> {
        self.check_type(&node)?;
        let mut state = lock(&self.inner.state);
        assert!(
            index <= state.items.len(),
            "insert index {index} out of bounds (len {})",
            state.items.len()
        );
        if let Some(pos) = state
            .deleted
            .iter()
            .position(|(d, _)| Node::ptr_eq(d, &node))
        {
            let (restored, original_index) = state.deleted.remove(pos);
            state.items.insert(index, restored.clone());
            if original_index == index && restored.internal_status().is_unchanged() {
                restored.set_mark(ChangeStatus::Unchanged);
            } else {
                restored.set_mark(ChangeStatus::Changed);
            }
            return Ok(());
        }
        if let Some(pos) = state.position(&node) {
            if state.snapshot_position(&node).is_none() {
                return Err(TrackError::AlreadyTracking);
            }
            // re-inserting an original that was never removed: a no-op at
            // its current position, a move otherwise
            if pos == index {
                return Ok(());
            }
            let moved = state.items.remove(pos);
            let target = if pos < index { index - 1 } else { index };
            state.items.insert(target, moved);
            node.set_mark(ChangeStatus::Changed);
            return Ok(());
        }
        state.items.insert(index, node.clone());
        node.set_mark(ChangeStatus::Added);
        Ok(())
    }

    /// Removes `node` from the visible items. Returns `false` if it is not
    /// a member. An original member moves to the deleted set; an added item
    /// is dropped entirely.
    pub(crate) fn remove_node(&self, node: &Node) -> bool {
        let mut state = lock(&self.inner.state);
        let Some(pos) = state.position(node) else {
            return false;
        };
        let removed = state.items.remove(pos);
        match state.snapshot_position(&removed) {
            Some(original_index) => {
                state.deleted.push((removed.clone(), original_index));
                removed.set_mark(ChangeStatus::Deleted);
            }
            None => {
                // an added item removed again leaves no trace
                removed.set_mark(ChangeStatus::Unchanged);
            }
        }
        true
    }

    pub(crate) fn remove_at(&self, index: usize) -> Option<Node> {
        let node = self.node_at(index)?;
        self.remove_node(&node);
        Some(node)
    }

    /// Indexer assignment: removes the occupant of `index`, then inserts
    /// `node` there.
    pub(crate) fn replace_at(&self, index: usize, node: Node) -> Result<Node, TrackError> {
        self.check_type(&node)?;
        let removed = self
            .remove_at(index)
            .unwrap_or_else(|| panic!("index {index} out of bounds"));
        self.insert_node(index, node)?;
        Ok(removed)
    }

    /// Restores a deleted item at its original index (clamped to the
    /// current length). Its status returns to its internal rollup.
    pub(crate) fn undelete(&self, node: &Node) -> Result<(), TrackError> {
        let mut state = lock(&self.inner.state);
        let Some(pos) = state
            .deleted
            .iter()
            .position(|(d, _)| Node::ptr_eq(d, node))
        else {
            return Err(TrackError::NotDeleted);
        };
        let (restored, original_index) = state.deleted.remove(pos);
        let index = original_index.min(state.items.len());
        state.items.insert(index, restored.clone());
        restored.set_mark(ChangeStatus::Unchanged);
        Ok(())
    }

    pub(crate) fn added_nodes(&self) -> Vec<Node> {
        let state = lock(&self.inner.state);
        state
            .items
            .iter()
            .filter(|n| state.snapshot_position(n).is_none())
            .cloned()
            .collect()
    }

    pub(crate) fn changed_nodes(&self) -> Vec<Node> {
        let state = lock(&self.inner.state);
        state
            .items
            .iter()
            .filter(|n| state.snapshot_position(n).is_some() && !n.status().is_unchanged())
            .cloned()
            .collect()
    }

    pub(crate) fn unchanged_nodes(&self) -> Vec<Node> {
        let state = lock(&self.inner.state);
        state
            .items
            .iter()
            .filter(|n| state.snapshot_position(n).is_some() && n.status().is_unchanged())
            .cloned()
            .collect()
    }

    pub(crate) fn deleted_nodes(&self) -> Vec<Node> {
        let state = lock(&self.inner.state);
        state.deleted.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Whether the collection differs from its snapshot: any deletion, any
    /// membership or order difference, or any item whose own status is not
    /// Unchanged.
    pub(crate) fn is_changed(&self) -> bool {
        let state = lock(&self.inner.state);
        if !state.deleted.is_empty() || state.items.len() != state.snapshot.len() {
            return true;
        }
        if state
            .items
            .iter()
            .zip(&state.snapshot)
            .any(|(a, b)| !Node::ptr_eq(a, b))
        {
            return true;
        }
        state.items.iter().any(|n| !n.status().is_unchanged())
    }

    pub(crate) fn status(&self) -> ChangeStatus {
        if self.is_changed() {
            ChangeStatus::Changed
        } else {
            ChangeStatus::Unchanged
        }
    }

    pub(crate) fn current_records(&self) -> Result<Vec<Box<dyn Trackable>>, TrackError> {
        let items = self.nodes();
        items.iter().map(Node::current_record).collect()
    }

    pub(crate) fn original_records(&self) -> Result<Vec<Box<dyn Trackable>>, TrackError> {
        let snapshot = lock(&self.inner.state).snapshot.clone();
        snapshot.iter().map(Node::original_record).collect()
    }

    /// Commits: purges the deleted set, re-snapshots the current items, and
    /// accepts each of them.
    pub(crate) fn accept(&self) {
        let (items, purged) = {
            let mut state = lock(&self.inner.state);
            let purged: Vec<Node> = state.deleted.drain(..).map(|(n, _)| n).collect();
            state.snapshot = state.items.clone();
            (state.items.clone(), purged)
        };
        for node in purged {
            // permanently out of the graph; back to a standalone wrapper
            node.set_mark(ChangeStatus::Unchanged);
        }
        for node in &items {
            node.accept();
        }
    }

    /// Reverts: restores the membership (and order) of the snapshot, drops
    /// additions, and rejects each restored item.
    pub(crate) fn reject(&self) {
        let items = {
            let mut state = lock(&self.inner.state);
            state.deleted.clear();
            for node in &state.items {
                if state.snapshot_position(node).is_none() {
                    // a discarded addition reverts to a standalone wrapper
                    node.set_mark(ChangeStatus::Unchanged);
                }
            }
            state.items = state.snapshot.clone();
            state.items.clone()
        };
        for node in &items {
            node.reject();
        }
    }
}

/// A tracked, ordered collection of records of type `E`.
///
/// `TrackedList` is a cheaply clonable handle; clones observe and mutate
/// the same collection. Elements enter as raw records (wrapped on entry)
/// or as existing [`Tracked`] handles, and membership is tracked by handle
/// identity: [`added_items`](TrackedList::added_items),
/// [`deleted_items`](TrackedList::deleted_items) and friends partition the
/// contents, and add/remove pairs at the same index cancel back to
/// [`Unchanged`](ChangeStatus::Unchanged).
pub struct TrackedList<E: Trackable> {
    handle: ListHandle,
    _type: PhantomData<fn() -> E>,
}

impl<E: Trackable> Clone for TrackedList<E> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _type: PhantomData,
        }
    }
}

impl<E: Trackable> TrackedList<E> {
    /// Wraps `items`, taking exclusive ownership. Every element is wrapped
    /// [`Unchanged`](ChangeStatus::Unchanged) and the initial membership
    /// becomes the snapshot.
    pub fn new(items: Vec<E>) -> Self {
        let nodes = items
            .into_iter()
            .map(|item| Node::new(Box::new(item)))
            .collect();
        Self {
            handle: ListHandle::new(nodes, E::describe()),
            _type: PhantomData,
        }
    }

    pub(crate) fn from_handle(handle: ListHandle) -> Result<Self, TrackError> {
        if handle.elem_schema().type_id() != TypeId::of::<E>() {
            return Err(TrackError::InvalidCast {
                expected: std::any::type_name::<E>(),
                actual: handle.elem_schema().type_name(),
            });
        }
        Ok(Self {
            handle,
            _type: PhantomData,
        })
    }

    /// Whether two handles track the same collection.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        ListHandle::ptr_eq(&a.handle, &b.handle)
    }

    /// The number of visible items.
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    /// Whether there are no visible items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tracked item at `index`.
    pub fn get(&self, index: usize) -> Option<Tracked<E>> {
        self.handle.node_at(index).map(Tracked::from_node_unchecked)
    }

    /// The visible items, as handles.
    pub fn iter(&self) -> impl Iterator<Item = Tracked<E>> {
        self.handle
            .nodes()
            .into_iter()
            .map(Tracked::from_node_unchecked)
    }

    /// Appends a raw record; it enters as
    /// [`Added`](ChangeStatus::Added).
    pub fn push(&self, item: E) {
        self.insert(self.len(), item);
    }

    /// Appends an existing tracked handle. See
    /// [`insert_tracked`](TrackedList::insert_tracked).
    pub fn push_tracked(&self, item: Tracked<E>) -> Result<(), TrackError> {
        self.insert_tracked(self.len(), item)
    }

    /// Inserts a raw record at `index`; it is wrapped on entry and enters
    /// as [`Added`](ChangeStatus::Added).
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&self, index: usize, item: E) {
        self.handle
            .insert_node(index, Node::new(Box::new(item)))
            .expect("freshly wrapped elements match the list element type");
    }

    /// Inserts an existing tracked handle at `index`.
    ///
    /// Restores the item if it is currently in this collection's deleted
    /// set, cancelling the deletion entirely when it returns to its
    /// original index with clean internals. Fails with
    /// [`TrackError::AlreadyTracking`] if the handle is already an added
    /// member of this collection.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert_tracked(&self, index: usize, item: Tracked<E>) -> Result<(), TrackError> {
        self.handle.insert_node(index, item.node().clone())
    }

    /// Removes `item` from the visible items; returns `false` if it is not
    /// a member. An original member becomes
    /// [`Deleted`](ChangeStatus::Deleted); an added item is dropped
    /// entirely and never appears in
    /// [`deleted_items`](TrackedList::deleted_items).
    pub fn remove(&self, item: &Tracked<E>) -> bool {
        self.handle.remove_node(item.node())
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&self, index: usize) -> Option<Tracked<E>> {
        self.handle.remove_at(index).map(Tracked::from_node_unchecked)
    }

    /// Indexer assignment: replaces the item at `index` with a raw record,
    /// returning the previous occupant. Equivalent to removing the occupant
    /// and inserting the new record at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&self, index: usize, item: E) -> Tracked<E> {
        self.handle
            .replace_at(index, Node::new(Box::new(item)))
            .map(Tracked::from_node_unchecked)
            .expect("freshly wrapped elements match the list element type")
    }

    /// Indexer assignment from an existing tracked handle.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set_tracked(&self, index: usize, item: Tracked<E>) -> Result<Tracked<E>, TrackError> {
        self.handle
            .replace_at(index, item.node().clone())
            .map(Tracked::from_node_unchecked)
    }

    /// Restores a deleted item at its original index (clamped to the
    /// current length). Fails with [`TrackError::NotDeleted`] if the item
    /// is not currently deleted.
    pub fn undelete(&self, item: &Tracked<E>) -> Result<(), TrackError> {
        self.handle.undelete(item.node())
    }

    /// The items added since the last accept.
    pub fn added_items(&self) -> Vec<Tracked<E>> {
        wrap_all(self.handle.added_nodes())
    }

    /// The original items whose status is not Unchanged.
    pub fn changed_items(&self) -> Vec<Tracked<E>> {
        wrap_all(self.handle.changed_nodes())
    }

    /// The original items whose status is Unchanged.
    pub fn unchanged_items(&self) -> Vec<Tracked<E>> {
        wrap_all(self.handle.unchanged_nodes())
    }

    /// The items deleted since the last accept.
    pub fn deleted_items(&self) -> Vec<Tracked<E>> {
        wrap_all(self.handle.deleted_nodes())
    }

    /// Whether the collection differs in any way from its snapshot.
    pub fn is_changed(&self) -> bool {
        self.handle.is_changed()
    }

    /// The collection's derived status.
    pub fn status(&self) -> ChangeStatus {
        self.handle.status()
    }

    /// Deep clones of the visible items.
    pub fn to_records(&self) -> Result<Vec<E>, TrackError> {
        Ok(self
            .handle
            .current_records()?
            .into_iter()
            .map(|boxed| {
                *boxed
                    .into_any()
                    .downcast::<E>()
                    .expect("facade type verified at construction")
            })
            .collect())
    }

    pub(crate) fn handle(&self) -> &ListHandle {
        &self.handle
    }
}

fn wrap_all<E: Trackable>(nodes: Vec<Node>) -> Vec<Tracked<E>> {
    nodes.into_iter().map(Tracked::from_node_unchecked).collect()
}

impl<E: Trackable> fmt::Debug for TrackedList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedList")
            .field("len", &self.len())
            .field("status", &self.status())
            .finish()
    }
}
