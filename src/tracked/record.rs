// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Tracked records: scalar originals, lazy complex children, status rollup.

use super::{
    list::{ListHandle, TrackedList},
    lock,
};
use crate::{
    ChangeStatus, Schema, ScalarValue, TrackError, Trackable,
    schema::{PropertyKind, PropertySpec},
};
use ahash::RandomState;
use std::{
    any::TypeId,
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU8, Ordering},
    },
};

/// The engine-side wrapper around one record.
///
/// Cloning a `Node` clones the handle, not the record; two clones observe
/// and mutate the same tracking state, and pointer identity is tracking
/// identity.
pub(crate) struct Node {
    inner: Arc<NodeInner>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct NodeInner {
    schema: &'static Schema,
    /// The record and its scalar originals.
    state: Mutex<ScalarState>,
    /// The lazily built child wrappers. Guarded separately so that wrapping
    /// does not contend with scalar access; always acquired after `state`.
    children: Mutex<ChildState>,
    /// The membership mark maintained by collection operations.
    mark: AtomicU8,
}

struct ScalarState {
    record: Box<dyn Trackable>,
    /// Pre-mutation snapshots, present only for scalars that currently
    /// differ from their original. First write wins; writing the original
    /// value back removes the entry.
    original: HashMap<&'static str, ScalarValue, RandomState>,
}

struct ChildState {
    /// Wrapped complex children. A populated slot never un-populates; a
    /// `None` value means the property was set to null after wrapping.
    complex: HashMap<&'static str, Option<Node>, RandomState>,
    /// The child each assigned-over complex slot held before its first
    /// reassignment. First write wins, and assigning the original child
    /// back removes the entry.
    original_complex: HashMap<&'static str, Option<Node>, RandomState>,
    /// Wrapped collection children.
    collections: HashMap<&'static str, ListHandle, RandomState>,
    /// The latched result of `complex_trackables`, once computed.
    materialized: Option<Vec<Node>>,
}

const MARK_UNCHANGED: u8 = 0;
const MARK_ADDED: u8 = 1;
const MARK_CHANGED: u8 = 2;
const MARK_DELETED: u8 = 3;

impl Node {
    pub(crate) fn new(record: Box<dyn Trackable>) -> Self {
        let schema = record.schema();
        tracing::debug!(record = schema.type_name(), "wrapping record");
        Self {
            inner: Arc::new(NodeInner {
                schema,
                state: Mutex::new(ScalarState {
                    record,
                    original: HashMap::default(),
                }),
                children: Mutex::new(ChildState {
                    complex: HashMap::default(),
                    original_complex: HashMap::default(),
                    collections: HashMap::default(),
                    materialized: None,
                }),
                mark: AtomicU8::new(MARK_UNCHANGED),
            }),
        }
    }

    pub(crate) fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn schema(&self) -> &'static Schema {
        self.inner.schema
    }

    pub(crate) fn mark(&self) -> ChangeStatus {
        match self.inner.mark.load(Ordering::Acquire) {
            MARK_ADDED => ChangeStatus::Added,
            MARK_CHANGED => ChangeStatus::Changed,
            MARK_DELETED => ChangeStatus::Deleted,
            _ => ChangeStatus::Unchanged,
        }
    }

    pub(crate) fn set_mark(&self, status: ChangeStatus) {
        let raw = match status {
            ChangeStatus::Unchanged => MARK_UNCHANGED,
            ChangeStatus::Added => MARK_ADDED,
            ChangeStatus::Changed => MARK_CHANGED,
            ChangeStatus::Deleted => MARK_DELETED,
        };
        self.inner.mark.store(raw, Ordering::Release);
    }

    /// Resolves `property` against the schema, requiring `expected` kind.
    fn spec_of(
        &self,
        property: &str,
        expected: PropertyKind,
    ) -> Result<&'static PropertySpec, TrackError> {
        let schema = self.inner.schema;
        let spec = schema
            .property(property)
            .ok_or_else(|| TrackError::unknown_property(schema.type_name(), property))?;
        if spec.kind() != expected {
            return Err(TrackError::WrongKind {
                type_name: schema.type_name(),
                property: spec.name(),
                expected,
                actual: spec.kind(),
            });
        }
        if expected != PropertyKind::Scalar && !schema.is_trackable(spec.name()) {
            return Err(TrackError::SchemaIneligible {
                type_name: schema.type_name(),
                property: spec.name(),
            });
        }
        Ok(spec)
    }

    pub(crate) fn get_scalar(&self, property: &str) -> Result<ScalarValue, TrackError> {
        let spec = self.spec_of(property, PropertyKind::Scalar)?;
        let state = lock(&self.inner.state);
        state.record.get_scalar(spec.name())
    }

    pub(crate) fn set_scalar(&self, property: &str, value: ScalarValue) -> Result<(), TrackError> {
        let spec = self.spec_of(property, PropertyKind::Scalar)?;
        let name = spec.name();
        let mut state = lock(&self.inner.state);
        let prior = state.record.get_scalar(name)?;
        let current = value.clone();
        state.record.set_scalar(name, value)?;
        // first write wins for the original
        state.original.entry(name).or_insert(prior);
        // writing the original back lets the status decay to unchanged
        if state.original.get(name) == Some(&current) {
            state.original.remove(name);
        }
        Ok(())
    }

    pub(crate) fn original_value(&self, property: &str) -> Result<ScalarValue, TrackError> {
        let spec = self.spec_of(property, PropertyKind::Scalar)?;
        let name = spec.name();
        let state = lock(&self.inner.state);
        match state.original.get(name) {
            Some(original) => Ok(original.clone()),
            None => state.record.get_scalar(name),
        }
    }

    /// Returns the wrapped child of a complex property, wrapping it on first
    /// access. A null-valued property produces no wrapper; a later non-null
    /// assignment will.
    pub(crate) fn complex_child(&self, property: &str) -> Result<Option<Node>, TrackError> {
        let spec = self.spec_of(property, PropertyKind::Complex)?;
        let name = spec.name();
        let mut state = lock(&self.inner.state);
        let mut children = lock(&self.inner.children);
        if let Some(slot) = children.complex.get(name) {
            return Ok(slot.clone());
        }
        match state.record.take_complex(name)? {
            None => Ok(None),
            Some(boxed) => {
                let node = Node::new(boxed);
                children.complex.insert(name, Some(node.clone()));
                Ok(Some(node))
            }
        }
    }

    /// Assigns a complex property, recording the displaced child so reject
    /// can restore it.
    pub(crate) fn set_complex_child(
        &self,
        property: &str,
        value: Option<Node>,
    ) -> Result<(), TrackError> {
        let spec = self.spec_of(property, PropertyKind::Complex)?;
        if let (Some(node), Some(child_schema)) = (&value, spec.child_schema()) {
            if node.schema().type_id() != child_schema.type_id() {
                return Err(TrackError::InvalidCast {
                    expected: child_schema.type_name(),
                    actual: node.schema().type_name(),
                });
            }
        }
        let name = spec.name();
        let mut state = lock(&self.inner.state);
        let mut children = lock(&self.inner.children);
        let current = match children.complex.get(name) {
            Some(slot) => slot.clone(),
            None => state.record.take_complex(name)?.map(Node::new),
        };
        if !children.original_complex.contains_key(name) {
            children.original_complex.insert(name, current);
        }
        children.complex.insert(name, value.clone());
        // assigning the original child back decays the entry, mirroring the
        // scalar rule
        if let Some(original) = children.original_complex.get(name) {
            if option_ptr_eq(original, &value) {
                children.original_complex.remove(name);
            }
        }
        Ok(())
    }

    /// Returns the wrapped collection of a collection property, wrapping it
    /// on first access.
    pub(crate) fn collection_child(&self, property: &str) -> Result<ListHandle, TrackError> {
        let spec = self.spec_of(property, PropertyKind::Collection)?;
        let name = spec.name();
        let mut state = lock(&self.inner.state);
        let mut children = lock(&self.inner.children);
        if let Some(list) = children.collections.get(name) {
            return Ok(list.clone());
        }
        let elements = state.record.take_elements(name)?;
        let child_schema = spec
            .child_schema()
            .expect("collection properties always carry a child schema");
        let nodes = elements.into_iter().map(Node::new).collect();
        let list = ListHandle::new(nodes, child_schema);
        children.collections.insert(name, list.clone());
        Ok(list)
    }

    /// Materializes every eligible complex child and latches the result:
    /// subsequent calls return the first call's set.
    pub(crate) fn complex_trackables(&self) -> Result<Vec<Node>, TrackError> {
        let mut state = lock(&self.inner.state);
        let mut children = lock(&self.inner.children);
        if let Some(cached) = &children.materialized {
            return Ok(cached.clone());
        }
        let mut out = Vec::new();
        for spec in self.inner.schema.complex() {
            let name = spec.name();
            if !self.inner.schema.is_trackable(name) {
                continue;
            }
            let slot = match children.complex.get(name) {
                Some(slot) => slot.clone(),
                None => match state.record.take_complex(name)? {
                    None => None,
                    Some(boxed) => {
                        let node = Node::new(boxed);
                        children.complex.insert(name, Some(node.clone()));
                        Some(node)
                    }
                },
            };
            out.extend(slot);
        }
        children.materialized = Some(out.clone());
        Ok(out)
    }

    /// The record's status as derived from its own bookkeeping, ignoring the
    /// membership mark. This is what decides add/remove cancellation.
    pub(crate) fn internal_status(&self) -> ChangeStatus {
        {
            let state = lock(&self.inner.state);
            if !state.original.is_empty() {
                return ChangeStatus::Changed;
            }
        }
        let children = lock(&self.inner.children);
        if !children.original_complex.is_empty() {
            return ChangeStatus::Changed;
        }
        for slot in children.complex.values().flatten() {
            if !slot.status().is_unchanged() {
                return ChangeStatus::Changed;
            }
        }
        for list in children.collections.values() {
            if list.is_changed() {
                return ChangeStatus::Changed;
            }
        }
        ChangeStatus::Unchanged
    }

    /// The record's visible status: the membership mark when one is set,
    /// otherwise the internal rollup.
    pub(crate) fn status(&self) -> ChangeStatus {
        match self.mark() {
            ChangeStatus::Unchanged => self.internal_status(),
            marked => marked,
        }
    }

    /// A deep clone of the current state, with materialized children folded
    /// back into their parent fields.
    pub(crate) fn current_record(&self) -> Result<Box<dyn Trackable>, TrackError> {
        let mut record = {
            let state = lock(&self.inner.state);
            state.record.boxed_clone()
        };
        let children = lock(&self.inner.children);
        for (name, slot) in &children.complex {
            let child = slot.as_ref().map(Node::current_record).transpose()?;
            record.put_complex(name, child)?;
        }
        for (name, list) in &children.collections {
            record.put_elements(name, list.current_records()?)?;
        }
        Ok(record)
    }

    /// A deep clone of the state at wrap time or the last accept.
    pub(crate) fn original_record(&self) -> Result<Box<dyn Trackable>, TrackError> {
        let mut record = {
            let state = lock(&self.inner.state);
            let mut record = state.record.boxed_clone();
            for (name, value) in &state.original {
                record.set_scalar(name, value.clone())?;
            }
            record
        };
        let children = lock(&self.inner.children);
        for (name, slot) in &children.complex {
            let effective = children.original_complex.get(name).unwrap_or(slot);
            let child = effective.as_ref().map(Node::original_record).transpose()?;
            record.put_complex(name, child)?;
        }
        for (name, list) in &children.collections {
            record.put_elements(name, list.original_records()?)?;
        }
        Ok(record)
    }

    pub(crate) fn with_record<T>(&self, f: impl FnOnce(&dyn Trackable) -> T) -> T {
        let state = lock(&self.inner.state);
        f(state.record.as_ref())
    }

    /// Clears all bookkeeping, making the current state the new original.
    /// Depth-first; every descendant ends Unchanged.
    pub(crate) fn accept(&self) {
        {
            let mut state = lock(&self.inner.state);
            state.original.clear();
        }
        let (slots, lists) = {
            let mut children = lock(&self.inner.children);
            children.original_complex.clear();
            let slots: Vec<Node> = children.complex.values().flatten().cloned().collect();
            let lists: Vec<ListHandle> = children.collections.values().cloned().collect();
            (slots, lists)
        };
        for child in slots {
            child.accept();
        }
        for list in lists {
            list.accept();
        }
        self.set_mark(ChangeStatus::Unchanged);
    }

    /// Restores the state at wrap time or the last accept: scalars first,
    /// then displaced complex slots, then recursion into the (restored)
    /// children.
    pub(crate) fn reject(&self) {
        {
            let mut state = lock(&self.inner.state);
            let originals: Vec<_> = state.original.drain().collect();
            for (name, value) in originals {
                state
                    .record
                    .set_scalar(name, value)
                    .expect("original values always fit their fields");
            }
        }
        let (slots, lists) = {
            let mut children = lock(&self.inner.children);
            let displaced: Vec<_> = children.original_complex.drain().collect();
            for (name, slot) in displaced {
                children.complex.insert(name, slot);
            }
            let slots: Vec<Node> = children.complex.values().flatten().cloned().collect();
            let lists: Vec<ListHandle> = children.collections.values().cloned().collect();
            (slots, lists)
        };
        for child in slots {
            child.reject();
        }
        for list in lists {
            list.reject();
        }
        self.set_mark(ChangeStatus::Unchanged);
    }
}

fn option_ptr_eq(a: &Option<Node>, b: &Option<Node>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Node::ptr_eq(a, b),
        _ => false,
    }
}

/// A tracked record of type `R`.
///
/// `Tracked` is a cheaply clonable handle; clones observe and mutate the
/// same tracking state, and [`Tracked::ptr_eq`] compares tracking identity.
/// The wrapper exclusively owns the record: read scalars through
/// [`get`](Tracked::get), nested records through
/// [`complex`](Tracked::complex), and collections through
/// [`collection`](Tracked::collection); take a folded deep clone with
/// [`to_record`](Tracked::to_record).
pub struct Tracked<R: Trackable> {
    node: Node,
    _type: PhantomData<fn() -> R>,
}

impl<R: Trackable> Clone for Tracked<R> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            _type: PhantomData,
        }
    }
}

impl<R: Trackable> Tracked<R> {
    /// Wraps `record`, taking exclusive ownership of it.
    ///
    /// The freshly wrapped record is
    /// [`Unchanged`](ChangeStatus::Unchanged).
    pub fn new(record: R) -> Self {
        Self::from_node_unchecked(Node::new(Box::new(record)))
    }

    pub(crate) fn from_node(node: Node) -> Result<Self, TrackError> {
        if node.schema().type_id() != TypeId::of::<R>() {
            return Err(TrackError::InvalidCast {
                expected: std::any::type_name::<R>(),
                actual: node.schema().type_name(),
            });
        }
        Ok(Self::from_node_unchecked(node))
    }

    pub(crate) fn from_node_unchecked(node: Node) -> Self {
        Self {
            node,
            _type: PhantomData,
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    /// Whether two handles track the same record.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Node::ptr_eq(&a.node, &b.node)
    }

    /// The record's status.
    pub fn status(&self) -> ChangeStatus {
        self.node.status()
    }

    /// Reads the scalar property `property`.
    pub fn get(&self, property: &str) -> Result<ScalarValue, TrackError> {
        self.node.get_scalar(property)
    }

    /// Writes the scalar property `property`.
    ///
    /// The first write records the pre-mutation value; writing that value
    /// back clears the entry and lets the status decay to
    /// [`Unchanged`](ChangeStatus::Unchanged). Complex and collection
    /// properties are written through
    /// [`set_complex`](Tracked::set_complex) and mutated through
    /// [`collection`](Tracked::collection) instead.
    pub fn set(&self, property: &str, value: impl Into<ScalarValue>) -> Result<(), TrackError> {
        self.node.set_scalar(property, value.into())
    }

    /// The pre-mutation value of `property`: its recorded original if the
    /// scalar currently differs, otherwise its current value.
    pub fn original_value(&self, property: &str) -> Result<ScalarValue, TrackError> {
        self.node.original_value(property)
    }

    /// A deep clone of the record as it stood at wrap time or the last
    /// accept.
    pub fn original(&self) -> Result<R, TrackError> {
        let boxed = self.node.original_record()?;
        Ok(*boxed
            .into_any()
            .downcast::<R>()
            .expect("facade type verified at construction"))
    }

    /// A deep clone of the record's current state, with all materialized
    /// children folded back into their fields.
    pub fn to_record(&self) -> Result<R, TrackError> {
        let boxed = self.node.current_record()?;
        Ok(*boxed
            .into_any()
            .downcast::<R>()
            .expect("facade type verified at construction"))
    }

    /// Runs `f` over the raw record.
    ///
    /// Children that have been materialized into wrappers are absent from
    /// the raw record (their fields are `None` or empty); use
    /// [`to_record`](Tracked::to_record) for a folded view.
    pub fn with<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        self.node.with_record(|record| {
            let record = record
                .as_any()
                .downcast_ref::<R>()
                .expect("facade type verified at construction");
            f(record)
        })
    }

    /// The tracked child of the complex property `property`, wrapped on
    /// first access. Returns `None` while the property is null.
    pub fn complex<C: Trackable>(&self, property: &str) -> Result<Option<Tracked<C>>, TrackError> {
        match self.node.complex_child(property)? {
            None => Ok(None),
            Some(node) => Tracked::from_node(node).map(Some),
        }
    }

    /// Assigns the complex property `property` from a raw record, wrapping
    /// it.
    pub fn set_complex<C: Trackable>(
        &self,
        property: &str,
        value: Option<C>,
    ) -> Result<(), TrackError> {
        self.node
            .set_complex_child(property, value.map(|c| Node::new(Box::new(c))))
    }

    /// Assigns the complex property `property` from an existing tracked
    /// handle, storing it directly.
    pub fn set_complex_tracked<C: Trackable>(
        &self,
        property: &str,
        child: Tracked<C>,
    ) -> Result<(), TrackError> {
        self.node.set_complex_child(property, Some(child.node))
    }

    /// The tracked collection of the collection property `property`,
    /// wrapped on first access.
    pub fn collection<E: Trackable>(&self, property: &str) -> Result<TrackedList<E>, TrackError> {
        TrackedList::from_handle(self.node.collection_child(property)?)
    }

    /// Materializes and returns every complex child. The result is latched:
    /// later calls return the first call's set even if more complex
    /// properties have been assigned since.
    pub fn complex_property_trackables(&self) -> Result<Vec<AnyTracked>, TrackError> {
        Ok(self
            .node
            .complex_trackables()?
            .into_iter()
            .map(|node| AnyTracked { node })
            .collect())
    }
}

impl<R: Trackable> fmt::Debug for Tracked<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // status first: it takes the state lock that with_record holds
        let status = self.node.status();
        self.node
            .with_record(|record| write!(f, "Tracked({record:?}, {status})"))
    }
}

/// An untyped tracked-record handle, as returned by
/// [`Tracked::complex_property_trackables`].
pub struct AnyTracked {
    pub(crate) node: Node,
}

impl Clone for AnyTracked {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl AnyTracked {
    /// Whether two handles track the same record.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Node::ptr_eq(&a.node, &b.node)
    }

    /// The record's schema.
    pub fn schema(&self) -> &'static Schema {
        self.node.schema()
    }

    /// The record's status.
    pub fn status(&self) -> ChangeStatus {
        self.node.status()
    }

    /// A typed view of this handle.
    ///
    /// Fails with [`TrackError::InvalidCast`] if the record is not an `R`.
    pub fn downcast<R: Trackable>(&self) -> Result<Tracked<R>, TrackError> {
        Tracked::from_node(self.node.clone())
    }
}

impl fmt::Debug for AnyTracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.node.status();
        self.node
            .with_record(|record| write!(f, "Tracked({record:?}, {status})"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ChangeStatus, Track, TrackError, Transact};

    crate::trackable! {
        struct Address {
            scalar city: String,
            scalar zip: String,
        }
    }

    crate::trackable! {
        struct Customer {
            scalar name: String,
            complex address: Address,
        }
    }

    fn customer() -> Tracked<Customer> {
        Customer {
            name: "Ada".into(),
            address: Some(Address {
                city: "London".into(),
                zip: "N1".into(),
            }),
        }
        .into_tracked()
        .unwrap()
    }

    use super::*;

    #[test]
    fn fresh_wrap_is_unchanged() {
        let tracked = customer();
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
        assert_eq!(tracked.get("name").unwrap(), "Ada");
    }

    #[test]
    fn first_write_wins_for_originals() {
        let tracked = customer();
        tracked.set("name", "Grace").unwrap();
        tracked.set("name", "Edsger").unwrap();
        assert_eq!(tracked.original_value("name").unwrap(), "Ada");
        assert_eq!(tracked.status(), ChangeStatus::Changed);
    }

    #[test]
    fn writing_the_original_back_decays_to_unchanged() {
        let tracked = customer();
        tracked.set("name", "Grace").unwrap();
        tracked.set("name", "Ada").unwrap();
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
        assert_eq!(tracked.original_value("name").unwrap(), "Ada");
    }

    #[test]
    fn lazy_wrapping_is_idempotent() {
        let tracked = customer();
        let first = tracked.complex::<Address>("address").unwrap().unwrap();
        let second = tracked.complex::<Address>("address").unwrap().unwrap();
        assert!(Tracked::ptr_eq(&first, &second));
    }

    #[test]
    fn null_complex_property_has_no_wrapper() {
        let tracked = Customer {
            name: "Ada".into(),
            address: None,
        }
        .into_tracked()
        .unwrap();
        assert!(tracked.complex::<Address>("address").unwrap().is_none());
        // a later non-null assignment wraps
        tracked
            .set_complex(
                "address",
                Some(Address {
                    city: "Paris".into(),
                    zip: "75".into(),
                }),
            )
            .unwrap();
        assert!(tracked.complex::<Address>("address").unwrap().is_some());
        assert_eq!(tracked.status(), ChangeStatus::Changed);
    }

    #[test]
    fn nested_changes_roll_up() {
        let tracked = customer();
        let address = tracked.complex::<Address>("address").unwrap().unwrap();
        address.set("city", "Oxford").unwrap();
        assert_eq!(address.status(), ChangeStatus::Changed);
        assert_eq!(tracked.status(), ChangeStatus::Changed);
        address.set("city", "London").unwrap();
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    }

    #[test]
    fn replacing_a_complex_child_is_a_change_and_rejects_back() {
        let tracked = customer();
        let original = tracked.complex::<Address>("address").unwrap().unwrap();
        tracked
            .set_complex(
                "address",
                Some(Address {
                    city: "Paris".into(),
                    zip: "75".into(),
                }),
            )
            .unwrap();
        assert_eq!(tracked.status(), ChangeStatus::Changed);
        tracked.reject_changes();
        let restored = tracked.complex::<Address>("address").unwrap().unwrap();
        assert!(Tracked::ptr_eq(&original, &restored));
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    }

    #[test]
    fn reassigning_the_original_child_decays() {
        let tracked = customer();
        let original = tracked.complex::<Address>("address").unwrap().unwrap();
        tracked
            .set_complex(
                "address",
                Some(Address {
                    city: "Paris".into(),
                    zip: "75".into(),
                }),
            )
            .unwrap();
        tracked
            .set_complex_tracked("address", original.clone())
            .unwrap();
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    }

    #[test]
    fn original_is_a_deep_pre_mutation_clone() {
        let tracked = customer();
        tracked.set("name", "Grace").unwrap();
        let address = tracked.complex::<Address>("address").unwrap().unwrap();
        address.set("city", "Oxford").unwrap();
        let original = tracked.original().unwrap();
        assert_eq!(original.name, "Ada");
        assert_eq!(original.address.unwrap().city, "London");
        // current view is unaffected
        assert_eq!(tracked.to_record().unwrap().address.unwrap().city, "Oxford");
    }

    #[test]
    fn property_addressing_errors() {
        let tracked = customer();
        assert!(matches!(
            tracked.get("nope"),
            Err(TrackError::UnknownProperty { .. })
        ));
        assert!(matches!(
            tracked.get("address"),
            Err(TrackError::WrongKind { .. })
        ));
        assert!(matches!(
            tracked.complex::<Address>("name"),
            Err(TrackError::WrongKind { .. })
        ));
        assert!(matches!(
            tracked.set("name", 3u64),
            Err(TrackError::InvalidCast { .. })
        ));
        // a failed write leaves no original behind
        assert_eq!(tracked.status(), ChangeStatus::Unchanged);
    }

    #[test]
    fn complex_property_trackables_latch_once() {
        let tracked = Customer {
            name: "Ada".into(),
            address: None,
        }
        .into_tracked()
        .unwrap();
        assert!(tracked.complex_property_trackables().unwrap().is_empty());
        tracked
            .set_complex(
                "address",
                Some(Address {
                    city: "Paris".into(),
                    zip: "75".into(),
                }),
            )
            .unwrap();
        // latched: the later assignment does not re-scan
        assert!(tracked.complex_property_trackables().unwrap().is_empty());
    }

    #[test]
    fn any_tracked_downcasts() {
        let tracked = customer();
        let children = tracked.complex_property_trackables().unwrap();
        assert_eq!(children.len(), 1);
        let address = children[0].downcast::<Address>().unwrap();
        assert_eq!(address.get("city").unwrap(), "London");
        assert!(children[0].downcast::<Customer>().is_err());
    }

    #[quickcheck]
    fn scalar_status_tracks_difference(writes: Vec<u32>) -> bool {
        let tracked = customer();
        let mut ok = true;
        for write in &writes {
            tracked.set("name", format!("name-{write}")).unwrap();
            ok &= tracked.status() == ChangeStatus::Changed;
            ok &= tracked.original_value("name").unwrap() == "Ada";
        }
        tracked.set("name", "Ada").unwrap();
        ok && tracked.status() == ChangeStatus::Unchanged
    }

    #[quickcheck]
    fn reject_restores_any_scalar_history(writes: Vec<u32>) -> bool {
        let tracked = customer();
        for write in &writes {
            tracked.set("name", format!("name-{write}")).unwrap();
        }
        tracked.reject_changes();
        tracked.to_record().unwrap()
            == Customer {
                name: "Ada".into(),
                address: Some(Address {
                    city: "London".into(),
                    zip: "N1".into(),
                }),
            }
    }

    #[quickcheck]
    fn accept_then_reject_is_stable(writes: Vec<u32>) -> bool {
        let tracked = customer();
        for write in &writes {
            tracked.set("name", format!("name-{write}")).unwrap();
        }
        tracked.accept_changes();
        let committed = tracked.to_record().unwrap();
        tracked.set("name", "scratch").unwrap();
        tracked.reject_changes();
        tracked.status() == ChangeStatus::Unchanged && tracked.to_record().unwrap() == committed
    }
}
