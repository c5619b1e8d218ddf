// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Per-type property descriptors.
//!
//! Where the original proxy-based implementations of change tracking discover
//! properties through reflection, this crate precomputes a [`Schema`] per
//! record type: the set of named properties, each classified as scalar,
//! complex (a nested record), or collection (an ordered sequence of records).
//! The schema is built exactly once per type (the generated
//! [`Trackable::describe`](crate::Trackable::describe) impl holds it in a
//! `OnceLock`) and is owned by the type, not by any global registry.
//!
//! Complex and collection properties reference their element type's schema
//! through a thunk rather than directly, so mutually referential record types
//! can each finish constructing their own descriptor. Cyclic type graphs are
//! not trackable: the first status or wrap operation on a schema runs a
//! reachability analysis, and any property whose type graph re-enters an
//! ancestor type is marked ineligible with a diagnostic. Tracking such a
//! property afterwards fails with
//! [`TrackError::SchemaIneligible`](crate::TrackError::SchemaIneligible).

use std::{any::TypeId, fmt, sync::OnceLock};

/// The classification of a record property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A primitive or value-like field, tracked through
    /// [`ScalarValue`](crate::ScalarValue).
    Scalar,
    /// A nested record field, lazily wrapped into a tracked child.
    Complex,
    /// An ordered sequence of records, wrapped into a tracked collection.
    Collection,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Scalar => "scalar",
            PropertyKind::Complex => "complex",
            PropertyKind::Collection => "collection",
        };
        f.write_str(name)
    }
}

/// One named property of a record type.
pub struct PropertySpec {
    name: &'static str,
    kind: PropertyKind,
    // Thunk rather than a direct reference so that mutually referential
    // schemas can be constructed.
    child: Option<fn() -> &'static Schema>,
}

impl PropertySpec {
    /// Describes a scalar property.
    pub fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: PropertyKind::Scalar,
            child: None,
        }
    }

    /// Describes a complex property whose nested record type has `child` as
    /// its schema.
    pub fn complex(name: &'static str, child: fn() -> &'static Schema) -> Self {
        Self {
            name,
            kind: PropertyKind::Complex,
            child: Some(child),
        }
    }

    /// Describes a collection property whose element type has `child` as its
    /// schema.
    pub fn collection(name: &'static str, child: fn() -> &'static Schema) -> Self {
        Self {
            name,
            kind: PropertyKind::Collection,
            child: Some(child),
        }
    }

    /// The property name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The property classification.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// The schema of the nested record or element type, for complex and
    /// collection properties.
    pub fn child_schema(&self) -> Option<&'static Schema> {
        self.child.map(|thunk| thunk())
    }
}

impl fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// The property descriptor of a record type.
///
/// Built by the generated [`Trackable::describe`](crate::Trackable::describe)
/// impl (or by hand for hand-written `Trackable` types) and held in a
/// per-type static.
pub struct Schema {
    type_name: &'static str,
    type_id: TypeId,
    properties: Vec<PropertySpec>,
    ineligible: OnceLock<Vec<&'static str>>,
}

impl Schema {
    /// Creates a schema for the type named `type_name` with identity
    /// `type_id` and the given properties.
    pub fn new(type_name: &'static str, type_id: TypeId, properties: Vec<PropertySpec>) -> Self {
        Self {
            type_name,
            type_id,
            properties,
            ineligible: OnceLock::new(),
        }
    }

    /// The record type's name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The record type's identity.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// All properties, in declaration order.
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The scalar properties.
    pub fn scalars(&self) -> impl Iterator<Item = &PropertySpec> {
        self.of_kind(PropertyKind::Scalar)
    }

    /// The complex properties.
    pub fn complex(&self) -> impl Iterator<Item = &PropertySpec> {
        self.of_kind(PropertyKind::Complex)
    }

    /// The collection properties.
    pub fn collections(&self) -> impl Iterator<Item = &PropertySpec> {
        self.of_kind(PropertyKind::Collection)
    }

    fn of_kind(&self, kind: PropertyKind) -> impl Iterator<Item = &PropertySpec> {
        self.properties.iter().filter(move |p| p.kind == kind)
    }

    /// Whether `name` may be tracked, i.e. its type graph does not re-enter
    /// an ancestor type. Scalar properties are always trackable.
    pub fn is_trackable(&self, name: &str) -> bool {
        !self.ineligible().iter().any(|excluded| *excluded == name)
    }

    /// The names of properties excluded from tracking by the cycle analysis.
    ///
    /// Computed once per schema; the first call walks the reachable type
    /// graph and emits a diagnostic for every offending property.
    pub fn ineligible(&self) -> &[&'static str] {
        self.ineligible.get_or_init(|| {
            let mut offending = Vec::new();
            for property in &self.properties {
                let Some(child) = property.child_schema() else {
                    continue;
                };
                let mut stack = vec![self.type_id];
                if reenters_ancestor(child, &mut stack) {
                    tracing::warn!(
                        record = self.type_name,
                        property = property.name,
                        "type graph is cyclic, property excluded from tracking"
                    );
                    offending.push(property.name);
                }
            }
            offending
        })
    }
}

/// Whether `schema`'s reachable type graph contains a type already on
/// `stack`. Recursion stops at the first re-entry, so this terminates even
/// on cyclic graphs.
fn reenters_ancestor(schema: &'static Schema, stack: &mut Vec<TypeId>) -> bool {
    if stack.contains(&schema.type_id) {
        return true;
    }
    stack.push(schema.type_id);
    let cyclic = schema
        .properties
        .iter()
        .filter_map(|p| p.child_schema())
        .any(|child| reenters_ancestor(child, stack));
    stack.pop();
    cyclic
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type", &self.type_name)
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Leaf",
                TypeId::of::<u8>(),
                vec![PropertySpec::scalar("value")],
            )
        })
    }

    fn looped_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Looped",
                TypeId::of::<u16>(),
                vec![
                    PropertySpec::scalar("value"),
                    PropertySpec::complex("next", looped_schema),
                    PropertySpec::complex("leaf", leaf_schema),
                ],
            )
        })
    }

    #[test]
    fn property_lookup_and_kinds() {
        let schema = looped_schema();
        assert_eq!(schema.property("value").unwrap().kind(), PropertyKind::Scalar);
        assert_eq!(schema.property("next").unwrap().kind(), PropertyKind::Complex);
        assert!(schema.property("missing").is_none());
        assert_eq!(schema.scalars().count(), 1);
        assert_eq!(schema.complex().count(), 2);
    }

    #[test]
    fn self_referential_property_is_ineligible() {
        let schema = looped_schema();
        assert!(!schema.is_trackable("next"));
        // the acyclic sibling is unaffected
        assert!(schema.is_trackable("leaf"));
        assert!(schema.is_trackable("value"));
    }
}
