// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors surfaced by the tracking API.

use crate::{schema::PropertyKind, value::ScalarTypeError};
use std::fmt;

/// An error returned by a tracking operation.
///
/// All variants are surfaced to the caller immediately; nothing is retried
/// internally. Status computation never fails and therefore has no error
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Attempted to wrap a record or sequence that already holds tracking
    /// state.
    AlreadyTracking,
    /// Attempted to track a container shape that cannot express insert and
    /// remove.
    UnsupportedContainer {
        /// A short description of the rejected container shape.
        container: &'static str,
    },
    /// A typed view was requested for a value of a different type, or a
    /// scalar value did not fit the field it was written to.
    InvalidCast {
        /// The type that was requested.
        expected: &'static str,
        /// The type that was found.
        actual: &'static str,
    },
    /// `undelete` was applied to an item that is not currently deleted.
    NotDeleted,
    /// The property's type graph is cyclic and was excluded from tracking.
    SchemaIneligible {
        /// The record type owning the property.
        type_name: &'static str,
        /// The excluded property.
        property: &'static str,
    },
    /// The record type has no property with the given name.
    UnknownProperty {
        /// The record type that was addressed.
        type_name: &'static str,
        /// The name that failed to resolve.
        property: String,
    },
    /// The property exists but is of a different kind than the operation
    /// expects (e.g. scalar access to a collection property).
    WrongKind {
        /// The record type owning the property.
        type_name: &'static str,
        /// The addressed property.
        property: &'static str,
        /// The kind the operation expected.
        expected: PropertyKind,
        /// The property's actual kind.
        actual: PropertyKind,
    },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::AlreadyTracking => {
                write!(f, "the value is already tracked")
            }
            TrackError::UnsupportedContainer { container } => {
                write!(f, "{container} cannot be tracked: no insert/remove")
            }
            TrackError::InvalidCast { expected, actual } => {
                write!(f, "expected {expected}, found {actual}")
            }
            TrackError::NotDeleted => {
                write!(f, "the item is not in the deleted set")
            }
            TrackError::SchemaIneligible {
                type_name,
                property,
            } => {
                write!(
                    f,
                    "{type_name}.{property} has a cyclic type graph and cannot be tracked"
                )
            }
            TrackError::UnknownProperty {
                type_name,
                property,
            } => {
                write!(f, "{type_name} has no property named {property:?}")
            }
            TrackError::WrongKind {
                type_name,
                property,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{type_name}.{property} is a {actual} property, not a {expected} one"
                )
            }
        }
    }
}

impl std::error::Error for TrackError {}

impl From<ScalarTypeError> for TrackError {
    fn from(err: ScalarTypeError) -> Self {
        TrackError::InvalidCast {
            expected: err.expected,
            actual: err.actual,
        }
    }
}

impl TrackError {
    /// Convenience constructor for [`TrackError::UnknownProperty`].
    pub fn unknown_property(type_name: &'static str, property: &str) -> Self {
        TrackError::UnknownProperty {
            type_name,
            property: property.to_string(),
        }
    }
}
