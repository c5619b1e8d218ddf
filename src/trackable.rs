// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The record contract and the tracking entry points.
//!
//! [`Trackable`] is this crate's replacement for the runtime proxy
//! interception used by reflective change-tracking libraries: instead of
//! intercepting virtual property accessors, a record type exposes its
//! properties by name through a small object-safe surface. The
//! [`trackable!`](crate::trackable) macro generates the impl for a struct;
//! hand-written impls are possible and occasionally useful (the test suite
//! uses one to exercise cycle detection).
//!
//! In terms of mental model, a `Trackable` type is plain data plus a
//! [`Schema`]. The tracking engine owns the record once it is wrapped and
//! reaches nested records by *moving* them out of their parent (which is why
//! complex properties are `Option` fields and collection properties are
//! `Vec` fields: both can be taken, leaving their empty value behind) and
//! folding them back in when a deep clone is requested.
//!
//! [`Track`] is the fluent entry point: `record.into_tracked()` or
//! `vec.into_tracked()`. The impls on already-tracked types and on
//! fixed-size arrays exist to *fail*, surfacing
//! [`TrackError::AlreadyTracking`] and [`TrackError::UnsupportedContainer`]
//! at the same call site where the misuse happens.

use crate::{
    Schema, ScalarValue, TrackError,
    tracked::{Tracked, TrackedList},
};
use std::{any::Any, fmt};

/// A record type whose properties can be tracked.
///
/// Implementations are normally generated by the
/// [`trackable!`](crate::trackable) macro. The contract:
///
/// - [`describe`](Trackable::describe) returns the type's [`Schema`], built
///   once and cached for the process lifetime;
/// - scalar properties are read and written by name through
///   [`ScalarValue`];
/// - complex properties (`Option<C>` fields where `C: Trackable`) and
///   collection properties (`Vec<E>` fields where `E: Trackable`) can be
///   taken out of the record and later put back, in boxed type-erased form.
///
/// Every method addressing a property must agree with the schema: a name the
/// schema does not list yields [`TrackError::UnknownProperty`], and a name of
/// the wrong kind yields [`TrackError::WrongKind`].
pub trait Trackable: Any + Send + fmt::Debug {
    /// The type's schema.
    ///
    /// The object-safe counterpart of [`Trackable::describe`].
    fn schema(&self) -> &'static Schema;

    /// The type's schema, without an instance.
    fn describe() -> &'static Schema
    where
        Self: Sized;

    /// Reads the scalar property `property`.
    fn get_scalar(&self, property: &str) -> Result<ScalarValue, TrackError>;

    /// Writes the scalar property `property`.
    fn set_scalar(&mut self, property: &str, value: ScalarValue) -> Result<(), TrackError>;

    /// Moves the nested record out of the complex property `property`,
    /// leaving `None` behind.
    fn take_complex(&mut self, property: &str)
    -> Result<Option<Box<dyn Trackable>>, TrackError>;

    /// Stores a nested record into the complex property `property`.
    ///
    /// Fails with [`TrackError::InvalidCast`] if the boxed value is not of
    /// the property's record type.
    fn put_complex(
        &mut self,
        property: &str,
        value: Option<Box<dyn Trackable>>,
    ) -> Result<(), TrackError>;

    /// Moves all elements out of the collection property `property`, leaving
    /// an empty sequence behind.
    fn take_elements(&mut self, property: &str) -> Result<Vec<Box<dyn Trackable>>, TrackError>;

    /// Stores elements into the collection property `property`, replacing
    /// its contents.
    ///
    /// Fails with [`TrackError::InvalidCast`] if any element is not of the
    /// property's element type.
    fn put_elements(
        &mut self,
        property: &str,
        elements: Vec<Box<dyn Trackable>>,
    ) -> Result<(), TrackError>;

    /// Clones the record behind the trait object.
    fn boxed_clone(&self) -> Box<dyn Trackable>;

    /// Upcast for downcasting by the typed facades.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Consuming upcast.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Entry point for wrapping a value into its tracked form.
///
/// The [`trackable!`](crate::trackable) macro emits an impl for each record
/// type, and the crate provides an impl for `Vec<E>` of records. The
/// remaining impls reject misuse:
///
/// - re-wrapping a [`Tracked`] or [`TrackedList`] fails with
///   [`TrackError::AlreadyTracking`];
/// - so does wrapping a `Vec` whose elements are already tracked wrappers
///   (via the impl on `&Vec<Tracked<E>>`, which method resolution finds
///   after the owned impls do not apply);
/// - wrapping a fixed-size array fails with
///   [`TrackError::UnsupportedContainer`], since an array cannot express
///   insert or remove.
///
/// # Example
///
/// ```
/// use retrace::{Track, trackable};
///
/// trackable! {
///     pub struct Point {
///         scalar x: i64,
///         scalar y: i64,
///     }
/// }
///
/// let point = Point { x: 1, y: 2 }.into_tracked()?;
/// point.set("x", 5i64)?;
/// assert_eq!(point.original_value("x")?, 1i64);
/// # Ok::<(), retrace::TrackError>(())
/// ```
pub trait Track {
    /// The tracked form of `Self`.
    type Tracked;

    /// Wraps `self` into its tracked form.
    fn into_tracked(self) -> Result<Self::Tracked, TrackError>;
}

impl<E: Trackable> Track for Vec<E> {
    type Tracked = TrackedList<E>;

    fn into_tracked(self) -> Result<Self::Tracked, TrackError> {
        Ok(TrackedList::new(self))
    }
}

impl<E: Trackable> Track for &Vec<Tracked<E>> {
    type Tracked = TrackedList<E>;

    fn into_tracked(self) -> Result<Self::Tracked, TrackError> {
        Err(TrackError::AlreadyTracking)
    }
}

impl<E: Trackable, const N: usize> Track for [E; N] {
    type Tracked = TrackedList<E>;

    fn into_tracked(self) -> Result<Self::Tracked, TrackError> {
        Err(TrackError::UnsupportedContainer {
            container: "a fixed-size array",
        })
    }
}

impl<R: Trackable> Track for Tracked<R> {
    type Tracked = Tracked<R>;

    fn into_tracked(self) -> Result<Self::Tracked, TrackError> {
        Err(TrackError::AlreadyTracking)
    }
}

impl<E: Trackable> Track for TrackedList<E> {
    type Tracked = TrackedList<E>;

    fn into_tracked(self) -> Result<Self::Tracked, TrackError> {
        Err(TrackError::AlreadyTracking)
    }
}
