//! The error surface and eligibility rules of the tracking entry points.

use retrace::{
    ChangeStatus, PropertySpec, ScalarValue, Schema, Track, TrackError, Trackable, Tracked,
    trackable,
};
use std::any::{Any, TypeId};

trackable! {
    pub struct Address {
        scalar city: String,
    }
}

trackable! {
    pub struct Contact {
        scalar name: String,
        complex address: Address,
    }
}

#[test]
fn rewrapping_a_tracked_record_fails() {
    let tracked = Contact::default().into_tracked().unwrap();
    assert!(matches!(
        tracked.into_tracked(),
        Err(TrackError::AlreadyTracking)
    ));
}

#[test]
fn rewrapping_a_tracked_list_fails() {
    let list = vec![Address::default()].into_tracked().unwrap();
    assert!(matches!(list.into_tracked(), Err(TrackError::AlreadyTracking)));
}

#[test]
fn wrapping_a_sequence_of_tracked_wrappers_fails() {
    let handles: Vec<Tracked<Address>> = vec![
        Address::default().into_tracked().unwrap(),
        Address::default().into_tracked().unwrap(),
    ];
    assert!(matches!(
        handles.into_tracked(),
        Err(TrackError::AlreadyTracking)
    ));
}

#[test]
fn fixed_size_sequences_are_unsupported() {
    let array = [Address::default(), Address::default()];
    assert!(matches!(
        array.into_tracked(),
        Err(TrackError::UnsupportedContainer { .. })
    ));
}

#[test]
fn typed_views_check_the_record_type() {
    let tracked = Contact {
        name: "Ada".into(),
        address: Some(Address::default()),
    }
    .into_tracked()
    .unwrap();
    assert!(matches!(
        tracked.complex::<Contact>("address"),
        Err(TrackError::InvalidCast { .. })
    ));
    let children = tracked.complex_property_trackables().unwrap();
    assert!(matches!(
        children[0].downcast::<Contact>(),
        Err(TrackError::InvalidCast { .. })
    ));
}

#[test]
fn scalar_writes_check_the_value_type() {
    let tracked = Contact::default().into_tracked().unwrap();
    assert!(matches!(
        tracked.set("name", vec![1u8, 2]),
        Err(TrackError::InvalidCast { .. })
    ));
}

#[test]
fn undelete_requires_membership_in_the_deleted_set() {
    let list = vec![Address::default(), Address::default()]
        .into_tracked()
        .unwrap();
    let member = list.get(0).unwrap();
    assert!(matches!(
        list.undelete(&member),
        Err(TrackError::NotDeleted)
    ));
    // removing first makes it eligible
    list.remove(&member);
    list.undelete(&member).unwrap();
    assert!(!list.is_changed());
}

#[test]
fn lazy_wrapping_is_idempotent_across_threads() {
    let tracked = Contact {
        name: "Ada".into(),
        address: Some(Address::default()),
    }
    .into_tracked()
    .unwrap();
    let (a, b) = std::thread::scope(|scope| {
        let first = scope.spawn(|| tracked.complex::<Address>("address").unwrap().unwrap());
        let second = scope.spawn(|| tracked.complex::<Address>("address").unwrap().unwrap());
        (first.join().unwrap(), second.join().unwrap())
    });
    assert!(Tracked::ptr_eq(&a, &b));
}

/// A self-referential record, written by hand since the macro cannot express
/// a boxed recursive field. Its `next` property forms a type cycle and must
/// be refused by the schema analysis.
#[derive(Debug, Clone, Default, PartialEq)]
struct LinkedNode {
    value: u64,
    next: Option<Box<LinkedNode>>,
}

impl Trackable for LinkedNode {
    fn schema(&self) -> &'static Schema {
        Self::describe()
    }

    fn describe() -> &'static Schema {
        static SCHEMA: std::sync::OnceLock<Schema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "LinkedNode",
                TypeId::of::<LinkedNode>(),
                vec![
                    PropertySpec::scalar("value"),
                    PropertySpec::complex("next", LinkedNode::describe),
                ],
            )
        })
    }

    fn get_scalar(&self, property: &str) -> Result<ScalarValue, TrackError> {
        match property {
            "value" => Ok(self.value.into()),
            _ => Err(TrackError::unknown_property("LinkedNode", property)),
        }
    }

    fn set_scalar(&mut self, property: &str, value: ScalarValue) -> Result<(), TrackError> {
        match property {
            "value" => {
                self.value = value.try_into().map_err(TrackError::from)?;
                Ok(())
            }
            _ => Err(TrackError::unknown_property("LinkedNode", property)),
        }
    }

    fn take_complex(&mut self, property: &str) -> Result<Option<Box<dyn Trackable>>, TrackError> {
        match property {
            "next" => Ok(self.next.take().map(|boxed| boxed as Box<dyn Trackable>)),
            _ => Err(TrackError::unknown_property("LinkedNode", property)),
        }
    }

    fn put_complex(
        &mut self,
        property: &str,
        value: Option<Box<dyn Trackable>>,
    ) -> Result<(), TrackError> {
        match property {
            "next" => {
                self.next = match value {
                    None => None,
                    Some(boxed) => Some(
                        boxed
                            .into_any()
                            .downcast::<LinkedNode>()
                            .map_err(|_| TrackError::InvalidCast {
                                expected: "LinkedNode",
                                actual: "a different record type",
                            })?,
                    ),
                };
                Ok(())
            }
            _ => Err(TrackError::unknown_property("LinkedNode", property)),
        }
    }

    fn take_elements(&mut self, property: &str) -> Result<Vec<Box<dyn Trackable>>, TrackError> {
        Err(TrackError::unknown_property("LinkedNode", property))
    }

    fn put_elements(
        &mut self,
        property: &str,
        _elements: Vec<Box<dyn Trackable>>,
    ) -> Result<(), TrackError> {
        Err(TrackError::unknown_property("LinkedNode", property))
    }

    fn boxed_clone(&self) -> Box<dyn Trackable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[test]
fn cyclic_type_graphs_are_ineligible_but_scalars_still_track() {
    let node = LinkedNode {
        value: 1,
        next: Some(Box::new(LinkedNode {
            value: 2,
            next: None,
        })),
    };
    let tracked = Tracked::new(node);
    assert!(matches!(
        tracked.complex::<LinkedNode>("next"),
        Err(TrackError::SchemaIneligible { .. })
    ));
    // the record remains usable for everything acyclic
    tracked.set("value", 5u64).unwrap();
    assert_eq!(tracked.status(), ChangeStatus::Changed);
    assert_eq!(tracked.original_value("value").unwrap(), 1u64);
}
