// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Defines a record struct and generates its [`Trackable`](crate::Trackable)
/// impl.
///
/// Each field is declared with its classification: `scalar` fields keep the
/// written type, `complex` fields name the nested record type and are stored
/// as `Option<T>`, and `collection` fields name the element type and are
/// stored as `Vec<T>`. The macro derives `Debug`, `Clone`, `Default`, and
/// `PartialEq`, makes every field public, and also emits the
/// [`Track`](crate::Track) entry point.
///
/// ```rust
/// use retrace::{Track, trackable};
///
/// trackable! {
///     /// A line in an order.
///     pub struct OrderDetail {
///         scalar sku: String,
///         scalar quantity: u64,
///     }
/// }
///
/// trackable! {
///     pub struct Order {
///         scalar id: u64,
///         scalar customer: String,
///         collection details: OrderDetail,
///     }
/// }
///
/// let order = Order {
///     id: 1,
///     customer: "ACME".into(),
///     details: vec![OrderDetail { sku: "A-1".into(), quantity: 2 }],
/// }
/// .into_tracked()?;
/// let details = order.collection::<OrderDetail>("details")?;
/// assert_eq!(details.len(), 1);
/// # Ok::<(), retrace::TrackError>(())
/// ```
#[macro_export]
macro_rules! trackable {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $kind:ident $field:ident : $t:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( pub $field : $crate::__trackable_field!(ty $kind $t) ),+
        }

        impl $crate::Trackable for $name {
            fn schema(&self) -> &'static $crate::Schema {
                <$name as $crate::Trackable>::describe()
            }

            fn describe() -> &'static $crate::Schema {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    $crate::Schema::new(
                        stringify!($name),
                        ::std::any::TypeId::of::<$name>(),
                        vec![ $( $crate::__trackable_field!(spec $kind $field : $t) ),+ ],
                    )
                })
            }

            fn get_scalar(
                &self,
                property: &str,
            ) -> ::std::result::Result<$crate::ScalarValue, $crate::TrackError> {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(get $kind $name self $field : $t);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn set_scalar(
                &mut self,
                property: &str,
                value: $crate::ScalarValue,
            ) -> ::std::result::Result<(), $crate::TrackError> {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(set $kind $name self $field : $t = value);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn take_complex(
                &mut self,
                property: &str,
            ) -> ::std::result::Result<
                ::std::option::Option<::std::boxed::Box<dyn $crate::Trackable>>,
                $crate::TrackError,
            > {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(take_complex $kind $name self $field : $t);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn put_complex(
                &mut self,
                property: &str,
                value: ::std::option::Option<::std::boxed::Box<dyn $crate::Trackable>>,
            ) -> ::std::result::Result<(), $crate::TrackError> {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(put_complex $kind $name self $field : $t = value);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn take_elements(
                &mut self,
                property: &str,
            ) -> ::std::result::Result<
                ::std::vec::Vec<::std::boxed::Box<dyn $crate::Trackable>>,
                $crate::TrackError,
            > {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(take_elements $kind $name self $field : $t);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn put_elements(
                &mut self,
                property: &str,
                elements: ::std::vec::Vec<::std::boxed::Box<dyn $crate::Trackable>>,
            ) -> ::std::result::Result<(), $crate::TrackError> {
                $(
                    if property == stringify!($field) {
                        return $crate::__trackable_field!(put_elements $kind $name self $field : $t = elements);
                    }
                )+
                Err($crate::TrackError::unknown_property(stringify!($name), property))
            }

            fn boxed_clone(&self) -> ::std::boxed::Box<dyn $crate::Trackable> {
                ::std::boxed::Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        impl $crate::Track for $name {
            type Tracked = $crate::Tracked<$name>;

            fn into_tracked(self) -> ::std::result::Result<Self::Tracked, $crate::TrackError> {
                Ok($crate::Tracked::new(self))
            }
        }
    };
}

/// Per-field expansion helper for [`trackable!`]. Not public API.
#[doc(hidden)]
#[macro_export]
macro_rules! __trackable_field {
    // field types as stored in the struct
    (ty scalar $t:ty) => { $t };
    (ty complex $t:ty) => { ::std::option::Option<$t> };
    (ty collection $t:ty) => { ::std::vec::Vec<$t> };

    // schema entries
    (spec scalar $field:ident : $t:ty) => {
        $crate::PropertySpec::scalar(stringify!($field))
    };
    (spec complex $field:ident : $t:ty) => {
        $crate::PropertySpec::complex(stringify!($field), <$t as $crate::Trackable>::describe)
    };
    (spec collection $field:ident : $t:ty) => {
        $crate::PropertySpec::collection(stringify!($field), <$t as $crate::Trackable>::describe)
    };

    // scalar access
    (get scalar $struct:ident $this:ident $field:ident : $t:ty) => {
        Ok($crate::ScalarValue::from($this.$field.clone()))
    };
    (get $kind:ident $struct:ident $this:ident $field:ident : $t:ty) => {
        $crate::__trackable_field!(@mismatch $struct $field, scalar, $kind)
    };
    (set scalar $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {{
        let converted: $t =
            ::std::convert::TryFrom::try_from($value).map_err($crate::TrackError::from)?;
        $this.$field = converted;
        Ok(())
    }};
    (set $kind:ident $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {
        $crate::__trackable_field!(@mismatch $struct $field, scalar, $kind)
    };

    // complex children move in and out of the record
    (take_complex complex $struct:ident $this:ident $field:ident : $t:ty) => {
        Ok(::std::mem::take(&mut $this.$field)
            .map(|child| ::std::boxed::Box::new(child) as ::std::boxed::Box<dyn $crate::Trackable>))
    };
    (take_complex $kind:ident $struct:ident $this:ident $field:ident : $t:ty) => {
        $crate::__trackable_field!(@mismatch $struct $field, complex, $kind)
    };
    (put_complex complex $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {{
        $this.$field = match $value {
            ::std::option::Option::None => ::std::option::Option::None,
            ::std::option::Option::Some(boxed) => {
                let actual = $crate::Trackable::schema(boxed.as_ref()).type_name();
                ::std::option::Option::Some(
                    *boxed
                        .into_any()
                        .downcast::<$t>()
                        .map_err(move |_| $crate::TrackError::InvalidCast {
                            expected: ::std::any::type_name::<$t>(),
                            actual,
                        })?,
                )
            }
        };
        Ok(())
    }};
    (put_complex $kind:ident $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {
        $crate::__trackable_field!(@mismatch $struct $field, complex, $kind)
    };

    // collection elements move in and out of the record
    (take_elements collection $struct:ident $this:ident $field:ident : $t:ty) => {
        Ok(::std::mem::take(&mut $this.$field)
            .into_iter()
            .map(|element| {
                ::std::boxed::Box::new(element) as ::std::boxed::Box<dyn $crate::Trackable>
            })
            .collect())
    };
    (take_elements $kind:ident $struct:ident $this:ident $field:ident : $t:ty) => {
        $crate::__trackable_field!(@mismatch $struct $field, collection, $kind)
    };
    (put_elements collection $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {{
        let mut elements = ::std::vec::Vec::with_capacity($value.len());
        for boxed in $value {
            let actual = $crate::Trackable::schema(boxed.as_ref()).type_name();
            elements.push(
                *boxed
                    .into_any()
                    .downcast::<$t>()
                    .map_err(move |_| $crate::TrackError::InvalidCast {
                        expected: ::std::any::type_name::<$t>(),
                        actual,
                    })?,
            );
        }
        $this.$field = elements;
        Ok(())
    }};
    (put_elements $kind:ident $struct:ident $this:ident $field:ident : $t:ty = $value:ident) => {
        $crate::__trackable_field!(@mismatch $struct $field, collection, $kind)
    };

    // helpers
    (@mismatch $struct:ident $field:ident, $expected:ident, $actual:ident) => {
        Err($crate::TrackError::WrongKind {
            type_name: stringify!($struct),
            property: stringify!($field),
            expected: $crate::__trackable_field!(@kind $expected),
            actual: $crate::__trackable_field!(@kind $actual),
        })
    };
    (@kind scalar) => { $crate::PropertyKind::Scalar };
    (@kind complex) => { $crate::PropertyKind::Complex };
    (@kind collection) => { $crate::PropertyKind::Collection };
}
