// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The uniform representation of scalar property values.
//!
//! Every scalar property of a tracked record is read and written through
//! [`ScalarValue`], regardless of the concrete field type. The generated
//! [`Trackable`](crate::Trackable) impls convert field values into
//! `ScalarValue` on read (via the `From` impls below) and back out on write
//! (via the `TryFrom` impls, which fail with a [`ScalarTypeError`] when the
//! value does not fit the field).
//!
//! The original-value bookkeeping relies on `ScalarValue`'s `PartialEq`:
//! writing a value equal to the recorded original clears the record's entry
//! and lets its status decay back to unchanged. Equality must therefore be
//! a real equivalence relation, which is why the float variants compare by
//! bit pattern rather than by IEEE `==`.

use std::fmt;

/// A scalar property value.
///
/// Narrow integer fields widen into `U64`/`I64` on read and are
/// range-checked on the way back.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum ScalarValue {
    // serde_bytes keeps this from serializing as a sequence of individual
    // u8 values on formats that have a native byte-string type.
    Bytes(#[cfg_attr(feature = "serde", serde(with = "serde_bytes"))] Vec<u8>),
    String(String),
    Float(f32),
    Double(f64),
    U64(u64),
    I64(i64),
    Bool(bool),
    #[cfg(feature = "chrono")]
    Timestamp(chrono::DateTime<chrono::Utc>),
}

impl ScalarValue {
    /// A short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Bytes(_) => "bytes",
            ScalarValue::String(_) => "string",
            ScalarValue::Float(_) => "float",
            ScalarValue::Double(_) => "double",
            ScalarValue::U64(_) => "u64",
            ScalarValue::I64(_) => "i64",
            ScalarValue::Bool(_) => "bool",
            #[cfg(feature = "chrono")]
            ScalarValue::Timestamp(_) => "timestamp",
        }
    }

    /// The held integer, widened, if this is an integer variant.
    fn as_int(&self) -> Option<i128> {
        match self {
            ScalarValue::U64(u) => Some(i128::from(*u)),
            ScalarValue::I64(i) => Some(i128::from(*i)),
            _ => None,
        }
    }
}

/// A scalar value did not fit the field it was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTypeError {
    /// The type the field expected.
    pub expected: &'static str,
    /// The variant (or out-of-range value) that was supplied.
    pub actual: &'static str,
}

impl fmt::Display for ScalarTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a {} value, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for ScalarTypeError {}

/// Conversions into `ScalarValue`, grouped per variant. Every listed source
/// type must have an `Into` to the variant's payload type.
macro_rules! scalar_from {
    ($variant:ident <- $($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for ScalarValue {
                fn from(value: $source) -> Self {
                    ScalarValue::$variant(value.into())
                }
            }
        )+
    };
}

scalar_from!(Bytes <- Vec<u8>, &[u8]);
scalar_from!(String <- String, &str);
scalar_from!(Float <- f32);
scalar_from!(Double <- f64);
scalar_from!(U64 <- u64, u32, u16, u8);
scalar_from!(I64 <- i64, i32, i16, i8);
scalar_from!(Bool <- bool);

#[cfg(feature = "chrono")]
impl From<chrono::DateTime<chrono::Utc>> for ScalarValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self::Timestamp(value)
    }
}

macro_rules! impl_try_from {
    (
        $(
            $target:ty : $expected:literal => $variant:ident $(with $conv:ident)?
        ),* $(,)?
    ) => {
        $(
            impl TryFrom<ScalarValue> for $target {
                type Error = ScalarTypeError;

                fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
                    match value {
                        ScalarValue::$variant(inner) => impl_try_from!(inner, $expected $(, $conv)?),
                        other => Err(ScalarTypeError {
                            expected: $expected,
                            actual: other.type_name(),
                        }),
                    }
                }
            }
        )*
    };

    ($value:ident, $expected:literal, $conv:ident) => {
        $value.$conv().map_err(|_| ScalarTypeError {
            expected: $expected,
            actual: "an out-of-range integer",
        })
    };

    ($value:ident, $expected:literal) => {
        Ok($value)
    };
}

impl_try_from!(
    Vec<u8> : "bytes"  => Bytes,
    String  : "string" => String,
    f32     : "float"  => Float,
    f64     : "double" => Double,
    u64     : "u64"    => U64,
    u32     : "u32"    => U64 with try_into,
    u16     : "u16"    => U64 with try_into,
    u8      : "u8"     => U64 with try_into,
    i64     : "i64"    => I64,
    i32     : "i32"    => I64 with try_into,
    i16     : "i16"    => I64 with try_into,
    i8      : "i8"     => I64 with try_into,
    bool    : "bool"   => Bool,
);

#[cfg(feature = "chrono")]
impl TryFrom<ScalarValue> for chrono::DateTime<chrono::Utc> {
    type Error = ScalarTypeError;

    fn try_from(value: ScalarValue) -> Result<Self, Self::Error> {
        match value {
            ScalarValue::Timestamp(inner) => Ok(inner),
            other => Err(ScalarTypeError {
                expected: "timestamp",
                actual: other.type_name(),
            }),
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue::*;
        match (self, other) {
            (Bytes(a), Bytes(b)) => a == b,
            (String(a), String(b)) => a == b,
            // bit-pattern comparison: NaN stays equal to itself, so a NaN
            // written back over a NaN original still decays to unchanged
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (U64(a), U64(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            #[cfg(feature = "chrono")]
            (Timestamp(a), Timestamp(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for ScalarValue {}

impl PartialEq<&str> for ScalarValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, ScalarValue::String(s) if s == other)
    }
}

impl PartialEq<bool> for ScalarValue {
    fn eq(&self, other: &bool) -> bool {
        matches!(self, ScalarValue::Bool(b) if b == other)
    }
}

impl PartialEq<f64> for ScalarValue {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, ScalarValue::Double(d) if d == other)
    }
}

// The integer comparisons go through the widened view so asserts don't have
// to care which width variant ended up holding the value.
impl PartialEq<u64> for ScalarValue {
    fn eq(&self, other: &u64) -> bool {
        self.as_int() == Some(i128::from(*other))
    }
}

impl PartialEq<i64> for ScalarValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(i128::from(*other))
    }
}

impl PartialEq<i32> for ScalarValue {
    fn eq(&self, other: &i32) -> bool {
        self.as_int() == Some(i128::from(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_round_trips() {
        assert_eq!(u64::try_from(ScalarValue::from(7u64)), Ok(7));
        assert_eq!(u32::try_from(ScalarValue::from(7u32)), Ok(7));
        assert_eq!(i64::try_from(ScalarValue::from(-7i64)), Ok(-7));
        assert_eq!(
            String::try_from(ScalarValue::from("hello")),
            Ok("hello".to_string())
        );
        assert_eq!(bool::try_from(ScalarValue::from(true)), Ok(true));
        assert_eq!(Vec::<u8>::try_from(ScalarValue::from(vec![1u8, 2])), Ok(vec![1, 2]));
    }

    #[test]
    fn narrowing_is_range_checked() {
        let err = u8::try_from(ScalarValue::from(300u64)).unwrap_err();
        assert_eq!(err.expected, "u8");
    }

    #[test]
    fn mismatched_variant_is_rejected() {
        let err = u64::try_from(ScalarValue::from("nope")).unwrap_err();
        assert_eq!(err.expected, "u64");
        assert_eq!(err.actual, "string");
    }

    #[test]
    fn convenience_equality() {
        assert_eq!(ScalarValue::from("abc"), "abc");
        assert_eq!(ScalarValue::from(3u64), 3u64);
        assert_eq!(ScalarValue::from(3i64), 3u64);
        assert_ne!(ScalarValue::from(3.0f64), ScalarValue::from(3u64));
    }

    #[test]
    fn nan_equality_is_reflexive() {
        let nan = ScalarValue::from(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_ne!(ScalarValue::from(f64::NAN), ScalarValue::from(0.0f64));
    }
}
