//! The canonical value tree produced by normalization.
use std::fmt;

use serde::Serialize;
use serde::Serializer;
use serde::ser::Error as _;
use serde::ser::SerializeMap;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;

mod decimal;
mod mapping;
pub(crate) mod ser;

pub use decimal::Decimal;
pub use decimal::InvalidDecimal;
pub use mapping::Iter as MappingIter;
pub use mapping::Mapping;

use crate::coerce::ScalarKind;

/// A host-independent value: null, a scalar, an ordered sequence or a case-insensitive mapping.
///
/// Values are trees; they are built by value and can never contain cycles.
#[derive(Debug, Clone, Default, PartialEq, derive_more::IsVariant)]
pub enum Value {
    #[default]
    Null,
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

/// A single primitive value, before it is coerced to a wire kind.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum Scalar {
    Boolean(bool),
    /// Any integer a host may produce; the target width is chosen during coercion.
    Integer(i128),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Char(char),
    /// Date and time with an offset.
    Instant(OffsetDateTime),
    /// Date and time without an offset.
    DateTime(PrimitiveDateTime),
    LocalDate(Date),
    LocalTime(Time),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Looks a key up when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|mapping| mapping.get(key))
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(scalar) => scalar.kind_name(),
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl Scalar {
    /// The wire kind a scalar coerces to when the caller does not ask for one.
    pub fn natural_kind(&self) -> ScalarKind {
        match self {
            Scalar::Boolean(_) => ScalarKind::Boolean,
            Scalar::Integer(value) if u64::try_from(*value).is_ok() && *value > i64::MAX as i128 => {
                ScalarKind::UInt64
            }
            Scalar::Integer(_) => ScalarKind::Int64,
            Scalar::Float(_) => ScalarKind::Float64,
            Scalar::Decimal(_) => ScalarKind::Decimal,
            Scalar::String(_) => ScalarKind::String,
            Scalar::Char(_) => ScalarKind::Char,
            Scalar::Instant(_) => ScalarKind::Instant,
            Scalar::DateTime(_) => ScalarKind::DateTime,
            Scalar::LocalDate(_) => ScalarKind::Date,
            Scalar::LocalTime(_) => ScalarKind::Time,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Boolean(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Decimal(_) => "decimal",
            Scalar::String(_) => "string",
            Scalar::Char(_) => "char",
            Scalar::Instant(_) => "instant",
            Scalar::DateTime(_) => "date-time",
            Scalar::LocalDate(_) => "date",
            Scalar::LocalTime(_) => "time",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(value) => fmt::Display::fmt(value, f),
            Scalar::Integer(value) => fmt::Display::fmt(value, f),
            Scalar::Float(value) => fmt::Display::fmt(value, f),
            Scalar::Decimal(value) => fmt::Display::fmt(value, f),
            Scalar::String(value) => fmt::Display::fmt(value, f),
            Scalar::Char(value) => fmt::Display::fmt(value, f),
            Scalar::Instant(value) => fmt::Display::fmt(value, f),
            Scalar::DateTime(value) => fmt::Display::fmt(value, f),
            Scalar::LocalDate(value) => fmt::Display::fmt(value, f),
            Scalar::LocalTime(value) => fmt::Display::fmt(value, f),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value.into())
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(value.into())
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Boolean,
    i8 => Integer,
    i16 => Integer,
    i32 => Integer,
    i64 => Integer,
    i128 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    u64 => Integer,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    String => String,
    &str => String,
    char => Char,
    OffsetDateTime => Instant,
    PrimitiveDateTime => DateTime,
    Date => LocalDate,
    Time => LocalTime,
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(mapping: Mapping) -> Self {
        Value::Mapping(mapping)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::Sequence(items) => items.serialize(serializer),
            Value::Mapping(mapping) => {
                let mut map = serializer.serialize_map(Some(mapping.len()))?;
                for (key, value) in mapping {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Temporal and decimal scalars are wrapped in private newtype markers carrying a lossless
/// string, so serializers that do not know the markers see plain strings.
impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Boolean(value) => serializer.serialize_bool(*value),
            Scalar::Integer(value) => {
                if let Ok(value) = i64::try_from(*value) {
                    serializer.serialize_i64(value)
                } else if let Ok(value) = u64::try_from(*value) {
                    serializer.serialize_u64(value)
                } else {
                    serializer.serialize_i128(*value)
                }
            }
            Scalar::Float(value) => serializer.serialize_f64(*value),
            Scalar::Decimal(value) => value.serialize(serializer),
            Scalar::String(value) => serializer.serialize_str(value),
            Scalar::Char(value) => serializer.serialize_char(*value),
            Scalar::Instant(value) => {
                let text = value
                    .format(ser::LOSSLESS_INSTANT)
                    .map_err(S::Error::custom)?;
                serializer.serialize_newtype_struct(ser::INSTANT_TOKEN, &text)
            }
            Scalar::DateTime(value) => {
                let text = value
                    .format(ser::LOSSLESS_DATE_TIME)
                    .map_err(S::Error::custom)?;
                serializer.serialize_newtype_struct(ser::DATE_TIME_TOKEN, &text)
            }
            Scalar::LocalDate(value) => {
                let text = value.format(ser::LOSSLESS_DATE).map_err(S::Error::custom)?;
                serializer.serialize_newtype_struct(ser::DATE_TOKEN, &text)
            }
            Scalar::LocalTime(value) => {
                let text = value.format(ser::LOSSLESS_TIME).map_err(S::Error::custom)?;
                serializer.serialize_newtype_struct(ser::TIME_TOKEN, &text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn integers_pick_the_narrowest_natural_kind() {
        assert_eq!(Scalar::from(-5i32).natural_kind(), ScalarKind::Int64);
        assert_eq!(Scalar::from(i64::MAX).natural_kind(), ScalarKind::Int64);
        assert_eq!(Scalar::from(u64::MAX).natural_kind(), ScalarKind::UInt64);
    }

    #[test]
    fn serializes_to_plain_json_for_foreign_serializers() {
        let mut mapping = Mapping::new();
        mapping.insert("when", Value::from(date!(2024 - 02 - 29)));
        mapping.insert("at", Value::from(datetime!(2024-02-29 13:45:00.5 +1)));
        mapping.insert("amount", Value::from("12.50".parse::<Decimal>().unwrap()));
        mapping.insert("tags", Value::from(vec![Value::from('x'), Value::Null]));

        let json = serde_json::to_value(Value::from(mapping)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "when": "2024-02-29",
                "at": "2024-02-29T13:45:00.500000000+01:00:00",
                "amount": "12.5",
                "tags": ["x", null],
            })
        );
    }
}
