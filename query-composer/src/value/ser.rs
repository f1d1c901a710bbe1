use std::fmt::Display;

use serde::Serialize;
use serde::ser::Impossible;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::Decimal;
use super::Mapping;
use super::Scalar;
use super::Value;
use crate::error::NormalizeError;

pub(crate) const DECIMAL_TOKEN: &str = "$query_composer::private::Decimal";
pub(crate) const INSTANT_TOKEN: &str = "$query_composer::private::Instant";
pub(crate) const DATE_TIME_TOKEN: &str = "$query_composer::private::DateTime";
pub(crate) const DATE_TOKEN: &str = "$query_composer::private::Date";
pub(crate) const TIME_TOKEN: &str = "$query_composer::private::Time";

// Nanosecond-precision layouts used only inside the private markers.
pub(crate) const LOSSLESS_INSTANT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9][offset_hour sign:mandatory]:[offset_minute]:[offset_second]"
);
pub(crate) const LOSSLESS_DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]");
pub(crate) const LOSSLESS_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
pub(crate) const LOSSLESS_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:9]");

/// Serializer whose output is a canonical [`Value`].
///
/// Every step into a wrapper or a container counts as one level of nesting. Serde follows `Rc`
/// and `RefCell` blindly, so this depth is the only thing standing between a self-referential
/// input and a stack overflow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueSerializer {
    depth: usize,
    max_depth: usize,
}

impl ValueSerializer {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    fn descend(self) -> Result<Self, NormalizeError> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            tracing::error!(
                limit = self.max_depth,
                "value normalization recursion limit exceeded"
            );
            return Err(NormalizeError::RecursionLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(Self { depth, ..self })
    }
}

fn unmark(token: &'static str, inner: Value) -> Result<Value, NormalizeError> {
    let kind = match token {
        DECIMAL_TOKEN => "decimal",
        INSTANT_TOKEN => "instant",
        DATE_TIME_TOKEN => "date-time",
        DATE_TOKEN => "date",
        TIME_TOKEN => "time",
        _ => return Ok(inner),
    };
    let text = match inner {
        Value::Scalar(Scalar::String(text)) => text,
        other => {
            return Err(NormalizeError::InvalidScalar {
                kind,
                value: other.kind_name().to_string(),
            });
        }
    };
    let invalid = || NormalizeError::InvalidScalar {
        kind,
        value: text.clone(),
    };
    let scalar = match token {
        DECIMAL_TOKEN => Scalar::Decimal(text.parse::<Decimal>().map_err(|_| invalid())?),
        INSTANT_TOKEN => Scalar::Instant(
            OffsetDateTime::parse(&text, LOSSLESS_INSTANT).map_err(|_| invalid())?,
        ),
        DATE_TIME_TOKEN => Scalar::DateTime(
            PrimitiveDateTime::parse(&text, LOSSLESS_DATE_TIME).map_err(|_| invalid())?,
        ),
        DATE_TOKEN => Scalar::LocalDate(Date::parse(&text, LOSSLESS_DATE).map_err(|_| invalid())?),
        _ => Scalar::LocalTime(Time::parse(&text, LOSSLESS_TIME).map_err(|_| invalid())?),
    };
    Ok(Value::Scalar(scalar))
}

impl serde::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = NormalizeError;

    type SerializeSeq = SerializeSequence;
    type SerializeTuple = SerializeSequence;
    type SerializeTupleStruct = SerializeSequence;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMapping;
    type SerializeStruct = SerializeMapping;
    type SerializeStructVariant = SerializeStructVariant;

    #[inline]
    fn serialize_bool(self, value: bool) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_i8(self, value: i8) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_i16(self, value: i16) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_i32(self, value: i32) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_i64(self, value: i64) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_i128(self, value: i128) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_u8(self, value: u8) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_u16(self, value: u16) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_u32(self, value: u32) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_u64(self, value: u64) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    fn serialize_u128(self, value: u128) -> Result<Value, NormalizeError> {
        i128::try_from(value)
            .map(Value::from)
            .map_err(|_| NormalizeError::IntegerOutOfRange(value.to_string()))
    }

    #[inline]
    fn serialize_f32(self, value: f32) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_f64(self, value: f64) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_char(self, value: char) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    #[inline]
    fn serialize_str(self, value: &str) -> Result<Value, NormalizeError> {
        Ok(Value::from(value))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Value, NormalizeError> {
        Ok(Value::Sequence(value.iter().map(|&b| Value::from(b)).collect()))
    }

    #[inline]
    fn serialize_unit(self) -> Result<Value, NormalizeError> {
        Ok(Value::Null)
    }

    #[inline]
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, NormalizeError> {
        self.serialize_unit()
    }

    #[inline]
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, NormalizeError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        let inner = value.serialize(self.descend()?)?;
        unmark(name, inner)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        let mut mapping = Mapping::with_capacity(1);
        mapping.insert(variant, value.serialize(self.descend()?)?);
        Ok(Value::Mapping(mapping))
    }

    #[inline]
    fn serialize_none(self) -> Result<Value, NormalizeError> {
        self.serialize_unit()
    }

    #[inline]
    fn serialize_some<T>(self, value: &T) -> Result<Value, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self.descend()?)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, NormalizeError> {
        Ok(SerializeSequence {
            items: Vec::with_capacity(len.unwrap_or(0)),
            nested: self.descend()?,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, NormalizeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, NormalizeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, NormalizeError> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
            nested: self.descend()?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, NormalizeError> {
        Ok(SerializeMapping {
            mapping: Mapping::with_capacity(len.unwrap_or(0)),
            next_key: None,
            nested: self.descend()?,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, NormalizeError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, NormalizeError> {
        Ok(SerializeStructVariant {
            variant,
            mapping: Mapping::with_capacity(len),
            nested: self.descend()?,
        })
    }

    fn collect_str<T: ?Sized + Display>(self, value: &T) -> Result<Value, NormalizeError> {
        Ok(Value::from(value.to_string()))
    }
}

pub(crate) struct SerializeSequence {
    items: Vec<Value>,
    nested: ValueSerializer,
}

pub(crate) struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
    nested: ValueSerializer,
}

pub(crate) struct SerializeMapping {
    mapping: Mapping,
    next_key: Option<String>,
    nested: ValueSerializer,
}

pub(crate) struct SerializeStructVariant {
    variant: &'static str,
    mapping: Mapping,
    nested: ValueSerializer,
}

impl serde::ser::SerializeSeq for SerializeSequence {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(self.nested)?);
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(Value::Sequence(self.items))
    }
}

impl serde::ser::SerializeTuple for SerializeSequence {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl serde::ser::SerializeTupleStruct for SerializeSequence {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        serde::ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, NormalizeError> {
        serde::ser::SerializeSeq::end(self)
    }
}

impl serde::ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(self.nested)?);
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        let mut mapping = Mapping::with_capacity(1);
        mapping.insert(self.variant, Value::Sequence(self.items));
        Ok(Value::Mapping(mapping))
    }
}

impl serde::ser::SerializeMap for SerializeMapping {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        let key = self.next_key.take().ok_or_else(|| {
            NormalizeError::Custom("map value serialized before its key".to_string())
        })?;
        // Null values are kept: the key is still part of the mapping.
        self.mapping.insert(key, value.serialize(self.nested)?);
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        Ok(Value::Mapping(self.mapping))
    }
}

impl serde::ser::SerializeStruct for SerializeMapping {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        self.mapping.insert(key, value.serialize(self.nested)?);
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        serde::ser::SerializeMap::end(self)
    }
}

impl serde::ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        self.mapping.insert(key, value.serialize(self.nested)?);
        Ok(())
    }

    fn end(self) -> Result<Value, NormalizeError> {
        let mut outer = Mapping::with_capacity(1);
        outer.insert(self.variant, Value::Mapping(self.mapping));
        Ok(Value::Mapping(outer))
    }
}

/// Turns a map key into its display form.
struct MapKeySerializer;

fn key_without_display_form(kind: &'static str) -> NormalizeError {
    NormalizeError::InvalidKey(kind)
}

impl serde::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = NormalizeError;

    type SerializeSeq = Impossible<String, NormalizeError>;
    type SerializeTuple = Impossible<String, NormalizeError>;
    type SerializeTupleStruct = Impossible<String, NormalizeError>;
    type SerializeTupleVariant = Impossible<String, NormalizeError>;
    type SerializeMap = Impossible<String, NormalizeError>;
    type SerializeStruct = Impossible<String, NormalizeError>;
    type SerializeStructVariant = Impossible<String, NormalizeError>;

    #[inline]
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, NormalizeError> {
        Ok(variant.to_owned())
    }

    #[inline]
    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_bool(self, value: bool) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_i8(self, value: i8) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_i16(self, value: i16) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_i32(self, value: i32) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_i64(self, value: i64) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_i128(self, value: i128) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_u8(self, value: u8) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_u16(self, value: u16) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_u32(self, value: u32) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_u64(self, value: u64) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_u128(self, value: u128) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_f32(self, value: f32) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    fn serialize_f64(self, value: f64) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    #[inline]
    fn serialize_char(self, value: char) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }

    #[inline]
    fn serialize_str(self, value: &str) -> Result<String, NormalizeError> {
        Ok(value.to_owned())
    }

    fn serialize_bytes(self, _value: &[u8]) -> Result<String, NormalizeError> {
        Err(key_without_display_form("bytes"))
    }

    fn serialize_unit(self) -> Result<String, NormalizeError> {
        Err(key_without_display_form("null"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, NormalizeError> {
        Err(key_without_display_form("null"))
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        Err(key_without_display_form("enum variant with data"))
    }

    fn serialize_none(self) -> Result<String, NormalizeError> {
        Err(key_without_display_form("null"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<String, NormalizeError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NormalizeError> {
        Err(key_without_display_form("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NormalizeError> {
        Err(key_without_display_form("sequence"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NormalizeError> {
        Err(key_without_display_form("sequence"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NormalizeError> {
        Err(key_without_display_form("enum variant with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, NormalizeError> {
        Err(key_without_display_form("mapping"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, NormalizeError> {
        Err(key_without_display_form("mapping"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, NormalizeError> {
        Err(key_without_display_form("enum variant with data"))
    }

    fn collect_str<T: ?Sized + Display>(self, value: &T) -> Result<String, NormalizeError> {
        Ok(value.to_string())
    }
}
