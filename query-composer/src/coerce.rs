//! Conversion between canonical scalars and their wire representation.
//!
//! Every conversion is checked: a value that does not fit the requested kind fails with a
//! [`CoercionError`] instead of being truncated or rounded.
use std::str::FromStr;

use serde::Serialize;
use serde_json::Number;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::CoercionError;
use crate::value::Decimal;
use crate::value::Scalar;
use crate::value::Value;

const INSTANT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:7][offset_hour sign:mandatory]:[offset_minute]"
);
const DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:7]");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

// 2^127, the first float above `i128::MAX`.
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// The wire-scalar kinds a value can be coerced to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ScalarKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    String,
    Char,
    /// `yyyy-MM-ddTHH:mm:ss.fffffff±HH:MM`
    Instant,
    /// `yyyy-MM-ddTHH:mm:ss.fffffff`
    DateTime,
    /// `yyyy-MM-dd`
    Date,
    /// `HH:mm:ss`
    Time,
}

impl ScalarKind {
    /// Inclusive bounds of an integer kind.
    pub fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            ScalarKind::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            ScalarKind::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            ScalarKind::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            ScalarKind::Int64 => Some((i64::MIN.into(), i64::MAX.into())),
            ScalarKind::UInt8 => Some((0, u8::MAX.into())),
            ScalarKind::UInt16 => Some((0, u16::MAX.into())),
            ScalarKind::UInt32 => Some((0, u32::MAX.into())),
            ScalarKind::UInt64 => Some((0, u64::MAX.into())),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        self.integer_range().is_some()
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ScalarKind::Instant | ScalarKind::DateTime | ScalarKind::Date | ScalarKind::Time
        )
    }
}

/// A primitive as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireScalar {
    Boolean(bool),
    Number(Number),
    String(String),
}

impl WireScalar {
    fn kind_name(&self) -> &'static str {
        match self {
            WireScalar::Boolean(_) => "boolean",
            WireScalar::Number(_) => "number",
            WireScalar::String(_) => "string",
        }
    }
}

impl From<WireScalar> for serde_json::Value {
    fn from(wire: WireScalar) -> Self {
        match wire {
            WireScalar::Boolean(value) => serde_json::Value::Bool(value),
            WireScalar::Number(value) => serde_json::Value::Number(value),
            WireScalar::String(value) => serde_json::Value::String(value),
        }
    }
}

fn mismatch(expected: ScalarKind, found: &Scalar) -> CoercionError {
    CoercionError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

fn overflow(value: impl ToString, target: ScalarKind) -> CoercionError {
    CoercionError::Overflow {
        value: value.to_string(),
        target,
    }
}

fn precision_loss(value: impl ToString, target: ScalarKind) -> CoercionError {
    CoercionError::PrecisionLoss {
        value: value.to_string(),
        target,
    }
}

fn invalid_format(value: impl ToString, target: ScalarKind) -> CoercionError {
    CoercionError::InvalidFormat {
        value: value.to_string(),
        target,
    }
}

/// Coerces a canonical scalar into the wire representation of `kind`.
pub fn to_wire(value: &Scalar, kind: ScalarKind) -> Result<WireScalar, CoercionError> {
    match kind {
        ScalarKind::Boolean => match value {
            Scalar::Boolean(value) => Ok(WireScalar::Boolean(*value)),
            other => Err(mismatch(kind, other)),
        },
        ScalarKind::Int8
        | ScalarKind::Int16
        | ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::UInt8
        | ScalarKind::UInt16
        | ScalarKind::UInt32
        | ScalarKind::UInt64 => {
            let integer = integer_from_scalar(value, kind)?;
            integer_to_number(integer, kind).map(WireScalar::Number)
        }
        ScalarKind::Float32 | ScalarKind::Float64 => {
            let float = float_from_scalar(value, kind)?;
            Number::from_f64(float)
                .map(WireScalar::Number)
                .ok_or(CoercionError::NonFinite(kind))
        }
        ScalarKind::Decimal => {
            let decimal = decimal_from_scalar(value, kind)?;
            decimal_to_number(&decimal).map(WireScalar::Number)
        }
        ScalarKind::String => match value {
            Scalar::String(text) => Ok(WireScalar::String(text.clone())),
            Scalar::Char(c) => Ok(WireScalar::String(c.to_string())),
            other => Err(mismatch(kind, other)),
        },
        ScalarKind::Char => match value {
            Scalar::Char(c) => Ok(WireScalar::String(c.to_string())),
            Scalar::String(text) => parse_char(text).map(|c| WireScalar::String(c.to_string())),
            other => Err(mismatch(kind, other)),
        },
        ScalarKind::Instant | ScalarKind::DateTime | ScalarKind::Date | ScalarKind::Time => {
            temporal_to_wire(value, kind)
        }
    }
}

/// Reads a wire scalar back into the canonical scalar of `kind`.
pub fn from_wire(wire: &WireScalar, kind: ScalarKind) -> Result<Scalar, CoercionError> {
    let found = || CoercionError::TypeMismatch {
        expected: kind,
        found: wire.kind_name(),
    };
    match kind {
        ScalarKind::Boolean => match wire {
            WireScalar::Boolean(value) => Ok(Scalar::Boolean(*value)),
            _ => Err(found()),
        },
        ScalarKind::Int8
        | ScalarKind::Int16
        | ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::UInt8
        | ScalarKind::UInt16
        | ScalarKind::UInt32
        | ScalarKind::UInt64 => {
            let integer = match wire {
                WireScalar::Number(number) => {
                    if let Some(value) = number.as_i64() {
                        i128::from(value)
                    } else if let Some(value) = number.as_u64() {
                        i128::from(value)
                    } else {
                        return Err(CoercionError::TypeMismatch {
                            expected: kind,
                            found: "float",
                        });
                    }
                }
                WireScalar::String(text) => {
                    integer_from_decimal(&numeric_string(text, kind)?, kind)?
                }
                WireScalar::Boolean(_) => return Err(found()),
            };
            check_integer_range(integer, kind).map(Scalar::Integer)
        }
        ScalarKind::Float32 | ScalarKind::Float64 => {
            let float = match wire {
                WireScalar::Number(number) => number.as_f64().ok_or_else(found)?,
                WireScalar::String(text) => float_from_decimal(&numeric_string(text, kind)?, kind)?,
                WireScalar::Boolean(_) => return Err(found()),
            };
            check_float(float, kind).map(Scalar::Float)
        }
        ScalarKind::Decimal => match wire {
            WireScalar::Number(number) => number
                .to_string()
                .parse::<Decimal>()
                .map(Scalar::Decimal)
                .map_err(|_| invalid_format(number, kind)),
            WireScalar::String(text) => numeric_string(text, kind).map(Scalar::Decimal),
            WireScalar::Boolean(_) => Err(found()),
        },
        ScalarKind::String => match wire {
            WireScalar::String(text) => Ok(Scalar::String(text.clone())),
            _ => Err(found()),
        },
        ScalarKind::Char => match wire {
            WireScalar::String(text) => parse_char(text).map(Scalar::Char),
            _ => Err(found()),
        },
        ScalarKind::Instant | ScalarKind::DateTime | ScalarKind::Date | ScalarKind::Time => {
            match wire {
                WireScalar::String(text) => parse_temporal(text, kind),
                _ => Err(found()),
            }
        }
    }
}

/// Coerces a canonical value into a JSON wire value, giving every scalar its natural kind.
///
/// Sequences become lists and mappings become objects, keeping their order.
pub fn to_wire_value(value: &Value) -> Result<serde_json::Value, CoercionError> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Scalar(scalar) => to_wire(scalar, scalar.natural_kind()).map(Into::into),
        Value::Sequence(items) => items
            .iter()
            .map(to_wire_value)
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(key, value)| to_wire_value(value).map(|wire| (key.to_string(), wire)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(serde_json::Value::Object),
    }
}

/// Coerces a scalar, or a list of scalars, into `kind`.
pub fn to_wire_value_as(value: &Value, kind: ScalarKind) -> Result<serde_json::Value, CoercionError> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Scalar(scalar) => to_wire(scalar, kind).map(Into::into),
        Value::Sequence(items) => items
            .iter()
            .map(|item| to_wire_value_as(item, kind))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        Value::Mapping(_) => Err(CoercionError::NotAScalar("mapping")),
    }
}

/// Reads a scalar field of a response; `null` reads as `None`.
pub fn read_scalar(
    value: &serde_json::Value,
    kind: ScalarKind,
) -> Result<Option<Scalar>, CoercionError> {
    let wire = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(value) => WireScalar::Boolean(*value),
        serde_json::Value::Number(value) => WireScalar::Number(value.clone()),
        serde_json::Value::String(value) => WireScalar::String(value.clone()),
        serde_json::Value::Array(_) => return Err(CoercionError::NotAScalar("list")),
        serde_json::Value::Object(_) => return Err(CoercionError::NotAScalar("object")),
    };
    from_wire(&wire, kind).map(Some)
}

fn numeric_string(text: &str, kind: ScalarKind) -> Result<Decimal, CoercionError> {
    Decimal::from_str(text).map_err(|_| CoercionError::TypeMismatch {
        expected: kind,
        found: "string",
    })
}

fn check_integer_range(value: i128, kind: ScalarKind) -> Result<i128, CoercionError> {
    match kind.integer_range() {
        Some((min, max)) if (min..=max).contains(&value) => Ok(value),
        _ => Err(overflow(value, kind)),
    }
}

fn integer_from_decimal(decimal: &Decimal, kind: ScalarKind) -> Result<i128, CoercionError> {
    decimal
        .to_i128()
        .ok_or_else(|| precision_loss(decimal, kind))
}

fn integer_from_scalar(value: &Scalar, kind: ScalarKind) -> Result<i128, CoercionError> {
    let integer = match value {
        Scalar::Integer(value) => *value,
        Scalar::Decimal(decimal) => integer_from_decimal(decimal, kind)?,
        Scalar::String(text) => integer_from_decimal(&numeric_string(text, kind)?, kind)?,
        other => return Err(mismatch(kind, other)),
    };
    check_integer_range(integer, kind)
}

fn integer_to_number(value: i128, kind: ScalarKind) -> Result<Number, CoercionError> {
    if let Ok(value) = i64::try_from(value) {
        Ok(Number::from(value))
    } else if let Ok(value) = u64::try_from(value) {
        Ok(Number::from(value))
    } else {
        Err(overflow(value, kind))
    }
}

fn check_float(value: f64, kind: ScalarKind) -> Result<f64, CoercionError> {
    if !value.is_finite() {
        return Err(CoercionError::NonFinite(kind));
    }
    if kind == ScalarKind::Float32 && (value as f32).is_infinite() {
        return Err(overflow(value, kind));
    }
    Ok(value)
}

fn float_from_decimal(decimal: &Decimal, kind: ScalarKind) -> Result<f64, CoercionError> {
    let value = decimal
        .to_string()
        .parse::<f64>()
        .map_err(|_| invalid_format(decimal, kind))?;
    if !value.is_finite() {
        return Err(overflow(decimal, kind));
    }
    match Decimal::try_from(value) {
        Ok(exact) if &exact == decimal => Ok(value),
        _ => Err(precision_loss(decimal, kind)),
    }
}

fn float_from_scalar(value: &Scalar, kind: ScalarKind) -> Result<f64, CoercionError> {
    let float = match value {
        Scalar::Float(value) => *value,
        Scalar::Integer(value) => {
            let float = match kind {
                ScalarKind::Float32 => f64::from(*value as f32),
                _ => *value as f64,
            };
            // Casting back saturates, so 2^127 would compare equal to `i128::MAX`.
            if float >= I128_LIMIT || float as i128 != *value {
                return Err(precision_loss(value, kind));
            }
            float
        }
        Scalar::Decimal(decimal) => float_from_decimal(decimal, kind)?,
        Scalar::String(text) => float_from_decimal(&numeric_string(text, kind)?, kind)?,
        other => return Err(mismatch(kind, other)),
    };
    check_float(float, kind)
}

fn decimal_from_scalar(value: &Scalar, kind: ScalarKind) -> Result<Decimal, CoercionError> {
    match value {
        Scalar::Decimal(decimal) => Ok(*decimal),
        Scalar::Integer(value) => Decimal::try_from(*value).map_err(|_| overflow(value, kind)),
        Scalar::Float(value) if !value.is_finite() => Err(CoercionError::NonFinite(kind)),
        Scalar::Float(value) => Decimal::try_from(*value).map_err(|_| precision_loss(value, kind)),
        Scalar::String(text) => numeric_string(text, kind),
        other => Err(mismatch(kind, other)),
    }
}

// A JSON number is either a 64-bit integer or a double; anything else would be rounded.
fn decimal_to_number(decimal: &Decimal) -> Result<Number, CoercionError> {
    let number = Number::from_str(&decimal.to_string())
        .map_err(|_| precision_loss(decimal, ScalarKind::Decimal))?;
    match number.to_string().parse::<Decimal>() {
        Ok(carried) if &carried == decimal => Ok(number),
        _ => Err(precision_loss(decimal, ScalarKind::Decimal)),
    }
}

fn parse_char(text: &str) -> Result<char, CoercionError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(invalid_format(text, ScalarKind::Char)),
    }
}

fn parse_temporal(text: &str, kind: ScalarKind) -> Result<Scalar, CoercionError> {
    let invalid = |_| invalid_format(text, kind);
    match kind {
        ScalarKind::Instant => OffsetDateTime::parse(text, INSTANT_FORMAT)
            .map(Scalar::Instant)
            .map_err(invalid),
        ScalarKind::DateTime => PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
            .map(Scalar::DateTime)
            .map_err(invalid),
        ScalarKind::Date => Date::parse(text, DATE_FORMAT)
            .map(Scalar::LocalDate)
            .map_err(invalid),
        ScalarKind::Time => Time::parse(text, TIME_FORMAT)
            .map(Scalar::LocalTime)
            .map_err(invalid),
        _ => Err(CoercionError::TypeMismatch {
            expected: kind,
            found: "string",
        }),
    }
}

fn temporal_to_wire(value: &Scalar, kind: ScalarKind) -> Result<WireScalar, CoercionError> {
    let formatted = match (value, kind) {
        (Scalar::String(text), _) => return temporal_to_wire(&parse_temporal(text, kind)?, kind),
        (Scalar::Instant(instant), ScalarKind::Instant) => {
            // The wire carries 100ns ticks and whole-minute offsets.
            if instant.nanosecond() % 100 != 0 || instant.offset().seconds_past_minute() != 0 {
                return Err(precision_loss(instant, kind));
            }
            instant.format(INSTANT_FORMAT)
        }
        (Scalar::DateTime(date_time), ScalarKind::DateTime) => {
            if date_time.nanosecond() % 100 != 0 {
                return Err(precision_loss(date_time, kind));
            }
            date_time.format(DATE_TIME_FORMAT)
        }
        (Scalar::LocalDate(date), ScalarKind::Date) => date.format(DATE_FORMAT),
        (Scalar::LocalTime(time), ScalarKind::Time) => {
            if time.nanosecond() != 0 {
                return Err(precision_loss(time, kind));
            }
            time.format(TIME_FORMAT)
        }
        (other, _) => return Err(mismatch(kind, other)),
    };
    formatted
        .map(WireScalar::String)
        .map_err(|_| invalid_format(value, kind))
}
