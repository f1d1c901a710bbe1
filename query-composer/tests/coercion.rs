use pretty_assertions::assert_eq;
use query_composer::CoercionError;
use query_composer::Decimal;
use query_composer::Scalar;
use query_composer::ScalarKind;
use query_composer::WireScalar;
use query_composer::coerce::from_wire;
use query_composer::coerce::read_scalar;
use query_composer::coerce::to_wire;
use rstest::rstest;
use serde_json::json;
use time::macros::date;
use time::macros::datetime;
use time::macros::time;

#[rstest]
#[case(Scalar::from(true), ScalarKind::Boolean)]
#[case(Scalar::from(i8::MIN), ScalarKind::Int8)]
#[case(Scalar::from(i16::MAX), ScalarKind::Int16)]
#[case(Scalar::from(-70_000), ScalarKind::Int32)]
#[case(Scalar::from(i64::MAX), ScalarKind::Int64)]
#[case(Scalar::from(200u8), ScalarKind::UInt8)]
#[case(Scalar::from(u16::MAX), ScalarKind::UInt16)]
#[case(Scalar::from(u32::MAX), ScalarKind::UInt32)]
#[case(Scalar::from(u64::MAX), ScalarKind::UInt64)]
#[case(Scalar::from(0.25), ScalarKind::Float32)]
#[case(Scalar::from(-1234.5678), ScalarKind::Float64)]
#[case(Scalar::from("-99.125".parse::<Decimal>().unwrap()), ScalarKind::Decimal)]
#[case(Scalar::from("plain text"), ScalarKind::String)]
#[case(Scalar::from('Z'), ScalarKind::Char)]
#[case(Scalar::from(datetime!(2023-06-01 12:00:00.0000001 -7)), ScalarKind::Instant)]
#[case(Scalar::from(datetime!(2023-06-01 12:00:00.25)), ScalarKind::DateTime)]
#[case(Scalar::from(date!(2023-06-01)), ScalarKind::Date)]
#[case(Scalar::from(time!(00:00:01)), ScalarKind::Time)]
fn values_survive_the_wire(#[case] value: Scalar, #[case] kind: ScalarKind) {
    let wire = to_wire(&value, kind).unwrap();
    assert_eq!(from_wire(&wire, kind).unwrap(), value);
    assert_eq!(to_wire(&from_wire(&wire, kind).unwrap(), kind).unwrap(), wire);
}

#[rstest]
#[case(Scalar::from(i128::from(i64::MAX) + 1), ScalarKind::Int64)]
#[case(Scalar::from(65_536), ScalarKind::UInt16)]
#[case(Scalar::from(-32_769), ScalarKind::Int16)]
#[case(Scalar::from(f64::MAX), ScalarKind::Float32)]
fn out_of_range_values_are_never_truncated(#[case] value: Scalar, #[case] kind: ScalarKind) {
    assert!(matches!(
        to_wire(&value, kind),
        Err(CoercionError::Overflow { .. })
    ));
}

#[test]
fn instants_use_seven_fractional_digits_and_an_offset() {
    let wire = to_wire(
        &Scalar::from(datetime!(2023-06-01 12:00:00.0000001 -7)),
        ScalarKind::Instant,
    )
    .unwrap();
    assert_eq!(
        wire,
        WireScalar::String("2023-06-01T12:00:00.0000001-07:00".to_string())
    );
}

#[test]
fn responses_are_read_back_by_kind() {
    assert_eq!(
        read_scalar(&json!("2023-06-01"), ScalarKind::Date).unwrap(),
        Some(Scalar::from(date!(2023-06-01)))
    );
    assert_eq!(
        read_scalar(&json!(12.5), ScalarKind::Decimal).unwrap(),
        Some(Scalar::from("12.5".parse::<Decimal>().unwrap()))
    );
    assert_eq!(
        read_scalar(&json!("12"), ScalarKind::UInt8).unwrap(),
        Some(Scalar::Integer(12))
    );
    assert_eq!(
        read_scalar(&json!("twelve"), ScalarKind::UInt8),
        Err(CoercionError::TypeMismatch {
            expected: ScalarKind::UInt8,
            found: "string",
        })
    );
    assert_eq!(
        read_scalar(&json!({}), ScalarKind::String),
        Err(CoercionError::NotAScalar("object"))
    );
    assert!(matches!(
        read_scalar(&json!(1e300), ScalarKind::Float32),
        Err(CoercionError::Overflow {
            target: ScalarKind::Float32,
            ..
        })
    ));
}
