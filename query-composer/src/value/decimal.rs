use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal as WrappedDecimal;
use serde::Serialize;
use serde::Serializer;

use super::ser::DECIMAL_TOKEN;

const MAX_SCALE: i64 = 28;

/// An exact base-10 number of up to 28 fractional digits and a 96-bit mantissa.
///
/// Values are kept normalized: no trailing fractional zeros and no negative zero, so the
/// `Display` form is canonical and two decimals are equal exactly when their values are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal(WrappedDecimal);

/// The input was not a decimal literal, or its value does not fit a [`Decimal`] exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDecimal;

impl Decimal {
    pub const ZERO: Self = Self(WrappedDecimal::ZERO);

    /// Returns true if the decimal has no fractional component.
    pub fn is_integral(&self) -> bool {
        self.0.scale() == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative()
    }

    /// The integral value, if there is no fractional component.
    pub fn to_i128(&self) -> Option<i128> {
        self.is_integral().then_some(self.0.mantissa())
    }

    // `mantissa * 10^-scale` with any scale, including negative ones from exponents.
    fn from_parts(mut mantissa: i128, mut scale: i64) -> Result<Self, InvalidDecimal> {
        if mantissa == 0 {
            return Ok(Self::ZERO);
        }
        while scale > MAX_SCALE && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        while scale < 0 {
            mantissa = mantissa.checked_mul(10).ok_or(InvalidDecimal)?;
            scale += 1;
        }
        let scale = u32::try_from(scale).map_err(|_| InvalidDecimal)?;
        WrappedDecimal::try_from_i128_with_scale(mantissa, scale)
            .map(Self::from)
            .map_err(|_| InvalidDecimal)
    }
}

impl From<WrappedDecimal> for Decimal {
    fn from(value: WrappedDecimal) -> Self {
        Self(value.normalize())
    }
}

impl FromStr for Decimal {
    type Err = InvalidDecimal;

    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`. Literals that would need rounding fail.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(index) => (
                &unsigned[..index],
                unsigned[index + 1..]
                    .parse::<i32>()
                    .map_err(|_| InvalidDecimal)?,
            ),
            None => (unsigned, 0),
        };
        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return Err(InvalidDecimal);
        }
        if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(InvalidDecimal);
        }

        let integer = match integer.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };
        let fraction = fraction.trim_end_matches('0');
        let exact = if fraction.is_empty() {
            WrappedDecimal::from_str_exact(integer)
        } else {
            WrappedDecimal::from_str_exact(&format!("{integer}.{fraction}"))
        }
        .map_err(|_| InvalidDecimal)?;

        let mantissa = if negative {
            -exact.mantissa()
        } else {
            exact.mantissa()
        };
        Self::from_parts(mantissa, i64::from(exact.scale()) - i64::from(exponent))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self(WrappedDecimal::from(value))
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self(WrappedDecimal::from(value))
    }
}

impl TryFrom<i128> for Decimal {
    type Error = InvalidDecimal;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        Self::from_parts(value, 0)
    }
}

impl TryFrom<f64> for Decimal {
    type Error = InvalidDecimal;

    /// Converts the shortest representation that round-trips to `value`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(InvalidDecimal);
        }
        // `f64`'s `Display` never uses an exponent.
        value.to_string().parse()
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(DECIMAL_TOKEN, &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0", "0")]
    #[case("-0.000", "0")]
    #[case("007.2500", "7.25")]
    #[case("+12", "12")]
    #[case(".5", "0.5")]
    #[case("5.", "5")]
    #[case("1.5e3", "1500")]
    #[case("1e21", "1000000000000000000000")]
    #[case("-12.5E-3", "-0.0125")]
    #[case("100", "100")]
    #[case("1200e-30", "0.0000000000000000000000000012")]
    #[case("0e999999999", "0")]
    fn parses_into_canonical_form(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(input.parse::<Decimal>().unwrap().to_string(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case(".")]
    #[case("1.2.3")]
    #[case("12a")]
    #[case("1_000")]
    #[case("1e")]
    #[case("NaN")]
    #[case("inf")]
    #[case("1e999999")]
    #[case("1e-29")]
    #[case(".1e-9223372036854775808")]
    #[case("1e9223372036854775807")]
    #[case("0.00000000000000000000000000001")]
    #[case("100000000000000000000000000000")]
    fn rejects_non_decimal_literals(#[case] input: &str) {
        assert_eq!(input.parse::<Decimal>(), Err(InvalidDecimal));
    }

    #[test]
    fn equality_ignores_spelling() {
        let a: Decimal = "2.50".parse().unwrap();
        let b: Decimal = "25e-1".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2.5");
        assert!(!a.is_integral());
        assert_eq!("-4.0".parse::<Decimal>().unwrap().to_i128(), Some(-4));
    }

    #[test]
    fn converts_from_integers() {
        assert_eq!(Decimal::from(i64::MIN).to_string(), i64::MIN.to_string());
        assert_eq!(Decimal::from(u64::MAX).to_string(), u64::MAX.to_string());
        assert_eq!(Decimal::try_from(i128::MAX), Err(InvalidDecimal));
    }

    #[test]
    fn converts_from_floats() {
        assert_eq!(Decimal::try_from(0.1).unwrap().to_string(), "0.1");
        assert_eq!(Decimal::try_from(-2.0).unwrap().to_string(), "-2");
        assert!(!Decimal::try_from(-0.0).unwrap().is_negative());
        assert!(Decimal::try_from(f64::NAN).is_err());
        assert!(Decimal::try_from(1e300).is_err());
    }
}
