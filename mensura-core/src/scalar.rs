//! Fixed-point decimal scalars
//!
//! A `Scalar` is a `rust_decimal::Decimal` held at 9 fractional digits and
//! bounded to 18 significant digits overall. Arithmetic is carried out on
//! exact rationals (`dashu_ratio::RBig`) and rounded half-even back onto
//! that grid once, so repeated conversions stay exact instead of drifting
//! the way binary floating point does.

use dashu_int::{IBig, UBig};
use dashu_ratio::RBig;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for scalar operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalarError {
    #[error("Invalid decimal format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow: more than {} significant digits", Scalar::MAX_DIGITS)]
    Overflow,
}

/// Fixed-point decimal number (18 digits, 9 of them fractional)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scalar(Decimal);

impl Scalar {
    /// Number of fractional digits
    pub const SCALE: u32 = 9;

    /// Total number of significant digits
    pub const MAX_DIGITS: u32 = 18;

    /// The additive identity
    pub const ZERO: Scalar = Scalar(Decimal::ZERO);

    // ========== Construction ==========

    /// The multiplicative identity
    pub fn one() -> Self {
        Scalar(Decimal::ONE)
    }

    /// Round a decimal half-even onto the fixed scale
    pub fn from_decimal(value: Decimal) -> Result<Self, ScalarError> {
        let rounded = value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointNearestEven);
        if rounded.abs() >= integer_limit() {
            return Err(ScalarError::Overflow);
        }
        // -0.000000000 after rounding is plain zero
        if rounded.is_zero() {
            return Ok(Self::ZERO);
        }
        Ok(Scalar(rounded))
    }

    /// Create from an integer
    pub fn from_i64(n: i64) -> Result<Self, ScalarError> {
        Self::from_decimal(Decimal::from(n))
    }

    /// Round an exact rational half-even onto the fixed scale
    ///
    /// The value is truncated one digit past the scale and a trailing
    /// sticky digit marks any remainder, which leaves the tie decision to
    /// `round_dp_with_strategy`.
    pub fn from_ratio(value: &RBig) -> Result<Self, ScalarError> {
        let guard = Self::SCALE + 1;
        let scaled = value * &RBig::from(pow10(guard));
        let truncated = scaled.trunc();
        let sticky = if scaled == RBig::from(truncated.clone()) {
            0
        } else if value < &RBig::ZERO {
            -1
        } else {
            1
        };

        let digits = i128::try_from(truncated)
            .ok()
            .and_then(|t| t.checked_mul(10))
            .and_then(|t| t.checked_add(sticky))
            .ok_or(ScalarError::Overflow)?;
        let decimal =
            Decimal::try_from_i128_with_scale(digits, guard + 1).map_err(|_| ScalarError::Overflow)?;
        Self::from_decimal(decimal)
    }

    /// Parse a plain decimal: "42", "-0.25", "+2.54"
    ///
    /// Digits past the ninth fractional place are rounded half-even.
    pub fn from_str(s: &str) -> Result<Self, ScalarError> {
        let trimmed = s.trim();
        let plain = trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'));
        if !plain {
            return Err(ScalarError::ParseError(s.to_string()));
        }
        let value: Decimal = trimmed
            .parse()
            .map_err(|_| ScalarError::ParseError(s.to_string()))?;
        Self::from_decimal(value)
    }

    // ========== Accessors ==========

    /// The underlying decimal
    pub fn as_decimal(&self) -> &Decimal {
        &self.0
    }

    /// The exact rational value
    pub fn to_ratio(&self) -> RBig {
        RBig::from_parts(IBig::from(self.0.mantissa()), pow10(self.0.scale()))
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    // ========== Arithmetic ==========

    /// Multiplication, rounded half-even to the fixed scale
    pub fn mul(&self, other: &Self) -> Result<Self, ScalarError> {
        Self::from_ratio(&(&self.to_ratio() * &other.to_ratio()))
    }

    /// Safe division, rounded half-even to the fixed scale
    pub fn checked_div(&self, other: &Self) -> Result<Self, ScalarError> {
        if other.is_zero() {
            return Err(ScalarError::DivisionByZero);
        }
        Self::from_ratio(&(&self.to_ratio() / &other.to_ratio()))
    }

    // ========== Display ==========

    /// Render with all nine fractional digits
    pub fn to_fixed_string(&self) -> String {
        format!("{:.9}", self.0)
    }
}

/// 10^9, exclusive bound of the magnitude
fn integer_limit() -> Decimal {
    Decimal::from(1_000_000_000i64)
}

fn pow10(exp: u32) -> UBig {
    UBig::from(10u8).pow(exp as usize)
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl std::str::FromStr for Scalar {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scalar::from_str(s)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
