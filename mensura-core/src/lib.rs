//! Mensura Core - Fundamental types
//!
//! This crate provides the core types used throughout Mensura:
//! - `Scalar`: Fixed-point decimal (18 digits, 9 fractional)
//! - `MensuraError`: Structured errors for protocol consumers

mod scalar;
mod error;

pub use scalar::{Scalar, ScalarError};
pub use error::{MensuraError, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Scalar, ScalarError, MensuraError};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod scalar_tests {
        use super::*;
        use dashu_int::{IBig, UBig};
        use dashu_ratio::RBig;
        use rust_decimal::Decimal;

        fn s(text: &str) -> Scalar {
            Scalar::from_str(text).unwrap()
        }

        #[test]
        fn test_from_str_integer() {
            assert_eq!(s("42"), Scalar::from_i64(42).unwrap());
            assert_eq!(s("42").to_string(), "42");
        }

        #[test]
        fn test_from_str_decimal() {
            let n = s("2.54");
            assert_eq!(n.as_decimal(), &Decimal::new(254, 2));
            assert_eq!(n.to_string(), "2.54");
        }

        #[test]
        fn test_from_str_signs() {
            assert_eq!(s("-0.25").to_string(), "-0.25");
            assert_eq!(s("+7").to_string(), "7");
            assert_eq!(s(" 1.50 ").to_string(), "1.5");
        }

        #[test]
        fn test_from_str_rounds_half_even() {
            // 10th digit is exactly 5: round to even
            assert_eq!(s("0.0000000005"), Scalar::ZERO);
            assert_eq!(s("0.0000000015").to_fixed_string(), "0.000000002");
            assert_eq!(s("0.2365882365").to_fixed_string(), "0.236588236");
            // Above the midpoint rounds away from zero
            assert_eq!(s("-0.00000000051").to_fixed_string(), "-0.000000001");
        }

        #[test]
        fn test_from_str_rejects_garbage() {
            for bad in ["", "1.2.3", "abc", "1e5", "1,5", "1_000"] {
                assert!(
                    matches!(Scalar::from_str(bad), Err(ScalarError::ParseError(_))),
                    "should reject {:?}", bad
                );
            }
        }

        #[test]
        fn test_overflow() {
            // 9 integer digits fit, 10 do not
            assert!(Scalar::from_str("999999999.999999999").is_ok());
            assert!(matches!(Scalar::from_str("1000000000"), Err(ScalarError::Overflow)));
            let big = s("100000000");
            assert!(matches!(big.mul(&s("10")), Err(ScalarError::Overflow)));
        }

        #[test]
        fn test_mul_is_exact_on_the_grid() {
            assert_eq!(s("2.54").mul(&s("0.01")).unwrap(), s("0.0254"));
            assert_eq!(s("0.001").mul(&s("1000")).unwrap(), s("1"));
        }

        #[test]
        fn test_checked_div() {
            assert_eq!(s("1").checked_div(&s("3")).unwrap().to_fixed_string(), "0.333333333");
            assert_eq!(s("2").checked_div(&s("3")).unwrap().to_fixed_string(), "0.666666667");
            assert!(matches!(s("1").checked_div(&Scalar::ZERO), Err(ScalarError::DivisionByZero)));
        }

        #[test]
        fn test_from_ratio_rounds_once() {
            let third = RBig::from_parts(IBig::ONE, UBig::from(3u8));
            assert_eq!(Scalar::from_ratio(&third).unwrap().to_fixed_string(), "0.333333333");
            // (1/3) * 3 kept exact until the end
            let whole = &third * &RBig::from(IBig::from(3));
            assert_eq!(Scalar::from_ratio(&whole).unwrap(), Scalar::one());
        }

        #[test]
        fn test_from_ratio_ties_go_to_even() {
            // 5 / 10^10 and 15 / 10^10 sit exactly on the midpoint
            let tie = |n: u8| RBig::from_parts(IBig::from(n), UBig::from(10u8).pow(10));
            assert_eq!(Scalar::from_ratio(&tie(5)).unwrap(), Scalar::ZERO);
            assert_eq!(Scalar::from_ratio(&tie(15)).unwrap().to_fixed_string(), "0.000000002");
            assert_eq!(Scalar::from_ratio(&-tie(25)).unwrap().to_fixed_string(), "-0.000000002");
            // Anything past the midpoint rounds away from zero
            let above = RBig::from_parts(IBig::from(-50_001), UBig::from(10u8).pow(14));
            assert_eq!(Scalar::from_ratio(&above).unwrap().to_fixed_string(), "-0.000000001");
        }

        #[test]
        fn test_to_ratio_is_exact() {
            let quarter = RBig::from_parts(IBig::from(-1), UBig::from(4u8));
            assert_eq!(s("-0.25").to_ratio(), quarter);
            assert_eq!(Scalar::ZERO.to_ratio(), RBig::ZERO);
        }

        #[test]
        fn test_to_fixed_string() {
            assert_eq!(s("0.0254").to_fixed_string(), "0.025400000");
            assert_eq!(s("-12").to_fixed_string(), "-12.000000000");
            assert_eq!(Scalar::ZERO.to_fixed_string(), "0.000000000");
        }

        #[test]
        fn test_ordering() {
            assert!(s("0.001") < s("0.01"));
            assert!(s("-1") < Scalar::ZERO);
            assert!(s("-1").is_negative());
            assert!(Scalar::ZERO.is_zero());
        }

        #[test]
        fn test_serde_as_string() {
            let json = serde_json::to_string(&s("0.0254")).unwrap();
            assert_eq!(json, "\"0.0254\"");
            let back: Scalar = serde_json::from_str(&json).unwrap();
            assert_eq!(back, s("0.0254"));
            assert!(serde_json::from_str::<Scalar>("\"x\"").is_err());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_error_from_scalar_error() {
            let err: MensuraError = ScalarError::DivisionByZero.into();
            assert_eq!(err.code, codes::DIV_ZERO);
            let err: MensuraError = ScalarError::Overflow.into();
            assert_eq!(err.code, codes::OVERFLOW);
        }

        #[test]
        fn test_error_display() {
            let err = MensuraError::parse_error("abc");
            let display = format!("{}", err);
            assert!(display.contains("PARSE_ERROR"));
            assert!(display.contains("suggestion"));
        }

        #[test]
        fn test_error_json() {
            let json = MensuraError::new(codes::IN_USE, "busy").to_json();
            assert_eq!(json["code"], "IN_USE");
            assert!(json.get("suggestion").is_none());
        }
    }
}
