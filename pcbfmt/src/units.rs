//! Conversion between on-disk millimetres and internal units.
//!
//! Internal units are nanometres stored in an `i32`, which covers a little over
//! two metres in each direction.

/// Internal units per millimetre.
pub const IU_PER_MM: f64 = 1_000_000.0;

const IU_PER_MM_INT: i64 = 1_000_000;

/// Largest magnitude a converted value may take.
const MAX_IU: f64 = i32::MAX as f64;

/// Scales a millimetre value to internal units.
///
/// Rounds half away from zero and clamps to the representable range, so a
/// pathological document cannot overflow coordinates.
pub fn mm_to_iu(mm: f64) -> i32 {
    // clamp leaves NaN alone and `as` maps it to zero
    (mm * IU_PER_MM).clamp(-MAX_IU, MAX_IU).round() as i32
}

/// Formats internal units as millimetres with the fewest digits that represent
/// the value exactly.
pub fn format_mm(iu: i32) -> String {
    let value = i64::from(iu);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.abs();
    let whole = magnitude / IU_PER_MM_INT;
    let fraction = magnitude % IU_PER_MM_INT;

    if fraction == 0 {
        format!("{sign}{whole}")
    } else {
        let digits = format!("{fraction:06}");
        format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Formats a plain decimal such as an angle or a ratio, never producing `-0`.
pub fn format_decimal(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod test {
    use super::{format_decimal, format_mm, mm_to_iu};
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 1_000_000)]
    #[case(-0.25, -250_000)]
    #[case(0.0000005, 1)]
    #[case(-0.0000005, -1)]
    #[case(1e300, i32::MAX)]
    #[case(-1e300, -i32::MAX)]
    fn test_mm_to_iu(#[case] mm: f64, #[case] iu: i32) {
        assert_eq!(mm_to_iu(mm), iu);
    }

    #[rstest]
    #[case(0, "0")]
    #[case(1_000_000, "1")]
    #[case(-250_000, "-0.25")]
    #[case(1, "0.000001")]
    #[case(-1, "-0.000001")]
    #[case(123_456_789, "123.456789")]
    #[case(i32::MIN, "-2147.483648")]
    fn test_format_mm(#[case] iu: i32, #[case] text: &str) {
        assert_eq!(format_mm(iu), text);
    }

    #[rstest]
    #[case(0.0, "0")]
    #[case(-0.0, "0")]
    #[case(90.0, "90")]
    #[case(-45.5, "-45.5")]
    fn test_format_decimal(#[case] value: f64, #[case] text: &str) {
        assert_eq!(format_decimal(value), text);
    }

    proptest! {
        #[test]
        fn format_then_scale(iu in -i32::MAX..=i32::MAX) {
            let text = format_mm(iu);
            let mm: f64 = text.parse().unwrap();
            prop_assert_eq!(mm_to_iu(mm), iu);
        }
    }
}
